//! 动态值编解码模块
//!
//! 在 [`Document`] / [`Bson`] 与 BSON 字节之间转换，不依赖任何静态类型形状。
//! 原始文档视图的 `put` 也通过这里写出单个值的载荷。

use crate::document::Document;
use crate::oid::ObjectId;
use crate::raw::RawIter;
use crate::spec::{ElementType, OBJECT_ID_LEN};
use crate::value::{Binary, Bson, DateTime, Decimal128, Regex, Timestamp};
use crate::wire::{self, Reader, WireBuf};
use crate::{BsonError, BsonResult, CodecConfig};
use bytes::BytesMut;
use compact_str::CompactString;
use tracing::trace;

/// 编码文档为字节向量
///
/// # Brief
/// 使用默认配置将 Document 编码为完整的 BSON 文档
///
/// # Arguments
/// * `doc` - 要编码的文档
///
/// # Returns
/// 成功返回字节向量, 失败返回错误
pub fn encode_document(doc: &Document) -> BsonResult<Vec<u8>> {
    encode_document_with(doc, &CodecConfig::default())
}

/// 使用指定配置编码文档
pub fn encode_document_with(doc: &Document, config: &CodecConfig) -> BsonResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(config.estimate_capacity(Some(doc.len())));
    encode_document_into(doc, &mut buf)?;
    trace!(fields = doc.len(), bytes = buf.len(), "encoded document");
    Ok(buf.to_vec())
}

/// 把文档追加写入已有缓冲区
pub fn encode_document_into<B: WireBuf>(doc: &Document, buf: &mut B) -> BsonResult<()> {
    Encoder::new(buf).write_document(doc)
}

/// 解码字节为文档
///
/// # Brief
/// 校验长度头后逐个读取元素；同名字段只保留第一次出现的值
///
/// # Arguments
/// * `data` - 以文档长度头开始的字节切片，长度头之后的多余字节被忽略
///
/// # Returns
/// 成功返回 Document, 格式错误返回错误
pub fn decode_document(data: &[u8]) -> BsonResult<Document> {
    let len = wire::document_len(data)?;
    let doc = decode_body(&data[..len])?;
    trace!(fields = doc.len(), bytes = len, "decoded document");
    Ok(doc)
}

/// 编码单个值的载荷（不含类型标记和字段名）
pub(crate) fn write_payload<B: WireBuf>(buf: &mut B, value: &Bson) -> BsonResult<()> {
    Encoder::new(buf).write_payload(value)
}

/// 按类型标记解码单个值
///
/// `bytes` 必须恰好是该值的载荷。
pub(crate) fn read_value(tag: ElementType, bytes: &[u8]) -> BsonResult<Bson> {
    let mut reader = Reader::new(bytes);
    let value = match tag {
        ElementType::Double => Bson::Double(reader.read_f64()?),
        ElementType::String => Bson::String(reader.read_str()?.to_owned()),
        ElementType::EmbeddedDocument => return decode_body(bytes).map(Bson::Document),
        ElementType::Array => {
            let mut items = Vec::new();
            for element in RawIter::new(bytes)? {
                items.push(element?.to_bson()?);
            }
            return Ok(Bson::Array(items));
        }
        ElementType::Binary => Bson::Binary(Binary::read(&mut reader)?),
        ElementType::ObjectId => {
            Bson::ObjectId(ObjectId::from_slice(reader.read_bytes(OBJECT_ID_LEN)?)?)
        }
        ElementType::Boolean => Bson::Boolean(read_bool(&mut reader)?),
        ElementType::DateTime => Bson::DateTime(DateTime::from_millis(reader.read_i64()?)),
        ElementType::Null => Bson::Null,
        ElementType::RegularExpression => Bson::RegularExpression(Regex::read(&mut reader)?),
        ElementType::JavaScriptCode => Bson::JavaScriptCode(reader.read_str()?.to_owned()),
        ElementType::JavaScriptCodeWithScope => {
            return Err(BsonError::InvalidType(
                "javascript with scope is not supported".to_string(),
            ))
        }
        ElementType::Int32 => Bson::Int32(reader.read_i32()?),
        ElementType::Timestamp => Bson::Timestamp(Timestamp::from_u64(reader.read_u64()?)),
        ElementType::Int64 => Bson::Int64(reader.read_i64()?),
        ElementType::Decimal128 => Bson::Decimal128(Decimal128::from_bytes(reader.read_array()?)),
        ElementType::MaxKey => Bson::MaxKey,
        ElementType::MinKey => Bson::MinKey,
    };
    Ok(value)
}

/// 布尔载荷只允许 0x00 / 0x01
pub(crate) fn read_bool(reader: &mut Reader<'_>) -> BsonResult<bool> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(BsonError::malformed(format!("invalid boolean byte {:#04x}", b))),
    }
}

fn decode_body(bytes: &[u8]) -> BsonResult<Document> {
    let mut doc = Document::new();
    for element in RawIter::new(bytes)? {
        let element = element?;
        let name = CompactString::from(element.name());
        if doc.contains_key(&name) {
            continue;
        }
        doc.insert(name, element.to_bson()?);
    }
    Ok(doc)
}

/// 动态值编码器
///
/// 内部结构，所有文档/数组都以先占位后回填长度的方式写出
struct Encoder<'a, B: WireBuf> {
    buf: &'a mut B,
}

impl<'a, B: WireBuf> Encoder<'a, B> {
    fn new(buf: &'a mut B) -> Self {
        Self { buf }
    }

    fn write_document(&mut self, doc: &Document) -> BsonResult<()> {
        let start = wire::begin_document(self.buf);
        for (key, value) in doc.iter() {
            self.write_element(key.as_bytes(), value)?;
        }
        wire::end_document(self.buf, start)
    }

    fn write_array(&mut self, items: &[Bson]) -> BsonResult<()> {
        let start = wire::begin_document(self.buf);
        for (i, value) in items.iter().enumerate() {
            self.write_element(i.to_string().as_bytes(), value)?;
        }
        wire::end_document(self.buf, start)
    }

    fn write_element(&mut self, name: &[u8], value: &Bson) -> BsonResult<()> {
        wire::put_element_header(self.buf, value.element_type(), name)?;
        self.write_payload(value)
    }

    fn write_payload(&mut self, value: &Bson) -> BsonResult<()> {
        match value {
            Bson::Double(v) => self.buf.put_f64_le(*v),
            Bson::String(s) => wire::put_string(self.buf, s.as_bytes())?,
            Bson::Document(doc) => self.write_document(doc)?,
            Bson::Array(items) => self.write_array(items)?,
            Bson::Binary(bin) => {
                let subtype = bin.subtype.check_encodable()?;
                if bin.bytes.len() > i32::MAX as usize {
                    return Err(BsonError::DocumentTooLarge(bin.bytes.len()));
                }
                self.buf.put_i32_le(bin.bytes.len() as i32);
                self.buf.put_u8(subtype);
                self.buf.put_slice(&bin.bytes);
            }
            Bson::ObjectId(id) => self.buf.put_slice(id.as_bytes()),
            Bson::Boolean(b) => self.buf.put_u8(*b as u8),
            Bson::DateTime(dt) => self.buf.put_i64_le(dt.timestamp_millis()),
            Bson::Null | Bson::MaxKey | Bson::MinKey => {}
            Bson::RegularExpression(re) => {
                wire::put_cstr(self.buf, re.pattern().as_bytes())?;
                wire::put_cstr(self.buf, re.options().as_bytes())?;
            }
            Bson::JavaScriptCode(code) => wire::put_string(self.buf, code.as_bytes())?,
            Bson::Int32(n) => self.buf.put_i32_le(*n),
            Bson::Timestamp(ts) => self.buf.put_u64_le(ts.to_u64()),
            Bson::Int64(n) => self.buf.put_i64_le(*n),
            Bson::Decimal128(d) => self.buf.put_slice(&d.bytes()),
        }
        Ok(())
    }
}
