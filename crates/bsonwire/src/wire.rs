//! 线上格式基础原语
//!
//! 小端定长整数/浮点数读写、以 NUL 结尾的字节串读写、文档长度头校验和按类型
//! 结构化跳过值。所有读取都先检查剩余长度，不足时返回 `UnexpectedEndOfData`；
//! 写入固定切片时不会自动扩容，越界返回 `NoSpaceLeft`。

use crate::spec::{ElementType, DECIMAL128_LEN, MIN_DOCUMENT_SIZE, OBJECT_ID_LEN};
use crate::{BsonError, BsonResult};
use bytes::{BufMut, BytesMut};

/// 带位置游标的只读字节读取器
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 从指定偏移开始读取，偏移超出数据长度时停在末尾
    pub fn with_position(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// 底层数据的总长度
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// 返回 `[start, 当前位置)` 区间的原始字节
    pub fn span_from(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    pub fn peek_u8(&self) -> BsonResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BsonError::UnexpectedEndOfData { need: 1, have: 0 })
    }

    #[inline]
    pub fn read_u8(&mut self) -> BsonResult<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> BsonResult<&'a [u8]> {
        let have = self.remaining_len();
        if len > have {
            return Err(BsonError::UnexpectedEndOfData { need: len, have });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> BsonResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> BsonResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_i32(&mut self) -> BsonResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> BsonResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> BsonResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> BsonResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// 读取以 NUL 结尾的字节串，返回值不含 NUL，游标越过 NUL
    pub fn read_cstr(&mut self) -> BsonResult<&'a [u8]> {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(n) => {
                let bytes = &rest[..n];
                self.pos += n + 1;
                Ok(bytes)
            }
            None => Err(BsonError::UnexpectedEndOfData {
                need: rest.len() + 1,
                have: rest.len(),
            }),
        }
    }

    /// 读取 BSON 字符串载荷：`[int32 长度(含 NUL)][字节][0x00]`，返回不含 NUL 的字节
    pub fn read_string_bytes(&mut self) -> BsonResult<&'a [u8]> {
        let len = self.read_i32()?;
        if len < 1 {
            return Err(BsonError::malformed(format!("invalid string length {}", len)));
        }
        let bytes = self.read_bytes(len as usize)?;
        let (body, last) = bytes.split_at(bytes.len() - 1);
        if last[0] != 0 {
            return Err(BsonError::malformed("string is not null-terminated"));
        }
        Ok(body)
    }

    /// 读取并校验 UTF-8 的 BSON 字符串
    pub fn read_str(&mut self) -> BsonResult<&'a str> {
        Ok(std::str::from_utf8(self.read_string_bytes()?)?)
    }

    /// 读取嵌套文档/数组的长度头，返回该帧结束位置（不含）
    ///
    /// 长度必须在 `[5, 剩余字节]` 之内。
    pub fn read_frame_header(&mut self) -> BsonResult<usize> {
        let start = self.pos;
        let declared = self.read_i32()?;
        if declared < MIN_DOCUMENT_SIZE as i32 {
            return Err(BsonError::malformed(format!(
                "declared size {} is below the minimum of {}",
                declared, MIN_DOCUMENT_SIZE
            )));
        }
        let end = start + declared as usize;
        if end > self.data.len() {
            return Err(BsonError::malformed(format!(
                "declared size {} exceeds the {} available bytes",
                declared,
                self.data.len() - start
            )));
        }
        Ok(end)
    }
}

/// 校验顶层文档长度头，返回声明的长度
///
/// 数据不足 5 字节或声明长度不在 `[5, data.len()]` 之内时返回 `MalformedDocument`。
pub fn document_len(data: &[u8]) -> BsonResult<usize> {
    if data.len() < MIN_DOCUMENT_SIZE {
        return Err(BsonError::malformed(format!(
            "document of {} bytes is shorter than the minimum of {}",
            data.len(),
            MIN_DOCUMENT_SIZE
        )));
    }
    Reader::new(data).read_frame_header()
}

/// 结构化跳过一个值，不分配内存
pub fn skip_value(reader: &mut Reader<'_>, tag: ElementType) -> BsonResult<()> {
    match tag {
        ElementType::Double
        | ElementType::DateTime
        | ElementType::Int64
        | ElementType::Timestamp => reader.skip(8),
        ElementType::Int32 => reader.skip(4),
        ElementType::Boolean => reader.skip(1),
        ElementType::ObjectId => reader.skip(OBJECT_ID_LEN),
        ElementType::Decimal128 => reader.skip(DECIMAL128_LEN),
        ElementType::Null | ElementType::MaxKey | ElementType::MinKey => Ok(()),
        ElementType::String | ElementType::JavaScriptCode => {
            reader.read_string_bytes().map(|_| ())
        }
        ElementType::EmbeddedDocument
        | ElementType::Array
        | ElementType::JavaScriptCodeWithScope => {
            let start = reader.position();
            let end = reader.read_frame_header()?;
            reader.skip(end - start - 4)
        }
        ElementType::Binary => {
            let len = reader.read_i32()?;
            if len < 0 {
                return Err(BsonError::malformed(format!("invalid binary length {}", len)));
            }
            reader.skip(1 + len as usize)
        }
        ElementType::RegularExpression => {
            reader.read_cstr()?;
            reader.read_cstr().map(|_| ())
        }
    }
}

/// 在固定切片的指定偏移写入 i32（小端），不扩容
pub fn write_i32_at(buf: &mut [u8], offset: usize, value: i32) -> BsonResult<()> {
    write_at(buf, offset, &value.to_le_bytes())
}

pub fn write_i64_at(buf: &mut [u8], offset: usize, value: i64) -> BsonResult<()> {
    write_at(buf, offset, &value.to_le_bytes())
}

pub fn write_f64_at(buf: &mut [u8], offset: usize, value: f64) -> BsonResult<()> {
    write_at(buf, offset, &value.to_le_bytes())
}

/// 在固定切片的指定偏移写入字节串 + NUL
pub fn write_cstr_at(buf: &mut [u8], offset: usize, bytes: &[u8]) -> BsonResult<usize> {
    check_cstr(bytes)?;
    write_at(buf, offset, bytes)?;
    write_at(buf, offset + bytes.len(), &[0])?;
    Ok(bytes.len() + 1)
}

fn write_at(buf: &mut [u8], offset: usize, bytes: &[u8]) -> BsonResult<()> {
    let have = buf.len().saturating_sub(offset);
    if bytes.len() > have {
        return Err(BsonError::NoSpaceLeft {
            need: bytes.len(),
            have,
        });
    }
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn check_cstr(bytes: &[u8]) -> BsonResult<()> {
    if bytes.contains(&0) {
        return Err(BsonError::InvalidFieldName(
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }
    Ok(())
}

/// 可增长、可回填的输出缓冲区
pub trait WireBuf: BufMut {
    /// 已写入的字节数
    fn written(&self) -> usize;

    /// 已写入部分的可变视图，用于长度回填
    fn written_mut(&mut self) -> &mut [u8];
}

impl WireBuf for Vec<u8> {
    fn written(&self) -> usize {
        self.len()
    }

    fn written_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl WireBuf for BytesMut {
    fn written(&self) -> usize {
        self.len()
    }

    fn written_mut(&mut self) -> &mut [u8] {
        &mut self[..]
    }
}

/// 追加字节串 + NUL，拒绝内嵌 NUL
pub fn put_cstr<B: BufMut>(buf: &mut B, bytes: &[u8]) -> BsonResult<()> {
    check_cstr(bytes)?;
    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// 追加 BSON 字符串载荷
pub fn put_string<B: BufMut>(buf: &mut B, bytes: &[u8]) -> BsonResult<()> {
    let len = bytes.len() + 1;
    if len > i32::MAX as usize {
        return Err(BsonError::DocumentTooLarge(len));
    }
    buf.put_i32_le(len as i32);
    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// 追加元素头：类型标记 + 字段名
pub fn put_element_header<B: BufMut>(buf: &mut B, tag: ElementType, name: &[u8]) -> BsonResult<()> {
    check_cstr(name)?;
    buf.put_u8(tag as u8);
    buf.put_slice(name);
    buf.put_u8(0);
    Ok(())
}

/// 预留 4 字节长度头，返回其偏移，供 [`end_document`] 回填
pub fn begin_document<B: WireBuf>(buf: &mut B) -> usize {
    let start = buf.written();
    buf.put_i32_le(0);
    start
}

/// 写入终止符并把最终长度回填到 `start` 处预留的 4 字节
pub fn end_document<B: WireBuf>(buf: &mut B, start: usize) -> BsonResult<()> {
    buf.put_u8(0);
    let len = buf.written() - start;
    if len > i32::MAX as usize {
        return Err(BsonError::DocumentTooLarge(len));
    }
    write_i32_at(buf.written_mut(), start, len as i32)
}
