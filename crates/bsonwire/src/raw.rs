//! 原始文档视图
//!
//! 直接在 BSON 字节上查询和追加字段，不需要任何类型形状。
//!
//! - 查询按线上顺序线性扫描，同名字段取第一次出现的值
//! - `put` 每次都重建整个缓冲区：复制终止符之前的字节，追加新元素和终止符，
//!   回填长度头后替换旧缓冲区。单次 O(当前大小)，连续 N 次 O(N²)。
//!   需要一次性构建大文档时使用 [`RawDocumentBuilder`](crate::builder::RawDocumentBuilder)
//! - 嵌套文档/数组视图借用父缓冲区中的字节区间，不复制

use crate::codec;
use crate::document::Document;
use crate::oid::ObjectId;
use crate::spec::{ElementType, EMPTY_DOCUMENT, OBJECT_ID_LEN};
use crate::value::{Binary, Bson, DateTime, Decimal128, RawString, Regex, Timestamp};
use crate::wire::{self, Reader};
use crate::{BsonError, BsonResult, CodecConfig};
use bytes::BufMut;
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace};

/// 校验长度头和终止符，返回文档的准确字节长度
fn validate(data: &[u8]) -> BsonResult<usize> {
    let len = wire::document_len(data)?;
    if data[len - 1] != 0 {
        return Err(BsonError::malformed("document is not null-terminated"));
    }
    Ok(len)
}

/// 单个元素的借用视图：类型标记、字段名和载荷字节
#[derive(Clone, Copy)]
pub struct RawElement<'a> {
    tag: ElementType,
    name: &'a [u8],
    value: &'a [u8],
}

impl<'a> RawElement<'a> {
    /// 字段名，非 UTF-8 字节按替换字符显示
    pub fn name(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.name)
    }

    pub fn name_bytes(&self) -> &'a [u8] {
        self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.tag
    }

    /// 值的原始载荷字节
    pub fn value_bytes(&self) -> &'a [u8] {
        self.value
    }

    pub fn to_bson(&self) -> BsonResult<Bson> {
        codec::read_value(self.tag, self.value)
    }

    fn expect(&self, expected: ElementType) -> BsonResult<Reader<'a>> {
        if self.tag != expected {
            return Err(BsonError::type_mismatch(expected.name(), self.tag.name()));
        }
        Ok(Reader::new(self.value))
    }

    pub fn as_f64(&self) -> BsonResult<f64> {
        self.expect(ElementType::Double)?.read_f64()
    }

    pub fn as_str(&self) -> BsonResult<&'a str> {
        self.expect(ElementType::String)?.read_str()
    }

    /// 字符串值的原始字节，不做 UTF-8 校验
    pub fn as_str_bytes(&self) -> BsonResult<&'a [u8]> {
        self.expect(ElementType::String)?.read_string_bytes()
    }

    pub fn as_bool(&self) -> BsonResult<bool> {
        codec::read_bool(&mut self.expect(ElementType::Boolean)?)
    }

    /// int64 在可无损收窄时也接受
    pub fn as_i32(&self) -> BsonResult<i32> {
        let mut reader = Reader::new(self.value);
        match self.tag {
            ElementType::Int32 => reader.read_i32(),
            ElementType::Int64 => {
                let n = reader.read_i64()?;
                i32::try_from(n).map_err(|_| {
                    BsonError::NumericOverflow(format!("{} does not fit in int32", n))
                })
            }
            other => Err(BsonError::type_mismatch(
                ElementType::Int32.name(),
                other.name(),
            )),
        }
    }

    pub fn as_i64(&self) -> BsonResult<i64> {
        let mut reader = Reader::new(self.value);
        match self.tag {
            ElementType::Int32 => reader.read_i32().map(i64::from),
            ElementType::Int64 => reader.read_i64(),
            other => Err(BsonError::type_mismatch(
                ElementType::Int64.name(),
                other.name(),
            )),
        }
    }

    pub fn as_object_id(&self) -> BsonResult<ObjectId> {
        let mut reader = self.expect(ElementType::ObjectId)?;
        ObjectId::from_slice(reader.read_bytes(OBJECT_ID_LEN)?)
    }

    pub fn as_binary(&self) -> BsonResult<Binary> {
        Binary::read(&mut self.expect(ElementType::Binary)?)
    }

    pub fn as_datetime(&self) -> BsonResult<DateTime> {
        self.expect(ElementType::DateTime)?
            .read_i64()
            .map(DateTime::from_millis)
    }

    pub fn as_timestamp(&self) -> BsonResult<Timestamp> {
        self.expect(ElementType::Timestamp)?
            .read_u64()
            .map(Timestamp::from_u64)
    }

    pub fn as_regex(&self) -> BsonResult<Regex> {
        Regex::read(&mut self.expect(ElementType::RegularExpression)?)
    }

    pub fn as_decimal128(&self) -> BsonResult<Decimal128> {
        self.expect(ElementType::Decimal128)?
            .read_array()
            .map(Decimal128::from_bytes)
    }

    pub fn is_null(&self) -> bool {
        self.tag == ElementType::Null
    }

    pub fn as_document(&self) -> BsonResult<RawDocument<'a>> {
        self.expect(ElementType::EmbeddedDocument)?;
        RawDocument::from_slice(self.value)
    }

    pub fn as_array(&self) -> BsonResult<RawArray<'a>> {
        self.expect(ElementType::Array)?;
        RawDocument::from_slice(self.value).map(RawArray::from_document)
    }
}

impl fmt::Debug for RawElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawElement")
            .field("name", &self.name())
            .field("type", &self.tag)
            .field("len", &self.value.len())
            .finish()
    }
}

/// 按线上顺序遍历文档元素
///
/// 遇到第一处结构错误时产出该错误并停止。
pub struct RawIter<'a> {
    reader: Reader<'a>,
    done: bool,
}

impl<'a> RawIter<'a> {
    /// `data` 从长度头开始；读取范围限制在声明的长度之内
    pub(crate) fn new(data: &'a [u8]) -> BsonResult<Self> {
        let len = wire::document_len(data)?;
        let mut reader = Reader::new(&data[..len]);
        reader.skip(4)?;
        Ok(Self {
            reader,
            done: false,
        })
    }

    fn next_element(&mut self) -> BsonResult<Option<RawElement<'a>>> {
        if self.reader.remaining_len() == 1 {
            return match self.reader.read_u8()? {
                0 => Ok(None),
                _ => Err(BsonError::malformed("document is not null-terminated")),
            };
        }
        let tag = self.reader.read_u8().map_err(|_| {
            BsonError::malformed("element runs past the declared document size")
        })?;
        if tag == 0 {
            return Err(BsonError::malformed(
                "terminator found before the declared document size",
            ));
        }
        let tag = ElementType::parse(tag)?;
        let name = self.reader.read_cstr()?;
        let start = self.reader.position();
        wire::skip_value(&mut self.reader, tag)?;
        let value = self.reader.span_from(start);
        if self.reader.is_empty() {
            return Err(BsonError::malformed(
                "element runs past the declared document size",
            ));
        }
        Ok(Some(RawElement { tag, name, value }))
    }
}

impl<'a> Iterator for RawIter<'a> {
    type Item = BsonResult<RawElement<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// 原始 BSON 文档
///
/// 持有或借用一段完整的文档字节。嵌套视图借用 `&self`，
/// 视图存活期间无法修改父文档。
#[derive(Clone, PartialEq)]
pub struct RawDocument<'a> {
    data: Cow<'a, [u8]>,
    config: CodecConfig,
}

impl RawDocument<'static> {
    /// 规范空文档 `[05,00,00,00,00]`
    pub fn empty() -> Self {
        Self {
            data: Cow::Owned(EMPTY_DOCUMENT.to_vec()),
            config: CodecConfig::default(),
        }
    }

    /// 接管已有的字节缓冲区
    pub fn from_vec(mut data: Vec<u8>) -> BsonResult<Self> {
        let len = validate(&data)?;
        data.truncate(len);
        Ok(Self {
            data: Cow::Owned(data),
            config: CodecConfig::default(),
        })
    }

    /// 复制一份字节
    pub fn copy_from(data: &[u8]) -> BsonResult<Self> {
        let len = validate(data)?;
        Self::from_vec(data[..len].to_vec())
    }
}

impl<'a> RawDocument<'a> {
    /// 借用调用方的字节，调用方保证其在视图存活期间有效
    pub fn from_slice(data: &'a [u8]) -> BsonResult<Self> {
        let len = validate(data)?;
        Ok(Self {
            data: Cow::Borrowed(&data[..len]),
            config: CodecConfig::default(),
        })
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_owned()
    }

    pub fn into_owned(self) -> RawDocument<'static> {
        RawDocument {
            data: Cow::Owned(self.data.into_owned()),
            config: self.config,
        }
    }

    /// 文档的字节长度
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// 是否不含任何元素
    pub fn is_empty(&self) -> bool {
        self.data.len() == EMPTY_DOCUMENT.len()
    }

    pub fn iter(&self) -> RawIter<'_> {
        RawIter {
            reader: Reader::with_position(&self.data, 4),
            done: false,
        }
    }

    /// 按线上顺序列出所有字段名
    pub fn field_names(&self) -> BsonResult<Vec<String>> {
        self.iter()
            .map(|element| element.map(|e| e.name().into_owned()))
            .collect()
    }

    /// 查找第一个名为 `name` 的元素
    pub fn get_element(&self, name: &str) -> BsonResult<Option<RawElement<'_>>> {
        for element in self.iter() {
            let element = element?;
            if element.name == name.as_bytes() {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// 读取字段值，不存在时返回 `None`
    pub fn get_field(&self, name: &str) -> BsonResult<Option<Bson>> {
        self.get_element(name)?.map(|e| e.to_bson()).transpose()
    }

    fn require(&self, name: &str) -> BsonResult<RawElement<'_>> {
        self.get_element(name)?
            .ok_or_else(|| BsonError::MissingField(name.to_string()))
    }

    pub fn get_f64(&self, name: &str) -> BsonResult<f64> {
        self.require(name)?.as_f64()
    }

    pub fn get_str(&self, name: &str) -> BsonResult<&str> {
        self.require(name)?.as_str()
    }

    /// 读取字符串字节，按配置决定是否校验 UTF-8
    pub fn get_raw_string(&self, name: &str) -> BsonResult<RawString> {
        let bytes = self.require(name)?.as_str_bytes()?;
        if self.config.validate_utf8 {
            std::str::from_utf8(bytes)?;
        }
        Ok(RawString::new(bytes))
    }

    pub fn get_bool(&self, name: &str) -> BsonResult<bool> {
        self.require(name)?.as_bool()
    }

    pub fn get_i32(&self, name: &str) -> BsonResult<i32> {
        self.require(name)?.as_i32()
    }

    pub fn get_i64(&self, name: &str) -> BsonResult<i64> {
        self.require(name)?.as_i64()
    }

    pub fn get_object_id(&self, name: &str) -> BsonResult<ObjectId> {
        self.require(name)?.as_object_id()
    }

    pub fn get_binary(&self, name: &str) -> BsonResult<Binary> {
        self.require(name)?.as_binary()
    }

    pub fn get_datetime(&self, name: &str) -> BsonResult<DateTime> {
        self.require(name)?.as_datetime()
    }

    pub fn get_timestamp(&self, name: &str) -> BsonResult<Timestamp> {
        self.require(name)?.as_timestamp()
    }

    pub fn get_regex(&self, name: &str) -> BsonResult<Regex> {
        self.require(name)?.as_regex()
    }

    pub fn get_decimal128(&self, name: &str) -> BsonResult<Decimal128> {
        self.require(name)?.as_decimal128()
    }

    pub fn is_null(&self, name: &str) -> BsonResult<bool> {
        Ok(self.require(name)?.is_null())
    }

    /// 嵌套文档视图，借用本文档的字节区间
    pub fn get_document(&self, name: &str) -> BsonResult<RawDocument<'_>> {
        Ok(self
            .require(name)?
            .as_document()?
            .with_config(self.config.clone()))
    }

    /// 嵌套数组视图，借用本文档的字节区间
    pub fn get_array(&self, name: &str) -> BsonResult<RawArray<'_>> {
        let mut array = self.require(name)?.as_array()?;
        array.doc.config = self.config.clone();
        Ok(array)
    }

    /// 追加一个字段
    ///
    /// # Brief
    /// 重建缓冲区并在末尾追加元素，不检查同名字段
    ///
    /// # Arguments
    /// * `name` - 字段名，不能包含 NUL
    /// * `value` - 字段值
    ///
    /// # Returns
    /// 失败时原缓冲区保持不变
    pub fn put(&mut self, name: &str, value: impl Into<Bson>) -> BsonResult<()> {
        let value = value.into();
        self.rebuild(name, value.element_type(), |buf| {
            codec::write_payload(buf, &value)
        })
    }

    pub fn put_str(&mut self, name: &str, value: &str) -> BsonResult<()> {
        self.rebuild(name, ElementType::String, |buf| {
            wire::put_string(buf, value.as_bytes())
        })
    }

    pub fn put_i32(&mut self, name: &str, value: i32) -> BsonResult<()> {
        self.put(name, value)
    }

    pub fn put_i64(&mut self, name: &str, value: i64) -> BsonResult<()> {
        self.put(name, value)
    }

    pub fn put_f64(&mut self, name: &str, value: f64) -> BsonResult<()> {
        self.put(name, value)
    }

    pub fn put_bool(&mut self, name: &str, value: bool) -> BsonResult<()> {
        self.put(name, value)
    }

    pub fn put_null(&mut self, name: &str) -> BsonResult<()> {
        self.put(name, Bson::Null)
    }

    /// 追加未经校验的字符串字节；配置开启校验时拒绝非法 UTF-8
    pub fn put_raw_string(&mut self, name: &str, value: &RawString) -> BsonResult<()> {
        if self.config.validate_utf8 {
            std::str::from_utf8(value.as_bytes())?;
        }
        self.rebuild(name, ElementType::String, |buf| {
            wire::put_string(buf, value.as_bytes())
        })
    }

    /// 以原样字节追加嵌套文档
    pub fn put_document(&mut self, name: &str, doc: &RawDocument<'_>) -> BsonResult<()> {
        self.rebuild(name, ElementType::EmbeddedDocument, |buf| {
            buf.put_slice(doc.as_bytes());
            Ok(())
        })
    }

    /// 以原样字节追加嵌套数组
    pub fn put_array(&mut self, name: &str, array: &RawArray<'_>) -> BsonResult<()> {
        self.rebuild(name, ElementType::Array, |buf| {
            buf.put_slice(array.as_bytes());
            Ok(())
        })
    }

    fn rebuild<F>(&mut self, name: &str, tag: ElementType, write: F) -> BsonResult<()>
    where
        F: FnOnce(&mut Vec<u8>) -> BsonResult<()>,
    {
        let mut element = Vec::new();
        wire::put_element_header(&mut element, tag, name.as_bytes())?;
        write(&mut element)?;

        let body_end = self.data.len() - 1;
        let new_len = body_end + element.len() + 1;
        if new_len > i32::MAX as usize {
            return Err(BsonError::DocumentTooLarge(new_len));
        }

        let mut next = Vec::new();
        next.try_reserve_exact(new_len)?;
        next.extend_from_slice(&self.data[..body_end]);
        next.extend_from_slice(&element);
        next.push(0);
        wire::write_i32_at(&mut next, 0, new_len as i32)?;

        if new_len >= self.config.rebuild_log_threshold {
            debug!(field = name, old = self.data.len(), new = new_len, "rebuilt large raw document");
        } else {
            trace!(field = name, new = new_len, "rebuilt raw document");
        }
        self.data = Cow::Owned(next);
        Ok(())
    }

    /// 转换为动态文档
    pub fn to_document(&self) -> BsonResult<Document> {
        codec::decode_document(&self.data)
    }
}

impl fmt::Debug for RawDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDocument")
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl Default for RawDocument<'static> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> TryFrom<&'a [u8]> for RawDocument<'a> {
    type Error = BsonError;

    fn try_from(data: &'a [u8]) -> BsonResult<Self> {
        RawDocument::from_slice(data)
    }
}

impl TryFrom<&Document> for RawDocument<'static> {
    type Error = BsonError;

    fn try_from(doc: &Document) -> BsonResult<Self> {
        RawDocument::from_vec(codec::encode_document(doc)?)
    }
}

impl<'a> IntoIterator for &'a RawDocument<'_> {
    type Item = BsonResult<RawElement<'a>>;
    type IntoIter = RawIter<'a>;

    fn into_iter(self) -> RawIter<'a> {
        self.iter()
    }
}

/// 原始 BSON 数组
///
/// 线上形式是字段名为 "0","1",... 的文档。解码时不校验下标是否连续。
#[derive(Clone, PartialEq, Debug)]
pub struct RawArray<'a> {
    doc: RawDocument<'a>,
}

impl RawArray<'static> {
    pub fn new() -> Self {
        Self {
            doc: RawDocument::empty(),
        }
    }
}

impl Default for RawArray<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RawArray<'a> {
    pub fn from_document(doc: RawDocument<'a>) -> Self {
        Self { doc }
    }

    pub fn as_document(&self) -> &RawDocument<'a> {
        &self.doc
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.doc.as_bytes()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.doc.into_vec()
    }

    pub fn iter(&self) -> RawIter<'_> {
        self.doc.iter()
    }

    /// 元素个数，需要一次完整扫描
    pub fn len(&self) -> BsonResult<usize> {
        let mut count = 0;
        for element in self.iter() {
            element?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// 第 `index` 个元素（按线上顺序，O(index)）
    pub fn get_element(&self, index: usize) -> BsonResult<Option<RawElement<'_>>> {
        for (i, element) in self.iter().enumerate() {
            let element = element?;
            if i == index {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    pub fn get(&self, index: usize) -> BsonResult<Option<Bson>> {
        self.get_element(index)?.map(|e| e.to_bson()).transpose()
    }

    fn require(&self, index: usize) -> BsonResult<RawElement<'_>> {
        self.get_element(index)?
            .ok_or(BsonError::InvalidArrayIndex(index))
    }

    pub fn get_f64(&self, index: usize) -> BsonResult<f64> {
        self.require(index)?.as_f64()
    }

    pub fn get_str(&self, index: usize) -> BsonResult<&str> {
        self.require(index)?.as_str()
    }

    pub fn get_bool(&self, index: usize) -> BsonResult<bool> {
        self.require(index)?.as_bool()
    }

    pub fn get_i32(&self, index: usize) -> BsonResult<i32> {
        self.require(index)?.as_i32()
    }

    pub fn get_i64(&self, index: usize) -> BsonResult<i64> {
        self.require(index)?.as_i64()
    }

    pub fn get_object_id(&self, index: usize) -> BsonResult<ObjectId> {
        self.require(index)?.as_object_id()
    }

    pub fn get_binary(&self, index: usize) -> BsonResult<Binary> {
        self.require(index)?.as_binary()
    }

    pub fn get_datetime(&self, index: usize) -> BsonResult<DateTime> {
        self.require(index)?.as_datetime()
    }

    pub fn get_timestamp(&self, index: usize) -> BsonResult<Timestamp> {
        self.require(index)?.as_timestamp()
    }

    pub fn get_regex(&self, index: usize) -> BsonResult<Regex> {
        self.require(index)?.as_regex()
    }

    pub fn get_decimal128(&self, index: usize) -> BsonResult<Decimal128> {
        self.require(index)?.as_decimal128()
    }

    pub fn is_null(&self, index: usize) -> BsonResult<bool> {
        Ok(self.require(index)?.is_null())
    }

    pub fn get_document(&self, index: usize) -> BsonResult<RawDocument<'_>> {
        Ok(self
            .require(index)?
            .as_document()?
            .with_config(self.doc.config.clone()))
    }

    pub fn get_array(&self, index: usize) -> BsonResult<RawArray<'_>> {
        let mut array = self.require(index)?.as_array()?;
        array.doc.config = self.doc.config.clone();
        Ok(array)
    }

    /// 以下一个下标为字段名追加元素
    pub fn push(&mut self, value: impl Into<Bson>) -> BsonResult<()> {
        let index = self.len()?;
        self.doc.put(&index.to_string(), value)
    }

    pub fn push_document(&mut self, doc: &RawDocument<'_>) -> BsonResult<()> {
        let index = self.len()?;
        self.doc.put_document(&index.to_string(), doc)
    }

    pub fn to_vec(&self) -> BsonResult<Vec<Bson>> {
        self.iter().map(|e| e?.to_bson()).collect()
    }
}
