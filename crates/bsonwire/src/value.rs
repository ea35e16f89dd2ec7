//! BSON 值类型定义模块
//!
//! 定义 BSON 支持的全部值类型，以及几种特殊值（二进制、正则、时间戳、
//! Decimal128 等）的独立类型。特殊值类型实现了 serde，可直接作为类型化结构体的字段。

use crate::document::Document;
use crate::oid::ObjectId;
use crate::spec::{BinarySubtype, ElementType, SpecialKind, DECIMAL128_LEN};
use crate::wire::Reader;
use crate::{BsonError, BsonResult};
use chrono::{TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// BSON 值
///
/// 封闭的标签联合，每个变体对应一个线上类型标记。
#[derive(Debug, Clone, PartialEq)]
pub enum Bson {
    /// 64 位浮点数
    Double(f64),
    /// UTF-8 字符串
    String(String),
    /// 嵌套文档
    Document(Document),
    /// 数组
    Array(Vec<Bson>),
    /// 二进制数据（子类型 + 字节）
    Binary(Binary),
    /// 12 字节标识符
    ObjectId(ObjectId),
    /// 布尔值
    Boolean(bool),
    /// UTC 毫秒时间
    DateTime(DateTime),
    /// 空值
    Null,
    /// 正则表达式
    RegularExpression(Regex),
    /// JavaScript 代码（仅透传）
    JavaScriptCode(String),
    /// 32 位有符号整数
    Int32(i32),
    /// 内部时间戳
    Timestamp(Timestamp),
    /// 64 位有符号整数
    Int64(i64),
    /// 128 位十进制数（不透明字节）
    Decimal128(Decimal128),
    MaxKey,
    MinKey,
}

impl Bson {
    pub fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(_) => ElementType::Double,
            Bson::String(_) => ElementType::String,
            Bson::Document(_) => ElementType::EmbeddedDocument,
            Bson::Array(_) => ElementType::Array,
            Bson::Binary(_) => ElementType::Binary,
            Bson::ObjectId(_) => ElementType::ObjectId,
            Bson::Boolean(_) => ElementType::Boolean,
            Bson::DateTime(_) => ElementType::DateTime,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(_) => ElementType::RegularExpression,
            Bson::JavaScriptCode(_) => ElementType::JavaScriptCode,
            Bson::Int32(_) => ElementType::Int32,
            Bson::Timestamp(_) => ElementType::Timestamp,
            Bson::Int64(_) => ElementType::Int64,
            Bson::Decimal128(_) => ElementType::Decimal128,
            Bson::MaxKey => ElementType::MaxKey,
            Bson::MinKey => ElementType::MinKey,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.element_type().name()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Bson::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bson::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Int32 原值，或可无损收窄的 Int64
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Bson::Int32(n) => Some(*n),
            Bson::Int64(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Bson::Int32(n) => Some(*n as i64),
            Bson::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Bson]> {
        match self {
            Bson::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Bson::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Bson::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Bson::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Bson::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Bson::RegularExpression(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_decimal128(&self) -> Option<Decimal128> {
        match self {
            Bson::Decimal128(d) => Some(*d),
            _ => None,
        }
    }

    /// 获取文档字段或数组元素
    pub fn get(&self, key: &str) -> Option<&Bson> {
        match self {
            Bson::Document(doc) => doc.get(key),
            Bson::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    }
}

impl Default for Bson {
    fn default() -> Self {
        Bson::Null
    }
}

impl fmt::Display for Bson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::json::to_extended_json(self))
    }
}

/// 二进制数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: BinarySubtype, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype,
            bytes: bytes.into(),
        }
    }

    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(BinarySubtype::Generic, bytes)
    }

    /// UUID 以子类型 0x04 存储
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self::new(BinarySubtype::Uuid, uuid.as_bytes().to_vec())
    }

    pub fn to_uuid(&self) -> BsonResult<Uuid> {
        if !matches!(self.subtype, BinarySubtype::Uuid | BinarySubtype::UuidOld) {
            return Err(BsonError::InvalidBinarySubtype(self.subtype.to_u8()));
        }
        Uuid::from_slice(&self.bytes)
            .map_err(|e| BsonError::InvalidType(format!("uuid payload: {}", e)))
    }

    /// 线上载荷：`[int32 长度][子类型][字节]`
    pub(crate) fn wire_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.bytes.len());
        out.extend_from_slice(&(self.bytes.len() as i32).to_le_bytes());
        out.push(self.subtype.to_u8());
        out.extend_from_slice(&self.bytes);
        out
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> BsonResult<Self> {
        let len = reader.read_i32()?;
        if len < 0 {
            return Err(BsonError::malformed(format!("invalid binary length {}", len)));
        }
        let subtype = BinarySubtype::from_u8(reader.read_u8()?)?;
        let bytes = reader.read_bytes(len as usize)?.to_vec();
        Ok(Self { subtype, bytes })
    }
}

impl From<Uuid> for Binary {
    fn from(uuid: Uuid) -> Self {
        Binary::from_uuid(uuid)
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::BINARY, &Payload(&self.wire_payload()))
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::BINARY,
            PayloadVisitor::new("a binary value", |bytes| {
                let mut reader = Reader::new(bytes);
                Binary::read(&mut reader)
            }),
        )
    }
}

/// 正则表达式
///
/// 模式和选项都是 C 字符串，构造时拒绝内嵌 NUL。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    pattern: String,
    options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> BsonResult<Self> {
        let pattern = pattern.into();
        let options = options.into();
        for part in [&pattern, &options] {
            if part.contains('\0') {
                return Err(BsonError::InvalidFieldName(part.clone()));
            }
        }
        Ok(Self { pattern, options })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub(crate) fn wire_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pattern.len() + self.options.len() + 2);
        out.extend_from_slice(self.pattern.as_bytes());
        out.push(0);
        out.extend_from_slice(self.options.as_bytes());
        out.push(0);
        out
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> BsonResult<Self> {
        let pattern = std::str::from_utf8(reader.read_cstr()?)?.to_owned();
        let options = std::str::from_utf8(reader.read_cstr()?)?.to_owned();
        Ok(Self { pattern, options })
    }
}

impl Serialize for Regex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::REGEX, &Payload(&self.wire_payload()))
    }
}

impl<'de> Deserialize<'de> for Regex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::REGEX,
            PayloadVisitor::new("a regular expression", |bytes| {
                Regex::read(&mut Reader::new(bytes))
            }),
        )
    }
}

/// 内部时间戳：低 32 位为自增序号，高 32 位为秒
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

impl Timestamp {
    pub fn new(time: u32, increment: u32) -> Self {
        Self { time, increment }
    }

    pub fn to_u64(self) -> u64 {
        ((self.time as u64) << 32) | self.increment as u64
    }

    pub fn from_u64(packed: u64) -> Self {
        Self {
            time: (packed >> 32) as u32,
            increment: packed as u32,
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(
            SpecialKind::TIMESTAMP,
            &Payload(&self.to_u64().to_le_bytes()),
        )
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::TIMESTAMP,
            PayloadVisitor::new("a timestamp", |bytes| {
                Reader::new(bytes).read_u64().map(Timestamp::from_u64)
            }),
        )
    }
}

/// UTC 日期时间（自 Unix 纪元起的毫秒数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime(i64);

impl DateTime {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn timestamp_millis(self) -> i64 {
        self.0
    }

    pub fn from_chrono(dt: chrono::DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// 超出 chrono 可表示范围时返回 None
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(dt: chrono::DateTime<Utc>) -> Self {
        DateTime::from_chrono(dt)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_chrono() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            None => write!(f, "DateTime({})", self.0),
        }
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer
            .serialize_newtype_struct(SpecialKind::DATE_TIME, &Payload(&self.0.to_le_bytes()))
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::DATE_TIME,
            PayloadVisitor::new("a datetime", |bytes| {
                Reader::new(bytes).read_i64().map(DateTime)
            }),
        )
    }
}

/// 128 位十进制浮点数，只按原始字节存取，不提供算术
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128 {
    bytes: [u8; DECIMAL128_LEN],
}

impl Decimal128 {
    pub fn from_bytes(bytes: [u8; DECIMAL128_LEN]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> [u8; DECIMAL128_LEN] {
        self.bytes
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({})", hex::encode(self.bytes))
    }
}

impl Serialize for Decimal128 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::DECIMAL128, &Payload(&self.bytes))
    }
}

impl<'de> Deserialize<'de> for Decimal128 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::DECIMAL128,
            PayloadVisitor::new("a decimal128", |bytes| {
                Reader::new(bytes).read_array().map(Decimal128::from_bytes)
            }),
        )
    }
}

/// JavaScript 代码，作为字符串透传
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaScriptCode(pub String);

impl Serialize for JavaScriptCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::JAVASCRIPT, &Payload(self.0.as_bytes()))
    }
}

impl<'de> Deserialize<'de> for JavaScriptCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::JAVASCRIPT,
            PayloadVisitor::new("javascript code", |bytes| {
                Ok(JavaScriptCode(std::str::from_utf8(bytes)?.to_owned()))
            }),
        )
    }
}

/// 未经校验的字符串字节
///
/// 以字符串类型标记写出；是否校验 UTF-8 由 `CodecConfig::validate_utf8` 决定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawString(Vec<u8>);

impl RawString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_str(&self) -> BsonResult<&str> {
        Ok(std::str::from_utf8(&self.0)?)
    }
}

impl From<&str> for RawString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl Serialize for RawString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::RAW_STRING, &Payload(&self.0))
    }
}

impl<'de> Deserialize<'de> for RawString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::RAW_STRING,
            PayloadVisitor::new("a string", |bytes| Ok(RawString(bytes.to_vec()))),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MinKey;

impl Serialize for MaxKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::MAX_KEY, &Payload(&[]))
    }
}

impl<'de> Deserialize<'de> for MaxKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::MAX_KEY,
            PayloadVisitor::new("maxKey", |_| Ok(MaxKey)),
        )
    }
}

impl Serialize for MinKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::MIN_KEY, &Payload(&[]))
    }
}

impl<'de> Deserialize<'de> for MinKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(
            SpecialKind::MIN_KEY,
            PayloadVisitor::new("minKey", |_| Ok(MinKey)),
        )
    }
}

/// 以字节形式交给序列化器的特殊值线上载荷
pub(crate) struct Payload<'a>(pub &'a [u8]);

impl Serialize for Payload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

/// 从线上载荷字节还原特殊值的通用 visitor
struct PayloadVisitor<F> {
    expecting: &'static str,
    parse: F,
}

impl<F> PayloadVisitor<F> {
    fn new<T>(expecting: &'static str, parse: F) -> Self
    where
        F: FnOnce(&[u8]) -> BsonResult<T>,
    {
        Self { expecting, parse }
    }
}

impl<'de, T, F> Visitor<'de> for PayloadVisitor<F>
where
    F: FnOnce(&[u8]) -> BsonResult<T>,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<T, E> {
        (self.parse)(v).map_err(E::custom)
    }
}

// ============================================================================
// From 特征实现 - 支持从各种 Rust 类型转换为 Bson
// ============================================================================

impl From<f64> for Bson {
    fn from(v: f64) -> Self {
        Bson::Double(v)
    }
}

impl From<&str> for Bson {
    fn from(v: &str) -> Self {
        Bson::String(v.to_owned())
    }
}

impl From<String> for Bson {
    fn from(v: String) -> Self {
        Bson::String(v)
    }
}

impl From<Document> for Bson {
    fn from(v: Document) -> Self {
        Bson::Document(v)
    }
}

impl<T: Into<Bson>> From<Vec<T>> for Bson {
    fn from(v: Vec<T>) -> Self {
        Bson::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Binary> for Bson {
    fn from(v: Binary) -> Self {
        Bson::Binary(v)
    }
}

impl From<ObjectId> for Bson {
    fn from(v: ObjectId) -> Self {
        Bson::ObjectId(v)
    }
}

impl From<bool> for Bson {
    fn from(v: bool) -> Self {
        Bson::Boolean(v)
    }
}

impl From<DateTime> for Bson {
    fn from(v: DateTime) -> Self {
        Bson::DateTime(v)
    }
}

impl From<chrono::DateTime<Utc>> for Bson {
    fn from(v: chrono::DateTime<Utc>) -> Self {
        Bson::DateTime(v.into())
    }
}

impl From<Regex> for Bson {
    fn from(v: Regex) -> Self {
        Bson::RegularExpression(v)
    }
}

impl From<i32> for Bson {
    fn from(v: i32) -> Self {
        Bson::Int32(v)
    }
}

impl From<Timestamp> for Bson {
    fn from(v: Timestamp) -> Self {
        Bson::Timestamp(v)
    }
}

impl From<i64> for Bson {
    fn from(v: i64) -> Self {
        Bson::Int64(v)
    }
}

impl From<Decimal128> for Bson {
    fn from(v: Decimal128) -> Self {
        Bson::Decimal128(v)
    }
}

impl From<Uuid> for Bson {
    fn from(v: Uuid) -> Self {
        Bson::Binary(Binary::from_uuid(v))
    }
}

impl<T: Into<Bson>> From<Option<T>> for Bson {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Bson::Null)
    }
}

/// 构造 Bson 的便捷宏
///
/// ```rust,ignore
/// use bsonwire::bson;
///
/// let null = bson!(null);
/// let array = bson!([1, "two", 3.0]);
/// let doc = bson!({ "name": "test", "tags": ["a", "b"] });
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::Bson::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Bson::Array(vec![ $($crate::bson!($elem)),* ])
    };
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::Bson::Document($crate::doc! { $($key : $value),* })
    };
    ($e:expr) => {
        $crate::Bson::from($e)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_packing() {
        let ts = Timestamp::new(0x0102_0304, 0x0A0B_0C0D);
        assert_eq!(ts.to_u64(), 0x0102_0304_0A0B_0C0D);
        assert_eq!(Timestamp::from_u64(ts.to_u64()), ts);
    }

    #[test]
    fn test_regex_rejects_nul() {
        assert!(matches!(
            Regex::new("a\0b", "i"),
            Err(BsonError::InvalidFieldName(_))
        ));
        let r = Regex::new("^a.*", "im").unwrap();
        assert_eq!(r.wire_payload(), b"^a.*\0im\0");
    }

    #[test]
    fn test_binary_uuid() {
        let uuid = Uuid::new_v4();
        let bin = Binary::from_uuid(uuid);
        assert_eq!(bin.subtype, BinarySubtype::Uuid);
        assert_eq!(bin.to_uuid().unwrap(), uuid);
        assert!(Binary::generic(vec![1, 2]).to_uuid().is_err());
    }

    #[test]
    fn test_binary_payload() {
        let bin = Binary::new(BinarySubtype::Md5, vec![9, 8, 7]);
        let payload = bin.wire_payload();
        assert_eq!(payload, [3, 0, 0, 0, 5, 9, 8, 7]);
        assert_eq!(Binary::read(&mut Reader::new(&payload)).unwrap(), bin);
        assert!(matches!(
            Binary::read(&mut Reader::new(&[0, 0, 0, 0, 0x07])),
            Err(BsonError::InvalidBinarySubtype(0x07))
        ));
    }

    #[test]
    fn test_datetime_chrono() {
        let dt = DateTime::from_millis(1_700_000_000_123);
        let chrono_dt = dt.to_chrono().unwrap();
        assert_eq!(DateTime::from(chrono_dt), dt);
        assert_eq!(dt.to_string(), "2023-11-14T22:13:20.123Z");
        assert!(DateTime::from_millis(i64::MAX).to_chrono().is_none());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Bson::Int64(7).as_i32(), Some(7));
        assert_eq!(Bson::Int64(i64::MAX).as_i32(), None);
        assert_eq!(Bson::Int32(-3).as_i64(), Some(-3));
        assert_eq!(Bson::from("x").as_str(), Some("x"));
        assert_eq!(Bson::from(None::<i32>), Bson::Null);
        assert_eq!(Bson::Double(1.0).type_name(), "double");
    }

    #[test]
    fn test_bson_macro() {
        let value = bson!({ "a": 1, "b": [true, null], "c": "x" });
        let doc = value.as_document().unwrap();
        assert_eq!(doc.get("a"), Some(&Bson::Int32(1)));
        assert_eq!(
            doc.get("b"),
            Some(&Bson::Array(vec![Bson::Boolean(true), Bson::Null]))
        );
        assert_eq!(value.get("b").and_then(|b| b.get("0")), Some(&Bson::Boolean(true)));
    }

    #[test]
    fn test_special_types_through_serde() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Specials {
            bin: Binary,
            re: Regex,
            ts: Timestamp,
            when: DateTime,
            dec: Decimal128,
            code: JavaScriptCode,
            raw: RawString,
            max: MaxKey,
            min: MinKey,
        }

        let value = Specials {
            bin: Binary::new(BinarySubtype::Md5, vec![1, 2, 3]),
            re: Regex::new("^a", "i").unwrap(),
            ts: Timestamp::new(7, 9),
            when: DateTime::from_millis(-1),
            dec: Decimal128::from_bytes([3; DECIMAL128_LEN]),
            code: JavaScriptCode("f()".to_string()),
            raw: RawString::from("teal"),
            max: MaxKey,
            min: MinKey,
        };
        let bytes = crate::to_vec(&value).unwrap();
        let back: Specials = crate::from_slice(&bytes).unwrap();
        assert_eq!(back, value);
    }
}
