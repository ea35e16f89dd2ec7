//! 类型标记表
//!
//! BSON 值类型与单字节线上标记之间的固定映射，以及二进制子类型表。

use crate::{BsonError, BsonResult};

/// 最小合法文档长度：4 字节长度头 + 1 字节终止符
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// 规范空文档 `[05,00,00,00,00]`
pub const EMPTY_DOCUMENT: [u8; MIN_DOCUMENT_SIZE] = [0x05, 0x00, 0x00, 0x00, 0x00];

pub const OBJECT_ID_LEN: usize = 12;
pub const DECIMAL128_LEN: usize = 16;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    RegularExpression = 0x0B,
    JavaScriptCode = 0x0D,
    JavaScriptCodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Double),
            0x02 => Some(Self::String),
            0x03 => Some(Self::EmbeddedDocument),
            0x04 => Some(Self::Array),
            0x05 => Some(Self::Binary),
            0x07 => Some(Self::ObjectId),
            0x08 => Some(Self::Boolean),
            0x09 => Some(Self::DateTime),
            0x0A => Some(Self::Null),
            0x0B => Some(Self::RegularExpression),
            0x0D => Some(Self::JavaScriptCode),
            0x0F => Some(Self::JavaScriptCodeWithScope),
            0x10 => Some(Self::Int32),
            0x11 => Some(Self::Timestamp),
            0x12 => Some(Self::Int64),
            0x13 => Some(Self::Decimal128),
            0x7F => Some(Self::MaxKey),
            0xFF => Some(Self::MinKey),
            _ => None,
        }
    }

    /// 解析标记字节，未知标记返回 `InvalidType`
    pub fn parse(byte: u8) -> BsonResult<Self> {
        Self::from_u8(byte)
            .ok_or_else(|| BsonError::InvalidType(format!("unknown element type {:#04x}", byte)))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::String => "string",
            Self::EmbeddedDocument => "document",
            Self::Array => "array",
            Self::Binary => "binary",
            Self::ObjectId => "objectId",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Null => "null",
            Self::RegularExpression => "regex",
            Self::JavaScriptCode => "javascript",
            Self::JavaScriptCodeWithScope => "javascriptWithScope",
            Self::Int32 => "int32",
            Self::Timestamp => "timestamp",
            Self::Int64 => "int64",
            Self::Decimal128 => "decimal128",
            Self::MaxKey => "maxKey",
            Self::MinKey => "minKey",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }
}

/// 二进制子类型
///
/// 0x02/0x03 为历史遗留子类型，只在解码时接受。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinarySubtype {
    Generic,
    Function,
    BinaryOld,
    UuidOld,
    Uuid,
    Md5,
    Encrypted,
    UserDefined(u8),
}

impl BinarySubtype {
    /// 解码方向的子类型解析
    pub fn from_u8(byte: u8) -> BsonResult<Self> {
        match byte {
            0x00 => Ok(Self::Generic),
            0x01 => Ok(Self::Function),
            0x02 => Ok(Self::BinaryOld),
            0x03 => Ok(Self::UuidOld),
            0x04 => Ok(Self::Uuid),
            0x05 => Ok(Self::Md5),
            0x06 => Ok(Self::Encrypted),
            b if b >= 0x80 => Ok(Self::UserDefined(b)),
            b => Err(BsonError::InvalidBinarySubtype(b)),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Generic => 0x00,
            Self::Function => 0x01,
            Self::BinaryOld => 0x02,
            Self::UuidOld => 0x03,
            Self::Uuid => 0x04,
            Self::Md5 => 0x05,
            Self::Encrypted => 0x06,
            Self::UserDefined(b) => b,
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, Self::BinaryOld | Self::UuidOld)
    }

    /// 编码方向的校验：拒绝遗留子类型和 0x80 以下的自定义值
    pub fn check_encodable(self) -> BsonResult<u8> {
        match self {
            Self::BinaryOld | Self::UuidOld => Err(BsonError::InvalidBinarySubtype(self.to_u8())),
            Self::UserDefined(b) if b < 0x80 => Err(BsonError::InvalidBinarySubtype(b)),
            other => Ok(other.to_u8()),
        }
    }
}

/// serde 层的特殊值类型
///
/// 这些类型通过保留的 newtype 名称穿过 serde，编码器/解码器据此写入或校验
/// 各自的类型标记，载荷统一以原始线上字节传递。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialKind {
    ObjectId,
    Binary,
    DateTime,
    Timestamp,
    Regex,
    Decimal128,
    JavaScriptCode,
    RawString,
    MaxKey,
    MinKey,
}

impl SpecialKind {
    pub(crate) const OBJECT_ID: &'static str = "$__bsonwire_object_id";
    pub(crate) const BINARY: &'static str = "$__bsonwire_binary";
    pub(crate) const DATE_TIME: &'static str = "$__bsonwire_date_time";
    pub(crate) const TIMESTAMP: &'static str = "$__bsonwire_timestamp";
    pub(crate) const REGEX: &'static str = "$__bsonwire_regex";
    pub(crate) const DECIMAL128: &'static str = "$__bsonwire_decimal128";
    pub(crate) const JAVASCRIPT: &'static str = "$__bsonwire_javascript";
    pub(crate) const RAW_STRING: &'static str = "$__bsonwire_raw_string";
    pub(crate) const MAX_KEY: &'static str = "$__bsonwire_max_key";
    pub(crate) const MIN_KEY: &'static str = "$__bsonwire_min_key";

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::OBJECT_ID => Some(Self::ObjectId),
            Self::BINARY => Some(Self::Binary),
            Self::DATE_TIME => Some(Self::DateTime),
            Self::TIMESTAMP => Some(Self::Timestamp),
            Self::REGEX => Some(Self::Regex),
            Self::DECIMAL128 => Some(Self::Decimal128),
            Self::JAVASCRIPT => Some(Self::JavaScriptCode),
            Self::RAW_STRING => Some(Self::RawString),
            Self::MAX_KEY => Some(Self::MaxKey),
            Self::MIN_KEY => Some(Self::MinKey),
            _ => None,
        }
    }

    pub(crate) fn element_type(self) -> ElementType {
        match self {
            Self::ObjectId => ElementType::ObjectId,
            Self::Binary => ElementType::Binary,
            Self::DateTime => ElementType::DateTime,
            Self::Timestamp => ElementType::Timestamp,
            Self::Regex => ElementType::RegularExpression,
            Self::Decimal128 => ElementType::Decimal128,
            Self::JavaScriptCode => ElementType::JavaScriptCode,
            Self::RawString => ElementType::String,
            Self::MaxKey => ElementType::MaxKey,
            Self::MinKey => ElementType::MinKey,
        }
    }
}
