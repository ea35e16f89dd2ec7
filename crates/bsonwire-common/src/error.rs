//! 错误类型定义模块
//!
//! 定义 bsonwire 的统一错误类型 BsonError 和 Result 别名。
//! 每次编解码调用要么整体成功，要么以恰好一种错误整体失败。

use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// BSON 编解码错误类型
///
/// 解析在遇到第一处结构不一致时立即停止，不做多错误聚合。
#[derive(Error, Debug)]
pub enum BsonError {
    /// 文档长度超出 int32 长度字段可表示的范围
    #[error("Document too large: {0} bytes")]
    DocumentTooLarge(usize),

    /// 未知或不支持的类型标记
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// 文档结构损坏（长度头、终止符等）
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// 字符串值不是有效的 UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// 输入在读取完成前结束
    #[error("Unexpected end of data: need {need} bytes, have {have}")]
    UnexpectedEndOfData { need: usize, have: usize },

    /// 字段名（或其他 C 字符串）中包含 NUL 字节
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// 数组下标越界
    #[error("Invalid array index: {0}")]
    InvalidArrayIndex(usize),

    /// ObjectId 文本或字节格式无效
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// 二进制子类型不在允许的范围内
    #[error("Invalid binary subtype: {0:#04x}")]
    InvalidBinarySubtype(u8),

    /// 类型标记与期望类型不符
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// 字段不存在
    #[error("Missing field: {0}")]
    MissingField(String),

    /// 内存分配失败，按约定视为不可恢复
    #[error("Allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// 数值无法用目标宽度表示
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),

    /// 固定大小的输出缓冲区空间不足
    #[error("No space left: need {need} bytes, have {have}")]
    NoSpaceLeft { need: usize, have: usize },

    /// 序列化过程错误（serde 自定义消息）
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化过程错误（serde 自定义消息）
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl BsonError {
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        BsonError::TypeMismatch { expected, actual }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        BsonError::MalformedDocument(msg.into())
    }

    /// 分配失败与数据校验类错误区分开，调用方通常直接终止
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, BsonError::AllocationFailure(_))
    }
}

impl From<std::string::FromUtf8Error> for BsonError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        BsonError::InvalidUtf8(e.utf8_error())
    }
}

impl From<hex::FromHexError> for BsonError {
    fn from(e: hex::FromHexError) -> Self {
        BsonError::InvalidIdentifier(e.to_string())
    }
}

impl serde::ser::Error for BsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BsonError::Serialization(msg.to_string())
    }
}

impl serde::de::Error for BsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BsonError::Deserialization(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        BsonError::MissingField(field.to_string())
    }
}

/// bsonwire Result 类型别名
pub type BsonResult<T> = Result<T, BsonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_conversion() {
        let err: BsonError = String::from_utf8(vec![0xFF, 0xFE]).unwrap_err().into();
        assert!(matches!(err, BsonError::InvalidUtf8(_)));
    }

    #[test]
    fn test_allocation_failure_is_distinct() {
        let err: BsonError = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err().into();
        assert!(err.is_allocation_failure());
        assert!(!BsonError::malformed("x").is_allocation_failure());
    }

    #[test]
    fn test_serde_missing_field() {
        let err = <BsonError as serde::de::Error>::missing_field("name");
        assert!(matches!(err, BsonError::MissingField(ref f) if f == "name"));
    }

    #[test]
    fn test_display() {
        let err = BsonError::type_mismatch("string", "int32");
        assert_eq!(err.to_string(), "Type mismatch: expected string, got int32");
        assert_eq!(
            BsonError::InvalidBinarySubtype(0x07).to_string(),
            "Invalid binary subtype: 0x07"
        );
    }
}
