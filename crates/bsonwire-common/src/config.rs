use crate::error::{BsonError, BsonResult};
use serde::{Deserialize, Serialize};

/// 编解码配置
///
/// 所有字段都有默认值，可以只在 JSON 中给出需要覆盖的部分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// 编码/解码字符串值时是否校验 UTF-8
    pub validate_utf8: bool,
    /// 编码器输出缓冲区的初始容量
    pub initial_capacity: usize,
    /// 每个顶层字段的保守估算字节数
    pub per_field_estimate: usize,
    /// 超过该大小的文档重建会以 debug 级别记录
    pub rebuild_log_threshold: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            validate_utf8: true,
            initial_capacity: 256,
            per_field_estimate: 32,
            rebuild_log_threshold: 64 * 1024,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate_utf8(mut self, validate: bool) -> Self {
        self.validate_utf8 = validate;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_per_field_estimate(mut self, estimate: usize) -> Self {
        self.per_field_estimate = estimate;
        self
    }

    pub fn with_rebuild_log_threshold(mut self, threshold: usize) -> Self {
        self.rebuild_log_threshold = threshold;
        self
    }

    /// 按字段数计算编码前的缓冲区预估容量
    ///
    /// 头部 4 字节 + 终止符 1 字节 + 每字段估算值，且不小于 `initial_capacity`。
    pub fn estimate_capacity(&self, fields: Option<usize>) -> usize {
        match fields {
            Some(n) => (5 + n.saturating_mul(self.per_field_estimate)).max(self.initial_capacity),
            None => self.initial_capacity,
        }
    }

    /// 从 JSON 文本加载配置
    pub fn from_json(json: &str) -> BsonResult<Self> {
        serde_json::from_str(json).map_err(|e| BsonError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert!(config.validate_utf8);
        assert_eq!(config.initial_capacity, 256);
    }

    #[test]
    fn test_partial_json() {
        let config = CodecConfig::from_json(r#"{"validate_utf8": false}"#).unwrap();
        assert!(!config.validate_utf8);
        assert_eq!(config.per_field_estimate, 32);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            CodecConfig::from_json("{"),
            Err(BsonError::Deserialization(_))
        ));
    }

    #[test]
    fn test_estimate_capacity() {
        let config = CodecConfig::new().with_initial_capacity(16).with_per_field_estimate(10);
        assert_eq!(config.estimate_capacity(None), 16);
        assert_eq!(config.estimate_capacity(Some(1)), 16);
        assert_eq!(config.estimate_capacity(Some(4)), 45);
    }
}
