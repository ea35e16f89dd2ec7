//! 动态文档结构模块
//!
//! 提供有序的 Document API，字段按插入顺序保存，编码时按此顺序写出。

use crate::oid::ObjectId;
use crate::value::{Binary, Bson, DateTime, Decimal128, Regex, Timestamp};
use crate::{BsonError, BsonResult};
use compact_str::CompactString;
use indexmap::IndexMap;

/// 动态 BSON 文档
///
/// 使用 `IndexMap` 保持字段插入顺序。同名字段插入时覆盖原值并保留原位置。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: IndexMap<CompactString, Bson>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// 插入字段
    ///
    /// # Brief
    /// 向文档中插入或更新一个字段，返回被替换的旧值
    ///
    /// # Arguments
    /// * `key` - 字段名
    /// * `value` - 字段值
    pub fn insert(&mut self, key: impl Into<CompactString>, value: impl Into<Bson>) -> Option<Bson> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Bson> {
        self.fields.get_mut(key)
    }

    /// 移除字段，其余字段保持原有顺序
    pub fn remove(&mut self, key: &str) -> Option<Bson> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Bson> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Bson::as_str)
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Bson::as_i32)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Bson::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Bson::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Bson::as_bool)
    }

    pub fn get_object_id(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Bson::as_object_id)
    }

    pub fn get_binary(&self, key: &str) -> Option<&Binary> {
        self.get(key).and_then(Bson::as_binary)
    }

    pub fn get_datetime(&self, key: &str) -> Option<DateTime> {
        self.get(key).and_then(Bson::as_datetime)
    }

    pub fn get_timestamp(&self, key: &str) -> Option<Timestamp> {
        self.get(key).and_then(Bson::as_timestamp)
    }

    pub fn get_regex(&self, key: &str) -> Option<&Regex> {
        self.get(key).and_then(Bson::as_regex)
    }

    pub fn get_decimal128(&self, key: &str) -> Option<Decimal128> {
        self.get(key).and_then(Bson::as_decimal128)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Bson]> {
        self.get(key).and_then(Bson::as_array)
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Bson::as_document)
    }

    /// 按路径获取嵌套值
    ///
    /// # Brief
    /// 使用点分隔的路径访问嵌套文档中的值，数组段按下标解析
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径，如 "user.tags.0"
    ///
    /// # Returns
    /// `Some(&Bson)` 如果路径存在，否则 `None`
    pub fn get_path(&self, path: &str) -> Option<&Bson> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// 合并另一个文档，同名字段以 `other` 为准
    pub fn merge(&mut self, other: Document) {
        for (k, v) in other.fields {
            self.fields.insert(k, v);
        }
    }

    /// 编码为 BSON 字节
    pub fn to_vec(&self) -> BsonResult<Vec<u8>> {
        crate::codec::encode_document(self)
    }

    /// 从 BSON 字节解码
    pub fn from_slice(data: &[u8]) -> BsonResult<Self> {
        crate::codec::decode_document(data)
    }

    /// 转换为扩展 JSON 字符串
    pub fn to_json(&self) -> String {
        crate::json::document_to_extended_json(self).to_string()
    }

    /// 转换为格式化的扩展 JSON 字符串
    pub fn to_json_pretty(&self) -> BsonResult<String> {
        serde_json::to_string_pretty(&crate::json::document_to_extended_json(self))
            .map_err(|e| BsonError::Serialization(e.to_string()))
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl<K: Into<CompactString>, V: Into<Bson>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (CompactString, Bson);
    type IntoIter = indexmap::map::IntoIter<CompactString, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a CompactString, &'a Bson);
    type IntoIter = indexmap::map::Iter<'a, CompactString, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl From<IndexMap<CompactString, Bson>> for Document {
    fn from(fields: IndexMap<CompactString, Bson>) -> Self {
        Self { fields }
    }
}

/// 构造 Document 的便捷宏
///
/// # 示例
///
/// ```rust,ignore
/// use bsonwire::doc;
///
/// let empty = doc!();
/// let doc = doc! {
///     "name": "test",
///     "value": 123
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::Document::new();
            $(
                doc.insert($key, $crate::bson!($value));
            )*
            doc
        }
    };
}
