//! # bsonwire - BSON 线上格式编解码
//!
//! 实现 BSON 二进制文档格式的读写，与 MongoDB 生态的字节布局完全一致：
//!
//! - **Serde 集成**：任意实现 `Serialize`/`Deserialize` 的类型直接与字节互转，不经过中间值
//! - **动态值**：`Bson` / `Document` 用于事先不知道结构的数据
//! - **原始视图**：`RawDocument` 按需查找字段，嵌套文档以借用视图返回
//! - **流式构建**：`RawDocumentBuilder` 单次写入大文档
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use bsonwire::{from_slice, to_vec, RawDocument};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: i32,
//! }
//!
//! let bytes = to_vec(&User { name: "Miku".into(), age: 16 }).unwrap();
//! let user: User = from_slice(&bytes).unwrap();
//!
//! let raw = RawDocument::from_slice(&bytes).unwrap();
//! assert_eq!(raw.get_str("name").unwrap(), "Miku");
//! ```
//!
//! ## 日志
//!
//! 顶层编解码和原始文档重建通过 `tracing` 输出 `trace!`/`debug!` 事件，
//! 库本身不安装 subscriber。

pub mod builder;
pub mod codec;
pub mod de;
pub mod document;
pub mod json;
pub mod oid;
pub mod raw;
pub mod ser;
pub mod spec;
pub mod value;
pub mod wire;

pub use bsonwire_common::{BsonError, BsonResult, CodecConfig, IdSource, SystemIdSource};

pub use builder::RawDocumentBuilder;
pub use codec::{decode_document, encode_document, encode_document_with};
pub use de::{from_slice, from_slice_with, Deserializer};
pub use document::Document;
pub use oid::ObjectId;
pub use raw::{RawArray, RawDocument, RawElement};
pub use ser::{encode_into, to_bytes, to_vec, to_vec_with, Serializer};
pub use spec::{BinarySubtype, ElementType};
pub use value::{
    Binary, Bson, DateTime, Decimal128, JavaScriptCode, MaxKey, MinKey, RawString, Regex,
    Timestamp,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Level {
        Low,
        High,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Inner {
        flag: bool,
        note: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: i32,
        total: i64,
        ratio: f64,
        tags: Vec<String>,
        inner: Inner,
        level: Level,
        missing: Option<i32>,
    }

    fn sample() -> Record {
        Record {
            name: "miku".to_string(),
            count: 39,
            total: 1 << 40,
            ratio: 0.5,
            tags: vec!["a".to_string(), "b".to_string()],
            inner: Inner {
                flag: true,
                note: Some("teal".to_string()),
            },
            level: Level::High,
            missing: None,
        }
    }

    #[test]
    fn test_struct_bytes_match_reference_crate() {
        let record = sample();
        let ours = to_vec(&record).unwrap();
        let theirs = bson::to_vec(&record).unwrap();
        assert_eq!(ours, theirs);

        let back: Record = bson::from_slice(&ours).unwrap();
        assert_eq!(back, record);
        let back: Record = from_slice(&theirs).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_special_types_match_reference_crate() {
        #[derive(Serialize)]
        struct Ours {
            id: ObjectId,
            when: DateTime,
            blob: Binary,
        }
        #[derive(Serialize)]
        struct Theirs {
            id: bson::oid::ObjectId,
            when: bson::DateTime,
            blob: bson::Binary,
        }

        let ours = Ours {
            id: ObjectId::from_bytes([9; 12]),
            when: DateTime::from_millis(1_700_000_000_000),
            blob: Binary::generic(vec![1, 2, 3]),
        };
        let theirs = Theirs {
            id: bson::oid::ObjectId::from_bytes([9; 12]),
            when: bson::DateTime::from_millis(1_700_000_000_000),
            blob: bson::Binary {
                subtype: bson::spec::BinarySubtype::Generic,
                bytes: vec![1, 2, 3],
            },
        };
        assert_eq!(to_vec(&ours).unwrap(), bson::to_vec(&theirs).unwrap());
    }

    #[test]
    fn test_reference_document_decodes() {
        let bin = bson::Binary {
            subtype: bson::spec::BinarySubtype::Uuid,
            bytes: vec![7; 16],
        };
        let ts = bson::Timestamp { time: 1, increment: 2 };
        let re = bson::Regex {
            pattern: "^a".to_string(),
            options: "i".to_string(),
        };
        let reference = bson::doc! {
            "a": 1,
            "b": "x",
            "c": [1, 2],
            "d": { "e": true },
            "id": bson::oid::ObjectId::from_bytes([1; 12]),
            "dt": bson::DateTime::from_millis(5),
            "bin": bin,
            "ts": ts,
            "re": re,
            "dec": bson::Decimal128::from_bytes([4; 16]),
            "code": bson::Bson::JavaScriptCode("f()".to_string()),
            "big": 5i64,
            "f": 2.5,
            "nil": bson::Bson::Null,
            "max": bson::Bson::MaxKey,
            "min": bson::Bson::MinKey,
        };
        let mut bytes = Vec::new();
        reference.to_writer(&mut bytes).unwrap();

        let doc = Document::from_slice(&bytes).unwrap();
        assert_eq!(doc.get_i32("a"), Some(1));
        assert_eq!(doc.get_path("d.e"), Some(&Bson::Boolean(true)));
        assert_eq!(doc.get_binary("bin").unwrap().to_uuid().unwrap().as_bytes(), &[7; 16]);
        assert_eq!(doc.get_timestamp("ts"), Some(Timestamp::new(1, 2)));
        assert_eq!(doc.get_regex("re").unwrap().pattern(), "^a");
        assert_eq!(doc.to_vec().unwrap(), bytes);

        let raw = RawDocument::from_slice(&bytes).unwrap();
        assert_eq!(raw.get_i64("big").unwrap(), 5);
        assert_eq!(raw.get_datetime("dt").unwrap().timestamp_millis(), 5);
        assert_eq!(raw.get_object_id("id").unwrap(), ObjectId::from_bytes([1; 12]));
    }

    #[test]
    fn test_our_document_decodes_in_reference_crate() {
        let doc = doc! {
            "name": "miku",
            "n": (1i64 << 33),
            "nested": { "list": [1, "two", null] }
        };
        let bytes = doc.to_vec().unwrap();
        let reference = bson::Document::from_reader(&mut bytes.as_slice()).unwrap();
        assert_eq!(reference.get_str("name").unwrap(), "miku");
        assert_eq!(reference.get_i64("n").unwrap(), 1 << 33);
        let list = reference.get_document("nested").unwrap().get_array("list").unwrap();
        assert_eq!(list.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_struct_round_trip(
            name in "[a-zA-Z0-9 ]{0,16}",
            count in any::<i32>(),
            total in any::<i64>(),
            ratio in -1.0e12f64..1.0e12,
            tags in prop::collection::vec("[a-z]{0,6}", 0..6),
            flag in any::<bool>(),
            note in prop::option::of("[a-z]{0,6}"),
            missing in prop::option::of(any::<i32>()),
        ) {
            let record = Record {
                name,
                count,
                total,
                ratio,
                tags,
                inner: Inner { flag, note },
                level: if flag { Level::High } else { Level::Low },
                missing,
            };
            let bytes = to_vec(&record).unwrap();
            prop_assert_eq!(&bytes[..4], &(bytes.len() as i32).to_le_bytes()[..]);
            let back: Record = from_slice(&bytes).unwrap();
            prop_assert_eq!(back, record);
        }

        #[test]
        fn prop_raw_put_then_get(values in prop::collection::vec(any::<i64>(), 0..16)) {
            let mut raw = RawDocument::empty();
            for (i, v) in values.iter().enumerate() {
                raw.put_i64(&format!("f{}", i), *v).unwrap();
            }
            for (i, v) in values.iter().enumerate() {
                prop_assert_eq!(raw.get_i64(&format!("f{}", i)).unwrap(), *v);
            }
            let decoded = Document::from_slice(raw.as_bytes()).unwrap();
            prop_assert_eq!(decoded.len(), values.len());
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = Document::from_slice(&data);
            let _ = from_slice::<Record>(&data);
            if let Ok(raw) = RawDocument::from_slice(&data) {
                for element in raw.iter().flatten() {
                    let _ = element.to_bson();
                }
            }
        }
    }
}
