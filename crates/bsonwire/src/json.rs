//! 扩展 JSON 输出模块
//!
//! 将动态值渲染为宽松模式的扩展 JSON，供展示层和 `Display` 使用。
//! 只做输出方向，不解析 JSON。

use crate::document::Document;
use crate::value::Bson;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Number, Value as JsonValue};

/// 将 Bson 值转换为 JSON
///
/// # Brief
/// 数字和字符串等基础类型直接映射，其余类型使用扩展 JSON 格式
///
/// # 扩展 JSON 格式
/// - ObjectId: `{"$oid": "507f1f77bcf86cd799439011"}`
/// - DateTime: `{"$date": 1234567890000}`
/// - Binary: `{"$binary": {"base64": "...", "subType": "04"}}`
/// - Timestamp: `{"$timestamp": {"t": 1, "i": 2}}`
/// - Regex: `{"$regularExpression": {"pattern": "^a", "options": "i"}}`
/// - Decimal128: `{"$numberDecimal": "<十六进制>"}`
/// - 非有限浮点数: `{"$numberDouble": "NaN"}`
///
/// # Arguments
/// * `value` - 要转换的值
pub fn to_extended_json(value: &Bson) -> JsonValue {
    match value {
        Bson::Null => JsonValue::Null,
        Bson::Boolean(b) => JsonValue::Bool(*b),
        Bson::Int32(n) => json!(*n),
        Bson::Int64(n) => json!(*n),
        Bson::Double(f) => match Number::from_f64(*f) {
            Some(n) => JsonValue::Number(n),
            None => json!({ "$numberDouble": non_finite_name(*f) }),
        },
        Bson::String(s) => JsonValue::String(s.clone()),
        Bson::Document(doc) => document_to_extended_json(doc),
        Bson::Array(items) => JsonValue::Array(items.iter().map(to_extended_json).collect()),
        Bson::Binary(bin) => json!({
            "$binary": {
                "base64": STANDARD.encode(&bin.bytes),
                "subType": format!("{:02x}", bin.subtype.to_u8()),
            }
        }),
        Bson::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        Bson::DateTime(dt) => json!({ "$date": dt.timestamp_millis() }),
        Bson::RegularExpression(re) => json!({
            "$regularExpression": {
                "pattern": re.pattern(),
                "options": re.options(),
            }
        }),
        Bson::JavaScriptCode(code) => json!({ "$code": code }),
        Bson::Timestamp(ts) => json!({ "$timestamp": { "t": ts.time, "i": ts.increment } }),
        Bson::Decimal128(d) => json!({ "$numberDecimal": hex::encode(d.bytes()) }),
        Bson::MaxKey => json!({ "$maxKey": 1 }),
        Bson::MinKey => json!({ "$minKey": 1 }),
    }
}

/// 将 Document 转换为 JSON 对象，字段顺序与文档一致
pub fn document_to_extended_json(doc: &Document) -> JsonValue {
    let mut map = Map::with_capacity(doc.len());
    for (k, v) in doc.iter() {
        map.insert(k.to_string(), to_extended_json(v));
    }
    JsonValue::Object(map)
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::ObjectId;
    use crate::spec::BinarySubtype;
    use crate::value::{Binary, DateTime, Decimal128, Regex, Timestamp};
    use crate::{bson, doc};

    #[test]
    fn test_basic_values() {
        assert_eq!(to_extended_json(&Bson::Null), JsonValue::Null);
        assert_eq!(to_extended_json(&bson!(42)), json!(42));
        assert_eq!(to_extended_json(&bson!(1i64 << 40)), json!(1i64 << 40));
        assert_eq!(to_extended_json(&bson!(1.5)), json!(1.5));
        assert_eq!(to_extended_json(&bson!("miku")), json!("miku"));
        assert_eq!(to_extended_json(&bson!([1, true])), json!([1, true]));
    }

    #[test]
    fn test_non_finite_double() {
        assert_eq!(
            to_extended_json(&Bson::Double(f64::NAN)),
            json!({ "$numberDouble": "NaN" })
        );
        assert_eq!(
            to_extended_json(&Bson::Double(f64::NEG_INFINITY)),
            json!({ "$numberDouble": "-Infinity" })
        );
    }

    #[test]
    fn test_special_values() {
        let oid = ObjectId::from_hex("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(
            to_extended_json(&Bson::ObjectId(oid)),
            json!({ "$oid": "507f1f77bcf86cd799439011" })
        );
        assert_eq!(
            to_extended_json(&Bson::DateTime(DateTime::from_millis(1000))),
            json!({ "$date": 1000 })
        );
        assert_eq!(
            to_extended_json(&Bson::Binary(Binary::new(BinarySubtype::Md5, vec![1, 2, 3]))),
            json!({ "$binary": { "base64": "AQID", "subType": "05" } })
        );
        assert_eq!(
            to_extended_json(&Bson::Timestamp(Timestamp::new(7, 8))),
            json!({ "$timestamp": { "t": 7, "i": 8 } })
        );
        assert_eq!(
            to_extended_json(&Bson::RegularExpression(Regex::new("^a", "i").unwrap())),
            json!({ "$regularExpression": { "pattern": "^a", "options": "i" } })
        );
        assert_eq!(
            to_extended_json(&Bson::Decimal128(Decimal128::from_bytes([0xAB; 16]))),
            json!({ "$numberDecimal": "ab".repeat(16) })
        );
        assert_eq!(to_extended_json(&Bson::MaxKey), json!({ "$maxKey": 1 }));
        assert_eq!(to_extended_json(&Bson::MinKey), json!({ "$minKey": 1 }));
    }

    #[test]
    fn test_document_keeps_field_order() {
        let d = doc! { "z": 1, "a": { "m": null } };
        assert_eq!(
            document_to_extended_json(&d).to_string(),
            r#"{"z":1,"a":{"m":null}}"#
        );
    }
}
