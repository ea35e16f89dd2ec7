//! Serde 反序列化模块
//!
//! 直接从 BSON 字节反序列化为 Rust 数据结构，不构造中间的动态值。
//!
//! 类型标记规则:
//! - 标记必须与目标类型一致，否则返回 `TypeMismatch`
//! - 例外: int32 与 int64 可以互相转换，收窄时放不下返回 `NumericOverflow`
//! - 目标结构中不存在的字段按类型结构化跳过，不分配内存
//! - 缺失字段由 serde 属性决定: `Option` 为 None，`#[serde(default)]` 取默认值，
//!   其余返回 `MissingField`
//!
//! 解码器本身不强制必填字段。希望缺失字段一律取默认值时，在字段或结构体上
//! 标注 `#[serde(default)]`（结构体需实现 `Default`）。

use crate::spec::{BinarySubtype, ElementType, SpecialKind, OBJECT_ID_LEN};
use crate::wire::{self, Reader};
use crate::{codec, BsonError, BsonResult, CodecConfig};
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{forward_to_deserialize_any, Deserialize};
use tracing::trace;

/// 从字节反序列化
///
/// # Brief
/// 先校验顶层长度头，再按目标类型的形状读取字段；字符串可以直接借用输入
///
/// # Arguments
/// * `data` - 以文档长度头开始的字节，长度头之后的多余字节被忽略
///
/// # Returns
/// 成功返回反序列化后的值
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> BsonResult<T> {
    from_slice_with(data, &CodecConfig::default())
}

/// 使用指定配置反序列化
pub fn from_slice_with<'de, T: Deserialize<'de>>(
    data: &'de [u8],
    config: &CodecConfig,
) -> BsonResult<T> {
    let len = wire::document_len(data)?;
    let mut deserializer = Deserializer::new(&data[..len], config.clone());
    let value = T::deserialize(&mut deserializer)?;
    trace!(bytes = len, "deserialized document");
    Ok(value)
}

/// BSON 反序列化器
pub struct Deserializer<'de> {
    reader: Reader<'de>,
    config: CodecConfig,
    /// 当前值的类型标记；顶层视为文档
    current: ElementType,
}

impl<'de> Deserializer<'de> {
    pub fn new(data: &'de [u8], config: CodecConfig) -> Self {
        Self {
            reader: Reader::new(data),
            config,
            current: ElementType::EmbeddedDocument,
        }
    }

    fn expect(&self, expected: ElementType) -> BsonResult<()> {
        if self.current != expected {
            return Err(BsonError::type_mismatch(expected.name(), self.current.name()));
        }
        Ok(())
    }

    /// int32/int64 统一读成 i64
    fn read_integer(&mut self, expected: ElementType) -> BsonResult<i64> {
        match self.current {
            ElementType::Int32 => self.reader.read_i32().map(i64::from),
            ElementType::Int64 => self.reader.read_i64(),
            other => Err(BsonError::type_mismatch(expected.name(), other.name())),
        }
    }

    fn read_narrow<T: TryFrom<i64>>(&mut self, expected: ElementType, target: &str) -> BsonResult<T> {
        let n = self.read_integer(expected)?;
        T::try_from(n)
            .map_err(|_| BsonError::NumericOverflow(format!("{} does not fit in {}", n, target)))
    }

    fn read_str(&mut self) -> BsonResult<&'de str> {
        self.expect(ElementType::String)?;
        self.reader.read_str()
    }

    fn read_binary(&mut self) -> BsonResult<&'de [u8]> {
        self.expect(ElementType::Binary)?;
        let len = self.reader.read_i32()?;
        if len < 0 {
            return Err(BsonError::malformed(format!("invalid binary length {}", len)));
        }
        BinarySubtype::from_u8(self.reader.read_u8()?)?;
        self.reader.read_bytes(len as usize)
    }

    /// 读取下一个元素头并设置当前类型，遇到终止符返回 None
    ///
    /// 终止符必须恰好位于 `end - 1`。
    fn next_element(&mut self, end: usize) -> BsonResult<Option<&'de [u8]>> {
        let pos = self.reader.position();
        if pos + 1 == end {
            return match self.reader.read_u8()? {
                0 => Ok(None),
                _ => Err(BsonError::malformed("document is not null-terminated")),
            };
        }
        if pos >= end {
            return Err(BsonError::malformed(
                "element runs past the declared document size",
            ));
        }
        let tag = self.reader.read_u8()?;
        if tag == 0 {
            return Err(BsonError::malformed(
                "terminator found before the declared document size",
            ));
        }
        self.current = ElementType::parse(tag)?;
        self.reader.read_cstr().map(Some)
    }

    fn deserialize_special<V: Visitor<'de>>(
        &mut self,
        kind: SpecialKind,
        visitor: V,
    ) -> BsonResult<V::Value> {
        self.expect(kind.element_type())?;
        let start = self.reader.position();
        wire::skip_value(&mut self.reader, self.current)?;
        let payload = self.reader.span_from(start);
        match kind {
            SpecialKind::Binary => {
                BinarySubtype::from_u8(payload[4])?;
                visitor.visit_borrowed_bytes(payload)
            }
            SpecialKind::RawString => {
                let body = Reader::new(payload).read_string_bytes()?;
                if self.config.validate_utf8 {
                    std::str::from_utf8(body)?;
                }
                visitor.visit_borrowed_bytes(body)
            }
            SpecialKind::JavaScriptCode => {
                let code = Reader::new(payload).read_str()?;
                visitor.visit_borrowed_bytes(code.as_bytes())
            }
            SpecialKind::Regex => {
                let mut reader = Reader::new(payload);
                std::str::from_utf8(reader.read_cstr()?)?;
                std::str::from_utf8(reader.read_cstr()?)?;
                visitor.visit_borrowed_bytes(payload)
            }
            _ => visitor.visit_borrowed_bytes(payload),
        }
    }

    fn visit_document<V: Visitor<'de>>(&mut self, visitor: V) -> BsonResult<V::Value> {
        let end = self.reader.read_frame_header()?;
        let mut access = DocumentAccess::new(self, end);
        let value = visitor.visit_map(&mut access)?;
        access.finish()?;
        Ok(value)
    }

    fn visit_array<V: Visitor<'de>>(&mut self, visitor: V) -> BsonResult<V::Value> {
        let end = self.reader.read_frame_header()?;
        let mut access = DocumentAccess::new(self, end);
        let value = visitor.visit_seq(&mut access)?;
        access.finish()?;
        Ok(value)
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        match self.current {
            ElementType::Double => visitor.visit_f64(self.reader.read_f64()?),
            ElementType::String => visitor.visit_borrowed_str(self.reader.read_str()?),
            ElementType::EmbeddedDocument => self.visit_document(visitor),
            ElementType::Array => self.visit_array(visitor),
            ElementType::Binary => visitor.visit_borrowed_bytes(self.read_binary()?),
            ElementType::ObjectId => {
                visitor.visit_borrowed_bytes(self.reader.read_bytes(OBJECT_ID_LEN)?)
            }
            ElementType::Boolean => visitor.visit_bool(codec::read_bool(&mut self.reader)?),
            ElementType::DateTime => visitor.visit_i64(self.reader.read_i64()?),
            ElementType::Null | ElementType::MaxKey | ElementType::MinKey => visitor.visit_unit(),
            ElementType::RegularExpression => self.deserialize_special(SpecialKind::Regex, visitor),
            ElementType::JavaScriptCode => visitor.visit_borrowed_str(self.reader.read_str()?),
            ElementType::JavaScriptCodeWithScope => Err(BsonError::InvalidType(
                "javascript with scope is not supported".to_string(),
            )),
            ElementType::Int32 => visitor.visit_i32(self.reader.read_i32()?),
            ElementType::Timestamp => visitor.visit_u64(self.reader.read_u64()?),
            ElementType::Int64 => visitor.visit_i64(self.reader.read_i64()?),
            ElementType::Decimal128 => {
                visitor.visit_borrowed_bytes(self.reader.read_bytes(crate::spec::DECIMAL128_LEN)?)
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::Boolean)?;
        visitor.visit_bool(codec::read_bool(&mut self.reader)?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_i8(self.read_narrow(ElementType::Int32, "i8")?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_i16(self.read_narrow(ElementType::Int32, "i16")?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_i32(self.read_narrow(ElementType::Int32, "int32")?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_i64(self.read_integer(ElementType::Int64)?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_u8(self.read_narrow(ElementType::Int32, "u8")?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_u16(self.read_narrow(ElementType::Int32, "u16")?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_u32(self.read_narrow(ElementType::Int64, "u32")?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_u64(self.read_narrow(ElementType::Int64, "u64")?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::Double)?;
        visitor.visit_f32(self.reader.read_f64()? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::Double)?;
        visitor.visit_f64(self.reader.read_f64()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_borrowed_str(self.read_str()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        visitor.visit_borrowed_bytes(self.read_binary()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        if self.current == ElementType::Null {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::Null)?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> BsonResult<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> BsonResult<V::Value> {
        match SpecialKind::from_name(name) {
            Some(kind) => self.deserialize_special(kind, visitor),
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::Array)?;
        self.visit_array(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> BsonResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> BsonResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.expect(ElementType::EmbeddedDocument)?;
        self.visit_document(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> BsonResult<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> BsonResult<V::Value> {
        match self.current {
            ElementType::String => {
                let variant = self.reader.read_str()?;
                visitor.visit_enum(BorrowedStrDeserializer::<BsonError>::new(variant))
            }
            ElementType::EmbeddedDocument => {
                let end = self.reader.read_frame_header()?;
                visitor.visit_enum(VariantAccess { de: self, end })
            }
            other => Err(BsonError::type_mismatch("string or document", other.name())),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        wire::skip_value(&mut self.reader, self.current)?;
        visitor.visit_unit()
    }
}

/// 文档/数组的逐元素访问
struct DocumentAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    end: usize,
    done: bool,
}

impl<'a, 'de> DocumentAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, end: usize) -> Self {
        Self {
            de,
            end,
            done: false,
        }
    }

    fn next_name(&mut self) -> BsonResult<Option<&'de [u8]>> {
        if self.done {
            return Ok(None);
        }
        let name = self.de.next_element(self.end)?;
        self.done = name.is_none();
        Ok(name)
    }

    /// 访问者提前结束时跳过剩余元素，直到终止符
    fn finish(&mut self) -> BsonResult<()> {
        while self.next_name()?.is_some() {
            IgnoredAny::deserialize(&mut *self.de)?;
        }
        Ok(())
    }
}

impl<'de> MapAccess<'de> for DocumentAccess<'_, 'de> {
    type Error = BsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> BsonResult<Option<K::Value>> {
        match self.next_name()? {
            Some(name) => seed.deserialize(KeyDeserializer { name }).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> BsonResult<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

impl<'de> SeqAccess<'de> for DocumentAccess<'_, 'de> {
    type Error = BsonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> BsonResult<Option<T::Value>> {
        match self.next_name()? {
            Some(_) => seed.deserialize(&mut *self.de).map(Some),
            None => Ok(None),
        }
    }
}

/// 单键文档形式的枚举变体：`{ 变体名: 值 }`
struct VariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    end: usize,
}

impl VariantAccess<'_, '_> {
    fn finish(&mut self) -> BsonResult<()> {
        match self.de.next_element(self.end)? {
            None => Ok(()),
            Some(_) => Err(BsonError::malformed(
                "enum document must contain exactly one field",
            )),
        }
    }
}

impl<'a, 'de> de::EnumAccess<'de> for VariantAccess<'a, 'de> {
    type Error = BsonError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> BsonResult<(V::Value, Self)> {
        let name = self.de.next_element(self.end)?.ok_or_else(|| {
            <BsonError as de::Error>::custom("expected a single-field document for an enum")
        })?;
        let variant = seed.deserialize(KeyDeserializer { name })?;
        Ok((variant, self))
    }
}

impl<'a, 'de> de::VariantAccess<'de> for VariantAccess<'a, 'de> {
    type Error = BsonError;

    fn unit_variant(mut self) -> BsonResult<()> {
        <()>::deserialize(&mut *self.de)?;
        self.finish()
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(mut self, seed: T) -> BsonResult<T::Value> {
        let value = seed.deserialize(&mut *self.de)?;
        self.finish()?;
        Ok(value)
    }

    fn tuple_variant<V: Visitor<'de>>(mut self, _len: usize, visitor: V) -> BsonResult<V::Value> {
        let value = de::Deserializer::deserialize_seq(&mut *self.de, visitor)?;
        self.finish()?;
        Ok(value)
    }

    fn struct_variant<V: Visitor<'de>>(
        mut self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> BsonResult<V::Value> {
        let value = de::Deserializer::deserialize_map(&mut *self.de, visitor)?;
        self.finish()?;
        Ok(value)
    }
}

/// 字段名反序列化器
///
/// 字段名不做 UTF-8 校验：合法时按字符串访问，否则按字节访问。
/// 整数键按十进制文本解析。
struct KeyDeserializer<'de> {
    name: &'de [u8],
}

impl<'de> KeyDeserializer<'de> {
    fn as_str(&self) -> BsonResult<&'de str> {
        Ok(std::str::from_utf8(self.name)?)
    }
}

macro_rules! parse_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
                let s = self.as_str()?;
                let n: $ty = s.parse().map_err(|_| {
                    BsonError::InvalidType(format!(
                        "field name {:?} is not a valid {}",
                        s,
                        stringify!($ty)
                    ))
                })?;
                visitor.$visit(n)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> BsonResult<V::Value> {
        match std::str::from_utf8(self.name) {
            Ok(s) => visitor.visit_borrowed_str(s),
            Err(_) => visitor.visit_borrowed_bytes(self.name),
        }
    }

    parse_key! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> BsonResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> BsonResult<V::Value> {
        visitor.visit_enum(BorrowedStrDeserializer::<BsonError>::new(self.as_str()?))
    }

    forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf option unit
        unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::ObjectId;
    use crate::ser::{to_vec, to_vec_with};
    use crate::value::{Binary, DateTime, Decimal128, MaxKey, MinKey, RawString, Regex, Timestamp};
    use crate::{doc, Document};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    fn encode(doc: &Document) -> Vec<u8> {
        doc.to_vec().unwrap()
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Address {
        city: String,
        zip: Option<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Status {
        Active,
        Suspended { reason: String },
        Scored(i32, i32),
        Tagged(String),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: ObjectId,
        name: String,
        age: u8,
        balance: f64,
        tags: Vec<String>,
        address: Address,
        status: Vec<Status>,
        scores: HashMap<String, i64>,
        nickname: Option<String>,
    }

    fn sample_user() -> User {
        let mut scores = HashMap::new();
        scores.insert("math".to_string(), 90);
        User {
            id: ObjectId::from_bytes([1; 12]),
            name: "Miku".to_string(),
            age: 16,
            balance: 39.39,
            tags: vec!["vocal".to_string(), "teal".to_string()],
            address: Address {
                city: "Sapporo".to_string(),
                zip: None,
            },
            status: vec![
                Status::Active,
                Status::Suspended {
                    reason: "rest".to_string(),
                },
                Status::Scored(1, 2),
                Status::Tagged("x".to_string()),
            ],
            scores,
            nickname: Some("diva".to_string()),
        }
    }

    #[test]
    fn test_round_trip_struct() {
        let user = sample_user();
        let bytes = to_vec(&user).unwrap();
        assert_eq!(&bytes[..4], &(bytes.len() as i32).to_le_bytes());
        let back: User = from_slice(&bytes).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_special_types_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Specials {
            bin: Binary,
            date: DateTime,
            ts: Timestamp,
            re: Regex,
            dec: Decimal128,
            max: MaxKey,
            min: MinKey,
            raw: RawString,
        }
        let value = Specials {
            bin: Binary::from_uuid(uuid::Uuid::from_bytes([7; 16])),
            date: DateTime::from_millis(1_234_567),
            ts: Timestamp::new(10, 20),
            re: Regex::new("^x", "s").unwrap(),
            dec: Decimal128::from_bytes([3; 16]),
            max: MaxKey,
            min: MinKey,
            raw: RawString::from("plain"),
        };
        let bytes = to_vec(&value).unwrap();
        let back: Specials = from_slice(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_borrowed_str() {
        #[derive(Deserialize)]
        struct Borrowed<'a> {
            name: &'a str,
        }
        let bytes = encode(&doc! { "name": "zero-copy" });
        let value: Borrowed<'_> = from_slice(&bytes).unwrap();
        assert_eq!(value.name, "zero-copy");
    }

    #[test]
    fn test_integer_coercion() {
        #[derive(Deserialize)]
        struct Narrow {
            n: i32,
        }
        #[derive(Deserialize)]
        struct Wide {
            n: i64,
        }

        let bytes = encode(&doc! { "n": 42i64 });
        assert_eq!(from_slice::<Narrow>(&bytes).unwrap().n, 42);

        let bytes = encode(&doc! { "n": 42i32 });
        assert_eq!(from_slice::<Wide>(&bytes).unwrap().n, 42);

        let bytes = encode(&doc! { "n": (i64::MAX) });
        assert!(matches!(
            from_slice::<Narrow>(&bytes),
            Err(BsonError::NumericOverflow(_))
        ));

        #[derive(Deserialize)]
        struct Small {
            #[allow(dead_code)]
            n: u8,
        }
        let bytes = encode(&doc! { "n": (-1) });
        assert!(matches!(
            from_slice::<Small>(&bytes),
            Err(BsonError::NumericOverflow(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        #[derive(Debug, Deserialize)]
        struct Float {
            #[allow(dead_code)]
            f: f64,
        }
        let bytes = encode(&doc! { "f": 1 });
        assert!(matches!(
            from_slice::<Float>(&bytes),
            Err(BsonError::TypeMismatch { expected: "double", actual: "int32" })
        ));

        #[derive(Debug, Deserialize)]
        struct Text {
            #[allow(dead_code)]
            s: String,
        }
        let bytes = encode(&doc! { "s": true });
        assert!(matches!(
            from_slice::<Text>(&bytes),
            Err(BsonError::TypeMismatch { expected: "string", actual: "boolean" })
        ));
    }

    #[test]
    fn test_unknown_fields_skipped() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Pair {
            a: i32,
            b: i32,
        }
        let bytes = encode(&doc! {
            "a": 1,
            "unknown": "x",
            "nested": { "deep": [1, 2, { "x": null }] },
            "b": 2
        });
        assert_eq!(from_slice::<Pair>(&bytes).unwrap(), Pair { a: 1, b: 2 });
    }

    #[test]
    fn test_absent_fields() {
        #[derive(Debug, Deserialize)]
        struct Required {
            #[allow(dead_code)]
            a: i32,
        }
        #[derive(Debug, PartialEq, Deserialize)]
        struct Lenient {
            #[serde(default)]
            a: i32,
            b: Option<String>,
            #[serde(default)]
            c: Vec<i32>,
        }
        let bytes = encode(&Document::new());
        assert!(matches!(
            from_slice::<Required>(&bytes),
            Err(BsonError::MissingField(ref f)) if f == "a"
        ));
        assert_eq!(
            from_slice::<Lenient>(&bytes).unwrap(),
            Lenient { a: 0, b: None, c: vec![] }
        );

        #[derive(Debug, PartialEq, Deserialize)]
        #[serde(default)]
        struct Settings {
            port: i32,
            host: String,
        }
        impl Default for Settings {
            fn default() -> Self {
                Self { port: 27017, host: "localhost".to_string() }
            }
        }
        let bytes = encode(&doc! { "host": "db" });
        assert_eq!(
            from_slice::<Settings>(&bytes).unwrap(),
            Settings { port: 27017, host: "db".to_string() }
        );
    }

    #[test]
    fn test_malformed_headers() {
        #[derive(Debug, Deserialize)]
        struct Any {}
        for bad in [
            &[4u8, 0, 0, 0, 0][..],
            &[100, 0, 0, 0, 0][..],
            &[5, 0, 0][..],
            &[5, 0, 0, 0, 9][..],
        ] {
            assert!(matches!(
                from_slice::<Any>(bad),
                Err(BsonError::MalformedDocument(_))
            ));
        }
        assert!(from_slice::<Any>(&[5, 0, 0, 0, 0]).is_ok());
    }

    #[test]
    fn test_nested_size_overrun() {
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[allow(dead_code)]
            d: HashMap<String, i32>,
        }
        // 嵌套文档声明 40 字节，超出剩余输入
        let bytes = [13, 0, 0, 0, 0x03, b'd', 0, 40, 0, 0, 0, 0, 0];
        assert!(matches!(
            from_slice::<Outer>(&bytes),
            Err(BsonError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_top_level_shape() {
        let bytes = encode(&doc! { "a": 1 });
        assert!(matches!(
            from_slice::<i32>(&bytes),
            Err(BsonError::TypeMismatch { .. })
        ));
        let map: HashMap<String, i32> = from_slice(&bytes).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_utf8_policy() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Raw {
            s: RawString,
        }
        #[derive(Debug, Deserialize)]
        struct Text {
            #[allow(dead_code)]
            s: String,
        }
        let config = CodecConfig::new().with_validate_utf8(false);
        let bytes = to_vec_with(
            &Raw {
                s: RawString::new(vec![0xFF, 0xFE, 0xFD]),
            },
            &config,
        )
        .unwrap();

        assert!(matches!(
            from_slice::<Raw>(&bytes),
            Err(BsonError::InvalidUtf8(_))
        ));
        let raw: Raw = from_slice_with(&bytes, &config).unwrap();
        assert_eq!(raw.s.as_bytes(), &[0xFF, 0xFE, 0xFD]);
        assert!(matches!(
            from_slice_with::<Text>(&bytes, &config),
            Err(BsonError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_binary_subtype_on_decode() {
        #[derive(Debug, Deserialize)]
        struct Blob {
            b: Binary,
        }
        // 子类型 0x03（遗留 UUID）可以解码
        let bytes = [13, 0, 0, 0, 0x05, b'b', 0, 0, 0, 0, 0, 0x03, 0];
        let blob: Blob = from_slice(&bytes).unwrap();
        assert_eq!(blob.b.subtype, BinarySubtype::UuidOld);

        let bytes = [13, 0, 0, 0, 0x05, b'b', 0, 0, 0, 0, 0, 0x07, 0];
        assert!(matches!(
            from_slice::<Blob>(&bytes),
            Err(BsonError::InvalidBinarySubtype(0x07))
        ));
    }

    #[test]
    fn test_integer_map_keys() {
        let mut map = HashMap::new();
        map.insert(3u32, "three".to_string());
        map.insert(40u32, "forty".to_string());
        let bytes = to_vec(&map).unwrap();
        let back: HashMap<u32, String> = from_slice(&bytes).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_enum_with_extra_field_rejected() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[allow(dead_code)]
            s: Status,
        }
        let bytes = encode(&doc! { "s": { "Tagged": "a", "extra": 1 } });
        assert!(matches!(
            from_slice::<Holder>(&bytes),
            Err(BsonError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_dynamic_and_typed_agree() {
        let user = sample_user();
        let typed = to_vec(&user).unwrap();
        let dynamic = Document::from_slice(&typed).unwrap();
        assert_eq!(dynamic.to_vec().unwrap(), typed);
    }
}
