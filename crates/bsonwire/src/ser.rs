//! Serde 序列化器
//!
//! 把任意 `Serialize` 值直接写成 BSON 字节，不经过中间的动态值。
//!
//! 每个元素先写入占位的类型标记和字段名，值确定类型后回写标记字节；
//! 文档和数组的长度头先占位，结束时回填。

use crate::spec::{BinarySubtype, ElementType, SpecialKind};
use crate::wire;
use crate::{BsonError, BsonResult, CodecConfig};
use bytes::{BufMut, Bytes, BytesMut};
use serde::ser::{self, Impossible, Serialize};
use tracing::{debug, trace};

/// 序列化为字节向量
///
/// # Brief
/// 顶层值必须是结构体或映射（即文档），否则返回 `InvalidType`
///
/// # Arguments
/// * `value` - 要序列化的值
///
/// # Returns
/// 成功返回完整的 BSON 文档字节
pub fn to_vec<T: ?Sized + Serialize>(value: &T) -> BsonResult<Vec<u8>> {
    to_vec_with(value, &CodecConfig::default())
}

/// 使用指定配置序列化
pub fn to_vec_with<T: ?Sized + Serialize>(value: &T, config: &CodecConfig) -> BsonResult<Vec<u8>> {
    encode(value, config).map(|buf| buf.to_vec())
}

/// 序列化为不可变的 `Bytes`，避免再复制一次
pub fn to_bytes<T: ?Sized + Serialize>(value: &T) -> BsonResult<Bytes> {
    encode(value, &CodecConfig::default()).map(BytesMut::freeze)
}

/// 序列化到调用方提供的固定缓冲区
///
/// # Returns
/// 成功返回写入的字节数；空间不足时返回 `NoSpaceLeft`，目标缓冲区不被修改
pub fn encode_into<T: ?Sized + Serialize>(value: &T, out: &mut [u8]) -> BsonResult<usize> {
    let buf = encode(value, &CodecConfig::default())?;
    if buf.len() > out.len() {
        return Err(BsonError::NoSpaceLeft {
            need: buf.len(),
            have: out.len(),
        });
    }
    out[..buf.len()].copy_from_slice(&buf);
    Ok(buf.len())
}

fn encode<T: ?Sized + Serialize>(value: &T, config: &CodecConfig) -> BsonResult<BytesMut> {
    let mut serializer = Serializer::new(config.clone());
    value.serialize(&mut serializer)?;
    if serializer.buf.len() > serializer.estimate {
        debug!(
            estimate = serializer.estimate,
            actual = serializer.buf.len(),
            "encoder output outgrew its initial estimate"
        );
    }
    trace!(bytes = serializer.buf.len(), "serialized document");
    Ok(serializer.buf)
}

/// BSON 序列化器
pub struct Serializer {
    buf: BytesMut,
    /// 当前元素类型标记所在的偏移
    type_index: Option<usize>,
    /// 未闭合的文档/数组层数；0 表示顶层
    depth: usize,
    /// 正在写入的特殊值，由下一次 `serialize_bytes` 消费
    pending: Option<SpecialKind>,
    config: CodecConfig,
    estimate: usize,
}

impl Serializer {
    pub fn new(config: CodecConfig) -> Self {
        let estimate = config.estimate_capacity(None);
        Self {
            buf: BytesMut::with_capacity(estimate),
            type_index: None,
            depth: 0,
            pending: None,
            config,
            estimate,
        }
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    /// 回写当前元素的类型标记；顶层只接受文档
    fn update_element_type(&mut self, t: ElementType) -> BsonResult<()> {
        if self.depth == 0 {
            if t == ElementType::EmbeddedDocument {
                return Ok(());
            }
            return Err(BsonError::InvalidType(format!(
                "top-level value must be a document, got {}",
                t.name()
            )));
        }
        match self.type_index {
            Some(index) => {
                self.buf[index] = t as u8;
                Ok(())
            }
            None => Err(BsonError::malformed("value written without an element header")),
        }
    }

    /// 写入占位类型标记和字段名，类型由随后的值回写
    fn start_element(&mut self, name: &[u8]) -> BsonResult<()> {
        let index = self.buf.len();
        wire::put_element_header(&mut self.buf, ElementType::Null, name)?;
        self.type_index = Some(index);
        Ok(())
    }

    /// 开始一个文档；顶层文档按字段数预留容量
    fn begin_document(&mut self, fields: Option<usize>) -> BsonResult<usize> {
        if self.depth == 0 {
            let estimate = self.config.estimate_capacity(fields);
            if estimate > self.estimate {
                self.buf.reserve(estimate);
                self.estimate = estimate;
            }
        }
        self.update_element_type(ElementType::EmbeddedDocument)?;
        self.depth += 1;
        Ok(wire::begin_document(&mut self.buf))
    }

    fn begin_array(&mut self) -> BsonResult<usize> {
        self.update_element_type(ElementType::Array)?;
        self.depth += 1;
        Ok(wire::begin_document(&mut self.buf))
    }

    /// 回填长度头；最外层文档结束时清空元素游标，下一个顶层值从头开始
    fn end_document(&mut self, start: usize) -> BsonResult<()> {
        wire::end_document(&mut self.buf, start)?;
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.type_index = None;
            self.pending = None;
        }
        Ok(())
    }

    fn write_special(&mut self, kind: SpecialKind, payload: &[u8]) -> BsonResult<()> {
        self.update_element_type(kind.element_type())?;
        match kind {
            SpecialKind::Binary => {
                let subtype = payload
                    .get(4)
                    .copied()
                    .ok_or_else(|| BsonError::malformed("binary payload is missing its subtype"))?;
                BinarySubtype::from_u8(subtype)?.check_encodable()?;
                self.buf.put_slice(payload);
            }
            SpecialKind::RawString => {
                if self.config.validate_utf8 {
                    std::str::from_utf8(payload)?;
                }
                wire::put_string(&mut self.buf, payload)?;
            }
            SpecialKind::JavaScriptCode => wire::put_string(&mut self.buf, payload)?,
            _ => self.buf.put_slice(payload),
        }
        Ok(())
    }
}

impl<'a> ser::Serializer for &'a mut Serializer {
    type Ok = ();
    type Error = BsonError;
    type SerializeSeq = ArraySerializer<'a>;
    type SerializeTuple = ArraySerializer<'a>;
    type SerializeTupleStruct = ArraySerializer<'a>;
    type SerializeTupleVariant = VariantSerializer<'a>;
    type SerializeMap = DocumentSerializer<'a>;
    type SerializeStruct = DocumentSerializer<'a>;
    type SerializeStructVariant = VariantSerializer<'a>;

    fn serialize_bool(self, v: bool) -> BsonResult<()> {
        self.update_element_type(ElementType::Boolean)?;
        self.buf.put_u8(v as u8);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> BsonResult<()> {
        self.serialize_i32(v as i32)
    }

    fn serialize_i16(self, v: i16) -> BsonResult<()> {
        self.serialize_i32(v as i32)
    }

    fn serialize_i32(self, v: i32) -> BsonResult<()> {
        self.update_element_type(ElementType::Int32)?;
        self.buf.put_i32_le(v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> BsonResult<()> {
        self.update_element_type(ElementType::Int64)?;
        self.buf.put_i64_le(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> BsonResult<()> {
        self.serialize_i32(v as i32)
    }

    fn serialize_u16(self, v: u16) -> BsonResult<()> {
        self.serialize_i32(v as i32)
    }

    fn serialize_u32(self, v: u32) -> BsonResult<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u64(self, v: u64) -> BsonResult<()> {
        let v = i64::try_from(v)
            .map_err(|_| BsonError::NumericOverflow(format!("{} does not fit in int64", v)))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> BsonResult<()> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> BsonResult<()> {
        self.update_element_type(ElementType::Double)?;
        self.buf.put_f64_le(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> BsonResult<()> {
        self.serialize_str(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, v: &str) -> BsonResult<()> {
        self.update_element_type(ElementType::String)?;
        wire::put_string(&mut self.buf, v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> BsonResult<()> {
        if let Some(kind) = self.pending.take() {
            return self.write_special(kind, v);
        }
        if v.len() > i32::MAX as usize {
            return Err(BsonError::DocumentTooLarge(v.len()));
        }
        self.update_element_type(ElementType::Binary)?;
        self.buf.put_i32_le(v.len() as i32);
        self.buf.put_u8(BinarySubtype::Generic.to_u8());
        self.buf.put_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> BsonResult<()> {
        self.serialize_unit()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> BsonResult<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> BsonResult<()> {
        self.update_element_type(ElementType::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> BsonResult<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> BsonResult<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> BsonResult<()> {
        self.pending = SpecialKind::from_name(name);
        let result = value.serialize(&mut *self);
        self.pending = None;
        result
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> BsonResult<()> {
        let start = self.begin_document(Some(1))?;
        self.start_element(variant.as_bytes())?;
        value.serialize(&mut *self)?;
        self.end_document(start)
    }

    fn serialize_seq(self, _len: Option<usize>) -> BsonResult<Self::SerializeSeq> {
        let start = self.begin_array()?;
        Ok(ArraySerializer {
            ser: self,
            start,
            index: 0,
        })
    }

    fn serialize_tuple(self, len: usize) -> BsonResult<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> BsonResult<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeTupleVariant> {
        let outer = self.begin_document(Some(1))?;
        self.start_element(variant.as_bytes())?;
        let inner = self.begin_array()?;
        Ok(VariantSerializer {
            ser: self,
            outer,
            inner,
            index: 0,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> BsonResult<Self::SerializeMap> {
        let start = self.begin_document(len)?;
        Ok(DocumentSerializer { ser: self, start })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> BsonResult<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeStructVariant> {
        let outer = self.begin_document(Some(1))?;
        self.start_element(variant.as_bytes())?;
        let inner = self.begin_document(None)?;
        Ok(VariantSerializer {
            ser: self,
            outer,
            inner,
            index: 0,
        })
    }
}

/// 数组：元素名依次为 "0","1",...
pub struct ArraySerializer<'a> {
    ser: &'a mut Serializer,
    start: usize,
    index: usize,
}

impl ArraySerializer<'_> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        self.ser.start_element(self.index.to_string().as_bytes())?;
        value.serialize(&mut *self.ser)?;
        self.index += 1;
        Ok(())
    }

    fn finish(self) -> BsonResult<()> {
        self.ser.end_document(self.start)
    }
}

impl ser::SerializeSeq for ArraySerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        self.push(value)
    }

    fn end(self) -> BsonResult<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for ArraySerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        self.push(value)
    }

    fn end(self) -> BsonResult<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for ArraySerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        self.push(value)
    }

    fn end(self) -> BsonResult<()> {
        self.finish()
    }
}

/// 文档：结构体字段或映射条目
pub struct DocumentSerializer<'a> {
    ser: &'a mut Serializer,
    start: usize,
}

impl ser::SerializeMap for DocumentSerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> BsonResult<()> {
        key.serialize(KeySerializer { ser: &mut *self.ser })
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> BsonResult<()> {
        self.ser.end_document(self.start)
    }
}

impl ser::SerializeStruct for DocumentSerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> BsonResult<()> {
        self.ser.start_element(key.as_bytes())?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> BsonResult<()> {
        self.ser.end_document(self.start)
    }
}

/// 元组/结构体枚举变体：`{ 变体名: [..] }` 或 `{ 变体名: {..} }`
pub struct VariantSerializer<'a> {
    ser: &'a mut Serializer,
    outer: usize,
    inner: usize,
    index: usize,
}

impl VariantSerializer<'_> {
    fn finish(self) -> BsonResult<()> {
        self.ser.end_document(self.inner)?;
        self.ser.end_document(self.outer)
    }
}

impl ser::SerializeTupleVariant for VariantSerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> BsonResult<()> {
        self.ser.start_element(self.index.to_string().as_bytes())?;
        value.serialize(&mut *self.ser)?;
        self.index += 1;
        Ok(())
    }

    fn end(self) -> BsonResult<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for VariantSerializer<'_> {
    type Ok = ();
    type Error = BsonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> BsonResult<()> {
        self.ser.start_element(key.as_bytes())?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> BsonResult<()> {
        self.finish()
    }
}

/// 映射键序列化器：字符串、字符和整数键直接写成字段名
struct KeySerializer<'a> {
    ser: &'a mut Serializer,
}

fn key_must_be_string() -> BsonError {
    BsonError::InvalidType("map key must be a string or an integer".to_string())
}

impl KeySerializer<'_> {
    fn write_integer(self, v: impl std::fmt::Display) -> BsonResult<()> {
        self.ser.start_element(v.to_string().as_bytes())
    }
}

impl ser::Serializer for KeySerializer<'_> {
    type Ok = ();
    type Error = BsonError;
    type SerializeSeq = Impossible<(), BsonError>;
    type SerializeTuple = Impossible<(), BsonError>;
    type SerializeTupleStruct = Impossible<(), BsonError>;
    type SerializeTupleVariant = Impossible<(), BsonError>;
    type SerializeMap = Impossible<(), BsonError>;
    type SerializeStruct = Impossible<(), BsonError>;
    type SerializeStructVariant = Impossible<(), BsonError>;

    fn serialize_bool(self, _v: bool) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_i8(self, v: i8) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_i16(self, v: i16) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_i32(self, v: i32) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_i64(self, v: i64) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_u8(self, v: u8) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_u16(self, v: u16) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_u32(self, v: u32) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_u64(self, v: u64) -> BsonResult<()> {
        self.write_integer(v)
    }

    fn serialize_f32(self, _v: f32) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_f64(self, _v: f64) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_char(self, v: char) -> BsonResult<()> {
        self.ser.start_element(v.encode_utf8(&mut [0u8; 4]).as_bytes())
    }

    fn serialize_str(self, v: &str) -> BsonResult<()> {
        self.ser.start_element(v.as_bytes())
    }

    fn serialize_bytes(self, _v: &[u8]) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_none(self) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_unit(self) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> BsonResult<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> BsonResult<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> BsonResult<()> {
        Err(key_must_be_string())
    }

    fn serialize_seq(self, _len: Option<usize>) -> BsonResult<Self::SerializeSeq> {
        Err(key_must_be_string())
    }

    fn serialize_tuple(self, _len: usize) -> BsonResult<Self::SerializeTuple> {
        Err(key_must_be_string())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeTupleStruct> {
        Err(key_must_be_string())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeTupleVariant> {
        Err(key_must_be_string())
    }

    fn serialize_map(self, _len: Option<usize>) -> BsonResult<Self::SerializeMap> {
        Err(key_must_be_string())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeStruct> {
        Err(key_must_be_string())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> BsonResult<Self::SerializeStructVariant> {
        Err(key_must_be_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawDocument;
    use crate::value::{Binary, RawString};
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_simple_struct_bytes() {
        let bytes = to_vec(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(
            bytes,
            [
                19, 0, 0, 0, //
                0x10, b'x', 0, 1, 0, 0, 0, //
                0x10, b'y', 0, 2, 0, 0, 0, //
                0,
            ]
        );
    }

    #[test]
    fn test_empty_struct() {
        #[derive(Serialize)]
        struct Empty {}
        assert_eq!(to_vec(&Empty {}).unwrap(), [5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_top_level_must_be_document() {
        for result in [to_vec(&5i32), to_vec(&"text"), to_vec(&vec![1, 2]), to_vec(&())] {
            assert!(matches!(result, Err(BsonError::InvalidType(_))));
        }
    }

    #[test]
    fn test_integer_widths() {
        #[derive(Serialize)]
        struct Widths {
            a: i8,
            b: u16,
            c: u32,
            d: i64,
            e: u64,
        }
        let bytes = to_vec(&Widths { a: -1, b: 7, c: 7, d: 7, e: 7 }).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        let types: Vec<ElementType> = doc.iter().map(|e| e.unwrap().element_type()).collect();
        assert_eq!(
            types,
            vec![
                ElementType::Int32,
                ElementType::Int32,
                ElementType::Int64,
                ElementType::Int64,
                ElementType::Int64,
            ]
        );
    }

    #[test]
    fn test_u64_overflow() {
        #[derive(Serialize)]
        struct Big {
            n: u64,
        }
        assert!(matches!(
            to_vec(&Big { n: u64::MAX }),
            Err(BsonError::NumericOverflow(_))
        ));
        assert!(to_vec(&Big { n: i64::MAX as u64 }).is_ok());
    }

    #[test]
    fn test_option_and_unit() {
        #[derive(Serialize)]
        struct Maybe {
            a: Option<i32>,
            b: Option<i32>,
            c: (),
        }
        let bytes = to_vec(&Maybe { a: None, b: Some(3), c: () }).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        assert!(doc.is_null("a").unwrap());
        assert_eq!(doc.get_i32("b").unwrap(), 3);
        assert!(doc.is_null("c").unwrap());
    }

    #[test]
    fn test_enum_shapes() {
        #[derive(Serialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect(i32, i32),
            Named { w: i32 },
        }
        #[derive(Serialize)]
        struct Holder {
            shapes: Vec<Shape>,
        }
        let holder = Holder {
            shapes: vec![
                Shape::Empty,
                Shape::Circle(1.5),
                Shape::Rect(2, 3),
                Shape::Named { w: 4 },
            ],
        };
        let bytes = to_vec(&holder).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        let shapes = doc.get_array("shapes").unwrap();
        assert_eq!(shapes.get_str(0).unwrap(), "Empty");
        assert_eq!(shapes.get_document(1).unwrap().get_f64("Circle").unwrap(), 1.5);
        let rect = shapes.get_document(2).unwrap();
        let rect = rect.get_array("Rect").unwrap();
        assert_eq!(rect.get_i32(1).unwrap(), 3);
        let named = shapes.get_document(3).unwrap();
        assert_eq!(named.get_document("Named").unwrap().get_i32("w").unwrap(), 4);
    }

    #[test]
    fn test_sequence_index_names() {
        #[derive(Serialize)]
        struct List {
            items: Vec<&'static str>,
        }
        let bytes = to_vec(&List { items: vec!["a", "b", "c"] }).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        let names: Vec<String> = doc
            .get_array("items")
            .unwrap()
            .iter()
            .map(|e| e.unwrap().name().into_owned())
            .collect();
        assert_eq!(names, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(2u32, "two");
        map.insert(10u32, "ten");
        let bytes = to_vec(&map).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        assert_eq!(doc.get_str("2").unwrap(), "two");
        assert_eq!(doc.get_str("10").unwrap(), "ten");

        let mut bad = BTreeMap::new();
        bad.insert("a\0b".to_string(), 1);
        assert!(matches!(to_vec(&bad), Err(BsonError::InvalidFieldName(_))));

        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        assert!(matches!(to_vec(&bad), Err(BsonError::InvalidType(_))));
    }

    #[test]
    fn test_raw_string_validation() {
        #[derive(Serialize)]
        struct Text {
            s: RawString,
        }
        let text = Text {
            s: RawString::new(vec![0xFF, 0xFE, 0xFD]),
        };
        assert!(matches!(to_vec(&text), Err(BsonError::InvalidUtf8(_))));

        let config = CodecConfig::new().with_validate_utf8(false);
        let bytes = to_vec_with(&text, &config).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap().with_config(config);
        assert_eq!(doc.get_raw_string("s").unwrap().as_bytes(), &[0xFF, 0xFE, 0xFD]);
    }

    #[test]
    fn test_binary_subtypes() {
        #[derive(Serialize)]
        struct Blob {
            b: Binary,
        }
        let ok = Blob {
            b: Binary::new(BinarySubtype::Md5, vec![0; 16]),
        };
        let bytes = to_vec(&ok).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        assert_eq!(doc.get_binary("b").unwrap(), ok.b);

        let legacy = Blob {
            b: Binary::new(BinarySubtype::BinaryOld, vec![1]),
        };
        assert!(matches!(
            to_vec(&legacy),
            Err(BsonError::InvalidBinarySubtype(0x02))
        ));

        #[derive(Serialize)]
        struct Raw<'a> {
            #[serde(with = "serde_bytes_like")]
            b: &'a [u8],
        }
        mod serde_bytes_like {
            pub fn serialize<S: serde::Serializer>(v: &&[u8], s: S) -> Result<S::Ok, S::Error> {
                s.serialize_bytes(v)
            }
        }
        let bytes = to_vec(&Raw { b: &[1, 2] }).unwrap();
        let doc = RawDocument::from_slice(&bytes).unwrap();
        assert_eq!(
            doc.get_binary("b").unwrap(),
            Binary::new(BinarySubtype::Generic, vec![1, 2])
        );
    }

    #[test]
    fn test_encode_into() {
        let mut out = [0u8; 64];
        let n = encode_into(&Point { x: 1, y: 2 }, &mut out).unwrap();
        assert_eq!(n, 19);
        assert_eq!(&out[..n], &to_vec(&Point { x: 1, y: 2 }).unwrap()[..]);

        let mut small = [0u8; 8];
        assert!(matches!(
            encode_into(&Point { x: 1, y: 2 }, &mut small),
            Err(BsonError::NoSpaceLeft { need: 19, have: 8 })
        ));
        assert_eq!(small, [0u8; 8]);
    }

    #[test]
    fn test_deterministic_and_bytes() {
        let a = to_vec(&Point { x: 5, y: -5 }).unwrap();
        let b = to_vec(&Point { x: 5, y: -5 }).unwrap();
        assert_eq!(a, b);
        assert_eq!(&to_bytes(&Point { x: 5, y: -5 }).unwrap()[..], &a[..]);
    }

    #[test]
    fn test_serializer_reused_for_consecutive_documents() {
        #[derive(Serialize)]
        struct P {
            x: i32,
        }
        let mut serializer = Serializer::new(CodecConfig::default());
        P { x: 1 }.serialize(&mut serializer).unwrap();
        P { x: 2 }.serialize(&mut serializer).unwrap();
        let out = serializer.into_inner();
        assert_eq!(out.len(), 24);
        assert_eq!(&out[..12], &to_vec(&P { x: 1 }).unwrap()[..]);
        assert_eq!(&out[12..], &to_vec(&P { x: 2 }).unwrap()[..]);

        let mut serializer = Serializer::new(CodecConfig::default());
        P { x: 1 }.serialize(&mut serializer).unwrap();
        assert!(matches!(
            5i32.serialize(&mut serializer),
            Err(BsonError::InvalidType(_))
        ));
    }
}
