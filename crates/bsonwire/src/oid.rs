//! ObjectId - 12 字节唯一标识符
//!
//! 格式:
//! - 前 4 字节: 时间戳(秒,大端)
//! - 后 8 字节: 随机数
//!
//! 时间与随机数由调用方通过 [`IdSource`] 注入。

use crate::spec::{SpecialKind, OBJECT_ID_LEN};
use crate::value::Payload;
use crate::{BsonError, BsonResult};
use bsonwire_common::{IdSource, SystemIdSource};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// 使用系统时钟和 OS 随机数生成
    pub fn new() -> Self {
        Self::generate(&mut SystemIdSource)
    }

    /// 使用注入的时间/熵来源生成
    pub fn generate<S: IdSource + ?Sized>(source: &mut S) -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&source.seconds().to_be_bytes());
        source.fill_random(&mut bytes[4..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// 内嵌的生成时间（秒）
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// 24 个小写十六进制字符
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 从 24 个十六进制字符解析
    ///
    /// # Brief
    /// 长度不是 24 或包含非十六进制字符时返回 `InvalidIdentifier`
    pub fn from_hex(s: &str) -> BsonResult<Self> {
        if s.len() != OBJECT_ID_LEN * 2 {
            return Err(BsonError::InvalidIdentifier(format!(
                "expected {} hex characters, got {}",
                OBJECT_ID_LEN * 2,
                s.len()
            )));
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> BsonResult<Self> {
        let arr: [u8; OBJECT_ID_LEN] = bytes.try_into().map_err(|_| {
            BsonError::InvalidIdentifier(format!("expected {} bytes, got {}", OBJECT_ID_LEN, bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = BsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SpecialKind::OBJECT_ID, &Payload(&self.0))
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectIdVisitor;

        impl<'de> Visitor<'de> for ObjectIdVisitor {
            type Value = ObjectId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an ObjectId")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(self)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                ObjectId::from_slice(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ObjectId::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_newtype_struct(SpecialKind::OBJECT_ID, ObjectIdVisitor)
    }
}
