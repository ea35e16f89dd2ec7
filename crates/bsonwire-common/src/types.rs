//! 公共类型定义模块
//!
//! - IdSource: ObjectId 生成所需的时间与熵来源
//! - SystemIdSource: 基于系统时钟和操作系统随机数的默认实现

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// ObjectId 生成的时间/熵来源
///
/// 编解码核心不直接读取时钟或随机数，由调用方注入。
pub trait IdSource {
    /// 当前 Unix 时间（秒）
    fn seconds(&mut self) -> u32;

    /// 用随机字节填满 `buf`
    fn fill_random(&mut self, buf: &mut [u8]);
}

/// 系统时钟 + OS 随机数
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdSource;

impl IdSource for SystemIdSource {
    fn seconds(&mut self) -> u32 {
        // 时钟早于 1970 时退化为 0
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }

    fn fill_random(&mut self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

impl<T: IdSource + ?Sized> IdSource for &mut T {
    fn seconds(&mut self) -> u32 {
        (**self).seconds()
    }

    fn fill_random(&mut self, buf: &mut [u8]) {
        (**self).fill_random(buf)
    }
}
