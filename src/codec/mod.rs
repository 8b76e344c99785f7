//! # 二进制块编解码模块（codec）
//!
//! ## 设计思路
//!
//! 只做“字节级”的工作：校验和、定位、插入或改写容器内的元数据记录。
//! 不关心像素，也不依赖 `image`，便于单独测试与复用。
//!
//! - `crc`：PNG 使用的 CRC-32（ISO-HDLC，反射多项式 `0xEDB88320`）
//! - `png`：PNG 块流遍历、`pHYs` 构建与插入/改写
//! - `jpeg`：JPEG APP0（JFIF）段定位与密度字段原地改写
//!
//! ## 实现思路
//!
//! 所有偏移计算都做边界检查，失败时返回 `CodecError`，绝不 panic。
//! 是否“回退为原始字节”由上层 `resizer::density` 决定。

pub mod crc;
pub mod jpeg;
pub mod png;

pub use crc::{crc32, Crc32};

/// 容器字节解析错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("缺少文件签名：{0}")]
    MissingSignature(&'static str),

    #[error("数据在偏移 {offset} 处被截断（需要 {needed} 字节，实际 {available} 字节）")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("首个数据块不是 IHDR：{0}")]
    UnexpectedChunk(String),

    #[error("前 {0} 字节内未找到 APP0 段")]
    MarkerNotFound(usize),

    #[error("APP0 段标识不是 JFIF")]
    NotJfif,
}

/// 读取大端 `u32`，越界时返回 `Truncated`。
pub(crate) fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32, CodecError> {
    let end = offset.checked_add(4).ok_or(CodecError::Truncated {
        offset,
        needed: 4,
        available: 0,
    })?;
    let slice = bytes.get(offset..end).ok_or(CodecError::Truncated {
        offset,
        needed: 4,
        available: bytes.len().saturating_sub(offset),
    })?;
    Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
