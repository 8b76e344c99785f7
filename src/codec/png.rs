//! # PNG 块流处理
//!
//! ## 设计思路
//!
//! PNG 编码器默认不写物理分辨率，因此需要在 IHDR 之后插入 `pHYs` 块（变长拼接）。
//! 若块流中已经存在 `pHYs`，则原地改写其数据与 CRC，避免出现两个 `pHYs`。
//!
//! ## 实现思路
//!
//! - 块布局：`长度(4, BE) + 类型(4) + 数据(长度) + CRC(4, BE)`
//! - CRC 只覆盖“类型 + 数据”，不包含长度字段
//! - IHDR 永远紧跟签名，插入点 = `8 + 4 + 4 + len + 4`

use super::{read_u32_be, CodecError, Crc32};

/// PNG 文件签名。
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// 头部块类型。
pub const IHDR: [u8; 4] = *b"IHDR";

/// 物理像素尺寸块类型。
pub const PHYS: [u8; 4] = *b"pHYs";

/// `pHYs` 数据长度：X(4) + Y(4) + 单位(1)。
pub const PHYS_DATA_LEN: usize = 9;

/// 完整 `pHYs` 块长度：4 + 4 + 9 + 4。
pub const PHYS_CHUNK_LEN: usize = 4 + 4 + PHYS_DATA_LEN + 4;

/// 长度 + 类型 + CRC 的固定开销。
const CHUNK_OVERHEAD: usize = 12;

/// `pHYs` 单位字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysUnit {
    /// 仅表示纵横比。
    Unknown,
    /// 像素/米。
    Meter,
}

impl PhysUnit {
    fn to_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Meter => 1,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Unknown),
            1 => Some(Self::Meter),
            _ => None,
        }
    }
}

/// `pHYs` 块内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDimensions {
    pub x_pixels_per_unit: u32,
    pub y_pixels_per_unit: u32,
    pub unit: PhysUnit,
}

impl PhysicalDimensions {
    /// 以像素/米为单位、X/Y 相同的密度。
    pub fn per_meter(pixels_per_meter: u32) -> Self {
        Self {
            x_pixels_per_unit: pixels_per_meter,
            y_pixels_per_unit: pixels_per_meter,
            unit: PhysUnit::Meter,
        }
    }

    fn to_payload(self) -> [u8; PHYS_DATA_LEN] {
        let mut payload = [0u8; PHYS_DATA_LEN];
        payload[0..4].copy_from_slice(&self.x_pixels_per_unit.to_be_bytes());
        payload[4..8].copy_from_slice(&self.y_pixels_per_unit.to_be_bytes());
        payload[8] = self.unit.to_byte();
        payload
    }

    fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() != PHYS_DATA_LEN {
            return None;
        }
        Some(Self {
            x_pixels_per_unit: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
            y_pixels_per_unit: u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
            unit: PhysUnit::from_byte(payload[8])?,
        })
    }
}

/// 块流中的一个块（借用原始缓冲）。
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// 块在文件中的起始偏移（长度字段处）。
    pub offset: usize,
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    pub declared_crc: u32,
}

impl Chunk<'_> {
    /// 块结束偏移（不含）。
    pub fn end(&self) -> usize {
        self.offset + CHUNK_OVERHEAD + self.data.len()
    }

    pub fn crc_matches(&self) -> bool {
        Crc32::new()
            .update(&self.chunk_type)
            .update(self.data)
            .finalize()
            == self.declared_crc
    }
}

/// 签名之后的块迭代器，遇到截断的块即停止。
pub struct Chunks<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let len = read_u32_be(self.bytes, offset).ok()? as usize;
        let type_slice = self.bytes.get(offset + 4..offset + 8)?;
        let data_end = (offset + 8).checked_add(len)?;
        let data = self.bytes.get(offset + 8..data_end)?;
        let declared_crc = read_u32_be(self.bytes, data_end).ok()?;

        self.offset = data_end + 4;
        Some(Chunk {
            offset,
            chunk_type: [type_slice[0], type_slice[1], type_slice[2], type_slice[3]],
            data,
            declared_crc,
        })
    }
}

pub fn has_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// 遍历签名之后的所有块；签名不正确时返回空迭代器。
pub fn chunks(bytes: &[u8]) -> Chunks<'_> {
    let offset = if has_signature(bytes) { PNG_SIGNATURE.len() } else { bytes.len() };
    Chunks { bytes, offset }
}

/// 构建完整的块字节：长度 + 类型 + 数据 + CRC(类型 + 数据)。
pub fn build_chunk(chunk_type: [u8; 4], data: &[u8]) -> Vec<u8> {
    let crc = Crc32::new().update(&chunk_type).update(data).finalize();

    let mut chunk = Vec::with_capacity(CHUNK_OVERHEAD + data.len());
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(&chunk_type);
    chunk.extend_from_slice(data);
    chunk.extend_from_slice(&crc.to_be_bytes());
    chunk
}

/// 计算 IHDR 块的结束偏移，即新块的插入点。
pub fn header_end(bytes: &[u8]) -> Result<usize, CodecError> {
    if !has_signature(bytes) {
        return Err(CodecError::MissingSignature("PNG"));
    }

    let sig_len = PNG_SIGNATURE.len();
    let declared_len = read_u32_be(bytes, sig_len)? as usize;

    let chunk_type = bytes.get(sig_len + 4..sig_len + 8).ok_or(CodecError::Truncated {
        offset: sig_len + 4,
        needed: 4,
        available: bytes.len().saturating_sub(sig_len + 4),
    })?;
    if chunk_type != IHDR {
        return Err(CodecError::UnexpectedChunk(
            String::from_utf8_lossy(chunk_type).into_owned(),
        ));
    }

    let end = sig_len
        .checked_add(CHUNK_OVERHEAD)
        .and_then(|v| v.checked_add(declared_len))
        .ok_or(CodecError::Truncated {
            offset: sig_len,
            needed: declared_len,
            available: bytes.len(),
        })?;

    if end > bytes.len() {
        return Err(CodecError::Truncated {
            offset: sig_len,
            needed: end - sig_len,
            available: bytes.len() - sig_len,
        });
    }

    Ok(end)
}

/// 在 IHDR 之后插入一个完整块，返回新缓冲。
pub fn insert_after_header(bytes: &[u8], chunk: &[u8]) -> Result<Vec<u8>, CodecError> {
    let insert_pos = header_end(bytes)?;

    let mut out = Vec::with_capacity(bytes.len() + chunk.len());
    out.extend_from_slice(&bytes[..insert_pos]);
    out.extend_from_slice(chunk);
    out.extend_from_slice(&bytes[insert_pos..]);
    Ok(out)
}

/// 查找第一个指定类型的块。
pub fn find_chunk(bytes: &[u8], chunk_type: [u8; 4]) -> Option<Chunk<'_>> {
    chunks(bytes).find(|chunk| chunk.chunk_type == chunk_type)
}

/// 写入物理分辨率。
///
/// 已有 `pHYs` 时原地改写（长度不变），否则插入到 IHDR 之后（长度 +21）。
pub fn set_physical_dimensions(
    bytes: &[u8],
    dims: PhysicalDimensions,
) -> Result<Vec<u8>, CodecError> {
    header_end(bytes)?;
    let payload = dims.to_payload();

    let existing = find_chunk(bytes, PHYS)
        .filter(|chunk| chunk.data.len() == PHYS_DATA_LEN)
        .map(|chunk| chunk.offset);

    match existing {
        Some(offset) => {
            let mut out = bytes.to_vec();
            let rebuilt = build_chunk(PHYS, &payload);
            out[offset..offset + PHYS_CHUNK_LEN].copy_from_slice(&rebuilt);
            Ok(out)
        }
        None => insert_after_header(bytes, &build_chunk(PHYS, &payload)),
    }
}

/// 读取 `pHYs` 内容（不存在或格式异常时返回 `None`）。
pub fn read_physical_dimensions(bytes: &[u8]) -> Option<PhysicalDimensions> {
    find_chunk(bytes, PHYS).and_then(|chunk| PhysicalDimensions::from_payload(chunk.data))
}
