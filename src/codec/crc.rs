//! CRC-32（ISO-HDLC / PNG 变体）。
//!
//! 查表实现，表在编译期生成。

const POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// 增量 CRC-32 计算器。
///
/// PNG 块的校验范围是“类型 + 数据”，用增量方式即可避免拼接临时缓冲。
///
/// # 示例
/// ```rust
/// use bulk_resizer::codec::Crc32;
///
/// let crc = Crc32::new().update(b"1234").update(b"56789").finalize();
/// assert_eq!(crc, 0xCBF4_3926);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    #[must_use]
    pub fn update(mut self, bytes: &[u8]) -> Self {
        for &byte in bytes {
            let index = ((self.state ^ byte as u32) & 0xFF) as usize;
            self.state = CRC_TABLE[index] ^ (self.state >> 8);
        }
        self
    }

    pub const fn finalize(self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// 计算整段字节的 CRC-32。
pub fn crc32(bytes: &[u8]) -> u32 {
    Crc32::new().update(bytes).finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn matches_reference_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn matches_known_png_iend_crc() {
        // IEND 块的 CRC 在所有 PNG 中都相同
        assert_eq!(crc32(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn incremental_update_equals_one_shot() {
        let data = b"pHYs\x00\x00\x2e\xc3\x00\x00\x2e\xc3\x01";
        let split = Crc32::new().update(&data[..4]).update(&data[4..]).finalize();
        assert_eq!(split, crc32(data));
    }
}
