//! # JPEG APP0（JFIF）密度字段
//!
//! 编码器总会在文件开头写出 JFIF APP0 段，只需定长覆盖密度字段，无需调整缓冲长度。
//!
//! 段布局（相对 `FF E0` 标记）：
//!
//! ```text
//! +0  FF E0        标记
//! +2  LL LL        段长度
//! +4  4A 46 49 46 00  "JFIF\0"
//! +9  VV VV        版本
//! +11 UU           单位（0 无 / 1 dpi / 2 dpcm）
//! +12 XX XX        X 密度（BE）
//! +14 YY YY        Y 密度（BE）
//! ```

use super::CodecError;

/// SOI 标记。
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// APP0 标记第二字节。
pub const APP0: u8 = 0xE0;

/// JFIF 标识（含结尾 0）。
pub const JFIF_IDENTIFIER: [u8; 5] = *b"JFIF\0";

/// APP0 只会出现在文件开头附近，扫描窗口限定为前 100 字节。
pub const APP0_SCAN_WINDOW: usize = 100;

const IDENTIFIER_OFFSET: usize = 4;
const UNITS_OFFSET: usize = 11;
const X_DENSITY_OFFSET: usize = 12;
const Y_DENSITY_OFFSET: usize = 14;
const SEGMENT_MIN_LEN: usize = 16;

/// JFIF 密度单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnit {
    AspectOnly,
    DotsPerInch,
    DotsPerCentimeter,
}

impl DensityUnit {
    fn to_byte(self) -> u8 {
        match self {
            Self::AspectOnly => 0,
            Self::DotsPerInch => 1,
            Self::DotsPerCentimeter => 2,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::AspectOnly),
            1 => Some(Self::DotsPerInch),
            2 => Some(Self::DotsPerCentimeter),
            _ => None,
        }
    }
}

/// JFIF 密度字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JfifDensity {
    pub unit: DensityUnit,
    pub x: u16,
    pub y: u16,
}

impl JfifDensity {
    pub fn dots_per_inch(dpi: u16) -> Self {
        Self {
            unit: DensityUnit::DotsPerInch,
            x: dpi,
            y: dpi,
        }
    }
}

/// 定位 JFIF APP0 段，返回 `FF` 标记的偏移。
pub fn find_jfif_segment(bytes: &[u8]) -> Result<usize, CodecError> {
    if !bytes.starts_with(&SOI) {
        return Err(CodecError::MissingSignature("JPEG"));
    }

    let scan_end = bytes.len().min(APP0_SCAN_WINDOW);
    let marker = (SOI.len()..scan_end.saturating_sub(1))
        .find(|&i| bytes[i] == 0xFF && bytes[i + 1] == APP0)
        .ok_or(CodecError::MarkerNotFound(APP0_SCAN_WINDOW))?;

    let segment_end = marker + SEGMENT_MIN_LEN;
    if segment_end > bytes.len() {
        return Err(CodecError::Truncated {
            offset: marker,
            needed: SEGMENT_MIN_LEN,
            available: bytes.len() - marker,
        });
    }

    let identifier = &bytes[marker + IDENTIFIER_OFFSET..marker + IDENTIFIER_OFFSET + JFIF_IDENTIFIER.len()];
    if identifier != JFIF_IDENTIFIER {
        return Err(CodecError::NotJfif);
    }

    Ok(marker)
}

/// 原地覆盖单位与 X/Y 密度（共 5 字节），缓冲长度不变。
pub fn set_jfif_density(bytes: &mut [u8], density: JfifDensity) -> Result<(), CodecError> {
    let marker = find_jfif_segment(bytes)?;

    bytes[marker + UNITS_OFFSET] = density.unit.to_byte();
    bytes[marker + X_DENSITY_OFFSET..marker + X_DENSITY_OFFSET + 2]
        .copy_from_slice(&density.x.to_be_bytes());
    bytes[marker + Y_DENSITY_OFFSET..marker + Y_DENSITY_OFFSET + 2]
        .copy_from_slice(&density.y.to_be_bytes());

    Ok(())
}

pub fn read_jfif_density(bytes: &[u8]) -> Option<JfifDensity> {
    let marker = find_jfif_segment(bytes).ok()?;
    Some(JfifDensity {
        unit: DensityUnit::from_byte(bytes[marker + UNITS_OFFSET])?,
        x: u16::from_be_bytes([bytes[marker + X_DENSITY_OFFSET], bytes[marker + X_DENSITY_OFFSET + 1]]),
        y: u16::from_be_bytes([bytes[marker + Y_DENSITY_OFFSET], bytes[marker + Y_DENSITY_OFFSET + 1]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOI + JFIF APP0（72x72，无单位）+ EOI。
    fn minimal_jpeg() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x10, // APP0, len 16
            b'J', b'F', b'I', b'F', 0x00, // identifier
            0x01, 0x01, // version
            0x00, // units
            0x00, 0x48, 0x00, 0x48, // density 72x72
            0x00, 0x00, // thumbnail
            0xFF, 0xD9, // EOI
        ]
    }

    #[test]
    fn sets_300_dpi_in_place() {
        let original = minimal_jpeg();
        let mut patched = original.clone();
        set_jfif_density(&mut patched, JfifDensity::dots_per_inch(300)).expect("patch");

        assert_eq!(patched.len(), original.len());
        assert_eq!(patched[13], 1);
        assert_eq!(&patched[14..16], &[0x01, 0x2C]);
        assert_eq!(&patched[16..18], &[0x01, 0x2C]);
        assert_eq!(&patched[..13], &original[..13]);
        assert_eq!(&patched[18..], &original[18..]);
        assert_eq!(
            read_jfif_density(&patched),
            Some(JfifDensity::dots_per_inch(300))
        );
    }

    #[test]
    fn missing_soi_is_rejected() {
        let mut bytes = minimal_jpeg();
        bytes[1] = 0x00;
        assert_eq!(
            set_jfif_density(&mut bytes, JfifDensity::dots_per_inch(300)),
            Err(CodecError::MissingSignature("JPEG"))
        );
    }

    #[test]
    fn non_jfif_app0_is_rejected() {
        let mut bytes = minimal_jpeg();
        bytes[6] = b'X';
        let before = bytes.clone();
        assert_eq!(
            set_jfif_density(&mut bytes, JfifDensity::dots_per_inch(300)),
            Err(CodecError::NotJfif)
        );
        assert_eq!(bytes, before);
    }

    #[test]
    fn marker_outside_scan_window_is_not_found() {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(std::iter::repeat_n(0u8, APP0_SCAN_WINDOW));
        bytes.extend_from_slice(&minimal_jpeg()[2..]);
        assert_eq!(
            find_jfif_segment(&bytes),
            Err(CodecError::MarkerNotFound(APP0_SCAN_WINDOW))
        );
    }

    #[test]
    fn truncated_segment_is_rejected() {
        let bytes = minimal_jpeg();
        assert!(matches!(
            find_jfif_segment(&bytes[..12]),
            Err(CodecError::Truncated { .. })
        ));
    }
}
