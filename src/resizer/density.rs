//! # 分辨率元数据写入模块
//!
//! ## 设计思路
//!
//! 在编码后的字节中声明固定的 300 DPI 打印分辨率：
//! - PNG：插入（或改写）`pHYs`，11811 像素/米
//! - JPEG：原地改写 JFIF APP0 的单位与密度，300 dpi
//! - 其他格式（WebP）：原样返回
//!
//! ## 实现思路
//!
//! 缺少密度标记只是外观瑕疵，像素本身仍然正确，所以这里永远不返回错误：
//! 解析失败时记录警告并回退为原始字节，结果类型中明确区分三种情况，
//! 调用方无需依赖日志判断发生了什么。

use serde::Serialize;

use crate::codec::{jpeg, png, CodecError};

use super::source::RasterFormat;

/// 英寸与米的换算：1 米 = 39.3701 英寸。
const INCHES_PER_METER: f64 = 39.3701;

/// 打印分辨率。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintDensity {
    dpi: u16,
}

impl PrintDensity {
    /// 300 DPI，流水线唯一使用的分辨率。
    pub const PRINT_300: Self = Self { dpi: 300 };

    pub const fn dots_per_inch(self) -> u16 {
        self.dpi
    }

    /// 换算为像素/米（四舍五入），300 dpi → 11811。
    pub fn pixels_per_meter(self) -> u32 {
        (self.dpi as f64 * INCHES_PER_METER).round() as u32
    }
}

/// 密度写入结果（不含字节），随产物一起上报。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum DensityStatus {
    Patched,
    /// 格式不携带密度字段，未处理。
    Skipped,
    /// 解析失败，已回退为原始字节。
    Fallback(String),
}

/// 密度写入结果。
#[derive(Debug)]
pub enum DensityPatch {
    Patched(Vec<u8>),
    Skipped(Vec<u8>),
    Fallback { bytes: Vec<u8>, error: CodecError },
}

impl DensityPatch {
    pub fn status(&self) -> DensityStatus {
        match self {
            Self::Patched(_) => DensityStatus::Patched,
            Self::Skipped(_) => DensityStatus::Skipped,
            Self::Fallback { error, .. } => DensityStatus::Fallback(error.to_string()),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Patched(bytes) | Self::Skipped(bytes) | Self::Fallback { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Patched(bytes) | Self::Skipped(bytes) | Self::Fallback { bytes, .. } => bytes,
        }
    }
}

/// 按格式写入密度标记。
///
/// # 示例
/// ```rust
/// use bulk_resizer::resizer::{patch_density, DensityStatus, PrintDensity, RasterFormat};
///
/// let truncated = vec![0x89, b'P', b'N'];
/// let patch = patch_density(truncated.clone(), RasterFormat::Png, PrintDensity::PRINT_300);
/// assert!(matches!(patch.status(), DensityStatus::Fallback(_)));
/// assert_eq!(patch.into_bytes(), truncated);
/// ```
pub fn patch_density(bytes: Vec<u8>, format: RasterFormat, density: PrintDensity) -> DensityPatch {
    let result = match format {
        RasterFormat::Png => png::set_physical_dimensions(
            &bytes,
            png::PhysicalDimensions::per_meter(density.pixels_per_meter()),
        ),
        RasterFormat::Jpeg => {
            let mut patched = bytes.clone();
            jpeg::set_jfif_density(&mut patched, jpeg::JfifDensity::dots_per_inch(density.dots_per_inch()))
                .map(|()| patched)
        }
        RasterFormat::WebP => return DensityPatch::Skipped(bytes),
    };

    match result {
        Ok(patched) => DensityPatch::Patched(patched),
        Err(error) => {
            log::warn!(
                "⚠️ 写入 {} DPI 元数据失败，保留原始字节（format={}, len={}）：{}",
                density.dots_per_inch(),
                format,
                bytes.len(),
                error
            );
            DensityPatch::Fallback { bytes, error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_300_is_11811_pixels_per_meter() {
        assert_eq!(PrintDensity::PRINT_300.pixels_per_meter(), 11811);
        assert_eq!(PrintDensity::PRINT_300.dots_per_inch(), 300);
    }

    #[test]
    fn webp_is_skipped_untouched() {
        let bytes = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
        let patch = patch_density(bytes.clone(), RasterFormat::WebP, PrintDensity::PRINT_300);
        assert_eq!(patch.status(), DensityStatus::Skipped);
        assert_eq!(patch.into_bytes(), bytes);
    }

    #[test]
    fn malformed_jpeg_falls_back_to_original() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00];
        let patch = patch_density(bytes.clone(), RasterFormat::Jpeg, PrintDensity::PRINT_300);
        assert!(matches!(
            patch,
            DensityPatch::Fallback { error: CodecError::MarkerNotFound(_), .. }
        ));
        assert_eq!(patch.bytes(), bytes.as_slice());
    }

    #[test]
    fn empty_png_falls_back_to_original() {
        let patch = patch_density(Vec::new(), RasterFormat::Png, PrintDensity::PRINT_300);
        assert!(matches!(patch.status(), DensityStatus::Fallback(_)));
        assert!(patch.into_bytes().is_empty());
    }
}
