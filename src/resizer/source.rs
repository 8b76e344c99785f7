//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“长期会话数据”和“单次处理的中间结果”解耦：
//! - `SourceImage` / `TargetSize`：会话内长期持有，创建后不可变
//! - `DecodedSource`：单张图片解码后的 RGBA 像素，仅在处理该图片期间存活
//! - `RenderedImage` / `OutputArtifact`：单个（图片, 尺寸）组合的产物，交给归档后即释放

use std::fmt;
use std::num::NonZeroU32;

use bytes::Bytes;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::density::DensityStatus;
use super::geometry::Geometry;
use super::ResizeError;

/// 支持的三种栅格格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Jpeg,
    Png,
    WebP,
}

impl RasterFormat {
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    /// 默认扩展名（含点）。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::WebP => ".webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// 是否带 alpha 通道。
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// 正整数宽高。零尺寸在类型层面不可表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    width: NonZeroU32,
    height: NonZeroU32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    pub fn width(self) -> u32 {
        self.width.get()
    }

    pub fn height(self) -> u32 {
        self.height.get()
    }

    /// 宽高比（width / height）。
    pub fn aspect_ratio(self) -> f64 {
        self.width() as f64 / self.height() as f64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// 会话内图片标识，单调递增且不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}", self.0)
    }
}

/// 用户上传的源图片。
///
/// 由 `loader` 创建（已完成签名、格式与尺寸校验），之后不可变。
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub(crate) name: String,
    pub(crate) bytes: Bytes,
    pub(crate) dimensions: Dimensions,
    pub(crate) format: RasterFormat,
}

impl SourceImage {
    /// 原始文件名（用于输出命名）。
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    /// 去掉最后一个扩展名的文件名；没有扩展名（或以点开头）时返回完整名称。
    pub fn basename(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// 原始扩展名（含点），没有时返回 `None`。
    pub fn extension(&self) -> Option<&str> {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < self.name.len() => Some(&self.name[idx..]),
            _ => None,
        }
    }
}

/// 输出目标尺寸。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TargetSizeRepr", into = "TargetSizeRepr")]
pub struct TargetSize {
    dimensions: Dimensions,
    label: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct TargetSizeRepr {
    width: u32,
    height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl TryFrom<TargetSizeRepr> for TargetSize {
    type Error = ResizeError;

    fn try_from(repr: TargetSizeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.width, repr.height, repr.label)
    }
}

impl From<TargetSize> for TargetSizeRepr {
    fn from(size: TargetSize) -> Self {
        Self {
            width: size.width(),
            height: size.height(),
            label: size.label,
        }
    }
}

impl TargetSize {
    /// 创建目标尺寸；宽高必须大于 0。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::resizer::TargetSize;
    ///
    /// let size = TargetSize::new(1080, 1920, Some("Instagram Story".into()))?;
    /// assert_eq!(size.folder_name(), "1080x1920-Instagram Story");
    /// assert!(TargetSize::new(0, 100, None).is_err());
    /// # Ok::<(), bulk_resizer::resizer::ResizeError>(())
    /// ```
    pub fn new(width: u32, height: u32, label: Option<String>) -> Result<Self, ResizeError> {
        let dimensions = Dimensions::new(width, height).ok_or_else(|| {
            ResizeError::InvalidSize(format!("目标尺寸必须大于 0：{}x{}", width, height))
        })?;
        let label = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        Ok(Self { dimensions, label })
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width()
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// 按尺寸分组时使用的目录名：`{w}x{h}` 或 `{w}x{h}-{label}`。
    pub fn folder_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{}-{}", self.dimensions, label),
            None => self.dimensions.to_string(),
        }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dimensions)
    }
}

/// 解码阶段输出：供多个尺寸复用的 RGBA 像素。
pub(crate) struct DecodedSource {
    pub(crate) name: String,
    pub(crate) format: RasterFormat,
    pub(crate) rgba: RgbaImage,
    pub(crate) dimensions: Dimensions,
}

/// 单个尺寸的渲染结果。
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub format: RasterFormat,
    pub geometry: Geometry,
    pub density: DensityStatus,
}

/// 写入归档的一项产物。
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub path: String,
    pub bytes: Vec<u8>,
    pub format: RasterFormat,
    pub density: DensityStatus,
}
