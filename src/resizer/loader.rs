//! # 源图片加载模块
//!
//! ## 设计思路
//!
//! 把“字节从哪里来”和“字节是否可用”分开：
//! - 来源：内存字节 / Data URL（浏览器 FileReader 产物）/ 本地路径
//! - 校验：体积上限 → 文件签名 → 格式白名单 → 头部尺寸 → 像素上限
//!
//! 只读取头部尺寸，不做完整解码；完整解码推迟到批处理真正用到该图片时。

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::source::{Dimensions, RasterFormat, SourceImage};
use super::{ResizeConfig, ResizeError};

impl SourceImage {
    /// 从内存字节创建源图片。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use bulk_resizer::resizer::{ResizeConfig, SourceImage};
    ///
    /// let bytes = std::fs::read("cat.png")?;
    /// let image = SourceImage::from_bytes("cat.png", bytes, &ResizeConfig::default())?;
    /// println!("{} {}", image.name(), image.dimensions());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        config: &ResizeConfig,
    ) -> Result<Self, ResizeError> {
        let name = name.into();
        let bytes: Bytes = bytes.into();

        if bytes.len() as u64 > config.max_file_size {
            return Err(ResizeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        validate_image_signature(&bytes)?;

        let format = image::guess_format(&bytes)
            .map_err(|e| ResizeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;
        let format = RasterFormat::from_image_format(format).ok_or_else(|| {
            ResizeError::InvalidFormat(format!(
                "不支持的图片格式：{:?}（仅支持 JPEG / PNG / WebP）",
                format
            ))
        })?;

        let (width, height) = inspect_dimensions(&bytes, format)?;
        let dimensions = Dimensions::new(width, height).ok_or_else(|| {
            ResizeError::InvalidSize(format!("图片尺寸无效：{}x{}", width, height))
        })?;
        validate_pixel_limits(config, dimensions)?;

        log::debug!(
            "📥 已载入源图片 - 名称: {} 格式: {} 尺寸: {} 体积: {}B",
            name,
            format,
            dimensions,
            bytes.len()
        );

        Ok(Self {
            name,
            bytes,
            dimensions,
            format,
        })
    }

    /// 从 Data URL 或纯 Base64 字符串创建源图片。
    pub fn from_data_url(
        name: impl Into<String>,
        data: &str,
        config: &ResizeConfig,
    ) -> Result<Self, ResizeError> {
        let bytes = parse_base64_with_limit(data, config.max_file_size)?;
        Self::from_bytes(name, bytes, config)
    }

    /// 从本地路径创建源图片，文件名取路径最后一段。
    pub fn from_file(path: impl AsRef<Path>, config: &ResizeConfig) -> Result<Self, ResizeError> {
        let path = path.as_ref();
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        let metadata = std::fs::metadata(path)
            .map_err(|e| ResizeError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(ResizeError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| ResizeError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, bytes, config)
    }
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), ResizeError> {
    if bytes.is_empty() {
        return Err(ResizeError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| ResizeError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ResizeError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 仅通过图片头信息读取宽高。
fn inspect_dimensions(bytes: &[u8], format: RasterFormat) -> Result<(u32, u32), ResizeError> {
    image::ImageReader::with_format(Cursor::new(bytes), format.to_image_format())
        .into_dimensions()
        .map_err(|e| ResizeError::Decode(format!("无法读取图片尺寸：{}", e)))
}

/// 校验像素数量是否超过配置上限。
pub(super) fn validate_pixel_limits(
    config: &ResizeConfig,
    dimensions: Dimensions,
) -> Result<(), ResizeError> {
    let pixels = dimensions.width() as u64 * dimensions.height() as u64;

    if pixels > config.max_decoded_pixels {
        return Err(ResizeError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    let estimated = pixels.saturating_mul(4);
    if estimated > config.max_decoded_bytes {
        return Err(ResizeError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> u64 {
    (base64_data.trim().len() as u64).div_ceil(4).saturating_mul(3)
}

/// 解析 Base64 输入（支持 Data URL / 纯 Base64），解码前先按估算体积拒绝超限输入。
fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, ResizeError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| ResizeError::InvalidFormat("缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload);
    if estimated_len > max_file_size {
        return Err(ResizeError::ResourceLimit(format!(
            "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
            estimated_len as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ResizeError::Decode(format!("Base64 解码失败：{}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};

    fn create_image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn loads_supported_formats_with_header_dimensions() {
        let config = ResizeConfig::default();
        for (format, expected) in [
            (ImageFormat::Png, RasterFormat::Png),
            (ImageFormat::Jpeg, RasterFormat::Jpeg),
            (ImageFormat::WebP, RasterFormat::WebP),
        ] {
            let bytes = create_image_bytes(64, 48, format);
            let image = SourceImage::from_bytes("photo", bytes, &config).expect("load should succeed");
            assert_eq!(image.format(), expected);
            assert_eq!((image.dimensions().width(), image.dimensions().height()), (64, 48));
        }
    }

    #[test]
    fn rejects_unsupported_image_format() {
        let bytes = create_image_bytes(8, 8, ImageFormat::Bmp);
        let result = SourceImage::from_bytes("icon.bmp", bytes, &ResizeConfig::default());
        assert!(matches!(result, Err(ResizeError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_non_image_payload() {
        let result = SourceImage::from_bytes("notes.txt", b"hello world".to_vec(), &ResizeConfig::default());
        assert!(matches!(result, Err(ResizeError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_oversized_file() {
        let config = ResizeConfig {
            max_file_size: 16,
            ..ResizeConfig::default()
        };
        let bytes = create_image_bytes(32, 32, ImageFormat::Png);
        let result = SourceImage::from_bytes("big.png", bytes, &config);
        assert!(matches!(result, Err(ResizeError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_too_many_pixels() {
        let config = ResizeConfig {
            max_decoded_pixels: 1_000,
            ..ResizeConfig::default()
        };
        let bytes = create_image_bytes(100, 100, ImageFormat::Png);
        let result = SourceImage::from_bytes("wide.png", bytes, &config);
        assert!(matches!(result, Err(ResizeError::ResourceLimit(_))));
    }

    #[test]
    fn loads_from_data_url() {
        let png = create_image_bytes(10, 20, ImageFormat::Png);
        let data_url = format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&png));
        let image = SourceImage::from_data_url("cat.png", &data_url, &ResizeConfig::default())
            .expect("data url should load");
        assert_eq!(image.dimensions().height(), 20);
        assert_eq!(image.bytes().as_ref(), png.as_slice());
    }

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        let result = SourceImage::from_data_url("x.png", "data:image/png,abc", &ResizeConfig::default());
        assert!(matches!(result, Err(ResizeError::InvalidFormat(_))));
    }

    #[test]
    fn base64_limit_rejects_before_decode() {
        let huge = "A".repeat(1024);
        assert!(matches!(
            parse_base64_with_limit(&huge, 32),
            Err(ResizeError::ResourceLimit(_))
        ));
    }

    #[test]
    fn missing_file_is_a_file_system_error() {
        let result = SourceImage::from_file("/definitely/not/here.png", &ResizeConfig::default());
        assert!(matches!(result, Err(ResizeError::FileSystem(_))));
    }
}
