//! # 单图处理编排模块
//!
//! ## 设计思路
//!
//! `ResizeHandler` 只负责流程编排与配置管理，不关心批次、命名与归档。
//! 单个（图片, 尺寸）组合的处理链路固定为：
//! 1. 读取配置快照
//! 2. 解码源图片为 RGBA（同一图片的多个尺寸复用）
//! 3. 计算几何
//! 4. 合成画布（背景 / 重采样 / 锐化）
//! 5. 编码
//! 6. 写入 300 DPI 元数据
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ResizeConfig>>` 支持运行时切换重采样档位。
//! - 单次批处理内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `compose/encode/patch/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use bytes::Bytes;

use super::compositor;
use super::density::{patch_density, PrintDensity};
use super::geometry::Geometry;
use super::loader::validate_pixel_limits;
use super::source::{DecodedSource, Dimensions, RenderedImage};
use super::{
    ProcessingOptions, ResamplingProfile, ResizeConfig, ResizeError, SourceImage, TargetSize,
};

/// 图片处理器。
///
/// 可在多个会话之间共享（`Clone` 只复制配置句柄）。
#[derive(Debug, Clone)]
pub struct ResizeHandler {
    pub(crate) config: Arc<RwLock<ResizeConfig>>,
}

impl Default for ResizeHandler {
    fn default() -> Self {
        Self::new(ResizeConfig::default())
    }
}

impl ResizeHandler {
    pub fn new(config: ResizeConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次批处理使用一致参数。
    pub fn config_snapshot(&self) -> Result<ResizeConfig, ResizeError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ResizeError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置重采样档位。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::resizer::{ResamplingProfile, ResizeHandler};
    ///
    /// let handler = ResizeHandler::default();
    /// handler.set_resampling_profile(ResamplingProfile::Balanced)?;
    /// assert_eq!(handler.get_resampling_profile()?, ResamplingProfile::Balanced);
    /// # Ok::<(), bulk_resizer::resizer::ResizeError>(())
    /// ```
    pub fn set_resampling_profile(&self, profile: ResamplingProfile) -> Result<(), ResizeError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ResizeError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_resampling_profile(profile);

        log::info!(
            "⚙️ 已切换重采样档位：{}（filter={:?}）",
            profile.as_str(),
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_resampling_profile(&self) -> Result<ResamplingProfile, ResizeError> {
        let config = self
            .config
            .read()
            .map_err(|_| ResizeError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_resampling_profile())
    }

    /// 按当前配置校验并载入源图片。
    pub fn load(
        &self,
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<SourceImage, ResizeError> {
        let config = self.config_snapshot()?;
        SourceImage::from_bytes(name, bytes, &config)
    }

    /// 处理单个（图片, 尺寸）组合。
    ///
    /// 批处理内部会复用解码结果；这里每次都重新解码，适合单次预览或测试。
    pub fn process(
        &self,
        source: &SourceImage,
        size: &TargetSize,
        options: &ProcessingOptions,
    ) -> Result<RenderedImage, ResizeError> {
        let config = self.config_snapshot()?;
        let decoded = self.decode_source(source, &config)?;
        self.render(&decoded, size, options, &config)
    }

    /// 完整解码源图片为 RGBA。
    pub(crate) fn decode_source(
        &self,
        source: &SourceImage,
        config: &ResizeConfig,
    ) -> Result<DecodedSource, ResizeError> {
        let decode_start = Instant::now();
        validate_pixel_limits(config, source.dimensions())?;

        let decoded =
            image::load_from_memory_with_format(source.bytes(), source.format().to_image_format())
                .map_err(|e| ResizeError::Decode(format!("图片解码失败：{}", e)))?;

        let rgba = decoded.to_rgba8();
        let dimensions = Dimensions::new(rgba.width(), rgba.height()).ok_or_else(|| {
            ResizeError::Decode(format!(
                "解码后尺寸无效：{}x{}",
                rgba.width(),
                rgba.height()
            ))
        })?;
        validate_pixel_limits(config, dimensions)?;

        log::debug!(
            "🖼️ 源图片解码完成 - 名称: {} 尺寸: {} decode={}ms",
            source.name(),
            dimensions,
            decode_start.elapsed().as_millis()
        );

        Ok(DecodedSource {
            name: source.name().to_string(),
            format: source.format(),
            rgba,
            dimensions,
        })
    }

    /// 将已解码的源图片渲染为一个目标尺寸的编码字节。
    pub(crate) fn render(
        &self,
        decoded: &DecodedSource,
        size: &TargetSize,
        options: &ProcessingOptions,
        config: &ResizeConfig,
    ) -> Result<RenderedImage, ResizeError> {
        let total_start = Instant::now();
        validate_pixel_limits(config, size.dimensions())?;

        let format = options.output_format(decoded.format);
        let background = options.background(format);
        let geometry = Geometry::resolve(decoded.dimensions, size.dimensions(), options.effective_mode());

        let compose_start = Instant::now();
        let canvas = compositor::compose(
            &decoded.rgba,
            &geometry,
            background,
            options.sharpen,
            config.resize_filter,
        )?;
        let compose_elapsed = compose_start.elapsed();

        let encode_start = Instant::now();
        let opaque = background.is_some_and(|color| color.is_opaque());
        let encoded = compositor::encode(canvas, format, opaque, config.jpeg_quality)?;
        let encode_elapsed = encode_start.elapsed();

        let patch_start = Instant::now();
        let patch = patch_density(encoded, format, PrintDensity::PRINT_300);
        let density = patch.status();
        let bytes = patch.into_bytes();
        let patch_elapsed = patch_start.elapsed();

        log::info!(
            "✅ 尺寸渲染完成 - {} → {} mode={} format={} bytes={} compose={}ms encode={}ms patch={}ms total={}ms",
            decoded.name,
            size,
            options.effective_mode().as_str(),
            format,
            bytes.len(),
            compose_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            patch_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(RenderedImage {
            bytes,
            format,
            geometry,
            density,
        })
    }
}
