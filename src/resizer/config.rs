//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ResizeConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中重采样档位（quality / balanced / speed）作为高层语义，映射到底层滤镜。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `ResamplingProfile` 负责档位字符串解析与反向输出。
//! - `apply_resampling_profile` 将档位转换为具体滤镜。
//! - `infer_resampling_profile` 用于从当前配置反推档位（给界面展示状态）。
//!
//! 注意：所有档位都使用卷积滤镜，不会退化为最近邻采样。

use image::imageops::FilterType;

use super::ResizeError;

/// 图片处理配置。
///
/// 字段覆盖了加载、解码、重采样、编码与批处理节奏五个阶段。
#[derive(Debug, Clone)]
pub struct ResizeConfig {
    /// 单个源文件允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 重采样滤镜。
    pub resize_filter: FilterType,
    /// JPEG 编码质量（1~100）。
    pub jpeg_quality: u8,
    /// 批处理开始前的等待时间（毫秒），让界面先渲染“处理中”状态。
    pub start_delay_ms: u64,
    /// “已完成”状态保持时间（毫秒），之后自动回到空闲。
    pub completed_display_ms: u64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 100_000_000,
            max_decoded_bytes: 400 * 1024 * 1024,
            resize_filter: FilterType::Lanczos3,
            jpeg_quality: 95,
            start_delay_ms: 100,
            completed_display_ms: 3_000,
        }
    }
}

/// 重采样档位（面向产品/用户语义）。
///
/// - `Quality`：Lanczos3，尽量保真
/// - `Balanced`：CatmullRom
/// - `Speed`：双线性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplingProfile {
    Quality,
    Balanced,
    Speed,
}

impl ResamplingProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::resizer::ResamplingProfile;
    ///
    /// let p = ResamplingProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), bulk_resizer::resizer::ResizeError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(profile: &str) -> Result<Self, ResizeError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ResizeError::InvalidFormat(format!(
                "未知重采样档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供界面展示。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ResizeConfig {
    /// 基于当前滤镜反推档位。
    pub(crate) fn infer_resampling_profile(&self) -> ResamplingProfile {
        match self.resize_filter {
            FilterType::Lanczos3 => ResamplingProfile::Quality,
            FilterType::CatmullRom | FilterType::Gaussian => ResamplingProfile::Balanced,
            FilterType::Triangle | FilterType::Nearest => ResamplingProfile::Speed,
        }
    }

    /// 应用指定档位到实际滤镜。
    pub(crate) fn apply_resampling_profile(&mut self, profile: ResamplingProfile) {
        self.resize_filter = match profile {
            ResamplingProfile::Quality => FilterType::Lanczos3,
            ResamplingProfile::Balanced => FilterType::CatmullRom,
            ResamplingProfile::Speed => FilterType::Triangle,
        };
    }
}
