//! # 图片缩放模块（resizer）
//!
//! ## 设计思路
//!
//! 该模块将“源图片校验 → 解码 → 几何计算 → 画布合成 → 编码 → DPI 元数据”
//! 按职责拆分为多个子模块，每个子模块只处理单张图片或单个（图片, 尺寸）组合，
//! 批次、命名与归档交给 `export`。
//!
//! - `handler`：编排单图处理流水线 + 配置管理
//! - `loader`：字节 / Data URL / 文件加载与安全校验
//! - `geometry`：适配模式 → 画布与绘制矩形（纯函数）
//! - `compositor`：背景、重采样、锐化、编码
//! - `density`：写入 300 DPI（PNG `pHYs` / JPEG JFIF），永不失败
//! - `config/options/error/source`：配置、处理选项、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! SourceImage::from_bytes（loader.rs，校验 + 头部尺寸）
//!    ↓
//! ResizeHandler::decode_source（handler.rs，完整解码为 RGBA）
//!    ↓  对每个 TargetSize：
//! Geometry::resolve（geometry.rs）
//!    ↓
//! compositor::compose → compositor::encode
//!    ↓
//! patch_density（density.rs → codec::png / codec::jpeg）
//!    ↓
//! RenderedImage
//! ```
//!
//! ## 分层职责建议
//!
//! - 适配规则变更优先改 `geometry.rs`
//! - 背景 / 透明度策略变更优先改 `options.rs`
//! - 画质问题优先看 `compositor.rs` 与重采样档位（`config.rs`）
//! - DPI 字段问题优先看 `codec` 模块

mod compositor;
mod config;
mod density;
mod error;
mod geometry;
mod handler;
mod loader;
mod options;
mod source;

pub use config::{ResamplingProfile, ResizeConfig};
pub use density::{patch_density, DensityPatch, DensityStatus, PrintDensity};
pub use error::ResizeError;
pub use geometry::{FitMode, Geometry};
pub use handler::ResizeHandler;
pub use options::{PadColor, ProcessingOptions};
pub use source::{
    Dimensions, ImageId, OutputArtifact, RasterFormat, RenderedImage, SourceImage, TargetSize,
};
