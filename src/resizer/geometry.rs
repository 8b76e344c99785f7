//! # 几何计算模块
//!
//! ## 设计思路
//!
//! 纯函数：`(源尺寸, 目标尺寸, 适配模式) → (画布尺寸, 绘制矩形)`。
//! 画布始终等于目标尺寸；绘制矩形始终居中，`offset = (canvas - draw) / 2`。
//!
//! - `stretch`：绘制矩形 = 画布，完全忽略源宽高比
//! - `contain` / `pad`：等比缩放至完全放入画布（取较小比例）
//! - `cover`：等比缩放至完全覆盖画布（取较大比例），偏移可为负，溢出部分由画布边界裁掉
//!
//! `pad` 与 `contain` 几何完全一致，区别只在合成阶段是否先填充背景色。

use serde::{Deserialize, Serialize};

use super::source::Dimensions;
use super::ResizeError;

/// 适配模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
    Stretch,
    Pad,
}

impl FitMode {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(mode: &str) -> Result<Self, ResizeError> {
        match mode.trim().to_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            "stretch" => Ok(Self::Stretch),
            "pad" => Ok(Self::Pad),
            other => Err(ResizeError::InvalidFormat(format!(
                "未知适配模式：{}（可选：contain / cover / stretch / pad）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Stretch => "stretch",
            Self::Pad => "pad",
        }
    }

    /// 合成前是否需要用填充色铺满画布。
    pub fn fills_background(self) -> bool {
        matches!(self, Self::Pad)
    }
}

/// 单个（源, 目标, 模式）组合的几何结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub draw_x: f64,
    pub draw_y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

impl Geometry {
    /// 计算画布与绘制矩形。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::resizer::{Dimensions, FitMode, Geometry};
    ///
    /// let src = Dimensions::new(200, 100).unwrap();
    /// let target = Dimensions::new(100, 100).unwrap();
    /// let g = Geometry::resolve(src, target, FitMode::Contain);
    /// assert_eq!((g.draw_width, g.draw_height), (100.0, 50.0));
    /// assert_eq!((g.draw_x, g.draw_y), (0.0, 25.0));
    /// ```
    pub fn resolve(source: Dimensions, target: Dimensions, mode: FitMode) -> Self {
        let canvas_width = target.width();
        let canvas_height = target.height();
        let tw = canvas_width as f64;
        let th = canvas_height as f64;

        if mode == FitMode::Stretch {
            return Self {
                canvas_width,
                canvas_height,
                draw_x: 0.0,
                draw_y: 0.0,
                draw_width: tw,
                draw_height: th,
            };
        }

        let src_ratio = source.aspect_ratio();
        let source_is_wider = src_ratio > target.aspect_ratio();

        let (draw_width, draw_height) = match mode {
            FitMode::Cover => {
                if source_is_wider {
                    ((th * src_ratio).max(tw), th)
                } else {
                    (tw, (tw / src_ratio).max(th))
                }
            }
            _ => {
                if source_is_wider {
                    (tw, (tw / src_ratio).min(th))
                } else {
                    ((th * src_ratio).min(tw), th)
                }
            }
        };

        Self {
            canvas_width,
            canvas_height,
            draw_x: (tw - draw_width) / 2.0,
            draw_y: (th - draw_height) / 2.0,
            draw_width,
            draw_height,
        }
    }

    /// 绘制矩形与画布的交集（像素对齐）：`(x, y, width, height)`。
    ///
    /// 完全落在画布外或四舍五入后为空时返回 `None`。
    pub fn visible_rect(&self) -> Option<(u32, u32, u32, u32)> {
        let left = self.draw_x.max(0.0).round();
        let top = self.draw_y.max(0.0).round();
        let right = (self.draw_x + self.draw_width)
            .min(self.canvas_width as f64)
            .round();
        let bottom = (self.draw_y + self.draw_height)
            .min(self.canvas_height as f64)
            .round();

        if right <= left || bottom <= top {
            return None;
        }

        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}
