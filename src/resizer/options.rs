//! # 处理选项
//!
//! 一次批处理只使用一份 `ProcessingOptions`，以参数形式传入流水线各阶段，
//! 流水线内部不读取任何全局状态。

use std::fmt;

use image::Rgba;
use serde::{Deserialize, Serialize};

use super::geometry::FitMode;
use super::source::RasterFormat;
use super::ResizeError;

/// 背景填充色（RGBA）。序列化为 `#rrggbb` / `#rrggbbaa`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PadColor(pub [u8; 4]);

impl PadColor {
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// 解析 `#rgb`、`#rrggbb`、`#rrggbbaa`（`#` 可省略）。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::resizer::PadColor;
    ///
    /// assert_eq!(PadColor::parse_hex("#ffffff")?, PadColor::WHITE);
    /// assert_eq!(PadColor::parse_hex("f00")?.0, [255, 0, 0, 255]);
    /// # Ok::<(), bulk_resizer::resizer::ResizeError>(())
    /// ```
    pub fn parse_hex(value: &str) -> Result<Self, ResizeError> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || ResizeError::InvalidFormat(format!("无效的颜色值：{}", value));

        if !hex.is_ascii() {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if expanded.len() == 8 { channel(6)? } else { 255 };

        Ok(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }

    pub fn rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }

    pub fn is_opaque(self) -> bool {
        self.0[3] == 255
    }
}

impl Default for PadColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for PadColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for PadColor {
    type Error = ResizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<PadColor> for String {
    fn from(color: PadColor) -> Self {
        color.to_hex()
    }
}

/// 一次批处理的全部处理选项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    pub mode: FitMode,
    /// 关闭时按 `stretch` 处理。
    pub maintain_aspect: bool,
    pub keep_transparency: bool,
    #[serde(alias = "convertJpgToPng")]
    pub force_png: bool,
    pub sharpen: bool,
    pub pad_color: PadColor,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            mode: FitMode::Contain,
            maintain_aspect: true,
            keep_transparency: true,
            force_png: false,
            sharpen: false,
            pad_color: PadColor::WHITE,
        }
    }
}

impl ProcessingOptions {
    /// 实际用于几何计算的模式。
    pub fn effective_mode(&self) -> FitMode {
        if self.maintain_aspect {
            self.mode
        } else {
            FitMode::Stretch
        }
    }

    /// 输出格式：强制 PNG 时覆盖源格式，否则保持源格式。
    pub fn output_format(&self, source: RasterFormat) -> RasterFormat {
        if self.force_png {
            RasterFormat::Png
        } else {
            source
        }
    }

    /// 画布背景色；`None` 表示保持透明。
    ///
    /// - `pad`：使用填充色（按请求的模式判断，与 `maintain_aspect` 无关）
    /// - 不保留透明度，或输出格式不支持 alpha：白色
    pub fn background(&self, output: RasterFormat) -> Option<PadColor> {
        if self.mode.fills_background() {
            return Some(self.pad_color);
        }
        if !self.keep_transparency || !output.supports_alpha() {
            return Some(PadColor::WHITE);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_hex_colors() {
        assert_eq!(PadColor::parse_hex("#000000").expect("parse").0, [0, 0, 0, 255]);
        assert_eq!(PadColor::parse_hex("#11223344").expect("parse").0, [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(PadColor([0x11, 0x22, 0x33, 0x44]).to_hex(), "#11223344");
        assert_eq!(PadColor::WHITE.to_hex(), "#ffffff");
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#12", "#12345", "#gggggg", "#ééé"] {
            assert!(PadColor::parse_hex(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn background_policy() {
        let mut options = ProcessingOptions::default();
        assert_eq!(options.background(RasterFormat::Png), None);
        assert_eq!(options.background(RasterFormat::Jpeg), Some(PadColor::WHITE));

        options.keep_transparency = false;
        assert_eq!(options.background(RasterFormat::Png), Some(PadColor::WHITE));

        options.mode = FitMode::Pad;
        options.pad_color = PadColor([0, 0, 0, 255]);
        assert_eq!(options.background(RasterFormat::WebP), Some(PadColor([0, 0, 0, 255])));
    }

    #[test]
    fn disabling_aspect_forces_stretch() {
        let options = ProcessingOptions {
            mode: FitMode::Cover,
            maintain_aspect: false,
            ..ProcessingOptions::default()
        };
        assert_eq!(options.effective_mode(), FitMode::Stretch);
    }

    #[test]
    fn pad_color_applies_even_when_stretching() {
        let options = ProcessingOptions {
            mode: FitMode::Pad,
            maintain_aspect: false,
            pad_color: PadColor([255, 0, 0, 255]),
            ..ProcessingOptions::default()
        };
        assert_eq!(options.effective_mode(), FitMode::Stretch);
        assert_eq!(options.background(RasterFormat::Png), Some(PadColor([255, 0, 0, 255])));
    }

    #[test]
    fn force_png_overrides_source_format() {
        let options = ProcessingOptions {
            force_png: true,
            ..ProcessingOptions::default()
        };
        assert_eq!(options.output_format(RasterFormat::Jpeg), RasterFormat::Png);
        assert_eq!(
            ProcessingOptions::default().output_format(RasterFormat::WebP),
            RasterFormat::WebP
        );
    }

    #[test]
    fn deserializes_browser_option_keys() {
        let json = r##"{
            "mode": "pad",
            "maintainAspect": true,
            "keepTransparency": false,
            "convertJpgToPng": true,
            "sharpen": true,
            "padColor": "#ff0000"
        }"##;
        let options: ProcessingOptions = serde_json::from_str(json).expect("deserialize");
        assert_eq!(options.mode, FitMode::Pad);
        assert!(options.force_png);
        assert!(options.sharpen);
        assert_eq!(options.pad_color.0, [255, 0, 0, 255]);
    }
}
