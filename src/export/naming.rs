//! # 输出命名模块
//!
//! ## 设计思路
//!
//! 一个输出的归档路径由三部分决定：
//! 1. 文件名模板：`{{basename}}` / `{{width}}` / `{{height}}` / `{{profile}}`
//! 2. 扩展名规则：渲染结果缺少可识别的栅格扩展名时补齐
//! 3. 目录策略：按尺寸 / 按图片 / 平铺
//!
//! 未知占位符按字面保留，方便用户发现拼写错误。
//!
//! ## 实现思路
//!
//! - 占位符用 `once_cell::sync::Lazy` 预编译的正则匹配，一次替换完成。
//! - 路径中的每一段都会把 `/` `\` 替换为 `_`，文件名无法逃逸出所在目录。
//! - 同名冲突由 `UniquePaths` 追加 `-2`、`-3`… 解决。

use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::resizer::{RasterFormat, SourceImage, TargetSize};

/// 默认文件名模板。
pub const DEFAULT_FILENAME_PATTERN: &str = "{{basename}}_{{width}}x{{height}}";

/// 默认配置名（`{{profile}}` 的取值）。
pub const DEFAULT_PROFILE_NAME: &str = "export";

/// 可识别的栅格扩展名（小写，含点）。
const RECOGNIZED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("filename token pattern is valid"));

/// 归档内的目录组织方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderStrategy {
    /// `{w}x{h}[-{label}]/文件`
    #[default]
    BySize,
    /// `{basename}/文件`
    ByImage,
    /// `文件`
    Flat,
}

/// 导出命名设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub folder_strategy: FolderStrategy,
    pub filename_pattern: String,
    pub profile_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            folder_strategy: FolderStrategy::BySize,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            profile_name: DEFAULT_PROFILE_NAME.to_string(),
        }
    }
}

/// 配置名转为文件名片段：连续空白 → `-`，转小写。
///
/// 首尾空白直接去掉，不会产生开头或结尾的 `-`。
pub fn profile_slug(profile: &str) -> String {
    profile
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// 渲染文件名模板（不含扩展名处理）。
///
/// # 示例
/// ```rust
/// use bulk_resizer::export::render_pattern;
///
/// let name = render_pattern("{{basename}}_{{width}}x{{height}}_{{oops}}", "cat", 100, 200, "My Shop");
/// assert_eq!(name, "cat_100x200_{{oops}}");
/// ```
pub fn render_pattern(pattern: &str, basename: &str, width: u32, height: u32, profile: &str) -> String {
    TOKEN_PATTERN
        .replace_all(pattern, |caps: &Captures<'_>| match &caps[1] {
            "basename" => basename.to_string(),
            "width" => width.to_string(),
            "height" => height.to_string(),
            "profile" => profile_slug(profile),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// 名称是否以可识别的栅格扩展名结尾（不区分大小写）。
pub fn has_recognized_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RECOGNIZED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// 计算输出文件名。
///
/// 渲染结果缺少可识别扩展名时：
/// - 格式已被转换：追加输出格式的默认扩展名
/// - 源文件没有扩展名：追加 `.png`
/// - 其他情况：追加源文件扩展名（保留原大小写）
pub fn output_filename(
    pattern: &str,
    profile: &str,
    source: &SourceImage,
    size: &TargetSize,
    output: RasterFormat,
) -> String {
    let rendered = render_pattern(pattern, source.basename(), size.width(), size.height(), profile);
    let rendered = sanitize_component(&rendered);

    if has_recognized_extension(&rendered) {
        return rendered;
    }

    let extension = if output != source.format() {
        output.extension()
    } else {
        match source.extension() {
            Some(ext) if has_recognized_extension(ext) => ext,
            Some(_) => output.extension(),
            None => RasterFormat::Png.extension(),
        }
    };
    format!("{}{}", rendered, extension)
}

/// 计算归档内路径（目录 + 文件名）。
pub fn output_path(
    strategy: FolderStrategy,
    source: &SourceImage,
    size: &TargetSize,
    filename: &str,
) -> String {
    match strategy {
        FolderStrategy::BySize => format!("{}/{}", sanitize_component(&size.folder_name()), filename),
        FolderStrategy::ByImage => format!("{}/{}", sanitize_component(source.basename()), filename),
        FolderStrategy::Flat => filename.to_string(),
    }
}

/// 单个路径段清洗：分隔符替换为 `_`，空段替换为 `_`。
pub fn sanitize_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned
    }
}

/// 归档文件名：`resized_images_<YYYY-MM-DD>.zip`。
pub fn archive_filename(date: NaiveDate) -> String {
    format!("resized_images_{}.zip", date.format("%Y-%m-%d"))
}

/// 以本地日期生成归档文件名。
pub fn archive_filename_today() -> String {
    archive_filename(Local::now().date_naive())
}

/// 保证批次内路径唯一：重名时在扩展名前追加 `-2`、`-3`…
#[derive(Debug, Default)]
pub struct UniquePaths {
    seen: HashSet<String>,
}

impl UniquePaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, path: String) -> String {
        if self.seen.insert(path.clone()) {
            return path;
        }

        let (stem, extension) = split_extension(&path);
        let unique = (2u32..)
            .map(|n| format!("{}-{}{}", stem, n, extension))
            .find(|candidate| !self.seen.contains(candidate))
            .unwrap_or_else(|| path.clone());

        log::debug!("📝 输出路径重名，已改名：{} → {}", path, unique);
        self.seen.insert(unique.clone());
        unique
    }
}

/// 拆分为 `(不含扩展名部分, 扩展名)`，扩展名只在最后一个路径段中查找。
fn split_extension(path: &str) -> (&str, &str) {
    let file_start = path.rfind('/').map_or(0, |idx| idx + 1);
    match path[file_start..].rfind('.') {
        Some(idx) if idx > 0 => path.split_at(file_start + idx),
        _ => (path, ""),
    }
}
