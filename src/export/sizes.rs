//! # 目标尺寸目录
//!
//! 内置尺寸在创建时写入，用户自定义尺寸追加在末尾。
//! 标识在会话内唯一且不复用；选中顺序始终跟随目录顺序，保证输出可复现。

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::resizer::{ResizeError, TargetSize};

/// 尺寸标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SizeId(String);

impl SizeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SizeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SizeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 内置尺寸：`(id, 宽, 高, 标签)`。
const BUILTIN_SIZES: [(&str, u32, u32, &str); 8] = [
    ("4500-5400-shirt", 4500, 5400, "POD Default"),
    ("4500-4500-shirt", 4500, 4500, "Merch Square"),
    ("def-1080", 1080, 1080, "Instagram Post"),
    ("def-story", 1080, 1920, "Instagram Story"),
    ("3000-3000-etsy", 3000, 3000, "Etsy Listing"),
    ("def-print", 2400, 3000, "8x10 Print"),
    ("2048-2048-web", 2048, 2048, "2K Resolution"),
    ("1200-1200-web", 1200, 1200, "Web Preview"),
];

/// 默认选中的内置尺寸。
pub const DEFAULT_SELECTED_SIZE: &str = "4500-5400-shirt";

const CUSTOM_LABEL: &str = "Custom";

/// 尺寸目录 + 选中状态。
#[derive(Debug, Clone)]
pub struct SizeCatalog {
    entries: Vec<(SizeId, TargetSize)>,
    selected: HashSet<SizeId>,
    next_custom: u64,
}

impl Default for SizeCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SizeCatalog {
    /// 空目录（不含内置尺寸）。
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            selected: HashSet::new(),
            next_custom: 1,
        }
    }

    /// 写入内置尺寸，并默认选中 `4500-5400-shirt`。
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        for (id, width, height, label) in BUILTIN_SIZES {
            // 内置尺寸均为正数
            if let Ok(size) = TargetSize::new(width, height, Some(label.to_string())) {
                catalog.entries.push((SizeId::new(id), size));
            }
        }
        catalog.selected.insert(SizeId::new(DEFAULT_SELECTED_SIZE));
        catalog
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SizeId, &TargetSize)> {
        self.entries.iter().map(|(id, size)| (id, size))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &SizeId) -> Option<&TargetSize> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, size)| size)
    }

    /// 添加自定义尺寸并自动选中。
    ///
    /// # 示例
    /// ```rust
    /// use bulk_resizer::export::SizeCatalog;
    ///
    /// let mut catalog = SizeCatalog::default();
    /// let id = catalog.add_custom(800, 600)?;
    /// assert_eq!(id.as_str(), "custom-800-600-1");
    /// assert!(catalog.is_selected(&id));
    /// # Ok::<(), bulk_resizer::resizer::ResizeError>(())
    /// ```
    pub fn add_custom(&mut self, width: u32, height: u32) -> Result<SizeId, ResizeError> {
        let size = TargetSize::new(width, height, Some(CUSTOM_LABEL.to_string()))?;
        let id = SizeId::new(format!("custom-{}-{}-{}", width, height, self.next_custom));
        self.next_custom += 1;

        log::info!("➕ 已添加自定义尺寸：{} ({})", id, size);

        self.entries.push((id.clone(), size));
        self.selected.insert(id.clone());
        Ok(id)
    }

    pub fn is_selected(&self, id: &SizeId) -> bool {
        self.selected.contains(id)
    }

    /// 设置选中状态；未知标识返回 `false`。
    pub fn set_selected(&mut self, id: &SizeId, selected: bool) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if selected {
            self.selected.insert(id.clone());
        } else {
            self.selected.remove(id);
        }
        true
    }

    /// 切换选中状态，返回切换后的状态；未知标识返回 `None`。
    pub fn toggle(&mut self, id: &SizeId) -> Option<bool> {
        let next = !self.is_selected(id);
        self.set_selected(id, next).then_some(next)
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// 按目录顺序返回选中的尺寸。
    pub fn selected_sizes(&self) -> Vec<TargetSize> {
        self.entries
            .iter()
            .filter(|(id, _)| self.selected.contains(id))
            .map(|(_, size)| size.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }
}
