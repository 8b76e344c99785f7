//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义批次级统一的 `AppError` 枚举，宿主（界面 / IPC）只需要处理这一种错误。
//! 单图与单组合的错误（`ResizeError`）在批处理内部被隔离，只有以下情况会冒泡到这里：
//! - 导出前置条件不满足（没有图片 / 没有选中尺寸 / 已有批次在运行）
//! - 归档写入或完成失败
//! - 直接调用单图接口时的处理错误
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ResizeError` / `ArchiveError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于直接交给前端。

use serde::Serialize;

use crate::export::ArchiveError;
use crate::resizer::ResizeError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 解码 / 合成 / 编码）
    #[error("{0}")]
    Resize(#[from] ResizeError),

    /// 归档写入或完成失败
    #[error("生成归档失败: {0}")]
    Archive(#[from] ArchiveError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 导出前置条件不满足
    #[error("请求无效: {0}")]
    InvalidRequest(String),

    #[error("已有批处理正在运行")]
    Busy,
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&AppError::Busy).expect("serialize");
        assert_eq!(json, "\"已有批处理正在运行\"");
    }

    #[test]
    fn resize_errors_keep_their_message() {
        let err: AppError = ResizeError::InvalidSize("0x0".into()).into();
        assert_eq!(err.to_string(), "尺寸错误：0x0");
    }
}
