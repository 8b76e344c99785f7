//! # 批量图片尺寸调整：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 宿主（浏览器界面 / 桌面壳）                │
//! │   上传图片 ── 选择尺寸 ── 处理选项 ── 命名设置 ── 下载       │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError> + BatchProgress 回调
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ error ────── AppError (批次级统一错误类型)             │
//! │  │                                                       │
//! │  ├─ export ───── 会话状态机 / 批处理 / 命名 / 尺寸 / 归档   │
//! │  │                                                       │
//! │  ├─ resizer ──── 加载校验 · 解码 · 几何 · 合成 · 编码       │
//! │  │   └─ density   300 DPI 元数据（永不失败）               │
//! │  │                                                       │
//! │  └─ codec ────── CRC-32 · PNG 块流 · JPEG JFIF 段          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 批次级统一错误类型 `AppError` |
//! | [`export`] | 导出会话、批处理编排、输出命名、尺寸目录、zip 归档 |
//! | [`resizer`] | 单图处理：加载校验、解码、几何计算、画布合成、编码、DPI 写入 |
//! | [`codec`] | 字节级容器元数据：CRC-32、PNG `pHYs`、JPEG JFIF 密度 |
//!
//! ## 示例
//!
//! ```rust,no_run
//! use bulk_resizer::export::ExportSession;
//!
//! # async fn demo() -> Result<(), bulk_resizer::error::AppError> {
//! let mut session = ExportSession::default();
//! session.add_image("cat.png", std::fs::read("cat.png")?)?;
//! let report = session
//!     .export(|p| println!("{}/{} {}", p.current, p.total, p.message))
//!     .await?;
//! std::fs::write(&report.archive_name, &report.archive)?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod export;
pub mod resizer;
