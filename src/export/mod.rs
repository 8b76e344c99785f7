//! # 批量导出模块（export）
//!
//! ## 设计思路
//!
//! 在 `resizer` 的单图能力之上，负责“多图 × 多尺寸 → 一个归档”：
//!
//! - `session`：会话数据 + 批处理状态机（Idle / Processing / Completed / Error）
//! - `batch`：双层循环、进度上报、失败隔离
//! - `naming`：文件名模板、目录策略、归档文件名
//! - `sizes`：内置 / 自定义尺寸目录与选中状态
//! - `archive`：归档协作者接口与 zip 实现
//!
//! ## 新同事快速上手
//!
//! ```text
//! ExportSession::export
//!    ↓  前置条件 + 状态切换
//! BatchOrchestrator::run
//!    ├─ ResizeHandler::decode_source（每张图片一次）
//!    ├─ ResizeHandler::render（每个尺寸一次）
//!    ├─ naming::output_filename / output_path
//!    └─ ArchiveSink::put
//!    ↓
//! ArchiveSink::finalize → BatchReport
//! ```

mod archive;
mod batch;
mod naming;
mod session;
mod sizes;

pub use archive::{ArchiveError, ArchiveSink, ZipSink};
pub use batch::{
    ArchivedEntry, BatchOrchestrator, BatchProgress, BatchReport, JobReport, JobStatus,
    PairFailure, FINALIZING_MESSAGE,
};
pub use naming::{
    archive_filename, archive_filename_today, has_recognized_extension, output_filename,
    output_path, profile_slug, render_pattern, sanitize_component, ExportOptions, FolderStrategy,
    UniquePaths, DEFAULT_FILENAME_PATTERN, DEFAULT_PROFILE_NAME,
};
pub use session::{BatchStatus, ExportSession, GENERIC_FAILURE_MESSAGE};
pub use sizes::{SizeCatalog, SizeId, DEFAULT_SELECTED_SIZE};
