//! # 导出会话（状态机）
//!
//! ## 设计思路
//!
//! `ExportSession` 持有会话级的长期数据（源图片、尺寸目录、处理选项、命名设置），
//! 并维护批处理状态机：
//!
//! ```text
//! Idle ──export()──▶ Processing ──成功──▶ Completed ──(completed_display_ms)──▶ Idle
//!                         │
//!                         └──归档失败──▶ Error ──export()──▶ Processing
//! ```
//!
//! ## 实现思路
//!
//! - `export` 只借用 `&self`：运行期间会话数据（包括处理选项）不可修改。
//! - 状态与进度放在 `Mutex` 中，可被其他任务轮询；重复导出直接返回 `Busy`。
//! - `Completed → Idle` 在读取状态时惰性判断，不需要后台定时器。
//! - 运行中的 future 被丢弃时，守卫把状态复位为 `Idle`，避免永久卡在 `Processing`。

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;

use crate::error::AppError;
use crate::resizer::{ImageId, ProcessingOptions, ResizeError, ResizeHandler, SourceImage};

use super::archive::{ArchiveSink, ZipSink};
use super::batch::{BatchOrchestrator, BatchProgress, BatchReport, JobReport};
use super::naming::ExportOptions;
use super::sizes::SizeCatalog;

/// 归档失败时展示给用户的通用消息。
pub const GENERIC_FAILURE_MESSAGE: &str = "处理失败，请重试";

/// 批处理状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

#[derive(Debug)]
struct RunState {
    status: BatchStatus,
    progress: Option<BatchProgress>,
    completed_at: Option<Instant>,
    last_error: Option<String>,
    jobs: Vec<JobReport>,
}

impl RunState {
    fn idle() -> Self {
        Self {
            status: BatchStatus::Idle,
            progress: None,
            completed_at: None,
            last_error: None,
            jobs: Vec::new(),
        }
    }
}

/// 导出会话。
pub struct ExportSession {
    handler: ResizeHandler,
    images: Vec<(ImageId, SourceImage)>,
    next_image_id: u64,
    sizes: SizeCatalog,
    options: ProcessingOptions,
    export_options: ExportOptions,
    state: Mutex<RunState>,
}

impl Default for ExportSession {
    fn default() -> Self {
        Self::new(ResizeHandler::default())
    }
}

impl ExportSession {
    /// 创建会话；尺寸目录预置内置尺寸。
    pub fn new(handler: ResizeHandler) -> Self {
        Self {
            handler,
            images: Vec::new(),
            next_image_id: 1,
            sizes: SizeCatalog::with_builtins(),
            options: ProcessingOptions::default(),
            export_options: ExportOptions::default(),
            state: Mutex::new(RunState::idle()),
        }
    }

    pub fn handler(&self) -> &ResizeHandler {
        &self.handler
    }

    /// 校验并添加一张源图片。
    pub fn add_image(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<ImageId, ResizeError> {
        let source = self.handler.load(name, bytes)?;
        Ok(self.add_source(source))
    }

    /// 添加已校验的源图片，返回新的标识（不复用）。
    pub fn add_source(&mut self, source: SourceImage) -> ImageId {
        let id = ImageId(self.next_image_id);
        self.next_image_id += 1;
        log::info!("🖼️ 已添加图片 {} - {} ({})", id, source.name(), source.dimensions());
        self.images.push((id, source));
        id
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        let before = self.images.len();
        self.images.retain(|(image_id, _)| *image_id != id);
        self.images.len() != before
    }

    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageId, &SourceImage)> {
        self.images.iter().map(|(id, source)| (*id, source))
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn sizes(&self) -> &SizeCatalog {
        &self.sizes
    }

    pub fn sizes_mut(&mut self) -> &mut SizeCatalog {
        &mut self.sizes
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ProcessingOptions) {
        self.options = options;
    }

    pub fn export_options(&self) -> &ExportOptions {
        &self.export_options
    }

    pub fn set_export_options(&mut self, export_options: ExportOptions) {
        self.export_options = export_options;
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前状态；`Completed` 超过展示时间后视为 `Idle`。
    pub fn status(&self) -> BatchStatus {
        let display = self.completed_display();
        let mut state = self.lock_state();
        expire_completed(&mut state, display);
        state.status
    }

    fn completed_display(&self) -> Duration {
        self.handler
            .config_snapshot()
            .map(|config| Duration::from_millis(config.completed_display_ms))
            .unwrap_or_default()
    }

    /// 最近一次进度事件。
    pub fn progress(&self) -> Option<BatchProgress> {
        self.lock_state().progress.clone()
    }

    /// 最近一次失败的用户可见消息。
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// 最近一次运行的任务报告。
    pub fn jobs(&self) -> Vec<JobReport> {
        self.lock_state().jobs.clone()
    }

    /// 使用内存 zip 归档执行导出。
    pub async fn export<P>(&self, on_progress: P) -> Result<BatchReport, AppError>
    where
        P: FnMut(BatchProgress),
    {
        let mut archive = ZipSink::new();
        self.export_with(&mut archive, on_progress).await
    }

    /// 使用指定归档执行导出。
    pub async fn export_with<A, P>(
        &self,
        archive: &mut A,
        mut on_progress: P,
    ) -> Result<BatchReport, AppError>
    where
        A: ArchiveSink + ?Sized,
        P: FnMut(BatchProgress),
    {
        if self.images.is_empty() {
            return Err(AppError::InvalidRequest("请先添加图片".to_string()));
        }
        let sizes = self.sizes.selected_sizes();
        if sizes.is_empty() {
            return Err(AppError::InvalidRequest("请至少选择一个尺寸".to_string()));
        }

        // 状态检查与切换在同一次加锁内完成
        let display = self.completed_display();
        {
            let mut state = self.lock_state();
            expire_completed(&mut state, display);
            if state.status == BatchStatus::Processing {
                return Err(AppError::Busy);
            }
            state.status = BatchStatus::Processing;
            state.progress = Some(BatchProgress {
                current: 0,
                total: self.images.len() * sizes.len(),
                message: "准备中…".to_string(),
            });
            state.completed_at = None;
            state.last_error = None;
            state.jobs.clear();
        }
        let mut guard = RunGuard {
            session: self,
            finished: false,
        };

        let result = match BatchOrchestrator::new(&self.handler, &self.options, &self.export_options) {
            Ok(orchestrator) => {
                orchestrator
                    .run(&self.images, &sizes, archive, |progress| {
                        self.lock_state().progress = Some(progress.clone());
                        on_progress(progress);
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        let mut state = self.lock_state();
        guard.finished = true;
        match &result {
            Ok(report) => {
                state.status = BatchStatus::Completed;
                state.completed_at = Some(Instant::now());
                state.jobs = report.jobs.clone();
            }
            Err(e) => {
                log::error!("❌ 导出失败：{}", e);
                state.status = BatchStatus::Error;
                state.last_error = Some(GENERIC_FAILURE_MESSAGE.to_string());
            }
        }

        result
    }
}

fn expire_completed(state: &mut RunState, display: Duration) {
    if state.status == BatchStatus::Completed
        && state.completed_at.is_some_and(|at| at.elapsed() >= display)
    {
        state.status = BatchStatus::Idle;
        state.completed_at = None;
        state.progress = None;
    }
}

/// 运行中 future 被丢弃时把状态复位为 `Idle`。
struct RunGuard<'a> {
    session: &'a ExportSession,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.session.lock_state();
            log::warn!("⚠️ 导出在完成前被取消，状态复位为 Idle");
            state.status = BatchStatus::Idle;
            state.progress = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::archive::ArchiveError;
    use crate::resizer::ResizeConfig;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn session_with(config: ResizeConfig) -> ExportSession {
        let mut session = ExportSession::new(ResizeHandler::new(config));
        let sizes = session.sizes_mut();
        sizes.clear_selection();
        sizes.add_custom(12, 12).expect("custom size");
        session
    }

    fn quick_config() -> ResizeConfig {
        ResizeConfig {
            start_delay_ms: 0,
            ..ResizeConfig::default()
        }
    }

    #[tokio::test]
    async fn export_requires_images_and_sizes() {
        let mut session = session_with(quick_config());
        assert!(matches!(
            session.export(|_| {}).await,
            Err(AppError::InvalidRequest(_))
        ));

        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");
        session.sizes_mut().clear_selection();
        assert!(matches!(
            session.export(|_| {}).await,
            Err(AppError::InvalidRequest(_))
        ));
        assert_eq!(session.status(), BatchStatus::Idle);
    }

    #[tokio::test]
    async fn completed_returns_to_idle_after_display_time() {
        let mut session = session_with(ResizeConfig {
            completed_display_ms: 0,
            ..quick_config()
        });
        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");

        let report = session.export(|_| {}).await.expect("export");
        assert_eq!(report.entries.len(), 1);
        assert_eq!(session.status(), BatchStatus::Idle);
        assert!(session.progress().is_none());
    }

    #[tokio::test]
    async fn completed_is_visible_during_display_time() {
        let mut session = session_with(quick_config());
        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");

        session.export(|_| {}).await.expect("export");
        assert_eq!(session.status(), BatchStatus::Completed);
        let progress = session.progress().expect("progress");
        assert_eq!(progress.current, progress.total);
        assert_eq!(session.jobs().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_export_is_rejected_as_busy() {
        let mut session = session_with(ResizeConfig {
            start_delay_ms: 50,
            ..ResizeConfig::default()
        });
        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");

        let (first, second) = tokio::join!(session.export(|_| {}), session.export(|_| {}));
        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::Busy)));
    }

    #[tokio::test]
    async fn status_reads_processing_while_running() {
        let mut session = session_with(quick_config());
        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");

        let mut seen = Vec::new();
        session
            .export(|_| seen.push(session.status()))
            .await
            .expect("export");
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|status| *status == BatchStatus::Processing));
    }

    struct BrokenSink;

    impl ArchiveSink for BrokenSink {
        fn put(&mut self, _path: &str, _bytes: &[u8]) -> Result<(), ArchiveError> {
            Ok(())
        }

        fn finalize(&mut self) -> Result<Vec<u8>, ArchiveError> {
            Err(ArchiveError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    #[tokio::test]
    async fn archive_failure_sets_error_with_generic_message() {
        let mut session = session_with(quick_config());
        session.add_image("a.png", create_png_bytes(4, 4)).expect("add");

        let result = session.export_with(&mut BrokenSink, |_| {}).await;
        assert!(matches!(result, Err(AppError::Archive(_))));
        assert_eq!(session.status(), BatchStatus::Error);
        assert_eq!(session.last_error().as_deref(), Some(GENERIC_FAILURE_MESSAGE));

        // 错误状态下可以重新导出
        session.export(|_| {}).await.expect("retry");
        assert_eq!(session.status(), BatchStatus::Completed);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn image_ids_are_never_reused() {
        let mut session = ExportSession::default();
        let a = session.add_image("a.png", create_png_bytes(2, 2)).expect("add");
        assert!(session.remove_image(a));
        assert!(!session.remove_image(a));
        let b = session.add_image("b.png", create_png_bytes(2, 2)).expect("add");
        assert_ne!(a, b);
        assert_eq!(session.image_count(), 1);
    }
}
