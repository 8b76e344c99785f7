//! # 批处理编排模块
//!
//! ## 设计思路
//!
//! 双层循环：外层按图片、内层按选中尺寸，顺序固定，保证进度编号与归档布局可复现。
//! 每个（图片, 尺寸）组合：渲染 → 计算路径 → 交给归档。
//!
//! 失败隔离分三级：
//! - 组合失败（几何 / 合成 / 编码）：记录到该图片的任务上，跳过该组合
//! - 图片解码失败：该图片任务标记为错误，其全部组合跳过（仍计入进度）
//! - 归档失败：中止整个批次
//!
//! ## 实现思路
//!
//! - 同一图片只完整解码一次，多个尺寸复用 RGBA；处理完该图片后立即释放。
//! - 每个组合的画布与编码字节在交给归档后即释放，不跨迭代保留。
//! - 组合之间 `yield_now`，让出执行权给宿主的其他任务（例如界面刷新）。
//! - 进度在每个组合后上报；`current` 单调不减，`total` 固定为 `图片数 × 尺寸数`，
//!   归档前额外上报一次 `current == total`。

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::AppError;
use crate::resizer::{
    DensityStatus, ImageId, OutputArtifact, ProcessingOptions, RasterFormat, ResizeConfig,
    ResizeHandler, SourceImage, TargetSize,
};

use super::archive::ArchiveSink;
use super::naming::{self, ExportOptions, UniquePaths};

/// 归档前最后一次进度消息。
pub const FINALIZING_MESSAGE: &str = "正在压缩归档…";

/// 进度事件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl BatchProgress {
    /// 0~100 的整数百分比；`total == 0` 时为 100。
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.current.min(self.total) * 100) / self.total) as u8
    }
}

/// 单张图片的任务状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error(String),
}

/// 单个组合的失败记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFailure {
    pub size: String,
    pub code: &'static str,
    pub message: String,
}

/// 单张图片的处理报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub image: ImageId,
    pub name: String,
    pub status: JobStatus,
    pub outputs: usize,
    pub failures: Vec<PairFailure>,
}

/// 已写入归档的条目（不含字节）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedEntry {
    pub path: String,
    pub format: RasterFormat,
    pub size: usize,
    pub density: DensityStatus,
}

impl From<&OutputArtifact> for ArchivedEntry {
    fn from(artifact: &OutputArtifact) -> Self {
        Self {
            path: artifact.path.clone(),
            format: artifact.format,
            size: artifact.bytes.len(),
            density: artifact.density.clone(),
        }
    }
}

/// 一次批处理的结果。
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub archive_name: String,
    pub archive: Vec<u8>,
    pub entries: Vec<ArchivedEntry>,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    /// 有组合失败或解码失败的任务数。
    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| matches!(job.status, JobStatus::Error(_)) || !job.failures.is_empty())
            .count()
    }
}

/// 批处理编排器。
///
/// 持有一次运行所需的全部参数；处理选项在整个批次内保持不变。
pub struct BatchOrchestrator<'a> {
    handler: &'a ResizeHandler,
    config: ResizeConfig,
    options: &'a ProcessingOptions,
    export: &'a ExportOptions,
}

impl<'a> BatchOrchestrator<'a> {
    /// 读取一次配置快照并创建编排器。
    pub fn new(
        handler: &'a ResizeHandler,
        options: &'a ProcessingOptions,
        export: &'a ExportOptions,
    ) -> Result<Self, AppError> {
        Ok(Self {
            handler,
            config: handler.config_snapshot()?,
            options,
            export,
        })
    }

    /// 执行批处理。
    ///
    /// 归档写入或完成失败时返回错误，不产生归档；其他失败只记录在任务报告中。
    pub async fn run<A, P>(
        &self,
        images: &[(ImageId, SourceImage)],
        sizes: &[TargetSize],
        archive: &mut A,
        mut on_progress: P,
    ) -> Result<BatchReport, AppError>
    where
        A: ArchiveSink + ?Sized,
        P: FnMut(BatchProgress),
    {
        let total = images.len() * sizes.len();
        let total_start = Instant::now();
        let mut current = 0usize;
        let mut paths = UniquePaths::new();
        let mut entries = Vec::with_capacity(total);
        let mut jobs: Vec<JobReport> = images
            .iter()
            .map(|(id, source)| JobReport {
                image: *id,
                name: source.name().to_string(),
                status: JobStatus::Pending,
                outputs: 0,
                failures: Vec::new(),
            })
            .collect();

        log::info!(
            "🚀 批处理开始 - images={} sizes={} total={} mode={} strategy={:?}",
            images.len(),
            sizes.len(),
            total,
            self.options.effective_mode().as_str(),
            self.export.folder_strategy
        );

        if self.config.start_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.start_delay_ms)).await;
        }

        for ((_, source), job) in images.iter().zip(jobs.iter_mut()) {
            job.status = JobStatus::Processing;

            let decoded = match self.handler.decode_source(source, &self.config) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::error!("❌ 图片解码失败，跳过其全部尺寸 - {}：{}", source.name(), e);
                    job.status = JobStatus::Error(e.to_string());
                    for _ in sizes {
                        current += 1;
                        on_progress(BatchProgress {
                            current,
                            total,
                            message: format!("已跳过 {}（解码失败）", source.name()),
                        });
                    }
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            for size in sizes {
                match self.handler.render(&decoded, size, self.options, &self.config) {
                    Ok(rendered) => {
                        let filename = naming::output_filename(
                            &self.export.filename_pattern,
                            &self.export.profile_name,
                            source,
                            size,
                            rendered.format,
                        );
                        let path = paths.claim(naming::output_path(
                            self.export.folder_strategy,
                            source,
                            size,
                            &filename,
                        ));
                        let artifact = OutputArtifact {
                            path,
                            bytes: rendered.bytes,
                            format: rendered.format,
                            density: rendered.density,
                        };

                        if let Err(e) = archive.put(&artifact.path, &artifact.bytes) {
                            log::error!("❌ 写入归档失败，批处理中止 - {}：{}", artifact.path, e);
                            return Err(e.into());
                        }

                        entries.push(ArchivedEntry::from(&artifact));
                        job.outputs += 1;
                    }
                    Err(e) => {
                        log::warn!("⚠️ 尺寸处理失败，已跳过 - {} → {}：{}", source.name(), size, e);
                        job.failures.push(PairFailure {
                            size: size.to_string(),
                            code: e.code(),
                            message: e.to_string(),
                        });
                    }
                }

                current += 1;
                on_progress(BatchProgress {
                    current,
                    total,
                    message: format!("正在处理 {}（{}）", source.name(), size),
                });
                tokio::task::yield_now().await;
            }

            if job.status == JobStatus::Processing {
                job.status = JobStatus::Done;
            }
        }

        on_progress(BatchProgress {
            current: total,
            total,
            message: FINALIZING_MESSAGE.to_string(),
        });

        let archive_bytes = archive.finalize().inspect_err(|e| {
            log::error!("❌ 归档完成失败，批处理中止：{}", e);
        })?;

        let report = BatchReport {
            archive_name: naming::archive_filename_today(),
            archive: archive_bytes,
            entries,
            jobs,
        };

        log::info!(
            "✅ 批处理完成 - entries={} failed_jobs={} archive={}KB total={}ms",
            report.entries.len(),
            report.failed_jobs(),
            report.archive.len() / 1024,
            total_start.elapsed().as_millis()
        );

        Ok(report)
    }
}
