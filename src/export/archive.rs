//! # 归档协作者
//!
//! 批处理只依赖 `ArchiveSink` 的两个操作：`put(path, bytes)` 与 `finalize()`。
//! 默认实现 `ZipSink` 在内存中构建 deflate 压缩的 zip。

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 归档错误。任何一次失败都会中止整个批次。
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("归档内路径重复：{0}")]
    DuplicatePath(String),

    #[error("归档已完成，不能再写入")]
    Finalized,

    #[error("zip 写入失败：{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("归档 I/O 错误：{0}")]
    Io(#[from] std::io::Error),
}

/// 接收输出产物并最终生成归档字节。
pub trait ArchiveSink {
    /// 写入一项产物。路径使用 `/` 分隔。
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// 结束写入并返回归档字节；之后的任何调用都返回 `Finalized`。
    fn finalize(&mut self) -> Result<Vec<u8>, ArchiveError>;
}

/// 内存 zip 归档。
pub struct ZipSink {
    writer: Option<ZipWriter<Cursor<Vec<u8>>>>,
    paths: HashSet<String>,
    options: SimpleFileOptions,
}

impl Default for ZipSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipSink {
    pub fn new() -> Self {
        Self {
            writer: Some(ZipWriter::new(Cursor::new(Vec::new()))),
            paths: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// 已写入的条目数。
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl ArchiveSink for ZipSink {
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let writer = self.writer.as_mut().ok_or(ArchiveError::Finalized)?;

        if !self.paths.insert(path.to_string()) {
            return Err(ArchiveError::DuplicatePath(path.to_string()));
        }

        writer.start_file(path, self.options)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let writer = self.writer.take().ok_or(ArchiveError::Finalized)?;
        let cursor = writer.finish()?;
        let bytes = cursor.into_inner();

        log::info!(
            "📦 归档完成 - entries={} size={}KB",
            self.paths.len(),
            bytes.len() / 1024
        );

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn zip_round_trips_entries() {
        let mut sink = ZipSink::new();
        sink.put("a/one.png", b"first").expect("put");
        sink.put("two.jpg", b"second").expect("put");
        assert_eq!(sink.len(), 2);

        let bytes = sink.finalize().expect("finalize");
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open zip");
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("a/one.png")
            .expect("entry")
            .read_to_string(&mut content)
            .expect("read");
        assert_eq!(content, "first");
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut sink = ZipSink::new();
        sink.put("x.png", b"1").expect("put");
        assert!(matches!(
            sink.put("x.png", b"2"),
            Err(ArchiveError::DuplicatePath(path)) if path == "x.png"
        ));
    }

    #[test]
    fn finalize_is_one_shot() {
        let mut sink = ZipSink::new();
        assert!(sink.is_empty());
        sink.finalize().expect("first finalize");
        assert!(matches!(sink.finalize(), Err(ArchiveError::Finalized)));
        assert!(matches!(sink.put("late.png", b"x"), Err(ArchiveError::Finalized)));
    }
}
