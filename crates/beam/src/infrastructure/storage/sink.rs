//! On-disk destination for received files.
//!
//! The emitter chooses the file name, so it is untrusted input.  Only its
//! final path component is used (after the last `/`, `\` or `:`), and names
//! that would escape or alias the output directory (`..`, `.`, empty) are
//! replaced with [`FALLBACK_FILE_NAME`].  Existing files are left alone
//! unless the sink was created with `overwrite = true`.
//!
//! A transfer that fails part-way leaves the bytes received so far on disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use beam_core::FileInfo;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::absorb::FileSink;

/// Name used when the announced one is unusable.
pub const FALLBACK_FILE_NAME: &str = "beam-download";

/// Reduces an announced file name to a safe single path component.
///
/// `:` counts as a separator so a drive prefix such as `C:name` cannot make
/// `join` replace the output directory on Windows.
pub fn safe_file_name(announced: &str) -> String {
    let last = announced
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.contains('\0') || !is_single_normal_component(last) {
        return FALLBACK_FILE_NAME.to_string();
    }
    last.to_string()
}

fn is_single_normal_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Writes received chunks into a file inside `output_dir`.
#[derive(Debug)]
pub struct DiskSink {
    output_dir: PathBuf,
    overwrite: bool,
    path: Option<PathBuf>,
    file: Option<File>,
    written: u64,
}

impl DiskSink {
    pub fn new(output_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            overwrite,
            path: None,
            file: None,
            written: 0,
        }
    }

    /// Where the file is being (or was) written, once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn not_open() -> std::io::Error {
        std::io::Error::other("destination file is not open")
    }
}

#[async_trait]
impl FileSink for DiskSink {
    async fn open(&mut self, info: &FileInfo) -> std::io::Result<()> {
        let path = self.output_dir.join(safe_file_name(&info.name));
        let mut options = OpenOptions::new();
        options.write(true);
        if self.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(&path).await.map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))
        })?;
        debug!("writing to {}", path.display());
        self.file = Some(file);
        self.path = Some(path);
        self.written = 0;
        Ok(())
    }

    async fn write_chunk(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let file = self.file.as_mut().ok_or_else(Self::not_open)?;
        file.write_all(bytes).await?;
        // tokio buffers file writes; flush so an acknowledged chunk is on disk.
        file.flush().await?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        let mut file = self.file.take().ok_or_else(Self::not_open)?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            size: 0,
        }
    }

    #[test]
    fn test_safe_file_name_keeps_plain_names() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("my file (2).txt"), "my file (2).txt");
    }

    #[test]
    fn test_safe_file_name_strips_directories() {
        assert_eq!(safe_file_name("/etc/passwd"), "passwd");
        assert_eq!(safe_file_name("../../.ssh/authorized_keys"), "authorized_keys");
        assert_eq!(safe_file_name(r"C:\Users\me\notes.txt"), "notes.txt");
    }

    #[test]
    fn test_safe_file_name_drops_drive_prefixes() {
        assert_eq!(safe_file_name("C:evil.txt"), "evil.txt");
        assert_eq!(safe_file_name(r"C:..\x"), "x");
        assert_eq!(safe_file_name("d:"), FALLBACK_FILE_NAME);
        assert_eq!(safe_file_name("C:.."), FALLBACK_FILE_NAME);
    }

    #[test]
    fn test_safe_file_name_result_joins_inside_output_dir() {
        let out = Path::new("out");
        for announced in ["C:evil.txt", "../x", r"\\server\share\y", "/abs/z"] {
            let joined = out.join(safe_file_name(announced));
            assert_eq!(joined.parent(), Some(out), "input {announced:?}");
        }
    }

    #[test]
    fn test_safe_file_name_falls_back_for_unusable_names() {
        for bad in ["", "   ", ".", "..", "dir/", "a/..", "nul\0byte"] {
            assert_eq!(safe_file_name(bad), FALLBACK_FILE_NAME, "input {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_disk_sink_writes_chunks_in_order() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DiskSink::new(dir.path(), false);

        // Act
        sink.open(&info("out.bin")).await.unwrap();
        sink.write_chunk(b"abc").await.unwrap();
        sink.write_chunk(b"def").await.unwrap();
        sink.finish().await.unwrap();

        // Assert
        let path = dir.path().join("out.bin");
        assert_eq!(sink.path(), Some(path.as_path()));
        assert_eq!(sink.written(), 6);
        assert_eq!(std::fs::read(path).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_disk_sink_refuses_to_clobber_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"original").unwrap();
        let mut sink = DiskSink::new(dir.path(), false);

        let err = sink.open(&info("keep.txt")).await.unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(dir.path().join("keep.txt")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_disk_sink_truncates_with_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"a much longer original").unwrap();
        let mut sink = DiskSink::new(dir.path(), true);

        sink.open(&info("f.txt")).await.unwrap();
        sink.write_chunk(b"new").await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("f.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_disk_sink_confines_traversal_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DiskSink::new(dir.path(), false);

        sink.open(&info("../escape.txt")).await.unwrap();
        sink.finish().await.unwrap();

        assert!(dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_write_before_open_is_an_error() {
        let mut sink = DiskSink::new(".", false);
        assert!(sink.write_chunk(b"x").await.is_err());
        assert!(sink.finish().await.is_err());
    }
}
