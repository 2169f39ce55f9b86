//! Default port implementations.

use crate::ports::WritePort;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        std::fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// In-memory write port for embedding and testing.
#[derive(Debug, Default)]
pub struct BufferWritePort {
    files: Mutex<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl BufferWritePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn files(&self) -> BTreeMap<Utf8PathBuf, Vec<u8>> {
        match self.files.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl WritePort for BufferWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| anyhow::anyhow!("buffer port lock poisoned"))?;
        files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, _path: &Utf8Path) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fs_write_port_writes_and_creates_dirs() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let target = root.join("nested").join("file.txt");

        let port = FsWritePort;
        port.write_file(&target, b"hello").expect("write");

        let contents = std::fs::read_to_string(&target).expect("read");
        assert_eq!(contents, "hello");

        let extra_dir = root.join("extra");
        port.create_dir_all(&extra_dir).expect("mkdir");
        assert!(extra_dir.exists());
    }

    #[test]
    fn buffer_write_port_collects_writes() {
        let port = BufferWritePort::new();
        port.write_file(Utf8Path::new("a/report.json"), b"{}")
            .expect("write");
        port.write_file(Utf8Path::new("a/patch.diff"), b"")
            .expect("write");

        let files = port.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files.get(Utf8Path::new("a/report.json")).map(Vec::as_slice), Some(b"{}".as_slice()));
    }
}
