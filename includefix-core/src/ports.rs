//! Port traits abstracting artifact output away from the pipeline.

use camino::Utf8Path;

/// File-system write operations for artifacts.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
