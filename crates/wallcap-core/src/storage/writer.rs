//! Temp-file writer for captured artifacts.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Writer for one artifact's temp file. Bytes are appended, synced, and the
/// file is renamed over the destination on `finalize`.
pub struct ArtifactWriter {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl ArtifactWriter {
    /// Creates (truncating) the temp file at `temp_path`.
    pub async fn create(temp_path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .await?;
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    pub async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Syncs and renames the temp file to `final_path`, replacing any existing file.
    pub async fn finalize(mut self, final_path: &Path) -> std::io::Result<u64> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);
        tokio::fs::rename(&self.temp_path, final_path).await?;
        Ok(self.written)
    }
}
