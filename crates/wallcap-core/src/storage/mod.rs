//! Persisting the converted image.
//!
//! Bytes go to `<destination>.part` first and are renamed over the
//! destination once synced, so an interrupted run never leaves a truncated
//! image under the final name.

mod writer;

use std::path::{Path, PathBuf};

pub use writer::ArtifactWriter;

/// Temporary file suffix used before the rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `bg.jpg` → `bg.jpg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writes `data` to `destination` in full, overwriting existing content.
/// Returns the number of bytes written. The temp file is removed on failure.
pub async fn persist(destination: &Path, data: &[u8]) -> std::io::Result<u64> {
    let tp = temp_path(destination);
    let result = async {
        let mut writer = ArtifactWriter::create(&tp).await?;
        writer.write_all(data).await?;
        writer.finalize(destination).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tp).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("wallpaper.jpg"));
        assert_eq!(p.to_string_lossy(), "wallpaper.jpg.part");
        let p2 = temp_path(Path::new("/tmp/bg.png"));
        assert_eq!(p2.to_string_lossy(), "/tmp/bg.png.part");
    }

    #[tokio::test]
    async fn persist_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bg.jpg");
        std::fs::write(&dest, b"old content that is longer").unwrap();

        let n = persist(&dest, b"new").await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn persist_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing").join("bg.jpg");
        assert!(persist(&dest, b"x").await.is_err());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn writer_counts_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.png");
        let tp = temp_path(&final_path);
        let mut w = ArtifactWriter::create(&tp).await.unwrap();
        w.write_all(b"abc").await.unwrap();
        w.write_all(b"de").await.unwrap();
        assert_eq!(w.finalize(&final_path).await.unwrap(), 5);
        assert_eq!(std::fs::read(&final_path).unwrap(), b"abcde");
    }
}
