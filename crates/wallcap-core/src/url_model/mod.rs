//! Destination modeling: where the captured image is written.

mod path;
mod sanitize;

use std::path::{Path, PathBuf};

use crate::convert::ImageEncoding;

pub use path::photo_display_name;
pub use sanitize::sanitize_file_stem;

/// Stem used when the photo's display name sanitizes to nothing.
const DEFAULT_STEM: &str = "wallpaper";

/// Extensions that name some image format; a mismatching one is replaced.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "avif"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Explicit file. A path without extension gets the encoding's extension;
    /// an image extension of another format is replaced.
    File(PathBuf),
    /// Directory; the file is named after the selected photo.
    Directory(PathBuf),
}

impl Destination {
    /// Final path for a photo called `display_name` written as `encoding`.
    ///
    /// # Examples
    ///
    /// - `File("wallpaper")` + jpeg → `wallpaper.jpg`
    /// - `File("bg.png")` + jpeg → `bg.jpg`
    /// - `Directory("/tmp")` + `"misty morning"` + png → `/tmp/misty_morning.png`
    pub fn resolve(&self, display_name: &str, encoding: ImageEncoding) -> PathBuf {
        match self {
            Destination::File(path) => {
                let Some(ext) = path.extension() else {
                    return with_appended_extension(path, encoding.extension());
                };
                let ext = ext.to_string_lossy();
                let foreign_image = !encoding.matches_extension(&ext)
                    && IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known));
                if foreign_image {
                    let replaced = path.with_extension(encoding.extension());
                    tracing::warn!(
                        requested = %path.display(),
                        path = %replaced.display(),
                        "extension does not match the output format; replacing it"
                    );
                    replaced
                } else {
                    path.clone()
                }
            }
            Destination::Directory(dir) => {
                let stem = sanitize_file_stem(display_name);
                let stem = if stem.is_empty() { DEFAULT_STEM } else { stem.as_str() };
                dir.join(format!("{}.{}", stem, encoding.extension()))
            }
        }
    }
}

fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".");
    o.push(extension);
    PathBuf::from(o)
}
