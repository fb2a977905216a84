//! Selection policy: first photo, in response order, that satisfies the
//! orientation, size, and score predicates.

mod model;

use thiserror::Error;

pub use model::{ImageUrls, Photo, PhotoImage, PhotoPage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no photo satisfied the selection criteria ({inspected} inspected)")]
pub struct NoMatchError {
    pub inspected: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionPolicy {
    pub landscape_required: bool,
    pub min_width: u32,
    pub min_height: u32,
    /// Exclusive lower bound on the photo's score; `None` disables the check.
    pub min_score: Option<f64>,
}

impl SelectionPolicy {
    pub fn accepts(&self, photo: &Photo) -> bool {
        (!self.landscape_required || photo.width > photo.height)
            && photo.width >= self.min_width
            && photo.height >= self.min_height
            && self.min_score.map_or(true, |min| photo.score() > min)
    }

    /// Returns the first accepted photo. Skipped photos are logged and never revisited.
    pub fn select<'a>(&self, photos: &'a [Photo]) -> Result<&'a Photo, NoMatchError> {
        for photo in photos {
            if self.accepts(photo) {
                return Ok(photo);
            }
            tracing::info!(
                photo = %photo.display_name(),
                width = photo.width,
                height = photo.height,
                score = photo.score(),
                "skipping"
            );
        }
        Err(NoMatchError {
            inspected: photos.len(),
        })
    }
}

/// Image size the API is asked for: 2048 unless a requested edge exceeds it.
pub fn default_image_size(min_width: u32, min_height: u32) -> u32 {
    if min_width.max(min_height) <= 2048 {
        2048
    } else {
        4096
    }
}
