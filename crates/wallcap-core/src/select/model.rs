//! Photo API payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::url_model::photo_display_name;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PhotoPage {
    /// Photos in API order. Entries that do not decode are dropped.
    #[serde(default, deserialize_with = "decodable_photos")]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: u32,
    /// Popularity score.
    #[serde(default)]
    pub score: Option<f64>,
    /// Older name for the score; used when `score` is absent.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: ImageUrls,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<PhotoImage>,
    /// Photo page path, e.g. `/photo/1234/misty-morning`.
    #[serde(default)]
    pub url: Option<String>,
}

/// `image_url` is a single string or one string per requested size.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageUrls {
    One(String),
    Many(Vec<String>),
}

impl Default for ImageUrls {
    fn default() -> Self {
        ImageUrls::Many(Vec::new())
    }
}

impl ImageUrls {
    pub fn first(&self) -> Option<&str> {
        match self {
            ImageUrls::One(u) => Some(u.as_str()),
            ImageUrls::Many(v) => v.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoImage {
    pub size: u32,
    pub url: String,
    #[serde(default)]
    pub https_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn decodable_photos<'de, D>(deserializer: D) -> Result<Vec<Photo>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match Photo::deserialize(value) {
            Ok(photo) => Some(photo),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable photo");
                None
            }
        })
        .collect())
}

impl Photo {
    /// URL of the binary for `image_size`: the matching `images` entry when
    /// present, else the first `image_url`.
    pub fn resource_url(&self, image_size: u32) -> Option<&str> {
        self.images
            .iter()
            .find(|i| i.size == image_size)
            .map(|i| i.https_url.as_deref().unwrap_or(i.url.as_str()))
            .or_else(|| self.image_url.first())
    }

    pub fn score(&self) -> f64 {
        self.score.or(self.rating).unwrap_or(0.0)
    }

    pub fn display_name(&self) -> String {
        self.url
            .as_deref()
            .and_then(photo_display_name)
            .or_else(|| self.name.clone().filter(|n| !n.trim().is_empty()))
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_else(|| "photo".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_api_shape() {
        let page: PhotoPage = serde_json::from_value(json!({
            "current_page": 1,
            "photos": [{
                "id": 1001,
                "name": "Misty Morning",
                "width": 6000,
                "height": 4000,
                "rating": 97.4,
                "highest_rating": 99.1,
                "image_url": ["https://drscdn.500px.org/photo/1001/m%3D2048/v2"],
                "images": [{ "size": 2048, "url": "http://x/2048.jpg", "https_url": "https://x/2048.jpg", "format": "jpeg" }],
                "url": "/photo/1001/misty-morning-by-someone"
            }]
        }))
        .unwrap();
        let photo = &page.photos[0];
        assert_eq!(photo.width, 6000);
        assert!((photo.score() - 97.4).abs() < 1e-9);
        assert_eq!(photo.resource_url(2048), Some("https://x/2048.jpg"));
        assert_eq!(
            photo.resource_url(4096),
            Some("https://drscdn.500px.org/photo/1001/m%3D2048/v2")
        );
        assert_eq!(photo.display_name(), "misty-morning-by-someone");
    }

    #[test]
    fn single_string_image_url_and_score_field() {
        let photo: Photo = serde_json::from_value(json!({
            "width": 3000, "height": 2000, "image_url": "u1", "score": 80
        }))
        .unwrap();
        assert_eq!(photo.resource_url(2048), Some("u1"));
        assert!((photo.score() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn null_fields_read_as_missing() {
        let photo: Photo = serde_json::from_value(json!({
            "id": 5, "width": null, "height": 2000, "image_url": null, "images": null, "score": null
        }))
        .unwrap();
        assert_eq!(photo.width, 0);
        assert_eq!(photo.height, 2000);
        assert_eq!(photo.resource_url(2048), None);
        assert_eq!(photo.score(), 0.0);
    }

    #[test]
    fn undecodable_photo_is_skipped_not_fatal() {
        let page: PhotoPage = serde_json::from_value(json!({
            "photos": [
                { "id": 1, "width": "wide", "image_url": "u1" },
                { "id": 2, "width": 3000, "height": 2000, "image_url": [null] },
                { "id": 3, "width": 3000, "height": 2000, "image_url": "u3" }
            ]
        }))
        .unwrap();
        assert_eq!(page.photos.len(), 1);
        assert_eq!(page.photos[0].id, Some(3));

        let empty: PhotoPage = serde_json::from_value(json!({ "photos": null })).unwrap();
        assert!(empty.photos.is_empty());
    }

    #[test]
    fn display_name_fallbacks() {
        let named = Photo {
            name: Some("Dunes".to_string()),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "Dunes");
        let by_id = Photo {
            id: Some(7),
            ..Default::default()
        };
        assert_eq!(by_id.display_name(), "7");
        assert_eq!(Photo::default().display_name(), "photo");
        assert_eq!(Photo::default().score(), 0.0);
    }
}
