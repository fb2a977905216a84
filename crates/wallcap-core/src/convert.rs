//! Payload converter: response body → bytes in the target image encoding.
//!
//! Raw (non-base64) bodies are passed through untouched. Base64 bodies are
//! decoded (a `data:` prefix is stripped first) and re-encoded when their
//! format differs from the target, either natively with the `image` crate or
//! by a canvas round-trip inside the page.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cdp::{protocol, CdpError, ResponseBody, Transport};

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image codec: {0}")]
    Image(#[from] image::ImageError),

    #[error("in-page re-encoding failed: {0}")]
    InPage(#[from] CdpError),

    #[error("in-page re-encoding returned {0}")]
    UnexpectedShape(String),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Encoding of the persisted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    /// True when `ext` (case-insensitive, without dot) names this encoding.
    pub fn matches_extension(self, ext: &str) -> bool {
        match self {
            ImageEncoding::Jpeg => ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"),
            ImageEncoding::Png => ext.eq_ignore_ascii_case("png"),
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
            ImageEncoding::Png => ImageFormat::Png,
        }
    }
}

impl std::str::FromStr for ImageEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageEncoding::Jpeg),
            "png" => Ok(ImageEncoding::Png),
            other => Err(format!("unsupported image format `{}` (expected jpeg or png)", other)),
        }
    }
}

/// Where re-encoding happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionStrategy {
    /// Decode and encode locally with the `image` crate.
    #[default]
    Native,
    /// Draw into an offscreen canvas in the page and export the target encoding.
    InPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadConverter {
    pub target: ImageEncoding,
    pub strategy: ConversionStrategy,
}

impl PayloadConverter {
    pub fn new(target: ImageEncoding, strategy: ConversionStrategy) -> Self {
        Self { target, strategy }
    }

    pub async fn convert<T: Transport>(
        &self,
        transport: &mut T,
        payload: &ResponseBody,
    ) -> Result<Vec<u8>, ConversionError> {
        match self.strategy {
            ConversionStrategy::Native => {
                // Decoding and encoding are CPU-bound; keep them off the event pump.
                let payload = payload.clone();
                let target = self.target;
                tokio::task::spawn_blocking(move || convert_native(&payload, target)).await?
            }
            ConversionStrategy::InPage => convert_in_page(transport, payload, self.target).await,
        }
    }
}

/// Drops a `data:<mime>;base64,` prefix if present.
pub fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some((_, rest)) = data.split_once(',') {
            return rest;
        }
    }
    data
}

fn decode_base64(data: &str) -> Result<Vec<u8>, ConversionError> {
    Ok(STANDARD.decode(strip_data_url_prefix(data).trim())?)
}

fn is_target(bytes: &[u8], target: ImageEncoding) -> bool {
    image::guess_format(bytes).map_or(false, |f| f == target.format())
}

pub fn convert_native(
    payload: &ResponseBody,
    target: ImageEncoding,
) -> Result<Vec<u8>, ConversionError> {
    if !payload.base64_encoded {
        return Ok(payload.body.as_bytes().to_vec());
    }
    let bytes = decode_base64(&payload.body)?;
    if is_target(&bytes, target) {
        return Ok(bytes);
    }
    let decoded = image::load_from_memory(&bytes)?;
    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        target = target.mime(),
        "re-encoding payload"
    );
    encode(&decoded, target)
}

fn encode(img: &DynamicImage, target: ImageEncoding) -> Result<Vec<u8>, ConversionError> {
    let mut out = Cursor::new(Vec::new());
    match target {
        // JPEG has no alpha channel.
        ImageEncoding::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?,
        ImageEncoding::Png => img.write_to(&mut out, ImageFormat::Png)?,
    }
    Ok(out.into_inner())
}

pub async fn convert_in_page<T: Transport>(
    transport: &mut T,
    payload: &ResponseBody,
    target: ImageEncoding,
) -> Result<Vec<u8>, ConversionError> {
    if !payload.base64_encoded {
        return Ok(payload.body.as_bytes().to_vec());
    }
    let bytes = decode_base64(&payload.body)?;
    if is_target(&bytes, target) {
        return Ok(bytes);
    }
    let source_mime = image::guess_format(&bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    let data_url = format!("data:{};base64,{}", source_mime, STANDARD.encode(&bytes));

    let value = protocol::evaluate(transport, &canvas_expression(&data_url, target)).await?;
    let Some(exported) = value.as_str().filter(|s| s.starts_with("data:")) else {
        return Err(ConversionError::UnexpectedShape(shape_of(&value)));
    };
    let out = decode_base64(exported)?;
    if !is_target(&out, target) {
        return Err(ConversionError::UnexpectedShape(format!(
            "a data URL that is not {}",
            target.mime()
        )));
    }
    Ok(out)
}

fn canvas_expression(data_url: &str, target: ImageEncoding) -> String {
    // JSON string literals are valid JS string literals.
    let src = serde_json::Value::String(data_url.to_string()).to_string();
    let mime = serde_json::Value::String(target.mime().to_string()).to_string();
    format!(
        r#"new Promise((resolve, reject) => {{
  const img = new Image();
  img.onload = () => {{
    const canvas = document.createElement('canvas');
    canvas.width = img.naturalWidth;
    canvas.height = img.naturalHeight;
    canvas.getContext('2d').drawImage(img, 0, 0);
    resolve(canvas.toDataURL({mime}, 0.95));
  }};
  img.onerror = () => reject(new Error('image could not be decoded'));
  img.src = {src};
}})"#
    )
}

fn shape_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "nothing".to_string(),
        serde_json::Value::String(s) => format!("a string without data URL prefix ({} chars)", s.len()),
        other => format!("a non-string value: {}", other),
    }
}
