//! Data URIs - inline images as text
//!
//! Format: `data:<mime>[;base64],<payload>`
//!
//! Examples:
//! - `data:image/png;base64,iVBORw0KGgo=`
//! - `data:image/svg+xml,<svg/>`

use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

static DATA_URI: OnceLock<Regex> = OnceLock::new();

fn data_uri_regex() -> &'static Regex {
    DATA_URI.get_or_init(|| {
        Regex::new(r"(?s)^data:([^;,]*)((?:;[^;,]*)*?)(;base64)?,(.*)$")
            .expect("data URI pattern is valid")
    })
}

/// MIME type for files whose type cannot be determined
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A parsed data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Media type, e.g. `image/png` (may be empty)
    pub mime: String,
    /// Whether the payload is base64 encoded
    pub base64: bool,
    /// Everything after the first comma
    pub payload: String,
}

impl DataUri {
    /// Build a base64 data URI from raw bytes
    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            base64: true,
            payload: STANDARD.encode(bytes),
        }
    }

    /// Parse a data URI string
    pub fn parse(uri: &str) -> Result<Self> {
        let caps = data_uri_regex()
            .captures(uri)
            .ok_or_else(|| Error::ValidationFailure(format!("not a data URI: {}", preview(uri, 32))))?;

        Ok(Self {
            mime: caps[1].to_string(),
            base64: caps.get(3).is_some(),
            payload: caps[4].to_string(),
        })
    }

    /// Size of the decoded payload, if it is valid base64
    pub fn decoded_len(&self) -> Option<usize> {
        if self.base64 {
            STANDARD.decode(self.payload.trim()).ok().map(|bytes| bytes.len())
        } else {
            Some(self.payload.len())
        }
    }

    /// Convert to URI string
    pub fn to_uri_string(&self) -> String {
        let encoding = if self.base64 { ";base64" } else { "" };
        format!("data:{}{},{}", self.mime, encoding, self.payload)
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri_string())
    }
}

impl FromStr for DataUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DataUri {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_uri_string())
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataUri::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Guess an image MIME type from a file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "tif" | "tiff" => "image/tiff",
        _ => FALLBACK_MIME,
    }
}

/// Read an uploaded file into a base64 data URI string
pub fn read_image_file(path: &Path) -> Result<String> {
    if path.as_os_str().is_empty() {
        return Err(Error::ValidationFailure("no image file selected".to_string()));
    }

    let bytes = std::fs::read(path)?;
    let uri = DataUri::from_bytes(mime_for_path(path), &bytes);
    tracing::debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), uri.mime);
    Ok(uri.to_uri_string())
}

/// First `max` characters of a string, with an ellipsis when truncated
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
