//! Record - one persisted QR code / image pairing

use serde::{Deserialize, Serialize};
use crate::data_uri::DataUri;

/// A QR code paired with a data-URI image.
///
/// `code` is the primary key of the backing table; no format is imposed on
/// either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Scanned (or typed) QR code identifier
    pub code: String,
    /// Image as `data:<mime>;base64,<payload>`
    pub image: String,
}

impl Record {
    pub fn new(code: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            image: image.into(),
        }
    }

    /// Parse the image column, if it is a well-formed data URI
    pub fn data_uri(&self) -> Option<DataUri> {
        DataUri::parse(&self.image).ok()
    }
}
