//! Snapshot codec - database file image <-> printable text
//!
//! The durable medium only stores strings, so exported snapshots go through
//! standard base64 (with padding). Decoding also checks the SQLite file
//! header so a corrupt slot is reported before the engine sees it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crate::{Error, Result};

/// First 16 bytes of every SQLite database file
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Encode a snapshot image for the key-value medium
pub fn encode_snapshot(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a stored snapshot back into a database file image
pub fn decode_snapshot(text: &str) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| Error::DecodeFailure(format!("invalid base64: {}", e)))?;

    if !bytes.starts_with(SQLITE_HEADER) {
        return Err(Error::DecodeFailure(format!(
            "{} decoded bytes do not start with a SQLite header",
            bytes.len()
        )));
    }

    check_image_length(&bytes)?;
    Ok(bytes)
}

/// Size of the SQLite database file header
const HEADER_LEN: usize = 100;

/// Reject images shorter than the page count their header declares.
///
/// The in-header page count is only trusted when its "version valid for"
/// field matches the change counter.
fn check_image_length(bytes: &[u8]) -> Result<()> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::DecodeFailure(format!(
            "snapshot image is {} bytes, shorter than the SQLite header",
            bytes.len()
        )));
    }

    let be_u32 = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let page_size = match u16::from_be_bytes([bytes[16], bytes[17]]) {
        1 => 65536,
        n => n as usize,
    };
    let change_counter = be_u32(24);
    let page_count = be_u32(28) as usize;
    let valid_for = be_u32(92);

    if valid_for == change_counter && page_count > 0 && bytes.len() < page_size * page_count {
        return Err(Error::DecodeFailure(format!(
            "snapshot image is truncated: {} of {} bytes",
            bytes.len(),
            page_size * page_count
        )));
    }
    Ok(())
}

/// Content digest of a snapshot image (hex blake3)
pub fn snapshot_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
