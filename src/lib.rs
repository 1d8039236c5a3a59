//! # qrsteg - QR code / image pairing store
//!
//! Pairs scanned QR code identifiers with uploaded images and keeps them in an
//! in-memory SQLite database. The whole database is exported after every
//! write, base64-encoded and stored under a single key of a durable
//! key-value medium, then restored from that key on the next start.
//!
//! qrsteg provides:
//! - `SqliteEngine` / `Database`: the embedded SQL engine and its live handle
//! - Snapshot codec (binary <-> printable text)
//! - Pluggable key-value media (`MemoryKv`, `FileKv`)
//! - `PersistentRecordStore`: the load / insert / scan lifecycle

pub mod codec;
pub mod config;
pub mod data_uri;
pub mod kv;
pub mod output;
pub mod record;
pub mod storage;
pub mod store;
pub mod ui;

// Re-exports for convenient access
pub use data_uri::DataUri;
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use record::Record;
pub use storage::{Database, SqliteEngine};
pub use store::{PersistentRecordStore, SaveOutcome, StoreState};

/// Result type alias for qrsteg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for qrsteg operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SQL engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Corrupt database snapshot: {0}")]
    DecodeFailure(String),

    #[error("Missing input: {0}")]
    ValidationFailure(String),

    #[error("QR code {code} already exists")]
    ConstraintViolation { code: String },

    #[error("Query failed: {0}")]
    QueryFailure(#[from] rusqlite::Error),

    #[error("Database is not ready")]
    NotReady,

    #[error("Store is already initialized")]
    AlreadyInitialized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
