//! Storage Layer - embedded SQLite engine
//!
//! The live database is always in memory. Durability comes from exporting the
//! whole database as a SQLite file image; there is a single table:
//! - steg(qrkode, bilde_base64)

pub mod schema;
pub mod sqlite;

pub use sqlite::{Database, SqliteEngine};
