//! Database schema definitions

/// Primary key column: the scanned QR code
pub const CODE_COLUMN: &str = "qrkode";

/// Data-URI image column
pub const IMAGE_COLUMN: &str = "bilde_base64";

/// SQL to create the steg table. Safe to run on an existing database.
pub const CREATE_STEG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS steg (
    qrkode TEXT PRIMARY KEY,
    bilde_base64 TEXT
);
"#;

/// Parameterized insert of a single record
pub const INSERT_RECORD: &str = "INSERT INTO steg (qrkode, bilde_base64) VALUES (?1, ?2)";

/// Unfiltered scan, columns named explicitly so row mapping never depends on
/// the table's column order
pub const SELECT_ALL_RECORDS: &str = "SELECT qrkode, bilde_base64 FROM steg";

/// Parameterized delete of a single record by code
pub const DELETE_RECORD: &str = "DELETE FROM steg WHERE qrkode = ?1";

pub const COUNT_RECORDS: &str = "SELECT COUNT(*) FROM steg";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_STEG_TABLE]
}
