use tabled::{settings::Style, Table, Tabled};
use crate::data_uri::preview;
use crate::record::Record;
use crate::ui::human_bytes;

/// Shown in place of the record table when the store is empty
pub const EMPTY_TABLE: &str = "No data available";

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "QR code")]
    code: String,
    #[tabled(rename = "Type")]
    mime: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Image")]
    image: String,
}

impl RecordRow {
    fn from_record(record: &Record, preview_len: usize) -> Self {
        let uri = record.data_uri();
        Self {
            code: record.code.clone(),
            mime: uri
                .as_ref()
                .map(|u| u.mime.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            size: uri
                .as_ref()
                .and_then(|u| u.decoded_len())
                .map(human_bytes)
                .unwrap_or_else(|| "-".to_string()),
            image: preview(&record.image, preview_len),
        }
    }
}

/// Display table of stored records; images are shown as truncated data URIs
pub struct RecordTable {
    preview_len: usize,
}

impl RecordTable {
    pub fn new(preview_len: usize) -> Self {
        Self { preview_len }
    }

    pub fn render(&self, records: &[Record]) -> String {
        if records.is_empty() {
            return EMPTY_TABLE.to_string();
        }

        let rows: Vec<RecordRow> = records
            .iter()
            .map(|r| RecordRow::from_record(r, self.preview_len))
            .collect();
        Table::new(rows).with(Style::rounded()).to_string()
    }
}
