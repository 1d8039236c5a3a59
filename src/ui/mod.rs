pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, human_bytes, section, status, success, warn};
pub use table::{RecordTable, TableBuilder, stats_table};
pub use theme::{Theme, theme};
