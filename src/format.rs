use chrono::{DateTime, Utc};

use crate::detail;
use crate::record::Record;
use crate::row::RowContent;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Table cells in column order plus the detail link of the name cell.
pub fn row_content(record: &Record) -> RowContent {
    RowContent {
        cells: [
            record.id.to_string(),
            record.name.clone(),
            record.item_type.as_str().to_string(),
            record.status.as_str().to_string(),
            format_timestamp(&record.last_updated),
        ],
        link: detail::address(record.id),
    }
}

// Quote a csv cell if it contains separators or quotes.
pub fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_escaping || needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
