//! Flat tabular export of audit records.
//!
//! One row per record, RFC 4180 quoting. The detail payload is serialized to
//! a single JSON text cell with its `kind` tag removed, since the `action`
//! column already carries it.

use std::fmt::Write as _;

use crate::clock::format_timestamp;
use crate::entities::AuditRecord;

/// Column order of the export.
pub const CSV_HEADERS: &[&str] = &[
    "id",
    "timestamp",
    "action",
    "performed_by",
    "performer_name",
    "subject_type",
    "subject_id",
    "subject_title",
    "request_id",
    "details",
];

/// Render records as CSV, header row included.
///
/// # Errors
///
/// Returns `serde_json::Error` if a detail payload cannot be serialized.
pub fn to_csv(records: &[AuditRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADERS.iter().copied());

    for record in records {
        let details = detail_cell(record)?;
        let timestamp = format_timestamp(&record.created_at);
        push_row(
            &mut out,
            [
                record.id.as_str(),
                timestamp.as_str(),
                record.action.as_str(),
                record.performed_by.id.as_str(),
                record.performed_by.display_name.as_str(),
                record.subject.subject_type.as_str(),
                record.subject.id.as_str(),
                record.subject.title.as_deref().unwrap_or(""),
                record.request_id.as_deref().unwrap_or(""),
                details.as_str(),
            ],
        );
    }
    Ok(out)
}

fn detail_cell(record: &AuditRecord) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(&record.detail)?;
    if let Some(map) = value.as_object_mut() {
        map.remove("kind");
    }
    serde_json::to_string(&value)
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_cell(out, cell);
    }
    out.push_str("\r\n");
}

fn push_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        let _ = write!(out, "\"{}\"", cell.replace('"', "\"\""));
    } else {
        out.push_str(cell);
    }
}
