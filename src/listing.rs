use crate::render::{display_text, format_field_name};
use crate::types::{BatchResults, BatchStatus, HistoryEntry};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Fields surfaced for every completed document in a batch.
const BATCH_HIGHLIGHTS: &[&str] = &["merchant_name", "vendor", "total", "date"];

pub const EMPTY_HISTORY: &str = "No processing history found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub id: i64,
    pub heading: String,
    pub type_tag: String,
    pub status: String,
    pub filename: String,
    pub uploaded_at: String,
}

/// Backend timestamps are SQLite `CURRENT_TIMESTAMP` (UTC, no zone) or RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Render a timestamp in the given zone; unparseable input is shown verbatim.
pub fn format_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match parse_timestamp(raw) {
        Some(dt) => dt
            .with_timezone(tz)
            .format("%m/%d/%Y, %I:%M:%S %p")
            .to_string(),
        None => raw.to_string(),
    }
}

pub fn history_rows(entries: &[HistoryEntry]) -> Vec<HistoryRow> {
    entries
        .iter()
        .map(|e| HistoryRow {
            id: e.id,
            heading: format!("Document #{}", e.id),
            type_tag: e
                .document_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            status: e.status.clone(),
            filename: e.filename.clone(),
            uploaded_at: format_timestamp_in(&e.upload_date, &Local),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntryView {
    pub filename: String,
    pub status: String,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    pub batch_id: String,
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub entries: Vec<BatchEntryView>,
}

pub fn batch_view(batch_id: &str, batch: &BatchResults) -> BatchView {
    let processed_files = batch
        .results
        .iter()
        .filter(|r| r.status == BatchStatus::Completed)
        .count();
    let failed_files = batch
        .results
        .iter()
        .filter(|r| r.status == BatchStatus::Failed)
        .count();

    let entries = batch
        .results
        .iter()
        .map(|r| {
            let highlights = match (&r.status, &r.results) {
                (BatchStatus::Completed, Some(doc)) => BATCH_HIGHLIGHTS
                    .iter()
                    .filter_map(|name| {
                        let value = display_text(&doc.field(name)?.value)?;
                        Some(Highlight {
                            label: format_field_name(name),
                            value,
                        })
                    })
                    .collect(),
                _ => Vec::new(),
            };
            BatchEntryView {
                filename: r.filename.clone(),
                status: r.status.as_str().to_string(),
                highlights,
            }
        })
        .collect();

    BatchView {
        batch_id: batch_id.to_string(),
        total_files: batch.results.len(),
        processed_files,
        failed_files,
        entries,
    }
}
