//! Bulk import of exported anchor sets
//!
//! Every record is validated, normalized and saved on its own. A bad record
//! or a failed save becomes a failed entry in the report and the batch moves
//! on; the report keeps input order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::store::AnchorStore;
use super::surface::Rect;
use super::types::{AnchorPayload, AnnotationType, TextAnchor};

/// Id reported for records that carry no usable id
pub const UNKNOWN_ID: &str = "unknown";

/// Why a single record was not imported
#[derive(Error, Debug)]
pub enum ImportFailure {
    #[error("Invalid annotation structure")]
    InvalidStructure,

    #[error("{0}")]
    Storage(String),
}

impl ImportFailure {
    /// Stable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ImportFailure::InvalidStructure => "invalid-structure",
            ImportFailure::Storage(_) => "storage-error",
        }
    }
}

/// Outcome for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ledger for a whole batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "totalAnnotations")]
    pub total_annotations: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "errorCount")]
    pub error_count: usize,
    pub results: Vec<ImportOutcome>,
}

impl ImportReport {
    fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            total_annotations: 0,
            success_count: 0,
            error_count: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, id: String, outcome: Result<(), ImportFailure>) {
        self.total_annotations += 1;
        match outcome {
            Ok(()) => {
                self.success_count += 1;
                self.results.push(ImportOutcome {
                    id,
                    success: true,
                    error: None,
                });
            }
            Err(failure) => {
                tracing::warn!(
                    document_id = %self.document_id,
                    anchor_id = %id,
                    reason = failure.code(),
                    "Skipping imported anchor: {}",
                    failure
                );
                self.error_count += 1;
                self.results.push(ImportOutcome {
                    id,
                    success: false,
                    error: Some(failure.to_string()),
                });
            }
        }
    }

    /// True only when no record failed
    pub fn success(&self) -> bool {
        self.error_count == 0
    }
}

/// Loosely typed record as found in exported files
///
/// Older exports use `content` and `type` instead of `selectedText` and
/// `annotationType`.
#[derive(Debug, Deserialize)]
struct ImportedRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "pageNumber", default)]
    page_number: Option<u32>,
    #[serde(rename = "selectedText", default)]
    selected_text: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(rename = "startOffset", default)]
    start_offset: Option<usize>,
    #[serde(rename = "endOffset", default)]
    end_offset: Option<usize>,
    #[serde(rename = "boundingRect", default)]
    bounding_rect: Option<Rect>,
    #[serde(rename = "annotationType", default)]
    annotation_type: Option<String>,
    #[serde(rename = "type", default)]
    legacy_type: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<Value>,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<Value>,
    // Always replaced by the import target
    #[serde(rename = "documentId", default)]
    _document_id: Option<Value>,
    #[serde(flatten)]
    payload: AnchorPayload,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Trimmed text, or `None` when nothing is left
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The id a record will be reported under
fn reported_id(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .unwrap_or(UNKNOWN_ID)
        .to_string()
}

/// Validate and normalize one record for `document_id`
fn normalize(document_id: &str, record: Value) -> Result<TextAnchor, ImportFailure> {
    if !record.is_object() {
        return Err(ImportFailure::InvalidStructure);
    }
    let record: ImportedRecord =
        serde_json::from_value(record).map_err(|_| ImportFailure::InvalidStructure)?;

    let id = record
        .id
        .filter(|id| !id.is_empty())
        .ok_or(ImportFailure::InvalidStructure)?;
    let selected_text = trimmed(record.selected_text)
        .or_else(|| trimmed(record.content))
        .ok_or(ImportFailure::InvalidStructure)?;
    let annotation_type = non_empty(record.annotation_type)
        .or_else(|| non_empty(record.legacy_type))
        .ok_or(ImportFailure::InvalidStructure)?;
    if record.page_number == Some(0) {
        return Err(ImportFailure::InvalidStructure);
    }

    let created_at = normalize_timestamp(&id, "createdAt", record.created_at.as_ref())
        .unwrap_or_else(Utc::now);
    let updated_at =
        normalize_timestamp(&id, "updatedAt", record.updated_at.as_ref()).unwrap_or(created_at);

    Ok(TextAnchor {
        id,
        document_id: document_id.to_string(),
        page_number: record.page_number,
        selected_text,
        start_offset: record.start_offset,
        end_offset: record.end_offset,
        bounding_rect: record.bounding_rect,
        annotation_type: AnnotationType::new(annotation_type),
        created_at,
        updated_at,
        payload: record.payload,
    })
}

/// Parse a timestamp field, warning when a present value cannot be read
fn normalize_timestamp(id: &str, field: &str, value: Option<&Value>) -> Option<DateTime<Utc>> {
    let value = value.filter(|v| !v.is_null())?;
    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        tracing::warn!(anchor_id = %id, field, value = %value, "Unreadable timestamp, using fallback");
    }
    parsed
}

/// Parse a date-like JSON value
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD[ T]HH:MM:SS[.f]` and
/// `YYYY-MM-DD` strings (read as UTC), and epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Import a batch of raw records into `document_id`
///
/// Records are handled one at a time in input order; each save is awaited
/// before the next record is looked at. Dropping the returned future stops
/// the batch after the record in flight.
pub async fn import_batch<S>(store: &S, document_id: &str, records: Vec<Value>) -> ImportReport
where
    S: AnchorStore + ?Sized,
{
    let mut report = ImportReport::new(document_id);

    for record in records {
        let id = reported_id(&record);
        let outcome = match normalize(document_id, record) {
            Ok(anchor) => store
                .save(&anchor)
                .await
                .map_err(|e| ImportFailure::Storage(e.to_string())),
            Err(failure) => Err(failure),
        };
        report.record(id, outcome);
    }

    tracing::info!(
        document_id,
        total = report.total_annotations,
        succeeded = report.success_count,
        failed = report.error_count,
        "Anchor import finished"
    );

    report
}

/// Split an import request body into its target document and records
///
/// Rejects the whole request when `documentId` is missing or blank or when
/// `anchors` is not an array.
pub fn parse_import_request(body: Value) -> Result<(String, Vec<Value>), &'static str> {
    let Value::Object(mut body) = body else {
        return Err("request body must be a JSON object");
    };

    let document_id = match body.remove("documentId") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => return Err("documentId is required"),
    };

    let anchors = match body.remove("anchors") {
        Some(Value::Array(items)) => items,
        _ => return Err("anchors must be an array"),
    };

    Ok((document_id, anchors))
}
