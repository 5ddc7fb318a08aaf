//! Text anchor types
//!
//! A [`TextAnchor`] describes a span of page text by its content rather than
//! by the rendered nodes it was selected from. Offsets and geometry are kept
//! as hints for disambiguation and UI placement only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::capture::CapturedSelection;
use super::surface::Rect;

/// A persisted, content-addressed annotation anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnchor {
    /// Unique identifier
    pub id: String,
    /// The document this anchor belongs to
    #[serde(rename = "documentId")]
    pub document_id: String,
    /// Page the span was captured on (1-indexed)
    #[serde(rename = "pageNumber", skip_serializing_if = "Option::is_none", default)]
    pub page_number: Option<u32>,
    /// Exact text of the span at capture time
    #[serde(rename = "selectedText")]
    pub selected_text: String,
    /// Start offset in the capturing text node (hint only)
    #[serde(rename = "startOffset", skip_serializing_if = "Option::is_none", default)]
    pub start_offset: Option<usize>,
    /// End offset in the capturing text node (hint only)
    #[serde(rename = "endOffset", skip_serializing_if = "Option::is_none", default)]
    pub end_offset: Option<usize>,
    /// Geometry relative to the page container (hint only)
    #[serde(rename = "boundingRect", skip_serializing_if = "Option::is_none", default)]
    pub bounding_rect: Option<Rect>,
    /// Type of annotation, opaque to the anchoring core
    #[serde(rename = "annotationType")]
    pub annotation_type: AnnotationType,
    /// Creation timestamp
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    /// Annotation-specific payload
    #[serde(flatten)]
    pub payload: AnchorPayload,
}

/// Annotation type label
///
/// Stored and returned exactly as supplied so that types unknown to this
/// server survive an import/export cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationType(String);

impl AnnotationType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn highlight() -> Self {
        Self::new("highlight")
    }

    pub fn note() -> Self {
        Self::new("note")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-positional data attached to an anchor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorPayload {
    /// Note text
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    /// Highlight color (CSS color value)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
    /// Any other fields, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Edit of an anchor's payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadUpdate {
    pub note: Option<String>,
    pub color: Option<String>,
}

impl TextAnchor {
    /// Build a new anchor from a captured selection
    pub fn from_capture(
        document_id: &str,
        annotation_type: AnnotationType,
        captured: CapturedSelection,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            page_number: Some(captured.page_number),
            selected_text: captured.text,
            start_offset: Some(captured.start_offset),
            end_offset: Some(captured.end_offset),
            bounding_rect: Some(captured.bounding_rect),
            annotation_type,
            created_at: now,
            updated_at: now,
            payload: AnchorPayload::default(),
        }
    }

    /// Set the note text
    pub fn with_note(mut self, note: &str) -> Self {
        self.payload.note = Some(note.to_string());
        self
    }

    /// Set the color
    pub fn with_color(mut self, color: &str) -> Self {
        self.payload.color = Some(color.to_string());
        self
    }

    /// Apply a payload edit. Positional fields never change.
    pub fn apply_update(&mut self, update: PayloadUpdate) {
        if let Some(note) = update.note {
            self.payload.note = Some(note);
        }
        if let Some(color) = update.color {
            self.payload.color = Some(color);
        }
        self.updated_at = Utc::now();
    }

    /// Serialize the payload for storage
    pub(crate) fn payload_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> CapturedSelection {
        CapturedSelection {
            text: "quick brown fox".to_string(),
            page_number: 3,
            start_offset: 4,
            end_offset: 19,
            bounding_rect: Rect::new(10.0, 20.0, 100.0, 12.0),
        }
    }

    #[test]
    fn test_from_capture() {
        let anchor = TextAnchor::from_capture("doc-1", AnnotationType::highlight(), captured());

        assert_eq!(anchor.document_id, "doc-1");
        assert_eq!(anchor.page_number, Some(3));
        assert_eq!(anchor.selected_text, "quick brown fox");
        assert_eq!(anchor.start_offset, Some(4));
        assert_eq!(anchor.created_at, anchor.updated_at);
        assert!(!anchor.id.is_empty());
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let anchor = TextAnchor::from_capture("doc-1", AnnotationType::note(), captured())
            .with_note("remember this")
            .with_color("#ff0000");

        let json = serde_json::to_value(&anchor).unwrap();
        assert_eq!(json["documentId"], "doc-1");
        assert_eq!(json["selectedText"], "quick brown fox");
        assert_eq!(json["annotationType"], "note");
        assert_eq!(json["note"], "remember this");
        assert_eq!(json["boundingRect"]["width"], 100.0);
    }

    #[test]
    fn test_unknown_fields_are_carried_through() {
        let json = serde_json::json!({
            "id": "a1",
            "documentId": "doc-1",
            "selectedText": "hello",
            "annotationType": "squiggle",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "tags": ["one", "two"]
        });

        let anchor: TextAnchor = serde_json::from_value(json).unwrap();
        assert_eq!(anchor.annotation_type.as_str(), "squiggle");
        assert_eq!(anchor.payload.extra["tags"], serde_json::json!(["one", "two"]));

        let back = serde_json::to_value(&anchor).unwrap();
        assert_eq!(back["tags"][1], "two");
    }

    #[test]
    fn test_apply_update_keeps_position() {
        let mut anchor = TextAnchor::from_capture("doc-1", AnnotationType::note(), captured());
        let created = anchor.created_at;

        anchor.apply_update(PayloadUpdate {
            note: Some("edited".to_string()),
            color: None,
        });

        assert_eq!(anchor.payload.note.as_deref(), Some("edited"));
        assert_eq!(anchor.selected_text, "quick brown fox");
        assert_eq!(anchor.created_at, created);
        assert!(anchor.updated_at >= created);
    }
}
