//! Page highlighting
//!
//! Restores every anchor of a page in one pass and renders the page's text
//! layer as HTML with highlight spans around the restored ranges.

use serde::Serialize;

use super::restore::{restore, MatchResult, TextNode};
use super::types::TextAnchor;

/// Configuration for highlight markup
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute for annotation ID
    pub id_attribute: String,
    /// Data attribute for annotation type
    pub type_attribute: String,
    /// Whether to include inline styles
    pub include_inline_styles: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            class_prefix: "mg-highlight".to_string(),
            id_attribute: "data-annotation-id".to_string(),
            type_attribute: "data-annotation-type".to_string(),
            include_inline_styles: true,
        }
    }
}

/// A restored range on the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightSpan {
    #[serde(rename = "anchorId")]
    pub anchor_id: String,
    #[serde(rename = "annotationType")]
    pub annotation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub node: usize,
    #[serde(rename = "localStart")]
    pub local_start: usize,
    #[serde(rename = "localLength")]
    pub local_length: usize,
}

/// Result of restoring a page's anchors
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageRestoration {
    /// Restored ranges, in anchor order
    pub spans: Vec<HighlightSpan>,
    /// Number of anchors successfully restored
    #[serde(rename = "restoredCount")]
    pub restored_count: usize,
    /// Anchors whose text was not found on the page
    #[serde(rename = "failedAnnotations")]
    pub failed_annotations: Vec<String>,
}

/// Restore each anchor against the same page content
pub fn restore_page<N: TextNode>(anchors: &[TextAnchor], nodes: &[N]) -> PageRestoration {
    let mut restoration = PageRestoration::default();

    for anchor in anchors {
        match restore(anchor, nodes) {
            MatchResult::Matched {
                node,
                local_start,
                local_length,
            } => {
                restoration.restored_count += 1;
                restoration.spans.push(HighlightSpan {
                    anchor_id: anchor.id.clone(),
                    annotation_type: anchor.annotation_type.to_string(),
                    color: anchor.payload.color.clone(),
                    node,
                    local_start,
                    local_length,
                });
            }
            MatchResult::NotFound => restoration.failed_annotations.push(anchor.id.clone()),
        }
    }

    if !restoration.failed_annotations.is_empty() {
        tracing::debug!(
            restored = restoration.restored_count,
            missing = restoration.failed_annotations.len(),
            "Some anchors could not be restored on page"
        );
    }

    restoration
}

/// Render the text layer with highlight spans
///
/// Every node becomes a `<span>` with escaped text. Where restored spans in
/// the same node overlap, the one starting first is kept.
pub fn render_page_html<N: TextNode>(
    nodes: &[N],
    restoration: &PageRestoration,
    config: &HighlightConfig,
) -> String {
    let mut html = String::new();

    for (index, node) in nodes.iter().enumerate() {
        let mut spans: Vec<&HighlightSpan> = restoration
            .spans
            .iter()
            .filter(|s| s.node == index)
            .collect();
        spans.sort_by_key(|s| s.local_start);

        let chars: Vec<char> = node.text().chars().collect();
        let mut cursor = 0;

        html.push_str("<span class=\"");
        html.push_str(&config.class_prefix);
        html.push_str("-text\">");

        for span in spans {
            if span.local_start < cursor {
                tracing::debug!(anchor_id = %span.anchor_id, "Skipping overlapping highlight");
                continue;
            }
            let end = (span.local_start + span.local_length).min(chars.len());
            push_text(&mut html, &chars[cursor..span.local_start.min(end)]);
            html.push_str(&open_highlight(span, config));
            push_text(&mut html, &chars[span.local_start.min(end)..end]);
            html.push_str("</span>");
            cursor = end;
        }
        push_text(&mut html, &chars[cursor..]);

        html.push_str("</span>");
    }

    html
}

fn push_text(html: &mut String, chars: &[char]) {
    let text: String = chars.iter().collect();
    html.push_str(&html_escape::encode_text(&text));
}

/// Format the opening tag of a highlight span
fn open_highlight(span: &HighlightSpan, config: &HighlightConfig) -> String {
    let kind = html_escape::encode_double_quoted_attribute(&span.annotation_type);
    let class = format!("{} {}-{}", config.class_prefix, config.class_prefix, kind);

    let style = match (&span.color, config.include_inline_styles) {
        (Some(color), true) => format!(
            " style=\"background-color: {};\"",
            html_escape::encode_double_quoted_attribute(color)
        ),
        _ => String::new(),
    };

    format!(
        "<span class=\"{}\" {}=\"{}\" {}=\"{}\"{}>",
        class,
        config.id_attribute,
        html_escape::encode_double_quoted_attribute(&span.anchor_id),
        config.type_attribute,
        kind,
        style
    )
}
