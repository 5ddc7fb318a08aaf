//! Selection capture
//!
//! Turns a live selection into a page-relative description that no longer
//! refers to any rendered node.

use super::surface::{Rect, RenderTree, Selection};

/// A normalized selection, ready to become a [`TextAnchor`](super::TextAnchor)
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    /// Trimmed selected text, never empty
    pub text: String,
    /// Page number as reported by the viewer
    pub page_number: u32,
    /// Offset of the first character of `text` in the start node
    pub start_offset: usize,
    /// Offset just past the last character of `text` in the end node
    pub end_offset: usize,
    /// Bounds of every text node the selection touches, relative to the
    /// page container. Node-granular, not the exact selected range.
    pub bounding_rect: Rect,
}

/// Capture the current selection
///
/// Returns `None` for collapsed or blank selections and for selections that
/// are not inside a page content region (toolbar, sidebar, or spanning two
/// pages). The page number is taken from the viewer rather than inferred
/// from the tree.
pub fn capture_selection(
    tree: &RenderTree,
    selection: &Selection,
    current_page: u32,
) -> Option<CapturedSelection> {
    if selection.is_collapsed() {
        return None;
    }

    if current_page == 0 {
        tracing::warn!("Ignoring selection captured with page number 0");
        return None;
    }

    let raw = tree.selected_text(selection)?;
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let (start, end) = selection.ordered();
    let common = tree.common_ancestor(start.node, end.node)?;
    let Some(page) = tree.page_container(common) else {
        tracing::debug!("Selection is outside page content, not capturing");
        return None;
    };
    let page_rect = tree.node(page)?.rect;

    // Offsets follow the trimmed text, clamped to their own nodes
    let leading = raw.chars().take_while(|c| c.is_whitespace()).count();
    let trailing = raw.chars().rev().take_while(|c| c.is_whitespace()).count();
    let start_len = tree.text(start.node).map_or(0, |t| t.chars().count());
    let start_offset = (start.offset + leading).min(start_len);
    let end_offset = end.offset.saturating_sub(trailing);

    let bounds = tree
        .text_nodes_between(start.node, end.node)
        .into_iter()
        .filter_map(|id| tree.node(id).map(|n| n.rect))
        .reduce(|acc, rect| acc.union(&rect))?;

    Some(CapturedSelection {
        text: text.to_string(),
        page_number: current_page,
        start_offset,
        end_offset,
        bounding_rect: bounds.relative_to(&page_rect),
    })
}
