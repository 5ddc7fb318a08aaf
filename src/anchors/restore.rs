//! Anchor restoration
//!
//! Relocates an anchor's text in freshly rendered page content. Matching is
//! pure and works on any ordered sequence of text nodes; applying the match
//! to a live selection is a separate step behind [`SelectionSink`].

use serde::Serialize;

use super::surface::{NodeId, RenderTree, Selection};
use super::types::TextAnchor;

/// Anything that exposes rendered text
pub trait TextNode {
    fn text(&self) -> &str;
}

impl TextNode for str {
    fn text(&self) -> &str {
        self
    }
}

impl TextNode for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

impl<T: TextNode + ?Sized> TextNode for &T {
    fn text(&self) -> &str {
        (**self).text()
    }
}

/// Outcome of a restoration attempt
///
/// `NotFound` is an ordinary outcome: page text can legitimately drift
/// between renders, and the caller decides how to surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum MatchResult {
    #[serde(rename = "matched")]
    Matched {
        /// Index of the node in the supplied sequence
        node: usize,
        /// Character offset of the match in that node
        #[serde(rename = "localStart")]
        local_start: usize,
        /// Match length in characters
        #[serde(rename = "localLength")]
        local_length: usize,
    },
    #[serde(rename = "notFound")]
    NotFound,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    /// Slice the matched range out of the matched node's text
    pub fn extract<'a>(&self, node_text: &'a str) -> Option<&'a str> {
        let MatchResult::Matched {
            local_start,
            local_length,
            ..
        } = *self
        else {
            return None;
        };
        let start = byte_index(node_text, local_start)?;
        let end = byte_index(node_text, local_start + local_length)?;
        node_text.get(start..end)
    }
}

/// Byte index of the `chars`-th character, allowing one-past-the-end
fn byte_index(text: &str, chars: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(chars)
}

/// Character offsets of every occurrence of `needle`, overlapping included
fn occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut chars_before = 0;
    let mut last_byte = 0;
    let mut from = 0;

    while let Some(pos) = haystack[from..].find(needle) {
        let byte = from + pos;
        chars_before += haystack[last_byte..byte].chars().count();
        last_byte = byte;
        found.push(chars_before);

        let step = haystack[byte..].chars().next().map_or(1, char::len_utf8);
        from = byte + step;
    }

    found
}

/// Locate an anchor's text in a page's text nodes
///
/// The first node containing the whole text wins. When that node contains
/// the text more than once, the occurrence closest to the stored start
/// offset is used (earliest on ties or without an offset).
pub fn restore<N: TextNode>(anchor: &TextAnchor, nodes: &[N]) -> MatchResult {
    let needle = anchor.selected_text.as_str();
    if needle.is_empty() {
        return MatchResult::NotFound;
    }
    let local_length = needle.chars().count();

    for (index, node) in nodes.iter().enumerate() {
        let found = occurrences(node.text(), needle);
        let local_start = match (found.as_slice(), anchor.start_offset) {
            ([], _) => continue,
            ([only], _) | ([only, ..], None) => *only,
            (many, Some(hint)) => many
                .iter()
                .copied()
                .min_by_key(|start| start.abs_diff(hint))
                .unwrap_or(many[0]),
        };

        if found.len() > 1 {
            tracing::debug!(
                anchor_id = %anchor.id,
                node = index,
                occurrences = found.len(),
                chosen = local_start,
                "Anchor text occurs more than once in node"
            );
        }

        return MatchResult::Matched {
            node: index,
            local_start,
            local_length,
        };
    }

    tracing::debug!(anchor_id = %anchor.id, nodes = nodes.len(), "Anchor text not found on page");
    MatchResult::NotFound
}

/// Receives a restored range, e.g. to replace the live selection
pub trait SelectionSink {
    fn select(&mut self, node: usize, local_start: usize, local_length: usize);
}

/// Restore an anchor and hand a match to `sink`
///
/// The sink is left untouched when nothing matches.
pub fn apply_restoration<N, S>(anchor: &TextAnchor, nodes: &[N], sink: &mut S) -> MatchResult
where
    N: TextNode,
    S: SelectionSink + ?Sized,
{
    let result = restore(anchor, nodes);
    if let MatchResult::Matched {
        node,
        local_start,
        local_length,
    } = result
    {
        sink.select(node, local_start, local_length);
    }
    result
}

/// The live selection of one rendered page
#[derive(Debug, Clone)]
pub struct LiveSelection {
    text_nodes: Vec<NodeId>,
    current: Option<Selection>,
}

impl LiveSelection {
    /// Track the selection for the page rooted at `page`
    pub fn for_page(tree: &RenderTree, page: NodeId) -> Self {
        Self {
            text_nodes: tree.text_nodes_in(page),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Restore `anchor` on this page's nodes and select the match
    pub fn restore(&mut self, tree: &RenderTree, anchor: &TextAnchor) -> MatchResult {
        let texts: Vec<&str> = self
            .text_nodes
            .iter()
            .filter_map(|id| tree.text(*id))
            .collect();
        apply_restoration(anchor, &texts, self)
    }
}

impl SelectionSink for LiveSelection {
    fn select(&mut self, node: usize, local_start: usize, local_length: usize) {
        self.current = self
            .text_nodes
            .get(node)
            .map(|id| Selection::within(*id, local_start, local_start + local_length));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::capture::capture_selection;
    use crate::anchors::surface::Rect;
    use crate::anchors::types::AnnotationType;
    use chrono::Utc;

    fn anchor(text: &str, start: Option<usize>) -> TextAnchor {
        let now = Utc::now();
        TextAnchor {
            id: "a1".to_string(),
            document_id: "doc".to_string(),
            page_number: Some(1),
            selected_text: text.to_string(),
            start_offset: start,
            end_offset: None,
            bounding_rect: None,
            annotation_type: AnnotationType::highlight(),
            created_at: now,
            updated_at: now,
            payload: Default::default(),
        }
    }

    #[test]
    fn test_matches_inside_second_node() {
        let nodes = ["Intro. ", "The quick brown fox jumps.", " Conclusion."];
        let result = restore(&anchor("quick brown fox", None), &nodes);

        assert_eq!(
            result,
            MatchResult::Matched {
                node: 1,
                local_start: 4,
                local_length: 15
            }
        );
        assert_eq!(result.extract(nodes[1]), Some("quick brown fox"));
    }

    #[test]
    fn test_missing_text_is_not_found() {
        let nodes = vec!["Intro. ".to_string(), "Nothing here.".to_string()];
        assert_eq!(restore(&anchor("quick", None), &nodes), MatchResult::NotFound);
    }

    #[test]
    fn test_text_split_across_nodes_is_not_found() {
        let nodes = ["The quick ", "brown fox"];
        assert_eq!(
            restore(&anchor("quick brown", None), &nodes),
            MatchResult::NotFound
        );
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let nodes = ["THE QUICK BROWN FOX"];
        assert!(!restore(&anchor("quick", None), &nodes).is_matched());
    }

    #[test]
    fn test_empty_page_is_not_found() {
        let nodes: [&str; 0] = [];
        assert_eq!(restore(&anchor("quick", None), &nodes), MatchResult::NotFound);
    }

    #[test]
    fn test_first_node_wins() {
        let nodes = ["no match", "fox one", "fox two"];
        let result = restore(&anchor("fox", Some(4)), &nodes);
        assert!(matches!(result, MatchResult::Matched { node: 1, local_start: 0, .. }));
    }

    #[test]
    fn test_start_offset_breaks_ties_within_node() {
        let nodes = ["the cat saw the dog and the bird"];

        let near_end = restore(&anchor("the", Some(23)), &nodes);
        assert!(matches!(near_end, MatchResult::Matched { local_start: 24, .. }));

        let no_hint = restore(&anchor("the", None), &nodes);
        assert!(matches!(no_hint, MatchResult::Matched { local_start: 0, .. }));

        let middle = restore(&anchor("the", Some(13)), &nodes);
        assert!(matches!(middle, MatchResult::Matched { local_start: 12, .. }));
    }

    #[test]
    fn test_offsets_count_characters() {
        let nodes = ["Café au lait, s'il vous plaît"];
        let result = restore(&anchor("lait", None), &nodes);

        assert_eq!(
            result,
            MatchResult::Matched {
                node: 0,
                local_start: 8,
                local_length: 4
            }
        );
        assert_eq!(result.extract(nodes[0]), Some("lait"));
    }

    #[test]
    fn test_overlapping_occurrences() {
        assert_eq!(occurrences("aaaa", "aa"), vec![0, 1, 2]);
        assert_eq!(occurrences("ééxéé", "éé"), vec![0, 3]);
    }

    #[test]
    fn test_sink_untouched_on_miss() {
        struct Recorder(Vec<(usize, usize, usize)>);
        impl SelectionSink for Recorder {
            fn select(&mut self, node: usize, start: usize, len: usize) {
                self.0.push((node, start, len));
            }
        }

        let mut recorder = Recorder(Vec::new());
        let nodes = ["alpha", "beta"];
        apply_restoration(&anchor("gamma", None), &nodes, &mut recorder);
        assert!(recorder.0.is_empty());

        apply_restoration(&anchor("eta", None), &nodes, &mut recorder);
        assert_eq!(recorder.0, vec![(1, 1, 3)]);
    }

    fn render(page_texts: &[&str], page_offset: f64) -> (RenderTree, NodeId) {
        let mut tree = RenderTree::new();
        let root = tree.push_element(None, "body", Rect::new(0.0, 0.0, 800.0, 1000.0));
        let page = tree.push_page(Some(root), Rect::new(0.0, page_offset, 800.0, 1000.0));
        for (i, text) in page_texts.iter().enumerate() {
            let y = page_offset + 20.0 * i as f64;
            tree.push_text(page, text, Rect::new(0.0, y, 400.0, 16.0));
        }
        (tree, page)
    }

    #[test]
    fn test_capture_then_restore_on_new_render() {
        let (first_render, page) = render(&["Intro. ", "The quick brown fox jumps."], 0.0);
        let text_node = first_render.text_nodes_in(page)[1];
        let selection = Selection::within(text_node, 3, 20);

        let captured = capture_selection(&first_render, &selection, 1).unwrap();
        let anchor = TextAnchor::from_capture("doc", AnnotationType::highlight(), captured);
        assert_eq!(anchor.selected_text, "quick brown fox");

        // Zoomed re-render with an extra leading node
        let (second_render, page) =
            render(&["Header", "Intro. ", "The quick brown fox jumps."], 400.0);
        let mut live = LiveSelection::for_page(&second_render, page);

        let result = live.restore(&second_render, &anchor);
        assert!(result.is_matched());

        let restored = live.current().unwrap();
        assert_eq!(
            second_render.selected_text(restored).as_deref(),
            Some("quick brown fox")
        );
    }
}
