//! Text anchoring
//!
//! Captures text selections from a rendered PDF page as content-addressed
//! anchors and relocates them after the page has been rendered again.
//!
//! # Flow
//!
//! - [`capture_selection`] turns a live [`Selection`] over a [`RenderTree`]
//!   into a page-relative [`CapturedSelection`], which becomes a
//!   [`TextAnchor`].
//! - Anchors are persisted through an [`AnchorStore`], one at a time or in
//!   bulk with [`import_batch`].
//! - [`restore`] finds an anchor's text again in a page's text nodes;
//!   [`LiveSelection`] and [`restore_page`] apply the result.
//!
//! The selected text is the only thing used for matching. Offsets and
//! geometry captured alongside it are hints.

mod capture;
mod highlight;
mod import;
mod restore;
mod store;
mod surface;
mod types;

pub use capture::{capture_selection, CapturedSelection};
pub use highlight::{render_page_html, restore_page, HighlightConfig, HighlightSpan, PageRestoration};
pub use import::{
    import_batch, parse_import_request, parse_timestamp, ImportFailure, ImportOutcome,
    ImportReport, UNKNOWN_ID,
};
pub use restore::{apply_restoration, restore, LiveSelection, MatchResult, SelectionSink, TextNode};
pub use store::{AnchorStore, SqliteAnchorStore, StoreError};
pub use surface::{NodeId, NodeKind, Rect, RenderNode, RenderTree, Selection, SelectionPoint};
pub use types::{AnchorPayload, AnnotationType, PayloadUpdate, TextAnchor};
