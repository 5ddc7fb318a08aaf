//! Application state management

use std::sync::Arc;

use crate::analysis::AnalysisService;
use crate::anchors::{AnchorStore, HighlightConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn AnchorStore>,
    analysis: Arc<dyn AnalysisService>,
    highlight: HighlightConfig,
}

impl AppState {
    /// Create a new application state
    pub fn new(store: Arc<dyn AnchorStore>, analysis: Arc<dyn AnalysisService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                analysis,
                highlight: HighlightConfig::default(),
            }),
        }
    }

    /// Get the anchor store
    pub fn store(&self) -> &dyn AnchorStore {
        self.inner.store.as_ref()
    }

    /// Get the analysis service
    pub fn analysis(&self) -> &dyn AnalysisService {
        self.inner.analysis.as_ref()
    }

    /// Get the highlight markup settings
    pub fn highlight(&self) -> &HighlightConfig {
        &self.inner.highlight
    }
}
