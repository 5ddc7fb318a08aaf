//! Analysis service clients

use async_trait::async_trait;
use std::time::Duration;

use super::types::{AnalysisError, AnalysisKind};

/// External text analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Run one kind of analysis over a document's text
    async fn analyze(
        &self,
        kind: AnalysisKind,
        content: &str,
    ) -> Result<serde_json::Value, AnalysisError>;
}

/// HTTP analysis service
///
/// Posts `{"content": ...}` to `{endpoint}/{kind}` and returns the JSON body.
pub struct HttpAnalysisService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisService {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Request(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, kind: AnalysisKind) -> String {
        format!("{}/{}", self.endpoint, kind.as_str())
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(
        &self,
        kind: AnalysisKind,
        content: &str,
    ) -> Result<serde_json::Value, AnalysisError> {
        let url = self.url(kind);
        tracing::debug!(%kind, chars = content.len(), "Dispatching analysis to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upstream { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }
}
