//! Analysis dispatch
//!
//! Forwards a document's text to the external analysis service and hands
//! back its result unchanged. Nothing is retried.

mod service;
mod types;

pub use service::{AnalysisService, HttpAnalysisService};
pub use types::{AnalysisError, AnalysisKind, AnalysisRequest, AnalysisResponse};

use chrono::Utc;

/// Validate a request and run it against `service`
pub async fn dispatch<S>(service: &S, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>
where
    S: AnalysisService + ?Sized,
{
    let content = request
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(AnalysisError::MissingContent)?;
    let kind: AnalysisKind = request
        .analysis_type
        .ok_or(AnalysisError::MissingKind)?
        .parse()?;

    let result = service.analyze(kind, &content).await.map_err(|e| {
        tracing::warn!(%kind, "Analysis failed: {}", e);
        e
    })?;

    Ok(AnalysisResponse {
        analysis_type: kind,
        result,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Echoes the kind and content length, or fails when asked to
    struct MockService {
        fail: bool,
    }

    #[async_trait]
    impl AnalysisService for MockService {
        async fn analyze(
            &self,
            kind: AnalysisKind,
            content: &str,
        ) -> Result<serde_json::Value, AnalysisError> {
            if self.fail {
                return Err(AnalysisError::Upstream {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            Ok(json!({ "kind": kind.as_str(), "length": content.len() }))
        }
    }

    fn request(content: Option<&str>, kind: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            content: content.map(str::to_string),
            analysis_type: kind.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_dispatch_wraps_result() {
        let service = MockService { fail: false };
        let response = dispatch(&service, request(Some("some text"), Some("summarize")))
            .await
            .unwrap();

        assert_eq!(response.analysis_type, AnalysisKind::Summarize);
        assert_eq!(response.result, json!({ "kind": "summarize", "length": 9 }));
    }

    #[tokio::test]
    async fn test_dispatch_validates_input() {
        let service = MockService { fail: false };

        let missing_content = dispatch(&service, request(None, Some("summarize"))).await;
        assert!(matches!(missing_content, Err(AnalysisError::MissingContent)));

        let blank_content = dispatch(&service, request(Some("  "), Some("summarize"))).await;
        assert!(matches!(blank_content, Err(AnalysisError::MissingContent)));

        let missing_kind = dispatch(&service, request(Some("text"), None)).await;
        assert!(matches!(missing_kind, Err(AnalysisError::MissingKind)));

        let unknown = dispatch(&service, request(Some("text"), Some("poetry"))).await;
        assert!(matches!(unknown, Err(AnalysisError::UnknownKind(_))));
    }

    #[tokio::test]
    async fn test_dispatch_surfaces_service_failure() {
        let service = MockService { fail: true };
        let result = dispatch(&service, request(Some("text"), Some("generate-questions"))).await;
        assert!(matches!(result, Err(AnalysisError::Upstream { status: 503, .. })));
    }
}
