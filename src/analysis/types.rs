//! Analysis types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Kinds of analysis the external service performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    Summarize,
    ExtractKeyFindings,
    ExtractConcepts,
    ComprehensiveAnalyze,
    GenerateQuestions,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::Summarize,
        AnalysisKind::ExtractKeyFindings,
        AnalysisKind::ExtractConcepts,
        AnalysisKind::ComprehensiveAnalyze,
        AnalysisKind::GenerateQuestions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summarize => "summarize",
            AnalysisKind::ExtractKeyFindings => "extract-key-findings",
            AnalysisKind::ExtractConcepts => "extract-concepts",
            AnalysisKind::ComprehensiveAnalyze => "comprehensive-analyze",
            AnalysisKind::GenerateQuestions => "generate-questions",
        }
    }
}

impl FromStr for AnalysisKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AnalysisError::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis request as received from clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "analysisType", default)]
    pub analysis_type: Option<String>,
}

/// Successful analysis, wrapping the service result unchanged
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    #[serde(rename = "analysisType")]
    pub analysis_type: AnalysisKind,
    pub result: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("content is required")]
    MissingContent,

    #[error("analysisType is required")]
    MissingKind,

    #[error("unsupported analysisType: {0}")]
    UnknownKind(String),

    #[error("analysis service request failed: {0}")]
    Request(String),

    #[error("analysis service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("invalid analysis response: {0}")]
    InvalidResponse(String),
}
