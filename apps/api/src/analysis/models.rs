use serde::Serialize;

use crate::analysis::pipeline::AnalysisError;

/// Risk classification for a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Informational,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
        RiskLevel::Informational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Informational => "Informational",
        }
    }

    /// Parses a model-supplied label. Only the four exact literals are accepted.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == label)
    }
}

/// One clause-level finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub clause_name: String,
    pub risk_level: RiskLevel,
    /// Expected to be a verbatim excerpt of the analyzed document.
    pub quote: String,
    pub insight: String,
    pub suggestion: String,
}

/// Structured risk assessment returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub insights: Vec<Insight>,
}

/// Validated input for one analysis cycle.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub role: &'a str,
    pub document_text: &'a str,
}

impl<'a> AnalysisRequest<'a> {
    pub fn new(role: &'a str, document_text: &'a str) -> Result<Self, AnalysisError> {
        if role.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("role cannot be empty".to_string()));
        }
        if document_text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "document text cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            role,
            document_text,
        })
    }
}
