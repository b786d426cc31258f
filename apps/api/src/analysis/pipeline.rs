//! Structured completion pipeline: generate, then validate-and-repair once.
//!
//! Stages are strictly linear:
//! `Initial completion -> Parse -> [on failure] Repair completion -> Parse -> terminal`.
//! There is exactly one repair pass. Provider failures are never repaired.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::analysis::parser::{parse_analysis, ParseFailure};
use crate::analysis::prompts::{render, render_repair_prompt};
use crate::analysis::quotes::find_unverified_quotes;
use crate::llm_client::{CompletionProvider, LlmError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model provider failure: {0}")]
    Provider(#[from] LlmError),

    #[error("Model output unparsable after repair (initial: {initial}; repaired: {repaired})")]
    UnparsableModelOutput {
        initial: ParseFailure,
        repaired: ParseFailure,
    },
}

/// Owns the provider handle; cheap to share behind an `Arc` across requests.
pub struct AnalysisPipeline {
    provider: Arc<dyn CompletionProvider>,
}

impl AnalysisPipeline {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Runs one analysis cycle for `document_text` from the perspective of `role`.
    ///
    /// Makes one provider call in the common case and two when the first
    /// completion fails to parse. Empty inputs are rejected before any call.
    pub async fn analyze(
        &self,
        role: &str,
        document_text: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let request = AnalysisRequest::new(role, document_text)?;

        let span = info_span!(
            "analysis",
            analysis_id = %Uuid::new_v4(),
            role = request.role,
            document_chars = request.document_text.chars().count(),
            model = self.provider.model(),
        );

        self.run(request).instrument(span).await
    }

    async fn run(&self, request: AnalysisRequest<'_>) -> Result<AnalysisResult, AnalysisError> {
        let prompt = render(request.role, request.document_text);
        let completion = self.provider.complete(&prompt).await?;

        let result = match parse_analysis(&completion) {
            Ok(result) => result,
            Err(initial) => {
                warn!(error = %initial, "Model output failed validation, requesting repair");
                self.repair(&completion, initial).await?
            }
        };

        let unverified = find_unverified_quotes(&result, request.document_text);
        for quote in &unverified {
            warn!(
                index = quote.index,
                clause = %quote.clause_name,
                "Insight quote not found verbatim in document"
            );
        }

        info!(
            insights = result.insights.len(),
            unverified_quotes = unverified.len(),
            "Analysis complete"
        );
        Ok(result)
    }

    /// The single repair pass. Any failure here is terminal.
    async fn repair(
        &self,
        malformed: &str,
        initial: ParseFailure,
    ) -> Result<AnalysisResult, AnalysisError> {
        let repair_prompt = render_repair_prompt(malformed, &initial.to_string());
        let repaired_completion = self.provider.complete(&repair_prompt).await?;

        match parse_analysis(&repaired_completion) {
            Ok(result) => {
                info!("Repair pass produced valid output");
                Ok(result)
            }
            Err(repaired) => Err(AnalysisError::UnparsableModelOutput { initial, repaired }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::RiskLevel;
    use crate::llm_client::testing::{ok, ScriptedProvider};

    const DOC: &str = "3. All invoices must be paid within 30 days of receipt or a 1.25% per day \
        (18% per annum) fee will be added to the total due.";

    const VALID: &str = r#"{"summary":"One steep late fee.","insights":[{"clause_name":"Late Payment","risk_level":"Medium","quote":"a 1.25% per day (18% per annum) fee will be added","insight":"The fee compounds quickly.","suggestion":"Ask for a flat monthly fee."}]}"#;

    fn pipeline(provider: &Arc<ScriptedProvider>) -> AnalysisPipeline {
        AnalysisPipeline::new(provider.clone())
    }

    #[tokio::test]
    async fn test_valid_first_completion_returns_without_repair() {
        let provider = ScriptedProvider::new(vec![ok(VALID)]);
        let result = pipeline(&provider).analyze("tenant", DOC).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(result.summary, "One steep late fee.");
        assert_eq!(result.insights[0].clause_name, "Late Payment");
        assert_eq!(result.insights[0].risk_level, RiskLevel::Medium);

        let prompt = provider.prompt(0);
        assert!(prompt.contains("tenant"));
        assert!(prompt.contains(DOC));
    }

    #[tokio::test]
    async fn test_fenced_completion_parses_without_repair() {
        let fenced = format!("```json\n{VALID}\n```");
        let provider = ScriptedProvider::new(vec![ok(&fenced)]);
        let result = pipeline(&provider).analyze("tenant", DOC).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(result.insights.len(), 1);
    }

    #[tokio::test]
    async fn test_prose_wrapped_completion_is_repaired_once() {
        let wrapped = format!("Sure, here is my analysis:\n{VALID}\nLet me know if you need more.");
        let provider = ScriptedProvider::new(vec![ok(&wrapped), ok(VALID)]);
        let result = pipeline(&provider).analyze("tenant", DOC).await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(result.summary, "One steep late fee.");

        let repair_prompt = provider.prompt(1);
        assert!(repair_prompt.contains(&wrapped));
        assert!(repair_prompt.contains("malformed JSON"));
    }

    #[tokio::test]
    async fn test_unrecognized_risk_level_triggers_repair() {
        let critical = VALID.replace("\"Medium\"", "\"Critical\"");
        let provider = ScriptedProvider::new(vec![ok(&critical), ok(VALID)]);
        let result = pipeline(&provider).analyze("employer", DOC).await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(result.insights[0].risk_level, RiskLevel::Medium);
        assert!(provider.prompt(1).contains("unrecognized risk level 'Critical'"));
    }

    #[tokio::test]
    async fn test_lowercase_risk_level_is_not_accepted_without_repair() {
        let lowercase = VALID.replace("\"Medium\"", "\"medium\"");
        let provider = ScriptedProvider::new(vec![ok(&lowercase), ok(VALID)]);
        let result = pipeline(&provider).analyze("tenant", DOC).await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(result.insights[0].risk_level, RiskLevel::Medium);
        assert!(provider.prompt(1).contains("unrecognized risk level 'medium'"));
    }

    #[tokio::test]
    async fn test_two_unparsable_completions_fail_after_exactly_two_calls() {
        let provider = ScriptedProvider::new(vec![
            ok("I cannot analyze this document."),
            ok("Apologies, here is a summary in prose."),
            ok(VALID),
        ]);
        let err = pipeline(&provider).analyze("tenant", DOC).await.unwrap_err();

        assert_eq!(provider.calls(), 2);
        assert!(matches!(
            err,
            AnalysisError::UnparsableModelOutput {
                initial: ParseFailure::Syntax(_),
                repaired: ParseFailure::Syntax(_),
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_inputs_make_no_calls() {
        let provider = ScriptedProvider::new(vec![ok(VALID)]);
        let pipeline = pipeline(&provider);

        let err = pipeline.analyze("", DOC).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let err = pipeline.analyze("tenant", "   ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_repaired() {
        let provider = ScriptedProvider::new(vec![
            Err(LlmError::Api {
                status: 503,
                message: "connection refused".to_string(),
            }),
            ok(VALID),
        ]);
        let err = pipeline(&provider).analyze("tenant", DOC).await.unwrap_err();

        assert_eq!(provider.calls(), 1);
        assert!(matches!(err, AnalysisError::Provider(LlmError::Api { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_provider_failure_during_repair_surfaces_as_provider_error() {
        let provider = ScriptedProvider::new(vec![
            ok("not json"),
            Err(LlmError::RateLimited { retries: 3 }),
        ]);
        let err = pipeline(&provider).analyze("tenant", DOC).await.unwrap_err();

        assert_eq!(provider.calls(), 2);
        assert!(matches!(err, AnalysisError::Provider(LlmError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_unverified_quote_does_not_reject_result() {
        let paraphrased = VALID.replace(
            "a 1.25% per day (18% per annum) fee will be added",
            "late fees apply",
        );
        let provider = ScriptedProvider::new(vec![ok(&paraphrased)]);
        let result = pipeline(&provider).analyze("tenant", DOC).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(result.insights[0].quote, "late fees apply");
    }
}
