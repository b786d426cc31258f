//! Strict parsing and structural validation of model output.
//!
//! A single surrounding markdown fence is tolerated; anything else that is not
//! the bare JSON object (leading prose, trailing commas, missing keys) fails and
//! is left to the repair pass.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::analysis::models::{AnalysisResult, Insight, RiskLevel};

/// Why a completion could not be turned into an `AnalysisResult`.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("malformed JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("unexpected shape: {0}")]
    Shape(String),

    #[error(
        "insights[{index}].risk_level: unrecognized risk level '{value}' \
         (must be one of \"High\", \"Medium\", \"Low\", \"Informational\")"
    )]
    UnrecognizedRiskLevel { index: usize, value: String },
}

/// Parses a raw completion into an `AnalysisResult`.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ParseFailure> {
    let body = strip_json_fences(raw);
    let value: Value = serde_json::from_str(body)?;

    let object = value
        .as_object()
        .ok_or_else(|| shape("top level must be a JSON object"))?;

    let summary = string_field(object, "summary", "summary")?;

    let insights = object
        .get("insights")
        .ok_or_else(|| shape("missing key 'insights'"))?
        .as_array()
        .ok_or_else(|| shape("'insights' must be an array"))?
        .iter()
        .enumerate()
        .map(|(index, item)| parse_insight(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult { summary, insights })
}

fn parse_insight(index: usize, item: &Value) -> Result<Insight, ParseFailure> {
    let object = item
        .as_object()
        .ok_or_else(|| shape(format!("insights[{index}] must be an object")))?;

    let field = |key: &str| string_field(object, key, &format!("insights[{index}].{key}"));

    let clause_name = field("clause_name")?;
    let risk_label = field("risk_level")?;
    let quote = field("quote")?;
    let insight = field("insight")?;
    let suggestion = field("suggestion")?;

    let risk_level = RiskLevel::parse(&risk_label).ok_or(ParseFailure::UnrecognizedRiskLevel {
        index,
        value: risk_label,
    })?;

    Ok(Insight {
        clause_name,
        risk_level,
        quote,
        insight,
        suggestion,
    })
}

fn string_field(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, ParseFailure> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(shape(format!(
            "'{path}' must be a string, got {}",
            type_name(other)
        ))),
        None => Err(shape(format!("missing key '{path}'"))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn shape(message: impl Into<String>) -> ParseFailure {
    ParseFailure::Shape(message.into())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    let stripped = stripped
        .strip_prefix("json")
        .or_else(|| stripped.strip_prefix("JSON"))
        .unwrap_or(stripped)
        .trim_start();
    stripped
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or(stripped)
}
