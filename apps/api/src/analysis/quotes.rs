//! Quote fidelity check: is each insight's `quote` actually present in the document?
//!
//! Comparison is done on normalized text (collapsed whitespace, typographic quotes
//! folded to ASCII) since models routinely re-flow line breaks when quoting.
//! Mismatches are flagged, never used to reject a result.

use crate::analysis::models::AnalysisResult;

/// An insight whose quote could not be located in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedQuote {
    pub index: usize,
    pub clause_name: String,
}

pub fn find_unverified_quotes(result: &AnalysisResult, document: &str) -> Vec<UnverifiedQuote> {
    let haystack = normalize(document);

    result
        .insights
        .iter()
        .enumerate()
        .filter(|(_, insight)| {
            let needle = normalize(&insight.quote);
            needle.is_empty() || !haystack.contains(&needle)
        })
        .map(|(index, insight)| UnverifiedQuote {
            index,
            clause_name: insight.clause_name.clone(),
        })
        .collect()
}

fn normalize(text: &str) -> String {
    let folded = text.chars().map(|c| match c {
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        other => other,
    });

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in folded {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}
