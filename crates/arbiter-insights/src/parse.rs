//! Strict validation of the analysis dependency's raw response.
//!
//! The whole response must be one JSON document of the expected shape. No
//! attempt is made to dig a JSON object out of surrounding prose.

use arbiter_core::models::AnalysisOutput;

/// Result of validating a raw analysis response.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisParse {
    Parsed(AnalysisOutput),
    Unparsable { raw: String, reason: String },
}

impl AnalysisParse {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

pub fn parse_analysis(raw: &str) -> AnalysisParse {
    let output: AnalysisOutput = match serde_json::from_str(raw.trim()) {
        Ok(output) => output,
        Err(e) => {
            return AnalysisParse::Unparsable {
                raw: raw.to_string(),
                reason: e.to_string(),
            }
        }
    };

    if let Some(i) = output
        .variants
        .iter()
        .position(|v| v.variant_label.trim().is_empty())
    {
        return AnalysisParse::Unparsable {
            raw: raw.to_string(),
            reason: format!("variant {i} has an empty label"),
        };
    }
    AnalysisParse::Parsed(output)
}
