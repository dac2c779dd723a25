// Analysis Orchestrator
// Validates input length, delegates to the classifier gateway, and maps
// failures to the user-facing taxonomy. No retries, no partial results.

use crate::models::Verdict;
use crate::services::classifier::Classifier;
use thiserror::Error;
use tracing::warn;

/// Minimum trimmed length (Unicode scalar count) before a remote call is made.
pub const MIN_ANALYSIS_CHARS: usize = 50;

/// Analysis failures. Display strings are the user-facing messages;
/// classifier causes are logged server-side only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    #[error("Please provide at least 50 characters for an accurate analysis.")]
    InputTooShort,
    #[error("An error occurred during analysis. The AI model may be busy. Please try again later.")]
    ClassifierUnavailable,
}

/// Classify `raw_text`, returning the verdict verbatim on success.
/// Inputs under [`MIN_ANALYSIS_CHARS`] never reach the gateway.
pub async fn analyze<C: Classifier>(
    classifier: &C,
    raw_text: &str,
) -> Result<Verdict, AnalyzeError> {
    let trimmed = raw_text.trim();
    if trimmed.chars().count() < MIN_ANALYSIS_CHARS {
        return Err(AnalyzeError::InputTooShort);
    }

    classifier.classify(raw_text).await.map_err(|e| {
        warn!("[ANALYZER] classification failed: {}", e);
        AnalyzeError::ClassifierUnavailable
    })
}
