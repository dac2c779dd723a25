// Veritext Data Models
// Wire types for the analyze/extract actions and the session history.

use serde::{Deserialize, Serialize};

// ============ Verdict ============

/// Structured judgment returned by the classifier for one text submission.
/// Created once per successful classification call, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_ai_generated: bool,
    /// Confidence in the AI-generated label specifically, in [0, 1].
    pub confidence: f64,
    pub explanation: String,
}

impl Verdict {
    /// Percentage shown to the user, oriented toward whichever label is
    /// being asserted. The raw score is AI-oriented, so a human verdict
    /// displays the complement.
    pub fn displayed_confidence(&self) -> u8 {
        let percent = (self.confidence * 100.0).round() as u8;
        if self.is_ai_generated {
            percent
        } else {
            100 - percent
        }
    }

    pub fn label(&self) -> &'static str {
        if self.is_ai_generated {
            "AI-Generated"
        } else {
            "Human-Written"
        }
    }
}

// ============ Analysis Request ============

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub text: String,
    pub session_id: String,
}

// ============ Verdict View ============

/// Verdict enriched with the presentation fields the form renders
/// (label and oriented confidence percentage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictView {
    pub is_ai_generated: bool,
    pub confidence: f64,
    pub explanation: String,
    pub label: String,
    pub displayed_confidence: u8,
}

impl From<&Verdict> for VerdictView {
    fn from(v: &Verdict) -> Self {
        Self {
            is_ai_generated: v.is_ai_generated,
            confidence: v.confidence,
            explanation: v.explanation.clone(),
            label: v.label().to_string(),
            displayed_confidence: v.displayed_confidence(),
        }
    }
}

// ============ Action Envelopes ============

/// Result-or-error pair returned by the analyze action. Exactly one side
/// is populated; taxonomy errors never surface as transport failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub result: Option<VerdictView>,
    pub error: Option<String>,
}

/// Result-or-error pair returned by the extract action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub text: Option<String>,
    pub error: Option<String>,
}

// ============ History ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub ts: String,
    /// The originally analyzed text, verbatim.
    pub text: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryListResponse {
    pub items: Vec<HistoryEntry>,
}
