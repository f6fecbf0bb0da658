//! Response classification for contact attempts.
//!
//! Turns an HTTP status plus response body into an intent signal and
//! a ledger status. Keyword matching is deliberately crude: agents
//! respond in free text and the only safe bias is toward opt-out.

use crate::util::stringify_json;
use agentry_state::AttemptStatus;

/// Intent read out of a contact response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseIntent {
    Interested,
    Delivered,
    Declined,
    OptedOut,
    Failed,
    Unknown,
}

/// How certain the classifier is about its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Classification of a single contact response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseAnalysis {
    pub intent: ResponseIntent,
    pub confidence: Confidence,
    pub interested: bool,
    pub opted_out: bool,
}

impl ResponseAnalysis {
    fn new(intent: ResponseIntent, confidence: Confidence) -> Self {
        Self {
            intent,
            confidence,
            interested: matches!(intent, ResponseIntent::Interested),
            opted_out: matches!(intent, ResponseIntent::OptedOut),
        }
    }
}

const INTEREST_KEYWORDS: &[&str] = &["registered", "accepted", "thanks", "thank you", "welcome"];

const OPT_OUT_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "opt-out",
    "opt out",
    "stop",
    "do not contact",
    "dont contact",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify an HTTP response from a contacted agent.
///
/// Opt-out keywords win over everything else regardless of status code.
/// This scan is a best-effort courtesy signal, not a guarantee that
/// every refusal phrasing is caught.
pub fn analyze_response(status: Option<u16>, body: Option<&serde_json::Value>) -> ResponseAnalysis {
    let text = body.map(stringify_json).unwrap_or_default().to_lowercase();

    if contains_any(&text, OPT_OUT_KEYWORDS) {
        return ResponseAnalysis::new(ResponseIntent::OptedOut, Confidence::High);
    }

    match status {
        Some(200 | 201 | 202) => {
            if contains_any(&text, INTEREST_KEYWORDS) {
                ResponseAnalysis::new(ResponseIntent::Interested, Confidence::High)
            } else {
                ResponseAnalysis::new(ResponseIntent::Delivered, Confidence::Medium)
            }
        }
        Some(403 | 405) => ResponseAnalysis::new(ResponseIntent::Declined, Confidence::Medium),
        Some(410) => ResponseAnalysis::new(ResponseIntent::OptedOut, Confidence::High),
        Some(404) => ResponseAnalysis::new(ResponseIntent::Failed, Confidence::High),
        Some(code) if code >= 500 => ResponseAnalysis::new(ResponseIntent::Failed, Confidence::High),
        Some(code) if code >= 400 => ResponseAnalysis::new(ResponseIntent::Failed, Confidence::Medium),
        _ => ResponseAnalysis::new(ResponseIntent::Unknown, Confidence::Low),
    }
}

/// Ledger status for a finished contact attempt.
///
/// Transport failure trumps any body content; otherwise a recognized
/// intent wins, and an unrecognized 2xx still counts as delivered.
pub fn contact_status(success: bool, status: Option<u16>, analysis: &ResponseAnalysis) -> AttemptStatus {
    if !success {
        return AttemptStatus::Failed;
    }
    match analysis.intent {
        ResponseIntent::Interested => AttemptStatus::Interested,
        ResponseIntent::Declined => AttemptStatus::Declined,
        ResponseIntent::OptedOut => AttemptStatus::OptedOut,
        ResponseIntent::Failed => AttemptStatus::Failed,
        ResponseIntent::Delivered => AttemptStatus::Delivered,
        ResponseIntent::Unknown => match status {
            Some(code) if (200..300).contains(&code) => AttemptStatus::Delivered,
            _ => AttemptStatus::Sent,
        },
    }
}
