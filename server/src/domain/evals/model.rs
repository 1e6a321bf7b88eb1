//! Evaluation records as attached to spans.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::utils::json::{NULL, get_f64, get_str, value_to_text};

/// Kind of quality check. Strings that name no known check read as
/// [`EvalType::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalType {
    PiiDetection,
    LatencyConsistency,
    HallucinationDetection,
    ToxicityDetection,
    RelevanceCheck,
    CoherenceCheck,
    Custom,
}

impl EvalType {
    pub const ALL: [EvalType; 7] = [
        Self::PiiDetection,
        Self::LatencyConsistency,
        Self::HallucinationDetection,
        Self::ToxicityDetection,
        Self::RelevanceCheck,
        Self::CoherenceCheck,
        Self::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PiiDetection => "pii_detection",
            Self::LatencyConsistency => "latency_consistency",
            Self::HallucinationDetection => "hallucination_detection",
            Self::ToxicityDetection => "toxicity_detection",
            Self::RelevanceCheck => "relevance_check",
            Self::CoherenceCheck => "coherence_check",
            Self::Custom => "custom",
        }
    }

    /// Lenient parse, used for upstream data.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(Self::Custom)
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse, used for user-supplied filters.
impl FromStr for EvalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("unknown evaluation type '{}'", name))
    }
}

/// One evaluation, read leniently from its JSON record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub id: Option<String>,
    pub eval_type: EvalType,
    /// `None` when the record does not say.
    pub passed: Option<bool>,
    /// 0 to 1.
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub latency_ms: Option<f64>,
    pub evaluator: Option<String>,
    pub status: Option<String>,
    /// Type-specific payload, kept as recorded.
    pub result: JsonValue,
}

impl Evaluation {
    pub fn from_value(value: &JsonValue) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .map(value_to_text)
                .filter(|s| !s.is_empty())
        };
        let type_name = get_str(value, "eval_type")
            .or_else(|| get_str(value, "type"))
            .unwrap_or_default();

        Self {
            id: text("id"),
            eval_type: EvalType::from_name(type_name),
            passed: value.get("passed").and_then(JsonValue::as_bool),
            score: get_f64(value, "score"),
            feedback: text("feedback"),
            latency_ms: get_f64(value, "latency_ms"),
            evaluator: text("evaluator"),
            status: text("status"),
            result: value.get("result").unwrap_or(&NULL).clone(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.passed == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eval_type_names() {
        assert_eq!(EvalType::from_name("pii_detection"), EvalType::PiiDetection);
        assert_eq!(
            EvalType::from_name("Hallucination_Detection"),
            EvalType::HallucinationDetection
        );
        assert_eq!(EvalType::from_name("sentiment"), EvalType::Custom);
        assert_eq!(EvalType::from_name(""), EvalType::Custom);
        assert!("sentiment".parse::<EvalType>().is_err());
        assert_eq!(
            "latency_consistency".parse::<EvalType>(),
            Ok(EvalType::LatencyConsistency)
        );
    }

    #[test]
    fn test_from_value() {
        let eval = Evaluation::from_value(&json!({
            "id": 7,
            "eval_type": "pii_detection",
            "passed": false,
            "score": 0.25,
            "feedback": "email found",
            "latency_ms": 12.5,
            "evaluator": "regex",
            "result": {"pii_count": 1}
        }));
        assert_eq!(eval.id.as_deref(), Some("7"));
        assert_eq!(eval.eval_type, EvalType::PiiDetection);
        assert!(eval.is_failed());
        assert_eq!(eval.score, Some(0.25));
        assert_eq!(eval.latency_ms, Some(12.5));
        assert_eq!(eval.status, None);
        assert_eq!(eval.result["pii_count"], 1);
    }

    #[test]
    fn test_from_value_degrades() {
        let eval = Evaluation::from_value(&json!("not an object"));
        assert_eq!(eval.id, None);
        assert_eq!(eval.eval_type, EvalType::Custom);
        assert_eq!(eval.passed, None);
        assert!(!eval.is_failed());
        assert!(eval.result.is_null());
    }
}
