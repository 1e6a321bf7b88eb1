//! Evaluation statistics and issue lists.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::utils::json::{as_count, get_array, get_f64, get_str};

use super::extract::EvaluationRecord;
use super::model::{EvalType, Evaluation};

// ============================================================================
// TYPES
// ============================================================================

/// Counts of hallucinations by severity. Unknown severities are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub minor: u64,
    pub major: u64,
    pub critical: u64,
}

/// Type-specific summary of one evaluation type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvalDetails {
    Pii {
        pii_count: u64,
        /// Sorted, distinct.
        pii_types_found: Vec<String>,
    },
    Hallucination {
        hallucination_count: u64,
        avg_score: f64,
        severities: SeverityCounts,
    },
    Latency {
        avg_mean: f64,
        max: f64,
        p95: f64,
    },
    Generic {
        avg_score: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalTypeStats {
    pub eval_type: EvalType,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub details: EvalDetails,
}

/// Totals across every evaluation, regardless of type.
///
/// `avg_score` and `avg_latency` skip evaluations that lack the value
/// instead of reading them as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percent, 0 when there are no evaluations.
    pub pass_rate: f64,
    /// Mean over evaluations of any type that carry a score.
    pub avg_score: f64,
    /// Mean over evaluations of any type that carry `latency_ms`.
    pub avg_latency: f64,
}

/// Which evaluations an issue list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFilter {
    pub failed_only: bool,
    pub eval_type: Option<EvalType>,
}

impl IssueFilter {
    pub fn matches(&self, evaluation: &Evaluation) -> bool {
        (!self.failed_only || evaluation.is_failed())
            && self.eval_type.is_none_or(|t| t == evaluation.eval_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub overall: OverallStats,
    pub by_type: Vec<EvalTypeStats>,
    pub issues: Vec<EvaluationRecord>,
}

// ============================================================================
// OPERATIONS
// ============================================================================

pub fn overall_stats(records: &[EvaluationRecord]) -> OverallStats {
    let total = records.len();
    let passed = records
        .iter()
        .filter(|r| r.evaluation.passed == Some(true))
        .count();
    let failed = records.iter().filter(|r| r.evaluation.is_failed()).count();

    OverallStats {
        total,
        passed,
        failed,
        pass_rate: if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        },
        avg_score: mean(records.iter().filter_map(|r| r.evaluation.score)),
        avg_latency: mean(records.iter().filter_map(|r| r.evaluation.latency_ms)),
    }
}

/// Per-type statistics for the types that occur, in [`EvalType`] order.
pub fn eval_type_stats(records: &[EvaluationRecord]) -> Vec<EvalTypeStats> {
    let mut by_type: BTreeMap<EvalType, Vec<&Evaluation>> = BTreeMap::new();
    for record in records {
        by_type
            .entry(record.evaluation.eval_type)
            .or_default()
            .push(&record.evaluation);
    }

    by_type
        .into_iter()
        .map(|(eval_type, evals)| EvalTypeStats {
            eval_type,
            total: evals.len(),
            passed: evals.iter().filter(|e| e.passed == Some(true)).count(),
            failed: evals.iter().filter(|e| e.is_failed()).count(),
            details: details_for(eval_type, &evals),
        })
        .collect()
}

pub fn filter_issues<'a>(
    records: &'a [EvaluationRecord],
    filter: &IssueFilter,
) -> Vec<&'a EvaluationRecord> {
    records
        .iter()
        .filter(|r| filter.matches(&r.evaluation))
        .collect()
}

/// Overall and per-type statistics over every record, plus the issue list
/// selected by `filter`.
pub fn build_report(records: &[EvaluationRecord], filter: &IssueFilter) -> EvaluationReport {
    EvaluationReport {
        overall: overall_stats(records),
        by_type: eval_type_stats(records),
        issues: filter_issues(records, filter).into_iter().cloned().collect(),
    }
}

// ============================================================================
// DETAILS
// ============================================================================

fn details_for(eval_type: EvalType, evals: &[&Evaluation]) -> EvalDetails {
    match eval_type {
        EvalType::PiiDetection => pii_details(evals),
        EvalType::HallucinationDetection => hallucination_details(evals),
        EvalType::LatencyConsistency => latency_details(evals),
        _ => EvalDetails::Generic {
            avg_score: mean(evals.iter().filter_map(|e| e.score)),
        },
    }
}

fn pii_details(evals: &[&Evaluation]) -> EvalDetails {
    let mut pii_count = 0;
    let mut types = BTreeSet::new();
    for eval in evals {
        pii_count += eval.result.get("pii_count").and_then(as_count).unwrap_or(0);
        if let Some(found) = eval.result.get("pii_types_found").and_then(JsonValue::as_array) {
            types.extend(found.iter().filter_map(JsonValue::as_str).map(str::to_string));
        }
    }
    EvalDetails::Pii {
        pii_count,
        pii_types_found: types.into_iter().collect(),
    }
}

fn hallucination_details(evals: &[&Evaluation]) -> EvalDetails {
    let mut hallucination_count = 0;
    let mut severities = SeverityCounts::default();
    for eval in evals {
        hallucination_count += eval
            .result
            .get("hallucination_count")
            .and_then(as_count)
            .unwrap_or(0);
        for item in get_array(&eval.result, "hallucinations") {
            match get_str(item, "severity") {
                Some("minor") => severities.minor += 1,
                Some("major") => severities.major += 1,
                Some("critical") => severities.critical += 1,
                _ => {}
            }
        }
    }
    EvalDetails::Hallucination {
        hallucination_count,
        avg_score: mean(evals.iter().filter_map(|e| e.score)),
        severities,
    }
}

fn latency_details(evals: &[&Evaluation]) -> EvalDetails {
    let max_of = |key: &str| {
        evals
            .iter()
            .filter_map(|e| get_f64(&e.result, key))
            .fold(0.0_f64, f64::max)
    };
    EvalDetails::Latency {
        avg_mean: mean(evals.iter().filter_map(|e| get_f64(&e.result, "mean"))),
        max: max_of("max"),
        p95: max_of("p95"),
    }
}

/// Arithmetic mean, 0 for no values.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
