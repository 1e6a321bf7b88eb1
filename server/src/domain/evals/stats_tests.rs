use super::*;
use crate::domain::evals::extract_evaluations;
use serde_json::json;

fn records(evaluations: JsonValue) -> Vec<EvaluationRecord> {
    let data = json!({
        "sessions": [{"id": "s"}],
        "events": [{"provider": "openai", "span_id": "e1", "evaluations": evaluations}]
    });
    extract_evaluations(&data, None)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_overall_stats() {
    let recs = records(json!([
        {"eval_type": "pii_detection", "passed": true, "score": 1.0, "latency_ms": 10},
        {"eval_type": "pii_detection", "passed": false, "score": 0.5},
        {"eval_type": "custom", "passed": true, "latency_ms": 30},
        {"eval_type": "custom"}
    ]));
    let stats = overall_stats(&recs);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.passed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pass_rate, 50.0);
    assert_eq!(stats.avg_score, 0.75);
    assert_eq!(stats.avg_latency, 20.0);
}

#[test]
fn test_overall_means_span_types_and_skip_missing_values() {
    let recs = records(json!([
        {"id": "a", "eval_type": "pii_detection", "score": 0.2},
        {"id": "b", "eval_type": "hallucination_detection", "score": 0.8, "latency_ms": 100},
        {"id": "c", "eval_type": "latency_consistency"}
    ]));
    let stats = overall_stats(&recs);
    assert_eq!(stats.total, 3);
    assert!(approx(stats.avg_score, 0.5));
    assert!(approx(stats.avg_latency, 100.0));
}

#[test]
fn test_overall_stats_empty() {
    assert_eq!(overall_stats(&[]), OverallStats::default());
}

#[test]
fn test_pii_details() {
    let recs = records(json!([
        {"eval_type": "pii_detection", "passed": false,
         "result": {"pii_count": 2, "pii_types_found": ["email", "phone"]}},
        {"eval_type": "pii_detection", "passed": false,
         "result": {"pii_count": 1, "pii_types_found": ["email", "ssn"]}},
        {"eval_type": "pii_detection", "passed": true, "result": {}}
    ]));
    let stats = eval_type_stats(&recs);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].total, 3);
    assert_eq!(stats[0].failed, 2);
    assert_eq!(
        stats[0].details,
        EvalDetails::Pii {
            pii_count: 3,
            pii_types_found: vec!["email".into(), "phone".into(), "ssn".into()],
        }
    );
}

#[test]
fn test_hallucination_details() {
    let recs = records(json!([
        {"eval_type": "hallucination_detection", "passed": false, "score": 0.2,
         "result": {"hallucination_count": 2, "hallucinations": [
             {"severity": "major"}, {"severity": "critical"}
         ]}},
        {"eval_type": "hallucination_detection", "passed": false, "score": 0.6,
         "result": {"hallucination_count": 3, "hallucinations": [
             {"severity": "minor"}, {"severity": "major"}, {"severity": "weird"}, {}
         ]}}
    ]));
    let stats = eval_type_stats(&recs);
    let EvalDetails::Hallucination {
        hallucination_count,
        avg_score,
        severities,
    } = &stats[0].details
    else {
        panic!("expected hallucination details");
    };
    assert_eq!(*hallucination_count, 5);
    assert!(approx(*avg_score, 0.4));
    assert_eq!(
        *severities,
        SeverityCounts {
            minor: 1,
            major: 2,
            critical: 1
        }
    );
}

#[test]
fn test_latency_details() {
    let recs = records(json!([
        {"eval_type": "latency_consistency", "passed": true,
         "result": {"mean": 100.0, "max": 250.0, "p95": 200.0}},
        {"eval_type": "latency_consistency", "passed": false,
         "result": {"mean": 300.0, "max": 900.0, "p95": 150.0}},
        {"eval_type": "latency_consistency", "passed": true, "result": null}
    ]));
    let stats = eval_type_stats(&recs);
    assert_eq!(
        stats[0].details,
        EvalDetails::Latency {
            avg_mean: 200.0,
            max: 900.0,
            p95: 200.0
        }
    );
}

#[test]
fn test_type_stats_follow_type_order() {
    let recs = records(json!([
        {"eval_type": "custom", "passed": true, "score": 0.5},
        {"eval_type": "toxicity_detection", "passed": true},
        {"eval_type": "pii_detection", "passed": true}
    ]));
    let types: Vec<_> = eval_type_stats(&recs).iter().map(|s| s.eval_type).collect();
    assert_eq!(
        types,
        vec![
            EvalType::PiiDetection,
            EvalType::ToxicityDetection,
            EvalType::Custom
        ]
    );
    let custom = &eval_type_stats(&recs)[2];
    assert_eq!(custom.details, EvalDetails::Generic { avg_score: 0.5 });
}

#[test]
fn test_issue_filters() {
    let recs = records(json!([
        {"id": "1", "eval_type": "pii_detection", "passed": false},
        {"id": "2", "eval_type": "pii_detection", "passed": true},
        {"id": "3", "eval_type": "relevance_check", "passed": false},
        {"id": "4", "eval_type": "relevance_check"}
    ]));
    let ids = |filter: IssueFilter| -> Vec<String> {
        filter_issues(&recs, &filter)
            .iter()
            .filter_map(|r| r.evaluation.id.clone())
            .collect()
    };

    assert_eq!(ids(IssueFilter::default()), vec!["1", "2", "3", "4"]);
    assert_eq!(
        ids(IssueFilter {
            failed_only: true,
            eval_type: None
        }),
        vec!["1", "3"]
    );
    assert_eq!(
        ids(IssueFilter {
            failed_only: true,
            eval_type: Some(EvalType::RelevanceCheck)
        }),
        vec!["3"]
    );
    assert_eq!(
        ids(IssueFilter {
            failed_only: false,
            eval_type: Some(EvalType::PiiDetection)
        }),
        vec!["1", "2"]
    );
}

#[test]
fn test_build_report() {
    let recs = records(json!([
        {"eval_type": "pii_detection", "passed": false},
        {"eval_type": "coherence_check", "passed": true}
    ]));
    let report = build_report(
        &recs,
        &IssueFilter {
            failed_only: true,
            eval_type: None,
        },
    );
    assert_eq!(report.overall.total, 2);
    assert_eq!(report.by_type.len(), 2);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].span_id.as_deref(), Some("e1"));
}

#[test]
fn test_issue_filter_deserializes_partial() {
    let filter: IssueFilter = serde_json::from_value(json!({"failed_only": true})).unwrap();
    assert!(filter.failed_only);
    assert_eq!(filter.eval_type, None);
}
