//! Collects evaluation records from a session document.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::sessions::Session;
use crate::domain::traces::walk_nodes;
use crate::utils::json::{NULL, get_array, get_f64, get_str};

use super::model::Evaluation;

/// An evaluation together with the span it was attached to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub api: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub span_id: Option<String>,
    pub duration_ms: Option<f64>,
    pub started_at: Option<f64>,
    pub request: JsonValue,
    pub response: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl EvaluationRecord {
    fn new(evaluation: Evaluation, owner: &JsonValue, session_name: Option<&str>) -> Self {
        let request = owner.get("request").unwrap_or(&NULL);
        let response = owner.get("response").unwrap_or(&NULL);
        let owned = |v: Option<&str>| v.map(str::to_string);

        Self {
            evaluation,
            api: owned(get_str(owner, "api")),
            model: owned(get_str(request, "model").or_else(|| get_str(response, "model"))),
            provider: owned(get_str(owner, "provider")),
            span_id: owned(get_str(owner, "span_id")),
            duration_ms: get_f64(owner, "duration_ms"),
            started_at: get_f64(owner, "started_at"),
            request: request.clone(),
            response: response.clone(),
            session_name: owned(session_name),
        }
    }
}

/// Evaluations of one session: flat `events`, then `function_events`, then
/// the trace tree in pre-order.
///
/// The SDK may record the same evaluation on an event and again on its tree
/// node. Records sharing both the owner's `span_id` and the evaluation `id`
/// are kept once, first occurrence wins; ids are only unique per span.
pub fn extract_evaluations(data: &JsonValue, session_name: Option<&str>) -> Vec<EvaluationRecord> {
    let flat = get_array(data, "events")
        .iter()
        .chain(get_array(data, "function_events"));
    let tree = walk_nodes(get_array(data, "trace_tree"));

    let mut seen: HashSet<(&str, String)> = HashSet::new();
    let mut records = Vec::new();

    for owner in flat.chain(tree) {
        for raw in get_array(owner, "evaluations") {
            let evaluation = Evaluation::from_value(raw);
            if let (Some(span_id), Some(id)) = (get_str(owner, "span_id"), &evaluation.id)
                && !seen.insert((span_id, id.clone()))
            {
                continue;
            }
            records.push(EvaluationRecord::new(evaluation, owner, session_name));
        }
    }

    tracing::debug!(
        session = session_name.unwrap_or("-"),
        evaluations = records.len(),
        "Extracted evaluations"
    );
    records
}

/// Evaluations of every session, each tagged with its file name.
pub fn extract_all_evaluations<S: AsRef<Session>>(sessions: &[S]) -> Vec<EvaluationRecord> {
    sessions
        .iter()
        .flat_map(|s| {
            let session = s.as_ref();
            extract_evaluations(&session.data, Some(&session.file_name))
        })
        .collect()
}
