//! Prompt-optimization groupings.
//!
//! Spans flagged `enh_prompt: true` are candidates for prompt enhancement.
//! They are grouped by call signature so that repeated invocations of the
//! same function can be reviewed side by side, together with the LLM calls
//! made inside each invocation.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::utils::json::{get_array, get_f64, get_str, is_true};

use super::normalize::NormalizedEvent;
use super::walk::{children, extract_events, find_by_span_id, walk_nodes};

/// Call signature shared by the members of an enhancement group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnhancementKey {
    pub provider: String,
    pub api: String,
    pub name: String,
    pub module: String,
}

impl EnhancementKey {
    fn of(node: &JsonValue) -> Self {
        let field = |key: &str| get_str(node, key).unwrap_or_default().to_string();
        Self {
            provider: field("provider"),
            api: field("api"),
            name: field("name"),
            module: field("module"),
        }
    }
}

/// Where an enhancement entry was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    FunctionEvent,
    TraceTree,
}

/// One flagged invocation.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementEntry {
    pub span_id: Option<String>,
    pub source: EntrySource,
    pub duration_ms: Option<f64>,
    /// The raw span, as recorded.
    pub node: JsonValue,
    /// LLM calls made inside the invocation, pre-order.
    pub llm_calls: Vec<NormalizedEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancementGroup {
    #[serde(flatten)]
    pub key: EnhancementKey,
    pub entries: Vec<EnhancementEntry>,
}

/// Group flagged spans of one session by `(provider, api, name, module)`.
///
/// Function events are matched first; each one pulls the children of the
/// trace-tree node with the same `span_id`. Flagged tree nodes follow and are
/// skipped when their `span_id` was already taken from a function event.
/// Entries without a `span_id` are never de-duplicated.
pub fn group_enhancements(data: &JsonValue, session_name: Option<&str>) -> Vec<EnhancementGroup> {
    let tree = get_array(data, "trace_tree");
    let mut grouper = Grouper::default();

    for event in get_array(data, "function_events") {
        if !is_true(event, "enh_prompt") {
            continue;
        }
        let span_id = get_str(event, "span_id");
        let llm_calls = span_id
            .and_then(|id| find_by_span_id(tree, id))
            .map(|node| extract_events(children(node), session_name))
            .unwrap_or_default();
        grouper.push(event, EntrySource::FunctionEvent, llm_calls);
    }

    for node in walk_nodes(tree) {
        if !is_true(node, "enh_prompt") {
            continue;
        }
        if get_str(node, "span_id").is_some_and(|id| grouper.seen(id)) {
            continue;
        }
        let llm_calls = extract_events(children(node), session_name);
        grouper.push(node, EntrySource::TraceTree, llm_calls);
    }

    tracing::debug!(groups = grouper.groups.len(), "Grouped enhancement candidates");
    grouper.groups
}

#[derive(Default)]
struct Grouper {
    groups: Vec<EnhancementGroup>,
    index: HashMap<EnhancementKey, usize>,
    seen_span_ids: HashSet<String>,
}

impl Grouper {
    fn seen(&self, span_id: &str) -> bool {
        self.seen_span_ids.contains(span_id)
    }

    fn push(&mut self, node: &JsonValue, source: EntrySource, llm_calls: Vec<NormalizedEvent>) {
        let span_id = get_str(node, "span_id").map(str::to_string);
        if let Some(id) = &span_id {
            self.seen_span_ids.insert(id.clone());
        }

        let entry = EnhancementEntry {
            span_id,
            source,
            duration_ms: get_f64(node, "duration_ms"),
            node: without_children(node),
            llm_calls,
        };

        let key = EnhancementKey::of(node);
        match self.index.get(&key) {
            Some(&i) => self.groups[i].entries.push(entry),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(EnhancementGroup {
                    key,
                    entries: vec![entry],
                });
            }
        }
    }
}

/// Copy of a span without its subtree; children are reported as `llm_calls`.
fn without_children(node: &JsonValue) -> JsonValue {
    match node.as_object() {
        Some(obj) => JsonValue::Object(
            obj.iter()
                .filter(|(key, _)| key.as_str() != "children")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => node.clone(),
    }
}

// ============================================================================
// SYSTEM PROMPT GROUPING
// ============================================================================

/// LLM calls sharing one system prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPromptGroup {
    pub system_prompt: Option<String>,
    pub calls: usize,
    /// Distinct models, first-seen order.
    pub models: Vec<String>,
    pub total_tokens: u64,
    pub avg_duration_ms: f64,
}

/// Group events by system prompt, first-seen order. Events without a system
/// prompt share the `None` group.
pub fn group_by_system_prompt(events: &[NormalizedEvent]) -> Vec<SystemPromptGroup> {
    let mut groups: Vec<SystemPromptGroup> = Vec::new();
    let mut index: HashMap<Option<&str>, usize> = HashMap::new();
    let mut durations: Vec<f64> = Vec::new();

    for event in events {
        let key = event.system_prompt.as_deref();
        let i = *index.entry(key).or_insert_with(|| {
            groups.push(SystemPromptGroup {
                system_prompt: key.map(str::to_string),
                calls: 0,
                models: Vec::new(),
                total_tokens: 0,
                avg_duration_ms: 0.0,
            });
            durations.push(0.0);
            groups.len() - 1
        });

        let group = &mut groups[i];
        group.calls += 1;
        group.total_tokens += event.usage.total;
        if !group.models.contains(&event.model) {
            group.models.push(event.model.clone());
        }
        durations[i] += event.duration_ms;
    }

    for (group, total) in groups.iter_mut().zip(durations) {
        group.avg_duration_ms = total / group.calls as f64;
    }
    groups
}
