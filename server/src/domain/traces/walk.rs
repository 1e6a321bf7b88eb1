//! Trace tree traversal.
//!
//! Trace trees model call nesting, so they are acyclic. The walkers keep an
//! explicit stack, so tree depth is bounded by memory rather than by the
//! call stack, and return fresh lists.

use serde_json::Value as JsonValue;

use crate::utils::json::{get_array, get_str};

use super::normalize::{NormalizedEvent, normalize};

/// Provider value recorded for plain function spans.
pub const FUNCTION_PROVIDER: &str = "function";

/// Whether a node is an LLM call: it names a provider other than
/// `"function"` and records a duration.
pub fn is_llm_node(node: &JsonValue) -> bool {
    let provider_ok = get_str(node, "provider").is_some_and(|p| p != FUNCTION_PROVIDER);
    provider_ok && node.get("duration_ms").is_some_and(|d| !d.is_null())
}

/// Children of a node, empty for leaves.
pub fn children(node: &JsonValue) -> &[JsonValue] {
    get_array(node, "children")
}

/// Flatten a trace tree into normalized LLM events, depth-first pre-order.
///
/// Function spans are not emitted but their children are still visited.
pub fn extract_events(tree: &[JsonValue], session_name: Option<&str>) -> Vec<NormalizedEvent> {
    walk_nodes(tree)
        .into_iter()
        .filter(|node| is_llm_node(node))
        .map(|node| normalize(node).with_session(session_name))
        .collect()
}

/// Find a node by exact `span_id`, depth-first pre-order.
pub fn find_by_span_id<'a>(tree: &'a [JsonValue], span_id: &str) -> Option<&'a JsonValue> {
    let mut stack: Vec<&JsonValue> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if get_str(node, "span_id") == Some(span_id) {
            return Some(node);
        }
        stack.extend(children(node).iter().rev());
    }
    None
}

/// Visit every node of a tree in pre-order.
pub fn walk_nodes(tree: &[JsonValue]) -> Vec<&JsonValue> {
    let mut nodes = Vec::new();
    let mut stack: Vec<&JsonValue> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        nodes.push(node);
        stack.extend(children(node).iter().rev());
    }
    nodes
}

/// LLM events of one session document.
///
/// Prefers the nested `trace_tree`; files written without one fall back to
/// the flat `events` list.
pub fn session_events(data: &JsonValue, session_name: Option<&str>) -> Vec<NormalizedEvent> {
    let tree = get_array(data, "trace_tree");
    if !tree.is_empty() {
        return extract_events(tree, session_name);
    }

    get_array(data, "events")
        .iter()
        .filter(|event| is_llm_node(event))
        .map(|event| normalize(event).with_session(session_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn llm(span_id: &str, children: serde_json::Value) -> serde_json::Value {
        json!({
            "provider": "openai",
            "api": "chat.completions.create",
            "span_id": span_id,
            "duration_ms": 10,
            "request": {"model": "gpt-4o", "messages": [{"role": "user", "content": span_id}]},
            "children": children
        })
    }

    fn function(span_id: &str, children: serde_json::Value) -> serde_json::Value {
        json!({
            "provider": "function",
            "api": "agent.plan",
            "span_id": span_id,
            "duration_ms": 50,
            "children": children
        })
    }

    fn span_ids(events: &[NormalizedEvent]) -> Vec<String> {
        events.iter().filter_map(|e| e.span_id.clone()).collect()
    }

    #[test]
    fn test_is_llm_node() {
        assert!(is_llm_node(&llm("a", json!([]))));
        assert!(!is_llm_node(&function("f", json!([]))));
        assert!(!is_llm_node(&json!({"provider": "openai"})));
        assert!(!is_llm_node(&json!({"provider": "openai", "duration_ms": null})));
        assert!(!is_llm_node(&json!({"duration_ms": 5})));
        assert!(is_llm_node(&json!({"provider": "custom-llm", "duration_ms": 0})));
    }

    #[test]
    fn test_extract_events_pre_order() {
        let tree = vec![llm(
            "A",
            json!([llm("B", json!([])), llm("C", json!([llm("D", json!([]))]))]),
        )];
        let events = extract_events(&tree, None);
        assert_eq!(span_ids(&events), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_extract_events_descends_through_function_nodes() {
        let inner = function("inner", json!([llm("y", json!([]))]));
        let tree = vec![
            function("root", json!([llm("x", json!([])), inner])),
            llm("z", json!([])),
        ];
        let events = extract_events(&tree, None);
        assert_eq!(span_ids(&events), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_extract_events_tags_session() {
        let tree = vec![llm("a", json!([]))];
        let events = extract_events(&tree, Some("file.json"));
        assert_eq!(events[0].session_name.as_deref(), Some("file.json"));
    }

    #[test]
    fn test_extract_events_tolerates_malformed_children() {
        let tree = vec![json!({
            "provider": "openai",
            "duration_ms": 1,
            "children": "not-a-list"
        })];
        assert_eq!(extract_events(&tree, None).len(), 1);
    }

    #[test]
    fn test_find_by_span_id() {
        let tree = vec![
            function("f1", json!([llm("a", json!([]))])),
            function("f2", json!([function("f3", json!([llm("deep", json!([]))]))])),
        ];
        let found = find_by_span_id(&tree, "deep").unwrap();
        assert_eq!(found["span_id"], "deep");
        assert_eq!(find_by_span_id(&tree, "f2").unwrap()["api"], "agent.plan");
        assert!(find_by_span_id(&tree, "missing").is_none());
        assert!(find_by_span_id(&tree, "de").is_none());
    }

    #[test]
    fn test_walk_nodes_visits_everything() {
        let tree = vec![function("f", json!([llm("a", json!([llm("b", json!([]))]))]))];
        let ids: Vec<&str> = walk_nodes(&tree)
            .into_iter()
            .filter_map(|n| n["span_id"].as_str())
            .collect();
        assert_eq!(ids, vec!["f", "a", "b"]);
    }

    #[test]
    fn test_deep_chain_is_walked_without_recursion() {
        let depth = 5_000;
        let mut node = llm("leaf", json!([]));
        for level in 0..depth {
            node = function(&format!("fn-{level}"), json!([node]));
        }
        let tree = vec![node];

        let events = extract_events(&tree, None);
        assert_eq!(span_ids(&events), vec!["leaf"]);
        assert_eq!(walk_nodes(&tree).len(), depth + 1);
        assert!(find_by_span_id(&tree, "leaf").is_some());

        // serde_json values drop recursively; unwind by hand.
        let mut rest = tree;
        while let Some(mut node) = rest.pop() {
            if let Some(kids) = node.get_mut("children").and_then(|c| c.as_array_mut()) {
                rest.append(kids);
            }
        }
    }

    #[test]
    fn test_session_events_prefers_trace_tree() {
        let data = json!({
            "sessions": [{"id": "s"}],
            "events": [llm("flat", json!([]))],
            "trace_tree": [llm("tree", json!([]))]
        });
        assert_eq!(span_ids(&session_events(&data, None)), vec!["tree"]);
    }

    #[test]
    fn test_session_events_falls_back_to_flat_events() {
        let data = json!({
            "sessions": [{"id": "s"}],
            "events": [
                llm("e1", json!([])),
                function("fn", json!([])),
                llm("e2", json!([]))
            ],
            "trace_tree": []
        });
        let events = session_events(&data, Some("s.json"));
        assert_eq!(span_ids(&events), vec!["e1", "e2"]);
        assert!(events.iter().all(|e| e.session_name.as_deref() == Some("s.json")));
    }

    #[test]
    fn test_session_events_empty_document() {
        assert!(session_events(&json!({}), None).is_empty());
    }
}
