//! Aggregation of normalized events into the analytics view-model.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::domain::pricing::{PricingTable, ProviderClass};
use crate::domain::sessions::Session;
use crate::domain::traces::{NormalizedEvent, TokenUsage};

use super::latency::LatencyStats;

const TOP_N: usize = 3;
const TOP_CACHED_N: usize = 5;

// ============================================================================
// VIEW MODEL
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    /// Percent of input tokens served from cache.
    pub cache_hit_rate: f64,
    pub tokens_saved: u64,
    /// Estimated USD saved, pro rata to the average cost per token.
    pub cost_saved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCost {
    pub model: String,
    pub provider: ProviderClass,
    pub calls: usize,
    pub tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCost {
    pub provider: ProviderClass,
    pub calls: usize,
    pub tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSummary {
    pub count: usize,
    pub input_tokens: u64,
    pub cost: f64,
    /// Mean over calls that reported a dimension, 0 when none did.
    pub avg_dimensions: f64,
}

/// Per-session totals in aggregated views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCost {
    pub session_name: String,
    pub calls: usize,
    pub tokens: u64,
    pub cost: f64,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvents {
    pub fastest: Vec<NormalizedEvent>,
    pub slowest: Vec<NormalizedEvent>,
    pub most_tokens: Vec<NormalizedEvent>,
    pub most_cached: Vec<NormalizedEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// All events, embeddings included.
    pub total_calls: usize,
    pub chat_calls: usize,
    pub error_count: usize,
    /// Chat events only.
    pub tokens: TokenUsage,
    /// Chat events only; embeddings are costed in `embeddings`.
    pub total_cost: f64,
    /// All events.
    pub latency: LatencyStats,
    pub cache: CacheMetrics,
    pub cost_by_model: Vec<ModelCost>,
    pub by_provider: Vec<ProviderCost>,
    pub embeddings: EmbeddingSummary,
    pub by_session: Vec<SessionCost>,
    pub top: TopEvents,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Build the analytics summary of a flat event list.
///
/// Token and cost figures cover chat events; latency and the fastest/slowest
/// lists cover every event. Breakdowns keep first-seen order.
pub fn aggregate(events: &[NormalizedEvent], pricing: &PricingTable) -> AnalyticsSummary {
    let (embeddings, chat): (Vec<&NormalizedEvent>, Vec<&NormalizedEvent>) =
        events.iter().partition(|e| e.is_embedding());

    let mut tokens = TokenUsage::default();
    let mut total_cost = 0.0;
    let mut by_model = FirstSeen::default();
    let mut by_provider = FirstSeen::default();
    let mut by_session = FirstSeen::default();

    for event in &chat {
        let cost = pricing.cost(&event.model, event.usage.input, event.usage.output);
        let provider = ProviderClass::of_model(&event.model);
        tokens += event.usage;
        total_cost += cost;

        let entry = by_model.entry(&event.model, || ModelCost {
            model: event.model.clone(),
            provider,
            calls: 0,
            tokens: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
        });
        entry.calls += 1;
        entry.tokens += event.usage.total;
        entry.input_tokens += event.usage.input;
        entry.output_tokens += event.usage.output;
        entry.cost += cost;

        let entry = by_provider.entry(provider.as_str(), || ProviderCost {
            provider,
            calls: 0,
            tokens: 0,
            cost: 0.0,
        });
        entry.calls += 1;
        entry.tokens += event.usage.total;
        entry.cost += cost;
    }

    for event in events {
        let Some(name) = event.session_name.as_deref() else {
            continue;
        };
        let cost = if event.is_embedding() {
            pricing.cost(&event.model, event.usage.input, 0)
        } else {
            pricing.cost(&event.model, event.usage.input, event.usage.output)
        };
        let entry = by_session.entry(name, || SessionCost {
            session_name: name.to_string(),
            calls: 0,
            tokens: 0,
            cost: 0.0,
            errors: 0,
        });
        entry.calls += 1;
        entry.tokens += event.usage.total;
        entry.cost += cost;
        entry.errors += usize::from(event.error.is_some());
    }

    let durations: Vec<f64> = events.iter().map(|e| e.duration_ms).collect();

    let summary = AnalyticsSummary {
        total_calls: events.len(),
        chat_calls: chat.len(),
        error_count: events.iter().filter(|e| e.error.is_some()).count(),
        cache: cache_metrics(&tokens, total_cost),
        tokens,
        total_cost,
        latency: LatencyStats::from_durations(&durations),
        cost_by_model: by_model.items,
        by_provider: by_provider.items,
        embeddings: embedding_summary(&embeddings, pricing),
        by_session: by_session.items,
        top: top_events(events, &chat),
    };

    tracing::debug!(
        events = summary.total_calls,
        chat = summary.chat_calls,
        models = summary.cost_by_model.len(),
        total_cost = summary.total_cost,
        "Aggregated analytics"
    );
    summary
}

/// Aggregate the events of several sessions, optionally restricted to one
/// provider class.
pub fn aggregate_sessions<S: AsRef<Session>>(
    sessions: &[S],
    provider: Option<ProviderClass>,
    pricing: &PricingTable,
) -> AnalyticsSummary {
    let mut events: Vec<NormalizedEvent> = sessions
        .iter()
        .flat_map(|s| s.as_ref().events())
        .collect();
    if let Some(provider) = provider {
        events = filter_by_provider(&events, provider);
    }
    aggregate(&events, pricing)
}

/// Events whose model classifies as `provider`.
pub fn filter_by_provider(
    events: &[NormalizedEvent],
    provider: ProviderClass,
) -> Vec<NormalizedEvent> {
    events
        .iter()
        .filter(|e| ProviderClass::of_model(&e.model) == provider)
        .cloned()
        .collect()
}

fn cache_metrics(tokens: &TokenUsage, total_cost: f64) -> CacheMetrics {
    let cache_hit_rate = if tokens.input == 0 {
        0.0
    } else {
        tokens.cached as f64 / tokens.input as f64 * 100.0
    };
    let cost_saved = if tokens.total == 0 {
        0.0
    } else {
        tokens.cached as f64 * total_cost / tokens.total as f64
    };
    CacheMetrics {
        cache_hit_rate,
        tokens_saved: tokens.cached,
        cost_saved,
    }
}

fn embedding_summary(events: &[&NormalizedEvent], pricing: &PricingTable) -> EmbeddingSummary {
    let dimensions: Vec<u64> = events.iter().filter_map(|e| e.embedding_dimensions).collect();
    let avg_dimensions = if dimensions.is_empty() {
        0.0
    } else {
        dimensions.iter().sum::<u64>() as f64 / dimensions.len() as f64
    };
    EmbeddingSummary {
        count: events.len(),
        input_tokens: events.iter().map(|e| e.usage.input).sum(),
        cost: events
            .iter()
            .map(|e| pricing.cost(&e.model, e.usage.input, 0))
            .sum(),
        avg_dimensions,
    }
}

/// Top-N lists. Sorts are stable, so ties keep input order.
fn top_events(all: &[NormalizedEvent], chat: &[&NormalizedEvent]) -> TopEvents {
    let everything: Vec<&NormalizedEvent> = all.iter().collect();
    let cached: Vec<&NormalizedEvent> = chat
        .iter()
        .copied()
        .filter(|e| e.usage.cached > 0)
        .collect();

    TopEvents {
        fastest: top_by(everything.clone(), TOP_N, |a, b| {
            a.duration_ms.total_cmp(&b.duration_ms)
        }),
        slowest: top_by(everything, TOP_N, |a, b| b.duration_ms.total_cmp(&a.duration_ms)),
        most_tokens: top_by(chat.to_vec(), TOP_N, |a, b| b.usage.total.cmp(&a.usage.total)),
        most_cached: top_by(cached, TOP_CACHED_N, |a, b| {
            b.usage.cached.cmp(&a.usage.cached)
        }),
    }
}

fn top_by<F>(mut list: Vec<&NormalizedEvent>, n: usize, cmp: F) -> Vec<NormalizedEvent>
where
    F: FnMut(&&NormalizedEvent, &&NormalizedEvent) -> Ordering,
{
    list.sort_by(cmp);
    list.into_iter().take(n).cloned().collect()
}

/// Vec keyed by string, preserving first-seen order.
struct FirstSeen<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for FirstSeen<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> FirstSeen<T> {
    fn entry(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.items.push(init());
                self.index.insert(key.to_string(), self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[i]
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
