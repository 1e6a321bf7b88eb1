//! Aggregation engine
//!
//! Turns a flat list of normalized events into latency percentiles, token
//! and cost breakdowns, cache metrics and top-N lists.

mod latency;
mod summary;

pub use latency::{LatencyStats, percentile};
pub use summary::{
    AnalyticsSummary, CacheMetrics, EmbeddingSummary, ModelCost, ProviderCost, SessionCost,
    TopEvents, aggregate, aggregate_sessions, filter_by_provider,
};
