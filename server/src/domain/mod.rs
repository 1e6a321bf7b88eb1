//! Domain logic for LLM trace analysis
//!
//! - `traces` - normalization of raw spans and trace-tree walking
//! - `sessions` - upload validation, session set and cross-session filters
//! - `analytics` - latency, token, cost and cache aggregation
//! - `evals` - evaluation extraction and statistics
//! - `pricing` - model pricing table and provider classification
//!
//! Everything here is synchronous and pure over immutable inputs.

pub mod analytics;
pub mod evals;
pub mod pricing;
pub mod sessions;
pub mod traces;
