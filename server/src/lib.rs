//! Shepherd: ingestion, normalization and aggregation of LLM trace files.

pub mod api;
pub mod app;
pub mod client;
pub mod core;
pub mod domain;
pub mod utils;
