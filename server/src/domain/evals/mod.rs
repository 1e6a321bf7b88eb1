//! Evaluation extraction and reporting
//!
//! - `model` - [`Evaluation`] and [`EvalType`]
//! - `extract` - collects evaluations from events, function events and trace trees
//! - `stats` - overall and per-type statistics, issue filters

mod extract;
mod model;
mod stats;

pub use extract::{EvaluationRecord, extract_all_evaluations, extract_evaluations};
pub use model::{EvalType, Evaluation};
pub use stats::{
    EvalDetails, EvalTypeStats, EvaluationReport, IssueFilter, OverallStats, SeverityCounts,
    build_report, eval_type_stats, filter_issues, overall_stats,
};
