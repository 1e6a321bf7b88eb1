//! Session import, validation and cross-session filtering
//!
//! - `validate` - minimal shape check for uploaded files
//! - `session` - the imported [`Session`] and its summary
//! - `filter` - time window and label filters, label discovery
//! - `set` - shared in-memory session set

mod filter;
mod session;
mod set;
mod validate;

pub use filter::{
    DateRange, FilterSpec, LabelCatalog, SYSTEM_LABEL_PREFIX, TimeFilter, discover_labels,
    filter_sessions, session_timestamp_ms,
};
pub use session::{Session, SessionError, SessionSummary};
pub use set::SessionSet;
pub use validate::{Validation, validate};
