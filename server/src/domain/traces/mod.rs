//! Trace normalization
//!
//! - `shape` - request payload classification (chat, Gemini, embeddings)
//! - `normalize` - raw span to [`NormalizedEvent`] projection
//! - `walk` - trace tree flattening and span lookup
//! - `enhance` - prompt-optimization groupings

mod enhance;
mod normalize;
mod shape;
mod walk;

pub use enhance::{
    EnhancementEntry, EnhancementGroup, EnhancementKey, EntrySource, SystemPromptGroup,
    group_by_system_prompt, group_enhancements,
};
pub use normalize::{EMBEDDINGS_API, NormalizedEvent, TokenUsage, UNKNOWN, normalize};
pub use shape::{PROMPT_NOT_AVAILABLE, RequestShape, system_prompt};
pub use walk::{
    FUNCTION_PROVIDER, children, extract_events, find_by_span_id, is_llm_node, session_events,
    walk_nodes,
};
