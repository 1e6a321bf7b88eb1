//! Model pricing and provider classification
//!
//! Costs are estimated from a static, ordered table of per-million-token
//! rates. Lookup is a case-insensitive substring match and the first entry
//! that matches wins, so more specific keys (`gpt-4o-mini`) are listed before
//! the families they belong to (`gpt-4o`, `gpt-4`). Unmatched models fall
//! back to the default rate.
//!
//! Operators can add or override rates from config; overrides are consulted
//! before the built-in table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Key reported for models that matched no table entry.
pub const DEFAULT_KEY: &str = "default";

/// Built-in rates, USD per 1M tokens: `(key, input, output)`.
const BUILTIN_RATES: &[(&str, f64, f64)] = &[
    // OpenAI
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4.1-nano", 0.10, 0.40),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1", 2.00, 8.00),
    ("gpt-4-turbo", 10.00, 30.00),
    ("gpt-4", 30.00, 60.00),
    ("gpt-3.5-turbo", 0.50, 1.50),
    ("o1-mini", 1.10, 4.40),
    ("o1", 15.00, 60.00),
    ("o3-mini", 1.10, 4.40),
    ("o3", 2.00, 8.00),
    ("text-embedding-3-small", 0.02, 0.0),
    ("text-embedding-3-large", 0.13, 0.0),
    ("text-embedding-ada-002", 0.10, 0.0),
    // Google
    ("gemini-2.5-flash-lite", 0.10, 0.40),
    ("gemini-2.5-flash", 0.30, 2.50),
    ("gemini-2.5-pro", 1.25, 10.00),
    ("gemini-2.0-flash-lite", 0.075, 0.30),
    ("gemini-2.0-flash", 0.10, 0.40),
    ("gemini-1.5-flash", 0.075, 0.30),
    ("gemini-1.5-pro", 1.25, 5.00),
    ("gemini-embedding", 0.15, 0.0),
    ("text-embedding-004", 0.0, 0.0),
    // Anthropic
    ("claude-3-5-haiku", 0.80, 4.00),
    ("claude-3-5-sonnet", 3.00, 15.00),
    ("claude-3-7-sonnet", 3.00, 15.00),
    ("claude-3-haiku", 0.25, 1.25),
    ("claude-3-opus", 15.00, 75.00),
    ("claude-sonnet-4", 3.00, 15.00),
    ("claude-opus-4", 15.00, 75.00),
];

/// Rate applied to models that match no entry.
const DEFAULT_RATE: (f64, f64) = (0.50, 1.50);

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

// ============================================================================
// PRICING DATA STRUCTURES
// ============================================================================

/// Per-million-token rates for one model key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRate {
    pub key: String,
    /// USD per 1M input tokens
    pub input: f64,
    /// USD per 1M output tokens
    pub output: f64,
}

impl ModelRate {
    fn new(key: &str, input: f64, output: f64) -> Self {
        Self {
            key: key.to_string(),
            input,
            output,
        }
    }

    /// Cost in USD for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / TOKENS_PER_UNIT * self.input
            + output_tokens as f64 / TOKENS_PER_UNIT * self.output
    }

    pub fn is_default(&self) -> bool {
        self.key == DEFAULT_KEY
    }
}

/// Rate override as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateOverride {
    pub input: f64,
    pub output: f64,
}

/// Ordered pricing table.
#[derive(Debug, Clone)]
pub struct PricingTable {
    entries: Vec<ModelRate>,
    default: ModelRate,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_RATES
                .iter()
                .map(|(key, input, output)| ModelRate::new(key, *input, *output))
                .collect(),
            default: ModelRate::new(DEFAULT_KEY, DEFAULT_RATE.0, DEFAULT_RATE.1),
        }
    }

    /// Built-in table with `overrides` consulted first.
    ///
    /// Overrides are ordered longest key first so that a specific override
    /// is not shadowed by a shorter one it contains. A `default` key replaces
    /// the fallback rate.
    pub fn with_overrides(overrides: &BTreeMap<String, RateOverride>) -> Self {
        let mut table = Self::builtin();
        let mut custom: Vec<ModelRate> = Vec::with_capacity(overrides.len());

        for (key, rate) in overrides {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if key == DEFAULT_KEY {
                table.default = ModelRate::new(DEFAULT_KEY, rate.input, rate.output);
            } else {
                custom.push(ModelRate::new(&key, rate.input, rate.output));
            }
        }
        custom.sort_by(|a, b| b.key.len().cmp(&a.key.len()).then_with(|| a.key.cmp(&b.key)));

        if !custom.is_empty() {
            tracing::debug!(count = custom.len(), "Applied pricing overrides");
        }
        custom.append(&mut table.entries);
        table.entries = custom;
        table
    }

    /// First entry whose key is contained in `model`, case-insensitively.
    pub fn resolve(&self, model: &str) -> &ModelRate {
        let model = model.to_lowercase();
        self.entries
            .iter()
            .find(|rate| model.contains(rate.key.as_str()))
            .unwrap_or_else(|| {
                tracing::trace!(model = %model, "No pricing entry, using default rate");
                &self.default
            })
    }

    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.resolve(model).cost(input_tokens, output_tokens)
    }

    pub fn entries(&self) -> &[ModelRate] {
        &self.entries
    }
}

// ============================================================================
// PROVIDER CLASSIFICATION
// ============================================================================

/// Provider family inferred from a model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderClass {
    OpenAi,
    Gemini,
    Anthropic,
    Other,
}

impl ProviderClass {
    pub fn of_model(model: &str) -> Self {
        let model = model.to_lowercase();
        let has = |needle: &str| model.contains(needle);
        if has("gpt") || has("o1") || has("o3") || has("text-embedding") {
            Self::OpenAi
        } else if has("gemini") {
            Self::Gemini
        } else if has("claude") {
            Self::Anthropic
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::Other => "other",
        }
    }

    /// Parse a provider filter. `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            "anthropic" => Some(Self::Anthropic),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
