//! Cross-session filtering and label discovery.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::json::get_f64;
use crate::utils::time::{epoch_to_millis, parse_iso_timestamp};

use super::session::Session;

/// Labels with this prefix are written by the SDK itself.
pub const SYSTEM_LABEL_PREFIX: &str = "aiobs_";

/// Header fields consulted for a session's timestamp, in priority order.
const TIMESTAMP_FIELDS: &[&str] = &["started_at", "created_at", "timestamp"];

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

// ============================================================================
// FILTER SPEC
// ============================================================================

/// Time window preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFilter {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeFilter {
    /// Window length for the rolling presets.
    pub fn duration_ms(self) -> Option<i64> {
        match self {
            Self::LastHour => Some(HOUR_MS),
            Self::LastDay => Some(DAY_MS),
            Self::LastWeek => Some(7 * DAY_MS),
            Self::LastMonth => Some(30 * DAY_MS),
            Self::All | Self::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::LastHour => "1h",
            Self::LastDay => "24h",
            Self::LastWeek => "7d",
            Self::LastMonth => "30d",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "1h" => Ok(Self::LastHour),
            "24h" => Ok(Self::LastDay),
            "7d" => Ok(Self::LastWeek),
            "30d" => Ok(Self::LastMonth),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "unknown time filter '{}' (expected all, 1h, 24h, 7d, 30d or custom)",
                other
            )),
        }
    }
}

/// Inclusive range, epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start <= timestamp_ms && timestamp_ms <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    /// Label key to allowed values. Empty sets do not constrain.
    pub labels: BTreeMap<String, BTreeSet<String>>,
    pub time_filter: TimeFilter,
    pub custom_date_range: Option<DateRange>,
}

impl FilterSpec {
    /// True when no constraint would reject any session.
    pub fn is_empty(&self) -> bool {
        self.labels.values().all(BTreeSet::is_empty) && self.window(0).is_none()
    }

    fn window(&self, now_ms: i64) -> Option<DateRange> {
        match self.time_filter {
            TimeFilter::All => None,
            TimeFilter::Custom => self.custom_date_range,
            preset => preset.duration_ms().map(|d| DateRange {
                start: now_ms - d,
                end: i64::MAX,
            }),
        }
    }

    /// Whether one session passes every label constraint and the time window.
    pub fn matches(&self, session: &Session, now_ms: i64) -> bool {
        let labels_ok = self
            .labels
            .iter()
            .filter(|(_, allowed)| !allowed.is_empty())
            .all(|(key, allowed)| allowed.contains(session.label(key)));
        if !labels_ok {
            return false;
        }
        match self.window(now_ms) {
            Some(range) => range.contains(session_timestamp_ms(session)),
            None => true,
        }
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Effective timestamp of a session in epoch ms.
///
/// The first readable header field wins; a session without one falls back to
/// its upload time. Numbers go through the seconds/milliseconds heuristic,
/// strings are read as RFC 3339.
pub fn session_timestamp_ms(session: &Session) -> i64 {
    let info = session.info();
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| {
            get_f64(info, field).map(epoch_to_millis).or_else(|| {
                info.get(*field)
                    .and_then(|v| v.as_str())
                    .and_then(parse_iso_timestamp)
                    .map(|dt| dt.timestamp_millis())
            })
        })
        .unwrap_or_else(|| session.uploaded_at.timestamp_millis())
}

/// Sessions passing `spec`, in input order. `now_ms` anchors the rolling
/// presets.
pub fn filter_sessions<S>(sessions: &[S], spec: &FilterSpec, now_ms: i64) -> Vec<S>
where
    S: AsRef<Session> + Clone,
{
    let selected: Vec<S> = sessions
        .iter()
        .filter(|s| spec.matches(s.as_ref(), now_ms))
        .cloned()
        .collect();
    tracing::debug!(
        total = sessions.len(),
        selected = selected.len(),
        time_filter = %spec.time_filter,
        "Filtered sessions"
    );
    selected
}

/// Label keys found across sessions, split by origin. Values are sorted and
/// distinct, keys sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCatalog {
    pub system: BTreeMap<String, Vec<String>>,
    pub custom: BTreeMap<String, Vec<String>>,
}

pub fn discover_labels<S: AsRef<Session>>(sessions: &[S]) -> LabelCatalog {
    let mut system: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut custom: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for session in sessions {
        for (key, value) in &session.as_ref().labels {
            let bucket = if key.starts_with(SYSTEM_LABEL_PREFIX) {
                &mut system
            } else {
                &mut custom
            };
            bucket.entry(key.clone()).or_default().insert(value.clone());
        }
    }

    let flatten = |map: BTreeMap<String, BTreeSet<String>>| -> BTreeMap<String, Vec<String>> {
        map.into_iter()
            .map(|(k, values)| (k, values.into_iter().collect()))
            .collect()
    };
    LabelCatalog {
        system: flatten(system),
        custom: flatten(custom),
    }
}
