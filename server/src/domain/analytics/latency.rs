//! Duration statistics.

use serde::Serialize;

/// Percentiles and range of a set of durations, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl LatencyStats {
    /// All statistics are zero for empty input.
    pub fn from_durations(durations: &[f64]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }
        let mut sorted = durations.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        Self {
            p50: percentile(&sorted, 0.5),
            p90: percentile(&sorted, 0.9),
            p99: percentile(&sorted, 0.99),
            min: sorted[0],
            max: sorted[n - 1],
            avg: sorted.iter().sum::<f64>() / n as f64,
        }
    }
}

/// Nearest-rank on an ascending slice: `sorted[floor(n * p)]`, clamped to
/// the last element.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_of_five() {
        let stats = LatencyStats::from_durations(&[50.0, 10.0, 40.0, 20.0, 30.0]);
        assert_eq!(stats.p50, 30.0);
        assert_eq!(stats.p90, 50.0);
        assert_eq!(stats.p99, 50.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.avg, 30.0);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(LatencyStats::from_durations(&[]), LatencyStats::default());
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_single_value() {
        let stats = LatencyStats::from_durations(&[7.0]);
        assert_eq!(stats.p50, 7.0);
        assert_eq!(stats.p99, 7.0);
    }

    #[test]
    fn test_index_is_clamped() {
        assert_eq!(percentile(&[1.0, 2.0], 1.0), 2.0);
    }
}
