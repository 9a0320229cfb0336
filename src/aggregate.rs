//! Aggregation engine
//!
//! Pure computation over rows the store already grouped: the weighted
//! per-source leaderboard and the detection-quality KPI summary. Both
//! favor availability; callers feed zero defaults for any input whose
//! query failed (see the stats handlers).

use serde::Serialize;
use sqlx::FromRow;

/// Leaderboard length cap
const LEADERBOARD_SIZE: usize = 10;

/// Per-call score weights
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub rule: f64,
    pub ml: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self { rule: 0.5, ml: 0.5 }
    }
}

/// Per-source-IP score averages as grouped by the store
#[derive(Debug, Clone, FromRow)]
pub struct SourceStat {
    pub src_ip: String,
    pub avg_rule_score: f64,
    pub avg_ml_score: f64,
    pub count: i64,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct RiskEntry {
    pub src_ip: String,
    pub avg_rule_score: f64,
    pub avg_ml_score: f64,
    pub combined_score: f64,
    pub count: i64,
}

/// Rank source IPs by weighted combined score, descending, capped at
/// ten entries. Ties break on ascending source IP so the ordering is
/// reproducible.
pub fn rank(stats: Vec<SourceStat>, weights: &Weights) -> Vec<RiskEntry> {
    let mut entries: Vec<RiskEntry> = stats
        .into_iter()
        .map(|s| RiskEntry {
            combined_score: weights.rule * s.avg_rule_score + weights.ml * s.avg_ml_score,
            src_ip: s.src_ip,
            avg_rule_score: s.avg_rule_score,
            avg_ml_score: s.avg_ml_score,
            count: s.count,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.src_ip.cmp(&b.src_ip))
    });
    entries.truncate(LEADERBOARD_SIZE);
    entries
}

/// Fleet-wide detection-quality summary
#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub precision: f64,
    pub detection_rate: f64,
    pub false_positive_rate: f64,
    pub mean_alert_latency: f64,
}

/// Combine independently queried counts into the KPI summary. Every
/// ratio is defined as 0.0 when its denominator is zero.
pub fn compute_kpi(total_alerts: i64, tp: i64, fp: i64, mean_latency_ms: f64) -> Kpi {
    let detection_rate = if total_alerts > 0 {
        tp as f64 / total_alerts as f64
    } else {
        0.0
    };

    let reviewed = tp + fp;
    let (precision, false_positive_rate) = if reviewed > 0 {
        (tp as f64 / reviewed as f64, fp as f64 / reviewed as f64)
    } else {
        (0.0, 0.0)
    };

    Kpi {
        precision,
        detection_rate,
        false_positive_rate,
        mean_alert_latency: mean_latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(src_ip: &str, avg_rule: f64, avg_ml: f64, count: i64) -> SourceStat {
        SourceStat {
            src_ip: src_ip.to_string(),
            avg_rule_score: avg_rule,
            avg_ml_score: avg_ml,
            count,
        }
    }

    #[test]
    fn test_even_weights_halve_rule_only_average() {
        // three alerts with rule scores [10,20,30], ml all zero
        let entries = rank(vec![stat("10.0.0.1", 20.0, 0.0, 3)], &Weights::default());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].avg_rule_score, 20.0);
        assert_eq!(entries[0].combined_score, 10.0);
        assert_eq!(entries[0].count, 3);
    }

    #[test]
    fn test_descending_by_combined_score() {
        let entries = rank(
            vec![
                stat("10.0.0.1", 10.0, 10.0, 1),
                stat("10.0.0.2", 90.0, 90.0, 1),
                stat("10.0.0.3", 50.0, 50.0, 1),
            ],
            &Weights::default(),
        );

        let ips: Vec<&str> = entries.iter().map(|e| e.src_ip.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3", "10.0.0.1"]);
    }

    #[test]
    fn test_tie_breaks_on_ascending_src_ip() {
        let entries = rank(
            vec![
                stat("10.0.0.9", 40.0, 40.0, 1),
                stat("10.0.0.1", 40.0, 40.0, 1),
            ],
            &Weights::default(),
        );

        assert_eq!(entries[0].src_ip, "10.0.0.1");
        assert_eq!(entries[1].src_ip, "10.0.0.9");
    }

    #[test]
    fn test_caps_at_ten_entries() {
        let stats = (0..25)
            .map(|i| stat(&format!("10.0.1.{}", i), i as f64, 0.0, 1))
            .collect();
        let entries = rank(stats, &Weights::default());

        assert_eq!(entries.len(), 10);
        // highest combined first
        assert_eq!(entries[0].src_ip, "10.0.1.24");
    }

    #[test]
    fn test_custom_weights() {
        let entries = rank(
            vec![stat("10.0.0.1", 100.0, 0.0, 1)],
            &Weights { rule: 0.7, ml: 0.3 },
        );
        assert_eq!(entries[0].combined_score, 70.0);
    }

    #[test]
    fn test_kpi_zero_data() {
        let kpi = compute_kpi(0, 0, 0, 0.0);
        assert_eq!(kpi.precision, 0.0);
        assert_eq!(kpi.detection_rate, 0.0);
        assert_eq!(kpi.false_positive_rate, 0.0);
        assert_eq!(kpi.mean_alert_latency, 0.0);
    }

    #[test]
    fn test_kpi_arithmetic() {
        let kpi = compute_kpi(10, 3, 1, 1500.0);
        assert_eq!(kpi.detection_rate, 0.3);
        assert_eq!(kpi.precision, 0.75);
        assert_eq!(kpi.false_positive_rate, 0.25);
        assert_eq!(kpi.mean_alert_latency, 1500.0);
    }

    #[test]
    fn test_kpi_alerts_without_feedback() {
        let kpi = compute_kpi(5, 0, 0, 0.0);
        assert_eq!(kpi.detection_rate, 0.0);
        assert_eq!(kpi.precision, 0.0);
        assert_eq!(kpi.false_positive_rate, 0.0);
    }
}
