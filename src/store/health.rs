//! Advisory health evaluation for the state store.
//!
//! Every threshold is checked and every finding is reported; evaluation
//! does not stop at the first problem. Findings are split into `issues`
//! (the store is unhealthy) and `warnings` (worth a look).

use super::metrics::StoreMetrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stillwater::{NonEmptyVec, Validation};

type Findings = Validation<(), NonEmptyVec<String>>;

/// Limits the health check compares metrics against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Conflict ratio above which the store is unhealthy
    pub max_conflict_ratio: f64,
    /// Conflict ratio above which a warning is raised
    pub warn_conflict_ratio: f64,
    /// Fraction of subscriber slots in use that raises a warning
    pub subscriber_warn_fraction: f64,
    /// Missed-notification ratio that raises a warning
    pub max_missed_ratio: f64,
    /// Age of the last write that raises a staleness warning
    pub stale_after_ms: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_conflict_ratio: 0.10,
            warn_conflict_ratio: 0.01,
            subscriber_warn_fraction: 0.80,
            max_missed_ratio: 0.10,
            stale_after_ms: 60_000,
        }
    }
}

impl HealthThresholds {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// Result of [`StateStore::health_check`](super::StateStore::health_check).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Evaluate metrics against thresholds, accumulating all findings.
pub fn evaluate(metrics: &StoreMetrics, thresholds: &HealthThresholds) -> HealthReport {
    let conflict_ratio = metrics.conflict_ratio();
    let missed_ratio = metrics.missed_ratio();
    let saturation = metrics.subscriber_saturation();

    let issues = Validation::all_vec(vec![
        check(conflict_ratio <= thresholds.max_conflict_ratio, || {
            format!(
                "version conflict ratio {:.3} exceeds {:.3}",
                conflict_ratio, thresholds.max_conflict_ratio
            )
        }),
        check(
            metrics.max_subscribers == 0 || metrics.active_subscribers < metrics.max_subscribers,
            || {
                format!(
                    "subscriber capacity exhausted ({}/{})",
                    metrics.active_subscribers, metrics.max_subscribers
                )
            },
        ),
    ]);

    let stale_after = thresholds.stale_after();
    let warnings = Validation::all_vec(vec![
        check(
            conflict_ratio <= thresholds.warn_conflict_ratio
                || conflict_ratio > thresholds.max_conflict_ratio,
            || format!("version conflict ratio elevated at {:.3}", conflict_ratio),
        ),
        check(
            saturation < thresholds.subscriber_warn_fraction
                || metrics.active_subscribers >= metrics.max_subscribers,
            || {
                format!(
                    "subscriber usage at {:.0}% of capacity",
                    saturation * 100.0
                )
            },
        ),
        check(missed_ratio <= thresholds.max_missed_ratio, || {
            format!(
                "missed notification ratio {:.3} exceeds {:.3}",
                missed_ratio, thresholds.max_missed_ratio
            )
        }),
        check(metrics.current_version.is_some(), || {
            "store has not been initialized".to_string()
        }),
        check(
            metrics
                .last_update_age
                .map_or(true, |age| age <= stale_after),
            || {
                format!(
                    "no update for {:?} (stale after {:?})",
                    metrics.last_update_age.unwrap_or_default(),
                    stale_after
                )
            },
        ),
    ]);

    let issues = into_messages(issues.map(|_| ()));
    let warnings = into_messages(warnings.map(|_| ()));

    HealthReport {
        healthy: issues.is_empty(),
        issues,
        warnings,
    }
}

fn check<F>(ok: bool, message: F) -> Findings
where
    F: FnOnce() -> String,
{
    if ok {
        Validation::success(())
    } else {
        Validation::fail(message())
    }
}

fn into_messages(findings: Findings) -> Vec<String> {
    match findings {
        Validation::Success(()) => Vec::new(),
        Validation::Failure(messages) => messages.into_vec(),
    }
}
