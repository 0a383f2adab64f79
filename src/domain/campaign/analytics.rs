//! Campaign analytics aggregation

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::value_object::{CallOutcome, CallStatus};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Which outcomes count as campaign success
///
/// The taxonomy varies by campaign goal, so it is configuration rather
/// than a hard-coded set; the default matches the engine's standard
/// definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    outcomes: HashSet<CallOutcome>,
}

impl SuccessCriteria {
    pub fn new(outcomes: impl IntoIterator<Item = CallOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
        }
    }

    pub fn is_success(&self, outcome: CallOutcome) -> bool {
        self.outcomes.contains(&outcome)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &CallOutcome> {
        self.outcomes.iter()
    }
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self::new([
            CallOutcome::AppointmentScheduled,
            CallOutcome::CustomerInterested,
            CallOutcome::CallbackRequested,
        ])
    }
}

/// Duration percentiles over measured completed calls, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationPercentiles {
    pub p50: i64,
    pub p90: i64,
    pub p95: i64,
}

/// Rollup analytics computed from a campaign's calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAnalytics {
    pub total_calls: u64,
    pub completed_calls: u64,
    pub successful_calls: u64,
    pub appointments_scheduled: u64,
    /// Percentage of completed calls with a success outcome
    pub success_rate: f64,
    pub average_call_duration_seconds: Option<f64>,
    pub duration_percentiles: Option<DurationPercentiles>,
    /// Completed calls per outcome code
    pub outcome_breakdown: BTreeMap<String, u64>,
    /// Completed calls per hour of day (UTC), index 0-23
    pub hourly_volume: Vec<u64>,
}

impl CampaignAnalytics {
    /// Compute the rollup from a campaign's calls
    ///
    /// Counts every call toward `total_calls`; completion metrics only
    /// consider calls that reached Completed or Voicemail.
    pub fn compute(calls: &[OutboundCall], criteria: &SuccessCriteria) -> Self {
        let total_calls = calls.len() as u64;
        let mut completed_calls = 0u64;
        let mut successful_calls = 0u64;
        let mut appointments_scheduled = 0u64;
        let mut outcome_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut durations: Vec<i64> = Vec::new();
        let mut hourly_volume = vec![0u64; 24];

        for call in calls {
            if !matches!(call.status(), CallStatus::Completed | CallStatus::Voicemail) {
                continue;
            }
            completed_calls += 1;

            if let Some(outcome) = call.outcome() {
                *outcome_breakdown.entry(outcome.as_str().to_string()).or_insert(0) += 1;
                if criteria.is_success(outcome) {
                    successful_calls += 1;
                }
                if outcome == CallOutcome::AppointmentScheduled {
                    appointments_scheduled += 1;
                }
            }

            if let Some(duration) = call.analytics().connection_duration_seconds() {
                durations.push(duration);
            }

            if let Some(started) = call.actual_start_time() {
                hourly_volume[started.hour() as usize] += 1;
            }
        }

        let success_rate = if completed_calls == 0 {
            0.0
        } else {
            successful_calls as f64 / completed_calls as f64 * 100.0
        };

        durations.sort_unstable();
        let average_call_duration_seconds = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
        };
        let duration_percentiles = if durations.is_empty() {
            None
        } else {
            Some(DurationPercentiles {
                p50: percentile(&durations, 50),
                p90: percentile(&durations, 90),
                p95: percentile(&durations, 95),
            })
        };

        Self {
            total_calls,
            completed_calls,
            successful_calls,
            appointments_scheduled,
            success_rate,
            average_call_duration_seconds,
            duration_percentiles,
            outcome_breakdown,
            hourly_volume,
        }
    }
}

/// Nearest-rank percentile over a sorted slice
fn percentile(sorted: &[i64], pct: u32) -> i64 {
    debug_assert!(!sorted.is_empty());
    let rank = ((pct as f64 / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
