//! Retry and follow-up policies
//!
//! The retry rule lives behind a trait so the fixed-interval default can be
//! swapped for exponential backoff without touching the state machine.

use crate::domain::call::value_object::CallOutcome;
use chrono::Duration;

/// Decides when a failed attempt is redialed.
///
/// Implementations must never return a delay shorter than the call's base
/// retry interval; the attempt ceiling itself is enforced by the aggregate.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next dial attempt.
    ///
    /// `attempt` is the attempt that just failed (1-based);
    /// `base_interval_minutes` is the call's configured retry interval.
    fn next_retry_delay(&self, attempt: u32, base_interval_minutes: u32) -> Duration;
}

/// Reschedules every retry exactly `retry_interval_minutes` out.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIntervalRetry;

impl RetryPolicy for FixedIntervalRetry {
    fn next_retry_delay(&self, _attempt: u32, base_interval_minutes: u32) -> Duration {
        Duration::minutes(base_interval_minutes as i64)
    }
}

/// Doubling backoff with an upper bound and optional jitter.
///
/// Attempt 1 waits the base interval, attempt 2 waits `base * multiplier`,
/// and so on, capped at `max_delay_minutes`. Jitter adds up to 20% so a
/// burst of same-minute failures does not redial in lockstep.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    pub multiplier: f64,
    pub max_delay_minutes: u32,
    pub jitter: bool,
}

impl Default for ExponentialBackoffRetry {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            max_delay_minutes: 24 * 60,
            jitter: true,
        }
    }
}

impl RetryPolicy for ExponentialBackoffRetry {
    fn next_retry_delay(&self, attempt: u32, base_interval_minutes: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = (base_interval_minutes as f64) * self.multiplier.powi(exponent as i32);
        let mut minutes = scaled.min(self.max_delay_minutes as f64);
        // Never earlier than the base interval
        minutes = minutes.max(base_interval_minutes as f64);

        if self.jitter {
            use rand::Rng;
            let factor = rand::thread_rng().gen_range(1.0..1.2);
            minutes = (minutes * factor).min(self.max_delay_minutes.max(base_interval_minutes) as f64);
            minutes = minutes.max(base_interval_minutes as f64);
        }

        Duration::minutes(minutes.round() as i64)
    }
}

/// Follow-up delay for outcomes that warrant one.
///
/// Returns `None` for outcomes that need no follow-up. Evaluated once per
/// successful-or-voicemail completion; the actual follow-up call is created
/// later by a scheduler-level job.
pub fn follow_up_delay(outcome: CallOutcome) -> Option<Duration> {
    match outcome {
        CallOutcome::CallbackRequested => Some(Duration::hours(2)),
        CallOutcome::Rescheduled => Some(Duration::days(1)),
        CallOutcome::PartialSuccess | CallOutcome::VoicemailLeft => Some(Duration::days(3)),
        _ => None,
    }
}
