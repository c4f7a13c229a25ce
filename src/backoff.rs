//! Randomized exponential backoff for transient failures.
//!
//! The client retries transport failures, body read failures and a fixed set
//! of server statuses. [`Backoff::next_delay`] decides whether another attempt
//! is allowed and how long to wait before it.

use crate::{Error, Result};
use http::StatusCode;
use rand::Rng;
use std::time::Duration;

/// Default maximum number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default lower bound for the delay between two attempts.
pub const DEFAULT_BACKOFF_MIN_DELAY: Duration = Duration::from_secs(4);

/// Default upper bound for the delay between two attempts.
pub const DEFAULT_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default growth factor applied per attempt.
pub const DEFAULT_BACKOFF_DELAY_FACTOR: f64 = 3.0;

/// Status codes that are retried: 500 through 504, plus 405 which the
/// device returns while its API process is restarting.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [500, 501, 502, 503, 504, 405];

/// Returns `true` if a response with `status` should be retried.
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status.as_u16())
}

/// Exponential backoff policy with jitter.
///
/// For the zero-based `attempt` that just failed, the base delay is
/// `min_delay * factor^attempt` capped at `max_delay`. The actual delay is
/// drawn uniformly from the upper half of the range between `min_delay` and
/// that base, so it always falls within `[min_delay, max_delay]`.
///
/// # Examples
///
/// ```
/// use nxapi::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff {
///     max_retries: 2,
///     min_delay: Duration::from_secs(1),
///     max_delay: Duration::from_secs(10),
///     factor: 3.0,
/// };
///
/// let delay = backoff.next_delay(1).unwrap();
/// assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(3));
/// assert_eq!(backoff.next_delay(2), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Number of retries allowed after the first attempt.
    pub max_retries: usize,
    /// Smallest delay between two attempts.
    pub min_delay: Duration,
    /// Largest delay between two attempts.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_BACKOFF_MIN_DELAY,
            max_delay: DEFAULT_BACKOFF_MAX_DELAY,
            factor: DEFAULT_BACKOFF_DELAY_FACTOR,
        }
    }
}

impl Backoff {
    /// Returns the delay to wait after the failed zero-based `attempt`, or
    /// `None` when no further attempt is allowed.
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Some(self.jittered_delay(attempt, jitter))
    }

    /// Returns the un-jittered delay for `attempt`, clamped to
    /// `[min_delay, max_delay]`.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let min = self.min_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64().max(min);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = min * self.factor.powi(exponent);

        let base = if scaled.is_finite() {
            scaled.clamp(min, max)
        } else {
            max
        };
        Duration::try_from_secs_f64(base).unwrap_or(self.max_delay)
    }

    fn jittered_delay(&self, attempt: usize, jitter: f64) -> Duration {
        let min = self.min_delay.as_secs_f64();
        let base = self.base_delay(attempt).as_secs_f64();
        Duration::try_from_secs_f64(min + jitter * (base - min)).unwrap_or(self.min_delay)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_delay < self.min_delay {
            return Err(Error::ConfigurationError(format!(
                "Backoff max delay {:?} is below min delay {:?}",
                self.max_delay, self.min_delay
            )));
        }
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(Error::ConfigurationError(format!(
                "Backoff delay factor must be a finite number >= 1, got {}",
                self.factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff {
            max_retries: 3,
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
            factor: 3.0,
        }
    }

    #[test]
    fn test_base_delays_grow_and_cap() {
        let backoff = backoff();
        assert_eq!(backoff.base_delay(0), Duration::from_secs(4));
        assert_eq!(backoff.base_delay(1), Duration::from_secs(12));
        assert_eq!(backoff.base_delay(2), Duration::from_secs(36));
        assert_eq!(backoff.base_delay(3), Duration::from_secs(60));
        assert_eq!(backoff.base_delay(usize::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = backoff();
        assert_eq!(backoff.jittered_delay(1, 0.5), Duration::from_secs(8));
        assert_eq!(backoff.jittered_delay(1, 1.0), Duration::from_secs(12));
        assert_eq!(backoff.jittered_delay(0, 0.5), Duration::from_secs(4));
    }

    #[test]
    fn test_next_delay_within_bounds() {
        let backoff = backoff();
        for attempt in 0..backoff.max_retries {
            for _ in 0..50 {
                let delay = backoff.next_delay(attempt).unwrap();
                assert!(delay >= backoff.min_delay, "{:?} below min", delay);
                assert!(delay <= backoff.max_delay, "{:?} above max", delay);
            }
        }
    }

    #[test]
    fn test_retries_exhausted() {
        let backoff = backoff();
        assert!(backoff.next_delay(2).is_some());
        assert_eq!(backoff.next_delay(3), None);
        assert_eq!(backoff.next_delay(10), None);

        let no_retry = Backoff {
            max_retries: 0,
            ..backoff
        };
        assert_eq!(no_retry.next_delay(0), None);
    }

    #[test]
    fn test_retryable_statuses() {
        for code in [500, 501, 502, 503, 504, 405] {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        for code in [200, 400, 401, 403, 404, 429, 505] {
            assert!(!is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn test_validate() {
        assert!(Backoff::default().validate().is_ok());

        let inverted = Backoff {
            min_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Backoff::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(Error::ConfigurationError(_))
        ));

        let shrinking = Backoff {
            factor: 0.5,
            ..Backoff::default()
        };
        assert!(shrinking.validate().is_err());
    }
}
