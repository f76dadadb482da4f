//! Validity gates
//!
//! A gate decides whether overriding is active at all. It is evaluated on
//! every decision, so the built-in variants are lock-free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::GateError;

/// Predicate deciding whether the override mechanism is currently active
pub trait Gate: Send + Sync {
    /// Evaluate the gate now
    fn evaluate(&self) -> Result<bool, GateError>;

    /// Short description for diagnostics
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

impl<F> Gate for F
where
    F: Fn() -> Result<bool, GateError> + Send + Sync,
{
    fn evaluate(&self) -> Result<bool, GateError> {
        self()
    }
}

/// Built-in gates
#[derive(Debug)]
pub enum ValidityGate {
    /// Always open
    Always,
    /// Open while the wall clock is before the deadline
    UntilTime(DateTime<Utc>),
    /// Open while the monotonic clock is before the deadline
    UntilInstant(Instant),
    /// Open for the first `limit` evaluations
    UntilCount { limit: u64, calls: AtomicU64 },
}

impl ValidityGate {
    pub fn always() -> Self {
        Self::Always
    }

    /// Open until an absolute point in time
    pub fn until_time(deadline: DateTime<Utc>) -> Self {
        Self::UntilTime(deadline)
    }

    /// Open for `duration` starting now
    ///
    /// A duration too large to represent never expires.
    pub fn until_duration(duration: Duration) -> Self {
        match Instant::now().checked_add(duration) {
            Some(deadline) => Self::UntilInstant(deadline),
            None => Self::Always,
        }
    }

    /// Open for exactly the next `limit` evaluations, then closed for good
    pub fn until_count(limit: u64) -> Self {
        Self::UntilCount {
            limit,
            calls: AtomicU64::new(0),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Always => true,
            Self::UntilTime(deadline) => Utc::now() < *deadline,
            Self::UntilInstant(deadline) => Instant::now() < *deadline,
            Self::UntilCount { limit, calls } => {
                // Skip the increment once the threshold is crossed
                if calls.load(Ordering::Acquire) >= *limit {
                    return false;
                }
                // Each caller gets a unique ticket, only tickets below the limit pass
                calls.fetch_add(1, Ordering::AcqRel) < *limit
            }
        }
    }
}

impl Gate for ValidityGate {
    fn evaluate(&self) -> Result<bool, GateError> {
        Ok(self.is_open())
    }

    fn describe(&self) -> String {
        match self {
            Self::Always => "always".to_string(),
            Self::UntilTime(deadline) => format!("until {}", deadline.to_rfc3339()),
            Self::UntilInstant(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                format!("for {}ms", left.as_millis())
            }
            Self::UntilCount { limit, .. } => format!("for {} calls", limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_always() {
        let gate = ValidityGate::always();
        for _ in 0..100 {
            assert_eq!(gate.evaluate(), Ok(true));
        }
    }

    #[test]
    fn test_until_time() {
        let open = ValidityGate::until_time(Utc::now() + chrono::Duration::hours(1));
        assert_eq!(open.evaluate(), Ok(true));

        let closed = ValidityGate::until_time(Utc::now() - chrono::Duration::seconds(1));
        assert_eq!(closed.evaluate(), Ok(false));
    }

    #[test]
    fn test_until_duration_expires() {
        let gate = ValidityGate::until_duration(Duration::from_millis(20));
        assert_eq!(gate.evaluate(), Ok(true));
        thread::sleep(Duration::from_millis(40));
        assert_eq!(gate.evaluate(), Ok(false));
        assert_eq!(gate.evaluate(), Ok(false));
    }

    #[test]
    fn test_until_duration_overflow_never_expires() {
        let gate = ValidityGate::until_duration(Duration::MAX);
        assert!(matches!(gate, ValidityGate::Always));
    }

    #[test]
    fn test_until_count() {
        let gate = ValidityGate::until_count(2);
        assert_eq!(gate.evaluate(), Ok(true));
        assert_eq!(gate.evaluate(), Ok(true));
        for _ in 0..10 {
            assert_eq!(gate.evaluate(), Ok(false));
        }
    }

    #[test]
    fn test_until_count_zero_is_closed() {
        let gate = ValidityGate::until_count(0);
        assert_eq!(gate.evaluate(), Ok(false));
    }

    #[test]
    fn test_until_count_exact_under_contention() {
        for limit in [0u64, 1, 2, 7] {
            let gate = Arc::new(ValidityGate::until_count(limit));
            let opened: u64 = thread::scope(|s| {
                let handles: Vec<_> = (0..8)
                    .map(|_| {
                        let gate = Arc::clone(&gate);
                        s.spawn(move || {
                            (0..50)
                                .filter(|_| gate.evaluate().unwrap())
                                .count() as u64
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).sum()
            });
            assert_eq!(opened, limit);
            assert_eq!(gate.evaluate(), Ok(false));
        }
    }

    #[test]
    fn test_closure_gate() {
        let gate = || -> Result<bool, GateError> { Err(GateError::new("broken")) };
        assert_eq!(gate.evaluate(), Err(GateError::new("broken")));
        assert_eq!(gate.describe(), "custom");
    }

    #[test]
    fn test_describe() {
        assert_eq!(ValidityGate::always().describe(), "always");
        assert_eq!(ValidityGate::until_count(3).describe(), "for 3 calls");
    }
}
