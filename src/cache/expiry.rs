//! Expiry Policy Module
//!
//! Pure expiry predicate plus the touch policy deciding which operations reset
//! an entry's deadline.

use std::time::Duration;

use tokio::time::Instant;

// == Expiry Predicate ==
/// Returns true once `ttl` has fully elapsed since `last_touch`.
///
/// Boundary condition: an entry is expired when `now - last_touch >= ttl`, so an
/// entry whose TTL has exactly elapsed is already gone. A `now` earlier than
/// `last_touch` counts as zero elapsed time.
#[inline]
pub fn is_expired(last_touch: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(last_touch) >= ttl
}

// == Touch Policy ==
/// Which operations reset an entry's `last_touch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TouchPolicy {
    /// Only writes (create and overwrite) reset the deadline.
    #[default]
    OnWrite,
    /// Successful reads reset the deadline as well.
    OnAccess,
}

impl TouchPolicy {
    /// Whether a successful read extends the entry's lifetime.
    pub fn touches_on_read(self) -> bool {
        matches!(self, TouchPolicy::OnAccess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_expired_before_ttl() {
        let start = Instant::now();
        let ttl = Duration::from_secs(10);
        assert!(!is_expired(start, start, ttl));
        assert!(!is_expired(start, start + Duration::from_millis(9_999), ttl));
    }

    #[test]
    fn test_expired_at_exact_boundary() {
        let start = Instant::now();
        let ttl = Duration::from_secs(10);
        assert!(is_expired(start, start + ttl, ttl));
        assert!(is_expired(start, start + ttl + Duration::from_millis(1), ttl));
    }

    #[test]
    fn test_clock_behind_last_touch_is_not_expired() {
        let now = Instant::now();
        let later = now + Duration::from_secs(5);
        assert!(!is_expired(later, now, Duration::from_secs(1)));
    }

    #[test]
    fn test_touch_policy_default_is_write_only() {
        assert_eq!(TouchPolicy::default(), TouchPolicy::OnWrite);
        assert!(!TouchPolicy::OnWrite.touches_on_read());
        assert!(TouchPolicy::OnAccess.touches_on_read());
    }
}
