//! Expiration classification.
//!
//! Status is always derived from `expires_at` and the caller's notion of
//! "now". A status stored in an artifact is an informational snapshot and
//! is never consulted here.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::SignatureFormat;

/// Default width of the expiring-soon window.
pub const DEFAULT_WARN_WINDOW_DAYS: u32 = 7;

/// Lifecycle status of a signature relative to its validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    /// Comfortably inside the validity window.
    Active,
    /// Inside the window but within the warning period of its end.
    #[serde(rename = "expiring")]
    ExpiringWarn,
    /// Past `expires_at`.
    Expired,
}

impl SignatureStatus {
    /// Returns the persisted label of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringWarn => "expiring",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a validity window to a [`SignatureStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    warn_window: Duration,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            warn_window: Duration::days(i64::from(DEFAULT_WARN_WINDOW_DAYS)),
        }
    }
}

impl ExpirationPolicy {
    /// Creates a policy with the given warning window. Negative windows are
    /// treated as zero.
    #[must_use]
    pub fn new(warn_window: Duration) -> Self {
        Self {
            warn_window: warn_window.max(Duration::zero()),
        }
    }

    /// Creates a policy with a warning window of `days` days.
    #[must_use]
    pub fn with_warn_days(days: u32) -> Self {
        Self::new(Duration::days(i64::from(days)))
    }

    /// Returns the warning window.
    #[must_use]
    pub const fn warn_window(&self) -> Duration {
        self.warn_window
    }

    /// Classifies an expiry instant relative to `now`.
    ///
    /// - `Expired` if `now > expires_at`
    /// - `ExpiringWarn` if `expires_at - now <= warn_window`
    /// - `Active` otherwise
    #[must_use]
    pub fn classify(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> SignatureStatus {
        if now > expires_at {
            SignatureStatus::Expired
        } else if expires_at - now <= self.warn_window {
            SignatureStatus::ExpiringWarn
        } else {
            SignatureStatus::Active
        }
    }

    /// Classifies a signature of either format.
    #[must_use]
    pub fn classify_signature(
        &self,
        signature: &SignatureFormat,
        now: DateTime<Utc>,
    ) -> SignatureStatus {
        self.classify(signature.expires_at(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-15T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_boundaries() {
        let policy = ExpirationPolicy::default();
        assert_eq!(policy.classify(now() + Duration::days(60), now()), SignatureStatus::Active);
        assert_eq!(
            policy.classify(now() + Duration::days(5), now()),
            SignatureStatus::ExpiringWarn
        );
        assert_eq!(policy.classify(now() - Duration::days(1), now()), SignatureStatus::Expired);
    }

    #[test]
    fn test_edges_of_warn_window() {
        let policy = ExpirationPolicy::default();
        assert_eq!(
            policy.classify(now() + Duration::days(7), now()),
            SignatureStatus::ExpiringWarn
        );
        assert_eq!(
            policy.classify(now() + Duration::days(7) + Duration::seconds(1), now()),
            SignatureStatus::Active
        );
        // Expiry is exclusive: the final instant is still inside the window.
        assert_eq!(policy.classify(now(), now()), SignatureStatus::ExpiringWarn);
        assert_eq!(
            policy.classify(now() - Duration::seconds(1), now()),
            SignatureStatus::Expired
        );
    }

    #[test]
    fn test_zero_window() {
        let policy = ExpirationPolicy::with_warn_days(0);
        assert_eq!(policy.classify(now() + Duration::hours(1), now()), SignatureStatus::Active);
        assert_eq!(
            ExpirationPolicy::new(Duration::days(-3)).warn_window(),
            Duration::zero()
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(SignatureStatus::ExpiringWarn.to_string(), "expiring");
        assert_eq!(
            serde_json::to_string(&SignatureStatus::Expired).unwrap(),
            "\"expired\""
        );
        let parsed: SignatureStatus = serde_json::from_str("\"expiring\"").unwrap();
        assert_eq!(parsed, SignatureStatus::ExpiringWarn);
    }
}
