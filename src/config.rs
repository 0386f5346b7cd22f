//! Engine configuration: token lifetimes and the lockout threshold.

use chrono::Duration;

const DEFAULT_CONFIRMATION_TTL_DAYS: i64 = 3;
const DEFAULT_UNLOCK_TTL_DAYS: i64 = 3;
const DEFAULT_RECOVERY_TTL_DAYS: i64 = 3;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Clone, Copy, Debug)]
pub struct SecurityConfig {
    confirmation_ttl: Duration,
    unlock_ttl: Duration,
    recovery_ttl: Duration,
    max_failed_attempts: u32,
}

impl SecurityConfig {
    /// Defaults: 3-day token lifetimes, lock after 5 failed attempts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            confirmation_ttl: Duration::days(DEFAULT_CONFIRMATION_TTL_DAYS),
            unlock_ttl: Duration::days(DEFAULT_UNLOCK_TTL_DAYS),
            recovery_ttl: Duration::days(DEFAULT_RECOVERY_TTL_DAYS),
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_confirmation_ttl(mut self, ttl: Duration) -> Self {
        self.confirmation_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_unlock_ttl(mut self, ttl: Duration) -> Self {
        self.unlock_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_recovery_ttl(mut self, ttl: Duration) -> Self {
        self.recovery_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    #[must_use]
    pub fn confirmation_ttl(&self) -> Duration {
        self.confirmation_ttl
    }

    #[must_use]
    pub fn unlock_ttl(&self) -> Duration {
        self.unlock_ttl
    }

    #[must_use]
    pub fn recovery_ttl(&self) -> Duration {
        self.recovery_ttl
    }

    #[must_use]
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = SecurityConfig::new();
        assert_eq!(config.confirmation_ttl(), Duration::days(3));
        assert_eq!(config.unlock_ttl(), Duration::days(3));
        assert_eq!(config.recovery_ttl(), Duration::days(3));
        assert_eq!(config.max_failed_attempts(), 5);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = SecurityConfig::new()
            .with_confirmation_ttl(Duration::hours(1))
            .with_max_failed_attempts(3);
        assert_eq!(config.confirmation_ttl(), Duration::hours(1));
        assert_eq!(config.max_failed_attempts(), 3);
        // Untouched fields keep their defaults.
        assert_eq!(config.recovery_ttl(), Duration::days(3));
    }
}
