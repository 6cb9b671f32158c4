use std::time::Duration;

/// Exponential backoff with symmetric jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// 0.0..=1.0
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    /// Transient network trouble: a handful of quick attempts.
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            jitter_ratio: 0.20,
        }
    }
}

impl RetryPolicy {
    /// Waiting for studio generation, which takes minutes rather than
    /// seconds. Roughly fifteen minutes in total.
    pub fn artifact_polling() -> Self {
        Self {
            max_attempts: 64,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            jitter_ratio: 0.10,
        }
    }

    /// Delay before retry number `retry_index` (1-based).
    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        let shift = retry_index.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn with_jitter(&self, delay: Duration) -> Duration {
        let ratio = self.jitter_ratio.clamp(0.0, 1.0);
        if ratio == 0.0 || delay.is_zero() {
            return delay;
        }
        let millis = delay.as_millis() as f64;
        let spread = millis * ratio;
        let low = (millis - spread).max(0.0);
        let sampled = low + rand::random::<f64>() * (millis + spread - low);
        Duration::from_millis(sampled.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter_ratio: 0.0,
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_in_range() {
        let policy = RetryPolicy::artifact_polling();
        for _ in 0..50 {
            let d = policy.with_jitter(Duration::from_secs(10));
            assert!(d >= Duration::from_secs(9) && d <= Duration::from_secs(11));
        }
    }
}
