// Cooldown tracking for rate limiting command usage

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::utils::config::to_chrono;

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied { retry_at: DateTime<Utc> },
}

/// Last use of a command by one user
#[derive(Debug, Clone, Copy)]
struct Usage {
    last_used: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Per-command, per-user cooldowns held in process memory.
///
/// Entries stop counting as soon as their window has elapsed and are
/// physically removed by `sweep`, so idle users don't accumulate.
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// (command name, user id) -> last usage
    usages: DashMap<(String, u64), Usage>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Denied while `now < last use + window` for this command and user
    pub fn check(&self, command: &str, user_id: u64, now: DateTime<Utc>, window: Duration) -> Verdict {
        match self.usages.get(&(command.to_string(), user_id)) {
            Some(usage) => Self::judge(usage.last_used, now, window),
            None => Verdict::Allowed,
        }
    }

    /// Remember `now` as the last use, superseding any earlier one
    pub fn record(&self, command: &str, user_id: u64, now: DateTime<Utc>, window: Duration) {
        debug!("Applying {:?} cooldown for '{}' (user: {})", window, command, user_id);
        self.usages.insert(
            (command.to_string(), user_id),
            Usage {
                last_used: now,
                expires_at: now + to_chrono(window),
            },
        );
    }

    /// `check` followed by `record` when allowed, under one map-entry lock
    pub fn acquire(&self, command: &str, user_id: u64, now: DateTime<Utc>, window: Duration) -> Verdict {
        let usage = Usage {
            last_used: now,
            expires_at: now + to_chrono(window),
        };

        match self.usages.entry((command.to_string(), user_id)) {
            Entry::Occupied(mut occupied) => {
                let verdict = Self::judge(occupied.get().last_used, now, window);
                if verdict == Verdict::Allowed {
                    occupied.insert(usage);
                }
                verdict
            }
            Entry::Vacant(vacant) => {
                vacant.insert(usage);
                Verdict::Allowed
            }
        }
    }

    fn judge(last_used: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Verdict {
        let retry_at = last_used + to_chrono(window);
        if now < retry_at {
            Verdict::Denied { retry_at }
        } else {
            Verdict::Allowed
        }
    }

    /// Remove entries whose window has elapsed, returning how many were dropped
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.usages.len();
        self.usages.retain(|_, usage| usage.expires_at > now);
        let removed = before.saturating_sub(self.usages.len());

        if removed > 0 {
            debug!("Swept {} expired cooldown(s)", removed);
        }
        removed
    }

    /// Number of tracked (command, user) pairs, expired or not
    pub fn len(&self) -> usize {
        self.usages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Sweep on a fixed period for the rest of the process lifetime
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.sweep(Utc::now());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WINDOW: Duration = Duration::from_millis(3000);

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn ms(n: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(n)
    }

    #[test]
    fn test_cooldown_window() {
        let limiter = RateLimiter::new();

        assert_eq!(limiter.check("kick", 1, t0(), WINDOW), Verdict::Allowed);
        limiter.record("kick", 1, t0(), WINDOW);

        assert_eq!(
            limiter.check("kick", 1, t0() + ms(1000), WINDOW),
            Verdict::Denied { retry_at: t0() + ms(3000) }
        );
        assert_eq!(limiter.check("kick", 1, t0() + ms(3001), WINDOW), Verdict::Allowed);
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let limiter = RateLimiter::new();
        limiter.record("kick", 1, t0(), WINDOW);
        assert_eq!(limiter.check("kick", 1, t0() + ms(2999), WINDOW), Verdict::Denied { retry_at: t0() + ms(3000) });
        assert_eq!(limiter.check("kick", 1, t0() + ms(3000), WINDOW), Verdict::Allowed);
    }

    #[test]
    fn test_commands_are_independent() {
        let limiter = RateLimiter::new();
        limiter.record("kick", 1, t0(), WINDOW);

        assert!(matches!(limiter.check("kick", 1, t0(), WINDOW), Verdict::Denied { .. }));
        assert_eq!(limiter.check("ban", 1, t0(), WINDOW), Verdict::Allowed);
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new();
        limiter.record("kick", 1, t0(), WINDOW);
        assert_eq!(limiter.check("kick", 2, t0(), WINDOW), Verdict::Allowed);
    }

    #[test]
    fn test_record_supersedes() {
        let limiter = RateLimiter::new();
        limiter.record("kick", 1, t0(), WINDOW);
        limiter.record("kick", 1, t0() + ms(2000), WINDOW);

        assert_eq!(
            limiter.check("kick", 1, t0() + ms(4000), WINDOW),
            Verdict::Denied { retry_at: t0() + ms(5000) }
        );
    }

    #[test]
    fn test_acquire_records_only_when_allowed() {
        let limiter = RateLimiter::new();

        assert_eq!(limiter.acquire("config", 7, t0(), WINDOW), Verdict::Allowed);
        assert_eq!(
            limiter.acquire("config", 7, t0() + ms(500), WINDOW),
            Verdict::Denied { retry_at: t0() + ms(3000) }
        );
        // The denied attempt must not extend the window
        assert_eq!(limiter.acquire("config", 7, t0() + ms(3000), WINDOW), Verdict::Allowed);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_longer_window_override() {
        let limiter = RateLimiter::new();
        let long = Duration::from_secs(10);
        limiter.record("serverinfo", 1, t0(), long);
        assert_eq!(
            limiter.check("serverinfo", 1, t0() + ms(5000), long),
            Verdict::Denied { retry_at: t0() + ms(10_000) }
        );
    }

    #[test]
    fn test_sweep_drops_expired_entries() {
        let limiter = RateLimiter::new();
        limiter.record("kick", 1, t0(), WINDOW);
        limiter.record("ban", 1, t0() + ms(2000), WINDOW);

        assert_eq!(limiter.sweep(t0() + ms(1000)), 0);
        assert_eq!(limiter.sweep(t0() + ms(3000)), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.sweep(t0() + ms(5000)), 1);
        assert!(limiter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs() {
        let limiter = Arc::new(RateLimiter::new());
        limiter.record("kick", 1, Utc::now() - chrono::Duration::seconds(10), WINDOW);

        let handle = limiter.spawn_sweeper(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(limiter.is_empty());
        handle.abort();
    }
}
