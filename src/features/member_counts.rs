// Member count cache
// Splitting members into humans and bots needs a full member-list fetch,
// so results are kept per server for a few minutes

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::utils::config::{to_chrono, MEMBER_COUNT_TTL};

/// Humans and bots in a server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberSplit {
    pub humans: u64,
    pub bots: u64,
}

impl MemberSplit {
    /// Tally a list of `is_bot` flags
    pub fn count(bot_flags: impl IntoIterator<Item = bool>) -> Self {
        bot_flags.into_iter().fold(Self::default(), |mut split, is_bot| {
            if is_bot {
                split.bots += 1;
            } else {
                split.humans += 1;
            }
            split
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedCount {
    split: MemberSplit,
    fetched_at: DateTime<Utc>,
}

/// Last fetched split per server, keyed by guild id
#[derive(Debug)]
pub struct MemberCountCache {
    entries: DashMap<String, CachedCount>,
    ttl: Duration,
}

impl MemberCountCache {
    pub fn new() -> Self {
        Self::with_ttl(MEMBER_COUNT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The cached split if it was fetched less than `ttl` before `now`
    pub fn fresh(&self, guild_id: &str, now: DateTime<Utc>) -> Option<MemberSplit> {
        let entry = self.entries.get(guild_id)?;
        (now - entry.fetched_at < to_chrono(self.ttl)).then_some(entry.split)
    }

    /// Whatever was fetched last, however old
    pub fn last_known(&self, guild_id: &str) -> Option<MemberSplit> {
        self.entries.get(guild_id).map(|entry| entry.split)
    }

    pub fn store(&self, guild_id: &str, split: MemberSplit, now: DateTime<Utc>) {
        self.entries.insert(
            guild_id.to_string(),
            CachedCount {
                split,
                fetched_at: now,
            },
        );
    }
}

impl Default for MemberCountCache {
    fn default() -> Self {
        Self::new()
    }
}
