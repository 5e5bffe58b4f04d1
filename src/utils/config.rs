// Centralized constants for Koharu Bot

use std::time::Duration;

/// Prefix used when a server has not configured one
pub const DEFAULT_PREFIX: &str = ",";

/// Longest prefix a server may configure, in characters
pub const MAX_PREFIX_LEN: usize = 5;

/// Cooldown applied to commands that don't declare their own
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// How often expired cooldown entries are swept from memory
pub const COOLDOWN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// How long a fetched member split stays fresh
pub const MEMBER_COUNT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default limit for the member-list fetch used by `/serverinfo`
pub const DEFAULT_MEMBER_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest value echoed back in the "Configuration Updated" embed
pub const MAX_ECHOED_VALUE_LEN: usize = 50;

/// Generic reply for anything the requester shouldn't see the details of
pub const GENERIC_FAILURE: &str = "There was an error while executing this command!";

/// Discord embed colors
pub mod colors {
    pub const CONFIG: u32 = 0x0099ff;
    pub const SUCCESS: u32 = 0x00ff00;
    pub const RESET: u32 = 0xff9900;
    pub const SERVER_INFO: u32 = 0xffb6c1;
}

/// Convert a std duration to the chrono one used for timestamps
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(duration.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono() {
        assert_eq!(to_chrono(DEFAULT_COOLDOWN), chrono::Duration::seconds(3));
        assert_eq!(to_chrono(MEMBER_COUNT_TTL), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_default_prefix_fits_limit() {
        assert!(DEFAULT_PREFIX.chars().count() <= MAX_PREFIX_LEN);
    }
}
