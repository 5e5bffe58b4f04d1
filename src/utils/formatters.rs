// Formatting utilities

use chrono::{DateTime, Utc};

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Cut a string to `max_chars` characters, appending "..." when something was cut
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Seconds since the epoch, rounded to the nearest second
pub fn epoch_seconds_rounded(at: DateTime<Utc>) -> i64 {
    (at.timestamp_millis() + 500).div_euclid(1000)
}

/// Discord relative timestamp markup (e.g. "in 3 seconds")
pub fn relative_timestamp(at: DateTime<Utc>) -> String {
    format!("<t:{}:R>", epoch_seconds_rounded(at))
}

/// Render a channel id as a clickable mention
pub fn channel_mention(channel_id: &str) -> String {
    format!("<#{}>", channel_id)
}

/// Checkmark/cross used for yes/no embed fields
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "✅"
    } else {
        "❌"
    }
}
