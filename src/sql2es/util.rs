use anyhow::Result;
use chrono::{Local, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in milliseconds.
///
/// History timestamps and record ids are derived from this value; keep a
/// single implementation so both agree on the clock source.
pub fn now_epoch_millis() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64)
}

/// Truncate `input` to at most `max_chars` Unicode characters, stripping
/// control characters and appending `…` when truncated.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    let clean: String = input.chars().filter(|c| !c.is_control()).collect();
    if clean.chars().count() > max_chars {
        let mut s: String = clean.chars().take(max_chars).collect();
        s.push('…');
        s
    } else {
        clean
    }
}

/// Render a secret for display: keep the last four characters when the value
/// is long enough to survive it, otherwise hide it entirely.
pub fn mask_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<unset>".to_string();
    }
    let count = trimmed.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = trimmed.chars().skip(count - 4).collect();
    format!("****{tail}")
}

pub fn format_epoch_millis(millis: u64) -> String {
    match Local.timestamp_millis_opt(millis as i64).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
