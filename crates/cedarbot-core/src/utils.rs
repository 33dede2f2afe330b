//! Utility helpers — path resolution, session ids, string manipulation.

use std::path::PathBuf;

/// Length of the random suffix in generated session ids.
const SESSION_SUFFIX_LEN: usize = 9;

/// Get the Cedarbot data directory (e.g. `~/.cedarbot/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cedarbot")
}

/// Generate a session id of the form `session_{unix_millis}_{base36}`.
///
/// Uniqueness is probabilistic; collisions are not checked.
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = to_base36(uuid::Uuid::new_v4().as_u128());
    let suffix: String = random.chars().take(SESSION_SUFFIX_LEN).collect();
    format!("session_{millis}_{suffix}")
}

/// Encode a number in lowercase base 36.
fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Helper to get home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}
