//! Small helpers for CLI output.

use crate::config::BotConfig;

/// Truncate a string to at most `max_chars` characters, adding an ellipsis
/// if truncated. Newlines are flattened to spaces.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else if max_chars <= 3 {
        flat.chars().take(max_chars).collect()
    } else {
        let truncated: String = flat.chars().take(max_chars - 3).collect();
        format!("{truncated}...")
    }
}

/// Mask a secret, keeping the last four characters of long values.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("****{tail}")
}

/// A copy of the configuration with credentials masked, for display.
#[must_use]
pub fn redacted(config: &BotConfig) -> BotConfig {
    let mut config = config.clone();
    let mask = |v: &mut Option<String>| {
        if let Some(s) = v.as_mut() {
            *s = mask_secret(s);
        }
    };
    mask(&mut config.line.channel_access_token);
    mask(&mut config.line.channel_secret);
    mask(&mut config.openai.api_key);
    config
}

/// Describe whether an environment variable is set, without its value.
#[must_use]
pub fn env_status(name: &str) -> &'static str {
    if std::env::var_os(name).is_some_and(|v| !v.is_empty()) {
        "set"
    } else {
        "-"
    }
}
