//! Alias-chain environment loading.
//!
//! All fallback chains live here so callers never repeat `or_else` ladders.

use std::env;

/// Read the primary key or the first set alias; fall back to `default` when unset or empty.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_raw(primary, aliases)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary key or the first set alias. Empty (after trim) counts as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env_raw(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Like [`env_optional`] but keeps the value byte-for-byte.
///
/// Key material is multi-line and its trailing newline matters to `ssh-add`.
pub fn env_verbatim(primary: &str, aliases: &[&str]) -> Option<String> {
    env_raw(primary, aliases).filter(|s| !s.is_empty())
}

/// Boolean env: 0/false/no/off are false, any other value is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match env_raw(primary, aliases).as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Comma separated list env. Blank items are dropped; `None` when nothing remains.
pub fn env_list(primary: &str, aliases: &[&str]) -> Option<Vec<String>> {
    let raw = env_raw(primary, aliases)?;
    let items = split_list(&raw);
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Split a comma separated value, trimming items and dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn env_raw(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
}
