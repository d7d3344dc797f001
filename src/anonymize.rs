//! PII scrubbing for diagnostic text
//!
//! Error messages routinely embed file paths, account names, and addresses.
//! [`anonymize`] replaces recognizable patterns with fixed placeholder tokens
//! before the text ever reaches an event property. The function is pure and
//! idempotent: placeholders never re-match, and PII-free input comes back
//! unchanged.
//!
//! Applied only to `error` properties; callers keep PII out of everything
//! else themselves.

use std::sync::LazyLock;

use regex::Regex;

const PLACEHOLDER_EMAIL: &str = "[email]";
const PLACEHOLDER_HOME: &str = "[home]";
const PLACEHOLDER_IP: &str = "[ip]";
const PLACEHOLDER_USER: &str = "[user]";

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

/// User-home prefixes on the common platforms, including the account name
/// segment.
static RE_HOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:/home/|/Users/|[A-Za-z]:\\Users\\)[^/\\\s"':]+"#).expect("valid home pattern")
});

static RE_IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\b")
        .expect("valid ipv4 pattern")
});

/// Scrub PII patterns from free-form text.
///
/// Replaces email addresses, home-directory paths (with the embedded account
/// name), IPv4 addresses, and bare occurrences of the current account name.
pub fn anonymize(text: &str) -> String {
    anonymize_with(text, process_user_name().as_deref())
}

/// Scrubbing core with an explicit account name, for determinism in tests.
fn anonymize_with(text: &str, user_name: Option<&str>) -> String {
    let text = RE_EMAIL.replace_all(text, PLACEHOLDER_EMAIL);
    let text = RE_HOME.replace_all(&text, PLACEHOLDER_HOME);
    let text = RE_IPV4.replace_all(&text, PLACEHOLDER_IP);

    match user_name {
        // Very short account names would match all over arbitrary text.
        Some(name) if name.len() >= 3 => replace_user_name(&text, name),
        _ => text.into_owned(),
    }
}

/// Replace bare occurrences of the account name, leaving placeholder tokens
/// alone. Account names like "user" would otherwise re-match inside
/// "[user]" on a second pass and break idempotence.
fn replace_user_name(text: &str, name: &str) -> String {
    let placeholders = [
        PLACEHOLDER_EMAIL,
        PLACEHOLDER_HOME,
        PLACEHOLDER_IP,
        PLACEHOLDER_USER,
    ];
    let mut masked: Vec<(usize, usize)> = Vec::new();
    for token in placeholders {
        for (start, _) in text.match_indices(token) {
            masked.push((start, start + token.len()));
        }
    }

    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for (start, matched) in text.match_indices(name) {
        let end = start + matched.len();
        if masked.iter().any(|&(s, e)| start < e && s < end) {
            continue;
        }
        result.push_str(&text[last..start]);
        result.push_str(PLACEHOLDER_USER);
        last = end;
    }
    result.push_str(&text[last..]);
    result
}

/// The current account name, from the environment.
fn process_user_name() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
}
