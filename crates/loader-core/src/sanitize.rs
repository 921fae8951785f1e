//! Redacts credentials and credential-shaped text from log lines and error
//! messages before they reach any sink.
//!
//! The patterns mirror the reference logger this system replaces: URL query
//! parameters, JSON-style key/value pairs, bearer tokens, bare hex secrets,
//! and a conservative heuristic for anything else that merely looks like a
//! key. Ported as regexes rather than re-derived, since the exact boundary
//! of what gets redacted is itself part of the behavior being preserved.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const REDACTED: &str = "[REDACTED]";

static QUERY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([?&])(api[_-]?key|apikey|key|token)=([^&\s]+)").unwrap()
});

static JSON_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(["'])(api[_-]?key|apikey|key|token|secret|password)(["'])\s*[:=]\s*(["'])([^"']+)(["'])"#).unwrap()
});

static BEARER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Bearer\s+)([A-Za-z0-9\-_.]+)").unwrap());

static HEX_SECRET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-fA-F0-9]{32,}\b").unwrap());

static KEY_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z0-9][a-zA-Z0-9\-_.]{19,}\b").unwrap());

static SKIP_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://|/[a-z]|[a-z]+_[a-z]+$|[a-z]+[A-Z][a-z]+|\d+$)").unwrap()
});

/// Redacts every recognized secret-shaped substring in `message`.
pub fn sanitize(message: &str) -> String {
    let mut out = QUERY_PARAM
        .replace_all(message, "$1$2=[REDACTED]")
        .into_owned();
    out = JSON_FIELD
        .replace_all(&out, "$1$2$3:$4[REDACTED]$6")
        .into_owned();
    out = BEARER_TOKEN.replace_all(&out, "$1[REDACTED]").into_owned();
    out = HEX_SECRET.replace_all(&out, REDACTED).into_owned();
    out = KEY_LIKE
        .replace_all(&out, |caps: &Captures| redact_if_key_like(&caps[0]))
        .into_owned();
    out
}

fn redact_if_key_like(candidate: &str) -> String {
    if SKIP_LIKE.is_match(candidate) {
        return candidate.to_string();
    }

    let has_upper = candidate.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = candidate.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = candidate.chars().any(|c| c.is_ascii_digit());

    if (has_upper && has_lower && has_digit) || candidate.len() > 40 {
        REDACTED.to_string()
    } else {
        candidate.to_string()
    }
}
