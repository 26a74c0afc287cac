//! Scrubs credentials out of text before it reaches a log line or the
//! terminal. Request URLs and header dumps go through [`redact_secrets`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

const REDACTED: &str = "[REDACTED]";

static AUTH_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(authorization:\s*(?:bearer|basic)\s+)[^\s,;]+").unwrap());

static SECRET_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:access_token|refresh_token|token|api_key|apikey|secret|password|passwd)=)[^&\s#'\x22]*")
        .unwrap()
});

static URL_USERINFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\b[a-zA-Z][a-zA-Z0-9+.\-]*://[^/\s:@]+:)[^/\s@]+@").unwrap());

/// Replaces bearer/basic credentials, secret query parameters and URL
/// passwords with a placeholder. Borrowed when nothing matched.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    if !contains_sensitive(input) {
        return Cow::Borrowed(input);
    }
    let step = URL_USERINFO.replace_all(input, format!("${{1}}{REDACTED}@").as_str());
    let step = AUTH_HEADER.replace_all(&step, format!("${{1}}{REDACTED}").as_str());
    let step = SECRET_PARAM.replace_all(&step, format!("${{1}}{REDACTED}").as_str());
    Cow::Owned(step.into_owned())
}

pub fn contains_sensitive(input: &str) -> bool {
    URL_USERINFO.is_match(input) || AUTH_HEADER.is_match(input) || SECRET_PARAM.is_match(input)
}
