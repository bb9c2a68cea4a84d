//! PII scrubbing for log output.
//!
//! User prompts routinely carry names, emails and phone numbers (engravings,
//! gift notes). Anything user-authored that reaches `tracing` goes through
//! [`scrub`] first.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

const REDACTED: &str = "[REDACTED]";

/// Longest prompt excerpt written to logs.
pub const LOG_PREVIEW_CHARS: usize = 80;

static PII_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Email addresses
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        // Provider API keys
        r"sk-[A-Za-z0-9_-]{20,}",
        // Bearer tokens and raw JWTs
        r"(?i)bearer\s+[A-Za-z0-9_.=-]+",
        r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
        // Phone numbers: 10+ digits with optional separators
        r"\+?\d[\d\s().-]{8,}\d",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid PII pattern"))
    .collect()
});

/// Replaces emails, phone numbers, API keys and tokens with `[REDACTED]`.
pub fn scrub(text: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(text);
    for pattern in PII_PATTERNS.iter() {
        if pattern.is_match(&result) {
            result = Cow::Owned(pattern.replace_all(&result, REDACTED).into_owned());
        }
    }
    result
}

/// Scrubbed, truncated excerpt of user text for log lines.
pub fn preview(text: &str) -> String {
    let scrubbed = scrub(text);
    let mut out: String = scrubbed.chars().take(LOG_PREVIEW_CHARS).collect();
    if scrubbed.chars().count() > LOG_PREVIEW_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_email() {
        let out = scrub("send the render to jane.doe@example.com please");
        assert!(!out.contains("jane.doe"));
        assert!(out.contains(REDACTED));
    }

    #[test]
    fn test_scrub_phone_number() {
        let out = scrub("call me at +1 (555) 123-4567 about the ring");
        assert!(!out.contains("123-4567"));
    }

    #[test]
    fn test_scrub_api_key_and_bearer() {
        let out = scrub("key sk-abcdefghijklmnopqrstuvwx header Bearer abc.def.ghi");
        assert!(!out.contains("sk-abcdefghijklmnopqrstuvwx"));
        assert!(!out.contains("abc.def.ghi"));
    }

    #[test]
    fn test_scrub_leaves_plain_prompt_untouched() {
        let prompt = "14k rose gold ring with 1 carat diamond";
        assert!(matches!(scrub(prompt), Cow::Borrowed(_)));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "a".repeat(200);
        let out = preview(&long);
        assert_eq!(out.chars().count(), LOG_PREVIEW_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
