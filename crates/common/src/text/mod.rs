//! Text helpers backing the derived resource fields
//!
//! - `nl2br`: line-break markup inserted before newline sequences
//! - `truncate`: character-based truncation with an ellipsis marker
//! - `time_ago`: human-readable relative time ("3 days ago")

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::sync::OnceLock;

/// Markup inserted in front of every newline sequence
pub const LINE_BREAK: &str = "<br />";

fn newline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Longest sequences first so "\r\n" is a single break
    PATTERN.get_or_init(|| Regex::new(r"\r\n|\n\r|\n|\r").expect("newline pattern is valid"))
}

/// Insert `<br />` before every newline sequence, keeping the newline itself.
pub fn nl2br(text: &str) -> String {
    newline_pattern()
        .replace_all(text, |caps: &regex_lite::Captures<'_>| {
            format!("{}{}", LINE_BREAK, &caps[0])
        })
        .into_owned()
}

/// Truncate `text` to at most `length` characters.
///
/// When truncation happens the result ends with `ellipsis`, and the ellipsis
/// counts towards `length`. Trailing whitespace before the ellipsis is
/// dropped. Text that already fits is returned unchanged.
pub fn truncate(text: &str, length: usize, ellipsis: &str) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }

    let mut ellipsis_len = ellipsis.chars().count();
    if length < ellipsis_len {
        ellipsis_len = 0;
    }

    let kept: String = text.chars().take(length - ellipsis_len).collect();
    if ellipsis_len == 0 {
        return kept;
    }

    let mut out = kept.trim_end().to_string();
    out.push_str(ellipsis);
    out
}

/// Relative time between `instant` and now.
pub fn time_ago(instant: &DateTime<Utc>) -> String {
    time_between(instant, &Utc::now())
}

/// Relative time of `instant` as seen from `now`.
pub fn time_between(instant: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(*instant);
    let (seconds, suffix) = if diff.num_seconds() >= 0 {
        (diff.num_seconds(), "ago")
    } else {
        (-diff.num_seconds(), "from now")
    };

    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let (count, unit) = match seconds {
        s if s < 10 => return format!("a few seconds {}", suffix),
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < WEEK => (s / DAY, "day"),
        s if s < MONTH => (s / WEEK, "week"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };

    let plural = if count == 1 { "" } else { "s" };
    format!("{} {}{} {}", count, unit, plural, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_nl2br_variants() {
        assert_eq!(nl2br("Shiny.\nVery shiny."), "Shiny.<br />\nVery shiny.");
        assert_eq!(nl2br("a\r\nb"), "a<br />\r\nb");
        assert_eq!(nl2br("a\n\rb"), "a<br />\n\rb");
        assert_eq!(nl2br("a\rb"), "a<br />\rb");
        assert_eq!(nl2br("a\n\nb"), "a<br />\n<br />\nb");
        assert_eq!(nl2br("no breaks"), "no breaks");
    }

    #[test]
    fn test_nl2br_idempotent_without_raw_newlines() {
        let once = nl2br("one line <br /> already");
        assert_eq!(nl2br(&once), once);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("", 40, "..."), "");
        assert_eq!(truncate("Golden Chalice", 40, "..."), "Golden Chalice");

        let exact = "x".repeat(40);
        assert_eq!(truncate(&exact, 40, "..."), exact);
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "The crown of the mountain king, studded with rubies";
        let out = truncate(text, 40, "...");
        assert_eq!(out, "The crown of the mountain king, studd...");
        assert!(out.chars().count() <= 40);
    }

    #[test]
    fn test_truncate_trims_before_ellipsis() {
        // the 37th char is a space
        let text = format!("{} {}", "a".repeat(36), "b".repeat(10));
        let out = truncate(&text, 40, "...");
        assert_eq!(out, format!("{}...", "a".repeat(36)));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(50);
        let out = truncate(&text, 40, "...");
        assert_eq!(out.chars().count(), 40);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_time_between_units() {
        let now = Utc::now();
        assert_eq!(time_between(&now, &now), "a few seconds ago");
        assert_eq!(time_between(&(now - Duration::seconds(30)), &now), "30 seconds ago");
        assert_eq!(time_between(&(now - Duration::minutes(1)), &now), "1 minute ago");
        assert_eq!(time_between(&(now - Duration::hours(5)), &now), "5 hours ago");
        assert_eq!(time_between(&(now - Duration::days(3)), &now), "3 days ago");
        assert_eq!(time_between(&(now - Duration::days(14)), &now), "2 weeks ago");
        assert_eq!(time_between(&(now - Duration::days(65)), &now), "2 months ago");
        assert_eq!(time_between(&(now - Duration::days(400)), &now), "1 year ago");
    }

    #[test]
    fn test_time_between_future() {
        let now = Utc::now();
        assert_eq!(time_between(&(now + Duration::seconds(3)), &now), "a few seconds from now");
        assert_eq!(time_between(&(now + Duration::days(2)), &now), "2 days from now");
    }
}
