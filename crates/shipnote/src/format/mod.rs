//! Text helpers shared by the announcement renderers.

pub mod output;

use std::sync::LazyLock;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use regex::Regex;

pub use output::Announcement;

/// Default issue tracker used for linking issue keys.
pub const DEFAULT_ISSUE_BASE_URL: &str = "https://wartek.atlassian.net";

/// Default rounding interval for suggested deploy times, in minutes.
pub const DEPLOY_INTERVAL_MINUTES: u32 = 15;

/// Minimum lead time before a suggested deploy time, in minutes.
pub const DEPLOY_MIN_OFFSET_MINUTES: u32 = 10;

static ISSUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]+-\d+").expect("valid issue key regex"));

// Checked in order; the first match wins.
static EMOJI_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)feat|add", "✨"),
        (r"(?i)fix", "🐞"),
        (r"(?i)refactor|clean", "♻️"),
        (r"(?i)docs", "📝"),
        (r"(?i)test", "🧩"),
        (r"(?i)chore", "🔧"),
    ]
    .into_iter()
    .map(|(pattern, emoji)| (Regex::new(pattern).expect("valid emoji regex"), emoji))
    .collect()
});

/// Emoji for a commit title, picked from keywords anywhere in it.
pub fn commit_emoji(title: &str) -> &'static str {
    EMOJI_RULES
        .iter()
        .find(|(re, _)| re.is_match(title))
        .map_or("❓", |(_, emoji)| *emoji)
}

/// Output flavour for [`link_issue_keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    Markdown,
    Html,
}

/// Turn issue keys such as `MIL-10067` into links to `{base_url}/browse/KEY`.
pub fn link_issue_keys(title: &str, base_url: &str, style: LinkStyle) -> String {
    let base = base_url.trim_end_matches('/');
    ISSUE_KEY
        .replace_all(title, |caps: &regex::Captures<'_>| {
            let key = &caps[0];
            match style {
                LinkStyle::Markdown => format!("[{key}]({base}/browse/{key})"),
                LinkStyle::Html => format!(r#"<a href="{base}/browse/{key}">{key}</a>"#),
            }
        })
        .into_owned()
}

/// Escape text for inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Suggest a deploy time: `now` rounded up to the next `interval_minutes`
/// boundary, pushed one more interval when that leaves less than
/// `min_offset_minutes` of lead time.
pub fn suggest_deploy_time(
    now: NaiveDateTime,
    interval_minutes: u32,
    min_offset_minutes: u32,
) -> NaiveDateTime {
    let interval = interval_minutes.max(1);
    let minute = now.minute();
    let rounded = minute.div_ceil(interval) * interval;

    let hour_start = now
        - TimeDelta::minutes(i64::from(minute))
        - TimeDelta::seconds(i64::from(now.second()))
        - TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    let mut suggested = hour_start + TimeDelta::minutes(i64::from(rounded));

    if suggested - now < TimeDelta::minutes(i64::from(min_offset_minutes)) {
        suggested += TimeDelta::minutes(i64::from(interval));
    }
    suggested
}

/// `19 Oct 2026, 14:30`
pub fn format_deploy_time(time: &NaiveDateTime) -> String {
    time.format("%d %b %Y, %H:%M").to_string()
}

/// Parse a deploy time given as `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM`.
pub fn parse_deploy_time(input: &str) -> Result<NaiveDateTime, String> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M"))
        .map_err(|e| format!("invalid deploy time '{input}' (expected YYYY-MM-DDTHH:MM): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn emoji_follows_first_matching_keyword() {
        assert_eq!(commit_emoji("feat: dark mode"), "✨");
        assert_eq!(commit_emoji("Add retry to uploads"), "✨");
        assert_eq!(commit_emoji("FIX: null pointer"), "🐞");
        assert_eq!(commit_emoji("refactor: split module"), "♻️");
        assert_eq!(commit_emoji("docs: readme"), "📝");
        assert_eq!(commit_emoji("test: cover parser"), "🧩");
        assert_eq!(commit_emoji("chore: bump deps"), "🔧");
        assert_eq!(commit_emoji("bump version"), "❓");
        // "feat" outranks "fix" regardless of position.
        assert_eq!(commit_emoji("fix feature flag"), "✨");
    }

    #[test]
    fn issue_keys_become_links() {
        let md = link_issue_keys(
            "MIL-10067 fix login",
            "https://jira.example",
            LinkStyle::Markdown,
        );
        assert_eq!(
            md,
            "[MIL-10067](https://jira.example/browse/MIL-10067) fix login"
        );

        let html = link_issue_keys("fix AB-1 and CD-22", "https://jira.example/", LinkStyle::Html);
        assert_eq!(
            html,
            r#"fix <a href="https://jira.example/browse/AB-1">AB-1</a> and <a href="https://jira.example/browse/CD-22">CD-22</a>"#
        );

        assert_eq!(
            link_issue_keys("no keys here", "x", LinkStyle::Markdown),
            "no keys here"
        );
    }

    #[test]
    fn deploy_time_rounds_up_with_lead_time() {
        // 14:02 -> 14:15 (13 minutes ahead).
        assert_eq!(suggest_deploy_time(at(14, 2, 0), 15, 10), at(14, 15, 0));
        // 14:07 -> 14:15 is only 8 minutes ahead, so 14:30.
        assert_eq!(suggest_deploy_time(at(14, 7, 0), 15, 10), at(14, 30, 0));
        // Exactly on a boundary needs another interval.
        assert_eq!(suggest_deploy_time(at(14, 30, 0), 15, 10), at(14, 45, 0));
        // Rolls into the next hour.
        assert_eq!(suggest_deploy_time(at(14, 52, 30), 15, 10), at(15, 15, 0));
        assert_eq!(suggest_deploy_time(at(14, 40, 0), 15, 10), at(15, 0, 0));
    }

    #[test]
    fn deploy_time_rolls_over_midnight() {
        let late = at(23, 55, 0);
        let next = NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(0, 15, 0)
            .unwrap();
        assert_eq!(suggest_deploy_time(late, 15, 10), next);
    }

    #[test]
    fn deploy_time_formats_and_parses() {
        assert_eq!(format_deploy_time(&at(14, 30, 0)), "19 Oct 2026, 14:30");
        assert_eq!(parse_deploy_time("2026-10-19T14:30").unwrap(), at(14, 30, 0));
        assert_eq!(parse_deploy_time(" 2026-10-19 09:05 ").unwrap(), at(9, 5, 0));
        assert!(parse_deploy_time("tomorrow").is_err());
    }

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html(r#"a < b & "c""#), "a &lt; b &amp; &quot;c&quot;");
    }
}
