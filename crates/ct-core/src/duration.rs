//! Duration token normalization.
//!
//! Agenda sheets write durations in many shapes: `5-7分钟`, `8'`, `3:30`,
//! `420秒`, `2'+2'+2'` or a bare `8`. Everything is normalized to whole
//! seconds. Forms are tried in a fixed precedence order and each form must
//! match the whole token.

use std::sync::LazyLock;

use regex::Regex;

/// Fallback when a token is empty or unrecognized (3 minutes).
pub const DEFAULT_DURATION_SECS: i64 = 180;

const MINUTE_MARKER: &str = r"(?:分钟|分|mins?|minutes?|m|')";
const SECOND_MARKER: &str = r"(?:秒钟|秒|secs?|seconds?|s|'')";

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(\d+)-(\d+){MINUTE_MARKER}?$")).expect("valid range regex")
});

static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(\d+){MINUTE_MARKER}$")).expect("valid minutes regex")
});

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{1,2})$").expect("valid clock regex"));

static SECONDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(\d+){SECOND_MARKER}$")).expect("valid seconds regex")
});

static BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)$").expect("valid bare number regex"));

/// Normalizes a duration token to seconds, falling back to
/// [`DEFAULT_DURATION_SECS`] when nothing matches.
///
/// ```
/// use ct_core::normalize_duration;
///
/// assert_eq!(normalize_duration("5-7分钟"), 360);
/// assert_eq!(normalize_duration("3:30"), 210);
/// assert_eq!(normalize_duration("abc"), 180);
/// ```
pub fn normalize_duration(token: &str) -> i64 {
    parse_duration(token).unwrap_or(DEFAULT_DURATION_SECS)
}

/// Parses a duration token, returning `None` when no form matches.
///
/// The agenda parser uses this to decide whether a bare word looks like a
/// duration column.
pub fn parse_duration(token: &str) -> Option<i64> {
    let cleaned = clean_token(token);
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.contains('+') {
        return cleaned
            .split('+')
            .map(parse_single)
            .try_fold(0_i64, |total, part| total.checked_add(part?));
    }

    parse_single(&cleaned)
}

/// Strips whitespace and folds typographic quotes/dashes into ASCII.
fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '′' | '’' | '‘' | '＇' | '`' | '´' => '\'',
            '″' | '"' | '“' | '”' => '"',
            '–' | '—' | '~' | '～' | '－' => '-',
            '：' => ':',
            '＋' => '+',
            other => other,
        })
        .collect::<String>()
        .replace('"', "''")
}

fn parse_single(token: &str) -> Option<i64> {
    if let Some(caps) = RANGE_RE.captures(token) {
        let low = number(&caps[1])?;
        let high = number(&caps[2])?;
        // Half rounds up: 5-6 is 6 minutes.
        let midpoint = (low.checked_add(high)?.checked_add(1)?) / 2;
        return midpoint.checked_mul(60);
    }
    if let Some(caps) = MINUTES_RE.captures(token) {
        return number(&caps[1])?.checked_mul(60);
    }
    if let Some(caps) = CLOCK_RE.captures(token) {
        let minutes = number(&caps[1])?;
        let seconds = number(&caps[2])?;
        return minutes.checked_mul(60)?.checked_add(seconds);
    }
    if let Some(caps) = SECONDS_RE.captures(token) {
        return number(&caps[1]);
    }
    if let Some(caps) = BARE_RE.captures(token) {
        return number(&caps[1])?.checked_mul(60);
    }
    None
}

fn number(digits: &str) -> Option<i64> {
    digits.parse().ok()
}

/// Renders seconds as a compact agenda token (`7'`, `3:30`).
///
/// Whole minutes use the apostrophe form so the token normalizes back to the
/// same value.
pub fn format_duration_token(seconds: i64) -> String {
    if seconds > 0 && seconds % 60 == 0 {
        format!("{}'", seconds / 60)
    } else if seconds > 0 {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_with_minute_word_uses_midpoint() {
        assert_eq!(normalize_duration("5-7分钟"), 360);
        assert_eq!(normalize_duration("1-2分钟"), 120);
        assert_eq!(normalize_duration("6-8 分钟"), 420);
    }

    #[test]
    fn range_midpoint_rounds_half_up() {
        assert_eq!(normalize_duration("2-3'"), 180);
        assert_eq!(normalize_duration("5-6"), 360);
    }

    #[test]
    fn range_with_apostrophe_and_typographic_quotes() {
        assert_eq!(normalize_duration("5-7'"), 360);
        assert_eq!(normalize_duration("5-7′"), 360);
        assert_eq!(normalize_duration("5～7分钟"), 360);
    }

    #[test]
    fn single_minutes() {
        assert_eq!(normalize_duration("8'"), 480);
        assert_eq!(normalize_duration("25分钟"), 1500);
        assert_eq!(normalize_duration("3 min"), 180);
        assert_eq!(normalize_duration("10 Minutes"), 600);
    }

    #[test]
    fn clock_form() {
        assert_eq!(normalize_duration("3:30"), 210);
        assert_eq!(normalize_duration("05:30"), 330);
        assert_eq!(normalize_duration("7:00"), 420);
    }

    #[test]
    fn seconds_form_is_not_converted() {
        assert_eq!(normalize_duration("420秒"), 420);
        assert_eq!(normalize_duration("90s"), 90);
        assert_eq!(normalize_duration("30''"), 30);
        assert_eq!(normalize_duration("45\""), 45);
    }

    #[test]
    fn bare_integer_is_minutes() {
        assert_eq!(normalize_duration("8"), 480);
        assert_eq!(normalize_duration("0"), 0);
    }

    #[test]
    fn composite_sums_segments() {
        assert_eq!(normalize_duration("2'+2'+2'"), 360);
        assert_eq!(normalize_duration("1-2分钟+30秒"), 150);
    }

    #[test]
    fn composite_with_unknown_segment_falls_back() {
        assert_eq!(parse_duration("2'+abc"), None);
        assert_eq!(normalize_duration("2'+abc"), DEFAULT_DURATION_SECS);
    }

    #[test]
    fn unrecognized_defaults_to_three_minutes() {
        assert_eq!(normalize_duration("abc"), 180);
        assert_eq!(normalize_duration(""), 180);
        assert_eq!(normalize_duration("   "), 180);
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn overflow_is_unrecognized() {
        assert_eq!(parse_duration("99999999999999999999"), None);
    }

    #[test]
    fn format_token_normalizes_back() {
        for seconds in [60, 210, 360, 1500, 45] {
            let token = format_duration_token(seconds);
            assert_eq!(normalize_duration(&token), seconds, "token {token}");
        }
    }
}
