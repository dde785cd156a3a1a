//! Date key resolution for batch rows
//!
//! Batch exports write their date column in several textual forms (ISO weeks,
//! US-style `MM/DD/YYYY`, monthly `YYYY-MM`, day-first locale forms). A
//! [`DatePolicy`] fixes the resolution order: strict `chrono` formats in
//! priority order, then an optional lenient day-first fallback.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Strict formats tried before the lenient fallback, in priority order
///
/// `%y` precedes `%Y`: chrono's `%Y` also accepts two-digit years.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d.%m.%Y", "%Y-%m"];

/// Two-digit years are mapped into this century by the lenient parser
const TWO_DIGIT_YEAR_BASE: i32 = 2000;

/// Plausible year range for a date key; anything outside is a parse failure
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2199;

/// Date format resolution policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePolicy {
    /// `chrono` format strings, tried in order
    pub formats: Vec<String>,

    /// Fall back to day-first numeric parsing when no strict format matches
    pub lenient: bool,
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self {
            formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            lenient: true,
        }
    }
}

impl DatePolicy {
    /// Policy that only accepts the given strict formats
    pub fn strict<S: Into<String>>(formats: impl IntoIterator<Item = S>) -> Self {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
            lenient: false,
        }
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        parse_date(raw, self)
    }
}

/// Resolve a raw date cell to a calendar date
///
/// Returns `None` when neither a strict format nor (if enabled) the lenient
/// fallback yields a valid date.
///
/// # Examples
/// ```rust
/// use chrono::NaiveDate;
/// use trendnorm_core::{parse_date, DatePolicy};
///
/// let policy = DatePolicy::default();
/// assert_eq!(parse_date("2024-01-07", &policy), NaiveDate::from_ymd_opt(2024, 1, 7));
/// assert_eq!(parse_date("01/07/2024", &policy), NaiveDate::from_ymd_opt(2024, 1, 7));
/// assert_eq!(parse_date("2004-03", &policy), NaiveDate::from_ymd_opt(2004, 3, 1));
/// assert_eq!(parse_date("not a date", &policy), None);
/// ```
pub fn parse_date(raw: &str, policy: &DatePolicy) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    policy
        .formats
        .iter()
        .filter_map(|format| parse_strict(value, format))
        .find(is_plausible)
        .or_else(|| {
            policy
                .lenient
                .then(|| parse_lenient(value))
                .flatten()
                .filter(is_plausible)
        })
}

fn is_plausible(date: &NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

fn parse_strict(value: &str, format: &str) -> Option<NaiveDate> {
    if has_day_specifier(format) {
        NaiveDate::parse_from_str(value, format).ok()
    } else {
        // Month-granular formats resolve to the first day of the month
        NaiveDate::parse_from_str(&format!("{value}-01"), &format!("{format}-%d")).ok()
    }
}

fn has_day_specifier(format: &str) -> bool {
    ["%d", "%e", "%j", "%F", "%D", "%x"]
        .iter()
        .any(|directive| format.contains(directive))
}

/// Day-first numeric parse of `D/M/Y`, `Y-M-D` and similar three-part forms
///
/// A trailing time component (`2024-01-07T00:00:00`, `07/01/2024 12:00`) is
/// ignored. When the day-first reading is not a valid date the month-first
/// reading is tried.
fn parse_lenient(value: &str) -> Option<NaiveDate> {
    let date_part = value
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or(value);

    let parts: Vec<&str> = date_part
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .collect();

    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    if first.len() == 4 {
        let year = first.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, second.parse().ok()?, third.parse().ok()?);
    }

    let year = match third.len() {
        2 => TWO_DIGIT_YEAR_BASE + third.parse::<i32>().ok()?,
        4 => third.parse().ok()?,
        _ => return None,
    };
    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;

    NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_strict_formats_in_priority_order() {
        let policy = DatePolicy::default();
        assert_eq!(parse_date("2024-02-14", &policy), ymd(2024, 2, 14));
        // US form wins over the lenient day-first reading
        assert_eq!(parse_date("02/03/2024", &policy), ymd(2024, 2, 3));
        assert_eq!(parse_date("02/03/24", &policy), ymd(2024, 2, 3));
        assert_eq!(parse_date("14.02.2024", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date(" 2024-02-14 ", &policy), ymd(2024, 2, 14));
    }

    #[test]
    fn test_monthly_format() {
        let policy = DatePolicy::default();
        assert_eq!(parse_date("2004-01", &policy), ymd(2004, 1, 1));
        assert_eq!(parse_date("2004-13", &policy), None);
    }

    #[test]
    fn test_lenient_fallback() {
        let policy = DatePolicy::default();
        // Day-first, not covered by strict formats
        assert_eq!(parse_date("14/02/2024", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date("14-02-2024", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date("2024/02/14", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date("2024-02-14T00:00:00", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date("14-02-24", &policy), ymd(2024, 2, 14));
    }

    #[test]
    fn test_strict_policy_rejects_lenient_forms() {
        let policy = DatePolicy::strict(["%Y-%m-%d"]);
        assert_eq!(parse_date("2024-02-14", &policy), ymd(2024, 2, 14));
        assert_eq!(parse_date("14/02/2024", &policy), None);
        assert_eq!(parse_date("2024-02-14T00:00:00", &policy), None);
    }

    #[test]
    fn test_invalid_dates() {
        let policy = DatePolicy::default();
        assert_eq!(parse_date("", &policy), None);
        assert_eq!(parse_date("not-a-date", &policy), None);
        assert_eq!(parse_date("2024-02-30", &policy), None);
        assert_eq!(parse_date("32/13/2024", &policy), None);
        assert_eq!(parse_date("1/2", &policy), None);
        // chrono reads "0014" as a year; out-of-range years are rejected
        assert_eq!(parse_date("0014-02-24", &policy), None);
    }
}
