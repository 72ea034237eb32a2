use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})(?:[-/.](\d{1,2}))?\b").unwrap());
static US_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap());
static MONTH_DAY_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(?:(\d{1,2})(?:st|nd|rd|th)?,?\s+)?(\d{4})\b").unwrap()
});
static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?\s+(\d{4})\b").unwrap()
});
static YEAR_MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{4}),?\s+([a-z]{3,9})\.?(?:\s+(\d{1,2})\b)?").unwrap()
});
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Parsed date with whatever precision the source text carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partial {
    Year(i32),
    Month(i32, u32),
    Day(NaiveDate),
}

impl Partial {
    fn from_parts(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        match (month, day) {
            (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m, d)
                .map(Partial::Day)
                .unwrap_or_else(|| Partial::from_parts(year, Some(m), None)),
            (Some(m), None) if (1..=12).contains(&m) => Partial::Month(year, m),
            _ => Partial::Year(year),
        }
    }

    fn to_iso(self) -> String {
        match self {
            Partial::Year(y) => format!("{:04}", y),
            Partial::Month(y, m) => format!("{:04}-{:02}", y, m),
            Partial::Day(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    // abbreviations only; "mayor" and "marching" are not months
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as u32 + 1)
}

fn num<T: std::str::FromStr>(m: Option<regex::Match>) -> Option<T> {
    m.and_then(|m| m.as_str().parse().ok())
}

fn parse(text: &str) -> Option<Partial> {
    if let Some(c) = ISO_RE.captures(text) {
        let year = num(c.get(1))?;
        return Some(Partial::from_parts(year, num(c.get(2)), num(c.get(3))));
    }
    if let Some(c) = US_RE.captures(text) {
        let year = num(c.get(3))?;
        return Some(Partial::from_parts(year, num(c.get(1)), num(c.get(2))));
    }
    for c in DAY_MONTH_YEAR_RE.captures_iter(text) {
        if let Some(month) = month_number(&c[2]) {
            let year = num(c.get(3))?;
            return Some(Partial::from_parts(year, Some(month), num(c.get(1))));
        }
    }
    for c in MONTH_DAY_YEAR_RE.captures_iter(text) {
        if let Some(month) = month_number(&c[1]) {
            let year = num(c.get(3))?;
            return Some(Partial::from_parts(year, Some(month), num(c.get(2))));
        }
    }
    for c in YEAR_MONTH_DAY_RE.captures_iter(text) {
        if let Some(month) = month_number(&c[2]) {
            let year = num(c.get(1))?;
            return Some(Partial::from_parts(year, Some(month), num(c.get(3))));
        }
    }
    let year = num(YEAR_RE.captures(text)?.get(1))?;
    Some(Partial::Year(year))
}

/// Normalize free-text dates to `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
/// Returns an empty string when no year can be found.
pub fn str_to_iso(text: &str) -> String {
    parse(text.trim()).map(Partial::to_iso).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_forms() {
        assert_eq!(str_to_iso("1855-07-29"), "1855-07-29");
        assert_eq!(str_to_iso("1916-05"), "1916-05");
        assert_eq!(str_to_iso("1911/8/1"), "1911-08-01");
    }

    #[test]
    fn bare_year() {
        assert_eq!(str_to_iso("1855"), "1855");
        assert_eq!(str_to_iso("circa 1805"), "1805");
        assert_eq!(str_to_iso("1803-1805"), "1803");
    }

    #[test]
    fn us_numeric() {
        assert_eq!(str_to_iso("8/1/1911"), "1911-08-01");
        assert_eq!(str_to_iso("05/24/1936"), "1936-05-24");
    }

    #[test]
    fn month_names() {
        assert_eq!(str_to_iso("July 29, 1855"), "1855-07-29");
        assert_eq!(str_to_iso("29 July 1855"), "1855-07-29");
        assert_eq!(str_to_iso("Sept. 3rd 1901"), "1901-09-03");
        assert_eq!(str_to_iso("May 1916"), "1916-05");
        assert_eq!(str_to_iso("1936 May 24"), "1936-05-24");
        assert_eq!(str_to_iso("Mayor's report 1916"), "1916");
    }

    #[test]
    fn invalid_calendar_dates_lose_precision() {
        assert_eq!(str_to_iso("1855-02-30"), "1855-02");
        assert_eq!(str_to_iso("1855-13-01"), "1855");
    }

    #[test]
    fn unparseable_is_empty() {
        assert_eq!(str_to_iso(""), "");
        assert_eq!(str_to_iso("undated"), "");
    }
}
