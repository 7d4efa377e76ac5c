//! Date normalization for archival document metadata.
//!
//! Record dates in released collections arrive in every spelling imaginable:
//! `1963-11-22`, `11/22/63`, `22 Nov 1963`, `November 22, 1963`, `Nov. 1963`
//! or just `1963`. The patterns below are tried from most to least specific;
//! the first one yielding a valid calendar date wins.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Earliest year accepted as a plausible record date.
const MIN_YEAR: i32 = 1800;
/// Latest year accepted as a plausible record date.
const MAX_YEAR: i32 = 2100;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// How much of a normalized date is actually known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

impl DatePrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePrecision::Year => "year",
            DatePrecision::Month => "month",
            DatePrecision::Day => "day",
        }
    }
}

/// A date recovered from free-form metadata.
///
/// Month and year precision dates are anchored on the first day of the
/// period so they sort before day-precision dates inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    pub precision: DatePrecision,
}

impl NormalizedDate {
    /// `1963-11-22`, `1963-11` or `1963`.
    pub fn iso(&self) -> String {
        match self.precision {
            DatePrecision::Day => self.date.format("%Y-%m-%d").to_string(),
            DatePrecision::Month => self.date.format("%Y-%m").to_string(),
            DatePrecision::Year => self.date.year().to_string(),
        }
    }

    /// `November 22, 1963`, `November 1963` or `1963`.
    pub fn display(&self) -> String {
        let month = MONTH_NAMES[self.date.month0() as usize];
        match self.precision {
            DatePrecision::Day => format!("{} {}, {}", month, self.date.day(), self.date.year()),
            DatePrecision::Month => format!("{} {}", month, self.date.year()),
            DatePrecision::Year => self.date.year().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// 1963-11-22, 1963/11/22, 1963.11.22
    Ymd,
    /// 19631122
    YmdCompact,
    /// 11/22/1963, 11-22-1963 (day/month swapped when the month is impossible)
    Mdy,
    /// 11/22/63
    MdyShort,
    /// 22 November 1963, 22nd Nov. 63
    DayMonthYear,
    /// November 22, 1963, Nov. 22 1963
    MonthDayYear,
    /// November 1963, Nov. 1963
    MonthYear,
    /// 1963-11
    YearMonth,
    /// 1963
    Year,
}

const MONTH_PATTERN: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static DATE_PATTERNS: LazyLock<Vec<(Regex, Layout)>> = LazyLock::new(|| {
    let month = MONTH_PATTERN;
    let build = |pattern: String| Regex::new(&pattern).expect("date pattern must compile");
    vec![
        (
            build(r"(?:^|\D)(\d{4})[-/._](\d{1,2})[-/._](\d{1,2})(?:\D|$)".to_string()),
            Layout::Ymd,
        ),
        (build(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)".to_string()), Layout::YmdCompact),
        (
            build(r"(?:^|\D)(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})(?:\D|$)".to_string()),
            Layout::Mdy,
        ),
        (
            build(r"(?:^|\D)(\d{1,2})/(\d{1,2})/(\d{2})(?:\D|$)".to_string()),
            Layout::MdyShort,
        ),
        (
            build(format!(
                r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({month})\b\.?,?\s+(\d{{4}}|\d{{2}})\b"
            )),
            Layout::DayMonthYear,
        ),
        (
            build(format!(
                r"(?i)\b({month})\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
            )),
            Layout::MonthDayYear,
        ),
        (
            build(format!(r"(?i)\b({month})\b\.?,?\s+(\d{{4}})\b")),
            Layout::MonthYear,
        ),
        (build(r"(?:^|\D)(\d{4})[-/](\d{1,2})(?:\D|$)".to_string()), Layout::YearMonth),
        (build(r"(?:^|\D)(1[89]\d{2}|20\d{2})(?:\D|$)".to_string()), Layout::Year),
    ]
});

/// Normalize a free-form date string.
///
/// Returns `None` when nothing in the input looks like a plausible date.
pub fn normalize_date(raw: &str) -> Option<NormalizedDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for (regex, layout) in DATE_PATTERNS.iter() {
        let Some(caps) = regex.captures(raw) else {
            continue;
        };
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

        let fields = match layout {
            Layout::Ymd | Layout::YmdCompact => {
                Some(Fields::Day(num(group(1)), num(group(2)), num(group(3))))
            }
            Layout::Mdy => {
                let (first, second) = (num(group(1)), num(group(2)));
                // 22.11.1963 style input: the first field can only be a day
                let (month, day) = if first > 12 && second <= 12 {
                    (second, first)
                } else {
                    (first, second)
                };
                Some(Fields::Day(num(group(3)), month, day))
            }
            Layout::MdyShort => Some(Fields::Day(
                expand_year(group(3)),
                num(group(1)),
                num(group(2)),
            )),
            Layout::DayMonthYear => {
                let year = if group(3).len() == 2 {
                    expand_year(group(3))
                } else {
                    num(group(3))
                };
                month_number(group(2)).map(|m| Fields::Day(year, m, num(group(1))))
            }
            Layout::MonthDayYear => {
                month_number(group(1)).map(|m| Fields::Day(num(group(3)), m, num(group(2))))
            }
            Layout::MonthYear => month_number(group(1)).map(|m| Fields::Month(num(group(2)), m)),
            Layout::YearMonth => Some(Fields::Month(num(group(1)), num(group(2)))),
            Layout::Year => Some(Fields::Year(num(group(1)))),
        };

        match fields {
            // A well-formed day that the calendar does not have (1963-02-30)
            Some(Fields::Day(year, month, day)) if impossible_day(year, month, day) => {
                return None;
            }
            Some(fields) => {
                if let Some(parsed) = fields.resolve() {
                    return Some(parsed);
                }
            }
            None => {}
        }
    }

    None
}

/// Date fields pulled out of one pattern match.
enum Fields {
    Day(i32, i32, i32),
    Month(i32, i32),
    Year(i32),
}

impl Fields {
    fn resolve(self) -> Option<NormalizedDate> {
        match self {
            Self::Day(year, month, day) => day_date(year, month, day),
            Self::Month(year, month) => month_date(year, month),
            Self::Year(year) => year_date(year),
        }
    }
}

fn impossible_day(year: i32, month: i32, day: i32) -> bool {
    plausible_year(year)
        && (1..=12).contains(&month)
        && (1..=31).contains(&day)
        && NaiveDate::from_ymd_opt(year, month as u32, day as u32).is_none()
}

fn num(s: &str) -> i32 {
    s.parse().unwrap_or(0)
}

/// Two-digit years in these collections are always 19xx.
fn expand_year(s: &str) -> i32 {
    1900 + num(s)
}

fn month_number(name: &str) -> Option<i32> {
    let prefix: String = name.chars().take(3).collect();
    MONTH_NAMES
        .iter()
        .position(|m| m[..3].eq_ignore_ascii_case(&prefix))
        .map(|i| i as i32 + 1)
}

fn plausible_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

fn day_date(year: i32, month: i32, day: i32) -> Option<NormalizedDate> {
    if !plausible_year(year) || month < 1 || day < 1 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).map(|date| NormalizedDate {
        date,
        precision: DatePrecision::Day,
    })
}

fn month_date(year: i32, month: i32) -> Option<NormalizedDate> {
    if !plausible_year(year) || month < 1 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month as u32, 1).map(|date| NormalizedDate {
        date,
        precision: DatePrecision::Month,
    })
}

fn year_date(year: i32) -> Option<NormalizedDate> {
    if !plausible_year(year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1, 1).map(|date| NormalizedDate {
        date,
        precision: DatePrecision::Year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(raw: &str) -> Option<String> {
        normalize_date(raw).map(|d| d.iso())
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(iso("1963-11-22"), Some("1963-11-22".to_string()));
        assert_eq!(iso("1963/11/22"), Some("1963-11-22".to_string()));
        assert_eq!(iso("1963.11.22"), Some("1963-11-22".to_string()));
        assert_eq!(iso("19631122"), Some("1963-11-22".to_string()));
        assert_eq!(iso("104-10004-10143_1963-11-22.pdf"), Some("1963-11-22".to_string()));
    }

    #[test]
    fn test_us_formats() {
        assert_eq!(iso("11/22/1963"), Some("1963-11-22".to_string()));
        assert_eq!(iso("11-22-1963"), Some("1963-11-22".to_string()));
        assert_eq!(iso("11/22/63"), Some("1963-11-22".to_string()));
        // Day-first input is recognized when the month would be impossible
        assert_eq!(iso("22.11.1963"), Some("1963-11-22".to_string()));
    }

    #[test]
    fn test_written_month_formats() {
        assert_eq!(iso("22 November 1963"), Some("1963-11-22".to_string()));
        assert_eq!(iso("22nd Nov. 63"), Some("1963-11-22".to_string()));
        assert_eq!(iso("November 22, 1963"), Some("1963-11-22".to_string()));
        assert_eq!(iso("nov 22 1963"), Some("1963-11-22".to_string()));
        assert_eq!(iso("Sept. 5, 1968"), Some("1968-09-05".to_string()));
        assert_eq!(iso("MEMO DATED 6 JUNE 1968"), Some("1968-06-06".to_string()));
    }

    #[test]
    fn test_partial_dates() {
        let d = normalize_date("November 1963").unwrap();
        assert_eq!(d.precision, DatePrecision::Month);
        assert_eq!(d.iso(), "1963-11");

        assert_eq!(iso("1963-11"), Some("1963-11".to_string()));

        let d = normalize_date("circa 1962").unwrap();
        assert_eq!(d.precision, DatePrecision::Year);
        assert_eq!(d.iso(), "1962");
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(normalize_date("").is_none());
        assert!(normalize_date("   ").is_none());
        assert!(normalize_date("no date here").is_none());
        assert!(normalize_date("Mayor of Dallas").is_none());
        // Impossible calendar dates are rejected, not downgraded
        assert!(normalize_date("1963-02-30").is_none());
        assert!(normalize_date("02/30/1963").is_none());
        assert!(normalize_date("31 April 1963").is_none());
        assert!(normalize_date("0042-01-01").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            normalize_date("1963-11-22").unwrap().display(),
            "November 22, 1963"
        );
        assert_eq!(normalize_date("Nov 1963").unwrap().display(), "November 1963");
        assert_eq!(normalize_date("1963").unwrap().display(), "1963");
    }

    #[test]
    fn test_ordering() {
        let month = normalize_date("November 1963").unwrap();
        let day = normalize_date("1963-11-22").unwrap();
        let year = normalize_date("1964").unwrap();
        assert!(month < day);
        assert!(day < year);
    }
}
