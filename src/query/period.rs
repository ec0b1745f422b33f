//! Time period grammar for creation-time queries.
//!
//! All periods are in UTC and half-open, `[start, end)`:
//!
//! | token                        | period                                   |
//! |------------------------------|------------------------------------------|
//! | `today`, `yesterday`         | that calendar day                        |
//! | `this week`                  | Monday 00:00 of the current week onward  |
//! | `this month`, `this year`    | the current calendar month / year        |
//! | `YYYY`, `YYYY-MM`, `YYYY-MM-DD` | that year / month / day               |
//! | `YYYY-MM-DD..YYYY-MM-DD`     | both days inclusive                      |
//! | `last N hours/days/weeks/months` | the trailing window ending now (a month is 30 days) |

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    /// Open-ended when `None`; trailing windows end at "now" inclusive.
    pub end: Option<DateTime<Utc>>,
}

impl Period {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && self.end.is_none_or(|end| at < end)
    }

    fn days(first: NaiveDate, count: i64) -> Self {
        let start = midnight(first);
        Self {
            start,
            end: Some(start + Duration::days(count)),
        }
    }

    fn between(first: NaiveDate, after_last: NaiveDate) -> Self {
        Self {
            start: midnight(first),
            end: Some(midnight(after_last)),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn first_of_next_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        first_of_month(year + 1, 1)
    } else {
        first_of_month(year, month + 1)
    }
}

fn month_period(year: i32, month: u32) -> Option<Period> {
    Some(Period::between(
        first_of_month(year, month)?,
        first_of_next_month(year, month)?,
    ))
}

fn year_period(year: i32) -> Option<Period> {
    Some(Period::between(
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
    ))
}

fn parse_day(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn parse_absolute(token: &str) -> Option<Period> {
    if let Some((from, to)) = token.split_once("..") {
        let first = parse_day(from.trim())?;
        let last = parse_day(to.trim())?;
        if last < first {
            return None;
        }
        return Some(Period::between(first, last.succ_opt()?));
    }

    let parts: Vec<&str> = token.split('-').collect();
    if parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    match parts.as_slice() {
        [year] if year.len() == 4 => year_period(year.parse().ok()?),
        [year, month] if year.len() == 4 => month_period(year.parse().ok()?, month.parse().ok()?),
        [_, _, _] => Some(Period::days(parse_day(token)?, 1)),
        _ => None,
    }
}

fn parse_relative(words: &[&str], now: DateTime<Utc>) -> Option<Period> {
    let today = now.date_naive();

    match words {
        ["today"] => Some(Period::days(today, 1)),
        ["yesterday"] => Some(Period::days(today.pred_opt()?, 1)),
        ["this", "week"] => {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            Some(Period::days(monday, 7))
        }
        ["this", "month"] => month_period(today.year(), today.month()),
        ["this", "year"] => year_period(today.year()),
        ["last", count, unit] => {
            let count: i64 = count.parse().ok().filter(|n| *n > 0)?;
            let span = match unit.trim_end_matches('s') {
                "hour" => Duration::try_hours(count)?,
                "day" => Duration::try_days(count)?,
                "week" => Duration::try_weeks(count)?,
                "month" => Duration::try_days(count.checked_mul(30)?)?,
                _ => return None,
            };
            Some(Period {
                start: now.checked_sub_signed(span)?,
                end: None,
            })
        }
        _ => None,
    }
}

/// Parse a period token relative to `now`.
pub fn parse_period(token: &str, now: DateTime<Utc>) -> Result<Period, QueryError> {
    let normalized = token.trim().to_ascii_lowercase();
    let words: Vec<&str> = normalized.split_whitespace().collect();

    let period = match words.as_slice() {
        [single] if single.starts_with(|c: char| c.is_ascii_digit()) => parse_absolute(single),
        _ => parse_relative(&words, now),
    };

    period.ok_or_else(|| QueryError::InvalidPeriod(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        // a Wednesday
        at(2024, 5, 15, 10)
    }

    #[test]
    fn test_calendar_tokens() {
        let p = parse_period("2024", now()).unwrap();
        assert!(p.contains(at(2024, 12, 31, 23)));
        assert!(!p.contains(at(2025, 1, 1, 0)));

        let p = parse_period("2024-02", now()).unwrap();
        assert!(p.contains(at(2024, 2, 29, 12)));
        assert!(!p.contains(at(2024, 3, 1, 0)));

        let p = parse_period("2023-12", now()).unwrap();
        assert!(p.contains(at(2023, 12, 31, 23)));
        assert!(!p.contains(at(2024, 1, 1, 0)));

        let p = parse_period("2024-05-14", now()).unwrap();
        assert!(p.contains(at(2024, 5, 14, 0)));
        assert!(!p.contains(at(2024, 5, 15, 0)));
    }

    #[test]
    fn test_day_range_is_inclusive() {
        let p = parse_period("2024-05-01..2024-05-03", now()).unwrap();
        assert!(p.contains(at(2024, 5, 1, 0)));
        assert!(p.contains(at(2024, 5, 3, 23)));
        assert!(!p.contains(at(2024, 5, 4, 0)));
        assert!(parse_period("2024-05-03..2024-05-01", now()).is_err());
    }

    #[test]
    fn test_named_tokens() {
        assert!(parse_period("today", now()).unwrap().contains(at(2024, 5, 15, 1)));
        assert!(parse_period("Yesterday", now()).unwrap().contains(at(2024, 5, 14, 1)));

        let week = parse_period("this week", now()).unwrap();
        assert!(week.contains(at(2024, 5, 13, 0)));
        assert!(!week.contains(at(2024, 5, 12, 23)));

        assert!(parse_period("this month", now()).unwrap().contains(at(2024, 5, 1, 0)));
        assert!(parse_period("this year", now()).unwrap().contains(at(2024, 1, 1, 0)));
    }

    #[test]
    fn test_trailing_windows_include_now() {
        let p = parse_period("last 3 days", now()).unwrap();
        assert!(p.contains(now()));
        assert!(p.contains(at(2024, 5, 12, 10)));
        assert!(!p.contains(at(2024, 5, 12, 9)));

        assert!(parse_period("last 1 week", now()).is_ok());
        assert!(parse_period("last 2 months", now()).is_ok());
        assert!(parse_period("last 6 hours", now()).is_ok());
    }

    #[test]
    fn test_rejects_garbage() {
        for token in ["", "someday", "last days", "last 0 days", "last 3 fortnights", "2024-13", "24", "2024-1x", "last 99999999999999 weeks"] {
            assert!(parse_period(token, now()).is_err(), "{token} should be rejected");
        }
    }
}
