//! Date-range bucketing for portfolio value charts.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;

use crate::domain::error::FolioError;
use crate::domain::portfolio::Portfolio;
use crate::domain::valuation::ValuationEngine;

pub const LABEL_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Years,
    Months,
    TwoMonths,
    Days,
    Weeks,
    None,
}

impl Granularity {
    /// Next bucket start, or `None` past the end of the calendar.
    pub fn advance(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Years => date.checked_add_months(Months::new(12)),
            Granularity::Months => date.checked_add_months(Months::new(1)),
            Granularity::TwoMonths => date.checked_add_months(Months::new(2)),
            Granularity::Weeks => date.checked_add_days(Days::new(7)),
            Granularity::Days => date.checked_add_days(Days::new(1)),
            Granularity::None => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Years => write!(f, "yearly"),
            Granularity::Months => write!(f, "monthly"),
            Granularity::TwoMonths => write!(f, "every two months"),
            Granularity::Days => write!(f, "daily"),
            Granularity::Weeks => write!(f, "weekly"),
            Granularity::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Whole years elapsed, counted by anniversaries of `start`.
fn whole_years(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut years = end.year() - start.year();
    if (end.month(), end.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    years
}

/// Calendar months the range touches, counting both end months.
///
/// This makes 2024-01-09..2024-05-09 five months, but it is not monotonic in
/// elapsed days: 2024-01-31..2024-05-01 (91 days) touches five months while
/// 2024-01-01..2024-04-30 (120 days) touches four.
fn months_spanned(start: NaiveDate, end: NaiveDate) -> i32 {
    let from = start.year() * 12 + start.month0() as i32;
    let to = end.year() * 12 + end.month0() as i32;
    to - from + 1
}

pub fn choose_granularity(start: NaiveDate, end: NaiveDate) -> Granularity {
    if end < start {
        return Granularity::None;
    }
    if whole_years(start, end) >= 5 {
        return Granularity::Years;
    }
    let months = months_spanned(start, end);
    if months >= 5 {
        return if months <= 29 {
            Granularity::Months
        } else {
            Granularity::TwoMonths
        };
    }
    let days = (end - start).num_days();
    if days >= 1 {
        return if days <= 29 {
            Granularity::Days
        } else {
            Granularity::Weeks
        };
    }
    Granularity::None
}

/// Bucket start dates from `start` (inclusive) stepping by `granularity` while
/// strictly before `end`, followed by `end` itself.
pub fn bucket_dates(
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Result<Vec<NaiveDate>, FolioError> {
    if granularity == Granularity::None || end < start {
        return Err(FolioError::InvalidArgument {
            reason: format!("no chart buckets for range {start} to {end}"),
        });
    }
    let mut dates = Vec::new();
    let mut current = start;
    while current < end {
        dates.push(current);
        current = match granularity.advance(current) {
            Some(next) => next,
            None => break,
        };
    }
    dates.push(end);
    Ok(dates)
}

/// Labeled total value at each bucket date.
pub fn value_series(
    engine: &ValuationEngine<'_>,
    portfolio: &Portfolio,
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Result<Vec<ChartPoint>, FolioError> {
    bucket_dates(start, end, granularity)?
        .into_iter()
        .map(|date| {
            let value = engine.total_value(portfolio, engine.resolve(date))?;
            Ok(ChartPoint {
                label: date.format(LABEL_FORMAT).to_string(),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_count_depends_on_calendar_months_touched() {
        assert_eq!(choose_granularity(d(2024, 1, 31), d(2024, 5, 1)), Granularity::Months);
        assert_eq!(choose_granularity(d(2024, 1, 1), d(2024, 4, 30)), Granularity::Weeks);
    }

    #[test]
    fn granularity_years() {
        assert_eq!(choose_granularity(d(2015, 1, 1), d(2024, 5, 9)), Granularity::Years);
        assert_eq!(choose_granularity(d(2019, 5, 9), d(2024, 5, 9)), Granularity::Years);
    }

    #[test]
    fn granularity_months() {
        assert_eq!(choose_granularity(d(2024, 1, 9), d(2024, 5, 9)), Granularity::Months);
        assert_eq!(choose_granularity(d(2022, 1, 1), d(2024, 5, 1)), Granularity::Months);
    }

    #[test]
    fn granularity_two_months() {
        assert_eq!(choose_granularity(d(2022, 1, 1), d(2024, 6, 1)), Granularity::TwoMonths);
        // 4 years 364 days is still under five whole years
        assert_eq!(choose_granularity(d(2019, 5, 10), d(2024, 5, 9)), Granularity::TwoMonths);
    }

    #[test]
    fn granularity_days_and_weeks() {
        assert_eq!(choose_granularity(d(2024, 5, 1), d(2024, 5, 2)), Granularity::Days);
        assert_eq!(choose_granularity(d(2024, 5, 1), d(2024, 5, 30)), Granularity::Days);
        assert_eq!(choose_granularity(d(2024, 5, 1), d(2024, 5, 31)), Granularity::Weeks);
        assert_eq!(choose_granularity(d(2024, 1, 15), d(2024, 4, 20)), Granularity::Weeks);
    }

    #[test]
    fn granularity_none_for_empty_or_reversed() {
        assert_eq!(choose_granularity(d(2024, 5, 1), d(2024, 5, 1)), Granularity::None);
        assert_eq!(choose_granularity(d(2024, 5, 2), d(2024, 5, 1)), Granularity::None);
    }

    #[test]
    fn bucket_dates_daily_includes_end_once() {
        let dates = bucket_dates(d(2024, 5, 1), d(2024, 5, 4), Granularity::Days).unwrap();
        assert_eq!(dates, vec![d(2024, 5, 1), d(2024, 5, 2), d(2024, 5, 3), d(2024, 5, 4)]);
    }

    #[test]
    fn bucket_dates_weekly_appends_end() {
        let dates = bucket_dates(d(2024, 5, 1), d(2024, 5, 20), Granularity::Weeks).unwrap();
        assert_eq!(dates, vec![d(2024, 5, 1), d(2024, 5, 8), d(2024, 5, 15), d(2024, 5, 20)]);
    }

    #[test]
    fn bucket_dates_monthly_clamps_month_end() {
        let dates = bucket_dates(d(2024, 1, 31), d(2024, 4, 15), Granularity::Months).unwrap();
        assert_eq!(
            dates,
            vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 29), d(2024, 4, 15)]
        );
    }

    #[test]
    fn bucket_dates_yearly() {
        let dates = bucket_dates(d(2015, 1, 1), d(2018, 6, 1), Granularity::Years).unwrap();
        assert_eq!(
            dates,
            vec![d(2015, 1, 1), d(2016, 1, 1), d(2017, 1, 1), d(2018, 1, 1), d(2018, 6, 1)]
        );
    }

    #[test]
    fn bucket_dates_none_rejected() {
        assert!(bucket_dates(d(2024, 1, 1), d(2024, 2, 1), Granularity::None).is_err());
    }

    #[test]
    fn advance_two_months() {
        assert_eq!(Granularity::TwoMonths.advance(d(2024, 12, 15)), Some(d(2025, 2, 15)));
        assert_eq!(Granularity::None.advance(d(2024, 12, 15)), None);
    }
}
