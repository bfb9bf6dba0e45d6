//! Single-symbol price analysis: moving average, crossovers, gain/loss.
//!
//! All lookups here are exact-match on the series. A date with no bar fails
//! with `DateNotFound`; callers that want weekend/holiday adjustment resolve
//! the date through a [`TradingCalendar`] first.
//!
//! The moving-average window is anchored at the given date and extends toward
//! later bars. When fewer than `window` bars remain, only the bars present are
//! averaged.
//!
//! [`TradingCalendar`]: crate::ports::calendar_port::TradingCalendar

use chrono::NaiveDate;

use crate::domain::error::FolioError;
use crate::domain::price_bar::PriceSeries;
use crate::domain::rounding::round2;

fn anchor_index(series: &PriceSeries, date: NaiveDate) -> Result<usize, FolioError> {
    series.index_of(date).ok_or_else(|| FolioError::DateNotFound {
        symbol: series.symbol().to_string(),
        date,
    })
}

pub fn closing_price(series: &PriceSeries, date: NaiveDate) -> Result<f64, FolioError> {
    series.close_on(date)
}

/// `close(end) - close(start)`, rounded to cents.
pub fn gain_loss(series: &PriceSeries, start: NaiveDate, end: NaiveDate) -> Result<f64, FolioError> {
    let opening = series.close_on(start)?;
    let closing = series.close_on(end)?;
    Ok(round2(closing - opening))
}

pub fn moving_average(
    series: &PriceSeries,
    anchor: NaiveDate,
    window: usize,
) -> Result<f64, FolioError> {
    if window == 0 {
        return Err(FolioError::InvalidArgument {
            reason: "moving average window must be at least 1 day".into(),
        });
    }
    let start = anchor_index(series, anchor)?;
    let end = start.saturating_add(window).min(series.len());
    let used = &series.bars()[start..end];
    let sum: f64 = used.iter().map(|b| b.close).sum();
    Ok(round2(sum / used.len() as f64))
}

/// True iff the close on `date` is strictly above its moving average.
pub fn is_crossover(series: &PriceSeries, date: NaiveDate, window: usize) -> Result<bool, FolioError> {
    let close = series.close_on(date)?;
    Ok(close > moving_average(series, date, window)?)
}

/// Every crossover date in `[start, end]`, ascending.
pub fn crossovers(
    series: &PriceSeries,
    start: NaiveDate,
    end: NaiveDate,
    window: usize,
) -> Result<Vec<NaiveDate>, FolioError> {
    let mut dates = Vec::new();
    for bar in series
        .bars()
        .iter()
        .filter(|b| b.date >= start && b.date <= end)
    {
        if is_crossover(series, bar.date, window)? {
            dates.push(bar.date);
        }
    }
    Ok(dates)
}
