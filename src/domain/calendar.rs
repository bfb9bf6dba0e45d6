//! Trading calendar derived from one reference symbol's price history.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::domain::error::FolioError;
use crate::domain::price_bar::PriceSeries;
use crate::ports::calendar_port::TradingCalendar;
use crate::ports::data_port::DataPort;

/// Every date with a bar in the reference series is a trading day.
#[derive(Debug, Clone)]
pub struct ReferenceCalendar {
    symbol: String,
    days: BTreeSet<NaiveDate>,
    earliest: NaiveDate,
}

impl ReferenceCalendar {
    pub fn from_series(series: &PriceSeries) -> Result<Self, FolioError> {
        let earliest = series
            .first_date()
            .ok_or_else(|| FolioError::DataUnavailable {
                symbol: series.symbol().to_string(),
                reason: "reference series has no bars".into(),
            })?;
        Ok(Self {
            symbol: series.symbol().to_string(),
            days: series.bars().iter().map(|b| b.date).collect(),
            earliest,
        })
    }

    /// Loads the reference series. Any failure to get it is `DataUnavailable`,
    /// since no date-based valuation can proceed without a calendar.
    pub fn from_port(data_port: &dyn DataPort, symbol: &str) -> Result<Self, FolioError> {
        let series = data_port
            .fetch_series(symbol)
            .map_err(|e| match e {
                FolioError::DataUnavailable { .. } => e,
                other => FolioError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: other.to_string(),
                },
            })?;
        Self::from_series(&series)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn latest(&self) -> NaiveDate {
        self.days.last().copied().unwrap_or(self.earliest)
    }
}

impl TradingCalendar for ReferenceCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&date)
    }

    fn earliest(&self) -> NaiveDate {
        self.earliest
    }

    fn resolve(&self, date: NaiveDate) -> NaiveDate {
        self.days
            .range(..=date)
            .next_back()
            .copied()
            .unwrap_or(self.earliest)
    }
}
