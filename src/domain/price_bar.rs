//! Daily price bars and normalized per-symbol series.
//!
//! A [`PriceSeries`] is always ascending by date with no duplicate dates.
//! Adapters build series through [`PriceSeries::new`], so the rest of the
//! domain never has to care which order a data source returned.

use chrono::NaiveDate;

use crate::domain::error::FolioError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts `bars` ascending and drops repeated dates (first occurrence wins).
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        let symbol = symbol.into();
        // stable sort keeps the first occurrence of a date ahead of later ones
        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        bars.dedup_by_key(|b| b.date);
        if bars.len() != before {
            tracing::warn!(
                symbol = %symbol,
                dropped = before - bars.len(),
                "dropped duplicate price bars"
            );
        }
        Self { symbol, bars }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.index_of(date).map(|i| &self.bars[i])
    }

    /// Close on exactly `date`; no trading-day adjustment.
    pub fn close_on(&self, date: NaiveDate) -> Result<f64, FolioError> {
        self.get_bar(date)
            .map(|b| b.close)
            .ok_or_else(|| FolioError::DateNotFound {
                symbol: self.symbol.clone(),
                date,
            })
    }

    /// (first date, last date, bar count), or `None` for an empty series.
    pub fn data_range(&self) -> Option<(NaiveDate, NaiveDate, usize)> {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => Some((first, last, self.bars.len())),
            _ => None,
        }
    }
}
