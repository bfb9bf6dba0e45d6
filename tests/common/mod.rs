#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use stockfolio::domain::error::FolioError;
pub use stockfolio::domain::price_bar::{PriceBar, PriceSeries};
use stockfolio::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, FolioError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FolioError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(PriceSeries::new(symbol, bars.clone())),
            None => Err(FolioError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, FolioError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

pub fn make_bars(rows: &[(&str, f64)]) -> Vec<PriceBar> {
    rows.iter().map(|(date, close)| make_bar(date, *close)).collect()
}

/// Monday-to-Friday bars from `start` through `end`, close from `close_at(index)`.
pub fn weekday_bars(
    start: NaiveDate,
    end: NaiveDate,
    close_at: impl Fn(usize) -> f64,
) -> Vec<PriceBar> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .enumerate()
        .map(|(i, date)| {
            let close = close_at(i);
            PriceBar {
                date,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
            }
        })
        .collect()
}

/// Writes `<SYMBOL>.csv` in the layout the CSV price cache reads.
pub fn write_price_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
