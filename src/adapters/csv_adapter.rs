//! CSV price cache adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with columns
//! `timestamp,open,high,low,close,volume`. Rows may be in either date order;
//! the series is normalized on the way out.

use crate::domain::error::FolioError;
use crate::domain::price_bar::{PriceBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<&'r str, FolioError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| FolioError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("missing {} column", name),
        })
}

fn price(record: &csv::StringRecord, index: usize, name: &str, symbol: &str) -> Result<f64, FolioError> {
    field(record, index, name, symbol)?
        .parse()
        .map_err(|e| FolioError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, FolioError> {
        let symbol = symbol.to_uppercase();
        let path = self.csv_path(&symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FolioError::SymbolNotFound {
                symbol: symbol.clone(),
            },
            _ => FolioError::DataUnavailable {
                symbol: symbol.clone(),
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FolioError::DataUnavailable {
                symbol: symbol.clone(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = field(&record, 0, "timestamp", &symbol)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                FolioError::DataUnavailable {
                    symbol: symbol.clone(),
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            let volume: i64 = field(&record, 5, "volume", &symbol)?
                .parse()
                .map_err(|e| FolioError::DataUnavailable {
                    symbol: symbol.clone(),
                    reason: format!("invalid volume value: {}", e),
                })?;

            bars.push(PriceBar {
                date,
                open: price(&record, 1, "open", &symbol)?,
                high: price(&record, 2, "high", &symbol)?,
                low: price(&record, 3, "low", &symbol)?,
                close: price(&record, 4, "close", &symbol)?,
                volume,
            });
        }

        tracing::debug!(symbol = %symbol, bars = bars.len(), path = %path.display(), "loaded price cache");
        Ok(PriceSeries::new(symbol, bars))
    }

    fn list_symbols(&self) -> Result<Vec<String>, FolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FolioError::DataUnavailable {
            symbol: "*".into(),
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_uppercase());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
