//! Market data access port trait.

use crate::domain::error::FolioError;
use crate::domain::price_bar::PriceSeries;
use chrono::NaiveDate;

/// Source of daily price history.
///
/// Implementations fail with `SymbolNotFound` for a symbol they do not know
/// and `DataUnavailable` when the source itself cannot be read. The returned
/// series is already normalized (see [`PriceSeries::new`]).
pub trait DataPort {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, FolioError>;

    fn list_symbols(&self) -> Result<Vec<String>, FolioError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FolioError> {
        Ok(self.fetch_series(symbol)?.data_range())
    }
}
