//! In-memory price cache in front of another data port.

use crate::domain::error::FolioError;
use crate::domain::price_bar::PriceSeries;
use crate::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;

/// Remembers every successfully fetched series for the life of the adapter.
/// Failures pass through uncached.
pub struct CachedDataPort<P> {
    inner: P,
    cache: RefCell<HashMap<String, PriceSeries>>,
}

impl<P: DataPort> CachedDataPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_symbols(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataPort> DataPort for CachedDataPort<P> {
    fn fetch_series(&self, symbol: &str) -> Result<PriceSeries, FolioError> {
        let key = symbol.to_uppercase();
        if let Some(series) = self.cache.borrow().get(&key) {
            return Ok(series.clone());
        }
        let series = self.inner.fetch_series(&key)?;
        self.cache.borrow_mut().insert(key, series.clone());
        Ok(series)
    }

    fn list_symbols(&self) -> Result<Vec<String>, FolioError> {
        self.inner.list_symbols()
    }
}
