//! In-memory registry of named portfolios.
//!
//! The registry is the only owner of portfolio state. Reads hand out either
//! shared borrows or cloned snapshots; mutation goes through the methods here,
//! each of which fails with `PortfolioNotFound` for an unknown name.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::FolioError;
use crate::domain::lot::Lot;
use crate::domain::portfolio::Portfolio;

#[derive(Debug, Clone, Default)]
pub struct PortfolioRegistry {
    portfolios: BTreeMap<String, Portfolio>,
}

impl PortfolioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from restored portfolios, rejecting duplicate names.
    pub fn from_portfolios(portfolios: Vec<Portfolio>) -> Result<Self, FolioError> {
        let mut registry = Self::new();
        for portfolio in portfolios {
            registry.import(portfolio)?;
        }
        Ok(registry)
    }

    /// Creates a portfolio from its initial purchase lots.
    pub fn create(
        &mut self,
        name: &str,
        purchases: Vec<(String, Lot)>,
    ) -> Result<&Portfolio, FolioError> {
        let mut portfolio = Portfolio::new(name);
        for (symbol, lot) in purchases {
            portfolio.record_purchase(&symbol, lot);
        }
        self.import(portfolio)?;
        tracing::info!(portfolio = name, "created portfolio");
        self.get(name)
    }

    /// Adds a fully-formed portfolio. Duplicate names are rejected.
    pub fn import(&mut self, portfolio: Portfolio) -> Result<(), FolioError> {
        if portfolio.name.trim().is_empty() {
            return Err(FolioError::InvalidArgument {
                reason: "portfolio name must not be empty".into(),
            });
        }
        if self.portfolios.contains_key(&portfolio.name) {
            return Err(FolioError::DuplicatePortfolio {
                name: portfolio.name,
            });
        }
        if !portfolio.has_purchases() {
            return Err(FolioError::EmptyPortfolio {
                name: portfolio.name,
            });
        }
        self.portfolios.insert(portfolio.name.clone(), portfolio);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.portfolios.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.portfolios.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&Portfolio, FolioError> {
        self.portfolios
            .get(name)
            .ok_or_else(|| FolioError::PortfolioNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Portfolio, FolioError> {
        self.portfolios
            .get_mut(name)
            .ok_or_else(|| FolioError::PortfolioNotFound {
                name: name.to_string(),
            })
    }

    /// Detached copy of one portfolio; changes to it never reach the registry.
    pub fn snapshot(&self, name: &str) -> Result<Portfolio, FolioError> {
        self.get(name).cloned()
    }

    pub fn snapshots(&self) -> Vec<Portfolio> {
        self.portfolios.values().cloned().collect()
    }

    pub fn record_purchase(&mut self, name: &str, symbol: &str, lot: Lot) -> Result<(), FolioError> {
        self.get_mut(name)?.record_purchase(symbol, lot);
        tracing::info!(portfolio = name, symbol, shares = lot.shares, date = %lot.date, "recorded purchase");
        Ok(())
    }

    pub fn record_sale(&mut self, name: &str, symbol: &str, lot: Lot) -> Result<(), FolioError> {
        self.get_mut(name)?.record_sale(symbol, lot);
        tracing::info!(portfolio = name, symbol, shares = lot.shares, date = %lot.date, "recorded sale");
        Ok(())
    }

    pub fn remove_sales_after(
        &mut self,
        name: &str,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<usize, FolioError> {
        let removed = self.get_mut(name)?.remove_sales_after(symbol, date);
        if removed > 0 {
            tracing::info!(portfolio = name, symbol, removed, after = %date, "retracted sales");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn registry_with_jake() -> PortfolioRegistry {
        let mut registry = PortfolioRegistry::new();
        registry
            .create("Jake", vec![("L".into(), Lot::new(70.0, d(2016, 8, 3)))])
            .unwrap();
        registry
    }

    #[test]
    fn create_requires_a_purchase() {
        let mut registry = PortfolioRegistry::new();
        let err = registry.create("Empty", vec![]).unwrap_err();
        assert!(matches!(err, FolioError::EmptyPortfolio { name } if name == "Empty"));
        assert!(registry.is_empty());
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let mut registry = registry_with_jake();
        let err = registry
            .create("Jake", vec![("A".into(), Lot::new(1.0, d(2020, 1, 2)))])
            .unwrap_err();
        assert!(matches!(err, FolioError::DuplicatePortfolio { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn create_rejects_blank_name() {
        let mut registry = PortfolioRegistry::new();
        let err = registry
            .create("  ", vec![("A".into(), Lot::new(1.0, d(2020, 1, 2)))])
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument { .. }));
    }

    #[test]
    fn unknown_portfolio_fails_every_operation() {
        let mut registry = registry_with_jake();
        let lot = Lot::new(1.0, d(2020, 1, 2));

        assert!(matches!(registry.get("Nope"), Err(FolioError::PortfolioNotFound { .. })));
        assert!(matches!(
            registry.record_purchase("Nope", "L", lot),
            Err(FolioError::PortfolioNotFound { .. })
        ));
        assert!(matches!(
            registry.record_sale("Nope", "L", lot),
            Err(FolioError::PortfolioNotFound { .. })
        ));
        assert!(matches!(
            registry.remove_sales_after("Nope", "L", d(2020, 1, 1)),
            Err(FolioError::PortfolioNotFound { .. })
        ));
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = registry_with_jake();
        let mut snap = registry.snapshot("Jake").unwrap();
        snap.record_sale("L", Lot::new(70.0, d(2017, 1, 3)));

        let live = registry.get("Jake").unwrap();
        assert_eq!(live.net_shares("L", d(2024, 1, 1)), 70.0);
        assert!(live.sales.is_empty());
    }

    #[test]
    fn mutations_reach_registry() {
        let mut registry = registry_with_jake();
        registry
            .record_purchase("Jake", "AAPL", Lot::new(3.0, d(2020, 1, 2)))
            .unwrap();
        registry
            .record_sale("Jake", "L", Lot::new(10.0, d(2021, 1, 4)))
            .unwrap();
        registry
            .record_sale("Jake", "L", Lot::new(10.0, d(2022, 1, 4)))
            .unwrap();

        let removed = registry.remove_sales_after("Jake", "L", d(2021, 6, 1)).unwrap();
        assert_eq!(removed, 1);

        let p = registry.get("Jake").unwrap();
        assert_eq!(p.net_shares("L", d(2024, 1, 1)), 60.0);
        assert_eq!(p.net_shares("AAPL", d(2024, 1, 1)), 3.0);
    }

    #[test]
    fn from_portfolios_rejects_duplicates() {
        let mut a = Portfolio::new("Dup");
        a.record_purchase("A", Lot::new(1.0, d(2020, 1, 2)));
        let b = a.clone();
        let err = PortfolioRegistry::from_portfolios(vec![a, b]).unwrap_err();
        assert!(matches!(err, FolioError::DuplicatePortfolio { name } if name == "Dup"));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = registry_with_jake();
        registry
            .create("Alice", vec![("A".into(), Lot::new(1.0, d(2020, 1, 2)))])
            .unwrap();
        assert_eq!(registry.names(), vec!["Alice".to_string(), "Jake".to_string()]);
        assert_eq!(registry.snapshots().len(), 2);
    }
}
