//! Portfolio lot history and the position ledger operations over it.
//!
//! Net shares are always derived from the lots; nothing is cached. The ledger
//! does not check for oversell: see [`crate::domain::trade_rules`].

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::lot::{Lot, LotKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub name: String,
    pub purchases: BTreeMap<String, Vec<Lot>>,
    pub sales: BTreeMap<String, Vec<Lot>>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        Portfolio {
            name: name.into(),
            purchases: BTreeMap::new(),
            sales: BTreeMap::new(),
        }
    }

    pub fn has_purchases(&self) -> bool {
        self.purchases.values().any(|lots| !lots.is_empty())
    }

    pub fn record_purchase(&mut self, symbol: &str, lot: Lot) {
        self.purchases.entry(symbol.to_string()).or_default().push(lot);
    }

    pub fn record_sale(&mut self, symbol: &str, lot: Lot) {
        self.sales.entry(symbol.to_string()).or_default().push(lot);
    }

    pub fn record(&mut self, kind: LotKind, symbol: &str, lot: Lot) {
        match kind {
            LotKind::Purchase => self.record_purchase(symbol, lot),
            LotKind::Sale => self.record_sale(symbol, lot),
        }
    }

    /// Purchased minus sold shares with lot date <= `as_of`. May be negative.
    pub fn net_shares(&self, symbol: &str, as_of: NaiveDate) -> f64 {
        sum_until(self.purchases.get(symbol), as_of) - sum_until(self.sales.get(symbol), as_of)
    }

    pub fn latest_sale_date(&self, symbol: &str) -> Option<NaiveDate> {
        self.sales
            .get(symbol)
            .and_then(|lots| lots.iter().map(|l| l.date).max())
    }

    /// Deletes every sale lot of `symbol` dated strictly after `date`.
    /// Returns how many lots were removed.
    pub fn remove_sales_after(&mut self, symbol: &str, date: NaiveDate) -> usize {
        let Some(lots) = self.sales.get_mut(symbol) else {
            return 0;
        };
        let before = lots.len();
        lots.retain(|l| l.date <= date);
        let removed = before - lots.len();
        if lots.is_empty() {
            self.sales.remove(symbol);
        }
        removed
    }

    /// Every symbol with at least one purchase lot, in sorted order.
    pub fn purchased_symbols(&self) -> Vec<String> {
        self.purchases
            .iter()
            .filter(|(_, lots)| !lots.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    pub fn held_symbols(&self, as_of: NaiveDate) -> BTreeSet<String> {
        self.purchased_symbols()
            .into_iter()
            .filter(|symbol| self.net_shares(symbol, as_of) > 0.0)
            .collect()
    }

    pub fn lot_count(&self) -> usize {
        self.purchases.values().map(Vec::len).sum::<usize>()
            + self.sales.values().map(Vec::len).sum::<usize>()
    }
}

fn sum_until(lots: Option<&Vec<Lot>>, as_of: NaiveDate) -> f64 {
    lots.map(|lots| {
        lots.iter()
            .filter(|l| l.is_on_or_before(as_of))
            .map(|l| l.shares)
            .sum()
    })
    .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn jake() -> Portfolio {
        let mut p = Portfolio::new("Jake");
        p.record_purchase("L", Lot::new(70.0, d(2016, 8, 3)));
        p
    }

    #[test]
    fn new_portfolio_is_empty() {
        let p = Portfolio::new("Empty");
        assert!(!p.has_purchases());
        assert_eq!(p.lot_count(), 0);
        assert!(p.purchased_symbols().is_empty());
    }

    #[test]
    fn net_shares_single_purchase() {
        let p = jake();
        assert_eq!(p.net_shares("L", d(2024, 1, 1)), 70.0);
        assert_eq!(p.net_shares("L", d(2016, 8, 3)), 70.0);
        assert_eq!(p.net_shares("L", d(2016, 8, 2)), 0.0);
        assert_eq!(p.net_shares("MSFT", d(2024, 1, 1)), 0.0);
    }

    #[test]
    fn net_shares_subtracts_sales_on_or_before() {
        let mut p = jake();
        p.record_sale("L", Lot::new(20.5, d(2018, 1, 2)));
        p.record_sale("L", Lot::new(9.5, d(2020, 1, 2)));
        assert_eq!(p.net_shares("L", d(2018, 1, 1)), 70.0);
        assert_eq!(p.net_shares("L", d(2018, 1, 2)), 49.5);
        assert_eq!(p.net_shares("L", d(2021, 1, 1)), 40.0);
    }

    #[test]
    fn net_shares_can_go_negative() {
        let mut p = jake();
        p.record_sale("L", Lot::new(100.0, d(2017, 1, 3)));
        assert_eq!(p.net_shares("L", d(2017, 1, 3)), -30.0);
    }

    #[test]
    fn latest_sale_date_none_without_sales() {
        let mut p = jake();
        assert_eq!(p.latest_sale_date("L"), None);
        p.record_sale("L", Lot::new(1.0, d(2019, 5, 1)));
        p.record_sale("L", Lot::new(1.0, d(2018, 5, 1)));
        assert_eq!(p.latest_sale_date("L"), Some(d(2019, 5, 1)));
    }

    #[test]
    fn remove_sales_after_is_strict() {
        let mut p = jake();
        p.record_sale("L", Lot::new(1.0, d(2018, 1, 2)));
        p.record_sale("L", Lot::new(2.0, d(2019, 1, 2)));
        p.record_sale("L", Lot::new(3.0, d(2020, 1, 2)));

        assert_eq!(p.remove_sales_after("L", d(2019, 1, 2)), 1);
        assert_eq!(p.latest_sale_date("L"), Some(d(2019, 1, 2)));
        assert_eq!(p.net_shares("L", d(2024, 1, 1)), 67.0);
    }

    #[test]
    fn remove_sales_after_all_clears_symbol() {
        let mut p = jake();
        p.record_sale("L", Lot::new(1.0, d(2018, 1, 2)));
        assert_eq!(p.remove_sales_after("L", d(2017, 1, 1)), 1);
        assert!(p.sales.is_empty());
        assert_eq!(p.remove_sales_after("NOPE", d(2017, 1, 1)), 0);
    }

    #[test]
    fn held_symbols_requires_positive_position() {
        let mut p = jake();
        p.record_purchase("AAPL", Lot::new(5.0, d(2020, 1, 2)));
        p.record_sale("AAPL", Lot::new(5.0, d(2021, 1, 4)));

        let held: Vec<_> = p.held_symbols(d(2020, 6, 1)).into_iter().collect();
        assert_eq!(held, vec!["AAPL".to_string(), "L".to_string()]);

        let held: Vec<_> = p.held_symbols(d(2022, 1, 1)).into_iter().collect();
        assert_eq!(held, vec!["L".to_string()]);

        assert!(p.held_symbols(d(2010, 1, 1)).is_empty());
    }

    #[test]
    fn record_dispatches_on_kind() {
        let mut p = Portfolio::new("P");
        p.record(LotKind::Purchase, "X", Lot::new(3.0, d(2020, 1, 1)));
        p.record(LotKind::Sale, "X", Lot::new(1.0, d(2020, 1, 2)));
        assert_eq!(p.lot_count(), 2);
        assert_eq!(p.net_shares("X", d(2020, 1, 2)), 2.0);
    }
}
