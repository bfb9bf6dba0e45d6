//! Portfolio valuation and rebalancing.
//!
//! Every date-based query resolves its date through the trading calendar
//! first, then prices each symbol on the resolved day with an exact-match
//! lookup. A symbol whose net shares are zero on that day contributes zero
//! without a price lookup, so a symbol that has no bar on the resolved day
//! only fails valuation while it is actually held.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::FolioError;
use crate::domain::lot::{Lot, LotAdjustment, LotKind};
use crate::domain::portfolio::Portfolio;
use crate::domain::rounding::round2;
use crate::ports::calendar_port::TradingCalendar;
use crate::ports::data_port::DataPort;

pub struct ValuationEngine<'a> {
    data_port: &'a dyn DataPort,
    calendar: &'a dyn TradingCalendar,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(data_port: &'a dyn DataPort, calendar: &'a dyn TradingCalendar) -> Self {
        Self {
            data_port,
            calendar,
        }
    }

    pub fn resolve(&self, date: NaiveDate) -> NaiveDate {
        let resolved = self.calendar.resolve(date);
        if resolved != date {
            tracing::debug!(requested = %date, resolved = %resolved, "resolved trading day");
        }
        resolved
    }

    pub fn close_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, FolioError> {
        let series = self.data_port.fetch_series(symbol)?;
        series.close_on(date)
    }

    fn position_value(
        &self,
        portfolio: &Portfolio,
        symbol: &str,
        resolved: NaiveDate,
    ) -> Result<f64, FolioError> {
        let shares = portfolio.net_shares(symbol, resolved);
        if shares == 0.0 {
            return Ok(0.0);
        }
        Ok(shares * self.close_price(symbol, resolved)?)
    }

    /// Dollar value per purchased symbol on the resolved date. Values are
    /// unrounded so that they sum to [`total_value`](Self::total_value).
    pub fn distribution(
        &self,
        portfolio: &Portfolio,
        date: NaiveDate,
    ) -> Result<BTreeMap<String, f64>, FolioError> {
        let resolved = self.resolve(date);
        portfolio
            .purchased_symbols()
            .into_iter()
            .map(|symbol| {
                let value = self.position_value(portfolio, &symbol, resolved)?;
                Ok((symbol, value))
            })
            .collect()
    }

    pub fn total_value(&self, portfolio: &Portfolio, date: NaiveDate) -> Result<f64, FolioError> {
        let total: f64 = self.distribution(portfolio, date)?.values().sum();
        Ok(round2(total))
    }

    /// Net shares per purchased symbol on the resolved date.
    pub fn composition(&self, portfolio: &Portfolio, date: NaiveDate) -> BTreeMap<String, f64> {
        let resolved = self.resolve(date);
        portfolio
            .purchased_symbols()
            .into_iter()
            .map(|symbol| {
                let shares = portfolio.net_shares(&symbol, resolved);
                (symbol, shares)
            })
            .collect()
    }

    /// Appends one purchase or sale lot per weighted symbol so that its value
    /// on the resolved date matches `weight * total`.
    ///
    /// The total is taken once before any lot is added. Weights are not
    /// validated here; see [`crate::domain::trade_rules::check_weights`].
    pub fn rebalance(
        &self,
        portfolio: &mut Portfolio,
        weights: &BTreeMap<String, f64>,
        date: NaiveDate,
    ) -> Result<Vec<LotAdjustment>, FolioError> {
        let resolved = self.resolve(date);
        let total = self.total_value(portfolio, resolved)?;

        // price everything before mutating so a failed lookup leaves no partial rebalance
        let mut plan = Vec::with_capacity(weights.len());
        for (symbol, &weight) in weights {
            let price = self.close_price(symbol, resolved)?;
            let current = portfolio.net_shares(symbol, resolved) * price;
            let goal = total * weight;
            let adjustment = if goal > current {
                Some((LotKind::Purchase, (goal - current) / price))
            } else if goal < current {
                Some((LotKind::Sale, (current - goal) / price))
            } else {
                None
            };
            if let Some((kind, shares)) = adjustment {
                plan.push(LotAdjustment {
                    symbol: symbol.clone(),
                    kind,
                    lot: Lot::new(shares, resolved),
                });
            }
        }

        for adjustment in &plan {
            portfolio.record(adjustment.kind, &adjustment.symbol, adjustment.lot);
            tracing::info!(
                portfolio = %portfolio.name,
                symbol = %adjustment.symbol,
                kind = %adjustment.kind,
                shares = adjustment.lot.shares,
                date = %resolved,
                "rebalance lot"
            );
        }
        Ok(plan)
    }
}
