//! Trading rules enforced before a lot reaches the ledger.
//!
//! The ledger and valuation engine accept any lot. These checks are what the
//! front end runs so a user cannot oversell, record sales out of order, or
//! rebalance with weights that do not describe the held positions.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::FolioError;
use crate::domain::portfolio::Portfolio;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub fn check_purchase(shares: f64) -> Result<(), FolioError> {
    if !shares.is_finite() || shares <= 0.0 {
        return Err(FolioError::InvalidArgument {
            reason: format!("purchase shares must be positive, got {shares}"),
        });
    }
    if shares.fract() != 0.0 {
        return Err(FolioError::InvalidArgument {
            reason: format!("purchase shares must be a whole number, got {shares}"),
        });
    }
    Ok(())
}

pub fn check_sale(
    portfolio: &Portfolio,
    symbol: &str,
    shares: f64,
    date: NaiveDate,
) -> Result<(), FolioError> {
    if !shares.is_finite() || shares <= 0.0 {
        return Err(FolioError::InvalidArgument {
            reason: format!("sale shares must be positive, got {shares}"),
        });
    }
    if let Some(latest) = portfolio.latest_sale_date(symbol) {
        if date < latest {
            return Err(FolioError::SaleOutOfOrder {
                symbol: symbol.to_string(),
                date,
                latest,
            });
        }
    }
    let available = portfolio.net_shares(symbol, date);
    if shares > available {
        return Err(FolioError::Oversell {
            symbol: symbol.to_string(),
            requested: shares,
            available,
            date,
        });
    }
    Ok(())
}

pub fn check_weights(
    portfolio: &Portfolio,
    weights: &BTreeMap<String, f64>,
    date: NaiveDate,
) -> Result<(), FolioError> {
    if weights.is_empty() {
        return Err(FolioError::InvalidWeights {
            reason: "no weights given".into(),
        });
    }
    let held = portfolio.held_symbols(date);
    for (symbol, &weight) in weights {
        if !held.contains(symbol) {
            return Err(FolioError::InvalidWeights {
                reason: format!("{symbol} is not held on {date}"),
            });
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(FolioError::InvalidWeights {
                reason: format!("weight for {symbol} must be between 0 and 1, got {weight}"),
            });
        }
    }
    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(FolioError::InvalidWeights {
            reason: format!("weights must sum to 1, got {sum}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lot::Lot;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn jake() -> Portfolio {
        let mut p = Portfolio::new("Jake");
        p.record_purchase("L", Lot::new(70.0, d(2016, 8, 3)));
        p
    }

    #[test]
    fn purchase_must_be_positive_whole() {
        assert!(check_purchase(10.0).is_ok());
        assert!(check_purchase(0.0).is_err());
        assert!(check_purchase(-1.0).is_err());
        assert!(check_purchase(1.5).is_err());
        assert!(check_purchase(f64::NAN).is_err());
    }

    #[test]
    fn oversell_rejected() {
        let err = check_sale(&jake(), "L", 80.0, d(2024, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            FolioError::Oversell { requested, available, .. } if requested == 80.0 && available == 70.0
        ));
    }

    #[test]
    fn fractional_sale_within_position_allowed() {
        assert!(check_sale(&jake(), "L", 69.5, d(2024, 1, 1)).is_ok());
        assert!(check_sale(&jake(), "L", 70.0, d(2024, 1, 1)).is_ok());
    }

    #[test]
    fn sale_before_purchase_is_oversell() {
        let err = check_sale(&jake(), "L", 1.0, d(2016, 8, 2)).unwrap_err();
        assert!(matches!(err, FolioError::Oversell { .. }));
    }

    #[test]
    fn sale_earlier_than_latest_sale_rejected() {
        let mut p = jake();
        p.record_sale("L", Lot::new(10.0, d(2020, 1, 2)));
        let err = check_sale(&p, "L", 1.0, d(2019, 1, 2)).unwrap_err();
        assert!(matches!(err, FolioError::SaleOutOfOrder { latest, .. } if latest == d(2020, 1, 2)));
        assert!(check_sale(&p, "L", 1.0, d(2020, 1, 2)).is_ok());
    }

    #[test]
    fn weights_must_cover_held_symbols_and_sum_to_one() {
        let mut p = jake();
        p.record_purchase("AAPL", Lot::new(5.0, d(2020, 1, 2)));

        let ok: BTreeMap<String, f64> = [("L".into(), 0.4), ("AAPL".into(), 0.6)].into();
        assert!(check_weights(&p, &ok, d(2021, 1, 1)).is_ok());

        let short: BTreeMap<String, f64> = [("L".into(), 0.4), ("AAPL".into(), 0.5)].into();
        assert!(matches!(
            check_weights(&p, &short, d(2021, 1, 1)),
            Err(FolioError::InvalidWeights { .. })
        ));

        let not_held: BTreeMap<String, f64> = [("L".into(), 0.5), ("MSFT".into(), 0.5)].into();
        assert!(check_weights(&p, &not_held, d(2021, 1, 1)).is_err());

        // AAPL not yet bought in 2019
        assert!(check_weights(&p, &ok, d(2019, 1, 1)).is_err());

        let negative: BTreeMap<String, f64> = [("L".into(), 1.5), ("AAPL".into(), -0.5)].into();
        assert!(check_weights(&p, &negative, d(2021, 1, 1)).is_err());

        assert!(check_weights(&p, &BTreeMap::new(), d(2021, 1, 1)).is_err());
    }
}
