//! Dated purchase and sale lots.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LotKind {
    Purchase,
    Sale,
}

impl fmt::Display for LotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotKind::Purchase => write!(f, "purchase"),
            LotKind::Sale => write!(f, "sale"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lot {
    pub shares: f64,
    pub date: NaiveDate,
}

impl Lot {
    pub fn new(shares: f64, date: NaiveDate) -> Self {
        Self { shares, date }
    }

    pub fn is_on_or_before(&self, as_of: NaiveDate) -> bool {
        self.date <= as_of
    }
}

/// A lot synthesized by rebalancing, tagged with where it was appended.
#[derive(Debug, Clone, PartialEq)]
pub struct LotAdjustment {
    pub symbol: String,
    pub kind: LotKind,
    pub lot: Lot,
}
