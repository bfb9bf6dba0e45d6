//! Trading calendar port trait.

use chrono::NaiveDate;

/// Answers which calendar dates are trading days.
///
/// `earliest` is the historical floor: resolution never goes below it.
pub trait TradingCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    fn earliest(&self) -> NaiveDate;

    /// Nearest trading day on or before `date`, clamped to [`earliest`].
    ///
    /// Steps back one calendar day at a time. Implementations with an ordered
    /// index should override this with a direct lookup.
    ///
    /// [`earliest`]: TradingCalendar::earliest
    fn resolve(&self, date: NaiveDate) -> NaiveDate {
        let floor = self.earliest();
        let mut current = date;
        loop {
            if current <= floor {
                return floor;
            }
            if self.is_trading_day(current) {
                return current;
            }
            current = match current.pred_opt() {
                Some(prev) => prev,
                None => return floor,
            };
        }
    }
}
