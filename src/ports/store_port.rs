//! Portfolio persistence port trait.

use crate::domain::error::FolioError;
use crate::domain::portfolio::Portfolio;

pub trait PortfolioStore {
    /// Every persisted portfolio, in document order. A missing store is empty.
    fn load(&self) -> Result<Vec<Portfolio>, FolioError>;

    /// Adds `portfolios` after whatever is already persisted.
    fn append(&self, portfolios: &[Portfolio]) -> Result<(), FolioError>;

    /// Persists exactly `portfolios`, discarding previous content.
    fn replace(&self, portfolios: &[Portfolio]) -> Result<(), FolioError>;
}
