//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stockfolio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("unknown symbol {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("price data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("no price bar for {symbol} on {date}")]
    DateNotFound { symbol: String, date: NaiveDate },

    #[error("portfolio not found: {name}")]
    PortfolioNotFound { name: String },

    #[error("portfolio already exists: {name}")]
    DuplicatePortfolio { name: String },

    #[error("portfolio {name} has no purchase lots")]
    EmptyPortfolio { name: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("cannot sell {requested} shares of {symbol}: only {available} held on {date}")]
    Oversell {
        symbol: String,
        requested: f64,
        available: f64,
        date: NaiveDate,
    },

    #[error("sale of {symbol} on {date} precedes latest recorded sale on {latest}")]
    SaleOutOfOrder {
        symbol: String,
        date: NaiveDate,
        latest: NaiveDate,
    },

    #[error("invalid weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("portfolio store error: {reason}")]
    Store { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) | FolioError::Store { .. } => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::SymbolNotFound { .. }
            | FolioError::DataUnavailable { .. }
            | FolioError::DateNotFound { .. } => 3,
            FolioError::PortfolioNotFound { .. }
            | FolioError::DuplicatePortfolio { .. }
            | FolioError::EmptyPortfolio { .. } => 4,
            FolioError::InvalidArgument { .. }
            | FolioError::Oversell { .. }
            | FolioError::SaleOutOfOrder { .. }
            | FolioError::InvalidWeights { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
