//! Configuration validation.
//!
//! Validates all config fields before any command runs.

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_REFERENCE_SYMBOL: &str = "SPY";
pub const DEFAULT_MAX_BAR_WIDTH: i64 = 50;

pub fn validate_app_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_data_dir(config)?;
    validate_reference_symbol(config)?;
    validate_store_path(config)?;
    validate_max_bar_width(config)?;
    Ok(())
}

pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, FolioError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(FolioError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), FolioError> {
    require(config, "data", "dir").map(|_| ())
}

fn validate_reference_symbol(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(symbol) = config.get_string("data", "reference_symbol") else {
        return Ok(());
    };
    if !is_valid_symbol(symbol.trim()) {
        return Err(FolioError::ConfigInvalid {
            section: "data".to_string(),
            key: "reference_symbol".to_string(),
            reason: format!("'{}' is not a ticker symbol", symbol.trim()),
        });
    }
    Ok(())
}

fn validate_store_path(config: &dyn ConfigPort) -> Result<(), FolioError> {
    require(config, "store", "path").map(|_| ())
}

fn validate_max_bar_width(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let Some(raw) = config.get_string("chart", "max_bar_width") else {
        return Ok(());
    };
    let value: i64 = raw.trim().parse().map_err(|_| FolioError::ConfigInvalid {
        section: "chart".to_string(),
        key: "max_bar_width".to_string(),
        reason: format!("'{}' is not an integer", raw.trim()),
    })?;
    if value < 1 {
        return Err(FolioError::ConfigInvalid {
            section: "chart".to_string(),
            key: "max_bar_width".to_string(),
            reason: "max_bar_width must be at least 1".to_string(),
        });
    }
    Ok(())
}
