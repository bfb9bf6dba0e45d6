//! Core domain types and logic.

pub mod price_bar;
pub mod lot;
pub mod portfolio;
pub mod registry;
pub mod calendar;
pub mod analysis;
pub mod valuation;
pub mod chart;
pub mod trade_rules;
pub mod config_validation;
pub mod rounding;
pub mod error;
