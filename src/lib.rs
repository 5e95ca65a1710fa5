//! Portfolio analytics for an insurance-brokerage back office

pub mod config;
pub mod services;
pub mod types;
