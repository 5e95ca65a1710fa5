//! Type definitions for brokerstat

mod aggregates;
mod error;
mod records;

pub use aggregates::*;
pub use error::*;
pub use records::*;
