//! Row models for each table, with conversions into domain types.

pub mod case;
pub mod coin;
pub mod progress;
