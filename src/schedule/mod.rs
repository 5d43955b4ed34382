//! Recurring schedule generation

pub mod generator;

pub use generator::*;
