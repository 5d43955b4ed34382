//! Saving balances for recurring payments

pub mod cache;
pub mod calculator;

pub use cache::*;
pub use calculator::*;
