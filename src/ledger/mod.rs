//! Ledger module coordinating definitions, occurrences and saving balances

pub mod core;
pub mod definition;
pub mod occurrence;

pub use core::*;
pub use definition::*;
pub use occurrence::*;
