//! Common market data types shared by the stock statistics crates

pub mod types;

pub use types::*;
