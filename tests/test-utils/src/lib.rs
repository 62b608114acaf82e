//! Test utilities and fixtures for stock statistics testing
//!
//! This module provides:
//! - Tick factories
//! - rstest fixtures for canonical scenarios
//! - Float-tolerant assertions


pub use assertions::*;
pub use factories::*;
pub use fixtures::*;
