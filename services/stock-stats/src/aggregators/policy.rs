//! Per-statistic weighting policy
//!
//! Which quantity weights each statistic's average is a fixed, explicit table
//! rather than logic spread through the aggregator. The default table weights
//! traded price by shares and counts every bid, ask and spread quote equally.

use common::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range statistic carried by a daily record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatField {
    /// Traded price of `last`
    Price,
    /// Quoted bid price
    Bid,
    /// Quoted ask price
    Ask,
    /// `ask.price - bid.price`
    Spread,
}

impl StatField {
    /// All statistics in record order
    pub const ALL: [Self; 4] = [Self::Price, Self::Bid, Self::Ask, Self::Spread];
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Price => "price",
            Self::Bid => "bid",
            Self::Ask => "ask",
            Self::Spread => "spread",
        };
        f.write_str(name)
    }
}

/// How one observation weights an average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Weighting {
    /// Weight is the share size attached to the value
    BySize,
    /// Every observation weighs 1
    Uniform,
}

/// Treatment of observations carrying zero weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZeroWeightPolicy {
    /// Zero weight updates low/high but not the average
    #[default]
    Accept,
    /// Zero weight fails with `InvalidWeight`
    Reject,
}

/// Weighting rule for every statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightingPolicy {
    /// Rule for traded price
    pub price: Weighting,
    /// Rule for bid quotes
    pub bid: Weighting,
    /// Rule for ask quotes
    pub ask: Weighting,
    /// Rule for the bid/ask spread
    pub spread: Weighting,
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self {
            price: Weighting::BySize,
            bid: Weighting::Uniform,
            ask: Weighting::Uniform,
            spread: Weighting::Uniform,
        }
    }
}

impl WeightingPolicy {
    /// Rule configured for `field`
    #[must_use]
    pub const fn weighting(&self, field: StatField) -> Weighting {
        match field {
            StatField::Price => self.price,
            StatField::Bid => self.bid,
            StatField::Ask => self.ask,
            StatField::Spread => self.spread,
        }
    }

    /// The full table, in record order
    #[must_use]
    pub fn table(&self) -> [(StatField, Weighting); 4] {
        StatField::ALL.map(|field| (field, self.weighting(field)))
    }

    /// Value and weight `tick` contributes to `field`, if it supplies one
    ///
    /// The size behind `BySize` is `last.size` for price, the quote size for
    /// bid and ask, and the smaller of the two quote sizes for spread.
    #[must_use]
    pub fn contribution(&self, field: StatField, tick: &Tick) -> Option<(f64, f64)> {
        let (value, size) = match field {
            StatField::Price => tick.last.map(|last| (last.price, last.size))?,
            StatField::Bid => tick.bid.map(|bid| (bid.price, bid.size))?,
            StatField::Ask => tick.ask.map(|ask| (ask.price, ask.size))?,
            StatField::Spread => {
                let (bid, ask) = tick.bid.zip(tick.ask)?;
                (ask.price - bid.price, executable_size(bid.size, ask.size))
            }
        };

        let weight = match self.weighting(field) {
            Weighting::BySize => size,
            Weighting::Uniform => 1.0,
        };
        Some((value, weight))
    }
}

// NaN must survive so validation rejects it; `f64::min` would drop it.
fn executable_size(bid: f64, ask: f64) -> f64 {
    if bid.is_nan() || ask.is_nan() {
        f64::NAN
    } else {
        bid.min(ask)
    }
}
