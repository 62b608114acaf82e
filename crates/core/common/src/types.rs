//! Core market types for level-one tick data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market identifier code of the venue a tick was observed on (e.g. `XNAS`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exchange(pub String);

impl Exchange {
    /// Create a new exchange code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the exchange code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ticker name of a market security (e.g. `AAPL`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Security(pub String);

impl Security {
    /// Create a new security ticker
    #[must_use]
    pub fn new(ticker: impl Into<String>) -> Self {
        Self(ticker.into())
    }

    /// Get the ticker as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dollar price together with a number of shares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAndSize {
    /// Dollar price
    pub price: f64,
    /// Number of shares
    pub size: f64,
}

impl PriceAndSize {
    /// Create a new price/size pair
    #[must_use]
    pub const fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

impl fmt::Display for PriceAndSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:.4}", self.size, self.price)
    }
}

/// Level-one market tick of a security
///
/// Every quote leg is optional: a tick may carry a completed trade, a quote
/// update, or both. `time` is kept as received (RFC 3339 with any offset);
/// normalization to UTC happens when the tick is assigned to a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Venue the tick was observed on
    pub exchange: Exchange,
    /// Security the tick describes
    pub security: Security,
    /// Full event timestamp
    pub time: String,
    /// Completed transaction which generated this tick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<PriceAndSize>,
    /// Highest current offer to buy the security
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<PriceAndSize>,
    /// Lowest current offer to sell the security
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<PriceAndSize>,
}

impl Tick {
    /// Create a tick with no quote legs
    #[must_use]
    pub fn new(exchange: Exchange, security: Security, time: impl Into<String>) -> Self {
        Self {
            exchange,
            security,
            time: time.into(),
            last: None,
            bid: None,
            ask: None,
        }
    }

    /// Set the completed trade
    #[must_use]
    pub const fn with_last(mut self, price: f64, size: f64) -> Self {
        self.last = Some(PriceAndSize::new(price, size));
        self
    }

    /// Set the bid and ask quotes
    #[must_use]
    pub const fn with_quote(mut self, bid: PriceAndSize, ask: PriceAndSize) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Current bid/ask spread, if both sides are quoted
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}
