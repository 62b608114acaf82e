//! Error types for the stock statistics core

use thiserror::Error;

/// Validation failures raised while resolving or aggregating a tick
///
/// Every variant is a local, synchronous failure. Operations are pure, so a
/// retry with the same input fails the same way; callers decide whether to
/// drop, quarantine, or abort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// Weight is non-finite, negative, or zero where zero is disallowed
    #[error("Invalid weight {weight} for {field}")]
    InvalidWeight {
        /// Statistic the weight was derived for
        field: String,
        /// The offending weight
        weight: f64,
    },

    /// Observed value is NaN or infinite
    #[error("Invalid value {value} for {field}")]
    InvalidValue {
        /// Statistic the value was derived for
        field: String,
        /// The offending value
        value: f64,
    },

    /// An accumulated sum left the finite range
    #[error("Accumulated {field} overflowed to {value}")]
    Overflow {
        /// Statistic whose sum overflowed
        field: String,
        /// The non-finite sum
        value: f64,
    },

    /// Timestamp could not be normalized to UTC
    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// Timestamp as received
        value: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Two aggregates of different window keys were combined
    #[error("Cannot merge aggregate for {left} with aggregate for {right}")]
    IncompatibleMerge {
        /// Key of the receiving aggregate
        left: String,
        /// Key of the incoming aggregate
        right: String,
    },

    /// A grouping key component was empty
    #[error("Empty grouping key component: {field}")]
    EmptyKey {
        /// Key field that projected to an empty string
        field: String,
    },

    /// Configuration is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },
}

/// Type alias for stock statistics results
pub type StatsResult<T> = Result<T, StatsError>;
