//! Low / high / weighted-average statistic and its merge algebra

use crate::error::{StatsError, StatsResult};
use serde::{Deserialize, Serialize};

/// Low, high and weighted average over a set of `(value, weight)` pairs
///
/// The average is kept as an exact numerator/denominator pair and only
/// divided on read, so merging partial stats is associative up to IEEE
/// addition order. Floating-point addition is not associative itself; merged
/// results may differ in the last few ulps depending on grouping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeStat {
    /// Minimum observed value
    pub low: f64,
    /// Maximum observed value
    pub high: f64,
    /// Accumulated `weight * value`
    #[serde(rename = "avgN")]
    pub avg_n: f64,
    /// Accumulated weight
    #[serde(rename = "avgD")]
    pub avg_d: f64,
}

impl Default for RangeStat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RangeStat {
    /// The empty stat, neutral under [`RangeStat::merge`]
    ///
    /// Emptiness is the inverted range (`low > high`), not `avg_d == 0`: a
    /// zero-weight observation fixes low/high without contributing weight.
    pub const IDENTITY: Self = Self {
        low: f64::INFINITY,
        high: f64::NEG_INFINITY,
        avg_n: 0.0,
        avg_d: 0.0,
    };

    /// Stat of a single observation
    ///
    /// `field` names the statistic in validation errors. A weight whose
    /// product with `value` is not finite is rejected as `InvalidWeight`.
    pub fn singleton(field: &str, value: f64, weight: f64) -> StatsResult<Self> {
        if !value.is_finite() {
            return Err(StatsError::InvalidValue {
                field: field.to_string(),
                value,
            });
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(StatsError::InvalidWeight {
                field: field.to_string(),
                weight,
            });
        }

        let avg_n = value * weight;
        if !avg_n.is_finite() {
            return Err(StatsError::InvalidWeight {
                field: field.to_string(),
                weight,
            });
        }

        Ok(Self {
            low: value,
            high: value,
            avg_n,
            avg_d: weight,
        })
    }

    /// Combine two stats covering disjoint sets of observations
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            low: self.low.min(other.low),
            high: self.high.max(other.high),
            avg_n: self.avg_n + other.avg_n,
            avg_d: self.avg_d + other.avg_d,
        }
    }

    /// [`RangeStat::merge`] that fails with `Overflow` instead of producing
    /// a non-finite sum
    pub fn try_merge(&self, other: &Self, field: &str) -> StatsResult<Self> {
        let merged = self.merge(other);
        for (name, value) in [("avgN", merged.avg_n), ("avgD", merged.avg_d)] {
            if !value.is_finite() {
                return Err(StatsError::Overflow {
                    field: format!("{field} {name}"),
                    value,
                });
            }
        }
        Ok(merged)
    }

    /// Check whether no observation has contributed
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.low > self.high
    }

    /// Weighted average, materialized on read
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        (self.avg_d > 0.0).then(|| self.avg_n / self.avg_d)
    }

    /// Width of the observed range
    #[must_use]
    pub fn range(&self) -> Option<f64> {
        (!self.is_identity()).then(|| self.high - self.low)
    }
}

/// Fold any number of stats
///
/// `None` for no input rather than the identity, whose infinite bounds do
/// not survive JSON.
pub fn merge_all<'a>(stats: impl IntoIterator<Item = &'a RangeStat>) -> Option<RangeStat> {
    stats.into_iter().copied().reduce(|acc, stat| acc.merge(&stat))
}
