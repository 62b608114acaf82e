//! Per-window statistics record and the aggregator that builds it

use super::policy::{StatField, WeightingPolicy, ZeroWeightPolicy};
use super::range_stat::RangeStat;
use crate::config::StatsConfig;
use crate::error::{StatsError, StatsResult};
use crate::resolver::{WindowKey, normalize_time};
use chrono::{DateTime, Utc};
use common::{Exchange, Security, Tick};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How `first` and `last` pick between two trade snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotOrder {
    /// Compare the trades' own timestamps; order-independent
    #[default]
    EventTime,
    /// First write wins, last write wins; only order-independent when
    /// arrival order matches event time
    Arrival,
}

/// A completed trade captured as the first or last of a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSnapshot {
    /// Dollar price
    pub price: f64,
    /// Number of shares
    pub size: f64,
    /// Event time of the tick carrying the trade
    pub time: DateTime<Utc>,
}

impl TradeSnapshot {
    // Total order: time, then price, then size. Keeps ties deterministic.
    fn event_cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.price.total_cmp(&other.price))
            .then_with(|| self.size.total_cmp(&other.size))
    }
}

/// Statistics of one security over one window
///
/// Absent fields are the identity of their combination rule: no observation
/// of that kind has arrived yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Venue of the first tick that created the record
    pub exchange: Exchange,
    /// Security of the first tick that created the record
    pub security: Security,
    /// Display of the window id: `YYYY-MM-DD` for daily windows,
    /// `YYYY-MM-DDTHH:MMZ` (window start) for intraday timeframes
    pub date: String,
    /// Key the record aggregates over
    pub key: WindowKey,
    /// Low, high, and average traded price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<RangeStat>,
    /// Low, high, and average bid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<RangeStat>,
    /// Low, high, and average ask
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<RangeStat>,
    /// Low, high, and average bid/ask spread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<RangeStat>,
    /// Total number of shares transacted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// First trade of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<TradeSnapshot>,
    /// Last trade of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<TradeSnapshot>,
}

impl DailyStats {
    /// Record with no observations
    #[must_use]
    pub fn empty(key: WindowKey, exchange: Exchange, security: Security) -> Self {
        Self {
            exchange,
            security,
            date: key.window.to_string(),
            key,
            price: None,
            bid: None,
            ask: None,
            spread: None,
            volume: None,
            first: None,
            last: None,
        }
    }

    /// Window key of this record
    #[must_use]
    pub const fn key(&self) -> &WindowKey {
        &self.key
    }

    /// Statistic stored for `field`
    #[must_use]
    pub const fn stat(&self, field: StatField) -> Option<&RangeStat> {
        match field {
            StatField::Price => self.price.as_ref(),
            StatField::Bid => self.bid.as_ref(),
            StatField::Ask => self.ask.as_ref(),
            StatField::Spread => self.spread.as_ref(),
        }
    }

    fn stat_mut(&mut self, field: StatField) -> &mut Option<RangeStat> {
        match field {
            StatField::Price => &mut self.price,
            StatField::Bid => &mut self.bid,
            StatField::Ask => &mut self.ask,
            StatField::Spread => &mut self.spread,
        }
    }

    /// Volume-weighted average traded price
    #[must_use]
    pub fn vwap(&self) -> Option<f64> {
        self.price.as_ref().and_then(RangeStat::average)
    }

    /// Check whether nothing has been aggregated
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.bid.is_none()
            && self.ask.is_none()
            && self.spread.is_none()
            && self.volume.is_none()
            && self.first.is_none()
            && self.last.is_none()
    }
}

/// Owns the statistic algebra: singleton construction and merging of
/// stats and whole records
#[derive(Debug, Clone, Default)]
pub struct StatAggregator {
    weighting: WeightingPolicy,
    snapshot_order: SnapshotOrder,
    zero_weight: ZeroWeightPolicy,
}

impl StatAggregator {
    /// Create an aggregator with explicit policies
    #[must_use]
    pub const fn new(
        weighting: WeightingPolicy,
        snapshot_order: SnapshotOrder,
        zero_weight: ZeroWeightPolicy,
    ) -> Self {
        Self {
            weighting,
            snapshot_order,
            zero_weight,
        }
    }

    /// Create an aggregator from service configuration
    #[must_use]
    pub const fn from_config(config: &StatsConfig) -> Self {
        Self::new(config.weighting, config.snapshot_order, config.zero_weight)
    }

    /// Weighting table in use
    #[must_use]
    pub const fn weighting(&self) -> &WeightingPolicy {
        &self.weighting
    }

    /// Stat of one observation of `field`, honoring the zero-weight policy
    pub fn singleton(&self, field: StatField, value: f64, weight: f64) -> StatsResult<RangeStat> {
        if weight == 0.0 && self.zero_weight == ZeroWeightPolicy::Reject {
            return Err(StatsError::InvalidWeight {
                field: field.to_string(),
                weight,
            });
        }
        RangeStat::singleton(&field.to_string(), value, weight)
    }

    /// Combine two stats of the same key and window
    #[must_use]
    pub fn merge(a: &RangeStat, b: &RangeStat) -> RangeStat {
        a.merge(b)
    }

    /// Record holding only the contribution of `tick`
    ///
    /// `key` must be the resolved key of `tick`.
    pub fn partial(&self, key: WindowKey, tick: &Tick) -> StatsResult<DailyStats> {
        let mut record = DailyStats::empty(key, tick.exchange.clone(), tick.security.clone());

        for field in StatField::ALL {
            *record.stat_mut(field) = match self.weighting.contribution(field, tick) {
                Some((value, weight)) => Some(self.singleton(field, value, weight)?),
                None => None,
            };
        }

        if let Some(last) = tick.last {
            if !last.size.is_finite() || last.size < 0.0 {
                return Err(StatsError::InvalidWeight {
                    field: "volume".to_string(),
                    weight: last.size,
                });
            }
            let snapshot = TradeSnapshot {
                price: last.price,
                size: last.size,
                time: normalize_time(&tick.time)?,
            };
            record.volume = Some(last.size);
            record.first = Some(snapshot);
            record.last = Some(snapshot);
        }

        Ok(record)
    }

    /// Field-wise combination of two partial records of the same key
    ///
    /// `previous` is treated as the earlier arrival when the snapshot order
    /// is [`SnapshotOrder::Arrival`]; otherwise the argument order does not
    /// matter. Fails with `Overflow` if any sum leaves the finite range.
    pub fn combine(&self, previous: &DailyStats, incoming: &DailyStats) -> StatsResult<DailyStats> {
        if previous.key != incoming.key {
            return Err(StatsError::IncompatibleMerge {
                left: previous.key.to_string(),
                right: incoming.key.to_string(),
            });
        }

        let mut merged = previous.clone();
        for field in StatField::ALL {
            let slot = merged.stat_mut(field);
            *slot = match (*slot, incoming.stat(field)) {
                (Some(a), Some(b)) => Some(a.try_merge(b, &field.to_string())?),
                (a, b) => a.or(b.copied()),
            };
        }
        merged.volume = match (previous.volume, incoming.volume) {
            (Some(a), Some(b)) => Some(finite_sum("volume", a, b)?),
            (a, b) => a.or(b),
        };
        merged.first = self.pick_first(previous.first, incoming.first);
        merged.last = self.pick_last(previous.last, incoming.last);

        Ok(merged)
    }

    /// Fold `tick` into the record for `key`
    ///
    /// With no `previous`, the result equals the tick's partial record. On
    /// error nothing is produced and `previous` is left as it was.
    pub fn build_record(
        &self,
        key: WindowKey,
        tick: &Tick,
        previous: Option<&DailyStats>,
    ) -> StatsResult<DailyStats> {
        if let Some(previous) = previous {
            if previous.key != key {
                return Err(StatsError::IncompatibleMerge {
                    left: previous.key.to_string(),
                    right: key.to_string(),
                });
            }
        }

        let partial = self.partial(key, tick)?;
        match previous {
            Some(previous) => self.combine(previous, &partial),
            None => Ok(partial),
        }
    }

    fn pick_first(
        &self,
        previous: Option<TradeSnapshot>,
        incoming: Option<TradeSnapshot>,
    ) -> Option<TradeSnapshot> {
        match (previous, incoming) {
            (Some(a), Some(b)) => match self.snapshot_order {
                SnapshotOrder::Arrival => Some(a),
                SnapshotOrder::EventTime if b.event_cmp(&a) == Ordering::Less => Some(b),
                SnapshotOrder::EventTime => Some(a),
            },
            (a, b) => a.or(b),
        }
    }

    fn pick_last(
        &self,
        previous: Option<TradeSnapshot>,
        incoming: Option<TradeSnapshot>,
    ) -> Option<TradeSnapshot> {
        match (previous, incoming) {
            (Some(a), Some(b)) => match self.snapshot_order {
                SnapshotOrder::Arrival => Some(b),
                SnapshotOrder::EventTime if b.event_cmp(&a) == Ordering::Greater => Some(b),
                SnapshotOrder::EventTime => Some(a),
            },
            (a, b) => a.or(b),
        }
    }
}

fn finite_sum(field: &str, a: f64, b: f64) -> StatsResult<f64> {
    let sum = a + b;
    if sum.is_finite() {
        Ok(sum)
    } else {
        Err(StatsError::Overflow {
            field: field.to_string(),
            value: sum,
        })
    }
}
