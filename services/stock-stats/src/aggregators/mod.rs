//! Statistic algebra and record aggregation

pub mod daily_stats;
pub mod policy;
pub mod range_stat;

pub use daily_stats::{DailyStats, SnapshotOrder, StatAggregator, TradeSnapshot};
pub use policy::{StatField, Weighting, WeightingPolicy, ZeroWeightPolicy};
pub use range_stat::{RangeStat, merge_all};
