//! Stock Statistics Service
//!
//! Folds level-one market ticks into per-security, per-window statistics:
//! - low / high / weighted average of traded price, bid, ask, and spread
//! - total traded volume
//! - first and last trade of the window
//!
//! Every statistic merges associatively, so partial records computed over
//! disjoint slices of the tick stream combine into the record of their union.

pub mod aggregators;
pub mod config;
pub mod error;
pub mod resolver;

use common::Tick;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use aggregators::{
    DailyStats, RangeStat, SnapshotOrder, StatAggregator, StatField, TradeSnapshot, Weighting,
    WeightingPolicy, ZeroWeightPolicy,
};
pub use config::StatsConfig;
pub use error::{StatsError, StatsResult};
pub use resolver::{GroupKey, KeyAndWindowResolver, KeyField, Timeframe, WindowId, WindowKey};

/// The per-tick transform: key resolution followed by record aggregation
///
/// Pure and free of shared state. Calls for different window keys may run
/// concurrently; calls for the same key must be serialized by the caller.
#[derive(Debug, Clone, Default)]
pub struct DailyStatsTransform {
    resolver: KeyAndWindowResolver,
    aggregator: StatAggregator,
}

impl DailyStatsTransform {
    /// Create a transform from configuration
    #[must_use]
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            resolver: KeyAndWindowResolver::from_config(config),
            aggregator: StatAggregator::from_config(config),
        }
    }

    /// Key resolver in use
    #[must_use]
    pub const fn resolver(&self) -> &KeyAndWindowResolver {
        &self.resolver
    }

    /// Aggregator in use
    #[must_use]
    pub const fn aggregator(&self) -> &StatAggregator {
        &self.aggregator
    }

    /// Resolve the window key of a tick
    pub fn resolve(&self, tick: &Tick) -> StatsResult<WindowKey> {
        self.resolver.resolve(tick)
    }

    /// Fold a tick into the previous record of its window, if any
    pub fn build_record(
        &self,
        tick: &Tick,
        previous: Option<&DailyStats>,
    ) -> StatsResult<DailyStats> {
        let key = self.resolver.resolve(tick)?;
        debug!("Aggregating tick for {} at {}", key, tick.time);
        self.aggregator.build_record(key, tick, previous)
    }

    /// Combine two partial records of the same window key
    pub fn combine(&self, a: &DailyStats, b: &DailyStats) -> StatsResult<DailyStats> {
        self.aggregator.combine(a, b)
    }
}

/// Counters reported by [`StatsService::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    /// Ticks folded into a record
    pub processed: u64,
    /// Ticks that failed validation
    pub rejected: u64,
    /// Distinct window keys held
    pub windows: usize,
}

type Shard = RwLock<FxHashMap<WindowKey, DailyStats>>;

/// In-memory driver holding the latest record of every window
///
/// State is split into shards by window key. Updates to one key go through
/// its shard's write lock, so they are serialized; different shards proceed
/// independently.
pub struct StatsService {
    transform: DailyStatsTransform,
    shards: Vec<Shard>,
    processed: AtomicU64,
    rejected: AtomicU64,
}

impl std::fmt::Debug for StatsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsService")
            .field("shards", &self.shards.len())
            .field("processed", &self.processed.load(Ordering::Relaxed))
            .field("rejected", &self.rejected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl StatsService {
    /// Create a service from validated configuration
    pub fn new(config: &StatsConfig) -> StatsResult<Self> {
        config.validate()?;
        let shards = (0..config.shards)
            .map(|_| RwLock::new(FxHashMap::default()))
            .collect();

        info!(
            "Stock stats service initialized with {} shards, {} windows",
            config.shards, config.timeframe
        );
        Ok(Self {
            transform: DailyStatsTransform::new(config),
            shards,
            processed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Transform in use
    #[must_use]
    pub const fn transform(&self) -> &DailyStatsTransform {
        &self.transform
    }

    #[allow(clippy::cast_possible_truncation)]
    fn shard_index(&self, key: &WindowKey) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn reject(&self, tick: &Tick, err: &StatsError) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Rejected tick {}/{} at {:?}: {}",
            tick.exchange, tick.security, tick.time, err
        );
    }

    /// Fold one tick into the stored record of its window
    ///
    /// Returns the new record. A rejected tick leaves stored state untouched.
    pub async fn process_tick(&self, tick: &Tick) -> StatsResult<DailyStats> {
        let key = match self.transform.resolve(tick) {
            Ok(key) => key,
            Err(e) => {
                self.reject(tick, &e);
                return Err(e);
            }
        };

        let mut shard = self.shards[self.shard_index(&key)].write().await;
        let result = self
            .transform
            .aggregator()
            .build_record(key.clone(), tick, shard.get(&key));

        match result {
            Ok(record) => {
                shard.insert(key, record.clone());
                self.processed.fetch_add(1, Ordering::Relaxed);
                Ok(record)
            }
            Err(e) => {
                self.reject(tick, &e);
                Err(e)
            }
        }
    }

    /// Fold an externally computed partial record into stored state
    pub async fn merge_partial(&self, partial: DailyStats) -> StatsResult<DailyStats> {
        let key = partial.key().clone();
        let mut shard = self.shards[self.shard_index(&key)].write().await;

        let merged = match shard.get(&key) {
            Some(existing) => self.transform.combine(existing, &partial)?,
            None => partial,
        };
        shard.insert(key, merged.clone());
        Ok(merged)
    }

    /// Process a batch of ticks, one task per shard
    ///
    /// Ticks keep their relative order within a shard, so arrival order per
    /// window key is preserved. Returns the number of ticks folded in.
    pub async fn ingest(self: Arc<Self>, ticks: Vec<Tick>) -> u64 {
        let mut partitions: Vec<Vec<Tick>> = vec![Vec::new(); self.shards.len()];
        for tick in ticks {
            match self.transform.resolve(&tick) {
                Ok(key) => partitions[self.shard_index(&key)].push(tick),
                Err(e) => self.reject(&tick, &e),
            }
        }

        let mut tasks = JoinSet::new();
        for partition in partitions.into_iter().filter(|p| !p.is_empty()) {
            let service = Arc::clone(&self);
            tasks.spawn(async move {
                let mut folded = 0u64;
                for tick in &partition {
                    if service.process_tick(tick).await.is_ok() {
                        folded += 1;
                    }
                }
                folded
            });
        }

        let mut total = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(folded) => total += folded,
                Err(e) => error!("Shard task failed: {}", e),
            }
        }

        debug!("Ingested batch, {} ticks folded", total);
        total
    }

    /// Current record of a window
    pub async fn get(&self, key: &WindowKey) -> Option<DailyStats> {
        self.shards[self.shard_index(key)]
            .read()
            .await
            .get(key)
            .cloned()
    }

    /// All records, ordered by window key
    pub async fn snapshot(&self) -> Vec<DailyStats> {
        let mut records = Vec::new();
        for shard in &self.shards {
            records.extend(shard.read().await.values().cloned());
        }
        records.sort_by(|a, b| a.key().cmp(b.key()));
        records
    }

    /// Processing counters
    pub async fn stats(&self) -> ServiceStats {
        let mut windows = 0;
        for shard in &self.shards {
            windows += shard.read().await.len();
        }
        ServiceStats {
            processed: self.processed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            windows,
        }
    }
}
