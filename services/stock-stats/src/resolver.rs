//! Grouping key and time window resolution for ticks

use crate::config::StatsConfig;
use crate::error::{StatsError, StatsResult};
use chrono::{DateTime, Duration, Utc};
use common::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window granularity for aggregation
///
/// Windows are aligned to the Unix epoch in UTC, so `D1` windows are UTC
/// calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 minute windows
    #[serde(rename = "1m")]
    M1,
    /// 5 minute windows
    #[serde(rename = "5m")]
    M5,
    /// 15 minute windows
    #[serde(rename = "15m")]
    M15,
    /// 30 minute windows
    #[serde(rename = "30m")]
    M30,
    /// 1 hour windows
    #[serde(rename = "1h")]
    H1,
    /// 4 hour windows
    #[serde(rename = "4h")]
    H4,
    /// Daily windows
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Get duration in seconds
    #[must_use]
    pub const fn duration_seconds(&self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H4 => 14400,
            Self::D1 => 86400,
        }
    }

    /// Get chrono duration
    #[must_use]
    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds())
    }

    /// Start of the window containing `ts`
    pub fn truncate(&self, ts: DateTime<Utc>) -> StatsResult<DateTime<Utc>> {
        let step = self.duration_seconds();
        let start = ts.timestamp().div_euclid(step) * step;
        DateTime::from_timestamp(start, 0).ok_or_else(|| StatsError::InvalidTimestamp {
            value: ts.to_rfc3339(),
            reason: format!("window start {start}s is out of range"),
        })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        };
        f.write_str(label)
    }
}

/// Tick field contributing a component of the grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    /// Market identifier code
    Exchange,
    /// Security ticker
    Security,
}

impl KeyField {
    fn project<'a>(&self, tick: &'a Tick) -> &'a str {
        match self {
            Self::Exchange => tick.exchange.as_str(),
            Self::Security => tick.security.as_str(),
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange => f.write_str("exchange"),
            Self::Security => f.write_str("security"),
        }
    }
}

/// Ordered composite grouping key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub Vec<String>);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Identifier of one aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId {
    /// Inclusive window start (UTC)
    pub start: DateTime<Utc>,
    /// Granularity the window was truncated to
    pub timeframe: Timeframe,
}

impl WindowId {
    /// Exclusive window end
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.timeframe.to_duration()
    }

    /// Check whether `ts` falls inside this window
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timeframe {
            Timeframe::D1 => write!(f, "{}", self.start.format("%Y-%m-%d")),
            _ => write!(f, "{}", self.start.format("%Y-%m-%dT%H:%MZ")),
        }
    }
}

/// Scope of one aggregate: grouping key plus time window
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    /// Composite grouping key
    pub group: GroupKey,
    /// Time window
    pub window: WindowId,
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.group, self.window)
    }
}

/// Parse an RFC 3339 timestamp with any offset and normalize it to UTC
pub fn normalize_time(value: &str) -> StatsResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StatsError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Derives the grouping key and window of a tick
#[derive(Debug, Clone)]
pub struct KeyAndWindowResolver {
    key_fields: Vec<KeyField>,
    timeframe: Timeframe,
}

impl Default for KeyAndWindowResolver {
    fn default() -> Self {
        Self::new(vec![KeyField::Exchange, KeyField::Security], Timeframe::D1)
    }
}

impl KeyAndWindowResolver {
    /// Create a resolver projecting `key_fields` in order
    #[must_use]
    pub fn new(key_fields: Vec<KeyField>, timeframe: Timeframe) -> Self {
        Self {
            key_fields,
            timeframe,
        }
    }

    /// Create a resolver from service configuration
    #[must_use]
    pub fn from_config(config: &StatsConfig) -> Self {
        Self::new(config.key_fields.clone(), config.timeframe)
    }

    /// Configured window granularity
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Project the grouping key of a tick
    pub fn group_key(&self, tick: &Tick) -> StatsResult<GroupKey> {
        self.key_fields
            .iter()
            .map(|field| {
                let component = field.project(tick);
                if component.is_empty() {
                    Err(StatsError::EmptyKey {
                        field: field.to_string(),
                    })
                } else {
                    Ok(component.to_string())
                }
            })
            .collect::<StatsResult<Vec<_>>>()
            .map(GroupKey)
    }

    /// Resolve the window a tick falls into
    pub fn window(&self, tick: &Tick) -> StatsResult<WindowId> {
        let ts = normalize_time(&tick.time)?;
        Ok(WindowId {
            start: self.timeframe.truncate(ts)?,
            timeframe: self.timeframe,
        })
    }

    /// Resolve the full window key of a tick
    pub fn resolve(&self, tick: &Tick) -> StatsResult<WindowKey> {
        Ok(WindowKey {
            group: self.group_key(tick)?,
            window: self.window(tick)?,
        })
    }
}
