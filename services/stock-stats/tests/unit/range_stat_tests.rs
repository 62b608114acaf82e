//! Tests for the range statistic algebra

use rstest::*;
use stock_stats::aggregators::merge_all;
use stock_stats::{
    RangeStat, SnapshotOrder, StatAggregator, StatField, StatsError, WeightingPolicy,
    ZeroWeightPolicy,
};
use test_utils::assert_approx_eq;

#[fixture]
fn aggregator() -> StatAggregator {
    StatAggregator::default()
}

#[rstest]
#[case(100.0, 10.0)]
#[case(-3.25, 1.0)]
#[case(0.0, 0.0)]
#[case(1e12, 1e-6)]
fn test_singleton_merged_with_identity(
    aggregator: StatAggregator,
    #[case] value: f64,
    #[case] weight: f64,
) {
    let stat = aggregator.singleton(StatField::Price, value, weight).unwrap();
    assert_eq!(StatAggregator::merge(&stat, &RangeStat::IDENTITY), stat);
    assert_eq!(StatAggregator::merge(&RangeStat::IDENTITY, &stat), stat);
}

#[rstest]
fn test_weighted_average(aggregator: StatAggregator) {
    let observations = [(100.0, 10.0), (102.0, 5.0), (98.0, 15.0)];
    let stats: Vec<RangeStat> = observations
        .iter()
        .map(|&(v, w)| aggregator.singleton(StatField::Price, v, w).unwrap())
        .collect();

    let merged = merge_all(&stats).unwrap();
    let expected: f64 = observations.iter().map(|(v, w)| v * w).sum::<f64>()
        / observations.iter().map(|(_, w)| w).sum::<f64>();
    assert_approx_eq(merged.average().unwrap(), expected, 1e-12);
    assert_approx_eq(merged.average().unwrap(), 3280.0 / 30.0, 1e-12);
}

#[rstest]
fn test_weight_total_never_decreases(aggregator: StatAggregator) {
    let mut acc = RangeStat::IDENTITY;
    for (i, weight) in [3.0, 0.0, 7.5, 1.0].into_iter().enumerate() {
        let before = acc.avg_d;
        let stat = aggregator
            .singleton(StatField::Bid, i as f64, weight)
            .unwrap();
        acc = acc.merge(&stat);
        assert!(acc.avg_d >= before);
    }
    assert_eq!(acc.avg_d, 11.5);
}

#[rstest]
fn test_zero_weight_rejected_when_configured() {
    let aggregator = StatAggregator::new(
        WeightingPolicy::default(),
        SnapshotOrder::EventTime,
        ZeroWeightPolicy::Reject,
    );
    let err = aggregator.singleton(StatField::Ask, 10.0, 0.0).unwrap_err();
    assert_eq!(
        err,
        StatsError::InvalidWeight {
            field: "ask".to_string(),
            weight: 0.0
        }
    );
    assert!(aggregator.singleton(StatField::Ask, 10.0, 1.0).is_ok());
}

#[rstest]
#[case(f64::NAN, 1.0)]
#[case(f64::NEG_INFINITY, 1.0)]
#[case(1.0, -1.0)]
#[case(1.0, f64::INFINITY)]
fn test_malformed_numbers_fail_fast(
    aggregator: StatAggregator,
    #[case] value: f64,
    #[case] weight: f64,
) {
    let result = aggregator.singleton(StatField::Spread, value, weight);
    assert!(matches!(
        result,
        Err(StatsError::InvalidValue { .. } | StatsError::InvalidWeight { .. })
    ));
}
