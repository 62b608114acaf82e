//! End-to-end scenarios over mixed trade and quote streams

use crate::support::{assert_maps_close, fold};
use anyhow::Result;
use common::{Exchange, Security, Tick};
use pretty_assertions::assert_eq;
use rstest::*;
use std::collections::BTreeMap;
use stock_stats::{DailyStats, DailyStatsTransform, StatsConfig, StatsService, Timeframe};
use test_utils::{TickFactory, assert_approx_eq, two_day_mixed};

fn by_name(records: impl IntoIterator<Item = DailyStats>) -> BTreeMap<String, DailyStats> {
    records
        .into_iter()
        .map(|r| (r.key().to_string(), r))
        .collect()
}

#[rstest]
#[tokio::test]
async fn test_two_day_stream_splits_windows(two_day_mixed: Vec<Tick>) -> Result<()> {
    let service = StatsService::new(&StatsConfig::default())?;
    for tick in &two_day_mixed {
        service.process_tick(tick).await?;
    }

    let records = by_name(service.snapshot().await);
    assert_eq!(
        records.keys().cloned().collect::<Vec<_>>(),
        vec![
            "XNAS/AAPL@2024-01-01",
            "XNAS/AAPL@2024-01-02",
            "XNYS/IBM@2024-01-01",
            "XNYS/IBM@2024-01-02",
        ]
    );

    let day_one = &records["XNAS/AAPL@2024-01-01"];
    assert_eq!(day_one.date, "2024-01-01");
    assert_eq!(day_one.volume, Some(10.0));
    let bid = day_one.bid.unwrap();
    assert_approx_eq(bid.low, 99.95, 1e-9);
    assert_eq!((bid.high, bid.avg_d), (100.2, 2.0));
    let ask = day_one.ask.unwrap();
    assert_approx_eq(ask.low, 100.05, 1e-9);
    assert_eq!(ask.high, 100.4);

    let day_two = &records["XNAS/AAPL@2024-01-02"];
    let price = day_two.price.unwrap();
    assert_eq!((price.low, price.high, price.avg_d), (99.5, 101.0, 42.0));
    assert_approx_eq(price.average().unwrap(), (101.0 * 30.0 + 99.5 * 12.0) / 42.0, 1e-9);
    assert_eq!(day_two.first.unwrap().price, 101.0);
    assert_eq!(day_two.last.unwrap().price, 99.5);

    let ibm = &records["XNYS/IBM@2024-01-01"];
    assert_eq!(ibm.price.unwrap().high, 180.0);
    assert!(ibm.bid.is_none());
    assert!(ibm.spread.is_none());

    let stats = service.stats().await;
    assert_eq!(stats.processed, 6);
    assert_eq!(stats.rejected, 0);
    assert_eq!(stats.windows, 4);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_partials_merge_to_sequential_result(two_day_mixed: Vec<Tick>) -> Result<()> {
    let transform = DailyStatsTransform::default();
    let sequential = fold(&transform, &two_day_mixed);

    let (left, right) = two_day_mixed.split_at(3);
    let service = StatsService::new(&StatsConfig::default())?;
    for partial in fold(&transform, right).into_values() {
        service.merge_partial(partial).await?;
    }
    for partial in fold(&transform, left).into_values() {
        service.merge_partial(partial).await?;
    }

    let merged = service
        .snapshot()
        .await
        .into_iter()
        .map(|r| (r.key().clone(), r))
        .collect();
    assert_maps_close(&sequential, &merged);
    Ok(())
}

#[rstest]
fn test_offset_timestamps_land_in_utc_day() {
    let transform = DailyStatsTransform::default();
    let tick = Tick::new(
        Exchange::new("XNAS"),
        Security::new("AAPL"),
        "2024-01-01T20:00:00-05:00",
    )
    .with_last(100.0, 1.0);

    let record = transform.build_record(&tick, None).unwrap();
    assert_eq!(record.date, "2024-01-02");
}

#[rstest]
fn test_record_json_shape(two_day_mixed: Vec<Tick>) {
    let transform = DailyStatsTransform::default();
    let records = fold(&transform, &two_day_mixed);
    let ibm = records
        .values()
        .find(|r| r.security.as_str() == "IBM" && r.date == "2024-01-01")
        .unwrap();

    let json = serde_json::to_value(ibm).unwrap();
    assert_eq!(json["exchange"], "XNYS");
    assert_eq!(json["security"], "IBM");
    assert_eq!(json["date"], "2024-01-01");
    assert_eq!(json["price"]["low"], 180.0);
    assert_eq!(json["price"]["avgN"], 3600.0);
    assert_eq!(json["price"]["avgD"], 20.0);
    assert_eq!(json["volume"], 20.0);
    assert!(json.get("bid").is_none());

    let back: DailyStats = serde_json::from_value(json).unwrap();
    assert_eq!(&back, ibm);
}

#[rstest]
#[tokio::test]
async fn test_hourly_windows(aapl_hourly: Vec<Tick>) -> Result<()> {
    let config = StatsConfig {
        timeframe: Timeframe::H1,
        ..StatsConfig::default()
    };
    let service = StatsService::new(&config)?;
    for tick in &aapl_hourly {
        service.process_tick(tick).await?;
    }

    let records = by_name(service.snapshot().await);
    assert_eq!(
        records.keys().cloned().collect::<Vec<_>>(),
        vec!["XNAS/AAPL@2024-01-01T09:00Z", "XNAS/AAPL@2024-01-01T10:00Z"]
    );
    let nine = &records["XNAS/AAPL@2024-01-01T09:00Z"];
    assert_eq!(nine.volume, Some(15.0));
    assert_eq!(nine.date, "2024-01-01T09:00Z");
    Ok(())
}

#[fixture]
fn aapl_hourly() -> Vec<Tick> {
    let aapl = TickFactory::new("XNAS", "AAPL");
    vec![
        aapl.trade(34_200, 100.0, 10.0),
        aapl.trade(35_999, 100.5, 5.0),
        aapl.trade(36_000, 101.0, 7.0),
    ]
}
