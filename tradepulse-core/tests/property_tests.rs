//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. ATR warm-up: NaN before the window fills, finite and non-negative after
//! 2. Crossover exclusivity: no cross is reported across undefined averages
//! 3. Stop ordering: long stop < close < short stop once ATR is positive
//! 4. Sizer monotonicity: more equity never sizes smaller, wider stops never size larger
//! 5. Sizer bounds: result never exceeds either cap
//! 6. Aggregator completeness: closed bars are ordered, well-formed, one per bucket

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tradepulse_core::aggregator::{CandleAggregator, Granularity};
use tradepulse_core::domain::Bar;
use tradepulse_core::indicators::atr;
use tradepulse_core::risk::{position_size_by_risk, RiskParams};
use tradepulse_core::signals::{generate_signals, stop_prices, SignalDirection};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

/// Random-walk OHLC bars with a consistent high/low envelope.
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-2.0..2.0_f64, 0.0..1.5_f64, 0.0..1.5_f64), 1..max_len).prop_map(
        |steps| {
            let mut close = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (delta, up, down))| {
                    let open = close;
                    close = (close + delta).max(1.0);
                    Bar::new(
                        base_time() + Duration::minutes(i as i64),
                        open,
                        open.max(close) + up,
                        open.min(close) - down,
                        close,
                    )
                })
                .collect()
        },
    )
}

fn arb_price() -> impl Strategy<Value = f64> {
    (0.5..500.0_f64).prop_map(|p| (p * 10_000.0).round() / 10_000.0)
}

// ── 1. ATR Warm-up ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn atr_warmup_then_finite(bars in arb_bars(80), window in 1usize..30) {
        let values = atr(&bars, window).unwrap();
        prop_assert_eq!(values.len(), bars.len());
        for (i, v) in values.iter().enumerate() {
            if i + 1 < window {
                prop_assert!(v.is_nan(), "atr[{}] should be NaN for window {}", i, window);
            } else {
                prop_assert!(v.is_finite() && *v >= 0.0, "atr[{}] = {}", i, v);
            }
        }
    }
}

// ── 2. Crossover Exclusivity ─────────────────────────────────────────

proptest! {
    #[test]
    fn no_cross_across_undefined_averages(
        bars in arb_bars(80),
        fast in 1usize..10,
        extra in 1usize..15,
    ) {
        let slow = fast + extra;
        let rows = generate_signals(&bars, fast, slow).unwrap();
        prop_assert_eq!(rows[0].signal, SignalDirection::Flat);

        for i in 1..rows.len() {
            let undefined = [rows[i].fast_ma, rows[i].slow_ma, rows[i - 1].fast_ma, rows[i - 1].slow_ma]
                .iter()
                .any(|v| v.is_nan());
            if undefined {
                prop_assert_eq!(rows[i].signal, SignalDirection::Flat);
            }
            match rows[i].signal {
                SignalDirection::Long => prop_assert!(rows[i].fast_ma > rows[i].slow_ma),
                SignalDirection::Short => prop_assert!(rows[i].fast_ma < rows[i].slow_ma),
                SignalDirection::Flat => {}
            }
        }
    }
}

// ── 3. Stop Ordering ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn stops_bracket_close(bars in arb_bars(60), window in 1usize..20, mult in 0.1..5.0_f64) {
        let stops = stop_prices(&bars, window, mult).unwrap();
        for (bar, row) in bars.iter().zip(&stops) {
            if row.atr.is_nan() {
                prop_assert!(row.long_stop.is_nan() && row.short_stop.is_nan());
            } else if row.atr > 0.0 {
                prop_assert!(row.long_stop < bar.close);
                prop_assert!(bar.close < row.short_stop);
            }
        }
    }
}

// ── 4. Sizer Monotonicity ────────────────────────────────────────────

proptest! {
    #[test]
    fn more_equity_never_sizes_smaller(
        entry in arb_price(),
        distance in 0.0001..5.0_f64,
        pip in 0.0001..10.0_f64,
        equity in 1.0..1_000_000.0_f64,
        bump in 0.0..1_000_000.0_f64,
        risk in 0.001..0.05_f64,
    ) {
        let stop = entry - distance;
        let small = position_size_by_risk(entry, stop, pip, &RiskParams::new(equity, risk), None);
        let large = position_size_by_risk(entry, stop, pip, &RiskParams::new(equity + bump, risk), None);
        prop_assert!(large >= small, "equity {} -> {}, {} -> {}", equity, small, equity + bump, large);
    }

    #[test]
    fn wider_stop_never_sizes_larger(
        entry in arb_price(),
        distance in 0.0001..5.0_f64,
        widen in 0.0..5.0_f64,
        pip in 0.0001..10.0_f64,
        equity in 1.0..1_000_000.0_f64,
    ) {
        let params = RiskParams::new(equity, 0.01);
        let tight = position_size_by_risk(entry, entry - distance, pip, &params, None);
        let wide = position_size_by_risk(entry, entry - distance - widen, pip, &params, None);
        prop_assert!(wide <= tight);
    }
}

// ── 5. Sizer Bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn size_within_both_caps(
        entry in arb_price(),
        stop in arb_price(),
        pip in 0.0001..10.0_f64,
        equity in -1_000.0..1_000_000.0_f64,
        units_cap in 0u64..50_000,
        max_position in 0.0..50_000.0_f64,
    ) {
        let params = RiskParams::new(equity, 0.02).with_max_position_size(max_position);
        let units = position_size_by_risk(entry, stop, pip, &params, Some(units_cap));
        prop_assert!(units <= units_cap);
        prop_assert!(units as f64 <= max_position);
    }
}

// ── 6. Aggregator Completeness ───────────────────────────────────────

proptest! {
    #[test]
    fn aggregator_emits_one_bar_per_finished_bucket(
        gaps in prop::collection::vec(0i64..150, 1..200),
        prices in prop::collection::vec(90.0..110.0_f64, 200),
    ) {
        let granularity = Granularity::minutes(1).unwrap();
        let mut agg = CandleAggregator::new(granularity);
        let mut ts = base_time();
        let mut closed = Vec::new();
        let mut buckets = Vec::new();

        for (gap, price) in gaps.iter().zip(&prices) {
            ts += Duration::seconds(*gap);
            let bucket = granularity.bucket_start(ts);
            if buckets.last() != Some(&bucket) {
                buckets.push(bucket);
            }
            if let Some(bar) = agg.update(*price, ts).unwrap() {
                closed.push(bar);
            }
        }

        prop_assert_eq!(closed.len(), buckets.len() - 1);
        for (bar, bucket) in closed.iter().zip(&buckets) {
            prop_assert_eq!(bar.timestamp, *bucket);
            prop_assert!(bar.low <= bar.open.min(bar.close));
            prop_assert!(bar.high >= bar.open.max(bar.close));
        }
        prop_assert!(closed.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}

#[test]
fn aggregator_closes_first_minute_on_rollover() {
    let at = |m: u32, s: u32| Utc.with_ymd_and_hms(2024, 1, 2, 10, m, s).unwrap();
    let mut agg = CandleAggregator::new(Granularity::minutes(1).unwrap());

    assert!(agg.update(100.0, at(0, 5)).unwrap().is_none());
    assert!(agg.update(105.0, at(0, 40)).unwrap().is_none());
    let bar = agg.update(95.0, at(1, 10)).unwrap().unwrap();

    assert_eq!(bar.timestamp, at(0, 0));
    assert_eq!((bar.open, bar.high, bar.low, bar.close), (100.0, 105.0, 100.0, 105.0));
}
