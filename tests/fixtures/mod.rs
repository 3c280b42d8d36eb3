#![allow(dead_code)]

use market_profile::Candle;
use serde_json::{json, Value};

/// 2024-01-02 00:00:00 UTC
pub const DAY_ONE: i64 = 1_704_153_600;
pub const ONE_DAY: i64 = 86_400;
pub const ONE_MINUTE: i64 = 60;

/// Candle with a symmetric 1.0 range around `price`
pub fn create_sample_candle(time: i64, price: f64, volume: f64) -> Candle {
    Candle::new(time, price, price + 1.0, price - 1.0, price + 0.5, volume)
}

/// Candle with explicit range, opening at `low` and closing at `high`
pub fn create_range_candle(time: i64, low: f64, high: f64) -> Candle {
    Candle::new(time, low, high, low, high, 100.0)
}

/// Minute candles drifting in a bounded zig-zag around `start_price`
pub fn create_realistic_candles(start_time: i64, count: usize, start_price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let swing = ((i % 40) as f64 - 20.0).abs() * 0.25;
            let price = start_price + swing;
            let time = start_time + i as i64 * ONE_MINUTE;
            create_sample_candle(time, price, 1000.0 + (i % 17) as f64 * 10.0)
        })
        .collect()
}

/// `days` consecutive sessions of minute candles
pub fn create_multi_day_candles(days: usize, candles_per_day: usize, start_price: f64) -> Vec<Candle> {
    (0..days)
        .flat_map(|d| {
            create_realistic_candles(DAY_ONE + d as i64 * ONE_DAY, candles_per_day, start_price + d as f64 * 5.0)
        })
        .collect()
}

pub fn candles_to_json(candles: &[Candle]) -> Value {
    json!(candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sample_candle() {
        let candle = create_sample_candle(DAY_ONE, 100.0, 10.0);
        assert_eq!(candle.high, 101.0);
        assert_eq!(candle.low, 99.0);
        assert_eq!(candle.close, 100.5);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_multi_day_candles_are_ordered() {
        let candles = create_multi_day_candles(3, 10, 100.0);
        assert_eq!(candles.len(), 30);
        assert!(candles.windows(2).all(|w| w[0].time < w[1].time));
    }
}
