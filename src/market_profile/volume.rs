use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::candle::{sanitize_candles, Candle};
use crate::dispatcher::errors::ComputationError;
use super::quantizer::{round_price, PriceKey, PriceQuantizer};
use super::statistics::{expand_value_area, find_poc_index};
use super::structs::VolumeProfileOptions;

/// Volume traded at one quantized price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeLevel {
    pub price: f64,
    pub volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    /// Share of total volume, 0..=100
    pub percentage: f64,
}

/// Result payload of a `"volumeProfile"` computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProfileResult {
    /// Sorted by price, highest first.
    pub levels: Vec<VolumeLevel>,
    pub total_volume: f64,
    pub poc: Option<f64>,
    pub vah: Option<f64>,
    pub val: Option<f64>,
    pub vwap: Option<f64>,
    pub tick_size: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct VolumeBucket {
    buy: f64,
    sell: f64,
}

/// Volume-at-price over the whole candle array.
///
/// Each candle's volume is split evenly across the levels it touched, and
/// counted as buying when it closed at or above its open.
pub fn compute_volume_profile(
    candles: &[Candle],
    options: &VolumeProfileOptions,
) -> Result<VolumeProfileResult, ComputationError> {
    let candles = sanitize_candles(candles);
    if candles.is_empty() {
        debug!("No usable candles; returning empty volume profile");
        return Ok(VolumeProfileResult::default());
    }

    let quantizer =
        PriceQuantizer::for_candles_within(options.tick_size, &candles, &options.auto_tick, options.max_price_levels)
            .map_err(ComputationError::InvalidOptions)?;

    let mut buckets: BTreeMap<PriceKey, VolumeBucket> = BTreeMap::new();
    for candle in &candles {
        distribute_volume(&mut buckets, candle, &quantizer);
    }

    let total_volume: f64 = buckets.values().map(|b| b.buy + b.sell).sum();

    let levels: Vec<VolumeLevel> = buckets
        .iter()
        .rev()
        .map(|(key, bucket)| {
            let volume = bucket.buy + bucket.sell;
            VolumeLevel {
                price: quantizer.price(*key),
                volume,
                buy_volume: bucket.buy,
                sell_volume: bucket.sell,
                percentage: if total_volume > 0.0 { volume / total_volume * 100.0 } else { 0.0 },
            }
        })
        .collect();

    let volumes: Vec<f64> = levels.iter().map(|l| l.volume).collect();
    let (poc, vah, val) = match find_poc_index(&volumes) {
        Some(poc_index) if total_volume > 0.0 => {
            let target = total_volume * options.value_area_percent / 100.0;
            let span = expand_value_area(&volumes, poc_index, target);
            (
                Some(levels[poc_index].price),
                Some(levels[span.upper_index].price),
                Some(levels[span.lower_index].price),
            )
        }
        _ => (None, None, None),
    };

    let vwap = (total_volume > 0.0).then(|| {
        round_price(levels.iter().map(|l| l.price * l.volume).sum::<f64>() / total_volume)
    });

    info!(
        "Computed volume profile: {} levels, total volume {:.2}, POC {:?}",
        levels.len(),
        total_volume,
        poc
    );

    Ok(VolumeProfileResult {
        levels,
        total_volume,
        poc,
        vah,
        val,
        vwap,
        tick_size: quantizer.tick_size(),
    })
}

fn distribute_volume(buckets: &mut BTreeMap<PriceKey, VolumeBucket>, candle: &Candle, quantizer: &PriceQuantizer) {
    let keys: Vec<PriceKey> = quantizer.level_keys(candle.low, candle.high).collect();
    if keys.is_empty() {
        return;
    }

    let share = candle.volume / keys.len() as f64;
    let buying = candle.close >= candle.open;

    for key in keys {
        let bucket = buckets.entry(key).or_default();
        if buying {
            bucket.buy += share;
        } else {
            bucket.sell += share;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_profile::structs::TickSizeSetting;

    fn options(tick: f64) -> VolumeProfileOptions {
        VolumeProfileOptions {
            tick_size: TickSizeSetting::Fixed(tick),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_has_no_poc() {
        let result = compute_volume_profile(&[], &options(1.0)).unwrap();
        assert!(result.levels.is_empty());
        assert_eq!((result.poc, result.vah, result.val), (None, None, None));
        assert_eq!(result.total_volume, 0.0);
    }

    #[test]
    fn test_volume_split_evenly_over_touched_levels() {
        let candles = vec![Candle::new(0, 100.0, 103.0, 100.0, 102.0, 40.0)];
        let result = compute_volume_profile(&candles, &options(1.0)).unwrap();

        assert_eq!(result.levels.len(), 4);
        assert!(result.levels.iter().all(|l| l.volume == 10.0 && l.sell_volume == 0.0));
        assert_eq!(result.total_volume, 40.0);
        assert!(result.levels.windows(2).all(|w| w[0].price > w[1].price));
    }

    #[test]
    fn test_buy_and_sell_sides() {
        let candles = vec![
            Candle::new(0, 100.0, 100.0, 100.0, 100.0, 5.0),
            Candle::new(60, 101.0, 101.0, 100.0, 100.0, 8.0),
        ];
        let result = compute_volume_profile(&candles, &options(1.0)).unwrap();
        let at_100 = result.levels.iter().find(|l| l.price == 100.0).unwrap();
        assert_eq!(at_100.buy_volume, 5.0);
        assert_eq!(at_100.sell_volume, 4.0);
    }

    #[test]
    fn test_poc_and_value_area() {
        let candles = vec![
            Candle::new(0, 100.0, 104.0, 100.0, 104.0, 5.0),
            Candle::new(60, 102.0, 102.0, 102.0, 102.0, 20.0),
            Candle::new(120, 101.0, 103.0, 101.0, 101.0, 6.0),
        ];
        // levels 104:1 103:3 102:23 101:3 100:1, total 31, target 21.7
        let result = compute_volume_profile(&candles, &options(1.0)).unwrap();
        assert_eq!(result.poc, Some(102.0));
        assert_eq!(result.vah, Some(102.0));
        assert_eq!(result.val, Some(102.0));

        let wide = VolumeProfileOptions {
            value_area_percent: 90.0,
            ..options(1.0)
        };
        // target 27.9: 23, +3 up (tie), +3 down -> 29
        let result = compute_volume_profile(&candles, &wide).unwrap();
        assert_eq!((result.vah, result.val), (Some(103.0), Some(101.0)));
    }

    #[test]
    fn test_auto_tick_handles_high_prices() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let price = 1.5e9 * (1.0 + 0.05 * i as f64 / 59.0);
                Candle::new(i * 60, price, price * 1.001, price * 0.999, price, 3.0)
            })
            .collect();

        let result = compute_volume_profile(&candles, &VolumeProfileOptions::default()).unwrap();
        assert!(result.levels.len() <= VolumeProfileOptions::default().max_price_levels + 1);
        assert!((result.total_volume - 180.0).abs() < 1e-6);
        assert!(result.poc.is_some());
    }

    #[test]
    fn test_negative_volume_candles_are_dropped() {
        let candles = vec![
            Candle::new(0, 100.0, 101.0, 100.0, 101.0, 10.0),
            Candle::new(60, 101.0, 101.0, 100.0, 100.0, -50.0),
        ];
        let result = compute_volume_profile(&candles, &options(1.0)).unwrap();
        assert_eq!(result.total_volume, 10.0);
        assert!(result.levels.iter().all(|l| l.sell_volume == 0.0));
        assert_eq!(result.poc, Some(101.0));
    }

    #[test]
    fn test_fixed_tick_over_budget_is_rejected() {
        let candles = vec![Candle::new(0, 1.0, 10_000.0, 1.0, 5_000.0, 1.0)];
        let err = compute_volume_profile(&candles, &options(0.01)).unwrap_err();
        assert!(matches!(err, ComputationError::InvalidOptions(_)));
    }

    #[test]
    fn test_zero_volume_has_levels_but_no_poc() {
        let candles = vec![Candle::new(0, 100.0, 101.0, 100.0, 101.0, 0.0)];
        let result = compute_volume_profile(&candles, &options(1.0)).unwrap();
        assert_eq!(result.levels.len(), 2);
        assert_eq!(result.poc, None);
        assert_eq!(result.vwap, None);
    }
}
