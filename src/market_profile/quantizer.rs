use tracing::{debug, warn};

use crate::candle::Candle;
use super::structs::{AutoTickPolicy, TickSizeSetting};

/// Decimal places kept on every quantized price.
pub const PRICE_DECIMALS: i32 = 6;

/// Round to [`PRICE_DECIMALS`] places so that equal levels compare equal.
#[inline]
pub fn round_price(value: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (value * scale).round() / scale
}

/// Round `price` to the nearest multiple of `tick_size`.
#[inline]
pub fn quantize(price: f64, tick_size: f64) -> f64 {
    PriceKey::from_price(price, tick_size).to_price(tick_size)
}

/// Integer index of a quantized level, `price / tick` rounded.
///
/// Levels are stored under this key rather than under the float price, so
/// ordering and equality never depend on floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceKey(i64);

impl PriceKey {
    #[inline]
    pub fn from_price(price: f64, tick_size: f64) -> Self {
        Self((price / tick_size).round() as i64)
    }

    #[inline]
    pub fn to_price(self, tick_size: f64) -> f64 {
        round_price(self.0 as f64 * tick_size)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Next level up (higher price by one tick).
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Next level down (lower price by one tick).
    pub fn previous(self) -> Self {
        Self(self.0 - 1)
    }
}

/// Buckets prices into discrete levels of one tick size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuantizer {
    tick_size: f64,
}

impl PriceQuantizer {
    /// `tick_size` must be positive and finite; callers validate options first.
    pub fn new(tick_size: f64) -> Self {
        Self { tick_size }
    }

    /// Resolve the configured tick size against the full candle set.
    pub fn for_candles(setting: TickSizeSetting, candles: &[Candle], policy: &AutoTickPolicy) -> Self {
        let tick_size = match setting {
            TickSizeSetting::Fixed(tick) => tick,
            TickSizeSetting::Auto => auto_tick_size(candles, policy),
        };
        Self::new(tick_size)
    }

    /// Resolve the tick size and hold the level count to `max_levels`.
    ///
    /// A fixed tick that spans more levels is rejected. An automatic tick is
    /// doubled until the dataset fits.
    pub fn for_candles_within(
        setting: TickSizeSetting,
        candles: &[Candle],
        policy: &AutoTickPolicy,
        max_levels: usize,
    ) -> Result<Self, String> {
        let mut quantizer = Self::for_candles(setting, candles, policy);
        let (low, high) = candles
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.low), hi.max(c.high)));
        if candles.is_empty() {
            return Ok(quantizer);
        }

        let max_levels = max_levels.max(1) as f64;
        let levels = quantizer.estimate_levels(low, high);
        if levels <= max_levels {
            return Ok(quantizer);
        }

        match setting {
            TickSizeSetting::Fixed(tick) => {
                warn!(
                    "Rejecting tick {} over range [{}, {}]: ~{:.0} levels (max {})",
                    tick, low, high, levels, max_levels
                );
                Err(format!(
                    "tickSize {} yields about {:.0} price levels, more than the allowed {}",
                    tick, levels, max_levels
                ))
            }
            TickSizeSetting::Auto => {
                let initial = quantizer.tick_size;
                while quantizer.estimate_levels(low, high) > max_levels {
                    quantizer.tick_size *= 2.0;
                }
                warn!(
                    "Auto tick {} spans ~{:.0} levels over [{}, {}]; coarsened to {}",
                    initial, levels, low, high, quantizer.tick_size
                );
                Ok(quantizer)
            }
        }
    }

    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    pub fn quantize(&self, price: f64) -> f64 {
        quantize(price, self.tick_size)
    }

    pub fn key(&self, price: f64) -> PriceKey {
        PriceKey::from_price(price, self.tick_size)
    }

    pub fn price(&self, key: PriceKey) -> f64 {
        key.to_price(self.tick_size)
    }

    /// Every level key in `[quantize(low), quantize(high)]`, ascending.
    pub fn level_keys(&self, low: f64, high: f64) -> impl Iterator<Item = PriceKey> {
        let first = self.key(low).0;
        let last = self.key(high).0;
        (first..=last).map(PriceKey)
    }

    /// Every quantized price in `[quantize(low), quantize(high)]`, ascending.
    pub fn price_levels(&self, low: f64, high: f64) -> Vec<f64> {
        self.level_keys(low, high).map(|k| self.price(k)).collect()
    }

    /// Estimated number of levels spanned by `[low, high]`.
    pub fn estimate_levels(&self, low: f64, high: f64) -> f64 {
        ((high - low) / self.tick_size).abs()
    }
}

/// Free-function form of [`PriceQuantizer::price_levels`].
pub fn price_levels(low: f64, high: f64, tick_size: f64) -> Vec<f64> {
    PriceQuantizer::new(tick_size).price_levels(low, high)
}

/// Derive a tick size from the price magnitude and range of the whole dataset.
///
/// See [`AutoTickPolicy`] for the knobs. An empty dataset yields the floor.
pub fn auto_tick_size(candles: &[Candle], policy: &AutoTickPolicy) -> f64 {
    let (min_price, max_price) = candles.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
        (lo.min(c.low), hi.max(c.high))
    });

    if candles.is_empty() || min_price > max_price {
        return policy.min_tick;
    }

    let avg_price = (min_price + max_price) / 2.0;
    let range = max_price - min_price;

    let mut tick = policy
        .ladder
        .iter()
        .find(|step| avg_price < step.below)
        .map(|step| step.tick)
        .unwrap_or(policy.top_tick);

    let estimated_levels = range / tick;
    if estimated_levels > policy.coarsen_above {
        tick *= 2.0;
    } else if estimated_levels > policy.widen_above {
        tick *= 1.5;
    } else if estimated_levels < policy.refine_below && tick > policy.min_tick {
        tick /= 2.0;
    }

    let tick = round_price(tick.max(policy.min_tick));

    debug!(
        "Auto tick size {:.6} (avg price {:.4}, range {:.4}, ~{:.0} levels before refinement)",
        tick, avg_price, range, estimated_levels
    );

    tick
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(low: f64, high: f64) -> Candle {
        Candle::new(0, low, high, low, high, 1.0)
    }

    #[test]
    fn test_budget_rejects_fixed_tick() {
        let candles = vec![candle(1.0, 10_000.0)];
        let err = PriceQuantizer::for_candles_within(
            TickSizeSetting::Fixed(0.01),
            &candles,
            &AutoTickPolicy::default(),
            100_000,
        )
        .unwrap_err();
        assert!(err.starts_with("tickSize 0.01"));
    }

    #[test]
    fn test_budget_coarsens_auto_tick() {
        let candles = vec![candle(1.5e9, 1.58e9)];
        let policy = AutoTickPolicy::default();
        let unbounded = PriceQuantizer::for_candles(TickSizeSetting::Auto, &candles, &policy);

        let quantizer =
            PriceQuantizer::for_candles_within(TickSizeSetting::Auto, &candles, &policy, 100_000).unwrap();
        assert!(quantizer.tick_size() > unbounded.tick_size());
        assert!(quantizer.estimate_levels(1.5e9, 1.58e9) <= 100_000.0);
        assert_eq!(quantizer.tick_size() % unbounded.tick_size(), 0.0);
    }

    #[test]
    fn test_quantize_rounds_to_nearest_tick() {
        assert_eq!(quantize(100.12, 0.25), 100.0);
        assert_eq!(quantize(100.13, 0.25), 100.25);
        assert_eq!(quantize(0.3, 0.1), 0.3);
        assert_eq!(quantize(101.0, 1.0), 101.0);
    }

    #[test]
    fn test_quantize_is_idempotent() {
        let ticks = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 0.15, 0.375];
        let prices = [0.0, 0.07, 1.234567, 99.99, 100.005, 4321.1234, 49_999.5, 123_456.78];

        for &t in &ticks {
            for &p in &prices {
                let once = quantize(p, t);
                assert_eq!(quantize(once, t), once, "price {} tick {}", p, t);
            }
        }
    }

    #[test]
    fn test_price_levels_inclusive_without_drift() {
        let levels = price_levels(100.0, 100.5, 0.1);
        assert_eq!(levels, vec![100.0, 100.1, 100.2, 100.3, 100.4, 100.5]);

        let single = price_levels(100.02, 100.04, 0.1);
        assert_eq!(single, vec![100.0]);
    }

    #[test]
    fn test_price_key_neighbours() {
        let key = PriceKey::from_price(100.0, 0.5);
        assert_eq!(key.value(), 200);
        assert_eq!(key.next().to_price(0.5), 100.5);
        assert_eq!(key.previous().to_price(0.5), 99.5);
    }

    #[test]
    fn test_auto_tick_ladder() {
        let policy = AutoTickPolicy::default();

        // avg 100.5 -> base 0.5, range 1 -> 2 levels < 20 -> halved
        assert_eq!(auto_tick_size(&[candle(100.0, 101.0)], &policy), 0.25);

        // avg 5000+ -> base 5, range 500 -> 100 levels, not above 100 -> unchanged
        assert_eq!(auto_tick_size(&[candle(5000.0, 5500.0)], &policy), 5.0);

        // avg 20_000 -> base 10, range 3000 -> 300 levels -> doubled
        assert_eq!(auto_tick_size(&[candle(18_500.0, 21_500.0)], &policy), 20.0);

        // avg 300 -> base 0.5, range 60 -> 120 levels -> x1.5
        assert_eq!(auto_tick_size(&[candle(270.0, 330.0)], &policy), 0.75);
    }

    #[test]
    fn test_auto_tick_uses_whole_dataset() {
        let policy = AutoTickPolicy::default();
        let candles = vec![candle(40.0, 41.0), candle(60.0, 61.0)];
        // avg 50.5 -> base 0.25, range 21 -> 84 levels -> unchanged
        assert_eq!(auto_tick_size(&candles, &policy), 0.25);
    }

    #[test]
    fn test_auto_tick_floor() {
        let policy = AutoTickPolicy::default();
        // avg 1 -> base 0.05, flat range -> halved to 0.025, still above floor
        assert_eq!(auto_tick_size(&[candle(1.0, 1.0)], &policy), 0.025);

        let mut strict = AutoTickPolicy::default();
        strict.min_tick = 0.05;
        assert_eq!(auto_tick_size(&[candle(1.0, 1.0)], &strict), 0.05);

        assert_eq!(auto_tick_size(&[], &policy), policy.min_tick);
    }
}
