use std::collections::BTreeMap;

use tracing::debug;

use crate::candle::{Candle, TimestampSec};
use super::quantizer::{PriceKey, PriceQuantizer};
use super::structs::{BlockSize, LetterSet, TpoLetter};

/// One letter period: its label, when it began and the levels it touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Period {
    pub letter: TpoLetter,
    pub start_time: TimestampSec,
    pub low_key: PriceKey,
    pub high_key: PriceKey,
}

/// Letter sets per quantized level for one session, plus the period list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LetterGrid {
    pub levels: BTreeMap<PriceKey, LetterSet>,
    pub periods: Vec<Period>,
}

impl LetterGrid {
    pub fn total_tpos(&self) -> u32 {
        self.levels.values().map(|set| set.len() as u32).sum()
    }

    /// Touched-price extremes of the first `count` periods, as level keys.
    pub fn leading_range(&self, count: usize) -> Option<(PriceKey, PriceKey)> {
        self.periods
            .iter()
            .take(count.max(1))
            .fold(None, |acc, p| match acc {
                None => Some((p.low_key, p.high_key)),
                Some((lo, hi)) => Some((lo.min(p.low_key), hi.max(p.high_key))),
            })
    }
}

/// Splits a session into fixed-duration periods and letters every level each
/// period's candles touched.
#[derive(Debug, Clone, Copy)]
pub struct LetterPeriodAssigner {
    block_size: BlockSize,
}

impl LetterPeriodAssigner {
    pub fn new(block_size: BlockSize) -> Self {
        Self { block_size }
    }

    /// Period bucket of a candle: epoch milliseconds divided by the period length.
    pub fn bucket_of(&self, candle: &Candle) -> i64 {
        candle.time_ms().div_euclid(self.block_size.period_ms())
    }

    pub fn assign(&self, candles: &[Candle], quantizer: &PriceQuantizer) -> LetterGrid {
        let mut grid = LetterGrid::default();
        let mut previous_bucket: Option<i64> = None;

        for candle in candles {
            let bucket = self.bucket_of(candle);

            if previous_bucket != Some(bucket) {
                let letter = TpoLetter::from_index(grid.periods.len().min(u16::MAX as usize) as u16);
                grid.periods.push(Period {
                    letter,
                    start_time: candle.time,
                    low_key: quantizer.key(candle.low),
                    high_key: quantizer.key(candle.high),
                });
                previous_bucket = Some(bucket);
            }

            let Some(period) = grid.periods.last_mut() else {
                continue;
            };

            period.low_key = period.low_key.min(quantizer.key(candle.low));
            period.high_key = period.high_key.max(quantizer.key(candle.high));
            let letter = period.letter;

            for key in quantizer.level_keys(candle.low, candle.high) {
                grid.levels.entry(key).or_default().insert(letter);
            }
        }

        debug!(
            "Assigned {} periods of {} over {} levels",
            grid.periods.len(),
            self.block_size,
            grid.levels.len()
        );

        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-01 09:00:00 UTC, on a 30-minute boundary
    const OPEN: i64 = 1_709_283_600;

    fn candle(offset_minutes: i64, low: f64, high: f64) -> Candle {
        Candle::new(OPEN + offset_minutes * 60, low, high, low, high, 1.0)
    }

    #[test]
    fn test_single_period_flat_candles() {
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, 100.0, 100.0)).collect();
        let grid = LetterPeriodAssigner::new(BlockSize::M30).assign(&candles, &PriceQuantizer::new(1.0));

        assert_eq!(grid.periods.len(), 1);
        assert_eq!(grid.levels.len(), 1);
        let (_, letters) = grid.levels.iter().next().unwrap();
        assert_eq!(letters.to_string(), "A");
        assert_eq!(grid.total_tpos(), 1);
    }

    #[test]
    fn test_new_letter_on_bucket_change() {
        let candles = vec![
            candle(0, 100.0, 102.0),
            candle(29, 100.0, 101.0),
            candle(30, 101.0, 103.0),
            candle(95, 99.0, 99.0),
        ];
        let quantizer = PriceQuantizer::new(1.0);
        let grid = LetterPeriodAssigner::new(BlockSize::M30).assign(&candles, &quantizer);

        let labels: Vec<String> = grid.periods.iter().map(|p| p.letter.label()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);

        let letters_at = |price: f64| grid.levels.get(&quantizer.key(price)).map(|s| s.to_string());
        assert_eq!(letters_at(100.0).as_deref(), Some("A"));
        assert_eq!(letters_at(101.0).as_deref(), Some("AB"));
        assert_eq!(letters_at(103.0).as_deref(), Some("B"));
        assert_eq!(letters_at(99.0).as_deref(), Some("C"));
        assert_eq!(grid.total_tpos(), 7);
    }

    #[test]
    fn test_gap_in_time_advances_only_one_letter() {
        // Two hours of silence between candles still yields consecutive letters
        let candles = vec![candle(0, 100.0, 100.0), candle(240, 100.0, 100.0)];
        let grid = LetterPeriodAssigner::new(BlockSize::M30).assign(&candles, &PriceQuantizer::new(1.0));
        assert_eq!(grid.periods.len(), 2);
        assert_eq!(grid.periods[1].letter.label(), "B");
    }

    #[test]
    fn test_letters_continue_past_lowercase_z() {
        let candles: Vec<Candle> = (0..60).map(|i| candle(i * 5, 100.0, 100.0)).collect();
        let grid = LetterPeriodAssigner::new(BlockSize::M5).assign(&candles, &PriceQuantizer::new(1.0));

        assert_eq!(grid.periods.len(), 60);
        assert_eq!(grid.periods[51].letter.label(), "z");
        assert_eq!(grid.periods[52].letter.label(), "A2");
        assert_eq!(grid.total_tpos(), 60);
    }

    #[test]
    fn test_leading_range() {
        let candles = vec![
            candle(0, 100.0, 102.0),
            candle(30, 98.0, 101.0),
            candle(60, 90.0, 110.0),
        ];
        let quantizer = PriceQuantizer::new(1.0);
        let grid = LetterPeriodAssigner::new(BlockSize::M30).assign(&candles, &quantizer);

        let (lo, hi) = grid.leading_range(1).unwrap();
        assert_eq!((quantizer.price(lo), quantizer.price(hi)), (100.0, 102.0));

        let (lo, hi) = grid.leading_range(2).unwrap();
        assert_eq!((quantizer.price(lo), quantizer.price(hi)), (98.0, 102.0));
    }
}
