use std::ops::Add;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::quantizer::round_price;
use super::structs::{PriceLevel, Profile};

/// Everything the statistics depend on. Levels must be sorted highest price first.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsInput<'a> {
    pub levels: &'a [PriceLevel],
    pub total_tpos: u32,
    pub ib_high: f64,
    pub ib_low: f64,
    pub session_high: f64,
    pub session_low: f64,
    pub value_area_percent: f64,
}

/// Derived statistics of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatistics {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub value_area_tpos: u32,
    pub ib_high: f64,
    pub ib_low: f64,
    pub poor_high: Option<f64>,
    pub poor_low: Option<f64>,
    pub single_prints: Vec<f64>,
    pub midpoint: f64,
}

/// Inclusive index span of a value area over a descending-price level list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAreaSpan<T> {
    /// Index of the highest-priced level included (VAH).
    pub upper_index: usize,
    /// Index of the lowest-priced level included (VAL).
    pub lower_index: usize,
    pub accumulated: T,
}

/// Index of the level with the largest metric.
///
/// Ties go to the first level encountered, which for a descending-price list
/// is the higher price.
pub fn find_poc_index<T: PartialOrd + Copy>(metrics: &[T]) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, &value) in metrics.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// Greedy two-sided expansion around the POC.
///
/// One level at a time, take whichever neighbour (up = lower index, down =
/// higher index) carries more; an exact tie expands upward. Stops once the
/// accumulated metric reaches `target` or both sides are exhausted.
pub fn expand_value_area<T>(metrics: &[T], poc_index: usize, target: T) -> ValueAreaSpan<T>
where
    T: Copy + PartialOrd + Add<Output = T>,
{
    let mut upper = poc_index;
    let mut lower = poc_index;
    let mut accumulated = metrics[poc_index];

    while accumulated < target {
        let up = if upper > 0 { Some(metrics[upper - 1]) } else { None };
        let down = metrics.get(lower + 1).copied();

        match (up, down) {
            (None, None) => break,
            (Some(u), Some(d)) if u >= d => {
                upper -= 1;
                accumulated = accumulated + u;
            }
            (Some(u), None) => {
                upper -= 1;
                accumulated = accumulated + u;
            }
            (_, Some(d)) => {
                lower += 1;
                accumulated = accumulated + d;
            }
        }
    }

    ValueAreaSpan {
        upper_index: upper,
        lower_index: lower,
        accumulated,
    }
}

/// TPO count the value area has to reach: `floor(total * percent / 100)`.
pub fn value_area_target(total_tpos: u32, value_area_percent: f64) -> u32 {
    (total_tpos as f64 * value_area_percent / 100.0).floor() as u32
}

/// Value area around a known POC price.
///
/// Returns `(vah, val, accumulated)`. When the POC price is not one of the
/// levels the area collapses onto the POC itself.
pub fn value_area_around(
    levels: &[PriceLevel],
    poc: f64,
    total_tpos: u32,
    value_area_percent: f64,
) -> (f64, f64, u32) {
    let poc = round_price(poc);
    let Some(poc_index) = levels.iter().position(|l| round_price(l.price) == poc) else {
        warn!(
            "POC {} not found among {} price levels; value area collapsed onto POC",
            poc,
            levels.len()
        );
        return (poc, poc, 0);
    };

    let counts: Vec<u32> = levels.iter().map(|l| l.count).collect();
    let target = value_area_target(total_tpos, value_area_percent);
    let span = expand_value_area(&counts, poc_index, target);

    (levels[span.upper_index].price, levels[span.lower_index].price, span.accumulated)
}

/// A session extreme is poor when a single letter printed it and the level
/// next to it is not reinforced by a second letter either.
fn poor_extreme(extreme: Option<&PriceLevel>, neighbour: Option<&PriceLevel>) -> Option<f64> {
    let extreme = extreme?;
    let reinforced = neighbour.map(|n| n.count >= 2).unwrap_or(false);
    (extreme.count == 1 && !reinforced).then_some(extreme.price)
}

pub fn compute_statistics(input: StatisticsInput<'_>) -> ProfileStatistics {
    let levels = input.levels;
    let midpoint = (input.session_high + input.session_low) / 2.0;

    let counts: Vec<u32> = levels.iter().map(|l| l.count).collect();
    let Some(poc_index) = find_poc_index(&counts) else {
        warn!("Statistics requested for a session without price levels");
        return ProfileStatistics {
            poc: midpoint,
            vah: midpoint,
            val: midpoint,
            value_area_tpos: 0,
            ib_high: input.ib_high,
            ib_low: input.ib_low,
            poor_high: None,
            poor_low: None,
            single_prints: Vec::new(),
            midpoint,
        };
    };

    let poc = levels[poc_index].price;
    let (vah, val, value_area_tpos) =
        value_area_around(levels, poc, input.total_tpos, input.value_area_percent);

    let n = levels.len();
    let poor_high = poor_extreme(levels.first(), levels.get(1));
    let poor_low = poor_extreme(levels.last(), n.checked_sub(2).and_then(|i| levels.get(i)));

    let single_prints: Vec<f64> = levels
        .iter()
        .filter(|l| l.count == 1 && l.price >= val && l.price <= vah)
        .map(|l| l.price)
        .collect();

    debug!(
        "POC {} VA [{}, {}] holding {}/{} TPOs, {} single prints",
        poc,
        val,
        vah,
        value_area_tpos,
        input.total_tpos,
        single_prints.len()
    );

    ProfileStatistics {
        poc,
        vah,
        val,
        value_area_tpos,
        ib_high: input.ib_high,
        ib_low: input.ib_low,
        poor_high,
        poor_low,
        single_prints,
        midpoint,
    }
}

impl Profile {
    /// Re-derive the statistics from this snapshot's own fields.
    pub fn recompute_statistics(&self) -> ProfileStatistics {
        compute_statistics(StatisticsInput {
            levels: &self.price_levels,
            total_tpos: self.total_tpos,
            ib_high: self.ib_high,
            ib_low: self.ib_low,
            session_high: self.high,
            session_low: self.low,
            value_area_percent: self.value_area_percent,
        })
    }
}
