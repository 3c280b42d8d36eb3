use rayon::prelude::*;
use tracing::{debug, info};

use crate::candle::{sanitize_candles, Candle};
use crate::dispatcher::errors::ComputationError;
use super::letters::LetterPeriodAssigner;
use super::quantizer::PriceQuantizer;
use super::session::{Session, SessionSegmenter};
use super::statistics::{compute_statistics, StatisticsInput};
use super::structs::{PriceLevel, Profile, TpoOptions, TpoResult};

/// Batch TPO computation over a closed candle array.
///
/// Malformed candles are dropped; if none remain the result has no sessions.
/// Options are validated before any work is done.
pub fn compute_tpo_profiles(candles: &[Candle], options: &TpoOptions) -> Result<TpoResult, ComputationError> {
    options.validate().map_err(ComputationError::InvalidOptions)?;

    let candles = sanitize_candles(candles);
    if candles.is_empty() {
        debug!("No usable candles; returning empty TPO result");
        return Ok(TpoResult::default());
    }

    let quantizer =
        PriceQuantizer::for_candles_within(options.tick_size, &candles, &options.auto_tick, options.max_price_levels)
            .map_err(ComputationError::InvalidOptions)?;

    let segmenter = SessionSegmenter::new(options.utc_offset_minutes);
    let assigner = LetterPeriodAssigner::new(options.block_size);

    // Sessions are independent; par_iter keeps their chronological order.
    let sessions: Vec<Profile> = segmenter
        .segment(&candles)
        .par_iter()
        .map(|session| build_profile(session, &assigner, &quantizer, options))
        .collect();

    info!(
        "Computed {} TPO sessions from {} candles (block {}, tick {})",
        sessions.len(),
        candles.len(),
        options.block_size,
        quantizer.tick_size()
    );

    Ok(TpoResult { sessions })
}

/// Profile of one session: letters, levels and statistics.
pub fn build_profile(
    session: &Session,
    assigner: &LetterPeriodAssigner,
    quantizer: &PriceQuantizer,
    options: &TpoOptions,
) -> Profile {
    let candles = &session.candles;
    let grid = assigner.assign(candles, quantizer);

    let total_tpos = grid.total_tpos();
    let period_count = grid.periods.len() as u32;

    let (low, high) = candles
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.low), hi.max(c.high)));

    let (ib_low, ib_high) = grid
        .leading_range(options.ib_periods as usize)
        .map(|(lo, hi)| (quantizer.price(lo), quantizer.price(hi)))
        .unwrap_or((low, high));

    let price_levels: Vec<PriceLevel> = grid
        .levels
        .into_iter()
        .rev()
        .map(|(key, letters)| PriceLevel::new(quantizer.price(key), letters))
        .collect();

    let stats = compute_statistics(StatisticsInput {
        levels: &price_levels,
        total_tpos,
        ib_high,
        ib_low,
        session_high: high,
        session_low: low,
        value_area_percent: options.value_area_percent,
    });

    let open_price = candles.first().map(|c| c.open).unwrap_or_default();
    let close_price = candles.last().map(|c| c.close).unwrap_or_default();
    let volume: f64 = candles.iter().map(|c| c.volume).sum();

    debug!(
        "Session {}: {} candles, {} periods, {} levels, {} TPOs",
        session.date_key(),
        candles.len(),
        period_count,
        price_levels.len(),
        total_tpos
    );

    Profile {
        date: session.date_key(),
        start_time: session.start_time(),
        end_time: session.end_time(),
        poc: stats.poc,
        vah: stats.vah,
        val: stats.val,
        high,
        low,
        tick_size: quantizer.tick_size(),
        price_levels,
        total_tpos,
        ib_high: stats.ib_high,
        ib_low: stats.ib_low,
        poor_high: stats.poor_high,
        poor_low: stats.poor_low,
        single_prints: stats.single_prints,
        midpoint: stats.midpoint,
        open_price,
        close_price,
        value_area_percent: options.value_area_percent,
        value_area_tpos: stats.value_area_tpos,
        period_count,
        volume,
    }
}
