use chrono::{DateTime, Duration, NaiveDate};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::candle::{Candle, TimestampSec};

/// Candles that share one calendar date, in arrival order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub candles: Vec<Candle>,
}

impl Session {
    /// `YYYY-MM-DD` key used on the wire.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn start_time(&self) -> TimestampSec {
        self.candles.first().map(|c| c.time).unwrap_or_default()
    }

    pub fn end_time(&self) -> TimestampSec {
        self.candles.last().map(|c| c.time).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Groups a time-ordered candle sequence into calendar-day sessions.
///
/// Input is expected sorted ascending by time; unsorted input still groups by
/// date but the session order then follows first appearance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSegmenter {
    utc_offset_minutes: i32,
}

impl SessionSegmenter {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { utc_offset_minutes }
    }

    /// Calendar date of a candle after applying the configured UTC offset.
    pub fn date_of(&self, time: TimestampSec) -> Option<NaiveDate> {
        let utc = DateTime::from_timestamp(time, 0)?;
        let local = utc.naive_utc() + Duration::minutes(self.utc_offset_minutes as i64);
        Some(local.date())
    }

    pub fn segment(&self, candles: &[Candle]) -> Vec<Session> {
        let mut sessions: Vec<Session> = Vec::new();
        let mut index: FxHashMap<NaiveDate, usize> = FxHashMap::default();

        for candle in candles {
            let Some(date) = self.date_of(candle.time) else {
                warn!("Candle time {} is outside the representable date range; skipping", candle.time);
                continue;
            };

            match index.get(&date) {
                Some(&i) => sessions[i].candles.push(*candle),
                None => {
                    index.insert(date, sessions.len());
                    sessions.push(Session {
                        date,
                        candles: vec![*candle],
                    });
                }
            }
        }

        debug!("Segmented {} candles into {} sessions", candles.len(), sessions.len());
        sessions
    }
}
