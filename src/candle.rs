use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Epoch seconds, as delivered by the host chart.
pub type TimestampSec = i64;
/// Epoch milliseconds.
pub type TimestampMS = i64;

/// One OHLCV bar. Owned by the caller; the pipeline only ever borrows it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: TimestampSec,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: TimestampSec, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Candle open time in milliseconds.
    pub fn time_ms(&self) -> TimestampMS {
        self.time.saturating_mul(1000)
    }

    /// A candle is usable when every price is finite and `low <= high`.
    /// Volume may be missing (0) but must be finite and not negative.
    pub fn is_valid(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite();

        finite && self.low <= self.high && self.volume >= 0.0
    }
}

/// Drop malformed candles, keeping arrival order of the rest.
pub fn sanitize_candles(candles: &[Candle]) -> Vec<Candle> {
    let mut dropped = 0usize;
    let kept: Vec<Candle> = candles
        .iter()
        .filter(|c| {
            let ok = c.is_valid();
            if !ok {
                dropped += 1;
            }
            ok
        })
        .copied()
        .collect();

    if dropped > 0 {
        warn!("Dropped {} malformed candles out of {}", dropped, candles.len());
    }

    kept
}

/// Decode a JSON candle array coming over the dispatcher boundary.
///
/// Anything that is not an array decodes to an empty list, and elements that
/// fail to decode are skipped. Malformed input never becomes an error here.
pub fn candles_from_json(data: &Value) -> Vec<Candle> {
    let items = match data {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            warn!("Expected a candle array, got {}; treating as empty", json_kind(other));
            return Vec::new();
        }
    };

    let mut candles = Vec::with_capacity(items.len());
    let mut undecodable = 0usize;

    for item in items {
        match serde_json::from_value::<Candle>(item.clone()) {
            Ok(candle) => candles.push(candle),
            Err(e) => {
                undecodable += 1;
                debug!("Skipping undecodable candle: {}", e);
            }
        }
    }

    if undecodable > 0 {
        warn!("Skipped {} undecodable candles out of {}", undecodable, items.len());
    }

    sanitize_candles(&candles)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
