use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::candle::TimestampSec;

/// Letter-period duration. Only the durations the chart exposes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BlockSizeRepr", into = "String")]
pub enum BlockSize {
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H4,
}

impl BlockSize {
    pub const ALL: [BlockSize; 7] = [
        BlockSize::M5,
        BlockSize::M10,
        BlockSize::M15,
        BlockSize::M30,
        BlockSize::H1,
        BlockSize::H2,
        BlockSize::H4,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            BlockSize::M5 => 5,
            BlockSize::M10 => 10,
            BlockSize::M15 => 15,
            BlockSize::M30 => 30,
            BlockSize::H1 => 60,
            BlockSize::H2 => 120,
            BlockSize::H4 => 240,
        }
    }

    /// Period length in milliseconds, used for bucket alignment.
    pub fn period_ms(self) -> i64 {
        self.minutes() as i64 * 60 * 1000
    }

    pub fn label(self) -> &'static str {
        match self {
            BlockSize::M5 => "5m",
            BlockSize::M10 => "10m",
            BlockSize::M15 => "15m",
            BlockSize::M30 => "30m",
            BlockSize::H1 => "1h",
            BlockSize::H2 => "2h",
            BlockSize::H4 => "4h",
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.minutes() == minutes)
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        BlockSize::M30
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BlockSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unsupported block size '{}', expected one of 5m,10m,15m,30m,1h,2h,4h", s))
    }
}

impl From<BlockSize> for String {
    fn from(block: BlockSize) -> Self {
        block.label().to_string()
    }
}

/// Block sizes arrive either as labels ("30m") or as plain minute counts (30).
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockSizeRepr {
    Label(String),
    Minutes(u32),
}

impl TryFrom<BlockSizeRepr> for BlockSize {
    type Error = String;

    fn try_from(repr: BlockSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            BlockSizeRepr::Label(label) => label.parse(),
            BlockSizeRepr::Minutes(minutes) => BlockSize::from_minutes(minutes)
                .ok_or_else(|| format!("unsupported block size of {} minutes", minutes)),
        }
    }
}

/// Tick size is either derived from the data (`"auto"`) or supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TickSizeRepr", into = "TickSizeRepr")]
pub enum TickSizeSetting {
    Auto,
    Fixed(f64),
}

impl Default for TickSizeSetting {
    fn default() -> Self {
        TickSizeSetting::Auto
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TickSizeRepr {
    Keyword(String),
    Value(f64),
}

impl TryFrom<TickSizeRepr> for TickSizeSetting {
    type Error = String;

    fn try_from(repr: TickSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            TickSizeRepr::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(TickSizeSetting::Auto),
            TickSizeRepr::Keyword(k) => Err(format!("tickSize must be 'auto' or a number, got '{}'", k)),
            TickSizeRepr::Value(v) => Ok(TickSizeSetting::Fixed(v)),
        }
    }
}

impl From<TickSizeSetting> for TickSizeRepr {
    fn from(setting: TickSizeSetting) -> Self {
        match setting {
            TickSizeSetting::Auto => TickSizeRepr::Keyword("auto".to_string()),
            TickSizeSetting::Fixed(v) => TickSizeRepr::Value(v),
        }
    }
}

/// One rung of the price-magnitude ladder: prices below `below` start at `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickStep {
    pub below: f64,
    pub tick: f64,
}

/// Tunable policy behind the automatic tick size.
///
/// The ladder picks a base tick from the mid-price magnitude of the whole
/// dataset, then the estimated level count (`range / tick`) nudges it:
/// above `coarsen_above` the tick doubles, above `widen_above` it grows by
/// half, below `refine_below` it halves. The result never drops under
/// `min_tick`. None of these numbers are laws; they are chart defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTickPolicy {
    pub ladder: Vec<TickStep>,
    /// Base tick for prices above the last ladder rung.
    pub top_tick: f64,
    pub coarsen_above: f64,
    pub widen_above: f64,
    pub refine_below: f64,
    pub min_tick: f64,
}

impl Default for AutoTickPolicy {
    fn default() -> Self {
        Self {
            ladder: vec![
                TickStep { below: 10.0, tick: 0.05 },
                TickStep { below: 50.0, tick: 0.10 },
                TickStep { below: 100.0, tick: 0.25 },
                TickStep { below: 500.0, tick: 0.5 },
                TickStep { below: 1000.0, tick: 1.0 },
                TickStep { below: 5000.0, tick: 2.0 },
                TickStep { below: 10000.0, tick: 5.0 },
            ],
            top_tick: 10.0,
            coarsen_above: 200.0,
            widen_above: 100.0,
            refine_below: 20.0,
            min_tick: 0.01,
        }
    }
}

impl AutoTickPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_tick > 0.0 && self.min_tick.is_finite()) {
            return Err(format!("auto_tick.min_tick must be positive, got {}", self.min_tick));
        }

        if !(self.top_tick > 0.0 && self.top_tick.is_finite()) {
            return Err(format!("auto_tick.top_tick must be positive, got {}", self.top_tick));
        }

        for step in &self.ladder {
            if !(step.tick > 0.0 && step.tick.is_finite()) {
                return Err(format!("auto_tick ladder tick must be positive, got {}", step.tick));
            }
        }

        if self.ladder.windows(2).any(|w| w[0].below >= w[1].below) {
            return Err("auto_tick ladder must be sorted by ascending 'below'".to_string());
        }

        if self.refine_below >= self.widen_above || self.widen_above >= self.coarsen_above {
            return Err("auto_tick thresholds must satisfy refine_below < widen_above < coarsen_above".to_string());
        }

        Ok(())
    }
}

/// Default market-profile settings, applied wherever a request omits an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketProfileConfig {
    pub block_size: BlockSize,
    pub tick_size: TickSizeSetting,
    pub value_area_percent: f64,
    /// Number of leading periods forming the Initial Balance.
    pub ib_periods: u32,
    /// Minutes from midnight. Advisory only, carried through untouched.
    pub session_start: Option<u32>,
    pub session_end: Option<u32>,
    /// Offset applied to UTC before taking a candle's calendar date.
    pub utc_offset_minutes: i32,
    pub auto_tick: AutoTickPolicy,
    /// Upper bound on `range / tick` before a request is rejected.
    pub max_price_levels: usize,
}

impl Default for MarketProfileConfig {
    fn default() -> Self {
        Self {
            block_size: BlockSize::default(),
            tick_size: TickSizeSetting::default(),
            value_area_percent: 70.0,
            ib_periods: 1,
            session_start: None,
            session_end: None,
            utc_offset_minutes: 0,
            auto_tick: AutoTickPolicy::default(),
            max_price_levels: 100_000,
        }
    }
}

impl MarketProfileConfig {
    /// Validate configuration for consistency and reasonable values
    pub fn validate(&self) -> Result<(), String> {
        validate_tick_size(self.tick_size)?;
        validate_value_area_percent(self.value_area_percent)?;

        if self.ib_periods == 0 {
            return Err("ib_periods must be at least 1".to_string());
        }

        validate_session_minutes("session_start", self.session_start)?;
        validate_session_minutes("session_end", self.session_end)?;

        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(format!("utc_offset_minutes must be within +/-840, got {}", self.utc_offset_minutes));
        }

        if self.max_price_levels == 0 {
            return Err("max_price_levels must be positive".to_string());
        }

        self.auto_tick.validate()
    }

    /// Merge per-request overrides onto these defaults and validate the result.
    pub fn resolve(&self, overrides: &TpoRequestOptions) -> Result<TpoOptions, String> {
        let options = TpoOptions {
            block_size: overrides.block_size.unwrap_or(self.block_size),
            tick_size: overrides.tick_size.unwrap_or(self.tick_size),
            value_area_percent: overrides.value_area_percent.unwrap_or(self.value_area_percent),
            ib_periods: overrides.ib_periods.unwrap_or(self.ib_periods),
            session_start: overrides.session_start.or(self.session_start),
            session_end: overrides.session_end.or(self.session_end),
            utc_offset_minutes: overrides.utc_offset_minutes.unwrap_or(self.utc_offset_minutes),
            auto_tick: self.auto_tick.clone(),
            max_price_levels: self.max_price_levels,
        };

        options.validate()?;
        Ok(options)
    }

    /// Options exactly as configured, with no request overrides.
    pub fn to_options(&self) -> TpoOptions {
        TpoOptions {
            block_size: self.block_size,
            tick_size: self.tick_size,
            value_area_percent: self.value_area_percent,
            ib_periods: self.ib_periods,
            session_start: self.session_start,
            session_end: self.session_end,
            utc_offset_minutes: self.utc_offset_minutes,
            auto_tick: self.auto_tick.clone(),
            max_price_levels: self.max_price_levels,
        }
    }
}

/// Wire options of a `"volumeProfile"` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProfileRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<TickSizeSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_area_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProfileOptions {
    pub tick_size: TickSizeSetting,
    pub value_area_percent: f64,
    pub auto_tick: AutoTickPolicy,
    pub max_price_levels: usize,
}

impl Default for VolumeProfileOptions {
    fn default() -> Self {
        let config = MarketProfileConfig::default();
        Self {
            tick_size: config.tick_size,
            value_area_percent: config.value_area_percent,
            auto_tick: config.auto_tick,
            max_price_levels: config.max_price_levels,
        }
    }
}

impl MarketProfileConfig {
    /// Volume-profile options with per-request overrides applied.
    pub fn resolve_volume(&self, overrides: &VolumeProfileRequestOptions) -> Result<VolumeProfileOptions, String> {
        let overlay = TpoRequestOptions {
            tick_size: overrides.tick_size,
            value_area_percent: overrides.value_area_percent,
            ..Default::default()
        };
        let resolved = self.resolve(&overlay)?;

        Ok(VolumeProfileOptions {
            tick_size: resolved.tick_size,
            value_area_percent: resolved.value_area_percent,
            auto_tick: resolved.auto_tick,
            max_price_levels: resolved.max_price_levels,
        })
    }
}

/// Levels are keyed at 6 decimal places, so finer ticks would collapse.
pub const MIN_FIXED_TICK_SIZE: f64 = 0.000_001;

fn validate_tick_size(tick_size: TickSizeSetting) -> Result<(), String> {
    match tick_size {
        TickSizeSetting::Auto => Ok(()),
        TickSizeSetting::Fixed(t) if t.is_finite() && t >= MIN_FIXED_TICK_SIZE => Ok(()),
        TickSizeSetting::Fixed(t) => Err(format!("tickSize must be at least {}, got {}", MIN_FIXED_TICK_SIZE, t)),
    }
}

fn validate_value_area_percent(percent: f64) -> Result<(), String> {
    if percent > 0.0 && percent <= 100.0 {
        Ok(())
    } else {
        Err(format!("valueAreaPercent must be in (0, 100], got {}", percent))
    }
}

fn validate_session_minutes(name: &str, minutes: Option<u32>) -> Result<(), String> {
    match minutes {
        Some(m) if m >= 24 * 60 => Err(format!("{} must be below 1440 minutes, got {}", name, m)),
        _ => Ok(()),
    }
}

/// Options object as it arrives on the wire. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TpoRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<BlockSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<TickSizeSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_area_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ib_periods: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_end: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

/// Fully resolved options for one computation call.
#[derive(Debug, Clone, PartialEq)]
pub struct TpoOptions {
    pub block_size: BlockSize,
    pub tick_size: TickSizeSetting,
    pub value_area_percent: f64,
    pub ib_periods: u32,
    pub session_start: Option<u32>,
    pub session_end: Option<u32>,
    pub utc_offset_minutes: i32,
    pub auto_tick: AutoTickPolicy,
    pub max_price_levels: usize,
}

impl Default for TpoOptions {
    fn default() -> Self {
        MarketProfileConfig::default().to_options()
    }
}

impl TpoOptions {
    pub fn validate(&self) -> Result<(), String> {
        validate_tick_size(self.tick_size)?;
        validate_value_area_percent(self.value_area_percent)?;

        if self.ib_periods == 0 {
            return Err("ibPeriods must be at least 1".to_string());
        }

        validate_session_minutes("sessionStart", self.session_start)?;
        validate_session_minutes("sessionEnd", self.session_end)
    }
}

/// Number of letters available before labels gain a cycle suffix.
pub const LETTERS_PER_CYCLE: u16 = 52;

/// The label of one letter period, identified by its position in the session.
///
/// Positions 0..=25 are `A`..`Z`, 26..=51 are `a`..`z`. Sessions with more
/// than 52 periods keep counting: position 52 is `A2`, 53 is `B2`, and so on,
/// so every period stays distinct inside a [`LetterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TpoLetter(u16);

impl TpoLetter {
    pub fn from_index(index: u16) -> Self {
        Self(index)
    }

    pub fn index(self) -> u16 {
        self.0
    }

    /// Position within the 52-letter alphabet, used for color lookup.
    pub fn alphabet_position(self) -> u16 {
        self.0 % LETTERS_PER_CYCLE
    }

    /// 1 for the first 52 periods, 2 for the next 52, ...
    pub fn cycle(self) -> u16 {
        self.0 / LETTERS_PER_CYCLE + 1
    }

    pub fn glyph(self) -> char {
        let pos = self.alphabet_position() as u8;
        if pos < 26 {
            (b'A' + pos) as char
        } else {
            (b'a' + (pos - 26)) as char
        }
    }

    pub fn label(self) -> String {
        match self.cycle() {
            1 => self.glyph().to_string(),
            n => format!("{}{}", self.glyph(), n),
        }
    }
}

impl fmt::Display for TpoLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cycle() {
            1 => write!(f, "{}", self.glyph()),
            n => write!(f, "{}{}", self.glyph(), n),
        }
    }
}

impl FromStr for TpoLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let glyph = chars.next().ok_or_else(|| "empty letter label".to_string())?;

        let position = match glyph {
            'A'..='Z' => glyph as u16 - 'A' as u16,
            'a'..='z' => glyph as u16 - 'a' as u16 + 26,
            _ => return Err(format!("invalid letter label '{}'", s)),
        };

        let suffix = chars.as_str();
        let cycle = if suffix.is_empty() {
            1
        } else {
            match suffix.parse::<u16>() {
                Ok(n) if n >= 2 => n,
                _ => return Err(format!("invalid letter label '{}'", s)),
            }
        };

        (cycle - 1)
            .checked_mul(LETTERS_PER_CYCLE)
            .and_then(|base| base.checked_add(position))
            .map(TpoLetter)
            .ok_or_else(|| format!("letter label '{}' out of range", s))
    }
}

impl TryFrom<String> for TpoLetter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TpoLetter> for String {
    fn from(letter: TpoLetter) -> Self {
        letter.label()
    }
}

/// Distinct letters that touched one price level.
///
/// Insertion is idempotent: a period contributes at most once to a level no
/// matter how many of its candles touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LetterSet(BTreeSet<TpoLetter>);

impl LetterSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns `true` when the letter was not present yet.
    pub fn insert(&mut self, letter: TpoLetter) -> bool {
        self.0.insert(letter)
    }

    pub fn contains(&self, letter: TpoLetter) -> bool {
        self.0.contains(&letter)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Letters in period order.
    pub fn iter(&self) -> impl Iterator<Item = TpoLetter> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<TpoLetter> for LetterSet {
    fn from_iter<I: IntoIterator<Item = TpoLetter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for LetterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for letter in &self.0 {
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}

/// A quantized price with the letters that touched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    pub price: f64,
    pub count: u32,
    pub letters: LetterSet,
}

impl PriceLevel {
    pub fn new(price: f64, letters: LetterSet) -> Self {
        Self {
            price,
            count: letters.len() as u32,
            letters,
        }
    }
}

/// Computed profile of one session. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Calendar date key, `YYYY-MM-DD`.
    pub date: String,
    pub start_time: TimestampSec,
    pub end_time: TimestampSec,
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    pub high: f64,
    pub low: f64,
    pub tick_size: f64,
    /// Sorted by price, highest first.
    pub price_levels: Vec<PriceLevel>,
    pub total_tpos: u32,
    pub ib_high: f64,
    pub ib_low: f64,
    pub poor_high: Option<f64>,
    pub poor_low: Option<f64>,
    pub single_prints: Vec<f64>,
    pub midpoint: f64,
    pub open_price: f64,
    pub close_price: f64,
    pub value_area_percent: f64,
    pub value_area_tpos: u32,
    pub period_count: u32,
    pub volume: f64,
}

/// Result payload of a `"tpo"` computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TpoResult {
    pub sessions: Vec<Profile>,
}
