//! Market Profile (TPO) computation.
//!
//! Candles are grouped into calendar-day sessions, prices are bucketed into
//! tick-sized levels and every fixed-duration period of a session is given a
//! letter. Statistics (POC, value area, initial balance, poor extremes,
//! single prints) are derived from the per-level letter sets.
pub mod calculator;
pub mod letters;
pub mod quantizer;
pub mod session;
pub mod statistics;
pub mod structs;
pub mod volume;

pub use calculator::{build_profile, compute_tpo_profiles};
pub use letters::{LetterGrid, LetterPeriodAssigner, Period};
pub use quantizer::{auto_tick_size, price_levels, quantize, round_price, PriceKey, PriceQuantizer};
pub use session::{Session, SessionSegmenter};
pub use statistics::{compute_statistics, ProfileStatistics, StatisticsInput};
pub use structs::{
    AutoTickPolicy, BlockSize, LetterSet, MarketProfileConfig, PriceLevel, Profile, TickSizeSetting,
    TpoLetter, TpoOptions, TpoRequestOptions, TpoResult, VolumeProfileOptions, VolumeProfileRequestOptions,
};
pub use volume::{compute_volume_profile, VolumeLevel, VolumeProfileResult};
