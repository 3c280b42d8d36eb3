//! Market Profile (TPO) computation and rendering.
//!
//! Candles go in through [`dispatcher::ComputationDispatcher`] (or straight
//! into [`market_profile::compute_tpo_profiles`]); profiles come out as
//! immutable snapshots that [`render::ProfileRenderPrimitive`] draws onto a
//! host-provided canvas.
pub mod candle;
pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod market_profile;
pub mod render;

pub use candle::{candles_from_json, sanitize_candles, Candle, TimestampMS, TimestampSec};
pub use config::{ConfigError, EngineConfig};
pub use dispatcher::{ComputationDispatcher, ComputationError, ComputationRequest, ComputationResponse, DispatchError};
pub use logging::{init_logging, init_test_logging, LoggingConfig};
pub use market_profile::{compute_tpo_profiles, compute_volume_profile, MarketProfileConfig, Profile, TpoOptions, TpoResult};
pub use render::{ProfileRenderPrimitive, RenderOptions};
