use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::candle::candles_from_json;
use crate::market_profile::calculator::compute_tpo_profiles;
use crate::market_profile::structs::{MarketProfileConfig, TpoRequestOptions, VolumeProfileRequestOptions};
use crate::market_profile::volume::compute_volume_profile;
use super::errors::ComputationError;

pub const TPO_TYPE: &str = "tpo";
pub const VOLUME_PROFILE_TYPE: &str = "volumeProfile";

/// A batch computation reachable through the dispatcher under one `type` name.
#[cfg_attr(test, mockall::automock)]
pub trait Computation: Send + Sync {
    fn kind(&self) -> &'static str;

    fn compute(&self, data: &Value, options: &Value) -> Result<Value, ComputationError>;
}

/// Decode an options object; `null` means "all defaults".
fn decode_options<T: DeserializeOwned + Default>(options: &Value) -> Result<T, ComputationError> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone()).map_err(|e| ComputationError::InvalidOptions(e.to_string()))
}

/// `"tpo"`: per-session Market Profiles.
#[derive(Debug, Clone, Default)]
pub struct TpoComputation {
    config: MarketProfileConfig,
}

impl TpoComputation {
    pub fn new(config: MarketProfileConfig) -> Self {
        Self { config }
    }
}

impl Computation for TpoComputation {
    fn kind(&self) -> &'static str {
        TPO_TYPE
    }

    fn compute(&self, data: &Value, options: &Value) -> Result<Value, ComputationError> {
        let overrides: TpoRequestOptions = decode_options(options)?;
        let options = self
            .config
            .resolve(&overrides)
            .map_err(ComputationError::InvalidOptions)?;

        let candles = candles_from_json(data);
        let result = compute_tpo_profiles(&candles, &options)?;
        Ok(serde_json::to_value(result)?)
    }
}

/// `"volumeProfile"`: volume-at-price over the whole array.
#[derive(Debug, Clone, Default)]
pub struct VolumeProfileComputation {
    config: MarketProfileConfig,
}

impl VolumeProfileComputation {
    pub fn new(config: MarketProfileConfig) -> Self {
        Self { config }
    }
}

impl Computation for VolumeProfileComputation {
    fn kind(&self) -> &'static str {
        VOLUME_PROFILE_TYPE
    }

    fn compute(&self, data: &Value, options: &Value) -> Result<Value, ComputationError> {
        let overrides: VolumeProfileRequestOptions = decode_options(options)?;
        let options = self
            .config
            .resolve_volume(&overrides)
            .map_err(ComputationError::InvalidOptions)?;

        let candles = candles_from_json(data);
        let result = compute_volume_profile(&candles, &options)?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Computations keyed by request `type`.
#[derive(Clone, Default)]
pub struct ComputationRegistry {
    computations: FxHashMap<String, Arc<dyn Computation>>,
}

impl ComputationRegistry {
    /// Empty registry; every request fails with "unknown type".
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `"tpo"` and `"volumeProfile"` backed by `config` defaults.
    pub fn with_market_profile(config: MarketProfileConfig) -> Self {
        let mut registry = Self::new();
        registry.register(TpoComputation::new(config.clone()));
        registry.register(VolumeProfileComputation::new(config));
        registry
    }

    /// Returns the computation previously registered under the same name, if any.
    pub fn register<C: Computation + 'static>(&mut self, computation: C) -> Option<Arc<dyn Computation>> {
        let kind = computation.kind().to_string();
        debug!("Registering computation '{}'", kind);
        self.computations.insert(kind, Arc::new(computation))
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Computation>> {
        self.computations.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.computations.contains_key(kind)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.computations.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Run the computation registered under `kind` on the calling thread.
    pub fn run(&self, kind: &str, data: &Value, options: &Value) -> Result<Value, ComputationError> {
        let computation = self
            .get(kind)
            .ok_or_else(|| ComputationError::UnknownType(kind.to_string()))?;
        computation.compute(data, options)
    }
}

impl std::fmt::Debug for ComputationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputationRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
