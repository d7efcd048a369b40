//! Engine configuration, loadable from TOML.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    pool::{default_threads, ArenaLimits},
};

/// Tunables for one [`Ai`](crate::Ai). Every field has a default, so a TOML
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest iteration of the iterative deepening loop.
    pub max_ply: u32,
    /// Worker threads; hardware concurrency when unset.
    pub threads: Option<usize>,
    /// Stack depths below this use per-worker scratch nodes instead of the
    /// cached tree.
    pub shallow_depth: u32,
    /// Scratch nodes per worker.
    pub scratch_capacity: usize,
    /// Best scores above this are treated as forced mates and played without
    /// tie-breaking.
    pub mate_cutoff: f64,
    /// Bucket width factor for the tie-break: `decimator_step * (moves + 1)`.
    pub decimator_step: f64,
    /// How often the background thread rechecks its flags while idle.
    pub liveness_timeout_ms: u64,
    /// Seed for the tie-break RNG. Entropy-seeded when unset.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_ply: 3,
            threads: None,
            shallow_depth: 4,
            scratch_capacity: 32,
            mate_cutoff: 1e10,
            decimator_step: 0.125,
            liveness_timeout_ms: 1000,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_ply(mut self, max_ply: u32) -> Self {
        self.max_ply = max_ply;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_ply == 0 {
            return Err(EngineError::Config("max_ply must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(EngineError::Config("threads must be at least 1".into()));
        }
        if self.scratch_capacity == 0 {
            return Err(EngineError::Config("scratch_capacity must be at least 1".into()));
        }
        // The deepest search frame sits `max_ply` plies below the root.
        let deepest = self.max_ply as usize;
        if deepest >= (self.shallow_depth as usize).saturating_add(self.scratch_capacity) {
            return Err(EngineError::Config(format!(
                "max_ply {} needs more than shallow_depth {} + scratch_capacity {}",
                self.max_ply, self.shallow_depth, self.scratch_capacity
            )));
        }
        if self.decimator_step.is_nan() || self.decimator_step <= 0.0 {
            return Err(EngineError::Config("decimator_step must be positive".into()));
        }
        if self.mate_cutoff.is_nan() {
            return Err(EngineError::Config("mate_cutoff must be a number".into()));
        }
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(default_threads)
    }

    pub fn arena_limits(&self) -> ArenaLimits {
        ArenaLimits { shallow_depth: self.shallow_depth, capacity: self.scratch_capacity }
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }
}
