//! Configuration types for the automaton.

use crate::{Energy, Error, Result};
use serde::{Deserialize, Serialize};

/// Neighborhood sum that triggers a birth
pub const BIRTH_SUM: u16 = 128;
/// Energy a newly born cell starts with
pub const BIRTH_ENERGY: Energy = 128;
/// Lower bound (inclusive) of the survival band
pub const SURVIVAL_MIN: u16 = 64;
/// Upper bound (inclusive) of the survival band
pub const SURVIVAL_MAX: u16 = 192;
/// Energy lost by a surviving cell each step
pub const DECAY: Energy = 1;
/// Energy a live cell hands to each orthogonal neighbor
pub const DIFFUSION_QUANTUM: Energy = 1;
/// Energy added to a cell picked by the noise mask
pub const NOISE_QUANTUM: Energy = 1;

/// How the diffusion pass propagates energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionMode {
    /// Row-major scan mutating the grid in place; donors boosted earlier in
    /// the same scan emit too.
    #[default]
    Sequential,
    /// Donors are fixed from the post-transition grid before any energy moves.
    Simultaneous,
}

/// How the Moore-neighborhood sum is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodSum {
    /// True sum of the 8 neighbors, 0..=2040
    #[default]
    Exact,
    /// Sum accumulated in 8 bits, i.e. taken modulo 256
    Wrapping8,
}

/// Birth/survival/decay rule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Neighborhood sum that causes a birth (exact match)
    pub birth_sum: u16,
    /// Energy assigned on birth
    pub birth_energy: Energy,
    /// Lower bound of the survival band (inclusive)
    pub survival_min: u16,
    /// Upper bound of the survival band (inclusive)
    pub survival_max: u16,
    /// Energy lost per step by a survivor
    pub decay: Energy,
    /// Energy pushed to each orthogonal neighbor by a live cell
    pub diffusion_quantum: Energy,
    /// Energy added by a noise hit
    pub noise_quantum: Energy,
    pub diffusion: DiffusionMode,
    pub neighborhood: NeighborhoodSum,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            birth_sum: BIRTH_SUM,
            birth_energy: BIRTH_ENERGY,
            survival_min: SURVIVAL_MIN,
            survival_max: SURVIVAL_MAX,
            decay: DECAY,
            diffusion_quantum: DIFFUSION_QUANTUM,
            noise_quantum: NOISE_QUANTUM,
            diffusion: DiffusionMode::Sequential,
            neighborhood: NeighborhoodSum::Exact,
        }
    }
}

impl RuleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.survival_min > self.survival_max {
            return Err(Error::Validation(format!(
                "survival band [{}, {}] is empty",
                self.survival_min, self.survival_max
            )));
        }
        Ok(())
    }

    /// Whether a neighborhood sum falls inside the survival band
    pub fn survives(&self, sum: u16) -> bool {
        (self.survival_min..=self.survival_max).contains(&sum)
    }
}

/// Half-open range `[min, max)` the initial fill draws cell energies from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRange {
    pub min: u16,
    pub max: u16,
}

impl SeedRange {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min >= self.max || self.max > u16::from(u8::MAX) + 1 {
            return Err(Error::Validation(format!(
                "seed range [{}, {}) must be non-empty and within [0, 256)",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Reject a noise probability outside `[0, 1]`, NaN included
pub fn validate_noise_probability(p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::Validation(format!(
            "noise probability {} is outside [0, 1]",
            p
        )));
    }
    Ok(())
}

/// Reject zero or negative grid dimensions, and grids whose cell count does
/// not fit in an `i32` (cell indexes are computed from `Position`s).
pub fn validate_dimensions(width: i32, height: i32) -> Result<()> {
    if width <= 0 || height <= 0 {
        return Err(Error::Validation(format!(
            "grid dimensions {}x{} must be positive",
            width, height
        )));
    }
    if i64::from(width) * i64::from(height) > i64::from(i32::MAX) {
        return Err(Error::Validation(format!(
            "grid dimensions {}x{} exceed {} cells",
            width,
            height,
            i32::MAX
        )));
    }
    Ok(())
}

/// Multi-panel simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Width of every panel grid
    pub width: i32,
    /// Height of every panel grid
    pub height: i32,
    /// Number of frames to step
    pub frames: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Per-cell noise probability (0.0 to 1.0)
    pub noise_probability: f64,
    /// One seed range per panel
    pub panels: Vec<SeedRange>,
    /// Transition rule
    pub rules: RuleConfig,
    /// Emit gauge metrics every this many frames
    pub metrics_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            frames: 100,
            seed: 0,
            noise_probability: 0.0,
            panels: [16, 32, 64, 128]
                .into_iter()
                .map(|min| SeedRange::new(min, 192))
                .collect(),
            rules: RuleConfig::default(),
            metrics_interval: 10,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_dimensions(self.width, self.height)?;
        validate_noise_probability(self.noise_probability)?;
        self.rules.validate()?;
        if self.panels.is_empty() {
            return Err(Error::Validation("at least one panel is required".to_string()));
        }
        for range in &self.panels {
            range.validate()?;
        }
        Ok(())
    }
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub simulation: SimulationConfig,
    /// Directory final snapshots are written to
    pub snapshot_dir: String,
    /// Start from the latest snapshot instead of a random fill
    pub resume: bool,
    /// OpenTelemetry endpoint
    pub otel_endpoint: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            snapshot_dir: "./data/snapshots".to_string(),
            resume: false,
            otel_endpoint: None,
        }
    }
}
