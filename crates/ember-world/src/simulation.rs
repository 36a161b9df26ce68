//! Multi-panel simulation driver.
//!
//! A simulation owns several independent panels, each an energy grid with
//! its own seed range and random stream, and steps them together once per
//! frame with a shared engine and noise level.

use crate::engine::Engine;
use crate::grid::EnergyGrid;
use crate::stats::GridStats;
use ember_core::{Error, Result, RunId, SeedRange, SimulationConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, event, info, instrument, trace, Level};

/// Random stream for one panel: the run seed, with the panel index as the
/// ChaCha stream so panels never share draws.
fn panel_rng(seed: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64);
    rng
}

/// What a panel needs to pick up where it left off: its grid and how far
/// into its random stream it has read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub grid: EnergyGrid,
    /// ChaCha word position of the panel stream
    pub rng_word_pos: u128,
}

impl PanelState {
    /// A grid paired with the start of its stream
    pub fn fresh(grid: EnergyGrid) -> Self {
        Self {
            grid,
            rng_word_pos: 0,
        }
    }
}

/// One independent grid and its random source
#[derive(Debug, Clone)]
pub struct Panel {
    index: usize,
    seed_range: SeedRange,
    grid: EnergyGrid,
    rng: ChaCha8Rng,
    noise_probability: f64,
    metrics_interval: u64,
    frame: u64,
    extinct: bool,
    history: Vec<GridStats>,
}

impl Panel {
    /// Create panel `index` with a random fill drawn from its seed range
    pub fn new(index: usize, config: &SimulationConfig) -> Result<Self> {
        let seed_range = Self::seed_range_for(index, config)?;
        let mut rng = panel_rng(config.seed, index);
        let grid = EnergyGrid::random_fill(config.width, config.height, seed_range, &mut rng)?;
        Ok(Self::assemble(index, seed_range, grid, rng, 0, config))
    }

    /// Create panel `index` from an existing grid, drawing noise from the
    /// start of its stream
    pub fn from_grid(
        index: usize,
        grid: EnergyGrid,
        start_frame: u64,
        config: &SimulationConfig,
    ) -> Result<Self> {
        Self::restore(index, PanelState::fresh(grid), start_frame, config)
    }

    /// Recreate panel `index` from saved state, continuing its stream from
    /// the saved word position
    pub fn restore(
        index: usize,
        state: PanelState,
        start_frame: u64,
        config: &SimulationConfig,
    ) -> Result<Self> {
        let expected = (config.width, config.height);
        if state.grid.dimensions() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: state.grid.dimensions(),
            });
        }
        let seed_range = Self::seed_range_for(index, config)?;
        let mut rng = panel_rng(config.seed, index);
        rng.set_word_pos(state.rng_word_pos);
        Ok(Self::assemble(
            index,
            seed_range,
            state.grid,
            rng,
            start_frame,
            config,
        ))
    }

    fn seed_range_for(index: usize, config: &SimulationConfig) -> Result<SeedRange> {
        config
            .panels
            .get(index)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("no seed range for panel {}", index)))
    }

    fn assemble(
        index: usize,
        seed_range: SeedRange,
        grid: EnergyGrid,
        rng: ChaCha8Rng,
        start_frame: u64,
        config: &SimulationConfig,
    ) -> Self {
        let extinct = GridStats::from_grid(&grid).is_extinct();
        Self {
            index,
            seed_range,
            grid,
            rng,
            noise_probability: config.noise_probability,
            metrics_interval: config.metrics_interval,
            frame: start_frame,
            extinct,
            history: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn seed_range(&self) -> SeedRange {
        self.seed_range
    }

    pub fn grid(&self) -> &EnergyGrid {
        &self.grid
    }

    /// Frames stepped so far, counting any restored offset
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance one frame
    pub fn step(&mut self, engine: &Engine) -> Result<GridStats> {
        self.grid = engine.step(&self.grid, self.noise_probability, &mut self.rng)?;
        self.frame += 1;

        let stats = GridStats::from_grid(&self.grid);
        self.history.push(stats);

        trace!(
            panel = self.index,
            frame = self.frame,
            live_cells = stats.live_cells,
            total_energy = stats.total_energy,
            "Panel stepped"
        );

        if stats.is_extinct() != self.extinct {
            if stats.is_extinct() {
                info!(
                    event = "panel_extinct",
                    panel = self.index,
                    seed_min = self.seed_range.min,
                    frame = self.frame,
                    "Panel died out"
                );
            } else {
                debug!(panel = self.index, frame = self.frame, "Panel revived by noise");
            }
            self.extinct = stats.is_extinct();
        }

        if self.metrics_interval > 0 && self.frame % self.metrics_interval == 0 {
            self.emit_metrics(&stats);
        }

        Ok(stats)
    }

    /// Step `frames` times and hand back the result
    pub fn run(mut self, engine: &Engine, frames: u64) -> Result<PanelResult> {
        for _ in 0..frames {
            self.step(engine)?;
        }
        Ok(self.into_result())
    }

    pub fn into_result(self) -> PanelResult {
        PanelResult {
            index: self.index,
            seed_range: self.seed_range,
            final_frame: self.frame,
            rng_word_pos: self.rng.get_word_pos(),
            history: self.history,
            final_grid: self.grid,
        }
    }

    fn emit_metrics(&self, stats: &GridStats) {
        event!(
            Level::INFO,
            gauge_name = "live_cells",
            gauge_value = stats.live_cells,
            panel = self.index,
            frame = self.frame,
            "Live cell gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "mean_energy",
            gauge_value = stats.mean_energy,
            panel = self.index,
            frame = self.frame,
            "Mean energy gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "saturated_cells",
            gauge_value = stats.saturated_cells,
            panel = self.index,
            frame = self.frame,
            "Saturated cell gauge"
        );
    }
}

pub struct Simulation {
    run_id: RunId,
    config: SimulationConfig,
    engine: Engine,
    panels: Vec<Panel>,
    frame: u64,
}

impl Simulation {
    /// Validate `config` and seed one panel per configured range
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let engine = Engine::new(config.rules.clone())?;
        let panels = (0..config.panels.len())
            .map(|index| Panel::new(index, &config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            run_id: RunId::new(),
            config,
            engine,
            panels,
            frame: 0,
        })
    }

    /// Start from existing grids, one per configured panel
    pub fn from_grids(
        config: SimulationConfig,
        grids: Vec<EnergyGrid>,
        start_frame: u64,
    ) -> Result<Self> {
        let states = grids.into_iter().map(PanelState::fresh).collect();
        Self::restore(config, states, start_frame)
    }

    /// Pick up saved panels at `start_frame`, one state per configured panel
    pub fn restore(
        config: SimulationConfig,
        states: Vec<PanelState>,
        start_frame: u64,
    ) -> Result<Self> {
        config.validate()?;
        if states.len() != config.panels.len() {
            return Err(Error::Validation(format!(
                "expected {} panel states, got {}",
                config.panels.len(),
                states.len()
            )));
        }
        let engine = Engine::new(config.rules.clone())?;
        let panels = states
            .into_iter()
            .enumerate()
            .map(|(index, state)| Panel::restore(index, state, start_frame, &config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            run_id: RunId::new(),
            config,
            engine,
            panels,
            frame: start_frame,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Hand the panels out so they can be stepped independently
    pub fn into_panels(self) -> Vec<Panel> {
        self.panels
    }

    /// Run all panels for the configured number of frames
    #[instrument(skip(self), fields(run_id = %self.run_id, frames = self.config.frames))]
    pub fn run(&mut self) -> Result<SimulationResult> {
        info!(
            "Starting {} panels of {}x{} for {} frames",
            self.panels.len(),
            self.config.width,
            self.config.height,
            self.config.frames
        );

        for _ in 0..self.config.frames {
            self.step()?;
        }

        let result = self.collect_results();
        result.emit_summary();
        Ok(result)
    }

    /// Advance every panel by one frame
    pub fn step(&mut self) -> Result<Vec<GridStats>> {
        let stats = self
            .panels
            .iter_mut()
            .map(|panel| panel.step(&self.engine))
            .collect::<Result<Vec<_>>>()?;
        self.frame += 1;
        Ok(stats)
    }

    fn collect_results(&self) -> SimulationResult {
        SimulationResult {
            run_id: self.run_id,
            total_frames: self.frame,
            panels: self
                .panels
                .iter()
                .cloned()
                .map(Panel::into_result)
                .collect(),
        }
    }
}

/// Outcome of one panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelResult {
    pub index: usize,
    pub seed_range: SeedRange,
    pub final_frame: u64,
    /// Where the panel stream stopped
    pub rng_word_pos: u128,
    /// Stats after each stepped frame
    pub history: Vec<GridStats>,
    pub final_grid: EnergyGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub run_id: RunId,
    pub total_frames: u64,
    pub panels: Vec<PanelResult>,
}

impl SimulationResult {
    /// Final grids in panel order
    pub fn final_grids(&self) -> Vec<EnergyGrid> {
        self.panels.iter().map(|p| p.final_grid.clone()).collect()
    }

    /// State to resume every panel from, in panel order
    pub fn panel_states(&self) -> Vec<PanelState> {
        self.panels
            .iter()
            .map(|p| PanelState {
                grid: p.final_grid.clone(),
                rng_word_pos: p.rng_word_pos,
            })
            .collect()
    }

    /// Log one summary line per panel and an overall line
    pub fn emit_summary(&self) {
        for panel in &self.panels {
            let last = panel.history.last().copied().unwrap_or_default();
            let peak_live = panel
                .history
                .iter()
                .map(|s| s.live_cells)
                .max()
                .unwrap_or(0);
            let extinct_at = panel
                .history
                .iter()
                .position(GridStats::is_extinct)
                .map(|i| i as i64 + 1)
                .unwrap_or(-1);

            info!(
                event = "panel_summary",
                run_id = %self.run_id,
                panel = panel.index,
                seed_min = panel.seed_range.min,
                seed_max = panel.seed_range.max,
                final_frame = panel.final_frame,
                final_live_cells = last.live_cells,
                final_mean_energy = format!("{:.2}", last.mean_energy),
                peak_live_cells = peak_live,
                extinct_at = extinct_at,
                "Panel complete"
            );
        }

        let surviving = self
            .panels
            .iter()
            .filter(|p| !GridStats::from_grid(&p.final_grid).is_extinct())
            .count();

        info!(
            event = "run_summary",
            run_id = %self.run_id,
            total_frames = self.total_frames,
            panels = self.panels.len(),
            surviving_panels = surviving,
            "Run complete"
        );
    }
}
