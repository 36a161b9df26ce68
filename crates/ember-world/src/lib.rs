//! Energy cellular automaton engine.
//!
//! Cells on a toroidal grid carry an 8-bit energy value. Each step applies
//! a birth/survival rule over the Moore neighborhood, spreads energy from
//! live cells to their orthogonal neighbors, and sprinkles random noise.
//! All arithmetic saturates, so energies stay within `0..=255`.

pub mod diffusion;
pub mod engine;
pub mod grid;
pub mod noise;
pub mod rule;
pub mod simulation;
pub mod stats;

pub use engine::{step, Engine};
pub use grid::EnergyGrid;
pub use noise::NoiseMask;
pub use simulation::{Panel, PanelResult, PanelState, Simulation, SimulationResult};
pub use stats::GridStats;
