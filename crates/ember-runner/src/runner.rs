//! Headless run: one blocking task per panel.

use anyhow::Result;
use ember_core::RunnerConfig;
use ember_world::{Simulation, SimulationResult};
use tracing::{info, instrument, warn};

use crate::snapshot::SnapshotStore;

/// Build the simulation, restoring the latest snapshot when `resume` is set
pub async fn prepare(config: &RunnerConfig, store: &SnapshotStore) -> Result<Simulation> {
    if config.resume {
        match store.load_latest().await {
            Ok(snapshot) => {
                info!(
                    previous_run = %snapshot.run_id,
                    frame = snapshot.frame,
                    "Resuming from snapshot"
                );
                return Ok(Simulation::restore(
                    config.simulation.clone(),
                    snapshot.panels,
                    snapshot.frame,
                )?);
            }
            Err(e) => warn!("Failed to restore snapshot, starting fresh: {}", e),
        }
    }
    Ok(Simulation::new(config.simulation.clone())?)
}

/// Step every panel on its own blocking task and gather the results.
///
/// Panels share nothing but the engine's rule parameters, so running them
/// apart gives the same grids as stepping them in lockstep.
#[instrument(skip(simulation), fields(run_id = %simulation.run_id()))]
pub async fn run_panels(simulation: Simulation) -> Result<SimulationResult> {
    let run_id = simulation.run_id();
    let engine = simulation.engine().clone();
    let frames = simulation.config().frames;
    let start_frame = simulation.frame();

    info!(
        panels = simulation.panels().len(),
        frames, start_frame, "Starting panel tasks"
    );

    let handles: Vec<_> = simulation
        .into_panels()
        .into_iter()
        .map(|panel| {
            let engine = engine.clone();
            tokio::task::spawn_blocking(move || panel.run(&engine, frames))
        })
        .collect();

    let mut panels = Vec::with_capacity(handles.len());
    for joined in futures::future::join_all(handles).await {
        panels.push(joined??);
    }

    Ok(SimulationResult {
        run_id,
        total_frames: start_frame + frames,
        panels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use ember_core::{SeedRange, SimulationConfig};

    fn config(dir: &std::path::Path) -> RunnerConfig {
        RunnerConfig {
            simulation: SimulationConfig {
                width: 12,
                height: 10,
                frames: 6,
                seed: 7,
                noise_probability: 0.02,
                ..Default::default()
            },
            snapshot_dir: dir.display().to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_parallel_run_matches_lockstep() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let store = SnapshotStore::new(dir.path());

        let parallel = run_panels(prepare(&config, &store).await.unwrap())
            .await
            .unwrap();
        let lockstep = Simulation::new(config.simulation.clone())
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(parallel.total_frames, 6);
        assert_eq!(parallel.panels.len(), 4);
        assert_eq!(parallel.final_grids(), lockstep.final_grids());
        for (index, panel) in parallel.panels.iter().enumerate() {
            assert_eq!(panel.index, index);
        }
    }

    #[tokio::test]
    async fn test_resume_continues_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.simulation.panels = vec![SeedRange::new(64, 192)];
        let store = SnapshotStore::new(dir.path());

        let first = run_panels(prepare(&config, &store).await.unwrap())
            .await
            .unwrap();
        store.save(&Snapshot::from_result(&first)).await.unwrap();

        config.resume = true;
        let resumed = prepare(&config, &store).await.unwrap();
        assert_eq!(resumed.frame(), 6);
        assert_eq!(resumed.panels()[0].grid(), &first.panels[0].final_grid);

        let second = run_panels(resumed).await.unwrap();
        assert_eq!(second.total_frames, 12);

        // Noise continues the saved streams, so the split run matches one
        // that was never interrupted
        config.simulation.frames = 12;
        let whole = Simulation::new(config.simulation.clone())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(second.final_grids(), whole.final_grids());
    }

    #[tokio::test]
    async fn test_resume_without_snapshot_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir.path().join("empty"));
        config.resume = true;
        let store = SnapshotStore::new(dir.path().join("empty"));

        let sim = prepare(&config, &store).await.unwrap();
        assert_eq!(sim.frame(), 0);
    }
}
