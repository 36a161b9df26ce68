//! Grid engine: one full automaton step.

use crate::diffusion::diffuse;
use crate::grid::EnergyGrid;
use crate::noise::{apply_noise, NoiseMask};
use crate::rule::transition;
use ember_core::{validate_noise_probability, Result, RuleConfig};
use rand::Rng;

/// Applies the transition rule, diffusion and noise, in that order.
///
/// The engine holds only its rule parameters, so one engine can step any
/// number of independent grids.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    rules: RuleConfig,
}

impl Engine {
    pub fn new(rules: RuleConfig) -> Result<Self> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Transition followed by diffusion, without noise
    pub fn evolve(&self, grid: &EnergyGrid) -> EnergyGrid {
        let mut next = transition(grid, &self.rules);
        diffuse(&mut next, self.rules.diffusion, self.rules.diffusion_quantum);
        next
    }

    /// Deterministic step: the result depends only on `grid` and `mask`
    pub fn step_with_mask(&self, grid: &EnergyGrid, mask: &NoiseMask) -> Result<EnergyGrid> {
        let mut next = self.evolve(grid);
        apply_noise(&mut next, mask, self.rules.noise_quantum)?;
        Ok(next)
    }

    /// Step with a noise mask drawn from `rng` at probability `noise_probability`
    pub fn step<R: Rng + ?Sized>(
        &self,
        grid: &EnergyGrid,
        noise_probability: f64,
        rng: &mut R,
    ) -> Result<EnergyGrid> {
        validate_noise_probability(noise_probability)?;
        let mask = NoiseMask::sample(grid.width(), grid.height(), noise_probability, rng)?;
        self.step_with_mask(grid, &mask)
    }
}

/// Step `grid` once with the default rules
pub fn step<R: Rng + ?Sized>(
    grid: &EnergyGrid,
    noise_probability: f64,
    rng: &mut R,
) -> Result<EnergyGrid> {
    Engine::default().step(grid, noise_probability, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{DiffusionMode, Error, Position};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn to_rows(grid: &EnergyGrid) -> Vec<Vec<u8>> {
        grid.rows().map(|row| row.to_vec()).collect()
    }

    #[test]
    fn test_single_seed_on_4x4() {
        // One cell at 200. Its 8 neighbors each see a sum of 200: not a
        // birth (needs exactly 128) and they are dead, so nothing survives
        // or is born. The seed itself sees 0 and dies. Diffusion has no
        // donors and noise is off, so the whole grid goes dark.
        let mut grid = EnergyGrid::new(4, 4).unwrap();
        grid.set(Position::new(1, 1), 200);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let next = step(&grid, 0.0, &mut rng).unwrap();
        assert!(next.cells().iter().all(|&e| e == 0));
    }

    #[test]
    fn test_single_birth_seed_on_4x4() {
        // Same layout with the seed at 128: every neighbor of the seed is
        // born, the seed dies, and the far cells stay dark until diffusion.
        let mut grid = EnergyGrid::new(4, 4).unwrap();
        grid.set(Position::new(1, 1), 128);

        let engine = Engine::default();
        let transitioned = transition(&grid, engine.rules());
        assert_eq!(
            to_rows(&transitioned),
            vec![
                vec![128, 128, 128, 0],
                vec![128, 0, 128, 0],
                vec![128, 128, 128, 0],
                vec![0, 0, 0, 0],
            ]
        );

        let mask = NoiseMask::empty(4, 4).unwrap();
        let next = engine.step_with_mask(&grid, &mask).unwrap();
        assert_eq!(next.dimensions(), (4, 4));
        // Row 3 and column 3 only receive energy through diffusion
        assert!(next.get(Position::new(3, 3)) < 128);
        // Every born cell gained some diffused energy on top of 128
        for (pos, energy) in transitioned.iter() {
            if energy == 128 {
                assert!(next.get(pos) > 128);
            }
        }
    }

    #[test]
    fn test_pipeline_order() {
        let engine = Engine::default();
        let mut grid = EnergyGrid::new(6, 6).unwrap();
        grid.set(Position::new(2, 2), 128);
        grid.set(Position::new(4, 5), 77);

        let mut mask = NoiseMask::empty(6, 6).unwrap();
        mask.set(Position::new(0, 0), true);
        mask.set(Position::new(5, 5), true);

        let mut expected = transition(&grid, engine.rules());
        crate::diffusion::diffuse_sequential(&mut expected, 1);
        apply_noise(&mut expected, &mask, 1).unwrap();

        assert_eq!(engine.step_with_mask(&grid, &mask).unwrap(), expected);
    }

    #[test]
    fn test_step_is_deterministic_given_mask() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let grid =
            EnergyGrid::random_fill(16, 16, ember_core::SeedRange::new(0, 256), &mut rng).unwrap();
        let mask = NoiseMask::sample(16, 16, 0.3, &mut rng).unwrap();

        let engine = Engine::default();
        let first = engine.step_with_mask(&grid, &mask).unwrap();
        let second = engine.step_with_mask(&grid, &mask).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_step_with_same_seed_reproduces() {
        let grid = EnergyGrid::random_fill(
            12,
            9,
            ember_core::SeedRange::new(16, 192),
            &mut ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();

        let a = step(&grid, 0.1, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let b = step(&grid, 0.1, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_rejects_bad_probability() {
        let grid = EnergyGrid::new(3, 3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            step(&grid, 1.5, &mut rng),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_step_rejects_mismatched_mask() {
        let grid = EnergyGrid::new(3, 3).unwrap();
        let mask = NoiseMask::empty(4, 3).unwrap();
        assert!(Engine::default().step_with_mask(&grid, &mask).is_err());
    }

    #[test]
    fn test_saturation_through_full_step() {
        // Every cell at 255 on a 3x3: each sees 8 * 255, outside the band,
        // so the transition clears the grid. Seed a birth instead and pile
        // noise on top of a diffusion-saturated cell.
        let engine = Engine::default();
        let grid = EnergyGrid::from_rows(&[[255u8; 3]; 3]).unwrap();
        let mask = NoiseMask::from_cells(3, 3, vec![true; 9]).unwrap();
        let next = engine.step_with_mask(&grid, &mask).unwrap();
        assert!(next.cells().iter().all(|&e| e == 1));

        let rules = RuleConfig {
            birth_energy: 255,
            ..Default::default()
        };
        let engine = Engine::new(rules).unwrap();
        let grid = EnergyGrid::from_rows(&[[128u8, 0, 0], [0, 0, 0], [0, 0, 0]]).unwrap();
        let next = engine.step_with_mask(&grid, &mask).unwrap();
        // The 8 other cells are born at 255 and stay there through diffusion
        // and noise. The seed dies, then collects one quantum from each of
        // its four donor neighbors plus one from noise.
        assert_eq!(next.cells().iter().filter(|&&e| e == 255).count(), 8);
        assert_eq!(next.get(Position::new(0, 0)), 5);
    }

    #[test]
    fn test_simultaneous_mode_differs() {
        let sequential = Engine::default();
        let simultaneous = Engine::new(RuleConfig {
            diffusion: DiffusionMode::Simultaneous,
            ..Default::default()
        })
        .unwrap();

        let mut grid = EnergyGrid::new(8, 8).unwrap();
        grid.set(Position::new(3, 3), 128);
        let mask = NoiseMask::empty(8, 8).unwrap();

        let a = sequential.step_with_mask(&grid, &mask).unwrap();
        let b = simultaneous.step_with_mask(&grid, &mask).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_engine_rejects_empty_band() {
        let rules = RuleConfig {
            survival_min: 10,
            survival_max: 5,
            ..Default::default()
        };
        assert!(Engine::new(rules).is_err());
    }

    fn arb_grid() -> impl Strategy<Value = (EnergyGrid, Vec<bool>)> {
        (1i32..8, 1i32..8).prop_flat_map(|(w, h)| {
            let n = (w * h) as usize;
            (
                prop::collection::vec(any::<u8>(), n),
                prop::collection::vec(any::<bool>(), n),
            )
                .prop_map(move |(cells, hits)| {
                    (EnergyGrid::from_cells(w, h, cells).unwrap(), hits)
                })
        })
    }

    proptest! {
        #[test]
        fn prop_step_is_total_and_keeps_shape((grid, hits) in arb_grid(), steps in 1usize..6) {
            let engine = Engine::default();
            let (w, h) = grid.dimensions();
            let mask = NoiseMask::from_cells(w, h, hits).unwrap();

            let mut current = grid;
            for _ in 0..steps {
                current = engine.step_with_mask(&current, &mask).unwrap();
                prop_assert_eq!(current.dimensions(), (w, h));
                prop_assert_eq!(current.len(), (w * h) as usize);
            }
        }

        #[test]
        fn prop_step_with_mask_is_pure((grid, hits) in arb_grid()) {
            let engine = Engine::default();
            let (w, h) = grid.dimensions();
            let mask = NoiseMask::from_cells(w, h, hits).unwrap();
            prop_assert_eq!(
                engine.step_with_mask(&grid, &mask).unwrap(),
                engine.step_with_mask(&grid, &mask).unwrap()
            );
        }

        #[test]
        fn prop_noise_never_lowers_energy((grid, hits) in arb_grid()) {
            let engine = Engine::default();
            let (w, h) = grid.dimensions();
            let quiet = engine.evolve(&grid);
            let noisy = engine
                .step_with_mask(&grid, &NoiseMask::from_cells(w, h, hits).unwrap())
                .unwrap();
            for (a, b) in quiet.cells().iter().zip(noisy.cells()) {
                prop_assert!(b >= a);
                prop_assert!(*b as u16 <= *a as u16 + 1);
            }
        }
    }
}
