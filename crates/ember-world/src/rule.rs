//! Birth, survival and decay.

use crate::grid::EnergyGrid;
use ember_core::RuleConfig;

/// Compute the post-transition grid.
///
/// Every cell reads its neighbors from `grid` as it was before the step.
/// A live cell whose neighborhood sum lies in the survival band keeps its
/// energy minus `decay`; a cell whose sum equals `birth_sum` is set to
/// `birth_energy`, overriding survival; everything else drops to zero.
pub fn transition(grid: &EnergyGrid, rules: &RuleConfig) -> EnergyGrid {
    let mut next = grid.zeroed_like();

    for (pos, current) in grid.iter() {
        let sum = grid.neighbor_sum(pos, rules.neighborhood);

        let mut energy = 0;
        if current > 0 && rules.survives(sum) {
            energy = current.saturating_sub(rules.decay);
        }
        if sum == rules.birth_sum {
            energy = rules.birth_energy;
        }

        next.set(pos, energy);
    }

    next
}
