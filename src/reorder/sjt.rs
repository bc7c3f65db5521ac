//! Steinhaus–Johnson–Trotter enumeration of variable orderings
//!
//! Each variable carries a direction flag; one step swaps the largest
//! mobile variable with the neighbor it looks at and reverses the
//! direction of every larger variable. Iterating from `sjt_init` visits
//! all `n!` orderings by adjacent swaps, which the exhaustive
//! minimize/maximize searches build on.

use crate::error::ReorderError;
use crate::manager::BddManager;
use crate::types::VarId;

/// Enumeration state: permutation values and direction flags.
pub(crate) struct SjtState {
    /// Value per variable (its rank when the enumeration started)
    value: Vec<u32>,
    /// Direction per variable: true looks topward
    up: Vec<bool>,
}

impl BddManager {
    /// Start a permutation enumeration from the current ordering.
    pub fn sjt_init(&mut self) -> Result<(), ReorderError> {
        let mut value = vec![0; self.vars.len()];
        for v in 1..self.vars.len() as VarId {
            value[v as usize] = self.vars.rank_of(v);
        }
        // Every variable starts looking topward.
        let up = vec![true; self.vars.len()];
        self.sjt = Some(SjtState { value, up });
        Ok(())
    }

    /// Perform one enumeration step: swap the largest mobile variable
    /// with the neighbor it looks at. Returns `false` when no variable is
    /// mobile, i.e. every ordering has been visited.
    pub fn sjt_step(&mut self) -> Result<bool, ReorderError> {
        if self.sjt.is_none() {
            return Ok(false);
        }
        let Some(mobile) = self.sjt_largest_mobile() else {
            return Ok(false);
        };
        let up = self.sjt.as_ref().expect("enumeration started").up[mobile as usize];
        if up {
            let neighbor = self.get_prev(mobile).expect("mobile variable has a neighbor");
            self.swap_adjacent(neighbor, mobile)?;
        } else {
            let neighbor = self.get_next(mobile).expect("mobile variable has a neighbor");
            self.swap_adjacent(mobile, neighbor)?;
        }
        let state = self.sjt.as_mut().expect("enumeration started");
        let moved_value = state.value[mobile as usize];
        for v in 1..state.value.len() {
            if state.value[v] > moved_value {
                state.up[v] = !state.up[v];
            }
        }
        Ok(true)
    }

    /// Finish the enumeration and drop its state.
    pub fn sjt_exit(&mut self) {
        self.sjt = None;
    }

    /// The mobile variable with the greatest value, if any. A variable is
    /// mobile when the neighbor it looks at carries a smaller value.
    fn sjt_largest_mobile(&self) -> Option<VarId> {
        let state = self.sjt.as_ref().expect("enumeration started");
        let mut best: Option<(VarId, u32)> = None;
        for v in 1..self.vars.len() as VarId {
            let value = state.value[v as usize];
            let neighbor = if state.up[v as usize] {
                self.get_prev(v)
            } else {
                self.get_next(v)
            };
            let mobile = neighbor
                .map(|n| state.value[n as usize] < value)
                .unwrap_or(false);
            if mobile && best.map_or(true, |(_, b)| value > b) {
                best = Some((v, value));
            }
        }
        best.map(|(v, _)| v)
    }
}
