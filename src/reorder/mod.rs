//! Dynamic variable reordering: adjacent swap and Rudell sifting
//!
//! The adjacent swap is the primitive every reordering strategy builds
//! on: it exchanges two neighboring variables in the ordering and
//! rewrites, in place, every node of the upper variable that depends on
//! the lower one, using the one-swap formula. Node identities are
//! preserved, so registered formula roots stay valid; loose edges that
//! are neither registered nor canonical are not protected across a swap.
//!
//! Sifting moves each variable through the whole order and parks it at
//! the position minimizing the live node count. The tagged variant is
//! excluded from reordering: its in-place swap cannot preserve shared
//! don't-care gap edges in one sweep, so every entry point reports the
//! variant as unsupported rather than risking a corrupt diagram.

pub(crate) mod sjt;

use log::{debug, warn};

use crate::error::{ArgumentError, ReorderError, UsageError, VariantError};
use crate::manager::BddManager;
use crate::node::EXPIRY_OBSOLETE;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, NIL, TERMINAL};

impl BddManager {
    fn reject_tagged(&self, operation: &'static str) -> Result<(), ReorderError> {
        if self.kind == DiagramKind::Tzbdd {
            warn!("{} is not supported for tagged managers", operation);
            return Err(VariantError {
                operation,
                kind: self.kind,
            }
            .into());
        }
        Ok(())
    }

    /// Exchange two neighboring variables. `high` must be the direct
    /// bottom neighbor of `low`.
    ///
    /// Every registered formula and every canonical variable/element edge
    /// denotes the same function afterwards; the entire operation cache
    /// set is cleared.
    pub fn swap_adjacent(&mut self, low: VarId, high: VarId) -> Result<(), ReorderError> {
        self.reject_tagged("swap_adjacent")?;
        if self.scratchpad.is_some() {
            return Err(UsageError::ScratchpadActive.into());
        }
        if low == CONST_VAR || high == CONST_VAR || self.get_next(low) != Some(high) {
            return Err(ArgumentError::NotAdjacent { low, high }.into());
        }

        self.caches.clear_all();

        // Snapshot the upper variable's list; the rewrite appends fresh
        // nodes of the lower variable while it runs.
        let mut candidates = Vec::with_capacity(self.vars.var(low).live);
        let mut id = self.vars.var(low).first_node;
        while id != NIL {
            candidates.push(id);
            id = self.arena.node(id).list;
        }

        self.vars.swap_order(low, high);

        // Reset the list to its designated head; survivors are appended
        // back, movers join the other variable's list.
        let head = candidates[0];
        {
            let var = self.vars.var_mut(low);
            var.first_node = head;
            var.last_node = head;
            var.live = 1;
        }
        self.arena.node_mut(head).list = NIL;

        let mut rewritten = 0usize;
        for &id in &candidates[1..] {
            let (e, t) = {
                let node = self.arena.node(id);
                (node.low, node.high)
            };
            let e_var = self.arena.node(e.node).var;
            let t_var = self.arena.node(t.node).var;
            if e_var != high && t_var != high {
                // No dependency on the other variable: the node keeps its
                // position relative to both orders.
                self.relink(low, id);
                continue;
            }
            let (f00, f01) = self.swap_cofactors(e, high);
            let (f10, f11) = self.swap_cofactors(t, high);
            if e_var == high {
                self.obsolete_node(e.node);
            }
            if t_var == high {
                self.obsolete_node(t.node);
            }
            let pf = self.foa_node(low, f00, f10, false)?;
            let pt = self.foa_node(low, f01, f11, false)?;
            self.table.unlink(&mut self.arena, id);
            {
                let node = self.arena.node_mut(id);
                node.var = high;
                node.low = pf;
                node.high = pt;
            }
            self.table.insert(&mut self.arena, id);
            self.relink(high, id);
            rewritten += 1;
        }
        debug!(
            "swapped {} and {}, rewrote {} nodes",
            low, high, rewritten
        );

        // Replaced children may be shared; resurrect everything a formula
        // or canonical edge still reaches.
        for i in 0..self.formulas.len() {
            let (root, expiry, deleted) = {
                let entry = self.formulas.entry(i);
                (entry.root, entry.expiry, entry.deleted)
            };
            if deleted || (expiry != 0 && expiry < self.system_age) {
                continue;
            }
            let lift = if expiry == 0 { 0 } else { expiry.max(self.system_age) };
            self.prolong_force(root, lift);
        }
        for v in 1..self.vars.len() as VarId {
            if let Some(e) = self.vars.var(v).var_edge {
                self.prolong_force(e, 0);
            }
            if let Some(e) = self.vars.var(v).elem_edge {
                self.prolong_force(e, 0);
            }
        }
        Ok(())
    }

    /// Shannon cofactors of a child edge with respect to the variable
    /// moving up, per the variant's elision rule.
    fn swap_cofactors(&self, c: Edge, v: VarId) -> (Edge, Edge) {
        let node = self.arena.node(c.node);
        if node.var == v {
            match self.kind {
                DiagramKind::Robdd => (node.low, node.high),
                DiagramKind::RobddC => {
                    if c.mark {
                        (node.low.flipped(), node.high.flipped())
                    } else {
                        (node.low, node.high)
                    }
                }
                DiagramKind::Zbdd => (node.low, node.high),
                DiagramKind::ZbddC => {
                    // The empty-combination toggle rides the else branch.
                    if c.mark {
                        (node.low.flipped(), node.high)
                    } else {
                        (node.low, node.high)
                    }
                }
                DiagramKind::Tzbdd => unreachable!("tagged swap is rejected up front"),
            }
        } else {
            match self.kind {
                DiagramKind::Robdd | DiagramKind::RobddC => (c, c),
                DiagramKind::Zbdd | DiagramKind::ZbddC => (c, self.zero()),
                DiagramKind::Tzbdd => unreachable!("tagged swap is rejected up front"),
            }
        }
    }

    fn obsolete_node(&mut self, id: NodeId) {
        if id != TERMINAL {
            self.arena.node_mut(id).expiry = EXPIRY_OBSOLETE;
        }
    }

    fn relink(&mut self, v: VarId, id: NodeId) {
        self.arena.node_mut(id).list = NIL;
        let var = self.vars.var_mut(v);
        if var.first_node == NIL {
            var.first_node = id;
        } else {
            self.arena.node_mut(var.last_node).list = id;
        }
        var.last_node = id;
        var.live += 1;
    }

    /// Swap and immediately collect the garbage the rewrite produced,
    /// bounded to the two touched positions.
    fn swap_and_collect(&mut self, low: VarId, high: VarId) -> Result<(), ReorderError> {
        self.swap_adjacent(low, high)?;
        // After the swap `high` sits on top of `low`.
        let below = self.vars.next_in_order(low);
        self.gc(below, high, false, true)?;
        Ok(())
    }

    fn move_up(&mut self, v: VarId) -> Result<bool, ReorderError> {
        match self.get_prev(v) {
            Some(p) => {
                self.swap_and_collect(p, v)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn move_down(&mut self, v: VarId) -> Result<bool, ReorderError> {
        match self.get_next(v) {
            Some(n) => {
                self.swap_and_collect(v, n)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rudell sifting.
    ///
    /// Without a formula name the total live node count is minimized.
    /// With a name, sifting runs in a temporary manager holding only that
    /// formula and the resulting order is applied here. Returns whether
    /// the final count improved on the initial one.
    pub fn sifting(&mut self, f: Option<&str>, converge: bool) -> Result<bool, ReorderError> {
        self.reject_tagged("sifting")?;
        if self.scratchpad.is_some() {
            return Err(UsageError::ScratchpadActive.into());
        }
        match f {
            None => self.sift_all(converge),
            Some(name) => {
                let idx = self.find_formula(name).ok_or(ArgumentError::FormulaNotFound {
                    name: name.to_string(),
                })?;
                let root = self.formulas.root_of(idx);
                let mut tmp = BddManager::init(self.kind);
                let tmp_root = crate::convert::copy(self, &mut tmp, root, false)?;
                tmp.add_formula(None, tmp_root, 0).expect("anonymous formula");
                let improved = tmp.sift_all(converge)?;
                let order: Vec<String> = tmp
                    .vars
                    .order()
                    .into_iter()
                    .map(|v| tmp.vars.var(v).name.to_string())
                    .collect();
                let target: Vec<VarId> = order
                    .iter()
                    .filter_map(|n| self.get_variable(n))
                    .collect();
                self.apply_order(&target)?;
                Ok(improved)
            }
        }
    }

    /// Full total collection followed by sifting.
    pub fn purge_and_reorder(
        &mut self,
        f: Option<&str>,
        converge: bool,
    ) -> Result<(), ReorderError> {
        self.purge().map_err(ReorderError::Usage)?;
        if self.kind == DiagramKind::Tzbdd {
            // Reordering would invalidate externally held top tags.
            warn!("skipping reordering for a tagged manager");
            return Ok(());
        }
        self.sifting(f, converge)?;
        Ok(())
    }

    fn sift_all(&mut self, converge: bool) -> Result<bool, ReorderError> {
        self.caches.set_enabled(false);
        self.caches.clear_all();
        self.gc(CONST_VAR, CONST_VAR, false, true)
            .map_err(ReorderError::Usage)?;

        let initial = self.num_live;
        let result = self.sift_sweeps(converge);
        self.caches.set_enabled(true);
        result?;
        debug!("sifting: {} -> {} live nodes", initial, self.num_live);
        Ok(self.num_live < initial)
    }

    fn sift_sweeps(&mut self, converge: bool) -> Result<(), ReorderError> {
        loop {
            for v in 1..self.vars.len() as VarId {
                self.vars.var_mut(v).sifted = false;
            }
            let before = self.num_live;
            while let Some(v) = self.pick_unsifted() {
                self.sift_one(v)?;
                self.vars.var_mut(v).sifted = true;
            }
            if !converge {
                return Ok(());
            }
            // Keep iterating only while a sweep still pays for itself.
            if (self.num_live as f64) * self.tuning.converge_max_growth >= before as f64 {
                return Ok(());
            }
        }
    }

    /// The unsifted variable with the greatest live node count.
    fn pick_unsifted(&self) -> Option<VarId> {
        let mut best: Option<(VarId, usize)> = None;
        for v in 1..self.vars.len() as VarId {
            let var = self.vars.var(v);
            if var.sifted {
                continue;
            }
            if best.map_or(true, |(_, live)| var.live > live) {
                best = Some((v, var.live));
            }
        }
        best.map(|(v, _)| v)
    }

    /// Move one variable through the order and park it at the best
    /// position observed.
    fn sift_one(&mut self, v: VarId) -> Result<(), ReorderError> {
        let n = self.num_variables() as u32;
        let start = self.vars.rank_of(v);
        let mut best_count = self.num_live;
        let mut best_rank = start;

        // The nearer end first keeps the walk short.
        let down_first = start >= n / 2;
        for phase in 0..2 {
            let down = down_first == (phase == 0);
            loop {
                let moved = if down { self.move_down(v)? } else { self.move_up(v)? };
                if !moved {
                    break;
                }
                if self.num_live < best_count {
                    best_count = self.num_live;
                    best_rank = self.vars.rank_of(v);
                }
                if self.num_live as f64 > self.tuning.sift_max_growth * best_count as f64 {
                    break;
                }
            }
            // Walk back to the starting rank before the opposite phase.
            if phase == 0 {
                self.move_to_rank(v, start)?;
            }
        }
        self.move_to_rank(v, best_rank)?;
        Ok(())
    }

    fn move_to_rank(&mut self, v: VarId, rank: u32) -> Result<(), ReorderError> {
        while self.vars.rank_of(v) > rank {
            if !self.move_up(v)? {
                break;
            }
        }
        while self.vars.rank_of(v) < rank {
            if !self.move_down(v)? {
                break;
            }
        }
        Ok(())
    }

    /// Rearrange the ordering to match `target` (top to bottom) by
    /// adjacent swaps.
    pub(crate) fn apply_order(&mut self, target: &[VarId]) -> Result<(), ReorderError> {
        for (i, &v) in target.iter().enumerate() {
            while self.vars.rank_of(v) > i as u32 {
                let p = self
                    .get_prev(v)
                    .expect("a variable above its target rank has a predecessor");
                self.swap_and_collect(p, v)?;
            }
        }
        Ok(())
    }

    /// Exhaustively search every variable ordering for the one minimizing
    /// the named formula's node count.
    ///
    /// Enumerates all `n!` orderings by adjacent swaps; feasible for
    /// small domains only.
    pub fn minimize_bdd(&mut self, name: &str) -> Result<(), ReorderError> {
        self.exhaustive_search(name, false)
    }

    /// Exhaustively search for the ordering maximizing the named
    /// formula's node count (used to probe worst-case behaviour).
    pub fn maximize_bdd(&mut self, name: &str) -> Result<(), ReorderError> {
        self.exhaustive_search(name, true)
    }

    fn exhaustive_search(&mut self, name: &str, maximize: bool) -> Result<(), ReorderError> {
        self.reject_tagged("exhaustive reordering")?;
        let idx = self.find_formula(name).ok_or(ArgumentError::FormulaNotFound {
            name: name.to_string(),
        })?;
        self.sjt_init()?;
        let root = self.formulas.root_of(idx);
        let mut best_count = self.count_nodes(root);
        let mut best_order = self.vars.order();
        loop {
            let stepped = self.sjt_step()?;
            if !stepped {
                break;
            }
            let count = self.count_nodes(self.formulas.root_of(idx));
            let better = if maximize {
                count > best_count
            } else {
                count < best_count
            };
            if better {
                best_count = count;
                best_order = self.vars.order();
            }
        }
        self.sjt_exit();
        self.apply_order(&best_order)?;
        Ok(())
    }
}
