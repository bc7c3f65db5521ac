//! Age-based garbage collection
//!
//! Every node carries an expiry stamp: 0 means fortified, the current
//! system age means fresh, larger values mean preserved, anything smaller
//! (but nonzero) means obsolete. A sweep keeps exactly the nodes that are
//! reachable from a surviving formula, belong to a canonical
//! variable/element edge, or were explicitly refreshed.
//!
//! Root prolongation stops at nodes that already satisfy the required
//! expiry, so a pass is bounded by the DAG size rather than the path
//! count.

use log::{debug, warn};

use crate::error::UsageError;
use crate::node::EXPIRY_OBSOLETE;
use crate::types::{Edge, VarId, CONST_VAR, NIL, TERMINAL};

use super::{BddManager, MIN_SYSTEM_AGE};

impl BddManager {
    /// Increment the system age: fresh nodes become obsolete, prolonged
    /// nodes become fresh. Obsolete formulas are marked deleted. No nodes
    /// are freed; the next collection does that.
    pub fn clean(&mut self) {
        if self.system_age == u32::MAX {
            self.compact_ages();
        }
        self.system_age += 1;
        self.formulas.mark_obsolete_deleted(self.system_age);
    }

    /// Full collection: drops anonymous formulas and collects every node
    /// not anchored by a surviving formula or a canonical edge, fortified
    /// and preserved nodes included.
    pub fn purge(&mut self) -> Result<(), UsageError> {
        self.gc(CONST_VAR, CONST_VAR, true, true)
    }

    /// Garbage-collect the node table.
    ///
    /// `target_lt`/`target_geq` bound the collection window by ordering
    /// position ([`CONST_VAR`] means unbounded); when a window is given,
    /// only nodes whose variable falls inside it are eligible and the
    /// table never resizes. `purge` first forces every node to the
    /// obsolete stamp so unreachable fortified and preserved nodes fall
    /// too, and drops anonymous formulas. `total` clears the caches
    /// wholesale instead of invalidating entries selectively.
    pub fn gc(
        &mut self,
        target_lt: VarId,
        target_geq: VarId,
        purge: bool,
        total: bool,
    ) -> Result<(), UsageError> {
        if self.scratchpad.is_some() {
            warn!("garbage collection requested while a local-info scratchpad is active");
            return Err(UsageError::ScratchpadActive);
        }
        let windowed = target_lt != CONST_VAR || target_geq != CONST_VAR;
        debug_assert!(!(purge && windowed), "purge ignores collection windows");

        if purge {
            for v in 1..self.vars.len() as VarId {
                let mut id = self.vars.var(v).first_node;
                while id != NIL {
                    let node = self.arena.node_mut(id);
                    node.expiry = EXPIRY_OBSOLETE;
                    id = node.list;
                }
            }
        }

        let dropped = self.formulas.sweep(self.system_age, purge);
        if dropped > 0 {
            debug!("dropped {} formula entries", dropped);
        }

        for i in 0..self.formulas.len() {
            let root = self.formulas.root_of(i);
            let expiry = self.formulas.expiry_of(i);
            self.prolong_rec(root, expiry, target_lt);
        }
        if purge {
            for v in 1..self.vars.len() as VarId {
                self.fortify_canonical_edges(v);
            }
        }

        let freed = self.sweep_nodes(target_lt, target_geq);
        debug!(
            "collected {} nodes, {} live, table size {}",
            freed,
            self.num_live,
            self.table.size()
        );

        if !windowed {
            let ratio = if self.num_live > self.table.size() {
                self.tuning.rr_x
            } else {
                self.tuning.rr
            };
            if self.num_live as f64 > ratio * self.table.size() as f64 {
                self.resize_table();
            }
        }

        if total {
            self.caches.clear_all();
        } else {
            let arena = &self.arena;
            let age = self.system_age;
            self.caches.invalidate_all(|e: Edge| {
                let node = arena.node(e.node);
                node.is_free() || (node.expiry != 0 && node.expiry < age)
            });
        }
        Ok(())
    }

    /// Lift the expiry of everything reachable from `e` to at least
    /// `expiry` (0 fortifies). Stops at nodes that already satisfy the
    /// requirement and, when a window top is given, at variables not
    /// above it.
    pub(crate) fn prolong_rec(&mut self, e: Edge, expiry: u32, target_lt: VarId) {
        let mut stack = vec![e.node];
        while let Some(id) = stack.pop() {
            if id == TERMINAL {
                continue;
            }
            let var = self.arena.node(id).var;
            if target_lt != CONST_VAR && !self.vars.is_smaller(var, target_lt) {
                continue;
            }
            let node = self.arena.node_mut(id);
            let satisfied = if expiry == 0 {
                node.expiry == 0
            } else {
                node.expiry == 0 || node.expiry >= expiry
            };
            if satisfied {
                continue;
            }
            node.expiry = expiry;
            stack.push(node.low.node);
            stack.push(node.high.node);
        }
    }

    /// Unconditional prolongation: lift every node reachable from `e` to
    /// at least `expiry`, visiting each node once by select stamp.
    ///
    /// The expiry-guided walk above assumes expiries are monotone along
    /// edges; the in-place rewrites of an adjacent swap break that
    /// assumption, so the post-swap pass uses this form to resurrect
    /// shared children that were marked obsolete.
    pub(crate) fn prolong_force(&mut self, e: Edge, expiry: u32) {
        let stamp = self.next_select();
        let mut stack = vec![e.node];
        while let Some(id) = stack.pop() {
            if id == TERMINAL {
                continue;
            }
            let node = self.arena.node_mut(id);
            if node.select == stamp {
                continue;
            }
            node.select = stamp;
            if expiry == 0 {
                node.expiry = 0;
            } else if node.expiry != 0 && node.expiry < expiry {
                node.expiry = expiry;
            }
            stack.push(node.low.node);
            stack.push(node.high.node);
        }
    }

    /// Walk the per-variable lists and free every dead node. Returns the
    /// number of collected nodes.
    fn sweep_nodes(&mut self, target_lt: VarId, target_geq: VarId) -> usize {
        let mut freed = 0;
        for v in 1..self.vars.len() as VarId {
            if target_lt != CONST_VAR && !self.vars.is_smaller(v, target_lt) {
                continue;
            }
            if target_geq != CONST_VAR && self.vars.is_smaller(v, target_geq) {
                continue;
            }
            let mut kept_head = NIL;
            let mut kept_tail = NIL;
            let mut id = self.vars.var(v).first_node;
            let mut live = 0;
            while id != NIL {
                let (next, expiry) = {
                    let node = self.arena.node(id);
                    (node.list, node.expiry)
                };
                if expiry == 0 || expiry >= self.system_age {
                    if kept_head == NIL {
                        kept_head = id;
                    } else {
                        self.arena.node_mut(kept_tail).list = id;
                    }
                    self.arena.node_mut(id).list = NIL;
                    kept_tail = id;
                    live += 1;
                } else {
                    self.table.unlink(&mut self.arena, id);
                    self.arena.release(id);
                    freed += 1;
                }
                id = next;
            }
            let var = self.vars.var_mut(v);
            var.first_node = kept_head;
            var.last_node = kept_tail;
            var.live = live;
        }
        self.num_live -= freed;
        freed
    }

    /// Double the unique table and rehash every survivor.
    fn resize_table(&mut self) {
        let new_size = self.table.size() * 2 + 1;
        debug!("resizing unique table to {}", new_size);
        self.table.reset(new_size);
        for v in 1..self.vars.len() as VarId {
            let mut id = self.vars.var(v).first_node;
            while id != NIL {
                let next = self.arena.node(id).list;
                self.table.insert(&mut self.arena, id);
                id = next;
            }
        }
    }

    /// Best-effort collection triggered from the node constructor when the
    /// free list runs dry.
    pub(crate) fn collect_for_space(&mut self) {
        let _ = self.gc(CONST_VAR, CONST_VAR, false, false);
    }

    /// Rewrite every node and formula expiry proportionally so the system
    /// age can restart at its minimum. Triggered on age overflow.
    pub(crate) fn compact_ages(&mut self) {
        let shift = self.system_age - MIN_SYSTEM_AGE;
        if shift == 0 {
            return;
        }
        for v in 1..self.vars.len() as VarId {
            let mut id = self.vars.var(v).first_node;
            while id != NIL {
                let node = self.arena.node_mut(id);
                if node.expiry != 0 {
                    node.expiry = node.expiry.saturating_sub(shift).max(EXPIRY_OBSOLETE);
                }
                id = node.list;
            }
        }
        self.formulas.compact_expiries(shift);
        self.system_age = MIN_SYSTEM_AGE;
    }
}
