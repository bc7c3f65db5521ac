//! Unique node table and the canonical node constructor
//!
//! The table is an open hash table of bucket heads whose chains run
//! intrusively through the `next`/`prev` fields of the nodes themselves.
//! The table size is always of the form `2^k - 1`; chains are kept sorted
//! by variable so a miss can stop early.
//!
//! `foa_node` is the canonicalizing find-or-add constructor: it applies
//! the variant's reduction rule and complement-edge normalization, then
//! consults the table. `foa_node_raw` skips both and inserts the node
//! exactly as given; cross-manager conversion and the reordering
//! internals use it.

use log::warn;

use crate::error::{CapacityError, NodeError, UsageError};
use crate::node::NodeArena;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, NIL};

use super::BddManager;

/// Open hash table mapping `(variable, else, then)` to the canonical node.
pub(crate) struct UniqueTable {
    buckets: Vec<NodeId>,
    seed: u64,
}

impl UniqueTable {
    pub fn new(size: usize, seed: u64) -> Self {
        debug_assert!((size + 1).is_power_of_two(), "table size must be 2^k - 1");
        UniqueTable {
            buckets: vec![NIL; size],
            seed,
        }
    }

    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Replace the bucket array with a larger one; the caller rehashes the
    /// survivors through [`UniqueTable::insert`].
    pub fn reset(&mut self, size: usize) {
        debug_assert!((size + 1).is_power_of_two(), "table size must be 2^k - 1");
        self.buckets.clear();
        self.buckets.resize(size, NIL);
    }

    fn edge_bits(e: Edge) -> u64 {
        (e.node as u64) ^ ((e.tag as u64) << 32) ^ ((e.mark as u64) << 63)
    }

    fn bucket_of(&self, var: VarId, low: Edge, high: Edge) -> usize {
        let mut h = self.seed ^ ((var as u64) << 1);
        h = (h ^ Self::edge_bits(low)).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        h = (h ^ Self::edge_bits(high)).wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
        h ^= h >> 31;
        (h % self.buckets.len() as u64) as usize
    }

    /// Find the canonical node for the triple, if present.
    pub fn lookup(&self, arena: &NodeArena, var: VarId, low: Edge, high: Edge) -> Option<NodeId> {
        let mut cur = self.buckets[self.bucket_of(var, low, high)];
        while cur != NIL {
            let node = arena.node(cur);
            if node.var > var {
                break;
            }
            if node.var == var && node.low == low && node.high == high {
                return Some(cur);
            }
            cur = node.next;
        }
        None
    }

    /// Chain a node into its bucket, keeping the chain sorted by variable.
    pub fn insert(&mut self, arena: &mut NodeArena, id: NodeId) {
        let (var, low, high) = {
            let node = arena.node(id);
            (node.var, node.low, node.high)
        };
        let bucket = self.bucket_of(var, low, high);
        let mut prev = NIL;
        let mut cur = self.buckets[bucket];
        while cur != NIL && arena.node(cur).var < var {
            prev = cur;
            cur = arena.node(cur).next;
        }
        {
            let node = arena.node_mut(id);
            node.next = cur;
            node.prev = prev;
        }
        if cur != NIL {
            arena.node_mut(cur).prev = id;
        }
        if prev == NIL {
            self.buckets[bucket] = id;
        } else {
            arena.node_mut(prev).next = id;
        }
    }

    /// Remove a node from its bucket chain.
    pub fn unlink(&mut self, arena: &mut NodeArena, id: NodeId) {
        let (var, low, high, prev, next) = {
            let node = arena.node(id);
            (node.var, node.low, node.high, node.prev, node.next)
        };
        if prev == NIL {
            let bucket = self.bucket_of(var, low, high);
            debug_assert_eq!(self.buckets[bucket], id);
            self.buckets[bucket] = next;
        } else {
            arena.node_mut(prev).next = next;
        }
        if next != NIL {
            arena.node_mut(next).prev = prev;
        }
        let node = arena.node_mut(id);
        node.next = NIL;
        node.prev = NIL;
    }
}

impl BddManager {
    /// Canonicalizing find-or-add node constructor.
    ///
    /// Applies the variant's reduction rule and, for the complement-edge
    /// variants, the mark normalization, then returns the unique edge for
    /// the requested node. For the tagged variant the result carries the
    /// tag `v`; use [`BddManager::foa_node_tagged`] to request another top
    /// tag.
    pub fn foa_node(
        &mut self,
        v: VarId,
        low: Edge,
        high: Edge,
        gc_allowed: bool,
    ) -> Result<Edge, NodeError> {
        self.foa_node_tagged(v, low, high, v, gc_allowed)
    }

    /// Canonicalizing constructor with an explicit result tag.
    ///
    /// `ptag` is meaningful for the tagged variant only: the returned edge
    /// zero-suppresses every variable from `ptag` down to `v`. The other
    /// variants ignore it.
    pub fn foa_node_tagged(
        &mut self,
        v: VarId,
        low: Edge,
        high: Edge,
        ptag: VarId,
        gc_allowed: bool,
    ) -> Result<Edge, NodeError> {
        if self.scratchpad.is_some() {
            warn!("foa_node called while a local-info scratchpad is active");
            return Err(UsageError::ScratchpadActive.into());
        }
        debug_assert!(
            v != CONST_VAR,
            "the constant variable labels only the terminal"
        );
        debug_assert!(
            low.is_terminal() || self.vars.is_smaller(v, self.arena.node(low.node).var),
            "ordering violated on the else child"
        );
        debug_assert!(
            high.is_terminal() || self.vars.is_smaller(v, self.arena.node(high.node).var),
            "ordering violated on the then child"
        );

        match self.kind {
            DiagramKind::Robdd => {
                if low == high {
                    return Ok(low);
                }
                self.find_or_add(v, low, high, gc_allowed).map(Edge::new)
            }
            DiagramKind::RobddC => {
                let mut low = low;
                let mut high = high;
                let mut mark_out = false;
                // The then-edge never carries a mark; push it up.
                if high.mark {
                    mark_out = true;
                    low = low.flipped();
                    high = high.unmarked();
                }
                if low == high {
                    return Ok(if mark_out { low.flipped() } else { low });
                }
                let id = self.find_or_add(v, low, high, gc_allowed)?;
                Ok(Edge {
                    node: id,
                    mark: mark_out,
                    tag: CONST_VAR,
                })
            }
            DiagramKind::Zbdd => {
                if high == self.zero() {
                    return Ok(low);
                }
                self.find_or_add(v, low, high, gc_allowed).map(Edge::new)
            }
            DiagramKind::ZbddC => {
                let mut low = low;
                let mut mark_out = false;
                // The else-edge never carries a mark; the empty-combination
                // toggle moves onto the incoming edge unchanged.
                if low.mark {
                    mark_out = true;
                    low = low.unmarked();
                }
                if high == self.zero() {
                    return Ok(if mark_out { low.flipped() } else { low });
                }
                let id = self.find_or_add(v, low, high, gc_allowed)?;
                Ok(Edge {
                    node: id,
                    mark: mark_out,
                    tag: CONST_VAR,
                })
            }
            DiagramKind::Tzbdd => self.foa_tzbdd(v, low, high, ptag, gc_allowed),
        }
    }

    /// Tagged-variant reduction: absorb an empty then-edge into the tag
    /// range when the zero range stays contiguous, and elide an
    /// equal-children node when the intended tag equals its variable.
    fn foa_tzbdd(
        &mut self,
        v: VarId,
        low: Edge,
        high: Edge,
        ptag: VarId,
        gc_allowed: bool,
    ) -> Result<Edge, NodeError> {
        debug_assert!(
            ptag == v || self.vars.is_smaller(ptag, v),
            "the tag must not sit below the node variable"
        );
        if high == self.zero() {
            if low == self.zero() {
                return Ok(self.zero());
            }
            let next = self.vars.next_in_order(v);
            if low.tag == next {
                // v joins the contiguous zero range of the else child.
                return Ok(Edge {
                    node: low.node,
                    mark: low.mark,
                    tag: ptag,
                });
            }
            // A don't-care gap below v: the node stays explicit.
        } else if low == high && ptag == v {
            return Ok(low);
        }
        let id = self.find_or_add(v, low, high, gc_allowed)?;
        Ok(Edge {
            node: id,
            mark: false,
            tag: ptag,
        })
    }

    /// Raw find-or-add: no reduction, no normalization.
    ///
    /// Inserts the node exactly as given. Cross-manager conversion and the
    /// reordering internals use this to rebuild structures that are
    /// canonical by construction.
    pub fn foa_node_raw(
        &mut self,
        v: VarId,
        low: Edge,
        high: Edge,
        tag: VarId,
        gc_allowed: bool,
    ) -> Result<Edge, NodeError> {
        if self.scratchpad.is_some() {
            warn!("foa_node_raw called while a local-info scratchpad is active");
            return Err(UsageError::ScratchpadActive.into());
        }
        let id = self.find_or_add(v, low, high, gc_allowed)?;
        Ok(Edge {
            node: id,
            mark: false,
            tag,
        })
    }

    /// Create or find the designated canonical node of a variable: the
    /// `pf = pt = none` case of the node constructor.
    ///
    /// For the ordered variants this is the node of the Boolean function
    /// `v`; for the zero-suppressed variants it is the node of the
    /// combination set `{{v}}`; the tagged variant shares one node
    /// between both readings.
    pub(crate) fn foa_variable_node(&mut self, v: VarId) -> Result<Edge, NodeError> {
        let zero = self.zero();
        let one = self.one();
        match self.kind {
            DiagramKind::Robdd | DiagramKind::RobddC | DiagramKind::Zbdd | DiagramKind::ZbddC => {
                self.foa_node(v, zero, one, false)
            }
            DiagramKind::Tzbdd => {
                // Then-edge tagged with the constant variable: everything
                // below v is don't-care.
                let below = Edge::tagged(one.node, CONST_VAR);
                self.foa_node_tagged(v, zero, below, v, false)
            }
        }
    }

    fn find_or_add(
        &mut self,
        v: VarId,
        low: Edge,
        high: Edge,
        gc_allowed: bool,
    ) -> Result<NodeId, NodeError> {
        if let Some(id) = self.table.lookup(&self.arena, v, low, high) {
            // Keep a recycled hit alive for the current epoch.
            let node = self.arena.node_mut(id);
            if node.expiry != 0 && node.expiry < self.system_age {
                node.expiry = self.system_age;
            }
            return Ok(id);
        }
        let id = self.new_node(gc_allowed)?;
        {
            let node = self.arena.node_mut(id);
            node.var = v;
            node.low = low;
            node.high = high;
            node.expiry = self.system_age;
        }
        self.table.insert(&mut self.arena, id);
        self.vars.append_to_list(&mut self.arena, v, id);
        self.num_live += 1;
        Ok(id)
    }

    /// Acquire a free node slot, collecting garbage (when allowed) or
    /// growing the arena as needed.
    fn new_node(&mut self, gc_allowed: bool) -> Result<NodeId, NodeError> {
        if self.arena.free_len() == 0 {
            let capacity = self.arena.capacity();
            if gc_allowed {
                self.collect_for_space();
            }
            let freed = self.arena.free_len();
            let effective = freed as f64 >= self.tuning.gcr * capacity as f64;
            if freed == 0 || !effective {
                if !self.arena.grow() {
                    return Err(CapacityError {
                        allocated: capacity,
                    }
                    .into());
                }
            }
        }
        self.arena.acquire().ok_or_else(|| {
            CapacityError {
                allocated: self.arena.capacity(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeArena;
    use crate::types::{Edge, VarId, TERMINAL};

    #[test]
    fn test_chain_sorted_by_variable() {
        let mut arena = NodeArena::new(8);
        let mut table = UniqueTable::new(3, 0); // tiny table forces collisions
        let mut make = |arena: &mut NodeArena, var: VarId| {
            let id = arena.acquire().unwrap();
            let node = arena.node_mut(id);
            node.var = var;
            node.low = Edge::new(TERMINAL);
            node.high = Edge::new(TERMINAL).flipped();
            id
        };
        let a = make(&mut arena, 3);
        let b = make(&mut arena, 1);
        let c = make(&mut arena, 2);
        table.insert(&mut arena, a);
        table.insert(&mut arena, b);
        table.insert(&mut arena, c);
        assert_eq!(
            table.lookup(&arena, 2, Edge::new(TERMINAL), Edge::new(TERMINAL).flipped()),
            Some(c)
        );
        table.unlink(&mut arena, c);
        assert_eq!(
            table.lookup(&arena, 2, Edge::new(TERMINAL), Edge::new(TERMINAL).flipped()),
            None
        );
        assert_eq!(
            table.lookup(&arena, 1, Edge::new(TERMINAL), Edge::new(TERMINAL).flipped()),
            Some(b)
        );
        assert_eq!(
            table.lookup(&arena, 3, Edge::new(TERMINAL), Edge::new(TERMINAL).flipped()),
            Some(a)
        );
    }
}
