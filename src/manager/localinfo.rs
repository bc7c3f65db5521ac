//! Per-traversal local-info scratchpad
//!
//! A scratchpad gives a top-level query auxiliary storage per node:
//! multi-precision minterm counts, path sums, copy pointers, enumerator
//! indices and selection bits. Activating it hijacks each node's `list`
//! link to index into the pad and saves the original link in `org`;
//! deactivating restores the links. Exactly one scratchpad may exist per
//! manager, and no garbage collection or node construction may happen
//! while it is active.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rustc_hash::FxHashSet;

use crate::error::UsageError;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, TERMINAL};

use super::BddManager;

/// Per-node auxiliary record.
pub(crate) struct LocalCell {
    /// The node this cell belongs to
    pub back: NodeId,
    /// The hijacked `list` link, restored on release
    pub org: NodeId,
    /// Memoized minterm/combination count of the unmarked node
    pub minterms: Option<BigUint>,
    /// Memoized paths to the one terminal
    pub path1: f64,
    /// Memoized paths to the zero terminal
    pub path0: f64,
    /// Whether the path sums are filled in
    pub paths_valid: bool,
    /// Copy pointer into a destination manager
    pub copy: Option<Edge>,
    /// Enumerator index for cube walks
    pub enumerator: u32,
    /// Selection bit
    pub selected: bool,
}

pub(crate) struct LocalInfo {
    pub root: Edge,
    pub cells: Vec<LocalCell>,
}

impl BddManager {
    /// Allocate the local-info scratchpad for the diagram rooted at `f`.
    ///
    /// Returns the number of distinct variables in the diagram. Fails if a
    /// scratchpad already exists.
    pub fn create_local_info(&mut self, f: Edge) -> Result<u32, UsageError> {
        if self.scratchpad.is_some() {
            return Err(UsageError::ScratchpadExists);
        }
        let stamp = self.next_select();
        let mut ids = Vec::new();
        let mut vars_seen: FxHashSet<VarId> = FxHashSet::default();
        let mut stack = vec![f.node];
        while let Some(id) = stack.pop() {
            if id == TERMINAL {
                continue;
            }
            let node = self.arena.node_mut(id);
            if node.select == stamp {
                continue;
            }
            node.select = stamp;
            vars_seen.insert(node.var);
            ids.push(id);
            let (low, high) = (node.low, node.high);
            stack.push(low.node);
            stack.push(high.node);
        }
        let mut cells = Vec::with_capacity(ids.len());
        for (idx, &id) in ids.iter().enumerate() {
            let node = self.arena.node_mut(id);
            cells.push(LocalCell {
                back: id,
                org: node.list,
                minterms: None,
                path1: 0.0,
                path0: 0.0,
                paths_valid: false,
                copy: None,
                enumerator: 0,
                selected: false,
            });
            node.list = idx as NodeId;
        }
        self.scratchpad = Some(LocalInfo { root: f, cells });
        Ok(vars_seen.len() as u32)
    }

    /// Release the scratchpad, restoring every hijacked `list` link.
    pub fn delete_local_info(&mut self) -> Result<(), UsageError> {
        let pad = self.scratchpad.take().ok_or(UsageError::ScratchpadActive)?;
        for cell in &pad.cells {
            self.arena.node_mut(cell.back).list = cell.org;
        }
        Ok(())
    }

    /// Whether a scratchpad is currently active.
    pub fn has_local_info(&self) -> bool {
        self.scratchpad.is_some()
    }

    /// Root the active scratchpad was created for.
    pub fn local_info_root(&self) -> Option<Edge> {
        self.scratchpad.as_ref().map(|pad| pad.root)
    }

    fn cell_of(&self, node: NodeId) -> usize {
        debug_assert_ne!(node, TERMINAL);
        self.arena.node(node).list as usize
    }

    /// Copy pointer stored for a node.
    pub(crate) fn local_copy_of(&self, node: NodeId) -> Option<Edge> {
        self.scratchpad.as_ref().expect("scratchpad active").cells[self.cell_of(node)].copy
    }

    /// Store a copy pointer for a node.
    pub(crate) fn set_local_copy(&mut self, node: NodeId, copy: Edge) {
        let idx = self.cell_of(node);
        self.scratchpad.as_mut().expect("scratchpad active").cells[idx].copy = Some(copy);
    }

    /// Enumerator index stored for a node.
    pub fn local_enumerator(&self, node: NodeId) -> u32 {
        self.scratchpad.as_ref().expect("scratchpad active").cells[self.cell_of(node)].enumerator
    }

    /// Store an enumerator index for a node.
    pub fn set_local_enumerator(&mut self, node: NodeId, value: u32) {
        let idx = self.cell_of(node);
        self.scratchpad.as_mut().expect("scratchpad active").cells[idx].enumerator = value;
    }

    /// Selection bit stored for a node.
    pub fn local_selected(&self, node: NodeId) -> bool {
        self.scratchpad.as_ref().expect("scratchpad active").cells[self.cell_of(node)].selected
    }

    /// Set the selection bit for a node.
    pub fn set_local_selected(&mut self, node: NodeId, selected: bool) {
        let idx = self.cell_of(node);
        self.scratchpad.as_mut().expect("scratchpad active").cells[idx].selected = selected;
    }

    /// Ordering position used by the counting walks; the constant variable
    /// sits at position `num_variables`.
    fn order_pos(&self, v: VarId) -> u32 {
        if v == CONST_VAR {
            self.num_variables() as u32
        } else {
            self.vars.rank_of(v)
        }
    }

    /// Count the minterms of `f` over the manager's domain.
    ///
    /// For the ordered variants this is the number of satisfying
    /// assignments; for the zero-suppressed variants it is the number of
    /// stored combinations; the tagged variant counts satisfying
    /// assignments of the Boolean reading.
    pub fn count_minterms(&mut self, f: Edge) -> Result<BigUint, UsageError> {
        self.create_local_info(f)?;
        let result = match self.kind {
            DiagramKind::Robdd | DiagramKind::RobddC => self.minterms_shannon(f, 0),
            DiagramKind::Zbdd | DiagramKind::ZbddC => self.combinations(f),
            DiagramKind::Tzbdd => self.minterms_tagged(f, 0),
        };
        self.delete_local_info()?;
        Ok(result)
    }

    /// Minterm count of an ordered-BDD edge over positions
    /// `[from_pos, n)`.
    fn minterms_shannon(&mut self, e: Edge, from_pos: u32) -> BigUint {
        let n = self.num_variables() as u32;
        let top = self.order_pos(self.arena.node(e.node).var);
        let node_count = if e.node == TERMINAL {
            BigUint::one()
        } else {
            let idx = self.cell_of(e.node);
            if let Some(c) = self
                .scratchpad
                .as_ref()
                .expect("scratchpad active")
                .cells[idx]
                .minterms
                .clone()
            {
                c
            } else {
                let (low, high) = {
                    let node = self.arena.node(e.node);
                    (node.low, node.high)
                };
                let c = self.minterms_shannon(low, top + 1) + self.minterms_shannon(high, top + 1);
                self.scratchpad.as_mut().expect("scratchpad active").cells[idx].minterms =
                    Some(c.clone());
                c
            }
        };
        let node_count = if e.mark {
            (BigUint::one() << (n - top)) - node_count
        } else {
            node_count
        };
        node_count << (top - from_pos)
    }

    /// Combination count of a zero-suppressed edge.
    fn combinations(&mut self, e: Edge) -> BigUint {
        let base = self.combinations_node(e.node);
        if e.mark {
            // The mark toggles the empty combination.
            if self.empty_in_node(e.node) {
                base - BigUint::one()
            } else {
                base + BigUint::one()
            }
        } else {
            base
        }
    }

    fn combinations_node(&mut self, node: NodeId) -> BigUint {
        if node == TERMINAL {
            return BigUint::one();
        }
        let idx = self.cell_of(node);
        if let Some(c) = self
            .scratchpad
            .as_ref()
            .expect("scratchpad active")
            .cells[idx]
            .minterms
            .clone()
        {
            return c;
        }
        let (low, high) = {
            let n = self.arena.node(node);
            (n.low, n.high)
        };
        let c = self.combinations(low) + self.combinations(high);
        self.scratchpad.as_mut().expect("scratchpad active").cells[idx].minterms = Some(c.clone());
        c
    }

    /// Whether the empty combination is in the set rooted at a node.
    fn empty_in_node(&self, node: NodeId) -> bool {
        if node == TERMINAL {
            return true;
        }
        let low = self.arena.node(node).low;
        low.mark ^ self.empty_in_node(low.node)
    }

    /// Minterm count of a tagged edge over positions `[from_pos, n)`:
    /// variables above the tag double the count, the zero-suppressed range
    /// contributes nothing.
    fn minterms_tagged(&mut self, e: Edge, from_pos: u32) -> BigUint {
        if e.mark {
            debug_assert_eq!(e.node, TERMINAL);
            return BigUint::zero();
        }
        let tag_pos = self.order_pos(e.tag);
        let node_count = if e.node == TERMINAL {
            BigUint::one()
        } else {
            let idx = self.cell_of(e.node);
            if let Some(c) = self
                .scratchpad
                .as_ref()
                .expect("scratchpad active")
                .cells[idx]
                .minterms
                .clone()
            {
                c
            } else {
                let top = self.order_pos(self.arena.node(e.node).var);
                let (low, high) = {
                    let node = self.arena.node(e.node);
                    (node.low, node.high)
                };
                let c = self.minterms_tagged(low, top + 1) + self.minterms_tagged(high, top + 1);
                self.scratchpad.as_mut().expect("scratchpad active").cells[idx].minterms =
                    Some(c.clone());
                c
            }
        };
        node_count << (tag_pos - from_pos)
    }

    /// Sum of paths to the one and zero terminals, in that order.
    pub fn count_paths(&mut self, f: Edge) -> Result<(f64, f64), UsageError> {
        self.create_local_info(f)?;
        let result = self.paths_rec(f);
        self.delete_local_info()?;
        Ok(result)
    }

    fn paths_rec(&mut self, e: Edge) -> (f64, f64) {
        if e.node == TERMINAL {
            return if e.mark { (0.0, 1.0) } else { (1.0, 0.0) };
        }
        let idx = self.cell_of(e.node);
        let memo = {
            let cell = &self.scratchpad.as_ref().expect("scratchpad active").cells[idx];
            cell.paths_valid.then_some((cell.path1, cell.path0))
        };
        let (p1, p0) = match memo {
            Some(p) => p,
            None => {
                let (low, high) = {
                    let n = self.arena.node(e.node);
                    (n.low, n.high)
                };
                let (l1, l0) = self.paths_rec(low);
                let (h1, h0) = self.paths_rec(high);
                let p = (l1 + h1, l0 + h0);
                let cell = &mut self.scratchpad.as_mut().expect("scratchpad active").cells[idx];
                cell.path1 = p.0;
                cell.path0 = p.1;
                cell.paths_valid = true;
                p
            }
        };
        if e.mark {
            (p0, p1)
        } else {
            (p1, p0)
        }
    }
}
