//! The BDD manager: node table, variables, formulas, GC and caches
//!
//! A manager embodies one diagram instance: the unique node table with
//! canonical hash-consed nodes, the variable table with its dynamic
//! ordering, the formula registry anchoring garbage collection, the
//! age-based collector and the operation caches. The diagram variant is
//! chosen at construction and fixed for the manager's life.
//!
//! Managers are single-threaded; independent managers may live on
//! different threads, and data moves between them only through the
//! explicit copy and conversion entry points in [`crate::convert`].
//!
//! # Examples
//!
//! ```
//! use polybdd::{BddManager, DiagramKind};
//!
//! let mut mgr = BddManager::init(DiagramKind::Robdd);
//! let x = mgr.add_variable_by_name(Some("x")).unwrap();
//! let y = mgr.add_variable_by_name(Some("y")).unwrap();
//!
//! assert!(mgr.is_smaller(x, y));
//! let fx = mgr.variable_edge(x).unwrap();
//! mgr.add_formula(Some("f_x"), fx, 0).unwrap();
//! assert!(mgr.find_formula("f_x").is_some());
//! ```

pub mod cache;
pub(crate) mod formulas;
pub(crate) mod gc;
pub(crate) mod localinfo;
pub(crate) mod unique;
pub(crate) mod variables;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, RwLock, Weak};

use rand::Rng;

use crate::node::NodeArena;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, TERMINAL};

use cache::CacheSet;
use formulas::FormulaTable;
use localinfo::LocalInfo;
use unique::UniqueTable;
use variables::VariableTable;

/// Nodes per arena growth block.
const NODE_BLOCK_SIZE: usize = 8192;

/// Initial unique-table size; always of the form 2^k - 1.
const INITIAL_TABLE_SIZE: usize = (1 << 14) - 1;

/// The minimum legal system age; ages 0 and 1 are reserved for the
/// fortified and obsolete expiry stamps.
pub(crate) const MIN_SYSTEM_AGE: u32 = 2;

/// Heuristic knobs controlling GC and reordering behaviour.
///
/// These only steer heuristics; they never change correctness. Every
/// setter ignores negative inputs, so a caller can update a subset of the
/// ratios in one call.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// GC effectiveness ratio: a sweep freeing a smaller fraction of the
    /// table than this grows the arena instead of sweeping again.
    pub gcr: f64,
    /// GC effectiveness ratio applied while a fresh variable exists
    pub gcr_f: f64,
    /// GC effectiveness ratio applied when the table is extremely loaded
    pub gcr_x: f64,
    /// Resize ratio: the unique table is doubled when the live node count
    /// exceeds this fraction of the table size.
    pub rr: f64,
    /// Resize ratio applied while a fresh variable exists
    pub rr_f: f64,
    /// Resize ratio applied when the table is extremely loaded
    pub rr_x: f64,
    /// Sifting growth bound: a sift move stops once the live node count
    /// exceeds this multiple of the best count seen.
    pub sift_max_growth: f64,
    /// Growth bound applied to the outer converge-sifting loop
    pub converge_max_growth: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            gcr: 0.67,
            gcr_f: 0.83,
            gcr_x: 0.91,
            rr: 0.89,
            rr_f: 0.89,
            rr_x: 0.50,
            sift_max_growth: 1.05,
            converge_max_growth: 1.01,
        }
    }
}

/// Process-wide anonymous manager, revived on demand.
///
/// The weak reference lets the manager drop once no handle uses it; a new
/// one is created on the next request. Always prefer explicit managers;
/// the anonymous handle exists for convenience in small programs.
static ANONYMOUS_MANAGER: Mutex<Weak<RwLock<BddManager>>> = Mutex::new(Weak::new());

/// A BDD manager holding one diagram of the selected variant.
pub struct BddManager {
    pub(crate) kind: DiagramKind,
    pub(crate) arena: NodeArena,
    pub(crate) table: UniqueTable,
    pub(crate) vars: VariableTable,
    pub(crate) formulas: FormulaTable,
    pub(crate) caches: CacheSet,
    pub(crate) system_age: u32,
    pub(crate) select_stamp: u32,
    pub(crate) scratchpad: Option<LocalInfo>,
    pub(crate) tuning: Tuning,
    pub(crate) num_live: usize,
    pub(crate) sjt: Option<crate::reorder::sjt::SjtState>,
    zero: Edge,
    one: Edge,
}

impl BddManager {
    /// Create a manager of the given variant.
    ///
    /// The node table starts at a Mersenne-like size with one pre-allocated
    /// node block; the terminal node occupies slot 0; the variable table
    /// holds the constant variable `"1"`; the formulas `"0"` and `"1"` are
    /// preloaded; the four default caches are installed; the system age is
    /// seeded to its minimum legal value.
    pub fn init(kind: DiagramKind) -> Self {
        let hash_seed: u64 = rand::thread_rng().gen();
        let one = Edge::new(TERMINAL);
        let zero = one.flipped();
        let mut mgr = BddManager {
            kind,
            arena: NodeArena::new(NODE_BLOCK_SIZE),
            table: UniqueTable::new(INITIAL_TABLE_SIZE, hash_seed),
            vars: VariableTable::new(),
            formulas: FormulaTable::new(),
            caches: CacheSet::new(hash_seed),
            system_age: MIN_SYSTEM_AGE,
            select_stamp: 0,
            scratchpad: None,
            tuning: Tuning::default(),
            num_live: 0,
            sjt: None,
            zero,
            one,
        };
        mgr.formulas.preload_constants(zero, one);
        mgr
    }

    /// Obtain the process-wide anonymous manager, creating it on first use.
    ///
    /// The anonymous instance uses complement-edge ROBDDs. It is shared
    /// state: lock it for the shortest possible time and never while
    /// holding another manager's lock.
    pub fn anonymous() -> Arc<RwLock<BddManager>> {
        let mut guard = ANONYMOUS_MANAGER.lock().unwrap();
        if let Some(mgr) = guard.upgrade() {
            mgr
        } else {
            let mgr = Arc::new(RwLock::new(BddManager::init(DiagramKind::RobddC)));
            *guard = Arc::downgrade(&mgr);
            mgr
        }
    }

    /// The manager's diagram variant.
    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    /// The operation caches, for the operation layer built on this
    /// engine.
    pub fn caches(&self) -> &CacheSet {
        &self.caches
    }

    /// Mutable access to the operation caches.
    pub fn caches_mut(&mut self) -> &mut CacheSet {
        &mut self.caches
    }

    /// The edge denoting the zero function (the empty set).
    pub fn zero(&self) -> Edge {
        self.zero
    }

    /// The edge denoting the one function.
    ///
    /// For the zero-suppressed variants this is the base set `{∅}`; the
    /// universal set over the current domain is held by the preloaded
    /// formula `"1"`.
    pub fn one(&self) -> Edge {
        self.one
    }

    /// Current system age.
    pub fn system_age(&self) -> u32 {
        self.system_age
    }

    /// Total number of live nodes, terminal excluded.
    pub fn node_table_num(&self) -> usize {
        self.num_live
    }

    /// Update the GC effectiveness ratios. Negative inputs are ignored.
    pub fn set_gc_ratios(&mut self, gcr: f64, gcr_f: f64, gcr_x: f64) {
        if gcr >= 0.0 {
            self.tuning.gcr = gcr;
        }
        if gcr_f >= 0.0 {
            self.tuning.gcr_f = gcr_f;
        }
        if gcr_x >= 0.0 {
            self.tuning.gcr_x = gcr_x;
        }
    }

    /// Update the table-growth ratios. Negative inputs are ignored.
    pub fn set_resize_ratios(&mut self, rr: f64, rr_f: f64, rr_x: f64) {
        if rr >= 0.0 {
            self.tuning.rr = rr;
        }
        if rr_f >= 0.0 {
            self.tuning.rr_f = rr_f;
        }
        if rr_x >= 0.0 {
            self.tuning.rr_x = rr_x;
        }
    }

    /// Update the sifting growth bounds. Negative inputs are ignored.
    pub fn set_sifting_thresholds(&mut self, max_growth: f64, converge_growth: f64) {
        if max_growth >= 0.0 {
            self.tuning.sift_max_growth = max_growth;
        }
        if converge_growth >= 0.0 {
            self.tuning.converge_max_growth = converge_growth;
        }
    }

    // ------------------------------------------------------------------
    // Structural accessors for the operation layer
    // ------------------------------------------------------------------

    /// Variable of the edge's target node (the constant variable for
    /// edges to the terminal).
    pub fn top_var(&self, e: Edge) -> VarId {
        self.arena.node(e.node).var
    }

    /// The stored else-edge of the target node.
    pub fn node_low(&self, e: Edge) -> Edge {
        self.arena.node(e.node).low
    }

    /// The stored then-edge of the target node.
    pub fn node_high(&self, e: Edge) -> Edge {
        self.arena.node(e.node).high
    }

    /// Whether two edges denote the same function in this manager.
    ///
    /// Edges are canonical, so semantic equivalence is plain equality,
    /// adornments included.
    pub fn is_equivalent(&self, a: Edge, b: Edge) -> bool {
        a == b
    }

    /// Whether an edge survived every collection since it was returned:
    /// its target is present and fortified, fresh, prolonged or preserved.
    pub fn is_ok(&self, e: Edge) -> bool {
        let node = self.arena.node(e.node);
        !node.is_free() && (node.expiry == 0 || node.expiry >= self.system_age)
    }

    /// Lift the expiry of every node reachable from `e` to the current
    /// system age, protecting the edge until the next `clean`.
    pub fn refresh(&mut self, e: Edge) {
        let age = self.system_age;
        self.prolong_rec(e, age, CONST_VAR);
    }

    // ------------------------------------------------------------------
    // Select stamps
    // ------------------------------------------------------------------

    /// Start a new selection epoch and return its stamp.
    ///
    /// Nodes compare their `select` field against the stamp, so finishing
    /// an epoch costs nothing. On stamp overflow every stored stamp is
    /// reset once.
    pub(crate) fn next_select(&mut self) -> u32 {
        if self.select_stamp == u32::MAX {
            for id in 0..self.arena.capacity() {
                self.arena.node_mut(id as NodeId).select = 0;
            }
            self.select_stamp = 0;
        }
        self.select_stamp += 1;
        self.select_stamp
    }

    /// Count the nodes of the diagram rooted at `e`, terminal included.
    pub fn count_nodes(&mut self, e: Edge) -> usize {
        let stamp = self.next_select();
        let mut count = 0;
        let mut stack = vec![e.node];
        while let Some(id) = stack.pop() {
            let node = self.arena.node_mut(id);
            if node.select == stamp {
                continue;
            }
            node.select = stamp;
            count += 1;
            if id != TERMINAL {
                let (low, high) = (node.low, node.high);
                stack.push(low.node);
                stack.push(high.node);
            }
        }
        count
    }
}

impl std::fmt::Debug for BddManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BddManager [{}, {} variables, {} live nodes, table size {}, age {}]",
            self.kind,
            self.vars.num_vars(),
            self.num_live,
            self.table.size(),
            self.system_age
        )
    }
}
