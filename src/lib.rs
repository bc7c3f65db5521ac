//! # Multi-variant BDD engine
//!
//! This crate provides a manager-based engine for Binary Decision
//! Diagrams in five runtime-selected variants: reduced ordered BDDs with
//! and without complement edges (ROBDD, ROBDD/C), zero-suppressed BDDs
//! with and without complement edges (ZBDD, ZBDD/C), and tagged
//! zero-suppressed BDDs (TZBDD). It is the shared core consumed by
//! symbolic reasoning tools: the Boolean operator layer, file-format
//! readers and front-ends are external collaborators built on the
//! canonical constructor and the operation caches exported here.
//!
//! ## Overview
//!
//! A [`BddManager`] embodies one diagram instance:
//!
//! - **Unique node table** - hash-consed canonical nodes; the
//!   find-or-add constructor [`BddManager::foa_node`] enforces each
//!   variant's reduction rule and complement-edge normalization.
//! - **Variable table** - named variables with a dynamic ordering kept
//!   both as a linked list and as a rank table, so
//!   [`BddManager::is_smaller`] is O(1). Every variable owns two
//!   canonical edges: the Boolean function `v` and the combination set
//!   `{{v}}`.
//! - **Formula registry** - named or anonymous root edges with lifetime
//!   tags; the liveness anchors of garbage collection.
//! - **Age-based GC** - nodes carry expiry stamps relative to a
//!   monotone system age; [`BddManager::clean`] opens a new epoch and
//!   [`BddManager::gc`] sweeps what no anchor protects.
//! - **Operation caches** - fixed-size direct-mapped caches for the
//!   ternary, abstraction, restrict/compose and replace operations.
//! - **Reordering** - adjacent variable swap, Rudell sifting and
//!   exhaustive Steinhaus–Johnson–Trotter search.
//!
//! ## Building functions
//!
//! The engine hands out [`Edge`] values: plain structs packing a node
//! index with a complement mark and a variable tag. Edges returned by
//! the manager stay valid until the next [`BddManager::clean`] unless a
//! formula anchors them or they are refreshed each epoch.
//!
//! ```
//! use polybdd::{BddManager, DiagramKind};
//!
//! let mut mgr = BddManager::init(DiagramKind::Robdd);
//! let x = mgr.add_variable_by_name(Some("x")).unwrap();
//! let y = mgr.add_variable_by_name(Some("y")).unwrap();
//!
//! // x ∧ y, built straight from the canonical constructor.
//! let fy = mgr.variable_edge(y).unwrap();
//! let zero = mgr.zero();
//! let conj = mgr.foa_node(x, zero, fy, true).unwrap();
//!
//! mgr.add_formula(Some("conj"), conj, 0).unwrap();
//! assert_eq!(mgr.count_minterms(conj).unwrap(), 1u32.into());
//! ```
//!
//! ## Epochs and collection
//!
//! ```
//! use polybdd::{BddManager, DiagramKind};
//!
//! let mut mgr = BddManager::init(DiagramKind::RobddC);
//! let x = mgr.add_variable_by_name(Some("x")).unwrap();
//! let fx = mgr.variable_edge(x).unwrap();
//!
//! // Anchor the function, open a new epoch, collect.
//! mgr.add_formula(Some("keep"), fx, 0).unwrap();
//! mgr.clean();
//! mgr.gc(0, 0, false, false).unwrap();
//! assert!(mgr.is_ok(fx));
//! ```
//!
//! ## Copying between managers
//!
//! Managers are independent; data moves between them only through the
//! explicit entry points in [`convert`]:
//!
//! ```
//! use polybdd::{convert, BddManager, DiagramKind};
//!
//! let mut src = BddManager::init(DiagramKind::Robdd);
//! let x = src.add_variable_by_name(Some("x")).unwrap();
//! let fx = src.variable_edge(x).unwrap();
//!
//! let mut dst = BddManager::init(DiagramKind::Zbdd);
//! let copied = convert::copy(&mut src, &mut dst, fx, false).unwrap();
//!
//! let mut back = BddManager::init(DiagramKind::Robdd);
//! let roundtrip = convert::copy(&mut dst, &mut back, copied, false).unwrap();
//! let reference = back.variable_edge(back.get_variable("x").unwrap()).unwrap();
//! assert!(back.is_equivalent(roundtrip, reference));
//! ```
//!
//! ## Threading
//!
//! A single manager is single-threaded and holds no locks; independent
//! managers may live on different threads. The process-wide
//! [`BddManager::anonymous`] handle wraps its manager in a lock for
//! convenience in small programs; prefer explicit managers.

pub mod convert;
pub mod error;
pub(crate) mod manager;
pub(crate) mod node;
pub(crate) mod reorder;
pub mod types;

pub use error::{
    ArgumentError, CapacityError, CopyError, FormulaError, NodeError, ReorderError, UsageError,
    VariantError,
};
pub use manager::cache::{AbstractOp, CacheSet, EaCache, OpCache, RcCache, ReplaceCache};
pub use manager::{BddManager, Tuning};
pub use types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, TERMINAL};
