//! Tests for the manager core

use super::*;
use crate::types::{DiagramKind, CONST_VAR, TERMINAL};

fn robdd() -> BddManager {
    BddManager::init(DiagramKind::Robdd)
}

#[test]
fn test_init_state() {
    let mgr = robdd();
    assert_eq!(mgr.kind(), DiagramKind::Robdd);
    assert_eq!(mgr.system_age(), MIN_SYSTEM_AGE);
    assert_eq!(mgr.num_variables(), 0);
    assert_eq!(mgr.node_table_num(), 0);
    assert_eq!(mgr.one().node, TERMINAL);
    assert_eq!(mgr.zero(), mgr.one().flipped());
    // Constant formulas are preloaded in slots 0 and 1.
    assert_eq!(mgr.find_formula("0"), Some(0));
    assert_eq!(mgr.find_formula("1"), Some(1));
}

#[test]
fn test_variable_edge_is_canonical() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let first = mgr.variable_edge(x).unwrap();
    let second = mgr.variable_edge(x).unwrap();
    assert_eq!(first, second);
    // Then-edge is the terminal, else-edge is the zero edge.
    assert_eq!(mgr.node_high(first), mgr.one());
    assert_eq!(mgr.node_low(first), mgr.zero());
}

#[test]
fn test_foa_reduction_returns_child() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let zero = mgr.zero();
    let reduced = mgr.foa_node(x, zero, zero, true).unwrap();
    assert_eq!(reduced, zero);
}

#[test]
fn test_foa_is_idempotent() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    let zero = mgr.zero();
    let a = mgr.foa_node(x, zero, fy, true).unwrap();
    let b = mgr.foa_node(x, zero, fy, true).unwrap();
    assert_eq!(a, b);
    assert!(mgr.is_equivalent(a, b));
}

#[test]
fn test_complement_normalization() {
    let mut mgr = BddManager::init(DiagramKind::RobddC);
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let zero = mgr.zero();
    let one = mgr.one();
    // ¬x as (x, 1, 0): the marked then-edge moves onto the result.
    let not_x = mgr.foa_node(x, one, zero, true).unwrap();
    assert!(not_x.mark);
    assert!(!mgr.node_high(not_x).mark);
    // Double complement cancels.
    let fx = mgr.variable_edge(x).unwrap();
    assert_eq!(not_x.flipped(), fx);
}

#[test]
fn test_ordering_after_adds() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let z = mgr.add_variable_by_name(Some("z")).unwrap();
    // Ordered variants place fresh variables at the bottom.
    assert!(mgr.is_smaller(x, y));
    assert!(mgr.is_smaller(y, z));
    assert!(mgr.is_smaller(x, z));
    assert!(mgr.is_smaller(z, CONST_VAR));
    assert!(mgr.is_lowest(x));
    assert!(mgr.is_highest(z));
    assert_eq!(mgr.get_lowest(), Some(x));
    assert_eq!(mgr.get_ith(1), Some(y));
    assert_eq!(mgr.get_prev(y), Some(x));
    assert_eq!(mgr.get_next(y), Some(z));
    assert_eq!(mgr.get_next(z), None);
}

#[test]
fn test_zero_suppressed_variables_enter_on_top() {
    let mut mgr = BddManager::init(DiagramKind::Zbdd);
    let x = mgr.add_element_by_name(Some("x")).unwrap();
    let y = mgr.add_element_by_name(Some("y")).unwrap();
    assert!(mgr.is_smaller(y, x));
    assert!(mgr.is_lowest(y));
}

#[test]
fn test_variable_lookup_by_name() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    assert_eq!(mgr.get_variable("x"), Some(x));
    assert_eq!(mgr.get_variable("missing"), None);
    assert_eq!(mgr.variable_name(x), Some("x"));
}

#[test]
fn test_numbered_variables() {
    let mut mgr = robdd();
    let a = mgr.add_variable_by_name(None).unwrap();
    let b = mgr.add_variable_by_name(None).unwrap();
    assert_ne!(a, b);
    assert_ne!(mgr.variable_name(a), mgr.variable_name(b));
    // Numeric names are resolvable like any other.
    let name = mgr.variable_name(a).unwrap().to_string();
    assert_eq!(mgr.get_variable(&name), Some(a));
}

#[test]
fn test_change_variable_name() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    mgr.add_variable_by_name(Some("y")).unwrap();
    assert!(mgr.change_variable_name(x, "y").is_err());
    mgr.change_variable_name(x, "renamed").unwrap();
    assert_eq!(mgr.get_variable("renamed"), Some(x));
    assert_eq!(mgr.get_variable("x"), None);
}

#[test]
fn test_formula_roundtrip() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    let idx = mgr.add_formula(Some("f"), fx, 0).unwrap();
    assert_eq!(mgr.find_formula("f"), Some(idx));
    assert_eq!(mgr.get_ith_formula(idx), Some(fx));
    assert_eq!(mgr.get_ith_formula_name(idx), Some("f"));
}

#[test]
fn test_formula_readd_replaces() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    mgr.add_formula(Some("f"), fx, 0).unwrap();
    mgr.add_formula(Some("f"), fy, 0).unwrap();
    let idx = mgr.find_formula("f").unwrap();
    assert_eq!(mgr.get_ith_formula(idx), Some(fy));
}

#[test]
fn test_constant_formulas_not_deletable() {
    let mut mgr = robdd();
    assert!(mgr.delete_ith_formula(0).is_err());
    assert!(mgr.delete_ith_formula(1).is_err());
    assert!(mgr.delete_formula("missing").is_err());
}

#[test]
fn test_formula_name_variable_collision() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    assert!(mgr.add_formula(Some("x"), fx, 0).is_err());
}

#[test]
fn test_clean_twice_collapses() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    mgr.add_formula(Some("keep"), fx, 0).unwrap();
    mgr.clean();
    let after_one = mgr.system_age();
    mgr.clean();
    // Two ticks with no operations between them change nothing beyond the
    // counter; everything fresh at the first tick is obsolete after both.
    assert_eq!(mgr.system_age(), after_one + 1);
    mgr.gc(CONST_VAR, CONST_VAR, false, false).unwrap();
    assert!(mgr.is_ok(fx));
}

#[test]
fn test_gc_epoch_collects_unanchored() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let z = mgr.add_variable_by_name(Some("z")).unwrap();
    let zero = mgr.zero();
    let fy = mgr.variable_edge(y).unwrap();
    let fz = mgr.variable_edge(z).unwrap();

    // g = x ∧ y, anchored and refreshed for the current epoch.
    let g = mgr.foa_node(x, zero, fy, true).unwrap();
    mgr.add_formula(Some("g"), g, -1).unwrap();
    // Anonymous loose structure with one unique node: y ∧ z.
    let anon = mgr.foa_node(y, zero, fz, true).unwrap();

    let before = mgr.node_table_num();
    mgr.clean();
    // g is kept alive by refreshing it in the new epoch.
    mgr.refresh(g);
    mgr.add_formula(Some("g"), g, -1).unwrap();
    mgr.gc(CONST_VAR, CONST_VAR, false, false).unwrap();

    // Exactly the anonymous structure's unique node was collected.
    assert_eq!(mgr.node_table_num(), before - 1);
    assert!(mgr.is_ok(g));
    let _ = anon;
}

#[test]
fn test_purge_drops_loose_structures() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let zero = mgr.zero();
    let fy = mgr.variable_edge(y).unwrap();
    let loose = mgr.foa_node(x, zero, fy, true).unwrap();
    assert!(mgr.is_ok(loose));
    let before = mgr.node_table_num();
    mgr.purge().unwrap();
    assert_eq!(mgr.node_table_num(), before - 1);
    // Canonical variable edges always survive a purge.
    assert!(mgr.is_ok(fy));
}

#[test]
fn test_preserved_formula_survives_cleanings() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let zero = mgr.zero();
    let fy = mgr.variable_edge(y).unwrap();
    let g = mgr.foa_node(x, zero, fy, true).unwrap();
    // Expiry is the current age plus three: valid through three
    // cleanings, obsolete at the fourth.
    mgr.add_formula(None, g, 3).unwrap();
    mgr.clean();
    mgr.clean();
    mgr.clean();
    mgr.gc(CONST_VAR, CONST_VAR, false, false).unwrap();
    assert!(mgr.is_ok(g));
    mgr.clean();
    mgr.gc(CONST_VAR, CONST_VAR, false, false).unwrap();
    assert!(!mgr.is_ok(g));
}

#[test]
fn test_count_nodes() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    let zero = mgr.zero();
    let conj = mgr.foa_node(x, zero, fy, true).unwrap();
    // Terminal, the y node and the x node.
    assert_eq!(mgr.count_nodes(conj), 3);
    assert_eq!(mgr.count_nodes(mgr.one()), 1);
}

#[test]
fn test_count_minterms() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    mgr.add_variable_by_name(Some("z")).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    let zero = mgr.zero();
    let conj = mgr.foa_node(x, zero, fy, true).unwrap();
    // x over {x, y, z} has four satisfying assignments, x ∧ y two.
    let fx = mgr.variable_edge(x).unwrap();
    assert_eq!(mgr.count_minterms(fx).unwrap(), 4u32.into());
    assert_eq!(mgr.count_minterms(conj).unwrap(), 2u32.into());
    assert_eq!(mgr.count_minterms(mgr.zero()).unwrap(), 0u32.into());
    assert_eq!(mgr.count_minterms(mgr.one()).unwrap(), 8u32.into());
}

#[test]
fn test_count_minterms_complemented() {
    let mut mgr = BddManager::init(DiagramKind::RobddC);
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    mgr.add_variable_by_name(Some("y")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    assert_eq!(mgr.count_minterms(fx).unwrap(), 2u32.into());
    assert_eq!(mgr.count_minterms(fx.flipped()).unwrap(), 2u32.into());
}

#[test]
fn test_count_paths() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    let zero = mgr.zero();
    let conj = mgr.foa_node(x, zero, fy, true).unwrap();
    let (p1, p0) = mgr.count_paths(conj).unwrap();
    // One path to the one terminal, two to zero.
    assert_eq!(p1, 1.0);
    assert_eq!(p0, 2.0);
}

#[test]
fn test_local_info_exclusive() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    mgr.create_local_info(fx).unwrap();
    assert!(mgr.create_local_info(fx).is_err());
    // Node construction and collection are barred while the pad exists.
    assert!(mgr.foa_node(x, mgr.zero(), mgr.one(), true).is_err());
    assert!(mgr.gc(CONST_VAR, CONST_VAR, false, false).is_err());
    assert_eq!(mgr.local_info_root(), Some(fx));
    mgr.delete_local_info().unwrap();
    assert!(!mgr.has_local_info());
    // Construction works again after release.
    assert!(mgr.foa_node(x, mgr.zero(), mgr.one(), true).is_ok());
}

#[test]
fn test_local_info_restores_lists() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fy = mgr.variable_edge(y).unwrap();
    let zero = mgr.zero();
    let conj = mgr.foa_node(x, zero, fy, true).unwrap();
    let vars_in_f = mgr.create_local_info(conj).unwrap();
    assert_eq!(vars_in_f, 2);
    mgr.delete_local_info().unwrap();
    // A sweep after release still walks intact lists.
    mgr.add_formula(Some("f"), conj, 0).unwrap();
    mgr.clean();
    mgr.gc(CONST_VAR, CONST_VAR, false, false).unwrap();
    assert!(mgr.is_ok(conj));
}

#[test]
fn test_zbdd_one_formula_is_universe() {
    let mut mgr = BddManager::init(DiagramKind::Zbdd);
    mgr.add_element_by_name(Some("x")).unwrap();
    mgr.add_element_by_name(Some("y")).unwrap();
    let one_idx = mgr.find_formula("1").unwrap();
    let universe = mgr.get_ith_formula(one_idx).unwrap();
    // The universal set over {x, y} holds four combinations and is a
    // proper DAG, unlike the base-set edge.
    assert_ne!(universe, mgr.one());
    assert_eq!(mgr.count_minterms(universe).unwrap(), 4u32.into());
    assert_eq!(mgr.count_minterms(mgr.one()).unwrap(), 1u32.into());
}

#[test]
fn test_zbdd_element_edge_is_single_node() {
    let mut mgr = BddManager::init(DiagramKind::Zbdd);
    let x = mgr.add_element_by_name(Some("x")).unwrap();
    mgr.add_element_by_name(Some("y")).unwrap();
    let ex = mgr.element_edge(x).unwrap();
    assert_eq!(mgr.count_nodes(ex), 2);
    assert_eq!(mgr.count_minterms(ex).unwrap(), 1u32.into());
}

#[test]
fn test_robdd_element_edge_excludes_new_variables() {
    let mut mgr = robdd();
    let x = mgr.foa_variable(Some("x"), true, true).unwrap();
    let ex_before = mgr.element_edge(x).unwrap();
    assert_eq!(mgr.count_minterms(ex_before).unwrap(), 1u32.into());
    // Growing the domain repairs the element so it still denotes {{x}}.
    mgr.add_variable_by_name(Some("y")).unwrap();
    let ex_after = mgr.element_edge(x).unwrap();
    assert_ne!(ex_before, ex_after);
    assert_eq!(mgr.count_minterms(ex_after).unwrap(), 1u32.into());
}

#[test]
fn test_tzbdd_canonical_edges() {
    let mut mgr = BddManager::init(DiagramKind::Tzbdd);
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    assert_eq!(fx.tag, x);
    // y entered on top; elements are tagged with the topmost variable.
    assert!(mgr.is_lowest(y));
    let ex = mgr.element_edge(x).unwrap();
    assert_eq!(ex.tag, y);
    assert_eq!(mgr.count_minterms(ex).unwrap(), 1u32.into());
    assert_eq!(mgr.count_minterms(fx).unwrap(), 2u32.into());
}

#[test]
fn test_manager_caches_roundtrip() {
    let mut mgr = robdd();
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let fx = mgr.variable_edge(x).unwrap();
    let zero = mgr.zero();
    let one = mgr.one();
    mgr.caches_mut().op.insert(fx, one, zero, fx);
    assert_eq!(mgr.caches().op.find(fx, one, zero), Some(fx));
    // A total collection clears every cache.
    mgr.gc(CONST_VAR, CONST_VAR, false, true).unwrap();
    assert_eq!(mgr.caches().op.find(fx, one, zero), None);
}

#[test]
fn test_anonymous_manager_revival() {
    let handle = BddManager::anonymous();
    let kind = handle.read().unwrap().kind();
    assert_eq!(kind, DiagramKind::RobddC);
    let again = BddManager::anonymous();
    assert!(std::sync::Arc::ptr_eq(&handle, &again));
}

#[test]
fn test_tuning_setters_ignore_negative() {
    let mut mgr = robdd();
    let before = mgr.tuning.gcr;
    mgr.set_gc_ratios(-1.0, -1.0, -1.0);
    assert_eq!(mgr.tuning.gcr, before);
    mgr.set_gc_ratios(0.5, -1.0, -1.0);
    assert_eq!(mgr.tuning.gcr, 0.5);
    mgr.set_resize_ratios(-1.0, 0.7, -1.0);
    assert_eq!(mgr.tuning.rr_f, 0.7);
    mgr.set_sifting_thresholds(1.2, -1.0);
    assert_eq!(mgr.tuning.sift_max_growth, 1.2);
}
