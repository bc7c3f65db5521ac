//! Integration tests for adjacent swap, sifting and SJT enumeration

use polybdd::{BddManager, DiagramKind, Edge, VarId};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn eval(mgr: &BddManager, mut e: Edge, assignment: &dyn Fn(VarId) -> bool) -> bool {
    let mut flip = false;
    loop {
        if e.mark {
            flip = !flip;
            e = e.unmarked();
        }
        if e.is_terminal() {
            return !flip;
        }
        let v = mgr.top_var(e);
        e = if assignment(v) {
            mgr.node_high(e)
        } else {
            mgr.node_low(e)
        };
    }
}

fn truth_table(mgr: &BddManager, f: Edge, vars: &[VarId]) -> Vec<bool> {
    (0..1u32 << vars.len())
        .map(|bits| {
            eval(mgr, f, &|v| {
                let idx = vars.iter().position(|&u| u == v).expect("known variable");
                bits & (1 << idx) != 0
            })
        })
        .collect()
}

/// (x ∧ y) ∨ z with x < y < z.
fn build_majority_free(mgr: &mut BddManager) -> (Edge, VarId, VarId, VarId) {
    let x = mgr.add_variable_by_name(Some("x")).unwrap();
    let y = mgr.add_variable_by_name(Some("y")).unwrap();
    let z = mgr.add_variable_by_name(Some("z")).unwrap();
    let fz = mgr.variable_edge(z).unwrap();
    let one = mgr.one();
    let ynode = mgr.foa_node(y, fz, one, true).unwrap();
    let f = mgr.foa_node(x, fz, ynode, true).unwrap();
    (f, x, y, z)
}

#[test]
fn test_swap_adjacent_updates_ordering() {
    init_logging();
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, x, y, z) = build_majority_free(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    assert!(mgr.is_smaller(x, y) && mgr.is_smaller(y, z));

    mgr.swap_adjacent(x, y).unwrap();
    assert!(mgr.is_smaller(y, x));
    assert!(mgr.is_smaller(x, z));
    assert_eq!(mgr.variable_order(), vec![y, x, z]);
}

#[test]
fn test_swap_adjacent_preserves_functions() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, x, y, z) = build_majority_free(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let before = truth_table(&mgr, f, &[x, y, z]);
    let z_nodes_before = mgr.variable_node_count(z);

    mgr.swap_adjacent(x, y).unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert_eq!(truth_table(&mgr, root, &[x, y, z]), before);
    // Nodes outside the swapped pair are untouched.
    assert_eq!(mgr.variable_node_count(z), z_nodes_before);

    // Swapping back restores the original diagram.
    mgr.swap_adjacent(y, x).unwrap();
    assert_eq!(truth_table(&mgr, root, &[x, y, z]), before);
    assert_eq!(mgr.variable_order(), vec![x, y, z]);
}

#[test]
fn test_swap_adjacent_preserves_complemented() {
    let mut mgr = BddManager::init(DiagramKind::RobddC);
    let (f, x, y, z) = build_majority_free(&mut mgr);
    let g = f.flipped();
    mgr.add_formula(Some("g"), g, 0).unwrap();
    let before = truth_table(&mgr, g, &[x, y, z]);
    mgr.swap_adjacent(y, z).unwrap();
    assert_eq!(truth_table(&mgr, g, &[x, y, z]), before);
}

#[test]
fn test_swap_adjacent_zbdd_preserves_sets() {
    let mut mgr = BddManager::init(DiagramKind::Zbdd);
    let a = mgr.add_element_by_name(Some("a")).unwrap();
    let b = mgr.add_element_by_name(Some("b")).unwrap();
    // {{a}, {a, b}}: b free over the element of a.
    let ea = mgr.element_edge(a).unwrap();
    let set = mgr.foa_node(b, ea, ea, true).unwrap();
    mgr.add_formula(Some("s"), set, 0).unwrap();
    assert_eq!(mgr.count_minterms(set).unwrap(), 2u32.into());

    let (top, bottom) = (b, a);
    assert!(mgr.is_smaller(top, bottom));
    mgr.swap_adjacent(top, bottom).unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("s").unwrap()).unwrap();
    assert_eq!(mgr.count_minterms(root).unwrap(), 2u32.into());
    assert!(mgr.is_smaller(a, b));
}

#[test]
fn test_swap_rejects_non_adjacent() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (_, x, _, z) = build_majority_free(&mut mgr);
    assert!(mgr.swap_adjacent(x, z).is_err());
    assert!(mgr.swap_adjacent(z, x).is_err());
}

#[test]
fn test_swap_rejects_tagged_managers() {
    let mut mgr = BddManager::init(DiagramKind::Tzbdd);
    let a = mgr.add_variable_by_name(Some("a")).unwrap();
    let b = mgr.add_variable_by_name(Some("b")).unwrap();
    assert!(mgr.swap_adjacent(b, a).is_err());
    assert!(mgr.sifting(None, false).is_err());
}

/// (a1 ∧ b1) ∨ (a2 ∧ b2) with the poor order a1 < a2 < b1 < b2.
fn build_interleaving_victim(mgr: &mut BddManager) -> (Edge, Vec<VarId>) {
    let a1 = mgr.add_variable_by_name(Some("a1")).unwrap();
    let a2 = mgr.add_variable_by_name(Some("a2")).unwrap();
    let b1 = mgr.add_variable_by_name(Some("b1")).unwrap();
    let b2 = mgr.add_variable_by_name(Some("b2")).unwrap();
    let fb1 = mgr.variable_edge(b1).unwrap();
    let fb2 = mgr.variable_edge(b2).unwrap();
    let one = mgr.one();
    let b1_or_b2 = mgr.foa_node(b1, fb2, one, true).unwrap();
    let then_a2 = mgr.foa_node(a2, fb1, b1_or_b2, true).unwrap();
    let else_a2 = mgr.foa_node(a2, mgr.zero(), fb2, true).unwrap();
    let f = mgr.foa_node(a1, else_a2, then_a2, true).unwrap();
    (f, vec![a1, a2, b1, b2])
}

#[test]
fn test_sifting_reduces_and_preserves() {
    init_logging();
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_interleaving_victim(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let before_table = truth_table(&mgr, f, &vars);
    let before_count = mgr.count_nodes(f);

    mgr.sifting(None, false).unwrap();

    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert_eq!(truth_table(&mgr, root, &vars), before_table);
    assert!(mgr.count_nodes(root) <= before_count);
    // The ordering is still a permutation of the domain.
    let mut order = mgr.variable_order();
    order.sort_unstable();
    let mut expected = vars.clone();
    expected.sort_unstable();
    assert_eq!(order, expected);
}

#[test]
fn test_converge_sifting_terminates() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_interleaving_victim(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let before_table = truth_table(&mgr, f, &vars);
    mgr.sifting(None, true).unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert_eq!(truth_table(&mgr, root, &vars), before_table);
}

#[test]
fn test_sifting_single_formula() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_interleaving_victim(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let before_table = truth_table(&mgr, f, &vars);
    mgr.sifting(Some("f"), false).unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert_eq!(truth_table(&mgr, root, &vars), before_table);
    assert!(mgr.sifting(Some("missing"), false).is_err());
}

#[test]
fn test_purge_and_reorder() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_interleaving_victim(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let before_table = truth_table(&mgr, f, &vars);
    mgr.purge_and_reorder(None, false).unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert_eq!(truth_table(&mgr, root, &vars), before_table);
}

#[test]
fn test_sjt_visits_all_orderings() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, _) = build_majority_free_tuple(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();

    mgr.sjt_init().unwrap();
    let mut orders = vec![mgr.variable_order()];
    let mut steps = 0;
    while mgr.sjt_step().unwrap() {
        steps += 1;
        orders.push(mgr.variable_order());
        assert!(steps <= 6, "the enumeration must stop after 3! orderings");
    }
    mgr.sjt_exit();

    // Three variables: five steps, six distinct orderings.
    assert_eq!(steps, 5);
    orders.sort();
    orders.dedup();
    assert_eq!(orders.len(), 6);
}

fn build_majority_free_tuple(mgr: &mut BddManager) -> (Edge, Vec<VarId>) {
    let (f, x, y, z) = build_majority_free(mgr);
    (f, vec![x, y, z])
}

#[test]
fn test_sjt_preserves_semantics_along_the_way() {
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_majority_free_tuple(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let reference = truth_table(&mgr, f, &vars);

    mgr.sjt_init().unwrap();
    loop {
        let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
        assert_eq!(truth_table(&mgr, root, &vars), reference);
        if !mgr.sjt_step().unwrap() {
            break;
        }
    }
    mgr.sjt_exit();
}

#[test]
fn test_minimize_bdd_finds_good_order() {
    init_logging();
    let mut mgr = BddManager::init(DiagramKind::Robdd);
    let (f, vars) = build_interleaving_victim(&mut mgr);
    mgr.add_formula(Some("f"), f, 0).unwrap();
    let reference = truth_table(&mgr, f, &vars);

    mgr.minimize_bdd("f").unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    let minimized = mgr.count_nodes(root);
    assert_eq!(truth_table(&mgr, root, &vars), reference);

    mgr.maximize_bdd("f").unwrap();
    let root = mgr.get_ith_formula(mgr.find_formula("f").unwrap()).unwrap();
    assert!(mgr.count_nodes(root) >= minimized);
    assert_eq!(truth_table(&mgr, root, &vars), reference);
}
