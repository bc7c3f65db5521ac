//! Cross-manager copy and conversion
//!
//! `copy` reproduces a function in another manager of the same variant,
//! memoizing source-to-destination node pointers through the source
//! manager's local-info scratchpad. When the destination is empty the
//! variable positions are preserved faithfully; otherwise the ordering is
//! adapted to the destination (ordered variants only).
//!
//! `convert` translates between variants using their structural
//! differences: a zero-suppressed node encodes existential elision of its
//! variable, so converting from the ordered form inserts explicit
//! `(v, r, r)` wrappers for the skipped variables and the reverse
//! direction deletes them; the tagged form trades both wrapper families
//! for edge tags. Conversions between the zero-suppressed and the tagged
//! variants go through a temporary ordered manager.

use rustc_hash::FxHashMap;

use crate::error::{ArgumentError, CopyError, NodeError, VariantError};
use crate::manager::BddManager;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, TERMINAL};

/// Copy or convert `f` from `src` into `dst`.
///
/// Missing variables are created in the destination first; with
/// `complete` their deferred canonical edges are built eagerly. Managers
/// of different variants dispatch to [`convert`].
pub fn copy(
    src: &mut BddManager,
    dst: &mut BddManager,
    f: Edge,
    complete: bool,
) -> Result<Edge, CopyError> {
    let varmap = replicate_variables(src, dst, complete)?;
    if src.kind() == dst.kind() {
        copy_same_kind(src, dst, f, &varmap)
    } else {
        convert_mapped(src, dst, f, &varmap)
    }
}

/// Copy the named formula from `src` and register it under the same name
/// in `dst`. Returns the copied root.
pub fn copy_formula(
    src: &mut BddManager,
    dst: &mut BddManager,
    name: &str,
) -> Result<Edge, CopyError> {
    let idx = src.find_formula(name).ok_or(ArgumentError::FormulaNotFound {
        name: name.to_string(),
    })?;
    let root = src.get_ith_formula(idx).ok_or(ArgumentError::IndexOutOfRange {
        index: idx,
        len: src.num_formulas(),
    })?;
    let copied = copy(src, dst, root, false)?;
    dst.add_formula(Some(name), copied, 0)
        .map_err(|e| match e {
            crate::error::FormulaError::Argument(a) => CopyError::Argument(a),
            crate::error::FormulaError::Usage(u) => CopyError::Usage(u),
        })?;
    Ok(copied)
}

/// Convert `f` between managers of different variants.
pub fn convert(src: &mut BddManager, dst: &mut BddManager, f: Edge) -> Result<Edge, CopyError> {
    let varmap = replicate_variables(src, dst, false)?;
    convert_mapped(src, dst, f, &varmap)
}

/// Create every source variable in the destination, preserving the
/// source order when the destination starts empty. Returns the
/// source-to-destination variable map.
fn replicate_variables(
    src: &BddManager,
    dst: &mut BddManager,
    complete: bool,
) -> Result<Vec<VarId>, CopyError> {
    let order = src_order(src);
    let mut varmap = vec![CONST_VAR; src.num_variables() + 1];
    // Top-inserting variants receive the variables bottom first so the
    // resulting order matches the source.
    let creation: Vec<VarId> = if dst.kind().fresh_variable_on_top() {
        order.iter().rev().copied().collect()
    } else {
        order.clone()
    };
    for v in creation {
        let name = src
            .variable_name(v)
            .expect("source variable has a name")
            .to_string();
        let mapped = dst
            .foa_variable(Some(&name), false, complete)
            .map_err(CopyError::Node)?;
        varmap[v as usize] = mapped;
    }
    Ok(varmap)
}

fn src_order(src: &BddManager) -> Vec<VarId> {
    let mut order = Vec::with_capacity(src.num_variables());
    let mut cur = src.get_lowest();
    while let Some(v) = cur {
        order.push(v);
        cur = src.get_next(v);
    }
    order
}

/// Whether the mapped variables appear in the destination in the same
/// relative order as in the source.
fn order_compatible(src: &BddManager, dst: &BddManager, varmap: &[VarId]) -> bool {
    let order = src_order(src);
    order
        .windows(2)
        .all(|w| dst.is_smaller(varmap[w[0] as usize], varmap[w[1] as usize]))
}

fn map_tag(varmap: &[VarId], tag: VarId) -> VarId {
    if tag == CONST_VAR {
        CONST_VAR
    } else {
        varmap[tag as usize]
    }
}

// ----------------------------------------------------------------------
// Same-variant copy
// ----------------------------------------------------------------------

fn copy_same_kind(
    src: &mut BddManager,
    dst: &mut BddManager,
    f: Edge,
    varmap: &[VarId],
) -> Result<Edge, CopyError> {
    if order_compatible(src, dst, varmap) {
        src.create_local_info(f).map_err(CopyError::Usage)?;
        let result = copy_structural(src, dst, f, varmap);
        src.delete_local_info().map_err(CopyError::Usage)?;
        Ok(result?)
    } else {
        match src.kind() {
            DiagramKind::Robdd | DiagramKind::RobddC => {
                let mut memo = FxHashMap::default();
                copy_adapted(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
            }
            kind => Err(VariantError {
                operation: "copy with adapted ordering",
                kind,
            }
            .into()),
        }
    }
}

/// Structure-preserving copy; the source scratchpad memoizes node
/// pointers, edge adornments carry over verbatim (tags mapped).
fn copy_structural(
    src: &mut BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
) -> Result<Edge, NodeError> {
    if e.node == TERMINAL {
        return Ok(Edge {
            node: TERMINAL,
            mark: e.mark,
            tag: map_tag(varmap, e.tag),
        });
    }
    let copied = match src.local_copy_of(e.node) {
        Some(c) => c,
        None => {
            let (v, low, high) = (src.top_var(e), src.node_low(e), src.node_high(e));
            let low = copy_structural(src, dst, low, varmap)?;
            let high = copy_structural(src, dst, high, varmap)?;
            let c = dst.foa_node_raw(varmap[v as usize], low, high, CONST_VAR, false)?;
            src.set_local_copy(e.node, c);
            c
        }
    };
    Ok(Edge {
        node: copied.node,
        mark: e.mark,
        tag: map_tag(varmap, e.tag),
    })
}

/// Ordered-variant copy into a destination whose order differs: rebuild
/// bottom-up, composing each source node through a Shannon expansion that
/// respects the destination order.
fn copy_adapted(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.node == TERMINAL {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let (v, mut low, mut high) = (src.top_var(e), src.node_low(e), src.node_high(e));
    if e.mark {
        low = low.flipped();
        high = high.flipped();
    }
    let low = copy_adapted(src, dst, low, varmap, memo)?;
    let high = copy_adapted(src, dst, high, varmap, memo)?;
    let result = compose_ordered(dst, varmap[v as usize], low, high)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// `if v then high else low` over an ordered destination, valid for any
/// position of `v` relative to the operand tops.
fn compose_ordered(
    dst: &mut BddManager,
    v: VarId,
    low: Edge,
    high: Edge,
) -> Result<Edge, NodeError> {
    if low == high {
        return Ok(low);
    }
    let lv = dst.top_var(low);
    let hv = dst.top_var(high);
    let above_low = low.is_terminal() || dst.is_smaller(v, lv);
    let above_high = high.is_terminal() || dst.is_smaller(v, hv);
    if above_low && above_high {
        return dst.foa_node(v, low, high, false);
    }
    let split = if !above_low && (above_high || dst.is_smaller(lv, hv)) {
        lv
    } else {
        hv
    };
    let (l0, l1) = shannon_cofactors(dst, low, split);
    let (h0, h1) = shannon_cofactors(dst, high, split);
    if split == v {
        // The branch variable itself is on top: its else side comes from
        // `low`, its then side from `high`.
        return dst.foa_node(v, l0, h1, false);
    }
    let r0 = compose_ordered(dst, v, l0, h0)?;
    let r1 = compose_ordered(dst, v, l1, h1)?;
    dst.foa_node(split, r0, r1, false)
}

fn shannon_cofactors(dst: &BddManager, e: Edge, split: VarId) -> (Edge, Edge) {
    if !e.is_terminal() && dst.top_var(e) == split {
        let (l, h) = (dst.node_low(e), dst.node_high(e));
        if e.mark {
            (l.flipped(), h.flipped())
        } else {
            (l, h)
        }
    } else {
        (e, e)
    }
}

// ----------------------------------------------------------------------
// Direct conversion
// ----------------------------------------------------------------------

fn convert_mapped(
    src: &mut BddManager,
    dst: &mut BddManager,
    f: Edge,
    varmap: &[VarId],
) -> Result<Edge, CopyError> {
    use DiagramKind::*;
    // The direct converters rebuild node for node; a destination whose
    // relative order differs cannot be served that way.
    let through_ordered = matches!(
        (src.kind(), dst.kind()),
        (Zbdd | ZbddC, Tzbdd) | (Tzbdd, Zbdd | ZbddC)
    );
    if src.kind() != dst.kind() && !through_ordered && !order_compatible(src, dst, varmap) {
        return Err(VariantError {
            operation: "conversion with adapted ordering",
            kind: dst.kind(),
        }
        .into());
    }
    match (src.kind(), dst.kind()) {
        (Robdd, RobddC) | (RobddC, Robdd) => {
            let mut memo = FxHashMap::default();
            shannon_mark_copy(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Zbdd, ZbddC) | (ZbddC, Zbdd) => {
            let mut memo = FxHashMap::default();
            toggle_mark_copy(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Robdd | RobddC, Zbdd | ZbddC) => {
            let mut memo = FxHashMap::default();
            ordered_to_suppressed(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Zbdd | ZbddC, Robdd | RobddC) => {
            let mut memo = FxHashMap::default();
            suppressed_to_ordered(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Robdd | RobddC, Tzbdd) => {
            let mut memo = FxHashMap::default();
            ordered_to_tagged(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Tzbdd, Robdd | RobddC) => {
            let mut memo = FxHashMap::default();
            tagged_to_ordered(src, dst, f, varmap, &mut memo).map_err(CopyError::Node)
        }
        (Zbdd | ZbddC, Tzbdd) | (Tzbdd, Zbdd | ZbddC) => {
            // No specialized route; go through an ordered intermediate.
            let mut via = BddManager::init(RobddC);
            let mid = convert(src, &mut via, f)?;
            convert(&mut via, dst, mid)
        }
        (a, b) if a == b => copy_same_kind(src, dst, f, varmap),
        (_, kind) => Err(VariantError {
            operation: "direct conversion",
            kind,
        }
        .into()),
    }
}

/// Rebuild between the ordered variants: complement marks resolve by
/// flipping both Shannon cofactors, the destination constructor
/// re-normalizes.
fn shannon_mark_copy(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.is_terminal() {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let v = src.top_var(e);
    let (mut low, mut high) = (src.node_low(e), src.node_high(e));
    if e.mark {
        low = low.flipped();
        high = high.flipped();
    }
    let low = shannon_mark_copy(src, dst, low, varmap, memo)?;
    let high = shannon_mark_copy(src, dst, high, varmap, memo)?;
    let result = dst.foa_node(varmap[v as usize], low, high, false)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// Rebuild between the zero-suppressed variants: the empty-combination
/// toggle rides down the else branch until it hits a terminal.
fn toggle_mark_copy(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.is_terminal() {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let v = src.top_var(e);
    let low = src.node_low(e);
    let high = src.node_high(e);
    let low = Edge { mark: low.mark ^ e.mark, ..low };
    let low = toggle_mark_copy(src, dst, low, varmap, memo)?;
    let high = toggle_mark_copy(src, dst, high, varmap, memo)?;
    let result = dst.foa_node(varmap[v as usize], low, high, false)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// Source variables strictly between `above` and `below` in the source
/// order, bottom first. `below == CONST_VAR` means down to the bottom.
fn vars_between(src: &BddManager, above: VarId, below: VarId) -> Vec<VarId> {
    let mut out = Vec::new();
    let mut cur = if above == CONST_VAR {
        src.get_lowest()
    } else {
        src.get_next(above)
    };
    while let Some(v) = cur {
        if v == below {
            break;
        }
        out.push(v);
        cur = src.get_next(v);
    }
    out.reverse();
    out
}

/// Ordered to zero-suppressed: skipped variables become explicit
/// don't-care wrappers `(u, r, r)`.
fn ordered_to_suppressed(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    let top = if e.is_terminal() {
        CONST_VAR
    } else {
        src.top_var(e)
    };
    let inner = suppressed_body(src, dst, e, varmap, memo)?;
    // Wrap the variables above the root.
    let mut result = inner;
    for u in vars_between(src, CONST_VAR, top) {
        result = dst.foa_node(varmap[u as usize], result, result, false)?;
    }
    Ok(result)
}

fn suppressed_body(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.is_terminal() {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let v = src.top_var(e);
    let (mut low, mut high) = (src.node_low(e), src.node_high(e));
    if e.mark {
        low = low.flipped();
        high = high.flipped();
    }
    let low_top = if low.is_terminal() { CONST_VAR } else { src.top_var(low) };
    let high_top = if high.is_terminal() { CONST_VAR } else { src.top_var(high) };
    let mut low = suppressed_body(src, dst, low, varmap, memo)?;
    for u in vars_between(src, v, low_top) {
        low = dst.foa_node(varmap[u as usize], low, low, false)?;
    }
    let mut high = suppressed_body(src, dst, high, varmap, memo)?;
    for u in vars_between(src, v, high_top) {
        high = dst.foa_node(varmap[u as usize], high, high, false)?;
    }
    let result = dst.foa_node(varmap[v as usize], low, high, false)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// Zero-suppressed to ordered: elided variables become explicit negative
/// literals `(u, r, 0)`.
fn suppressed_to_ordered(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    let top = if e.is_terminal() {
        CONST_VAR
    } else {
        src.top_var(e)
    };
    let mut result = ordered_body(src, dst, e, varmap, memo)?;
    let zero = dst.zero();
    for u in vars_between(src, CONST_VAR, top) {
        result = dst.foa_node(varmap[u as usize], result, zero, false)?;
    }
    Ok(result)
}

fn ordered_body(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.is_terminal() {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let v = src.top_var(e);
    let low = src.node_low(e);
    let high = src.node_high(e);
    // The empty-combination toggle rides down the else branch.
    let low_mark = low.mark ^ e.mark;
    let low = Edge { mark: low_mark, ..low };
    let low_top = if low.is_terminal() { CONST_VAR } else { src.top_var(low) };
    let high_top = if high.is_terminal() { CONST_VAR } else { src.top_var(high) };
    let zero = dst.zero();
    let mut low = ordered_body(src, dst, low, varmap, memo)?;
    for u in vars_between(src, v, low_top) {
        low = dst.foa_node(varmap[u as usize], low, zero, false)?;
    }
    let mut high = ordered_body(src, dst, high, varmap, memo)?;
    for u in vars_between(src, v, high_top) {
        high = dst.foa_node(varmap[u as usize], high, zero, false)?;
    }
    let result = dst.foa_node(varmap[v as usize], low, high, false)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// Ordered to tagged: don't-care chains become edge tags, complement
/// marks are pushed down to the terminal.
fn ordered_to_tagged(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<(NodeId, bool), Edge>,
) -> Result<Edge, NodeError> {
    if e.is_terminal() {
        return Ok(if e.mark { dst.zero() } else { dst.one() });
    }
    if let Some(&hit) = memo.get(&(e.node, e.mark)) {
        return Ok(hit);
    }
    let v = src.top_var(e);
    let (mut low, mut high) = (src.node_low(e), src.node_high(e));
    if e.mark {
        low = low.flipped();
        high = high.flipped();
    }
    let low = ordered_to_tagged(src, dst, low, varmap, memo)?;
    let high = ordered_to_tagged(src, dst, high, varmap, memo)?;
    let mapped = varmap[v as usize];
    let result = dst.foa_node_tagged(mapped, low, high, mapped, false)?;
    memo.insert((e.node, e.mark), result);
    Ok(result)
}

/// Tagged to ordered: the zero-suppressed tag range expands into negative
/// literal chains, the don't-care range above the tag vanishes.
fn tagged_to_ordered(
    src: &BddManager,
    dst: &mut BddManager,
    e: Edge,
    varmap: &[VarId],
    memo: &mut FxHashMap<NodeId, Edge>,
) -> Result<Edge, NodeError> {
    if e.node == TERMINAL && e.mark {
        return Ok(dst.zero());
    }
    let body = if e.node == TERMINAL {
        dst.one()
    } else if let Some(&hit) = memo.get(&e.node) {
        hit
    } else {
        let v = src.top_var(e);
        let low = src.node_low(e);
        let high = src.node_high(e);
        let low = tagged_to_ordered(src, dst, low, varmap, memo)?;
        let high = tagged_to_ordered(src, dst, high, varmap, memo)?;
        let result = dst.foa_node(varmap[v as usize], low, high, false)?;
        memo.insert(e.node, result);
        result
    };
    // Expand the zero-suppressed range between the tag and the target.
    let target = if e.node == TERMINAL {
        CONST_VAR
    } else {
        src.top_var(e)
    };
    let zero = dst.zero();
    let mut result = body;
    if e.tag != CONST_VAR || target != CONST_VAR {
        for u in vars_between_inclusive(src, e.tag, target) {
            result = dst.foa_node(varmap[u as usize], result, zero, false)?;
        }
    }
    Ok(result)
}

/// Source variables from `from` (inclusive) down to `below` (exclusive),
/// bottom first.
fn vars_between_inclusive(src: &BddManager, from: VarId, below: VarId) -> Vec<VarId> {
    let mut out = Vec::new();
    if from == CONST_VAR {
        return out;
    }
    let mut cur = Some(from);
    while let Some(v) = cur {
        if v == below {
            break;
        }
        out.push(v);
        cur = src.get_next(v);
    }
    out.reverse();
    out
}
