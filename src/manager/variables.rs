//! Variable table, ordering and domain expansion
//!
//! Variables are numbered by creation; their dynamic ordering is kept both
//! as a doubly linked list threaded through the records and as an integer
//! rank table, so `is_smaller` answers in O(1). The alphabetic lookup goes
//! through a sorted name map.
//!
//! Each variable owns two canonical edges: the Boolean function `v` and
//! the combination set `{{v}}`. Creating a variable repairs every existing
//! formula and canonical edge so it keeps denoting the same function or
//! combination set over the grown domain.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{NodeError, UsageError};
use crate::node::NodeArena;
use crate::types::{DiagramKind, Edge, NodeId, VarId, CONST_VAR, NIL, TERMINAL};

use super::BddManager;

/// One variable record.
pub(crate) struct Variable {
    pub name: Arc<str>,
    /// Topmore ordering neighbor
    pub prev: Option<VarId>,
    /// Bottommore ordering neighbor
    pub next: Option<VarId>,
    /// Head of the per-variable node list (the designated canonical node)
    pub first_node: NodeId,
    /// Tail of the per-variable node list
    pub last_node: NodeId,
    /// Canonical edge of the Boolean function `v`
    pub var_edge: Option<Edge>,
    /// Canonical edge of the combination set `{{v}}`
    pub elem_edge: Option<Edge>,
    /// Live nodes whose top variable is this one
    pub live: usize,
    /// Whether the name was assigned by the numbering counter
    pub numbered: bool,
    /// Optional user value attached to the variable
    pub value: Option<Edge>,
    /// Optional user data attached to the variable
    pub data: Option<String>,
    /// Scratch flag used by sifting
    pub sifted: bool,
}

impl Variable {
    fn new(name: Arc<str>, numbered: bool) -> Self {
        Variable {
            name,
            prev: None,
            next: None,
            first_node: NIL,
            last_node: NIL,
            var_edge: None,
            elem_edge: None,
            live: 0,
            numbered,
            value: None,
            data: None,
            sifted: false,
        }
    }
}

/// The variable table with both ordering representations.
pub(crate) struct VariableTable {
    vars: Vec<Variable>,
    by_name: BTreeMap<Arc<str>, VarId>,
    /// rank[v] = position from the top; the constant variable ranks below
    /// everything
    rank: Vec<u32>,
    top: Option<VarId>,
    bottom: Option<VarId>,
    numbered_counter: u32,
}

impl VariableTable {
    pub fn new() -> Self {
        let const_name: Arc<str> = Arc::from("1");
        let mut by_name = BTreeMap::new();
        by_name.insert(Arc::clone(&const_name), CONST_VAR);
        VariableTable {
            vars: vec![Variable::new(const_name, false)],
            by_name,
            rank: vec![u32::MAX],
            top: None,
            bottom: None,
            numbered_counter: 0,
        }
    }

    /// Number of real variables, the constant excluded.
    pub fn num_vars(&self) -> usize {
        self.vars.len() - 1
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn var(&self, v: VarId) -> &Variable {
        &self.vars[v as usize]
    }

    pub fn var_mut(&mut self, v: VarId) -> &mut Variable {
        &mut self.vars[v as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    /// O(1) ordering test: does `a` sit strictly topmore than `b`?
    pub fn is_smaller(&self, a: VarId, b: VarId) -> bool {
        self.rank[a as usize] < self.rank[b as usize]
    }

    pub fn rank_of(&self, v: VarId) -> u32 {
        self.rank[v as usize]
    }

    pub fn top(&self) -> Option<VarId> {
        self.top
    }

    /// The next variable bottomwards, or the constant variable at the end.
    pub fn next_in_order(&self, v: VarId) -> VarId {
        self.vars[v as usize].next.unwrap_or(CONST_VAR)
    }

    pub fn prev_in_order(&self, v: VarId) -> Option<VarId> {
        self.vars[v as usize].prev
    }

    /// All real variables from the top of the ordering to the bottom.
    pub fn order(&self) -> Vec<VarId> {
        let mut out = Vec::with_capacity(self.num_vars());
        let mut cur = self.top;
        while let Some(v) = cur {
            out.push(v);
            cur = self.vars[v as usize].next;
        }
        out
    }

    fn recompute_ranks(&mut self) {
        self.rank.resize(self.vars.len(), u32::MAX);
        self.rank[CONST_VAR as usize] = u32::MAX;
        let mut cur = self.top;
        let mut pos = 0;
        while let Some(v) = cur {
            self.rank[v as usize] = pos;
            pos += 1;
            cur = self.vars[v as usize].next;
        }
    }

    fn push_record(&mut self, name: Arc<str>, numbered: bool) -> VarId {
        let id = self.vars.len() as VarId;
        self.by_name.insert(Arc::clone(&name), id);
        self.vars.push(Variable::new(name, numbered));
        id
    }

    fn insert_top(&mut self, v: VarId) {
        self.vars[v as usize].next = self.top;
        if let Some(old) = self.top {
            self.vars[old as usize].prev = Some(v);
        } else {
            self.bottom = Some(v);
        }
        self.top = Some(v);
        self.recompute_ranks();
    }

    fn insert_bottom(&mut self, v: VarId) {
        self.vars[v as usize].prev = self.bottom;
        if let Some(old) = self.bottom {
            self.vars[old as usize].next = Some(v);
        } else {
            self.top = Some(v);
        }
        self.bottom = Some(v);
        self.recompute_ranks();
    }

    /// Exchange two neighboring variables in both ordering
    /// representations. `high` must be the direct bottom neighbor of
    /// `low`.
    pub fn swap_order(&mut self, low: VarId, high: VarId) {
        debug_assert_eq!(self.vars[low as usize].next, Some(high));
        let above = self.vars[low as usize].prev;
        let below = self.vars[high as usize].next;
        self.vars[high as usize].prev = above;
        self.vars[high as usize].next = Some(low);
        self.vars[low as usize].prev = Some(high);
        self.vars[low as usize].next = below;
        match above {
            Some(a) => self.vars[a as usize].next = Some(high),
            None => self.top = Some(high),
        }
        match below {
            Some(b) => self.vars[b as usize].prev = Some(low),
            None => self.bottom = Some(low),
        }
        self.rank.swap(low as usize, high as usize);
    }

    /// Append a node to the tail of its variable's node list.
    pub fn append_to_list(&mut self, arena: &mut NodeArena, v: VarId, id: NodeId) {
        arena.node_mut(id).list = NIL;
        let var = &mut self.vars[v as usize];
        if var.first_node == NIL {
            var.first_node = id;
        } else {
            arena.node_mut(var.last_node).list = id;
        }
        var.last_node = id;
        var.live += 1;
    }

    fn fresh_numbered_name(&mut self) -> Arc<str> {
        loop {
            self.numbered_counter += 1;
            let candidate = self.numbered_counter.to_string();
            if !self.by_name.contains_key(candidate.as_str()) {
                return Arc::from(candidate);
            }
        }
    }
}

impl BddManager {
    /// Number of variables in the domain, the constant excluded.
    pub fn num_variables(&self) -> usize {
        self.vars.num_vars()
    }

    /// The current ordering, top to bottom.
    pub fn variable_order(&self) -> Vec<VarId> {
        self.vars.order()
    }

    /// Number of live nodes whose top variable is `v`.
    pub fn variable_node_count(&self, v: VarId) -> usize {
        self.vars.var(v).live
    }

    /// Find a variable by name. O(log n).
    pub fn get_variable(&self, name: &str) -> Option<VarId> {
        self.vars.lookup(name)
    }

    /// Name of a variable.
    pub fn variable_name(&self, v: VarId) -> Option<&str> {
        if (v as usize) < self.vars.len() {
            Some(&self.vars.var(v).name)
        } else {
            None
        }
    }

    /// The topmost variable of the ordering.
    pub fn get_lowest(&self) -> Option<VarId> {
        self.vars.top()
    }

    /// The variable at position `i` of the ordering, counted from the top.
    pub fn get_ith(&self, i: usize) -> Option<VarId> {
        let mut cur = self.vars.top();
        for _ in 0..i {
            cur = cur.and_then(|v| self.vars.var(v).next);
        }
        cur
    }

    /// The topmore ordering neighbor.
    pub fn get_prev(&self, v: VarId) -> Option<VarId> {
        self.vars.prev_in_order(v)
    }

    /// The bottommore ordering neighbor.
    pub fn get_next(&self, v: VarId) -> Option<VarId> {
        self.vars.var(v).next
    }

    /// O(1) ordering test: is `a` strictly topmore than `b`?
    pub fn is_smaller(&self, a: VarId, b: VarId) -> bool {
        self.vars.is_smaller(a, b)
    }

    /// Whether the variable sits at the top of the ordering.
    pub fn is_lowest(&self, v: VarId) -> bool {
        self.vars.top() == Some(v)
    }

    /// Whether the variable is the bottommost real variable.
    pub fn is_highest(&self, v: VarId) -> bool {
        v != CONST_VAR && self.vars.var(v).next.is_none()
    }

    /// Attach a user value to a variable.
    pub fn set_variable_value(&mut self, v: VarId, value: Edge) {
        self.vars.var_mut(v).value = Some(value);
    }

    /// The user value attached to a variable, if any.
    pub fn variable_value(&self, v: VarId) -> Option<Edge> {
        self.vars.var(v).value
    }

    /// Attach user data to a variable.
    pub fn set_variable_data(&mut self, v: VarId, data: String) {
        self.vars.var_mut(v).data = Some(data);
    }

    /// The user data attached to a variable, if any.
    pub fn variable_data(&self, v: VarId) -> Option<&str> {
        self.vars.var(v).data.as_deref()
    }

    /// Find or add a variable, repairing existing formulas and canonical
    /// edges so they keep denoting the same functions over the grown
    /// domain.
    ///
    /// With `name = None` a numbered variable is created. `as_element`
    /// selects which canonical edge the caller is interested in; with
    /// `complete = false` the expensive one of the two canonical edges is
    /// deferred until first asked for.
    pub fn foa_variable(
        &mut self,
        name: Option<&str>,
        as_element: bool,
        complete: bool,
    ) -> Result<VarId, NodeError> {
        if let Some(n) = name {
            if let Some(id) = self.vars.lookup(n) {
                if id == CONST_VAR {
                    return Ok(id);
                }
                if complete || as_element {
                    self.element_edge(id)?;
                }
                if complete || !as_element {
                    self.variable_edge(id)?;
                }
                return Ok(id);
            }
        }
        let arc_name = match name {
            Some(n) => Arc::from(n),
            None => self.vars.fresh_numbered_name(),
        };
        let numbered = name.is_none();
        let id = self.vars.push_record(arc_name, numbered);
        if self.kind.fresh_variable_on_top() {
            self.vars.insert_top(id);
        } else {
            self.vars.insert_bottom(id);
        }

        // The designated canonical node comes first so it heads the new
        // variable's node list.
        let designated = self.foa_variable_node(id)?;

        // Repair what already exists before the new canonical edges join.
        match self.kind {
            DiagramKind::Robdd | DiagramKind::RobddC => self.repair_after_add_robdd(id)?,
            DiagramKind::Zbdd | DiagramKind::ZbddC => self.repair_after_add_zbdd(id)?,
            DiagramKind::Tzbdd => self.repair_after_add_tzbdd(id),
        }
        match self.kind {
            DiagramKind::Robdd | DiagramKind::RobddC => {
                self.vars.var_mut(id).var_edge = Some(designated);
                if complete || as_element {
                    let elem = self.build_robdd_element(id)?;
                    self.vars.var_mut(id).elem_edge = Some(elem);
                }
            }
            DiagramKind::Zbdd | DiagramKind::ZbddC => {
                self.vars.var_mut(id).elem_edge = Some(designated);
                if complete || !as_element {
                    let var = self.build_zbdd_variable(id)?;
                    self.vars.var_mut(id).var_edge = Some(var);
                }
            }
            DiagramKind::Tzbdd => {
                self.vars.var_mut(id).var_edge = Some(designated);
                let elem = self.build_tzbdd_element(id)?;
                self.vars.var_mut(id).elem_edge = Some(elem);
            }
        }
        self.fortify_canonical_edges(id);
        Ok(id)
    }

    /// Add a variable by name; the Boolean variable edge is built eagerly.
    pub fn add_variable_by_name(&mut self, name: Option<&str>) -> Result<VarId, NodeError> {
        self.foa_variable(name, false, false)
    }

    /// Add an element by name; the element edge is built eagerly.
    pub fn add_element_by_name(&mut self, name: Option<&str>) -> Result<VarId, NodeError> {
        self.foa_variable(name, true, false)
    }

    /// Rename a variable. Fails when the new name is already taken or the
    /// variable does not exist.
    pub fn change_variable_name(&mut self, v: VarId, new_name: &str) -> Result<(), UsageError> {
        if v == CONST_VAR {
            return Err(UsageError::ConstantVariable);
        }
        if self.vars.lookup(new_name).is_some() {
            return Err(UsageError::NameTaken {
                name: new_name.to_string(),
            });
        }
        let old = Arc::clone(&self.vars.var(v).name);
        let new_arc: Arc<str> = Arc::from(new_name);
        self.vars.by_name_remove(&old);
        self.vars.by_name_insert(Arc::clone(&new_arc), v);
        let record = self.vars.var_mut(v);
        record.name = new_arc;
        record.numbered = false;
        Ok(())
    }

    /// The canonical edge of the Boolean function `v`, building it if it
    /// was deferred at variable creation.
    pub fn variable_edge(&mut self, v: VarId) -> Result<Edge, NodeError> {
        if let Some(e) = self.vars.var(v).var_edge {
            return Ok(e);
        }
        let e = match self.kind {
            DiagramKind::Zbdd | DiagramKind::ZbddC => self.build_zbdd_variable(v)?,
            _ => self.foa_variable_node(v)?,
        };
        self.vars.var_mut(v).var_edge = Some(e);
        self.fortify_rec(e);
        Ok(e)
    }

    /// The canonical edge of the combination set `{{v}}`, building it if
    /// it was deferred at variable creation.
    pub fn element_edge(&mut self, v: VarId) -> Result<Edge, NodeError> {
        if let Some(e) = self.vars.var(v).elem_edge {
            return Ok(e);
        }
        let e = match self.kind {
            DiagramKind::Robdd | DiagramKind::RobddC => self.build_robdd_element(v)?,
            DiagramKind::Tzbdd => self.build_tzbdd_element(v)?,
            _ => self.foa_variable_node(v)?,
        };
        self.vars.var_mut(v).elem_edge = Some(e);
        self.fortify_rec(e);
        Ok(e)
    }

    // ------------------------------------------------------------------
    // Canonical edge construction
    // ------------------------------------------------------------------

    /// `{{x}}` as an ordered BDD: the chain `x ∧ ∏ ¬u` over every other
    /// variable of the domain, built bottom-up.
    fn build_robdd_element(&mut self, x: VarId) -> Result<Edge, NodeError> {
        let zero = self.zero();
        let mut acc = self.one();
        for u in self.vars.order().into_iter().rev() {
            acc = if u == x {
                self.foa_node(x, zero, acc, false)?
            } else {
                self.foa_node(u, acc, zero, false)?
            };
        }
        Ok(acc)
    }

    /// Boolean `x` as a zero-suppressed BDD: every other variable of the
    /// domain needs an explicit don't-care wrapper.
    fn build_zbdd_variable(&mut self, x: VarId) -> Result<Edge, NodeError> {
        let zero = self.zero();
        let mut acc = self.one();
        for u in self.vars.order().into_iter().rev() {
            acc = if u == x {
                self.foa_node(x, zero, acc, false)?
            } else {
                self.foa_node(u, acc, acc, false)?
            };
        }
        Ok(acc)
    }

    /// `{{x}}` as a tagged BDD: one node whose then-edge zero-suppresses
    /// everything below `x`, under a top tag zero-suppressing everything
    /// above.
    fn build_tzbdd_element(&mut self, x: VarId) -> Result<Edge, NodeError> {
        let zero = self.zero();
        let below = Edge::tagged(TERMINAL, self.vars.next_in_order(x));
        let node = self.foa_node_tagged(x, zero, below, x, false)?;
        let top = self.vars.top().unwrap_or(CONST_VAR);
        Ok(node.with_tag(top))
    }

    // ------------------------------------------------------------------
    // Domain-expansion repair
    // ------------------------------------------------------------------

    /// Ordered variants: the fresh variable joins at the bottom, so
    /// Boolean formulas and variable edges are structurally unaffected;
    /// element edges must exclude the new variable from every combination.
    fn repair_after_add_robdd(&mut self, new_var: VarId) -> Result<(), NodeError> {
        let mut memo: FxHashMap<Edge, Edge> = FxHashMap::default();
        for v in 1..self.vars.len() as VarId {
            if v == new_var {
                continue;
            }
            if let Some(elem) = self.vars.var(v).elem_edge {
                let repaired = self.conjoin_negative_bottom(elem, new_var, &mut memo)?;
                self.vars.var_mut(v).elem_edge = Some(repaired);
                self.fortify_rec(repaired);
            }
        }
        Ok(())
    }

    /// Conjoin `¬new_var` into a diagram, where `new_var` sits at the very
    /// bottom of the ordering: every terminal-one leaf becomes the literal
    /// node.
    fn conjoin_negative_bottom(
        &mut self,
        e: Edge,
        new_var: VarId,
        memo: &mut FxHashMap<Edge, Edge>,
    ) -> Result<Edge, NodeError> {
        if e == self.zero() {
            return Ok(e);
        }
        if e.is_terminal() {
            // The one edge: append the negative literal.
            let zero = self.zero();
            let one = self.one();
            return self.foa_node(new_var, one, zero, false);
        }
        if let Some(&hit) = memo.get(&e) {
            return Ok(hit);
        }
        let node = self.arena.node(e.node);
        let v = node.var;
        let (mut low, mut high) = (node.low, node.high);
        if e.mark {
            low = low.flipped();
            high = high.flipped();
        }
        let low = self.conjoin_negative_bottom(low, new_var, memo)?;
        let high = self.conjoin_negative_bottom(high, new_var, memo)?;
        let result = self.foa_node(v, low, high, false)?;
        memo.insert(e, result);
        Ok(result)
    }

    /// Zero-suppressed variants: the fresh variable joins at the top;
    /// Boolean formulas and variable edges get a `(v, f, f)` wrapper,
    /// element edges are unaffected.
    fn repair_after_add_zbdd(&mut self, new_var: VarId) -> Result<(), NodeError> {
        for v in 1..self.vars.len() as VarId {
            if v == new_var {
                continue;
            }
            if let Some(e) = self.vars.var(v).var_edge {
                let wrapped = self.foa_node(new_var, e, e, false)?;
                self.vars.var_mut(v).var_edge = Some(wrapped);
                self.fortify_rec(wrapped);
            }
        }
        for i in 0..self.formulas.len() {
            let root = self.formulas.root_of(i);
            let wrapped = self.foa_node(new_var, root, root, false)?;
            self.formulas.set_root(i, wrapped);
            let expiry = self.formulas.expiry_of(i);
            self.prolong_rec(wrapped, expiry, CONST_VAR);
        }
        Ok(())
    }

    /// Tagged variant: the fresh variable joins at the top; element edges
    /// lift their top tag so the new variable stays excluded, formulas and
    /// variable edges read the new variable as don't-care already.
    fn repair_after_add_tzbdd(&mut self, new_var: VarId) {
        for v in 1..self.vars.len() as VarId {
            if v == new_var {
                continue;
            }
            if let Some(e) = self.vars.var(v).elem_edge {
                self.vars.var_mut(v).elem_edge = Some(e.with_tag(new_var));
            }
        }
    }

    /// Fortify both canonical edges of a variable so no sweep collects
    /// them.
    pub(crate) fn fortify_canonical_edges(&mut self, v: VarId) {
        if let Some(e) = self.vars.var(v).var_edge {
            self.fortify_rec(e);
        }
        if let Some(e) = self.vars.var(v).elem_edge {
            self.fortify_rec(e);
        }
    }

    /// Set the expiry of every node reachable from `e` to fortified.
    pub(crate) fn fortify_rec(&mut self, e: Edge) {
        let mut stack = vec![e.node];
        while let Some(id) = stack.pop() {
            if id == TERMINAL {
                continue;
            }
            let node = self.arena.node_mut(id);
            if node.expiry == 0 {
                continue;
            }
            node.expiry = 0;
            stack.push(node.low.node);
            stack.push(node.high.node);
        }
    }
}

impl VariableTable {
    fn by_name_remove(&mut self, name: &Arc<str>) {
        self.by_name.remove(name);
    }

    fn by_name_insert(&mut self, name: Arc<str>, v: VarId) {
        self.by_name.insert(name, v);
    }
}
