//! Formula registry: named roots anchoring garbage collection
//!
//! Named formulas form an alphabetically sorted prefix of the table so
//! lookup is a binary search; anonymous entries live past the prefix. The
//! first two slots hold the constants `"0"` and `"1"` and are never
//! deletable. Re-adding an existing name marks the prior entry deleted and
//! creates a new one instead of mutating in place, so roots handed out
//! earlier stay valid until the next collection.

use std::sync::Arc;

use log::warn;

use crate::error::{ArgumentError, FormulaError, UsageError};
use crate::types::{Edge, CONST_VAR};

use super::BddManager;

pub(crate) struct Formula {
    pub name: Option<Arc<str>>,
    pub root: Edge,
    /// 0 = persistent; `system_age` = fresh; larger = preserved; smaller =
    /// obsolete
    pub expiry: u32,
    pub deleted: bool,
}

pub(crate) struct FormulaTable {
    entries: Vec<Formula>,
    /// Length of the alphabetically sorted named prefix
    num_named: usize,
}

impl FormulaTable {
    pub fn new() -> Self {
        FormulaTable {
            entries: Vec::new(),
            num_named: 0,
        }
    }

    /// Install the constant formulas in slots 0 and 1.
    pub fn preload_constants(&mut self, zero: Edge, one: Edge) {
        debug_assert!(self.entries.is_empty());
        self.entries.push(Formula {
            name: Some(Arc::from("0")),
            root: zero,
            expiry: 0,
            deleted: false,
        });
        self.entries.push(Formula {
            name: Some(Arc::from("1")),
            root: one,
            expiry: 0,
            deleted: false,
        });
        self.num_named = 2;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, i: usize) -> &Formula {
        &self.entries[i]
    }

    pub fn root_of(&self, i: usize) -> Edge {
        self.entries[i].root
    }

    pub fn set_root(&mut self, i: usize, root: Edge) {
        self.entries[i].root = root;
    }

    pub fn expiry_of(&self, i: usize) -> u32 {
        self.entries[i].expiry
    }

    pub fn mark_deleted(&mut self, i: usize) {
        self.entries[i].deleted = true;
    }

    /// Binary search in the sorted prefix, skipping deleted entries.
    pub fn find(&self, name: &str) -> Option<usize> {
        let prefix = &self.entries[..self.num_named];
        let mut idx = prefix.partition_point(|f| {
            f.name.as_deref().expect("named prefix entry") < name
        });
        while idx < self.num_named {
            let entry = &self.entries[idx];
            match entry.name.as_deref() {
                Some(n) if n == name => {
                    if !entry.deleted {
                        return Some(idx);
                    }
                    idx += 1;
                }
                _ => break,
            }
        }
        None
    }

    /// Insert a formula, keeping the named prefix sorted. A live entry
    /// with the same name is marked deleted first.
    pub fn add(&mut self, name: Option<Arc<str>>, root: Edge, expiry: u32) -> usize {
        match name {
            Some(name) => {
                if let Some(prior) = self.find(&name) {
                    self.entries[prior].deleted = true;
                }
                let idx = self.entries[..self.num_named].partition_point(|f| {
                    f.name.as_deref().expect("named prefix entry") <= name.as_ref()
                });
                self.entries.insert(
                    idx,
                    Formula {
                        name: Some(name),
                        root,
                        expiry,
                        deleted: false,
                    },
                );
                self.num_named += 1;
                idx
            }
            None => {
                self.entries.push(Formula {
                    name: None,
                    root,
                    expiry,
                    deleted: false,
                });
                self.entries.len() - 1
            }
        }
    }

    /// Drop deleted and obsolete entries; with `purge` also every
    /// anonymous entry. The constant slots always survive. Returns the
    /// number of removed entries.
    pub fn sweep(&mut self, system_age: u32, purge: bool) -> usize {
        let mut removed = 0;
        let mut idx = 2;
        while idx < self.entries.len() {
            let entry = &self.entries[idx];
            let obsolete = entry.expiry != 0 && entry.expiry < system_age;
            let anonymous = entry.name.is_none();
            if entry.deleted || obsolete || (purge && anonymous) {
                if idx < self.num_named {
                    self.num_named -= 1;
                }
                self.entries.remove(idx);
                removed += 1;
            } else {
                idx += 1;
            }
        }
        removed
    }

    /// Mark every obsolete entry deleted (the `clean` pass).
    pub fn mark_obsolete_deleted(&mut self, system_age: u32) {
        for entry in self.entries.iter_mut().skip(2) {
            if entry.expiry != 0 && entry.expiry < system_age {
                entry.deleted = true;
            }
        }
    }

    /// Shift every nonzero expiry down by `shift` (age compaction).
    pub fn compact_expiries(&mut self, shift: u32) {
        for entry in self.entries.iter_mut() {
            if entry.expiry != 0 {
                entry.expiry = entry.expiry.saturating_sub(shift).max(1);
            }
        }
    }
}

impl BddManager {
    /// Register a root edge under an optional name.
    ///
    /// `c` selects the lifetime: `-1` refreshed for the current epoch
    /// only, `0` persistent, `k > 0` preserved across `k - 1` further
    /// [`BddManager::clean`] calls. The root's nodes are prolonged to at
    /// least the formula's expiry. Returns the slot index.
    pub fn add_formula(
        &mut self,
        name: Option<&str>,
        root: Edge,
        c: i64,
    ) -> Result<usize, FormulaError> {
        if let Some(n) = name {
            if self.get_variable(n).is_some() {
                warn!("formula name '{}' collides with a variable", n);
                return Err(UsageError::NameTaken {
                    name: n.to_string(),
                }
                .into());
            }
        }
        if c > 0 && self.system_age as u64 + c as u64 >= u32::MAX as u64 {
            self.compact_ages();
        }
        let expiry = match c {
            c if c < 0 => self.system_age,
            0 => 0,
            c => self.system_age.saturating_add(c.min(u32::MAX as i64) as u32),
        };
        self.prolong_rec(root, expiry, CONST_VAR);
        Ok(self.formulas.add(name.map(Arc::from), root, expiry))
    }

    /// Find a formula by name. O(log n) in the named prefix.
    pub fn find_formula(&self, name: &str) -> Option<usize> {
        self.formulas.find(name)
    }

    /// Root edge of the `i`-th formula slot.
    pub fn get_ith_formula(&self, i: usize) -> Option<Edge> {
        if i < self.formulas.len() && !self.formulas.entry(i).deleted {
            Some(self.formulas.root_of(i))
        } else {
            None
        }
    }

    /// Name of the `i`-th formula slot, if it is named.
    pub fn get_ith_formula_name(&self, i: usize) -> Option<&str> {
        if i < self.formulas.len() && !self.formulas.entry(i).deleted {
            self.formulas.entry(i).name.as_deref()
        } else {
            None
        }
    }

    /// Mark a named formula deleted; its nodes become collectible once no
    /// other anchor protects them.
    pub fn delete_formula(&mut self, name: &str) -> Result<(), FormulaError> {
        let idx = self.formulas.find(name).ok_or(ArgumentError::FormulaNotFound {
            name: name.to_string(),
        })?;
        self.delete_ith_formula(idx)
    }

    /// Mark the `i`-th formula slot deleted.
    pub fn delete_ith_formula(&mut self, i: usize) -> Result<(), FormulaError> {
        if i >= self.formulas.len() {
            return Err(ArgumentError::IndexOutOfRange {
                index: i,
                len: self.formulas.len(),
            }
            .into());
        }
        if i < 2 {
            warn!("attempt to delete constant formula slot {}", i);
            return Err(UsageError::ConstantFormula { index: i }.into());
        }
        self.formulas.mark_deleted(i);
        Ok(())
    }

    /// Number of formula slots, deleted entries included.
    pub fn num_formulas(&self) -> usize {
        self.formulas.len()
    }
}
