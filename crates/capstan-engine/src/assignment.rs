// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Value snapshots.
//!
//! An [`Assignment`] binds a set of variables to captured values plus
//! activation bits, and optionally carries an objective variable with
//! bounds. Collectors store solutions through it, the tabu monitor diffs
//! consecutive solutions with it, and the local-search delta protocol
//! passes candidate moves as sparse assignments.
//!
//! The assignment never owns variables; it only holds their indices.

use crate::fail::Propagation;
use crate::solver::Solver;
use crate::var::VarIndex;
use std::collections::HashMap;

/// One captured binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntVarElement {
    var: VarIndex,
    value: i64,
    activated: bool,
}

impl IntVarElement {
    #[inline]
    pub fn var(&self) -> VarIndex {
        self.var
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[inline]
    pub fn activated(&self) -> bool {
        self.activated
    }
}

/// A snapshot container binding variables to values.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    elements: Vec<IntVarElement>,
    index: HashMap<VarIndex, usize>,
    objective: Option<VarIndex>,
    objective_value: i64,
    objective_min: i64,
    objective_max: i64,
}

impl Assignment {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            index: HashMap::new(),
            objective: None,
            objective_value: 0,
            objective_min: i64::MIN,
            objective_max: i64::MAX,
        }
    }

    /// Adds a variable with value 0, activated.
    ///
    /// # Panics
    ///
    /// Panics if the variable is already in the assignment.
    pub fn add(&mut self, var: VarIndex) {
        assert!(
            !self.index.contains_key(&var),
            "called `Assignment::add` with variable {} already present",
            var
        );
        self.index.insert(var, self.elements.len());
        self.elements.push(IntVarElement {
            var,
            value: 0,
            activated: true,
        });
    }

    /// Adds every variable of `vars`.
    pub fn add_all(&mut self, vars: &[VarIndex]) {
        for &var in vars {
            self.add(var);
        }
    }

    #[inline]
    pub fn contains(&self, var: VarIndex) -> bool {
        self.index.contains_key(&var)
    }

    /// True when no variable and no objective is tracked.
    #[inline]
    pub fn empty(&self) -> bool {
        self.elements.is_empty() && self.objective.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn elements(&self) -> &[IntVarElement] {
        &self.elements
    }

    #[inline]
    pub fn element(&self, i: usize) -> &IntVarElement {
        &self.elements[i]
    }

    #[inline]
    fn position(&self, var: VarIndex) -> usize {
        *self
            .index
            .get(&var)
            .unwrap_or_else(|| panic!("variable {} is not in the assignment", var))
    }

    /// The captured value of `var`.
    ///
    /// # Panics
    ///
    /// Panics if the variable is not in the assignment.
    #[inline]
    pub fn value(&self, var: VarIndex) -> i64 {
        self.elements[self.position(var)].value
    }

    /// Overwrites the captured value of `var`.
    #[inline]
    pub fn set_value(&mut self, var: VarIndex, value: i64) {
        let position = self.position(var);
        self.elements[position].value = value;
    }

    #[inline]
    pub fn activated(&self, var: VarIndex) -> bool {
        self.elements[self.position(var)].activated
    }

    #[inline]
    pub fn activate(&mut self, var: VarIndex) {
        let position = self.position(var);
        self.elements[position].activated = true;
    }

    #[inline]
    pub fn deactivate(&mut self, var: VarIndex) {
        let position = self.position(var);
        self.elements[position].activated = false;
    }

    /// Captures the current solver values of every tracked variable.
    ///
    /// # Panics
    ///
    /// Panics if a tracked variable is unbound.
    pub fn store(&mut self, solver: &Solver) {
        for element in &mut self.elements {
            element.value = solver.var_value(element.var);
        }
        if let Some(objective) = self.objective {
            self.objective_value = solver.var_value(objective);
        }
    }

    /// Reapplies every activated binding to the solver.
    pub fn restore(&self, solver: &mut Solver) -> Propagation {
        for element in &self.elements {
            if element.activated {
                solver.set_value(element.var, element.value)?;
            }
        }
        Ok(())
    }

    // ----- objective -----

    #[inline]
    pub fn has_objective(&self) -> bool {
        self.objective.is_some()
    }

    #[inline]
    pub fn objective(&self) -> Option<VarIndex> {
        self.objective
    }

    #[inline]
    pub fn add_objective(&mut self, var: VarIndex) {
        self.objective = Some(var);
    }

    /// The objective value captured by the last `store`.
    #[inline]
    pub fn objective_value(&self) -> i64 {
        self.objective_value
    }

    #[inline]
    pub fn objective_min(&self) -> i64 {
        self.objective_min
    }

    #[inline]
    pub fn objective_max(&self) -> i64 {
        self.objective_max
    }

    #[inline]
    pub fn set_objective_min(&mut self, value: i64) {
        self.objective_min = value;
    }

    #[inline]
    pub fn set_objective_max(&mut self, value: i64) {
        self.objective_max = value;
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Assignment(")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", element.var, element.value)?;
            if !element.activated {
                write!(f, " (off)")?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_captures_bound_values() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let y = solver.new_var(0, 9);
        solver.set_value(x, 3).unwrap();
        solver.set_value(y, 7).unwrap();

        let mut assignment = Assignment::new();
        assignment.add_all(&[x, y]);
        assignment.store(&solver);
        assert_eq!(assignment.value(x), 3);
        assert_eq!(assignment.value(y), 7);
    }

    #[test]
    fn test_restore_reapplies_values() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let mut assignment = Assignment::new();
        assignment.add(x);
        assignment.set_value(x, 4);

        assignment.restore(&mut solver).unwrap();
        assert_eq!(solver.var_value(x), 4);
    }

    #[test]
    fn test_deactivated_elements_are_skipped_on_restore() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let mut assignment = Assignment::new();
        assignment.add(x);
        assignment.set_value(x, 4);
        assignment.deactivate(x);

        assignment.restore(&mut solver).unwrap();
        assert!(!solver.var_bound(x), "deactivated binding must not apply");
    }

    #[test]
    #[should_panic(expected = "already present")]
    fn test_duplicate_add_panics() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let mut assignment = Assignment::new();
        assignment.add(x);
        assignment.add(x);
    }

    #[test]
    fn test_objective_bounds_default_open() {
        let mut solver = Solver::new();
        let obj = solver.new_var(0, 100);
        let mut assignment = Assignment::new();
        assert!(!assignment.has_objective());
        assignment.add_objective(obj);
        assert!(assignment.has_objective());
        assert_eq!(assignment.objective_min(), i64::MIN);
        assert_eq!(assignment.objective_max(), i64::MAX);
    }
}
