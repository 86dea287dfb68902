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

//! Decisions and decision builders.
//!
//! A [`Decision`] is one binary branch: `apply` commits the left child,
//! `refute` commits the right child after the left subtree failed or was
//! exhausted. A [`DecisionBuilder`] lazily produces the next decision;
//! `None` means the subtree rooted at this builder is solved and the
//! driver signals a solution.
//!
//! Decisions are handed around as `Rc<dyn Decision>` so monitors can keep
//! identity-comparable markers to them (the symmetry manager does).

use capstan_engine::{Fail, Propagation, Solver, VarIndex};
use std::rc::Rc;

/// Structural visitor over decisions, used by symmetry breakers.
pub trait DecisionVisitor {
    /// The decision assigns `value` to `var` on its left branch.
    fn visit_set_variable_value(&mut self, _var: VarIndex, _value: i64) {}
}

/// A binary branching step.
pub trait Decision {
    /// Commits the left branch.
    fn apply(&self, solver: &mut Solver) -> Propagation;

    /// Commits the right branch.
    fn refute(&self, solver: &mut Solver) -> Propagation;

    /// Presents the structure of the decision to a visitor.
    fn accept(&self, _visitor: &mut dyn DecisionVisitor) {}

    /// Whether this is the driver-internal balancing sentinel that
    /// metaheuristics must skip.
    fn is_balancing(&self) -> bool {
        false
    }

    /// Human-readable rendering.
    fn describe(&self) -> String;
}

impl std::fmt::Debug for dyn Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl std::fmt::Display for dyn Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Lazily produces the next decision of a search strategy.
pub trait DecisionBuilder {
    /// Returns the name of the builder.
    fn name(&self) -> &str;

    /// The next decision, `None` when the subtree is solved. The builder
    /// itself may fail (e.g. a nested solve that found no solution).
    fn next(&mut self, solver: &mut Solver) -> Result<Option<Rc<dyn Decision>>, Fail>;
}

impl std::fmt::Debug for dyn DecisionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecisionBuilder({})", self.name())
    }
}

// ----- concrete decisions -----

/// Left: `var := value`. Right: `var != value`.
pub struct AssignVariableValue {
    var: VarIndex,
    value: i64,
}

impl AssignVariableValue {
    pub fn new(var: VarIndex, value: i64) -> Self {
        Self { var, value }
    }

    #[inline]
    pub fn var(&self) -> VarIndex {
        self.var
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }
}

impl Decision for AssignVariableValue {
    fn apply(&self, solver: &mut Solver) -> Propagation {
        solver.set_value(self.var, self.value)
    }

    fn refute(&self, solver: &mut Solver) -> Propagation {
        solver.remove_value(self.var, self.value)
    }

    fn accept(&self, visitor: &mut dyn DecisionVisitor) {
        visitor.visit_set_variable_value(self.var, self.value);
    }

    fn describe(&self) -> String {
        format!("[{} == {}]", self.var, self.value)
    }
}

/// Left: `var := value`. Right: fail immediately.
pub struct AssignVariableValueOrFail {
    var: VarIndex,
    value: i64,
}

impl AssignVariableValueOrFail {
    pub fn new(var: VarIndex, value: i64) -> Self {
        Self { var, value }
    }
}

impl Decision for AssignVariableValueOrFail {
    fn apply(&self, solver: &mut Solver) -> Propagation {
        solver.set_value(self.var, self.value)
    }

    fn refute(&self, _solver: &mut Solver) -> Propagation {
        Err(Fail)
    }

    fn accept(&self, visitor: &mut dyn DecisionVisitor) {
        visitor.visit_set_variable_value(self.var, self.value);
    }

    fn describe(&self) -> String {
        format!("[{} == {} or fail]", self.var, self.value)
    }
}

/// Left: assign every pair. Right: post that at least one variable
/// differs from its value.
pub struct AssignVariablesValues {
    vars: Vec<VarIndex>,
    values: Vec<i64>,
}

impl AssignVariablesValues {
    /// # Panics
    ///
    /// Panics if `vars` and `values` have different lengths.
    pub fn new(vars: &[VarIndex], values: &[i64]) -> Self {
        assert!(
            vars.len() == values.len(),
            "called `AssignVariablesValues::new` with {} variables and {} values",
            vars.len(),
            values.len()
        );
        Self {
            vars: vars.to_vec(),
            values: values.to_vec(),
        }
    }
}

impl Decision for AssignVariablesValues {
    fn apply(&self, solver: &mut Solver) -> Propagation {
        for (&var, &value) in self.vars.iter().zip(&self.values) {
            solver.set_value(var, value)?;
        }
        Ok(())
    }

    fn refute(&self, solver: &mut Solver) -> Propagation {
        let terms: Vec<VarIndex> = self
            .vars
            .iter()
            .zip(&self.values)
            .map(|(&var, &value)| solver.make_is_different_cst(var, value))
            .collect();
        solver.add_sum_greater_or_equal(&terms, 1);
        Ok(())
    }

    fn accept(&self, visitor: &mut dyn DecisionVisitor) {
        for (&var, &value) in self.vars.iter().zip(&self.values) {
            visitor.visit_set_variable_value(var, value);
        }
    }

    fn describe(&self) -> String {
        let mut out = String::new();
        for (&var, &value) in self.vars.iter().zip(&self.values) {
            out.push_str(&format!("[{} == {}]", var, value));
        }
        out
    }
}

/// The driver-internal sentinel decision. Both branches are no-ops;
/// metaheuristics skip constraint posting when they see it.
pub struct BalancingDecision;

impl Decision for BalancingDecision {
    fn apply(&self, _solver: &mut Solver) -> Propagation {
        Ok(())
    }

    fn refute(&self, _solver: &mut Solver) -> Propagation {
        Ok(())
    }

    fn is_balancing(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "BalancingDecision".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_apply_then_refute_complement() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let decision = AssignVariableValue::new(x, 2);

        let mark = solver.trail_mark();
        decision.apply(&mut solver).unwrap();
        assert_eq!(solver.var_value(x), 2);

        solver.rewind_to(mark);
        decision.refute(&mut solver).unwrap();
        assert!(!solver.var_contains(x, 2));
        assert_eq!(solver.var_size(x), 4);
    }

    #[test]
    fn test_assign_or_fail_refute_fails() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let decision = AssignVariableValueOrFail::new(x, 2);
        assert!(decision.refute(&mut solver).is_err());
    }

    #[test]
    fn test_assign_many_refute_posts_one_term_per_variable() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let y = solver.new_var(0, 4);
        let decision = AssignVariablesValues::new(&[x, y], &[1, 2]);

        let constraints_before = solver.constraints();
        let vars_before = solver.num_vars();
        decision.refute(&mut solver).unwrap();
        // One reified difference per variable plus the clause itself.
        assert_eq!(solver.num_vars() - vars_before, 2);
        assert_eq!(solver.constraints() - constraints_before, 3);

        // Binding both variables to the refuted pair must now fail.
        solver.set_value(x, 1).unwrap();
        solver.set_value(y, 2).unwrap();
        assert!(solver.propagate().is_err());
    }

    #[test]
    #[should_panic(expected = "called `AssignVariablesValues::new` with 2 variables and 1 values")]
    fn test_assign_many_size_mismatch_panics() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let y = solver.new_var(0, 4);
        let _ = AssignVariablesValues::new(&[x, y], &[1]);
    }

    #[test]
    fn test_balancing_sentinel() {
        let decision = BalancingDecision;
        assert!(decision.is_balancing());
        let mut solver = Solver::new();
        assert!(decision.apply(&mut solver).is_ok());
        assert!(decision.refute(&mut solver).is_ok());
    }

    #[test]
    fn test_visitor_sees_assignments() {
        struct Probe {
            seen: Vec<(usize, i64)>,
        }
        impl DecisionVisitor for Probe {
            fn visit_set_variable_value(&mut self, var: VarIndex, value: i64) {
                self.seen.push((var.get(), value));
            }
        }

        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let y = solver.new_var(0, 4);
        let decision = AssignVariablesValues::new(&[x, y], &[3, 1]);
        let mut probe = Probe { seen: Vec::new() };
        decision.accept(&mut probe);
        assert_eq!(probe.seen, vec![(x.get(), 3), (y.get(), 1)]);
    }
}
