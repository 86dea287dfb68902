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

//! Structural combinators over decision builders.

use crate::branching::decision::{AssignVariableValue, Decision, DecisionBuilder};
use crate::monitor::MonitorRef;
use crate::search::nested_solve;
use capstan_engine::{Assignment, CellIndex, Fail, Solver, VarIndex};
use std::rc::Rc;

/// Runs its children in order: each child's subtree is explored to
/// completion before the next child contributes decisions. The start
/// index is reversible, so backtracking re-opens an earlier child.
pub struct Compose {
    builders: Vec<Box<dyn DecisionBuilder>>,
    start_index: CellIndex,
}

impl Compose {
    pub fn new(solver: &mut Solver, builders: Vec<Box<dyn DecisionBuilder>>) -> Self {
        Self {
            builders,
            start_index: solver.new_cell(0),
        }
    }
}

impl DecisionBuilder for Compose {
    fn name(&self) -> &str {
        "Compose"
    }

    fn next(&mut self, solver: &mut Solver) -> Result<Option<Rc<dyn Decision>>, Fail> {
        let start = solver.cell(self.start_index).max(0) as usize;
        for i in start..self.builders.len() {
            if let Some(decision) = self.builders[i].next(solver)? {
                solver.save_and_set_cell(self.start_index, i as i64);
                return Ok(Some(decision));
            }
        }
        solver.save_and_set_cell(self.start_index, self.builders.len() as i64);
        Ok(None)
    }
}

/// Collapses a subtree into a single probe: runs a nested search over the
/// wrapped builder and keeps the first solution found.
///
/// If the nested search finds no solution, the caller's branch fails.
/// Otherwise the solution's assignments persist into the caller
/// (`restore == false`) and the combinator reports its subtree solved.
pub struct SolveOnce {
    builder: Box<dyn DecisionBuilder>,
    monitors: Vec<MonitorRef>,
}

impl SolveOnce {
    pub fn new(builder: Box<dyn DecisionBuilder>) -> Self {
        Self {
            builder,
            monitors: Vec::new(),
        }
    }

    pub fn with_monitors(builder: Box<dyn DecisionBuilder>, monitors: Vec<MonitorRef>) -> Self {
        Self { builder, monitors }
    }
}

impl DecisionBuilder for SolveOnce {
    fn name(&self) -> &str {
        "SolveOnce"
    }

    fn next(&mut self, solver: &mut Solver) -> Result<Option<Rc<dyn Decision>>, Fail> {
        let found = nested_solve(solver, &mut *self.builder, false, &self.monitors);
        if !found {
            return Err(Fail);
        }
        Ok(None)
    }
}

/// Replays the values captured in an assignment, then delegates to a
/// follow-up builder.
///
/// The iteration cursor is deliberately plain: replay happens on a
/// straight-line prefix of the search.
pub struct AssignVariablesFromAssignment {
    assignment: Assignment,
    builder: Box<dyn DecisionBuilder>,
    vars: Vec<VarIndex>,
    iter: usize,
}

impl AssignVariablesFromAssignment {
    pub fn new(
        assignment: Assignment,
        builder: Box<dyn DecisionBuilder>,
        vars: &[VarIndex],
    ) -> Self {
        Self {
            assignment,
            builder,
            vars: vars.to_vec(),
            iter: 0,
        }
    }
}

impl DecisionBuilder for AssignVariablesFromAssignment {
    fn name(&self) -> &str {
        "AssignVariablesFromAssignment"
    }

    fn next(&mut self, solver: &mut Solver) -> Result<Option<Rc<dyn Decision>>, Fail> {
        if self.iter < self.vars.len() {
            let var = self.vars[self.iter];
            self.iter += 1;
            let value = self.assignment.value(var);
            return Ok(Some(Rc::new(AssignVariableValue::new(var, value))));
        }
        self.builder.next(solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::phase::{Phase, ValueStrategy, VariableStrategy};
    use crate::search::solve;

    #[test]
    fn test_compose_runs_children_in_order() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let y = solver.new_var(0, 1);
        let first = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMaxValue,
        );
        let second = Phase::new(
            &mut solver,
            &[y],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let mut compose = Compose::new(&mut solver, vec![Box::new(first), Box::new(second)]);

        let d1 = compose.next(&mut solver).unwrap().unwrap();
        d1.apply(&mut solver).unwrap();
        assert_eq!(solver.var_value(x), 1, "first child branches first");

        let d2 = compose.next(&mut solver).unwrap().unwrap();
        d2.apply(&mut solver).unwrap();
        assert_eq!(solver.var_value(y), 0);

        assert!(compose.next(&mut solver).unwrap().is_none());
    }

    #[test]
    fn test_solve_once_persists_nested_solution() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 5);
        let inner = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let mut solve_once = SolveOnce::new(Box::new(inner));

        let next = solve_once.next(&mut solver).unwrap();
        assert!(next.is_none(), "a solved subtree yields no decision");
        assert_eq!(
            solver.var_value(x),
            0,
            "nested solution persists into the caller"
        );
    }

    #[test]
    fn test_solve_once_fails_on_unsat_subtree() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        solver.add_greater_or_equal_cst(x, 7);
        let inner = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let mut solve_once = SolveOnce::new(Box::new(inner));

        assert!(
            solve_once.next(&mut solver).is_err(),
            "an unsatisfiable nested solve fails the caller"
        );
    }

    #[test]
    fn test_replay_builder_restores_stored_values() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let y = solver.new_var(0, 9);

        // Capture a solution.
        solver.set_value(x, 4).unwrap();
        solver.set_value(y, 6).unwrap();
        let mut snapshot = Assignment::new();
        snapshot.add_all(&[x, y]);
        snapshot.store(&solver);

        // Fresh state, then replay through a full search.
        let mut replay_solver = Solver::new();
        let rx = replay_solver.new_var(0, 9);
        let ry = replay_solver.new_var(0, 9);
        let mut replay_snapshot = Assignment::new();
        replay_snapshot.add_all(&[rx, ry]);
        replay_snapshot.set_value(rx, snapshot.value(x));
        replay_snapshot.set_value(ry, snapshot.value(y));

        struct Capture {
            values: Rc<std::cell::RefCell<Vec<i64>>>,
            vars: Vec<VarIndex>,
        }
        impl crate::monitor::SearchMonitor for Capture {
            fn name(&self) -> &str {
                "Capture"
            }
            fn at_solution(&mut self, solver: &mut Solver) -> bool {
                let mut values = self.values.borrow_mut();
                values.clear();
                for &var in &self.vars {
                    values.push(solver.var_value(var));
                }
                false
            }
        }

        let tail = Phase::new(
            &mut replay_solver,
            &[rx, ry],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let mut replay =
            AssignVariablesFromAssignment::new(replay_snapshot, Box::new(tail), &[rx, ry]);

        let values = Rc::new(std::cell::RefCell::new(Vec::new()));
        let capture = crate::monitor::monitor_ref(Capture {
            values: values.clone(),
            vars: vec![rx, ry],
        });
        let monitors: Vec<MonitorRef> = vec![capture];
        let found = solve(&mut replay_solver, &mut replay, &monitors);
        assert!(found);
        assert_eq!(*values.borrow(), vec![4, 6]);
    }
}
