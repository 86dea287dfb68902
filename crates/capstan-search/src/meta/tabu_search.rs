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

//! Tabu search.
//!
//! Keeps two stamped FIFO lists over the tracked variables: entries in
//! the *keep* list must retain their value, entries in the *forbid* list
//! must not take theirs. The tabu criterion is softened by a factor in
//! `[0, 1]` giving the fraction of entries that must hold, and an
//! aspiration literal overrides the whole criterion when the candidate
//! beats the best known objective. A strict-descent bound and a plateau
//! exclusion on the previous objective value complete the neighborhood
//! constraint posted at every applied decision.

use crate::branching::decision::Decision;
use crate::meta::ObjectiveTracker;
use crate::monitor::SearchMonitor;
use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use capstan_engine::{Assignment, Propagation, Solver, VarIndex};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
struct VarValue {
    var: VarIndex,
    value: i64,
    stamp: i64,
}

/// The tabu search metaheuristic monitor.
pub struct TabuSearch {
    tracker: ObjectiveTracker,
    vars: Vec<VarIndex>,
    assignment: Assignment,
    last: i64,
    /// Front is the newest entry; aging pops from the back.
    keep_tabu_list: VecDeque<VarValue>,
    keep_tenure: i64,
    forbid_tabu_list: VecDeque<VarValue>,
    forbid_tenure: i64,
    tabu_factor: f64,
    stamp: i64,
}

impl TabuSearch {
    /// # Panics
    ///
    /// Panics if `step` is not positive or `tabu_factor` is outside
    /// `[0, 1]`.
    pub fn new(
        maximize: bool,
        objective: VarIndex,
        step: i64,
        vars: &[VarIndex],
        keep_tenure: i64,
        forbid_tenure: i64,
        tabu_factor: f64,
    ) -> Self {
        assert!(
            (0.0..=1.0).contains(&tabu_factor),
            "called `TabuSearch::new` with tabu factor {}, but it must be within [0, 1]",
            tabu_factor
        );
        let mut assignment = Assignment::new();
        assignment.add_all(vars);
        Self {
            tracker: ObjectiveTracker::new(maximize, objective, step),
            vars: vars.to_vec(),
            assignment,
            last: i64::MAX,
            keep_tabu_list: VecDeque::new(),
            keep_tenure,
            forbid_tabu_list: VecDeque::new(),
            forbid_tenure,
            tabu_factor,
            stamp: 0,
        }
    }

    fn age_list(tenure: i64, stamp: i64, list: &mut VecDeque<VarValue>) {
        while list
            .back()
            .is_some_and(|entry| entry.stamp < stamp - tenure)
        {
            list.pop_back();
        }
    }

    fn age_lists(&mut self) {
        Self::age_list(self.keep_tenure, self.stamp, &mut self.keep_tabu_list);
        Self::age_list(self.forbid_tenure, self.stamp, &mut self.forbid_tabu_list);
        self.stamp += 1;
    }

    #[cfg(test)]
    fn list_lens(&self) -> (usize, usize) {
        (self.keep_tabu_list.len(), self.forbid_tabu_list.len())
    }
}

impl SearchMonitor for TabuSearch {
    fn name(&self) -> &str {
        "TabuSearch"
    }

    fn on_enter_search(&mut self, solver: &mut Solver) {
        self.tracker.enter_search(solver);
    }

    fn on_apply_decision(
        &mut self,
        solver: &mut Solver,
        decision: &Rc<dyn Decision>,
    ) -> Propagation {
        if decision.is_balancing() {
            return Ok(());
        }
        let objective = self.tracker.objective();

        // Aspiration criterion: a neighbor beating the best solution found
        // so far is exempt from the tabu criterion.
        let aspiration = solver.make_bool_var();
        if self.tracker.maximize() {
            solver.add_is_greater_or_equal_cst(objective, self.tracker.aspiration_bound(), aspiration);
        } else {
            solver.add_is_less_or_equal_cst(objective, self.tracker.aspiration_bound(), aspiration);
        }

        // Tabu criterion, softened by the tabu factor: the fraction of
        // entries that must hold.
        let mut tabu_vars: Vec<VarIndex> = Vec::new();
        for entry in &self.keep_tabu_list {
            let literal = solver.make_bool_var();
            solver.add_is_equal_cst(entry.var, entry.value, literal);
            tabu_vars.push(literal);
        }
        for entry in &self.forbid_tabu_list {
            let literal = solver.make_bool_var();
            solver.add_is_different_cst(entry.var, entry.value, literal);
            tabu_vars.push(literal);
        }
        if !tabu_vars.is_empty() {
            let threshold = (tabu_vars.len() as f64 * self.tabu_factor).ceil() as i64;
            let tabu = solver.make_bool_var();
            let literal_sum = solver.make_sum(&tabu_vars);
            solver.add_is_greater_or_equal_cst(literal_sum, threshold, tabu);
            let either = solver.make_sum(&[aspiration, tabu]);
            solver.add_greater_or_equal_cst(either, 1);
        }

        // Strict descent from the current solution.
        if self.tracker.maximize() {
            solver.add_greater_or_equal_cst(
                objective,
                self.tracker.current().saturating_add_val(self.tracker.step()),
            );
        } else {
            solver.add_less_or_equal_cst(
                objective,
                self.tracker.current().saturating_sub_val(self.tracker.step()),
            );
        }

        // Cost plateaus lead to tabu cycles; exclude the last value.
        solver.add_not_equal_cst(objective, self.last);
        Ok(())
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.tracker.check_refute_bound(solver)
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        let value = solver.var_value(self.tracker.objective());
        self.tracker.at_solution(value);
        self.last = value;

        // Diff against the previous solution; skipped for the very first
        // one (stamp still zero), which has nothing to diff against.
        if self.stamp != 0 {
            for &var in &self.vars {
                let old_value = self.assignment.value(var);
                let new_value = solver.var_value(var);
                if old_value != new_value {
                    self.keep_tabu_list.push_front(VarValue {
                        var,
                        value: new_value,
                        stamp: self.stamp,
                    });
                    self.forbid_tabu_list.push_front(VarValue {
                        var,
                        value: old_value,
                        stamp: self.stamp,
                    });
                }
            }
        }
        self.assignment.store(solver);
        true
    }

    fn local_optimum(&mut self, _solver: &mut Solver) -> bool {
        self.age_lists();
        self.tracker.reset_current_to_worst();
        true
    }

    fn on_accept_neighbor(&mut self, _solver: &mut Solver) {
        if self.stamp != 0 {
            self.age_lists();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::decision::BalancingDecision;

    fn setup() -> (Solver, Vec<VarIndex>, VarIndex) {
        let mut solver = Solver::new();
        let vars: Vec<VarIndex> = (0..3).map(|_| solver.new_var(0, 9)).collect();
        let objective = solver.new_var(0, 100);
        (solver, vars, objective)
    }

    fn bind_all(solver: &mut Solver, vars: &[VarIndex], values: &[i64], objective: VarIndex, o: i64) {
        for (&var, &value) in vars.iter().zip(values) {
            solver.set_value(var, value).unwrap();
        }
        solver.set_value(objective, o).unwrap();
    }

    #[test]
    #[should_panic(expected = "called `TabuSearch::new` with tabu factor 1.5")]
    fn test_factor_out_of_range_panics() {
        let (_, vars, objective) = setup();
        let _ = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.5);
    }

    #[test]
    fn test_first_solution_does_not_populate_lists() {
        let (mut solver, vars, objective) = setup();
        let mut tabu = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.0);
        tabu.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        bind_all(&mut solver, &vars, &[1, 2, 3], objective, 50);
        assert!(tabu.at_solution(&mut solver));
        assert_eq!(tabu.list_lens(), (0, 0));
        solver.rewind_to(mark);
    }

    #[test]
    fn test_solution_diff_fills_keep_and_forbid() {
        let (mut solver, vars, objective) = setup();
        let mut tabu = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.0);
        tabu.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        bind_all(&mut solver, &vars, &[1, 2, 3], objective, 50);
        tabu.at_solution(&mut solver);
        solver.rewind_to(mark);

        // A local optimum advances the stamp, enabling list updates.
        assert!(tabu.local_optimum(&mut solver));

        let mark = solver.trail_mark();
        bind_all(&mut solver, &vars, &[1, 7, 3], objective, 45);
        tabu.at_solution(&mut solver);
        solver.rewind_to(mark);

        // Exactly one variable changed.
        assert_eq!(tabu.list_lens(), (1, 1));
        let keep = tabu.keep_tabu_list.front().unwrap();
        assert_eq!(keep.var, vars[1]);
        assert_eq!(keep.value, 7, "keep list pins the new value");
        let forbid = tabu.forbid_tabu_list.front().unwrap();
        assert_eq!(forbid.value, 2, "forbid list bans the old value");
    }

    #[test]
    fn test_aging_drops_entries_past_tenure() {
        let (mut solver, vars, objective) = setup();
        let mut tabu = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.0);
        tabu.on_enter_search(&mut solver);

        // Seed entries at three consecutive stamps by alternating
        // solutions and local optima; each solution changes one variable.
        let assignments: [[i64; 3]; 4] = [[1, 2, 3], [4, 2, 3], [4, 5, 3], [4, 5, 6]];
        for values in &assignments {
            let mark = solver.trail_mark();
            bind_all(&mut solver, &vars, values, objective, 50);
            tabu.at_solution(&mut solver);
            solver.rewind_to(mark);
            tabu.local_optimum(&mut solver);
        }
        // Entries stamped 1, 2, 3; nothing aged out yet with tenure 2.
        assert_eq!(tabu.list_lens(), (3, 3));

        // Two idle aging rounds: stamp 4 drops the stamp-1 entries,
        // stamp 5 drops the stamp-2 entries.
        tabu.local_optimum(&mut solver);
        assert_eq!(tabu.list_lens(), (2, 2));
        tabu.local_optimum(&mut solver);
        assert_eq!(tabu.list_lens(), (1, 1));
        assert_eq!(tabu.keep_tabu_list.front().unwrap().stamp, 3);
    }

    #[test]
    fn test_apply_posts_descent_and_plateau_constraints() {
        let (mut solver, vars, objective) = setup();
        let mut tabu = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.0);
        tabu.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        bind_all(&mut solver, &vars, &[1, 2, 3], objective, 50);
        tabu.at_solution(&mut solver);
        solver.rewind_to(mark);

        let decision: Rc<dyn Decision> = Rc::new(BalancingDecision);
        // The balancing sentinel is skipped entirely.
        let constraints_before = solver.constraints();
        tabu.on_apply_decision(&mut solver, &decision).unwrap();
        assert_eq!(solver.constraints(), constraints_before);

        struct Plain;
        impl Decision for Plain {
            fn apply(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn refute(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn describe(&self) -> String {
                "plain".into()
            }
        }
        let plain: Rc<dyn Decision> = Rc::new(Plain);
        tabu.on_apply_decision(&mut solver, &plain).unwrap();
        solver.propagate().unwrap();
        // Strict descent from 50 with step 1.
        assert!(solver.var_max(objective) <= 49);
    }

    #[test]
    fn test_refute_fails_when_best_unreachable() {
        let (mut solver, vars, objective) = setup();
        let mut tabu = TabuSearch::new(false, objective, 1, &vars, 2, 2, 1.0);
        tabu.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        bind_all(&mut solver, &vars, &[1, 2, 3], objective, 10);
        tabu.at_solution(&mut solver);
        solver.rewind_to(mark);

        solver.set_min(objective, 10).unwrap();
        let decision: Rc<dyn Decision> = Rc::new(BalancingDecision);
        assert!(tabu.on_refute_decision(&mut solver, &decision).is_err());
    }
}
