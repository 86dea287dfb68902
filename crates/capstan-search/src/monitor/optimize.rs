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

//! Objective bounding: branch-and-bound through the monitor protocol.
//!
//! The refute-time bound is what makes branch-and-bound prune: every
//! right branch starts with `objective` forced strictly past the best
//! known solution.

use crate::branching::decision::Decision;
use crate::monitor::SearchMonitor;
use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use capstan_engine::{Propagation, Solver, VarIndex};
use std::rc::Rc;

/// Bounds an objective variable during search.
pub struct OptimizeVar {
    maximize: bool,
    var: VarIndex,
    step: i64,
    best: i64,
}

impl OptimizeVar {
    /// # Panics
    ///
    /// Panics if `step` is not positive.
    pub fn new(maximize: bool, var: VarIndex, step: i64) -> Self {
        assert!(
            step > 0,
            "called `OptimizeVar::new` with step {}, but step must be positive",
            step
        );
        Self {
            maximize,
            var,
            step,
            best: if maximize { i64::MIN } else { i64::MAX },
        }
    }

    /// Minimizing form.
    pub fn minimize(var: VarIndex, step: i64) -> Self {
        Self::new(false, var, step)
    }

    /// Maximizing form.
    pub fn maximize(var: VarIndex, step: i64) -> Self {
        Self::new(true, var, step)
    }

    /// Best objective value seen so far (worst-side sentinel before the
    /// first solution).
    #[inline]
    pub fn best(&self) -> i64 {
        self.best
    }

    #[inline]
    pub fn var(&self) -> VarIndex {
        self.var
    }

    /// Forces the objective strictly past the best known solution.
    fn apply_bound(&self, solver: &mut Solver) -> Propagation {
        if self.maximize {
            solver.set_min(self.var, self.best.saturating_add_val(self.step))
        } else {
            solver.set_max(self.var, self.best.saturating_sub_val(self.step))
        }
    }
}

impl SearchMonitor for OptimizeVar {
    fn name(&self) -> &str {
        if self.maximize {
            "MaximizeVar"
        } else {
            "MinimizeVar"
        }
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.best = if self.maximize { i64::MIN } else { i64::MAX };
    }

    fn on_restart_search(&mut self, solver: &mut Solver) -> Propagation {
        self.apply_bound(solver)
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.apply_bound(solver)
    }

    fn accept_solution(&mut self, solver: &mut Solver) -> bool {
        let value = solver.var_value(self.var);
        // The bound applied on refutation makes this always true in
        // sequential search; kept as a guard for reentrant uses.
        (self.maximize && value > self.best) || (!self.maximize && value < self.best)
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        let value = solver.var_value(self.var);
        if self.maximize {
            assert!(
                value > self.best,
                "objective regressed at a solution: {} vs best {}",
                value,
                self.best
            );
        } else {
            assert!(
                value < self.best,
                "objective regressed at a solution: {} vs best {}",
                value,
                self.best
            );
        }
        self.best = value;
        true
    }
}

impl std::fmt::Display for OptimizeVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}, step = {}, best = {})",
            self.name(),
            self.var,
            self.step,
            self.best
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "called `OptimizeVar::new` with step 0")]
    fn test_zero_step_panics() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 10);
        let _ = OptimizeVar::minimize(objective, 0);
    }

    #[test]
    fn test_best_tracks_solutions_monotonically() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut optimize = OptimizeVar::minimize(objective, 1);
        optimize.on_enter_search(&mut solver);
        assert_eq!(optimize.best(), i64::MAX);

        let mark = solver.trail_mark();
        solver.set_value(objective, 40).unwrap();
        assert!(optimize.accept_solution(&mut solver));
        assert!(optimize.at_solution(&mut solver));
        assert_eq!(optimize.best(), 40);

        solver.rewind_to(mark);
        solver.set_value(objective, 25).unwrap();
        assert!(optimize.at_solution(&mut solver));
        assert_eq!(optimize.best(), 25);
    }

    #[test]
    fn test_refute_bound_prunes() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut optimize = OptimizeVar::minimize(objective, 1);
        optimize.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        solver.set_value(objective, 10).unwrap();
        optimize.at_solution(&mut solver);
        solver.rewind_to(mark);

        // After a solution at 10, the refute-time bound forces <= 9.
        let decision: Rc<dyn Decision> = Rc::new(crate::branching::decision::BalancingDecision);
        optimize
            .on_refute_decision(&mut solver, &decision)
            .unwrap();
        assert_eq!(solver.var_max(objective), 9);

        // A branch that cannot beat the best fails immediately.
        solver.set_min(objective, 10).unwrap_err();
    }

    #[test]
    fn test_maximize_direction() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut optimize = OptimizeVar::maximize(objective, 2);
        optimize.on_enter_search(&mut solver);
        assert_eq!(optimize.best(), i64::MIN);

        let mark = solver.trail_mark();
        solver.set_value(objective, 30).unwrap();
        optimize.at_solution(&mut solver);
        solver.rewind_to(mark);

        let decision: Rc<dyn Decision> = Rc::new(crate::branching::decision::BalancingDecision);
        optimize
            .on_refute_decision(&mut solver, &decision)
            .unwrap();
        assert_eq!(solver.var_min(objective), 32, "step 2 past the best of 30");
    }
}
