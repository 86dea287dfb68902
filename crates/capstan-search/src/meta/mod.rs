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

//! Metaheuristic monitors.
//!
//! All metaheuristics share the same skeleton: they track a `current` and
//! `best` objective value, post neighborhood-shaping constraints when a
//! decision is applied, refuse right branches that cannot beat the best
//! solution, and react to the local-search events (`local_optimum`,
//! `accept_neighbor`, `accept_delta`).

pub mod guided_local_search;
pub mod simulated_annealing;
pub mod tabu_search;

use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use capstan_engine::{Fail, Propagation, Solver, VarIndex};

/// Objective bookkeeping shared by the metaheuristic monitors.
pub(crate) struct ObjectiveTracker {
    maximize: bool,
    objective: VarIndex,
    step: i64,
    current: i64,
    best: i64,
}

impl ObjectiveTracker {
    /// # Panics
    ///
    /// Panics if `step` is not positive.
    pub(crate) fn new(maximize: bool, objective: VarIndex, step: i64) -> Self {
        assert!(
            step > 0,
            "metaheuristic step must be positive, got {}",
            step
        );
        Self {
            maximize,
            objective,
            step,
            current: i64::MAX,
            best: i64::MAX,
        }
    }

    #[inline]
    pub(crate) fn maximize(&self) -> bool {
        self.maximize
    }

    #[inline]
    pub(crate) fn objective(&self) -> VarIndex {
        self.objective
    }

    #[inline]
    pub(crate) fn step(&self) -> i64 {
        self.step
    }

    #[inline]
    pub(crate) fn current(&self) -> i64 {
        self.current
    }

    #[inline]
    pub(crate) fn set_current(&mut self, value: i64) {
        self.current = value;
    }

    #[inline]
    pub(crate) fn best(&self) -> i64 {
        self.best
    }

    /// Resets `best` and `current` to the objective's reachable optimum at
    /// search entry.
    pub(crate) fn enter_search(&mut self, solver: &Solver) {
        self.best = if self.maximize {
            solver.var_min(self.objective)
        } else {
            solver.var_max(self.objective)
        };
        self.current = self.best;
    }

    /// Records a solution value; `best` moves monotonically.
    pub(crate) fn at_solution(&mut self, value: i64) {
        self.best = if self.maximize {
            value.max(self.best)
        } else {
            value.min(self.best)
        };
        self.current = value;
    }

    /// Resets `current` to the worst side, re-opening the neighborhood.
    pub(crate) fn reset_current_to_worst(&mut self) {
        self.current = if self.maximize { i64::MIN } else { i64::MAX };
    }

    /// `best + step` for maximization, `best - step` for minimization.
    #[inline]
    pub(crate) fn aspiration_bound(&self) -> i64 {
        if self.maximize {
            self.best.saturating_add_val(self.step)
        } else {
            self.best.saturating_sub_val(self.step)
        }
    }

    /// The base refute-time check: a right branch that cannot beat the
    /// best known solution fails immediately.
    pub(crate) fn check_refute_bound(&self, solver: &Solver) -> Propagation {
        if self.maximize {
            if solver.var_max(self.objective) < self.best.saturating_add_val(self.step) {
                return Err(Fail);
            }
        } else if solver.var_min(self.objective) > self.best.saturating_sub_val(self.step) {
            return Err(Fail);
        }
        Ok(())
    }
}
