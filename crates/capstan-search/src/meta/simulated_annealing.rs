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

//! Simulated annealing with a Cauchy schedule: `T(i) = T0 / i`, where the
//! iteration count starts at the first local optimum.
//!
//! At each applied decision the admissible objective window is relaxed by
//! a random energy `T * ln(U(0, 1))`, negative with probability one, so
//! worse neighbors stay acceptable while the temperature is high.

use crate::branching::decision::Decision;
use crate::meta::ObjectiveTracker;
use crate::monitor::SearchMonitor;
use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use capstan_engine::{Propagation, Solver, VarIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

/// Seed of the private annealing RNG; fixed for reproducible runs.
const ANNEALING_SEED: u64 = 654;

/// The simulated annealing metaheuristic monitor.
pub struct SimulatedAnnealing {
    tracker: ObjectiveTracker,
    temperature0: i64,
    iteration: i64,
    rng: StdRng,
}

impl SimulatedAnnealing {
    /// # Panics
    ///
    /// Panics if `step` is not positive.
    pub fn new(maximize: bool, objective: VarIndex, step: i64, initial_temperature: i64) -> Self {
        Self {
            tracker: ObjectiveTracker::new(maximize, objective, step),
            temperature0: initial_temperature,
            iteration: 0,
            rng: StdRng::seed_from_u64(ANNEALING_SEED),
        }
    }

    fn temperature(&self) -> f64 {
        if self.iteration > 0 {
            self.temperature0 as f64 / self.iteration as f64
        } else {
            0.0
        }
    }
}

impl SearchMonitor for SimulatedAnnealing {
    fn name(&self) -> &str {
        "SimulatedAnnealing"
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
        let energy_bound = (self.temperature() * self.rng.gen::<f64>().ln()) as i64;
        let current = self.tracker.current();
        let step = self.tracker.step();
        if self.tracker.maximize() {
            let bound = if current > i64::MIN {
                current.saturating_add_val(step).saturating_add_val(energy_bound)
            } else {
                current
            };
            solver.add_greater_or_equal_cst(objective, bound);
        } else {
            let bound = if current < i64::MAX {
                current.saturating_sub_val(step).saturating_sub_val(energy_bound)
            } else {
                current
            };
            solver.add_less_or_equal_cst(objective, bound);
        }
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
        true
    }

    fn local_optimum(&mut self, _solver: &mut Solver) -> bool {
        self.tracker.reset_current_to_worst();
        self.iteration += 1;
        self.temperature() > 0.0
    }

    fn on_accept_neighbor(&mut self, _solver: &mut Solver) {
        // The counter only advances once annealing has started; before the
        // first local optimum it stays at zero.
        if self.iteration > 0 {
            self.iteration += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::decision::BalancingDecision;

    #[test]
    fn test_temperature_schedule_is_cauchy() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut annealing = SimulatedAnnealing::new(false, objective, 1, 1000);
        assert_eq!(annealing.temperature(), 0.0, "cold before any optimum");

        annealing.local_optimum(&mut solver);
        assert_eq!(annealing.temperature(), 1000.0);
        annealing.local_optimum(&mut solver);
        assert_eq!(annealing.temperature(), 500.0);
        annealing.local_optimum(&mut solver);
        assert!((annealing.temperature() - 1000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_accept_neighbor_counts_only_after_first_optimum() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut annealing = SimulatedAnnealing::new(false, objective, 1, 1000);

        annealing.on_accept_neighbor(&mut solver);
        assert_eq!(annealing.iteration, 0, "no counting before annealing starts");

        annealing.local_optimum(&mut solver);
        annealing.on_accept_neighbor(&mut solver);
        assert_eq!(annealing.iteration, 2);
    }

    #[test]
    fn test_local_optimum_resets_current_and_continues() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 100);
        let mut annealing = SimulatedAnnealing::new(false, objective, 1, 1000);
        annealing.on_enter_search(&mut solver);

        solver.set_value(objective, 42).unwrap();
        annealing.at_solution(&mut solver);
        assert_eq!(annealing.tracker.current(), 42);
        assert_eq!(annealing.tracker.best(), 42);

        assert!(annealing.local_optimum(&mut solver));
        assert_eq!(
            annealing.tracker.current(),
            i64::MAX,
            "minimizing: the neighborhood reopens from the worst side"
        );
    }

    #[test]
    fn test_apply_posts_relaxed_descent_bound() {
        let mut solver = Solver::new();
        let objective = solver.new_var(0, 1000);
        let mut annealing = SimulatedAnnealing::new(false, objective, 1, 100);
        annealing.on_enter_search(&mut solver);

        let mark = solver.trail_mark();
        solver.set_value(objective, 500).unwrap();
        annealing.at_solution(&mut solver);
        solver.rewind_to(mark);
        annealing.local_optimum(&mut solver);
        // After a local optimum the current is i64::MAX: the posted bound
        // degenerates and nothing is pruned.
        let decision: Rc<dyn Decision> = Rc::new(BalancingDecision);
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
        annealing.on_apply_decision(&mut solver, &plain).unwrap();
        solver.propagate().unwrap();
        assert_eq!(solver.var_max(objective), 1000);

        // Balancing decisions are skipped.
        let constraints_before = solver.constraints();
        annealing.on_apply_decision(&mut solver, &decision).unwrap();
        assert_eq!(solver.constraints(), constraints_before);
    }
}
