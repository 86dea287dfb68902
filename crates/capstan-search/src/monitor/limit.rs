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

//! Search limits.
//!
//! A limit initializes its offsets on `EnterSearch` and runs a periodic
//! check before every decision and on every refutation. Once the check
//! trips, the limit stays crossed and fails every branch until the
//! search unwinds to its root and exits.

use crate::branching::decision::Decision;
use crate::monitor::SearchMonitor;
use capstan_engine::{Fail, Propagation, Solver};
use std::cell::RefCell;
use std::rc::Rc;

const MAX_TIME_CHECK_SKIP: i64 = 100;
const TIME_CHECK_WARMUP: i64 = 100;

/// Budgets on wall time (ms), branches, failures, and solutions.
///
/// Budgets set to `i64::MAX` behave as an unbounded search. With
/// `smart_time_check`, the wall-clock poll is amortized: after a warmup,
/// the observed check rate estimates how many future checks can be
/// skipped within the remaining budget.
pub struct RegularLimit {
    wall_time: i64,
    branches: i64,
    failures: i64,
    solutions: i64,
    smart_time_check: bool,
    wall_time_offset: i64,
    branches_offset: i64,
    failures_offset: i64,
    solutions_offset: i64,
    check_count: i64,
    next_check: i64,
    crossed: bool,
}

impl RegularLimit {
    pub fn new(wall_time: i64, branches: i64, failures: i64, solutions: i64) -> Self {
        Self::with_smart_time_check(wall_time, branches, failures, solutions, false)
    }

    pub fn with_smart_time_check(
        wall_time: i64,
        branches: i64,
        failures: i64,
        solutions: i64,
        smart_time_check: bool,
    ) -> Self {
        Self {
            wall_time,
            branches,
            failures,
            solutions,
            smart_time_check,
            wall_time_offset: 0,
            branches_offset: 0,
            failures_offset: 0,
            solutions_offset: 0,
            check_count: 0,
            next_check: 0,
            crossed: false,
        }
    }

    /// Whether the limit has tripped in the current search.
    #[inline]
    pub fn crossed(&self) -> bool {
        self.crossed
    }

    /// A fresh limit with the same budgets, used by nested solves.
    pub fn make_clone(&self) -> Self {
        Self::with_smart_time_check(
            self.wall_time,
            self.branches,
            self.failures,
            self.solutions,
            self.smart_time_check,
        )
    }

    /// Copies the budgets of another limit into this one.
    pub fn copy_limits_from(&mut self, other: &RegularLimit) {
        self.wall_time = other.wall_time;
        self.branches = other.branches;
        self.failures = other.failures;
        self.solutions = other.solutions;
    }

    /// Replaces the budgets in place.
    pub fn update_limits(&mut self, wall_time: i64, branches: i64, failures: i64, solutions: i64) {
        self.wall_time = wall_time;
        self.branches = branches;
        self.failures = failures;
        self.solutions = solutions;
    }

    /// True iff any budget is exceeded relative to the `EnterSearch`
    /// offsets.
    pub fn check(&mut self, solver: &Solver) -> bool {
        // Budgets may be i64::MAX; compare against the subtracted counter
        // rather than moving the offset to the other side.
        solver.branches() - self.branches_offset > self.branches
            || solver.failures() - self.failures_offset > self.failures
            || self.check_time(solver)
            || solver.solutions() - self.solutions_offset >= self.solutions
    }

    fn check_time(&mut self, solver: &Solver) -> bool {
        self.check_count += 1;
        if self.wall_time == i64::MAX || self.next_check > self.check_count {
            return false;
        }
        let time_delta = solver.wall_time() - self.wall_time_offset;
        if self.smart_time_check && self.check_count > TIME_CHECK_WARMUP && time_delta > 0 {
            let approximate_calls = (self.wall_time * self.check_count) / time_delta;
            self.next_check = self.check_count + approximate_calls.min(MAX_TIME_CHECK_SKIP);
        }
        time_delta > self.wall_time
    }

    fn periodic_check(&mut self, solver: &Solver) -> Propagation {
        if self.crossed || self.check(solver) {
            self.crossed = true;
            return Err(Fail);
        }
        Ok(())
    }
}

impl SearchMonitor for RegularLimit {
    fn name(&self) -> &str {
        "RegularLimit"
    }

    fn on_enter_search(&mut self, solver: &mut Solver) {
        self.crossed = false;
        self.branches_offset = solver.branches();
        self.failures_offset = solver.failures();
        self.wall_time_offset = solver.wall_time();
        self.solutions_offset = solver.solutions();
        self.check_count = 0;
        self.next_check = 0;
    }

    fn on_begin_next_decision(&mut self, solver: &mut Solver, _builder: &str) -> Propagation {
        self.periodic_check(solver)
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.periodic_check(solver)
    }
}

impl std::fmt::Display for RegularLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RegularLimit(crossed = {}, wall_time = {}, branches = {}, failures = {}, solutions = {})",
            self.crossed, self.wall_time, self.branches, self.failures, self.solutions
        )
    }
}

/// A limit delegating its check to a user predicate.
pub struct CustomLimit {
    limiter: Rc<RefCell<dyn FnMut() -> bool>>,
    cloned: bool,
    crossed: bool,
}

impl CustomLimit {
    pub fn new<F>(limiter: F) -> Self
    where
        F: FnMut() -> bool + 'static,
    {
        Self {
            limiter: Rc::new(RefCell::new(limiter)),
            cloned: false,
            crossed: false,
        }
    }

    /// A limit sharing this one's predicate.
    pub fn make_clone(&self) -> Self {
        Self {
            limiter: Rc::clone(&self.limiter),
            cloned: true,
            crossed: false,
        }
    }

    /// Copies the predicate of another custom limit.
    ///
    /// # Panics
    ///
    /// Panics when called on a limit that owns its predicate; only clones
    /// may be re-pointed.
    pub fn copy_limits_from(&mut self, other: &CustomLimit) {
        assert!(
            self.cloned,
            "cannot copy into a non-clone custom limit"
        );
        self.limiter = Rc::clone(&other.limiter);
    }

    #[inline]
    pub fn crossed(&self) -> bool {
        self.crossed
    }

    fn periodic_check(&mut self) -> Propagation {
        if self.crossed || (&mut *self.limiter.borrow_mut())() {
            self.crossed = true;
            return Err(Fail);
        }
        Ok(())
    }
}

impl SearchMonitor for CustomLimit {
    fn name(&self) -> &str {
        "CustomLimit"
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.crossed = false;
    }

    fn on_begin_next_decision(&mut self, _solver: &mut Solver, _builder: &str) -> Propagation {
        self.periodic_check()
    }

    fn on_refute_decision(
        &mut self,
        _solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.periodic_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_budget_trips() {
        let mut solver = Solver::new();
        let mut limit = RegularLimit::new(i64::MAX, 2, i64::MAX, i64::MAX);
        limit.on_enter_search(&mut solver);

        assert!(!limit.check(&solver));
        solver.note_branch();
        solver.note_branch();
        assert!(!limit.check(&solver), "budget is exceeded, not reached");
        solver.note_branch();
        assert!(limit.check(&solver));
    }

    #[test]
    fn test_solution_budget_is_inclusive() {
        let mut solver = Solver::new();
        let mut limit = RegularLimit::new(i64::MAX, i64::MAX, i64::MAX, 1);
        limit.on_enter_search(&mut solver);

        assert!(!limit.check(&solver));
        solver.note_solution();
        assert!(limit.check(&solver), "the solution budget trips at equality");
    }

    #[test]
    fn test_offsets_ignore_prior_work() {
        let mut solver = Solver::new();
        for _ in 0..10 {
            solver.note_failure();
        }
        let mut limit = RegularLimit::new(i64::MAX, i64::MAX, 5, i64::MAX);
        limit.on_enter_search(&mut solver);
        assert!(
            !limit.check(&solver),
            "failures before EnterSearch must not count"
        );
    }

    #[test]
    fn test_crossed_is_sticky() {
        let mut solver = Solver::new();
        let mut limit = RegularLimit::new(i64::MAX, 0, i64::MAX, i64::MAX);
        limit.on_enter_search(&mut solver);
        solver.note_branch();
        assert!(limit.periodic_check(&solver).is_err());

        // Even if counters regressed, a crossed limit keeps failing.
        assert!(limit.periodic_check(&solver).is_err());
        assert!(limit.crossed());
    }

    #[test]
    fn test_all_max_budgets_never_trip() {
        let mut solver = Solver::new();
        let mut limit = RegularLimit::new(i64::MAX, i64::MAX, i64::MAX, i64::MAX);
        limit.on_enter_search(&mut solver);
        for _ in 0..1000 {
            solver.note_branch();
            solver.note_failure();
        }
        assert!(!limit.check(&solver));
    }

    #[test]
    fn test_clone_and_copy_budgets() {
        let original = RegularLimit::new(100, 200, 300, 400);
        let clone = original.make_clone();
        assert_eq!(clone.wall_time, 100);
        assert_eq!(clone.branches, 200);

        let mut other = RegularLimit::new(1, 1, 1, 1);
        other.copy_limits_from(&original);
        assert_eq!(other.failures, 300);
        assert_eq!(other.solutions, 400);
    }

    #[test]
    fn test_custom_limit_delegates() {
        let mut solver = Solver::new();
        let hits = Rc::new(RefCell::new(0));
        let hits_in = hits.clone();
        let mut limit = CustomLimit::new(move || {
            *hits_in.borrow_mut() += 1;
            *hits_in.borrow() >= 3
        });
        limit.on_enter_search(&mut solver);

        assert!(limit.on_begin_next_decision(&mut solver, "db").is_ok());
        assert!(limit.on_begin_next_decision(&mut solver, "db").is_ok());
        assert!(limit.on_begin_next_decision(&mut solver, "db").is_err());
        assert_eq!(*hits.borrow(), 3);
    }

    #[test]
    #[should_panic(expected = "cannot copy into a non-clone custom limit")]
    fn test_copy_into_non_clone_custom_limit_panics() {
        let source = CustomLimit::new(|| false);
        let mut owner = CustomLimit::new(|| false);
        owner.copy_limits_from(&source);
    }
}
