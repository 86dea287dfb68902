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

//! Solution collectors.
//!
//! All collectors share the same storage: a prototype assignment cloned
//! per captured solution, with retired snapshots recycled to avoid
//! re-allocating, and per-solution wall-time/branch/failure/objective
//! records. They differ only in their `at_solution` policy.

use crate::monitor::SearchMonitor;
use capstan_engine::{Assignment, Solver, VarIndex};

#[derive(Debug, Clone)]
struct CollectedSolution {
    assignment: Option<Assignment>,
    wall_time: i64,
    branches: i64,
    failures: i64,
    objective: i64,
}

/// Shared storage of the collector family.
#[derive(Debug, Clone, Default)]
struct SolutionStore {
    prototype: Option<Assignment>,
    solutions: Vec<CollectedSolution>,
    recycled: Vec<Assignment>,
}

impl SolutionStore {
    fn new(prototype: Option<&Assignment>) -> Self {
        Self {
            prototype: prototype.cloned(),
            solutions: Vec::new(),
            recycled: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.solutions.clear();
        self.recycled.clear();
    }

    fn push_solution(&mut self, solver: &Solver) {
        let assignment = self.prototype.as_ref().map(|prototype| {
            let mut snapshot = self.recycled.pop().unwrap_or_else(|| prototype.clone());
            snapshot.store(solver);
            snapshot
        });
        let objective = assignment
            .as_ref()
            .filter(|a| a.has_objective())
            .map_or(0, |a| a.objective_value());
        self.solutions.push(CollectedSolution {
            assignment,
            wall_time: solver.wall_time(),
            branches: solver.branches(),
            failures: solver.failures(),
            objective,
        });
    }

    fn pop_solution(&mut self) {
        if let Some(popped) = self.solutions.pop() {
            if let Some(assignment) = popped.assignment {
                self.recycled.push(assignment);
            }
        }
    }

    #[track_caller]
    fn check_index(&self, n: usize) {
        assert!(
            n < self.solutions.len(),
            "wrong index in solution getter: the count is {} but the index is {}",
            self.solutions.len(),
            n
        );
    }
}

macro_rules! collector_accessors {
    () => {
        /// Number of captured solutions.
        #[inline]
        pub fn solution_count(&self) -> usize {
            self.store.solutions.len()
        }

        /// The `n`-th captured assignment, `None` when the collector was
        /// built without a prototype.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range.
        pub fn solution(&self, n: usize) -> Option<&Assignment> {
            self.store.check_index(n);
            self.store.solutions[n].assignment.as_ref()
        }

        /// Wall time at capture, in milliseconds.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range.
        pub fn wall_time(&self, n: usize) -> i64 {
            self.store.check_index(n);
            self.store.solutions[n].wall_time
        }

        /// Branch count at capture.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range.
        pub fn branches(&self, n: usize) -> i64 {
            self.store.check_index(n);
            self.store.solutions[n].branches
        }

        /// Failure count at capture.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range.
        pub fn failures(&self, n: usize) -> i64 {
            self.store.check_index(n);
            self.store.solutions[n].failures
        }

        /// Objective value at capture, 0 without an objective.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range.
        pub fn objective_value(&self, n: usize) -> i64 {
            self.store.check_index(n);
            self.store.solutions[n].objective
        }

        /// The captured value of `var` in solution `n`.
        ///
        /// # Panics
        ///
        /// Panics if `n` is out of range, the collector has no
        /// prototype, or `var` is not in the prototype.
        pub fn value(&self, n: usize, var: VarIndex) -> i64 {
            self.store.check_index(n);
            self.store.solutions[n]
                .assignment
                .as_ref()
                .expect("collector built without a prototype")
                .value(var)
        }
    };
}

/// Captures the first accepted solution, then stops the search (unless
/// another monitor asks to continue).
pub struct FirstSolutionCollector {
    store: SolutionStore,
    done: bool,
}

impl FirstSolutionCollector {
    pub fn new(prototype: &Assignment) -> Self {
        Self {
            store: SolutionStore::new(Some(prototype)),
            done: false,
        }
    }

    /// Counts solutions without capturing values.
    pub fn without_prototype() -> Self {
        Self {
            store: SolutionStore::new(None),
            done: false,
        }
    }

    collector_accessors!();
}

impl SearchMonitor for FirstSolutionCollector {
    fn name(&self) -> &str {
        "FirstSolutionCollector"
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.store.clear();
        self.done = false;
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        if !self.done {
            self.store.push_solution(solver);
            self.done = true;
        }
        false
    }
}

/// Keeps only the most recent solution.
pub struct LastSolutionCollector {
    store: SolutionStore,
}

impl LastSolutionCollector {
    pub fn new(prototype: &Assignment) -> Self {
        Self {
            store: SolutionStore::new(Some(prototype)),
        }
    }

    pub fn without_prototype() -> Self {
        Self {
            store: SolutionStore::new(None),
        }
    }

    collector_accessors!();
}

impl SearchMonitor for LastSolutionCollector {
    fn name(&self) -> &str {
        "LastSolutionCollector"
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.store.clear();
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        self.store.pop_solution();
        self.store.push_solution(solver);
        true
    }
}

/// Keeps the solution with the best objective under the configured
/// direction. Requires a prototype carrying an objective variable to
/// capture anything.
pub struct BestValueSolutionCollector {
    store: SolutionStore,
    maximize: bool,
    best: i64,
}

impl BestValueSolutionCollector {
    pub fn new(prototype: &Assignment, maximize: bool) -> Self {
        Self {
            store: SolutionStore::new(Some(prototype)),
            maximize,
            best: if maximize { i64::MIN } else { i64::MAX },
        }
    }

    collector_accessors!();
}

impl SearchMonitor for BestValueSolutionCollector {
    fn name(&self) -> &str {
        "BestValueSolutionCollector"
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.store.clear();
        self.best = if self.maximize { i64::MIN } else { i64::MAX };
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        let objective = self
            .store
            .prototype
            .as_ref()
            .and_then(|prototype| prototype.objective());
        if let Some(objective) = objective {
            if self.maximize && solver.var_max(objective) > self.best {
                self.store.pop_solution();
                self.store.push_solution(solver);
                self.best = solver.var_max(objective);
            } else if !self.maximize && solver.var_min(objective) < self.best {
                self.store.pop_solution();
                self.store.push_solution(solver);
                self.best = solver.var_min(objective);
            }
        }
        true
    }
}

/// Captures every accepted solution.
pub struct AllSolutionCollector {
    store: SolutionStore,
}

impl AllSolutionCollector {
    pub fn new(prototype: &Assignment) -> Self {
        Self {
            store: SolutionStore::new(Some(prototype)),
        }
    }

    pub fn without_prototype() -> Self {
        Self {
            store: SolutionStore::new(None),
        }
    }

    collector_accessors!();
}

impl SearchMonitor for AllSolutionCollector {
    fn name(&self) -> &str {
        "AllSolutionCollector"
    }

    fn on_enter_search(&mut self, _solver: &mut Solver) {
        self.store.clear();
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        self.store.push_solution(solver);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_solver() -> (Solver, VarIndex) {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        solver.set_value(x, 5).unwrap();
        (solver, x)
    }

    fn prototype_for(x: VarIndex) -> Assignment {
        let mut prototype = Assignment::new();
        prototype.add(x);
        prototype
    }

    #[test]
    fn test_first_captures_once() {
        let (mut solver, x) = bound_solver();
        let mut collector = FirstSolutionCollector::new(&prototype_for(x));
        collector.on_enter_search(&mut solver);

        assert!(!collector.at_solution(&mut solver));
        assert!(!collector.at_solution(&mut solver));
        assert_eq!(collector.solution_count(), 1);
        assert_eq!(collector.value(0, x), 5);
    }

    #[test]
    fn test_last_keeps_only_latest() {
        let (mut solver, x) = bound_solver();
        let mut collector = LastSolutionCollector::new(&prototype_for(x));
        collector.on_enter_search(&mut solver);

        assert!(collector.at_solution(&mut solver));
        assert!(collector.at_solution(&mut solver));
        assert_eq!(collector.solution_count(), 1);
    }

    #[test]
    fn test_all_pushes_each_solution() {
        let (mut solver, x) = bound_solver();
        let mut collector = AllSolutionCollector::new(&prototype_for(x));
        collector.on_enter_search(&mut solver);

        collector.at_solution(&mut solver);
        collector.at_solution(&mut solver);
        collector.at_solution(&mut solver);
        assert_eq!(collector.solution_count(), 3);
    }

    #[test]
    fn test_best_replaces_only_on_strict_improvement() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let objective = solver.new_var(0, 100);
        let mut prototype = Assignment::new();
        prototype.add(x);
        prototype.add_objective(objective);
        let mut collector = BestValueSolutionCollector::new(&prototype, false);
        collector.on_enter_search(&mut solver);

        solver.set_value(x, 1).unwrap();
        solver.set_value(objective, 40).unwrap();
        collector.at_solution(&mut solver);
        assert_eq!(collector.solution_count(), 1);
        assert_eq!(collector.objective_value(0), 40);

        // An equal objective is not a strict improvement; nothing changes.
        collector.at_solution(&mut solver);
        assert_eq!(collector.solution_count(), 1);
        assert_eq!(collector.objective_value(0), 40);
    }

    #[test]
    #[should_panic(expected = "wrong index in solution getter")]
    fn test_out_of_range_accessor_panics() {
        let (_, x) = bound_solver();
        let collector = AllSolutionCollector::new(&prototype_for(x));
        let _ = collector.objective_value(0);
    }

    #[test]
    fn test_recycled_slots_are_reused() {
        let (mut solver, x) = bound_solver();
        let mut collector = LastSolutionCollector::new(&prototype_for(x));
        collector.on_enter_search(&mut solver);

        collector.at_solution(&mut solver);
        collector.at_solution(&mut solver);
        // One live solution plus one recycled slot; nothing leaked.
        assert_eq!(collector.store.solutions.len(), 1);
        assert!(collector.store.recycled.len() <= 1);
    }
}
