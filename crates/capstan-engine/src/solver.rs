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

//! The `Solver`: variable store, reversible cells, constraint store,
//! propagation queue, search counters, and deterministic RNG.
//!
//! The solver is the single point of shared mutable state. Every mutation
//! made during search goes through it and is recorded on the trail, so
//! rewinding a mark restores domains, cells, mid-search constraints, and
//! mid-search variables in one pass. The search driver in the search crate
//! owns the control flow; this type only executes and undoes state changes.

use crate::constraint::Constraint;
use crate::domain::Domain;
use crate::fail::{Fail, Propagation};
use crate::trail::{Trail, TrailEntry, TrailMark};
use crate::var::{CellIndex, VarIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Construction-time knobs of the solver.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Selects the sparse map representation for guided-local-search
    /// penalties instead of the dense table. Observationally equivalent;
    /// only the memory/time profile differs.
    pub use_sparse_gls_penalties: bool,
    /// Seed of the solver RNG consumed by `rand32`/`rand64`.
    pub rng_seed: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            use_sparse_gls_penalties: false,
            rng_seed: 12345,
        }
    }
}

#[derive(Debug)]
struct VarState {
    domain: Domain,
    watchers: Vec<usize>,
}

/// Search statistics maintained by the driver.
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    branches: i64,
    failures: i64,
    solutions: i64,
    neighbors: i64,
    filtered_neighbors: i64,
    accepted_neighbors: i64,
}

/// The propagation engine and reversible store.
pub struct Solver {
    vars: Vec<VarState>,
    cells: Vec<i64>,
    constraints: Vec<Rc<dyn Constraint>>,
    /// Per-registration log mirroring the watcher lists, so rewinding can
    /// pop registrations in reverse order.
    watch_log: Vec<VarIndex>,
    queue: VecDeque<usize>,
    queued: Vec<bool>,
    trail: Trail,
    counters: Counters,
    search_depth: usize,
    solve_depth: usize,
    restart_requested: bool,
    options: SolverOptions,
    rng: StdRng,
    start: Instant,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Creates a solver with default options.
    #[inline]
    pub fn new() -> Self {
        Self::with_options(SolverOptions::default())
    }

    /// Creates a solver with the given options.
    pub fn with_options(options: SolverOptions) -> Self {
        let rng = StdRng::seed_from_u64(options.rng_seed);
        Self {
            vars: Vec::new(),
            cells: Vec::new(),
            constraints: Vec::new(),
            watch_log: Vec::new(),
            queue: VecDeque::new(),
            queued: Vec::new(),
            trail: Trail::new(),
            counters: Counters::default(),
            search_depth: 0,
            solve_depth: 0,
            restart_requested: false,
            options,
            rng,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    // ----- variables -----

    /// Creates a new finite-domain variable over `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn new_var(&mut self, min: i64, max: i64) -> VarIndex {
        let index = VarIndex::new(self.vars.len());
        self.trail.push(TrailEntry::Vars {
            old_len: self.vars.len(),
        });
        self.vars.push(VarState {
            domain: Domain::new(min, max),
            watchers: Vec::new(),
        });
        index
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    fn domain(&self, var: VarIndex) -> &Domain {
        &self.vars[var.get()].domain
    }

    #[inline]
    pub fn var_min(&self, var: VarIndex) -> i64 {
        self.domain(var).min()
    }

    #[inline]
    pub fn var_max(&self, var: VarIndex) -> i64 {
        self.domain(var).max()
    }

    #[inline]
    pub fn var_size(&self, var: VarIndex) -> u64 {
        self.domain(var).size()
    }

    #[inline]
    pub fn var_bound(&self, var: VarIndex) -> bool {
        self.domain(var).bound()
    }

    /// The value of a bound variable.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unbound.
    #[inline]
    pub fn var_value(&self, var: VarIndex) -> i64 {
        assert!(
            self.var_bound(var),
            "called `Solver::var_value` on unbound variable {}",
            var
        );
        self.domain(var).value()
    }

    #[inline]
    pub fn var_contains(&self, var: VarIndex, value: i64) -> bool {
        self.domain(var).contains(value)
    }

    /// Snapshot of the variable's current domain values, ascending.
    #[inline]
    pub fn domain_values(&self, var: VarIndex) -> Vec<i64> {
        self.domain(var).values()
    }

    /// Raises the lower bound of `var` to `value`.
    pub fn set_min(&mut self, var: VarIndex, value: i64) -> Propagation {
        let (min, max, size) = {
            let d = self.domain(var);
            (d.min(), d.max(), d.size())
        };
        if value <= min {
            return Ok(());
        }
        if value > max {
            return Err(Fail);
        }
        self.trail.push(TrailEntry::Min {
            var,
            old_min: min,
            old_size: size,
        });
        self.vars[var.get()].domain.raise_min(value);
        self.wake(var);
        Ok(())
    }

    /// Lowers the upper bound of `var` to `value`.
    pub fn set_max(&mut self, var: VarIndex, value: i64) -> Propagation {
        let (min, max, size) = {
            let d = self.domain(var);
            (d.min(), d.max(), d.size())
        };
        if value >= max {
            return Ok(());
        }
        if value < min {
            return Err(Fail);
        }
        self.trail.push(TrailEntry::Max {
            var,
            old_max: max,
            old_size: size,
        });
        self.vars[var.get()].domain.lower_max(value);
        self.wake(var);
        Ok(())
    }

    /// Binds `var` to `value`.
    pub fn set_value(&mut self, var: VarIndex, value: i64) -> Propagation {
        if !self.var_contains(var, value) {
            return Err(Fail);
        }
        self.set_min(var, value)?;
        self.set_max(var, value)
    }

    /// Removes `value` from the domain of `var`.
    pub fn remove_value(&mut self, var: VarIndex, value: i64) -> Propagation {
        if !self.var_contains(var, value) {
            return Ok(());
        }
        if self.var_bound(var) {
            return Err(Fail);
        }
        let (min, max) = (self.var_min(var), self.var_max(var));
        if value == min {
            return self.set_min(var, value + 1);
        }
        if value == max {
            return self.set_max(var, value - 1);
        }
        self.trail.push(TrailEntry::Hole { var, value });
        self.vars[var.get()].domain.add_hole(value);
        self.wake(var);
        Ok(())
    }

    // ----- reversible cells -----

    /// Allocates a reversible `i64` cell initialized to `value`.
    pub fn new_cell(&mut self, value: i64) -> CellIndex {
        let index = CellIndex::new(self.cells.len());
        self.trail.push(TrailEntry::Cells {
            old_len: self.cells.len(),
        });
        self.cells.push(value);
        index
    }

    #[inline]
    pub fn cell(&self, cell: CellIndex) -> i64 {
        self.cells[cell.get()]
    }

    /// Overwrites a reversible cell, recording the previous value on the
    /// trail so backtracking restores it.
    pub fn save_and_set_cell(&mut self, cell: CellIndex, value: i64) {
        let old = self.cells[cell.get()];
        if old == value {
            return;
        }
        self.trail.push(TrailEntry::Cell { cell, old });
        self.cells[cell.get()] = value;
    }

    // ----- constraints & propagation -----

    /// Posts a constraint: registers its watchers and schedules it for
    /// propagation. Posting during search is reversible.
    pub fn add_constraint(&mut self, constraint: Rc<dyn Constraint>) {
        let id = self.constraints.len();
        self.trail.push(TrailEntry::Constraints {
            old_len: id,
            old_watch_len: self.watch_log.len(),
        });
        let watched: SmallVec<[VarIndex; 4]> = constraint.watched().iter().copied().collect();
        self.constraints.push(constraint);
        self.queued.push(false);
        for var in watched {
            self.vars[var.get()].watchers.push(id);
            self.watch_log.push(var);
        }
        self.enqueue(id);
    }

    /// Number of posted constraints.
    #[inline]
    pub fn constraints(&self) -> i64 {
        self.constraints.len() as i64
    }

    #[inline]
    fn enqueue(&mut self, id: usize) {
        if !self.queued[id] {
            self.queued[id] = true;
            self.queue.push_back(id);
        }
    }

    /// Wakes every constraint watching `var`.
    #[inline]
    pub(crate) fn wake(&mut self, var: VarIndex) {
        let len = self.vars[var.get()].watchers.len();
        for i in 0..len {
            let id = self.vars[var.get()].watchers[i];
            if !self.queued[id] {
                self.queued[id] = true;
                self.queue.push_back(id);
            }
        }
    }

    /// Runs the propagation queue to fixpoint.
    ///
    /// On failure the queue is dropped; pending work belongs to the branch
    /// being abandoned.
    pub fn propagate(&mut self) -> Propagation {
        while let Some(id) = self.queue.pop_front() {
            self.queued[id] = false;
            let constraint = Rc::clone(&self.constraints[id]);
            if constraint.propagate(self).is_err() {
                self.clear_queue();
                return Err(Fail);
            }
        }
        Ok(())
    }

    /// Drops all pending propagation work.
    pub fn clear_queue(&mut self) {
        for id in self.queue.drain(..) {
            if id < self.queued.len() {
                self.queued[id] = false;
            }
        }
    }

    // ----- trail -----

    #[inline]
    pub fn trail_mark(&self) -> TrailMark {
        self.trail.mark()
    }

    /// Rewinds all reversible state back to `mark`.
    pub fn rewind_to(&mut self, mark: TrailMark) {
        self.clear_queue();
        while let Some(entry) = self.trail.pop_to(mark) {
            match entry {
                TrailEntry::Min {
                    var,
                    old_min,
                    old_size,
                } => self.vars[var.get()].domain.restore_min(old_min, old_size),
                TrailEntry::Max {
                    var,
                    old_max,
                    old_size,
                } => self.vars[var.get()].domain.restore_max(old_max, old_size),
                TrailEntry::Hole { var, value } => self.vars[var.get()].domain.remove_hole(value),
                TrailEntry::Cell { cell, old } => self.cells[cell.get()] = old,
                TrailEntry::Constraints {
                    old_len,
                    old_watch_len,
                } => {
                    self.constraints.truncate(old_len);
                    self.queued.truncate(old_len);
                    while self.watch_log.len() > old_watch_len {
                        let var = self
                            .watch_log
                            .pop()
                            .expect("watch log shorter than its trail record");
                        self.vars[var.get()].watchers.pop();
                    }
                }
                TrailEntry::Vars { old_len } => self.vars.truncate(old_len),
                TrailEntry::Cells { old_len } => self.cells.truncate(old_len),
            }
        }
    }

    // ----- control -----

    /// Convenience failure: `Err(Fail)`.
    #[inline]
    pub fn fail(&self) -> Propagation {
        Err(Fail)
    }

    /// Asks the driver to restart the current search from its root. Honored
    /// at the next failure boundary.
    #[inline]
    pub fn restart_current_search(&mut self) {
        self.restart_requested = true;
    }

    /// Consumes a pending restart request.
    #[inline]
    pub fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_requested)
    }

    // ----- counters (maintained by the search driver) -----

    #[inline]
    pub fn branches(&self) -> i64 {
        self.counters.branches
    }

    #[inline]
    pub fn failures(&self) -> i64 {
        self.counters.failures
    }

    #[inline]
    pub fn solutions(&self) -> i64 {
        self.counters.solutions
    }

    #[inline]
    pub fn neighbors(&self) -> i64 {
        self.counters.neighbors
    }

    #[inline]
    pub fn filtered_neighbors(&self) -> i64 {
        self.counters.filtered_neighbors
    }

    #[inline]
    pub fn accepted_neighbors(&self) -> i64 {
        self.counters.accepted_neighbors
    }

    #[inline]
    pub fn note_branch(&mut self) {
        self.counters.branches += 1;
    }

    #[inline]
    pub fn note_failure(&mut self) {
        self.counters.failures += 1;
    }

    #[inline]
    pub fn note_solution(&mut self) {
        self.counters.solutions += 1;
    }

    /// Depth of the current search stack.
    #[inline]
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }

    #[inline]
    pub fn set_search_depth(&mut self, depth: usize) {
        self.search_depth = depth;
    }

    /// Nesting depth of active solves.
    #[inline]
    pub fn solve_depth(&self) -> usize {
        self.solve_depth
    }

    #[inline]
    pub fn enter_solve(&mut self) {
        self.solve_depth += 1;
    }

    #[inline]
    pub fn exit_solve(&mut self) {
        debug_assert!(self.solve_depth > 0, "exit_solve without enter_solve");
        self.solve_depth -= 1;
    }

    // ----- misc -----

    /// Milliseconds elapsed since the solver was created.
    #[inline]
    pub fn wall_time(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    /// Estimate of the allocated bytes held by the solver.
    pub fn memory_usage(&self) -> i64 {
        let vars: usize = self.vars.capacity() * std::mem::size_of::<VarState>()
            + self
                .vars
                .iter()
                .map(|v| {
                    v.domain.allocated_memory_bytes()
                        + v.watchers.capacity() * std::mem::size_of::<usize>()
                })
                .sum::<usize>();
        let constraints =
            self.constraints.capacity() * std::mem::size_of::<Rc<dyn Constraint>>();
        let cells = self.cells.capacity() * std::mem::size_of::<i64>();
        let queue = self.queue.capacity() * std::mem::size_of::<usize>() + self.queued.capacity();
        (vars + constraints + cells + queue + self.trail.allocated_memory_bytes()) as i64
    }

    /// Uniform draw in `[0, n)` from the deterministic solver RNG.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn rand32(&mut self, n: u32) -> u32 {
        assert!(n > 0, "called `Solver::rand32` with n = 0");
        self.rng.gen_range(0..n)
    }

    /// Uniform draw in `[0, n)` from the deterministic solver RNG.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn rand64(&mut self, n: u64) -> u64 {
        assert!(n > 0, "called `Solver::rand64` with n = 0");
        self.rng.gen_range(0..n)
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("vars", &self.vars.len())
            .field("constraints", &self.constraints.len())
            .field("trail_len", &self.trail.len())
            .field("search_depth", &self.search_depth)
            .field("solve_depth", &self.solve_depth)
            .finish()
    }
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Solver(vars: {}, constraints: {}, branches: {}, failures: {})",
            self.vars.len(),
            self.constraints.len(),
            self.counters.branches,
            self.counters.failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_bounds_and_trail_roundtrip() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let mark = solver.trail_mark();

        solver.set_min(x, 3).unwrap();
        solver.set_max(x, 7).unwrap();
        solver.remove_value(x, 5).unwrap();
        assert_eq!(solver.var_min(x), 3);
        assert_eq!(solver.var_max(x), 7);
        assert_eq!(solver.var_size(x), 4);
        assert!(!solver.var_contains(x, 5));

        solver.rewind_to(mark);
        assert_eq!(solver.var_min(x), 0);
        assert_eq!(solver.var_max(x), 9);
        assert_eq!(solver.var_size(x), 10);
        assert!(solver.var_contains(x, 5));
    }

    #[test]
    fn test_set_value_and_failures() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        assert!(solver.set_value(x, 2).is_ok());
        assert!(solver.var_bound(x));
        assert_eq!(solver.var_value(x), 2);

        // Binding to a removed value fails.
        assert!(solver.set_value(x, 3).is_err());
        // Removing the only value fails.
        assert!(solver.remove_value(x, 2).is_err());
    }

    #[test]
    fn test_remove_value_at_bounds_moves_bounds() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 3);
        solver.remove_value(x, 2).unwrap();
        solver.remove_value(x, 3).unwrap();
        // Max retreats past the hole at 2 down to 1.
        assert_eq!(solver.var_max(x), 1);
        assert_eq!(solver.var_size(x), 2);
    }

    #[test]
    fn test_cells_save_and_restore() {
        let mut solver = Solver::new();
        let c = solver.new_cell(7);
        let mark = solver.trail_mark();
        solver.save_and_set_cell(c, 11);
        assert_eq!(solver.cell(c), 11);
        solver.rewind_to(mark);
        assert_eq!(solver.cell(c), 7);
    }

    #[test]
    fn test_mid_search_vars_are_rewound() {
        let mut solver = Solver::new();
        let mark = solver.trail_mark();
        let _b = solver.new_var(0, 1);
        assert_eq!(solver.num_vars(), 1);
        solver.rewind_to(mark);
        assert_eq!(solver.num_vars(), 0);
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = Solver::new();
        let mut b = Solver::new();
        let xs: Vec<u64> = (0..8).map(|_| a.rand64(1000)).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.rand64(1000)).collect();
        assert_eq!(xs, ys, "same seed must give the same draws");
    }

    #[test]
    #[should_panic(expected = "called `Solver::var_value` on unbound variable")]
    fn test_var_value_unbound_panics() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 4);
        let _ = solver.var_value(x);
    }

    #[test]
    fn test_restart_request_is_consumed_once() {
        let mut solver = Solver::new();
        assert!(!solver.take_restart_request());
        solver.restart_current_search();
        assert!(solver.take_restart_request());
        assert!(!solver.take_restart_request());
    }
}
