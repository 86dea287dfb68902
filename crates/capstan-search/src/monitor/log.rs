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

//! Passive reporting monitors.
//!
//! `SearchLog` emits progress lines through the `log` facade at `info`
//! level: a start line, one line per solution, periodic branch lines, a
//! root-propagation line, and an end-of-search summary. `SearchTrace`
//! mirrors every driver event at `trace` level with a caller-chosen
//! prefix. Neither installs a logger backend.

use crate::branching::decision::Decision;
use crate::callbacks::DisplayCallback;
use crate::monitor::SearchMonitor;
use capstan_engine::{Propagation, Solver, VarIndex};
use std::rc::Rc;

const KILOBYTE: i64 = 1024;
const MEGABYTE: i64 = KILOBYTE * KILOBYTE;
const GIGABYTE: i64 = MEGABYTE * KILOBYTE;
const DISPLAY_THRESHOLD: i64 = 2;

fn memory_usage_string(solver: &Solver) -> String {
    let memory = solver.memory_usage();
    if memory > DISPLAY_THRESHOLD * GIGABYTE {
        format!("memory used = {:.2} GB", memory as f64 / GIGABYTE as f64)
    } else if memory > DISPLAY_THRESHOLD * MEGABYTE {
        format!("memory used = {:.2} MB", memory as f64 / MEGABYTE as f64)
    } else if memory > DISPLAY_THRESHOLD * KILOBYTE {
        format!("memory used = {:.2} KB", memory as f64 / KILOBYTE as f64)
    } else {
        format!("memory used = {}", memory)
    }
}

/// Periodic progress reporting.
pub struct SearchLog {
    period: i64,
    objective: Option<VarIndex>,
    display_callback: Option<DisplayCallback>,
    nsol: i64,
    start: i64,
    tick: i64,
    objective_min: i64,
    objective_max: i64,
    min_right_depth: i64,
    max_depth: i64,
    sliding_min_depth: i64,
    sliding_max_depth: i64,
}

impl SearchLog {
    /// Logs a progress line every `period` branches.
    ///
    /// # Panics
    ///
    /// Panics if `period` is not positive, or if the display callback is
    /// not repeatable.
    pub fn new(
        period: i64,
        objective: Option<VarIndex>,
        display_callback: Option<DisplayCallback>,
    ) -> Self {
        assert!(
            period > 0,
            "called `SearchLog::new` with period {}, but period must be positive",
            period
        );
        if let Some(display_callback) = &display_callback {
            display_callback.check_is_repeatable("SearchLog::new");
        }
        Self {
            period,
            objective,
            display_callback,
            nsol: 0,
            start: 0,
            tick: 0,
            objective_min: i64::MAX,
            objective_max: i64::MIN,
            min_right_depth: i64::MAX,
            max_depth: 0,
            sliding_min_depth: 0,
            sliding_max_depth: 0,
        }
    }

    fn elapsed(&self, solver: &Solver) -> i64 {
        solver.wall_time() - self.start
    }

    fn maintain(&mut self, solver: &Solver) {
        let depth = solver.search_depth() as i64;
        self.sliding_min_depth = self.sliding_min_depth.min(depth);
        self.sliding_max_depth = self.sliding_max_depth.max(depth);
        self.max_depth = self.max_depth.max(depth);
    }

    fn output_line(&self, line: &str) {
        log::info!("{}", line);
    }

    fn output_decision(&mut self, solver: &Solver) {
        let mut line = format!(
            "{} branches, {} ms, {} failures",
            solver.branches(),
            self.elapsed(solver),
            solver.failures()
        );
        if self.min_right_depth != i64::MAX && self.max_depth != 0 {
            let depth = solver.search_depth() as i64;
            line.push_str(&format!(
                ", tree pos={}/{}/{} minref={} max={}",
                self.sliding_min_depth,
                depth,
                self.sliding_max_depth,
                self.min_right_depth,
                self.max_depth
            ));
            self.sliding_min_depth = depth;
            self.sliding_max_depth = depth;
        }
        if self.objective.is_some()
            && self.objective_min != i64::MAX
            && self.objective_max != i64::MIN
        {
            line.push_str(&format!(
                ", objective minimum = {}, objective maximum = {}",
                self.objective_min, self.objective_max
            ));
        }
        self.output_line(&line);
    }

    fn periodic(&mut self, solver: &Solver) {
        self.maintain(solver);
        let branches = solver.branches();
        if branches > 0 && branches % self.period == 0 {
            self.output_decision(solver);
        }
    }
}

impl SearchMonitor for SearchLog {
    fn name(&self) -> &str {
        "SearchLog"
    }

    fn on_enter_search(&mut self, solver: &mut Solver) {
        self.output_line(&format!("Start search, {}", memory_usage_string(solver)));
        self.start = solver.wall_time();
        self.min_right_depth = i64::MAX;
    }

    fn on_exit_search(&mut self, solver: &mut Solver) {
        self.output_line(&format!(
            "End search (time = {} ms, branches = {}, failures = {}, {})",
            self.elapsed(solver),
            solver.branches(),
            solver.failures(),
            memory_usage_string(solver)
        ));
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        self.maintain(solver);
        let depth = solver.search_depth();
        let mut objective_part = String::new();
        if let Some(objective) = self.objective {
            let current = solver.var_value(objective);
            objective_part = format!("objective value = {}, ", current);
            if current >= self.objective_min {
                objective_part.push_str(&format!(
                    "objective minimum = {}, ",
                    self.objective_min
                ));
            } else {
                self.objective_min = current;
            }
            if current <= self.objective_max {
                objective_part.push_str(&format!(
                    "objective maximum = {}, ",
                    self.objective_max
                ));
            } else {
                self.objective_max = current;
            }
        }
        let mut line = format!(
            "Solution #{} ({}time = {} ms, branches = {}, failures = {}, depth = {}",
            self.nsol,
            objective_part,
            self.elapsed(solver),
            solver.branches(),
            solver.failures(),
            depth
        );
        self.nsol += 1;
        if solver.neighbors() != 0 {
            line.push_str(&format!(
                ", neighbors = {}, filtered neighbors = {}, accepted neighbors = {}",
                solver.neighbors(),
                solver.filtered_neighbors(),
                solver.accepted_neighbors()
            ));
        }
        line.push_str(&format!(", {})", memory_usage_string(solver)));
        self.output_line(&line);
        if let Some(display_callback) = &self.display_callback {
            self.output_line(&display_callback.run());
        }
        false
    }

    fn on_begin_fail(&mut self, solver: &mut Solver) {
        self.maintain(solver);
    }

    fn on_no_more_solutions(&mut self, solver: &mut Solver) {
        let mut line = format!(
            "Finished search tree (time = {} ms, branches = {}, failures = {}",
            self.elapsed(solver),
            solver.branches(),
            solver.failures()
        );
        if solver.neighbors() != 0 {
            line.push_str(&format!(
                ", neighbors = {}, filtered neighbors = {}, accepted neighbors = {}",
                solver.neighbors(),
                solver.filtered_neighbors(),
                solver.accepted_neighbors()
            ));
        }
        line.push_str(&format!(", {})", memory_usage_string(solver)));
        self.output_line(&line);
    }

    fn on_apply_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.periodic(solver);
        Ok(())
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.min_right_depth = self.min_right_depth.min(solver.search_depth() as i64);
        self.periodic(solver);
        Ok(())
    }

    fn on_begin_initial_propagation(&mut self, solver: &mut Solver) {
        self.tick = self.elapsed(solver);
    }

    fn on_end_initial_propagation(&mut self, solver: &mut Solver) {
        let delta = (self.elapsed(solver) - self.tick).max(0);
        self.output_line(&format!(
            "Root node processed (time = {} ms, constraints = {}, {})",
            delta,
            solver.constraints(),
            memory_usage_string(solver)
        ));
    }
}

/// Logs every driver event with a prefix, at trace level.
pub struct SearchTrace {
    prefix: String,
}

impl SearchTrace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl SearchMonitor for SearchTrace {
    fn name(&self) -> &str {
        "SearchTrace"
    }

    fn on_enter_search(&mut self, solver: &mut Solver) {
        log::trace!("{} EnterSearch({})", self.prefix, solver.solve_depth());
    }

    fn on_restart_search(&mut self, solver: &mut Solver) -> Propagation {
        log::trace!("{} RestartSearch({})", self.prefix, solver.solve_depth());
        Ok(())
    }

    fn on_exit_search(&mut self, solver: &mut Solver) {
        log::trace!("{} ExitSearch({})", self.prefix, solver.solve_depth());
    }

    fn on_begin_next_decision(&mut self, _solver: &mut Solver, builder: &str) -> Propagation {
        log::trace!("{} BeginNextDecision({})", self.prefix, builder);
        Ok(())
    }

    fn on_end_next_decision(
        &mut self,
        _solver: &mut Solver,
        builder: &str,
        decision: Option<&Rc<dyn Decision>>,
    ) {
        match decision {
            Some(decision) => log::trace!(
                "{} EndNextDecision({}, {})",
                self.prefix,
                builder,
                decision
            ),
            None => log::trace!("{} EndNextDecision({})", self.prefix, builder),
        }
    }

    fn on_apply_decision(
        &mut self,
        _solver: &mut Solver,
        decision: &Rc<dyn Decision>,
    ) -> Propagation {
        log::trace!("{} ApplyDecision({})", self.prefix, decision);
        Ok(())
    }

    fn on_refute_decision(
        &mut self,
        _solver: &mut Solver,
        decision: &Rc<dyn Decision>,
    ) -> Propagation {
        log::trace!("{} RefuteDecision({})", self.prefix, decision);
        Ok(())
    }

    fn on_begin_fail(&mut self, solver: &mut Solver) {
        log::trace!("{} BeginFail({})", self.prefix, solver.search_depth());
    }

    fn on_end_fail(&mut self, solver: &mut Solver) {
        log::trace!("{} EndFail({})", self.prefix, solver.search_depth());
    }

    fn on_begin_initial_propagation(&mut self, _solver: &mut Solver) {
        log::trace!("{} BeginInitialPropagation()", self.prefix);
    }

    fn on_end_initial_propagation(&mut self, _solver: &mut Solver) {
        log::trace!("{} EndInitialPropagation()", self.prefix);
    }

    fn at_solution(&mut self, _solver: &mut Solver) -> bool {
        log::trace!("{} AtSolution()", self.prefix);
        false
    }

    fn accept_solution(&mut self, _solver: &mut Solver) -> bool {
        log::trace!("{} AcceptSolution()", self.prefix);
        true
    }

    fn on_no_more_solutions(&mut self, _solver: &mut Solver) {
        log::trace!("{} NoMoreSolutions()", self.prefix);
    }
}
