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

//! The observer protocol of the search driver.
//!
//! A monitor is both a passive listener and an active participant: any
//! hook that returns [`Propagation`] may fail the current branch, and any
//! hook may post constraints or request a restart through the solver.
//!
//! The driver broadcasts hooks in registration order for begin/enter
//! events and in reverse registration order for end/exit events. The
//! query hooks fold across monitors: `accept_solution` and `accept_delta`
//! are conjunctions, `at_solution` (continue searching?) and
//! `local_optimum` are disjunctions.
//!
//! Monitors are shared as `Rc<RefCell<...>>` handles so the caller keeps
//! access to collectors after the search; the driver is single-threaded
//! and never holds two borrows at once.

pub mod limit;
pub mod log;
pub mod optimize;
pub mod restart;
pub mod solution;

use crate::branching::decision::Decision;
use capstan_engine::{Assignment, Propagation, Solver};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a monitor registered for a search.
pub type MonitorRef = Rc<RefCell<dyn SearchMonitor>>;

/// Wraps a monitor into a [`MonitorRef`]-compatible handle, keeping the
/// concrete type accessible to the caller.
pub fn monitor_ref<M>(monitor: M) -> Rc<RefCell<M>>
where
    M: SearchMonitor + 'static,
{
    Rc::new(RefCell::new(monitor))
}

/// Hooks invoked at each control-flow event of the search driver.
///
/// Every hook defaults to a no-op (or the neutral fold element), so a
/// monitor only implements the events it cares about.
pub trait SearchMonitor {
    /// Returns the name of the monitor.
    fn name(&self) -> &str;

    /// Called once when entering the search.
    fn on_enter_search(&mut self, _solver: &mut Solver) {}

    /// Called when the search restarts from its root.
    fn on_restart_search(&mut self, _solver: &mut Solver) -> Propagation {
        Ok(())
    }

    /// Called once when the search exits; the last event of a search.
    fn on_exit_search(&mut self, _solver: &mut Solver) {}

    /// Called before asking the decision builder for the next decision.
    /// Limits fail here.
    fn on_begin_next_decision(&mut self, _solver: &mut Solver, _builder: &str) -> Propagation {
        Ok(())
    }

    /// Called after the builder produced `decision` (`None` at a leaf).
    fn on_end_next_decision(
        &mut self,
        _solver: &mut Solver,
        _builder: &str,
        _decision: Option<&Rc<dyn Decision>>,
    ) {
    }

    /// Called before a decision is applied (left branch).
    fn on_apply_decision(
        &mut self,
        _solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        Ok(())
    }

    /// Called before a decision is refuted (right branch).
    fn on_refute_decision(
        &mut self,
        _solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        Ok(())
    }

    /// Called when a failure starts unwinding.
    fn on_begin_fail(&mut self, _solver: &mut Solver) {}

    /// Called when the failure has been resolved at a choice point.
    fn on_end_fail(&mut self, _solver: &mut Solver) {}

    /// Called before the initial propagation of the search.
    fn on_begin_initial_propagation(&mut self, _solver: &mut Solver) {}

    /// Called after the initial propagation of the search.
    fn on_end_initial_propagation(&mut self, _solver: &mut Solver) {}

    /// Whether this monitor accepts the solution at the current leaf.
    /// Folded with AND across monitors.
    fn accept_solution(&mut self, _solver: &mut Solver) -> bool {
        true
    }

    /// Called at every accepted solution; the return value asks the driver
    /// to keep searching. Folded with OR across monitors.
    fn at_solution(&mut self, _solver: &mut Solver) -> bool {
        false
    }

    /// Called when the search tree is exhausted.
    fn on_no_more_solutions(&mut self, _solver: &mut Solver) {}

    /// Called by a local-search driver when no neighbor was accepted; the
    /// return value asks for another round. Folded with OR.
    fn local_optimum(&mut self, _solver: &mut Solver) -> bool {
        false
    }

    /// Called by a local-search driver when a neighbor is accepted.
    fn on_accept_neighbor(&mut self, _solver: &mut Solver) {}

    /// Filters a candidate neighborhood delta. Folded with AND.
    fn accept_delta(
        &mut self,
        _solver: &mut Solver,
        _delta: &mut Assignment,
        _deltadelta: &mut Assignment,
    ) -> bool {
        true
    }
}

impl std::fmt::Debug for dyn SearchMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SearchMonitor({})", self.name())
    }
}
