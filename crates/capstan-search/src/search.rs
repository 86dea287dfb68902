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

//! The search driver.
//!
//! Drives a decision builder over the engine: applies decisions, refutes
//! them when their left subtree fails, broadcasts every control-flow
//! event to the registered monitors, and honors restart requests at
//! failure boundaries.
//!
//! Event ordering within a search: `EnterSearch` precedes everything;
//! each failure is bracketed as `BeginFail` < `RefuteDecision` <
//! `EndFail`; `AtSolution` fires at most once per reached solution node;
//! `ExitSearch` is the last event. Begin/enter events reach monitors in
//! registration order, end/exit events in reverse registration order.
//!
//! Nested solves re-enter the driver on the same solver. With
//! `restore == false`, a nested search that stops at a solution leaves
//! its assignments applied so they persist into the caller's branch.

use crate::branching::decision::{Decision, DecisionBuilder};
use crate::monitor::MonitorRef;
use capstan_engine::{Propagation, Solver, TrailMark};
use std::rc::Rc;

/// Runs a top-level search. Returns whether at least one solution was
/// accepted. All state is restored when the search ends.
pub fn solve(
    solver: &mut Solver,
    builder: &mut dyn DecisionBuilder,
    monitors: &[MonitorRef],
) -> bool {
    SearchSession::new(solver, builder, monitors, true).run()
}

/// Runs a nested search reusing the caller's trail. With
/// `restore == false`, mutations of a found solution persist into the
/// caller; otherwise the state is rewound like a top-level solve.
pub fn nested_solve(
    solver: &mut Solver,
    builder: &mut dyn DecisionBuilder,
    restore: bool,
    monitors: &[MonitorRef],
) -> bool {
    SearchSession::new(solver, builder, monitors, restore).run()
}

/// One applied-but-not-exhausted decision on the search path.
struct Frame {
    decision: Rc<dyn Decision>,
    mark: TrailMark,
    refuted: bool,
}

/// How the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchEnd {
    /// The tree is exhausted (possibly via a tripped limit).
    Exhausted,
    /// A solution was reached and no monitor asked to continue.
    StoppedAtSolution,
}

/// A single search run: borrows the solver, the root builder, and the
/// monitor set for the duration of the search.
struct SearchSession<'a> {
    solver: &'a mut Solver,
    builder: &'a mut dyn DecisionBuilder,
    monitors: &'a [MonitorRef],
    restore: bool,
    stack: Vec<Frame>,
    root: TrailMark,
    found: bool,
}

impl<'a> SearchSession<'a> {
    fn new(
        solver: &'a mut Solver,
        builder: &'a mut dyn DecisionBuilder,
        monitors: &'a [MonitorRef],
        restore: bool,
    ) -> Self {
        let root = solver.trail_mark();
        Self {
            solver,
            builder,
            monitors,
            restore,
            stack: Vec::new(),
            root,
            found: false,
        }
    }

    fn run(mut self) -> bool {
        self.solver.enter_solve();
        let outer_depth = self.solver.search_depth();
        self.solver.set_search_depth(0);

        for monitor in self.monitors {
            monitor.borrow_mut().on_enter_search(self.solver);
        }

        for monitor in self.monitors {
            monitor.borrow_mut().on_begin_initial_propagation(self.solver);
        }
        let initial = self.solver.propagate();
        for monitor in self.monitors.iter().rev() {
            monitor.borrow_mut().on_end_initial_propagation(self.solver);
        }

        let end = match initial {
            Ok(()) => self.search_loop(),
            Err(_) => {
                // The root itself is inconsistent.
                self.solver.note_failure();
                self.broadcast_begin_fail();
                self.broadcast_end_fail();
                SearchEnd::Exhausted
            }
        };

        if end == SearchEnd::Exhausted {
            for monitor in self.monitors {
                monitor.borrow_mut().on_no_more_solutions(self.solver);
            }
        }
        for monitor in self.monitors.iter().rev() {
            monitor.borrow_mut().on_exit_search(self.solver);
        }

        if self.restore || end == SearchEnd::Exhausted {
            self.solver.rewind_to(self.root);
        }
        self.solver.set_search_depth(outer_depth);
        self.solver.exit_solve();
        self.found
    }

    fn search_loop(&mut self) -> SearchEnd {
        loop {
            if self.broadcast_begin_next_decision().is_err() {
                if !self.handle_fail() {
                    return SearchEnd::Exhausted;
                }
                continue;
            }

            let next = self.builder.next(self.solver);
            let decision = match next {
                Ok(decision) => decision,
                Err(_) => {
                    if !self.handle_fail() {
                        return SearchEnd::Exhausted;
                    }
                    continue;
                }
            };
            self.broadcast_end_next_decision(decision.as_ref());

            match decision {
                None => {
                    // The builder's subtree is solved: a solution node.
                    if self.broadcast_accept_solution() {
                        self.solver.note_solution();
                        self.found = true;
                        if !self.broadcast_at_solution() {
                            return SearchEnd::StoppedAtSolution;
                        }
                    }
                    // Continue exploring for further solutions.
                    if !self.handle_fail() {
                        return SearchEnd::Exhausted;
                    }
                }
                Some(decision) => {
                    let mark = self.solver.trail_mark();
                    self.stack.push(Frame {
                        decision: Rc::clone(&decision),
                        mark,
                        refuted: false,
                    });
                    self.solver.set_search_depth(self.stack.len());
                    self.solver.note_branch();

                    let applied = self
                        .broadcast_apply_decision(&decision)
                        .and_then(|_| decision.apply(self.solver))
                        .and_then(|_| self.solver.propagate());
                    if applied.is_err() && !self.handle_fail() {
                        return SearchEnd::Exhausted;
                    }
                }
            }
        }
    }

    /// Unwinds the current failure: rewinds to the nearest choice point
    /// with an untried right branch and commits it. Returns `false` when
    /// the failure bubbled above the search root.
    fn handle_fail(&mut self) -> bool {
        self.solver.note_failure();
        self.broadcast_begin_fail();
        loop {
            if self.solver.take_restart_request() {
                return self.do_restart();
            }

            let Some(frame) = self.stack.last_mut() else {
                self.broadcast_end_fail();
                return false;
            };
            let mark = frame.mark;

            if frame.refuted {
                // Both branches exhausted; keep bubbling.
                self.solver.rewind_to(mark);
                self.stack.pop();
                self.solver.set_search_depth(self.stack.len());
                continue;
            }

            frame.refuted = true;
            let decision = Rc::clone(&frame.decision);
            self.solver.rewind_to(mark);
            self.solver.note_branch();

            let refuted = self
                .broadcast_refute_decision(&decision)
                .and_then(|_| decision.refute(self.solver))
                .and_then(|_| self.solver.propagate());
            self.broadcast_end_fail();
            match refuted {
                Ok(()) => return true,
                Err(_) => {
                    self.solver.note_failure();
                    self.broadcast_begin_fail();
                }
            }
        }
    }

    /// Rewinds to the search root and re-enters the loop from scratch.
    fn do_restart(&mut self) -> bool {
        self.solver.rewind_to(self.root);
        self.stack.clear();
        self.solver.set_search_depth(0);
        self.broadcast_end_fail();

        for monitor in self.monitors {
            if monitor.borrow_mut().on_restart_search(self.solver).is_err() {
                return false;
            }
        }
        // Bounds posted at restart time may already close the tree.
        self.solver.propagate().is_ok()
    }

    // ----- broadcast helpers -----

    fn broadcast_begin_next_decision(&mut self) -> Propagation {
        let name = self.builder.name().to_string();
        for monitor in self.monitors {
            monitor
                .borrow_mut()
                .on_begin_next_decision(self.solver, &name)?;
        }
        Ok(())
    }

    fn broadcast_end_next_decision(&mut self, decision: Option<&Rc<dyn Decision>>) {
        let name = self.builder.name().to_string();
        for monitor in self.monitors.iter().rev() {
            monitor
                .borrow_mut()
                .on_end_next_decision(self.solver, &name, decision);
        }
    }

    fn broadcast_apply_decision(&mut self, decision: &Rc<dyn Decision>) -> Propagation {
        for monitor in self.monitors {
            monitor.borrow_mut().on_apply_decision(self.solver, decision)?;
        }
        Ok(())
    }

    fn broadcast_refute_decision(&mut self, decision: &Rc<dyn Decision>) -> Propagation {
        for monitor in self.monitors {
            monitor
                .borrow_mut()
                .on_refute_decision(self.solver, decision)?;
        }
        Ok(())
    }

    fn broadcast_begin_fail(&mut self) {
        for monitor in self.monitors {
            monitor.borrow_mut().on_begin_fail(self.solver);
        }
    }

    fn broadcast_end_fail(&mut self) {
        for monitor in self.monitors.iter().rev() {
            monitor.borrow_mut().on_end_fail(self.solver);
        }
    }

    /// AND-fold; every monitor is consulted.
    fn broadcast_accept_solution(&mut self) -> bool {
        let mut accept = true;
        for monitor in self.monitors {
            accept &= monitor.borrow_mut().accept_solution(self.solver);
        }
        accept
    }

    /// OR-fold; every monitor is consulted.
    fn broadcast_at_solution(&mut self) -> bool {
        let mut keep_searching = false;
        for monitor in self.monitors {
            keep_searching |= monitor.borrow_mut().at_solution(self.solver);
        }
        keep_searching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching::phase::{Phase, ValueStrategy, VariableStrategy};
    use crate::monitor::{monitor_ref, SearchMonitor};
    use std::cell::RefCell;

    /// Records the event sequence for ordering assertions.
    struct EventProbe {
        events: Vec<String>,
        keep_searching: bool,
    }

    impl EventProbe {
        fn new(keep_searching: bool) -> Self {
            Self {
                events: Vec::new(),
                keep_searching,
            }
        }
    }

    impl SearchMonitor for EventProbe {
        fn name(&self) -> &str {
            "EventProbe"
        }

        fn on_enter_search(&mut self, _solver: &mut Solver) {
            self.events.push("enter".into());
        }

        fn on_exit_search(&mut self, _solver: &mut Solver) {
            self.events.push("exit".into());
        }

        fn on_apply_decision(
            &mut self,
            _solver: &mut Solver,
            _decision: &Rc<dyn Decision>,
        ) -> Propagation {
            self.events.push("apply".into());
            Ok(())
        }

        fn on_refute_decision(
            &mut self,
            _solver: &mut Solver,
            _decision: &Rc<dyn Decision>,
        ) -> Propagation {
            self.events.push("refute".into());
            Ok(())
        }

        fn on_begin_fail(&mut self, _solver: &mut Solver) {
            self.events.push("begin_fail".into());
        }

        fn on_end_fail(&mut self, _solver: &mut Solver) {
            self.events.push("end_fail".into());
        }

        fn at_solution(&mut self, _solver: &mut Solver) -> bool {
            self.events.push("at_solution".into());
            self.keep_searching
        }

        fn on_no_more_solutions(&mut self, _solver: &mut Solver) {
            self.events.push("no_more_solutions".into());
        }
    }

    #[test]
    fn test_single_var_first_solution_stops() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let probe = monitor_ref(EventProbe::new(false));
        let monitors: Vec<MonitorRef> = vec![probe.clone()];

        let found = solve(&mut solver, &mut phase, &monitors);
        assert!(found);
        assert_eq!(solver.solutions(), 1);

        let events = probe.borrow().events.clone();
        assert_eq!(events.first().map(String::as_str), Some("enter"));
        assert_eq!(events.last().map(String::as_str), Some("exit"));
        assert!(events.contains(&"at_solution".to_string()));
        assert!(
            !events.contains(&"no_more_solutions".to_string()),
            "stopping at a solution is not exhaustion"
        );
    }

    #[test]
    fn test_exhaustive_enumeration_counts() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let y = solver.new_var(0, 1);
        let mut phase = Phase::new(
            &mut solver,
            &[x, y],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let probe = monitor_ref(EventProbe::new(true));
        let monitors: Vec<MonitorRef> = vec![probe.clone()];

        let found = solve(&mut solver, &mut phase, &monitors);
        assert!(found);
        assert_eq!(solver.solutions(), 4, "two binary variables, four leaves");

        let events = probe.borrow().events.clone();
        assert_eq!(
            events.iter().filter(|e| *e == "at_solution").count(),
            4,
            "at_solution fires once per reached solution node"
        );
        assert!(events.contains(&"no_more_solutions".to_string()));

        // Each failure bracket contains its refutation.
        for (i, event) in events.iter().enumerate() {
            if event == "refute" {
                assert!(
                    events[..i].iter().filter(|e| *e == "begin_fail").count()
                        > events[..i].iter().filter(|e| *e == "end_fail").count(),
                    "refute outside a begin/end fail bracket at index {}",
                    i
                );
            }
        }

        // The state is restored after a top-level solve.
        assert!(!solver.var_bound(x));
        assert!(!solver.var_bound(y));
    }

    #[test]
    fn test_unsat_root_failure() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        solver.add_greater_or_equal_cst(x, 5);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let probe = monitor_ref(EventProbe::new(true));
        let monitors: Vec<MonitorRef> = vec![probe.clone()];

        let found = solve(&mut solver, &mut phase, &monitors);
        assert!(!found);
        assert_eq!(solver.failures(), 1);
        let events = probe.borrow().events.clone();
        assert!(events.contains(&"no_more_solutions".to_string()));
    }

    #[test]
    fn test_monitor_broadcast_order_forward_and_reverse() {
        struct OrderProbe {
            tag: &'static str,
            log: Rc<RefCell<Vec<String>>>,
        }
        impl SearchMonitor for OrderProbe {
            fn name(&self) -> &str {
                self.tag
            }
            fn on_enter_search(&mut self, _solver: &mut Solver) {
                self.log.borrow_mut().push(format!("enter:{}", self.tag));
            }
            fn on_exit_search(&mut self, _solver: &mut Solver) {
                self.log.borrow_mut().push(format!("exit:{}", self.tag));
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut solver = Solver::new();
        let x = solver.new_var(0, 0);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let a = monitor_ref(OrderProbe {
            tag: "a",
            log: log.clone(),
        });
        let b = monitor_ref(OrderProbe {
            tag: "b",
            log: log.clone(),
        });
        let monitors: Vec<MonitorRef> = vec![a, b];
        solve(&mut solver, &mut phase, &monitors);

        let events = log.borrow().clone();
        assert_eq!(events, vec!["enter:a", "enter:b", "exit:b", "exit:a"]);
    }

    #[test]
    fn test_pigeonhole_is_unsat_with_exact_counts() {
        use crate::monitor::solution::AllSolutionCollector;
        use capstan_engine::Assignment;

        // Three birds, two holes.
        let mut solver = Solver::new();
        let vars: Vec<_> = (0..3).map(|_| solver.new_var(0, 1)).collect();
        solver.add_all_different(&vars);

        let mut prototype = Assignment::new();
        prototype.add_all(&vars);
        let collector = monitor_ref(AllSolutionCollector::new(&prototype));
        let monitors: Vec<MonitorRef> = vec![collector.clone()];

        let mut phase = Phase::new(
            &mut solver,
            &vars,
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let found = solve(&mut solver, &mut phase, &monitors);

        assert!(!found);
        assert_eq!(collector.borrow().solution_count(), 0);
        // With the propagating all-different, binding the first variable
        // wipes out the rest on both branches of the root decision.
        assert_eq!(solver.branches(), 2);
        assert_eq!(solver.failures(), 2);
    }

    #[test]
    fn test_four_queens_has_two_solutions() {
        use crate::monitor::solution::AllSolutionCollector;
        use capstan_engine::Assignment;

        let n = 4;
        let mut solver = Solver::new();
        let queens: Vec<_> = (0..n).map(|_| solver.new_var(0, n as i64 - 1)).collect();
        let ascending: Vec<_> = queens
            .iter()
            .enumerate()
            .map(|(i, &q)| solver.make_offset(q, i as i64))
            .collect();
        let descending: Vec<_> = queens
            .iter()
            .enumerate()
            .map(|(i, &q)| solver.make_offset(q, -(i as i64)))
            .collect();
        solver.add_all_different(&queens);
        solver.add_all_different(&ascending);
        solver.add_all_different(&descending);

        let mut prototype = Assignment::new();
        prototype.add_all(&queens);
        let collector = monitor_ref(AllSolutionCollector::new(&prototype));
        let monitors: Vec<MonitorRef> = vec![collector.clone()];

        let mut phase = Phase::new(
            &mut solver,
            &queens,
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let found = solve(&mut solver, &mut phase, &monitors);

        assert!(found);
        assert_eq!(collector.borrow().solution_count(), 2);
        // The two solutions are mirror images of each other.
        let first: Vec<i64> = queens
            .iter()
            .map(|&q| collector.borrow().value(0, q))
            .collect();
        let second: Vec<i64> = queens
            .iter()
            .map(|&q| collector.borrow().value(1, q))
            .collect();
        assert_eq!(first, vec![1, 3, 0, 2]);
        assert_eq!(second, vec![2, 0, 3, 1]);
    }

    #[test]
    fn test_minimize_sum_with_branch_and_bound() {
        use crate::monitor::optimize::OptimizeVar;
        use crate::monitor::solution::LastSolutionCollector;
        use capstan_engine::Assignment;

        // Minimize x + y subject to x + y >= 3 over x, y in [0, 5].
        let mut solver = Solver::new();
        let x = solver.new_var(0, 5);
        let y = solver.new_var(0, 5);
        let objective = solver.make_sum(&[x, y]);
        solver.add_greater_or_equal_cst(objective, 3);

        let mut prototype = Assignment::new();
        prototype.add_all(&[x, y]);
        prototype.add_objective(objective);
        let collector = monitor_ref(LastSolutionCollector::new(&prototype));
        let optimize = monitor_ref(OptimizeVar::minimize(objective, 1));
        let monitors: Vec<MonitorRef> = vec![optimize.clone(), collector.clone()];

        let mut phase = Phase::new(
            &mut solver,
            &[x, y],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let found = solve(&mut solver, &mut phase, &monitors);

        assert!(found);
        assert_eq!(optimize.borrow().best(), 3);
        assert_eq!(collector.borrow().solution_count(), 1);
        assert_eq!(collector.borrow().objective_value(0), 3);
        assert_eq!(
            collector.borrow().value(0, x) + collector.borrow().value(0, y),
            3
        );
    }

    #[test]
    fn test_branch_limit_cuts_search_short() {
        use crate::monitor::limit::RegularLimit;

        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let y = solver.new_var(0, 1);
        let mut phase = Phase::new(
            &mut solver,
            &[x, y],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let limit = monitor_ref(RegularLimit::new(i64::MAX, 0, i64::MAX, i64::MAX));
        let monitors: Vec<MonitorRef> = vec![limit.clone()];

        let found = solve(&mut solver, &mut phase, &monitors);
        assert!(!found, "a zero branch budget admits no solution");
        assert!(limit.borrow().crossed());
        // The search unwound cleanly.
        assert!(!solver.var_bound(x));
        assert!(!solver.var_bound(y));
    }

    #[test]
    fn test_nested_solve_inside_outer_search() {
        use crate::branching::compose::{Compose, SolveOnce};
        use capstan_engine::VarIndex;

        // The outer phase enumerates x; the nested solve pins y to its
        // minimum under the then-current domains.
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let y = solver.new_var(0, 5);
        solver.add_greater_or_equal(y, x);

        let outer = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMaxValue,
        );
        let inner = Phase::new(
            &mut solver,
            &[y],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let solve_once = SolveOnce::new(Box::new(inner));
        let mut builder = Compose::new(
            &mut solver,
            vec![Box::new(outer), Box::new(solve_once)],
        );

        struct Capture {
            seen: Vec<(i64, i64)>,
            x: VarIndex,
            y: VarIndex,
        }
        impl SearchMonitor for Capture {
            fn name(&self) -> &str {
                "Capture"
            }
            fn at_solution(&mut self, solver: &mut Solver) -> bool {
                self.seen
                    .push((solver.var_value(self.x), solver.var_value(self.y)));
                false
            }
        }
        let capture = monitor_ref(Capture {
            seen: Vec::new(),
            x,
            y,
        });
        let monitors: Vec<MonitorRef> = vec![capture.clone()];

        let found = solve(&mut solver, &mut builder, &monitors);
        assert!(found);
        // x is maximized to 1, then the nested solve settles y at its
        // propagated minimum.
        assert_eq!(capture.borrow().seen, vec![(1, 1)]);
    }

    #[test]
    fn test_accept_solution_veto_keeps_searching() {
        struct Veto {
            vetoed: usize,
        }
        impl SearchMonitor for Veto {
            fn name(&self) -> &str {
                "Veto"
            }
            fn accept_solution(&mut self, _solver: &mut Solver) -> bool {
                self.vetoed += 1;
                false
            }
            fn at_solution(&mut self, _solver: &mut Solver) -> bool {
                true
            }
        }

        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let veto = monitor_ref(Veto { vetoed: 0 });
        let monitors: Vec<MonitorRef> = vec![veto.clone()];

        let found = solve(&mut solver, &mut phase, &monitors);
        assert!(!found, "vetoed solutions do not count");
        assert_eq!(solver.solutions(), 0);
        assert_eq!(veto.borrow().vetoed, 2, "both leaves were vetoed");
    }
}
