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

//! Symmetry breaking during search.
//!
//! Each registered [`SymmetryBreaker`] is shown every produced decision.
//! When a breaker answers with a boolean term — the symmetric image of
//! the decision — the manager records it in a per-breaker clause that
//! unwinds with the search tree. When the decision is refuted, the
//! manager posts a constraint forbidding the symmetric variation: if all
//! prior left branches of the clause held, the symmetric image of the
//! refuted decision must be false.

use crate::branching::decision::{Decision, DecisionVisitor};
use crate::monitor::SearchMonitor;
use capstan_engine::{CellIndex, Propagation, Solver, VarIndex};
use std::rc::Rc;

/// A user-supplied symmetry of the problem.
///
/// The breaker sees the structure of every decision and answers with the
/// boolean term of the symmetric decision through the [`ClauseBuilder`],
/// e.g. for the decision `x == 3` with symmetry `x <-> y, 3 <-> 5` it
/// adds `is_equal(y, 5)`.
pub trait SymmetryBreaker {
    /// The decision assigns `value` to `var` on its left branch.
    fn on_set_variable_value(&mut self, clause: &mut ClauseBuilder<'_>, var: VarIndex, value: i64);
}

/// Collects the terms a breaker emits for one decision.
pub struct ClauseBuilder<'a> {
    solver: &'a mut Solver,
    terms: Vec<VarIndex>,
}

impl<'a> ClauseBuilder<'a> {
    /// Direct access to the solver for custom term construction.
    pub fn solver(&mut self) -> &mut Solver {
        self.solver
    }

    /// Pushes an already-built boolean term.
    pub fn add_term(&mut self, term: VarIndex) {
        self.terms.push(term);
    }

    /// Adds the term `var == value`.
    pub fn add_integer_variable_equal_value_clause(&mut self, var: VarIndex, value: i64) {
        let term = self.solver.make_is_equal_cst(var, value);
        self.terms.push(term);
    }

    /// Adds the term `var >= value`.
    pub fn add_integer_variable_greater_or_equal_value_clause(
        &mut self,
        var: VarIndex,
        value: i64,
    ) {
        let term = self.solver.make_is_greater_or_equal_cst(var, value);
        self.terms.push(term);
    }

    /// Adds the term `var <= value`.
    pub fn add_integer_variable_less_or_equal_value_clause(&mut self, var: VarIndex, value: i64) {
        let term = self.solver.make_is_less_or_equal_cst(var, value);
        self.terms.push(term);
    }
}

/// One recorded term of a breaker's clause.
struct ClauseEntry {
    term: VarIndex,
    decision: Rc<dyn Decision>,
    /// Set once the symmetry constraint for this term has been emitted,
    /// so later refutations up the path do not re-emit it.
    done: bool,
}

/// Per-breaker clause storage: a plain vector guarded by a reversible
/// length cell, so the clause unwinds with the search tree.
struct TrailedClause {
    len: CellIndex,
    entries: Vec<ClauseEntry>,
}

impl TrailedClause {
    fn live_len(&self, solver: &Solver) -> usize {
        solver.cell(self.len).max(0) as usize
    }
}

/// Adapter presenting a breaker as a decision visitor.
struct BreakerVisit<'a> {
    breaker: &'a mut dyn SymmetryBreaker,
    clause: ClauseBuilder<'a>,
}

impl DecisionVisitor for BreakerVisit<'_> {
    fn visit_set_variable_value(&mut self, var: VarIndex, value: i64) {
        self.breaker.on_set_variable_value(&mut self.clause, var, value);
    }
}

/// Owns the symmetry breakers and their trailed clauses.
pub struct SymmetryManager {
    visitors: Vec<Box<dyn SymmetryBreaker>>,
    clauses: Vec<TrailedClause>,
}

impl SymmetryManager {
    /// # Panics
    ///
    /// Panics if `visitors` is empty.
    pub fn new(solver: &mut Solver, visitors: Vec<Box<dyn SymmetryBreaker>>) -> Self {
        assert!(
            !visitors.is_empty(),
            "called `SymmetryManager::new` with no symmetry breakers"
        );
        let clauses = visitors
            .iter()
            .map(|_| TrailedClause {
                len: solver.new_cell(0),
                entries: Vec::new(),
            })
            .collect();
        Self { visitors, clauses }
    }

    /// Emits the symmetry-forbidding constraint for breaker `index`.
    ///
    /// Scans the clause from oldest to newest: unmarked left terms that
    /// are still undecided guard the constraint; a left term already at 0
    /// makes the clause vacuous. The newest term is the symmetric image
    /// of the refuted decision: if every guard held, it must be false.
    fn check_symmetries(&mut self, solver: &mut Solver, index: usize) {
        let live = self.clauses[index].live_len(solver);
        debug_assert!(live > 0);
        let mut guard: Vec<VarIndex> = Vec::new();
        for entry in &self.clauses[index].entries[..live - 1] {
            if entry.done {
                continue;
            }
            let term = entry.term;
            if solver.var_max(term) == 0 {
                // A premise is already false; the clause never applies.
                return;
            }
            if solver.var_min(term) == 0 {
                debug_assert_eq!(solver.var_max(term), 1);
                guard.push(term);
            }
        }
        let newest = &mut self.clauses[index].entries[live - 1];
        guard.push(newest.term);
        newest.done = true;
        // All guards true would replay the symmetric branch: require at
        // least one of them (or the refuted image itself) to be false.
        solver.add_sum_less_or_equal(&guard, guard.len() as i64 - 1);
    }

    fn push_entry(
        &mut self,
        solver: &mut Solver,
        index: usize,
        term: VarIndex,
        decision: Rc<dyn Decision>,
    ) {
        let live = self.clauses[index].live_len(solver);
        let clause = &mut self.clauses[index];
        // Entries beyond the reversible length are stale leftovers from
        // abandoned branches.
        clause.entries.truncate(live);
        clause.entries.push(ClauseEntry {
            term,
            decision,
            done: false,
        });
        solver.save_and_set_cell(clause.len, live as i64 + 1);
    }
}

impl SearchMonitor for SymmetryManager {
    fn name(&self) -> &str {
        "SymmetryManager"
    }

    fn on_end_next_decision(
        &mut self,
        solver: &mut Solver,
        _builder: &str,
        decision: Option<&Rc<dyn Decision>>,
    ) {
        let Some(decision) = decision else {
            return;
        };
        for index in 0..self.visitors.len() {
            let mut collected = {
                let mut visit = BreakerVisit {
                    breaker: &mut *self.visitors[index],
                    clause: ClauseBuilder {
                        solver: &mut *solver,
                        terms: Vec::new(),
                    },
                };
                decision.accept(&mut visit);
                visit.clause.terms
            };
            for term in collected.drain(..) {
                self.push_entry(solver, index, term, Rc::clone(decision));
            }
        }
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        decision: &Rc<dyn Decision>,
    ) -> Propagation {
        for index in 0..self.visitors.len() {
            let live = self.clauses[index].live_len(solver);
            if live == 0 {
                continue;
            }
            let is_marker = {
                let newest = &self.clauses[index].entries[live - 1];
                Rc::ptr_eq(&newest.decision, decision)
            };
            if is_marker {
                self.check_symmetries(solver, index);
            }
        }
        Ok(())
    }
}
