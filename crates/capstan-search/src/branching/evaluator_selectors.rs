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

//! Global evaluator selectors: a single two-argument cost ranks every
//! `(variable, value)` pair.
//!
//! The static variant enumerates and sorts all pairs once on first use,
//! then advances a reversible cursor that skips entries invalidated by
//! the search. The dynamic variant re-scans all unbound variables and
//! their domains on every call.

use crate::branching::AssignmentSelector;
use crate::callbacks::{Evaluator1, Evaluator2};
use capstan_engine::{CellIndex, Solver, VarIndex};

#[derive(Debug, Clone, Copy)]
struct Element {
    var: usize,
    value: i64,
    eval: i64,
}

/// Enumerates all pairs once, sorted lexicographically by
/// `(evaluation, variable index)`.
///
/// The element array is sized from the initially-unbound variables; pairs
/// whose variable got bound or whose value left the domain are filtered
/// at selection time.
pub struct StaticEvaluatorSelector {
    vars: Vec<VarIndex>,
    evaluator: Evaluator2,
    elements: Vec<Element>,
    built: bool,
    first: CellIndex,
}

impl StaticEvaluatorSelector {
    /// # Panics
    ///
    /// Panics if the evaluator is not repeatable.
    pub fn new(solver: &mut Solver, vars: &[VarIndex], evaluator: Evaluator2) -> Self {
        evaluator.check_is_repeatable("StaticEvaluatorSelector::new");
        Self {
            vars: vars.to_vec(),
            evaluator,
            elements: Vec::new(),
            built: false,
            first: solver.new_cell(0),
        }
    }

    fn build(&mut self, solver: &mut Solver) {
        for (i, &var) in self.vars.iter().enumerate() {
            if solver.var_bound(var) {
                continue;
            }
            for value in solver.domain_values(var) {
                self.elements.push(Element {
                    var: i,
                    value,
                    eval: self.evaluator.run(i as i64, value),
                });
            }
        }
        self.elements
            .sort_by(|a, b| (a.eval, a.var).cmp(&(b.eval, b.var)));
        self.built = true;
        solver.save_and_set_cell(self.first, 0);
    }
}

impl AssignmentSelector for StaticEvaluatorSelector {
    fn name(&self) -> &str {
        "AssignVariablesOnStaticEvaluator"
    }

    fn select_variable(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        if !self.built {
            self.build(solver);
        }
        let start = solver.cell(self.first).max(0) as usize;
        for i in start..self.elements.len() {
            let element = self.elements[i];
            let var = self.vars[element.var];
            if !solver.var_bound(var) && solver.var_contains(var, element.value) {
                solver.save_and_set_cell(self.first, i as i64);
                return Some((element.var, var));
            }
        }
        solver.save_and_set_cell(self.first, self.elements.len() as i64);
        None
    }

    fn select_value(&mut self, solver: &mut Solver, _var: VarIndex, _id: usize) -> i64 {
        self.elements[solver.cell(self.first) as usize].value
    }
}

/// Re-ranks all `(variable, value)` pairs on every call, with an optional
/// tie-breaker over the count of minimal pairs.
pub struct DynamicEvaluatorSelector {
    vars: Vec<VarIndex>,
    evaluator: Evaluator2,
    tie_breaker: Option<Evaluator1>,
    cache: Vec<(usize, i64)>,
    picked: usize,
}

impl DynamicEvaluatorSelector {
    /// # Panics
    ///
    /// Panics if a callback is not repeatable.
    pub fn new(vars: &[VarIndex], evaluator: Evaluator2, tie_breaker: Option<Evaluator1>) -> Self {
        evaluator.check_is_repeatable("DynamicEvaluatorSelector::new");
        if let Some(tie_breaker) = &tie_breaker {
            tie_breaker.check_is_repeatable("DynamicEvaluatorSelector::new");
        }
        Self {
            vars: vars.to_vec(),
            evaluator,
            tie_breaker,
            cache: Vec::new(),
            picked: 0,
        }
    }
}

impl AssignmentSelector for DynamicEvaluatorSelector {
    fn name(&self) -> &str {
        "AssignVariablesOnDynamicEvaluator"
    }

    fn select_variable(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        let mut best = i64::MAX;
        self.cache.clear();
        for (i, &var) in self.vars.iter().enumerate() {
            if solver.var_bound(var) {
                continue;
            }
            for value in solver.domain_values(var) {
                let eval = self.evaluator.run(i as i64, value);
                if eval < best {
                    best = eval;
                    self.cache.clear();
                    self.cache.push((i, value));
                } else if eval == best && self.tie_breaker.is_some() {
                    self.cache.push((i, value));
                }
            }
        }
        if self.cache.is_empty() {
            return None;
        }
        self.picked = match &self.tie_breaker {
            Some(tie_breaker) if self.cache.len() > 1 => {
                tie_breaker.run(self.cache.len() as i64) as usize
            }
            _ => 0,
        };
        let (id, _) = self.cache[self.picked];
        Some((id, self.vars[id]))
    }

    fn select_value(&mut self, _solver: &mut Solver, _var: VarIndex, _id: usize) -> i64 {
        self.cache[self.picked].1
    }
}
