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

//! Variable selectors: policies picking the next unbound variable.
//!
//! Ties break in source index order unless a strategy says otherwise.
//! Selectors that keep a cursor store it in a reversible cell so the
//! cursor snaps back when the engine backtracks through the choice.

use crate::callbacks::Evaluator1;
use capstan_engine::{CellIndex, Solver, VarIndex};

/// Picks an unbound variable from a fixed array, or `None` when all are
/// bound.
pub trait VariableSelector {
    fn name(&self) -> &str;

    /// Returns the array position and the variable.
    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)>;
}

// ----- first unbound -----

/// Smallest index, with a reversible cursor that never revisits indices
/// known bound on the current path.
pub struct FirstUnboundSelector {
    vars: Vec<VarIndex>,
    first: CellIndex,
}

impl FirstUnboundSelector {
    pub fn new(solver: &mut Solver, vars: &[VarIndex]) -> Self {
        Self {
            vars: vars.to_vec(),
            first: solver.new_cell(0),
        }
    }
}

impl VariableSelector for FirstUnboundSelector {
    fn name(&self) -> &str {
        "ChooseFirstUnbound"
    }

    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        let start = solver.cell(self.first).max(0) as usize;
        for i in start..self.vars.len() {
            let var = self.vars[i];
            if !solver.var_bound(var) {
                solver.save_and_set_cell(self.first, i as i64);
                return Some((i, var));
            }
        }
        solver.save_and_set_cell(self.first, self.vars.len() as i64);
        None
    }
}

// ----- random -----

/// Uniform random shift, then the first unbound variable encountered
/// cyclically.
pub struct RandomSelector {
    vars: Vec<VarIndex>,
}

impl RandomSelector {
    pub fn new(vars: &[VarIndex]) -> Self {
        Self {
            vars: vars.to_vec(),
        }
    }
}

impl VariableSelector for RandomSelector {
    fn name(&self) -> &str {
        "ChooseRandom"
    }

    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        if self.vars.is_empty() {
            return None;
        }
        let shift = solver.rand32(self.vars.len() as u32) as usize;
        for i in 0..self.vars.len() {
            let index = (i + shift) % self.vars.len();
            let var = self.vars[index];
            if !solver.var_bound(var) {
                return Some((index, var));
            }
        }
        None
    }
}

// ----- min size with a bound tiebreak -----

/// Tiebreak applied among variables of minimal domain size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinSizeTieBreak {
    LowestMin,
    HighestMin,
    LowestMax,
    HighestMax,
}

/// Minimizes `size()`, breaking ties on a domain bound.
pub struct MinSizeSelector {
    vars: Vec<VarIndex>,
    tie_break: MinSizeTieBreak,
}

impl MinSizeSelector {
    pub fn new(vars: &[VarIndex], tie_break: MinSizeTieBreak) -> Self {
        Self {
            vars: vars.to_vec(),
            tie_break,
        }
    }

    /// The tiebreak key and whether larger keys win.
    #[inline]
    fn key(&self, solver: &Solver, var: VarIndex) -> (i64, bool) {
        match self.tie_break {
            MinSizeTieBreak::LowestMin => (solver.var_min(var), false),
            MinSizeTieBreak::HighestMin => (solver.var_min(var), true),
            MinSizeTieBreak::LowestMax => (solver.var_max(var), false),
            MinSizeTieBreak::HighestMax => (solver.var_max(var), true),
        }
    }
}

impl VariableSelector for MinSizeSelector {
    fn name(&self) -> &str {
        match self.tie_break {
            MinSizeTieBreak::LowestMin => "ChooseMinSizeLowestMin",
            MinSizeTieBreak::HighestMin => "ChooseMinSizeHighestMin",
            MinSizeTieBreak::LowestMax => "ChooseMinSizeLowestMax",
            MinSizeTieBreak::HighestMax => "ChooseMinSizeHighestMax",
        }
    }

    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        let mut best: Option<(usize, VarIndex, u64, i64)> = None;
        for (i, &var) in self.vars.iter().enumerate() {
            if solver.var_bound(var) {
                continue;
            }
            let size = solver.var_size(var);
            let (key, prefer_larger) = self.key(solver, var);
            let better = match best {
                None => true,
                Some((_, _, best_size, best_key)) => {
                    size < best_size
                        || (size == best_size
                            && if prefer_larger {
                                key > best_key
                            } else {
                                key < best_key
                            })
                }
            };
            if better {
                best = Some((i, var, size, key));
            }
        }
        best.map(|(i, var, _, _)| (i, var))
    }
}

// ----- cheapest variable by user callback -----

/// Minimizes a user evaluation of the variable index.
pub struct CheapestVarSelector {
    vars: Vec<VarIndex>,
    evaluator: Evaluator1,
}

impl CheapestVarSelector {
    /// # Panics
    ///
    /// Panics if the evaluator is not repeatable.
    pub fn new(vars: &[VarIndex], evaluator: Evaluator1) -> Self {
        evaluator.check_is_repeatable("CheapestVarSelector::new");
        Self {
            vars: vars.to_vec(),
            evaluator,
        }
    }
}

impl VariableSelector for CheapestVarSelector {
    fn name(&self) -> &str {
        "CheapestVar"
    }

    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        let mut best: Option<(usize, VarIndex, i64)> = None;
        for (i, &var) in self.vars.iter().enumerate() {
            if solver.var_bound(var) {
                continue;
            }
            let eval = self.evaluator.run(i as i64);
            if best.map_or(true, |(_, _, best_eval)| eval < best_eval) {
                best = Some((i, var, eval));
            }
        }
        best.map(|(i, var, _)| (i, var))
    }
}

// ----- path -----

/// Follows a successor chain: `vars[i]` is the successor of node `i`.
///
/// The reversible cursor remembers where the last decision happened. When
/// it runs off the array the selector seeks a path start: an unbound index
/// no other variable can point at, or failing that the first unbound
/// index. Following more steps than there are variables without reaching
/// an unbound one means the bound part closed a cycle.
pub struct PathSelector {
    vars: Vec<VarIndex>,
    first: CellIndex,
}

impl PathSelector {
    pub fn new(solver: &mut Solver, vars: &[VarIndex]) -> Self {
        Self {
            vars: vars.to_vec(),
            first: solver.new_cell(i64::MAX),
        }
    }

    /// Resets an out-of-range index to a path start.
    fn update_index(&self, solver: &Solver, index: &mut i64) -> bool {
        if *index < 0 || *index >= self.vars.len() as i64 {
            return self.find_path_start(solver, index);
        }
        true
    }

    /// An unbound index with no possible predecessor, or the first
    /// unbound index.
    fn find_path_start(&self, solver: &Solver, index: &mut i64) -> bool {
        for i in (0..self.vars.len()).rev() {
            if !solver.var_bound(self.vars[i]) {
                let has_possible_prev = self
                    .vars
                    .iter()
                    .any(|&prev| solver.var_contains(prev, i as i64));
                if !has_possible_prev {
                    *index = i as i64;
                    return true;
                }
            }
        }
        for (i, &var) in self.vars.iter().enumerate() {
            if !solver.var_bound(var) {
                *index = i as i64;
                return true;
            }
        }
        false
    }
}

impl VariableSelector for PathSelector {
    fn name(&self) -> &str {
        "ChooseNextOnPath"
    }

    fn select(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        let mut id = solver.cell(self.first);
        if !self.update_index(solver, &mut id) {
            return None;
        }
        let mut count = 0usize;
        while solver.var_bound(self.vars[id as usize]) {
            id = solver.var_value(self.vars[id as usize]);
            if !self.update_index(solver, &mut id) {
                return None;
            }
            count += 1;
            if count >= self.vars.len() && !self.find_path_start(solver, &mut id) {
                // Cycle detected.
                return None;
            }
        }
        let var = self.vars[id as usize];
        solver.save_and_set_cell(self.first, id);
        Some((id as usize, var))
    }
}
