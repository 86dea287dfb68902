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

//! Value selectors: policies picking the branching value for a chosen
//! variable.

use crate::callbacks::{Evaluator1, Evaluator2};
use capstan_engine::{Solver, VarIndex};

/// Picks the value to try first for `var`.
pub trait ValueSelector {
    fn name(&self) -> &str;

    /// `id` is the variable's position in the phase array.
    fn select(&mut self, solver: &mut Solver, var: VarIndex, id: usize) -> i64;
}

/// Always the domain minimum.
pub struct MinValueSelector;

impl ValueSelector for MinValueSelector {
    fn name(&self) -> &str {
        "AssignMin"
    }

    fn select(&mut self, solver: &mut Solver, var: VarIndex, _id: usize) -> i64 {
        solver.var_min(var)
    }
}

/// Always the domain maximum.
pub struct MaxValueSelector;

impl ValueSelector for MaxValueSelector {
    fn name(&self) -> &str {
        "AssignMax"
    }

    fn select(&mut self, solver: &mut Solver, var: VarIndex, _id: usize) -> i64 {
        solver.var_max(var)
    }
}

/// A uniform random domain value.
///
/// Dense domains (more than a quarter of the span populated) are
/// rejection-sampled; sparse ones count to the k-th contained value from
/// the nearer end.
pub struct RandomValueSelector;

impl ValueSelector for RandomValueSelector {
    fn name(&self) -> &str {
        "AssignRandom"
    }

    fn select(&mut self, solver: &mut Solver, var: VarIndex, _id: usize) -> i64 {
        let min = solver.var_min(var);
        let max = solver.var_max(var);
        let span = (max as i128 - min as i128 + 1) as u64;
        let size = solver.var_size(var);
        if size > span / 4 {
            loop {
                let value = min.saturating_add(solver.rand64(span) as i64);
                if solver.var_contains(var, value) {
                    return value;
                }
            }
        }
        let index = solver.rand64(size);
        if index < size / 2 + 1 {
            // Count upward from the minimum.
            let mut remaining = index;
            let mut v = min;
            loop {
                if solver.var_contains(var, v) {
                    if remaining == 0 {
                        return v;
                    }
                    remaining -= 1;
                }
                v += 1;
            }
        } else {
            // Count downward from the maximum.
            let mut remaining = size - 1 - index;
            let mut v = max;
            loop {
                if solver.var_contains(var, v) {
                    if remaining == 0 {
                        return v;
                    }
                    remaining -= 1;
                }
                v -= 1;
            }
        }
    }
}

/// The midpoint of `[min, max]` when contained, otherwise the nearest
/// contained value found by a bidirectional scan.
pub struct CenterValueSelector;

impl ValueSelector for CenterValueSelector {
    fn name(&self) -> &str {
        "AssignCenter"
    }

    fn select(&mut self, solver: &mut Solver, var: VarIndex, _id: usize) -> i64 {
        let min = solver.var_min(var);
        let max = solver.var_max(var);
        let mid = ((min as i128 + max as i128) / 2) as i64;
        if solver.var_contains(var, mid) {
            return mid;
        }
        let diameter = max - mid; // Never smaller than mid - min.
        for i in 1..=diameter {
            if solver.var_contains(var, mid + i) {
                return mid + i;
            }
            if solver.var_contains(var, mid - i) {
                return mid - i;
            }
        }
        unreachable!("domain of {} empty during value selection", var)
    }
}

/// Minimizes a user evaluation over the domain; an optional tie-breaker
/// picks among equally cheap values by their count.
pub struct CheapestValueSelector {
    evaluator: Evaluator2,
    tie_breaker: Option<Evaluator1>,
    cache: Vec<i64>,
}

impl CheapestValueSelector {
    /// # Panics
    ///
    /// Panics if a callback is not repeatable.
    pub fn new(evaluator: Evaluator2, tie_breaker: Option<Evaluator1>) -> Self {
        evaluator.check_is_repeatable("CheapestValueSelector::new");
        if let Some(tie_breaker) = &tie_breaker {
            tie_breaker.check_is_repeatable("CheapestValueSelector::new");
        }
        Self {
            evaluator,
            tie_breaker,
            cache: Vec::new(),
        }
    }
}

impl ValueSelector for CheapestValueSelector {
    fn name(&self) -> &str {
        "CheapestValue"
    }

    fn select(&mut self, solver: &mut Solver, var: VarIndex, id: usize) -> i64 {
        self.cache.clear();
        let mut best = i64::MAX;
        for value in solver.domain_values(var) {
            let eval = self.evaluator.run(id as i64, value);
            if eval < best {
                best = eval;
                self.cache.clear();
                self.cache.push(value);
            } else if eval == best {
                self.cache.push(value);
            }
        }
        debug_assert!(!self.cache.is_empty());
        match &self.tie_breaker {
            Some(tie_breaker) if self.cache.len() > 1 => {
                let pick = tie_breaker.run(self.cache.len() as i64);
                self.cache[pick as usize]
            }
            _ => *self.cache.last().expect("empty domain during value selection"),
        }
    }
}
