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

//! Expression factories.
//!
//! Each `make_*` factory creates a fresh variable with conservative initial
//! bounds and posts the channeling constraint linking it to its inputs; the
//! constraint is scheduled, not propagated, so factories never fail. The
//! `add_*` helpers post a constraint without creating a variable.
//!
//! Factories called during search are fully reversible: the variable, the
//! constraint, and its watcher registrations all unwind on backtrack.

use crate::constraint::{
    AllDifferent, DifferenceCst, ElementFn, ElementFn2, ElementValues, GreaterOrEqual,
    GreaterOrEqualCst, IsDifferentCst, IsEqualCst, IsGreaterOrEqualCst, IsLessOrEqualCst,
    LessOrEqualCst, LinearSum, MaxCst, MinCst, NotEqualCst, Offset, SumGreaterOrEqualCst,
    SumLessOrEqualCst,
};
use crate::solver::Solver;
use crate::var::VarIndex;
use std::rc::Rc;

#[inline]
fn clamp(value: i128) -> i64 {
    if value > i64::MAX as i128 {
        i64::MAX
    } else if value < i64::MIN as i128 {
        i64::MIN
    } else {
        value as i64
    }
}

impl Solver {
    /// A fresh boolean variable over `[0, 1]`.
    #[inline]
    pub fn make_bool_var(&mut self) -> VarIndex {
        self.new_var(0, 1)
    }

    /// A variable constrained to `sum(vars)`.
    pub fn make_sum(&mut self, vars: &[VarIndex]) -> VarIndex {
        if vars.is_empty() {
            return self.new_var(0, 0);
        }
        let lo: i128 = vars.iter().map(|&v| self.var_min(v) as i128).sum();
        let hi: i128 = vars.iter().map(|&v| self.var_max(v) as i128).sum();
        let total = self.new_var(clamp(lo), clamp(hi));
        self.add_constraint(LinearSum::new(vars, total));
        total
    }

    /// A variable constrained to `var + offset`.
    pub fn make_offset(&mut self, var: VarIndex, offset: i64) -> VarIndex {
        let lo = clamp(self.var_min(var) as i128 + offset as i128);
        let hi = clamp(self.var_max(var) as i128 + offset as i128);
        let result = self.new_var(lo, hi);
        self.add_constraint(Offset::new(var, offset, result));
        result
    }

    /// A variable constrained to `value - var`.
    pub fn make_difference(&mut self, value: i64, var: VarIndex) -> VarIndex {
        let lo = clamp(value as i128 - self.var_max(var) as i128);
        let hi = clamp(value as i128 - self.var_min(var) as i128);
        let result = self.new_var(lo, hi);
        self.add_constraint(DifferenceCst::new(value, var, result));
        result
    }

    /// A variable constrained to `min(var, value)`.
    pub fn make_min_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let lo = self.var_min(var).min(value);
        let hi = self.var_max(var).min(value);
        let result = self.new_var(lo, hi);
        self.add_constraint(MinCst::new(var, value, result));
        result
    }

    /// A variable constrained to `max(var, value)`.
    pub fn make_max_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let lo = self.var_min(var).max(value);
        let hi = self.var_max(var).max(value);
        let result = self.new_var(lo, hi);
        self.add_constraint(MaxCst::new(var, value, result));
        result
    }

    /// A variable constrained to `values[index]`.
    pub fn make_element(&mut self, values: Vec<i64>, index: VarIndex) -> VarIndex {
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for i in self.domain_values(index) {
            if i >= 0 && (i as usize) < values.len() {
                lo = lo.min(values[i as usize]);
                hi = hi.max(values[i as usize]);
            }
        }
        if lo > hi {
            // No feasible index yet; the constraint will fail on propagation.
            lo = 0;
            hi = 0;
        }
        let result = self.new_var(lo, hi);
        self.add_constraint(ElementValues::new(values, index, result));
        result
    }

    /// A variable constrained to `f(index)`.
    pub fn make_element_fn(&mut self, f: Rc<dyn Fn(i64) -> i64>, index: VarIndex) -> VarIndex {
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for i in self.domain_values(index) {
            let value = f(i);
            lo = lo.min(value);
            hi = hi.max(value);
        }
        let result = self.new_var(lo, hi);
        self.add_constraint(ElementFn::new(f, index, result));
        result
    }

    /// A variable constrained to `f(a, b)`.
    pub fn make_element_fn2(
        &mut self,
        f: Rc<dyn Fn(i64, i64) -> i64>,
        a: VarIndex,
        b: VarIndex,
    ) -> VarIndex {
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for x in self.domain_values(a) {
            for y in self.domain_values(b) {
                let value = f(x, y);
                lo = lo.min(value);
                hi = hi.max(value);
            }
        }
        let result = self.new_var(lo, hi);
        self.add_constraint(ElementFn2::new(f, a, b, result));
        result
    }

    /// A boolean variable reifying `var == value`.
    pub fn make_is_equal_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let b = self.make_bool_var();
        self.add_is_equal_cst(var, value, b);
        b
    }

    /// Posts `b <=> (var == value)` on an existing boolean.
    pub fn add_is_equal_cst(&mut self, var: VarIndex, value: i64, b: VarIndex) {
        self.add_constraint(IsEqualCst::new(var, value, b));
    }

    /// A boolean variable reifying `var != value`.
    pub fn make_is_different_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let b = self.make_bool_var();
        self.add_is_different_cst(var, value, b);
        b
    }

    /// Posts `b <=> (var != value)` on an existing boolean.
    pub fn add_is_different_cst(&mut self, var: VarIndex, value: i64, b: VarIndex) {
        self.add_constraint(IsDifferentCst::new(var, value, b));
    }

    /// A boolean variable reifying `var >= value`.
    pub fn make_is_greater_or_equal_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let b = self.make_bool_var();
        self.add_is_greater_or_equal_cst(var, value, b);
        b
    }

    /// Posts `b <=> (var >= value)` on an existing boolean.
    pub fn add_is_greater_or_equal_cst(&mut self, var: VarIndex, value: i64, b: VarIndex) {
        self.add_constraint(IsGreaterOrEqualCst::new(var, value, b));
    }

    /// A boolean variable reifying `var <= value`.
    pub fn make_is_less_or_equal_cst(&mut self, var: VarIndex, value: i64) -> VarIndex {
        let b = self.make_bool_var();
        self.add_is_less_or_equal_cst(var, value, b);
        b
    }

    /// Posts `b <=> (var <= value)` on an existing boolean.
    pub fn add_is_less_or_equal_cst(&mut self, var: VarIndex, value: i64, b: VarIndex) {
        self.add_constraint(IsLessOrEqualCst::new(var, value, b));
    }

    /// Posts `left >= right`.
    pub fn add_greater_or_equal(&mut self, left: VarIndex, right: VarIndex) {
        self.add_constraint(GreaterOrEqual::new(left, right));
    }

    /// Posts `var >= value`.
    pub fn add_greater_or_equal_cst(&mut self, var: VarIndex, value: i64) {
        self.add_constraint(GreaterOrEqualCst::new(var, value));
    }

    /// Posts `var <= value`.
    pub fn add_less_or_equal_cst(&mut self, var: VarIndex, value: i64) {
        self.add_constraint(LessOrEqualCst::new(var, value));
    }

    /// Posts `var != value`.
    pub fn add_not_equal_cst(&mut self, var: VarIndex, value: i64) {
        self.add_constraint(NotEqualCst::new(var, value));
    }

    /// Posts `sum(vars) >= value`.
    pub fn add_sum_greater_or_equal(&mut self, vars: &[VarIndex], value: i64) {
        self.add_constraint(SumGreaterOrEqualCst::new(vars, value));
    }

    /// Posts `sum(vars) <= value`.
    pub fn add_sum_less_or_equal(&mut self, vars: &[VarIndex], value: i64) {
        self.add_constraint(SumLessOrEqualCst::new(vars, value));
    }

    /// Posts all-different over `vars`.
    pub fn add_all_different(&mut self, vars: &[VarIndex]) {
        self.add_constraint(AllDifferent::new(vars));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_sum_bounds() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 5);
        let y = solver.new_var(2, 3);
        let s = solver.make_sum(&[x, y]);
        assert_eq!(solver.var_min(s), 2);
        assert_eq!(solver.var_max(s), 8);
        solver.propagate().unwrap();
    }

    #[test]
    fn test_make_sum_empty_is_zero() {
        let mut solver = Solver::new();
        let s = solver.make_sum(&[]);
        assert_eq!(solver.var_value(s), 0);
    }

    #[test]
    fn test_reified_factories_create_bools() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let b = solver.make_is_greater_or_equal_cst(x, 4);
        solver.propagate().unwrap();
        assert_eq!(solver.var_min(b), 0);
        assert_eq!(solver.var_max(b), 1);

        solver.set_max(x, 3).unwrap();
        solver.propagate().unwrap();
        assert_eq!(solver.var_value(b), 0);
    }

    #[test]
    fn test_make_element_fn_prunes_index() {
        let mut solver = Solver::new();
        let index = solver.new_var(0, 4);
        let f: Rc<dyn Fn(i64) -> i64> = Rc::new(|i| i * i);
        let result = solver.make_element_fn(f, index);
        solver.propagate().unwrap();
        assert_eq!(solver.var_min(result), 0);
        assert_eq!(solver.var_max(result), 16);

        solver.set_max(result, 5).unwrap();
        solver.propagate().unwrap();
        assert_eq!(solver.var_max(index), 2);
    }

    #[test]
    fn test_factories_unwind_on_backtrack() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 9);
        let mark = solver.trail_mark();
        let vars_before = solver.num_vars();
        let constraints_before = solver.constraints();

        let _s = solver.make_offset(x, 3);
        let _b = solver.make_is_equal_cst(x, 2);
        assert!(solver.num_vars() > vars_before);
        assert!(solver.constraints() > constraints_before);

        solver.rewind_to(mark);
        assert_eq!(solver.num_vars(), vars_before);
        assert_eq!(solver.constraints(), constraints_before);
    }
}
