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

//! The `Constraint` trait and the built-in propagators.
//!
//! Propagators are stateless: each call reads the current domains through
//! the solver and tightens them. The queue re-runs a propagator whenever a
//! watched variable changes, so a pass that makes no mutation is the
//! fixpoint. Strength is bounds/value consistency; nothing here attempts
//! global filtering.

use crate::fail::Propagation;
use crate::solver::Solver;
use crate::var::VarIndex;
use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use std::rc::Rc;

/// Spans up to this size get value channeling in addition to bounds.
const CHANNEL_LIMIT: u64 = 1024;

/// A propagator attached to a set of watched variables.
pub trait Constraint {
    /// Variables whose domain changes reschedule this constraint.
    fn watched(&self) -> &[VarIndex];

    /// Tightens domains; `Err(Fail)` signals an inconsistent branch.
    fn propagate(&self, solver: &mut Solver) -> Propagation;

    fn name(&self) -> &'static str {
        "constraint"
    }
}

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

// ----- all-different -----

/// Pairwise all-different: a bound variable's value is removed from every
/// other variable.
pub struct AllDifferent {
    vars: Vec<VarIndex>,
}

impl AllDifferent {
    pub fn new(vars: &[VarIndex]) -> Rc<Self> {
        Rc::new(Self {
            vars: vars.to_vec(),
        })
    }
}

impl Constraint for AllDifferent {
    fn watched(&self) -> &[VarIndex] {
        &self.vars
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        for (i, &var) in self.vars.iter().enumerate() {
            if !solver.var_bound(var) {
                continue;
            }
            let value = solver.var_value(var);
            for (j, &other) in self.vars.iter().enumerate() {
                if i != j {
                    solver.remove_value(other, value)?;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AllDifferent"
    }
}

// ----- linear sum -----

/// `sum(vars) == total`, bounds-consistent.
pub struct LinearSum {
    vars: Vec<VarIndex>,
    total: VarIndex,
    watched: Vec<VarIndex>,
}

impl LinearSum {
    pub fn new(vars: &[VarIndex], total: VarIndex) -> Rc<Self> {
        let mut watched = vars.to_vec();
        watched.push(total);
        Rc::new(Self {
            vars: vars.to_vec(),
            total,
            watched,
        })
    }
}

impl Constraint for LinearSum {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let sum_min: i128 = self.vars.iter().map(|&v| solver.var_min(v) as i128).sum();
        let sum_max: i128 = self.vars.iter().map(|&v| solver.var_max(v) as i128).sum();
        solver.set_min(self.total, clamp(sum_min))?;
        solver.set_max(self.total, clamp(sum_max))?;

        let total_min = solver.var_min(self.total) as i128;
        let total_max = solver.var_max(self.total) as i128;
        for &var in &self.vars {
            let min = solver.var_min(var) as i128;
            let max = solver.var_max(var) as i128;
            solver.set_max(var, clamp(total_max - (sum_min - min)))?;
            solver.set_min(var, clamp(total_min - (sum_max - max)))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LinearSum"
    }
}

// ----- order between two variables -----

/// `left >= right`.
pub struct GreaterOrEqual {
    watched: [VarIndex; 2],
}

impl GreaterOrEqual {
    pub fn new(left: VarIndex, right: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            watched: [left, right],
        })
    }
}

impl Constraint for GreaterOrEqual {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [left, right] = self.watched;
        solver.set_min(left, solver.var_min(right))?;
        solver.set_max(right, solver.var_max(left))
    }

    fn name(&self) -> &'static str {
        "GreaterOrEqual"
    }
}

// ----- constant bounds -----

/// `var >= value`.
pub struct GreaterOrEqualCst {
    watched: [VarIndex; 1],
    value: i64,
}

impl GreaterOrEqualCst {
    pub fn new(var: VarIndex, value: i64) -> Rc<Self> {
        Rc::new(Self {
            watched: [var],
            value,
        })
    }
}

impl Constraint for GreaterOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        solver.set_min(self.watched[0], self.value)
    }

    fn name(&self) -> &'static str {
        "GreaterOrEqualCst"
    }
}

/// `var <= value`.
pub struct LessOrEqualCst {
    watched: [VarIndex; 1],
    value: i64,
}

impl LessOrEqualCst {
    pub fn new(var: VarIndex, value: i64) -> Rc<Self> {
        Rc::new(Self {
            watched: [var],
            value,
        })
    }
}

impl Constraint for LessOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        solver.set_max(self.watched[0], self.value)
    }

    fn name(&self) -> &'static str {
        "LessOrEqualCst"
    }
}

/// `var != value`.
pub struct NotEqualCst {
    watched: [VarIndex; 1],
    value: i64,
}

impl NotEqualCst {
    pub fn new(var: VarIndex, value: i64) -> Rc<Self> {
        Rc::new(Self {
            watched: [var],
            value,
        })
    }
}

impl Constraint for NotEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        solver.remove_value(self.watched[0], self.value)
    }

    fn name(&self) -> &'static str {
        "NotEqualCst"
    }
}

// ----- boolean sum lower bound -----

/// `sum(vars) >= value`.
pub struct SumGreaterOrEqualCst {
    vars: Vec<VarIndex>,
    value: i64,
}

impl SumGreaterOrEqualCst {
    pub fn new(vars: &[VarIndex], value: i64) -> Rc<Self> {
        Rc::new(Self {
            vars: vars.to_vec(),
            value,
        })
    }
}

impl Constraint for SumGreaterOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.vars
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let sum_max: i128 = self.vars.iter().map(|&v| solver.var_max(v) as i128).sum();
        for &var in &self.vars {
            let max = solver.var_max(var) as i128;
            // If every other variable takes its maximum, this one still has
            // to reach value - (sum_max - max).
            solver.set_min(var, clamp(self.value as i128 - (sum_max - max)))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SumGreaterOrEqualCst"
    }
}

/// `sum(vars) <= value`.
pub struct SumLessOrEqualCst {
    vars: Vec<VarIndex>,
    value: i64,
}

impl SumLessOrEqualCst {
    pub fn new(vars: &[VarIndex], value: i64) -> Rc<Self> {
        Rc::new(Self {
            vars: vars.to_vec(),
            value,
        })
    }
}

impl Constraint for SumLessOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.vars
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let sum_min: i128 = self.vars.iter().map(|&v| solver.var_min(v) as i128).sum();
        for &var in &self.vars {
            let min = solver.var_min(var) as i128;
            solver.set_max(var, clamp(self.value as i128 - (sum_min - min)))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SumLessOrEqualCst"
    }
}

// ----- reified comparisons against a constant -----

/// `b <=> (var == value)`.
pub struct IsEqualCst {
    watched: [VarIndex; 2],
    value: i64,
}

impl IsEqualCst {
    pub fn new(var: VarIndex, value: i64, b: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            watched: [var, b],
            value,
        })
    }
}

impl Constraint for IsEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [var, b] = self.watched;
        if !solver.var_contains(var, self.value) {
            return solver.set_value(b, 0);
        }
        if solver.var_bound(var) {
            return solver.set_value(b, 1);
        }
        if solver.var_bound(b) {
            if solver.var_value(b) == 1 {
                return solver.set_value(var, self.value);
            }
            return solver.remove_value(var, self.value);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IsEqualCst"
    }
}

/// `b <=> (var != value)`.
pub struct IsDifferentCst {
    watched: [VarIndex; 2],
    value: i64,
}

impl IsDifferentCst {
    pub fn new(var: VarIndex, value: i64, b: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            watched: [var, b],
            value,
        })
    }
}

impl Constraint for IsDifferentCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [var, b] = self.watched;
        if !solver.var_contains(var, self.value) {
            return solver.set_value(b, 1);
        }
        if solver.var_bound(var) {
            return solver.set_value(b, 0);
        }
        if solver.var_bound(b) {
            if solver.var_value(b) == 1 {
                return solver.remove_value(var, self.value);
            }
            return solver.set_value(var, self.value);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IsDifferentCst"
    }
}

/// `b <=> (var >= value)`.
pub struct IsGreaterOrEqualCst {
    watched: [VarIndex; 2],
    value: i64,
}

impl IsGreaterOrEqualCst {
    pub fn new(var: VarIndex, value: i64, b: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            watched: [var, b],
            value,
        })
    }
}

impl Constraint for IsGreaterOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [var, b] = self.watched;
        if solver.var_min(var) >= self.value {
            return solver.set_value(b, 1);
        }
        if solver.var_max(var) < self.value {
            return solver.set_value(b, 0);
        }
        if solver.var_bound(b) {
            if solver.var_value(b) == 1 {
                return solver.set_min(var, self.value);
            }
            return solver.set_max(var, self.value.saturating_sub_val(1));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IsGreaterOrEqualCst"
    }
}

/// `b <=> (var <= value)`.
pub struct IsLessOrEqualCst {
    watched: [VarIndex; 2],
    value: i64,
}

impl IsLessOrEqualCst {
    pub fn new(var: VarIndex, value: i64, b: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            watched: [var, b],
            value,
        })
    }
}

impl Constraint for IsLessOrEqualCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [var, b] = self.watched;
        if solver.var_max(var) <= self.value {
            return solver.set_value(b, 1);
        }
        if solver.var_min(var) > self.value {
            return solver.set_value(b, 0);
        }
        if solver.var_bound(b) {
            if solver.var_value(b) == 1 {
                return solver.set_max(var, self.value);
            }
            return solver.set_min(var, self.value.saturating_add_val(1));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IsLessOrEqualCst"
    }
}

// ----- element -----

/// `result == values[index]`.
pub struct ElementValues {
    values: Vec<i64>,
    watched: [VarIndex; 2],
}

impl ElementValues {
    pub fn new(values: Vec<i64>, index: VarIndex, result: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            values,
            watched: [index, result],
        })
    }
}

impl Constraint for ElementValues {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [index, result] = self.watched;
        solver.set_min(index, 0)?;
        solver.set_max(index, self.values.len() as i64 - 1)?;

        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for i in solver.domain_values(index) {
            let value = self.values[i as usize];
            lo = lo.min(value);
            hi = hi.max(value);
        }
        solver.set_min(result, lo)?;
        solver.set_max(result, hi)?;

        for i in solver.domain_values(index) {
            if !solver.var_contains(result, self.values[i as usize]) {
                solver.remove_value(index, i)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ElementValues"
    }
}

/// `result == f(index)` for a unary evaluation function.
pub struct ElementFn {
    f: Rc<dyn Fn(i64) -> i64>,
    watched: [VarIndex; 2],
}

impl ElementFn {
    pub fn new(f: Rc<dyn Fn(i64) -> i64>, index: VarIndex, result: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            f,
            watched: [index, result],
        })
    }
}

impl Constraint for ElementFn {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [index, result] = self.watched;
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for i in solver.domain_values(index) {
            let value = (self.f)(i);
            lo = lo.min(value);
            hi = hi.max(value);
        }
        solver.set_min(result, lo)?;
        solver.set_max(result, hi)?;

        for i in solver.domain_values(index) {
            if !solver.var_contains(result, (self.f)(i)) {
                solver.remove_value(index, i)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ElementFn"
    }
}

/// `result == f(a, b)` for a binary evaluation function.
///
/// Bounds-consistent on `result` only; the index pair is left untouched.
pub struct ElementFn2 {
    f: Rc<dyn Fn(i64, i64) -> i64>,
    watched: [VarIndex; 3],
}

impl ElementFn2 {
    pub fn new(
        f: Rc<dyn Fn(i64, i64) -> i64>,
        a: VarIndex,
        b: VarIndex,
        result: VarIndex,
    ) -> Rc<Self> {
        Rc::new(Self {
            f,
            watched: [a, b, result],
        })
    }
}

impl Constraint for ElementFn2 {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [a, b, result] = self.watched;
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for x in solver.domain_values(a) {
            for y in solver.domain_values(b) {
                let value = (self.f)(x, y);
                lo = lo.min(value);
                hi = hi.max(value);
            }
        }
        solver.set_min(result, lo)?;
        solver.set_max(result, hi)
    }

    fn name(&self) -> &'static str {
        "ElementFn2"
    }
}

// ----- affine links -----

/// `y == x + offset`, with value channeling on enumerable spans.
pub struct Offset {
    offset: i64,
    watched: [VarIndex; 2],
}

impl Offset {
    pub fn new(x: VarIndex, offset: i64, y: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            offset,
            watched: [x, y],
        })
    }
}

impl Constraint for Offset {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [x, y] = self.watched;
        let c = self.offset as i128;
        solver.set_min(y, clamp(solver.var_min(x) as i128 + c))?;
        solver.set_max(y, clamp(solver.var_max(x) as i128 + c))?;
        solver.set_min(x, clamp(solver.var_min(y) as i128 - c))?;
        solver.set_max(x, clamp(solver.var_max(y) as i128 - c))?;

        if solver.var_size(x) <= CHANNEL_LIMIT {
            for v in solver.domain_values(x) {
                if !solver.var_contains(y, v.saturating_add_val(self.offset)) {
                    solver.remove_value(x, v)?;
                }
            }
        }
        if solver.var_size(y) <= CHANNEL_LIMIT {
            for w in solver.domain_values(y) {
                if !solver.var_contains(x, w.saturating_sub_val(self.offset)) {
                    solver.remove_value(y, w)?;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Offset"
    }
}

/// `y == value - x`, bounds-consistent.
pub struct DifferenceCst {
    value: i64,
    watched: [VarIndex; 2],
}

impl DifferenceCst {
    pub fn new(value: i64, x: VarIndex, y: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            value,
            watched: [x, y],
        })
    }
}

impl Constraint for DifferenceCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [x, y] = self.watched;
        let c = self.value as i128;
        solver.set_min(y, clamp(c - solver.var_max(x) as i128))?;
        solver.set_max(y, clamp(c - solver.var_min(x) as i128))?;
        solver.set_min(x, clamp(c - solver.var_max(y) as i128))?;
        solver.set_max(x, clamp(c - solver.var_min(y) as i128))
    }

    fn name(&self) -> &'static str {
        "DifferenceCst"
    }
}

/// `y == min(x, value)`.
pub struct MinCst {
    value: i64,
    watched: [VarIndex; 2],
}

impl MinCst {
    pub fn new(x: VarIndex, value: i64, y: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            value,
            watched: [x, y],
        })
    }
}

impl Constraint for MinCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [x, y] = self.watched;
        solver.set_max(y, solver.var_max(x).min(self.value))?;
        solver.set_min(y, solver.var_min(x).min(self.value))?;
        // y <= x always holds for a min.
        solver.set_min(x, solver.var_min(y))?;
        if solver.var_max(y) < self.value {
            // The constant arm is out, so y == x.
            solver.set_max(x, solver.var_max(y))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MinCst"
    }
}

/// `y == max(x, value)`.
pub struct MaxCst {
    value: i64,
    watched: [VarIndex; 2],
}

impl MaxCst {
    pub fn new(x: VarIndex, value: i64, y: VarIndex) -> Rc<Self> {
        Rc::new(Self {
            value,
            watched: [x, y],
        })
    }
}

impl Constraint for MaxCst {
    fn watched(&self) -> &[VarIndex] {
        &self.watched
    }

    fn propagate(&self, solver: &mut Solver) -> Propagation {
        let [x, y] = self.watched;
        solver.set_min(y, solver.var_min(x).max(self.value))?;
        solver.set_max(y, solver.var_max(x).max(self.value))?;
        // x <= y always holds for a max.
        solver.set_max(x, solver.var_max(y))?;
        if solver.var_min(y) > self.value {
            // The constant arm is out, so y == x.
            solver.set_min(x, solver.var_min(y))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MaxCst"
    }
}
