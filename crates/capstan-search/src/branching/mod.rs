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

pub mod compose;
pub mod decision;
pub mod evaluator_selectors;
pub mod phase;
pub mod value_selectors;
pub mod variable_selectors;

use capstan_engine::{Solver, VarIndex};

/// A combined variable-and-value choice.
///
/// The phase builder drives one of these: either a plain pairing of a
/// variable selector with a value selector, or a global evaluator
/// selector that ranks `(variable, value)` pairs by a single cost.
pub trait AssignmentSelector {
    fn name(&self) -> &str;

    /// Picks the next unbound variable, or `None` when the phase is done.
    fn select_variable(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)>;

    /// Picks the value for the variable just selected.
    fn select_value(&mut self, solver: &mut Solver, var: VarIndex, id: usize) -> i64;
}
