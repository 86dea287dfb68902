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

//! # Capstan Engine
//!
//! A finite-domain propagation engine with a reversible trail. The engine
//! owns the decision variables, the constraint store, the propagation
//! queue, and the undo log; the search layer drives it through decisions
//! and monitor hooks.
//!
//! ## Modules
//!
//! - `domain`: interval-plus-holes finite integer domains.
//! - `trail`: linear undo log with frame marks.
//! - `solver`: the `Solver` facade — variables, reversible cells,
//!   constraints, propagation, counters, RNG.
//! - `expr`: expression factories (`make_sum`, `make_element`, reified
//!   comparisons, ...) consumed by the search layer.
//! - `constraint`: the `Constraint` trait and the built-in propagators.
//! - `assignment`: value snapshots used by collectors and metaheuristics.
//! - `fail`: the recoverable failure token.
//!
//! Failure is a control-flow signal, not an error: every fallible domain
//! operation returns [`fail::Propagation`] and callers thread it with `?`
//! up to the nearest choice point.

pub mod assignment;
pub mod constraint;
pub mod domain;
pub mod expr;
pub mod fail;
pub mod solver;
pub mod trail;
pub mod var;

pub use assignment::{Assignment, IntVarElement};
pub use fail::{Fail, Propagation};
pub use solver::{Solver, SolverOptions};
pub use trail::TrailMark;
pub use var::{CellIndex, VarIndex};
