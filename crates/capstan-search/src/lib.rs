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

//! # Capstan Search
//!
//! The search layer of the capstan solver: a backtracking driver over the
//! engine's reversible store, plus everything that plugs into it.
//!
//! ## Modules
//!
//! - `search`: the driver loop (`solve`, `nested_solve`), failure
//!   unwinding, restarts, and solution continuation.
//! - `monitor`: the `SearchMonitor` observer protocol and the built-in
//!   monitors (log/trace, solution collectors, objective bounding,
//!   limits, restarts).
//! - `branching`: decisions, decision builders, the `Phase` builder, and
//!   the variable/value/evaluator selectors.
//! - `meta`: metaheuristic monitors (tabu search, simulated annealing,
//!   guided local search).
//! - `symmetry`: symmetry breaking during search.
//! - `callbacks`: user-supplied evaluation callbacks with a repeatable
//!   purity tag.

pub mod branching;
pub mod callbacks;
pub mod meta;
pub mod monitor;
pub mod search;
pub mod symmetry;

pub use branching::compose::{AssignVariablesFromAssignment, Compose, SolveOnce};
pub use branching::decision::{
    AssignVariableValue, AssignVariableValueOrFail, AssignVariablesValues, BalancingDecision,
    Decision, DecisionBuilder, DecisionVisitor,
};
pub use branching::phase::{EvaluatorStrategy, Phase, ValueStrategy, VariableStrategy};
pub use callbacks::{DisplayCallback, Evaluator1, Evaluator2, Evaluator3};
pub use monitor::limit::{CustomLimit, RegularLimit};
pub use monitor::log::{SearchLog, SearchTrace};
pub use monitor::optimize::OptimizeVar;
pub use monitor::restart::{luby, ConstantRestart, LubyRestart};
pub use monitor::solution::{
    AllSolutionCollector, BestValueSolutionCollector, FirstSolutionCollector,
    LastSolutionCollector,
};
pub use monitor::{MonitorRef, SearchMonitor};
pub use search::{nested_solve, solve};
pub use symmetry::{ClauseBuilder, SymmetryBreaker, SymmetryManager};
