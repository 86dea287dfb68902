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

//! # Capstan Solver
//!
//! Facade over the capstan workspace: pulls the finite-domain engine and
//! the search layer into a single dependency.
//!
//! ```rust
//! use capstan_solver::prelude::*;
//!
//! let mut solver = Solver::new();
//! let x = solver.new_var(0, 3);
//! let y = solver.new_var(0, 3);
//! solver.add_all_different(&[x, y]);
//!
//! let mut prototype = Assignment::new();
//! prototype.add_all(&[x, y]);
//! let collector = monitor_ref(AllSolutionCollector::new(&prototype));
//! let monitors: Vec<MonitorRef> = vec![collector.clone()];
//!
//! let mut phase = Phase::new(
//!     &mut solver,
//!     &[x, y],
//!     VariableStrategy::ChooseFirstUnbound,
//!     ValueStrategy::AssignMinValue,
//! );
//! assert!(solve(&mut solver, &mut phase, &monitors));
//! assert_eq!(collector.borrow().solution_count(), 12);
//! ```

pub use capstan_engine as engine;
pub use capstan_search as search;

/// The commonly used surface in one import.
pub mod prelude {
    pub use capstan_engine::{
        Assignment, CellIndex, Fail, Propagation, Solver, SolverOptions, VarIndex,
    };
    pub use capstan_search::monitor::monitor_ref;
    pub use capstan_search::{
        nested_solve, solve, AllSolutionCollector, AssignVariableValue,
        AssignVariableValueOrFail, AssignVariablesFromAssignment, AssignVariablesValues,
        BestValueSolutionCollector, Compose, ConstantRestart, CustomLimit, Decision,
        DecisionBuilder, DisplayCallback, Evaluator1, Evaluator2, Evaluator3, EvaluatorStrategy,
        FirstSolutionCollector, LastSolutionCollector, LubyRestart, MonitorRef, OptimizeVar,
        Phase, RegularLimit, SearchLog, SearchMonitor, SearchTrace, SolveOnce, SymmetryBreaker,
        SymmetryManager, ValueStrategy, VariableStrategy,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_facade_round_trip() {
        let mut solver = Solver::new();
        let x = solver.new_var(1, 2);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::Default,
            ValueStrategy::Default,
        );
        let monitors: Vec<MonitorRef> = Vec::new();
        assert!(solve(&mut solver, &mut phase, &monitors));
    }
}
