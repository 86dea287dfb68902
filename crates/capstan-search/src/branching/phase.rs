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

//! The phase decision builder: a variable selection strategy paired with
//! a value selection strategy, producing `var := value` decisions until
//! every variable in its array is bound.

use crate::branching::decision::{AssignVariableValue, Decision, DecisionBuilder};
use crate::branching::evaluator_selectors::{DynamicEvaluatorSelector, StaticEvaluatorSelector};
use crate::branching::value_selectors::{
    CenterValueSelector, CheapestValueSelector, MaxValueSelector, MinValueSelector,
    RandomValueSelector, ValueSelector,
};
use crate::branching::variable_selectors::{
    CheapestVarSelector, FirstUnboundSelector, MinSizeSelector, MinSizeTieBreak, PathSelector,
    RandomSelector, VariableSelector,
};
use crate::branching::AssignmentSelector;
use crate::callbacks::{Evaluator1, Evaluator2};
use capstan_engine::{Fail, Solver, VarIndex};
use std::rc::Rc;

/// Variable selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStrategy {
    Default,
    Simple,
    ChooseFirstUnbound,
    ChooseRandom,
    ChooseMinSizeLowestMin,
    ChooseMinSizeHighestMin,
    ChooseMinSizeLowestMax,
    ChooseMinSizeHighestMax,
    ChoosePath,
}

/// Value selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueStrategy {
    Default,
    Simple,
    AssignMinValue,
    AssignMaxValue,
    AssignRandomValue,
    AssignCenterValue,
}

/// Combined variable-and-value strategies driven by one evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorStrategy {
    ChooseStaticGlobalBest,
    ChooseDynamicGlobalBest,
}

/// Pairs a [`VariableSelector`] with a [`ValueSelector`].
struct VariableValueSelector {
    variable_selector: Box<dyn VariableSelector>,
    value_selector: Box<dyn ValueSelector>,
}

impl AssignmentSelector for VariableValueSelector {
    fn name(&self) -> &str {
        self.variable_selector.name()
    }

    fn select_variable(&mut self, solver: &mut Solver) -> Option<(usize, VarIndex)> {
        self.variable_selector.select(solver)
    }

    fn select_value(&mut self, solver: &mut Solver, var: VarIndex, id: usize) -> i64 {
        self.value_selector.select(solver, var, id)
    }
}

fn make_variable_selector(
    solver: &mut Solver,
    vars: &[VarIndex],
    strategy: VariableStrategy,
) -> Box<dyn VariableSelector> {
    match strategy {
        VariableStrategy::Default
        | VariableStrategy::Simple
        | VariableStrategy::ChooseFirstUnbound => {
            Box::new(FirstUnboundSelector::new(solver, vars))
        }
        VariableStrategy::ChooseRandom => Box::new(RandomSelector::new(vars)),
        VariableStrategy::ChooseMinSizeLowestMin => {
            Box::new(MinSizeSelector::new(vars, MinSizeTieBreak::LowestMin))
        }
        VariableStrategy::ChooseMinSizeHighestMin => {
            Box::new(MinSizeSelector::new(vars, MinSizeTieBreak::HighestMin))
        }
        VariableStrategy::ChooseMinSizeLowestMax => {
            Box::new(MinSizeSelector::new(vars, MinSizeTieBreak::LowestMax))
        }
        VariableStrategy::ChooseMinSizeHighestMax => {
            Box::new(MinSizeSelector::new(vars, MinSizeTieBreak::HighestMax))
        }
        VariableStrategy::ChoosePath => Box::new(PathSelector::new(solver, vars)),
    }
}

fn make_value_selector(strategy: ValueStrategy) -> Box<dyn ValueSelector> {
    match strategy {
        ValueStrategy::Default | ValueStrategy::Simple | ValueStrategy::AssignMinValue => {
            Box::new(MinValueSelector)
        }
        ValueStrategy::AssignMaxValue => Box::new(MaxValueSelector),
        ValueStrategy::AssignRandomValue => Box::new(RandomValueSelector),
        ValueStrategy::AssignCenterValue => Box::new(CenterValueSelector),
    }
}

/// A decision builder assigning one variable per decision.
///
/// An empty variable array yields a builder that immediately reports its
/// subtree solved.
pub struct Phase {
    selector: Box<dyn AssignmentSelector>,
}

impl Phase {
    /// Strategy-pair phase.
    pub fn new(
        solver: &mut Solver,
        vars: &[VarIndex],
        var_strategy: VariableStrategy,
        value_strategy: ValueStrategy,
    ) -> Self {
        let variable_selector = make_variable_selector(solver, vars, var_strategy);
        let value_selector = make_value_selector(value_strategy);
        Self {
            selector: Box::new(VariableValueSelector {
                variable_selector,
                value_selector,
            }),
        }
    }

    /// Variable choice by user callback, value by strategy.
    ///
    /// # Panics
    ///
    /// Panics if the evaluator is not repeatable.
    pub fn with_variable_evaluator(
        _solver: &mut Solver,
        vars: &[VarIndex],
        var_evaluator: Evaluator1,
        value_strategy: ValueStrategy,
    ) -> Self {
        var_evaluator.check_is_repeatable("Phase::with_variable_evaluator");
        Self {
            selector: Box::new(VariableValueSelector {
                variable_selector: Box::new(CheapestVarSelector::new(vars, var_evaluator)),
                value_selector: make_value_selector(value_strategy),
            }),
        }
    }

    /// Variable by strategy, value by user callback with an optional
    /// tie-breaker.
    ///
    /// # Panics
    ///
    /// Panics if a callback is not repeatable.
    pub fn with_value_evaluator(
        solver: &mut Solver,
        vars: &[VarIndex],
        var_strategy: VariableStrategy,
        value_evaluator: Evaluator2,
        tie_breaker: Option<Evaluator1>,
    ) -> Self {
        value_evaluator.check_is_repeatable("Phase::with_value_evaluator");
        Self {
            selector: Box::new(VariableValueSelector {
                variable_selector: make_variable_selector(solver, vars, var_strategy),
                value_selector: Box::new(CheapestValueSelector::new(value_evaluator, tie_breaker)),
            }),
        }
    }

    /// Both choices by user callbacks.
    ///
    /// # Panics
    ///
    /// Panics if a callback is not repeatable.
    pub fn with_evaluators(
        _solver: &mut Solver,
        vars: &[VarIndex],
        var_evaluator: Evaluator1,
        value_evaluator: Evaluator2,
        tie_breaker: Option<Evaluator1>,
    ) -> Self {
        var_evaluator.check_is_repeatable("Phase::with_evaluators");
        value_evaluator.check_is_repeatable("Phase::with_evaluators");
        Self {
            selector: Box::new(VariableValueSelector {
                variable_selector: Box::new(CheapestVarSelector::new(vars, var_evaluator)),
                value_selector: Box::new(CheapestValueSelector::new(value_evaluator, tie_breaker)),
            }),
        }
    }

    /// Combined choice through a global evaluator.
    ///
    /// The static strategy ignores the tie-breaker.
    ///
    /// # Panics
    ///
    /// Panics if a callback is not repeatable.
    pub fn with_evaluator_strategy(
        solver: &mut Solver,
        vars: &[VarIndex],
        evaluator: Evaluator2,
        tie_breaker: Option<Evaluator1>,
        strategy: EvaluatorStrategy,
    ) -> Self {
        evaluator.check_is_repeatable("Phase::with_evaluator_strategy");
        let selector: Box<dyn AssignmentSelector> = match strategy {
            EvaluatorStrategy::ChooseStaticGlobalBest => {
                Box::new(StaticEvaluatorSelector::new(solver, vars, evaluator))
            }
            EvaluatorStrategy::ChooseDynamicGlobalBest => {
                Box::new(DynamicEvaluatorSelector::new(vars, evaluator, tie_breaker))
            }
        };
        Self { selector }
    }
}

impl DecisionBuilder for Phase {
    fn name(&self) -> &str {
        self.selector.name()
    }

    fn next(&mut self, solver: &mut Solver) -> Result<Option<Rc<dyn Decision>>, Fail> {
        match self.selector.select_variable(solver) {
            None => Ok(None),
            Some((id, var)) => {
                let value = self.selector.select_value(solver, var, id);
                Ok(Some(Rc::new(AssignVariableValue::new(var, value))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_phase_yields_none() {
        let mut solver = Solver::new();
        let mut phase = Phase::new(
            &mut solver,
            &[],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        assert!(phase.next(&mut solver).unwrap().is_none());
    }

    #[test]
    fn test_phase_produces_min_assignments() {
        let mut solver = Solver::new();
        let x = solver.new_var(2, 5);
        let mut phase = Phase::new(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            ValueStrategy::AssignMinValue,
        );
        let decision = phase.next(&mut solver).unwrap().unwrap();
        decision.apply(&mut solver).unwrap();
        assert_eq!(solver.var_value(x), 2);

        // All bound: the phase is done.
        assert!(phase.next(&mut solver).unwrap().is_none());
    }

    #[test]
    fn test_phase_default_maps_to_first_unbound_min() {
        let mut solver = Solver::new();
        let x = solver.new_var(1, 3);
        let y = solver.new_var(4, 6);
        let mut phase = Phase::new(
            &mut solver,
            &[x, y],
            VariableStrategy::Default,
            ValueStrategy::Default,
        );
        let decision = phase.next(&mut solver).unwrap().unwrap();
        assert_eq!(decision.describe(), format!("[{} == 1]", x));
    }

    #[test]
    #[should_panic(expected = "with a non-repeatable callback")]
    fn test_phase_rejects_non_repeatable_evaluator() {
        let mut solver = Solver::new();
        let x = solver.new_var(0, 1);
        let _ = Phase::with_value_evaluator(
            &mut solver,
            &[x],
            VariableStrategy::ChooseFirstUnbound,
            Evaluator2::non_repeatable(|_, v| v),
            None,
        );
    }
}
