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

//! Guided local search.
//!
//! Maintains a penalty count per `(variable index, value)` arc. At every
//! applied decision the objective is capped by a penalty-augmented bound
//! built from element expressions over the tracked variables, with the
//! plain `best ± step` as the aspiration arm. At a local optimum the
//! arcs maximizing `cost / (1 + penalty)` all get their penalty raised by
//! one, ties included, steering the next neighborhood away from them.
//!
//! Two penalty stores with identical semantics: a dense table and a
//! sparse map guarded by a per-variable penalized bitmap, selected by
//! `SolverOptions::use_sparse_gls_penalties`.

use crate::branching::decision::Decision;
use crate::callbacks::{Evaluator2, Evaluator3};
use crate::meta::ObjectiveTracker;
use crate::monitor::SearchMonitor;
use capstan_core::num::ops::{SaturatingAddVal, SaturatingSubVal};
use capstan_engine::{Assignment, Propagation, Solver, VarIndex};
use fixedbitset::FixedBitSet;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A penalized `(variable index, value)` pair.
type PenaltyArc = (i64, i64);

/// Penalty frequencies per arc.
trait GlsPenalties {
    fn has_values(&self) -> bool;
    fn increment(&mut self, arc: PenaltyArc);
    fn value(&self, arc: PenaltyArc) -> i64;
}

/// Dense 2-D table, rows grown on demand.
struct DensePenalties {
    rows: Vec<Vec<i64>>,
    has_values: bool,
}

impl DensePenalties {
    fn new(size: usize) -> Self {
        Self {
            rows: vec![Vec::new(); size],
            has_values: false,
        }
    }
}

impl GlsPenalties for DensePenalties {
    fn has_values(&self) -> bool {
        self.has_values
    }

    fn increment(&mut self, arc: PenaltyArc) {
        assert!(
            arc.1 >= 0,
            "dense GLS penalties require non-negative values (got {}); enable use_sparse_gls_penalties",
            arc.1
        );
        let row = &mut self.rows[arc.0 as usize];
        let column = arc.1 as usize;
        if column >= row.len() {
            row.resize(column + 1, 0);
        }
        row[column] += 1;
        self.has_values = true;
    }

    fn value(&self, arc: PenaltyArc) -> i64 {
        if arc.1 < 0 {
            return 0;
        }
        self.rows[arc.0 as usize]
            .get(arc.1 as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Sparse keyed store behind a per-variable "any-penalized" bitmap.
struct SparsePenalties {
    values: HashMap<PenaltyArc, i64>,
    penalized: FixedBitSet,
}

impl SparsePenalties {
    fn new(size: usize) -> Self {
        Self {
            values: HashMap::new(),
            penalized: FixedBitSet::with_capacity(size),
        }
    }
}

impl GlsPenalties for SparsePenalties {
    fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    fn increment(&mut self, arc: PenaltyArc) {
        *self.values.entry(arc).or_insert(0) += 1;
        self.penalized.insert(arc.0 as usize);
    }

    fn value(&self, arc: PenaltyArc) -> i64 {
        if self.penalized.contains(arc.0 as usize) {
            self.values.get(&arc).copied().unwrap_or(0)
        } else {
            0
        }
    }
}

/// The user objective function, arity matching the tracked variables.
#[derive(Clone)]
enum GlsObjectiveFn {
    Binary(Evaluator2),
    Ternary(Evaluator3),
}

/// Penalized value of an arc:
/// `penalty_factor * penalty(i, j) * cost(i, j[, k])`, negated for
/// maximization. Shared between the monitor and the element closures it
/// posts.
fn penalized_arc_value(
    penalties: &RefCell<dyn GlsPenalties>,
    objective_function: &GlsObjectiveFn,
    penalty_factor: f64,
    maximize: bool,
    i: i64,
    j: i64,
    k: i64,
) -> i64 {
    let penalty = penalties.borrow().value((i, j));
    if penalty == 0 {
        // The objective callback can be costly; skip it for clean arcs.
        return 0;
    }
    let cost = match objective_function {
        GlsObjectiveFn::Binary(f) => f.run(i, j),
        GlsObjectiveFn::Ternary(f) => f.run(i, j, k),
    };
    let penalized = (penalty_factor * penalty as f64 * cost as f64) as i64;
    if maximize {
        -penalized
    } else {
        penalized
    }
}

/// Which cached per-variable penalties an incremental evaluation starts
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheSource {
    Assignment,
    Delta,
}

/// The guided local search metaheuristic monitor.
pub struct GuidedLocalSearch {
    tracker: ObjectiveTracker,
    vars: Vec<VarIndex>,
    secondary_vars: Option<Vec<VarIndex>>,
    objective_function: GlsObjectiveFn,
    penalty_factor: f64,
    penalties: Rc<RefCell<dyn GlsPenalties>>,
    assignment: Assignment,
    assignment_penalized_value: i64,
    old_penalized_value: i64,
    indices: HashMap<VarIndex, usize>,
    current_penalized_values: Vec<i64>,
    delta_cache: Vec<i64>,
    incremental: bool,
    penalized_objective: Option<VarIndex>,
}

impl GuidedLocalSearch {
    /// GLS over a binary cost `cost(variable index, value)`.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not positive, `penalty_factor` is not
    /// positive, or the callback is not repeatable.
    pub fn binary(
        solver: &Solver,
        maximize: bool,
        objective: VarIndex,
        objective_function: Evaluator2,
        step: i64,
        vars: &[VarIndex],
        penalty_factor: f64,
    ) -> Self {
        objective_function.check_is_repeatable("GuidedLocalSearch::binary");
        Self::build(
            solver,
            maximize,
            objective,
            GlsObjectiveFn::Binary(objective_function),
            step,
            vars,
            None,
            penalty_factor,
        )
    }

    /// GLS over a ternary cost
    /// `cost(variable index, value, secondary value)`.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not positive, `penalty_factor` is not
    /// positive, the callback is not repeatable, or the arrays differ in
    /// length.
    pub fn ternary(
        solver: &Solver,
        maximize: bool,
        objective: VarIndex,
        objective_function: Evaluator3,
        step: i64,
        vars: &[VarIndex],
        secondary_vars: &[VarIndex],
        penalty_factor: f64,
    ) -> Self {
        objective_function.check_is_repeatable("GuidedLocalSearch::ternary");
        assert!(
            vars.len() == secondary_vars.len(),
            "called `GuidedLocalSearch::ternary` with {} variables and {} secondary variables",
            vars.len(),
            secondary_vars.len()
        );
        Self::build(
            solver,
            maximize,
            objective,
            GlsObjectiveFn::Ternary(objective_function),
            step,
            vars,
            Some(secondary_vars.to_vec()),
            penalty_factor,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        solver: &Solver,
        maximize: bool,
        objective: VarIndex,
        objective_function: GlsObjectiveFn,
        step: i64,
        vars: &[VarIndex],
        secondary_vars: Option<Vec<VarIndex>>,
        penalty_factor: f64,
    ) -> Self {
        assert!(
            penalty_factor > 0.0,
            "called `GuidedLocalSearch` constructor with penalty factor {}, but it must be positive",
            penalty_factor
        );
        let mut assignment = Assignment::new();
        assignment.add_all(vars);
        if let Some(secondary_vars) = &secondary_vars {
            assignment.add_all(secondary_vars);
        }
        let indices: HashMap<VarIndex, usize> =
            vars.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let penalties: Rc<RefCell<dyn GlsPenalties>> =
            if solver.options().use_sparse_gls_penalties {
                Rc::new(RefCell::new(SparsePenalties::new(vars.len())))
            } else {
                Rc::new(RefCell::new(DensePenalties::new(vars.len())))
            };
        Self {
            tracker: ObjectiveTracker::new(maximize, objective, step),
            vars: vars.to_vec(),
            secondary_vars,
            objective_function,
            penalty_factor,
            penalties,
            assignment,
            assignment_penalized_value: 0,
            old_penalized_value: 0,
            indices,
            current_penalized_values: vec![0; vars.len()],
            delta_cache: vec![0; vars.len()],
            incremental: false,
            penalized_objective: None,
        }
    }

    /// Posts the element expression carrying the penalized cost of
    /// variable `i`.
    fn make_element_penalty(&self, solver: &mut Solver, i: usize) -> VarIndex {
        let penalties = Rc::clone(&self.penalties);
        let objective_function = self.objective_function.clone();
        let penalty_factor = self.penalty_factor;
        let maximize = self.tracker.maximize();
        let index = i as i64;
        match &self.secondary_vars {
            None => solver.make_element_fn(
                Rc::new(move |j| {
                    penalized_arc_value(
                        &penalties,
                        &objective_function,
                        penalty_factor,
                        maximize,
                        index,
                        j,
                        0,
                    )
                }),
                self.vars[i],
            ),
            Some(secondary_vars) => solver.make_element_fn2(
                Rc::new(move |j, k| {
                    penalized_arc_value(
                        &penalties,
                        &objective_function,
                        penalty_factor,
                        maximize,
                        index,
                        j,
                        k,
                    )
                }),
                self.vars[i],
                secondary_vars[i],
            ),
        }
    }

    /// Penalized cost of variable `i` under the stored assignment.
    fn assignment_element_penalty(&self, i: usize) -> i64 {
        let value = self.assignment.value(self.vars[i]);
        let secondary = self
            .secondary_vars
            .as_ref()
            .map_or(0, |secondary_vars| self.assignment.value(secondary_vars[i]));
        penalized_arc_value(
            &self.penalties,
            &self.objective_function,
            self.penalty_factor,
            self.tracker.maximize(),
            i as i64,
            value,
            secondary,
        )
    }

    /// Raw (unpenalized) cost of assigning `next` to variable `i`.
    fn assignment_penalty(&self, i: usize, next: i64) -> i64 {
        match &self.objective_function {
            GlsObjectiveFn::Binary(f) => f.run(i as i64, next),
            GlsObjectiveFn::Ternary(f) => {
                let secondary = self
                    .secondary_vars
                    .as_ref()
                    .map(|secondary_vars| self.assignment.value(secondary_vars[i]))
                    .expect("ternary GLS without secondary variables");
                f.run(i as i64, next, secondary)
            }
        }
    }

    /// Secondary value of variable `index` in a delta, trying the element
    /// right after `pos` as a locality hint before a full lookup.
    fn delta_secondary_value(&self, delta: &Assignment, index: usize, pos: usize) -> i64 {
        let secondary_vars = match &self.secondary_vars {
            None => return 0,
            Some(secondary_vars) => secondary_vars,
        };
        let secondary = secondary_vars[index];
        let hint = pos + 1;
        if hint < delta.len() && delta.element(hint).var() == secondary {
            return delta.element(hint).value();
        }
        delta.value(secondary)
    }

    /// Recomputes the penalized cost of a candidate move from a cached
    /// baseline.
    fn evaluate(
        &mut self,
        delta: &Assignment,
        current_penalty: i64,
        source: CacheSource,
        cache_delta_values: bool,
    ) -> i64 {
        let mut penalty = current_penalty;
        for pos in 0..delta.len() {
            let element = *delta.element(pos);
            let Some(&index) = self.indices.get(&element.var()) else {
                continue;
            };
            let out_value = match source {
                CacheSource::Assignment => self.current_penalized_values[index],
                CacheSource::Delta => self.delta_cache[index],
            };
            penalty = penalty.saturating_sub_val(out_value);
            if element.activated() {
                let secondary = self.delta_secondary_value(delta, index, pos);
                let new_penalty = penalized_arc_value(
                    &self.penalties,
                    &self.objective_function,
                    self.penalty_factor,
                    self.tracker.maximize(),
                    index as i64,
                    element.value(),
                    secondary,
                );
                penalty = penalty.saturating_add_val(new_penalty);
                if cache_delta_values {
                    self.delta_cache[index] = new_penalty;
                }
            }
        }
        penalty
    }
}

impl SearchMonitor for GuidedLocalSearch {
    fn name(&self) -> &str {
        "GuidedLocalSearch"
    }

    fn on_enter_search(&mut self, solver: &mut Solver) {
        self.tracker.enter_search(solver);
    }

    fn on_apply_decision(
        &mut self,
        solver: &mut Solver,
        decision: &Rc<dyn Decision>,
    ) -> Propagation {
        if decision.is_balancing() {
            return Ok(());
        }
        let objective = self.tracker.objective();
        let step = self.tracker.step();
        self.assignment_penalized_value = 0;
        if self.penalties.borrow().has_values() {
            let mut elements = Vec::with_capacity(self.vars.len());
            for i in 0..self.vars.len() {
                let element = self.make_element_penalty(solver, i);
                elements.push(element);
                let penalty = self.assignment_element_penalty(i);
                self.current_penalized_values[i] = penalty;
                self.delta_cache[i] = penalty;
                self.assignment_penalized_value =
                    self.assignment_penalized_value.saturating_add_val(penalty);
            }
            self.old_penalized_value = self.assignment_penalized_value;
            self.incremental = false;
            let penalized_objective = solver.make_sum(&elements);
            self.penalized_objective = Some(penalized_objective);
            if self.tracker.maximize() {
                let reachable = self.tracker.current().saturating_add_val(step);
                let min_pen_exp = solver.make_difference(reachable, penalized_objective);
                let min_exp = solver.make_min_cst(min_pen_exp, self.tracker.aspiration_bound());
                solver.add_greater_or_equal(objective, min_exp);
            } else {
                let reachable = self.tracker.current().saturating_sub_val(step);
                let max_pen_exp = solver.make_difference(reachable, penalized_objective);
                let max_exp = solver.make_max_cst(max_pen_exp, self.tracker.aspiration_bound());
                solver.add_greater_or_equal(max_exp, objective);
            }
            Ok(())
        } else {
            self.penalized_objective = None;
            if self.tracker.maximize() {
                solver.set_min(objective, self.tracker.current().saturating_add_val(step))
            } else {
                solver.set_max(objective, self.tracker.current().saturating_sub_val(step))
            }
        }
    }

    fn on_refute_decision(
        &mut self,
        solver: &mut Solver,
        _decision: &Rc<dyn Decision>,
    ) -> Propagation {
        self.tracker.check_refute_bound(solver)
    }

    fn at_solution(&mut self, solver: &mut Solver) -> bool {
        let value = solver.var_value(self.tracker.objective());
        self.tracker.at_solution(value);
        if let Some(penalized_objective) = self.penalized_objective {
            // The neighborhood bound of the next round starts from the
            // penalty-augmented cost of this solution.
            let augmented = value.saturating_add_val(solver.var_value(penalized_objective));
            self.tracker.set_current(augmented);
        }
        self.assignment.store(solver);
        true
    }

    fn local_optimum(&mut self, _solver: &mut Solver) -> bool {
        if self.vars.is_empty() {
            self.tracker.reset_current_to_worst();
            return true;
        }
        let mut utilities: Vec<(PenaltyArc, f64)> = Vec::with_capacity(self.vars.len());
        for i in 0..self.vars.len() {
            let var_value = self.assignment.value(self.vars[i]);
            let cost = if var_value != i as i64 {
                self.assignment_penalty(i, var_value)
            } else {
                0
            };
            let arc = (i as i64, var_value);
            let penalty = self.penalties.borrow().value(arc);
            utilities.push((arc, cost as f64 / (penalty as f64 + 1.0)));
        }
        utilities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        // Penalize every arc tied at the maximum utility.
        let top_utility = utilities[0].1;
        let mut penalties = self.penalties.borrow_mut();
        penalties.increment(utilities[0].0);
        for &(arc, utility) in utilities.iter().skip(1) {
            if utility != top_utility {
                break;
            }
            penalties.increment(arc);
        }
        drop(penalties);

        self.tracker.reset_current_to_worst();
        true
    }

    fn accept_delta(
        &mut self,
        _solver: &mut Solver,
        delta: &mut Assignment,
        deltadelta: &mut Assignment,
    ) -> bool {
        if !self.penalties.borrow().has_values() {
            return true;
        }
        let penalty;
        if !deltadelta.empty() {
            if !self.incremental {
                penalty = self.evaluate(
                    delta,
                    self.assignment_penalized_value,
                    CacheSource::Assignment,
                    true,
                );
            } else {
                penalty = self.evaluate(
                    deltadelta,
                    self.old_penalized_value,
                    CacheSource::Delta,
                    true,
                );
            }
            self.incremental = true;
        } else {
            if self.incremental {
                self.delta_cache.copy_from_slice(&self.current_penalized_values);
                self.old_penalized_value = self.assignment_penalized_value;
            }
            self.incremental = false;
            penalty = self.evaluate(
                delta,
                self.assignment_penalized_value,
                CacheSource::Assignment,
                false,
            );
        }
        self.old_penalized_value = penalty;

        let objective = self.tracker.objective();
        if !delta.has_objective() {
            delta.add_objective(objective);
        }
        if delta.objective() == Some(objective) {
            let step = self.tracker.step();
            if self.tracker.maximize() {
                let bound = self
                    .tracker
                    .current()
                    .saturating_add_val(step)
                    .saturating_sub_val(penalty)
                    .min(self.tracker.aspiration_bound())
                    .max(delta.objective_min());
                delta.set_objective_min(bound);
            } else {
                let bound = self
                    .tracker
                    .current()
                    .saturating_sub_val(step)
                    .saturating_sub_val(penalty)
                    .max(self.tracker.aspiration_bound())
                    .min(delta.objective_max());
                delta.set_objective_max(bound);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_engine::SolverOptions;

    fn setup(sparse: bool) -> (Solver, Vec<VarIndex>, VarIndex) {
        let mut solver = Solver::with_options(SolverOptions {
            use_sparse_gls_penalties: sparse,
            ..SolverOptions::default()
        });
        let vars: Vec<VarIndex> = (0..3).map(|_| solver.new_var(0, 9)).collect();
        let objective = solver.new_var(0, 100);
        (solver, vars, objective)
    }

    fn gls_over(solver: &Solver, vars: &[VarIndex], objective: VarIndex) -> GuidedLocalSearch {
        GuidedLocalSearch::binary(
            solver,
            false,
            objective,
            Evaluator2::repeatable(|_, value| value),
            1,
            vars,
            1.0,
        )
    }

    fn reach_solution(
        solver: &mut Solver,
        gls: &mut GuidedLocalSearch,
        vars: &[VarIndex],
        values: &[i64],
        objective: VarIndex,
        objective_value: i64,
    ) {
        let mark = solver.trail_mark();
        for (&var, &value) in vars.iter().zip(values) {
            solver.set_value(var, value).unwrap();
        }
        solver.set_value(objective, objective_value).unwrap();
        gls.at_solution(solver);
        solver.rewind_to(mark);
    }

    #[test]
    fn test_tie_inclusive_penalty_increment() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        // Arcs (0,5) and (1,5) tie at utility 5; (2,1) trails.
        reach_solution(&mut solver, &mut gls, &vars, &[5, 5, 1], objective, 11);
        assert!(gls.local_optimum(&mut solver));

        let penalties = gls.penalties.borrow();
        assert_eq!(penalties.value((0, 5)), 1);
        assert_eq!(penalties.value((1, 5)), 1);
        assert_eq!(penalties.value((2, 1)), 0);
    }

    #[test]
    fn test_penalty_increment_repeats_on_persisting_optimum() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        reach_solution(&mut solver, &mut gls, &vars, &[5, 5, 1], objective, 11);
        gls.local_optimum(&mut solver);
        gls.local_optimum(&mut solver);

        let penalties = gls.penalties.borrow();
        assert_eq!(penalties.value((0, 5)), 2);
        assert_eq!(penalties.value((1, 5)), 2);
    }

    #[test]
    fn test_value_equal_to_index_costs_nothing() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        // Variable 2 takes value 2: a self-arc, cost zero by convention.
        reach_solution(&mut solver, &mut gls, &vars, &[0, 1, 2], objective, 3);
        gls.local_optimum(&mut solver);

        let penalties = gls.penalties.borrow();
        // All three arcs have utility 0; ties span the whole list and
        // every arc is penalized.
        assert_eq!(penalties.value((0, 0)), 1);
        assert_eq!(penalties.value((1, 1)), 1);
        assert_eq!(penalties.value((2, 2)), 1);
    }

    #[test]
    fn test_apply_without_penalties_posts_descent_bound() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        reach_solution(&mut solver, &mut gls, &vars, &[5, 3, 1], objective, 9);

        struct Plain;
        impl Decision for Plain {
            fn apply(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn refute(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn describe(&self) -> String {
                "plain".into()
            }
        }
        let plain: Rc<dyn Decision> = Rc::new(Plain);
        gls.on_apply_decision(&mut solver, &plain).unwrap();
        assert!(gls.penalized_objective.is_none());
        assert_eq!(solver.var_max(objective), 8, "strict descent from 9");
    }

    #[test]
    fn test_apply_with_penalties_posts_element_bound() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        reach_solution(&mut solver, &mut gls, &vars, &[5, 3, 1], objective, 9);
        gls.local_optimum(&mut solver);
        reach_solution(&mut solver, &mut gls, &vars, &[5, 3, 1], objective, 9);

        struct Plain;
        impl Decision for Plain {
            fn apply(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn refute(&self, _: &mut Solver) -> Propagation {
                Ok(())
            }
            fn describe(&self) -> String {
                "plain".into()
            }
        }
        let plain: Rc<dyn Decision> = Rc::new(Plain);
        let constraints_before = solver.constraints();
        gls.on_apply_decision(&mut solver, &plain).unwrap();
        assert!(gls.penalized_objective.is_some());
        assert!(
            solver.constraints() > constraints_before,
            "element expressions and the bound must be posted"
        );
        solver.propagate().unwrap();
    }

    #[test]
    fn test_accept_delta_caps_objective() {
        let (mut solver, vars, objective) = setup(false);
        let mut gls = gls_over(&solver, &vars, objective);
        gls.on_enter_search(&mut solver);

        // Distinct utilities: only arc (0,5) gets penalized.
        reach_solution(&mut solver, &mut gls, &vars, &[5, 3, 1], objective, 9);
        gls.local_optimum(&mut solver);
        reach_solution(&mut solver, &mut gls, &vars, &[5, 3, 1], objective, 9);

        let mut delta = Assignment::new();
        delta.add(vars[0]);
        delta.set_value(vars[0], 2);
        let mut deltadelta = Assignment::new();

        assert!(gls.accept_delta(&mut solver, &mut delta, &mut deltadelta));
        // The move leaves the penalized arc, so its penalty term is zero:
        // bound = min(max(current - step - 0, best - step), old max).
        assert!(delta.has_objective());
        assert_eq!(delta.objective_max(), 8);
    }

    #[test]
    fn test_dense_and_sparse_store_agree() {
        let mut dense = DensePenalties::new(4);
        let mut sparse = SparsePenalties::new(4);
        assert!(!dense.has_values());
        assert!(!sparse.has_values());

        for arc in [(0, 3), (0, 3), (2, 7), (3, 0)] {
            dense.increment(arc);
            sparse.increment(arc);
        }
        for arc in [(0, 3), (2, 7), (3, 0), (1, 5), (0, 4)] {
            assert_eq!(
                dense.value(arc),
                sparse.value(arc),
                "representations diverge on arc {:?}",
                arc
            );
        }
        assert_eq!(dense.value((0, 3)), 2);
        assert!(dense.has_values());
        assert!(sparse.has_values());
    }

    #[test]
    fn test_sparse_store_handles_negative_values() {
        let mut sparse = SparsePenalties::new(2);
        sparse.increment((1, -4));
        assert_eq!(sparse.value((1, -4)), 1);
        assert_eq!(sparse.value((1, 4)), 0);
    }

    #[test]
    #[should_panic(
        expected = "called `GuidedLocalSearch::ternary` with 3 variables and 2 secondary variables"
    )]
    fn test_ternary_requires_matching_arrays() {
        let (solver, vars, objective) = setup(false);
        let _ = GuidedLocalSearch::ternary(
            &solver,
            false,
            objective,
            Evaluator3::repeatable(|_, j, k| j + k),
            1,
            &vars,
            &vars[..2],
            1.0,
        );
    }
}
