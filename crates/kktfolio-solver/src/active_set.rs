//! Primal active-set method as an explicit state machine
//!
//! ```text
//! Unconstrained -> Solving -> Checking -> Converged
//!                     ^         |   ^
//!                     |         v   |
//!                     |      Restoring
//!                     +-- Adjusting <-+
//! ```
//!
//! `Solving` folds the active inequality rows into the equality block and
//! solves for the minimizer of the objective on that face. `Checking` moves
//! from the current feasible point towards it: the step stops at the first
//! inactive row it would cross, and that row is added. A full step with no
//! blocking row ends in a dual check that releases the active row with the
//! most negative multiplier, or converges. Ties go to the lowest row index,
//! so the path through the states is fully deterministic.
//!
//! Rows only enter the active set when the step direction crosses them, and
//! the step lies in the null space of the rows already active. An added row
//! is therefore never a combination of the others, and the working set stays
//! full rank.
//!
//! Until a feasible point is known, `Checking` accepts the solve only if it
//! satisfies every row. Otherwise `Restoring` minimizes the elastic
//! violation (see [`QpProblem::feasibility_problem`]) with a nested solver
//! and resumes from the point it finds.
//!
//! The loop ends in `MaxIterationsExceeded` once `max_iterations` solves have
//! been spent, or in `Inconsistent` when the rows have no common solution.
//! Both return the best iterate seen so far: the smallest violation, and
//! among feasible iterates the lowest objective.

use crate::config::{SolverConfig, SolverMethod};
use crate::error::SolverError;
use crate::factorization::inf_norm;
use crate::kkt::solve_kkt;
use crate::problem::QpProblem;
use derive_more::Display;
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single change to the active set
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Activate the inequality row with this index
    #[display("add row {_0}")]
    Add(usize),
    /// Release the inequality row with this index
    #[display("remove row {_0}")]
    Remove(usize),
}

/// State of the active-set controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSetState {
    /// Nothing solved yet, active set empty
    Unconstrained,
    /// Next step runs a KKT solve with the current active set
    Solving,
    /// Next step steps towards the last solve and checks its multipliers
    Checking,
    /// Next step searches for a feasible point to start from
    Restoring,
    /// Next step applies this change to the active set
    Adjusting(Adjustment),
    /// All primal and dual conditions hold within tolerance
    Converged,
    /// Iteration budget spent before convergence
    MaxIterationsExceeded,
    /// The rows have no common solution
    Inconsistent,
}

impl ActiveSetState {
    /// Whether the controller has stopped
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Converged | Self::MaxIterationsExceeded | Self::Inconsistent
        )
    }
}

/// How the active-set loop ended
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationStatus {
    /// Optimal within tolerance
    #[display("converged")]
    Converged,
    /// Best iterate after the iteration budget ran out
    #[display("maxIterationsExceeded")]
    MaxIterationsExceeded,
    /// Best iterate once the rows proved to have no common solution
    #[display("inconsistent")]
    Inconsistent,
}

/// A point visited by the loop
#[derive(Debug, Clone, PartialEq)]
pub struct Iterate {
    /// Primal variables
    pub w: Array1<f64>,
    /// Multipliers of the problem's equality rows, from the last KKT solve
    pub lambda: Array1<f64>,
    /// Multipliers of the inequality rows (zero for inactive rows)
    pub multipliers: Array1<f64>,
    /// Active-set membership when this point was reached
    pub active: Vec<bool>,
    /// Constraint violation norm of `w`
    pub violation: f64,
    /// Objective value at `w`
    pub objective: f64,
    /// Factorization of the last KKT solve
    pub method_used: SolverMethod,
}

impl Iterate {
    fn at_point(
        problem: &QpProblem,
        w: Array1<f64>,
        active: Vec<bool>,
        method: SolverMethod,
    ) -> Self {
        Self {
            violation: problem.violation_norm(&w),
            objective: problem.objective(&w),
            lambda: Array1::zeros(problem.n_eq()),
            multipliers: Array1::zeros(problem.n_ineq()),
            active,
            w,
            method_used: method,
        }
    }

    /// Whether `self` should replace `other` as the best iterate
    fn improves_on(&self, other: &Self, tolerance: f64) -> bool {
        if self.violation <= tolerance && other.violation <= tolerance {
            self.objective < other.objective
        } else {
            self.violation < other.violation
        }
    }
}

/// Mutable state carried between steps
#[derive(Debug, Clone)]
pub struct ActiveSetContext {
    active: Vec<bool>,
    iterations: usize,
    candidate: Option<Iterate>,
    current: Option<Iterate>,
    best: Option<Iterate>,
}

impl ActiveSetContext {
    fn new(n_ineq: usize) -> Self {
        Self {
            active: vec![false; n_ineq],
            iterations: 0,
            candidate: None,
            current: None,
            best: None,
        }
    }

    /// Active-set membership, one flag per inequality row
    pub fn active(&self) -> &[bool] {
        &self.active
    }

    /// Indices of the active inequality rows, ascending
    pub fn active_indices(&self) -> Vec<usize> {
        active_indices(&self.active)
    }

    /// Number of KKT solves performed, nested feasibility solves included
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Minimizer on the current face from the most recent KKT solve
    pub const fn candidate(&self) -> Option<&Iterate> {
        self.candidate.as_ref()
    }

    /// The latest feasible point, `None` until one is known
    pub const fn current(&self) -> Option<&Iterate> {
        self.current.as_ref()
    }

    /// The best point seen so far
    pub const fn best(&self) -> Option<&Iterate> {
        self.best.as_ref()
    }

    fn record(&mut self, iterate: &Iterate, tolerance: f64) {
        if self
            .best
            .as_ref()
            .is_none_or(|best| iterate.improves_on(best, tolerance))
        {
            self.best = Some(iterate.clone());
        }
    }
}

fn active_indices(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(i, &on)| on.then_some(i))
        .collect()
}

/// Final answer of the active-set loop
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Primal variables
    pub w: Array1<f64>,
    /// Multipliers of the equality rows
    pub lambda: Array1<f64>,
    /// Multipliers of the inequality rows (zero for inactive rows)
    pub inequality_multipliers: Array1<f64>,
    /// Active-set membership, one flag per inequality row
    pub active: Vec<bool>,
    /// Number of KKT solves performed
    pub iterations: usize,
    /// Whether all primal and dual conditions hold
    pub converged: bool,
    /// How the loop ended
    pub status: TerminationStatus,
    /// Factorization that produced `w`
    pub method_used: SolverMethod,
}

impl Solution {
    /// Indices of the active inequality rows, ascending
    pub fn active_indices(&self) -> Vec<usize> {
        active_indices(&self.active)
    }
}

/// Active-set controller over an immutable problem
#[derive(Debug)]
pub struct ActiveSetSolver<'a> {
    problem: &'a QpProblem,
    config: SolverConfig,
    state: ActiveSetState,
    context: ActiveSetContext,
}

impl<'a> ActiveSetSolver<'a> {
    /// Create a controller in the `Unconstrained` state
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(problem: &'a QpProblem, config: &SolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Self {
            problem,
            config: *config,
            state: ActiveSetState::Unconstrained,
            context: ActiveSetContext::new(problem.n_ineq()),
        })
    }

    /// Create a controller that starts from a known feasible point
    ///
    /// `w0` must satisfy every row within tolerance; no feasibility search is
    /// run.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate or
    /// `w0` is not feasible, and `DimensionMismatch` if it has the wrong
    /// length.
    pub fn from_point(
        problem: &'a QpProblem,
        config: &SolverConfig,
        w0: Array1<f64>,
    ) -> Result<Self, SolverError> {
        let mut solver = Self::new(problem, config)?;
        if w0.len() != problem.n_vars() {
            return Err(SolverError::DimensionMismatch {
                context: "starting point",
                expected: problem.n_vars(),
                actual: w0.len(),
            });
        }

        let equality_gap = inf_norm(&problem.equality_residual(&w0));
        let inequality_gap = problem.max_inequality_violation(&w0);
        if equality_gap > config.tolerance * inf_norm(problem.b()).max(1.0)
            || inequality_gap > config.tolerance
        {
            return Err(SolverError::InvalidConfig(format!(
                "starting point is infeasible: equality residual {equality_gap:e}, \
                 inequality violation {inequality_gap:e}"
            )));
        }

        let start = Iterate::at_point(problem, w0, vec![false; problem.n_ineq()], config.method);

        solver.context.record(&start, config.tolerance);
        solver.context.current = Some(start);
        Ok(solver)
    }

    /// Current state
    pub const fn state(&self) -> ActiveSetState {
        self.state
    }

    /// Iteration context
    pub const fn context(&self) -> &ActiveSetContext {
        &self.context
    }

    /// Advance by one transition and return the new state
    ///
    /// Terminal states are absorbing.
    ///
    /// # Errors
    /// A `SingularSystem` from a solve with an empty active set is returned
    /// as an error; with active rows it moves to `Inconsistent` instead.
    pub fn step(&mut self) -> Result<ActiveSetState, SolverError> {
        self.state = match self.state {
            ActiveSetState::Unconstrained => ActiveSetState::Solving,
            ActiveSetState::Solving => self.solve()?,
            ActiveSetState::Checking => self.check(),
            ActiveSetState::Restoring => self.restore()?,
            ActiveSetState::Adjusting(adjustment) => {
                self.adjust(adjustment);
                ActiveSetState::Solving
            }
            terminal => terminal,
        };
        Ok(self.state)
    }

    /// Step until a terminal state and assemble the solution
    ///
    /// # Errors
    /// Propagates errors from [`step`](Self::step).
    pub fn run(mut self) -> Result<Solution, SolverError> {
        while !self.state.is_terminal() {
            self.step()?;
        }

        match self.state {
            ActiveSetState::Converged => debug!(
                iterations = self.context.iterations,
                active = ?self.context.active_indices(),
                "active-set converged"
            ),
            state => warn!(
                ?state,
                iterations = self.context.iterations,
                "active-set stopped before convergence; returning best iterate"
            ),
        }

        self.into_solution().ok_or_else(|| {
            SolverError::InvalidConfig("active-set loop ended without a KKT solve".to_string())
        })
    }

    /// Solution for a terminal state, `None` before termination
    pub fn into_solution(self) -> Option<Solution> {
        let (iterate, status) = match self.state {
            ActiveSetState::Converged => (self.context.current?, TerminationStatus::Converged),
            ActiveSetState::MaxIterationsExceeded => (
                self.context.best?,
                TerminationStatus::MaxIterationsExceeded,
            ),
            ActiveSetState::Inconsistent => (self.context.best?, TerminationStatus::Inconsistent),
            _ => return None,
        };

        Some(Solution {
            w: iterate.w,
            lambda: iterate.lambda,
            inequality_multipliers: iterate.multipliers,
            active: iterate.active,
            iterations: self.context.iterations,
            converged: status == TerminationStatus::Converged,
            status,
            method_used: iterate.method_used,
        })
    }

    /// Equality rows followed by the active inequality rows
    fn working_set(&self, active: &[usize]) -> (Array2<f64>, Array1<f64>) {
        let n_eq = self.problem.n_eq();
        let rows = n_eq + active.len();

        let mut a = Array2::zeros((rows, self.problem.n_vars()));
        let mut b = Array1::zeros(rows);
        a.slice_mut(s![..n_eq, ..]).assign(self.problem.a());
        b.slice_mut(s![..n_eq]).assign(self.problem.b());
        for (k, &i) in active.iter().enumerate() {
            a.row_mut(n_eq + k).assign(&self.problem.g().row(i));
            b[n_eq + k] = self.problem.h()[i];
        }

        (a, b)
    }

    /// Minimize over the face of the working set.
    ///
    /// The KKT system is posed for the step p from the current point z:
    /// Q p + A_Wᵀλ = -(Q z + c), A_W p = b_W - A_W z. Its multipliers are those
    /// of the face minimizer z + p, and when Q is singular the SVD fallback
    /// returns the shortest such step.
    fn solve(&mut self) -> Result<ActiveSetState, SolverError> {
        if self.context.iterations >= self.config.max_iterations {
            return Ok(ActiveSetState::MaxIterationsExceeded);
        }

        let active = self.context.active_indices();
        let (a, b) = self.working_set(&active);
        let base = self
            .context
            .current
            .as_ref()
            .map_or_else(|| Array1::zeros(self.problem.n_vars()), |it| it.w.clone());
        let gradient = self.problem.q().dot(&base) + self.problem.c();
        let rhs = &b - &a.dot(&base);
        self.context.iterations += 1;

        let kkt = match solve_kkt(self.problem.q(), &gradient, &a, &rhs, &self.config) {
            Ok(kkt) => kkt,
            Err(SolverError::SingularSystem {
                residual,
                threshold,
            }) if !active.is_empty() => {
                warn!(
                    residual,
                    threshold,
                    active = ?active,
                    "active rows are inconsistent with the equality constraints"
                );
                return Ok(ActiveSetState::Inconsistent);
            }
            Err(e) => return Err(e),
        };

        let n_eq = self.problem.n_eq();
        let mut multipliers = Array1::zeros(self.problem.n_ineq());
        for (k, &i) in active.iter().enumerate() {
            multipliers[i] = kkt.lambda[n_eq + k];
        }

        let w = base + &kkt.w;
        let candidate = Iterate {
            violation: self.problem.violation_norm(&w),
            objective: self.problem.objective(&w),
            lambda: kkt.lambda.slice(s![..n_eq]).to_owned(),
            w,
            multipliers,
            active: self.context.active.clone(),
            method_used: kkt.method_used,
        };

        self.context.record(&candidate, self.config.tolerance);
        self.context.candidate = Some(candidate);

        Ok(ActiveSetState::Checking)
    }

    fn check(&mut self) -> ActiveSetState {
        let Some(candidate) = self.context.candidate.clone() else {
            return ActiveSetState::Solving;
        };
        let tolerance = self.config.tolerance;

        let Some(current) = self.context.current.as_ref().map(|it| it.w.clone()) else {
            if self.problem.max_inequality_violation(&candidate.w) <= tolerance {
                return self.accept(candidate);
            }
            debug!(
                violation = candidate.violation,
                "first solve is infeasible; searching for a feasible point"
            );
            return ActiveSetState::Restoring;
        };

        let step = &candidate.w - &current;
        let step_norm = inf_norm(&step);
        if step_norm <= tolerance * inf_norm(&current).max(1.0) {
            return self.accept(candidate);
        }

        // Shortest step to an inactive row the direction crosses; strict
        // comparison keeps the lowest index on ties
        let g_step = self.problem.g().dot(&step);
        let slack = self.problem.inequality_slack(&current);
        let mut blocking: Option<(usize, f64)> = None;
        for i in 0..self.problem.n_ineq() {
            if self.context.active[i] || g_step[i] <= tolerance * step_norm {
                continue;
            }
            let room = if -slack[i] <= tolerance { 0.0 } else { -slack[i] };
            let alpha = room / g_step[i];
            if blocking.is_none_or(|(_, shortest)| alpha < shortest) {
                blocking = Some((i, alpha));
            }
        }

        match blocking {
            Some((i, alpha)) if alpha < 1.0 => {
                let w = current + &step * alpha;
                let point = Iterate {
                    violation: self.problem.violation_norm(&w),
                    objective: self.problem.objective(&w),
                    w,
                    ..candidate
                };
                debug!(row = i, alpha, "step blocked");
                self.context.record(&point, tolerance);
                self.context.current = Some(point);
                ActiveSetState::Adjusting(Adjustment::Add(i))
            }
            _ => self.accept(candidate),
        }
    }

    /// Move to the face minimizer and release the most negative multiplier
    fn accept(&mut self, candidate: Iterate) -> ActiveSetState {
        let tolerance = self.config.tolerance;
        let mut remove: Option<(usize, f64)> = None;
        for (i, &mu) in candidate.multipliers.iter().enumerate() {
            if !self.context.active[i] || mu >= -tolerance {
                continue;
            }
            if remove.is_none_or(|(_, worst)| mu < worst) {
                remove = Some((i, mu));
            }
        }
        self.context.current = Some(candidate);

        match remove {
            Some((i, _)) => ActiveSetState::Adjusting(Adjustment::Remove(i)),
            None => ActiveSetState::Converged,
        }
    }

    /// Minimize the elastic violation from the last solve's point
    fn restore(&mut self) -> Result<ActiveSetState, SolverError> {
        let Some(candidate) = &self.context.candidate else {
            return Ok(ActiveSetState::Solving);
        };
        let remaining = self
            .config
            .max_iterations
            .saturating_sub(self.context.iterations);
        if remaining == 0 {
            return Ok(ActiveSetState::MaxIterationsExceeded);
        }

        let n = self.problem.n_vars();
        let elastic = self.problem.feasibility_problem()?;
        let start: Array1<f64> = candidate
            .w
            .iter()
            .copied()
            .chain(std::iter::once(
                self.problem.max_inequality_violation(&candidate.w),
            ))
            .collect();
        let config = SolverConfig {
            max_iterations: remaining,
            ..self.config
        };
        let phase_one = ActiveSetSolver::from_point(&elastic, &config, start)?.run()?;
        self.context.iterations += phase_one.iterations;

        let point = Iterate::at_point(
            self.problem,
            phase_one.w.slice(s![..n]).to_owned(),
            self.context.active.clone(),
            phase_one.method_used,
        );
        self.context.record(&point, self.config.tolerance);

        match phase_one.status {
            TerminationStatus::MaxIterationsExceeded => {
                return Ok(ActiveSetState::MaxIterationsExceeded);
            }
            TerminationStatus::Inconsistent => return Ok(ActiveSetState::Inconsistent),
            TerminationStatus::Converged => {}
        }

        let violation = self.problem.max_inequality_violation(&point.w);
        if violation > self.config.tolerance {
            warn!(violation, "inequality rows have no common feasible point");
            return Ok(ActiveSetState::Inconsistent);
        }

        debug!(
            iterations = phase_one.iterations,
            objective = point.objective,
            "feasible point found"
        );
        self.context.current = Some(point);
        Ok(ActiveSetState::Checking)
    }

    fn adjust(&mut self, adjustment: Adjustment) {
        match adjustment {
            Adjustment::Add(i) => self.context.active[i] = true,
            Adjustment::Remove(i) => self.context.active[i] = false,
        }
        debug!(
            %adjustment,
            iteration = self.context.iterations,
            "active-set adjustment"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// min 1/2 |w|² subject to w1 >= 1 and (w1 + w2)/5 >= 0.6
    ///
    /// From (1, 2), where both rows are tight, the first row is added, then
    /// the second, after which the first row's multiplier turns negative and
    /// it is released again.
    fn add_then_remove() -> QpProblem {
        QpProblem::new(Array2::eye(2), Array1::zeros(2))
            .unwrap()
            .with_inequality(array![[-1.0, 0.0], [-0.2, -0.2]], array![-1.0, -0.6])
            .unwrap()
    }

    #[test]
    fn test_state_sequence() {
        let problem = add_then_remove();
        let config = SolverConfig::default();
        let mut solver = ActiveSetSolver::from_point(&problem, &config, array![1.0, 2.0]).unwrap();
        assert_eq!(solver.state(), ActiveSetState::Unconstrained);

        let expected = [
            ActiveSetState::Solving,
            ActiveSetState::Checking,
            ActiveSetState::Adjusting(Adjustment::Add(0)),
            ActiveSetState::Solving,
            ActiveSetState::Checking,
            ActiveSetState::Adjusting(Adjustment::Add(1)),
            ActiveSetState::Solving,
            ActiveSetState::Checking,
            ActiveSetState::Adjusting(Adjustment::Remove(0)),
            ActiveSetState::Solving,
            ActiveSetState::Checking,
            ActiveSetState::Converged,
        ];
        for state in expected {
            assert_eq!(solver.step().unwrap(), state);
        }

        // Terminal states are absorbing
        assert_eq!(solver.step().unwrap(), ActiveSetState::Converged);
        assert_eq!(solver.context().iterations(), 4);
    }

    #[test]
    fn test_add_then_remove_solution() {
        let problem = add_then_remove();
        let config = SolverConfig::default();
        let solution = ActiveSetSolver::from_point(&problem, &config, array![1.0, 2.0])
            .unwrap()
            .run()
            .unwrap();

        assert!(solution.converged);
        assert_eq!(solution.status, TerminationStatus::Converged);
        assert_eq!(solution.active_indices(), vec![1]);
        assert_abs_diff_eq!(solution.w[0], 1.5, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.w[1], 1.5, epsilon = 1e-10);
        // w - 0.2 μ = 0
        assert_abs_diff_eq!(solution.inequality_multipliers[1], 7.5, epsilon = 1e-8);
        assert_eq!(solution.inequality_multipliers[0], 0.0);
    }

    #[test]
    fn test_infeasible_first_solve_restores() {
        let problem = add_then_remove();
        let config = SolverConfig::default();
        let mut solver = ActiveSetSolver::new(&problem, &config).unwrap();

        // The origin violates both rows
        assert_eq!(solver.step().unwrap(), ActiveSetState::Solving);
        assert_eq!(solver.step().unwrap(), ActiveSetState::Checking);
        assert_eq!(solver.step().unwrap(), ActiveSetState::Restoring);
        assert_eq!(solver.step().unwrap(), ActiveSetState::Checking);
        assert_eq!(solver.context().iterations(), 4);

        let start = solver.context().current().unwrap();
        assert!(problem.max_inequality_violation(&start.w) <= config.tolerance);
        assert!(start.active.iter().all(|&on| !on));

        let solution = solver.run().unwrap();
        assert!(solution.converged);
        assert_eq!(solution.active_indices(), vec![1]);
        assert_abs_diff_eq!(solution.w[0], 1.5, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.w[1], 1.5, epsilon = 1e-10);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        // From the origin the step towards (-1, -1) crosses both bounds at once
        let problem = QpProblem::new(Array2::eye(2), array![1.0, 1.0])
            .unwrap()
            .with_inequality(-Array2::<f64>::eye(2), Array1::zeros(2))
            .unwrap();
        let config = SolverConfig::default();
        let mut solver = ActiveSetSolver::from_point(&problem, &config, Array1::zeros(2)).unwrap();

        solver.step().unwrap();
        solver.step().unwrap();
        assert_eq!(
            solver.step().unwrap(),
            ActiveSetState::Adjusting(Adjustment::Add(0))
        );

        let solution = solver.run().unwrap();
        assert!(solution.converged);
        assert_eq!(solution.iterations, 3);
        assert_eq!(solution.active_indices(), vec![0, 1]);
        assert_abs_diff_eq!(solution.inequality_multipliers[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.inequality_multipliers[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_dependent_row_is_never_added() {
        // Budget and return rows leave a segment w = (t - 0.5, 1.5 - 2t, t).
        // The scaled bound on w3 is the most violated row of the first solve,
        // but its vertex t = 0 is infeasible and fixing w1 there as well
        // would make the working set rank deficient. The optimum is t = 0.5.
        let problem = QpProblem::new(Array2::eye(3), array![0.0, 0.0, 5.0])
            .unwrap()
            .with_equality(array![[1.0, 1.0, 1.0], [0.0, 0.1, 0.2]], array![1.0, 0.15])
            .unwrap()
            .with_inequality(
                Array2::from_diag(&array![-1.0, -1.0, -10.0]),
                Array1::zeros(3),
            )
            .unwrap();
        let solution = ActiveSetSolver::new(&problem, &SolverConfig::default())
            .unwrap()
            .run()
            .unwrap();

        assert!(solution.converged);
        assert_eq!(solution.active_indices(), vec![0]);
        assert_abs_diff_eq!(solution.w[0], 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(solution.w[1], 0.5, epsilon = 1e-8);
        assert_abs_diff_eq!(solution.w[2], 0.5, epsilon = 1e-8);
        assert_abs_diff_eq!(solution.inequality_multipliers[0], 4.5, epsilon = 1e-6);
    }

    #[test]
    fn test_no_inequalities_single_solve() {
        let problem = QpProblem::new(array![[0.04, 0.01], [0.01, 0.09]], Array1::zeros(2))
            .unwrap()
            .with_equality(Array2::ones((1, 2)), array![1.0])
            .unwrap();
        let solution = ActiveSetSolver::new(&problem, &SolverConfig::default())
            .unwrap()
            .run()
            .unwrap();

        assert!(solution.converged);
        assert_eq!(solution.iterations, 1);
        assert!(solution.active.is_empty());
        assert_eq!(solution.lambda.len(), 1);
        assert_abs_diff_eq!(solution.w[0], 8.0 / 11.0, epsilon = 1e-10);
    }

    #[test]
    fn test_max_iterations_returns_best_iterate() {
        let problem = add_then_remove();
        let config = SolverConfig {
            max_iterations: 2,
            ..Default::default()
        };
        let solution = ActiveSetSolver::from_point(&problem, &config, array![1.0, 2.0])
            .unwrap()
            .run()
            .unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.status, TerminationStatus::MaxIterationsExceeded);
        assert_eq!(solution.iterations, 2);
        // Both solves so far land outside the feasible set, the start does not
        assert_abs_diff_eq!(solution.w[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.w[1], 2.0, epsilon = 1e-10);
        assert!(problem.violation_norm(&solution.w) <= config.tolerance);
    }

    #[test]
    fn test_budget_spent_before_restoring() {
        let problem = add_then_remove();
        let config = SolverConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let solution = ActiveSetSolver::new(&problem, &config)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(solution.status, TerminationStatus::MaxIterationsExceeded);
        assert_eq!(solution.iterations, 1);
        assert_abs_diff_eq!(solution.w[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_contradictory_rows_are_inconsistent() {
        // w = 1 and w <= 0.5 cannot both hold
        let problem = QpProblem::new(array![[1.0]], array![0.0])
            .unwrap()
            .with_equality(array![[1.0]], array![1.0])
            .unwrap()
            .with_inequality(array![[1.0]], array![0.5])
            .unwrap();
        let solution = ActiveSetSolver::new(&problem, &SolverConfig::default())
            .unwrap()
            .run()
            .unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.status, TerminationStatus::Inconsistent);
        assert_eq!(solution.iterations, 3);
        assert_abs_diff_eq!(solution.w[0], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_singular_first_solve_is_an_error() {
        let problem = QpProblem::new(array![[0.0]], array![0.0])
            .unwrap()
            .with_equality(array![[0.0]], array![1.0])
            .unwrap();
        let result = ActiveSetSolver::new(&problem, &SolverConfig::default())
            .unwrap()
            .run();

        assert!(matches!(result, Err(SolverError::SingularSystem { .. })));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let problem = add_then_remove();
        let config = SolverConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(ActiveSetSolver::new(&problem, &config).is_err());
    }

    #[test]
    fn test_from_point_rejects_infeasible_start() {
        let problem = add_then_remove();
        let config = SolverConfig::default();

        let result = ActiveSetSolver::from_point(&problem, &config, array![0.0, 0.0]);
        assert!(matches!(result, Err(SolverError::InvalidConfig(_))));

        let result = ActiveSetSolver::from_point(&problem, &config, array![1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_into_solution_before_termination() {
        let problem = add_then_remove();
        let config = SolverConfig::default();
        let solver = ActiveSetSolver::new(&problem, &config).unwrap();
        assert!(solver.into_solution().is_none());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_string(&TerminationStatus::MaxIterationsExceeded).unwrap();
        assert_eq!(json, "\"maxIterationsExceeded\"");
        assert_eq!(TerminationStatus::Converged.to_string(), "converged");
    }
}
