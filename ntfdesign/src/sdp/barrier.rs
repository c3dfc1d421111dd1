//! Log-det barrier interior point method.
//!
//! The squared objective is minimized together with the barrier
//! `−Σ log det Fⱼ(x)`, weighted by `1/t`. Each outer iteration centers with
//! damped Newton steps and then increases `t` by `mu`. After centering, the
//! squared objective is within `m/t` of the optimum, where `m` is the total
//! size of the constraints.

use nalgebra::{
    DMatrix,
    DVector,
};

use super::{
    Error,
    SdpProblem,
    SdpSolution,
    SdpSolver,
};
use crate::{
    config::SolverOptions,
    linalg::log_det_positive_definite,
};

const MAX_NEWTON_STEPS: usize = 200;
const MAX_BACKTRACKS: usize = 60;
const ARMIJO: f64 = 0.25;

#[derive(Clone, Copy, Debug)]
pub struct BarrierSolver {
    pub initial_t: f64,
    pub mu: f64,
    /// Log progress at INFO instead of DEBUG.
    pub show_progress: bool,
}

impl Default for BarrierSolver {
    fn default() -> Self {
        Self {
            initial_t: 1.0,
            mu: 20.0,
            show_progress: false,
        }
    }
}

impl BarrierSolver {
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn log_progress(&self, iteration: usize, t: f64, objective: f64, duality_gap: f64, newton_steps: usize) {
        if self.show_progress {
            tracing::info!(iteration, t, objective, duality_gap, newton_steps, "barrier iteration");
        }
        else {
            tracing::debug!(iteration, t, objective, duality_gap, newton_steps, "barrier iteration");
        }
    }

    /// Damped Newton minimization of the barrier function for fixed `t`.
    ///
    /// Returns the number of Newton steps taken.
    fn center(&self, problem: &SdpProblem, t: f64, x: &mut DVector<f64>, tolerance: f64) -> Result<usize, Error> {
        for step in 0..MAX_NEWTON_STEPS {
            let inverses = slack_inverses(problem, x).ok_or(Error::Numerical("iterate left the feasible set"))?;
            let (gradient, hessian) = derivatives(problem, t, x, &inverses);
            let direction = newton_direction(hessian, &gradient)?;

            let slope = gradient.dot(&direction);
            let decrement = -slope;
            if !decrement.is_finite() || decrement < 0.0 {
                return Err(Error::Numerical("Newton system is not positive definite"));
            }
            if 0.5 * decrement <= tolerance {
                return Ok(step);
            }

            let current = barrier_value(problem, t, x).ok_or(Error::Numerical("iterate left the feasible set"))?;
            let mut step_size = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = &*x + &direction * step_size;
                if let Some(value) = barrier_value(problem, t, &candidate) {
                    if value <= current + ARMIJO * step_size * slope {
                        *x = candidate;
                        accepted = true;
                        break;
                    }
                }
                step_size *= 0.5;
            }

            if !accepted {
                // round-off dominates the decrease close to the central path
                if 0.5 * decrement < 1.0 {
                    tracing::debug!(t, decrement, "line search stalled, accepting current point");
                    return Ok(step);
                }
                return Err(Error::Numerical("line search failed"));
            }
        }

        Err(Error::Numerical("centering did not converge"))
    }
}

impl SdpSolver for BarrierSolver {
    fn solve(&self, problem: &SdpProblem, options: &SolverOptions) -> Result<SdpSolution, Error> {
        problem.validate()?;
        for (constraint, lmi) in problem.constraints.iter().enumerate() {
            if lmi.eval(&problem.initial_point).cholesky().is_none() {
                return Err(Error::Infeasible { constraint });
            }
        }

        let barrier_order = problem
            .constraints
            .iter()
            .map(|lmi| lmi.size())
            .sum::<usize>() as f64;

        let mut x = problem.initial_point.clone();
        let mut t = self.initial_t;
        let mut duality_gap = f64::INFINITY;

        for iteration in 1..=options.max_iters {
            let newton_steps = self.center(problem, t, &mut x, options.feastol)?;
            let objective = problem.objective.residual(&x).norm_squared();
            duality_gap = barrier_order / t;
            self.log_progress(iteration, t, objective, duality_gap, newton_steps);

            if duality_gap <= options.abstol || (objective > 0.0 && duality_gap / objective <= options.reltol) {
                return Ok(SdpSolution {
                    objective: objective.sqrt(),
                    x,
                    duality_gap,
                    iterations: iteration,
                });
            }

            t *= self.mu;
        }

        Err(Error::NotConverged {
            iterations: options.max_iters,
            duality_gap,
        })
    }
}

/// `Fⱼ(x)⁻¹` for every constraint, or `None` if `x` is not strictly feasible.
fn slack_inverses(problem: &SdpProblem, x: &DVector<f64>) -> Option<Vec<DMatrix<f64>>> {
    problem
        .constraints
        .iter()
        .map(|lmi| Some(lmi.eval(x).cholesky()?.inverse()))
        .collect()
}

fn barrier_value(problem: &SdpProblem, t: f64, x: &DVector<f64>) -> Option<f64> {
    let mut value = t * problem.objective.residual(x).norm_squared();
    for lmi in &problem.constraints {
        value -= log_det_positive_definite(&lmi.eval(x))?;
    }
    Some(value)
}

/// Gradient and Hessian of the barrier function.
///
/// With `S = F(x)⁻¹`, the log-det term contributes `−tr(S·Fᵢ)` to the
/// gradient and `tr(S·Fᵢ·S·Fₖ)` to the Hessian.
fn derivatives(
    problem: &SdpProblem,
    t: f64,
    x: &DVector<f64>,
    inverses: &[DMatrix<f64>],
) -> (DVector<f64>, DMatrix<f64>) {
    let n = x.len();
    let g = &problem.objective.matrix;
    let residual = problem.objective.residual(x);

    let mut gradient = g.tr_mul(&residual) * (2.0 * t);
    let mut hessian = g.tr_mul(g) * (2.0 * t);

    for (lmi, inverse) in problem.constraints.iter().zip(inverses) {
        let products = lmi
            .coefficients
            .iter()
            .map(|f| inverse * f)
            .collect::<Vec<_>>();
        let transposed = products.iter().map(|p| p.transpose()).collect::<Vec<_>>();

        for i in 0..n {
            gradient[i] -= products[i].trace();
            for k in 0..=i {
                let value = products[i].component_mul(&transposed[k]).sum();
                hessian[(i, k)] += value;
                if i != k {
                    hessian[(k, i)] += value;
                }
            }
        }
    }

    (gradient, hessian)
}

fn newton_direction(hessian: DMatrix<f64>, gradient: &DVector<f64>) -> Result<DVector<f64>, Error> {
    let rhs = -gradient;
    if let Some(cholesky) = hessian.clone().cholesky() {
        return Ok(cholesky.solve(&rhs));
    }
    hessian
        .lu()
        .solve(&rhs)
        .ok_or(Error::Numerical("singular Newton system"))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::{
        DMatrix,
        DVector,
    };

    use super::BarrierSolver;
    use crate::{
        config::SolverOptions,
        sdp::{
            Error,
            LinearMatrixInequality,
            NormObjective,
            SdpProblem,
            SdpSolver,
        },
    };

    /// minimize |x − 2| subject to x ≤ 1
    fn bounded_scalar(initial: f64) -> SdpProblem {
        SdpProblem {
            objective: NormObjective {
                matrix: DMatrix::identity(1, 1),
                offset: DVector::from_element(1, -2.0),
            },
            constraints: vec![LinearMatrixInequality::new(
                DMatrix::identity(1, 1),
                vec![-DMatrix::identity(1, 1)],
            )],
            initial_point: DVector::from_element(1, initial),
        }
    }

    #[test]
    fn it_solves_scalar_problem() {
        let solution = BarrierSolver::default()
            .solve(&bounded_scalar(0.0), &SolverOptions::default())
            .unwrap();
        assert_abs_diff_eq!(solution.x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.objective, 1.0, epsilon = 1e-5);
        assert!(solution.x[0] < 1.0);
    }

    #[test]
    fn it_solves_hyperbolic_constraint() {
        // [[x1, 1], [1, x2]] ⪰ 0 means x1·x2 ≥ 1 with x1, x2 ≥ 0
        let problem = SdpProblem {
            objective: NormObjective {
                matrix: DMatrix::identity(2, 2),
                offset: DVector::zeros(2),
            },
            constraints: vec![LinearMatrixInequality::new(
                DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]),
                vec![
                    DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]),
                    DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 1.0]),
                ],
            )],
            initial_point: DVector::from_vec(vec![3.0, 2.0]),
        };
        let solution = BarrierSolver::default()
            .solve(&problem, &SolverOptions::default())
            .unwrap();
        assert_abs_diff_eq!(solution.x[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(solution.x[1], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(solution.objective, 2f64.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn it_rejects_infeasible_start() {
        let result = BarrierSolver::default().solve(&bounded_scalar(1.5), &SolverOptions::default());
        assert!(matches!(result, Err(Error::Infeasible { constraint: 0 })));
    }

    #[test]
    fn it_reports_iteration_limit() {
        let options = SolverOptions {
            max_iters: 1,
            abstol: 1e-12,
            reltol: 1e-12,
            ..Default::default()
        };
        let result = BarrierSolver::default().solve(&bounded_scalar(0.0), &options);
        assert!(matches!(result, Err(Error::NotConverged { iterations: 1, .. })));
    }
}
