//! Semidefinite programs with a norm objective.
//!
//! Problems have the form
//!
//! ```text
//! minimize    ‖G·x + h‖₂
//! subject to  F₀ + Σ xᵢ·Fᵢ ⪰ 0   (for each constraint)
//! ```
//!
//! and come with a strictly feasible starting point.

pub mod barrier;

use nalgebra::{
    DMatrix,
    DVector,
};

pub use self::barrier::BarrierSolver;
use crate::config::SolverOptions;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("solver did not converge within {iterations} iterations (duality gap {duality_gap})")]
    NotConverged { iterations: usize, duality_gap: f64 },
    #[error("starting point is not strictly feasible for constraint {constraint}")]
    Infeasible { constraint: usize },
    #[error("numerical failure: {0}")]
    Numerical(&'static str),
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
}

/// `F₀ + Σ xᵢ·Fᵢ ⪰ 0`
#[derive(Clone, Debug)]
pub struct LinearMatrixInequality {
    pub constant: DMatrix<f64>,
    /// One symmetric matrix per decision variable.
    pub coefficients: Vec<DMatrix<f64>>,
}

impl LinearMatrixInequality {
    pub fn new(constant: DMatrix<f64>, coefficients: Vec<DMatrix<f64>>) -> Self {
        Self {
            constant,
            coefficients,
        }
    }

    pub fn size(&self) -> usize {
        self.constant.nrows()
    }

    pub fn eval(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let mut value = self.constant.clone();
        for (coefficient, x) in self.coefficients.iter().zip(x.iter()) {
            if *x != 0.0 {
                value += coefficient * *x;
            }
        }
        value
    }
}

/// `‖G·x + h‖₂`
#[derive(Clone, Debug)]
pub struct NormObjective {
    pub matrix: DMatrix<f64>,
    pub offset: DVector<f64>,
}

impl NormObjective {
    pub fn residual(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.matrix * x + &self.offset
    }

    pub fn eval(&self, x: &DVector<f64>) -> f64 {
        self.residual(x).norm()
    }
}

#[derive(Clone, Debug)]
pub struct SdpProblem {
    pub objective: NormObjective,
    pub constraints: Vec<LinearMatrixInequality>,
    pub initial_point: DVector<f64>,
}

impl SdpProblem {
    pub fn dimension(&self) -> usize {
        self.initial_point.len()
    }

    pub fn validate(&self) -> Result<(), Error> {
        let n = self.dimension();
        if self.objective.matrix.ncols() != n {
            return Err(Error::InvalidProblem(format!(
                "objective has {} columns, expected {n}",
                self.objective.matrix.ncols()
            )));
        }
        if self.objective.matrix.nrows() != self.objective.offset.len() {
            return Err(Error::InvalidProblem(
                "objective matrix and offset disagree in length".to_owned(),
            ));
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            let size = constraint.size();
            if !constraint.constant.is_square()
                || constraint.coefficients.len() != n
                || constraint
                    .coefficients
                    .iter()
                    .any(|f| f.nrows() != size || f.ncols() != size)
            {
                return Err(Error::InvalidProblem(format!(
                    "constraint {i} has inconsistent shape"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SdpSolution {
    pub x: DVector<f64>,
    /// `‖G·x + h‖₂` at the solution.
    pub objective: f64,
    /// Bound on the suboptimality of the squared objective.
    pub duality_gap: f64,
    pub iterations: usize,
}

pub trait SdpSolver {
    fn solve(&self, problem: &SdpProblem, options: &SolverOptions) -> Result<SdpSolution, Error>;
}
