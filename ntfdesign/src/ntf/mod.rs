//! Noise transfer function synthesis.
//!
//! - [`convex`]: weighted noise minimization under a peak gain bound, solved
//!   as a semidefinite program.
//! - [`classical`]: the iterative pole placement of the delta sigma toolbox,
//!   with optional zero optimization.

pub mod classical;
pub mod convex;
pub mod optzeros;

use num_complex::Complex64;

use crate::{
    integrate,
    linalg,
    poly,
    sdp,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("integration error")]
    Integrate(#[from] integrate::Error),
    #[error("polynomial error")]
    Poly(#[from] poly::Error),
    #[error("linear algebra error")]
    Linalg(#[from] linalg::Error),
    #[error("solver error")]
    Sdp(#[from] sdp::Error),
    #[error("optimizer error")]
    ArgminMath(#[from] argmin_math::Error),
    #[error("{poles} poles given for an order {order} NTF")]
    TooManyPoles { poles: usize, order: usize },
    #[error("invalid order {0}")]
    InvalidOrder(usize),
    #[error("invalid peak gain bound {0}")]
    InvalidHInf(f64),
    #[error("invalid oversampling ratio {0}")]
    InvalidOsr(f64),
    #[error("invalid center frequency {0}")]
    InvalidCenterFrequency(f64),
    #[error("pole {0} is not strictly inside the unit circle")]
    UnstablePole(Complex64),
    #[error("no NTF zeros")]
    NoZeros,
}

/// Scaling applied to the quadratic form before optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Normalization {
    /// Divide by `Q[0]`.
    #[default]
    Auto,
    Scale(f64),
    None,
}

impl Normalization {
    pub fn apply(&self, q0: &[f64]) -> Vec<f64> {
        let scale = match self {
            Self::Auto => {
                match q0.first() {
                    Some(first) if *first != 0.0 => 1.0 / first,
                    _ => 1.0,
                }
            }
            Self::Scale(scale) => *scale,
            Self::None => 1.0,
        };
        q0.iter().map(|q| q * scale).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Normalization;

    #[test]
    fn normalization_modes() {
        let q0 = [4.0, 2.0, -1.0];
        assert_eq!(Normalization::Auto.apply(&q0), vec![1.0, 0.5, -0.25]);
        assert_eq!(Normalization::Scale(2.0).apply(&q0), vec![8.0, 4.0, -2.0]);
        assert_eq!(Normalization::None.apply(&q0), q0.to_vec());
    }
}
