//! NTF synthesis as a convex problem.
//!
//! The numerator `[1, b₁, …, bₙ]` minimizes `‖Qs·[1; b]‖₂`, where `Qs` is the
//! symmetric square root of the Toeplitz quadratic form. The peak gain bound
//! is imposed with the bounded real lemma on a controllable canonical
//! realization of the NTF, which makes the problem a semidefinite program in
//! `b` and the symmetric matrix `X`.

use nalgebra::{
    DMatrix,
    DVector,
};
use num_complex::Complex64;
use num_traits::Zero;

use super::{
    Error,
    Normalization,
};
use crate::{
    config::{
        ConvexOptions,
        WeightingOptions,
    },
    linalg::{
        solve_discrete_lyapunov,
        symmetric_sqrt,
        toeplitz,
    },
    poly::{
        Zpk,
        pad_right,
        poly,
        roots,
    },
    q0::q0_weighting,
    sdp::{
        self,
        BarrierSolver,
        LinearMatrixInequality,
        NormObjective,
        SdpProblem,
        SdpSolver,
    },
    weighting::{
        Weighting,
        mult_weightings,
    },
};

const MAX_START_HALVINGS: usize = 60;

/// FIR NTF (all poles at the origin) from the first row of the quadratic
/// form.
///
/// `h_inf` must be strictly greater than 1. At exactly 1 the only NTF meeting
/// the bound is the trivial one, which leaves no strictly feasible point for
/// the interior point solver, so it is rejected with
/// [`Error::InvalidHInf`].
pub fn ntf_fir_from_q0(q0: &[f64], h_inf: f64, normalize: Normalization, options: &ConvexOptions) -> Result<Zpk, Error> {
    ntf_hybrid_from_q0(q0, h_inf, &[], normalize, options)
}

/// NTF with pre-assigned poles from the first row of the quadratic form.
///
/// The poles are padded with zeros up to the order `q0.len() − 1`, and must
/// lie strictly inside the unit circle. As for [`ntf_fir_from_q0`], `h_inf`
/// must be strictly greater than 1.
pub fn ntf_hybrid_from_q0(
    q0: &[f64],
    h_inf: f64,
    poles: &[Complex64],
    normalize: Normalization,
    options: &ConvexOptions,
) -> Result<Zpk, Error> {
    let order = q0.len().saturating_sub(1);
    if order == 0 {
        return Err(Error::InvalidOrder(order));
    }
    if poles.len() > order {
        return Err(Error::TooManyPoles {
            poles: poles.len(),
            order,
        });
    }
    if !h_inf.is_finite() || h_inf <= 1.0 {
        return Err(Error::InvalidHInf(h_inf));
    }
    if let Some(pole) = poles.iter().find(|p| p.norm() >= 1.0) {
        return Err(Error::UnstablePole(*pole));
    }

    let poles = pad_right(poles, order, Complex64::zero());
    // a₁..aₙ, the leading 1 is implied
    let ar = poly(&poles)[1..].iter().map(|a| a.re).collect::<Vec<_>>();

    let q0 = normalize.apply(q0);
    let qs = symmetric_sqrt(&toeplitz(&q0), options.fix_pos)?;

    let realization = BoundedReal::new(order, &ar, h_inf);
    let problem = realization.problem(&qs)?;

    tracing::debug!(order, h_inf, variables = problem.dimension(), "solving NTF synthesis problem");

    let solution = BarrierSolver::default()
        .with_progress(options.show_progress)
        .solve(&problem, &options.solver)?;

    tracing::debug!(
        objective = solution.objective,
        duality_gap = solution.duality_gap,
        iterations = solution.iterations,
        "NTF synthesis problem solved"
    );

    let mut numerator = Vec::with_capacity(order + 1);
    numerator.push(1.0);
    numerator.extend(solution.x.iter().take(order));

    Ok(Zpk::new(roots(&numerator), poles, 1.0))
}

/// [`ntf_fir_from_q0`] for a noise weighting.
pub fn ntf_fir_weighting(
    order: usize,
    weighting: impl Into<Weighting>,
    h_inf: f64,
    normalize: Normalization,
    options: &WeightingOptions,
) -> Result<Zpk, Error> {
    let q0 = q0_weighting(order, weighting, &options.quad)?;
    ntf_fir_from_q0(&q0, h_inf, normalize, &options.convex)
}

/// [`ntf_hybrid_from_q0`] for a noise weighting.
///
/// The weighting is multiplied by the all-pole filter of `poles`, since the
/// noise is shaped by the numerator divided by the fixed denominator.
pub fn ntf_hybrid_weighting(
    order: usize,
    weighting: impl Into<Weighting>,
    h_inf: f64,
    poles: &[Complex64],
    normalize: Normalization,
    options: &WeightingOptions,
) -> Result<Zpk, Error> {
    let weighting = if poles.is_empty() {
        weighting.into()
    }
    else {
        mult_weightings([weighting.into(), Zpk::all_pole(poles.to_vec()).into()])
    };
    let q0 = q0_weighting(order, weighting, &options.quad)?;
    ntf_hybrid_from_q0(&q0, h_inf, poles, normalize, &options.convex)
}

/// Decision variables are `b₁..bₙ` followed by the upper triangle of `X`,
/// row by row.
#[derive(Clone, Debug)]
struct BoundedReal {
    order: usize,
    h_inf: f64,
    /// `a₁..aₙ`
    ar: Vec<f64>,
    /// `A` of the controllable canonical form
    state: DMatrix<f64>,
    /// `(p, q)` with `p ≤ q` for every entry of `X` that is a variable.
    entries: Vec<(usize, usize)>,
}

impl BoundedReal {
    fn new(order: usize, ar: &[f64], h_inf: f64) -> Self {
        let state = DMatrix::from_fn(order, order, |i, j| {
            if i == order - 1 {
                -ar[order - 1 - j]
            }
            else if j == i + 1 {
                1.0
            }
            else {
                0.0
            }
        });
        let entries = (0..order)
            .flat_map(|p| (p..order).map(move |q| (p, q)))
            .collect();
        Self {
            order,
            h_inf,
            ar: ar.to_vec(),
            state,
            entries,
        }
    }

    fn dimension(&self) -> usize {
        self.order + self.entries.len()
    }

    /// `E` with `⟨E, X⟩` picking the entry `(p, q)` of a symmetric `X`.
    fn basis(&self, p: usize, q: usize) -> DMatrix<f64> {
        let mut e = DMatrix::zeros(self.order, self.order);
        e[(p, q)] = 1.0;
        e[(q, p)] = 1.0;
        e
    }

    /// `[A B]`
    fn input_state(&self) -> DMatrix<f64> {
        let mut w = DMatrix::zeros(self.order, self.order + 1);
        w.view_mut((0, 0), (self.order, self.order))
            .copy_from(&self.state);
        w[(self.order - 1, self.order)] = 1.0;
        w
    }

    /// `−M ⪰ 0`
    fn bounded_real_lmi(&self) -> LinearMatrixInequality {
        let n = self.order;
        let size = n + 2;

        // −M at b = 0, X = 0; C = reverse(b) − reverse(ar)
        let mut constant = DMatrix::zeros(size, size);
        for j in 0..n {
            let c = self.ar[n - 1 - j];
            constant[(n + 1, j)] = c;
            constant[(j, n + 1)] = c;
        }
        constant[(n, n)] = self.h_inf.powi(2);
        constant[(n, n + 1)] = -1.0;
        constant[(n + 1, n)] = -1.0;
        constant[(n + 1, n + 1)] = 1.0;

        let mut coefficients = Vec::with_capacity(self.dimension());
        for k in 0..n {
            let mut f = DMatrix::zeros(size, size);
            let j = n - 1 - k;
            f[(n + 1, j)] = -1.0;
            f[(j, n + 1)] = -1.0;
            coefficients.push(f);
        }

        // the X dependent block of M is [A B]ᵀ·X·[A B] − diag(X, 0)
        let w = self.input_state();
        for &(p, q) in &self.entries {
            let e = self.basis(p, q);
            let mut f = DMatrix::zeros(size, size);
            let block = -(w.transpose() * &e * &w);
            f.view_mut((0, 0), (n + 1, n + 1)).copy_from(&block);
            for i in 0..n {
                for j in 0..n {
                    f[(i, j)] += e[(i, j)];
                }
            }
            coefficients.push(f);
        }

        LinearMatrixInequality::new(constant, coefficients)
    }

    /// `X ⪰ 0`
    fn positive_lmi(&self) -> LinearMatrixInequality {
        let n = self.order;
        let mut coefficients = vec![DMatrix::zeros(n, n); n];
        coefficients.extend(self.entries.iter().map(|&(p, q)| self.basis(p, q)));
        LinearMatrixInequality::new(DMatrix::zeros(n, n), coefficients)
    }

    fn pack(&self, b: &[f64], x: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.dimension(),
            b.iter()
                .copied()
                .chain(self.entries.iter().map(|&(p, q)| x[(p, q)])),
        )
    }

    /// Strictly feasible point: `b = ar` and `X = s·X₀` with
    /// `X₀ − AᵀX₀A = I`.
    ///
    /// At `b = ar` the NTF is 1 and `C = 0`, so `−M ≻ 0` reduces to
    /// `s·(c + |a|²) < H_inf² − 1` with `a = AᵀX₀B` and `c = BᵀX₀B`.
    fn initial_point(&self, constraints: &[LinearMatrixInequality]) -> Result<DVector<f64>, Error> {
        let n = self.order;
        let x0 = solve_discrete_lyapunov(&self.state, &DMatrix::identity(n, n))?;
        let a = self.state.transpose() * x0.column(n - 1);
        let c = x0[(n - 1, n - 1)];
        let mut scale = 0.5 * (self.h_inf.powi(2) - 1.0) / (c + a.norm_squared());

        for _ in 0..MAX_START_HALVINGS {
            let point = self.pack(&self.ar, &(&x0 * scale));
            let infeasible = constraints
                .iter()
                .position(|lmi| lmi.eval(&point).cholesky().is_none());
            match infeasible {
                None => return Ok(point),
                Some(_) => scale *= 0.5,
            }
        }

        let point = self.pack(&self.ar, &(&x0 * scale));
        let constraint = constraints
            .iter()
            .position(|lmi| lmi.eval(&point).cholesky().is_none())
            .unwrap_or_default();
        Err(sdp::Error::Infeasible { constraint }.into())
    }

    fn problem(&self, qs: &DMatrix<f64>) -> Result<SdpProblem, Error> {
        let n = self.order;
        let mut matrix = DMatrix::zeros(n + 1, self.dimension());
        matrix
            .view_mut((0, 0), (n + 1, n))
            .copy_from(&qs.columns(1, n));
        let objective = NormObjective {
            matrix,
            offset: qs.column(0).into_owned(),
        };

        let constraints = vec![self.bounded_real_lmi(), self.positive_lmi()];
        let initial_point = self.initial_point(&constraints)?;

        Ok(SdpProblem {
            objective,
            constraints,
            initial_point,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use num_complex::Complex64;

    use super::{
        BoundedReal,
        ntf_fir_from_q0,
        ntf_fir_weighting,
        ntf_hybrid_from_q0,
        ntf_hybrid_weighting,
    };
    use crate::{
        config::{
            ConvexOptions,
            WeightingOptions,
        },
        ntf::{
            Error,
            Normalization,
        },
        poly::{
            poly,
            roots,
        },
        weighting::Weighting,
    };

    fn lowpass_weighting() -> Weighting {
        Weighting::function(|f: f64| 1.0 / (1.0 + ((PI * f).tan() / (PI * 0.05).tan()).powi(8)))
    }

    fn quiet() -> ConvexOptions {
        ConvexOptions {
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn canonical_realization() {
        let realization = BoundedReal::new(3, &[0.5, 0.25, 0.125], 1.5);
        assert_eq!(realization.state[(2, 0)], -0.125);
        assert_eq!(realization.state[(2, 2)], -0.5);
        assert_eq!(realization.state[(0, 1)], 1.0);
        assert_eq!(realization.dimension(), 3 + 6);
    }

    #[test]
    fn uniform_weighting_gives_bounded_fir() {
        let q0 = [1.0, 0.0, 0.0, 0.0, 0.0];
        let ntf = ntf_fir_from_q0(&q0, 1.5, Normalization::Auto, &quiet()).unwrap();
        assert_eq!(ntf.zeros.len(), 4);
        assert_eq!(ntf.poles, vec![Complex64::new(0.0, 0.0); 4]);
        assert_eq!(ntf.gain, 1.0);
        assert!(ntf.zeros.iter().all(|z| z.norm() <= 1.0 + 1e-6));
        assert!(ntf.peak_gain(4096) <= 1.5 + 1e-4);
    }

    #[test]
    fn lowpass_weighting_pushes_noise_out_of_band() {
        let ntf = ntf_fir_weighting(
            4,
            lowpass_weighting(),
            1.5,
            Normalization::Auto,
            &WeightingOptions {
                convex: quiet(),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(ntf.peak_gain(4096) <= 1.5 + 1e-4);
        assert!(ntf.zeros.iter().all(|z| z.norm() <= 1.0 + 1e-2));
        let dc = ntf.eval(Complex64::new(1.0, 0.0)).norm();
        let nyquist = ntf.eval(Complex64::new(-1.0, 0.0)).norm();
        assert!(dc < 0.5 * nyquist);
    }

    #[test]
    fn synthesized_zeros_round_trip_through_polynomial() {
        let q0 = [1.0, 0.6, 0.2, -0.1];
        let ntf = ntf_fir_from_q0(&q0, 1.5, Normalization::Auto, &quiet()).unwrap();
        let coefficients = poly(&ntf.zeros)
            .into_iter()
            .map(|c| c.re)
            .collect::<Vec<_>>();
        let recovered = roots(&coefficients);
        assert_eq!(recovered.len(), ntf.zeros.len());
        for z in &ntf.zeros {
            assert!(
                recovered.iter().any(|r| (r - z).norm() < 1e-6),
                "zero {z} not recovered"
            );
        }
    }

    #[test]
    fn hybrid_keeps_given_poles() {
        let poles = [Complex64::new(0.5, 0.2), Complex64::new(0.5, -0.2)];
        let ntf = ntf_hybrid_weighting(
            4,
            lowpass_weighting(),
            1.5,
            &poles,
            Normalization::Auto,
            &WeightingOptions {
                convex: quiet(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(ntf.poles.len(), 4);
        assert_eq!(&ntf.poles[..2], &poles);
        assert_eq!(ntf.poles[2], Complex64::new(0.0, 0.0));
        assert!(ntf.peak_gain(4096) <= 1.5 + 1e-4);
    }

    #[test]
    fn it_rejects_too_many_poles() {
        let q0 = [1.0, 0.0, 0.0];
        let poles = [Complex64::new(0.1, 0.0); 3];
        let result = ntf_hybrid_from_q0(&q0, 1.5, &poles, Normalization::Auto, &quiet());
        assert!(matches!(result, Err(Error::TooManyPoles { poles: 3, order: 2 })));
    }

    #[test]
    fn it_rejects_invalid_configuration() {
        let q0 = [1.0, 0.0, 0.0];
        assert!(matches!(
            ntf_fir_from_q0(&q0, 1.0, Normalization::Auto, &quiet()),
            Err(Error::InvalidHInf(_))
        ));
        assert!(matches!(
            ntf_hybrid_from_q0(&q0, 1.5, &[Complex64::new(1.0, 0.0)], Normalization::Auto, &quiet()),
            Err(Error::UnstablePole(_))
        ));
        assert!(matches!(
            ntf_fir_from_q0(&[1.0], 1.5, Normalization::Auto, &quiet()),
            Err(Error::InvalidOrder(0))
        ));
    }
}
