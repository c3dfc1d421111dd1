//! Classical NTF synthesis by iterative pole placement.
//!
//! Zeros are placed on the unit circle in the signal band. The poles follow a
//! one parameter family that is tuned by a secant iteration until the NTF
//! reaches the requested gain at the frequency where it peaks (`z = −1` for
//! lowpass designs). Optionally the zeros are then optimized for minimal
//! in-band noise and the poles recomputed.

use std::f64::consts::{
    PI,
    TAU,
};

use argmin::{
    core::{
        CostFunction,
        Executor,
    },
    solver::neldermead::NelderMead,
};
use num_complex::Complex64;
use num_traits::{
    One,
    Zero,
};

pub use super::optzeros::Alternation;
use super::{
    Error,
    optzeros::optzeros,
};
use crate::{
    config::ZeroOptimizerOptions,
    poly::{
        Zpk,
        cplxpair_default,
        pad_left,
        rms_gain,
    },
    util::{
        NEGLIGIBLE,
        dbv,
        is_negligible,
    },
};

const POLE_ITERATION_LIMIT: usize = 100;
const POLE_TOLERANCE: f64 = 1e-10;
const POLE_DIVERGENCE: f64 = 1e6;
const ZERO_OPTIMIZATION_PASSES: usize = 5;
const IN_BAND_POINTS: usize = 100;

/// Where the NTF zeros go.
#[derive(Clone, Debug, PartialEq)]
pub enum ZeroPlacement {
    /// All zeros at DC, or at the band center for bandpass designs.
    Dc,
    /// Optimal spacing for the given alternation.
    Optimal(Alternation),
    /// Zeros given as points in the z-plane.
    Explicit(Vec<Complex64>),
    /// Optimal spacing, then numerically optimized for the actual poles.
    Optimized(Alternation),
}

impl Default for ZeroPlacement {
    fn default() -> Self {
        Self::Optimal(Alternation::Spread)
    }
}

impl From<u8> for ZeroPlacement {
    /// Numeric codes of the delta sigma toolbox: `0` for DC, odd codes for
    /// [`Alternation::Spread`], even codes for [`Alternation::SpreadWithDc`],
    /// and codes from `3` on for numeric optimization.
    fn from(value: u8) -> Self {
        let alternation = if (value.saturating_sub(1)) % 2 == 0 {
            Alternation::Spread
        }
        else {
            Alternation::SpreadWithDc
        };
        match value {
            0 => Self::Dc,
            1 | 2 => Self::Optimal(alternation),
            _ => Self::Optimized(alternation),
        }
    }
}

impl From<Vec<Complex64>> for ZeroPlacement {
    fn from(value: Vec<Complex64>) -> Self {
        Self::Explicit(value)
    }
}

/// The requested design could only be approximated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApproximationWarning {
    #[error("unable to achieve specified H_inf, setting all NTF poles to zero")]
    Unachievable,
    #[error("pole iteration diverged, setting all NTF poles to zero")]
    Diverged,
    #[error("pole iteration limit exceeded")]
    IterationLimit,
}

#[derive(Clone, Debug)]
pub struct ClassicalDesign {
    pub ntf: Zpk,
    /// Approximations made on the way, in order of first occurrence.
    pub warnings: Vec<ApproximationWarning>,
}

/// Synthesizes an NTF for a modulator of the given order and oversampling
/// ratio.
///
/// `f0 = 0` gives a lowpass design. Otherwise the design is bandpass, centered
/// at `f0`, and `order` must be even.
pub fn synthesize_ntf1(
    order: usize,
    osr: f64,
    placement: &ZeroPlacement,
    h_inf: f64,
    f0: f64,
    options: &ZeroOptimizerOptions,
) -> Result<ClassicalDesign, Error> {
    if !osr.is_finite() || osr <= 0.0 {
        return Err(Error::InvalidOsr(osr));
    }
    if !(0.0..0.5).contains(&f0) {
        return Err(Error::InvalidCenterFrequency(f0));
    }
    if !h_inf.is_finite() || h_inf <= 0.0 {
        return Err(Error::InvalidHInf(h_inf));
    }
    let bandpass = f0 != 0.0;
    if order == 0 || (bandpass && order % 2 == 1) {
        return Err(Error::InvalidOrder(order));
    }

    let mut design = Synthesis {
        order,
        osr,
        h_inf,
        f0,
        z_inf: if f0 > 0.25 { 1.0 } else { -1.0 },
        pole_iteration_limit: POLE_ITERATION_LIMIT,
        warnings: vec![],
    };

    let mut zeros = design.initial_zeros(placement)?;

    let mut parameters = zeros
        .iter()
        .map(|z| z.arg())
        .filter(|angle| *angle > 0.0)
        .map(|angle| (angle - TAU * f0) * osr / PI)
        .collect::<Vec<_>>();
    if bandpass && *placement == ZeroPlacement::Optimized(Alternation::SpreadWithDc) {
        // the zeros at the band center stay there
        parameters.retain(|x| !is_negligible(*x, NEGLIGIBLE));
    }

    let optimize = matches!(placement, ZeroPlacement::Optimized(_)) && !parameters.is_empty();

    let mut poles = design.place_poles(&zeros)?;
    if optimize {
        for pass in 1..=ZERO_OPTIMIZATION_PASSES {
            parameters = design.optimize_zeros(&parameters, &poles, options)?;
            zeros = design.zeros_from_parameters(&parameters, poles.len());

            let miss = (design.peak(&zeros, &poles) - h_inf).abs();
            tracing::debug!(pass, miss, "zero optimization pass");
            if miss < POLE_TOLERANCE || pass == ZERO_OPTIMIZATION_PASSES {
                break;
            }

            poles = design.place_poles(&zeros)?;
        }
    }

    Ok(ClassicalDesign {
        ntf: Zpk::new(cplxpair_default(&zeros)?, poles, 1.0),
        warnings: design.warnings,
    })
}

#[derive(Debug)]
struct Synthesis {
    order: usize,
    osr: f64,
    h_inf: f64,
    f0: f64,
    /// Where the gain is matched to `h_inf`.
    z_inf: f64,
    pole_iteration_limit: usize,
    warnings: Vec<ApproximationWarning>,
}

impl Synthesis {
    fn bandpass(&self) -> bool {
        self.f0 != 0.0
    }

    fn warn(&mut self, warning: ApproximationWarning) {
        tracing::warn!(order = self.order, h_inf = self.h_inf, f0 = self.f0, "{warning}");
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn initial_zeros(&self, placement: &ZeroPlacement) -> Result<Vec<Complex64>, Error> {
        // bandpass designs place half the zeros and mirror them
        let half = if self.bandpass() { self.order / 2 } else { self.order };
        let dw = if self.bandpass() {
            PI / (2.0 * self.osr)
        }
        else {
            PI / self.osr
        };

        let mut angles = match placement {
            ZeroPlacement::Explicit(zeros) => {
                if zeros.is_empty() {
                    return Err(Error::NoZeros);
                }
                return Ok(zeros.clone());
            }
            ZeroPlacement::Dc => vec![0.0; half],
            ZeroPlacement::Optimal(alternation) | ZeroPlacement::Optimized(alternation) => {
                optzeros(half, *alternation)
                    .into_iter()
                    .map(|x| dw * x)
                    .collect()
            }
        };
        if angles.is_empty() {
            return Err(Error::NoZeros);
        }

        if self.bandpass() {
            angles.sort_by(f64::total_cmp);
            angles = angles
                .into_iter()
                .map(|angle| angle + TAU * self.f0)
                .flat_map(|angle| [angle, -angle])
                .collect();
        }

        Ok(angles
            .into_iter()
            .map(|angle| Complex64::from_polar(1.0, angle))
            .collect())
    }

    /// `Re(NTF(z_inf))`
    fn peak(&self, zeros: &[Complex64], poles: &[Complex64]) -> f64 {
        Zpk::new(zeros.to_vec(), poles.to_vec(), 1.0)
            .eval(Complex64::new(self.z_inf, 0.0))
            .re
    }

    /// Poles of the family for parameter `x`, inside the unit circle and
    /// paired.
    ///
    /// Only the upper half of the family is evaluated. The lower half are
    /// exact conjugates, so the pairing never depends on round-off.
    fn poles_for(&self, x: f64) -> Result<Vec<Complex64>, Error> {
        let n = self.order as f64;
        let e2 = 0.5 * x.powf(2.0 / n);
        let center = (TAU * self.f0).cos();

        let mut poles = Vec::with_capacity(self.order);
        for k in 0..self.order.div_ceil(2) {
            let w = (2 * k + 1) as f64 * PI / n;
            let mb2 = if self.bandpass() {
                center + e2 * Complex64::from_polar(1.0, w)
            }
            else {
                Complex64::one() - e2 * Complex64::from_polar(1.0, w)
            };
            let p = inner_root(mb2);

            if 2 * k + 1 == self.order {
                // w = π, the pole is real
                poles.push(Complex64::new(p.re, 0.0));
            }
            else {
                poles.push(p);
                poles.push(p.conj());
            }
        }

        Ok(cplxpair_default(&poles)?)
    }

    /// Secant iteration on the pole parameter until `Re(NTF(z_inf)) = h_inf`.
    fn place_poles(&mut self, zeros: &[Complex64]) -> Result<Vec<Complex64>, Error> {
        let origin = vec![Complex64::zero(); self.order];

        if !self.bandpass() && self.h_inf >= 2f64.powi(self.order as i32) {
            self.warn(ApproximationWarning::Unachievable);
            return Ok(origin);
        }

        let mut x = if self.bandpass() {
            0.3f64.powi((self.order / 2) as i32 - 1)
        }
        else {
            0.3f64.powi(self.order as i32 - 1)
        };
        let mut delta_x = 0.0;
        let mut f_previous = 0.0;
        let mut iteration = 0;

        loop {
            iteration += 1;
            let poles = self.poles_for(x)?;
            let f = self.peak(zeros, &poles) - self.h_inf;

            delta_x = if iteration == 1 {
                -f / 100.0
            }
            else {
                -f * delta_x / (f - f_previous)
            };
            let x_next = x + delta_x;
            x = if x_next > 0.0 { x_next } else { 0.1 * x };
            f_previous = f;

            if f.abs() < POLE_TOLERANCE || delta_x.abs() < POLE_TOLERANCE {
                tracing::debug!(iteration, x, f, "pole iteration converged");
                return Ok(poles);
            }
            if x > POLE_DIVERGENCE {
                self.warn(ApproximationWarning::Diverged);
                return Ok(origin);
            }
            if iteration >= self.pole_iteration_limit {
                // the last poles are still the best estimate
                self.warn(ApproximationWarning::IterationLimit);
                return Ok(poles);
            }
        }
    }

    /// Box the zero parameters are optimized in.
    fn bounds(&self) -> (f64, f64) {
        if self.bandpass() { (-0.5, 0.5) } else { (0.0, 1.0) }
    }

    /// Zeros `exp(2πi(f0 + x/(2·osr)))` with their conjugates, padded up to
    /// the number of poles with zeros at the band center (bandpass) or at DC.
    fn zeros_from_parameters(&self, parameters: &[f64], count: usize) -> Vec<Complex64> {
        let mut zeros = parameters
            .iter()
            .map(|x| Complex64::from_polar(1.0, TAU * (self.f0 + 0.5 * x / self.osr)))
            .collect::<Vec<_>>();
        if self.bandpass() {
            zeros = pad_left(&zeros, count / 2, Complex64::from_polar(1.0, TAU * self.f0));
        }
        let conjugates = zeros.iter().map(|z| z.conj()).collect::<Vec<_>>();
        zeros.extend(conjugates);
        if !self.bandpass() {
            zeros = pad_left(&zeros, count, Complex64::one());
        }
        zeros
    }

    fn optimize_zeros(
        &self,
        initial: &[f64],
        poles: &[Complex64],
        options: &ZeroOptimizerOptions,
    ) -> Result<Vec<f64>, Error> {
        let (lower, upper) = self.bounds();
        let clamp = |x: &[f64]| x.iter().map(|x| x.clamp(lower, upper)).collect::<Vec<_>>();
        let initial = clamp(initial);

        let problem = InBandNoise {
            synthesis: self,
            poles,
        };

        let mut simplex = vec![initial.clone()];
        for i in 0..initial.len() {
            let mut vertex = initial.clone();
            vertex[i] = if vertex[i] + options.initial_step <= upper {
                vertex[i] + options.initial_step
            }
            else {
                vertex[i] - options.initial_step
            };
            simplex.push(vertex);
        }

        let solver = NelderMead::new(simplex).with_sd_tolerance(options.sd_tolerance)?;
        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(options.max_iters))
            .run()?;

        tracing::debug!(
            cost = result.state.best_cost,
            iterations = result.state.iter,
            "zero optimization finished"
        );

        Ok(result
            .state
            .best_param
            .map(|x| clamp(&x))
            .unwrap_or(initial))
    }
}

/// Root of `p² − 2·mb2·p + 1` inside the unit circle.
///
/// The roots are reciprocal, so the one of larger magnitude is formed without
/// cancellation and inverted.
fn inner_root(mb2: Complex64) -> Complex64 {
    let s = (mb2 * mb2 - 1.0).sqrt();
    let plus = mb2 + s;
    let minus = mb2 - s;
    if plus.norm() >= minus.norm() { plus.inv() } else { minus.inv() }
}

/// In-band RMS noise gain in dB for fixed poles, as a function of the zero
/// parameters.
#[derive(Debug)]
struct InBandNoise<'a> {
    synthesis: &'a Synthesis,
    poles: &'a [Complex64],
}

impl<'a> CostFunction for InBandNoise<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin_math::Error> {
        let (lower, upper) = self.synthesis.bounds();
        let param = param
            .iter()
            .map(|x| x.clamp(lower, upper))
            .collect::<Vec<_>>();

        let ntf = Zpk::new(
            self.synthesis
                .zeros_from_parameters(&param, self.poles.len()),
            self.poles.to_vec(),
            1.0,
        );

        let osr = self.synthesis.osr;
        let f0 = self.synthesis.f0;
        let (f1, f2) = if self.synthesis.bandpass() {
            (f0 - 0.25 / osr, f0 + 0.25 / osr)
        }
        else {
            (0.0, 0.5 / osr)
        };

        Ok(dbv(rms_gain(&ntf, f1, f2, IN_BAND_POINTS).max(1e-300)))
    }
}
