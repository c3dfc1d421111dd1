//! Polynomials and transfer functions.
//!
//! Coefficients are always stored in descending powers, with the leading
//! coefficient first.

use std::f64::consts::TAU;

use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::{
    One,
    Zero,
};
use rustfft::FftPlanner;

use crate::util::{
    NEGLIGIBLE,
    chop,
    linspace,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot identify complex pairs: {value} has no conjugate")]
    UnpairedComplex { value: Complex64 },
}

/// Filter in zeros, poles and gain form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    pub fn new(zeros: Vec<Complex64>, poles: Vec<Complex64>, gain: f64) -> Self {
        Self { zeros, poles, gain }
    }

    /// All-pole filter with unit gain.
    pub fn all_pole(poles: Vec<Complex64>) -> Self {
        Self::new(vec![], poles, 1.0)
    }

    pub fn eval(&self, z: Complex64) -> Complex64 {
        let numerator = self
            .zeros
            .iter()
            .fold(Complex64::one(), |acc, zero| acc * (z - zero));
        let denominator = self
            .poles
            .iter()
            .fold(Complex64::one(), |acc, pole| acc * (z - pole));
        self.gain * numerator / denominator
    }

    pub fn numerator(&self) -> Vec<Complex64> {
        poly(&self.zeros)
    }

    pub fn denominator(&self) -> Vec<Complex64> {
        poly(&self.poles)
    }

    /// Samples `H(e^{2πif})` at `f = k / n` for `k = 0..n`.
    ///
    /// Numerator and denominator are transformed with one FFT each.
    pub fn frequency_response(&self, n: usize) -> Vec<Complex64> {
        let numerator = self.numerator();
        let denominator = self.denominator();
        let fft_size = n.max(numerator.len()).max(denominator.len());

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let transform = |coefficients: &[Complex64]| {
            let mut buffer = coefficients
                .iter()
                .copied()
                .chain(std::iter::repeat(Complex64::zero()))
                .take(fft_size)
                .collect::<Vec<_>>();
            fft.process(&mut buffer);
            buffer
        };
        let numerator_response = transform(&numerator);
        let denominator_response = transform(&denominator);

        // the transforms are in powers of z^-1, so the degree difference is
        // put back as a phase term.
        let excess = self.zeros.len() as f64 - self.poles.len() as f64;

        numerator_response
            .into_iter()
            .zip(denominator_response)
            .enumerate()
            .map(|(k, (num, den))| {
                let phase = Complex64::from_polar(1.0, TAU * k as f64 / fft_size as f64 * excess);
                self.gain * phase * num / den
            })
            .collect()
    }

    /// Largest magnitude of the frequency response over `n` points on the
    /// unit circle.
    pub fn peak_gain(&self, n: usize) -> f64 {
        self.frequency_response(n)
            .into_iter()
            .map(|h| h.norm())
            .fold(0.0, f64::max)
    }
}

/// Filter as numerator and denominator coefficients.
#[derive(Clone, Debug, PartialEq)]
pub struct Ba {
    pub numerator: Vec<f64>,
    pub denominator: Vec<f64>,
}

impl Ba {
    pub fn new(numerator: Vec<f64>, denominator: Vec<f64>) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn eval(&self, z: Complex64) -> Complex64 {
        polyval(&self.numerator, z) / polyval(&self.denominator, z)
    }
}

/// Either filter descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferFunction {
    Zpk(Zpk),
    Ba(Ba),
}

impl TransferFunction {
    pub fn eval(&self, z: Complex64) -> Complex64 {
        match self {
            Self::Zpk(zpk) => zpk.eval(z),
            Self::Ba(ba) => ba.eval(z),
        }
    }

    /// `|H(e^{2πif})|²`
    pub fn magnitude_squared(&self, frequency: f64) -> f64 {
        self.eval(Complex64::from_polar(1.0, TAU * frequency))
            .norm_sqr()
    }
}

impl From<Zpk> for TransferFunction {
    fn from(value: Zpk) -> Self {
        Self::Zpk(value)
    }
}

impl From<Ba> for TransferFunction {
    fn from(value: Ba) -> Self {
        Self::Ba(value)
    }
}

/// Monic polynomial with the given roots.
pub fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coefficients = Vec::with_capacity(roots.len() + 1);
    coefficients.push(Complex64::one());
    for root in roots {
        coefficients.push(Complex64::zero());
        for i in (1..coefficients.len()).rev() {
            let previous = coefficients[i - 1];
            coefficients[i] -= root * previous;
        }
    }
    coefficients
}

/// Horner evaluation.
pub fn polyval<T>(coefficients: &[T], z: Complex64) -> Complex64
where
    T: Copy + Into<Complex64>,
{
    coefficients
        .iter()
        .fold(Complex64::zero(), |acc, c| acc * z + (*c).into())
}

/// Roots of a real polynomial, from the eigenvalues of its companion matrix.
pub fn roots(coefficients: &[f64]) -> Vec<Complex64> {
    let Some(first) = coefficients.iter().position(|c| *c != 0.0)
    else {
        return vec![];
    };
    let last = coefficients
        .iter()
        .rposition(|c| *c != 0.0)
        .unwrap_or(first);
    let trailing_zeros = coefficients.len() - 1 - last;
    let coefficients = &coefficients[first..=last];
    let degree = coefficients.len() - 1;

    let mut roots = Vec::with_capacity(degree + trailing_zeros);
    if degree > 0 {
        let companion = DMatrix::from_fn(degree, degree, |i, j| {
            if i == 0 {
                -coefficients[j + 1] / coefficients[0]
            }
            else if i == j + 1 {
                1.0
            }
            else {
                0.0
            }
        });
        roots.extend(
            companion
                .complex_eigenvalues()
                .iter()
                .map(|e| Complex64::new(e.re, e.im)),
        );
    }
    roots.extend(std::iter::repeat_n(Complex64::zero(), trailing_zeros));
    roots
}

/// Pads `values` on the left with `fill` up to length `n`.
pub fn pad_left<T: Clone>(values: &[T], n: usize, fill: T) -> Vec<T> {
    let mut padded = vec![fill; n.saturating_sub(values.len())];
    padded.extend_from_slice(values);
    padded
}

/// Pads `values` on the right with `fill` up to length `n`.
pub fn pad_right<T: Clone>(values: &[T], n: usize, fill: T) -> Vec<T> {
    let mut padded = values.to_vec();
    if padded.len() < n {
        padded.resize(n, fill);
    }
    padded
}

/// Sorts values into complex conjugate pairs.
///
/// Pairs come first, ordered by increasing real part with the positive
/// imaginary member leading, followed by the real values in increasing order.
/// Parts smaller than `tolerance` are set to zero first.
pub fn cplxpair(values: &[Complex64], tolerance: f64) -> Result<Vec<Complex64>, Error> {
    let mut values = values
        .iter()
        .map(|z| chop(*z, tolerance))
        .collect::<Vec<_>>();
    values.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));

    let (real, complex): (Vec<_>, Vec<_>) = values.into_iter().partition(|z| z.im == 0.0);
    let (positive, mut negative): (Vec<_>, Vec<_>) = complex.into_iter().partition(|z| z.im > 0.0);

    // order the lower half like the conjugates of the upper half.
    negative.sort_by(|a, b| a.re.total_cmp(&b.re).then(b.im.total_cmp(&a.im)));

    if positive.len() != negative.len() {
        let value = if positive.len() > negative.len() {
            positive[negative.len()]
        }
        else {
            negative[positive.len()]
        };
        return Err(Error::UnpairedComplex { value });
    }

    let mut paired = Vec::with_capacity(real.len() + 2 * positive.len());
    for (upper, lower) in positive.into_iter().zip(negative) {
        if (upper - lower.conj()).norm() > tolerance * upper.norm().max(1.0) {
            return Err(Error::UnpairedComplex { value: upper });
        }
        paired.push(upper);
        paired.push(lower);
    }
    paired.extend(real);

    Ok(paired)
}

/// [`cplxpair`] with the default tolerance.
pub fn cplxpair_default(values: &[Complex64]) -> Result<Vec<Complex64>, Error> {
    cplxpair(values, NEGLIGIBLE)
}

/// RMS of `|H(e^{2πif})|` over `n` frequencies evenly spread over `[f1, f2]`.
pub fn rms_gain(tf: &Zpk, f1: f64, f2: f64, n: usize) -> f64 {
    let energy = linspace(f1, f2, n)
        .map(|f| tf.eval(Complex64::from_polar(1.0, TAU * f)).norm_sqr())
        .sum::<f64>();
    (energy / n as f64).sqrt()
}
