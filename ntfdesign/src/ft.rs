//! Discrete time Fourier transforms.
//!
//! Forward transforms of finite sequences are returned as closures. Inverse
//! transforms integrate a function of frequency numerically, so they take an
//! [`Integrator`].

use std::f64::consts::TAU;

use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::integrate::{
    Error,
    Integrator,
};

/// DFT of `x` with the zero frequency in the middle.
///
/// Returns the frequencies `k·fs/N` for `k = −⌊N/2⌋..⌈N/2⌉` and the DFT
/// samples in the same order.
pub fn fft_centered<T>(x: &[T], sample_rate: f64) -> (Vec<f64>, Vec<Complex64>)
where
    T: Copy + Into<Complex64>,
{
    let n = x.len();
    if n == 0 {
        return (vec![], vec![]);
    }

    let mut buffer = x.iter().map(|x| (*x).into()).collect::<Vec<Complex64>>();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);
    buffer.rotate_right(n / 2);

    let frequencies = (0..n)
        .map(|i| (i as f64 - (n / 2) as f64) * sample_rate / n as f64)
        .collect();

    (frequencies, buffer)
}

/// DTFT of `x`, where `x[0]` is sampled at `time_origin` sample intervals.
///
/// `X(f) = Σ x[n]·exp(−2πi·f/fs·(n − t0))`
pub fn dtft<T>(x: &[T], sample_rate: f64, time_origin: f64) -> impl Fn(f64) -> Complex64 + use<T>
where
    T: Copy + Into<Complex64>,
{
    let x = x.iter().map(|x| (*x).into()).collect::<Vec<Complex64>>();
    move |f| {
        x.iter()
            .enumerate()
            .map(|(n, x)| x * Complex64::from_polar(1.0, -TAU * f / sample_rate * (n as f64 - time_origin)))
            .sum()
    }
}

/// DTFT of a hermitian sequence given by its non-negative half.
///
/// `X(f) = x[0] + 2·Σ_{n≥1} Re(x[n])·cos(2πfn/fs)`, which is real.
pub fn dtft_hermitian<T>(x: &[T], sample_rate: f64) -> impl Fn(f64) -> f64 + use<T>
where
    T: Copy + Into<Complex64>,
{
    let x = x.iter().map(|x| Into::<Complex64>::into(*x).re).collect::<Vec<f64>>();
    move |f| {
        let Some((x0, rest)) = x.split_first()
        else {
            return 0.0;
        };
        x0 + rest
            .iter()
            .enumerate()
            .map(|(n, x)| 2.0 * x * (TAU * f / sample_rate * (n + 1) as f64).cos())
            .sum::<f64>()
    }
}

/// Inverse DTFT of `spectrum` at time `t`.
///
/// Integrates `F(f·fs)·e^{2πift}` over one period, real and imaginary parts
/// separately. The result is complex even for real sequences, so spectra
/// that are not hermitian keep their imaginary part; use [`idtft_hermitian`]
/// for a real result.
pub fn idtft<F, I>(spectrum: F, t: f64, integrator: &I, sample_rate: f64) -> Result<Complex64, Error>
where
    F: Fn(f64) -> Complex64,
    I: Integrator,
{
    let integrand = |f: f64| spectrum(f * sample_rate) * Complex64::from_polar(1.0, TAU * f * t);
    let re = integrator.integrate(|f| integrand(f).re, -0.5, 0.5)?;
    let im = integrator.integrate(|f| integrand(f).im, -0.5, 0.5)?;
    Ok(Complex64::new(re, im))
}

/// [`idtft`] for a sequence of times, in order.
pub fn idtft_at<F, I>(
    spectrum: F,
    times: impl IntoIterator<Item = f64>,
    integrator: &I,
    sample_rate: f64,
) -> Result<Vec<Complex64>, Error>
where
    F: Fn(f64) -> Complex64,
    I: Integrator,
{
    times
        .into_iter()
        .map(|t| idtft(&spectrum, t, integrator, sample_rate))
        .collect()
}

/// Inverse DTFT of a hermitian function of frequency at time `t`.
///
/// Only non-negative frequencies are evaluated:
/// `x(t) = 2·∫₀^½ Re(F(f·fs))·cos(2πft) df`.
pub fn idtft_hermitian<F, T, I>(spectrum: F, t: f64, integrator: &I, sample_rate: f64) -> Result<f64, Error>
where
    F: Fn(f64) -> T,
    T: Into<Complex64>,
    I: Integrator,
{
    let integral = integrator.integrate(
        |f| Into::<Complex64>::into(spectrum(f * sample_rate)).re * (TAU * f * t).cos(),
        0.0,
        0.5,
    )?;
    Ok(2.0 * integral)
}

/// [`idtft_hermitian`] for a sequence of times, in order.
pub fn idtft_hermitian_at<F, T, I>(
    spectrum: F,
    times: impl IntoIterator<Item = f64>,
    integrator: &I,
    sample_rate: f64,
) -> Result<Vec<f64>, Error>
where
    F: Fn(f64) -> T,
    T: Into<Complex64>,
    I: Integrator,
{
    times
        .into_iter()
        .map(|t| idtft_hermitian(&spectrum, t, integrator, sample_rate))
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    use super::{
        dtft,
        dtft_hermitian,
        fft_centered,
        idtft,
        idtft_at,
        idtft_hermitian_at,
    };
    use crate::config::QuadOptions;

    #[test]
    fn centered_fft_even_length() {
        let x = [0.0, 1.0, 0.0, 0.0];
        let (frequencies, spectrum) = fft_centered(&x, 2.0);
        assert_eq!(frequencies, vec![-1.0, -0.5, 0.0, 0.5]);

        let expected = [
            Complex64::new(-1.0, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, -1.0),
        ];
        for (value, expected) in spectrum.iter().zip(expected) {
            assert_abs_diff_eq!(value.re, expected.re, epsilon = 1e-12);
            assert_abs_diff_eq!(value.im, expected.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn centered_fft_odd_length_samples_the_dtft() {
        let x = [1.0, 2.0, 3.0];
        let (frequencies, spectrum) = fft_centered(&x, 1.0);
        assert_eq!(frequencies.len(), 3);
        assert_abs_diff_eq!(frequencies[0], -1.0 / 3.0, epsilon = 1e-15);
        assert_eq!(frequencies[1], 0.0);
        assert_abs_diff_eq!(frequencies[2], 1.0 / 3.0, epsilon = 1e-15);

        let transform = dtft(&x, 1.0, 0.0);
        for (f, value) in frequencies.iter().zip(&spectrum) {
            let expected = transform(*f);
            assert_abs_diff_eq!(value.re, expected.re, epsilon = 1e-12);
            assert_abs_diff_eq!(value.im, expected.im, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(spectrum[1].re, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn centered_fft_of_nothing() {
        let (frequencies, spectrum) = fft_centered::<f64>(&[], 1.0);
        assert!(frequencies.is_empty());
        assert!(spectrum.is_empty());
    }

    #[test]
    fn dtft_at_dc_is_the_sum() {
        let x = [1.0, 2.0, 3.0];
        let transform = dtft(&x, 1.0, 0.0);
        let value = transform(0.0);
        assert_abs_diff_eq!(value.re, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn dtft_time_origin_shifts_phase() {
        let x = [0.0, 1.0];
        let centered = dtft(&x, 1.0, 1.0);
        let value = centered(0.2);
        assert_abs_diff_eq!(value.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn hermitian_dtft_matches_full_dtft() {
        let half = [1.0, 0.5, -0.25];
        let full = [-0.25, 0.5, 1.0, 0.5, -0.25];
        let x_h = dtft_hermitian(&half, 1.0);
        let x_f = dtft(&full, 1.0, 2.0);
        for f in [0.0, 0.1, 0.27, 0.5] {
            assert_abs_diff_eq!(x_h(f), x_f(f).re, epsilon = 1e-12);
            assert_abs_diff_eq!(x_f(f).im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn idtft_recovers_sequence() {
        let x = [1.0, -0.5, 0.25];
        let spectrum = dtft(&x, 1.0, 0.0);
        let options = QuadOptions::default();
        let recovered = idtft_at(&spectrum, [0.0, 1.0, 2.0, 3.0], &options, 1.0).unwrap();
        for (value, expected) in recovered.iter().zip([1.0, -0.5, 0.25, 0.0]) {
            assert_abs_diff_eq!(value.re, expected, epsilon = 1e-9);
            assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn idtft_of_complex_sequence() {
        let x = [Complex64::new(0.0, 1.0), Complex64::new(2.0, -1.0)];
        let spectrum = dtft(&x, 1.0, 0.0);
        let value = idtft(&spectrum, 1.0, &QuadOptions::default(), 1.0).unwrap();
        assert_abs_diff_eq!(value.re, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(value.im, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn hermitian_idtft_recovers_half_sequence() {
        let half = [2.0, 0.75, -0.125];
        let spectrum = dtft_hermitian(&half, 1.0);
        let recovered =
            idtft_hermitian_at(&spectrum, [0.0, 1.0, 2.0], &QuadOptions::default(), 1.0).unwrap();
        for (value, expected) in recovered.iter().zip(half) {
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn sample_rate_scales_frequency_axis() {
        let half = [1.0, 0.5];
        let spectrum = dtft_hermitian(&half, 4.0);
        let recovered = idtft_hermitian_at(&spectrum, [0.0, 1.0], &QuadOptions::default(), 4.0).unwrap();
        assert_abs_diff_eq!(recovered[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered[1], 0.5, epsilon = 1e-9);
    }
}
