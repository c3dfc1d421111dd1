//! Adaptive quadrature.
//!
//! Globally adaptive 15-point Gauss–Kronrod integration with the error
//! heuristics of QUADPACK's `qk15`. The interval with the largest error
//! estimate is bisected until the requested tolerance is met.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
};

use crate::config::QuadOptions;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "integration did not converge within {limit} subintervals (result {result}, estimated error {error})"
    )]
    NotConverged {
        limit: usize,
        result: f64,
        error: f64,
    },
    #[error("integrand is not finite at {at}")]
    NotFinite { at: f64 },
    #[error("invalid integration bounds [{a}, {b}]")]
    InvalidBounds { a: f64, b: f64 },
    #[error("subdivision limit must be at least 1")]
    ZeroLimit,
}

/// Numerical integration of a real function over a finite interval.
pub trait Integrator {
    fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<f64, Error>
    where
        F: Fn(f64) -> f64;
}

impl Integrator for QuadOptions {
    fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<f64, Error>
    where
        F: Fn(f64) -> f64,
    {
        quad(f, a, b, self).map(|output| output.integral)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct QuadOutput {
    pub integral: f64,
    /// Estimated absolute error.
    pub error: f64,
    pub evaluations: usize,
    pub subintervals: usize,
}

// abscissae of the 15-point Kronrod rule; the odd ones are the 7-point Gauss
// nodes.
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

#[derive(Clone, Copy, Debug)]
struct Segment {
    a: f64,
    b: f64,
    integral: f64,
    error: f64,
    /// Integral of `|f|`, used for the round-off floor.
    absolute: f64,
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}

fn evaluate<F>(f: &F, x: f64) -> Result<f64, Error>
where
    F: Fn(f64) -> f64,
{
    let y = f(x);
    if y.is_finite() {
        Ok(y)
    }
    else {
        Err(Error::NotFinite { at: x })
    }
}

fn kronrod15<F>(f: &F, a: f64, b: f64) -> Result<Segment, Error>
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half_length = 0.5 * (b - a);

    let f_center = evaluate(f, center)?;
    let mut result_gauss = f_center * WG[3];
    let mut result_kronrod = f_center * WGK[7];
    let mut result_abs = result_kronrod.abs();

    let mut f_lower = [0.0; 7];
    let mut f_upper = [0.0; 7];

    for j in 0..7 {
        let dx = half_length * XGK[j];
        let y1 = evaluate(f, center - dx)?;
        let y2 = evaluate(f, center + dx)?;
        f_lower[j] = y1;
        f_upper[j] = y2;
        result_kronrod += WGK[j] * (y1 + y2);
        result_abs += WGK[j] * (y1.abs() + y2.abs());
        if j % 2 == 1 {
            result_gauss += WG[j / 2] * (y1 + y2);
        }
    }

    let mean = 0.5 * result_kronrod;
    let mut result_asc = WGK[7] * (f_center - mean).abs();
    for j in 0..7 {
        result_asc += WGK[j] * ((f_lower[j] - mean).abs() + (f_upper[j] - mean).abs());
    }

    let scale = half_length.abs();
    let integral = result_kronrod * half_length;
    result_abs *= scale;
    result_asc *= scale;

    let mut error = ((result_kronrod - result_gauss) * half_length).abs();
    if result_asc != 0.0 && error != 0.0 {
        error = result_asc * (200.0 * error / result_asc).powf(1.5).min(1.0);
    }
    if result_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * result_abs);
    }

    Ok(Segment {
        a,
        b,
        integral,
        error,
        absolute: result_abs,
    })
}

/// Integrates `f` over `[a, b]`.
///
/// The interval is first split at the entries of `options.points` that lie
/// strictly inside it.
pub fn quad<F>(f: F, a: f64, b: f64, options: &QuadOptions) -> Result<QuadOutput, Error>
where
    F: Fn(f64) -> f64,
{
    if !a.is_finite() || !b.is_finite() || a > b {
        return Err(Error::InvalidBounds { a, b });
    }
    if options.limit == 0 {
        return Err(Error::ZeroLimit);
    }
    if a == b {
        return Ok(QuadOutput {
            integral: 0.0,
            error: 0.0,
            evaluations: 0,
            subintervals: 0,
        });
    }

    let mut breakpoints = vec![a];
    let mut points = options
        .points
        .iter()
        .copied()
        .filter(|p| *p > a && *p < b)
        .collect::<Vec<_>>();
    points.sort_by(f64::total_cmp);
    points.dedup();
    breakpoints.extend(points);
    breakpoints.push(b);

    let mut heap = BinaryHeap::with_capacity(options.limit.max(breakpoints.len()));
    for window in breakpoints.windows(2) {
        heap.push(kronrod15(&f, window[0], window[1])?);
    }
    let mut evaluations = 15 * heap.len();

    loop {
        let (integral, error, absolute) = heap.iter().fold((0.0, 0.0, 0.0), |acc, segment| {
            (
                acc.0 + segment.integral,
                acc.1 + segment.error,
                acc.2 + segment.absolute,
            )
        });

        let tolerance = options.epsabs.max(options.epsrel * integral.abs());
        // once every segment sits on its round-off floor, bisecting more
        // doesn't improve anything.
        let round_off = 50.0 * f64::EPSILON * absolute * (1.0 + 1e-6);

        if error <= tolerance || error <= round_off {
            tracing::trace!(integral, error, subintervals = heap.len(), "integration converged");
            return Ok(QuadOutput {
                integral,
                error,
                evaluations,
                subintervals: heap.len(),
            });
        }

        if heap.len() >= options.limit {
            return Err(Error::NotConverged {
                limit: options.limit,
                result: integral,
                error,
            });
        }

        let Some(worst) = heap.pop()
        else {
            unreachable!("heap is never empty");
        };
        let middle = 0.5 * (worst.a + worst.b);
        heap.push(kronrod15(&f, worst.a, middle)?);
        heap.push(kronrod15(&f, middle, worst.b)?);
        evaluations += 30;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;

    use super::{
        Error,
        Integrator,
        quad,
    };
    use crate::config::QuadOptions;

    #[test]
    fn integrates_polynomial_exactly() {
        let output = quad(|x| x.powi(4), 0.0, 2.0, &QuadOptions::default()).unwrap();
        assert_abs_diff_eq!(output.integral, 32.0 / 5.0, epsilon = 1e-12);
        assert_eq!(output.subintervals, 1);
    }

    #[test]
    fn integrates_oscillating_cosine() {
        let options = QuadOptions::default();
        let value = options
            .integrate(|f| (2.0 * PI * f * 7.0).cos(), 0.0, 0.5)
            .unwrap();
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn integrates_peaked_function() {
        // ∫ 1 / (1 + (x/ε)²) dx over [-1, 1] = 2ε·atan(1/ε)
        let eps = 1e-3;
        let options = QuadOptions::default();
        let value = options
            .integrate(|x| 1.0 / (1.0 + (x / eps).powi(2)), -1.0, 1.0)
            .unwrap();
        assert_abs_diff_eq!(value, 2.0 * eps * (1.0 / eps).atan(), epsilon = 1e-10);
    }

    #[test]
    fn breakpoints_help_with_discontinuities() {
        let options = QuadOptions {
            points: vec![0.3],
            ..Default::default()
        };
        let output = quad(|x| if x < 0.3 { 1.0 } else { 0.0 }, 0.0, 1.0, &options).unwrap();
        assert_abs_diff_eq!(output.integral, 0.3, epsilon = 1e-14);
        assert_eq!(output.subintervals, 2);
    }

    #[test]
    fn reports_non_convergence() {
        let options = QuadOptions {
            limit: 2,
            epsrel: 1e-14,
            ..Default::default()
        };
        let result = quad(|x| (1.0 / (x + 1e-9)).sin(), 0.0, 1.0, &options);
        assert!(matches!(result, Err(Error::NotConverged { limit: 2, .. })));
    }

    #[test]
    fn reports_non_finite_integrand() {
        let result = quad(
            |x| if x > 0.25 { f64::NAN } else { x },
            0.0,
            1.0,
            &QuadOptions::default(),
        );
        assert!(matches!(result, Err(Error::NotFinite { .. })));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let result = quad(|x| x, 1.0, 0.0, &QuadOptions::default());
        assert!(matches!(result, Err(Error::InvalidBounds { .. })));
    }
}
