//! Optimal NTF zero positions.
//!
//! The normalized positions in `[−1, 1]` minimize the integrated noise power
//! of an NTF with `n` zeros over the signal band.

use nalgebra::DMatrix;

const NEWTON_MAX_ITERS: usize = 100;

/// Which of the two optimal spacings to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alternation {
    /// Zeros spread over the whole band.
    #[default]
    Spread,
    /// Like [`Spread`](Self::Spread), but a pair of zeros stays at DC when
    /// the number of zeros is even.
    SpreadWithDc,
}

/// Normalized optimal zero positions, sorted ascending.
///
/// `Spread` gives the roots of the Legendre polynomial of degree `n`.
/// `SpreadWithDc` with even `n` gives a double zero at 0 and the roots of the
/// degree `n − 2` polynomial orthogonal under the weight `x⁴`.
pub fn optzeros(n: usize, alternation: Alternation) -> Vec<f64> {
    let mut zeros = match alternation {
        Alternation::SpreadWithDc if n >= 2 && n % 2 == 0 => {
            let mut zeros = vec![0.0, 0.0];
            zeros.extend(weighted_orthogonal_roots(n - 2, 4));
            zeros
        }
        _ => gauss_legendre_nodes_weights(n).0,
    };
    zeros.sort_by(f64::total_cmp);

    // exact mirror symmetry, so the zeros end up as exact conjugates
    for i in 0..n / 2 {
        let r = 0.5 * (zeros[n - 1 - i] - zeros[i]);
        zeros[i] = -r;
        zeros[n - 1 - i] = r;
    }
    if n % 2 == 1 {
        zeros[n / 2] = 0.0;
    }

    zeros
}

/// Gauss–Legendre nodes and weights on `[−1, 1]`.
pub(crate) fn gauss_legendre_nodes_weights(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    for i in 0..n.div_ceil(2) {
        // chebyshev guess
        let mut z = ((i as f64 + 0.75) / (n as f64 + 0.5) * std::f64::consts::PI).cos();

        for _ in 0..NEWTON_MAX_ITERS {
            let (p, dp) = legendre_p_and_dp(n, z);
            let z_new = z - p / dp;
            let done = (z_new - z).abs() < 1e-15;
            z = z_new;
            if done {
                break;
            }
        }
        if n % 2 == 1 && i == n / 2 {
            z = 0.0;
        }

        let (_, dp) = legendre_p_and_dp(n, z);
        let w = 2.0 / ((1.0 - z * z) * dp * dp);

        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// `P_n(x)` and its derivative.
fn legendre_p_and_dp(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }

    let mut p_prev = 1.0;
    let mut p = x;
    for k in 2..=n {
        let k = k as f64;
        let p_next = ((2.0 * k - 1.0) * x * p - (k - 1.0) * p_prev) / k;
        p_prev = p;
        p = p_next;
    }

    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// Roots of the degree `m` monic polynomial orthogonal on `[−1, 1]` under the
/// weight `x^power`.
///
/// The recurrence coefficients come from the Stieltjes procedure on a
/// Gauss–Legendre discretization that is exact for the needed degree, and
/// the roots are the eigenvalues of the Jacobi matrix.
fn weighted_orthogonal_roots(m: usize, power: i32) -> Vec<f64> {
    if m == 0 {
        return vec![];
    }

    let (nodes, weights) = gauss_legendre_nodes_weights(m + power as usize + 4);
    let weights = nodes
        .iter()
        .zip(&weights)
        .map(|(x, w)| w * x.powi(power))
        .collect::<Vec<_>>();

    let inner = |a: &[f64], b: &[f64]| -> f64 {
        a.iter()
            .zip(b)
            .zip(&weights)
            .map(|((a, b), w)| a * b * w)
            .sum()
    };

    let mut alpha = Vec::with_capacity(m);
    let mut beta = Vec::with_capacity(m);

    let mut previous = vec![0.0; nodes.len()];
    let mut current = vec![1.0; nodes.len()];
    let mut norm_previous = 1.0;

    for k in 0..m {
        let norm = inner(&current, &current);
        let x_current = current
            .iter()
            .zip(&nodes)
            .map(|(p, x)| p * x)
            .collect::<Vec<_>>();
        let a = inner(&x_current, &current) / norm;
        let b = if k == 0 { 0.0 } else { norm / norm_previous };
        alpha.push(a);
        beta.push(b);

        let next = x_current
            .iter()
            .zip(&current)
            .zip(&previous)
            .map(|((xp, p), q)| xp - a * p - b * q)
            .collect::<Vec<_>>();
        previous = std::mem::replace(&mut current, next);
        norm_previous = norm;
    }

    let jacobi = DMatrix::from_fn(m, m, |i, j| {
        if i == j {
            alpha[i]
        }
        else if i == j + 1 {
            beta[i].sqrt()
        }
        else if j == i + 1 {
            beta[j].sqrt()
        }
        else {
            0.0
        }
    });

    jacobi.symmetric_eigenvalues().iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{
        Alternation,
        gauss_legendre_nodes_weights,
        optzeros,
    };

    fn assert_zeros(actual: Vec<f64>, expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(a, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn gauss_legendre_integrates_polynomials() {
        let (nodes, weights) = gauss_legendre_nodes_weights(5);
        let integral = nodes
            .iter()
            .zip(&weights)
            .map(|(x, w)| w * x.powi(8))
            .sum::<f64>();
        assert_abs_diff_eq!(integral, 2.0 / 9.0, epsilon = 1e-14);
        assert_abs_diff_eq!(weights.iter().sum::<f64>(), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn spread_zeros() {
        assert_zeros(optzeros(1, Alternation::Spread), &[0.0]);
        let r = (1.0f64 / 3.0).sqrt();
        assert_zeros(optzeros(2, Alternation::Spread), &[-r, r]);
        let r = 0.6f64.sqrt();
        assert_zeros(optzeros(3, Alternation::Spread), &[-r, 0.0, r]);

        let d = (9.0f64 / 49.0 - 3.0 / 35.0).sqrt();
        let outer = (3.0 / 7.0 + d).sqrt();
        let inner = (3.0 / 7.0 - d).sqrt();
        assert_zeros(optzeros(4, Alternation::Spread), &[-outer, -inner, inner, outer]);
    }

    #[test]
    fn spread_with_dc_zeros() {
        assert_zeros(optzeros(2, Alternation::SpreadWithDc), &[0.0, 0.0]);

        let r = (5.0f64 / 7.0).sqrt();
        assert_zeros(optzeros(4, Alternation::SpreadWithDc), &[-r, 0.0, 0.0, r]);

        let d = 56f64.sqrt() / 33.0;
        let outer = (7.0 / 11.0 + d).sqrt();
        let inner = (7.0 / 11.0 - d).sqrt();
        assert_zeros(
            optzeros(6, Alternation::SpreadWithDc),
            &[-outer, -inner, 0.0, 0.0, inner, outer],
        );
    }

    #[test]
    fn odd_order_ignores_alternation() {
        assert_eq!(
            optzeros(5, Alternation::SpreadWithDc),
            optzeros(5, Alternation::Spread)
        );
    }
}
