//! First row of the quadratic form used in NTF optimization.
//!
//! The matrix `Q` weighs the NTF numerator coefficients so that
//! `bᵀ·Q·b` is the weighted noise power. It is symmetric Toeplitz, so only
//! its first row (`P + 1` values) is computed.

use crate::{
    config::QuadOptions,
    ft::idtft_hermitian_at,
    integrate,
    weighting::Weighting,
};

/// Raw autocorrelation of the impulse response `h` at lags `0..=order`.
///
/// Lags past the length of the response are zero.
pub fn q0_from_filter_imp_response(order: usize, h: &[f64]) -> Vec<f64> {
    (0..=order)
        .map(|lag| {
            h.iter()
                .zip(h.iter().skip(lag))
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// `Q` for a filter given by its magnitude response `|H(f)|`, `f ∈ [0, 0.5]`.
pub fn q0_from_filter_mag_response<F>(
    order: usize,
    magnitude: F,
    options: &QuadOptions,
) -> Result<Vec<f64>, integrate::Error>
where
    F: Fn(f64) -> f64 + Send + Sync + 'static,
{
    q0_weighting(
        order,
        Weighting::function(move |f| magnitude(f).powi(2)),
        options,
    )
}

/// `Q[k]` is the inverse DTFT of the noise weighting at lag `k`.
pub fn q0_weighting(
    order: usize,
    weighting: impl Into<Weighting>,
    options: &QuadOptions,
) -> Result<Vec<f64>, integrate::Error> {
    let weighting = weighting.into();
    tracing::debug!(order, ?weighting, "computing quadratic form");
    idtft_hermitian_at(
        |f| weighting.eval(f),
        (0..=order).map(|k| k as f64),
        options,
        1.0,
    )
}
