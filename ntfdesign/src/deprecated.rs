//! Old names of the weighting based synthesis functions.

use crate::{
    config::{
        ConvexOptions,
        QuadOptions,
        WeightingOptions,
    },
    integrate,
    ntf::{
        self,
        Normalization,
        convex::{
            ntf_fir_from_q0,
            ntf_fir_weighting,
        },
    },
    poly::Zpk,
    q0::q0_weighting,
    weighting::Weighting,
};

fn superseded(old: &str, new: &str) {
    tracing::warn!(old, new, "function superseded, use the new name instead");
}

#[deprecated(note = "use `q0_weighting`")]
pub fn q0_from_noise_weighting(
    order: usize,
    weighting: impl Into<Weighting>,
    options: &QuadOptions,
) -> Result<Vec<f64>, integrate::Error> {
    superseded("q0_from_noise_weighting", "q0_weighting");
    q0_weighting(order, weighting, options)
}

#[deprecated(note = "use `ntf_fir_from_q0`")]
pub fn synthesize_ntf_from_q0(
    q0: &[f64],
    h_inf: f64,
    normalize: Normalization,
    options: &ConvexOptions,
) -> Result<Zpk, ntf::Error> {
    superseded("synthesize_ntf_from_q0", "ntf_fir_from_q0");
    ntf_fir_from_q0(q0, h_inf, normalize, options)
}

#[deprecated(note = "use `ntf_fir_weighting`")]
pub fn synthesize_ntf_from_noise_weighting(
    order: usize,
    weighting: impl Into<Weighting>,
    h_inf: f64,
    normalize: Normalization,
    options: &WeightingOptions,
) -> Result<Zpk, ntf::Error> {
    superseded("synthesize_ntf_from_noise_weighting", "ntf_fir_weighting");
    ntf_fir_weighting(order, weighting, h_inf, normalize, options)
}
