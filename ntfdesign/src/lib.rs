//! Noise transfer function design for delta-sigma modulators.
//!
//! Two synthesis paths are provided:
//!
//! - [`ntf::convex`] designs FIR and hybrid NTFs from a noise weighting by
//!   building a quadratic form ([`q0`]) and solving a semidefinite program
//!   ([`sdp`]) under a peak gain bound.
//! - [`ntf::classical`] is the iterative pole-placement algorithm with
//!   optional zero optimization for lowpass and bandpass modulators.
//!
//! Both return the NTF as a [`Zpk`].

pub mod config;
pub mod deprecated;
pub mod ft;
pub mod integrate;
pub mod linalg;
pub mod ntf;
pub mod poly;
pub mod q0;
pub mod sdp;
pub mod util;
pub mod weighting;

pub use crate::{
    config::{
        ConvexOptions,
        QuadOptions,
        SolverOptions,
        WeightingOptions,
        ZeroOptimizerOptions,
    },
    ntf::{
        Normalization,
        classical::{
            Alternation,
            ApproximationWarning,
            ClassicalDesign,
            ZeroPlacement,
            synthesize_ntf1,
        },
        convex::{
            ntf_fir_from_q0,
            ntf_fir_weighting,
            ntf_hybrid_from_q0,
            ntf_hybrid_weighting,
        },
    },
    poly::{
        Ba,
        TransferFunction,
        Zpk,
    },
    q0::{
        q0_from_filter_imp_response,
        q0_from_filter_mag_response,
        q0_weighting,
    },
    weighting::{
        Weighting,
        mult_weightings,
    },
};
