//! Options for the integrator, the SDP solver and the zero optimizer.
//!
//! All option structs are plain values. [`Default`] gives the documented
//! defaults; copy and modify them per call. They can also be read from TOML,
//! in which case unknown keys are rejected.

use std::{
    fs::File,
    io::{
        BufReader,
        Read,
    },
    path::Path,
};

use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid options")]
    Toml(#[from] toml::de::Error),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Adaptive quadrature parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuadOptions {
    /// Absolute error tolerance. Default `1e-14`.
    pub epsabs: f64,
    /// Relative error tolerance. Default `1e-9`.
    pub epsrel: f64,
    /// Maximum number of subintervals. Default `100`.
    pub limit: usize,
    /// Points inside the integration interval where the integrand has
    /// singularities or discontinuities. Default none.
    pub points: Vec<f64>,
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self {
            epsabs: 1e-14,
            epsrel: 1e-9,
            limit: 100,
            points: vec![],
        }
    }
}

/// Interior-point SDP solver parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    /// Maximum number of barrier (outer) iterations. Default `100`.
    #[serde(alias = "maxiters")]
    pub max_iters: usize,
    /// Absolute duality gap at which the solver stops. Default `1e-7`.
    pub abstol: f64,
    /// Relative duality gap at which the solver stops. Default `1e-6`.
    pub reltol: f64,
    /// Newton decrement below which a centering step is complete. Default
    /// `1e-6`.
    pub feastol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            abstol: 1e-7,
            reltol: 1e-6,
            feastol: 1e-6,
        }
    }
}

/// Options of the convex NTF synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvexOptions {
    #[serde(alias = "cvxopt_opts")]
    pub solver: SolverOptions,
    /// Log solver progress at INFO instead of DEBUG. Default `true`.
    pub show_progress: bool,
    /// Clamp the quadratic form to positive semidefinite. Default `true`.
    pub fix_pos: bool,
}

impl Default for ConvexOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
            show_progress: true,
            fix_pos: true,
        }
    }
}

/// Options for designs that start from a noise weighting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightingOptions {
    #[serde(alias = "quad_opts")]
    pub quad: QuadOptions,
    pub convex: ConvexOptions,
}

/// Nelder–Mead parameters for the zero optimization of the classical
/// synthesizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZeroOptimizerOptions {
    /// Default `100`.
    pub max_iters: u64,
    /// Standard deviation of the simplex costs at which the search stops.
    /// Default `1e-6`.
    pub sd_tolerance: f64,
    /// Offset of the initial simplex vertices. Default `0.05`.
    pub initial_step: f64,
}

impl Default for ZeroOptimizerOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            sd_tolerance: 1e-6,
            initial_step: 0.05,
        }
    }
}

pub fn from_toml_str<T: DeserializeOwned>(s: &str) -> Result<T, Error> {
    Ok(toml::from_str(s)?)
}

pub fn from_reader<T: DeserializeOwned>(mut reader: impl Read) -> Result<T, Error> {
    let mut s = String::new();
    reader.read_to_string(&mut s)?;
    from_toml_str(&s)
}

pub fn from_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Error> {
    tracing::debug!(path = %path.as_ref().display(), "Loading options from file");
    from_reader(BufReader::new(File::open(path)?))
}
