//! Noise weighting functions.
//!
//! A weighting states how expensive quantization noise is at each normalized
//! frequency in `[0, 0.5]`. It is either an arbitrary function, the squared
//! magnitude response of a filter, or a product of weightings.

use std::sync::Arc;

use crate::poly::{
    Ba,
    TransferFunction,
    Zpk,
};

#[derive(Clone, derive_more::Debug)]
pub enum Weighting {
    Function(#[debug(skip)] Arc<dyn Fn(f64) -> f64 + Send + Sync>),
    /// `|H(e^{2πif})|²`
    Filter(TransferFunction),
    Product(Vec<Weighting>),
}

impl Weighting {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Uniform weighting.
    pub fn constant(value: f64) -> Self {
        Self::function(move |_| value)
    }

    pub fn eval(&self, frequency: f64) -> f64 {
        match self {
            Self::Function(f) => f(frequency),
            Self::Filter(tf) => tf.magnitude_squared(frequency),
            Self::Product(factors) => {
                factors
                    .iter()
                    .map(|factor| factor.eval(frequency))
                    .product()
            }
        }
    }
}

impl From<TransferFunction> for Weighting {
    fn from(value: TransferFunction) -> Self {
        Self::Filter(value)
    }
}

impl From<Zpk> for Weighting {
    fn from(value: Zpk) -> Self {
        Self::Filter(value.into())
    }
}

impl From<Ba> for Weighting {
    fn from(value: Ba) -> Self {
        Self::Filter(value.into())
    }
}

/// Pointwise product of weightings.
pub fn mult_weightings<I>(weightings: I) -> Weighting
where
    I: IntoIterator,
    I::Item: Into<Weighting>,
{
    Weighting::Product(weightings.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    use super::{
        Weighting,
        mult_weightings,
    };
    use crate::poly::{
        Ba,
        Zpk,
    };

    #[test]
    fn product_of_unit_weightings_is_one() {
        let w = mult_weightings([Weighting::constant(1.0), Weighting::function(|_| 1.0)]);
        for i in 0..=50 {
            let f = i as f64 * 0.01;
            assert_abs_diff_eq!(w.eval(f), 1.0);
        }
    }

    #[test]
    fn filter_weighting_is_magnitude_squared() {
        // first order difference: |1 - e^{-2πif}|² = 4 sin²(πf)
        let w = Weighting::from(Ba::new(vec![1.0, -1.0], vec![1.0, 0.0]));
        for f in [0.0, 0.1, 0.25, 0.5] {
            let expected = 4.0 * (std::f64::consts::PI * f).sin().powi(2);
            assert_abs_diff_eq!(w.eval(f), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn product_mixes_functions_and_filters() {
        let filter = Zpk::new(vec![Complex64::new(1.0, 0.0)], vec![Complex64::new(0.0, 0.0)], 1.0);
        let w = mult_weightings([Weighting::constant(2.0), filter.clone().into()]);
        let f = 0.2;
        let expected = 2.0 * Weighting::from(filter).eval(f);
        assert_abs_diff_eq!(w.eval(f), expected, epsilon = 1e-12);
    }

    #[test]
    fn empty_product_is_one() {
        let w = mult_weightings(Vec::<Weighting>::new());
        assert_eq!(w.eval(0.3), 1.0);
    }
}
