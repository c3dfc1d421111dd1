use num_complex::Complex64;

/// Default tolerance used to decide whether a value is zero.
pub const NEGLIGIBLE: f64 = 100.0 * f64::EPSILON;

#[inline(always)]
pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// `n` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let steps = n.saturating_sub(1).max(1) as f64;
    (0..n).map(move |i| lerp(i as f64 / steps, start, end))
}

#[inline]
pub fn is_negligible(x: f64, tolerance: f64) -> bool {
    x.abs() < tolerance
}

/// Sets real and imaginary parts that are negligible to exactly zero.
#[inline]
pub fn chop(z: Complex64, tolerance: f64) -> Complex64 {
    let chop_part = |x: f64| {
        if is_negligible(x, tolerance) {
            0.0
        }
        else {
            x
        }
    };
    Complex64::new(chop_part(z.re), chop_part(z.im))
}

/// Magnitude in dB, treating the value as a voltage.
#[inline]
pub fn dbv(x: f64) -> f64 {
    20.0 * x.abs().log10()
}

/// Power in dB.
#[inline]
pub fn dbp(x: f64) -> f64 {
    10.0 * x.log10()
}
