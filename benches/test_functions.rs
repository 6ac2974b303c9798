//! Black-box objectives on the unit hyper-rectangle, oriented for
//! maximization.
//!
//! Classic benchmark functions are minimization problems on their own
//! domains; here each is mapped onto `[0,1]^d` and negated so that the
//! engine's maximization convention applies.

/// Concave sphere with its maximum 0 at the center of the box.
pub fn parabola(x: &[f64]) -> f64 {
    -x.iter().map(|v| (v - 0.5).powi(2)).sum::<f64>()
}

/// One-dimensional multi-modal benchmark `0.5 sin(13x) sin(27x) + 0.5`.
///
/// Global maximum ≈ 0.975599 near x ≈ 0.8675, with several competitive
/// local maxima.
pub fn sin_product(x: &[f64]) -> f64 {
    0.5 * (13.0 * x[0]).sin() * (27.0 * x[0]).sin() + 0.5
}

/// Negated Rosenbrock, inputs mapped from `[0,1]` to `[-2,2]`.
///
/// Global maximum 0 at `x_i = 0.75` (the banana valley's `z_i = 1`).
pub fn rosenbrock(x: &[f64]) -> f64 {
    let z: Vec<f64> = x.iter().map(|v| 4.0 * v - 2.0).collect();
    let mut sum = 0.0;
    for i in 0..z.len() - 1 {
        sum += 100.0 * (z[i + 1] - z[i] * z[i]).powi(2) + (1.0 - z[i]).powi(2);
    }
    -sum
}

/// Negated Rastrigin, inputs mapped from `[0,1]` to `[-5.12,5.12]`.
///
/// Global maximum 0 at the center of the box, surrounded by a regular
/// grid of local maxima.
#[allow(clippy::cast_precision_loss)]
pub fn rastrigin(x: &[f64]) -> f64 {
    let a = 10.0;
    let sum: f64 = x
        .iter()
        .map(|v| {
            let z = 10.24 * v - 5.12;
            z * z - a * (2.0 * std::f64::consts::PI * z).cos()
        })
        .sum();
    -(a * x.len() as f64 + sum)
}
