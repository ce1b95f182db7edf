//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Values `P_n(x)`, `P_{n - 1}(x)` and the derivative `P_n'(x)` of the Legendre polynomials.
///
/// The derivative formula is singular at `|x| == 1`, so only points in the open
/// interval `(-1, 1)` are supported.
fn legendre(n: usize, x: f64) -> (f64, f64, f64) {
    // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
    let mut p_current = 1.0;
    let mut p_previous = 0.0;
    for m in 1..=n {
        let m = m as f64;
        let p_next = ((2.0 * m - 1.0) * x * p_current - (m - 1.0) * p_previous) / m;
        p_previous = p_current;
        p_current = p_next;
    }

    // P_n'(x) = n (x P_n(x) - P_{n - 1}(x)) / (x^2 - 1)
    let derivative = n as f64 * (x * p_current - p_previous) / (x * x - 1.0);
    (p_current, p_previous, derivative)
}

/// Gauss–Legendre quadrature for the reference interval `[-1, 1]`.
///
/// The `n`-point rule integrates polynomials of degree up to `2n - 1` exactly. Points are
/// returned in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    // Roots are symmetric about the origin, so only the first half is computed.
    for i in 0..(n + 1) / 2 {
        let x = if 2 * i + 1 == n {
            0.0
        } else {
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            for _ in 0..MAX_NEWTON_ITERATIONS {
                let (p, _, dp) = legendre(n, x);
                let dx = -p / dp;
                x += dx;
                if dx.abs() <= 1e-15 {
                    break;
                }
            }
            x
        };

        // w = 2 (1 - x^2) / (n P_{n - 1}(x))^2
        let (_, p_previous, _) = legendre(n, x);
        let np = n as f64 * p_previous;
        let w = 2.0 * (1.0 - x * x) / (np * np);

        // The initial guesses run from the right end of the interval towards the middle
        points[n - 1 - i] = [x];
        weights[n - 1 - i] = w;
        points[i] = [-x];
        weights[i] = w;
    }

    (weights, points)
}
