//! Escape-time iteration of `z = z² + c` starting at `z = 0`.

use serde::{Deserialize, Serialize};

use crate::viewport::Complex;

/// Iteration budget per point
pub const MAX_ITERATIONS: u32 = 100;
/// Squared modulus past which the orbit is known to diverge (|z| > 2)
pub const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// Outcome of iterating one point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeResult {
    /// The orbit stayed inside the escape radius for the whole budget
    pub bounded: bool,
    /// Completed iterations before escape, or `MAX_ITERATIONS` when bounded
    pub iterations: u32,
}

impl EscapeResult {
    #[inline]
    pub fn escaped(iterations: u32) -> Self {
        Self {
            bounded: false,
            iterations,
        }
    }

    #[inline]
    pub fn bounded() -> Self {
        Self {
            bounded: true,
            iterations: MAX_ITERATIONS,
        }
    }
}

/// Iterate the point `cx + i·cy`.
///
/// The escape test runs before the update of iteration `i`, so a point that
/// is already outside the radius reports `0` iterations.
#[inline]
pub fn evaluate(cx: f64, cy: f64) -> EscapeResult {
    let (mut x, mut y) = (0.0f64, 0.0f64);

    for i in 0..MAX_ITERATIONS {
        let xx = x * x;
        let yy = y * y;
        let xy = x * y;

        if xx + yy > ESCAPE_RADIUS_SQR {
            return EscapeResult::escaped(i);
        }

        x = xx - yy + cx;
        y = 2.0 * xy + cy;
    }

    EscapeResult::bounded()
}

#[inline]
pub fn evaluate_point(c: Complex) -> EscapeResult {
    evaluate(c.re, c.im)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_bounded() {
        assert_eq!(evaluate(0.0, 0.0), EscapeResult::bounded());
        assert_eq!(evaluate(0.0, 0.0).iterations, 100);
    }

    #[test]
    fn test_immediate_escape() {
        // |c|² = 9 is only seen after the first update.
        assert_eq!(evaluate(3.0, 0.0), EscapeResult::escaped(1));
    }

    #[test]
    fn test_escape_counts_completed_iterations() {
        // z1 = 2 + 0i (|z|² = 4, not > 4), z2 = 6 → escapes at i = 2.
        assert_eq!(evaluate(2.0, 0.0), EscapeResult::escaped(2));
        // z1 = c, |z1|² = 4.01 → escapes at i = 1.
        assert_eq!(evaluate(2.0, 0.1).iterations, 1);
    }

    #[test]
    fn test_main_cardioid_and_bulb() {
        assert!(evaluate(-1.0, 0.0).bounded);
        assert!(evaluate(-0.1, 0.1).bounded);
        assert!(evaluate(0.25, 0.0).bounded);
    }

    #[test]
    fn test_escaped_iterations_below_budget() {
        for k in 0..200 {
            let c = Complex::new(-2.5 + k as f64 * 0.025, 0.75);
            let r = evaluate_point(c);
            if r.bounded {
                assert_eq!(r.iterations, MAX_ITERATIONS);
            } else {
                assert!(r.iterations < MAX_ITERATIONS);
            }
        }
    }
}
