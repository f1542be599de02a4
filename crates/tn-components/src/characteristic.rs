//! Characteristic lines: opaque scalar functions used by off-design parameters
//! and bus scaling.

use std::fmt;
use std::sync::Arc;

use crate::error::{ComponentError, ComponentResult};

type CurveFn = dyn Fn(f64) -> f64 + Send + Sync;

/// A scalar characteristic `y = f(x)`.
#[derive(Clone)]
pub struct Characteristic {
    f: Arc<CurveFn>,
    label: &'static str,
    points: Option<Arc<Points>>,
}

#[derive(Debug)]
struct Points {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Characteristic({})", self.label)
    }
}

impl Characteristic {
    /// Wrap an arbitrary function.
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            f: Arc::new(f),
            label: "fn",
            points: None,
        }
    }

    pub fn identity() -> Self {
        Self {
            f: Arc::new(|x| x),
            label: "identity",
            points: None,
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            f: Arc::new(move |_| value),
            label: "constant",
            points: None,
        }
    }

    /// Piecewise-linear line through `(x, y)` points, held constant past both ends.
    pub fn from_points(x: &[f64], y: &[f64]) -> ComponentResult<Self> {
        if x.len() != y.len() || x.len() < 2 {
            return Err(ComponentError::InvalidArg {
                what: "characteristic needs at least two (x, y) pairs",
            });
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(ComponentError::NonPhysical {
                what: "non-finite characteristic point",
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ComponentError::InvalidArg {
                what: "characteristic x values must be strictly increasing",
            });
        }
        let points = Arc::new(Points {
            x: x.to_vec(),
            y: y.to_vec(),
        });
        let line = Arc::clone(&points);
        Ok(Self {
            f: Arc::new(move |v| interpolate(&line.x, &line.y, v)),
            label: "line",
            points: Some(points),
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        (self.f)(x)
    }

    /// Positive `x` with `x · f(x) = target`, for a line along which that
    /// product rises.
    ///
    /// The product is quadratic on every segment and linear on the clamped
    /// ends, so the root is exact and the inverse is smooth between knots.
    /// Returns `None` for arbitrary functions, for a non-positive target, or
    /// when the product falls on some segment before the target is reached.
    pub fn invert_product(&self, target: f64) -> Option<f64> {
        let Points { x, y } = self.points.as_deref()?;
        let last = x.len() - 1;
        if target <= 0.0 || x[0] <= 0.0 || y[0] <= 0.0 || y[last] <= 0.0 {
            return None;
        }
        if target <= x[0] * y[0] {
            return Some(target / y[0]);
        }
        for i in 0..last {
            let slope = (y[i + 1] - y[i]) / (x[i + 1] - x[i]);
            let offset = y[i] - slope * x[i];
            // d(x · f)/dx = offset + 2 · slope · x, linear on the segment
            if offset + 2.0 * slope * x[i] <= 0.0 || offset + 2.0 * slope * x[i + 1] <= 0.0 {
                return None;
            }
            if target <= x[i + 1] * y[i + 1] {
                let disc = offset * offset + 4.0 * slope * target;
                let root = 2.0 * target / (offset + disc.max(0.0).sqrt());
                return Some(root.clamp(x[i], x[i + 1]));
            }
        }
        Some(target / y[last])
    }
}

fn interpolate(x: &[f64], y: &[f64], v: f64) -> f64 {
    let last = x.len() - 1;
    if v <= x[0] {
        return y[0];
    }
    if v >= x[last] {
        return y[last];
    }
    let i = x.partition_point(|xi| *xi <= v).clamp(1, last);
    let t = (v - x[i - 1]) / (x[i] - x[i - 1]);
    y[i - 1] + t * (y[i] - y[i - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn line_interpolates_and_clamps() {
        let line = Characteristic::from_points(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0]).unwrap();
        assert_eq!(line.eval(0.5), 5.0);
        assert_eq!(line.eval(1.5), 20.0);
        assert_eq!(line.eval(1.0), 10.0);
        assert_eq!(line.eval(-3.0), 0.0);
        assert_eq!(line.eval(9.0), 30.0);
    }

    #[test]
    fn invalid_points_are_rejected() {
        assert!(Characteristic::from_points(&[0.0], &[1.0]).is_err());
        assert!(Characteristic::from_points(&[0.0, 0.0], &[1.0, 2.0]).is_err());
        assert!(Characteristic::from_points(&[0.0, 1.0], &[1.0]).is_err());
        assert!(Characteristic::from_points(&[0.0, f64::NAN], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn closures_and_constants() {
        assert_eq!(Characteristic::identity().eval(0.7), 0.7);
        assert_eq!(Characteristic::constant(2.0).eval(-1.0), 2.0);
        let square = Characteristic::new(|x| x * x);
        assert_eq!(square.eval(3.0), 9.0);
        assert_eq!(format!("{square:?}"), "Characteristic(fn)");
    }

    #[test]
    fn product_inverse_crosses_the_knots() {
        let xs = [0.5, 0.75, 0.9, 1.0, 1.05];
        let ys = [2.60, 2.45, 2.37, 2.33, 2.32];
        let line = Characteristic::from_points(&xs, &ys).unwrap();
        for (xi, yi) in xs.iter().zip(&ys) {
            let root = line.invert_product(xi * yi).unwrap();
            assert!((root - xi).abs() < 1e-12, "{root} vs {xi}");
        }
        // clamped ends
        assert!((line.invert_product(0.2 * 2.60).unwrap() - 0.2).abs() < 1e-12);
        assert!((line.invert_product(1.5 * 2.32).unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn product_inverse_needs_a_rising_line() {
        assert_eq!(Characteristic::new(|x| x).invert_product(1.0), None);
        let line = Characteristic::from_points(&[0.5, 1.0], &[2.0, 2.0]).unwrap();
        assert_eq!(line.invert_product(-1.0), None);
        // x · f(x) peaks inside the segment
        let falling = Characteristic::from_points(&[0.5, 1.0], &[2.0, 0.1]).unwrap();
        assert_eq!(falling.invert_product(1.05), None);
    }

    proptest! {
        #[test]
        fn product_inverse_solves_inside_the_range(target in 0.1f64..5.0) {
            let xs = [0.5, 0.75, 0.9, 1.0, 1.05];
            let ys = [0.58, 0.55, 0.53, 0.52, 0.52];
            let line = Characteristic::from_points(&xs, &ys).unwrap();
            let x = line.invert_product(target).unwrap();
            prop_assert!((x * line.eval(x) - target).abs() < 1e-12 * target.max(1.0));
        }

        #[test]
        fn line_stays_within_point_range(v in -10.0f64..10.0) {
            let xs = [0.5, 0.75, 0.9, 1.0, 1.05];
            let ys = [2.60, 2.45, 2.37, 2.33, 2.31];
            let line = Characteristic::from_points(&xs, &ys).unwrap();
            let y = line.eval(v);
            prop_assert!((2.31..=2.60).contains(&y));
        }

        #[test]
        fn line_hits_every_point(i in 0usize..5) {
            let xs = [0.5, 0.75, 0.9, 1.0, 1.05];
            let ys = [0.14, 0.12, 0.11, 0.10, 0.10];
            let line = Characteristic::from_points(&xs, &ys).unwrap();
            prop_assert!((line.eval(xs[i]) - ys[i]).abs() < 1e-12);
        }
    }
}
