use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Mantissa bits discarded by [`quantize`].
///
/// Keeps 44 of 52 mantissa bits, i.e. a relative granularity of about 5.7e-14.
pub const QUANTIZE_DROPPED_BITS: u32 = 8;

/// Deterministic relative rounding of a float into a hashable key.
///
/// Values within a few ulps of each other share a key; values further apart
/// than ~6e-14 relative never do. `-0.0` and `0.0` map to the same key.
pub fn quantize(v: Real) -> i64 {
    if v == 0.0 {
        return 0;
    }
    let half = 1_u64 << (QUANTIZE_DROPPED_BITS - 1);
    let magnitude = (v.abs().to_bits().saturating_add(half) >> QUANTIZE_DROPPED_BITS) as i64;
    if v.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quantize_is_monotone(a in 1e-3_f64..1e8, b in 1e-3_f64..1e8) {
            if a < b {
                prop_assert!(quantize(a) <= quantize(b));
            }
        }

        #[test]
        fn distant_values_never_collide(v in 1.0_f64..1e7) {
            prop_assert_ne!(quantize(v), quantize(v * (1.0 + 1e-10)));
        }
    }
}
