//! Documented accuracy of the ideal-mixture rules.
//!
//! Bounds on the relative deviation of an ideal mixture of N2, O2 and Ar from
//! CoolProp's pseudo-pure dry air, for enthalpy and entropy (both relative to a
//! common reference state), specific volume and viscosity. Real-gas
//! interaction terms are neglected by the mixing rules, so the bounds widen at
//! high pressure and low temperature.

/// Maximum expected relative deviation at pressure `p` [Pa] and temperature `t` [K].
pub fn deviation_bound(p: f64, t: f64) -> f64 {
    if p <= 1e6 {
        0.015
    } else if p < 5e6 {
        match t {
            t if t < 500.0 => 0.05,
            t if t < 1000.0 => 0.04,
            t if t < 1500.0 => 0.03,
            _ => 0.025,
        }
    } else if t < 500.0 {
        0.1
    } else if t < 1000.0 {
        0.075
    } else {
        0.025
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_pressure_is_tight_everywhere() {
        assert_eq!(deviation_bound(1e5, 250.0), 0.015);
        assert_eq!(deviation_bound(1e6, 2000.0), 0.015);
    }

    #[test]
    fn bounds_widen_at_high_pressure_and_low_temperature() {
        assert_eq!(deviation_bound(2e6, 300.0), 0.05);
        assert_eq!(deviation_bound(2e6, 1200.0), 0.03);
        assert_eq!(deviation_bound(2e6, 1800.0), 0.025);
        assert_eq!(deviation_bound(1e7, 300.0), 0.1);
        assert_eq!(deviation_bound(1e7, 700.0), 0.075);
        assert_eq!(deviation_bound(1e7, 1800.0), 0.025);
    }
}
