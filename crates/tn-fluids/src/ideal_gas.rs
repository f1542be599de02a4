//! Ideal-gas property source built on NASA 7-coefficient polynomials.
//!
//! Coefficients are the GRI-Mech 3.0 thermodynamic data set. Enthalpies include
//! the standard enthalpy of formation (elements at 298.15 K form the datum), and
//! entropies are absolute at the 1 bar standard state. Viscosity follows
//! Sutherland's law. No condensation is modelled: water stays a vapour at every
//! temperature.

use crate::error::{FluidError, FluidResult};
use crate::source::{PropertySource, PureProperty, validation};
use crate::species::Species;
use tn_core::units::constants::{P_STANDARD, R_UNIVERSAL};

/// One species' NASA polynomial pair, split at `t_mid`.
#[derive(Debug, Clone, Copy)]
pub struct NasaPolynomial {
    pub t_mid: f64,
    pub low: [f64; 7],
    pub high: [f64; 7],
}

impl NasaPolynomial {
    fn coeffs(&self, t: f64) -> &[f64; 7] {
        if t < self.t_mid { &self.low } else { &self.high }
    }

    /// cp / R
    pub fn cp_r(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] + t * (a[1] + t * (a[2] + t * (a[3] + t * a[4])))
    }

    /// h / (R T)
    pub fn h_rt(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] + t * (a[1] / 2.0 + t * (a[2] / 3.0 + t * (a[3] / 4.0 + t * a[4] / 5.0))) + a[5] / t
    }

    /// s° / R at the standard pressure
    pub fn s_r(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] * t.ln() + t * (a[1] + t * (a[2] / 2.0 + t * (a[3] / 3.0 + t * a[4] / 4.0))) + a[6]
    }
}

/// Sutherland viscosity law parameters.
#[derive(Debug, Clone, Copy)]
struct Sutherland {
    mu_ref: f64,
    t_ref: f64,
    s: f64,
}

impl Sutherland {
    fn viscosity(&self, t: f64) -> f64 {
        self.mu_ref * (t / self.t_ref).powf(1.5) * (self.t_ref + self.s) / (t + self.s)
    }
}

const T_MIN: f64 = 200.0;
const T_MAX: f64 = 3500.0;

fn polynomial(species: Species) -> Option<NasaPolynomial> {
    let poly = match species {
        Species::O2 => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                3.78245636e+00,
                -2.99673416e-03,
                9.84730201e-06,
                -9.68129509e-09,
                3.24372837e-12,
                -1.06394356e+03,
                3.65767573e+00,
            ],
            high: [
                3.28253784e+00,
                1.48308754e-03,
                -7.57966669e-07,
                2.09470555e-10,
                -2.16717794e-14,
                -1.08845772e+03,
                5.45323129e+00,
            ],
        },
        Species::N2 => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                3.298677e+00,
                1.4082404e-03,
                -3.963222e-06,
                5.641515e-09,
                -2.444854e-12,
                -1.0208999e+03,
                3.950372e+00,
            ],
            high: [
                2.92664e+00,
                1.4879768e-03,
                -5.68476e-07,
                1.0097038e-10,
                -6.753351e-15,
                -9.227977e+02,
                5.980528e+00,
            ],
        },
        Species::Ar => NasaPolynomial {
            t_mid: 1000.0,
            low: [2.5, 0.0, 0.0, 0.0, 0.0, -7.45375e+02, 4.366],
            high: [2.5, 0.0, 0.0, 0.0, 0.0, -7.45375e+02, 4.366],
        },
        Species::He => NasaPolynomial {
            t_mid: 1000.0,
            low: [2.5, 0.0, 0.0, 0.0, 0.0, -7.45375e+02, 9.28723974e-01],
            high: [2.5, 0.0, 0.0, 0.0, 0.0, -7.45375e+02, 9.28723974e-01],
        },
        Species::CO2 => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                2.35677352e+00,
                8.98459677e-03,
                -7.12356269e-06,
                2.45919022e-09,
                -1.43699548e-13,
                -4.83719697e+04,
                9.90105222e+00,
            ],
            high: [
                3.85746029e+00,
                4.41437026e-03,
                -2.21481404e-06,
                5.23490188e-10,
                -4.72084164e-14,
                -4.87591660e+04,
                2.27163806e+00,
            ],
        },
        Species::CO => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                3.57953347e+00,
                -6.10353680e-04,
                1.01681433e-06,
                9.07005884e-10,
                -9.04424499e-13,
                -1.43440860e+04,
                3.50840928e+00,
            ],
            high: [
                2.71518561e+00,
                2.06252743e-03,
                -9.98825771e-07,
                2.30053008e-10,
                -2.03647716e-14,
                -1.41518724e+04,
                7.81868772e+00,
            ],
        },
        Species::H2O => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                4.19864056e+00,
                -2.03643410e-03,
                6.52040211e-06,
                -5.48797062e-09,
                1.77197817e-12,
                -3.02937267e+04,
                -8.49032208e-01,
            ],
            high: [
                3.03399249e+00,
                2.17691804e-03,
                -1.64072518e-07,
                -9.70419870e-11,
                1.68200992e-14,
                -3.00042971e+04,
                4.96677010e+00,
            ],
        },
        Species::H2 => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                2.34433112e+00,
                7.98052075e-03,
                -1.94781510e-05,
                2.01572094e-08,
                -7.37611761e-12,
                -9.17935173e+02,
                6.83010238e-01,
            ],
            high: [
                3.33727920e+00,
                -4.94024731e-05,
                4.99456778e-07,
                -1.79566394e-10,
                2.00255376e-14,
                -9.50158922e+02,
                -3.20502331e+00,
            ],
        },
        Species::CH4 => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                5.14987613e+00,
                -1.36709788e-02,
                4.91800599e-05,
                -4.84743026e-08,
                1.66693956e-11,
                -1.02466476e+04,
                -4.64130376e+00,
            ],
            high: [
                7.48514950e-02,
                1.33909467e-02,
                -5.73285809e-06,
                1.22292535e-09,
                -1.01815230e-13,
                -9.46834459e+03,
                1.84373180e+01,
            ],
        },
        Species::Ethane => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                4.29142492e+00,
                -5.50154270e-03,
                5.99438288e-05,
                -7.08466285e-08,
                2.68685771e-11,
                -1.15222055e+04,
                2.66682316e+00,
            ],
            high: [
                1.07188150e+00,
                2.16852677e-02,
                -1.00256067e-05,
                2.21412001e-09,
                -1.90002890e-13,
                -1.14263932e+04,
                1.51156107e+01,
            ],
        },
        Species::Propane => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                9.3355381e-01,
                2.6424579e-02,
                6.1059727e-06,
                -2.1977499e-08,
                9.5149253e-12,
                -1.395852e+04,
                1.9201691e+01,
            ],
            high: [
                7.5341368e+00,
                1.8872239e-02,
                -6.2718491e-06,
                9.1475649e-10,
                -4.7838069e-14,
                -1.6467516e+04,
                -1.7892349e+01,
            ],
        },
        Species::Ammonia => NasaPolynomial {
            t_mid: 1000.0,
            low: [
                4.28602740e+00,
                -4.66052300e-03,
                2.17185130e-05,
                -2.28088870e-08,
                8.26380460e-12,
                -6.74172850e+03,
                -6.25372770e-01,
            ],
            high: [
                2.63445210e+00,
                5.66625600e-03,
                -1.72786760e-06,
                2.38671610e-10,
                -1.25787860e-14,
                -6.54469580e+03,
                6.56629280e+00,
            ],
        },
        Species::Air => return None,
    };
    Some(poly)
}

fn sutherland(species: Species) -> Sutherland {
    let (mu_ref, t_ref, s) = match species {
        Species::O2 => (1.919e-5, 273.15, 139.0),
        Species::N2 => (1.663e-5, 273.15, 107.0),
        Species::Ar => (2.125e-5, 273.15, 144.0),
        Species::He => (1.870e-5, 273.15, 79.4),
        Species::CO2 => (1.370e-5, 273.15, 222.0),
        Species::CO => (1.657e-5, 273.15, 136.0),
        Species::H2O => (1.120e-5, 350.0, 1064.0),
        Species::H2 => (8.411e-6, 273.15, 97.0),
        Species::CH4 => (1.024e-5, 273.15, 164.0),
        Species::Ethane => (8.600e-6, 273.15, 252.0),
        Species::Propane => (7.500e-6, 273.15, 278.0),
        Species::Ammonia => (9.820e-6, 293.15, 370.0),
        Species::Air => (1.716e-5, 273.15, 110.4),
    };
    Sutherland { mu_ref, t_ref, s }
}

/// Ideal-gas property source (thermally perfect, calorically imperfect gases).
#[derive(Debug, Default, Clone, Copy)]
pub struct IdealGasSource;

impl IdealGasSource {
    pub fn new() -> Self {
        Self
    }

    /// NASA polynomial for `species`, if tabulated.
    pub fn polynomial(species: Species) -> Option<NasaPolynomial> {
        polynomial(species)
    }

    fn require(&self, species: Species) -> FluidResult<NasaPolynomial> {
        polynomial(species).ok_or_else(|| FluidError::NotSupported {
            what: format!("{species} has no ideal-gas polynomial"),
        })
    }
}

impl PropertySource for IdealGasSource {
    fn name(&self) -> &str {
        "IdealGas"
    }

    fn supports(&self, species: Species) -> bool {
        polynomial(species).is_some()
    }

    fn temperature_range(&self, _species: Species) -> (f64, f64) {
        (T_MIN, T_MAX)
    }

    fn property(&self, species: Species, kind: PureProperty, p: f64, t: f64) -> FluidResult<f64> {
        validation::validate_pressure(p)?;
        validation::validate_temperature(t)?;
        let poly = self.require(species)?;
        if !(T_MIN..=T_MAX).contains(&t) {
            return Err(FluidError::OutOfDomain {
                what: kind.name(),
                p,
                t,
            });
        }

        let r_specific = R_UNIVERSAL / species.molar_mass();
        let value = match kind {
            PureProperty::Enthalpy => r_specific * t * poly.h_rt(t),
            PureProperty::Entropy => r_specific * (poly.s_r(t) - (p / P_STANDARD).ln()),
            PureProperty::Density => p / (r_specific * t),
            PureProperty::Viscosity => sutherland(species).viscosity(t),
        };
        validation::validate_result(kind, value, p, t)
    }
}
