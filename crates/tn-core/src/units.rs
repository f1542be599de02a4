// tn-core/src/units.rs

use uom::si::f64::{
    AvailableEnergy as UomAvailableEnergy, MassRate as UomMassRate, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Quantities a connection can be given (SI, f64)
pub type MassRate = UomMassRate;
pub type Pressure = UomPressure;
pub type SpecificEnergy = UomAvailableEnergy;
pub type Temperature = UomThermodynamicTemperature;

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn celsius(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

/// Specific enthalpy [J/kg].
#[inline]
pub fn jpkg(v: f64) -> SpecificEnergy {
    use uom::si::available_energy::joule_per_kilogram;
    SpecificEnergy::new::<joule_per_kilogram>(v)
}

pub mod constants {
    /// Universal gas constant [J/(kmol·K)].
    pub const R_UNIVERSAL: f64 = 8_314.462_618;

    /// Standard state pressure for tabulated thermochemistry [Pa].
    pub const P_STANDARD: f64 = 1.0e5;

    /// Standard state temperature for tabulated thermochemistry [K].
    pub const T_STANDARD: f64 = 298.15;
}
