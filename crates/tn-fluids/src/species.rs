//! Chemical species definitions and the thermochemical data the network needs.

/// Chemical species available to stream compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    /// Oxygen (O₂)
    O2,
    /// Nitrogen (N₂)
    N2,
    /// Argon (Ar)
    Ar,
    /// Helium (He)
    He,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Carbon monoxide (CO)
    CO,
    /// Water (H₂O)
    H2O,
    /// Hydrogen (H₂)
    H2,
    /// Methane (CH₄)
    CH4,
    /// Ethane (C₂H₆)
    Ethane,
    /// Propane (C₃H₈)
    Propane,
    /// Ammonia (NH₃)
    Ammonia,
    /// Air (pseudo-pure backend fluid)
    Air,
}

/// Atom counts relevant to hydrocarbon combustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atoms {
    pub c: u32,
    pub h: u32,
    pub o: u32,
}

impl Atoms {
    /// Moles of O₂ consumed by complete combustion of one mole.
    pub fn oxygen_demand(&self) -> f64 {
        self.c as f64 + self.h as f64 / 4.0 - self.o as f64 / 2.0
    }
}

impl Species {
    pub const ALL: [Species; 13] = [
        Species::O2,
        Species::N2,
        Species::Ar,
        Species::He,
        Species::CO2,
        Species::CO,
        Species::H2O,
        Species::H2,
        Species::CH4,
        Species::Ethane,
        Species::Propane,
        Species::Ammonia,
        Species::Air,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Species::O2 => "O2",
            Species::N2 => "N2",
            Species::Ar => "Ar",
            Species::He => "He",
            Species::CO2 => "CO2",
            Species::CO => "CO",
            Species::H2O => "H2O",
            Species::H2 => "H2",
            Species::CH4 => "CH4",
            Species::Ethane => "C2H6",
            Species::Propane => "C3H8",
            Species::Ammonia => "NH3",
            Species::Air => "Air",
        }
    }
}

impl std::str::FromStr for Species {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "O2" | "OXYGEN" => Ok(Species::O2),
            "N2" | "NITROGEN" => Ok(Species::N2),
            "AR" | "ARGON" => Ok(Species::Ar),
            "HE" | "HELIUM" => Ok(Species::He),
            "CO2" | "CARBONDIOXIDE" | "CARBON DIOXIDE" => Ok(Species::CO2),
            "CO" | "CARBONMONOXIDE" | "CARBON MONOXIDE" => Ok(Species::CO),
            "H2O" | "WATER" => Ok(Species::H2O),
            "H2" | "HYDROGEN" => Ok(Species::H2),
            "CH4" | "METHANE" => Ok(Species::CH4),
            "C2H6" | "ETHANE" => Ok(Species::Ethane),
            "C3H8" | "PROPANE" => Ok(Species::Propane),
            "NH3" | "AMMONIA" => Ok(Species::Ammonia),
            "AIR" => Ok(Species::Air),
            _ => Err("unknown species"),
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl Species {
    /// Get CoolProp fluid name for this species.
    pub fn coolprop_name(&self) -> &'static str {
        match self {
            Species::O2 => "Oxygen",
            Species::N2 => "Nitrogen",
            Species::Ar => "Argon",
            Species::He => "Helium",
            Species::CO2 => "CarbonDioxide",
            Species::CO => "CarbonMonoxide",
            Species::H2O => "Water",
            Species::H2 => "Hydrogen",
            Species::CH4 => "Methane",
            Species::Ethane => "Ethane",
            Species::Propane => "n-Propane",
            Species::Ammonia => "Ammonia",
            Species::Air => "Air",
        }
    }

    /// Map to rfluids Pure enum (internal use for CoolProp backend).
    pub(crate) fn rfluids_pure(&self) -> rfluids::substance::Pure {
        use rfluids::substance::Pure;
        match self {
            Species::O2 => Pure::Oxygen,
            Species::N2 => Pure::Nitrogen,
            Species::Ar => Pure::Argon,
            Species::He => Pure::Helium,
            Species::CO2 => Pure::CarbonDioxide,
            Species::CO => Pure::CarbonMonoxide,
            Species::H2O => Pure::Water,
            Species::H2 => Pure::Hydrogen,
            Species::CH4 => Pure::Methane,
            Species::Ethane => Pure::Ethane,
            Species::Propane => Pure::nPropane,
            Species::Ammonia => Pure::Ammonia,
            Species::Air => Pure::Air,
        }
    }

    /// Get molar mass [kg/kmol] for this species.
    ///
    /// C, H and O compounds use the atomic weights 12.011, 1.008 and 15.999 so
    /// that combustion reactions conserve mass exactly.
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::O2 => 31.998,
            Species::N2 => 28.014,
            Species::Ar => 39.948,
            Species::He => 4.003,
            Species::CO2 => 44.009,
            Species::CO => 28.010,
            Species::H2O => 18.015,
            Species::H2 => 2.016,
            Species::CH4 => 16.043,
            Species::Ethane => 30.070,
            Species::Propane => 44.097,
            Species::Ammonia => 17.031,
            Species::Air => 28.965,
        }
    }

    /// Critical temperature [K].
    pub fn critical_temperature(&self) -> f64 {
        match self {
            Species::O2 => 154.58,
            Species::N2 => 126.19,
            Species::Ar => 150.69,
            Species::He => 5.195,
            Species::CO2 => 304.13,
            Species::CO => 132.86,
            Species::H2O => 647.096,
            Species::H2 => 33.145,
            Species::CH4 => 190.56,
            Species::Ethane => 305.32,
            Species::Propane => 369.89,
            Species::Ammonia => 405.40,
            Species::Air => 132.53,
        }
    }

    /// C, H and O atoms per molecule.
    ///
    /// Air is treated as inert; its oxygen is not available to combustion.
    pub fn atoms(&self) -> Atoms {
        let (c, h, o) = match self {
            Species::O2 => (0, 0, 2),
            Species::CO2 => (1, 0, 2),
            Species::CO => (1, 0, 1),
            Species::H2O => (0, 2, 1),
            Species::H2 => (0, 2, 0),
            Species::CH4 => (1, 4, 0),
            Species::Ethane => (2, 6, 0),
            Species::Propane => (3, 8, 0),
            Species::Ammonia => (0, 3, 0),
            Species::N2 | Species::Ar | Species::He | Species::Air => (0, 0, 0),
        };
        Atoms { c, h, o }
    }

    /// Standard enthalpy of formation of the gas at 298.15 K [J/kmol].
    pub fn formation_enthalpy(&self) -> f64 {
        match self {
            Species::CO2 => -393.52e6,
            Species::CO => -110.53e6,
            Species::H2O => -241.826e6,
            Species::CH4 => -74.87e6,
            Species::Ethane => -84.0e6,
            Species::Propane => -104.7e6,
            Species::Ammonia => -45.9e6,
            Species::O2 | Species::N2 | Species::Ar | Species::He | Species::H2 | Species::Air => {
                0.0
            }
        }
    }

    /// Whether the network treats this species as a combustible fuel.
    pub fn is_fuel(&self) -> bool {
        matches!(
            self,
            Species::CH4 | Species::Ethane | Species::Propane | Species::H2 | Species::CO
        )
    }

    /// Lower heating value [J/kg], water leaving as vapour.
    ///
    /// Returns `None` for species that are not fuels.
    pub fn lower_heating_value(&self) -> Option<f64> {
        if !self.is_fuel() {
            return None;
        }
        let atoms = self.atoms();
        let products = atoms.c as f64 * Species::CO2.formation_enthalpy()
            + atoms.h as f64 / 2.0 * Species::H2O.formation_enthalpy();
        Some((self.formation_enthalpy() - products) / self.molar_mass())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coolprop_mapping() {
        assert_eq!(Species::O2.coolprop_name(), "Oxygen");
        assert_eq!(Species::Propane.coolprop_name(), "n-Propane");
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("methane".parse::<Species>().unwrap(), Species::CH4);
        assert_eq!("NH3".parse::<Species>().unwrap(), Species::Ammonia);
        assert_eq!("water".parse::<Species>().unwrap(), Species::H2O);
        assert!("kerosene".parse::<Species>().is_err());
    }

    #[test]
    fn canonical_keys_roundtrip() {
        for species in Species::ALL {
            let parsed = species
                .key()
                .parse::<Species>()
                .expect("canonical key should parse");
            assert_eq!(parsed, species);
        }
    }

    #[test]
    fn methane_lhv_is_about_50_mj_per_kg() {
        let lhv = Species::CH4.lower_heating_value().unwrap();
        assert!((lhv - 50.0e6).abs() < 0.1e6, "LHV = {lhv}");
    }

    #[test]
    fn hydrogen_lhv_is_about_120_mj_per_kg() {
        let lhv = Species::H2.lower_heating_value().unwrap();
        assert!((lhv - 120.0e6).abs() < 0.5e6, "LHV = {lhv}");
    }

    #[test]
    fn inerts_have_no_heating_value() {
        assert_eq!(Species::N2.lower_heating_value(), None);
        assert_eq!(Species::CO2.lower_heating_value(), None);
    }

    #[test]
    fn oxygen_demand_of_fuels() {
        assert_eq!(Species::CH4.atoms().oxygen_demand(), 2.0);
        assert_eq!(Species::CO.atoms().oxygen_demand(), 0.5);
        assert_eq!(Species::Propane.atoms().oxygen_demand(), 5.0);
    }
}
