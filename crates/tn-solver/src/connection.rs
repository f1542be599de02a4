//! Streams between component ports and their specification surface.

use std::collections::BTreeMap;

use tn_components::Port;
use tn_core::{CompId, ConnId, MassRate, Pressure, SpecificEnergy, Temperature};
use tn_fluids::{Composition, Species};

use crate::error::{SolverError, SolverResult};

/// Specification of one of the scalar primary variables m, p or h.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VarSpec {
    #[default]
    Free,
    Fixed(f64),
    /// `value = factor · value(conn) + delta`
    Ref { conn: ConnId, factor: f64, delta: f64 },
}

impl VarSpec {
    pub fn fixed(&self) -> Option<f64> {
        match self {
            VarSpec::Fixed(v) => Some(*v),
            _ => None,
        }
    }
}

/// Specifiable attribute of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    M,
    P,
    H,
    T,
    Fluid,
}

/// Fixed mass fractions of a connection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FluidSpec {
    pub fractions: BTreeMap<Species, f64>,
    /// Species not listed are fixed at zero
    pub complete: bool,
}

impl FluidSpec {
    /// Fixed fraction of `species`, if any.
    pub fn get(&self, species: Species) -> Option<f64> {
        match self.fractions.get(&species) {
            Some(x) => Some(*x),
            None if self.complete => Some(0.0),
            None => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty() && !self.complete
    }
}

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub component: CompId,
    pub port: Port,
}

/// Directed stream from a component outlet to a component inlet.
#[derive(Debug, Clone)]
pub struct Connection {
    label: String,
    source: Endpoint,
    target: Endpoint,
    m: VarSpec,
    p: VarSpec,
    h: VarSpec,
    t: Option<f64>,
    fluid: FluidSpec,
    fluid_balance: bool,
    m0: Option<f64>,
    p0: Option<f64>,
    h0: Option<f64>,
    fluid0: BTreeMap<Species, f64>,
    design: Vec<Attr>,
}

impl Connection {
    pub(crate) fn new(label: String, source: Endpoint, target: Endpoint) -> Self {
        Self {
            label,
            source,
            target,
            m: VarSpec::Free,
            p: VarSpec::Free,
            h: VarSpec::Free,
            t: None,
            fluid: FluidSpec::default(),
            fluid_balance: false,
            m0: None,
            p0: None,
            h0: None,
            fluid0: BTreeMap::new(),
            design: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> Endpoint {
        self.source
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }

    /// Fix the mass flow. Values are checked for finiteness when the network
    /// is solved, like every other fixed value of a connection.
    pub fn set_m(&mut self, m: MassRate) -> &mut Self {
        self.m = VarSpec::Fixed(m.value);
        self
    }

    pub fn set_p(&mut self, p: Pressure) -> &mut Self {
        self.p = VarSpec::Fixed(p.value);
        self
    }

    pub fn set_h(&mut self, h: SpecificEnergy) -> &mut Self {
        self.h = VarSpec::Fixed(h.value);
        self
    }

    /// Fix the temperature; adds one equation.
    pub fn set_t(&mut self, t: Temperature) -> &mut Self {
        self.t = Some(t.value);
        self
    }

    /// `attr = factor · attr(conn) + delta`, for m, p or h.
    pub fn set_ref(
        &mut self,
        attr: Attr,
        conn: ConnId,
        factor: f64,
        delta: f64,
    ) -> SolverResult<&mut Self> {
        if !factor.is_finite() || !delta.is_finite() {
            return Err(self.setup_error(format!(
                "reference factor {factor} and offset {delta} must be finite"
            )));
        }
        let spec = VarSpec::Ref {
            conn,
            factor,
            delta,
        };
        match attr {
            Attr::M => self.m = spec,
            Attr::P => self.p = spec,
            Attr::H => self.h = spec,
            Attr::T | Attr::Fluid => {
                return Err(self.setup_error(format!(
                    "{attr:?} cannot reference another connection, only m, p and h can"
                )));
            }
        }
        Ok(self)
    }

    /// Fix the complete composition; species absent from `comp` are fixed at zero.
    pub fn set_fluid(&mut self, comp: &Composition) -> &mut Self {
        self.fluid = FluidSpec {
            fractions: comp.iter().collect(),
            complete: true,
        };
        self
    }

    /// Fix a single mass fraction.
    pub fn set_fraction(&mut self, species: Species, fraction: f64) -> &mut Self {
        self.fluid.fractions.insert(species, fraction);
        self
    }

    /// Require the free fractions to complete the fixed ones to one.
    pub fn set_fluid_balance(&mut self, on: bool) -> &mut Self {
        self.fluid_balance = on;
        self
    }

    /// Re-open an attribute as free.
    pub fn unset(&mut self, attr: Attr) -> &mut Self {
        match attr {
            Attr::M => self.m = VarSpec::Free,
            Attr::P => self.p = VarSpec::Free,
            Attr::H => self.h = VarSpec::Free,
            Attr::T => self.t = None,
            Attr::Fluid => self.fluid = FluidSpec::default(),
        }
        self
    }

    pub fn guess_m(&mut self, m: MassRate) -> &mut Self {
        self.m0 = Some(m.value);
        self
    }

    pub fn guess_p(&mut self, p: Pressure) -> &mut Self {
        self.p0 = Some(p.value);
        self
    }

    pub fn guess_h(&mut self, h: SpecificEnergy) -> &mut Self {
        self.h0 = Some(h.value);
        self
    }

    pub fn guess_fluid(&mut self, comp: &Composition) -> &mut Self {
        self.fluid0 = comp.iter().collect();
        self
    }

    /// Attributes dropped when solving off-design.
    pub fn set_design(&mut self, attrs: &[Attr]) -> &mut Self {
        self.design = attrs.to_vec();
        self
    }

    pub fn design_list(&self) -> &[Attr] {
        &self.design
    }

    pub fn fluid_balance(&self) -> bool {
        self.fluid_balance
    }

    pub(crate) fn guesses(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        (self.m0, self.p0, self.h0)
    }

    pub(crate) fn fluid_guess(&self) -> &BTreeMap<Species, f64> {
        &self.fluid0
    }

    /// Specification in effect; attributes on the design list are free off-design.
    pub fn spec(&self, attr: Attr, offdesign: bool) -> Option<VarSpec> {
        if offdesign && self.design.contains(&attr) {
            return Some(VarSpec::Free);
        }
        match attr {
            Attr::M => Some(self.m),
            Attr::P => Some(self.p),
            Attr::H => Some(self.h),
            Attr::T | Attr::Fluid => None,
        }
    }

    /// Fixed temperature in effect.
    pub fn temperature(&self, offdesign: bool) -> Option<f64> {
        if offdesign && self.design.contains(&Attr::T) {
            return None;
        }
        self.t
    }

    fn setup_error(&self, what: String) -> SolverError {
        SolverError::Setup {
            what: format!("{}: {what}", self.label),
        }
    }

    /// Reject non-finite fixed values and guesses, and fractions outside [0, 1].
    pub(crate) fn validate(&self) -> SolverResult<()> {
        let values = [
            ("m", self.m.fixed()),
            ("p", self.p.fixed()),
            ("h", self.h.fixed()),
            ("T", self.t),
            ("m guess", self.m0),
            ("p guess", self.p0),
            ("h guess", self.h0),
        ];
        for (name, value) in values {
            if let Some(value) = value
                && !value.is_finite()
            {
                return Err(self.setup_error(format!("{name} must be finite, got {value}")));
            }
        }
        if let Some(p) = self.p.fixed()
            && p <= 0.0
        {
            return Err(self.setup_error(format!("pressure must be positive, got {p}")));
        }
        if let Some(t) = self.t
            && t <= 0.0
        {
            return Err(self.setup_error(format!("temperature must be positive, got {t} K")));
        }
        for (species, x) in self.fluid.fractions.iter().chain(&self.fluid0) {
            if !(0.0..=1.0).contains(x) {
                return Err(self.setup_error(format!(
                    "mass fraction of {species:?} must lie in [0, 1], got {x}"
                )));
            }
        }
        Ok(())
    }

    /// Fixed mass fractions in effect.
    pub fn fixed_fluid(&self, offdesign: bool) -> Option<&FluidSpec> {
        if offdesign && self.design.contains(&Attr::Fluid) {
            return None;
        }
        Some(&self.fluid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_core::{bar, celsius, kgps};

    fn connection() -> Connection {
        Connection::new(
            "c1".into(),
            Endpoint {
                component: CompId::from_index(0),
                port: Port::Outlet(0),
            },
            Endpoint {
                component: CompId::from_index(1),
                port: Port::Inlet(0),
            },
        )
    }

    #[test]
    fn setters_store_si_values() {
        let mut c = connection();
        c.set_m(kgps(2.0)).set_p(bar(3.0)).set_t(celsius(25.0));
        assert_eq!(c.spec(Attr::M, false), Some(VarSpec::Fixed(2.0)));
        assert_eq!(c.spec(Attr::P, false).and_then(|s| s.fixed()), Some(3e5));
        assert!((c.temperature(false).unwrap() - 298.15).abs() < 1e-9);
    }

    #[test]
    fn unset_reopens_the_variable() {
        let mut c = connection();
        c.set_p(bar(1.0)).unset(Attr::P);
        assert_eq!(c.spec(Attr::P, false), Some(VarSpec::Free));
        c.set_fraction(Species::H2O, 1.0).unset(Attr::Fluid);
        assert!(c.fixed_fluid(false).unwrap().is_empty());
        assert!(c.fixed_fluid(true).unwrap().is_empty());
    }

    #[test]
    fn design_attributes_are_free_off_design() {
        let mut c = connection();
        c.set_m(kgps(1.0))
            .set_t(celsius(80.0))
            .set_design(&[Attr::M, Attr::T]);
        assert_eq!(c.spec(Attr::M, false), Some(VarSpec::Fixed(1.0)));
        assert_eq!(c.spec(Attr::M, true), Some(VarSpec::Free));
        assert!(c.temperature(false).is_some());
        assert!(c.temperature(true).is_none());
    }

    #[test]
    fn only_scalar_variables_take_references() {
        let mut c = connection();
        let other = ConnId::from_index(3);
        c.set_ref(Attr::P, other, 1.0, -1e4).unwrap();
        assert_eq!(
            c.spec(Attr::P, false),
            Some(VarSpec::Ref {
                conn: other,
                factor: 1.0,
                delta: -1e4
            })
        );
        for attr in [Attr::T, Attr::Fluid] {
            match c.set_ref(attr, other, 1.0, 0.0) {
                Err(SolverError::Setup { what }) => assert!(what.starts_with("c1: "), "{what}"),
                result => panic!("expected a setup error, got {result:?}"),
            }
        }
        assert!(c.set_ref(Attr::M, other, f64::NAN, 0.0).is_err());
        assert_eq!(c.spec(Attr::M, false), Some(VarSpec::Free));
    }

    #[test]
    fn non_finite_values_fail_validation() {
        let mut c = connection();
        c.set_m(kgps(1.0)).set_p(bar(1.0)).set_t(celsius(20.0));
        c.validate().unwrap();

        c.set_m(kgps(f64::NAN));
        assert!(matches!(c.validate(), Err(SolverError::Setup { .. })));
        c.set_m(kgps(1.0)).set_p(bar(f64::INFINITY));
        assert!(c.validate().is_err());
        c.set_p(bar(-1.0));
        assert!(c.validate().is_err());
        c.set_p(bar(1.0)).guess_h(tn_core::jpkg(f64::NAN));
        assert!(c.validate().is_err());
        c.guess_h(tn_core::jpkg(1e5)).set_fraction(Species::H2O, 1.5);
        assert!(c.validate().is_err());
        c.set_fraction(Species::H2O, 1.0);
        c.validate().unwrap();
    }

    #[test]
    fn full_composition_fixes_absent_species_at_zero() {
        let mut c = connection();
        let air = Composition::new_mass_fractions(vec![(Species::N2, 0.77), (Species::O2, 0.23)])
            .unwrap();
        c.set_fluid(&air);
        let fixed = c.fixed_fluid(false).unwrap();
        assert_eq!(fixed.get(Species::CO2), Some(0.0));
        assert!((fixed.get(Species::N2).unwrap() - 0.77).abs() < 1e-12);

        let mut partial = connection();
        partial.set_fraction(Species::O2, 0.23);
        let fixed = partial.fixed_fluid(false).unwrap();
        assert_eq!(fixed.get(Species::O2), Some(0.23));
        assert_eq!(fixed.get(Species::N2), None);
    }
}
