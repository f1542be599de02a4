//! Stoichiometric combustion and the combustion chamber.

use tn_core::units::constants::{P_STANDARD, T_STANDARD};
use tn_fluids::{FluidSet, Species};

use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, ParamDef};
use crate::traits::{ComponentModel, EvalContext, FlowGuess, GuessHint, Port, StreamState};

/// Fuels, oxidizer and products found in a network fluid set.
#[derive(Debug, Clone)]
pub(crate) struct Chemistry {
    fuels: Vec<(usize, Species)>,
    o2: usize,
    co2: Option<usize>,
    h2o: Option<usize>,
}

/// Molar flows and mass generation of one reaction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reaction {
    /// Oxygen supplied [kmol/s]
    pub n_o2: f64,
    /// Oxygen needed for complete combustion [kmol/s]
    pub n_stoich: f64,
    /// Thermal input of the supplied fuel [W]
    pub ti: f64,
    /// Mass generated per fluid [kg/s]; negative for consumed species
    pub generation: Vec<f64>,
}

impl Reaction {
    /// Supplied over stoichiometric oxygen; infinite without fuel.
    pub fn lambda(&self) -> f64 {
        if self.n_stoich > 0.0 {
            self.n_o2 / self.n_stoich
        } else {
            f64::INFINITY
        }
    }

    /// Share of the fuel that burns: all of it unless oxygen runs short.
    pub fn burnt_share(&self) -> f64 {
        self.lambda().clamp(0.0, 1.0)
    }

    /// Heat released by the burnt share of the fuel [W].
    pub fn heat_release(&self) -> f64 {
        self.burnt_share() * self.ti
    }
}

impl Chemistry {
    /// Fails unless the fluid set can carry a complete reaction.
    pub fn new(component: &str, fluids: &FluidSet) -> ComponentResult<Self> {
        let setup = |what: String| ComponentError::Setup {
            what: format!("{component}: {what}"),
        };
        let fuels: Vec<_> = fluids
            .species()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_fuel())
            .map(|(i, s)| (i, *s))
            .collect();
        if fuels.is_empty() {
            return Err(setup("the fluid set contains no fuel".into()));
        }
        let o2 = fluids
            .index_of(Species::O2)
            .ok_or_else(|| setup("combustion needs O2 in the fluid set".into()))?;
        let co2 = fluids.index_of(Species::CO2);
        let h2o = fluids.index_of(Species::H2O);
        for (_, fuel) in &fuels {
            let atoms = fuel.atoms();
            if atoms.c > 0 && co2.is_none() {
                return Err(setup(format!("burning {fuel} needs CO2 in the fluid set")));
            }
            if atoms.h > 0 && h2o.is_none() {
                return Err(setup(format!("burning {fuel} needs H2O in the fluid set")));
            }
        }
        Ok(Self {
            fuels,
            o2,
            co2,
            h2o,
        })
    }

    /// Reaction of the given inlet flows `(m, x)`.
    pub fn react<'s>(&self, inlets: impl IntoIterator<Item = (f64, &'s [f64])>) -> Reaction {
        let mut n_fuel = vec![0.0; self.fuels.len()];
        let mut n_o2 = 0.0;
        let mut ti = 0.0;
        let mut nf = 0;
        for (m, x) in inlets {
            nf = x.len();
            for (k, (i, fuel)) in self.fuels.iter().enumerate() {
                n_fuel[k] += m * x[*i] / fuel.molar_mass();
                ti += m * x[*i] * fuel.lower_heating_value().unwrap_or(0.0);
            }
            n_o2 += m * x[self.o2] / Species::O2.molar_mass();
        }

        let n_stoich: f64 = self
            .fuels
            .iter()
            .zip(&n_fuel)
            .map(|((_, fuel), n)| n * fuel.atoms().oxygen_demand())
            .sum();

        let mut reaction = Reaction {
            n_o2,
            n_stoich,
            ti,
            generation: vec![0.0; nf],
        };
        let share = reaction.burnt_share();
        let mut n_co2 = 0.0;
        let mut n_h2o = 0.0;
        for ((i, fuel), n) in self.fuels.iter().zip(&n_fuel) {
            let burnt = share * n;
            reaction.generation[*i] -= burnt * fuel.molar_mass();
            let atoms = fuel.atoms();
            n_co2 += burnt * atoms.c as f64;
            n_h2o += burnt * atoms.h as f64 / 2.0;
        }
        reaction.generation[self.o2] -= share * n_stoich * Species::O2.molar_mass();
        if let Some(i) = self.co2 {
            reaction.generation[i] += n_co2 * Species::CO2.molar_mass();
        }
        if let Some(i) = self.h2o {
            reaction.generation[i] += n_h2o * Species::H2O.molar_mass();
        }
        reaction
    }

    /// Mixed and reacted outlet guess; `None` until every inlet is known.
    pub fn outlet_guess(&self, inlets: &[Option<FlowGuess>]) -> Option<FlowGuess> {
        let known: Vec<&FlowGuess> = inlets.iter().map(Option::as_ref).collect::<Option<_>>()?;
        let m: f64 = known.iter().map(|g| g.m).sum();
        if m <= 0.0 {
            return None;
        }
        let reaction = self.react(known.iter().map(|g| (g.m, g.x.as_slice())));
        let x = reaction
            .generation
            .iter()
            .enumerate()
            .map(|(i, generated)| {
                let inflow: f64 = known.iter().map(|g| g.m * g.x[i]).sum();
                ((inflow + generated) / m).max(0.0)
            })
            .collect();
        Some(FlowGuess { m, x })
    }
}

/// Enthalpy flow of a stream above the standard state of its own composition [W].
pub(crate) fn sensible_flow(ctx: &EvalContext<'_>, stream: &StreamState) -> ComponentResult<f64> {
    let h0 = ctx
        .evaluator
        .h_pt(P_STANDARD, T_STANDARD, &ctx.mixture(stream)?)?;
    Ok(stream.m * (stream.h - h0))
}

/// Push the per-fluid reaction balance `m_out x_out - Σ m_in x_in - generation`.
pub(crate) fn push_reaction_balance(
    reactants: &[&StreamState],
    products: &StreamState,
    reaction: &Reaction,
    out: &mut Vec<f64>,
) {
    for (i, generated) in reaction.generation.iter().enumerate() {
        let inflow: f64 = reactants.iter().map(|s| s.m * s.x[i]).sum();
        out.push(products.m * products.x[i] - inflow - generated);
    }
}

/// Adiabatic combustion chamber with air at `in1`, fuel at `in2` and flue
/// gas at `out1`.
///
/// Fuels burn completely to CO2 and H2O; with too little oxygen (`lamb < 1`)
/// only the share `lamb` of each fuel burns. The heat of reaction enters the
/// energy balance as `lamb`-limited thermal input on lower heating values,
/// with each stream's enthalpy counted from the standard state of its own
/// composition. Both inlets share the outlet pressure.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombustionChamber;

const IN1: usize = 0;
const IN2: usize = 1;
const OUT1: usize = 2;

const CHAMBER_PARAMS: &[ParamDef] = &[ParamDef::equation("lamb"), ParamDef::equation("ti")];

impl CombustionChamber {
    fn reaction(ctx: &EvalContext<'_>, ports: &[StreamState]) -> ComponentResult<Reaction> {
        let chemistry = Chemistry::new(ctx.component, ctx.fluids)?;
        Ok(chemistry.react([
            (ports[IN1].m, ports[IN1].x.as_slice()),
            (ports[IN2].m, ports[IN2].x.as_slice()),
        ]))
    }
}

impl ComponentModel for CombustionChamber {
    fn kind(&self) -> &'static str {
        "combustion chamber"
    }

    fn ports(&self) -> (usize, usize) {
        (2, 1)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        CHAMBER_PARAMS
    }

    fn check_fluids(&self, fluids: &FluidSet) -> ComponentResult<()> {
        Chemistry::new(self.kind(), fluids).map(|_| ())
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        nf + 4
    }

    fn structural_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        let (air, fuel, flue) = (&ports[IN1], &ports[IN2], &ports[OUT1]);
        let reaction = Self::reaction(ctx, ports)?;

        out.push(air.m + fuel.m - flue.m);
        push_reaction_balance(&[air, fuel], flue, &reaction, out);
        out.push(air.p - flue.p);
        out.push(fuel.p - flue.p);
        out.push(
            sensible_flow(ctx, air)? + sensible_flow(ctx, fuel)? - sensible_flow(ctx, flue)?
                + reaction.heat_release(),
        );
        Ok(())
    }

    fn param_residual(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        let reaction = Self::reaction(ctx, ports)?;
        match (name, params.value(name)) {
            ("lamb", Some(lamb)) => Ok(reaction.n_o2 - lamb * reaction.n_stoich),
            ("ti", Some(ti)) => Ok(reaction.ti - ti),
            _ => Err(ComponentError::UnknownParameter {
                component: ctx.component.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["TI", "lamb"]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let reaction = Self::reaction(ctx, ports)?;
        Ok(vec![("TI", reaction.ti), ("lamb", reaction.lambda())])
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("TI")
    }

    fn outlet_guess(
        &self,
        fluids: &FluidSet,
        inlets: &[Option<FlowGuess>],
        _outlet: usize,
    ) -> Option<FlowGuess> {
        Chemistry::new(self.kind(), fluids).ok()?.outlet_guess(inlets)
    }

    fn initial_hint(&self, port: Port) -> Option<GuessHint> {
        matches!(port, Port::Outlet(0)).then_some(GuessHint::Temperature(1500.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fluids() -> FluidSet {
        FluidSet::new([
            Species::H2O,
            Species::N2,
            Species::O2,
            Species::Ar,
            Species::CO2,
            Species::CH4,
        ])
        .unwrap()
    }

    const AIR: [f64; 6] = [0.0, 0.7556, 0.2315, 0.0129, 0.0, 0.0];
    const FUEL: [f64; 6] = [0.0, 0.0, 0.0, 0.0, 0.04, 0.96];

    #[test]
    fn fluid_set_must_support_the_reaction() {
        assert!(Chemistry::new("cc", &fluids()).is_ok());
        let no_fuel = FluidSet::new([Species::N2, Species::O2]).unwrap();
        assert!(Chemistry::new("cc", &no_fuel).is_err());
        let no_water = FluidSet::new([Species::O2, Species::CO2, Species::CH4]).unwrap();
        let err = Chemistry::new("cc", &no_water).unwrap_err();
        assert!(err.to_string().contains("H2O"), "{err}");
        let hydrogen = FluidSet::new([Species::O2, Species::H2O, Species::H2]).unwrap();
        assert!(Chemistry::new("cc", &hydrogen).is_ok());
    }

    #[test]
    fn lean_combustion_conserves_mass_and_burns_all_fuel() {
        let chemistry = Chemistry::new("cc", &fluids()).unwrap();
        let reaction = chemistry.react([(1.0, AIR.as_slice()), (0.02, FUEL.as_slice())]);
        assert!(reaction.lambda() > 1.0);
        let total: f64 = reaction.generation.iter().sum();
        assert!(total.abs() < 1e-12, "net generation = {total}");
        assert!((reaction.generation[5] + 0.02 * 0.96).abs() < 1e-15);
        let lhv = Species::CH4.lower_heating_value().unwrap();
        assert!((reaction.ti - 0.02 * 0.96 * lhv).abs() < 1e-6);
        assert_eq!(reaction.heat_release(), reaction.ti);
    }

    #[test]
    fn rich_combustion_burns_the_oxygen_limited_share() {
        let chemistry = Chemistry::new("cc", &fluids()).unwrap();
        let reaction = chemistry.react([(0.5, AIR.as_slice()), (0.1, FUEL.as_slice())]);
        let lambda = reaction.lambda();
        assert!(lambda < 1.0);
        // all oxygen is consumed
        assert!((reaction.generation[2] + 0.5 * AIR[2]).abs() < 1e-12);
        assert!((reaction.heat_release() - lambda * reaction.ti).abs() < 1e-6);
    }

    #[test]
    fn no_fuel_means_no_reaction() {
        let chemistry = Chemistry::new("cc", &fluids()).unwrap();
        let reaction = chemistry.react([(1.0, AIR.as_slice()), (0.0, FUEL.as_slice())]);
        assert!(reaction.lambda().is_infinite());
        assert!(reaction.generation.iter().all(|g| *g == 0.0));
        assert_eq!(reaction.ti, 0.0);
    }

    #[test]
    fn outlet_guess_mixes_and_reacts() {
        let chemistry = Chemistry::new("cc", &fluids()).unwrap();
        let air = FlowGuess {
            m: 1.0,
            x: AIR.to_vec(),
        };
        let fuel = FlowGuess {
            m: 0.02,
            x: FUEL.to_vec(),
        };
        assert!(chemistry.outlet_guess(&[Some(air.clone()), None]).is_none());
        let flue = chemistry.outlet_guess(&[Some(air), Some(fuel)]).unwrap();
        assert!((flue.m - 1.02).abs() < 1e-12);
        assert!((flue.x.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(flue.x[5] < 1e-15);
        assert!(flue.x[0] > 0.0 && flue.x[4] > 0.0);
    }
}
