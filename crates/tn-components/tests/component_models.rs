//! Component models evaluated against the ideal-gas property source.

use std::collections::BTreeMap;
use std::sync::Arc;

use tn_components::{
    CombustionChamber, CombustionEngine, Component, ComponentError, ComponentModel, DesignPoint,
    EvalContext, FlowGuess, HeatExchanger, Mode, ParamSpec, StreamState, Turbomachine, Valve,
};
use tn_fluids::{FluidSet, IdealGasSource, Mixture, MixtureEvaluator, Species};

fn evaluator() -> MixtureEvaluator {
    MixtureEvaluator::new(Arc::new(IdealGasSource::new()))
}

fn combustion_fluids() -> FluidSet {
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
const NITROGEN: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

fn ctx<'a>(
    evaluator: &'a MixtureEvaluator,
    fluids: &'a FluidSet,
    mode: Mode,
    design: Option<&'a DesignPoint>,
) -> EvalContext<'a> {
    EvalContext {
        component: "test",
        evaluator,
        fluids,
        mode,
        design,
    }
}

fn stream(
    evaluator: &MixtureEvaluator,
    fluids: &FluidSet,
    m: f64,
    p: f64,
    t: f64,
    x: &[f64],
) -> StreamState {
    let mix = Mixture::new(fluids, x).unwrap();
    StreamState {
        m,
        p,
        h: evaluator.h_pt(p, t, &mix).unwrap(),
        x: x.to_vec(),
    }
}

#[test]
fn parameters_are_validated_on_set() {
    let mut valve = Component::new("v1", Valve);
    valve.set("pr", 0.5).unwrap();
    assert!(matches!(valve.param("pr"), Some(ParamSpec::Fixed(v)) if *v == 0.5));

    let err = valve.set("eta_s", 0.9).unwrap_err();
    assert!(matches!(err, ComponentError::UnknownParameter { .. }));
    assert!(valve.set("zeta", f64::NAN).is_err());

    valve.set("pr", ParamSpec::Unspecified).unwrap();
    assert!(valve.param("pr").is_none());
    assert!(valve.set_design(&["pr", "dp"]).is_err());
}

#[test]
fn design_and_offdesign_lists_swap_equations() {
    let mut pump = Component::new("pump", Turbomachine::pump());
    pump.set("eta_s", 0.8).unwrap();
    pump.set("pr", 10.0).unwrap();
    pump.set_design(&["eta_s"]).unwrap();
    pump.set_offdesign(&["eta_s_char"]).unwrap();

    let design = pump.resolve(Mode::Design, None).unwrap();
    assert_eq!(design.equations(), &["pr", "eta_s"]);
    assert_eq!(pump.equation_count(2, &design), 2 + 1 + 2);

    let offdesign = pump.resolve(Mode::Offdesign, None).unwrap();
    assert_eq!(offdesign.equations(), &["pr", "eta_s_char"]);
    assert!(offdesign.curve("eta_s_char").is_some());
    assert!(offdesign.value("eta_s").is_none());
}

#[test]
fn offdesign_values_come_from_the_design_point() {
    let mut valve = Component::new("v1", Valve);
    valve.set("pr", 0.5).unwrap();
    valve.set_design(&["pr"]).unwrap();
    valve.set_offdesign(&["zeta"]).unwrap();

    let err = valve.resolve(Mode::Offdesign, None).unwrap_err();
    assert!(matches!(err, ComponentError::MissingDesignValue { ref name, .. } if name == "zeta"));

    let point: DesignPoint = BTreeMap::from([("zeta".to_string(), 1.5e9)]);
    let active = valve.resolve(Mode::Offdesign, Some(&point)).unwrap();
    assert_eq!(active.equations(), &["zeta"]);
    assert_eq!(active.value("zeta"), Some(1.5e9));
}

#[test]
fn analytic_rows_match_finite_differences() {
    let evaluator = evaluator();
    let fluids = FluidSet::new([Species::N2, Species::O2]).unwrap();
    let air = [0.77, 0.23];
    let ctx = ctx(&evaluator, &fluids, Mode::Design, None);
    let ports = vec![
        stream(&evaluator, &fluids, 2.0, 3e5, 600.0, &air),
        stream(&evaluator, &fluids, 3.0, 2e5, 300.0, &air),
        stream(&evaluator, &fluids, 2.1, 2.9e5, 400.0, &[0.76, 0.24]),
        stream(&evaluator, &fluids, 2.9, 1.9e5, 450.0, &air),
    ];

    let mut hx = Component::new("hx", HeatExchanger);
    hx.set("pr1", 0.98).unwrap();
    let active = hx.resolve(Mode::Design, None).unwrap();
    let width = StreamState::width(fluids.len());
    let free = vec![true; 4 * width];
    let jac = hx.jacobian(&ctx, &ports, &active, &free, 1e-7).unwrap();
    assert_eq!(jac.nrows(), 2 * fluids.len() + 3 + 1);

    let base = hx.residuals(&ctx, &ports, &active).unwrap();
    for col in 0..4 * width {
        let (port, var) = (col / width, col % width);
        let mut shifted = ports.clone();
        let step = 1e-6 * shifted[port].get(var).abs().max(1.0);
        let value = shifted[port].get(var) + step;
        shifted[port].set(var, value);
        let perturbed = hx.residuals(&ctx, &shifted, &active).unwrap();
        for row in 0..base.len() {
            let fd = (perturbed[row] - base[row]) / step;
            let tol = 1e-4 * fd.abs().max(1.0);
            assert!(
                (jac[(row, col)] - fd).abs() < tol,
                "row {row} col {col}: analytic {} vs fd {fd}",
                jac[(row, col)]
            );
        }
    }
}

#[test]
fn compressor_efficiency_residual_vanishes_on_the_efficiency_line() {
    let evaluator = evaluator();
    let fluids = FluidSet::new([Species::N2, Species::O2]).unwrap();
    let air = [0.77, 0.23];
    let ctx = ctx(&evaluator, &fluids, Mode::Design, None);
    let mix = Mixture::new(&fluids, &air).unwrap();

    let inlet = stream(&evaluator, &fluids, 1.0, 1e5, 300.0, &air);
    let s_in = evaluator.s_pt(1e5, 300.0, &mix).unwrap();
    let h_s = evaluator.h_ps(5e5, s_in, &mix).unwrap();
    let eta = 0.85;
    let outlet = StreamState {
        h: inlet.h + (h_s - inlet.h) / eta,
        p: 5e5,
        ..inlet.clone()
    };

    let mut compressor = Component::new("compressor", Turbomachine::compressor());
    compressor.set("eta_s", eta).unwrap();
    compressor.set("pr", 5.0).unwrap();
    let active = compressor.resolve(Mode::Design, None).unwrap();
    let ports = [inlet, outlet];
    let residuals = compressor.residuals(&ctx, &ports, &active).unwrap();
    for r in &residuals {
        assert!(r.abs() < 1e-6, "residuals = {residuals:?}");
    }

    let derived = compressor.derived_quantities(&ctx, &ports, &active).unwrap();
    assert!((derived["eta_s"] - eta).abs() < 1e-9);
    assert!(derived["P"] > 0.0);
    assert!(compressor.derived(&ctx, &ports, &active, "kA").is_err());
}

#[test]
fn adiabatic_chamber_state_satisfies_every_balance() {
    let evaluator = evaluator();
    let fluids = combustion_fluids();
    let ctx = ctx(&evaluator, &fluids, Mode::Design, None);
    let chamber = CombustionChamber;

    let air = stream(&evaluator, &fluids, 1.0, 1e5, 303.15, &AIR);
    let fuel = stream(&evaluator, &fluids, 0.02, 1e5, 303.15, &FUEL);
    let guess = chamber
        .outlet_guess(
            &fluids,
            &[
                Some(FlowGuess {
                    m: air.m,
                    x: air.x.clone(),
                }),
                Some(FlowGuess {
                    m: fuel.m,
                    x: fuel.x.clone(),
                }),
            ],
            0,
        )
        .unwrap();

    // enthalpy that closes the energy balance
    let lhv = Species::CH4.lower_heating_value().unwrap();
    let ti = 0.02 * 0.96 * lhv;
    let standard = |x: &[f64]| {
        evaluator
            .h_pt(1e5, 298.15, &Mixture::new(&fluids, x).unwrap())
            .unwrap()
    };
    let inflow = air.m * (air.h - standard(&air.x)) + fuel.m * (fuel.h - standard(&fuel.x));
    let flue = StreamState {
        m: guess.m,
        p: 1e5,
        h: standard(&guess.x) + (inflow + ti) / guess.m,
        x: guess.x.clone(),
    };

    let mut component = Component::new("chamber", chamber);
    component.set("ti", ti).unwrap();
    let active = component.resolve(Mode::Design, None).unwrap();
    let ports = [air, fuel, flue];
    let residuals = component.residuals(&ctx, &ports, &active).unwrap();
    assert_eq!(residuals.len(), fluids.len() + 4 + 1);
    for r in &residuals {
        assert!(r.abs() < 1e-6, "residuals = {residuals:?}");
    }

    let derived = component.derived_quantities(&ctx, &ports, &active).unwrap();
    assert!((derived["TI"] - ti).abs() < 1e-6);
    assert!(derived["lamb"] > 2.5 && derived["lamb"] < 3.5);
    let t_flue = ctx.temperature(&ports[2]).unwrap();
    assert!(t_flue > 900.0 && t_flue < 1300.0, "T = {t_flue}");
}

#[test]
fn chamber_rejects_fluid_sets_without_products() {
    let chamber = Component::new("chamber", CombustionChamber);
    let fluids = FluidSet::new([Species::N2, Species::O2, Species::CH4]).unwrap();
    assert!(matches!(
        chamber.check_fluids(&fluids),
        Err(ComponentError::Setup { .. })
    ));
    assert!(chamber.check_fluids(&combustion_fluids()).is_ok());
}

#[test]
fn engine_power_follows_the_thermal_input_line() {
    let evaluator = evaluator();
    let fluids = combustion_fluids();
    let engine = Component::new("engine", CombustionEngine);
    let ports = [
        stream(&evaluator, &fluids, 5.0, 3e5, 330.0, &NITROGEN),
        stream(&evaluator, &fluids, 5.0, 3e5, 350.0, &NITROGEN),
        stream(&evaluator, &fluids, 0.5, 5e5, 303.15, &AIR),
        stream(&evaluator, &fluids, 0.02, 5e5, 303.15, &FUEL),
        stream(&evaluator, &fluids, 5.0, 2.97e5, 370.0, &NITROGEN),
        stream(&evaluator, &fluids, 5.0, 2.97e5, 390.0, &NITROGEN),
        stream(&evaluator, &fluids, 0.52, 5e5, 600.0, &AIR),
    ];
    let ti = 0.02 * 0.96 * Species::CH4.lower_heating_value().unwrap();

    let design = engine.resolve(Mode::Design, None).unwrap();
    assert!(design.equations().is_empty());
    assert_eq!(engine.equation_count(fluids.len(), &design), 3 * fluids.len() + 8);

    let design_ctx = ctx(&evaluator, &fluids, Mode::Design, None);
    let derived = engine.derived_quantities(&design_ctx, &ports, &design).unwrap();
    assert!((derived["TI"] - ti).abs() < 1e-6);
    assert!((derived["P"] - ti / 2.33).abs() < 1e-6);
    assert!((derived["Q"] - derived["Q1"] - derived["Q2"]).abs() < 1e-6);
    let loss = derived["TI"] - derived["Q"] - derived["P"];
    assert!((derived["Qloss"] - loss).abs() < 1e-6);

    // at twice the design power the engine runs at half load
    let point: DesignPoint = BTreeMap::from([("P".to_string(), 2.0 * ti / 2.60)]);
    let offdesign_ctx = ctx(&evaluator, &fluids, Mode::Offdesign, Some(&point));
    let active = engine.resolve(Mode::Offdesign, Some(&point)).unwrap();
    let derived = engine
        .derived_quantities(&offdesign_ctx, &ports, &active)
        .unwrap();
    assert!((derived["P"] - ti / 2.60).abs() < 1e-3, "P = {}", derived["P"]);

    let missing = ctx(&evaluator, &fluids, Mode::Offdesign, None);
    assert!(matches!(
        engine.derived_quantities(&missing, &ports, &active),
        Err(ComponentError::MissingDesignValue { .. })
    ));
}
