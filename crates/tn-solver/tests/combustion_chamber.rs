//! Combustion chamber networks solved against the ideal-gas property source.

use std::sync::Arc;

use tn_components::{Characteristic, CombustionChamber, Component, Port, Sink, Source};
use tn_core::{BusId, CompId, ConnId, bar, k, kgps};
use tn_fluids::{Composition, FluidSet, IdealGasSource, MixtureEvaluator, Species};
use tn_solver::{Network, SolveOptions, SolveStatus, SolverConfig, SolverError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

fn air() -> Composition {
    Composition::new_mass_fractions(vec![
        (Species::N2, 0.7556),
        (Species::O2, 0.2315),
        (Species::Ar, 0.0129),
    ])
    .unwrap()
}

struct Chamber {
    net: Network,
    chamber: CompId,
    air: ConnId,
    fuel: ConnId,
    flue: ConnId,
    thermal_input: BusId,
}

/// Air and methane burnt at `lamb`, fuel flow set by a thermal input bus.
fn chamber(lamb: f64, thermal_input: f64) -> Chamber {
    init_tracing();
    let fluids = FluidSet::new([
        Species::H2O,
        Species::N2,
        Species::O2,
        Species::Ar,
        Species::CO2,
        Species::CH4,
    ])
    .unwrap();
    let evaluator = MixtureEvaluator::new(Arc::new(IdealGasSource::new()));
    let mut net = Network::new(fluids, evaluator);

    let air_in = net.add_component(Component::new("air", Source)).unwrap();
    let fuel_in = net.add_component(Component::new("fuel", Source)).unwrap();
    let chamber = net
        .add_component(
            Component::new("combustion", CombustionChamber)
                .with("lamb", lamb)
                .unwrap(),
        )
        .unwrap();
    let stack = net.add_component(Component::new("stack", Sink)).unwrap();

    let air = net
        .connect("air", (air_in, Port::Outlet(0)), (chamber, Port::Inlet(0)))
        .unwrap();
    let fuel = net
        .connect("fuel", (fuel_in, Port::Outlet(0)), (chamber, Port::Inlet(1)))
        .unwrap();
    let flue = net
        .connect("flue", (chamber, Port::Outlet(0)), (stack, Port::Inlet(0)))
        .unwrap();

    net.connection_mut(air)
        .set_p(bar(1.0))
        .set_t(k(300.0))
        .set_fluid(&crate::air())
        .guess_m(kgps(1.0));
    net.connection_mut(fuel)
        .set_t(k(300.0))
        .set_fluid(&Composition::pure(Species::CH4))
        .guess_m(kgps(0.02));

    let bus = net.add_bus("thermal input").unwrap();
    net.add_bus_component(bus, chamber, None, Characteristic::identity())
        .unwrap();
    net.set_bus_target(bus, Some(thermal_input));

    Chamber {
        net,
        chamber,
        air,
        fuel,
        flue,
        thermal_input: bus,
    }
}

#[test]
fn thermal_input_bus_sets_the_fuel_flow() {
    let mut c = chamber(3.0, 1e6);
    let summary = c.net.solve(SolveOptions::design()).unwrap();
    assert_eq!(c.net.status(), SolveStatus::Converged);
    assert!(summary.residual < 1e-5);
    assert_eq!(summary.unknowns, 14);

    assert!((c.net.bus_value(c.thermal_input).unwrap() - 1e6).abs() < 0.1);
    let ti = c.net.derived_value(c.chamber, "TI").unwrap();
    let fuel = c.net.stream(c.fuel).unwrap();
    let lhv = Species::CH4.lower_heating_value().unwrap();
    assert!((ti - fuel.m * fuel.x[5] * lhv).abs() < 1e-6 * ti);
    assert!((c.net.derived_value(c.chamber, "lamb").unwrap() - 3.0).abs() < 1e-8);

    let (m_air, m_fuel) = (c.net.stream(c.air).unwrap().m, fuel.m);
    let flue = c.net.stream(c.flue).unwrap();
    assert!((flue.m - m_air - m_fuel).abs() < 1e-9);
    assert!((flue.x.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(flue.x[5].abs() < 1e-9, "lean combustion leaves no methane");

    let t_flue = c.net.temperature(c.flue).unwrap();
    assert!(t_flue > 900.0 && t_flue < 1400.0, "flue gas at {t_flue} K");
}

#[test]
fn stoichiometric_combustion_consumes_the_oxygen() {
    let mut c = chamber(1.0, 5e5);
    c.net.solve(SolveOptions::design()).unwrap();

    let flue = c.net.stream(c.flue).unwrap();
    assert!(flue.x[2] < 1e-4, "O2 left: {}", flue.x[2]);
    assert!(flue.x[5] < 1e-4, "CH4 left: {}", flue.x[5]);
    assert!(flue.x[4] > 0.1 && flue.x[0] > 0.05);
}

#[test]
fn parallel_property_prefetch_gives_the_same_solution() {
    let mut serial = chamber(2.0, 8e5);
    serial.net.solve(SolveOptions::design()).unwrap();

    let mut parallel = chamber(2.0, 8e5);
    parallel.net.set_config(SolverConfig {
        parallel_properties: true,
        ..SolverConfig::default()
    });
    parallel.net.solve(SolveOptions::design()).unwrap();

    for conn in [serial.air, serial.fuel, serial.flue] {
        let (a, b) = (
            serial.net.stream(conn).unwrap(),
            parallel.net.stream(conn).unwrap(),
        );
        assert!((a.m - b.m).abs() < 1e-9);
        assert!((a.h - b.h).abs() < 1e-3);
    }
    let stats = parallel.net.evaluator().cache().stats();
    assert!(stats.hits > 0);
}

#[test]
fn dropping_the_bus_target_leaves_the_system_underdetermined() {
    let mut c = chamber(3.0, 1e6);
    c.net.set_bus_target(c.thermal_input, None);
    match c.net.solve(SolveOptions::design()) {
        Err(SolverError::UnderDetermined {
            unknowns,
            equations,
        }) => {
            assert_eq!(unknowns, 14);
            assert_eq!(equations, 13);
        }
        other => panic!("expected UnderDetermined, got {other:?}"),
    }
    assert!(matches!(
        c.net.derived(c.chamber),
        Err(SolverError::NotSolved { .. })
    ));
}

#[test]
fn fixing_thermal_input_twice_overdetermines() {
    let mut c = chamber(3.0, 1e6);
    c.net.component_mut(c.chamber).set("ti", 1e6).unwrap();
    assert!(matches!(
        c.net.solve(SolveOptions::design()),
        Err(SolverError::OverDetermined {
            unknowns: 14,
            equations: 15
        })
    ));
}

#[test]
fn report_serializes_the_solution() {
    let mut c = chamber(3.0, 1e6);
    c.net.solve(SolveOptions::design()).unwrap();

    let report = c.net.report().unwrap();
    assert_eq!(report.mode, "design");
    assert_eq!(report.connections.len(), 3);
    assert!(report.residual_history.last().unwrap() < &1e-5);
    let flue = report.connection("flue").unwrap();
    assert!(flue.fluid.contains_key("CO2"));
    assert!(!flue.fluid.contains_key("CH4"));
    assert_eq!(report.component("combustion").unwrap().kind, "combustion chamber");
    assert!((report.busses[0].value - 1e6).abs() < 0.1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["busses"][0]["label"], "thermal input");
    assert!(json["components"][2]["derived"]["TI"].as_f64().unwrap() > 9.9e5);
}
