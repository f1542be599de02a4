//! Starting values of a solve.
//!
//! Every stream variable takes the first available of: its fixed value, the
//! warm-start state (initialization snapshot or previous solution), the
//! user's guess, a value propagated through the topology or a component
//! hint, and finally a generic default.

use tn_components::{FlowGuess, GuessHint, Port, StreamState};
use tn_core::ConnId;
use tn_fluids::{FluidSet, Mixture, MixtureEvaluator};
use tracing::debug;

use crate::connection::{Attr, Connection, VarSpec};
use crate::network::Network;

const DEFAULT_M: f64 = 1.0;
const DEFAULT_P: f64 = 1e5;
const DEFAULT_T: f64 = 300.0;

#[derive(Debug, Clone, Default)]
struct Partial {
    m: Option<f64>,
    p: Option<f64>,
    h: Option<f64>,
    x: Option<Vec<f64>>,
}

impl Partial {
    fn flow(&self) -> Option<FlowGuess> {
        Some(FlowGuess {
            m: self.m?,
            x: self.x.clone()?,
        })
    }
}

/// Fill the unknowns of `target` from `known` where possible; true on change.
fn copy_flow(known: &Partial, target: &mut Partial) -> bool {
    let mut changed = false;
    if target.m.is_none() && known.m.is_some() {
        target.m = known.m;
        changed = true;
    }
    if target.x.is_none() && known.x.is_some() {
        target.x = known.x.clone();
        changed = true;
    }
    changed
}

fn resolve_ref(spec: Option<VarSpec>, values: &[Option<f64>]) -> Option<f64> {
    match spec? {
        VarSpec::Ref {
            conn,
            factor,
            delta,
        } => values.get(conn.index()).copied().flatten().map(|v| factor * v + delta),
        _ => None,
    }
}

fn h_at(
    evaluator: &MixtureEvaluator,
    fluids: &FluidSet,
    label: &str,
    p: f64,
    t: f64,
    x: &[f64],
) -> Option<f64> {
    match Mixture::new(fluids, x).and_then(|mix| evaluator.h_pt(p, t, &mix)) {
        Ok(h) => Some(h),
        Err(err) => {
            debug!(connection = label, p, t, %err, "enthalpy guess skipped");
            None
        }
    }
}

/// Complete starting streams for every connection.
///
/// `ports[c]` lists the connections of component `c`, inlets first.
pub(crate) fn initial_streams(
    net: &Network,
    ports: &[Vec<ConnId>],
    offdesign: bool,
    warm: Option<&[StreamState]>,
) -> Vec<StreamState> {
    let fluids = net.fluids();
    let evaluator = net.evaluator();
    let connections = net.connections();
    let components = net.components();
    let nf = fluids.len();

    let mut state: Vec<Partial> = connections
        .iter()
        .enumerate()
        .map(|(i, conn)| seed(conn, fluids, offdesign, warm.and_then(|w| w.get(i))))
        .collect();

    // mass flow, composition and pressure through the topology
    for _ in 0..=connections.len() {
        let mut changed = false;
        for (c, component) in components.iter().enumerate() {
            let model = component.model();
            let (n_in, n_out) = model.ports();
            let conns: Vec<usize> = ports[c].iter().map(|id| id.index()).collect();

            for &(i, o) in model.passthrough() {
                let (a, b) = (conns[i], conns[n_in + o]);
                let (from_a, from_b) = (state[a].clone(), state[b].clone());
                changed |= copy_flow(&from_a, &mut state[b]);
                changed |= copy_flow(&from_b, &mut state[a]);
            }

            let inlets: Vec<Option<FlowGuess>> =
                conns[..n_in].iter().map(|&k| state[k].flow()).collect();
            for o in 0..n_out {
                if model.passthrough().iter().any(|&(_, po)| po == o) {
                    continue;
                }
                let k = conns[n_in + o];
                if state[k].m.is_some() && state[k].x.is_some() {
                    continue;
                }
                if let Some(guess) = model.outlet_guess(fluids, &inlets, o) {
                    changed |= copy_flow(
                        &Partial {
                            m: Some(guess.m),
                            x: Some(guess.x),
                            ..Partial::default()
                        },
                        &mut state[k],
                    );
                }
            }

            if let Some(p) = conns.iter().find_map(|&k| state[k].p) {
                for &k in &conns {
                    if state[k].p.is_none() {
                        state[k].p = Some(p);
                        changed = true;
                    }
                }
            }
        }

        let m: Vec<Option<f64>> = state.iter().map(|s| s.m).collect();
        let p: Vec<Option<f64>> = state.iter().map(|s| s.p).collect();
        for (k, conn) in connections.iter().enumerate() {
            if state[k].m.is_none()
                && let Some(v) = resolve_ref(conn.spec(Attr::M, offdesign), &m)
            {
                state[k].m = Some(v);
                changed = true;
            }
            if state[k].p.is_none()
                && let Some(v) = resolve_ref(conn.spec(Attr::P, offdesign), &p)
            {
                state[k].p = Some(v);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (k, conn) in connections.iter().enumerate() {
        let s = &mut state[k];
        s.m = s.m.or(Some(DEFAULT_M));
        s.p = s.p.or(Some(DEFAULT_P));
        let x = s.x.get_or_insert_with(|| default_fractions(conn, fluids, offdesign));
        apply_fixed_fractions(conn, fluids, offdesign, x);
    }

    // enthalpy, once pressure and composition are known everywhere
    for _ in 0..=connections.len() {
        let mut changed = false;
        for k in 0..connections.len() {
            if state[k].h.is_some() {
                continue;
            }
            if let Some(h) = enthalpy_guess(net, ports, offdesign, &state, k) {
                state[k].h = Some(h);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    state
        .into_iter()
        .zip(connections)
        .map(|(s, conn)| {
            let p = s.p.unwrap_or(DEFAULT_P);
            let x = s.x.unwrap_or_else(|| vec![1.0 / nf as f64; nf]);
            let h = s
                .h
                .or_else(|| h_at(evaluator, fluids, conn.label(), p, DEFAULT_T, &x))
                .unwrap_or(0.0);
            StreamState {
                m: s.m.unwrap_or(DEFAULT_M),
                p,
                h,
                x,
            }
        })
        .collect()
}

fn seed(
    conn: &Connection,
    fluids: &FluidSet,
    offdesign: bool,
    warm: Option<&StreamState>,
) -> Partial {
    let (m0, p0, h0) = conn.guesses();
    let fixed = |attr| conn.spec(attr, offdesign).and_then(|s| s.fixed());

    let x = match (warm, conn.fixed_fluid(offdesign)) {
        (Some(w), _) => Some(w.x.clone()),
        (None, Some(spec)) if fluids.species().iter().all(|s| spec.get(*s).is_some()) => Some(
            fluids
                .species()
                .iter()
                .map(|s| spec.get(*s).unwrap_or(0.0))
                .collect(),
        ),
        _ if !conn.fluid_guess().is_empty() => Some(
            fluids
                .species()
                .iter()
                .map(|s| conn.fluid_guess().get(s).copied().unwrap_or(0.0))
                .collect(),
        ),
        _ => None,
    };
    let mut x = x;
    if let Some(x) = x.as_mut() {
        apply_fixed_fractions(conn, fluids, offdesign, x);
    }

    Partial {
        m: fixed(Attr::M).or(warm.map(|w| w.m)).or(m0),
        p: fixed(Attr::P).or(warm.map(|w| w.p)).or(p0),
        h: fixed(Attr::H).or(warm.map(|w| w.h)).or(h0),
        x,
    }
}

fn apply_fixed_fractions(conn: &Connection, fluids: &FluidSet, offdesign: bool, x: &mut [f64]) {
    if let Some(spec) = conn.fixed_fluid(offdesign) {
        for (k, species) in fluids.species().iter().enumerate() {
            if let Some(v) = spec.get(*species) {
                x[k] = v;
            }
        }
    }
}

/// Fixed fractions, with the remainder split evenly over the free species.
fn default_fractions(conn: &Connection, fluids: &FluidSet, offdesign: bool) -> Vec<f64> {
    let fixed: Vec<Option<f64>> = fluids
        .species()
        .iter()
        .map(|s| conn.fixed_fluid(offdesign).and_then(|spec| spec.get(*s)))
        .collect();
    let free = fixed.iter().filter(|f| f.is_none()).count();
    let rest = (1.0 - fixed.iter().flatten().sum::<f64>()).max(0.0);
    fixed
        .iter()
        .map(|f| f.unwrap_or(rest / free.max(1) as f64))
        .collect()
}

fn enthalpy_guess(
    net: &Network,
    ports: &[Vec<ConnId>],
    offdesign: bool,
    state: &[Partial],
    k: usize,
) -> Option<f64> {
    let fluids = net.fluids();
    let evaluator = net.evaluator();
    let conn = &net.connections()[k];
    let label = conn.label();
    let (p, x) = (state[k].p?, state[k].x.as_deref()?);

    if let Some(t) = conn.temperature(offdesign)
        && let Some(h) = h_at(evaluator, fluids, label, p, t, x)
    {
        return Some(h);
    }

    let h: Vec<Option<f64>> = state.iter().map(|s| s.h).collect();
    if let Some(v) = resolve_ref(conn.spec(Attr::H, offdesign), &h) {
        return Some(v);
    }

    let ends = [conn.source(), conn.target()];
    let mut pending = false;
    for end in ends {
        let model = net.components()[end.component.index()].model();
        let Some(hint) = model.initial_hint(end.port) else {
            continue;
        };
        match hint {
            GuessHint::Temperature(t) => {
                if let Some(h) = h_at(evaluator, fluids, label, p, t, x) {
                    return Some(h);
                }
            }
            GuessHint::Quality(q) => {
                match Mixture::new(fluids, x).and_then(|mix| evaluator.h_saturated(p, q, &mix)) {
                    Ok(h) => return Some(h),
                    Err(err) => debug!(connection = label, p, q, %err, "saturation guess skipped"),
                }
            }
            GuessHint::EnthalpyRise(dh) => {
                if let Port::Outlet(o) = end.port
                    && let Some(&(i, _)) = model.passthrough().iter().find(|(_, po)| *po == o)
                {
                    let inlet = ports[end.component.index()][i].index();
                    match h[inlet] {
                        Some(h_in) => return Some(h_in + dh),
                        None => pending = true,
                    }
                }
            }
        }
    }
    if pending {
        return None;
    }

    // same enthalpy as the stream on the other side of a pass-through pair
    for end in ends {
        let c = end.component.index();
        let model = net.components()[c].model();
        let n_in = model.ports().0;
        let across = model.passthrough().iter().find_map(|&(i, o)| match end.port {
            Port::Outlet(po) if po == o => Some(ports[c][i].index()),
            Port::Inlet(pi) if pi == i => Some(ports[c][n_in + o].index()),
            _ => None,
        });
        if let Some(v) = across.and_then(|a| h[a]) {
            return Some(v);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tn_components::{Component, HeatExchangerSimple, Sink, Source};
    use tn_core::{bar, k, kgps};
    use tn_fluids::{Composition, IdealGasSource, Species};

    use super::*;

    fn heater_line() -> (Network, Vec<Vec<ConnId>>) {
        let fluids = FluidSet::new([Species::N2, Species::O2]).unwrap();
        let mut net = Network::new(
            fluids,
            MixtureEvaluator::new(Arc::new(IdealGasSource::new())),
        );
        let source = net.add_component(Component::new("source", Source)).unwrap();
        let heater = net
            .add_component(Component::new("heater", HeatExchangerSimple))
            .unwrap();
        let sink = net.add_component(Component::new("sink", Sink)).unwrap();
        let c1 = net
            .connect("c1", (source, Port::Outlet(0)), (heater, Port::Inlet(0)))
            .unwrap();
        let c2 = net
            .connect("c2", (heater, Port::Outlet(0)), (sink, Port::Inlet(0)))
            .unwrap();
        let ports = vec![vec![c1], vec![c1, c2], vec![c2]];
        (net, ports)
    }

    #[test]
    fn flow_and_enthalpy_pass_through_the_heater() {
        let (mut net, ports) = heater_line();
        let c1 = net.connection_id("c1").unwrap();
        net.connection_mut(c1)
            .set_m(kgps(2.0))
            .set_p(bar(3.0))
            .set_t(k(320.0))
            .set_fluid(&Composition::pure(Species::N2));

        let streams = initial_streams(&net, &ports, false, None);
        assert_eq!(streams[1].m, 2.0);
        assert_eq!(streams[1].p, 3e5);
        assert_eq!(streams[1].x, vec![1.0, 0.0]);
        assert_eq!(streams[1].h, streams[0].h);
    }

    #[test]
    fn warm_state_yields_to_fixed_values() {
        let (mut net, ports) = heater_line();
        let c1 = net.connection_id("c1").unwrap();
        net.connection_mut(c1).set_m(kgps(2.0));
        let warm = vec![
            StreamState {
                m: 5.0,
                p: 4e5,
                h: 1e5,
                x: vec![0.5, 0.5],
            };
            2
        ];

        let streams = initial_streams(&net, &ports, false, Some(&warm));
        assert_eq!(streams[0].m, 2.0);
        assert_eq!(streams[0].p, 4e5);
        assert_eq!(streams[1].h, 1e5);
    }

    #[test]
    fn unspecified_streams_take_the_defaults() {
        let (mut net, ports) = heater_line();
        let c1 = net.connection_id("c1").unwrap();
        net.connection_mut(c1).set_fraction(Species::O2, 0.2);

        let streams = initial_streams(&net, &ports, false, None);
        assert_eq!(streams[0].m, DEFAULT_M);
        assert_eq!(streams[0].p, DEFAULT_P);
        assert!((streams[0].x[0] - 0.8).abs() < 1e-12);
        assert!((streams[0].x[1] - 0.2).abs() < 1e-12);
        assert!(streams[1].h.is_finite());
    }
}
