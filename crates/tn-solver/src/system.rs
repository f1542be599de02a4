//! Assembly of the global equation system of one solve.
//!
//! The unknown vector holds every free stream variable. Fixed values are
//! eliminated; reference specs keep their variable free and add an equation.
//! Rows are laid out in blocks: components in insertion order, then
//! connection equations (references, temperatures, fluid balances), then
//! busses with a target.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tn_components::{ActiveParams, ComponentError, DesignPoint, EvalContext, Mode, StreamState};
use tn_core::ConnId;
use tn_fluids::Mixture;

use crate::connection::{Attr, VarSpec};
use crate::error::{SolverError, SolverResult};
use crate::jacobian::finite_difference_columns;
use crate::network::Network;
use crate::newton::{NewtonProblem, Singularity};

/// Finite-difference scale floor per variable class (m, p, h, x).
const FD_SCALE: [f64; 4] = [1.0, 1e5, 1e5, 1.0];

const SCALAR_VARS: [(Attr, usize, &str); 3] = [
    (Attr::M, StreamState::M, "m"),
    (Attr::P, StreamState::P, "p"),
    (Attr::H, StreamState::H, "h"),
];

/// Position of every free stream variable in the unknown vector.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    width: usize,
    slots: Vec<Option<usize>>,
    unknowns: Vec<(usize, usize)>,
}

impl Layout {
    pub fn slot(&self, conn: usize, var: usize) -> Option<usize> {
        self.slots[conn * self.width + var]
    }

    pub fn len(&self) -> usize {
        self.unknowns.len()
    }

    /// (connection, variable) of unknown `j`.
    pub fn unknown(&self, j: usize) -> (usize, usize) {
        self.unknowns[j]
    }
}

#[derive(Debug, Clone)]
enum BlockKind {
    Component(usize),
    Ref {
        conn: usize,
        var: usize,
        target: usize,
        factor: f64,
        delta: f64,
    },
    Temperature {
        conn: usize,
        t: f64,
    },
    FluidBalance(usize),
    Bus {
        bus: usize,
        target: f64,
    },
}

#[derive(Debug, Clone)]
struct Block {
    row: usize,
    rows: usize,
    kind: BlockKind,
}

/// Square system `F(x) = 0` of a network in one mode.
pub(crate) struct System<'a> {
    net: &'a Network,
    ports: &'a [Vec<ConnId>],
    mode: Mode,
    design: Option<&'a [DesignPoint]>,
    active: Vec<ActiveParams>,
    layout: Layout,
    template: Vec<StreamState>,
    blocks: Vec<Block>,
    equations: Vec<String>,
}

impl<'a> System<'a> {
    /// Lay out unknowns and equations for `mode`.
    ///
    /// `ports[c]` lists the connections of component `c`, inlets first.
    pub fn new(
        net: &'a Network,
        ports: &'a [Vec<ConnId>],
        mode: Mode,
        design: Option<&'a [DesignPoint]>,
    ) -> SolverResult<Self> {
        let offdesign = mode == Mode::Offdesign;
        let fluids = net.fluids();
        let nf = fluids.len();
        let width = StreamState::width(nf);
        let connections = net.connections();

        let active = net
            .components()
            .iter()
            .enumerate()
            .map(|(i, c)| c.resolve(mode, design.map(|d| &d[i])))
            .collect::<Result<Vec<_>, _>>()?;

        let mut slots = vec![None; connections.len() * width];
        let mut unknowns = Vec::new();
        let mut template = Vec::with_capacity(connections.len());
        for (ci, conn) in connections.iter().enumerate() {
            let mut stream = StreamState {
                m: 0.0,
                p: 0.0,
                h: 0.0,
                x: vec![0.0; nf],
            };
            for (attr, var, _) in SCALAR_VARS {
                match conn.spec(attr, offdesign).unwrap_or_default() {
                    VarSpec::Fixed(v) => stream.set(var, v),
                    VarSpec::Free | VarSpec::Ref { .. } => {
                        slots[ci * width + var] = Some(unknowns.len());
                        unknowns.push((ci, var));
                    }
                }
            }
            let fixed = conn.fixed_fluid(offdesign);
            for (k, species) in fluids.species().iter().enumerate() {
                match fixed.and_then(|f| f.get(*species)) {
                    Some(v) => stream.x[k] = v,
                    None => {
                        let var = StreamState::X0 + k;
                        slots[ci * width + var] = Some(unknowns.len());
                        unknowns.push((ci, var));
                    }
                }
            }
            template.push(stream);
        }
        let layout = Layout {
            width,
            slots,
            unknowns,
        };

        let mut blocks = Vec::new();
        let mut equations = Vec::new();
        let mut push = |kind: BlockKind, labels: Vec<String>| {
            blocks.push(Block {
                row: equations.len(),
                rows: labels.len(),
                kind,
            });
            equations.extend(labels);
        };

        for (i, component) in net.components().iter().enumerate() {
            let structural = component.model().structural_equation_count(nf);
            let mut labels: Vec<String> = (0..structural)
                .map(|k| format!("{}: balance {}", component.name(), k + 1))
                .collect();
            labels.extend(
                active[i]
                    .equations()
                    .iter()
                    .map(|name| format!("{}: {name}", component.name())),
            );
            debug_assert_eq!(labels.len(), component.equation_count(nf, &active[i]));
            push(BlockKind::Component(i), labels);
        }

        for (ci, conn) in connections.iter().enumerate() {
            for (attr, var, name) in SCALAR_VARS {
                if let Some(VarSpec::Ref {
                    conn: target,
                    factor,
                    delta,
                }) = conn.spec(attr, offdesign)
                {
                    push(
                        BlockKind::Ref {
                            conn: ci,
                            var,
                            target: target.index(),
                            factor,
                            delta,
                        },
                        vec![format!("{}: {name} reference", conn.label())],
                    );
                }
            }
            if let Some(t) = conn.temperature(offdesign) {
                push(
                    BlockKind::Temperature { conn: ci, t },
                    vec![format!("{}: T", conn.label())],
                );
            }
            if conn.fluid_balance() {
                push(
                    BlockKind::FluidBalance(ci),
                    vec![format!("{}: fluid balance", conn.label())],
                );
            }
        }

        for (b, bus) in net.busses().iter().enumerate() {
            if let Some(target) = bus.target() {
                push(
                    BlockKind::Bus { bus: b, target },
                    vec![format!("bus {}", bus.label())],
                );
            }
        }

        Ok(Self {
            net,
            ports,
            mode,
            design,
            active,
            layout,
            template,
            blocks,
            equations,
        })
    }

    pub fn unknown_count(&self) -> usize {
        self.layout.len()
    }

    pub fn equation_count(&self) -> usize {
        self.equations.len()
    }

    /// Fail unless the system is square.
    pub fn check_dof(&self) -> SolverResult<()> {
        let (unknowns, equations) = (self.unknown_count(), self.equation_count());
        if unknowns > equations {
            Err(SolverError::UnderDetermined {
                unknowns,
                equations,
            })
        } else if equations > unknowns {
            Err(SolverError::OverDetermined {
                unknowns,
                equations,
            })
        } else {
            Ok(())
        }
    }

    /// Name of unknown `j`, e.g. `c1.p` or `c3.x[CO2]`.
    pub fn unknown_label(&self, j: usize) -> String {
        let (conn, var) = self.layout.unknown(j);
        let label = self.net.connections()[conn].label();
        match var {
            StreamState::M => format!("{label}.m"),
            StreamState::P => format!("{label}.p"),
            StreamState::H => format!("{label}.h"),
            _ => {
                let species = self.net.fluids().species()[var - StreamState::X0];
                format!("{label}.x[{}]", species.key())
            }
        }
    }

    pub fn equation_label(&self, i: usize) -> &str {
        &self.equations[i]
    }

    /// Write the fixed values of this mode into `streams`.
    pub fn pin(&self, streams: &mut [StreamState]) {
        for (ci, (stream, fixed)) in streams.iter_mut().zip(&self.template).enumerate() {
            for var in 0..self.layout.width {
                if self.layout.slot(ci, var).is_none() {
                    stream.set(var, fixed.get(var));
                }
            }
        }
    }

    /// Unknown vector of complete stream states.
    pub fn gather(&self, streams: &[StreamState]) -> DVector<f64> {
        DVector::from_iterator(
            self.layout.len(),
            self.layout
                .unknowns
                .iter()
                .map(|&(conn, var)| streams[conn].get(var)),
        )
    }

    /// Stream states at the unknown vector `x`.
    pub fn streams(&self, x: &DVector<f64>) -> Vec<StreamState> {
        let mut streams = self.template.clone();
        for (j, &(conn, var)) in self.layout.unknowns.iter().enumerate() {
            streams[conn].set(var, x[j]);
        }
        streams
    }

    fn context(&self, comp: usize) -> EvalContext<'_> {
        let component = &self.net.components()[comp];
        EvalContext {
            component: component.name(),
            evaluator: self.net.evaluator(),
            fluids: self.net.fluids(),
            mode: self.mode,
            design: self.design.map(|d| &d[comp]),
        }
    }

    fn port_states(&self, comp: usize, streams: &[StreamState]) -> Vec<StreamState> {
        self.ports[comp]
            .iter()
            .map(|c| streams[c.index()].clone())
            .collect()
    }

    /// Fill the property cache with every stream temperature, in parallel.
    ///
    /// Failures are left for the sequential pass to report.
    fn prefetch(&self, streams: &[StreamState]) {
        let fluids = self.net.fluids();
        let evaluator = self.net.evaluator();
        streams.par_iter().for_each(|s| {
            if let Ok(mix) = Mixture::new(fluids, &s.x) {
                let _ = evaluator.t_ph(s.p, s.h, &mix);
            }
        });
    }

    fn temperature_residual(&self, conn: usize, t: f64, stream: &StreamState) -> SolverResult<f64> {
        let fluids = self.net.fluids();
        let h = Mixture::new(fluids, &stream.x)
            .and_then(|mix| self.net.evaluator().h_pt(stream.p, t, &mix))
            .map_err(|e| {
                let label = self.net.connections()[conn].label();
                SolverError::during(format!("connection {label}"), ComponentError::from(e))
            })?;
        Ok(stream.h - h)
    }

    /// Realized bus value at the given streams.
    pub fn bus_value(&self, bus: usize, streams: &[StreamState]) -> SolverResult<f64> {
        let bus = &self.net.busses()[bus];
        let quantities = bus
            .members()
            .iter()
            .map(|member| {
                let comp = member.component.index();
                let ports = self.port_states(comp, streams);
                self.net.components()[comp]
                    .derived(&self.context(comp), &ports, &self.active[comp], member.quantity)
                    .map_err(|e| SolverError::during(format!("bus {}", bus.label()), e))
            })
            .collect::<SolverResult<Vec<f64>>>()?;
        Ok(bus.value(quantities))
    }

    fn block_residuals(
        &self,
        block: &Block,
        streams: &[StreamState],
        out: &mut [f64],
    ) -> SolverResult<()> {
        match block.kind {
            BlockKind::Component(comp) => {
                let component = &self.net.components()[comp];
                let ports = self.port_states(comp, streams);
                let r = component
                    .residuals(&self.context(comp), &ports, &self.active[comp])
                    .map_err(|e| SolverError::during(component.name(), e))?;
                out.copy_from_slice(&r);
            }
            BlockKind::Ref {
                conn,
                var,
                target,
                factor,
                delta,
            } => {
                out[0] = streams[conn].get(var) - (factor * streams[target].get(var) + delta);
            }
            BlockKind::Temperature { conn, t } => {
                out[0] = self.temperature_residual(conn, t, &streams[conn])?;
            }
            BlockKind::FluidBalance(conn) => {
                out[0] = streams[conn].x.iter().sum::<f64>() - 1.0;
            }
            BlockKind::Bus { bus, target } => {
                out[0] = self.bus_value(bus, streams)? - target;
            }
        }
        Ok(())
    }

    /// Residual vector at the given streams.
    pub fn residual_vector(&self, streams: &[StreamState]) -> SolverResult<DVector<f64>> {
        if self.net.config().parallel_properties {
            self.prefetch(streams);
        }
        let mut r = DVector::zeros(self.equations.len());
        for block in &self.blocks {
            self.block_residuals(
                block,
                streams,
                &mut r.as_mut_slice()[block.row..block.row + block.rows],
            )?;
        }
        Ok(r)
    }

    fn fd_step(&self, j: usize, value: f64) -> f64 {
        let (_, var) = self.layout.unknown(j);
        self.net.config().fd_step * value.abs().max(FD_SCALE[var.min(StreamState::X0)])
    }

    /// Forward differences of one block over the unknowns of `conns`.
    fn block_differences(
        &self,
        block: &Block,
        conns: &[usize],
        x: &DVector<f64>,
        jac: &mut DMatrix<f64>,
    ) -> SolverResult<()> {
        let mut columns: Vec<usize> = conns
            .iter()
            .flat_map(|&c| (0..self.layout.width).filter_map(move |v| self.layout.slot(c, v)))
            .collect();
        columns.sort_unstable();
        columns.dedup();
        let local = finite_difference_columns(
            x,
            &columns,
            |j, v| self.fd_step(j, v),
            |x| {
                let mut out = DVector::zeros(block.rows);
                self.block_residuals(block, &self.streams(x), out.as_mut_slice())?;
                Ok(out)
            },
        )?;
        for (k, &j) in columns.iter().enumerate() {
            for i in 0..block.rows {
                jac[(block.row + i, j)] = local[(i, k)];
            }
        }
        Ok(())
    }

    /// Jacobian at the unknown vector `x`.
    pub fn jacobian_matrix(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let streams = self.streams(x);
        if self.net.config().parallel_properties {
            self.prefetch(&streams);
        }
        let width = self.layout.width;
        let mut jac = DMatrix::zeros(self.equations.len(), self.layout.len());
        for block in &self.blocks {
            match block.kind {
                BlockKind::Component(comp) => {
                    let component = &self.net.components()[comp];
                    let ports = &self.ports[comp];
                    let free: Vec<bool> = ports
                        .iter()
                        .flat_map(|c| (0..width).map(|v| self.layout.slot(c.index(), v).is_some()))
                        .collect();
                    let local = component
                        .jacobian(
                            &self.context(comp),
                            &self.port_states(comp, &streams),
                            &self.active[comp],
                            &free,
                            self.net.config().fd_step,
                        )
                        .map_err(|e| SolverError::during(component.name(), e))?;
                    for (p, conn) in ports.iter().enumerate() {
                        for var in 0..width {
                            if let Some(j) = self.layout.slot(conn.index(), var) {
                                for i in 0..block.rows {
                                    jac[(block.row + i, j)] += local[(i, p * width + var)];
                                }
                            }
                        }
                    }
                }
                BlockKind::Ref {
                    conn,
                    var,
                    target,
                    factor,
                    ..
                } => {
                    if let Some(j) = self.layout.slot(conn, var) {
                        jac[(block.row, j)] += 1.0;
                    }
                    if let Some(j) = self.layout.slot(target, var) {
                        jac[(block.row, j)] -= factor;
                    }
                }
                BlockKind::Temperature { conn, .. } => {
                    self.block_differences(block, &[conn], x, &mut jac)?;
                }
                BlockKind::FluidBalance(conn) => {
                    for var in StreamState::X0..width {
                        if let Some(j) = self.layout.slot(conn, var) {
                            jac[(block.row, j)] = 1.0;
                        }
                    }
                }
                BlockKind::Bus { bus, .. } => {
                    let conns: Vec<usize> = self.net.busses()[bus]
                        .members()
                        .iter()
                        .flat_map(|m| self.ports[m.component.index()].iter().map(|c| c.index()))
                        .collect();
                    self.block_differences(block, &conns, x, &mut jac)?;
                }
            }
        }
        Ok(jac)
    }

    /// Derived quantities of every component at the given streams.
    pub fn derived(
        &self,
        streams: &[StreamState],
    ) -> SolverResult<Vec<std::collections::BTreeMap<&'static str, f64>>> {
        self.net
            .components()
            .iter()
            .enumerate()
            .map(|(i, component)| {
                let ports = self.port_states(i, streams);
                component
                    .derived_quantities(&self.context(i), &ports, &self.active[i])
                    .map_err(|e| SolverError::during(component.name(), e))
            })
            .collect()
    }
}

impl NewtonProblem for System<'_> {
    fn residuals(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        self.residual_vector(&self.streams(x))
    }

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        self.jacobian_matrix(x)
    }

    fn admissible(&self, x: &DVector<f64>) -> bool {
        let min_pressure = self.net.config().min_pressure;
        x.iter().enumerate().all(|(j, v)| {
            v.is_finite() && (self.layout.unknown(j).1 != StreamState::P || *v >= min_pressure)
        })
    }

    fn describe(&self, singularity: Singularity) -> String {
        match singularity {
            Singularity::EmptyRow(i) => {
                format!("equation '{}' depends on no unknown", self.equation_label(i))
            }
            Singularity::EmptyColumn(j) => {
                format!("{} appears in no equation", self.unknown_label(j))
            }
            Singularity::Pivot(j) => {
                format!("{} is not independently determined", self.unknown_label(j))
            }
            Singularity::NonFinite(i) => {
                format!("non-finite derivative in equation '{}'", self.equation_label(i))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tn_components::{Component, HeatExchangerSimple, Port, Sink, Source};
    use tn_core::{bar, k, kgps};
    use tn_fluids::{Composition, FluidSet, IdealGasSource, MixtureEvaluator, Species};

    use super::*;
    use crate::init::initial_streams;
    use crate::jacobian::finite_difference_jacobian;

    fn heater_line() -> (Network, Vec<Vec<ConnId>>) {
        let fluids = FluidSet::new([Species::N2]).unwrap();
        let mut net = Network::new(
            fluids,
            MixtureEvaluator::new(Arc::new(IdealGasSource::new())),
        );
        let source = net.add_component(Component::new("source", Source)).unwrap();
        let heater = Component::new("heater", HeatExchangerSimple)
            .with("Q", 5e4)
            .and_then(|c| c.with("pr", 0.95))
            .unwrap();
        let heater = net.add_component(heater).unwrap();
        let sink = net.add_component(Component::new("sink", Sink)).unwrap();
        let c1 = net
            .connect("c1", (source, Port::Outlet(0)), (heater, Port::Inlet(0)))
            .unwrap();
        let c2 = net
            .connect("c2", (heater, Port::Outlet(0)), (sink, Port::Inlet(0)))
            .unwrap();
        net.connection_mut(c1)
            .set_m(kgps(0.5))
            .set_p(bar(2.0))
            .set_t(k(320.0))
            .set_fluid(&Composition::pure(Species::N2));
        (net, vec![vec![c1], vec![c1, c2], vec![c2]])
    }

    #[test]
    fn fixed_values_leave_the_unknown_vector() {
        let (net, ports) = heater_line();
        let system = System::new(&net, &ports, Mode::Design, None).unwrap();
        system.check_dof().unwrap();

        let unknowns: Vec<String> = (0..system.unknown_count())
            .map(|j| system.unknown_label(j))
            .collect();
        assert_eq!(unknowns, ["c1.h", "c2.m", "c2.p", "c2.h", "c2.x[N2]"]);
        let equations: Vec<&str> = (0..system.equation_count())
            .map(|i| system.equation_label(i))
            .collect();
        assert_eq!(
            equations,
            ["heater: balance 1", "heater: balance 2", "heater: Q", "heater: pr", "c1: T"]
        );
    }

    #[test]
    fn pinned_streams_round_trip_through_the_unknowns() {
        let (net, ports) = heater_line();
        let system = System::new(&net, &ports, Mode::Design, None).unwrap();
        let mut streams = initial_streams(&net, &ports, false, None);
        system.pin(&mut streams);
        assert_eq!(streams[0].m, 0.5);
        assert_eq!(streams[0].p, 2e5);

        let x = system.gather(&streams);
        assert_eq!(system.streams(&x), streams);
    }

    #[test]
    fn assembled_jacobian_matches_differences_of_the_residuals() {
        let (net, ports) = heater_line();
        let system = System::new(&net, &ports, Mode::Design, None).unwrap();
        let mut streams = initial_streams(&net, &ports, false, None);
        system.pin(&mut streams);
        let x = system.gather(&streams);

        let jac = system.jacobian_matrix(&x).unwrap();
        let fd = finite_difference_jacobian(&x, |x| system.residual_vector(&system.streams(x)), 1e-7)
            .unwrap();
        for i in 0..jac.nrows() {
            for j in 0..jac.ncols() {
                let scale = fd[(i, j)].abs().max(1.0);
                assert!(
                    (jac[(i, j)] - fd[(i, j)]).abs() < 1e-3 * scale,
                    "d{} / d{}: {} vs {}",
                    system.equation_label(i),
                    system.unknown_label(j),
                    jac[(i, j)],
                    fd[(i, j)]
                );
            }
        }
    }

    #[test]
    fn released_temperature_underdetermines() {
        let (mut net, ports) = heater_line();
        let c1 = net.connection_id("c1").unwrap();
        net.connection_mut(c1).unset(Attr::T);
        let system = System::new(&net, &ports, Mode::Design, None).unwrap();
        assert!(matches!(
            system.check_dof(),
            Err(SolverError::UnderDetermined {
                unknowns: 5,
                equations: 4
            })
        ));
    }
}
