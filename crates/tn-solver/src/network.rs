//! The network: components, connections and busses, and their solution.

use std::collections::BTreeMap;

use tn_components::{
    Characteristic, Component, DesignPoint, Mode, ParamSpec, Port, StreamState,
};
use tn_core::{BusId, CompId, ConnId};
use tn_fluids::{FluidSet, Mixture, MixtureEvaluator, ReferenceState};
use tn_project::{
    BusMemberDef, BusRecord, ComponentDef, ComponentRecord, ConnectionDef, EndpointDef,
    ReferenceDef, Snapshot, StreamRecord, TopologyDef,
};
use tracing::{debug, info, warn};

use crate::bus::{Bus, BusMember};
use crate::config::SolverConfig;
use crate::connection::{Attr, Connection, Endpoint, VarSpec};
use crate::error::{SolverError, SolverResult};
use crate::init::initial_streams;
use crate::newton::{NewtonResult, newton_solve};
use crate::report::{BusReport, ComponentReport, NetworkReport, StreamReport};
use crate::system::System;

/// Outcome of the most recent solve or state load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveStatus {
    #[default]
    NotSolved,
    Converged,
    Failed,
    /// Streams and design point restored from a snapshot
    Loaded,
}

/// What to solve and which stored states to use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions<'a> {
    pub mode: Mode,
    /// Design point for an off-design solve; defaults to the last design solve
    pub design: Option<&'a Snapshot>,
    /// Starting values, preferred over the previous solution
    pub init: Option<&'a Snapshot>,
}

impl<'a> SolveOptions<'a> {
    pub fn design() -> Self {
        Self::default()
    }

    pub fn offdesign() -> Self {
        Self {
            mode: Mode::Offdesign,
            ..Self::default()
        }
    }

    pub fn with_design(mut self, snapshot: &'a Snapshot) -> Self {
        self.design = Some(snapshot);
        self
    }

    pub fn with_init(mut self, snapshot: &'a Snapshot) -> Self {
        self.init = Some(snapshot);
        self
    }
}

/// Summary of a converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveSummary {
    pub mode: Mode,
    pub iterations: usize,
    pub unknowns: usize,
    /// Max |residual| at the solution
    pub residual: f64,
}

#[derive(Debug, Default)]
struct SolveState {
    status: SolveStatus,
    mode: Mode,
    iterations: usize,
    history: Vec<f64>,
    last_residual: Option<Vec<f64>>,
    streams: Option<Vec<StreamState>>,
    derived: Vec<BTreeMap<&'static str, f64>>,
    design: Option<Vec<DesignPoint>>,
}

/// A steady-state thermal network.
///
/// Components and connections are added once; specifications may change
/// between solves. Every solve warm-starts from the previous solution.
#[derive(Debug)]
pub struct Network {
    fluids: FluidSet,
    evaluator: MixtureEvaluator,
    config: SolverConfig,
    components: Vec<Component>,
    /// Connection at every port, inlets first
    ports: Vec<Vec<Option<ConnId>>>,
    connections: Vec<Connection>,
    busses: Vec<Bus>,
    bus_index: BTreeMap<CompId, Vec<BusId>>,
    state: SolveState,
}

impl Network {
    pub fn new(fluids: FluidSet, evaluator: MixtureEvaluator) -> Self {
        Self {
            fluids,
            evaluator,
            config: SolverConfig::default(),
            components: Vec::new(),
            ports: Vec::new(),
            connections: Vec::new(),
            busses: Vec::new(),
            bus_index: BTreeMap::new(),
            state: SolveState::default(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    pub fn fluids(&self) -> &FluidSet {
        &self.fluids
    }

    pub fn evaluator(&self) -> &MixtureEvaluator {
        &self.evaluator
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn busses(&self) -> &[Bus] {
        &self.busses
    }

    // ---- building ----

    pub fn add_component(&mut self, component: Component) -> SolverResult<CompId> {
        if self.component_id(component.name()).is_some() {
            return Err(SolverError::Setup {
                what: format!("duplicate component name '{}'", component.name()),
            });
        }
        component.check_fluids(&self.fluids)?;
        let (n_in, n_out) = component.ports();
        self.components.push(component);
        self.ports.push(vec![None; n_in + n_out]);
        self.reset();
        Ok(CompId::from_index(self.components.len() - 1))
    }

    pub fn component(&self, id: CompId) -> &Component {
        &self.components[id.index()]
    }

    /// Mutable access for changing parameters between solves.
    pub fn component_mut(&mut self, id: CompId) -> &mut Component {
        &mut self.components[id.index()]
    }

    pub fn component_id(&self, name: &str) -> Option<CompId> {
        self.components
            .iter()
            .position(|c| c.name() == name)
            .map(CompId::from_index)
    }

    fn port_slot(&self, comp: CompId, port: Port) -> SolverResult<usize> {
        let component = self
            .components
            .get(comp.index())
            .ok_or_else(|| SolverError::Setup {
                what: format!("unknown component {comp:?}"),
            })?;
        let (n_in, n_out) = component.ports();
        match port {
            Port::Inlet(i) if i < n_in => Ok(i),
            Port::Outlet(o) if o < n_out => Ok(n_in + o),
            _ => Err(SolverError::Setup {
                what: format!("{} has no port {port}", component.name()),
            }),
        }
    }

    /// Connect an outlet to an inlet.
    pub fn connect(
        &mut self,
        label: impl Into<String>,
        source: (CompId, Port),
        target: (CompId, Port),
    ) -> SolverResult<ConnId> {
        let label = label.into();
        if self.connection_id(&label).is_some() {
            return Err(SolverError::Setup {
                what: format!("duplicate connection label '{label}'"),
            });
        }
        if !matches!(source.1, Port::Outlet(_)) || !matches!(target.1, Port::Inlet(_)) {
            return Err(SolverError::Setup {
                what: format!("{label}: connections run from an outlet to an inlet"),
            });
        }
        let from = self.port_slot(source.0, source.1)?;
        let to = self.port_slot(target.0, target.1)?;
        for (comp, slot, port) in [(source.0, from, source.1), (target.0, to, target.1)] {
            if self.ports[comp.index()][slot].is_some() {
                return Err(SolverError::Setup {
                    what: format!(
                        "{label}: port {port} of {} is already connected",
                        self.components[comp.index()].name()
                    ),
                });
            }
        }

        let id = ConnId::from_index(self.connections.len());
        self.connections.push(Connection::new(
            label,
            Endpoint {
                component: source.0,
                port: source.1,
            },
            Endpoint {
                component: target.0,
                port: target.1,
            },
        ));
        self.ports[source.0.index()][from] = Some(id);
        self.ports[target.0.index()][to] = Some(id);
        self.reset();
        Ok(id)
    }

    pub fn connection(&self, id: ConnId) -> &Connection {
        &self.connections[id.index()]
    }

    pub fn connection_mut(&mut self, id: ConnId) -> &mut Connection {
        &mut self.connections[id.index()]
    }

    pub fn connection_id(&self, label: &str) -> Option<ConnId> {
        self.connections
            .iter()
            .position(|c| c.label() == label)
            .map(ConnId::from_index)
    }

    pub fn add_bus(&mut self, label: impl Into<String>) -> SolverResult<BusId> {
        let label = label.into();
        if self.busses.iter().any(|b| b.label() == label) {
            return Err(SolverError::Setup {
                what: format!("duplicate bus label '{label}'"),
            });
        }
        self.busses.push(Bus::new(label));
        Ok(BusId::from_index(self.busses.len() - 1))
    }

    /// Put `comp` on a bus; `quantity` defaults to the component's bus quantity.
    pub fn add_bus_component(
        &mut self,
        bus: BusId,
        comp: CompId,
        quantity: Option<&str>,
        scale: Characteristic,
    ) -> SolverResult<()> {
        let component = &self.components[comp.index()];
        let quantity = match quantity {
            Some(name) => component.check_quantity(name)?,
            None => component
                .model()
                .default_bus_quantity()
                .ok_or_else(|| SolverError::Setup {
                    what: format!("{} has no default bus quantity", component.name()),
                })?,
        };
        self.busses[bus.index()].push(BusMember {
            component: comp,
            quantity,
            scale,
        });
        self.bus_index.entry(comp).or_default().push(bus);
        Ok(())
    }

    /// Required bus value; `None` leaves the bus as a pure output.
    pub fn set_bus_target(&mut self, bus: BusId, target: Option<f64>) {
        self.busses[bus.index()].set_target(target);
    }

    pub fn bus(&self, id: BusId) -> &Bus {
        &self.busses[id.index()]
    }

    /// Busses a component contributes to.
    pub fn busses_of(&self, comp: CompId) -> &[BusId] {
        self.bus_index.get(&comp).map(Vec::as_slice).unwrap_or(&[])
    }

    fn reset(&mut self) {
        self.state = SolveState::default();
    }

    // ---- topology ----

    pub fn topology(&self) -> TopologyDef {
        let endpoint = |end: Endpoint| EndpointDef {
            component: self.components[end.component.index()].name().to_string(),
            port: end.port.to_string(),
        };
        TopologyDef {
            fluids: self
                .fluids
                .species()
                .iter()
                .map(|s| s.key().to_string())
                .collect(),
            components: self
                .components
                .iter()
                .map(|c| ComponentDef {
                    name: c.name().to_string(),
                    kind: c.kind().to_string(),
                })
                .collect(),
            connections: self
                .connections
                .iter()
                .map(|c| ConnectionDef {
                    label: c.label().to_string(),
                    source: endpoint(c.source()),
                    target: endpoint(c.target()),
                })
                .collect(),
        }
    }

    pub fn fingerprint(&self) -> SolverResult<String> {
        Ok(tn_project::fingerprint(&self.topology())?)
    }

    fn check_snapshot(&self, snapshot: &Snapshot) -> SolverResult<()> {
        let expected = self.fingerprint()?;
        if snapshot.fingerprint != expected {
            return Err(SolverError::TopologyMismatch {
                expected,
                found: snapshot.fingerprint.clone(),
            });
        }
        let reference = self.evaluator.reference();
        if snapshot.reference.p != reference.p || snapshot.reference.t != reference.t {
            return Err(SolverError::Setup {
                what: format!(
                    "snapshot enthalpies refer to ({} Pa, {} K), the evaluator to ({} Pa, {} K)",
                    snapshot.reference.p, snapshot.reference.t, reference.p, reference.t
                ),
            });
        }
        Ok(())
    }

    fn streams_from(&self, snapshot: &Snapshot) -> SolverResult<Vec<StreamState>> {
        self.check_snapshot(snapshot)?;
        Ok(snapshot
            .connections
            .iter()
            .map(|record| StreamState {
                m: record.m,
                p: record.p,
                h: record.h,
                x: self
                    .fluids
                    .species()
                    .iter()
                    .map(|s| record.fluid.get(s.key()).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect())
    }

    fn design_from(&self, snapshot: &Snapshot) -> SolverResult<Vec<DesignPoint>> {
        self.check_snapshot(snapshot)?;
        Ok(snapshot.components.iter().map(|c| c.design.clone()).collect())
    }

    // ---- solving ----

    /// Connections of every component, inlets first; fails on open ports.
    fn port_table(&self) -> SolverResult<Vec<Vec<ConnId>>> {
        self.components
            .iter()
            .zip(&self.ports)
            .map(|(component, ports)| {
                let n_in = component.ports().0;
                ports
                    .iter()
                    .enumerate()
                    .map(|(slot, conn)| {
                        conn.ok_or_else(|| {
                            let port = if slot < n_in {
                                Port::Inlet(slot)
                            } else {
                                Port::Outlet(slot - n_in)
                            };
                            SolverError::Setup {
                                what: format!("port {port} of {} is not connected", component.name()),
                            }
                        })
                    })
                    .collect()
            })
            .collect()
    }

    fn check_setup(&self) -> SolverResult<()> {
        for (i, conn) in self.connections.iter().enumerate() {
            conn.validate()?;
            for attr in [Attr::M, Attr::P, Attr::H] {
                if let Some(VarSpec::Ref { conn: target, .. }) = conn.spec(attr, false) {
                    let valid = target.index() < self.connections.len() && target.index() != i;
                    if !valid {
                        return Err(SolverError::Setup {
                            what: format!("{}: invalid reference connection", conn.label()),
                        });
                    }
                }
            }
        }
        for component in &self.components {
            component.check_fluids(&self.fluids)?;
        }
        Ok(())
    }

    /// Design points for an off-design solve.
    fn design_points(&self, options: &SolveOptions<'_>) -> SolverResult<Option<Vec<DesignPoint>>> {
        if options.mode == Mode::Design {
            return Ok(None);
        }
        if let Some(snapshot) = options.design {
            return self.design_from(snapshot).map(Some);
        }
        match &self.state.design {
            Some(points) => Ok(Some(points.clone())),
            None => Err(SolverError::MissingDesignState {
                what: "no design snapshot was given and no design solve was run".into(),
            }),
        }
    }

    fn run(
        &self,
        ports: &[Vec<ConnId>],
        mode: Mode,
        design: Option<&[DesignPoint]>,
        warm: Option<&[StreamState]>,
    ) -> SolverResult<(NewtonResult, Vec<StreamState>, usize)> {
        let system = System::new(self, ports, mode, design)?;
        system.check_dof()?;
        info!(
            %mode,
            unknowns = system.unknown_count(),
            components = self.components.len(),
            connections = self.connections.len(),
            "solve started"
        );

        let mut streams = initial_streams(self, ports, mode == Mode::Offdesign, warm);
        system.pin(&mut streams);
        let x0 = system.gather(&streams);
        let result = newton_solve(&system, x0, &self.config.newton()).map_err(|e| {
            if let SolverError::SingularJacobian { what } = &e {
                warn!(%what, "singular Jacobian");
            }
            e
        })?;
        let streams = system.streams(&result.x);
        Ok((result, streams, system.unknown_count()))
    }

    /// Solve the network in the requested mode.
    ///
    /// On failure no partial results are kept; the status turns
    /// [`SolveStatus::Failed`] and, after non-convergence, the residuals of
    /// the last iterate stay available through [`last_residual`](Self::last_residual).
    pub fn solve(&mut self, options: SolveOptions<'_>) -> SolverResult<SolveSummary> {
        let ports = self.port_table()?;
        self.check_setup()?;
        let design = self.design_points(&options)?;
        let warm = match (options.init, options.design) {
            (Some(init), _) => Some(self.streams_from(init)?),
            (None, _) if self.state.streams.is_some() => self.state.streams.clone(),
            (None, Some(design)) => Some(self.streams_from(design)?),
            (None, None) => None,
        };

        let outcome = self.run(&ports, options.mode, design.as_deref(), warm.as_deref());
        let (result, streams, unknowns) = match outcome {
            Ok(done) => done,
            Err(err) => {
                self.fail(None, Vec::new(), 0);
                return Err(err);
            }
        };

        if !result.converged {
            warn!(
                iterations = result.iterations,
                residual = result.max_residual,
                stalled = result.stalled,
                "solve did not converge"
            );
            let (iterations, residual) = (result.iterations, result.max_residual);
            let err = if result.stalled {
                SolverError::Stagnation {
                    iterations,
                    residual,
                }
            } else {
                SolverError::NonConvergence {
                    iterations,
                    residual,
                }
            };
            self.fail(
                Some(result.residual.iter().copied().collect()),
                result.history,
                iterations,
            );
            return Err(err);
        }

        let derived = {
            let system = System::new(self, &ports, options.mode, design.as_deref())?;
            system.derived(&streams)
        };
        let derived = match derived {
            Ok(derived) => derived,
            Err(err) => {
                self.fail(None, result.history, result.iterations);
                return Err(err);
            }
        };

        let design = match options.mode {
            Mode::Design => derived
                .iter()
                .map(|d| d.iter().map(|(k, v)| (k.to_string(), *v)).collect())
                .collect(),
            Mode::Offdesign => design.unwrap_or_default(),
        };
        self.state = SolveState {
            status: SolveStatus::Converged,
            mode: options.mode,
            iterations: result.iterations,
            history: result.history,
            last_residual: Some(result.residual.iter().copied().collect()),
            streams: Some(streams),
            derived,
            design: Some(design),
        };

        let stats = self.evaluator.cache().stats();
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            evicted = stats.evicted,
            hit_rate = stats.hit_rate(),
            "property cache"
        );
        info!(
            mode = %options.mode,
            iterations = result.iterations,
            residual = result.max_residual,
            "solve converged"
        );
        Ok(SolveSummary {
            mode: options.mode,
            iterations: result.iterations,
            unknowns,
            residual: result.max_residual,
        })
    }

    fn fail(&mut self, last_residual: Option<Vec<f64>>, history: Vec<f64>, iterations: usize) {
        let state = &mut self.state;
        state.status = SolveStatus::Failed;
        state.last_residual = last_residual;
        state.history = history;
        state.iterations = iterations;
        state.derived.clear();
    }

    // ---- results ----

    pub fn status(&self) -> SolveStatus {
        self.state.status
    }

    pub fn iterations(&self) -> usize {
        self.state.iterations
    }

    pub fn residual_history(&self) -> &[f64] {
        &self.state.history
    }

    /// Residual vector of the last iterate, converged or not.
    pub fn last_residual(&self) -> Option<&[f64]> {
        self.state.last_residual.as_deref()
    }

    fn converged(&self, what: &'static str) -> SolverResult<()> {
        match self.state.status {
            SolveStatus::Converged => Ok(()),
            _ => Err(SolverError::NotSolved { what }),
        }
    }

    fn solution(&self, what: &'static str) -> SolverResult<&[StreamState]> {
        match (self.state.status, &self.state.streams) {
            (SolveStatus::Converged | SolveStatus::Loaded, Some(streams)) => Ok(streams),
            _ => Err(SolverError::NotSolved { what }),
        }
    }

    /// Residuals of the current state, evaluated afresh.
    pub fn residuals(&self) -> SolverResult<Vec<f64>> {
        let streams = self.solution("residuals")?;
        let ports = self.port_table()?;
        let system = System::new(self, &ports, self.state.mode, self.design_for_mode())?;
        Ok(system.residual_vector(streams)?.iter().copied().collect())
    }

    fn design_for_mode(&self) -> Option<&[DesignPoint]> {
        match self.state.mode {
            Mode::Design => None,
            Mode::Offdesign => self.state.design.as_deref(),
        }
    }

    pub fn stream(&self, conn: ConnId) -> SolverResult<&StreamState> {
        Ok(&self.solution("stream")?[conn.index()])
    }

    /// Temperature [K] of a solved stream.
    pub fn temperature(&self, conn: ConnId) -> SolverResult<f64> {
        let stream = self.stream(conn)?;
        let label = self.connections[conn.index()].label();
        Mixture::new(&self.fluids, &stream.x)
            .and_then(|mix| self.evaluator.t_ph(stream.p, stream.h, &mix))
            .map_err(|e| SolverError::during(format!("connection {label}"), e.into()))
    }

    /// Derived quantities of a component after a converged solve.
    pub fn derived(&self, comp: CompId) -> SolverResult<&BTreeMap<&'static str, f64>> {
        self.converged("derived quantities")?;
        Ok(&self.state.derived[comp.index()])
    }

    pub fn derived_value(&self, comp: CompId, name: &str) -> SolverResult<f64> {
        let component = &self.components[comp.index()];
        let name = component.check_quantity(name)?;
        self.derived(comp)?
            .get(name)
            .copied()
            .ok_or_else(|| SolverError::Setup {
                what: format!("{}: '{name}' is undefined at this state", component.name()),
            })
    }

    /// Realized bus value after a converged solve.
    pub fn bus_value(&self, bus: BusId) -> SolverResult<f64> {
        self.converged("bus value")?;
        let bus = &self.busses[bus.index()];
        let values = bus
            .members()
            .iter()
            .map(|m| self.derived_value(m.component, m.quantity))
            .collect::<SolverResult<Vec<f64>>>()?;
        Ok(bus.value(values))
    }

    /// Design points in effect: from the last design solve or loaded state.
    pub fn design_point(&self, comp: CompId) -> Option<&DesignPoint> {
        self.state.design.as_ref().map(|d| &d[comp.index()])
    }

    // ---- persistence ----

    /// Snapshot of the converged state.
    pub fn snapshot(&self) -> SolverResult<Snapshot> {
        self.converged("snapshot")?;
        let streams = self.solution("snapshot")?;
        let connections = streams
            .iter()
            .enumerate()
            .map(|(i, s)| StreamRecord {
                m: s.m,
                p: s.p,
                h: s.h,
                t: self.temperature(ConnId::from_index(i)).ok(),
                fluid: self
                    .fluids
                    .species()
                    .iter()
                    .zip(&s.x)
                    .map(|(sp, x)| (sp.key().to_string(), *x))
                    .collect(),
            })
            .collect();
        let components = self
            .components
            .iter()
            .zip(&self.state.derived)
            .map(|(c, derived)| ComponentRecord {
                name: c.name().to_string(),
                parameters: c
                    .model()
                    .param_defs()
                    .iter()
                    .filter_map(|def| match c.param(def.name) {
                        Some(ParamSpec::Fixed(v)) => Some((def.name.to_string(), *v)),
                        _ => None,
                    })
                    .collect(),
                design: derived.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            })
            .collect();
        let busses = self
            .busses
            .iter()
            .enumerate()
            .map(|(i, bus)| {
                Ok(BusRecord {
                    label: bus.label().to_string(),
                    target: bus.target(),
                    value: self.bus_value(BusId::from_index(i))?,
                    members: bus
                        .members()
                        .iter()
                        .map(|m| BusMemberDef {
                            component: self.components[m.component.index()].name().to_string(),
                            quantity: m.quantity.to_string(),
                        })
                        .collect(),
                })
            })
            .collect::<SolverResult<Vec<_>>>()?;
        let ReferenceState { p, t } = self.evaluator.reference();
        Ok(Snapshot::new(
            self.topology(),
            ReferenceDef { p, t },
            connections,
            components,
            busses,
        )?)
    }

    /// Restore streams and design point from a snapshot of this topology.
    ///
    /// The restored state counts as a design solution: off-design solves use
    /// its design point and [`residuals`](Self::residuals) evaluates it.
    pub fn load_state(&mut self, snapshot: &Snapshot) -> SolverResult<()> {
        let streams = self.streams_from(snapshot)?;
        let design = self.design_from(snapshot)?;
        self.state = SolveState {
            status: SolveStatus::Loaded,
            mode: Mode::Design,
            streams: Some(streams),
            design: Some(design),
            ..SolveState::default()
        };
        Ok(())
    }

    /// Structured results of the converged solve.
    pub fn report(&self) -> SolverResult<NetworkReport> {
        self.converged("report")?;
        let streams = self.solution("report")?;
        let connections = self
            .connections
            .iter()
            .enumerate()
            .map(|(i, conn)| {
                let s = &streams[i];
                Ok(StreamReport {
                    label: conn.label().to_string(),
                    m: s.m,
                    p: s.p,
                    h: s.h,
                    t: self.temperature(ConnId::from_index(i))?,
                    fluid: self
                        .fluids
                        .species()
                        .iter()
                        .zip(&s.x)
                        .filter(|(_, x)| **x > tn_fluids::FRACTION_EPS)
                        .map(|(sp, x)| (sp.key().to_string(), *x))
                        .collect(),
                })
            })
            .collect::<SolverResult<Vec<_>>>()?;
        let components = self
            .components
            .iter()
            .zip(&self.state.derived)
            .map(|(c, derived)| ComponentReport {
                name: c.name().to_string(),
                kind: c.kind().to_string(),
                derived: derived.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            })
            .collect();
        let busses = self
            .busses
            .iter()
            .enumerate()
            .map(|(i, bus)| {
                Ok(BusReport {
                    label: bus.label().to_string(),
                    target: bus.target(),
                    value: self.bus_value(BusId::from_index(i))?,
                })
            })
            .collect::<SolverResult<Vec<_>>>()?;
        Ok(NetworkReport {
            mode: self.state.mode.to_string(),
            iterations: self.state.iterations,
            residual_history: self.state.history.clone(),
            connections,
            components,
            busses,
        })
    }
}
