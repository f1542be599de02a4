//! Equation-oriented steady-state solver for thermal networks.
//!
//! A [`Network`] owns components, directed connections between their ports
//! and busses. The unknowns are the free stream variables: mass flow,
//! pressure, specific enthalpy and mass fractions of every connection.
//! Component equations, connection specifications and bus targets form a
//! square nonlinear system, solved by a damped Newton iteration.
//!
//! Design solves determine the design point of every component; off-design
//! solves read it back, either from the last design solve or from a
//! persisted [`Snapshot`](tn_project::Snapshot).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tn_components::{Component, HeatExchangerSimple, Port, Sink, Source};
//! use tn_core::{bar, celsius, kgps};
//! use tn_fluids::{Composition, CoolPropSource, FluidSet, MixtureEvaluator, Species};
//! use tn_solver::{Network, SolveOptions};
//!
//! let fluids = FluidSet::new([Species::H2O]).unwrap();
//! let evaluator = MixtureEvaluator::new(Arc::new(CoolPropSource::new()));
//! let mut net = Network::new(fluids, evaluator);
//!
//! let source = net.add_component(Component::new("source", Source)).unwrap();
//! let heater = Component::new("heater", HeatExchangerSimple)
//!     .with("Q", 1e5)
//!     .and_then(|c| c.with("pr", 0.98))
//!     .unwrap();
//! let heater = net.add_component(heater).unwrap();
//! let sink = net.add_component(Component::new("sink", Sink)).unwrap();
//!
//! let c1 = net.connect("c1", (source, Port::Outlet(0)), (heater, Port::Inlet(0))).unwrap();
//! net.connect("c2", (heater, Port::Outlet(0)), (sink, Port::Inlet(0))).unwrap();
//! net.connection_mut(c1)
//!     .set_m(kgps(1.0))
//!     .set_p(bar(2.0))
//!     .set_t(celsius(20.0))
//!     .set_fluid(&Composition::pure(Species::H2O));
//!
//! net.solve(SolveOptions::design()).unwrap();
//! ```

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
mod init;
pub mod jacobian;
pub mod network;
pub mod newton;
pub mod report;
mod system;

pub use bus::{Bus, BusMember};
pub use config::SolverConfig;
pub use connection::{Attr, Connection, Endpoint, FluidSpec, VarSpec};
pub use error::{SolverError, SolverResult};
pub use network::{Network, SolveOptions, SolveStatus, SolveSummary};
pub use newton::{NewtonConfig, NewtonProblem, NewtonResult, Singularity};
pub use report::{BusReport, ComponentReport, NetworkReport, StreamReport};
