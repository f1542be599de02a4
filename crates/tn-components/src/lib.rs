//! tn-components: equation models of network components.
//!
//! Every component kind implements [`ComponentModel`]: a fixed set of
//! mandatory equations over its port streams plus one optional equation per
//! active parameter. A [`Component`] wraps a model with the user's parameter
//! table and design/off-design lists and assembles residuals and local
//! Jacobians for the solver.
//!
//! Provided kinds:
//! - Sources, sinks and the cycle closer
//! - Valves
//! - Pumps, compressors and turbines
//! - One-sided and two-stream heat exchangers, condensers
//! - Steam drums
//! - Combustion chambers and combustion engines
//!
//! # Example
//!
//! ```no_run
//! use tn_components::{Component, Mode, Turbomachine};
//!
//! let mut pump = Component::new("feed pump", Turbomachine::pump());
//! pump.set("eta_s", 0.8).unwrap();
//! pump.set("pr", 10.0).unwrap();
//! pump.set_design(&["pr"]).unwrap();
//!
//! let active = pump.resolve(Mode::Design, None).unwrap();
//! assert_eq!(active.equations(), &["pr", "eta_s"]);
//! ```

pub mod basics;
pub mod characteristic;
pub mod combustion;
pub mod common;
pub mod component;
pub mod drum;
pub mod engine;
pub mod error;
pub mod heat_exchanger;
pub mod params;
pub mod traits;
pub mod turbomachine;
pub mod valve;

// Re-exports
pub use basics::{CycleCloser, Sink, Source};
pub use characteristic::Characteristic;
pub use combustion::CombustionChamber;
pub use component::Component;
pub use drum::Drum;
pub use engine::CombustionEngine;
pub use error::{ComponentError, ComponentResult};
pub use heat_exchanger::{Condenser, HeatExchanger, HeatExchangerSimple};
pub use params::{ActiveParams, DesignPoint, Mode, ParamDef, ParamKind, ParamSpec};
pub use traits::{ComponentModel, EvalContext, FlowGuess, GuessHint, Port, StreamState};
pub use turbomachine::{Machine, Turbomachine};
pub use valve::Valve;
