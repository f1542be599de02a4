//! tn-fluids: fluid property evaluation for thermonet.
//!
//! Provides:
//! - Chemical species with the chemistry data combustion needs
//! - Compositions, the network fluid set and per-stream mixture views
//! - The `PropertySource` trait with CoolProp and NASA ideal-gas backends
//! - A session-scoped `PropertyCache`
//! - The `MixtureEvaluator`, which combines pure-species properties into mixture
//!   properties and inverts them for temperature
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tn_fluids::{CoolPropSource, FluidSet, Mixture, MixtureEvaluator, Species};
//!
//! let evaluator = MixtureEvaluator::new(Arc::new(CoolPropSource::new()));
//! let fluids = FluidSet::new([Species::N2, Species::O2]).unwrap();
//! let fractions = [0.77, 0.23];
//! let air = Mixture::new(&fluids, &fractions).unwrap();
//!
//! let h = evaluator.h_pt(101325.0, 300.0, &air).unwrap();
//! let t = evaluator.t_ph(101325.0, h, &air).unwrap();
//! println!("T = {t} K");
//! ```

pub mod accuracy;
pub mod cache;
pub mod composition;
pub mod coolprop;
pub mod error;
pub mod ideal_gas;
pub mod mixture;
pub mod source;
pub mod species;

pub use accuracy::deviation_bound;
pub use cache::{CacheKey, CacheStats, CachedQuantity, PropertyCache};
pub use composition::{Composition, FRACTION_EPS, FluidSet, Mixture};
pub use coolprop::CoolPropSource;
pub use error::{FluidError, FluidResult};
pub use ideal_gas::{IdealGasSource, NasaPolynomial};
pub use mixture::{MixtureEvaluator, MixtureProperty, ReferenceState};
pub use source::{PropertySource, PureProperty};
pub use species::{Atoms, Species};
