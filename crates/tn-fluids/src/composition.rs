//! Fluid compositions: user-facing mass-fraction maps, the network fluid set,
//! and the dense per-stream mixture view used during evaluation.

use crate::error::{FluidError, FluidResult};
use crate::species::Species;
use tn_core::numeric::{Tolerances, nearly_equal, quantize};

/// Mass fractions below this are ignored by property evaluation.
pub const FRACTION_EPS: f64 = 1e-10;

/// Fluid composition defined by normalized mass fractions.
///
/// The composition is always normalized (mass fractions sum to 1.0) and kept
/// sorted by species so equal compositions compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    items: Vec<(Species, f64)>,
}

impl Composition {
    /// Create a pure-species composition.
    pub fn pure(species: Species) -> Self {
        Self {
            items: vec![(species, 1.0)],
        }
    }

    /// Create a composition from mass fractions.
    ///
    /// Validates that all fractions are finite, non-negative, and have a positive sum,
    /// then normalizes to sum=1. Duplicate species are summed.
    pub fn new_mass_fractions(fractions: Vec<(Species, f64)>) -> FluidResult<Self> {
        if fractions.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty composition",
            });
        }

        let mut sum = 0.0;
        for (_, frac) in &fractions {
            if !frac.is_finite() {
                return Err(FluidError::NonPhysical {
                    what: "non-finite mass fraction",
                });
            }
            if *frac < 0.0 {
                return Err(FluidError::NonPhysical {
                    what: "negative mass fraction",
                });
            }
            sum += frac;
        }

        if sum <= 0.0 || !sum.is_finite() {
            return Err(FluidError::NonPhysical {
                what: "mass fractions sum to zero or non-finite",
            });
        }

        let mut items: Vec<(Species, f64)> = Vec::with_capacity(fractions.len());
        for (species, frac) in fractions {
            match items.iter_mut().find(|(s, _)| *s == species) {
                Some((_, existing)) => *existing += frac / sum,
                None => items.push((species, frac / sum)),
            }
        }
        items.sort_by_key(|(s, _)| *s);

        Ok(Self { items })
    }

    /// Get mass fraction of a species (0.0 if not present).
    pub fn mass_fraction(&self, species: Species) -> f64 {
        self.items
            .iter()
            .find(|(s, _)| *s == species)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    /// Returns `Some(species)` if exactly one species has fraction ≈1.0.
    pub fn is_pure(&self) -> Option<Species> {
        let tol = Tolerances {
            abs: 1e-10,
            rel: 1e-10,
        };
        let mut present = self.items.iter().filter(|(_, f)| *f > FRACTION_EPS);
        match (present.next(), present.next()) {
            (Some((species, frac)), None) if nearly_equal(*frac, 1.0, tol) => Some(*species),
            _ => None,
        }
    }

    /// Iterate over all species and their mass fractions.
    pub fn iter(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        self.items.iter().copied()
    }

    /// Mixture molar mass [kg/kmol]: M = 1 / Σ (w_i / M_i).
    pub fn molar_mass(&self) -> f64 {
        let moles: f64 = self
            .items
            .iter()
            .map(|(species, w)| w / species.molar_mass())
            .sum();
        1.0 / moles
    }

    /// Mole fractions of the composition, in the same order as [`Composition::iter`].
    pub fn mole_fractions(&self) -> Vec<(Species, f64)> {
        let m = self.molar_mass();
        self.items
            .iter()
            .map(|(species, w)| (*species, w / species.molar_mass() * m))
            .collect()
    }
}

/// Ordered list of species every stream of a network may carry.
///
/// Stream composition vectors are dense and aligned with this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluidSet {
    species: Vec<Species>,
}

impl FluidSet {
    pub fn new(species: impl IntoIterator<Item = Species>) -> FluidResult<Self> {
        let mut list: Vec<Species> = Vec::new();
        for s in species {
            if list.contains(&s) {
                return Err(FluidError::InvalidArg {
                    what: "duplicate species in fluid set",
                });
            }
            list.push(s);
        }
        if list.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "empty fluid set",
            });
        }
        Ok(Self { species: list })
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn index_of(&self, species: Species) -> Option<usize> {
        self.species.iter().position(|s| *s == species)
    }

    /// Dense mass-fraction vector for `comp`; species absent from `comp` are zero.
    pub fn dense(&self, comp: &Composition) -> FluidResult<Vec<f64>> {
        let mut out = vec![0.0; self.species.len()];
        for (species, frac) in comp.iter() {
            let idx = self.index_of(species).ok_or(FluidError::InvalidArg {
                what: "composition contains a species outside the fluid set",
            })?;
            out[idx] = frac;
        }
        Ok(out)
    }

    /// Composition from a dense vector, renormalized.
    pub fn composition(&self, fractions: &[f64]) -> FluidResult<Composition> {
        Composition::new_mass_fractions(
            self.species
                .iter()
                .zip(fractions)
                .filter(|(_, f)| **f > 0.0)
                .map(|(s, f)| (*s, *f))
                .collect(),
        )
    }
}

/// Borrowed view of one stream's dense composition.
#[derive(Debug, Clone, Copy)]
pub struct Mixture<'a> {
    fluids: &'a FluidSet,
    fractions: &'a [f64],
}

impl<'a> Mixture<'a> {
    pub fn new(fluids: &'a FluidSet, fractions: &'a [f64]) -> FluidResult<Self> {
        if fractions.len() != fluids.len() {
            return Err(FluidError::InvalidArg {
                what: "composition length does not match fluid set",
            });
        }
        if fractions.iter().any(|f| !f.is_finite()) {
            return Err(FluidError::NonPhysical {
                what: "non-finite mass fraction",
            });
        }
        Ok(Self { fluids, fractions })
    }

    pub fn fluids(&self) -> &'a FluidSet {
        self.fluids
    }

    pub fn fractions(&self) -> &'a [f64] {
        self.fractions
    }

    /// Species whose mass fraction exceeds [`FRACTION_EPS`].
    pub fn present(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        self.fluids
            .species()
            .iter()
            .zip(self.fractions)
            .filter(|(_, w)| **w > FRACTION_EPS)
            .map(|(s, w)| (*s, *w))
    }

    /// The single species present, if only one is.
    pub fn single_species(&self) -> Option<Species> {
        let mut present = self.present();
        match (present.next(), present.next()) {
            (Some((species, _)), None) => Some(species),
            _ => None,
        }
    }

    /// Present species with their mole fractions (normalized over present species).
    pub fn mole_fractions(&self) -> Vec<(Species, f64)> {
        let moles: Vec<(Species, f64)> = self
            .present()
            .map(|(s, w)| (s, w / s.molar_mass()))
            .collect();
        let total: f64 = moles.iter().map(|(_, n)| n).sum();
        moles.into_iter().map(|(s, n)| (s, n / total)).collect()
    }

    /// Quantized composition used as part of property cache keys.
    pub fn key(&self) -> Box<[(Species, i64)]> {
        self.present().map(|(s, w)| (s, quantize(w))).collect()
    }
}
