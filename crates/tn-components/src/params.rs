//! Component parameters and their per-mode resolution.
//!
//! Each parameter is unspecified, fixed to a value, or driven by a
//! characteristic. Which parameters contribute equations depends on the
//! solve mode and on the component's `design` and `offdesign` lists:
//!
//! - design: every specified parameter is active, except those listed in
//!   `offdesign`;
//! - offdesign: parameters listed in `design` are dropped; parameters listed
//!   in `offdesign` are activated with their design-point value (value
//!   parameters) or with the user's or the built-in default line (curve
//!   parameters); everything else that is specified stays active.

use std::collections::BTreeMap;
use std::fmt;

use crate::characteristic::Characteristic;
use crate::error::{ComponentError, ComponentResult};

/// Solve mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Design,
    Offdesign,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Design => f.write_str("design"),
            Mode::Offdesign => f.write_str("offdesign"),
        }
    }
}

/// User-facing state of one parameter.
#[derive(Debug, Clone, Default)]
pub enum ParamSpec {
    #[default]
    Unspecified,
    Fixed(f64),
    Curve(Characteristic),
}

impl ParamSpec {
    pub fn is_set(&self) -> bool {
        !matches!(self, ParamSpec::Unspecified)
    }
}

impl From<f64> for ParamSpec {
    fn from(value: f64) -> Self {
        ParamSpec::Fixed(value)
    }
}

impl From<Characteristic> for ParamSpec {
    fn from(curve: Characteristic) -> Self {
        ParamSpec::Curve(curve)
    }
}

impl From<Option<f64>> for ParamSpec {
    fn from(value: Option<f64>) -> Self {
        value.map_or(ParamSpec::Unspecified, ParamSpec::Fixed)
    }
}

/// What a parameter holds and whether it adds an equation when active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Value { equation: bool },
    Curve { equation: bool },
}

/// Static description of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamDef {
    /// A value parameter that adds an equation.
    pub const fn equation(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Value { equation: true },
        }
    }

    /// A value parameter used only as an input to other equations.
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Value { equation: false },
        }
    }

    /// A characteristic parameter that adds an equation.
    pub const fn curve(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Curve { equation: true },
        }
    }

    /// A characteristic used only as an input to other equations.
    pub const fn curve_input(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Curve { equation: false },
        }
    }

    pub fn adds_equation(&self) -> bool {
        matches!(
            self.kind,
            ParamKind::Value { equation: true } | ParamKind::Curve { equation: true }
        )
    }
}

/// Derived quantities of a converged design solve, keyed by quantity name.
pub type DesignPoint = BTreeMap<String, f64>;

/// Parameters in effect for one solve.
#[derive(Debug, Clone, Default)]
pub struct ActiveParams {
    values: BTreeMap<&'static str, f64>,
    curves: BTreeMap<&'static str, Characteristic>,
    equations: Vec<&'static str>,
}

impl ActiveParams {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn curve(&self, name: &str) -> Option<&Characteristic> {
        self.curves.get(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.curves.contains_key(name)
    }

    /// Parameters contributing an equation, in declaration order.
    pub fn equations(&self) -> &[&'static str] {
        &self.equations
    }

    fn activate_value(&mut self, def: &ParamDef, value: f64) {
        self.values.insert(def.name, value);
        if def.adds_equation() {
            self.equations.push(def.name);
        }
    }

    fn activate_curve(&mut self, def: &ParamDef, curve: Characteristic) {
        self.curves.insert(def.name, curve);
        if def.adds_equation() {
            self.equations.push(def.name);
        }
    }
}

/// Resolve the active parameter set for `mode`.
///
/// `defaults` supplies built-in characteristic lines by name.
#[allow(clippy::too_many_arguments)]
pub(crate) fn resolve(
    component: &str,
    defs: &[ParamDef],
    specs: &BTreeMap<&'static str, ParamSpec>,
    design_list: &[&'static str],
    offdesign_list: &[&'static str],
    mode: Mode,
    design: Option<&DesignPoint>,
    defaults: impl Fn(&str) -> Option<Characteristic>,
) -> ComponentResult<ActiveParams> {
    let mut active = ActiveParams::default();
    for def in defs {
        let spec = specs.get(def.name).unwrap_or(&ParamSpec::Unspecified);
        let in_design = design_list.contains(&def.name);
        let in_offdesign = offdesign_list.contains(&def.name);

        let from_design_point = mode == Mode::Offdesign && in_offdesign && !in_design;
        let dropped = match mode {
            Mode::Design => in_offdesign,
            Mode::Offdesign => in_design,
        };
        let is_input = !def.adds_equation();

        match def.kind {
            ParamKind::Value { .. } => {
                if from_design_point {
                    let value = design
                        .and_then(|point| point.get(def.name))
                        .copied()
                        .ok_or_else(|| ComponentError::MissingDesignValue {
                            component: component.to_string(),
                            name: def.name.to_string(),
                        })?;
                    active.activate_value(def, value);
                } else if !dropped || is_input {
                    match spec {
                        ParamSpec::Fixed(value) => active.activate_value(def, *value),
                        ParamSpec::Curve(_) => {
                            return Err(ComponentError::Setup {
                                what: format!("{component}: '{}' expects a value", def.name),
                            });
                        }
                        ParamSpec::Unspecified => {}
                    }
                }
            }
            ParamKind::Curve { .. } => {
                if matches!(spec, ParamSpec::Fixed(_)) {
                    return Err(ComponentError::Setup {
                        what: format!("{component}: '{}' expects a characteristic", def.name),
                    });
                }
                let user = match spec {
                    ParamSpec::Curve(curve) => Some(curve.clone()),
                    _ => None,
                };
                if from_design_point || is_input {
                    let curve = user.or_else(|| defaults(def.name)).ok_or_else(|| {
                        ComponentError::Setup {
                            what: format!("{component}: no characteristic for '{}'", def.name),
                        }
                    })?;
                    active.activate_curve(def, curve);
                } else if !dropped && let Some(curve) = user {
                    active.activate_curve(def, curve);
                }
            }
        }
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &[ParamDef] = &[
        ParamDef::equation("pr"),
        ParamDef::equation("zeta"),
        ParamDef::equation("eta_s"),
        ParamDef::curve("eta_s_char"),
        ParamDef::input("Tamb"),
    ];

    fn specs(entries: &[(&'static str, ParamSpec)]) -> BTreeMap<&'static str, ParamSpec> {
        entries.iter().cloned().collect()
    }

    fn defaults(name: &str) -> Option<Characteristic> {
        (name == "eta_s_char").then(Characteristic::identity)
    }

    #[test]
    fn design_activates_specified_parameters() {
        let specs = specs(&[("pr", 0.98.into()), ("eta_s", 0.8.into())]);
        let active = resolve("c", DEFS, &specs, &[], &[], Mode::Design, None, defaults).unwrap();
        assert_eq!(active.equations(), &["pr", "eta_s"]);
        assert_eq!(active.value("pr"), Some(0.98));
        assert!(!active.is_active("zeta"));
    }

    #[test]
    fn design_skips_offdesign_parameters() {
        let specs = specs(&[("pr", 0.98.into()), ("zeta", 1e4.into())]);
        let active =
            resolve("c", DEFS, &specs, &["pr"], &["zeta"], Mode::Design, None, defaults).unwrap();
        assert_eq!(active.equations(), &["pr"]);
    }

    #[test]
    fn offdesign_swaps_design_for_offdesign_parameters() {
        let specs = specs(&[("pr", 0.98.into()), ("eta_s", 0.8.into())]);
        let mut point = DesignPoint::new();
        point.insert("zeta".into(), 2.5e3);
        let active = resolve(
            "c",
            DEFS,
            &specs,
            &["pr", "eta_s"],
            &["zeta", "eta_s_char"],
            Mode::Offdesign,
            Some(&point),
            defaults,
        )
        .unwrap();
        assert_eq!(active.equations(), &["zeta", "eta_s_char"]);
        assert_eq!(active.value("zeta"), Some(2.5e3));
        assert_eq!(active.curve("eta_s_char").map(|c| c.eval(0.3)), Some(0.3));
    }

    #[test]
    fn missing_design_value_is_reported() {
        let err = resolve(
            "pipe",
            DEFS,
            &BTreeMap::new(),
            &[],
            &["zeta"],
            Mode::Offdesign,
            Some(&DesignPoint::new()),
            defaults,
        )
        .unwrap_err();
        assert!(matches!(err, ComponentError::MissingDesignValue { ref name, .. } if name == "zeta"));
    }

    #[test]
    fn inputs_stay_available_without_equations() {
        let specs = specs(&[("Tamb", 290.0.into())]);
        let active =
            resolve("c", DEFS, &specs, &["Tamb"], &[], Mode::Offdesign, None, defaults).unwrap();
        assert!(active.equations().is_empty());
        assert_eq!(active.value("Tamb"), Some(290.0));
    }

    #[test]
    fn kind_mismatch_is_a_setup_error() {
        let specs = specs(&[("eta_s_char", 0.5.into())]);
        assert!(matches!(
            resolve("c", DEFS, &specs, &[], &[], Mode::Design, None, defaults),
            Err(ComponentError::Setup { .. })
        ));
    }
}
