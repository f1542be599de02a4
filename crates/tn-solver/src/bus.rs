//! Busses: sums of one derived quantity over several components.

use tn_components::Characteristic;
use tn_core::CompId;

/// One component on a bus.
#[derive(Debug, Clone)]
pub struct BusMember {
    pub component: CompId,
    /// Derived quantity read from the component
    pub quantity: &'static str,
    /// Maps the quantity onto its contribution to the bus
    pub scale: Characteristic,
}

impl BusMember {
    pub fn contribution(&self, value: f64) -> f64 {
        self.scale.eval(value)
    }
}

/// Sum `Σ scale(quantity(component))` over its members.
///
/// With a target the bus contributes one equation, `sum - target = 0`.
#[derive(Debug, Clone)]
pub struct Bus {
    label: String,
    members: Vec<BusMember>,
    target: Option<f64>,
}

impl Bus {
    pub(crate) fn new(label: String) -> Self {
        Self {
            label,
            members: Vec::new(),
            target: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn members(&self) -> &[BusMember] {
        &self.members
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    pub(crate) fn push(&mut self, member: BusMember) {
        self.members.push(member);
    }

    pub(crate) fn set_target(&mut self, target: Option<f64>) {
        self.target = target;
    }

    /// Realized value from per-member quantity values, in member order.
    pub fn value(&self, quantities: impl IntoIterator<Item = f64>) -> f64 {
        self.members
            .iter()
            .zip(quantities)
            .map(|(member, q)| member.contribution(q))
            .sum()
    }
}
