use std::collections::BTreeMap;

use super::domain::RegistrationType;

/// Flat registration fee in whole rupees charged when no override applies.
pub const DEFAULT_REGISTRATION_FEE: u32 = 2000;

/// Fee lookup keyed by registration type and registration category.
///
/// `fee` is total: every `(regtype, category)` pair resolves, falling back to
/// the base amount. The schedule is immutable once built, so repeated lookups
/// agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSchedule {
    base: u32,
    overrides: BTreeMap<(RegistrationType, String), u32>,
}

impl FeeSchedule {
    pub fn flat(base: u32) -> Self {
        Self {
            base,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, regtype: RegistrationType, category: &str, amount: u32) -> Self {
        self.overrides.insert((regtype, category.to_string()), amount);
        self
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn fee(&self, regtype: RegistrationType, category: &str) -> u32 {
        self.overrides
            .get(&(regtype, category.to_string()))
            .copied()
            .unwrap_or(self.base)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::flat(DEFAULT_REGISTRATION_FEE)
    }
}
