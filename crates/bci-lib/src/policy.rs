//! Rules tied to the evaluation strategy.
//!
//! Leave-one-subject-out evaluation is defined over one canonical subject and only
//! full-precision variants exist for it, so the independent strategy pins the subject and
//! hides the quantized model.

use crate::catalog::{ModelVariant, ModelVariantCatalog, ORIGINAL, QUANTIZED};
use crate::state::{Strategy, ViewState, CANONICAL_SUBJECT, SUBJECT_MAX, SUBJECT_MIN};
use std::ops::RangeInclusive;

pub fn subject_range(strategy: Strategy) -> RangeInclusive<u8> {
    match strategy {
        Strategy::Dependent => SUBJECT_MIN..=SUBJECT_MAX,
        Strategy::Independent => CANONICAL_SUBJECT..=CANONICAL_SUBJECT,
    }
}

pub fn allows_variant(strategy: Strategy, variant_id: &str) -> bool {
    match strategy {
        Strategy::Dependent => true,
        Strategy::Independent => variant_id != QUANTIZED,
    }
}

/// Variant to switch to when the current one is not allowed.
pub fn fallback_variant() -> &'static str {
    ORIGINAL
}

/// Read-only view of the policy for the current state.
#[derive(Debug, Clone, Copy)]
pub struct StrategyPolicy<'a> {
    state: &'a ViewState,
}

impl<'a> StrategyPolicy<'a> {
    pub fn of(state: &'a ViewState) -> Self {
        Self { state }
    }

    pub fn allowed_subjects(&self) -> RangeInclusive<u8> {
        subject_range(self.state.strategy())
    }

    /// Subject stepping is only available for subject-dependent evaluation.
    pub fn is_navigation_enabled(&self) -> bool {
        !self.state.strategy().is_independent()
    }

    pub fn allowed_model_variants<'c>(
        &self,
        catalog: &'c ModelVariantCatalog,
    ) -> Vec<&'c ModelVariant> {
        let strategy = self.state.strategy();
        catalog
            .iter()
            .filter(|variant| allows_variant(strategy, &variant.id))
            .collect()
    }
}
