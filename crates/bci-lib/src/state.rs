use crate::catalog::{ModelVariantCatalog, ORIGINAL};
use crate::policy;
use serde::{Deserialize, Serialize};

pub const SUBJECT_MIN: u8 = 1;
pub const SUBJECT_MAX: u8 = 9;
pub const CANONICAL_SUBJECT: u8 = 1;

/// Evaluation strategy of the loaded model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Trained and tested on the same subject.
    #[default]
    Dependent,
    /// Leave-one-subject-out (LOSO).
    Independent,
}

impl Strategy {
    pub fn from_loso(loso: bool) -> Self {
        if loso {
            Strategy::Independent
        } else {
            Strategy::Dependent
        }
    }

    pub fn is_independent(self) -> bool {
        self == Strategy::Independent
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Dependent => "Subject-dependent",
            Strategy::Independent => "Subject-independent (LOSO)",
        }
    }

    pub fn all() -> [Strategy; 2] {
        [Strategy::Dependent, Strategy::Independent]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("subject {0} is outside 1..=9")]
    SubjectOutOfRange(u8),
    #[error("subject is locked to 1 under subject-independent evaluation (got {0})")]
    SubjectLocked(u8),
    #[error("model variant '{0}' is not available under subject-independent evaluation")]
    VariantNotAllowed(String),
    #[error("unknown model variant '{0}'")]
    UnknownVariant(String),
    #[error("trial index {index} outside dataset of {total} trials")]
    TrialOutOfRange { index: usize, total: usize },
}

/// Session state shared by every view.
///
/// Fields are private so the strategy invariants hold no matter who mutates the state:
/// under [`Strategy::Independent`] the subject is always 1 and the model variant is never
/// `"quantized"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    subject_id: u8,
    strategy: Strategy,
    model_variant: String,
    current_trial_index: usize,
    total_trials: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            subject_id: CANONICAL_SUBJECT,
            strategy: Strategy::Dependent,
            model_variant: ORIGINAL.to_string(),
            current_trial_index: 0,
            total_trials: 0,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject_id(&self) -> u8 {
        self.subject_id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn is_independent(&self) -> bool {
        self.strategy.is_independent()
    }

    pub fn model_variant(&self) -> &str {
        &self.model_variant
    }

    pub fn current_trial_index(&self) -> usize {
        self.current_trial_index
    }

    pub fn total_trials(&self) -> usize {
        self.total_trials
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
        if strategy.is_independent() {
            self.subject_id = CANONICAL_SUBJECT;
            if !policy::allows_variant(strategy, &self.model_variant) {
                self.model_variant = policy::fallback_variant().to_string();
            }
        }
    }

    pub fn select_subject(&mut self, subject_id: u8) -> Result<(), StateError> {
        if !(SUBJECT_MIN..=SUBJECT_MAX).contains(&subject_id) {
            return Err(StateError::SubjectOutOfRange(subject_id));
        }
        if !policy::subject_range(self.strategy).contains(&subject_id) {
            return Err(StateError::SubjectLocked(subject_id));
        }
        self.subject_id = subject_id;
        Ok(())
    }

    /// Steps the subject by `delta`, wrapping around 1..=9. Returns false while locked.
    pub fn adjust_subject(&mut self, delta: i32) -> bool {
        if self.strategy.is_independent() {
            return false;
        }
        let span = i32::from(SUBJECT_MAX - SUBJECT_MIN) + 1;
        let offset = (i32::from(self.subject_id - SUBJECT_MIN) + delta).rem_euclid(span);
        self.subject_id = SUBJECT_MIN + offset as u8;
        true
    }

    pub fn select_model_variant(
        &mut self,
        variant_id: &str,
        catalog: &ModelVariantCatalog,
    ) -> Result<(), StateError> {
        if !catalog.contains(variant_id) {
            return Err(StateError::UnknownVariant(variant_id.to_string()));
        }
        if !policy::allows_variant(self.strategy, variant_id) {
            return Err(StateError::VariantNotAllowed(variant_id.to_string()));
        }
        self.model_variant = variant_id.to_string();
        Ok(())
    }

    /// Keeps the selected variant valid after the catalog changes.
    pub(crate) fn reconcile_variant(&mut self, catalog: &ModelVariantCatalog) {
        if catalog.contains(&self.model_variant) {
            return;
        }
        let strategy = self.strategy;
        if let Some(variant) = catalog
            .iter()
            .find(|variant| policy::allows_variant(strategy, &variant.id))
        {
            self.model_variant = variant.id.clone();
        }
    }

    /// Commits a trial position reported by the backend.
    pub(crate) fn apply_trial_position(
        &mut self,
        index: usize,
        total: usize,
    ) -> Result<(), StateError> {
        if index >= total {
            return Err(StateError::TrialOutOfRange { index, total });
        }
        self.current_trial_index = index;
        self.total_trials = total;
        Ok(())
    }
}
