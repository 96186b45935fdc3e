use crate::api::{ApiError, TrialResponse};
use serde::{Deserialize, Serialize};

/// Channel-major EEG window: `rows[channel][timestep]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalMatrix {
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixShapeError {
    #[error("signal matrix has no channels")]
    Empty,
    #[error("signal matrix has no samples")]
    NoSamples,
    #[error("channel {channel} has {found} samples, expected {expected}")]
    Ragged {
        channel: usize,
        expected: usize,
        found: usize,
    },
}

impl SignalMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn channel_count(&self) -> usize {
        self.rows.len()
    }

    pub fn timestep_count(&self) -> usize {
        self.rows.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(|row| row.as_slice())
    }

    /// Returns `(channels, timesteps)` when the matrix is non-empty and rectangular.
    pub fn shape(&self) -> Result<(usize, usize), MatrixShapeError> {
        let expected = match self.rows.first() {
            Some(row) => row.len(),
            None => return Err(MatrixShapeError::Empty),
        };
        if expected == 0 {
            return Err(MatrixShapeError::NoSamples);
        }
        for (channel, row) in self.rows.iter().enumerate().skip(1) {
            if row.len() != expected {
                return Err(MatrixShapeError::Ragged {
                    channel,
                    expected,
                    found: row.len(),
                });
            }
        }
        Ok((self.rows.len(), expected))
    }
}

/// One labeled trial as served by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSample {
    pub trial_index: usize,
    pub total_trials: usize,
    pub true_label_name: String,
    pub true_label: Option<usize>,
    pub signal: SignalMatrix,
}

impl TrialSample {
    /// Validates a trial payload before anything is committed to view state.
    pub fn from_response(response: TrialResponse) -> Result<Self, ApiError> {
        if response.trial_index >= response.total_trials {
            return Err(ApiError::Malformed(format!(
                "trial index {} outside dataset of {} trials",
                response.trial_index, response.total_trials
            )));
        }
        let signal = SignalMatrix::new(response.eeg_data);
        signal
            .shape()
            .map_err(|err| ApiError::Malformed(format!("eeg_data: {err}")))?;
        Ok(Self {
            trial_index: response.trial_index,
            total_trials: response.total_trials,
            true_label_name: response.true_label_name,
            true_label: response.true_label,
            signal,
        })
    }
}
