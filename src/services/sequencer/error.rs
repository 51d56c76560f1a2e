//! Sequencer errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequencerError {
    /// Network failure, non-success status or malformed response
    #[error("travel matrix provider failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("travel matrix has wrong shape: expected {expected}x{expected}, got size {actual}")]
    MatrixShape { expected: usize, actual: usize },

    #[error("stop at '{address}' has no task id")]
    MissingTaskId { address: String },

    #[error("task id '{0}' appears on more than one stop")]
    DuplicateTaskId(String),

    #[error("stop id '{0}' appears more than once")]
    DuplicateStopId(String),

    #[error("task '{task_id}' has an invalid unit count of {unit_count}")]
    InvalidUnitCount { task_id: String, unit_count: u32 },

    #[error("equipment '{equipment_id}' is freed by more than one pickup: {}", task_ids.join(", "))]
    AmbiguousEquipment {
        equipment_id: String,
        task_ids: Vec<String>,
    },
}

impl SequencerError {
    /// True for failures the caller may fix by simply trying again
    pub fn is_retryable(&self) -> bool {
        matches!(self, SequencerError::Provider(_) | SequencerError::MatrixShape { .. })
    }

    /// Message suitable for dispatch staff
    pub fn user_message(&self) -> String {
        if self.is_retryable() {
            "Could not compute route, try again.".to_string()
        } else {
            format!("Stops need correcting before sequencing: {}", self)
        }
    }
}
