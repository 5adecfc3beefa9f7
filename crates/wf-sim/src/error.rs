//! Error types for simulation runs.

use thiserror::Error;
use wf_core::WfError;
use wf_pvt::PvtError;
use wf_wells::WellError;

/// Errors encountered while advancing the coupled system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid reservoir configuration: {what}")]
    InvalidConfig { what: String },

    /// A failure a shorter timestep may cure.
    #[error("Retryable failure: {message}")]
    Retryable { message: String },

    #[error("Linear solve failed: {what}")]
    LinearSolve { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Well error: {0}")]
    Well(#[from] WellError),

    #[error("Fluid property error: {0}")]
    Pvt(#[from] PvtError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Errors that trigger a timestep cutback.
    pub fn is_retryable(&self) -> bool {
        match self {
            SimError::Retryable { .. } | SimError::LinearSolve { .. } | SimError::Pvt(_) => true,
            SimError::Well(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<WfError> for SimError {
    fn from(e: WfError) -> Self {
        SimError::InvalidConfig {
            what: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            SimError::Retryable {
                message: "x".into()
            }
            .is_retryable()
        );
        assert!(SimError::Pvt(PvtError::NonPhysical { what: "pressure" }).is_retryable());
        let numerical = WellError::Numerical {
            well: "P1".into(),
            what: "bad",
        };
        assert!(SimError::from(numerical).is_retryable());
        let config = WellError::InvalidConfig {
            well: "P1".into(),
            what: "no perforations".into(),
        };
        assert!(!SimError::from(config).is_retryable());
        assert!(
            !SimError::ConvergenceFailed {
                what: "x".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = SimError::from(WellError::SingularWellMatrix { well: "I1".into() });
        assert!(err.to_string().contains("I1"));
    }
}
