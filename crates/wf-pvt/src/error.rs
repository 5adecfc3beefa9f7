//! PVT and relative permeability errors.

use thiserror::Error;
use wf_core::WfError;

pub type PvtResult<T> = Result<T, PvtError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PvtError {
    /// Non-physical input or output (non-positive pressure, negative viscosity, ...).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid table: {what}")]
    InvalidTable { what: String },

    #[error("Phase {phase} is not active")]
    InactivePhase { phase: &'static str },
}

impl From<WfError> for PvtError {
    fn from(e: WfError) -> Self {
        PvtError::InvalidTable {
            what: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PvtError::NonPhysical { what: "pressure" };
        assert!(err.to_string().contains("pressure"));
        let err = PvtError::InactivePhase { phase: "gas" };
        assert!(err.to_string().contains("gas"));
    }

    #[test]
    fn core_error_converts() {
        let core = WfError::NonPositive {
            what: "viscosity",
            value: -1.0,
        };
        let err: PvtError = core.into();
        assert!(matches!(err, PvtError::InvalidTable { .. }));
        assert!(err.to_string().contains("viscosity"));
    }
}
