//! Well-level errors.

use thiserror::Error;
use wf_core::WfError;
use wf_pvt::PvtError;

pub type WellResult<T> = Result<T, WellError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WellError {
    /// Rejected at construction; never raised during a Newton iteration.
    #[error("Invalid configuration for well {well}: {what}")]
    InvalidConfig { well: String, what: String },

    /// `D` could not be inverted. The caller may shut the well and continue.
    #[error("Singular well matrix in well {well}")]
    SingularWellMatrix { well: String },

    #[error("Non-finite {what} in well {well}")]
    NonFinite { well: String, what: &'static str },

    #[error("Numerical problem in well {well}: {what}")]
    Numerical { well: String, what: &'static str },

    #[error("Fluid property error: {message}")]
    Property { message: String },
}

impl WellError {
    pub(crate) fn invalid(well: &str, what: impl Into<String>) -> Self {
        WellError::InvalidConfig {
            well: well.to_string(),
            what: what.into(),
        }
    }

    /// Errors that a timestep cutback may cure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WellError::NonFinite { .. } | WellError::Numerical { .. } | WellError::Property { .. }
        )
    }
}

impl From<PvtError> for WellError {
    fn from(e: PvtError) -> Self {
        WellError::Property {
            message: e.to_string(),
        }
    }
}

impl From<WellError> for WfError {
    fn from(e: WellError) -> Self {
        match e {
            WellError::InvalidConfig { .. } => WfError::InvalidArg {
                what: "invalid well configuration",
            },
            WellError::SingularWellMatrix { .. } => WfError::Invariant {
                what: "singular well matrix",
            },
            WellError::NonFinite { what, .. } => WfError::NonFinite { what, value: f64::NAN },
            WellError::Numerical { what, .. } => WfError::Invariant { what },
            WellError::Property { .. } => WfError::InvalidArg {
                what: "fluid property error",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WellError::SingularWellMatrix {
            well: "P1".to_string(),
        };
        assert!(err.to_string().contains("P1"));
        let err = WellError::invalid("I1", "empty perforation list");
        assert!(err.to_string().contains("empty perforation list"));
    }

    #[test]
    fn retryable_classification() {
        let nonfinite = WellError::NonFinite {
            well: "P1".to_string(),
            what: "residual",
        };
        assert!(nonfinite.is_retryable());
        assert!(!WellError::invalid("P1", "x").is_retryable());
        assert!(
            !WellError::SingularWellMatrix {
                well: "P1".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn pvt_error_converts() {
        let err: WellError = PvtError::NonPhysical { what: "pressure" }.into();
        assert!(matches!(err, WellError::Property { .. }));
        let core: WfError = err.into();
        assert!(matches!(core, WfError::InvalidArg { .. }));
    }
}
