//! Linear solvers for the reduced system.

use crate::error::{SimError, SimResult};
use crate::system::GlobalSystem;
use nalgebra::DVector;

/// Solves `J dx = R` for the Newton update `dx` (applied as `x - dx`).
pub trait LinearSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, system: &GlobalSystem) -> SimResult<DVector<f64>>;
}

/// Dense LU with partial pivoting.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseLu;

impl LinearSolver for DenseLu {
    fn name(&self) -> &str {
        "dense-lu"
    }

    fn solve(&self, system: &GlobalSystem) -> SimResult<DVector<f64>> {
        let dx = system
            .jacobian()
            .clone()
            .lu()
            .solve(system.residual())
            .ok_or_else(|| SimError::LinearSolve {
                what: "singular reduced Jacobian".to_string(),
            })?;
        if dx.iter().any(|v| !v.is_finite()) {
            return Err(SimError::LinearSolve {
                what: "non-finite update".to_string(),
            });
        }
        Ok(dx)
    }
}
