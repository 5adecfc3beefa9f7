//! Fluid property collaborator interface.

use crate::error::PvtResult;
use crate::phase::Phase;
use crate::state::PvtState;
use crate::{NUM_PHASES, ResEval};

/// PVT and saturation-function evaluation as dual values.
///
/// Every method is a pure function of its inputs plus the cell index (which
/// selects PVT/saturation regions). Callers guarantee `cell` is a valid
/// reservoir cell; implementations may index per-cell tables without
/// further checks. Implementations must be thread-safe so wells can be
/// assembled in parallel.
pub trait FluidProps: Send + Sync {
    /// Model name (for logging).
    fn name(&self) -> &str;

    /// Surface densities `[water, oil, gas]` [kg/m³].
    fn surface_densities(&self, cell: usize) -> [f64; NUM_PHASES];

    /// Phase viscosity [Pa·s].
    fn viscosity(&self, phase: Phase, state: &PvtState, cell: usize) -> PvtResult<ResEval>;

    /// Inverse formation-volume factor `b = 1/B` (surface volume per
    /// reservoir volume).
    fn inv_fvf(&self, phase: Phase, state: &PvtState, cell: usize) -> PvtResult<ResEval>;

    /// Saturated dissolved gas-oil ratio at `pressure`.
    fn rs_sat(&self, pressure: &ResEval, temperature: f64, cell: usize) -> PvtResult<ResEval>;

    /// Saturated vaporized oil-gas ratio at `pressure`.
    fn rv_sat(&self, pressure: &ResEval, temperature: f64, cell: usize) -> PvtResult<ResEval>;

    /// Relative permeabilities `[water, oil, gas]`.
    fn rel_perm(&self, sw: &ResEval, sg: &ResEval, cell: usize)
    -> PvtResult<[ResEval; NUM_PHASES]>;
}
