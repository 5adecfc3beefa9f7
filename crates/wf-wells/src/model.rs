//! The well capability trait and the context shared by all wells.

use crate::assembly::WellContributions;
use crate::config::UpdateLimits;
use crate::control::WellUpdate;
use crate::error::WellResult;
use crate::state::WellState;
use crate::vfp::VfpTables;
use wf_core::constants::G0_MPS2;
use wf_pvt::{CellState, FluidProps, PhaseUsage};

/// Read-only view of the reservoir solution.
///
/// `cell_state` returns the primary unknowns seeded as variables in slots
/// `(pressure, s_w, s_g)`.
pub trait ReservoirState: Sync {
    fn num_cells(&self) -> usize;

    fn cell_state(&self, cell: usize) -> CellState;
}

/// Configuration shared by every well of a model.
#[derive(Clone, Copy)]
pub struct WellContext<'a> {
    pub props: &'a dyn FluidProps,
    pub phase_usage: PhaseUsage,
    /// Gravitational acceleration [m/s²]
    pub gravity: f64,
    pub vfp: &'a VfpTables,
    pub limits: UpdateLimits,
}

impl<'a> WellContext<'a> {
    pub fn new(props: &'a dyn FluidProps, phase_usage: PhaseUsage, vfp: &'a VfpTables) -> Self {
        Self {
            props,
            phase_usage,
            gravity: G0_MPS2,
            vfp,
            limits: UpdateLimits::default(),
        }
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_limits(mut self, limits: UpdateLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// A well coupled to the reservoir through its perforations.
///
/// Per Newton iteration the driver calls, in order,
/// [`update_connection_pressures`](WellModel::update_connection_pressures),
/// [`assemble`](WellModel::assemble) and, after the reduced system has been
/// solved, [`back_substitute`](WellModel::back_substitute).
pub trait WellModel: Send {
    fn name(&self) -> &str;

    /// Cells touched by the well's perforations, top to bottom.
    fn cells(&self) -> Vec<usize>;

    /// Refresh connection densities and hydrostatic pressure drops from the
    /// current iterate.
    fn update_connection_pressures(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
    ) -> WellResult<()>;

    /// Build and eliminate the local well system. Identical inputs give
    /// identical results.
    fn assemble(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
        dt: f64,
    ) -> WellResult<WellContributions>;

    /// Recover the well update from the reservoir Newton update `dx`
    /// (laid out cell-major, three entries per cell) and apply it.
    fn back_substitute(&mut self, ctx: &WellContext<'_>, dx: &[f64]) -> WellResult<WellUpdate>;

    fn current_state(&self) -> &WellState;

    /// Max-norm of the well residual from the last assembly.
    fn residual_norm(&self) -> f64;

    /// Record timestep-start fractions and re-open a well shut during the
    /// previous step if its schedule allows.
    fn begin_timestep(&mut self, ctx: &WellContext<'_>, reservoir: &dyn ReservoirState);

    /// Shut the well for the rest of the timestep.
    fn shut(&mut self);
}
