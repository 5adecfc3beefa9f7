//! Fluid property collaborators for the well core.
//!
//! Provides:
//! - phase bookkeeping (`Phase`, `PhaseUsage`, `PhasePresence`)
//! - the reservoir-cell state handed to PVT evaluation (`CellState`)
//! - the `FluidProps` trait: viscosities, formation-volume factors, saturated
//!   dissolution ratios and relative permeabilities as dual values
//! - `BlackOilTable`, an analytic reference implementation

pub mod black_oil;
pub mod error;
pub mod phase;
pub mod props;
pub mod state;

use wf_ad::Evaluation;

/// Number of fluid phases (water, oil, gas).
pub const NUM_PHASES: usize = 3;

/// Reservoir unknowns per cell: pressure, water saturation, gas saturation.
pub const NUM_EQ: usize = 3;

pub const PRESSURE_SLOT: usize = 0;
pub const SW_SLOT: usize = 1;
pub const SG_SLOT: usize = 2;

/// Dual value with derivatives with respect to one cell's unknowns.
pub type ResEval = Evaluation<NUM_EQ>;

pub use black_oil::{BlackOilTable, CoreyRelPerm, PhasePvt};
pub use error::{PvtError, PvtResult};
pub use phase::{Phase, PhasePresence, PhaseUsage};
pub use props::FluidProps;
pub use state::{CellState, PvtState};
