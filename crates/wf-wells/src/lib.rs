//! wf-wells: standard-well local assembly and Schur elimination.
//!
//! A well adds three unknowns (a control variable and two surface volume
//! fractions) and three equations to the reservoir system. Each Newton
//! iteration the well:
//!
//! 1. refreshes its connection densities and hydrostatic pressure drops
//!    ([`pressure`]),
//! 2. evaluates perforation rates with dual numbers spanning the perforated
//!    cell's unknowns and the well unknowns ([`connection`], [`rates`]),
//! 3. builds the local blocks `B`, `C`, `D` and `resWell`, inverts `D` and
//!    returns the eliminated contribution `-C D⁻¹ B` / `-C D⁻¹ resWell` to
//!    the reservoir-only system ([`assembly`]),
//! 4. recovers its own update from the reservoir update by
//!    back-substitution and applies control-mode switching ([`control`]).
//!
//! # Example
//!
//! ```
//! use wf_pvt::{BlackOilTable, CellState, PhaseUsage};
//! use wf_wells::{
//!     ControlMode, PerforationConfig, ReservoirState, StandardWell, VfpTables, WellConfig,
//!     WellContext, WellModel, WellType,
//! };
//!
//! struct OneCell;
//! impl ReservoirState for OneCell {
//!     fn num_cells(&self) -> usize {
//!         1
//!     }
//!     fn cell_state(&self, _cell: usize) -> CellState {
//!         CellState::primary(2.0e7, 0.0, 0.0, 350.0)
//!     }
//! }
//!
//! let props = BlackOilTable::default();
//! let vfp = VfpTables::default();
//! let ctx = WellContext::new(&props, PhaseUsage::oil_only(), &vfp);
//!
//! let mut config = WellConfig::producer("P1", vec![PerforationConfig::new(0, 1.0e-12, 2000.0)]);
//! config.controls.mode = ControlMode::Rate;
//! config.controls.rate_target = Some(1.0e-3);
//! config.controls.bhp_limit = Some(1.0e6);
//!
//! let mut well = StandardWell::new(config, &ctx, &OneCell).unwrap();
//! well.update_connection_pressures(&ctx, &OneCell).unwrap();
//! let contributions = well.assemble(&ctx, &OneCell, 86_400.0).unwrap();
//! assert_eq!(contributions.sources.len(), 1);
//! assert_eq!(well.current_state().well_type, WellType::Producer);
//! ```

pub mod assembly;
pub mod config;
pub mod connection;
pub mod control;
pub mod dense;
pub mod equations;
pub mod error;
pub mod model;
pub mod perforation;
pub mod pressure;
pub mod rates;
pub mod standard_well;
pub mod state;
pub mod vfp;

use nalgebra::{SMatrix, SVector};
use wf_ad::Evaluation;
use wf_pvt::{NUM_EQ, ResEval};

/// Well unknowns per well: control variable, water fraction, gas fraction.
pub const NUM_WELL_EQ: usize = 3;

/// Derivative slots of a well evaluation: the perforated cell's unknowns
/// followed by the well unknowns.
pub const NUM_SLOTS: usize = NUM_EQ + NUM_WELL_EQ;

/// Position of the control variable among the well unknowns.
pub const XVAR: usize = 0;
/// Position of the water fraction among the well unknowns.
pub const WFRAC: usize = 1;
/// Position of the gas fraction among the well unknowns.
pub const GFRAC: usize = 2;

/// Dual value over one perforated cell's unknowns and the well unknowns.
pub type WellEval = Evaluation<NUM_SLOTS>;

/// 3x3 block (`B_j`, `C_j`, `D`, Jacobian coupling).
pub type Block = SMatrix<f64, NUM_EQ, NUM_WELL_EQ>;

/// Residual vector of three entries.
pub type Vector3 = SVector<f64, NUM_EQ>;

/// Promote a reservoir-only evaluation into the combined space. Well slots
/// are zero.
pub fn extend_eval(e: &ResEval) -> WellEval {
    e.extend::<NUM_SLOTS>(0)
}

pub use assembly::{CellSource, Coupling, WellBlocks, WellContributions};
pub use config::{
    ControlMode, PerforationConfig, RateKind, UpdateLimits, WellConfig, WellControls,
    WellStatus, WellType,
};
pub use connection::{ConnectionProps, evaluate_connection};
pub use control::{ControlSwitch, SwitchReason, WellUpdate};
pub use error::{WellError, WellResult};
pub use model::{ReservoirState, WellContext, WellModel};
pub use perforation::PerforationData;
pub use standard_well::StandardWell;
pub use state::WellState;
pub use vfp::{LiftCurve, LinearLiftCurve, VfpTables};
