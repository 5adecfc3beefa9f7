//! Outer Newton driver for reservoir models coupled to wells.
//!
//! Provides:
//! - the `ReservoirModel` trait and `TankReservoir`, a lumped-cell reference model
//! - `GlobalSystem`, the dense reduced Newton system wells scatter into
//! - `LinearSolver` with a dense LU implementation
//! - `Simulator`: per-step Newton loop with parallel well assembly and
//!   timestep cutback

pub mod error;
pub mod linear;
pub mod newton;
pub mod reservoir;
pub mod sim;
pub mod system;

pub use error::{SimError, SimResult};
pub use linear::{DenseLu, LinearSolver};
pub use newton::{NewtonConfig, NewtonOutcome};
pub use reservoir::{ReservoirModel, TankCell, TankConnection, TankReservoir, TankReservoirConfig};
pub use sim::{SimOptions, Simulator, StepReport, WellReport};
pub use system::GlobalSystem;
