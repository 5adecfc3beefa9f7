//! Reservoir-cell state consumed by property evaluation.

use crate::phase::PhasePresence;
use crate::{PRESSURE_SLOT, ResEval, SG_SLOT, SW_SLOT};

/// Input to a single PVT evaluation.
#[derive(Clone, Copy, Debug)]
pub struct PvtState {
    pub pressure: ResEval,
    /// Temperature [K]
    pub temperature: f64,
    /// Dissolved gas-oil ratio
    pub rs: ResEval,
    /// Vaporized oil-gas ratio
    pub rv: ResEval,
    pub presence: PhasePresence,
}

/// Reservoir unknowns at one cell as dual values.
///
/// Derivatives are taken with respect to this cell's own unknowns in the
/// slot order `(pressure, s_w, s_g)`.
#[derive(Clone, Copy, Debug)]
pub struct CellState {
    pub pressure: ResEval,
    pub sw: ResEval,
    pub sg: ResEval,
    pub rs: ResEval,
    pub rv: ResEval,
    /// Temperature [K]
    pub temperature: f64,
}

impl CellState {
    /// State seeded from primary-variable values, with no dissolved gas or
    /// vaporized oil.
    pub fn primary(pressure: f64, sw: f64, sg: f64, temperature: f64) -> Self {
        Self {
            pressure: ResEval::variable(pressure, PRESSURE_SLOT),
            sw: ResEval::variable(sw, SW_SLOT),
            sg: ResEval::variable(sg, SG_SLOT),
            rs: ResEval::constant(0.0),
            rv: ResEval::constant(0.0),
            temperature,
        }
    }

    /// Set constant dissolution ratios.
    pub fn with_dissolution(mut self, rs: f64, rv: f64) -> Self {
        self.rs = ResEval::constant(rs);
        self.rv = ResEval::constant(rv);
        self
    }

    pub fn so(&self) -> ResEval {
        1.0 - self.sw - self.sg
    }

    /// Primary-variable values `[p, s_w, s_g]`.
    pub fn values(&self) -> [f64; 3] {
        [self.pressure.value(), self.sw.value(), self.sg.value()]
    }

    pub fn presence(&self) -> PhasePresence {
        PhasePresence::from_saturations(self.sw.value(), self.so().value(), self.sg.value())
    }

    pub fn pvt_state(&self) -> PvtState {
        PvtState {
            pressure: self.pressure,
            temperature: self.temperature,
            rs: self.rs,
            rv: self.rv,
            presence: self.presence(),
        }
    }
}
