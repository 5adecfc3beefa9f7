//! Well unknowns and the persisted well state.

use crate::config::{ControlMode, WellType};
use crate::{GFRAC, NUM_EQ, NUM_WELL_EQ, WFRAC, WellEval, XVAR};
use serde::{Deserialize, Serialize};
use wf_pvt::{NUM_PHASES, Phase, PhaseUsage};

/// Current solution and derived quantities of one well.
///
/// `unknowns` holds `[control_var, F_w, F_g]`. The control variable is the
/// bottom-hole pressure under rate control and the total surface rate under
/// pressure control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellState {
    pub name: String,
    pub well_type: WellType,
    pub mode: ControlMode,
    pub unknowns: [f64; NUM_WELL_EQ],
    /// Bottom-hole pressure [Pa]
    pub bhp: f64,
    /// Tubing-head pressure [Pa], when a lift curve is attached
    pub thp: Option<f64>,
    /// Well surface rates `[water, oil, gas]` [m³/s], positive in normal operation
    pub surface_rates: [f64; NUM_PHASES],
    /// Perforation surface rates, positive into the reservoir
    pub perf_rates: Vec<[f64; NUM_PHASES]>,
    /// Fractions `[water, oil, gas]` at the start of the timestep
    pub fractions_at_step_start: [f64; NUM_PHASES],
}

impl WellState {
    pub fn control_var(&self) -> f64 {
        self.unknowns[XVAR]
    }

    pub fn total_rate(&self) -> f64 {
        self.surface_rates.iter().sum()
    }

    /// Raw fractions `[F_w, F_o, F_g]`.
    pub fn fractions(&self, usage: &PhaseUsage) -> [f64; NUM_PHASES] {
        fraction_values(&self.unknowns, usage)
    }

    /// Fractions clamped at zero and normalized to sum one.
    pub fn surface_fractions(&self, usage: &PhaseUsage) -> [f64; NUM_PHASES] {
        let f = self.fractions(usage).map(|v| v.max(0.0));
        let sum: f64 = f.iter().sum();
        f.map(|v| v / sum)
    }

    /// Well unknowns as evaluations seeded in slots `NUM_EQ..NUM_EQ + 3`.
    pub fn well_variables(&self) -> [WellEval; NUM_WELL_EQ] {
        std::array::from_fn(|i| WellEval::variable(self.unknowns[i], NUM_EQ + i))
    }
}

pub(crate) fn fraction_values(
    unknowns: &[f64; NUM_WELL_EQ],
    usage: &PhaseUsage,
) -> [f64; NUM_PHASES] {
    let fw = if usage.water { unknowns[WFRAC] } else { 0.0 };
    let fg = if usage.gas { unknowns[GFRAC] } else { 0.0 };
    [fw, 1.0 - fw - fg, fg]
}

/// Fractions `[F_w, F_o, F_g]` as evaluations; inactive phases are zero
/// constants.
pub fn fractions(vars: &[WellEval; NUM_WELL_EQ], usage: &PhaseUsage) -> [WellEval; NUM_PHASES] {
    let fw = if usage.water {
        vars[WFRAC]
    } else {
        WellEval::constant(0.0)
    };
    let fg = if usage.gas {
        vars[GFRAC]
    } else {
        WellEval::constant(0.0)
    };
    [fw, 1.0 - fw - fg, fg]
}

/// Surface volume fractions: fractions clamped at zero, normalized to sum one.
pub fn surface_fractions(fractions: &[WellEval; NUM_PHASES]) -> [WellEval; NUM_PHASES] {
    let clamped = fractions.map(|f| f.max_value(0.0));
    let sum: WellEval = clamped.iter().copied().sum();
    clamped.map(|f| f / sum)
}

/// Index of the well unknown carrying the fraction of `phase`, if any.
pub fn fraction_unknown(phase: Phase) -> Option<usize> {
    match phase {
        Phase::Water => Some(WFRAC),
        Phase::Gas => Some(GFRAC),
        Phase::Oil => None,
    }
}
