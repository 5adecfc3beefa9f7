//! Well equations as functions of the well surface rates and unknowns.
//!
//! Row 0 is the control equation and the only row that depends on the
//! control mode. Rows 1 and 2 close the water and gas fractions.

use crate::config::{ControlMode, WellControls, WellType};
use crate::{GFRAC, NUM_WELL_EQ, WFRAC, WellEval, XVAR};
use wf_pvt::{NUM_PHASES, Phase, PhaseUsage};

/// Everything besides the rates that the well equations depend on.
#[derive(Clone, Copy, Debug)]
pub struct EquationInputs<'a> {
    pub mode: ControlMode,
    pub controls: &'a WellControls,
    pub well_type: WellType,
    pub usage: &'a PhaseUsage,
    pub vars: &'a [WellEval; NUM_WELL_EQ],
    /// `[F_w, F_o, F_g]`
    pub fractions: &'a [WellEval; NUM_PHASES],
    pub fractions_at_step_start: &'a [f64; NUM_PHASES],
    pub injected_fractions: &'a [f64; NUM_PHASES],
    /// Wellbore volume over timestep length [m³/s]
    pub storage: f64,
}

/// Evaluate the three well equations for surface rates `q` (positive in the
/// well's normal flow direction).
///
/// The control variable swaps with the mode: it is the bhp under rate
/// control and the total rate under bhp or thp control.
pub fn well_equations(
    q: &[WellEval; NUM_PHASES],
    inp: &EquationInputs<'_>,
) -> [WellEval; NUM_WELL_EQ] {
    let total: WellEval = q.iter().copied().sum();
    let control = match inp.mode {
        ControlMode::Rate => {
            let target = inp.controls.rate_target.unwrap_or(0.0);
            inp.controls.rate_kind.select(q) - target
        }
        ControlMode::Bhp | ControlMode::Thp => inp.vars[XVAR] - total,
        ControlMode::Shut => inp.vars[XVAR],
    };

    let closure = |row: usize, phase: Phase| -> WellEval {
        if !inp.usage.is_active(phase) {
            return inp.vars[row];
        }
        let i = phase.index();
        match inp.well_type {
            WellType::Producer => {
                inp.fractions[i] * total - q[i]
                    + (inp.fractions[i] - inp.fractions_at_step_start[i]) * inp.storage
            }
            WellType::Injector => inp.fractions[i] - inp.injected_fractions[i],
        }
    };

    [control, closure(WFRAC, Phase::Water), closure(GFRAC, Phase::Gas)]
}
