//! Perforation surface rates.
//!
//! Rates are positive into the reservoir. Flow direction follows the
//! drawdown `dd = p_cell - (bhp + cdp)`:
//!
//! - `dd > 0`, reservoir to well: each phase moves with its own mobility and
//!   the free oil/gas carry dissolved gas and vaporized oil with them;
//! - `dd <= 0`, well to reservoir: the wellbore mixture (surface fractions
//!   `cmix`) is injected with the total mobility of the cell.
//!
//! A perforation flowing against the well type while cross-flow is not
//! allowed contributes nothing: zero value and zero derivatives.

use crate::{NUM_EQ, WellEval};
use crate::config::WellType;
use crate::connection::ConnectionProps;
use crate::error::{WellError, WellResult};
use wf_pvt::{NUM_PHASES, Phase, PhaseUsage};

/// Inputs shared by every perforation of a well during one evaluation.
#[derive(Clone, Copy, Debug)]
pub struct RateInputs<'a> {
    pub well: &'a str,
    pub well_type: WellType,
    pub usage: &'a PhaseUsage,
    pub bhp: WellEval,
    /// Wellbore surface fractions `[water, oil, gas]`
    pub cmix: &'a [WellEval; NUM_PHASES],
    pub allow_crossflow: bool,
}

/// Drawdown at a perforation.
pub fn drawdown(conn: &ConnectionProps, bhp: WellEval, pressure_diff: f64) -> WellEval {
    conn.pressure - (bhp + pressure_diff)
}

/// True when a perforation with drawdown `dd` flows against the well type.
pub fn flows_against(well_type: WellType, dd: f64) -> bool {
    match well_type {
        WellType::Producer => dd < 0.0,
        WellType::Injector => dd > 0.0,
    }
}

pub fn perforation_rates(
    conn: &ConnectionProps,
    transmissibility: f64,
    pressure_diff: f64,
    inputs: &RateInputs<'_>,
) -> WellResult<[WellEval; NUM_PHASES]> {
    let usage = inputs.usage;
    let mut cq = [WellEval::constant(0.0); NUM_PHASES];
    let dd = drawdown(conn, inputs.bhp, pressure_diff);
    let (w, o, g) = (Phase::Water.index(), Phase::Oil.index(), Phase::Gas.index());
    let oil_gas = usage.oil && usage.gas;

    if dd.value() > 0.0 {
        if inputs.well_type == WellType::Injector && !inputs.allow_crossflow {
            return Ok(cq);
        }
        for phase in Phase::ALL {
            if usage.is_active(phase) {
                let i = phase.index();
                cq[i] = -(dd * conn.mobility[i] * conn.inv_fvf[i]) * transmissibility;
            }
        }
        if oil_gas {
            let free_oil = cq[o];
            let free_gas = cq[g];
            cq[g] = free_gas + conn.rs * free_oil;
            cq[o] = free_oil + conn.rv * free_gas;
        }
        return Ok(cq);
    }

    if inputs.well_type == WellType::Producer && !inputs.allow_crossflow {
        return Ok(cq);
    }

    let total_rate = -(dd * conn.total_mobility()) * transmissibility;
    let cmix = inputs.cmix;
    let b = &conn.inv_fvf;

    let mut volume_ratio = WellEval::constant(0.0);
    if usage.water {
        volume_ratio += cmix[w] / b[w];
    }
    if oil_gas {
        let d = 1.0 - conn.rs * conn.rv;
        if d.value() <= 0.0 {
            return Err(WellError::Numerical {
                well: inputs.well.to_string(),
                what: "non-positive 1 - Rs Rv in injecting perforation",
            });
        }
        volume_ratio += (cmix[o] - conn.rv * cmix[g]) / d / b[o];
        volume_ratio += (cmix[g] - conn.rs * cmix[o]) / d / b[g];
    } else {
        if usage.oil {
            volume_ratio += cmix[o] / b[o];
        }
        if usage.gas {
            volume_ratio += cmix[g] / b[g];
        }
    }

    let surface_total = total_rate / volume_ratio;
    for phase in Phase::ALL {
        if usage.is_active(phase) {
            let i = phase.index();
            cq[i] = cmix[i] * surface_total;
        }
    }
    Ok(cq)
}

/// Well totals `q_well` whose reservoir slots carry only the contribution
/// of one perforation's rates `cq`. The values stay the well totals.
pub fn with_perforation_slots(
    q_well: &[WellEval; NUM_PHASES],
    cq: &[WellEval; NUM_PHASES],
    sign: f64,
) -> [WellEval; NUM_PHASES] {
    std::array::from_fn(|p| {
        let mut local = cq[p].keep_slots(0..NUM_EQ) * sign;
        local.set_value(0.0);
        q_well[p] + local
    })
}
