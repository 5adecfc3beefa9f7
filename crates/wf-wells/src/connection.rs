//! Per-connection property evaluation.

use crate::error::WellResult;
use crate::{WellEval, extend_eval};
use wf_pvt::{CellState, FluidProps, NUM_PHASES, Phase, PhaseUsage};

/// Properties of a perforated cell, differentiated with respect to the
/// cell's unknowns (well slots zero).
#[derive(Clone, Copy, Debug)]
pub struct ConnectionProps {
    /// `kr / mu` per phase; zero for inactive phases
    pub mobility: [WellEval; NUM_PHASES],
    /// Inverse formation-volume factors; one for inactive phases
    pub inv_fvf: [WellEval; NUM_PHASES],
    pub pressure: WellEval,
    pub rs: WellEval,
    pub rv: WellEval,
}

impl ConnectionProps {
    pub fn total_mobility(&self) -> WellEval {
        self.mobility.iter().copied().sum()
    }
}

/// Mobilities, inverse FVFs, pressure and dissolution ratios at `cell`.
pub fn evaluate_connection(
    props: &dyn FluidProps,
    usage: &PhaseUsage,
    cell_state: &CellState,
    cell: usize,
) -> WellResult<ConnectionProps> {
    let pvt = cell_state.pvt_state();
    let kr = props.rel_perm(&cell_state.sw, &cell_state.sg, cell)?;

    let mut mobility = [WellEval::constant(0.0); NUM_PHASES];
    let mut inv_fvf = [WellEval::constant(1.0); NUM_PHASES];
    for phase in Phase::ALL {
        if !usage.is_active(phase) {
            continue;
        }
        let i = phase.index();
        let mu = props.viscosity(phase, &pvt, cell)?;
        mobility[i] = extend_eval(&(kr[i] / mu));
        inv_fvf[i] = extend_eval(&props.inv_fvf(phase, &pvt, cell)?);
    }

    Ok(ConnectionProps {
        mobility,
        inv_fvf,
        pressure: extend_eval(&cell_state.pressure),
        rs: extend_eval(&cell_state.rs),
        rv: extend_eval(&cell_state.rv),
    })
}
