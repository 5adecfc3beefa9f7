#![allow(dead_code)]

use wf_pvt::{BlackOilTable, CellState, PhaseUsage};
use wf_wells::{
    ControlMode, PerforationConfig, ReservoirState, StandardWell, VfpTables, WellConfig,
    WellContext, WellModel,
};

pub const DAY: f64 = 86_400.0;

/// Cells with fixed primary unknowns `(p, s_w, s_g)`.
#[derive(Clone)]
pub struct Cells {
    pub cells: Vec<[f64; 3]>,
    /// `[R_s, R_v]` shared by every cell
    pub dissolution: [f64; 2],
}

impl Cells {
    pub fn new(cells: Vec<[f64; 3]>) -> Self {
        Self {
            cells,
            dissolution: [0.0, 0.0],
        }
    }

    pub fn with_dissolution(mut self, rs: f64, rv: f64) -> Self {
        self.dissolution = [rs, rv];
        self
    }
}

impl ReservoirState for Cells {
    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn cell_state(&self, cell: usize) -> CellState {
        let [p, sw, sg] = self.cells[cell];
        let [rs, rv] = self.dissolution;
        CellState::primary(p, sw, sg, 350.0).with_dissolution(rs, rv)
    }
}

pub fn props() -> BlackOilTable {
    BlackOilTable::default()
}

pub fn context<'a>(
    props: &'a BlackOilTable,
    usage: PhaseUsage,
    vfp: &'a VfpTables,
) -> WellContext<'a> {
    WellContext::new(props, usage, vfp).with_gravity(0.0)
}

pub fn rate_producer(
    rate: f64,
    bhp_limit: f64,
    perforations: Vec<PerforationConfig>,
) -> WellConfig {
    let mut cfg = WellConfig::producer("P1", perforations);
    cfg.controls.mode = ControlMode::Rate;
    cfg.controls.rate_target = Some(rate);
    cfg.controls.bhp_limit = Some(bhp_limit);
    cfg
}

/// Newton on the well alone with the reservoir held fixed.
pub fn solve_well(
    well: &mut StandardWell,
    ctx: &WellContext<'_>,
    reservoir: &Cells,
    dt: f64,
    max_iterations: usize,
) -> usize {
    let dx = vec![0.0; 3 * reservoir.num_cells()];
    for it in 0..max_iterations {
        well.update_connection_pressures(ctx, reservoir).unwrap();
        well.assemble(ctx, reservoir, dt).unwrap();
        let update = well.back_substitute(ctx, &dx).unwrap();
        if update.converged {
            return it;
        }
    }
    panic!("well did not converge in {max_iterations} iterations");
}
