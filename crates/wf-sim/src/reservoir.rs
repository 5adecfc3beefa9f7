//! Reservoir models consumed by the Newton driver.
//!
//! [`TankReservoir`] is a set of lumped cells joined by two-point
//! connections. Each cell carries pore volume, depth and the primary
//! unknowns `(p, s_w, s_g)`; fluids are immiscible and move with upstream
//! phase mobility. Cells flagged `fixed` keep their initial state and act as
//! constant-pressure boundaries.
//!
//! The residual of phase `α` at cell `i`, in surface volume per second, is
//!
//! ```text
//! R_α,i = PV_i / dt (S_α b_α - S⁰_α b⁰_α) + Σ_j T_ij (λ b)_α,up (Φ_α,i - Φ_α,j)
//! ```
//!
//! with `Φ_α = p - ρ_α g z`. Well sources enter with the opposite sign to
//! their perforation rates, which are positive into the reservoir.

use crate::error::{SimError, SimResult};
use crate::system::GlobalSystem;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use wf_ad::Evaluation;
use wf_core::constants::G0_MPS2;
use wf_core::{ensure_finite, ensure_positive};
use wf_pvt::{CellState, FluidProps, NUM_EQ, NUM_PHASES, Phase, PhaseUsage, ResEval};
use wf_wells::{Block, ReservoirState, Vector3};

/// Derivative slots of a connection: both end cells' unknowns.
const PAIR_SLOTS: usize = 2 * NUM_EQ;

type PairEval = Evaluation<PAIR_SLOTS>;

/// A reservoir the driver can assemble, constrain and update.
pub trait ReservoirModel: ReservoirState + Send {
    fn phase_usage(&self) -> PhaseUsage;

    /// Reservoir-only Newton system for a step of length `dt`.
    fn assemble(&self, dt: f64) -> SimResult<GlobalSystem>;

    /// Pin the equations of cells whose state is prescribed.
    fn apply_constraints(&self, system: &mut GlobalSystem);

    /// Scaled max-norm of the system residual.
    fn convergence_norm(&self, system: &GlobalSystem, dt: f64) -> f64;

    /// Apply the Newton update `x ← x - dx`.
    fn apply_update(&mut self, dx: &DVector<f64>) -> SimResult<()>;

    /// Accept the current state as the start of the next step.
    fn end_timestep(&mut self);

    /// Restore the state at the start of the current step.
    fn reset_timestep(&mut self);

    /// Pore-volume weighted average pressure [Pa].
    fn average_pressure(&self) -> f64;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TankCell {
    /// Pore volume [m³]
    pub pore_volume: f64,
    /// Cell centre depth [m]
    #[serde(default)]
    pub depth: f64,
    /// Initial pressure [Pa]
    pub pressure: f64,
    #[serde(default)]
    pub sw: f64,
    #[serde(default)]
    pub sg: f64,
    /// Hold the initial state for the whole run.
    #[serde(default)]
    pub fixed: bool,
}

impl TankCell {
    pub fn new(pore_volume: f64, depth: f64, pressure: f64, sw: f64, sg: f64) -> Self {
        Self {
            pore_volume,
            depth,
            pressure,
            sw,
            sg,
            fixed: false,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TankConnection {
    pub cells: [usize; 2],
    /// Transmissibility [m³]
    pub transmissibility: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TankReservoirConfig {
    pub cells: Vec<TankCell>,
    #[serde(default)]
    pub connections: Vec<TankConnection>,
    /// Reservoir temperature [K]
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Largest saturation change per Newton iteration.
    #[serde(default = "default_saturation_chop")]
    pub max_saturation_change: f64,
    /// Pressure floor applied to Newton updates [Pa].
    #[serde(default = "default_min_pressure")]
    pub min_pressure: f64,
}

fn default_temperature() -> f64 {
    350.0
}

fn default_saturation_chop() -> f64 {
    0.2
}

fn default_min_pressure() -> f64 {
    1.0e5
}

impl TankReservoirConfig {
    pub fn new(cells: Vec<TankCell>, connections: Vec<TankConnection>) -> Self {
        Self {
            cells,
            connections,
            temperature: default_temperature(),
            max_saturation_change: default_saturation_chop(),
            min_pressure: default_min_pressure(),
        }
    }

    pub fn validate(&self, usage: &PhaseUsage) -> SimResult<()> {
        let invalid = |what: String| SimError::InvalidConfig { what };
        if self.cells.is_empty() {
            return Err(invalid("no cells".to_string()));
        }
        for (i, cell) in self.cells.iter().enumerate() {
            ensure_positive(cell.pore_volume, "pore volume")
                .and_then(|_| ensure_positive(cell.pressure, "pressure"))
                .and_then(|_| ensure_finite(cell.depth, "depth"))
                .map_err(|e| invalid(format!("cell {i}: {e}")))?;
            let in_range = |s: f64| (0.0..=1.0).contains(&s);
            if !in_range(cell.sw) || !in_range(cell.sg) || cell.sw + cell.sg > 1.0 {
                return Err(invalid(format!("cell {i}: saturations out of range")));
            }
            if (!usage.water && cell.sw != 0.0) || (!usage.gas && cell.sg != 0.0) {
                return Err(invalid(format!("cell {i}: saturation of an inactive phase")));
            }
        }
        for conn in &self.connections {
            let [a, b] = conn.cells;
            if a >= self.cells.len() || b >= self.cells.len() || a == b {
                return Err(invalid(format!("connection {a}-{b}: bad cell index")));
            }
            ensure_positive(conn.transmissibility, "transmissibility")
                .map_err(|e| invalid(format!("connection {a}-{b}: {e}")))?;
        }
        ensure_positive(self.temperature, "temperature")?;
        if !(self.max_saturation_change > 0.0 && self.max_saturation_change <= 1.0) {
            return Err(invalid("max_saturation_change must lie in (0, 1]".to_string()));
        }
        Ok(())
    }
}

/// Phase quantities of one cell as dual values.
struct CellProps {
    saturation: [ResEval; NUM_PHASES],
    /// Inverse formation-volume factor
    inv_fvf: [ResEval; NUM_PHASES],
    mobility: [ResEval; NUM_PHASES],
    /// Reservoir density [kg/m³]
    density: [ResEval; NUM_PHASES],
}

#[derive(Clone)]
pub struct TankReservoir {
    config: TankReservoirConfig,
    props: Arc<dyn FluidProps>,
    usage: PhaseUsage,
    gravity: f64,
    /// Current `[p, s_w, s_g]` per cell
    state: Vec<[f64; NUM_EQ]>,
    state_at_step_start: Vec<[f64; NUM_EQ]>,
    /// `S_α b_α` per cell at the start of the step
    stored_at_step_start: Vec<[f64; NUM_PHASES]>,
}

impl TankReservoir {
    pub fn new(
        config: TankReservoirConfig,
        props: Arc<dyn FluidProps>,
        usage: PhaseUsage,
    ) -> SimResult<Self> {
        usage.validate()?;
        config.validate(&usage)?;
        let state: Vec<[f64; NUM_EQ]> = config
            .cells
            .iter()
            .map(|c| [c.pressure, c.sw, c.sg])
            .collect();
        let mut reservoir = Self {
            config,
            props,
            usage,
            gravity: G0_MPS2,
            state_at_step_start: state.clone(),
            state,
            stored_at_step_start: Vec::new(),
        };
        reservoir.stored_at_step_start = reservoir.stored_volumes()?;
        debug!(
            cells = reservoir.state.len(),
            connections = reservoir.config.connections.len(),
            props = reservoir.props.name(),
            "tank reservoir created"
        );
        Ok(reservoir)
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn config(&self) -> &TankReservoirConfig {
        &self.config
    }

    /// Current `[p, s_w, s_g]` of `cell`.
    pub fn values(&self, cell: usize) -> [f64; NUM_EQ] {
        self.state[cell]
    }

    /// Surface volume of each phase in place [m³].
    pub fn fluid_in_place(&self) -> SimResult<[f64; NUM_PHASES]> {
        let stored = self.stored_volumes()?;
        let mut total = [0.0; NUM_PHASES];
        for (cell, s) in self.config.cells.iter().zip(&stored) {
            for (t, v) in total.iter_mut().zip(s) {
                *t += cell.pore_volume * v;
            }
        }
        Ok(total)
    }

    fn cell_props(&self, cell: usize) -> SimResult<CellProps> {
        let cs = self.cell_state(cell);
        let pvt = cs.pvt_state();
        let kr = self.props.rel_perm(&cs.sw, &cs.sg, cell)?;
        let rho_s = self.props.surface_densities(cell);
        let zero = ResEval::constant(0.0);
        let mut props = CellProps {
            saturation: [cs.sw, cs.so(), cs.sg],
            inv_fvf: [zero; NUM_PHASES],
            mobility: [zero; NUM_PHASES],
            density: [zero; NUM_PHASES],
        };
        for phase in Phase::ALL {
            if !self.usage.is_active(phase) {
                continue;
            }
            let i = phase.index();
            let b = self.props.inv_fvf(phase, &pvt, cell)?;
            let mu = self.props.viscosity(phase, &pvt, cell)?;
            props.inv_fvf[i] = b;
            props.mobility[i] = kr[i] / mu;
            props.density[i] = b * rho_s[i];
        }
        Ok(props)
    }

    fn stored_volumes(&self) -> SimResult<Vec<[f64; NUM_PHASES]>> {
        (0..self.state.len())
            .map(|cell| {
                let props = self.cell_props(cell)?;
                Ok(std::array::from_fn(|i| {
                    (props.saturation[i] * props.inv_fvf[i]).value()
                }))
            })
            .collect()
    }
}

fn to_block(eqs: &[ResEval; NUM_PHASES]) -> (Block, Vector3) {
    let mut block = Block::zeros();
    let mut r = Vector3::zeros();
    for (row, eq) in eqs.iter().enumerate() {
        r[row] = eq.value();
        for col in 0..NUM_EQ {
            block[(row, col)] = eq.derivative(col);
        }
    }
    (block, r)
}

/// Split a two-cell flux into its blocks with respect to each end.
fn split_pair(flux: &[PairEval; NUM_PHASES]) -> (Block, Block) {
    let mut left = Block::zeros();
    let mut right = Block::zeros();
    for (row, f) in flux.iter().enumerate() {
        for col in 0..NUM_EQ {
            left[(row, col)] = f.derivative(col);
            right[(row, col)] = f.derivative(NUM_EQ + col);
        }
    }
    (left, right)
}

impl ReservoirState for TankReservoir {
    fn num_cells(&self) -> usize {
        self.state.len()
    }

    fn cell_state(&self, cell: usize) -> CellState {
        let [p, sw, sg] = self.state[cell];
        CellState::primary(p, sw, sg, self.config.temperature)
    }
}

impl ReservoirModel for TankReservoir {
    fn phase_usage(&self) -> PhaseUsage {
        self.usage
    }

    fn assemble(&self, dt: f64) -> SimResult<GlobalSystem> {
        let n = self.state.len();
        let mut system = GlobalSystem::new(n);
        let props = (0..n)
            .map(|cell| self.cell_props(cell))
            .collect::<SimResult<Vec<_>>>()?;

        for (cell, p) in props.iter().enumerate() {
            let cs = self.cell_state(cell);
            let pv_dt = self.config.cells[cell].pore_volume / dt;
            let stored = &self.stored_at_step_start[cell];
            let eqs: [ResEval; NUM_PHASES] = std::array::from_fn(|i| match Phase::ALL[i] {
                Phase::Water if !self.usage.water => cs.sw,
                Phase::Gas if !self.usage.gas => cs.sg,
                _ => (p.saturation[i] * p.inv_fvf[i] - stored[i]) * pv_dt,
            });
            let (block, r) = to_block(&eqs);
            system.add_block(cell, cell, &block);
            system.add_residual(cell, &r);
        }

        for conn in &self.config.connections {
            let [a, b] = conn.cells;
            let (pa, pb) = (&props[a], &props[b]);
            let dz = self.config.cells[a].depth - self.config.cells[b].depth;
            let pressure_a = self.cell_state(a).pressure.extend::<PAIR_SLOTS>(0);
            let pressure_b = self.cell_state(b).pressure.extend::<PAIR_SLOTS>(NUM_EQ);

            let mut flux = [PairEval::constant(0.0); NUM_PHASES];
            for phase in Phase::ALL {
                if !self.usage.is_active(phase) {
                    continue;
                }
                let i = phase.index();
                let rho_a = pa.density[i].extend::<PAIR_SLOTS>(0);
                let rho_b = pb.density[i].extend::<PAIR_SLOTS>(NUM_EQ);
                let rho = (rho_a + rho_b) * 0.5;
                let dphi = pressure_a - pressure_b - rho * (self.gravity * dz);
                let up = if dphi.value() >= 0.0 {
                    (pa.mobility[i] * pa.inv_fvf[i]).extend::<PAIR_SLOTS>(0)
                } else {
                    (pb.mobility[i] * pb.inv_fvf[i]).extend::<PAIR_SLOTS>(NUM_EQ)
                };
                flux[i] = up * dphi * conn.transmissibility;
            }

            let (da, db) = split_pair(&flux);
            let r = Vector3::from_fn(|i, _| flux[i].value());
            system.add_block(a, a, &da);
            system.add_block(a, b, &db);
            system.add_residual(a, &r);
            system.add_block(b, a, &(-da));
            system.add_block(b, b, &(-db));
            system.add_residual(b, &(-r));
        }
        Ok(system)
    }

    fn apply_constraints(&self, system: &mut GlobalSystem) {
        for (cell, c) in self.config.cells.iter().enumerate() {
            if c.fixed {
                system.pin(cell);
            }
        }
    }

    fn convergence_norm(&self, system: &GlobalSystem, dt: f64) -> f64 {
        let mut norm: f64 = 0.0;
        for (cell, c) in self.config.cells.iter().enumerate() {
            if c.fixed {
                continue;
            }
            let r = system.residual_block(cell);
            for phase in Phase::ALL {
                if self.usage.is_active(phase) {
                    norm = norm.max(r[phase.index()].abs() * dt / c.pore_volume);
                }
            }
        }
        norm
    }

    fn apply_update(&mut self, dx: &DVector<f64>) -> SimResult<()> {
        let chop = self.config.max_saturation_change;
        for (cell, c) in self.config.cells.iter().enumerate() {
            if c.fixed {
                continue;
            }
            let base = cell * NUM_EQ;
            let (dp, dsw, dsg) = (dx[base], dx[base + 1], dx[base + 2]);
            let largest = dsw.abs().max(dsg.abs());
            let scale = if largest > chop { chop / largest } else { 1.0 };

            let [p, sw, sg] = &mut self.state[cell];
            *p = (*p - dp).max(self.config.min_pressure);
            *sw = (*sw - scale * dsw).clamp(0.0, 1.0);
            *sg = (*sg - scale * dsg).clamp(0.0, 1.0);
            let total = *sw + *sg;
            if total > 1.0 {
                *sw /= total;
                *sg /= total;
            }
            if !(p.is_finite() && sw.is_finite() && sg.is_finite()) {
                return Err(SimError::Retryable {
                    message: format!("non-finite reservoir state in cell {cell}"),
                });
            }
        }
        Ok(())
    }

    fn end_timestep(&mut self) {
        self.state_at_step_start.clone_from(&self.state);
        match self.stored_volumes() {
            Ok(stored) => self.stored_at_step_start = stored,
            // the converged state was evaluated by the last assembly
            Err(e) => debug!(error = %e, "keeping previous stored volumes"),
        }
    }

    fn reset_timestep(&mut self) {
        self.state.clone_from(&self.state_at_step_start);
    }

    fn average_pressure(&self) -> f64 {
        let (mut sum, mut pv) = (0.0, 0.0);
        for (c, s) in self.config.cells.iter().zip(&self.state) {
            sum += c.pore_volume * s[0];
            pv += c.pore_volume;
        }
        sum / pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_pvt::BlackOilTable;

    fn two_cells(p0: f64, p1: f64) -> TankReservoir {
        let cells = vec![
            TankCell::new(1.0e4, 1000.0, p0, 0.2, 0.0),
            TankCell::new(1.0e4, 1000.0, p1, 0.2, 0.0),
        ];
        let conns = vec![TankConnection {
            cells: [0, 1],
            transmissibility: 1.0e-12,
        }];
        TankReservoir::new(
            TankReservoirConfig::new(cells, conns),
            Arc::new(BlackOilTable::default()),
            PhaseUsage::oil_water(),
        )
        .unwrap()
    }

    #[test]
    fn equilibrium_has_zero_residual() {
        let res = two_cells(2.0e7, 2.0e7);
        let system = res.assemble(86_400.0).unwrap();
        assert!(system.residual().amax() < 1e-20);
        assert_eq!(res.convergence_norm(&system, 86_400.0), 0.0);
    }

    #[test]
    fn flux_is_conservative_and_upstream() {
        let res = two_cells(2.1e7, 2.0e7);
        let system = res.assemble(86_400.0).unwrap();
        let r0 = system.residual_block(0);
        let r1 = system.residual_block(1);
        // at the step start accumulation vanishes, so only the flux remains
        for i in 0..NUM_PHASES {
            assert!((r0[i] + r1[i]).abs() < 1e-18);
        }
        // cell 0 is upstream and loses oil
        assert!(r0[Phase::Oil.index()] > 0.0);
        // upstream mobility: the downstream cell's saturation has no effect
        let d_down = system.block(0, 1);
        assert_eq!(d_down[(Phase::Oil.index(), 1)], 0.0);
        assert!(d_down[(Phase::Oil.index(), 0)] < 0.0);
    }

    #[test]
    fn inactive_gas_row_pins_gas_saturation() {
        let res = two_cells(2.0e7, 2.0e7);
        let system = res.assemble(1.0).unwrap();
        let block = system.block(0, 0);
        assert_eq!(block[(2, 2)], 1.0);
        assert_eq!(block[(2, 0)], 0.0);
    }

    #[test]
    fn update_chops_saturation_and_keeps_fixed_cells() {
        let cells = vec![
            TankCell::new(1.0e4, 0.0, 2.0e7, 0.2, 0.0),
            TankCell::new(1.0e4, 0.0, 2.0e7, 0.2, 0.0).fixed(),
        ];
        let mut res = TankReservoir::new(
            TankReservoirConfig::new(cells, vec![]),
            Arc::new(BlackOilTable::default()),
            PhaseUsage::oil_water(),
        )
        .unwrap();
        let dx = DVector::from_vec(vec![1.0e6, -0.5, 0.0, 1.0e6, -0.5, 0.0]);
        res.apply_update(&dx).unwrap();
        let [p, sw, _] = res.values(0);
        assert_eq!(p, 1.9e7);
        assert!((sw - 0.4).abs() < 1e-15);
        assert_eq!(res.values(1), [2.0e7, 0.2, 0.0]);

        res.reset_timestep();
        assert_eq!(res.values(0), [2.0e7, 0.2, 0.0]);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let props: Arc<dyn FluidProps> = Arc::new(BlackOilTable::default());
        let usage = PhaseUsage::oil_water();
        let gas = TankReservoirConfig::new(vec![TankCell::new(1.0, 0.0, 1.0e7, 0.2, 0.1)], vec![]);
        assert!(TankReservoir::new(gas, props.clone(), usage).is_err());
        let conn = TankReservoirConfig::new(
            vec![TankCell::new(1.0, 0.0, 1.0e7, 0.2, 0.0)],
            vec![TankConnection {
                cells: [0, 1],
                transmissibility: 1.0,
            }],
        );
        assert!(TankReservoir::new(conn, props.clone(), usage).is_err());
        let empty = TankReservoirConfig::new(vec![], vec![]);
        assert!(TankReservoir::new(empty, props, usage).is_err());
    }

    proptest::proptest! {
        #[test]
        fn update_keeps_state_physical(
            dp in -5.0e7f64..5.0e7,
            dsw in -2.0f64..2.0,
            dsg in -2.0f64..2.0,
        ) {
            let cells = vec![TankCell::new(1.0e4, 0.0, 2.0e7, 0.3, 0.3)];
            let mut res = TankReservoir::new(
                TankReservoirConfig::new(cells, vec![]),
                Arc::new(BlackOilTable::default()),
                PhaseUsage::three_phase(),
            )
            .unwrap();
            res.apply_update(&DVector::from_vec(vec![dp, dsw, dsg])).unwrap();
            let [p, sw, sg] = res.values(0);
            proptest::prop_assert!(p >= res.config().min_pressure);
            proptest::prop_assert!((0.0..=1.0).contains(&sw));
            proptest::prop_assert!((0.0..=1.0).contains(&sg));
            proptest::prop_assert!(sw + sg <= 1.0 + 1e-12);
            proptest::prop_assert!((sw - 0.3).abs() <= 0.2 + 1e-12);
            proptest::prop_assert!((sg - 0.3).abs() <= 0.2 + 1e-12);
        }
    }
}
