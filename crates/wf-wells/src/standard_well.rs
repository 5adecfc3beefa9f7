//! Standard (single-segment) well.

use crate::assembly::{CellSource, WellBlocks, WellContributions};
use crate::config::{ControlMode, WellConfig, WellStatus, WellType};
use crate::connection::{ConnectionProps, evaluate_connection};
use crate::control::{ControlSwitch, ImpliedValues, WellUpdate, check_constraints};
use crate::dense::invert;
use crate::equations::{EquationInputs, well_equations};
use crate::error::{WellError, WellResult};
use crate::model::{ReservoirState, WellContext, WellModel};
use crate::perforation::{PerforationData, ordered_perforations};
use crate::pressure::{ConnectionFluid, connection_densities, connection_pressure_diffs};
use crate::rates::{
    RateInputs, drawdown, flows_against, perforation_rates, with_perforation_slots,
};
use crate::state::{WellState, fraction_values, fractions, surface_fractions};
use crate::vfp::LiftCurve;
use crate::{Block, GFRAC, NUM_EQ, NUM_SLOTS, NUM_WELL_EQ, Vector3, WFRAC, WellEval, XVAR};
use tracing::{debug, info};
use wf_pvt::{NUM_PHASES, Phase, PhasePresence, PhaseUsage, PvtState, ResEval};

/// Offset of the initial bottom-hole pressure guess from the top perforated
/// cell pressure [Pa].
const INITIAL_DRAWDOWN: f64 = 1.0e5;

#[derive(Clone, Debug)]
pub struct StandardWell {
    config: WellConfig,
    perforations: Vec<PerforationData>,
    ref_depth: f64,
    state: WellState,
    blocks: WellBlocks,
}

/// Quantities of one evaluation of the well at the current unknowns.
struct Evaluated {
    vars: [WellEval; NUM_WELL_EQ],
    fractions: [WellEval; NUM_PHASES],
    cmix: [WellEval; NUM_PHASES],
    bhp: WellEval,
}

impl StandardWell {
    pub fn new(
        config: WellConfig,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
    ) -> WellResult<Self> {
        ctx.phase_usage.validate()?;
        config.validate(reservoir.num_cells(), &ctx.phase_usage, |id| {
            ctx.vfp.contains(id)
        })?;
        let mut config = config;
        if config.well_type.is_producer() {
            // the bhp floor is the last feasible limit of a producer
            let floor = ctx.limits.bhp_floor;
            let limit = config.controls.bhp_limit.map_or(floor, |l| l.max(floor));
            config.controls.bhp_limit = Some(limit);
        }

        let perforations = ordered_perforations(&config.perforations);
        let top = &perforations[0];
        let ref_depth = config.ref_depth.unwrap_or(top.depth());
        let top_state = reservoir.cell_state(top.cell());

        let initial_fractions = match config.well_type {
            WellType::Injector => config.injected_fractions,
            WellType::Producer => {
                let conn =
                    evaluate_connection(ctx.props, &ctx.phase_usage, &top_state, top.cell())?;
                let weights: [f64; NUM_PHASES] = std::array::from_fn(|i| {
                    (conn.mobility[i] * conn.inv_fvf[i]).value().max(0.0)
                });
                let sum: f64 = weights.iter().sum();
                if sum > 0.0 && sum.is_finite() {
                    weights.map(|w| w / sum)
                } else {
                    [0.0, 1.0, 0.0]
                }
            }
        };

        let mode = match config.status {
            WellStatus::Open => config.controls.mode,
            WellStatus::Shut => ControlMode::Shut,
        };
        let bhp_guess = top_state.pressure.value() + config.well_type.sign() * INITIAL_DRAWDOWN;
        let n = perforations.len();
        let state = WellState {
            name: config.name.clone(),
            well_type: config.well_type,
            mode,
            unknowns: [
                0.0,
                initial_fractions[Phase::Water.index()],
                initial_fractions[Phase::Gas.index()],
            ],
            bhp: bhp_guess,
            thp: None,
            surface_rates: [0.0; NUM_PHASES],
            perf_rates: vec![[0.0; NUM_PHASES]; n],
            fractions_at_step_start: initial_fractions,
        };

        let mut well = Self {
            config,
            perforations,
            ref_depth,
            state,
            blocks: WellBlocks::default(),
        };
        well.initialize_control_var(mode);
        debug!(well = %well.config.name, ?mode, perforations = n, "well created");
        Ok(well)
    }

    pub fn config(&self) -> &WellConfig {
        &self.config
    }

    pub fn perforations(&self) -> &[PerforationData] {
        &self.perforations
    }

    /// Blocks of the last assembly.
    pub fn blocks(&self) -> &WellBlocks {
        &self.blocks
    }

    /// Overwrite the well unknowns `[control_var, F_w, F_g]`.
    pub fn set_unknowns(&mut self, unknowns: [f64; NUM_WELL_EQ]) {
        self.state.unknowns = unknowns;
    }

    /// Switch to `mode` and re-initialize the control variable for it.
    pub fn set_mode(&mut self, mode: ControlMode) {
        self.state.mode = mode;
        if mode == ControlMode::Shut {
            self.clear_rates();
        } else {
            self.initialize_control_var(mode);
        }
    }

    /// Newton update of the well unknowns implied by a reservoir update,
    /// before damping.
    pub fn well_update(&self, dx: &[f64]) -> Vector3 {
        self.blocks.well_update(dx)
    }

    fn lift_curve<'c>(&self, ctx: &WellContext<'c>) -> Option<&'c dyn LiftCurve> {
        self.config.controls.vfp_table.and_then(|id| ctx.vfp.get(id))
    }

    fn initialize_control_var(&mut self, mode: ControlMode) {
        match mode {
            ControlMode::Rate => self.state.unknowns[XVAR] = self.state.bhp,
            ControlMode::Bhp => {
                self.state.unknowns[XVAR] = self.state.total_rate();
                if let Some(target) = self.config.controls.bhp_limit {
                    self.state.bhp = target;
                }
            }
            ControlMode::Thp => self.state.unknowns[XVAR] = self.state.total_rate(),
            ControlMode::Shut => {}
        }
    }

    fn clear_rates(&mut self) {
        self.state.surface_rates = [0.0; NUM_PHASES];
        for q in &mut self.state.perf_rates {
            *q = [0.0; NUM_PHASES];
        }
        self.blocks.clear();
    }

    /// Bottom-hole pressure as a function of the well unknowns.
    fn bhp_eval(
        &self,
        ctx: &WellContext<'_>,
        vars: &[WellEval; NUM_WELL_EQ],
        cmix: &[WellEval; NUM_PHASES],
    ) -> WellResult<WellEval> {
        let controls = &self.config.controls;
        match self.state.mode {
            ControlMode::Rate => Ok(vars[XVAR]),
            ControlMode::Bhp => Ok(WellEval::constant(
                controls.bhp_limit.unwrap_or(self.state.bhp),
            )),
            ControlMode::Thp => {
                let (Some(curve), Some(thp)) = (self.lift_curve(ctx), controls.thp_limit) else {
                    return Err(WellError::invalid(
                        &self.config.name,
                        "tubing-head pressure control without a lift table",
                    ));
                };
                let rates = cmix.map(|f| f * vars[XVAR]);
                Ok(curve.bhp(&rates, thp, self.config.well_type.is_producer()))
            }
            ControlMode::Shut => Ok(WellEval::constant(self.state.bhp)),
        }
    }

    fn evaluate(&self, ctx: &WellContext<'_>) -> WellResult<Evaluated> {
        let vars = self.state.well_variables();
        let fractions = fractions(&vars, &ctx.phase_usage);
        let cmix = surface_fractions(&fractions);
        let bhp = self.bhp_eval(ctx, &vars, &cmix)?;
        Ok(Evaluated {
            vars,
            fractions,
            cmix,
            bhp,
        })
    }

    fn connections(
        &self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
    ) -> WellResult<Vec<ConnectionProps>> {
        self.perforations
            .iter()
            .map(|perf| {
                let cell_state = reservoir.cell_state(perf.cell());
                evaluate_connection(ctx.props, &ctx.phase_usage, &cell_state, perf.cell())
            })
            .collect()
    }

    /// Cross-flow is allowed when configured, or when every perforation
    /// flows against the well type.
    fn crossflow_allowed(&self, conns: &[ConnectionProps], bhp: WellEval) -> bool {
        self.config.allow_crossflow
            || self.perforations.iter().zip(conns).all(|(perf, conn)| {
                let dd = drawdown(conn, bhp, perf.pressure_diff).value();
                flows_against(self.config.well_type, dd)
            })
    }

    fn equation_inputs<'s>(
        &'s self,
        usage: &'s PhaseUsage,
        eval: &'s Evaluated,
        dt: f64,
    ) -> EquationInputs<'s> {
        EquationInputs {
            mode: self.state.mode,
            controls: &self.config.controls,
            well_type: self.config.well_type,
            usage,
            vars: &eval.vars,
            fractions: &eval.fractions,
            fractions_at_step_start: &self.state.fractions_at_step_start,
            injected_fractions: &self.config.injected_fractions,
            storage: self.config.wellbore_volume / dt,
        }
    }

    /// Constraint values implied by tentative unknowns.
    fn implied_values(
        &self,
        ctx: &WellContext<'_>,
        unknowns: &[f64; NUM_WELL_EQ],
    ) -> ImpliedValues {
        let usage = &ctx.phase_usage;
        let producer = self.config.well_type.is_producer();
        let curve = self.lift_curve(ctx);
        let f = fraction_values(unknowns, usage).map(|v| v.max(0.0));
        let sum: f64 = f.iter().sum();
        let cmix = f.map(|v| v / sum);

        let controls = &self.config.controls;
        let (bhp, rates) = match self.state.mode {
            ControlMode::Rate => (unknowns[XVAR], self.state.surface_rates),
            ControlMode::Bhp => (
                controls.bhp_limit.unwrap_or(self.state.bhp),
                cmix.map(|c| c * unknowns[XVAR]),
            ),
            ControlMode::Thp => {
                let rates = cmix.map(|c| c * unknowns[XVAR]);
                let bhp = match (curve, controls.thp_limit) {
                    (Some(curve), Some(thp)) => curve
                        .bhp(&rates.map(WellEval::constant), thp, producer)
                        .value(),
                    _ => self.state.bhp,
                };
                (bhp, rates)
            }
            ControlMode::Shut => (self.state.bhp, [0.0; NUM_PHASES]),
        };
        let thp = curve.map(|c| c.thp(&rates, bhp, producer));
        ImpliedValues { bhp, thp, rates }
    }

    fn apply_switch(&mut self, switch: ControlSwitch) {
        info!(
            well = %self.config.name,
            from = ?switch.from,
            to = ?switch.to,
            reason = %switch.reason,
            "control mode switch"
        );
        self.set_mode(switch.to);
    }
}

impl WellModel for StandardWell {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn cells(&self) -> Vec<usize> {
        self.perforations.iter().map(|p| p.cell()).collect()
    }

    fn update_connection_pressures(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
    ) -> WellResult<()> {
        if self.state.mode == ControlMode::Shut {
            return Ok(());
        }
        let usage = &ctx.phase_usage;
        let eval = self.evaluate(ctx)?;
        let conns = self.connections(ctx, reservoir)?;
        let sign = self.config.well_type.sign();
        let (o, g) = (Phase::Oil.index(), Phase::Gas.index());
        let well_rates = self.state.surface_rates;

        let inputs = RateInputs {
            well: &self.config.name,
            well_type: self.config.well_type,
            usage,
            bhp: eval.bhp,
            cmix: &eval.cmix,
            allow_crossflow: true,
        };

        let mut fluids = Vec::with_capacity(self.perforations.len());
        for (perf, conn) in self.perforations.iter().zip(&conns) {
            let cell = perf.cell();
            let cq = perforation_rates(conn, perf.transmissibility(), perf.pressure_diff, &inputs)?;
            let temperature = reservoir.cell_state(cell).temperature;
            let pressure = ResEval::constant(eval.bhp.value() + perf.pressure_diff);

            let (mut rs_max, mut rv_max) = (0.0, 0.0);
            let (mut rs, mut rv) = (0.0, 0.0);
            if usage.oil && usage.gas {
                rs_max = ctx.props.rs_sat(&pressure, temperature, cell)?.value();
                rv_max = ctx.props.rv_sat(&pressure, temperature, cell)?.value();
                if well_rates[o] > 0.0 {
                    rs = (well_rates[g] / well_rates[o]).min(rs_max);
                }
                if well_rates[g] > 0.0 {
                    rv = (well_rates[o] / well_rates[g]).min(rv_max);
                }
            }
            let pvt = PvtState {
                pressure,
                temperature,
                rs: ResEval::constant(rs),
                rv: ResEval::constant(rv),
                presence: PhasePresence::all(),
            };
            let mut inv_fvf = [1.0; NUM_PHASES];
            for phase in Phase::ALL {
                if usage.is_active(phase) {
                    inv_fvf[phase.index()] = ctx.props.inv_fvf(phase, &pvt, cell)?.value();
                }
            }
            fluids.push(ConnectionFluid {
                rates: cq.map(|q| sign * q.value()),
                inv_fvf,
                rs_max,
                rv_max,
                surface_densities: ctx.props.surface_densities(cell),
            });
        }

        let fallback = eval.cmix.map(|c| c.value());
        let densities = connection_densities(&fluids, &fallback, usage);
        let depths: Vec<f64> = self.perforations.iter().map(|p| p.depth()).collect();
        let diffs = connection_pressure_diffs(&depths, &densities, self.ref_depth, ctx.gravity);
        for ((perf, density), diff) in self.perforations.iter_mut().zip(densities).zip(diffs) {
            perf.density = density;
            perf.pressure_diff = diff;
        }
        Ok(())
    }

    fn assemble(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
        dt: f64,
    ) -> WellResult<WellContributions> {
        if self.state.mode == ControlMode::Shut {
            self.clear_rates();
            return Ok(WellContributions::default());
        }
        let name = self.config.name.as_str();
        let usage = &ctx.phase_usage;
        let eval = self.evaluate(ctx)?;
        let conns = self.connections(ctx, reservoir)?;
        let allow_crossflow = self.crossflow_allowed(&conns, eval.bhp);

        let inputs = RateInputs {
            well: name,
            well_type: self.config.well_type,
            usage,
            bhp: eval.bhp,
            cmix: &eval.cmix,
            allow_crossflow,
        };
        let perf_rates = self
            .perforations
            .iter()
            .zip(&conns)
            .map(|(perf, conn)| {
                perforation_rates(conn, perf.transmissibility(), perf.pressure_diff, &inputs)
            })
            .collect::<WellResult<Vec<_>>>()?;
        if perf_rates.iter().flatten().any(|q| !q.is_finite()) {
            return Err(WellError::NonFinite {
                well: name.to_string(),
                what: "perforation rate",
            });
        }

        let sign = self.config.well_type.sign();
        let well_slots = NUM_EQ..NUM_SLOTS;
        let q_well: [WellEval; NUM_PHASES] = std::array::from_fn(|p| {
            perf_rates
                .iter()
                .map(|cq| cq[p].keep_slots(well_slots.clone()))
                .sum::<WellEval>()
                * sign
        });

        let eq_inputs = self.equation_inputs(usage, &eval, dt);
        let rows = well_equations(&q_well, &eq_inputs);
        if rows.iter().any(|r| !r.is_finite()) {
            return Err(WellError::NonFinite {
                well: name.to_string(),
                what: "well residual",
            });
        }

        let mut d = Block::zeros();
        let mut res_well = Vector3::zeros();
        for (row, r) in rows.iter().enumerate() {
            res_well[row] = r.value();
            for wv in 0..NUM_WELL_EQ {
                d[(row, wv)] = r.derivative(NUM_EQ + wv);
            }
        }
        let inv_d = invert(&d).ok_or_else(|| WellError::SingularWellMatrix {
            well: name.to_string(),
        })?;

        let eta = self.config.efficiency_factor;
        let n = self.perforations.len();
        let mut b = Vec::with_capacity(n);
        let mut c = Vec::with_capacity(n);
        let mut sources = Vec::with_capacity(n);
        for (perf, cq) in self.perforations.iter().zip(&perf_rates) {
            let q_j = with_perforation_slots(&q_well, cq, sign);
            let rows_j = well_equations(&q_j, &eq_inputs);

            let mut b_j = Block::zeros();
            let mut c_j = Block::zeros();
            let mut jac = Block::zeros();
            let mut residual = Vector3::zeros();
            for row in 0..NUM_WELL_EQ {
                for pv in 0..NUM_EQ {
                    b_j[(row, pv)] = rows_j[row].derivative(pv);
                }
            }
            for eq in 0..NUM_EQ {
                residual[eq] = -eta * cq[eq].value();
                for wv in 0..NUM_WELL_EQ {
                    c_j[(eq, wv)] = -eta * cq[eq].derivative(NUM_EQ + wv);
                }
                for pv in 0..NUM_EQ {
                    jac[(eq, pv)] = -eta * cq[eq].derivative(pv);
                }
            }
            b.push(b_j);
            c.push(c_j);
            sources.push(CellSource {
                cell: perf.cell(),
                jacobian: jac,
                residual,
            });
        }

        self.blocks = WellBlocks {
            cells: self.cells(),
            b,
            c,
            d,
            inv_d,
            res_well,
        };
        let (coupling, residual_correction) = self.blocks.eliminate();

        let rates = q_well.map(|q| q.value());
        let producer = self.config.well_type.is_producer();
        self.state.thp = self
            .lift_curve(ctx)
            .map(|curve| curve.thp(&rates, eval.bhp.value(), producer));
        self.state.surface_rates = rates;
        self.state.perf_rates = perf_rates.iter().map(|cq| cq.map(|q| q.value())).collect();
        self.state.bhp = eval.bhp.value();

        Ok(WellContributions {
            sources,
            coupling,
            residual_correction,
        })
    }

    fn back_substitute(&mut self, ctx: &WellContext<'_>, dx: &[f64]) -> WellResult<WellUpdate> {
        if self.state.mode == ControlMode::Shut {
            return Ok(WellUpdate {
                converged: true,
                switched: None,
            });
        }
        let residual_converged = self.residual_norm() <= ctx.limits.residual_tol;
        let dy = self.blocks.well_update(dx);
        let old = self.state.unknowns;
        let limits = &ctx.limits;
        let usage = &ctx.phase_usage;

        let mut new = old;
        new[XVAR] = old[XVAR] - dy[XVAR];
        for (idx, phase) in [(WFRAC, Phase::Water), (GFRAC, Phase::Gas)] {
            new[idx] = if usage.is_active(phase) {
                let step = dy[idx].clamp(-limits.max_fraction_change, limits.max_fraction_change);
                old[idx] - step
            } else {
                0.0
            };
        }
        let f = fraction_values(&new, usage).map(|v| v.max(0.0));
        let sum: f64 = f.iter().sum();
        if sum > 0.0 {
            new[WFRAC] = f[Phase::Water.index()] / sum;
            new[GFRAC] = f[Phase::Gas.index()] / sum;
        } else {
            new[WFRAC] = 0.0;
            new[GFRAC] = 0.0;
        }
        if new.iter().any(|v| !v.is_finite()) {
            return Err(WellError::NonFinite {
                well: self.config.name.clone(),
                what: "well update",
            });
        }

        let implied = self.implied_values(ctx, &new);
        if let Some(switch) = check_constraints(
            self.state.mode,
            self.config.well_type,
            &self.config.controls,
            &implied,
        ) {
            self.apply_switch(switch);
            return Ok(WellUpdate {
                converged: false,
                switched: Some(switch),
            });
        }

        // limits are checked on the unclamped bhp, so the floor only guards
        // wells that stay in rate control
        if self.state.mode == ControlMode::Rate {
            new[XVAR] = new[XVAR].max(limits.bhp_floor);
        }
        self.state.unknowns = new;
        self.state.bhp = if self.state.mode == ControlMode::Rate {
            new[XVAR]
        } else {
            implied.bhp
        };
        Ok(WellUpdate {
            converged: residual_converged,
            switched: None,
        })
    }

    fn current_state(&self) -> &WellState {
        &self.state
    }

    fn residual_norm(&self) -> f64 {
        self.blocks.res_well.amax()
    }

    fn begin_timestep(&mut self, ctx: &WellContext<'_>, reservoir: &dyn ReservoirState) {
        let scheduled = self.config.controls.mode;
        if self.state.mode == ControlMode::Shut
            && self.config.status == WellStatus::Open
            && scheduled != ControlMode::Shut
        {
            let top = reservoir.cell_state(self.perforations[0].cell());
            self.state.bhp =
                top.pressure.value() + self.config.well_type.sign() * INITIAL_DRAWDOWN;
            info!(well = %self.config.name, mode = ?scheduled, "re-opening well");
            self.set_mode(scheduled);
        }
        self.state.fractions_at_step_start =
            fraction_values(&self.state.unknowns, &ctx.phase_usage);
    }

    fn shut(&mut self) {
        self.state.mode = ControlMode::Shut;
        self.clear_rates();
    }
}
