//! Simulation runner with timestep cutback and per-step reports.

use crate::error::{SimError, SimResult};
use crate::linear::{DenseLu, LinearSolver};
use crate::newton::{NewtonConfig, solve_timestep};
use crate::reservoir::ReservoirModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use wf_core::constants::G0_MPS2;
use wf_core::{Tolerances, nearly_equal};
use wf_pvt::{FluidProps, NUM_PHASES};
use wf_wells::{
    ControlMode, StandardWell, UpdateLimits, VfpTables, WellConfig, WellContext, WellModel,
};

/// Options for simulation runs. Times are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Target time step
    pub dt: f64,
    /// Simulated duration of one `run`
    pub t_end: f64,
    /// Maximum number of accepted steps (safety limit)
    pub max_steps: usize,
    /// Smallest step a cutback may produce
    pub min_dt: f64,
    /// Cutbacks allowed for a single step
    pub max_retries: usize,
    /// Step reduction factor applied on a retryable failure
    pub cutback_factor: f64,
    /// Step growth factor after a successful step, capped at `dt`
    pub grow_factor: f64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 86_400.0,
            t_end: 30.0 * 86_400.0,
            max_steps: 10_000,
            min_dt: 60.0,
            max_retries: 8,
            cutback_factor: 0.5,
            grow_factor: 2.0,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !(self.t_end >= 0.0 && self.t_end.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !(self.min_dt > 0.0 && self.min_dt <= self.dt) {
            return Err(SimError::InvalidArg {
                what: "min_dt must lie in (0, dt]",
            });
        }
        if !(self.cutback_factor > 0.0 && self.cutback_factor < 1.0) {
            return Err(SimError::InvalidArg {
                what: "cutback_factor must lie in (0, 1)",
            });
        }
        if self.grow_factor < 1.0 {
            return Err(SimError::InvalidArg {
                what: "grow_factor must be at least 1",
            });
        }
        Ok(())
    }
}

/// Well quantities at the end of an accepted step (SI units).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WellReport {
    pub name: String,
    pub mode: ControlMode,
    pub bhp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thp: Option<f64>,
    /// Surface rates `[water, oil, gas]` [m³/s], positive in normal operation
    pub surface_rates: [f64; NUM_PHASES],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    pub step: usize,
    /// Time at the end of the step [s]
    pub time: f64,
    pub dt: f64,
    pub newton_iterations: usize,
    /// Cutbacks before the step was accepted
    pub retries: usize,
    pub control_switches: usize,
    /// Pore-volume weighted average pressure [Pa]
    pub average_pressure: f64,
    pub wells: Vec<WellReport>,
}

/// A reservoir model, its wells and the shared well context.
pub struct Simulator<R, W = StandardWell> {
    reservoir: R,
    wells: Vec<W>,
    props: Arc<dyn FluidProps>,
    vfp: VfpTables,
    gravity: f64,
    limits: UpdateLimits,
    newton: NewtonConfig,
    solver: Box<dyn LinearSolver>,
    time: f64,
}

fn well_context<'a>(
    props: &'a Arc<dyn FluidProps>,
    vfp: &'a VfpTables,
    reservoir: &impl ReservoirModel,
    gravity: f64,
    limits: UpdateLimits,
) -> WellContext<'a> {
    WellContext::new(props.as_ref(), reservoir.phase_usage(), vfp)
        .with_gravity(gravity)
        .with_limits(limits)
}

impl<R, W> Simulator<R, W>
where
    R: ReservoirModel,
    W: WellModel + Clone,
{
    pub fn new(reservoir: R, props: Arc<dyn FluidProps>, vfp: VfpTables) -> Self {
        Self {
            reservoir,
            wells: Vec::new(),
            props,
            vfp,
            gravity: G0_MPS2,
            limits: UpdateLimits::default(),
            newton: NewtonConfig::default(),
            solver: Box::new(DenseLu),
            time: 0.0,
        }
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_limits(mut self, limits: UpdateLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    pub fn with_solver(mut self, solver: Box<dyn LinearSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn push_well(&mut self, well: W) {
        self.wells.push(well);
    }

    pub fn reservoir(&self) -> &R {
        &self.reservoir
    }

    pub fn wells(&self) -> &[W] {
        &self.wells
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    fn report(
        &self,
        step: usize,
        dt: f64,
        retries: usize,
        iterations: usize,
        switches: usize,
    ) -> StepReport {
        StepReport {
            step,
            time: self.time,
            dt,
            newton_iterations: iterations,
            retries,
            control_switches: switches,
            average_pressure: self.reservoir.average_pressure(),
            wells: self
                .wells
                .iter()
                .map(|w| {
                    let s = w.current_state();
                    WellReport {
                        name: s.name.clone(),
                        mode: s.mode,
                        bhp: s.bhp,
                        thp: s.thp,
                        surface_rates: s.surface_rates,
                    }
                })
                .collect(),
        }
    }

    /// Advance until `opts.t_end`, cutting the step back on retryable
    /// failures.
    pub fn run(&mut self, opts: &SimOptions) -> SimResult<Vec<StepReport>> {
        opts.validate()?;
        let t_end = self.time + opts.t_end;
        let mut dt = opts.dt;
        let mut reports = Vec::new();

        let tol = Tolerances::default();
        while self.time < t_end
            && !nearly_equal(self.time, t_end, tol)
            && reports.len() < opts.max_steps
        {
            let mut dt_try = dt.min(t_end - self.time);
            let mut retries = 0;
            let wells_at_step_start = self.wells.clone();

            let outcome = loop {
                let ctx = well_context(
                    &self.props,
                    &self.vfp,
                    &self.reservoir,
                    self.gravity,
                    self.limits,
                );
                for well in &mut self.wells {
                    well.begin_timestep(&ctx, &self.reservoir);
                }
                let result = solve_timestep(
                    &mut self.reservoir,
                    &mut self.wells,
                    &ctx,
                    self.solver.as_ref(),
                    &self.newton,
                    dt_try,
                );
                match result {
                    Ok(outcome) => break outcome,
                    Err(e) if e.is_retryable() => {
                        self.reservoir.reset_timestep();
                        self.wells.clone_from(&wells_at_step_start);
                        retries += 1;
                        let next = dt_try * opts.cutback_factor;
                        if retries > opts.max_retries || next < opts.min_dt {
                            return Err(SimError::ConvergenceFailed {
                                what: format!(
                                    "step at t = {:.1} s failed after {retries} attempts: {e}",
                                    self.time
                                ),
                            });
                        }
                        warn!(
                            time = self.time,
                            dt = dt_try,
                            next,
                            error = %e,
                            "cutting back timestep"
                        );
                        dt_try = next;
                    }
                    Err(e) => return Err(e),
                }
            };

            self.reservoir.end_timestep();
            self.time += dt_try;
            let report = self.report(
                reports.len() + 1,
                dt_try,
                retries,
                outcome.iterations,
                outcome.control_switches,
            );
            info!(
                step = report.step,
                time = self.time,
                dt = dt_try,
                iterations = outcome.iterations,
                "step accepted"
            );
            reports.push(report);
            dt = (dt_try * opts.grow_factor).min(opts.dt);
        }
        Ok(reports)
    }
}

impl<R: ReservoirModel> Simulator<R, StandardWell> {
    /// Build a [`StandardWell`] from `config` against the current reservoir
    /// state and add it.
    pub fn add_well(&mut self, config: WellConfig) -> SimResult<()> {
        let ctx = well_context(
            &self.props,
            &self.vfp,
            &self.reservoir,
            self.gravity,
            self.limits,
        );
        let well = StandardWell::new(config, &ctx, &self.reservoir)?;
        self.wells.push(well);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.dt, 86_400.0);
        assert_eq!(opts.cutback_factor, 0.5);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn sim_options_invalid() {
        let opts = SimOptions {
            dt: 0.0,
            ..SimOptions::default()
        };
        assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
        let opts = SimOptions {
            cutback_factor: 1.0,
            ..SimOptions::default()
        };
        assert!(opts.validate().is_err());
        let opts = SimOptions {
            min_dt: 2.0 * 86_400.0,
            ..SimOptions::default()
        };
        assert!(opts.validate().is_err());
    }
}
