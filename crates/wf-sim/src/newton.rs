//! Newton iteration for one timestep of the coupled reservoir-well system.

use crate::error::{SimError, SimResult};
use crate::linear::LinearSolver;
use crate::reservoir::ReservoirModel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wf_core::max_abs;
use wf_wells::{ControlMode, WellContext, WellContributions, WellError, WellModel};

/// Newton solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Maximum iterations per timestep
    pub max_iterations: usize,
    /// Tolerance on the reservoir norm `max |R| dt / PV`
    pub reservoir_tol: f64,
    /// Control switches one well may make within a step before the step is
    /// cut back
    pub max_control_switches: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            reservoir_tol: 1e-6,
            max_control_switches: 4,
        }
    }
}

/// Result of a converged timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NewtonOutcome {
    pub iterations: usize,
    pub reservoir_norm: f64,
    pub control_switches: usize,
}

/// Assemble every open well in parallel.
///
/// A well whose local matrix turns out singular is shut for the rest of the
/// step and contributes nothing.
fn assemble_wells<W: WellModel>(
    wells: &mut [W],
    ctx: &WellContext<'_>,
    reservoir: &dyn wf_wells::ReservoirState,
    dt: f64,
) -> SimResult<Vec<WellContributions>> {
    let results: Vec<_> = wells
        .par_iter_mut()
        .map(|well| {
            well.update_connection_pressures(ctx, reservoir)?;
            well.assemble(ctx, reservoir, dt)
        })
        .collect();

    let mut contributions = Vec::with_capacity(results.len());
    for (well, result) in wells.iter_mut().zip(results) {
        match result {
            Ok(c) => contributions.push(c),
            Err(WellError::SingularWellMatrix { well: name }) => {
                warn!(well = %name, "singular well matrix, shutting well");
                well.shut();
                contributions.push(well.assemble(ctx, reservoir, dt)?);
            }
            Err(e) if e.is_retryable() => {
                return Err(SimError::Retryable {
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(contributions)
}

/// Iterate one timestep of length `dt` to convergence.
///
/// Per iteration: connection pressures, parallel well assembly, serialized
/// scatter into the reservoir system, convergence check, linear solve,
/// reservoir update and per-well back-substitution. Failures a shorter step
/// may cure come back as [`SimError::Retryable`].
pub fn solve_timestep<R, W>(
    reservoir: &mut R,
    wells: &mut [W],
    ctx: &WellContext<'_>,
    solver: &dyn LinearSolver,
    config: &NewtonConfig,
    dt: f64,
) -> SimResult<NewtonOutcome>
where
    R: ReservoirModel,
    W: WellModel,
{
    let mut switches = vec![0usize; wells.len()];
    let mut reservoir_norm = f64::INFINITY;

    for iter in 0..config.max_iterations {
        let mut system = reservoir.assemble(dt)?;
        let contributions = assemble_wells(wells, ctx, &*reservoir, dt)?;
        for c in &contributions {
            system.scatter(c);
        }
        reservoir.apply_constraints(&mut system);

        reservoir_norm = reservoir.convergence_norm(&system, dt);
        let well_norms: Vec<f64> = wells
            .iter()
            .filter(|w| w.current_state().mode != ControlMode::Shut)
            .map(|w| w.residual_norm())
            .collect();
        let well_norm = max_abs(&well_norms);
        debug!(iter, reservoir_norm, well_norm, "newton iteration");

        if !reservoir_norm.is_finite() || !well_norm.is_finite() {
            return Err(SimError::Retryable {
                message: format!("non-finite residual at iteration {iter}"),
            });
        }
        if reservoir_norm <= config.reservoir_tol && well_norm <= ctx.limits.residual_tol {
            return Ok(NewtonOutcome {
                iterations: iter,
                reservoir_norm,
                control_switches: switches.iter().sum(),
            });
        }

        let dx = solver.solve(&system)?;
        reservoir.apply_update(&dx)?;

        for (well, count) in wells.iter_mut().zip(switches.iter_mut()) {
            let update = match well.back_substitute(ctx, dx.as_slice()) {
                Ok(update) => update,
                Err(e) if e.is_retryable() => {
                    return Err(SimError::Retryable {
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            if update.switched.is_some() {
                *count += 1;
                if *count > config.max_control_switches {
                    return Err(SimError::Retryable {
                        message: format!(
                            "well {} switched control more than {} times",
                            well.name(),
                            config.max_control_switches
                        ),
                    });
                }
            }
        }
    }

    Err(SimError::Retryable {
        message: format!(
            "no convergence in {} iterations, reservoir norm = {reservoir_norm:e}",
            config.max_iterations
        ),
    })
}
