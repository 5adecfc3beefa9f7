//! Wellbore mixture densities and hydrostatic connection pressure drops.
//!
//! The densities are computed from the rates of the previous iterate, so the
//! pressure drops lag one Newton iteration behind the rates they produce.
//! There is no inner fixed-point loop.

use wf_pvt::{NUM_PHASES, Phase, PhaseUsage};

/// Per-perforation inputs for the density calculation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionFluid {
    /// Perforation surface rates `[water, oil, gas]`, positive in the well's
    /// normal flow direction
    pub rates: [f64; NUM_PHASES],
    /// Inverse formation-volume factors at wellbore conditions
    pub inv_fvf: [f64; NUM_PHASES],
    /// Saturated dissolved gas-oil ratio at wellbore conditions
    pub rs_max: f64,
    /// Saturated vaporized oil-gas ratio at wellbore conditions
    pub rv_max: f64,
    /// Surface densities `[water, oil, gas]` [kg/m³]
    pub surface_densities: [f64; NUM_PHASES],
}

/// Mixture density at each perforation.
///
/// The wellbore stream at a perforation is everything entering from that
/// perforation and the ones below it. `fallback_mix` (the well's surface
/// fractions) is used where that stream is zero.
pub fn connection_densities(
    fluids: &[ConnectionFluid],
    fallback_mix: &[f64; NUM_PHASES],
    usage: &PhaseUsage,
) -> Vec<f64> {
    let n = fluids.len();
    let mut cumulative = vec![[0.0; NUM_PHASES]; n];
    let mut running = [0.0; NUM_PHASES];
    for i in (0..n).rev() {
        for p in 0..NUM_PHASES {
            running[p] += fluids[i].rates[p];
        }
        cumulative[i] = running;
    }

    let (o, g) = (Phase::Oil.index(), Phase::Gas.index());
    fluids
        .iter()
        .zip(&cumulative)
        .map(|(fluid, q)| {
            let total: f64 = q.iter().sum();
            let mix = if total.abs() > 0.0 && total.is_finite() {
                q.map(|v| (v / total).max(0.0))
            } else {
                *fallback_mix
            };

            let mut x = mix;
            if usage.oil && usage.gas {
                let rs = if mix[o] > 0.0 {
                    (mix[g] / mix[o]).min(fluid.rs_max)
                } else {
                    0.0
                };
                let rv = if mix[g] > 0.0 {
                    (mix[o] / mix[g]).min(fluid.rv_max)
                } else {
                    0.0
                };
                let d = 1.0 - rs * rv;
                x[o] = (mix[o] - rv * mix[g]) / d;
                x[g] = (mix[g] - rs * mix[o]) / d;
            }

            let mut volume = 0.0;
            let mut mass = 0.0;
            for phase in Phase::ALL {
                if usage.is_active(phase) {
                    let i = phase.index();
                    volume += x[i] / fluid.inv_fvf[i];
                    mass += fluid.surface_densities[i] * mix[i];
                }
            }
            mass / volume
        })
        .collect()
}

/// Hydrostatic pressure difference between the reference depth and each
/// perforation (perforations ordered top to bottom).
///
/// ```text
/// cdp_0 = rho_0 g (z_0 - z_ref)
/// cdp_i = cdp_{i-1} + rho_{i-1} g (z_i - z_{i-1})
/// ```
pub fn connection_pressure_diffs(
    depths: &[f64],
    densities: &[f64],
    ref_depth: f64,
    gravity: f64,
) -> Vec<f64> {
    let mut cdp = Vec::with_capacity(depths.len());
    for i in 0..depths.len() {
        let value = if i == 0 {
            densities[0] * gravity * (depths[0] - ref_depth)
        } else {
            cdp[i - 1] + densities[i - 1] * gravity * (depths[i] - depths[i - 1])
        };
        cdp.push(value);
    }
    cdp
}
