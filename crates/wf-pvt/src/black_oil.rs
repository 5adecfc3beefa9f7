//! Analytic black-oil property table.
//!
//! Each phase follows an exponential pressure law around a reference point:
//!
//! ```text
//! b(p)  = exp(c (p - p_ref)) / B_ref
//! mu(p) = mu_ref exp(c_mu (p - p_ref))
//! ```
//!
//! Dissolved gas swells the oil (`b_o / (1 + swelling * Rs)`). Saturated
//! dissolution ratios are linear in pressure. Relative permeabilities are
//! normalized Corey curves. The table is isothermal; temperature is carried
//! through the state but does not enter any law.

use crate::error::{PvtError, PvtResult};
use crate::phase::Phase;
use crate::props::FluidProps;
use crate::state::PvtState;
use crate::{NUM_PHASES, ResEval};
use serde::{Deserialize, Serialize};

/// Pressure laws for one phase. All values SI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhasePvt {
    /// Reference pressure [Pa]
    pub ref_pressure: f64,
    /// Formation-volume factor at the reference pressure
    pub ref_fvf: f64,
    /// Compressibility of `b` [1/Pa]
    pub compressibility: f64,
    /// Viscosity at the reference pressure [Pa·s]
    pub viscosity: f64,
    /// Pressure sensitivity of viscosity [1/Pa]
    #[serde(default)]
    pub viscosibility: f64,
}

impl PhasePvt {
    pub fn inv_fvf(&self, pressure: &ResEval) -> ResEval {
        ((*pressure - self.ref_pressure) * self.compressibility).exp() / self.ref_fvf
    }

    pub fn viscosity(&self, pressure: &ResEval) -> ResEval {
        ((*pressure - self.ref_pressure) * self.viscosibility).exp() * self.viscosity
    }

    fn validate(&self, phase: Phase) -> PvtResult<()> {
        let ok = self.ref_pressure.is_finite()
            && self.ref_fvf.is_finite()
            && self.ref_fvf > 0.0
            && self.compressibility.is_finite()
            && self.viscosity.is_finite()
            && self.viscosity > 0.0
            && self.viscosibility.is_finite();
        if ok {
            Ok(())
        } else {
            Err(PvtError::InvalidTable {
                what: format!(
                    "{} pvt parameters must be finite with positive fvf and viscosity",
                    phase.name()
                ),
            })
        }
    }
}

/// Normalized Corey relative permeability curves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreyRelPerm {
    /// Connate water saturation
    pub swc: f64,
    /// Residual oil saturation
    pub sor: f64,
    /// Critical gas saturation
    pub sgc: f64,
    pub nw: f64,
    pub no: f64,
    pub ng: f64,
    pub krw_max: f64,
    pub kro_max: f64,
    pub krg_max: f64,
}

impl Default for CoreyRelPerm {
    fn default() -> Self {
        Self {
            swc: 0.0,
            sor: 0.0,
            sgc: 0.0,
            nw: 2.0,
            no: 2.0,
            ng: 2.0,
            krw_max: 1.0,
            kro_max: 1.0,
            krg_max: 1.0,
        }
    }
}

impl CoreyRelPerm {
    /// Relative permeabilities `[water, oil, gas]`.
    pub fn evaluate(&self, sw: &ResEval, sg: &ResEval) -> [ResEval; NUM_PHASES] {
        let so = 1.0 - *sw - *sg;
        let krw = corey((*sw - self.swc) / (1.0 - self.swc - self.sor), self.nw) * self.krw_max;
        let kro = corey((so - self.sor) / (1.0 - self.swc - self.sor), self.no) * self.kro_max;
        let krg = corey((*sg - self.sgc) / (1.0 - self.swc - self.sgc), self.ng) * self.krg_max;
        [krw, kro, krg]
    }

    fn validate(&self) -> PvtResult<()> {
        let endpoints = [self.swc, self.sor, self.sgc];
        if endpoints.iter().any(|s| !(0.0..1.0).contains(s))
            || self.swc + self.sor >= 1.0
            || self.swc + self.sgc >= 1.0
        {
            return Err(PvtError::InvalidTable {
                what: "corey endpoint saturations must leave a mobile range".to_string(),
            });
        }
        if [self.nw, self.no, self.ng].iter().any(|n| !(*n >= 1.0)) {
            return Err(PvtError::InvalidTable {
                what: "corey exponents must be at least 1".to_string(),
            });
        }
        if [self.krw_max, self.kro_max, self.krg_max]
            .iter()
            .any(|k| !(0.0..=1.0).contains(k))
        {
            return Err(PvtError::InvalidTable {
                what: "corey end-point relative permeabilities must lie in [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

fn corey(normalized: ResEval, exponent: f64) -> ResEval {
    normalized.max_value(0.0).min_value(1.0).powf(exponent)
}

/// Analytic black-oil fluid description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackOilTable {
    /// Surface densities `[water, oil, gas]` [kg/m³]
    pub surface_densities: [f64; NUM_PHASES],
    pub water: PhasePvt,
    pub oil: PhasePvt,
    pub gas: PhasePvt,
    /// Saturated Rs per pascal [sm³/sm³/Pa]
    pub rs_slope: f64,
    /// Saturated Rv per pascal [sm³/sm³/Pa]
    pub rv_slope: f64,
    /// Oil FVF increase per unit Rs
    pub oil_swelling: f64,
    pub rel_perm: CoreyRelPerm,
}

impl Default for BlackOilTable {
    fn default() -> Self {
        Self {
            surface_densities: [1000.0, 800.0, 0.9],
            water: PhasePvt {
                ref_pressure: 2.0e7,
                ref_fvf: 1.01,
                compressibility: 4.5e-10,
                viscosity: 5.0e-4,
                viscosibility: 0.0,
            },
            oil: PhasePvt {
                ref_pressure: 2.0e7,
                ref_fvf: 1.2,
                compressibility: 1.5e-9,
                viscosity: 2.0e-3,
                viscosibility: 0.0,
            },
            gas: PhasePvt {
                ref_pressure: 2.0e7,
                ref_fvf: 5.0e-3,
                compressibility: 4.0e-8,
                viscosity: 2.0e-5,
                viscosibility: 0.0,
            },
            rs_slope: 5.0e-6,
            rv_slope: 0.0,
            oil_swelling: 3.0e-3,
            rel_perm: CoreyRelPerm::default(),
        }
    }
}

impl BlackOilTable {
    pub fn validate(&self) -> PvtResult<()> {
        if self.surface_densities.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(PvtError::InvalidTable {
                what: "surface densities must be positive".to_string(),
            });
        }
        self.water.validate(Phase::Water)?;
        self.oil.validate(Phase::Oil)?;
        self.gas.validate(Phase::Gas)?;
        for (name, v) in [
            ("rs_slope", self.rs_slope),
            ("rv_slope", self.rv_slope),
            ("oil_swelling", self.oil_swelling),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(PvtError::InvalidTable {
                    what: format!("{name} must be non-negative"),
                });
            }
        }
        self.rel_perm.validate()
    }

    fn phase(&self, phase: Phase) -> &PhasePvt {
        match phase {
            Phase::Water => &self.water,
            Phase::Oil => &self.oil,
            Phase::Gas => &self.gas,
        }
    }
}

fn check_pressure(pressure: &ResEval) -> PvtResult<()> {
    if pressure.value() > 0.0 && pressure.is_finite() {
        Ok(())
    } else {
        Err(PvtError::NonPhysical { what: "pressure" })
    }
}

impl FluidProps for BlackOilTable {
    fn name(&self) -> &str {
        "black-oil"
    }

    fn surface_densities(&self, _cell: usize) -> [f64; NUM_PHASES] {
        self.surface_densities
    }

    fn viscosity(&self, phase: Phase, state: &PvtState, _cell: usize) -> PvtResult<ResEval> {
        check_pressure(&state.pressure)?;
        Ok(self.phase(phase).viscosity(&state.pressure))
    }

    fn inv_fvf(&self, phase: Phase, state: &PvtState, _cell: usize) -> PvtResult<ResEval> {
        check_pressure(&state.pressure)?;
        let b = self.phase(phase).inv_fvf(&state.pressure);
        match phase {
            Phase::Oil => {
                if state.rs.value() < 0.0 {
                    return Err(PvtError::NonPhysical { what: "rs" });
                }
                Ok(b / (1.0 + state.rs * self.oil_swelling))
            }
            Phase::Water | Phase::Gas => Ok(b),
        }
    }

    fn rs_sat(&self, pressure: &ResEval, _temperature: f64, _cell: usize) -> PvtResult<ResEval> {
        check_pressure(pressure)?;
        Ok(*pressure * self.rs_slope)
    }

    fn rv_sat(&self, pressure: &ResEval, _temperature: f64, _cell: usize) -> PvtResult<ResEval> {
        check_pressure(pressure)?;
        Ok(*pressure * self.rv_slope)
    }

    fn rel_perm(
        &self,
        sw: &ResEval,
        sg: &ResEval,
        _cell: usize,
    ) -> PvtResult<[ResEval; NUM_PHASES]> {
        if !(sw.is_finite() && sg.is_finite()) {
            return Err(PvtError::NonPhysical { what: "saturation" });
        }
        Ok(self.rel_perm.evaluate(sw, sg))
    }
}
