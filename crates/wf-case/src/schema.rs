//! Case file schema (field units).

use serde::{Deserialize, Serialize};
use wf_pvt::{BlackOilTable, Phase, PhaseUsage};
use wf_sim::NewtonConfig;
use wf_wells::{ControlMode, RateKind, WellStatus, WellType};

pub const LATEST_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub phases: PhaseUsage,
    /// Black-oil tables in SI units.
    #[serde(default)]
    pub fluid: BlackOilTable,
    pub reservoir: ReservoirDef,
    #[serde(default)]
    pub wells: Vec<WellDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lift_curves: Vec<LiftCurveDef>,
    #[serde(default)]
    pub well_limits: WellLimitsDef,
    #[serde(default)]
    pub newton: NewtonConfig,
    #[serde(default)]
    pub schedule: ScheduleDef,
    /// Gravitational acceleration [m/s²]; standard gravity when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<f64>,
}

fn default_version() -> u32 {
    LATEST_VERSION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservoirDef {
    #[serde(default = "default_temperature_c")]
    pub temperature_c: f64,
    pub cells: Vec<CellDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
    #[serde(default = "default_saturation_chop")]
    pub max_saturation_change: f64,
}

fn default_temperature_c() -> f64 {
    76.85
}

fn default_saturation_chop() -> f64 {
    0.2
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellDef {
    pub pore_volume_m3: f64,
    #[serde(default)]
    pub depth_m: f64,
    pub pressure_bar: f64,
    #[serde(default)]
    pub sw: f64,
    #[serde(default)]
    pub sg: f64,
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub cells: [usize; 2],
    /// Transmissibility [m³]
    pub transmissibility: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellDef {
    pub name: String,
    pub kind: WellType,
    #[serde(default)]
    pub status: WellStatus,
    /// Phase injected by an injector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injected_phase: Option<Phase>,
    pub control: ControlDef,
    pub perforations: Vec<PerforationDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_depth_m: Option<f64>,
    #[serde(default = "default_one")]
    pub efficiency_factor: f64,
    #[serde(default = "default_true")]
    pub allow_crossflow: bool,
    #[serde(default = "default_wellbore_volume")]
    pub wellbore_volume_m3: f64,
}

fn default_one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_wellbore_volume() -> f64 {
    0.01
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlDef {
    pub mode: ControlMode,
    #[serde(default)]
    pub rate_kind: RateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_m3_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bhp_bar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thp_bar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lift_curve: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_economic_rate_m3_per_day: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerforationDef {
    pub cell: usize,
    /// Connection transmissibility factor [m³]
    pub transmissibility: f64,
    pub depth_m: f64,
}

/// `bhp = thp + head ± friction q|q|` with `q` in m³/day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiftCurveDef {
    pub id: u32,
    pub head_bar: f64,
    /// Friction [bar/(m³/day)²]
    #[serde(default)]
    pub friction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellLimitsDef {
    pub max_fraction_change: f64,
    pub bhp_floor_bar: f64,
    pub residual_tol_m3_per_day: f64,
}

impl Default for WellLimitsDef {
    fn default() -> Self {
        Self {
            max_fraction_change: 0.2,
            bhp_floor_bar: 1.0,
            residual_tol_m3_per_day: 1.0e-4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleDef {
    pub dt_days: f64,
    pub t_end_days: f64,
    pub min_dt_days: f64,
    pub max_steps: usize,
    pub max_retries: usize,
    pub cutback_factor: f64,
    pub grow_factor: f64,
}

impl Default for ScheduleDef {
    fn default() -> Self {
        Self {
            dt_days: 1.0,
            t_end_days: 30.0,
            min_dt_days: 1.0e-3,
            max_steps: 10_000,
            max_retries: 8,
            cutback_factor: 0.5,
            grow_factor: 2.0,
        }
    }
}
