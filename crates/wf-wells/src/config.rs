//! Well schedule configuration.
//!
//! All quantities are SI: pressures in Pa, surface rates in m³/s, depths in m.

use crate::error::{WellError, WellResult};
use serde::{Deserialize, Serialize};
use wf_pvt::{NUM_PHASES, Phase, PhaseUsage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellType {
    Producer,
    Injector,
}

impl WellType {
    /// Sign turning perforation rates (positive into the reservoir) into
    /// well surface rates that are positive in normal operation.
    pub fn sign(self) -> f64 {
        match self {
            WellType::Producer => -1.0,
            WellType::Injector => 1.0,
        }
    }

    pub fn is_producer(self) -> bool {
        self == WellType::Producer
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Rate,
    Bhp,
    Thp,
    Shut,
}

impl ControlMode {
    /// Modes where the bottom-hole pressure is prescribed (directly or via
    /// the lift curve) and the control variable is the total surface rate.
    pub fn is_pressure_controlled(self) -> bool {
        matches!(self, ControlMode::Bhp | ControlMode::Thp)
    }
}

/// Phases summed by a rate target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    #[default]
    Total,
    Oil,
    Water,
    Gas,
    Liquid,
}

impl RateKind {
    pub fn phases(self) -> &'static [Phase] {
        match self {
            RateKind::Total => &Phase::ALL,
            RateKind::Oil => &[Phase::Oil],
            RateKind::Water => &[Phase::Water],
            RateKind::Gas => &[Phase::Gas],
            RateKind::Liquid => &[Phase::Water, Phase::Oil],
        }
    }

    /// Sum of the selected phase entries.
    pub fn select<T>(self, rates: &[T; NUM_PHASES]) -> T
    where
        T: Copy + std::iter::Sum<T>,
    {
        self.phases().iter().map(|p| rates[p.index()]).sum()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellStatus {
    #[default]
    Open,
    Shut,
}

/// Control targets and limits. Each value is the target while its mode is
/// active and a limit otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellControls {
    /// Scheduled control mode.
    pub mode: ControlMode,
    #[serde(default)]
    pub rate_kind: RateKind,
    /// Surface rate [m³/s]; upper bound for both well types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_target: Option<f64>,
    /// Bottom-hole pressure [Pa]; lower bound for producers, upper bound for
    /// injectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bhp_limit: Option<f64>,
    /// Tubing-head pressure [Pa]; same bound direction as `bhp_limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thp_limit: Option<f64>,
    /// Lift-curve table used for tubing-head pressure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfp_table: Option<u32>,
    /// Total surface rate [m³/s] below which a pressure-controlled well is shut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_economic_rate: Option<f64>,
}

impl Default for WellControls {
    fn default() -> Self {
        Self {
            mode: ControlMode::Bhp,
            rate_kind: RateKind::Total,
            rate_target: None,
            bhp_limit: None,
            thp_limit: None,
            vfp_table: None,
            min_economic_rate: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerforationConfig {
    pub cell: usize,
    /// Connection transmissibility factor [m³]
    pub transmissibility: f64,
    /// Perforation depth [m]
    pub depth: f64,
}

impl PerforationConfig {
    pub fn new(cell: usize, transmissibility: f64, depth: f64) -> Self {
        Self {
            cell,
            transmissibility,
            depth,
        }
    }
}

/// Iteration safeguards applied when updating well unknowns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateLimits {
    /// Largest change of a surface fraction per Newton iteration.
    pub max_fraction_change: f64,
    /// Bottom-hole pressure floor [Pa].
    pub bhp_floor: f64,
    /// Max-norm of the well residual [m³/s] below which the well counts as
    /// converged.
    pub residual_tol: f64,
}

impl Default for UpdateLimits {
    fn default() -> Self {
        Self {
            max_fraction_change: 0.2,
            bhp_floor: 1.0e5,
            residual_tol: 1.0e-9,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellConfig {
    pub name: String,
    pub well_type: WellType,
    #[serde(default)]
    pub status: WellStatus,
    pub controls: WellControls,
    /// Ordered top to bottom on construction.
    pub perforations: Vec<PerforationConfig>,
    /// Depth the bottom-hole pressure refers to [m]; defaults to the top perforation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_depth: Option<f64>,
    #[serde(default = "default_efficiency")]
    pub efficiency_factor: f64,
    #[serde(default = "default_true")]
    pub allow_crossflow: bool,
    /// Injected surface fractions `[water, oil, gas]` (injectors only).
    #[serde(default)]
    pub injected_fractions: [f64; NUM_PHASES],
    /// Wellbore storage volume [m³].
    #[serde(default = "default_wellbore_volume")]
    pub wellbore_volume: f64,
}

fn default_efficiency() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_wellbore_volume() -> f64 {
    0.01
}

impl WellConfig {
    pub fn producer(name: impl Into<String>, perforations: Vec<PerforationConfig>) -> Self {
        Self {
            name: name.into(),
            well_type: WellType::Producer,
            status: WellStatus::Open,
            controls: WellControls::default(),
            perforations,
            ref_depth: None,
            efficiency_factor: default_efficiency(),
            allow_crossflow: true,
            injected_fractions: [0.0; NUM_PHASES],
            wellbore_volume: default_wellbore_volume(),
        }
    }

    pub fn injector(
        name: impl Into<String>,
        perforations: Vec<PerforationConfig>,
        injected: Phase,
    ) -> Self {
        let mut injected_fractions = [0.0; NUM_PHASES];
        injected_fractions[injected.index()] = 1.0;
        Self {
            well_type: WellType::Injector,
            injected_fractions,
            ..Self::producer(name, perforations)
        }
    }

    /// Check the configuration against the reservoir and active phases.
    ///
    /// `has_table` reports whether a lift-curve table id is available.
    pub fn validate(
        &self,
        num_cells: usize,
        usage: &PhaseUsage,
        has_table: impl Fn(u32) -> bool,
    ) -> WellResult<()> {
        let name = self.name.as_str();
        if self.perforations.is_empty() {
            return Err(WellError::invalid(name, "empty perforation list"));
        }
        for perf in &self.perforations {
            if perf.cell >= num_cells {
                return Err(WellError::invalid(
                    name,
                    format!("perforation cell {} out of range ({num_cells} cells)", perf.cell),
                ));
            }
            if !(perf.transmissibility.is_finite() && perf.transmissibility > 0.0) {
                return Err(WellError::invalid(
                    name,
                    format!("non-positive transmissibility at cell {}", perf.cell),
                ));
            }
            if !perf.depth.is_finite() {
                return Err(WellError::invalid(name, "non-finite perforation depth"));
            }
        }
        if !(self.efficiency_factor.is_finite() && self.efficiency_factor > 0.0) {
            return Err(WellError::invalid(name, "efficiency factor must be positive"));
        }
        if !(self.wellbore_volume.is_finite() && self.wellbore_volume >= 0.0) {
            return Err(WellError::invalid(name, "wellbore volume must be non-negative"));
        }

        let c = &self.controls;
        if let [phase] = c.rate_kind.phases() {
            if !usage.is_active(*phase) {
                return Err(WellError::invalid(
                    name,
                    format!("rate control on inactive phase {}", phase.name()),
                ));
            }
        }
        for (what, v) in [
            ("rate target", c.rate_target),
            ("bhp limit", c.bhp_limit),
            ("thp limit", c.thp_limit),
            ("minimum economic rate", c.min_economic_rate),
        ] {
            if v.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
                return Err(WellError::invalid(name, format!("{what} must be non-negative")));
            }
        }
        let missing = match c.mode {
            ControlMode::Rate => c.rate_target.is_none(),
            ControlMode::Bhp => c.bhp_limit.is_none(),
            ControlMode::Thp => c.thp_limit.is_none(),
            ControlMode::Shut => false,
        };
        if missing {
            return Err(WellError::invalid(
                name,
                format!("no target for initial control mode {:?}", c.mode),
            ));
        }
        if self.well_type == WellType::Injector
            && c.rate_target.is_some()
            && c.bhp_limit.is_none()
        {
            return Err(WellError::invalid(
                name,
                "a rate-controlled injector needs a maximum bhp",
            ));
        }
        if c.thp_limit.is_some() {
            match c.vfp_table {
                Some(id) if has_table(id) => {}
                Some(id) => {
                    return Err(WellError::invalid(name, format!("unknown lift table {id}")));
                }
                None => {
                    return Err(WellError::invalid(
                        name,
                        "tubing-head pressure control needs a lift table",
                    ));
                }
            }
        }

        if self.well_type == WellType::Injector {
            let sum: f64 = self.injected_fractions.iter().sum();
            if self.injected_fractions.iter().any(|f| !(f.is_finite() && *f >= 0.0))
                || (sum - 1.0).abs() > 1e-9
            {
                return Err(WellError::invalid(
                    name,
                    "injected fractions must be non-negative and sum to one",
                ));
            }
            for phase in Phase::ALL {
                if self.injected_fractions[phase.index()] > 0.0 && !usage.is_active(phase) {
                    return Err(WellError::invalid(
                        name,
                        format!("injected phase {} is not active", phase.name()),
                    ));
                }
            }
        }
        Ok(())
    }
}
