//! Conversion of a validated case to SI models.

use crate::CaseResult;
use crate::schema::{Case, CellDef, ScheduleDef, WellDef, WellLimitsDef};
use crate::validate::validate_case;
use std::sync::Arc;
use tracing::info;
use wf_core::{bar, days, degc, m, m3_per_day};
use wf_pvt::{FluidProps, NUM_PHASES};
use wf_sim::{
    SimError, SimOptions, Simulator, TankCell, TankConnection, TankReservoir, TankReservoirConfig,
};
use wf_wells::{
    LinearLiftCurve, PerforationConfig, UpdateLimits, VfpTables, WellConfig, WellControls,
};

fn rate_si(v: f64) -> f64 {
    m3_per_day(v).value
}

fn pressure_si(v: f64) -> f64 {
    bar(v).value
}

impl CellDef {
    pub fn to_tank_cell(&self) -> TankCell {
        TankCell {
            pore_volume: self.pore_volume_m3,
            depth: m(self.depth_m).value,
            pressure: pressure_si(self.pressure_bar),
            sw: self.sw,
            sg: self.sg,
            fixed: self.fixed,
        }
    }
}

impl WellDef {
    pub fn to_config(&self) -> WellConfig {
        let c = &self.control;
        let controls = WellControls {
            mode: c.mode,
            rate_kind: c.rate_kind,
            rate_target: c.rate_m3_per_day.map(rate_si),
            bhp_limit: c.bhp_bar.map(pressure_si),
            thp_limit: c.thp_bar.map(pressure_si),
            vfp_table: c.lift_curve,
            min_economic_rate: c.min_economic_rate_m3_per_day.map(rate_si),
        };
        let mut injected_fractions = [0.0; NUM_PHASES];
        if let Some(phase) = self.injected_phase {
            injected_fractions[phase.index()] = 1.0;
        }
        WellConfig {
            name: self.name.clone(),
            well_type: self.kind,
            status: self.status,
            controls,
            perforations: self
                .perforations
                .iter()
                .map(|p| PerforationConfig::new(p.cell, p.transmissibility, m(p.depth_m).value))
                .collect(),
            ref_depth: self.ref_depth_m.map(|d| m(d).value),
            efficiency_factor: self.efficiency_factor,
            allow_crossflow: self.allow_crossflow,
            injected_fractions,
            wellbore_volume: self.wellbore_volume_m3,
        }
    }
}

impl WellLimitsDef {
    pub fn to_limits(&self) -> UpdateLimits {
        UpdateLimits {
            max_fraction_change: self.max_fraction_change,
            bhp_floor: pressure_si(self.bhp_floor_bar),
            residual_tol: rate_si(self.residual_tol_m3_per_day),
        }
    }
}

impl ScheduleDef {
    pub fn to_options(&self) -> SimOptions {
        SimOptions {
            dt: days(self.dt_days).value,
            t_end: days(self.t_end_days).value,
            max_steps: self.max_steps,
            min_dt: days(self.min_dt_days).value,
            max_retries: self.max_retries,
            cutback_factor: self.cutback_factor,
            grow_factor: self.grow_factor,
        }
    }
}

impl Case {
    pub fn lift_tables(&self) -> VfpTables {
        // friction is given per (m³/day)², the curve works in m³/s
        let per_day = rate_si(1.0);
        let mut tables = VfpTables::new();
        for curve in &self.lift_curves {
            tables.insert(
                curve.id,
                LinearLiftCurve {
                    head: pressure_si(curve.head_bar),
                    friction: pressure_si(curve.friction) / (per_day * per_day),
                },
            );
        }
        tables
    }

    pub fn reservoir_config(&self) -> TankReservoirConfig {
        let r = &self.reservoir;
        TankReservoirConfig {
            cells: r.cells.iter().map(CellDef::to_tank_cell).collect(),
            connections: r
                .connections
                .iter()
                .map(|c| TankConnection {
                    cells: c.cells,
                    transmissibility: c.transmissibility,
                })
                .collect(),
            temperature: degc(r.temperature_c).value,
            max_saturation_change: r.max_saturation_change,
            min_pressure: pressure_si(self.well_limits.bhp_floor_bar),
        }
    }

    /// Build the reservoir and every well, checking physical consistency.
    pub fn build(&self) -> CaseResult<Simulator<TankReservoir>> {
        validate_case(self)?;
        self.fluid.validate().map_err(SimError::from)?;
        let props: Arc<dyn FluidProps> = Arc::new(self.fluid.clone());
        let reservoir = TankReservoir::new(self.reservoir_config(), props.clone(), self.phases)?;

        let mut sim: Simulator<TankReservoir> = Simulator::new(reservoir, props, self.lift_tables())
            .with_limits(self.well_limits.to_limits())
            .with_newton(self.newton.clone());
        if let Some(gravity) = self.gravity {
            sim = sim.with_gravity(gravity);
        }
        for well in &self.wells {
            sim.add_well(well.to_config())?;
        }
        info!(
            case = %self.name,
            cells = self.reservoir.cells.len(),
            wells = self.wells.len(),
            "case built"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_yaml_str;
    use wf_wells::{ControlMode, WellEval, WellModel};

    const CASE: &str = r#"
name: build
phases: { water: true, oil: true, gas: false }
reservoir:
  temperature_c: 80
  cells:
    - { pore_volume_m3: 1.0e6, depth_m: 1000, pressure_bar: 200, sw: 0.2 }
    - { pore_volume_m3: 1.0e8, depth_m: 1000, pressure_bar: 200, sw: 1.0, fixed: true }
  connections:
    - { cells: [0, 1], transmissibility: 1.0e-11 }
lift_curves:
  - { id: 1, head_bar: 80, friction: 1.0e-4 }
wells:
  - name: P1
    kind: producer
    control: { mode: rate, rate_m3_per_day: 100, bhp_bar: 50, thp_bar: 10, lift_curve: 1 }
    perforations:
      - { cell: 0, transmissibility: 1.0e-12, depth_m: 1000 }
schedule: { dt_days: 0.5, t_end_days: 2 }
"#;

    #[test]
    fn units_are_converted_to_si() {
        let case = from_yaml_str(CASE).unwrap();
        let config = case.wells[0].to_config();
        assert!((config.controls.rate_target.unwrap() - 100.0 / 86_400.0).abs() < 1e-15);
        assert_eq!(config.controls.bhp_limit, Some(5.0e6));

        let reservoir = case.reservoir_config();
        assert_eq!(reservoir.cells[0].pressure, 2.0e7);
        assert!((reservoir.temperature - 353.15).abs() < 1e-9);
        assert!(reservoir.cells[1].fixed);

        let options = case.schedule.to_options();
        assert_eq!(options.dt, 43_200.0);
        assert_eq!(options.t_end, 172_800.0);

        let limits = case.well_limits.to_limits();
        assert_eq!(limits.bhp_floor, 1.0e5);
    }

    #[test]
    fn lift_curve_friction_uses_daily_rates() {
        let case = from_yaml_str(CASE).unwrap();
        let tables = case.lift_tables();
        let curve = tables.get(1).unwrap();
        let q = 100.0 / 86_400.0;
        let rates = [0.0, q, 0.0].map(WellEval::constant);
        let bhp = curve.bhp(&rates, 1.0e6, true).value();
        // 10 bar + 80 bar + 1e-4 bar * 100²
        assert!((bhp - 9.1e6).abs() < 1e-3);
    }

    #[test]
    fn build_creates_reservoir_and_wells() {
        let case = from_yaml_str(CASE).unwrap();
        let sim = case.build().unwrap();
        assert_eq!(sim.wells().len(), 1);
        assert_eq!(sim.wells()[0].current_state().mode, ControlMode::Rate);
        assert_eq!(sim.reservoir().values(1), [2.0e7, 1.0, 0.0]);
    }

    #[test]
    fn build_rejects_bad_fluid() {
        let mut case = from_yaml_str(CASE).unwrap();
        case.fluid.surface_densities[0] = -1.0;
        assert!(case.build().is_err());
    }
}
