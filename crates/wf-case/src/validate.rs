//! Case validation logic.
//!
//! Checks the structure of a case before any model is built: versions,
//! unique names, references between sections and value ranges the
//! simulator cannot report in field units. Physical consistency of wells
//! and cells is checked again when the models are constructed.

use crate::schema::{Case, ScheduleDef, WellDef};
use std::collections::HashSet;
use wf_wells::{ControlMode, WellType};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version > crate::schema::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }
    if !case.phases.oil {
        return Err(invalid("phases.oil", false, "the oil phase must be active"));
    }

    let num_cells = case.reservoir.cells.len();
    if num_cells == 0 {
        return Err(invalid("reservoir.cells", 0, "at least one cell is required"));
    }
    for (i, cell) in case.reservoir.cells.iter().enumerate() {
        if !(cell.pore_volume_m3 > 0.0) {
            return Err(invalid(
                format!("reservoir.cells[{i}].pore_volume_m3"),
                cell.pore_volume_m3,
                "must be positive",
            ));
        }
        if !(cell.pressure_bar > 0.0) {
            return Err(invalid(
                format!("reservoir.cells[{i}].pressure_bar"),
                cell.pressure_bar,
                "must be positive",
            ));
        }
    }
    for (i, conn) in case.reservoir.connections.iter().enumerate() {
        for cell in conn.cells {
            if cell >= num_cells {
                return Err(ValidationError::MissingReference {
                    id: cell.to_string(),
                    context: format!("reservoir.connections[{i}]"),
                });
            }
        }
    }

    let mut curve_ids = HashSet::new();
    for curve in &case.lift_curves {
        if !curve_ids.insert(curve.id) {
            return Err(ValidationError::DuplicateId {
                id: curve.id.to_string(),
                context: "lift_curves".to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for well in &case.wells {
        if well.name.trim().is_empty() {
            return Err(invalid("wells.name", "", "must not be empty"));
        }
        if !names.insert(well.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: well.name.clone(),
                context: "wells".to_string(),
            });
        }
        validate_well(well, num_cells, &curve_ids)?;
    }

    validate_schedule(&case.schedule)
}

fn validate_well(
    well: &WellDef,
    num_cells: usize,
    curve_ids: &HashSet<u32>,
) -> Result<(), ValidationError> {
    let name = &well.name;
    if well.kind == WellType::Injector && well.injected_phase.is_none() {
        return Err(invalid(
            format!("wells[{name}].injected_phase"),
            "none",
            "injectors must name the injected phase",
        ));
    }
    if well.perforations.is_empty() {
        return Err(invalid(
            format!("wells[{name}].perforations"),
            0,
            "at least one perforation is required",
        ));
    }
    for perf in &well.perforations {
        if perf.cell >= num_cells {
            return Err(ValidationError::MissingReference {
                id: perf.cell.to_string(),
                context: format!("wells[{name}].perforations"),
            });
        }
    }

    let control = &well.control;
    if let Some(id) = control.lift_curve {
        if !curve_ids.contains(&id) {
            return Err(ValidationError::MissingReference {
                id: id.to_string(),
                context: format!("wells[{name}].control.lift_curve"),
            });
        }
    }
    let required = match control.mode {
        ControlMode::Rate => control.rate_m3_per_day.map(|_| ()).ok_or("rate_m3_per_day"),
        ControlMode::Bhp => control.bhp_bar.map(|_| ()).ok_or("bhp_bar"),
        ControlMode::Thp => match (control.thp_bar, control.lift_curve) {
            (Some(_), Some(_)) => Ok(()),
            (None, _) => Err("thp_bar"),
            (_, None) => Err("lift_curve"),
        },
        ControlMode::Shut => Ok(()),
    };
    if well.kind == WellType::Injector
        && control.rate_m3_per_day.is_some()
        && control.bhp_bar.is_none()
    {
        return Err(invalid(
            format!("wells[{name}].control.bhp_bar"),
            "none",
            "a rate-controlled injector needs a maximum bhp",
        ));
    }
    if let Err(field) = required {
        return Err(invalid(
            format!("wells[{name}].control.{field}"),
            "none",
            "required by the control mode",
        ));
    }
    Ok(())
}

fn validate_schedule(schedule: &ScheduleDef) -> Result<(), ValidationError> {
    if !(schedule.dt_days > 0.0) {
        return Err(invalid("schedule.dt_days", schedule.dt_days, "must be positive"));
    }
    if !(schedule.t_end_days >= 0.0) {
        return Err(invalid(
            "schedule.t_end_days",
            schedule.t_end_days,
            "must be non-negative",
        ));
    }
    if !(schedule.min_dt_days > 0.0 && schedule.min_dt_days <= schedule.dt_days) {
        return Err(invalid(
            "schedule.min_dt_days",
            schedule.min_dt_days,
            "must lie in (0, dt_days]",
        ));
    }
    Ok(())
}
