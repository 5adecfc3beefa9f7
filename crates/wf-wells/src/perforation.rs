//! Per-perforation data owned by a well.

use crate::config::PerforationConfig;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerforationData {
    cell: usize,
    transmissibility: f64,
    depth: f64,
    /// Wellbore mixture density at this perforation [kg/m³]
    pub density: f64,
    /// Hydrostatic pressure difference from the reference depth [Pa]
    pub pressure_diff: f64,
}

impl PerforationData {
    pub fn new(config: &PerforationConfig) -> Self {
        Self {
            cell: config.cell,
            transmissibility: config.transmissibility,
            depth: config.depth,
            density: 0.0,
            pressure_diff: 0.0,
        }
    }

    #[inline]
    pub fn cell(&self) -> usize {
        self.cell
    }

    #[inline]
    pub fn transmissibility(&self) -> f64 {
        self.transmissibility
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.depth
    }
}

/// Build perforation data ordered from the top perforation down.
pub fn ordered_perforations(configs: &[PerforationConfig]) -> Vec<PerforationData> {
    let mut perfs: Vec<PerforationData> = configs.iter().map(PerforationData::new).collect();
    perfs.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    perfs
}
