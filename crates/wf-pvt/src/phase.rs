//! Phase indexing and activity flags.

use crate::error::{PvtError, PvtResult};
use serde::{Deserialize, Serialize};

/// Fluid phase. The discriminant is the phase's position in every
/// per-phase array (`[water, oil, gas]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Water = 0,
    Oil = 1,
    Gas = 2,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Water, Phase::Oil, Phase::Gas];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Water => "water",
            Phase::Oil => "oil",
            Phase::Gas => "gas",
        }
    }
}

/// Which phases take part in the simulation.
///
/// Inactive phases keep their slot in every array but carry zero mobility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUsage {
    pub water: bool,
    pub oil: bool,
    pub gas: bool,
}

impl Default for PhaseUsage {
    fn default() -> Self {
        Self::three_phase()
    }
}

impl PhaseUsage {
    pub fn three_phase() -> Self {
        Self {
            water: true,
            oil: true,
            gas: true,
        }
    }

    pub fn oil_water() -> Self {
        Self {
            water: true,
            oil: true,
            gas: false,
        }
    }

    pub fn oil_only() -> Self {
        Self {
            water: false,
            oil: true,
            gas: false,
        }
    }

    pub fn is_active(&self, phase: Phase) -> bool {
        match phase {
            Phase::Water => self.water,
            Phase::Oil => self.oil,
            Phase::Gas => self.gas,
        }
    }

    pub fn num_active(&self) -> usize {
        Phase::ALL.iter().filter(|p| self.is_active(**p)).count()
    }

    /// Oil carries the remainder fraction of the well stream and must be active.
    pub fn validate(&self) -> PvtResult<()> {
        if !self.oil {
            return Err(PvtError::InactivePhase { phase: "oil" });
        }
        Ok(())
    }
}

/// Phases present with non-zero saturation in a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhasePresence {
    pub free_water: bool,
    pub free_oil: bool,
    pub free_gas: bool,
}

impl PhasePresence {
    pub fn from_saturations(sw: f64, so: f64, sg: f64) -> Self {
        Self {
            free_water: sw > 0.0,
            free_oil: so > 0.0,
            free_gas: sg > 0.0,
        }
    }

    pub fn all() -> Self {
        Self {
            free_water: true,
            free_oil: true,
            free_gas: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_indices_match_array_layout() {
        for (i, p) in Phase::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert_eq!(Phase::Gas.name(), "gas");
    }

    #[test]
    fn usage_counts_and_validation() {
        assert_eq!(PhaseUsage::three_phase().num_active(), 3);
        assert_eq!(PhaseUsage::oil_water().num_active(), 2);
        assert!(PhaseUsage::oil_only().validate().is_ok());

        let no_oil = PhaseUsage {
            water: true,
            oil: false,
            gas: true,
        };
        assert!(matches!(
            no_oil.validate(),
            Err(PvtError::InactivePhase { phase: "oil" })
        ));
    }

    #[test]
    fn presence_from_saturations() {
        let pres = PhasePresence::from_saturations(0.2, 0.8, 0.0);
        assert!(pres.free_water && pres.free_oil && !pres.free_gas);
    }
}
