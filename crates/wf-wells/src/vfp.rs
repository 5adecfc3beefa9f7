//! Lift curves relating tubing-head and bottom-hole pressure.

use crate::WellEval;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wf_pvt::NUM_PHASES;

/// Vertical flow performance lookup.
///
/// `rates` are well surface rates `[water, oil, gas]`, positive in normal
/// operation for both well types.
pub trait LiftCurve: Send + Sync {
    /// Bottom-hole pressure needed to deliver `rates` at tubing-head pressure `thp`.
    fn bhp(&self, rates: &[WellEval; NUM_PHASES], thp: f64, producer: bool) -> WellEval;

    /// Tubing-head pressure implied by `bhp` at `rates`.
    fn thp(&self, rates: &[f64; NUM_PHASES], bhp: f64, producer: bool) -> f64;
}

/// Hydrostatic head plus quadratic friction:
///
/// ```text
/// bhp = thp + head ± friction * q |q|
/// ```
///
/// Friction opposes the flow, so it raises the bottom-hole pressure of a
/// producer and lowers that of an injector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearLiftCurve {
    /// Hydrostatic head of the tubing column [Pa]
    pub head: f64,
    /// Friction coefficient [Pa·s²/m⁶]
    pub friction: f64,
}

impl LinearLiftCurve {
    fn friction_sign(producer: bool) -> f64 {
        if producer { 1.0 } else { -1.0 }
    }
}

impl LiftCurve for LinearLiftCurve {
    fn bhp(&self, rates: &[WellEval; NUM_PHASES], thp: f64, producer: bool) -> WellEval {
        let q: WellEval = rates.iter().copied().sum();
        q * q.abs() * (self.friction * Self::friction_sign(producer)) + (thp + self.head)
    }

    fn thp(&self, rates: &[f64; NUM_PHASES], bhp: f64, producer: bool) -> f64 {
        let q: f64 = rates.iter().sum();
        bhp - self.head - Self::friction_sign(producer) * self.friction * q * q.abs()
    }
}

/// Lift curves keyed by table id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VfpTables {
    tables: BTreeMap<u32, LinearLiftCurve>,
}

impl VfpTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, curve: LinearLiftCurve) {
        self.tables.insert(id, curve);
    }

    pub fn get(&self, id: u32) -> Option<&dyn LiftCurve> {
        self.tables.get(&id).map(|c| c as &dyn LiftCurve)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.tables.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NUM_EQ;

    #[test]
    fn bhp_and_thp_are_inverse() {
        let curve = LinearLiftCurve {
            head: 1.5e7,
            friction: 2.0e11,
        };
        for producer in [true, false] {
            let rates = [1.0e-3, 2.0e-3, 0.0];
            let evals = rates.map(WellEval::constant);
            let bhp = curve.bhp(&evals, 2.0e6, producer);
            let thp = curve.thp(&rates, bhp.value(), producer);
            assert!((thp - 2.0e6).abs() < 1e-6);
        }
    }

    #[test]
    fn friction_raises_producer_bhp() {
        let curve = LinearLiftCurve {
            head: 1.0e7,
            friction: 1.0e12,
        };
        let q = WellEval::variable(1.0e-3, NUM_EQ);
        let zero = WellEval::constant(0.0);
        let bhp = curve.bhp(&[zero, q, zero], 1.0e6, true);
        assert!((bhp.value() - 1.2e7).abs() < 1e-6);
        assert!((bhp.derivative(NUM_EQ) - 2.0e9).abs() < 1e-3);
        let inj = curve.bhp(&[q, zero, zero], 1.0e6, false);
        assert!(inj.value() < 1.1e7);
    }

    #[test]
    fn tables_lookup_by_id() {
        let mut tables = VfpTables::new();
        assert!(tables.is_empty());
        tables.insert(
            2,
            LinearLiftCurve {
                head: 1.0e7,
                friction: 0.0,
            },
        );
        assert!(tables.contains(2));
        assert!(tables.get(1).is_none());
        let thp = tables.get(2).unwrap().thp(&[0.0; 3], 1.2e7, true);
        assert!((thp - 2.0e6).abs() < 1e-9);
        assert_eq!(tables.len(), 1);
    }
}
