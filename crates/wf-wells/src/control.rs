//! Control-mode switching.
//!
//! After a tentative Newton update the well computes the values its inactive
//! constraints would take and switches to the first one that is violated:
//!
//! | current      | check                               | new mode |
//! |--------------|-------------------------------------|----------|
//! | `Rate`       | bhp beyond its limit                | `Bhp`    |
//! | `Rate`       | thp beyond its limit                | `Thp`    |
//! | `Bhp`/`Thp`  | total rate not positive             | `Shut`   |
//! | `Bhp`/`Thp`  | controlled rate above target        | `Rate`   |
//! | `Thp`        | bhp beyond its limit                | `Bhp`    |
//! | `Bhp`        | thp beyond its limit                | `Thp`    |
//! | `Bhp`/`Thp`  | total rate below the economic limit | `Shut`   |
//!
//! "Beyond" means below for producers and above for injectors.

use crate::config::{ControlMode, WellControls, WellType};
use serde::Serialize;
use std::fmt;
use wf_pvt::NUM_PHASES;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchReason {
    BhpLimit,
    ThpLimit,
    RateLimit,
    EconomicLimit,
    NoFlow,
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchReason::BhpLimit => "bhp limit",
            SwitchReason::ThpLimit => "thp limit",
            SwitchReason::RateLimit => "rate limit",
            SwitchReason::EconomicLimit => "economic limit",
            SwitchReason::NoFlow => "no flow",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ControlSwitch {
    pub from: ControlMode,
    pub to: ControlMode,
    pub reason: SwitchReason,
}

/// Outcome of a back-substitution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WellUpdate {
    /// The well residual was within tolerance before the update and no
    /// switch happened.
    pub converged: bool,
    pub switched: Option<ControlSwitch>,
}

/// Values of the well's constraints implied by a tentative update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpliedValues {
    pub bhp: f64,
    pub thp: Option<f64>,
    /// Surface rates `[water, oil, gas]`, positive in normal operation
    pub rates: [f64; NUM_PHASES],
}

fn beyond(well_type: WellType, value: f64, limit: f64) -> bool {
    match well_type {
        WellType::Producer => value < limit,
        WellType::Injector => value > limit,
    }
}

/// The control mode the well must switch to, if any.
pub fn check_constraints(
    mode: ControlMode,
    well_type: WellType,
    controls: &WellControls,
    implied: &ImpliedValues,
) -> Option<ControlSwitch> {
    let switch = |to, reason| {
        Some(ControlSwitch {
            from: mode,
            to,
            reason,
        })
    };
    let bhp_violated = controls
        .bhp_limit
        .is_some_and(|limit| beyond(well_type, implied.bhp, limit));
    let thp_violated = match (controls.thp_limit, implied.thp) {
        (Some(limit), Some(thp)) => beyond(well_type, thp, limit),
        _ => false,
    };

    match mode {
        ControlMode::Rate => {
            if bhp_violated {
                return switch(ControlMode::Bhp, SwitchReason::BhpLimit);
            }
            if thp_violated {
                return switch(ControlMode::Thp, SwitchReason::ThpLimit);
            }
            None
        }
        ControlMode::Bhp | ControlMode::Thp => {
            let total: f64 = implied.rates.iter().sum();
            if total <= 0.0 {
                return switch(ControlMode::Shut, SwitchReason::NoFlow);
            }
            if controls
                .rate_target
                .is_some_and(|target| controls.rate_kind.select(&implied.rates) > target)
            {
                return switch(ControlMode::Rate, SwitchReason::RateLimit);
            }
            if mode == ControlMode::Thp && bhp_violated {
                return switch(ControlMode::Bhp, SwitchReason::BhpLimit);
            }
            if mode == ControlMode::Bhp && thp_violated {
                return switch(ControlMode::Thp, SwitchReason::ThpLimit);
            }
            if controls.min_economic_rate.is_some_and(|min| total < min) {
                return switch(ControlMode::Shut, SwitchReason::EconomicLimit);
            }
            None
        }
        ControlMode::Shut => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateKind;

    fn controls() -> WellControls {
        WellControls {
            mode: ControlMode::Rate,
            rate_kind: RateKind::Oil,
            rate_target: Some(1.0e-3),
            bhp_limit: Some(1.0e7),
            thp_limit: Some(2.0e6),
            vfp_table: Some(1),
            min_economic_rate: Some(1.0e-5),
        }
    }

    fn producer(c: &WellControls, mode: ControlMode, at: ImpliedValues) -> Option<ControlSwitch> {
        check_constraints(mode, WellType::Producer, c, &at)
    }

    fn implied(bhp: f64, thp: f64, oil: f64) -> ImpliedValues {
        ImpliedValues {
            bhp,
            thp: Some(thp),
            rates: [0.0, oil, 0.0],
        }
    }

    #[test]
    fn producer_rate_mode_hits_bhp_limit() {
        let c = controls();
        let s = producer(&c, ControlMode::Rate, implied(9.0e6, 3.0e6, 1e-3));
        assert_eq!(
            s,
            Some(ControlSwitch {
                from: ControlMode::Rate,
                to: ControlMode::Bhp,
                reason: SwitchReason::BhpLimit
            })
        );
        let s = producer(&c, ControlMode::Rate, implied(1.1e7, 1.0e6, 1e-3));
        assert_eq!(s.map(|s| s.to), Some(ControlMode::Thp));
        let s = producer(&c, ControlMode::Rate, implied(1.1e7, 3.0e6, 1e-3));
        assert!(s.is_none());
    }

    #[test]
    fn pressure_mode_returns_to_rate() {
        let c = controls();
        let s = producer(&c, ControlMode::Bhp, implied(1.0e7, 3.0e6, 2e-3));
        assert_eq!(s.map(|s| s.reason), Some(SwitchReason::RateLimit));
        let s = producer(&c, ControlMode::Bhp, implied(1.0e7, 3.0e6, 5e-4));
        assert!(s.is_none());
    }

    #[test]
    fn pressure_mode_shuts_on_no_flow_or_economic_limit() {
        let c = controls();
        let s = producer(&c, ControlMode::Thp, implied(1.1e7, 2.0e6, -1e-6));
        assert_eq!(s.map(|s| s.reason), Some(SwitchReason::NoFlow));
        let s = producer(&c, ControlMode::Bhp, implied(1.0e7, 3.0e6, 1e-6));
        assert_eq!(
            s.map(|s| (s.to, s.reason)),
            Some((ControlMode::Shut, SwitchReason::EconomicLimit))
        );
    }

    #[test]
    fn injector_limits_are_upper_bounds() {
        let mut c = controls();
        c.rate_kind = RateKind::Water;
        c.bhp_limit = Some(3.0e7);
        c.thp_limit = None;
        let over = ImpliedValues {
            bhp: 3.1e7,
            thp: None,
            rates: [1e-3, 0.0, 0.0],
        };
        let s = check_constraints(ControlMode::Rate, WellType::Injector, &c, &over);
        assert_eq!(s.map(|s| s.to), Some(ControlMode::Bhp));
        let under = ImpliedValues { bhp: 2.9e7, ..over };
        assert!(check_constraints(ControlMode::Rate, WellType::Injector, &c, &under).is_none());
    }

    #[test]
    fn shut_never_switches() {
        let c = controls();
        assert!(producer(&c, ControlMode::Shut, implied(0.0, 0.0, 0.0)).is_none());
    }
}
