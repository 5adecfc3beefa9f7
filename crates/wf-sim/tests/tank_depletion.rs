//! Tank reservoirs produced and supported by wells.

use std::sync::Arc;
use wf_pvt::{BlackOilTable, FluidProps, Phase, PhaseUsage};
use wf_sim::{
    NewtonConfig, SimOptions, Simulator, TankCell, TankConnection, TankReservoir,
    TankReservoirConfig,
};
use wf_wells::{ControlMode, PerforationConfig, VfpTables, WellConfig, WellModel};

const DAY: f64 = 86_400.0;

fn props() -> Arc<dyn FluidProps> {
    Arc::new(BlackOilTable::default())
}

fn closed_tank() -> TankReservoir {
    let cells = vec![TankCell::new(1.0e6, 1000.0, 2.0e7, 0.2, 0.0)];
    TankReservoir::new(
        TankReservoirConfig::new(cells, vec![]),
        props(),
        PhaseUsage::oil_water(),
    )
    .unwrap()
}

/// Producing cell 0 next to a constant-pressure aquifer cell 1.
fn supported_tank() -> TankReservoir {
    let cells = vec![
        TankCell::new(1.0e6, 1000.0, 2.0e7, 0.2, 0.0),
        TankCell::new(1.0e8, 1000.0, 2.0e7, 1.0, 0.0).fixed(),
    ];
    let conns = vec![TankConnection {
        cells: [0, 1],
        transmissibility: 1.0e-11,
    }];
    TankReservoir::new(
        TankReservoirConfig::new(cells, conns),
        props(),
        PhaseUsage::oil_water(),
    )
    .unwrap()
}

fn simulator(reservoir: TankReservoir) -> Simulator<TankReservoir> {
    Simulator::new(reservoir, props(), VfpTables::new())
}

fn rate_producer(rate: f64, bhp_limit: f64) -> WellConfig {
    let mut config = WellConfig::producer("P1", vec![PerforationConfig::new(0, 1e-12, 1000.0)]);
    config.controls.mode = ControlMode::Rate;
    config.controls.rate_target = Some(rate);
    config.controls.bhp_limit = Some(bhp_limit);
    config
}

fn options(days: f64) -> SimOptions {
    SimOptions {
        dt: DAY,
        t_end: days * DAY,
        ..SimOptions::default()
    }
}

#[test]
fn rate_producer_depletes_closed_tank() {
    let reservoir = closed_tank();
    let oil_before = reservoir.fluid_in_place().unwrap()[Phase::Oil.index()];
    let newton = NewtonConfig {
        reservoir_tol: 1e-10,
        ..NewtonConfig::default()
    };
    let mut sim = simulator(reservoir).with_newton(newton);
    sim.add_well(rate_producer(100.0 / DAY, 5.0e6)).unwrap();

    let reports = sim.run(&options(5.0)).unwrap();
    assert_eq!(reports.len(), 5);

    let mut produced_oil = 0.0;
    let mut last_pressure = 2.0e7;
    for report in &reports {
        let well = &report.wells[0];
        assert_eq!(well.mode, ControlMode::Rate);
        let total: f64 = well.surface_rates.iter().sum();
        assert!((total - 100.0 / DAY).abs() < 1e-8, "total rate {total}");
        assert!(well.bhp < report.average_pressure);
        assert!(report.average_pressure < last_pressure);
        last_pressure = report.average_pressure;
        produced_oil += well.surface_rates[Phase::Oil.index()] * report.dt;
    }

    let oil_after = sim.reservoir().fluid_in_place().unwrap()[Phase::Oil.index()];
    let balance = (oil_before - oil_after - produced_oil).abs();
    assert!(
        balance < 1e-3 * produced_oil,
        "oil balance error {balance} for {produced_oil} produced"
    );
}

#[test]
fn producer_switches_to_bhp_when_target_is_unreachable() {
    let mut sim = simulator(closed_tank());
    // far beyond what the perforation delivers above the limit
    sim.add_well(rate_producer(5000.0 / DAY, 1.5e7)).unwrap();

    let reports = sim.run(&options(2.0)).unwrap();
    let well = &reports[0].wells[0];
    assert_eq!(well.mode, ControlMode::Bhp);
    assert!((well.bhp - 1.5e7).abs() < 1e-6);
    let total: f64 = well.surface_rates.iter().sum();
    assert!(total > 0.0 && total < 5000.0 / DAY);
    assert!(reports[0].control_switches >= 1);
}

#[test]
fn aquifer_supports_pressure() {
    let mut closed = simulator(closed_tank());
    closed.add_well(rate_producer(100.0 / DAY, 5.0e6)).unwrap();
    let closed_reports = closed.run(&options(3.0)).unwrap();

    let mut supported = simulator(supported_tank());
    supported.add_well(rate_producer(100.0 / DAY, 5.0e6)).unwrap();
    supported.run(&options(3.0)).unwrap();

    let p_closed = closed.reservoir().values(0)[0];
    let p_supported = supported.reservoir().values(0)[0];
    assert!(p_supported > p_closed);
    // water flows in from the aquifer
    assert!(supported.reservoir().values(0)[1] > 0.2);
    // the aquifer cell is held fixed
    assert_eq!(supported.reservoir().values(1), [2.0e7, 1.0, 0.0]);
    assert!(closed_reports.iter().all(|r| r.newton_iterations > 0));
}

#[test]
fn water_injector_raises_pressure() {
    let mut sim = simulator(closed_tank());
    let mut config = WellConfig::injector(
        "I1",
        vec![PerforationConfig::new(0, 1e-12, 1000.0)],
        Phase::Water,
    );
    config.controls.mode = ControlMode::Bhp;
    config.controls.bhp_limit = Some(2.5e7);
    sim.add_well(config).unwrap();

    let reports = sim.run(&options(3.0)).unwrap();
    let last = reports.last().unwrap();
    let well = &last.wells[0];
    assert_eq!(well.mode, ControlMode::Bhp);
    assert!(well.surface_rates[Phase::Water.index()] > 0.0);
    assert!(well.surface_rates[Phase::Oil.index()].abs() < 1e-12);
    assert!(last.average_pressure > 2.0e7);
    assert!(sim.reservoir().values(0)[1] > 0.2);
    assert_eq!(sim.wells()[0].current_state().mode, ControlMode::Bhp);
}
