//! Cutback retry behaviour of the simulator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wf_pvt::{BlackOilTable, FluidProps, PhaseUsage};
use wf_sim::{
    SimError, SimOptions, Simulator, TankCell, TankReservoir, TankReservoirConfig,
};
use wf_wells::{
    ControlMode, PerforationConfig, ReservoirState, StandardWell, VfpTables, WellConfig,
    WellContext, WellContributions, WellError, WellModel, WellResult, WellState, WellUpdate,
};

const DAY: f64 = 86_400.0;

/// A standard well whose assembly fails while `failures_left` is positive.
///
/// The counter is shared so restoring a snapshot on cutback does not reset it.
#[derive(Clone)]
struct FailingWell {
    inner: StandardWell,
    failures_left: Arc<AtomicUsize>,
}

impl WellModel for FailingWell {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cells(&self) -> Vec<usize> {
        self.inner.cells()
    }

    fn update_connection_pressures(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
    ) -> WellResult<()> {
        self.inner.update_connection_pressures(ctx, reservoir)
    }

    fn assemble(
        &mut self,
        ctx: &WellContext<'_>,
        reservoir: &dyn ReservoirState,
        dt: f64,
    ) -> WellResult<WellContributions> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(WellError::Numerical {
                well: self.name().to_string(),
                what: "intentional retryable failure",
            });
        }
        self.inner.assemble(ctx, reservoir, dt)
    }

    fn back_substitute(&mut self, ctx: &WellContext<'_>, dx: &[f64]) -> WellResult<WellUpdate> {
        self.inner.back_substitute(ctx, dx)
    }

    fn current_state(&self) -> &WellState {
        self.inner.current_state()
    }

    fn residual_norm(&self) -> f64 {
        self.inner.residual_norm()
    }

    fn begin_timestep(&mut self, ctx: &WellContext<'_>, reservoir: &dyn ReservoirState) {
        self.inner.begin_timestep(ctx, reservoir)
    }

    fn shut(&mut self) {
        self.inner.shut()
    }
}

fn simulator(failures: usize) -> (Simulator<TankReservoir, FailingWell>, Arc<AtomicUsize>) {
    let props: Arc<dyn FluidProps> = Arc::new(BlackOilTable::default());
    let usage = PhaseUsage::oil_water();
    let cells = vec![TankCell::new(1.0e6, 1000.0, 2.0e7, 0.2, 0.0)];
    let reservoir =
        TankReservoir::new(TankReservoirConfig::new(cells, vec![]), props.clone(), usage).unwrap();
    let vfp = VfpTables::new();

    let mut config = WellConfig::producer("P1", vec![PerforationConfig::new(0, 1e-12, 1000.0)]);
    config.controls.mode = ControlMode::Rate;
    config.controls.rate_target = Some(50.0 / DAY);
    config.controls.bhp_limit = Some(5.0e6);
    let ctx = WellContext::new(props.as_ref(), usage, &vfp);
    let inner = StandardWell::new(config, &ctx, &reservoir).unwrap();

    let failures_left = Arc::new(AtomicUsize::new(failures));
    let mut sim = Simulator::new(reservoir, props, vfp);
    sim.push_well(FailingWell {
        inner,
        failures_left: failures_left.clone(),
    });
    (sim, failures_left)
}

fn options() -> SimOptions {
    SimOptions {
        dt: DAY,
        t_end: 2.0 * DAY,
        max_steps: 10,
        min_dt: 0.01 * DAY,
        max_retries: 4,
        cutback_factor: 0.5,
        grow_factor: 2.0,
    }
}

#[test]
fn transient_cutback_retries_step() {
    let (mut sim, failures_left) = simulator(1);
    let opts = options();

    let reports = sim.run(&opts).expect("cutback retry should succeed");

    assert!(reports.len() >= 2, "Expected at least two steps");
    assert!(reports[0].dt < opts.dt, "First step should be cut back");
    assert_eq!(reports[0].retries, 1);
    assert_eq!(
        failures_left.load(Ordering::SeqCst),
        0,
        "Failure should have been consumed by retry"
    );
    assert!((sim.time() - opts.t_end).abs() < 1e-6);
    // the step grows back after the cutback
    assert!(reports[1].dt > reports[0].dt);
}

#[test]
fn exhausted_retries_surface_convergence_failure() {
    let (mut sim, _) = simulator(100);
    let err = sim.run(&options()).unwrap_err();
    assert!(matches!(err, SimError::ConvergenceFailed { .. }), "{err}");
    assert_eq!(sim.time(), 0.0);
}
