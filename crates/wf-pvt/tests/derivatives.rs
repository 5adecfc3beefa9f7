use proptest::prelude::*;
use wf_pvt::{BlackOilTable, CellState, FluidProps, Phase, PRESSURE_SLOT, SG_SLOT, SW_SLOT};

fn fd_check(analytic: f64, plus: f64, minus: f64, h: f64) -> bool {
    let fd = (plus - minus) / (2.0 * h);
    (analytic - fd).abs() <= 1e-5 * fd.abs().max(analytic.abs()) + 1e-12
}

proptest! {
    #[test]
    fn inv_fvf_pressure_derivative_matches_fd(p in 5.0e6f64..4.0e7, rs in 0.0f64..150.0) {
        let table = BlackOilTable::default();
        let h = 10.0;
        for phase in Phase::ALL {
            let at = |pv: f64| {
                let cell = CellState::primary(pv, 0.2, 0.1, 350.0).with_dissolution(rs, 0.0);
                table.inv_fvf(phase, &cell.pvt_state(), 0).unwrap()
            };
            let b = at(p);
            prop_assert!(fd_check(
                b.derivative(PRESSURE_SLOT),
                at(p + h).value(),
                at(p - h).value(),
                h
            ));
        }
    }

    #[test]
    fn rel_perm_derivatives_match_fd(sw in 0.05f64..0.45, sg in 0.05f64..0.45) {
        let table = BlackOilTable::default();
        let h = 1e-6;
        let kr_at = |w: f64, g: f64| {
            let cell = CellState::primary(2.0e7, w, g, 350.0);
            table.rel_perm(&cell.sw, &cell.sg, 0).unwrap()
        };
        let kr = kr_at(sw, sg);
        let w_plus = kr_at(sw + h, sg);
        let w_minus = kr_at(sw - h, sg);
        let g_plus = kr_at(sw, sg + h);
        let g_minus = kr_at(sw, sg - h);
        for p in 0..3 {
            let (dw, dg) = (kr[p].derivative(SW_SLOT), kr[p].derivative(SG_SLOT));
            prop_assert!(fd_check(dw, w_plus[p].value(), w_minus[p].value(), h));
            prop_assert!(fd_check(dg, g_plus[p].value(), g_minus[p].value(), h));
        }
    }
}

#[test]
fn saturated_ratios_scale_with_pressure() {
    let table = BlackOilTable {
        rv_slope: 1.0e-11,
        ..BlackOilTable::default()
    };
    let cell = CellState::primary(2.0e7, 0.0, 0.0, 350.0);
    let rs = table.rs_sat(&cell.pressure, 350.0, 0).unwrap();
    let rv = table.rv_sat(&cell.pressure, 350.0, 0).unwrap();
    assert!((rs.value() - 100.0).abs() < 1e-9);
    assert_eq!(rs.derivative(PRESSURE_SLOT), 5.0e-6);
    assert!((rv.value() - 2.0e-4).abs() < 1e-15);
}
