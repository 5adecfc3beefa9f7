use crate::WfError;

/// Floating point type used throughout the simulator.
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, WfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(WfError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive, e.g. transmissibilities and pore volumes.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, WfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(WfError::NonPositive { what, value: v })
    }
}

/// Infinity norm of a slice; NaN entries make the norm NaN.
pub fn max_abs(values: &[Real]) -> Real {
    values.iter().fold(0.0, |acc: Real, v| {
        if v.is_nan() || acc.is_nan() {
            Real::NAN
        } else {
            acc.max(v.abs())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(1.0, "pv").is_ok());
        assert!(matches!(
            ensure_positive(0.0, "pv"),
            Err(WfError::NonPositive { .. })
        ));
        assert!(matches!(
            ensure_positive(Real::INFINITY, "pv"),
            Err(WfError::NonFinite { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            proptest::prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn max_abs_bounds_every_entry(values in proptest::collection::vec(-1e9f64..1e9, 0..16)) {
            let norm = max_abs(&values);
            proptest::prop_assert!(values.iter().all(|v| v.abs() <= norm));
        }
    }

    #[test]
    fn max_abs_propagates_nan() {
        assert_eq!(max_abs(&[]), 0.0);
        assert_eq!(max_abs(&[1.0, -3.0, 2.0]), 3.0);
        assert!(max_abs(&[1.0, Real::NAN]).is_nan());
    }
}
