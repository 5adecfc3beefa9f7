//! Small dense inversion for the well block `D`.

use nalgebra::SMatrix;

/// Relative pivot threshold after row equilibration.
pub const PIVOT_TOL: f64 = 1e-12;

/// Invert a small square matrix by Gauss-Jordan elimination with partial
/// pivoting.
///
/// Rows are first scaled to unit max-norm so that equations with very
/// different units (rates against fractions) compete fairly for pivots.
/// Returns `None` for non-finite entries, an all-zero row, or a pivot below
/// [`PIVOT_TOL`].
#[allow(clippy::needless_range_loop)]
pub fn invert<const N: usize>(m: &SMatrix<f64, N, N>) -> Option<SMatrix<f64, N, N>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut a = *m;
    let mut inv = SMatrix::<f64, N, N>::zeros();
    for r in 0..N {
        let scale = (0..N).map(|c| a[(r, c)].abs()).fold(0.0, f64::max);
        if scale == 0.0 {
            return None;
        }
        for c in 0..N {
            a[(r, c)] /= scale;
        }
        inv[(r, r)] = 1.0 / scale;
    }

    for k in 0..N {
        let mut pivot_row = k;
        let mut max_val = a[(k, k)].abs();
        for i in (k + 1)..N {
            let v = a[(i, k)].abs();
            if v > max_val {
                max_val = v;
                pivot_row = i;
            }
        }
        if max_val <= PIVOT_TOL {
            return None;
        }
        if pivot_row != k {
            a.swap_rows(k, pivot_row);
            inv.swap_rows(k, pivot_row);
        }

        let pivot = a[(k, k)];
        for j in 0..N {
            a[(k, j)] /= pivot;
            inv[(k, j)] /= pivot;
        }

        for i in 0..N {
            if i == k {
                continue;
            }
            let factor = a[(i, k)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                a[(i, j)] -= factor * a[(k, j)];
                inv[(i, j)] -= factor * inv[(k, j)];
            }
        }
    }

    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn identity_inverse() {
        let inv = invert(&Matrix3::<f64>::identity()).unwrap();
        assert_eq!(inv, Matrix3::identity());
    }

    #[test]
    fn needs_row_swap() {
        let m = Matrix3::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 2.0);
        let inv = invert(&m).unwrap();
        let prod = m * inv;
        assert!((prod - Matrix3::identity()).abs().max() < 1e-14);
    }

    #[test]
    fn badly_scaled_rows() {
        // a rate row next to fraction rows
        let m = Matrix3::new(4.0e-10, 0.0, 0.0, 1.0e-10, 1.2e-3, 0.0, 0.0, 0.0, 1.0);
        let inv = invert(&m).unwrap();
        let prod = m * inv;
        assert!((prod - Matrix3::identity()).abs().max() < 1e-12);
    }

    #[test]
    fn singular_is_rejected() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0);
        assert!(invert(&m).is_none());
        let mut z = Matrix3::identity();
        z[(1, 0)] = 0.0;
        z[(1, 1)] = 0.0;
        assert!(invert(&z).is_none());
        let mut nan = Matrix3::identity();
        nan[(2, 2)] = f64::NAN;
        assert!(invert(&nan).is_none());
    }

    #[test]
    fn general_matrix_matches_lu() {
        let m = Matrix3::new(2.0, -1.0, 0.5, 0.3, 4.0, -2.0, 1.0, 0.0, 3.0);
        let inv = invert(&m).unwrap();
        let lu = m.try_inverse().unwrap();
        assert!((inv - lu).abs().max() < 1e-12);
    }
}
