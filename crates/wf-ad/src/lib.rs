//! Forward-mode dual numbers with a fixed-length derivative vector.
//!
//! An [`Evaluation<N>`] carries a scalar value together with its partial
//! derivatives with respect to `N` unknowns. Arithmetic operators and the
//! elementary functions below propagate derivatives by the chain rule, so a
//! residual written with evaluations yields its Jacobian row for free.
//!
//! Evaluations combined arithmetically must agree on the meaning of every
//! derivative slot. The length is enforced by the type; the slot ordering is
//! a convention of the caller (see [`Evaluation::extend`] for moving
//! derivatives between differently sized spaces).
//!
//! ```
//! use wf_ad::Evaluation;
//!
//! let x = Evaluation::<2>::variable(3.0, 0);
//! let y = Evaluation::<2>::variable(2.0, 1);
//! let f = x * x * y;
//! assert_eq!(f.value(), 18.0);
//! assert_eq!(f.derivative(0), 12.0);
//! assert_eq!(f.derivative(1), 9.0);
//! ```

use nalgebra::SVector;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Range, Sub, SubAssign};

/// Value plus partial derivatives with respect to `N` unknowns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation<const N: usize> {
    value: f64,
    derivatives: SVector<f64, N>,
}

impl<const N: usize> Default for Evaluation<N> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl<const N: usize> From<f64> for Evaluation<N> {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<const N: usize> Evaluation<N> {
    /// Number of derivative slots.
    pub const SIZE: usize = N;

    /// A value with all derivatives zero.
    pub fn constant(value: f64) -> Self {
        Self {
            value,
            derivatives: SVector::zeros(),
        }
    }

    /// An independent unknown: derivative one in `slot`, zero elsewhere.
    pub fn variable(value: f64, slot: usize) -> Self {
        let mut e = Self::constant(value);
        e.derivatives[slot] = 1.0;
        e
    }

    pub fn from_parts(value: f64, derivatives: SVector<f64, N>) -> Self {
        Self { value, derivatives }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn derivative(&self, slot: usize) -> f64 {
        self.derivatives[slot]
    }

    #[inline]
    pub fn derivatives(&self) -> &SVector<f64, N> {
        &self.derivatives
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn set_derivative(&mut self, slot: usize, derivative: f64) {
        self.derivatives[slot] = derivative;
    }

    /// True when the value and every derivative are finite.
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.derivatives.iter().all(|d| d.is_finite())
    }

    /// Widen into an `M`-slot space, placing this evaluation's derivatives at
    /// `offset..offset + N`. All other slots are zero.
    pub fn extend<const M: usize>(&self, offset: usize) -> Evaluation<M> {
        assert!(
            offset + N <= M,
            "cannot extend {N} derivative slots at offset {offset} into {M}"
        );
        let mut out = Evaluation::<M>::constant(self.value);
        for i in 0..N {
            out.derivatives[offset + i] = self.derivatives[i];
        }
        out
    }

    /// Copy keeping only the derivatives in `slots`; the rest are zeroed.
    pub fn keep_slots(&self, slots: Range<usize>) -> Self {
        let mut out = Self::constant(self.value);
        for i in slots.start..slots.end.min(N) {
            out.derivatives[i] = self.derivatives[i];
        }
        out
    }

    pub fn recip(self) -> Self {
        let inv = 1.0 / self.value;
        Self {
            value: inv,
            derivatives: self.derivatives * (-inv * inv),
        }
    }

    pub fn exp(self) -> Self {
        let e = self.value.exp();
        Self {
            value: e,
            derivatives: self.derivatives * e,
        }
    }

    pub fn ln(self) -> Self {
        Self {
            value: self.value.ln(),
            derivatives: self.derivatives / self.value,
        }
    }

    pub fn powf(self, exponent: f64) -> Self {
        let v = self.value.powf(exponent);
        let dv = if exponent == 0.0 {
            0.0
        } else {
            exponent * self.value.powf(exponent - 1.0)
        };
        Self {
            value: v,
            derivatives: self.derivatives * dv,
        }
    }

    pub fn sqrt(self) -> Self {
        let s = self.value.sqrt();
        Self {
            value: s,
            derivatives: self.derivatives / (2.0 * s),
        }
    }

    pub fn abs(self) -> Self {
        if self.value < 0.0 { -self } else { self }
    }

    /// The operand with the larger value, derivatives included.
    pub fn max(self, other: Self) -> Self {
        if self.value >= other.value { self } else { other }
    }

    /// The operand with the smaller value, derivatives included.
    pub fn min(self, other: Self) -> Self {
        if self.value <= other.value { self } else { other }
    }

    /// Clamp from below by a constant; a clamped result has zero derivatives.
    pub fn max_value(self, bound: f64) -> Self {
        if self.value >= bound {
            self
        } else {
            Self::constant(bound)
        }
    }

    /// Clamp from above by a constant; a clamped result has zero derivatives.
    pub fn min_value(self, bound: f64) -> Self {
        if self.value <= bound {
            self
        } else {
            Self::constant(bound)
        }
    }
}

impl<const N: usize> Neg for Evaluation<N> {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: -self.value,
            derivatives: -self.derivatives,
        }
    }
}

impl<const N: usize> Add for Evaluation<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            derivatives: self.derivatives + rhs.derivatives,
        }
    }
}

impl<const N: usize> Sub for Evaluation<N> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            derivatives: self.derivatives - rhs.derivatives,
        }
    }
}

impl<const N: usize> Mul for Evaluation<N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.value * rhs.value,
            derivatives: self.derivatives * rhs.value + rhs.derivatives * self.value,
        }
    }
}

impl<const N: usize> Div for Evaluation<N> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        let value = self.value * inv;
        Self {
            value,
            derivatives: (self.derivatives - rhs.derivatives * value) * inv,
        }
    }
}

impl<const N: usize> Add<f64> for Evaluation<N> {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        Self {
            value: self.value + rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<const N: usize> Sub<f64> for Evaluation<N> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        Self {
            value: self.value - rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<const N: usize> Mul<f64> for Evaluation<N> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            value: self.value * rhs,
            derivatives: self.derivatives * rhs,
        }
    }
}

impl<const N: usize> Div<f64> for Evaluation<N> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self {
            value: self.value / rhs,
            derivatives: self.derivatives / rhs,
        }
    }
}

impl<const N: usize> Add<Evaluation<N>> for f64 {
    type Output = Evaluation<N>;

    fn add(self, rhs: Evaluation<N>) -> Evaluation<N> {
        rhs + self
    }
}

impl<const N: usize> Sub<Evaluation<N>> for f64 {
    type Output = Evaluation<N>;

    fn sub(self, rhs: Evaluation<N>) -> Evaluation<N> {
        Evaluation {
            value: self - rhs.value,
            derivatives: -rhs.derivatives,
        }
    }
}

impl<const N: usize> Mul<Evaluation<N>> for f64 {
    type Output = Evaluation<N>;

    fn mul(self, rhs: Evaluation<N>) -> Evaluation<N> {
        rhs * self
    }
}

impl<const N: usize> Div<Evaluation<N>> for f64 {
    type Output = Evaluation<N>;

    fn div(self, rhs: Evaluation<N>) -> Evaluation<N> {
        rhs.recip() * self
    }
}

impl<const N: usize> AddAssign for Evaluation<N> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const N: usize> SubAssign for Evaluation<N> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const N: usize> MulAssign for Evaluation<N> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<const N: usize> DivAssign for Evaluation<N> {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<const N: usize> AddAssign<f64> for Evaluation<N> {
    fn add_assign(&mut self, rhs: f64) {
        self.value += rhs;
    }
}

impl<const N: usize> SubAssign<f64> for Evaluation<N> {
    fn sub_assign(&mut self, rhs: f64) {
        self.value -= rhs;
    }
}

impl<const N: usize> MulAssign<f64> for Evaluation<N> {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl<const N: usize> DivAssign<f64> for Evaluation<N> {
    fn div_assign(&mut self, rhs: f64) {
        *self = *self / rhs;
    }
}

impl<const N: usize> Sum for Evaluation<N> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::constant(0.0), |acc, e| acc + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type E2 = Evaluation<2>;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn product_and_quotient_rules() {
        let x = E2::variable(3.0, 0);
        let y = E2::variable(2.0, 1);

        let p = x * y;
        assert_eq!(p.value(), 6.0);
        assert_eq!(p.derivative(0), 2.0);
        assert_eq!(p.derivative(1), 3.0);

        let q = x / y;
        assert!(close(q.value(), 1.5));
        assert!(close(q.derivative(0), 0.5));
        assert!(close(q.derivative(1), -0.75));
    }

    #[test]
    fn scalar_on_the_left() {
        let x = E2::variable(4.0, 0);
        let a = 1.0 - x;
        assert_eq!(a.value(), -3.0);
        assert_eq!(a.derivative(0), -1.0);

        let b = 2.0 / x;
        assert!(close(b.value(), 0.5));
        assert!(close(b.derivative(0), -2.0 / 16.0));
    }

    #[test]
    fn elementary_functions_chain_rule() {
        let x = E2::variable(0.5, 0);
        assert!(close(x.exp().derivative(0), 0.5_f64.exp()));
        assert!(close(x.ln().derivative(0), 2.0));
        assert!(close(x.sqrt().derivative(0), 0.5 / 0.5_f64.sqrt()));
        assert!(close(x.powf(3.0).derivative(0), 3.0 * 0.25));
        assert_eq!(x.powf(0.0).derivative(0), 0.0);
        assert_eq!((-x).abs().derivative(0), 1.0);
    }

    #[test]
    fn max_and_clamps_select_branch() {
        let x = E2::variable(1.0, 0);
        let y = E2::variable(2.0, 1);
        let m = x.max(y);
        assert_eq!(m.derivative(1), 1.0);
        assert_eq!(m.derivative(0), 0.0);

        let clamped = x.max_value(5.0);
        assert_eq!(clamped.value(), 5.0);
        assert_eq!(clamped.derivative(0), 0.0);
        assert_eq!(x.min_value(5.0), x);
    }

    #[test]
    fn extend_places_derivatives_at_offset() {
        let x = Evaluation::<3>::variable(7.0, 2);
        let wide: Evaluation<6> = x.extend(0);
        assert_eq!(wide.value(), 7.0);
        assert_eq!(wide.derivative(2), 1.0);
        assert!((3..6).all(|i| wide.derivative(i) == 0.0));

        let shifted: Evaluation<6> = x.extend(3);
        assert_eq!(shifted.derivative(5), 1.0);
        assert_eq!(shifted.derivative(2), 0.0);
    }

    #[test]
    #[should_panic]
    fn extend_rejects_overflowing_offset() {
        let x = Evaluation::<3>::variable(1.0, 0);
        let _: Evaluation<4> = x.extend(2);
    }

    #[test]
    fn keep_slots_masks_other_derivatives() {
        let a = Evaluation::<4>::variable(1.0, 0) + Evaluation::<4>::variable(2.0, 3);
        let head = a.keep_slots(0..2);
        let tail = a.keep_slots(2..4);
        assert_eq!(head.value(), 3.0);
        assert_eq!(head.derivative(0), 1.0);
        assert_eq!(head.derivative(3), 0.0);
        assert_eq!(tail.derivative(3), 1.0);
        assert_eq!(tail.derivative(0), 0.0);
    }

    #[test]
    fn sum_and_compound_assignment() {
        let xs = [E2::variable(1.0, 0), E2::variable(2.0, 1), E2::constant(3.0)];
        let s: E2 = xs.iter().copied().sum();
        assert_eq!(s.value(), 6.0);
        assert_eq!(s.derivative(0), 1.0);

        let mut acc = E2::variable(2.0, 0);
        acc *= 3.0;
        acc -= 1.0;
        acc /= E2::constant(5.0);
        assert!(close(acc.value(), 1.0));
        assert!(close(acc.derivative(0), 0.6));
    }

    #[test]
    fn non_finite_detected() {
        let zero = E2::variable(0.0, 0);
        assert!(!zero.recip().is_finite());
        assert!(E2::constant(1.0).is_finite());
    }
}
