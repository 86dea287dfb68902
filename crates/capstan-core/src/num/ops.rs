// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! By-value saturating arithmetic over primitive integers.
//!
//! Domain bounds in the solver use `i64::MIN`/`i64::MAX` as infinity
//! sentinels, so every bound computation must clamp instead of wrapping.
//! These traits mirror the inherent `saturating_*` methods on primitives
//! with a by-value API, implemented as blankets over `num_traits::PrimInt`.

use num_traits::{PrimInt, Zero};

/// Saturating addition by value.
///
/// ```rust
/// # use capstan_core::num::ops::SaturatingAddVal;
/// assert_eq!(i64::MAX.saturating_add_val(1), i64::MAX);
/// assert_eq!(3i64.saturating_add_val(4), 7);
/// ```
pub trait SaturatingAddVal: Sized {
    /// Performs saturating addition by value.
    fn saturating_add_val(self, v: Self) -> Self;
}

impl<T> SaturatingAddVal for T
where
    T: PrimInt,
{
    #[inline(always)]
    fn saturating_add_val(self, v: Self) -> Self {
        self.checked_add(&v).unwrap_or_else(|| {
            if v < T::zero() {
                T::min_value()
            } else {
                T::max_value()
            }
        })
    }
}

/// Saturating subtraction by value.
///
/// ```rust
/// # use capstan_core::num::ops::SaturatingSubVal;
/// assert_eq!(i64::MIN.saturating_sub_val(1), i64::MIN);
/// assert_eq!(7i64.saturating_sub_val(4), 3);
/// ```
pub trait SaturatingSubVal: Sized {
    /// Performs saturating subtraction by value.
    fn saturating_sub_val(self, v: Self) -> Self;
}

impl<T> SaturatingSubVal for T
where
    T: PrimInt,
{
    #[inline(always)]
    fn saturating_sub_val(self, v: Self) -> Self {
        self.checked_sub(&v).unwrap_or_else(|| {
            if v < T::zero() {
                T::max_value()
            } else {
                T::min_value()
            }
        })
    }
}

/// Saturating multiplication by value.
///
/// ```rust
/// # use capstan_core::num::ops::SaturatingMulVal;
/// assert_eq!(i64::MAX.saturating_mul_val(2), i64::MAX);
/// assert_eq!(6i64.saturating_mul_val(7), 42);
/// ```
pub trait SaturatingMulVal: Sized {
    /// Performs saturating multiplication by value.
    fn saturating_mul_val(self, v: Self) -> Self;
}

impl<T> SaturatingMulVal for T
where
    T: PrimInt + Zero,
{
    #[inline(always)]
    fn saturating_mul_val(self, v: Self) -> Self {
        self.checked_mul(&v).unwrap_or_else(|| {
            if (self < T::zero()) == (v < T::zero()) {
                T::max_value()
            } else {
                T::min_value()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_clamps_at_both_ends() {
        assert_eq!(i64::MAX.saturating_add_val(i64::MAX), i64::MAX);
        assert_eq!(i64::MIN.saturating_add_val(-1), i64::MIN);
        assert_eq!((-3i64).saturating_add_val(5), 2);
    }

    #[test]
    fn test_sub_clamps_at_both_ends() {
        assert_eq!(i64::MIN.saturating_sub_val(i64::MAX), i64::MIN);
        assert_eq!(i64::MAX.saturating_sub_val(-1), i64::MAX);
        assert_eq!(10i64.saturating_sub_val(3), 7);
    }

    #[test]
    fn test_mul_sign_aware_clamping() {
        assert_eq!(i64::MAX.saturating_mul_val(2), i64::MAX);
        assert_eq!(i64::MAX.saturating_mul_val(-2), i64::MIN);
        assert_eq!(i64::MIN.saturating_mul_val(-1), i64::MAX);
        assert_eq!((-4i64).saturating_mul_val(-5), 20);
    }

    #[test]
    fn test_works_for_other_widths() {
        assert_eq!(250u8.saturating_add_val(10), 255);
        assert_eq!(5u8.saturating_sub_val(10), 0);
        assert_eq!(120i8.saturating_add_val(10), 127);
    }
}
