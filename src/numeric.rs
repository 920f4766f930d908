// SPDX-License-Identifier: MIT
//! Padding and alignment arithmetic.

/// Alignment helpers for integer offsets and sizes.
///
/// An alignment of 0 or 1 means "no alignment": the value is returned as-is.
/// Alignments do not need to be powers of two.
pub trait Padding: Sized {
    /// Smallest multiple of `alignment` that is greater than or equal to `self`.
    ///
    /// Saturates at the type's maximum when that multiple is not representable;
    /// use [`checked_pad`](Self::checked_pad) to detect it.
    fn pad(self, alignment: Self) -> Self;

    /// Like [`pad`](Self::pad), but `None` when the result would overflow
    fn checked_pad(self, alignment: Self) -> Option<Self>;

    /// Whether `self` is already a multiple of `alignment`
    fn is_aligned(self, alignment: Self) -> bool;
}

macro_rules! impl_padding {
    ($($ty:ty),*) => {
        $(
            impl Padding for $ty {
                #[inline]
                fn pad(self, alignment: Self) -> Self {
                    self.checked_pad(alignment).unwrap_or(<$ty>::MAX)
                }

                #[inline]
                fn checked_pad(self, alignment: Self) -> Option<Self> {
                    if alignment <= 1 {
                        return Some(self);
                    }

                    let remainder = self.rem_euclid(alignment);
                    if remainder == 0 {
                        Some(self)
                    } else {
                        self.checked_add(alignment - remainder)
                    }
                }

                #[inline]
                fn is_aligned(self, alignment: Self) -> bool {
                    alignment <= 1 || self.rem_euclid(alignment) == 0
                }
            }
        )*
    };
}

impl_padding!(u16, u32, u64, usize, i32, i64);
