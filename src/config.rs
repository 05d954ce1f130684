//! Compile-time configuration, selected through cargo features.

use crate::options::{Align16, Align32, Align64, Unaligned};

/// Smallest boundary the inline buffer is ever aligned to.
pub const MIN_ALIGN_BYTES: usize = 16;

/// Largest boundary an inline buffer is aligned to when alignment is requested.
#[cfg(feature = "no-static-align")]
pub const MAX_STATIC_ALIGN_BYTES: usize = 0;
#[cfg(all(not(feature = "no-static-align"), feature = "max-align-64"))]
pub const MAX_STATIC_ALIGN_BYTES: usize = 64;
#[cfg(all(
    not(feature = "no-static-align"),
    not(feature = "max-align-64"),
    feature = "max-align-32"
))]
pub const MAX_STATIC_ALIGN_BYTES: usize = 32;
#[cfg(not(any(
    feature = "no-static-align",
    feature = "max-align-64",
    feature = "max-align-32"
)))]
pub const MAX_STATIC_ALIGN_BYTES: usize = 16;

/// Zero-sized marker carrying `MAX_STATIC_ALIGN_BYTES` as its alignment.
#[cfg(feature = "no-static-align")]
pub type MaxAlign = Unaligned;
#[cfg(all(not(feature = "no-static-align"), feature = "max-align-64"))]
pub type MaxAlign = Align64;
#[cfg(all(
    not(feature = "no-static-align"),
    not(feature = "max-align-64"),
    feature = "max-align-32"
))]
pub type MaxAlign = Align32;
#[cfg(not(any(
    feature = "no-static-align",
    feature = "max-align-64",
    feature = "max-align-32"
)))]
pub type MaxAlign = Align16;

/// Upper bound, in bytes, of an inline buffer.
pub const STACK_ALLOCATION_LIMIT: usize = if cfg!(feature = "unbounded-stack") {
    usize::MAX
} else {
    128 * 1024
};

/// Whether `data()` on an inline buffer checks its address against the
/// computed alignment.
pub const UNALIGNED_ARRAY_ASSERT: bool = !cfg!(feature = "no-unaligned-assert");

/// Alignment of heap buffers for element type `T`.
#[inline]
pub const fn heap_alignment<T>(align: bool) -> usize {
    let natural = std::mem::align_of::<T>();
    if align && MAX_STATIC_ALIGN_BYTES > natural {
        MAX_STATIC_ALIGN_BYTES
    } else {
        natural
    }
}

/// Default alignment of an inline array of `bytes` bytes: the largest power of
/// two in `[MIN_ALIGN_BYTES, MAX_STATIC_ALIGN_BYTES]` dividing `bytes`, or 0.
pub const fn compute_default_alignment(bytes: usize) -> usize {
    if bytes == 0 {
        return 0;
    }
    let mut align = MAX_STATIC_ALIGN_BYTES;
    while align >= MIN_ALIGN_BYTES {
        if bytes % align == 0 {
            return align;
        }
        align /= 2;
    }
    0
}
