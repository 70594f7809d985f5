// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Miscellaneous utility routines and types.

use core::fmt;
use core::mem::{align_of, size_of};

/// Rounds `value` up to the nearest multiple of `boundary`.
///
/// Unlike bit-masking approaches, `boundary` is not required to be a power
/// of two.
///
/// # Panics
///
/// Panics if `boundary` is zero, or if the result overflows a `usize`.
///
/// # Examples
///
/// ```
/// use memregion::align_up;
///
/// assert_eq!(align_up(5, 4), 8);
/// assert_eq!(align_up(8, 4), 8);
/// assert_eq!(align_up(7, 3), 9);
/// ```
#[inline]
pub const fn align_up(value: usize, boundary: usize) -> usize {
    let remainder = value % boundary;
    if remainder == 0 {
        value
    } else {
        value + (boundary - remainder)
    }
}

/// Returns whether `value` is a multiple of `boundary`.
///
/// A `boundary` of zero is never satisfied.
#[inline]
pub const fn is_aligned(value: usize, boundary: usize) -> bool {
    boundary != 0 && value % boundary == 0
}

/// Returns the stride between consecutive elements of type `T` in a region:
/// the size of `T` rounded up to its alignment.
///
/// # Examples
///
/// ```
/// use memregion::aligned_size_of;
///
/// assert_eq!(aligned_size_of::<u8>(), 1);
/// assert_eq!(aligned_size_of::<u32>(), 4);
/// assert_eq!(aligned_size_of::<[u16; 3]>(), 6);
/// ```
#[inline]
pub const fn aligned_size_of<T>() -> usize {
    align_up(size_of::<T>(), align_of::<T>())
}

/// Alignment, in bytes, of all [`Heap`] allocations.
///
/// 64 bytes matches the cache line size of most current processors, so
/// separately allocated regions never share a cache line. The same value is
/// spelled out in the `repr(align)` attribute of [`CacheAligned`] and must be
/// kept in sync with it.
///
/// [`CacheAligned`]: struct.CacheAligned.html
/// [`Heap`]: struct.Heap.html
pub const CACHE_ALIGNMENT: usize = 64;

/// Cache-aligned block of bytes.
///
/// Internally, this simply wraps a `u8` array to ensure cache alignment. It
/// is the most strictly aligned element type accepted by regions that use
/// the [`Heap`] allocator.
///
/// # Examples
///
/// ```
/// use memregion::{CacheAligned, MemoryRegion, CACHE_ALIGNMENT};
///
/// let mut region = MemoryRegion::<CacheAligned>::new();
/// region.allocate(CACHE_ALIGNMENT * 2).unwrap();
/// assert_eq!(region.element_count(), 2);
/// assert_eq!(region.as_ptr() as usize % CACHE_ALIGNMENT, 0);
/// ```
///
/// [`Heap`]: struct.Heap.html
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct CacheAligned(pub [u8; CACHE_ALIGNMENT]);

/// Fails to compile if `CacheAligned` is not exactly one cache line.
const _ASSERT_CACHE_ALIGNED_SIZE: [(); size_of::<CacheAligned>()
    - CACHE_ALIGNMENT] = [];
/// Fails to compile if `CacheAligned` is not aligned to a cache line.
const _ASSERT_CACHE_ALIGNED_ALIGNMENT: [(); align_of::<CacheAligned>()
    - CACHE_ALIGNMENT] = [];

impl fmt::Debug for CacheAligned {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CacheAligned {{ ... }}")
    }
}
