// Copyright 2018 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Heap` allocator implementation.

use alloc::alloc::{alloc, dealloc, Layout};
use core::ptr::NonNull;

use super::{ByteAllocator, CACHE_ALIGNMENT};

/// Default [`ByteAllocator`] backed by the global allocator.
///
/// All allocations are aligned to [`CACHE_ALIGNMENT`] bytes, so any
/// [`ByteData`] type up to and including [`CacheAligned`] can be stored in a
/// heap-allocated region.
///
/// [`ByteAllocator`]: trait.ByteAllocator.html
/// [`ByteData`]: trait.ByteData.html
/// [`CacheAligned`]: struct.CacheAligned.html
/// [`CACHE_ALIGNMENT`]: constant.CACHE_ALIGNMENT.html
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

impl Heap {
    #[inline]
    fn layout(byte_count: usize) -> Option<Layout> {
        Layout::from_size_align(byte_count, CACHE_ALIGNMENT).ok()
    }
}

unsafe impl ByteAllocator for Heap {
    const ALIGNMENT: usize = CACHE_ALIGNMENT;

    #[inline]
    fn allocate(&self, byte_count: usize) -> Option<NonNull<u8>> {
        // Zero-sized layouts are not supported by the global allocator.
        if byte_count == 0 {
            return None;
        }

        let layout = Self::layout(byte_count)?;
        NonNull::new(unsafe { alloc(layout) })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, byte_count: usize) {
        // The same layout was accepted by `allocate()`.
        if let Some(layout) = Self::layout(byte_count) {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}
