// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Support traits.

use core::ptr::NonNull;

use super::CacheAligned;

/// Trait for types that can be safely reinterpreted from arbitrary bytes
/// stored in a [`MemoryRegion`].
///
/// `ByteData` is implemented by default for all basic integer and
/// floating-point types, arrays of `ByteData` types, and the
/// [`CacheAligned`] struct provided by this crate.
///
/// # Safety
///
/// Region memory is zero-filled on allocation, may be borrowed from
/// arbitrary foreign byte spans, and can be reinterpreted as any other
/// `ByteData` type. To properly implement this trait, the type should have
/// the following characteristics:
///
/// - Every bit pattern, including all zeroes, is a valid value of the type.
/// - The type has no padding bytes. Structs that need padding for alignment
///   should declare it as an explicit field so that writing a value never
///   leaves bytes of the region uninitialized.
/// - The type has no [`Drop`] implementation and holds no references or
///   pointers whose validity depends on the bytes (implied by `Copy` for the
///   former).
///
/// # Examples
///
/// ```
/// use memregion::ByteData;
///
/// #[derive(Clone, Copy)]
/// #[repr(C)]
/// struct Header {
///     tag: u8,
///     _padding: u8,
///     length: u16,
/// }
///
/// unsafe impl ByteData for Header {}
/// ```
///
/// [`CacheAligned`]: struct.CacheAligned.html
/// [`Drop`]: https://doc.rust-lang.org/core/ops/trait.Drop.html
/// [`MemoryRegion`]: struct.MemoryRegion.html
pub unsafe trait ByteData: Copy + 'static {}

unsafe impl ByteData for u8 {}
unsafe impl ByteData for u16 {}
unsafe impl ByteData for u32 {}
unsafe impl ByteData for u64 {}
unsafe impl ByteData for u128 {}
unsafe impl ByteData for usize {}
unsafe impl ByteData for i8 {}
unsafe impl ByteData for i16 {}
unsafe impl ByteData for i32 {}
unsafe impl ByteData for i64 {}
unsafe impl ByteData for i128 {}
unsafe impl ByteData for isize {}
unsafe impl ByteData for f32 {}
unsafe impl ByteData for f64 {}
unsafe impl ByteData for CacheAligned {}
unsafe impl<T, const N: usize> ByteData for [T; N] where T: ByteData {}

/// Source of raw byte storage for owned regions.
///
/// Allocators always work in units of bytes; element types are mapped onto
/// the returned storage by [`MemoryRegion`]. The alignment guarantee of an
/// allocator is exposed as an associated constant so that element types
/// with stricter alignment requirements are rejected at compile time
/// instead of on each allocation.
///
/// Each owned region holds its own allocator instance, created with
/// [`Default`] unless one is passed to [`allocate_in()`], and releases its
/// memory through that same instance.
///
/// # Safety
///
/// Implementations must satisfy the following:
///
/// - Memory returned by [`allocate()`] must be valid for reads and writes of
///   `byte_count` bytes and aligned to at least [`ALIGNMENT`] bytes.
/// - Memory must remain valid until passed back to [`deallocate()`] on the
///   same allocator instance (or a clone of it) with the same byte count.
///
/// [`allocate()`]: #tymethod.allocate
/// [`allocate_in()`]: struct.MemoryRegion.html#method.allocate_in
/// [`ALIGNMENT`]: #associatedconstant.ALIGNMENT
/// [`deallocate()`]: #tymethod.deallocate
/// [`Default`]: https://doc.rust-lang.org/core/default/trait.Default.html
/// [`MemoryRegion`]: struct.MemoryRegion.html
pub unsafe trait ByteAllocator: Clone + Default {
    /// Minimum alignment, in bytes, of all memory returned by
    /// [`allocate()`](#tymethod.allocate).
    const ALIGNMENT: usize;

    /// Allocates `byte_count` bytes, returning `None` if the memory could
    /// not be provided. `byte_count` is never zero.
    fn allocate(&self, byte_count: usize) -> Option<NonNull<u8>>;

    /// Releases memory previously returned by
    /// [`allocate()`](#tymethod.allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by a call to `allocate()` on this
    /// allocator with the same `byte_count`, and must not have been released
    /// already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, byte_count: usize);
}
