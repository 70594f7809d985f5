// Copyright 2018-2021 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Owned or borrowed handles to typed memory regions with checked,
//! alignment-aware access.
//!
//! # Table of Contents
//!
//! - [Overview](#overview)
//! - [Crate Features](#crate-features)
//! - [Examples](#examples)
//! - [Ownership and Mutability](#ownership-and-mutability)
//! - [Data Alignment](#data-alignment)
//! - [Views](#views)
//! - [Logging](#logging)
//!
//! # Overview
//!
//! [`MemoryRegion`] is a handle to a contiguous span of bytes interpreted as
//! a run of elements of some [`ByteData`] type. A region either owns a
//! buffer it allocated itself, releasing it when dropped, or borrows memory
//! owned elsewhere, such as a slice, a stack value, or a byte span received
//! from foreign code.
//!
//! Every operation that could read or write outside the region, dereference
//! a null base address, access misaligned data, or write through memory
//! borrowed as const is checked, and reports an [`Error`] instead of
//! invoking undefined behavior. Errors carry an [`ErrorKind`] that can be
//! matched on by callers.
//!
//! Some cases for which [`MemoryRegion`] can be useful include:
//!
//! - **Binary record handling.** Packets, file headers, and other records
//!   with a fixed layout can be viewed in place through [`StructView`],
//!   while records ending in a variable-length array can be handled with
//!   [`FlexibleView`].
//! - **Foreign buffers.** Memory handed over by a C library can be wrapped
//!   as a borrowed region, giving bounds- and alignment-checked access
//!   without copying it first.
//! - **Reinterpretation.** The same bytes can be viewed as several element
//!   types at once, such as a run of `u32` words and the bytes they are
//!   made of.
//!
//! # Crate Features
//!
//! The following optional features can be set when building this crate:
//!
//! - **`std`**: Implements [`std::error::Error`] for [`Error`]. Enabled by
//!   default; can be disabled to build the crate with `#![no_std]`. The
//!   [`Heap`] allocator only depends on the `alloc` library, so it remains
//!   available without `std`.
//!
//! # Examples
//!
//! ```
//! use memregion::{ByteData, ErrorKind, MemoryRegion, StructView};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! #[repr(C)]
//! struct Record {
//!     id: u16,
//!     flags: u16,
//!     value: u32,
//! }
//!
//! unsafe impl ByteData for Record {}
//!
//! // Allocate room for two records. Allocated memory is zero-filled.
//! let mut records: MemoryRegion<Record> = MemoryRegion::new();
//! records.allocate(16).unwrap();
//! assert_eq!(records.element_count(), 2);
//!
//! records.at_mut(1).unwrap().value = 0xDEAD_BEEF;
//! assert_eq!(records.at(1).unwrap().value, 0xDEAD_BEEF);
//! assert_eq!(records.at(2).unwrap_err().kind(), ErrorKind::OutOfBounds);
//!
//! // View the second record on its own, and its bytes as `u32` words.
//! let second = StructView::from_region(
//!     records.view_at::<Record>(8, true).unwrap(),
//! );
//! assert_eq!(second.read().unwrap().value, 0xDEAD_BEEF);
//! assert!(second.is_const());
//!
//! let words = records.reinterpret::<u32>();
//! assert_eq!(words.element_count(), 4);
//! assert_eq!(words.read(3).unwrap(), 0xDEAD_BEEF);
//! ```
//!
//! # Ownership and Mutability
//!
//! Each region is in one of three [`State`]s: empty, borrowed, or owned. Only
//! owned regions release memory, either when dropped or through
//! [`deallocate()`]. Calling [`deallocate()`] on a borrowed region fails with
//! [`ErrorKind::NotOwned`].
//!
//! Borrowed regions carry the lifetime `'a` of the memory they borrow.
//! Regions created from shared slices or references are tagged as const,
//! and any attempt to write through them fails with
//! [`ErrorKind::ConstViolation`]. Regions created from mutable references
//! can be written to.
//!
//! Regions can also borrow each other:
//!
//! - [`alias()`] and [`view_at()`] borrow the parent region immutably and
//!   always produce const regions.
//! - [`alias_mut()`] and [`view_at_mut()`] borrow the parent region mutably
//!   and inherit its const or mutable tag.
//!
//! Regions cannot be implicitly cloned. [`try_clone()`] creates an owned deep
//! copy in a new buffer, while [`take()`] moves a region out and leaves an
//! empty one behind.
//!
//! Regions can also be pointed at raw memory using unsafe methods such as
//! [`set()`] and [`from_raw_parts()`], in which case the caller is
//! responsible for the validity of the memory for the lifetime of the
//! region.
//!
//! # Data Alignment
//!
//! Elements are laid out with a stride of [`aligned_size_of()`], the size of
//! the element type rounded up to its alignment. Allocated buffers are
//! aligned to the alignment provided by the [`ByteAllocator`], which is
//! [`CACHE_ALIGNMENT`] (64 bytes) for the default [`Heap`] allocator.
//!
//! Accessors returning references, such as [`at()`] and iterators, check
//! that the element address is aligned for its type and fail with
//! [`ErrorKind::Misaligned`] otherwise. [`read()`] and [`write()`] copy
//! elements by value and work at any address, which makes them the right
//! choice for borrowed foreign data with no alignment guarantees.
//!
//! # Views
//!
//! [`View`] wraps a region and expresses its size in logical elements
//! instead of bytes. Three sizing strategies are provided:
//!
//! - [`ArrayView`]: `n` elements of `T`.
//! - [`StructView`]: exactly one `T`.
//! - [`FlexibleView`]: a `T` header followed by a variable number of
//!   trailing elements, matching C structs ending in a flexible array
//!   member.
//!
//! # Logging
//!
//! Allocation, reallocation, and release of buffers are logged at the
//! `trace` level, and borrowing of existing memory at the `debug` level,
//! using the [`log`] crate facade. No output is produced unless the
//! application installs a logger.
//!
//! [`alias()`]: struct.MemoryRegion.html#method.alias
//! [`alias_mut()`]: struct.MemoryRegion.html#method.alias_mut
//! [`aligned_size_of()`]: fn.aligned_size_of.html
//! [`ArrayView`]: type.ArrayView.html
//! [`at()`]: struct.MemoryRegion.html#method.at
//! [`ByteAllocator`]: trait.ByteAllocator.html
//! [`ByteData`]: trait.ByteData.html
//! [`CACHE_ALIGNMENT`]: constant.CACHE_ALIGNMENT.html
//! [`deallocate()`]: struct.MemoryRegion.html#method.deallocate
//! [`Error`]: struct.Error.html
//! [`ErrorKind`]: enum.ErrorKind.html
//! [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
//! [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
//! [`ErrorKind::NotOwned`]: enum.ErrorKind.html#variant.NotOwned
//! [`FlexibleView`]: type.FlexibleView.html
//! [`from_raw_parts()`]: struct.MemoryRegion.html#method.from_raw_parts
//! [`Heap`]: struct.Heap.html
//! [`log`]: https://docs.rs/log
//! [`MemoryRegion`]: struct.MemoryRegion.html
//! [`read()`]: struct.MemoryRegion.html#method.read
//! [`set()`]: struct.MemoryRegion.html#method.set
//! [`State`]: enum.State.html
//! [`std::error::Error`]: https://doc.rust-lang.org/std/error/trait.Error.html
//! [`StructView`]: type.StructView.html
//! [`take()`]: struct.MemoryRegion.html#method.take
//! [`try_clone()`]: struct.MemoryRegion.html#method.try_clone
//! [`View`]: struct.View.html
//! [`view_at()`]: struct.MemoryRegion.html#method.view_at
//! [`view_at_mut()`]: struct.MemoryRegion.html#method.view_at_mut
//! [`write()`]: struct.MemoryRegion.html#method.write

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod allocator;
mod array;
mod error;
mod flexible;
mod iter;
mod region;
mod structure;
mod traits;
mod utility;
mod view;

pub use self::allocator::Heap;
pub use self::array::{Array, ArrayView};
pub use self::error::{Error, ErrorKind};
pub use self::flexible::{Flexible, FlexibleView};
pub use self::iter::{Cursor, CursorMut, Direction, Iter, IterMut};
pub use self::region::{MemoryRegion, State};
pub use self::structure::{Single, StructView};
pub use self::traits::{ByteAllocator, ByteData};
pub use self::utility::{
    align_up, aligned_size_of, is_aligned, CacheAligned, CACHE_ALIGNMENT,
};
pub use self::view::{Sizing, View};

#[cfg(all(test, feature = "std"))]
mod tests;
