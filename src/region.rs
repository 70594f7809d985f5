// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `MemoryRegion` type implementation.

use core::cmp::{self, Ordering};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::{self, align_of, size_of};
use core::ptr::{self, NonNull};
use core::slice;

use log::{debug, trace};

use super::error::{
    ALLOCATION_FAILED, CONST_VIOLATION, MISALIGNED, NOT_OWNED,
    NULL_DEREFERENCE, OUT_OF_BOUNDS, OVERFLOW, UNDERSIZED, ZERO_SIZE,
};
use super::{aligned_size_of, is_aligned, ByteAllocator, ByteData, Error, Heap};

/// Base address of a region, tagged with the kind of access it was
/// obtained with.
pub(crate) enum Location<T> {
    Mutable(*mut T),
    Const(*const T),
}

impl<T> Clone for Location<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Location<T> {}

impl<T> Location<T> {
    #[inline]
    fn null() -> Self {
        Location::Mutable(ptr::null_mut())
    }

    #[inline]
    pub(crate) fn as_ptr(self) -> *const T {
        match self {
            Location::Mutable(ptr) => ptr as *const T,
            Location::Const(ptr) => ptr,
        }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(self) -> Option<*mut T> {
        match self {
            Location::Mutable(ptr) => Some(ptr),
            Location::Const(_) => None,
        }
    }

    #[inline]
    fn is_const(self) -> bool {
        match self {
            Location::Mutable(_) => false,
            Location::Const(_) => true,
        }
    }

    #[inline]
    fn into_const(self) -> Self {
        Location::Const(self.as_ptr())
    }

    /// Location `offset` bytes past this one, reinterpreted as `U` and
    /// keeping the same tag. Bounds are the caller's responsibility.
    #[inline]
    fn offset_cast<U>(self, offset: usize) -> Location<U> {
        match self {
            Location::Mutable(ptr) => Location::Mutable(
                ptr.cast::<u8>().wrapping_add(offset).cast::<U>(),
            ),
            Location::Const(ptr) => Location::Const(
                ptr.cast::<u8>().wrapping_add(offset).cast::<U>(),
            ),
        }
    }
}

/// Ownership state of a [`MemoryRegion`].
///
/// [`MemoryRegion`]: struct.MemoryRegion.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// No memory is referenced.
    Empty,
    /// Memory is referenced but not owned, and is never released by the
    /// region.
    Borrowed,
    /// Memory was allocated by the region and is released when the region
    /// is dropped or deallocated.
    Owned,
}

/// Handle to a contiguous span of memory interpreted as elements of type
/// `T`.
///
/// A region either owns its memory, allocated through the allocator `A` and
/// released exactly once, or borrows memory it must never release. The
/// lifetime `'a` bounds how long borrowed memory stays valid; owned regions
/// are not tied to it.
///
/// Each region also records whether it was created from a mutable or a const
/// pointer. Mutable access to a const region is reported as
/// [`ErrorKind::ConstViolation`] instead of being silently allowed.
///
/// Elements are addressed using the aligned element size of `T` (its size
/// rounded up to its alignment) as the stride, and the byte size of the
/// region does not have to be a multiple of that stride. All element access
/// is bounds-checked.
///
/// # Examples
///
/// ```
/// use memregion::{ErrorKind, MemoryRegion, State};
///
/// // Owned region of four `u32` values, zero-initialized.
/// let mut region: MemoryRegion<u32> = MemoryRegion::new();
/// region.allocate(16).unwrap();
/// assert_eq!(region.state(), State::Owned);
/// assert_eq!(region.element_count(), 4);
/// assert_eq!(*region.at(3).unwrap(), 0);
///
/// *region.at_mut(1).unwrap() = 0xC0FFEE;
/// assert_eq!(region.read(1).unwrap(), 0xC0FFEE);
/// assert_eq!(region.at(4).unwrap_err().kind(), ErrorKind::OutOfBounds);
///
/// // Borrowed, read-only view of some existing data.
/// let data = [1u32, 2, 3];
/// let borrowed: MemoryRegion<u32> = MemoryRegion::from_slice(&data);
/// assert_eq!(borrowed.state(), State::Borrowed);
/// assert!(borrowed.is_const());
/// assert_eq!(*borrowed.last().unwrap(), 3);
/// ```
///
/// [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
pub struct MemoryRegion<'a, T, A = Heap>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Base address of the region memory.
    location: Location<T>,
    /// Number of bytes addressable from `location`.
    byte_size: usize,
    /// Allocator that provided `location`, if the memory is owned.
    owner: Option<A>,
    /// Validity of borrowed memory.
    _lifetime: PhantomData<&'a mut [T]>,
}

impl<'a, T, A> MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Size of a single `T`, in bytes.
    pub const TYPE_SIZE: usize = size_of::<T>();

    /// Alignment of `T`, in bytes.
    pub const TYPE_ALIGN: usize = align_of::<T>();

    /// Stride between consecutive elements, in bytes.
    pub const ALIGNED_SIZE: usize = aligned_size_of::<T>();

    /// Element layout requirements, checked once per element and allocator
    /// type.
    const LAYOUT_CHECK: () = assert!(
        size_of::<T>() != 0 && align_of::<T>() <= A::ALIGNMENT,
        "region element types must be non-zero-sized and aligned no more \
         strictly than the allocator"
    );

    #[inline]
    fn from_location(
        location: Location<T>,
        byte_size: usize,
        owner: Option<A>,
    ) -> Self {
        let () = Self::LAYOUT_CHECK;

        MemoryRegion {
            location,
            byte_size,
            owner,
            _lifetime: PhantomData,
        }
    }

    /// Creates an empty region.
    #[inline]
    pub fn new() -> Self {
        Self::from_location(Location::null(), 0, None)
    }

    /// Creates a region owning a zero-filled buffer of `byte_size` bytes.
    ///
    /// A `byte_size` of zero creates an empty region.
    pub fn with_byte_size(byte_size: usize) -> Result<Self, Error> {
        let mut region = Self::new();
        if byte_size > 0 {
            region.allocate(byte_size)?;
        }

        Ok(region)
    }

    /// Creates a mutable region borrowing `byte_size` bytes at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid for reads and writes of `byte_size` bytes
    /// for the lifetime `'a`, and those bytes must not be accessed through
    /// any other reference while the region (or any alias of it) is in use.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *mut T, byte_size: usize) -> Self {
        let mut region = Self::new();
        region.adopt(Location::Mutable(ptr), byte_size);
        region
    }

    /// Creates a const region borrowing `byte_size` bytes at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid for reads of `byte_size` bytes for the
    /// lifetime `'a`, and those bytes must not be modified while the region
    /// (or any alias of it) is in use.
    #[inline]
    pub unsafe fn from_raw_parts_const(ptr: *const T, byte_size: usize) -> Self {
        let mut region = Self::new();
        region.adopt(Location::Const(ptr), byte_size);
        region
    }

    /// Creates a const region borrowing the contents of a slice.
    #[inline]
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self::from_location(
            Location::Const(slice.as_ptr()),
            mem::size_of_val(slice),
            None,
        )
    }

    /// Creates a mutable region borrowing the contents of a slice.
    #[inline]
    pub fn from_mut_slice(slice: &'a mut [T]) -> Self {
        Self::from_location(
            Location::Mutable(slice.as_mut_ptr()),
            mem::size_of_val(slice),
            None,
        )
    }

    /// Creates a const region reinterpreting a span of bytes as elements of
    /// `T`.
    ///
    /// The bytes do not need to be aligned for `T`; reference-returning
    /// accessors check the alignment of each element, while [`read()`]
    /// supports unaligned elements.
    ///
    /// [`read()`]: #method.read
    #[inline]
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::from_location(
            Location::Const(bytes.as_ptr().cast::<T>()),
            bytes.len(),
            None,
        )
    }

    /// Creates a mutable region reinterpreting a span of bytes as elements
    /// of `T`.
    #[inline]
    pub fn from_bytes_mut(bytes: &'a mut [u8]) -> Self {
        Self::from_location(
            Location::Mutable(bytes.as_mut_ptr().cast::<T>()),
            bytes.len(),
            None,
        )
    }

    /// Returns the number of bytes addressable by the region.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Returns the stride between consecutive elements, in bytes.
    #[inline]
    pub fn aligned_element_size(&self) -> usize {
        Self::ALIGNED_SIZE
    }

    /// Returns the number of whole elements that fit in the region.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.byte_size / Self::ALIGNED_SIZE
    }

    /// Returns `true` if no whole element fits in the region.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// Returns `true` if the region was created from a const pointer.
    #[inline]
    pub fn is_const(&self) -> bool {
        self.location.is_const()
    }

    /// Returns `true` if the region owns its memory.
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Returns `true` if the region base address is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.location.as_ptr().is_null()
    }

    /// Returns the ownership state of the region.
    #[inline]
    pub fn state(&self) -> State {
        if self.is_owned() {
            State::Owned
        } else if self.is_null() {
            State::Empty
        } else {
            State::Borrowed
        }
    }

    /// Returns the allocator owning the region memory, if any.
    #[inline]
    pub fn allocator(&self) -> Option<&A> {
        self.owner.as_ref()
    }

    /// Returns the base address of the region.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.location.as_ptr()
    }

    /// Returns the base address of the region for writing.
    ///
    /// Fails with [`ErrorKind::ConstViolation`] if the region is const.
    ///
    /// [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
    #[inline]
    pub fn as_mut_ptr(&mut self) -> Result<*mut T, Error> {
        self.location.as_mut_ptr().ok_or(CONST_VIOLATION)
    }

    /// Returns the address one byte past the end of the region, or null if
    /// the region is null.
    #[inline]
    pub fn end_ptr(&self) -> *const T {
        if self.is_null() {
            return ptr::null();
        }

        self.location.offset_cast::<T>(self.byte_size).as_ptr()
    }

    /// Allocates a zero-filled buffer of `byte_size` bytes using a default
    /// allocator instance.
    ///
    /// Any memory currently owned by the region is released first. Fails
    /// with [`ErrorKind::InvalidSize`] if `byte_size` is zero or less than
    /// the size of `T`.
    ///
    /// [`ErrorKind::InvalidSize`]: enum.ErrorKind.html#variant.InvalidSize
    #[inline]
    pub fn allocate(&mut self, byte_size: usize) -> Result<(), Error> {
        self.allocate_in(byte_size, A::default())
    }

    /// Allocates a zero-filled buffer of `byte_size` bytes using the given
    /// allocator, which becomes the owner of the region memory.
    pub fn allocate_in(
        &mut self,
        byte_size: usize,
        allocator: A,
    ) -> Result<(), Error> {
        Self::check_allocation_size(byte_size)?;

        self.release();

        let data = allocator.allocate(byte_size).ok_or(ALLOCATION_FAILED)?;
        unsafe { ptr::write_bytes(data.as_ptr(), 0, byte_size) };
        trace!("allocated {} bytes at {:p}", byte_size, data);

        self.location = Location::Mutable(data.as_ptr().cast::<T>());
        self.byte_size = byte_size;
        self.owner = Some(allocator);

        Ok(())
    }

    /// Releases the memory owned by the region, leaving it empty.
    ///
    /// Fails with [`ErrorKind::NotOwned`] if the region does not own its
    /// memory.
    ///
    /// [`ErrorKind::NotOwned`]: enum.ErrorKind.html#variant.NotOwned
    pub fn deallocate(&mut self) -> Result<(), Error> {
        if !self.is_owned() {
            return Err(NOT_OWNED);
        }

        self.release();
        Ok(())
    }

    /// Changes the size of the owned buffer to `byte_size` bytes.
    ///
    /// The first `min(old, new)` bytes are preserved and any added bytes are
    /// zero-filled. If the region does not own its memory, this behaves like
    /// [`allocate()`]. On failure, the current buffer is left untouched.
    ///
    /// [`allocate()`]: #method.allocate
    pub fn reallocate(&mut self, byte_size: usize) -> Result<(), Error> {
        if !self.is_owned() {
            return self.allocate(byte_size);
        }

        Self::check_allocation_size(byte_size)?;
        if byte_size == self.byte_size {
            return Ok(());
        }

        let old_size = self.byte_size;
        let old_data = self.location.as_ptr() as *mut u8;
        if let Some(ref owner) = self.owner {
            let data = owner.allocate(byte_size).ok_or(ALLOCATION_FAILED)?;
            let preserved = cmp::min(old_size, byte_size);
            unsafe {
                ptr::copy_nonoverlapping(old_data, data.as_ptr(), preserved);
                ptr::write_bytes(
                    data.as_ptr().add(preserved),
                    0,
                    byte_size - preserved,
                );
                if let Some(old_data) = NonNull::new(old_data) {
                    owner.deallocate(old_data, old_size);
                }
            }
            trace!(
                "reallocated {:p} ({} bytes) to {:p} ({} bytes)",
                old_data,
                old_size,
                data,
                byte_size,
            );

            self.location = Location::Mutable(data.as_ptr().cast::<T>());
            self.byte_size = byte_size;
        }

        Ok(())
    }

    /// Changes the recorded size of the region.
    ///
    /// Owned regions are [reallocated]. For borrowed regions, only the
    /// recorded size changes; fails with [`ErrorKind::InvalidSize`] if
    /// `byte_size` is less than the size of `T`.
    ///
    /// # Safety
    ///
    /// If the region is borrowed, the memory at the region base address
    /// must be valid for `byte_size` bytes, for reads and writes if the
    /// region is mutable, for the lifetime `'a`.
    ///
    /// [`ErrorKind::InvalidSize`]: enum.ErrorKind.html#variant.InvalidSize
    /// [reallocated]: #method.reallocate
    pub unsafe fn resize(&mut self, byte_size: usize) -> Result<(), Error> {
        if self.is_owned() {
            return self.reallocate(byte_size);
        }

        if byte_size < Self::TYPE_SIZE {
            return Err(UNDERSIZED);
        }

        self.byte_size = byte_size;
        Ok(())
    }

    /// Makes the region borrow `byte_size` bytes at `ptr` mutably.
    ///
    /// Any memory owned by the region is released first.
    ///
    /// # Safety
    ///
    /// Same as for [`from_raw_parts()`](#method.from_raw_parts).
    #[inline]
    pub unsafe fn set(&mut self, ptr: *mut T, byte_size: usize) {
        self.adopt(Location::Mutable(ptr), byte_size);
    }

    /// Makes the region borrow `byte_size` bytes at `ptr` as const.
    ///
    /// Any memory owned by the region is released first.
    ///
    /// # Safety
    ///
    /// Same as for
    /// [`from_raw_parts_const()`](#method.from_raw_parts_const).
    #[inline]
    pub unsafe fn set_const(&mut self, ptr: *const T, byte_size: usize) {
        self.adopt(Location::Const(ptr), byte_size);
    }

    /// Replaces the region contents with an owned copy of `byte_size` bytes
    /// read from `src`.
    ///
    /// The copy is fully built before any memory owned by the region is
    /// released, so `src` may point into the current region buffer.
    ///
    /// The copy is allocated from `A::default()`, not from the allocator of
    /// the current buffer. Use [`try_clone()`](#method.try_clone) to keep the
    /// allocator.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `byte_size` bytes.
    pub unsafe fn clone_raw(
        &mut self,
        src: *const T,
        byte_size: usize,
    ) -> Result<(), Error> {
        let mut clone = Self::new();
        clone.allocate(byte_size)?;
        clone.copy_raw(src.cast::<u8>(), byte_size, 0, true)?;
        *self = clone;

        Ok(())
    }

    /// Replaces the region contents with an owned copy of a span of bytes.
    #[inline]
    pub fn clone_bytes(&mut self, src: &[u8]) -> Result<(), Error> {
        unsafe { self.clone_raw(src.as_ptr().cast::<T>(), src.len()) }
    }

    /// Replaces the region contents with an owned copy of the contents of
    /// another region.
    pub fn clone_region<B>(
        &mut self,
        other: &MemoryRegion<'_, T, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.clone_raw(other.as_ptr(), other.byte_size()) }
    }

    /// Overwrites `byte_size` bytes of the region starting at `offset` with
    /// bytes read from `src`, without changing its size or ownership.
    ///
    /// Checks are performed in the following order:
    ///
    /// - [`ErrorKind::ConstViolation`] if the region is const.
    /// - [`ErrorKind::NullDereference`] if the region or `src` is null.
    /// - [`ErrorKind::Misaligned`] if `aligned` is set and `offset` is not a
    ///   multiple of the alignment of `T`.
    /// - [`ErrorKind::OutOfBounds`] if the written range extends past the
    ///   end of the region.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `byte_size` bytes. The source bytes
    /// may overlap the region.
    ///
    /// [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    /// [`ErrorKind::NullDereference`]: enum.ErrorKind.html#variant.NullDereference
    /// [`ErrorKind::OutOfBounds`]: enum.ErrorKind.html#variant.OutOfBounds
    pub unsafe fn copy_raw(
        &mut self,
        src: *const u8,
        byte_size: usize,
        offset: usize,
        aligned: bool,
    ) -> Result<(), Error> {
        let dest = self.writable_range(offset, byte_size, aligned)?;
        if src.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        ptr::copy(src, dest, byte_size);
        Ok(())
    }

    /// Overwrites part of the region starting at `offset` with a span of
    /// bytes.
    ///
    /// See [`copy_raw()`](#method.copy_raw) for the checks performed.
    #[inline]
    pub fn copy_bytes(
        &mut self,
        src: &[u8],
        offset: usize,
        aligned: bool,
    ) -> Result<(), Error> {
        unsafe { self.copy_raw(src.as_ptr(), src.len(), offset, aligned) }
    }

    /// Overwrites part of the region starting at `offset` with the contents
    /// of another region.
    pub fn copy_region<B>(
        &mut self,
        other: &MemoryRegion<'_, T, B>,
        offset: usize,
        aligned: bool,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe {
            self.copy_raw(
                other.as_ptr().cast::<u8>(),
                other.byte_size(),
                offset,
                aligned,
            )
        }
    }

    /// Returns the byte offset of the element at `index`.
    ///
    /// Fails with [`ErrorKind::OutOfBounds`] if the offset is not inside the
    /// region.
    ///
    /// [`ErrorKind::OutOfBounds`]: enum.ErrorKind.html#variant.OutOfBounds
    #[inline]
    pub fn offset_of(&self, index: usize) -> Result<usize, Error> {
        let offset = index.checked_mul(Self::ALIGNED_SIZE).ok_or(OVERFLOW)?;
        if offset >= self.byte_size {
            return Err(OUT_OF_BOUNDS);
        }

        Ok(offset)
    }

    /// Returns the index of the element containing the byte at `offset`.
    ///
    /// Fails with [`ErrorKind::OutOfBounds`] if the offset is not inside the
    /// region.
    ///
    /// [`ErrorKind::OutOfBounds`]: enum.ErrorKind.html#variant.OutOfBounds
    #[inline]
    pub fn index_of(&self, offset: usize) -> Result<usize, Error> {
        if offset >= self.byte_size {
            return Err(OUT_OF_BOUNDS);
        }

        Ok(offset / Self::ALIGNED_SIZE)
    }

    /// Returns a reference to the element at `index`.
    ///
    /// Fails with [`ErrorKind::OutOfBounds`] if `index` is not less than
    /// [`element_count()`], [`ErrorKind::NullDereference`] if the region is
    /// null, or [`ErrorKind::Misaligned`] if the element address is not
    /// aligned for `T` (possible only for borrowed memory).
    ///
    /// [`element_count()`]: #method.element_count
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    /// [`ErrorKind::NullDereference`]: enum.ErrorKind.html#variant.NullDereference
    /// [`ErrorKind::OutOfBounds`]: enum.ErrorKind.html#variant.OutOfBounds
    #[inline]
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        let location = self.aligned_element(index)?;
        Ok(unsafe { &*location.as_ptr() })
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// Fails with [`ErrorKind::ConstViolation`] if the region is const, and
    /// otherwise under the same conditions as [`at()`](#method.at).
    ///
    /// [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        if self.is_const() {
            return Err(CONST_VIOLATION);
        }

        let ptr = self
            .aligned_element(index)?
            .as_mut_ptr()
            .ok_or(CONST_VIOLATION)?;
        Ok(unsafe { &mut *ptr })
    }

    /// Reads a copy of the element at `index`, which does not need to be
    /// aligned.
    #[inline]
    pub fn read(&self, index: usize) -> Result<T, Error> {
        let location = self.element(index)?;
        Ok(unsafe { ptr::read_unaligned(location.as_ptr()) })
    }

    /// Overwrites the element at `index`, which does not need to be
    /// aligned.
    #[inline]
    pub fn write(&mut self, index: usize, value: T) -> Result<(), Error> {
        if self.is_const() {
            return Err(CONST_VIOLATION);
        }

        let ptr = self.element(index)?.as_mut_ptr().ok_or(CONST_VIOLATION)?;
        unsafe { ptr::write_unaligned(ptr, value) };
        Ok(())
    }

    /// Returns a reference to the first element.
    #[inline]
    pub fn first(&self) -> Result<&T, Error> {
        self.at(0)
    }

    /// Returns a mutable reference to the first element.
    #[inline]
    pub fn first_mut(&mut self) -> Result<&mut T, Error> {
        self.at_mut(0)
    }

    /// Returns a reference to the last whole element.
    #[inline]
    pub fn last(&self) -> Result<&T, Error> {
        let index = self.element_count().checked_sub(1).ok_or(OUT_OF_BOUNDS)?;
        self.at(index)
    }

    /// Returns a mutable reference to the last whole element.
    #[inline]
    pub fn last_mut(&mut self) -> Result<&mut T, Error> {
        let index = self.element_count().checked_sub(1).ok_or(OUT_OF_BOUNDS)?;
        self.at_mut(index)
    }

    /// Returns a borrowed, const region holding a single `U` at `offset`
    /// bytes into this region.
    ///
    /// Fails with [`ErrorKind::NullDereference`] if the region is null,
    /// [`ErrorKind::Misaligned`] if `require_aligned` is set and `offset` is
    /// not a multiple of the alignment of `T`, or
    /// [`ErrorKind::OutOfBounds`] if the aligned size of `U` does not fit
    /// in the region at `offset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memregion::{ErrorKind, MemoryRegion};
    ///
    /// let bytes = [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66];
    /// let region: MemoryRegion<u8> = MemoryRegion::from_bytes(&bytes);
    ///
    /// let half = region.view_at::<u16>(2, false).unwrap();
    /// assert_eq!(half.read(0).unwrap(), u16::from_ne_bytes([0x33, 0x44]));
    /// assert!(half.is_const());
    ///
    /// let error = region.view_at::<u32>(4, false).unwrap_err();
    /// assert_eq!(error.kind(), ErrorKind::OutOfBounds);
    /// ```
    ///
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    /// [`ErrorKind::NullDereference`]: enum.ErrorKind.html#variant.NullDereference
    /// [`ErrorKind::OutOfBounds`]: enum.ErrorKind.html#variant.OutOfBounds
    pub fn view_at<U>(
        &self,
        offset: usize,
        require_aligned: bool,
    ) -> Result<MemoryRegion<'_, U, A>, Error>
    where
        U: ByteData,
    {
        let byte_size = aligned_size_of::<U>();
        let location =
            self.sub_location::<U>(offset, byte_size, require_aligned)?;

        Ok(MemoryRegion::from_location(location.into_const(), byte_size, None))
    }

    /// Returns a borrowed region holding a single `U` at `offset` bytes into
    /// this region, inheriting the const or mutable tag of this region.
    ///
    /// See [`view_at()`](#method.view_at) for the checks performed.
    pub fn view_at_mut<U>(
        &mut self,
        offset: usize,
        require_aligned: bool,
    ) -> Result<MemoryRegion<'_, U, A>, Error>
    where
        U: ByteData,
    {
        let byte_size = aligned_size_of::<U>();
        let location =
            self.sub_location::<U>(offset, byte_size, require_aligned)?;

        Ok(MemoryRegion::from_location(location, byte_size, None))
    }

    /// Returns a borrowed, const region over `byte_size` bytes starting at
    /// `offset`, without alignment checks.
    pub(crate) fn view_range<U>(
        &self,
        offset: usize,
        byte_size: usize,
    ) -> Result<MemoryRegion<'_, U, A>, Error>
    where
        U: ByteData,
    {
        let location = self.sub_location::<U>(offset, byte_size, false)?;
        Ok(MemoryRegion::from_location(location.into_const(), byte_size, None))
    }

    /// Mutable counterpart of `view_range()`, inheriting the region tag.
    pub(crate) fn view_range_mut<U>(
        &mut self,
        offset: usize,
        byte_size: usize,
    ) -> Result<MemoryRegion<'_, U, A>, Error>
    where
        U: ByteData,
    {
        let location = self.sub_location::<U>(offset, byte_size, false)?;
        Ok(MemoryRegion::from_location(location, byte_size, None))
    }

    /// Returns a borrowed, const region reinterpreting the entire region as
    /// elements of `U`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memregion::MemoryRegion;
    ///
    /// let mut bytes: MemoryRegion<u8> = MemoryRegion::new();
    /// bytes.clone_bytes(&[1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
    ///
    /// let words = bytes.reinterpret::<u32>();
    /// assert_eq!(words.element_count(), 2);
    /// assert_eq!(words.as_ptr() as usize, bytes.as_ptr() as usize);
    /// ```
    #[inline]
    pub fn reinterpret<U>(&self) -> MemoryRegion<'_, U, A>
    where
        U: ByteData,
    {
        MemoryRegion::from_location(
            self.location.offset_cast::<U>(0).into_const(),
            self.byte_size,
            None,
        )
    }

    /// Returns a borrowed region reinterpreting the entire region as
    /// elements of `U`, inheriting the const or mutable tag of this region.
    #[inline]
    pub fn reinterpret_mut<U>(&mut self) -> MemoryRegion<'_, U, A>
    where
        U: ByteData,
    {
        MemoryRegion::from_location(
            self.location.offset_cast::<U>(0),
            self.byte_size,
            None,
        )
    }

    /// Returns a borrowed, const region aliasing the same memory.
    #[inline]
    pub fn alias(&self) -> MemoryRegion<'_, T, A> {
        MemoryRegion::from_location(
            self.location.into_const(),
            self.byte_size,
            None,
        )
    }

    /// Returns a borrowed region aliasing the same memory, inheriting the
    /// const or mutable tag of this region.
    #[inline]
    pub fn alias_mut(&mut self) -> MemoryRegion<'_, T, A> {
        MemoryRegion::from_location(self.location, self.byte_size, None)
    }

    /// Returns an owned copy of the region in a freshly allocated buffer.
    ///
    /// Null regions produce an empty region. The copy is mutable even if
    /// this region is const.
    pub fn try_clone(&self) -> Result<MemoryRegion<'static, T, A>, Error> {
        let mut clone = MemoryRegion::new();
        if self.is_null() || self.byte_size == 0 {
            return Ok(clone);
        }

        let allocator = self.owner.clone().unwrap_or_default();
        clone.allocate_in(self.byte_size, allocator)?;
        unsafe {
            ptr::copy_nonoverlapping(
                self.as_ptr().cast::<u8>(),
                clone.location.as_ptr() as *mut u8,
                self.byte_size,
            );
        }

        Ok(clone)
    }

    /// Converts the region into one that owns its memory.
    ///
    /// Owned memory is transferred without copying, while borrowed memory
    /// is copied into a new buffer as with [`try_clone()`].
    ///
    /// [`try_clone()`]: #method.try_clone
    pub fn into_owned(mut self) -> Result<MemoryRegion<'static, T, A>, Error> {
        match self.owner.take() {
            Some(owner) => {
                let location = mem::replace(&mut self.location, Location::null());
                let byte_size = mem::replace(&mut self.byte_size, 0);

                Ok(MemoryRegion::from_location(location, byte_size, Some(owner)))
            }
            None => self.try_clone(),
        }
    }

    /// Moves the region out, leaving an empty region in its place.
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::new())
    }

    /// Returns the bytes of the region.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if self.is_null() {
            return &[];
        }

        unsafe {
            slice::from_raw_parts(self.as_ptr().cast::<u8>(), self.byte_size)
        }
    }

    /// Returns the bytes of the region for writing.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8], Error> {
        let base = self.as_mut_ptr()?;
        if base.is_null() {
            return Ok(&mut []);
        }

        Ok(unsafe {
            slice::from_raw_parts_mut(base.cast::<u8>(), self.byte_size)
        })
    }

    /// Returns the whole elements of the region as a slice.
    ///
    /// Fails with [`ErrorKind::Misaligned`] if the region base address is
    /// not aligned for `T`.
    ///
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    #[inline]
    pub fn as_slice(&self) -> Result<&[T], Error> {
        let base = self.aligned_base()?;
        if base.is_null() {
            return Ok(&[]);
        }

        Ok(unsafe { slice::from_raw_parts(base, self.element_count()) })
    }

    /// Returns the whole elements of the region as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], Error> {
        let base = self.as_mut_ptr()?;
        self.aligned_base()?;
        if base.is_null() {
            return Ok(&mut []);
        }

        Ok(unsafe { slice::from_raw_parts_mut(base, self.element_count()) })
    }

    /// Base address, checked for alignment against `T`.
    #[inline]
    pub(crate) fn aligned_base(&self) -> Result<*const T, Error> {
        let base = self.as_ptr();
        if !is_aligned(base as usize, Self::TYPE_ALIGN) {
            return Err(MISALIGNED);
        }

        Ok(base)
    }

    /// Bounds- and null-checked location of the element at `index`.
    #[inline]
    fn element(&self, index: usize) -> Result<Location<T>, Error> {
        if index >= self.element_count() {
            return Err(OUT_OF_BOUNDS);
        }

        if self.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        Ok(self.location.offset_cast::<T>(index * Self::ALIGNED_SIZE))
    }

    #[inline]
    fn aligned_element(&self, index: usize) -> Result<Location<T>, Error> {
        let location = self.element(index)?;
        if !is_aligned(location.as_ptr() as usize, Self::TYPE_ALIGN) {
            return Err(MISALIGNED);
        }

        Ok(location)
    }

    fn sub_location<U>(
        &self,
        offset: usize,
        byte_size: usize,
        require_aligned: bool,
    ) -> Result<Location<U>, Error> {
        if self.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        if require_aligned && !is_aligned(offset, Self::TYPE_ALIGN) {
            return Err(MISALIGNED);
        }

        let end = offset.checked_add(byte_size).ok_or(OVERFLOW)?;
        if end > self.byte_size {
            return Err(OUT_OF_BOUNDS);
        }

        Ok(self.location.offset_cast::<U>(offset))
    }

    fn writable_range(
        &mut self,
        offset: usize,
        byte_size: usize,
        aligned: bool,
    ) -> Result<*mut u8, Error> {
        let base = self.as_mut_ptr()?;
        if base.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        if aligned && !is_aligned(offset, Self::TYPE_ALIGN) {
            return Err(MISALIGNED);
        }

        let end = offset.checked_add(byte_size).ok_or(OVERFLOW)?;
        if end > self.byte_size {
            return Err(OUT_OF_BOUNDS);
        }

        Ok(unsafe { base.cast::<u8>().add(offset) })
    }

    #[inline]
    fn check_allocation_size(byte_size: usize) -> Result<(), Error> {
        if byte_size == 0 {
            return Err(ZERO_SIZE);
        }

        if byte_size < Self::TYPE_SIZE {
            return Err(UNDERSIZED);
        }

        Ok(())
    }

    /// Switches to borrowed memory, releasing any owned buffer first.
    fn adopt(&mut self, location: Location<T>, byte_size: usize) {
        self.release();

        debug!("borrowing {} bytes at {:p}", byte_size, location.as_ptr());
        self.location = location;
        self.byte_size = byte_size;
    }

    /// Releases owned memory, if any. Borrowed regions are left unchanged.
    fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            if let Some(data) = NonNull::new(self.location.as_ptr() as *mut u8)
            {
                trace!("releasing {} bytes at {:p}", self.byte_size, data);
                unsafe { owner.deallocate(data, self.byte_size) };
            }

            self.location = Location::null();
            self.byte_size = 0;
        }
    }

    #[inline]
    fn identity(&self) -> (usize, usize, bool) {
        (self.as_ptr() as usize, self.byte_size, self.is_owned())
    }
}

impl<'a, T, A> Default for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, A> Drop for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn drop(&mut self) {
        self.release();
    }
}

/// Regions compare by identity (base address, byte size, and ownership),
/// never by contents.
impl<'a, T, A> PartialEq for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl<'a, T, A> Eq for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
}

impl<'a, T, A> PartialOrd for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Regions are ordered by base address, then byte size, then ownership
/// (borrowed before owned).
impl<'a, T, A> Ord for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl<'a, T, A> Hash for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl<'a, T, A> fmt::Debug for MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MemoryRegion {{ address: {:p}, byte_size: {}, state: {:?}, \
             const: {} }}",
            self.as_ptr(),
            self.byte_size,
            self.state(),
            self.is_const(),
        )
    }
}
