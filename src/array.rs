// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `ArrayView` sizing and element access.

use core::ops::{Index, IndexMut};

use super::error::{NULL_DEREFERENCE, OVERFLOW};
use super::{
    aligned_size_of, ByteAllocator, ByteData, Cursor, CursorMut, Direction,
    Error, Heap, Iter, IterMut, MemoryRegion, Sizing, View,
};

/// [`Sizing`] strategy for sequences: `n` elements occupy `n` times the
/// aligned element size.
///
/// [`Sizing`]: trait.Sizing.html
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Array;

impl<T> Sizing<T> for Array
where
    T: ByteData,
{
    #[inline]
    fn byte_size(count: usize) -> Result<usize, Error> {
        count.checked_mul(aligned_size_of::<T>()).ok_or(OVERFLOW)
    }

    #[inline]
    fn count(byte_size: usize) -> usize {
        byte_size / aligned_size_of::<T>()
    }
}

/// View of a region as a sequence of `T` elements, sized in elements
/// instead of bytes.
///
/// # Examples
///
/// ```
/// use memregion::{ArrayView, ErrorKind};
///
/// let mut array = ArrayView::<u16>::with_len(3).unwrap();
/// assert_eq!(array.byte_size(), 6);
///
/// array.copy_slice(&[7, 8], 1).unwrap();
/// assert_eq!(array.as_slice().unwrap(), &[0, 7, 8]);
///
/// array.reallocate(4).unwrap();
/// array[3] = 9;
/// assert_eq!(array.as_slice().unwrap(), &[0, 7, 8, 9]);
///
/// let error = array.allocate(0).unwrap_err();
/// assert_eq!(error.kind(), ErrorKind::InvalidSize);
/// ```
pub type ArrayView<'a, T, A = Heap> = View<'a, T, Array, A>;

impl<'a, T, A> View<'a, T, Array, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Creates a view owning `len` zero-initialized elements.
    ///
    /// A `len` of zero creates an empty view.
    #[inline]
    pub fn with_len(len: usize) -> Result<Self, Error> {
        Self::with_count(len)
    }

    /// Creates a const view borrowing the contents of a slice.
    #[inline]
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self::from_region(MemoryRegion::from_slice(slice))
    }

    /// Creates a mutable view borrowing the contents of a slice.
    #[inline]
    pub fn from_mut_slice(slice: &'a mut [T]) -> Self {
        Self::from_region(MemoryRegion::from_mut_slice(slice))
    }

    /// Creates a mutable view borrowing `len` elements at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` elements for the
    /// lifetime `'a`; see [`MemoryRegion::from_raw_parts()`].
    ///
    /// [`MemoryRegion::from_raw_parts()`]: struct.MemoryRegion.html#method.from_raw_parts
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Result<Self, Error> {
        let mut view = Self::new();
        view.set(ptr, len)?;
        Ok(view)
    }

    /// Returns the number of whole elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.count()
    }

    /// Returns `true` if the view holds no whole elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates `len` zero-initialized elements, releasing any memory
    /// currently owned by the view.
    #[inline]
    pub fn allocate(&mut self, len: usize) -> Result<(), Error> {
        self.allocate_count(len)
    }

    /// Changes the number of elements in the view, preserving existing
    /// elements and zero-initializing any new ones.
    #[inline]
    pub fn reallocate(&mut self, len: usize) -> Result<(), Error> {
        self.reallocate_count(len)
    }

    /// Changes the number of elements in the view.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::resize()`].
    ///
    /// [`MemoryRegion::resize()`]: struct.MemoryRegion.html#method.resize
    #[inline]
    pub unsafe fn resize(&mut self, len: usize) -> Result<(), Error> {
        self.resize_count(len)
    }

    /// Makes the view borrow `len` elements at `ptr` mutably.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::set()`].
    ///
    /// [`MemoryRegion::set()`]: struct.MemoryRegion.html#method.set
    #[inline]
    pub unsafe fn set(&mut self, ptr: *mut T, len: usize) -> Result<(), Error> {
        self.set_count(ptr, len)
    }

    /// Makes the view borrow `len` elements at `ptr` as const.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::set_const()`].
    ///
    /// [`MemoryRegion::set_const()`]: struct.MemoryRegion.html#method.set_const
    #[inline]
    pub unsafe fn set_const(
        &mut self,
        ptr: *const T,
        len: usize,
    ) -> Result<(), Error> {
        self.set_const_count(ptr, len)
    }

    /// Replaces the view contents with an owned copy of `len` elements read
    /// from `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `len` elements.
    #[inline]
    pub unsafe fn clone_raw(
        &mut self,
        src: *const T,
        len: usize,
    ) -> Result<(), Error> {
        self.clone_count(src, len)
    }

    /// Replaces the view contents with an owned copy of a slice.
    #[inline]
    pub fn clone_slice(&mut self, src: &[T]) -> Result<(), Error> {
        unsafe { self.clone_raw(src.as_ptr(), src.len()) }
    }

    /// Replaces the view contents with an owned copy of the elements of
    /// another view.
    pub fn clone_view<B>(
        &mut self,
        other: &ArrayView<'_, T, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.clone_raw(other.as_ptr(), other.len()) }
    }

    /// Overwrites `len` elements starting at element `index` with elements
    /// read from `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `len` elements.
    pub unsafe fn copy_raw(
        &mut self,
        src: *const T,
        len: usize,
        index: usize,
    ) -> Result<(), Error> {
        let byte_size = <Array as Sizing<T>>::byte_size(len)?;
        let offset = <Array as Sizing<T>>::byte_size(index)?;
        self.region.copy_raw(src.cast::<u8>(), byte_size, offset, true)
    }

    /// Overwrites elements starting at `index` with the contents of a
    /// slice.
    #[inline]
    pub fn copy_slice(&mut self, src: &[T], index: usize) -> Result<(), Error> {
        unsafe { self.copy_raw(src.as_ptr(), src.len(), index) }
    }

    /// Overwrites elements starting at `index` with the elements of another
    /// view.
    pub fn copy_view<B>(
        &mut self,
        other: &ArrayView<'_, T, B>,
        index: usize,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.copy_raw(other.as_ptr(), other.len(), index) }
    }

    /// Returns a reference to the element at `index`.
    #[inline]
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        self.region.at(index)
    }

    /// Returns a mutable reference to the element at `index`.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        self.region.at_mut(index)
    }

    /// Reads a copy of the element at `index`, which does not need to be
    /// aligned.
    #[inline]
    pub fn read(&self, index: usize) -> Result<T, Error> {
        self.region.read(index)
    }

    /// Overwrites the element at `index`, which does not need to be
    /// aligned.
    #[inline]
    pub fn write(&mut self, index: usize, value: T) -> Result<(), Error> {
        self.region.write(index, value)
    }

    /// Returns a reference to the first element.
    #[inline]
    pub fn first(&self) -> Result<&T, Error> {
        self.region.first()
    }

    /// Returns a reference to the last element.
    #[inline]
    pub fn last(&self) -> Result<&T, Error> {
        self.region.last()
    }

    /// Returns the byte offset of the element at `index`.
    #[inline]
    pub fn offset_of(&self, index: usize) -> Result<usize, Error> {
        self.region.offset_of(index)
    }

    /// Returns the index of the element containing the byte at `offset`.
    #[inline]
    pub fn index_of(&self, offset: usize) -> Result<usize, Error> {
        self.region.index_of(offset)
    }

    /// Returns the elements of the view as a slice.
    #[inline]
    pub fn as_slice(&self) -> Result<&[T], Error> {
        self.region.as_slice()
    }

    /// Returns the elements of the view as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], Error> {
        self.region.as_mut_slice()
    }

    /// Returns an iterator over the elements of the view.
    #[inline]
    pub fn iter(&self) -> Result<Iter<'_, T>, Error> {
        self.region.iter()
    }

    /// Returns an iterator over mutable references to the elements of the
    /// view.
    #[inline]
    pub fn iter_mut(&mut self) -> Result<IterMut<'_, T>, Error> {
        self.region.iter_mut()
    }

    /// Returns a read-only cursor over the elements of the view.
    #[inline]
    pub fn cursor(&self, direction: Direction) -> Result<Cursor<'_, T>, Error> {
        self.region.cursor(direction)
    }

    /// Returns a mutable cursor over the elements of the view.
    #[inline]
    pub fn cursor_mut(
        &mut self,
        direction: Direction,
    ) -> Result<CursorMut<'_, T>, Error> {
        self.region.cursor_mut(direction)
    }
}

/// Panics with the error description if the element cannot be accessed.
impl<'a, T, A> Index<usize> for View<'a, T, Array, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        match self.at(index) {
            Ok(element) => element,
            Err(error) => panic!("array index {}: {}", index, error),
        }
    }
}

impl<'a, T, A> IndexMut<usize> for View<'a, T, Array, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.at_mut(index) {
            Ok(element) => element,
            Err(error) => panic!("array index {}: {}", index, error),
        }
    }
}
