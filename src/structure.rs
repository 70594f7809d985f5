// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `StructView` implementation.

use core::slice;

use super::error::NULL_DEREFERENCE;
use super::{
    aligned_size_of, ByteAllocator, ByteData, Error, Heap, MemoryRegion, View,
};

/// Sizing marker for views holding exactly one value.
///
/// `Single` has no [`Sizing`] implementation, so views using it offer no
/// element-count operations.
///
/// [`Sizing`]: trait.Sizing.html
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Single;

/// View of a region as a single `T` value.
///
/// # Examples
///
/// ```
/// use memregion::{ByteData, StructView};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// #[repr(C)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// unsafe impl ByteData for Point {}
///
/// let mut point = StructView::<Point>::allocated().unwrap();
/// assert_eq!(point.byte_size(), 8);
/// assert_eq!(*point.get().unwrap(), Point { x: 0, y: 0 });
///
/// point.get_mut().unwrap().y = -4;
/// assert_eq!(point.read().unwrap(), Point { x: 0, y: -4 });
/// ```
pub type StructView<'a, T, A = Heap> = View<'a, T, Single, A>;

impl<'a, T, A> View<'a, T, Single, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Creates a view owning a zero-initialized value.
    #[inline]
    pub fn allocated() -> Result<Self, Error> {
        let mut view = Self::new();
        view.allocate()?;
        Ok(view)
    }

    /// Creates a const view borrowing an existing value.
    #[inline]
    pub fn from_ref(value: &'a T) -> Self {
        Self::from_region(MemoryRegion::from_slice(slice::from_ref(value)))
    }

    /// Creates a mutable view borrowing an existing value.
    #[inline]
    pub fn from_mut(value: &'a mut T) -> Self {
        Self::from_region(MemoryRegion::from_mut_slice(
            slice::from_mut(value),
        ))
    }

    /// Allocates a zero-initialized value, releasing any memory currently
    /// owned by the view.
    #[inline]
    pub fn allocate(&mut self) -> Result<(), Error> {
        self.region.allocate(aligned_size_of::<T>())
    }

    /// Makes the view borrow the value at `ptr` mutably.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::set()`].
    ///
    /// [`MemoryRegion::set()`]: struct.MemoryRegion.html#method.set
    #[inline]
    pub unsafe fn set(&mut self, ptr: *mut T) {
        self.region.set(ptr, aligned_size_of::<T>());
    }

    /// Makes the view borrow the value at `ptr` as const.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::set_const()`].
    ///
    /// [`MemoryRegion::set_const()`]: struct.MemoryRegion.html#method.set_const
    #[inline]
    pub unsafe fn set_const(&mut self, ptr: *const T) {
        self.region.set_const(ptr, aligned_size_of::<T>());
    }

    /// Replaces the view contents with an owned copy of the value at `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of one `T`.
    #[inline]
    pub unsafe fn clone_raw(&mut self, src: *const T) -> Result<(), Error> {
        self.region.clone_raw(src, aligned_size_of::<T>())
    }

    /// Replaces the view contents with an owned copy of `value`.
    #[inline]
    pub fn clone_value(&mut self, value: &T) -> Result<(), Error> {
        unsafe { self.clone_raw(value) }
    }

    /// Replaces the view contents with an owned copy of the value held by
    /// another view.
    pub fn clone_view<B>(
        &mut self,
        other: &StructView<'_, T, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.clone_raw(other.as_ptr()) }
    }

    /// Overwrites the value held by the view with the value at `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of one `T`.
    #[inline]
    pub unsafe fn copy_raw(&mut self, src: *const T) -> Result<(), Error> {
        self.region
            .copy_raw(src.cast::<u8>(), aligned_size_of::<T>(), 0, true)
    }

    /// Overwrites the value held by the view with `value`.
    #[inline]
    pub fn copy_value(&mut self, value: &T) -> Result<(), Error> {
        unsafe { self.copy_raw(value) }
    }

    /// Overwrites the value held by the view with the value held by another
    /// view.
    pub fn copy_view<B>(
        &mut self,
        other: &StructView<'_, T, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.copy_raw(other.as_ptr()) }
    }

    /// Returns a reference to the value.
    #[inline]
    pub fn get(&self) -> Result<&T, Error> {
        self.region.at(0)
    }

    /// Returns a mutable reference to the value.
    #[inline]
    pub fn get_mut(&mut self) -> Result<&mut T, Error> {
        self.region.at_mut(0)
    }

    /// Reads a copy of the value, which does not need to be aligned.
    #[inline]
    pub fn read(&self) -> Result<T, Error> {
        self.region.read(0)
    }

    /// Overwrites the value, which does not need to be aligned.
    #[inline]
    pub fn write(&mut self, value: T) -> Result<(), Error> {
        self.region.write(0, value)
    }
}
