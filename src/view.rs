// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sizing-policy views over memory regions.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use super::{ByteAllocator, ByteData, Error, Heap, MemoryRegion, State};

/// Strategy mapping a logical element count onto the byte size of a region
/// holding elements of type `T`.
///
/// Views forward every memory operation to their underlying
/// [`MemoryRegion`], using the sizing strategy only to translate between
/// element counts and byte sizes.
///
/// [`MemoryRegion`]: struct.MemoryRegion.html
pub trait Sizing<T>
where
    T: ByteData,
{
    /// Returns the number of bytes needed for `count` logical elements.
    fn byte_size(count: usize) -> Result<usize, Error>;

    /// Returns the number of logical elements held in `byte_size` bytes.
    fn count(byte_size: usize) -> usize;
}

/// [`MemoryRegion`] wrapper whose sizing operations are expressed in
/// logical elements as defined by the sizing strategy `S`.
///
/// The following aliases cover the supported strategies:
///
/// - [`ArrayView`]: sequence of `T` elements.
/// - [`StructView`]: single `T` value.
/// - [`FlexibleView`]: `T` header followed by a variable-length run of
///   trailing elements.
///
/// [`ArrayView`]: type.ArrayView.html
/// [`FlexibleView`]: type.FlexibleView.html
/// [`MemoryRegion`]: struct.MemoryRegion.html
/// [`StructView`]: type.StructView.html
pub struct View<'a, T, S, A = Heap>
where
    T: ByteData,
    A: ByteAllocator,
{
    pub(crate) region: MemoryRegion<'a, T, A>,
    _sizing: PhantomData<fn() -> S>,
}

impl<'a, T, S, A> View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Creates an empty view.
    #[inline]
    pub fn new() -> Self {
        Self::from_region(MemoryRegion::new())
    }

    /// Creates a view over an existing region.
    #[inline]
    pub fn from_region(region: MemoryRegion<'a, T, A>) -> Self {
        View {
            region,
            _sizing: PhantomData,
        }
    }

    /// Returns the underlying region.
    #[inline]
    pub fn as_region(&self) -> &MemoryRegion<'a, T, A> {
        &self.region
    }

    /// Consumes the view, returning the underlying region.
    #[inline]
    pub fn into_region(self) -> MemoryRegion<'a, T, A> {
        self.region
    }

    /// Returns the number of bytes addressable by the view.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.region.byte_size()
    }

    /// Returns `true` if the view was created from a const pointer.
    #[inline]
    pub fn is_const(&self) -> bool {
        self.region.is_const()
    }

    /// Returns `true` if the view owns its memory.
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.region.is_owned()
    }

    /// Returns `true` if the view base address is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.region.is_null()
    }

    /// Returns the ownership state of the view.
    #[inline]
    pub fn state(&self) -> State {
        self.region.state()
    }

    /// Returns the base address of the view.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.region.as_ptr()
    }

    /// Returns the base address of the view for writing.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> Result<*mut T, Error> {
        self.region.as_mut_ptr()
    }

    /// Returns the bytes of the view.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.region.as_bytes()
    }

    /// Returns the bytes of the view for writing.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8], Error> {
        self.region.as_bytes_mut()
    }

    /// Releases the memory owned by the view, leaving it empty.
    #[inline]
    pub fn deallocate(&mut self) -> Result<(), Error> {
        self.region.deallocate()
    }

    /// Returns an owned copy of the view in a freshly allocated buffer.
    #[inline]
    pub fn try_clone(&self) -> Result<View<'static, T, S, A>, Error> {
        self.region.try_clone().map(View::from_region)
    }

    /// Converts the view into one that owns its memory, copying borrowed
    /// memory if needed.
    #[inline]
    pub fn into_owned(self) -> Result<View<'static, T, S, A>, Error> {
        self.region.into_owned().map(View::from_region)
    }

    /// Returns a borrowed, const view aliasing the same memory.
    #[inline]
    pub fn alias(&self) -> View<'_, T, S, A> {
        View::from_region(self.region.alias())
    }

    /// Returns a borrowed view aliasing the same memory, inheriting the
    /// const or mutable tag of this view.
    #[inline]
    pub fn alias_mut(&mut self) -> View<'_, T, S, A> {
        View::from_region(self.region.alias_mut())
    }

    /// Moves the view out, leaving an empty view in its place.
    #[inline]
    pub fn take(&mut self) -> Self {
        View::from_region(self.region.take())
    }
}

/// Count-based operations shared by views with a [`Sizing`] strategy.
///
/// [`Sizing`]: trait.Sizing.html
impl<'a, T, S, A> View<'a, T, S, A>
where
    T: ByteData,
    S: Sizing<T>,
    A: ByteAllocator,
{
    #[inline]
    pub(crate) fn with_count(count: usize) -> Result<Self, Error> {
        let mut view = Self::new();
        if count > 0 {
            view.allocate_count(count)?;
        }

        Ok(view)
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        S::count(self.region.byte_size())
    }

    #[inline]
    pub(crate) fn allocate_count(&mut self, count: usize) -> Result<(), Error> {
        self.region.allocate(S::byte_size(count)?)
    }

    #[inline]
    pub(crate) fn reallocate_count(
        &mut self,
        count: usize,
    ) -> Result<(), Error> {
        self.region.reallocate(S::byte_size(count)?)
    }

    #[inline]
    pub(crate) unsafe fn resize_count(
        &mut self,
        count: usize,
    ) -> Result<(), Error> {
        self.region.resize(S::byte_size(count)?)
    }

    #[inline]
    pub(crate) unsafe fn set_count(
        &mut self,
        ptr: *mut T,
        count: usize,
    ) -> Result<(), Error> {
        self.region.set(ptr, S::byte_size(count)?);
        Ok(())
    }

    #[inline]
    pub(crate) unsafe fn set_const_count(
        &mut self,
        ptr: *const T,
        count: usize,
    ) -> Result<(), Error> {
        self.region.set_const(ptr, S::byte_size(count)?);
        Ok(())
    }

    #[inline]
    pub(crate) unsafe fn clone_count(
        &mut self,
        src: *const T,
        count: usize,
    ) -> Result<(), Error> {
        self.region.clone_raw(src, S::byte_size(count)?)
    }
}

impl<'a, T, S, A> Default for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, S, A> PartialEq for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.region == other.region
    }
}

impl<'a, T, S, A> Eq for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
}

impl<'a, T, S, A> PartialOrd for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a, T, S, A> Ord for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.region.cmp(&other.region)
    }
}

impl<'a, T, S, A> Hash for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.region.hash(state);
    }
}

impl<'a, T, S, A> fmt::Debug for View<'a, T, S, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "View {{ region: {:?} }}", self.region)
    }
}
