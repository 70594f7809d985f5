// Copyright 2018-2019 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `FlexibleView` implementation.

use core::marker::PhantomData;
use core::mem::size_of;
use core::ops::{Index, IndexMut};

use super::error::{NULL_DEREFERENCE, OVERFLOW};
use super::{
    ArrayView, ByteAllocator, ByteData, Error, ErrorKind, Heap, Sizing, View,
};

const TOO_FEW_ELEMENTS: Error = Error::new(
    ErrorKind::InvalidSize,
    "fewer trailing elements than the declared placeholder length",
);

/// [`Sizing`] strategy for a header followed by a variable-length run of
/// `F` elements.
///
/// The header type declares a placeholder array of `N` trailing elements as
/// its last field. Its size is discarded when computing the region size, so
/// that `n` trailing elements occupy `header_size + n * size_of::<F>()`
/// bytes, where `header_size = size_of::<T>() - N * size_of::<F>()`.
///
/// [`Sizing`]: trait.Sizing.html
pub struct Flexible<F, const N: usize = 1>(PhantomData<fn() -> F>);

/// Header size computation, validated at compile time.
struct FlexibleLayout<T, F, const N: usize>(PhantomData<fn() -> (T, F)>);

impl<T, F, const N: usize> FlexibleLayout<T, F, N> {
    const HEADER_SIZE: usize = {
        assert!(
            size_of::<F>() != 0 && N * size_of::<F>() <= size_of::<T>(),
            "trailing element type must be non-zero-sized and the \
             placeholder array must fit in the header type"
        );
        size_of::<T>() - N * size_of::<F>()
    };
}

impl<T, F, const N: usize> Sizing<T> for Flexible<F, N>
where
    T: ByteData,
    F: ByteData,
{
    #[inline]
    fn byte_size(count: usize) -> Result<usize, Error> {
        if count < N {
            return Err(TOO_FEW_ELEMENTS);
        }

        count
            .checked_mul(size_of::<F>())
            .and_then(|tail| {
                tail.checked_add(FlexibleLayout::<T, F, N>::HEADER_SIZE)
            })
            .ok_or(OVERFLOW)
    }

    #[inline]
    fn count(byte_size: usize) -> usize {
        byte_size.saturating_sub(FlexibleLayout::<T, F, N>::HEADER_SIZE)
            / size_of::<F>()
    }
}

/// View of a region as a `T` header followed by a variable-length run of
/// `F` elements, modeling a C flexible array member.
///
/// `N` is the length of the placeholder array declared at the end of `T`,
/// and is also the minimum number of trailing elements accepted by sizing
/// operations. Indexing the view addresses the trailing elements, not the
/// header.
///
/// # Examples
///
/// ```
/// use memregion::{ByteData, ErrorKind, FlexibleView};
///
/// #[derive(Clone, Copy)]
/// #[repr(C)]
/// struct Packet {
///     kind: u32,
///     length: u16,
///     payload: [u16; 1],
/// }
///
/// unsafe impl ByteData for Packet {}
///
/// // `Packet` is 8 bytes, of which the 2-byte placeholder is not counted.
/// let mut packet = FlexibleView::<Packet, u16>::new();
/// assert_eq!(
///     packet.allocate(0).unwrap_err().kind(),
///     ErrorKind::InvalidSize,
/// );
///
/// packet.allocate(5).unwrap();
/// assert_eq!(packet.adjusted_type_size(), 6);
/// assert_eq!(packet.byte_size(), 16);
/// assert_eq!(packet.elements(), 5);
///
/// packet.header_mut().unwrap().length = 5;
/// packet[4] = 0xABCD;
/// assert_eq!(packet.flexible_array().unwrap()[4], 0xABCD);
/// ```
pub type FlexibleView<'a, T, F, const N: usize = 1, A = Heap> =
    View<'a, T, Flexible<F, N>, A>;

impl<'a, T, F, A, const N: usize> View<'a, T, Flexible<F, N>, A>
where
    T: ByteData,
    F: ByteData,
    A: ByteAllocator,
{
    /// Creates a view owning a zero-initialized header and `elements`
    /// trailing elements.
    ///
    /// An `elements` value of zero creates an empty view.
    #[inline]
    pub fn with_elements(elements: usize) -> Result<Self, Error> {
        Self::with_count(elements)
    }

    /// Creates a mutable view borrowing a header and `elements` trailing
    /// elements at `ptr`.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::from_raw_parts()`].
    ///
    /// [`MemoryRegion::from_raw_parts()`]: struct.MemoryRegion.html#method.from_raw_parts
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        elements: usize,
    ) -> Result<Self, Error> {
        let mut view = Self::new();
        view.set(ptr, elements)?;
        Ok(view)
    }

    /// Returns the size of the header without its placeholder array, which
    /// is also the byte offset of the first trailing element.
    #[inline]
    pub fn adjusted_type_size(&self) -> usize {
        FlexibleLayout::<T, F, N>::HEADER_SIZE
    }

    /// Returns the number of trailing elements.
    #[inline]
    pub fn elements(&self) -> usize {
        self.count()
    }

    /// Allocates a zero-initialized header and `elements` trailing elements.
    ///
    /// Fails with [`ErrorKind::InvalidSize`] if `elements` is less than the
    /// placeholder length `N`.
    ///
    /// [`ErrorKind::InvalidSize`]: enum.ErrorKind.html#variant.InvalidSize
    #[inline]
    pub fn allocate(&mut self, elements: usize) -> Result<(), Error> {
        self.allocate_count(elements)
    }

    /// Changes the number of trailing elements, preserving the header and
    /// existing elements.
    #[inline]
    pub fn reallocate(&mut self, elements: usize) -> Result<(), Error> {
        self.reallocate_count(elements)
    }

    /// Changes the number of trailing elements.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::resize()`].
    ///
    /// [`MemoryRegion::resize()`]: struct.MemoryRegion.html#method.resize
    #[inline]
    pub unsafe fn resize(&mut self, elements: usize) -> Result<(), Error> {
        self.resize_count(elements)
    }

    /// Makes the view borrow a header and `elements` trailing elements at
    /// `ptr` mutably.
    ///
    /// # Safety
    ///
    /// See [`MemoryRegion::set()`].
    ///
    /// [`MemoryRegion::set()`]: struct.MemoryRegion.html#method.set
    #[inline]
    pub unsafe fn set(
        &mut self,
        ptr: *mut T,
        elements: usize,
    ) -> Result<(), Error> {
        self.set_count(ptr, elements)
    }

    /// Makes the view borrow a header and `elements` trailing elements at
    /// `ptr` as const.
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
        elements: usize,
    ) -> Result<(), Error> {
        self.set_const_count(ptr, elements)
    }

    /// Replaces the view contents with an owned copy of a header and
    /// `elements` trailing elements read from `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of the header and `elements` trailing
    /// elements.
    #[inline]
    pub unsafe fn clone_raw(
        &mut self,
        src: *const T,
        elements: usize,
    ) -> Result<(), Error> {
        self.clone_count(src, elements)
    }

    /// Replaces the view contents with an owned copy of the contents of
    /// another view.
    pub fn clone_view<B>(
        &mut self,
        other: &FlexibleView<'_, T, F, N, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.clone_raw(other.as_ptr(), other.elements()) }
    }

    /// Overwrites the header and the first `elements` trailing elements with
    /// data read from `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of the header and `elements` trailing
    /// elements.
    pub unsafe fn copy_raw(
        &mut self,
        src: *const T,
        elements: usize,
    ) -> Result<(), Error> {
        let byte_size = <Flexible<F, N> as Sizing<T>>::byte_size(elements)?;
        self.region.copy_raw(src.cast::<u8>(), byte_size, 0, true)
    }

    /// Overwrites the header and trailing elements with the contents of
    /// another view.
    pub fn copy_view<B>(
        &mut self,
        other: &FlexibleView<'_, T, F, N, B>,
    ) -> Result<(), Error>
    where
        B: ByteAllocator,
    {
        if other.is_null() {
            return Err(NULL_DEREFERENCE);
        }

        unsafe { self.copy_raw(other.as_ptr(), other.elements()) }
    }

    /// Returns a reference to the header.
    ///
    /// The placeholder array at the end of the header overlaps the first
    /// `N` trailing elements.
    #[inline]
    pub fn header(&self) -> Result<&T, Error> {
        self.region.at(0)
    }

    /// Returns a mutable reference to the header.
    #[inline]
    pub fn header_mut(&mut self) -> Result<&mut T, Error> {
        self.region.at_mut(0)
    }

    /// Returns a borrowed, const view of the trailing elements.
    #[inline]
    pub fn flexible_array(&self) -> Result<ArrayView<'_, F, A>, Error> {
        let byte_size = self.elements() * size_of::<F>();
        self.region
            .view_range::<F>(self.adjusted_type_size(), byte_size)
            .map(View::from_region)
    }

    /// Returns a borrowed view of the trailing elements, inheriting the
    /// const or mutable tag of this view.
    #[inline]
    pub fn flexible_array_mut(&mut self) -> Result<ArrayView<'_, F, A>, Error> {
        let byte_size = self.elements() * size_of::<F>();
        let offset = self.adjusted_type_size();
        self.region
            .view_range_mut::<F>(offset, byte_size)
            .map(View::from_region)
    }

    /// Returns a reference to the trailing element at `index`.
    #[inline]
    pub fn at(&self, index: usize) -> Result<&F, Error> {
        let array = self.flexible_array()?;
        let element: *const F = array.at(index)?;
        Ok(unsafe { &*element })
    }

    /// Returns a mutable reference to the trailing element at `index`.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Result<&mut F, Error> {
        let mut array = self.flexible_array_mut()?;
        let element: *mut F = array.at_mut(index)?;
        Ok(unsafe { &mut *element })
    }

    /// Reads a copy of the trailing element at `index`, which does not need
    /// to be aligned.
    #[inline]
    pub fn read(&self, index: usize) -> Result<F, Error> {
        self.flexible_array()?.read(index)
    }

    /// Overwrites the trailing element at `index`, which does not need to
    /// be aligned.
    #[inline]
    pub fn write(&mut self, index: usize, value: F) -> Result<(), Error> {
        self.flexible_array_mut()?.write(index, value)
    }
}

impl<'a, T, F, A, const N: usize> Index<usize>
    for View<'a, T, Flexible<F, N>, A>
where
    T: ByteData,
    F: ByteData,
    A: ByteAllocator,
{
    type Output = F;

    #[inline]
    fn index(&self, index: usize) -> &F {
        match self.at(index) {
            Ok(element) => element,
            Err(error) => panic!("flexible array index {}: {}", index, error),
        }
    }
}

impl<'a, T, F, A, const N: usize> IndexMut<usize>
    for View<'a, T, Flexible<F, N>, A>
where
    T: ByteData,
    F: ByteData,
    A: ByteAllocator,
{
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut F {
        match self.at_mut(index) {
            Ok(element) => element,
            Err(error) => panic!("flexible array index {}: {}", index, error),
        }
    }
}
