// Copyright 2018-2021 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Element iterators and cursors for memory regions.

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use super::error::NULL_DEREFERENCE;
use super::{ByteAllocator, ByteData, Error, MemoryRegion};

/// Returns the address of the element at `index` given a base address and
/// element stride.
///
/// # Safety
///
/// `index` must refer to an element within the span at `base`.
#[inline]
unsafe fn element_at<T>(
    base: *const T,
    stride: usize,
    index: usize,
) -> *const T {
    base.cast::<u8>().add(index * stride).cast::<T>()
}

/// Direction in which a [`Cursor`] or [`CursorMut`] moves through a region.
///
/// [`Cursor`]: struct.Cursor.html
/// [`CursorMut`]: struct.CursorMut.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the first element toward the end of the region.
    Forward,
    /// From the last element toward the start of the region.
    Reverse,
}

/// Shared position tracking for cursors. `None` marks the end sentinel of
/// the direction being traveled.
#[derive(Clone, Copy, Debug)]
struct Position {
    index: Option<usize>,
    count: usize,
    direction: Direction,
}

impl Position {
    #[inline]
    fn start(count: usize, direction: Direction) -> Self {
        let index = match (count, direction) {
            (0, _) => None,
            (_, Direction::Forward) => Some(0),
            (_, Direction::Reverse) => Some(count - 1),
        };

        Position {
            index,
            count,
            direction,
        }
    }

    #[inline]
    fn current(&self) -> Result<usize, Error> {
        self.index.ok_or(NULL_DEREFERENCE)
    }

    #[inline]
    fn advance(&mut self) -> Result<(), Error> {
        let index = self.current()?;
        self.index = match self.direction {
            Direction::Forward if index + 1 < self.count => Some(index + 1),
            Direction::Reverse if index > 0 => Some(index - 1),
            _ => None,
        };

        Ok(())
    }
}

/// Iterator over shared references to the elements of a region.
///
/// Elements are visited in address order, stepping by the aligned element
/// size. Use [`rev()`] to visit them in reverse order.
///
/// [`rev()`]: https://doc.rust-lang.org/core/iter/trait.Iterator.html#method.rev
pub struct Iter<'r, T> {
    base: *const T,
    stride: usize,
    front: usize,
    back: usize,
    _marker: PhantomData<&'r T>,
}

impl<'r, T> Iterator for Iter<'r, T> {
    type Item = &'r T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let element = unsafe { &*element_at(self.base, self.stride, self.front) };
        self.front += 1;
        Some(element)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<'r, T> DoubleEndedIterator for Iter<'r, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;
        Some(unsafe { &*element_at(self.base, self.stride, self.back) })
    }
}

impl<'r, T> ExactSizeIterator for Iter<'r, T> {}

impl<'r, T> FusedIterator for Iter<'r, T> {}

impl<'r, T> Clone for Iter<'r, T> {
    #[inline]
    fn clone(&self) -> Self {
        Iter {
            base: self.base,
            stride: self.stride,
            front: self.front,
            back: self.back,
            _marker: PhantomData,
        }
    }
}

impl<'r, T> fmt::Debug for Iter<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Iter {{ remaining: {} }}", self.back - self.front)
    }
}

/// Iterator over mutable references to the elements of a region.
pub struct IterMut<'r, T> {
    base: *mut T,
    stride: usize,
    front: usize,
    back: usize,
    _marker: PhantomData<&'r mut T>,
}

impl<'r, T> Iterator for IterMut<'r, T> {
    type Item = &'r mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let element = unsafe { element_at(self.base, self.stride, self.front) };
        self.front += 1;
        Some(unsafe { &mut *(element as *mut T) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<'r, T> DoubleEndedIterator for IterMut<'r, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;
        let element = unsafe { element_at(self.base, self.stride, self.back) };
        Some(unsafe { &mut *(element as *mut T) })
    }
}

impl<'r, T> ExactSizeIterator for IterMut<'r, T> {}

impl<'r, T> FusedIterator for IterMut<'r, T> {}

impl<'r, T> fmt::Debug for IterMut<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IterMut {{ remaining: {} }}", self.back - self.front)
    }
}

/// Positional, read-only cursor over the elements of a region.
///
/// Unlike [`Iter`], a cursor reports an error instead of silently stopping:
/// both [`get()`] and [`advance()`] fail with
/// [`ErrorKind::NullDereference`] once the cursor has moved past the last
/// element in its direction, or immediately if the region holds no whole
/// elements.
///
/// # Examples
///
/// ```
/// use memregion::{Direction, ErrorKind, MemoryRegion};
///
/// let data = [1u16, 2, 3];
/// let region: MemoryRegion<u16> = MemoryRegion::from_slice(&data);
/// let mut cursor = region.cursor(Direction::Reverse).unwrap();
///
/// assert_eq!(*cursor.get().unwrap(), 3);
/// cursor.advance().unwrap();
/// cursor.advance().unwrap();
/// assert_eq!(*cursor.get().unwrap(), 1);
/// cursor.advance().unwrap();
///
/// assert!(cursor.is_end());
/// assert_eq!(cursor.get().unwrap_err().kind(), ErrorKind::NullDereference);
/// assert_eq!(cursor.advance().unwrap_err().kind(), ErrorKind::NullDereference);
/// ```
///
/// [`advance()`]: #method.advance
/// [`ErrorKind::NullDereference`]: enum.ErrorKind.html#variant.NullDereference
/// [`get()`]: #method.get
/// [`Iter`]: struct.Iter.html
pub struct Cursor<'r, T> {
    base: *const T,
    stride: usize,
    position: Position,
    _marker: PhantomData<&'r T>,
}

impl<'r, T> Cursor<'r, T> {
    /// Returns a reference to the element at the current position.
    #[inline]
    pub fn get(&self) -> Result<&'r T, Error> {
        let index = self.position.current()?;
        Ok(unsafe { &*element_at(self.base, self.stride, index) })
    }

    /// Moves to the next element in the cursor direction.
    #[inline]
    pub fn advance(&mut self) -> Result<(), Error> {
        self.position.advance()
    }

    /// Returns the index of the current element, or `None` at the end.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.position.index
    }

    /// Returns `true` if the cursor is past the last element.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.position.index.is_none()
    }

    /// Returns the direction the cursor moves in.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.position.direction
    }
}

impl<'r, T> fmt::Debug for Cursor<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cursor {{ position: {:?} }}", self.position)
    }
}

/// Positional cursor over the elements of a region allowing mutation.
///
/// Behaves the same as [`Cursor`], with additional mutable access to the
/// current element.
///
/// [`Cursor`]: struct.Cursor.html
pub struct CursorMut<'r, T> {
    base: *mut T,
    stride: usize,
    position: Position,
    _marker: PhantomData<&'r mut T>,
}

impl<'r, T> CursorMut<'r, T> {
    /// Returns a reference to the element at the current position.
    #[inline]
    pub fn get(&self) -> Result<&T, Error> {
        let index = self.position.current()?;
        Ok(unsafe { &*element_at(self.base, self.stride, index) })
    }

    /// Returns a mutable reference to the element at the current position.
    #[inline]
    pub fn get_mut(&mut self) -> Result<&mut T, Error> {
        let index = self.position.current()?;
        let element = unsafe { element_at(self.base, self.stride, index) };
        Ok(unsafe { &mut *(element as *mut T) })
    }

    /// Moves to the next element in the cursor direction.
    #[inline]
    pub fn advance(&mut self) -> Result<(), Error> {
        self.position.advance()
    }

    /// Returns the index of the current element, or `None` at the end.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.position.index
    }

    /// Returns `true` if the cursor is past the last element.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.position.index.is_none()
    }

    /// Returns the direction the cursor moves in.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.position.direction
    }
}

impl<'r, T> fmt::Debug for CursorMut<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CursorMut {{ position: {:?} }}", self.position)
    }
}

impl<'a, T, A> MemoryRegion<'a, T, A>
where
    T: ByteData,
    A: ByteAllocator,
{
    /// Number of elements reachable by iteration. Null regions have none,
    /// regardless of their recorded size.
    #[inline]
    fn iterable_count(&self) -> usize {
        if self.is_null() {
            0
        } else {
            self.element_count()
        }
    }

    /// Returns an iterator over the whole elements of the region.
    ///
    /// Fails with [`ErrorKind::Misaligned`] if the region base address is
    /// not aligned for `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use memregion::MemoryRegion;
    ///
    /// let data = [10u32, 20, 30];
    /// let region: MemoryRegion<u32> = MemoryRegion::from_slice(&data);
    ///
    /// let forward: Vec<u32> = region.iter().unwrap().copied().collect();
    /// assert_eq!(forward, [10, 20, 30]);
    ///
    /// let reverse: Vec<u32> = region.iter().unwrap().rev().copied().collect();
    /// assert_eq!(reverse, [30, 20, 10]);
    /// ```
    ///
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    #[inline]
    pub fn iter(&self) -> Result<Iter<'_, T>, Error> {
        let base = self.aligned_base()?;

        Ok(Iter {
            base,
            stride: Self::ALIGNED_SIZE,
            front: 0,
            back: self.iterable_count(),
            _marker: PhantomData,
        })
    }

    /// Returns an iterator over mutable references to the whole elements of
    /// the region.
    ///
    /// Fails with [`ErrorKind::ConstViolation`] if the region is const, or
    /// [`ErrorKind::Misaligned`] if its base address is not aligned for `T`.
    ///
    /// [`ErrorKind::ConstViolation`]: enum.ErrorKind.html#variant.ConstViolation
    /// [`ErrorKind::Misaligned`]: enum.ErrorKind.html#variant.Misaligned
    #[inline]
    pub fn iter_mut(&mut self) -> Result<IterMut<'_, T>, Error> {
        let base = self.as_mut_ptr()?;
        self.aligned_base()?;

        Ok(IterMut {
            base,
            stride: Self::ALIGNED_SIZE,
            front: 0,
            back: self.iterable_count(),
            _marker: PhantomData,
        })
    }

    /// Returns a read-only cursor starting at the first element in the
    /// given direction.
    #[inline]
    pub fn cursor(&self, direction: Direction) -> Result<Cursor<'_, T>, Error> {
        let base = self.aligned_base()?;

        Ok(Cursor {
            base,
            stride: Self::ALIGNED_SIZE,
            position: Position::start(self.iterable_count(), direction),
            _marker: PhantomData,
        })
    }

    /// Returns a mutable cursor starting at the first element in the given
    /// direction.
    #[inline]
    pub fn cursor_mut(
        &mut self,
        direction: Direction,
    ) -> Result<CursorMut<'_, T>, Error> {
        let base = self.as_mut_ptr()?;
        self.aligned_base()?;

        Ok(CursorMut {
            base,
            stride: Self::ALIGNED_SIZE,
            position: Position::start(self.iterable_count(), direction),
            _marker: PhantomData,
        })
    }
}
