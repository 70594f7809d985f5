// Copyright 2018 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error support.

use core::fmt;

/// Categories of errors that can occur when working with a [`MemoryRegion`]
/// or one of its views.
///
/// [`MemoryRegion`]: struct.MemoryRegion.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested size is zero or smaller than a single element.
    InvalidSize,
    /// Operation requires a region that owns its memory.
    NotOwned,
    /// Offset or address does not satisfy the required alignment.
    Misaligned,
    /// Computed byte range extends past the end of the region.
    OutOfBounds,
    /// Null region or end-of-range position was dereferenced or advanced.
    NullDereference,
    /// Mutable access was requested on a region tagged as const.
    ConstViolation,
    /// Allocator could not provide the requested memory.
    AllocationFailed,
    /// Integer overflow detected (typically due to a very large element
    /// count or offset).
    Overflow,
}

impl fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::InvalidSize => write!(f, "invalid size"),
            ErrorKind::NotOwned => write!(f, "region does not own its memory"),
            ErrorKind::Misaligned => write!(f, "misaligned access"),
            ErrorKind::OutOfBounds => write!(f, "out of bounds"),
            ErrorKind::NullDereference => write!(f, "null dereference"),
            ErrorKind::ConstViolation => {
                write!(f, "mutable access to const region")
            }
            ErrorKind::AllocationFailed => write!(f, "allocation failed"),
            ErrorKind::Overflow => write!(f, "integer overflow"),
        }
    }
}

/// Error returned by fallible [`MemoryRegion`] and view operations.
///
/// Each error carries an [`ErrorKind`] for matching along with a short
/// static description of the failed precondition.
///
/// # Examples
///
/// ```
/// use memregion::{ErrorKind, MemoryRegion};
///
/// let mut region = MemoryRegion::<u32>::new();
/// let error = region.allocate(2).unwrap_err();
/// assert_eq!(error.kind(), ErrorKind::InvalidSize);
/// ```
///
/// [`ErrorKind`]: enum.ErrorKind.html
/// [`MemoryRegion`]: struct.MemoryRegion.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

impl Error {
    /// Creates a new error of the given kind.
    #[inline]
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Error { kind, message }
    }

    /// Returns the category of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns a description of the failed precondition.
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl ::std::error::Error for Error {}

pub(crate) const ZERO_SIZE: Error = Error::new(
    ErrorKind::InvalidSize,
    "cannot allocate a zero-sized buffer",
);
pub(crate) const UNDERSIZED: Error = Error::new(
    ErrorKind::InvalidSize,
    "size is smaller than a single element",
);
pub(crate) const NOT_OWNED: Error = Error::new(
    ErrorKind::NotOwned,
    "memory was not allocated by this region",
);
pub(crate) const MISALIGNED: Error = Error::new(
    ErrorKind::Misaligned,
    "offset is not a multiple of the required alignment",
);
pub(crate) const OUT_OF_BOUNDS: Error = Error::new(
    ErrorKind::OutOfBounds,
    "byte range extends past the end of the region",
);
pub(crate) const NULL_DEREFERENCE: Error = Error::new(
    ErrorKind::NullDereference,
    "region or position is null",
);
pub(crate) const CONST_VIOLATION: Error = Error::new(
    ErrorKind::ConstViolation,
    "region was created from a const pointer",
);
pub(crate) const ALLOCATION_FAILED: Error = Error::new(
    ErrorKind::AllocationFailed,
    "allocator returned no memory",
);
pub(crate) const OVERFLOW: Error =
    Error::new(ErrorKind::Overflow, "size computation overflowed");
