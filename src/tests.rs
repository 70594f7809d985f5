// Copyright 2018-2021 Theodore Cipicchio
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::*;
use arrayvec::ArrayVec;
use core::cell::Cell;
use core::mem::size_of;
use core::ptr::{self, NonNull};
use proptest::prelude::*;
use std::rc::Rc;

/// Bytes used by the foreign buffer scenarios.
const FOREIGN_DATA: [u8; 16] = [
    0xDE, 0xAD, 0xBE, 0xEF, 0xAB, 0xAD, 0x1D, 0xEA, 0xDE, 0xAD, 0xBE, 0xA7,
    0xDE, 0xFA, 0xCE, 0xD1,
];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
struct BasicRecord {
    small: u8,
    _padding: u8,
    medium: u16,
    large: u32,
}

unsafe impl ByteData for BasicRecord {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
struct FlexibleRecord {
    small: u8,
    _padding: u8,
    medium: u16,
    large: u32,
    trailing: [u64; 1],
}

unsafe impl ByteData for FlexibleRecord {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
struct PairRecord {
    id: u64,
    items: [u32; 2],
}

unsafe impl ByteData for PairRecord {}

thread_local! {
    static ALLOCATION_COUNT: Cell<usize> = Cell::new(0);
    static RELEASE_COUNT: Cell<usize> = Cell::new(0);
}

/// Returns the number of allocations and releases made by `Counting`
/// allocators on the current thread.
fn allocation_counts() -> (usize, usize) {
    (
        ALLOCATION_COUNT.with(Cell::get),
        RELEASE_COUNT.with(Cell::get),
    )
}

/// Heap allocator wrapper that counts allocations and releases.
#[derive(Clone, Debug, Default)]
struct Counting;

unsafe impl ByteAllocator for Counting {
    const ALIGNMENT: usize = CACHE_ALIGNMENT;

    fn allocate(&self, byte_count: usize) -> Option<NonNull<u8>> {
        let data = Heap.allocate(byte_count)?;
        ALLOCATION_COUNT.with(|count| count.set(count.get() + 1));
        Some(data)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, byte_count: usize) {
        RELEASE_COUNT.with(|count| count.set(count.get() + 1));
        Heap.deallocate(ptr, byte_count);
    }
}

/// Heap allocator wrapper that fails once a shared allocation budget is
/// spent. Default instances have no budget at all.
#[derive(Clone, Debug, Default)]
struct Limited {
    remaining: Rc<Cell<usize>>,
}

impl Limited {
    fn new(budget: usize) -> Self {
        Limited {
            remaining: Rc::new(Cell::new(budget)),
        }
    }
}

unsafe impl ByteAllocator for Limited {
    const ALIGNMENT: usize = CACHE_ALIGNMENT;

    fn allocate(&self, byte_count: usize) -> Option<NonNull<u8>> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return None;
        }

        self.remaining.set(remaining - 1);
        Heap.allocate(byte_count)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, byte_count: usize) {
        Heap.deallocate(ptr, byte_count);
    }
}

#[test]
fn foreign_buffer_operations() {
    // Clone the foreign bytes into an owned buffer.
    let mut cloned: MemoryRegion<u8> = MemoryRegion::new();
    cloned.clone_bytes(&FOREIGN_DATA).unwrap();
    assert!(cloned.is_owned());
    assert!(!cloned.is_const());
    assert!(!cloned.is_null());
    assert_eq!(cloned.state(), State::Owned);

    let mut slice: MemoryRegion<u8> = MemoryRegion::new();
    assert!(!slice.is_owned());
    assert!(!slice.is_const());
    assert!(slice.is_null());
    assert_eq!(slice.state(), State::Empty);

    // Borrow the cloned buffer. Both regions address the same memory, but
    // they compare unequal since only one of them owns it.
    let base = cloned.as_mut_ptr().unwrap();
    unsafe { slice.set(base, cloned.byte_size()) };
    assert_eq!(slice.state(), State::Borrowed);
    assert_ne!(slice, cloned);
    assert_eq!(slice.as_ptr(), cloned.as_ptr());
    assert_eq!(
        slice.at(0).unwrap() as *const u8,
        cloned.at(0).unwrap() as *const u8,
    );
    assert_eq!(slice.byte_size(), 16);
    assert_eq!(slice.end_ptr() as usize, slice.as_ptr() as usize + 16);

    assert_eq!(*slice.at(0).unwrap(), 0xDE);
    assert_eq!(*slice.first().unwrap(), 0xDE);
    assert_eq!(*slice.last().unwrap(), 0xD1);
    assert_eq!(*slice.at(4).unwrap(), 0xAB);
    assert_eq!(*slice.at(0xC).unwrap(), 0xDE);
    assert_eq!(slice.offset_of(4).unwrap(), 4);
    assert_eq!(slice.index_of(4).unwrap(), 4);

    // Anything at or past the end is rejected.
    assert_eq!(
        slice.view_at::<u8>(16, false).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );
    assert_eq!(slice.at(16).unwrap_err().kind(), ErrorKind::OutOfBounds);
    assert_eq!(slice.offset_of(16).unwrap_err().kind(), ErrorKind::OutOfBounds);
    assert_eq!(slice.index_of(16).unwrap_err().kind(), ErrorKind::OutOfBounds);

    // Writes through the borrowed region are visible through the owner.
    slice.write(0, 0xD1).unwrap();
    assert_eq!(*cloned.at(0).unwrap(), 0xD1);

    // Borrowed regions never release memory.
    assert_eq!(slice.deallocate().unwrap_err().kind(), ErrorKind::NotOwned);
}

#[cfg(target_endian = "little")]
#[test]
fn reinterpret_foreign_words() {
    let mut cloned: MemoryRegion<u8> = MemoryRegion::new();
    cloned.clone_bytes(&FOREIGN_DATA).unwrap();

    let words = cloned.reinterpret::<u32>();
    assert_eq!(words.byte_size(), 16);
    assert_eq!(words.element_count(), 4);
    assert_eq!(*words.at(0).unwrap(), 0xEFBEADDE);
    assert_eq!(
        *words.at(1).unwrap(),
        cloned.view_at::<u32>(4, true).unwrap().read(0).unwrap(),
    );

    // Iteration visits each word of the source in order.
    let expected: ArrayVec<u32, 4> = FOREIGN_DATA
        .chunks(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();
    let visited: ArrayVec<u32, 4> = words.iter().unwrap().copied().collect();
    assert_eq!(visited, expected);
    drop(words);

    // A write through the byte region shows up in the word view.
    cloned.write(0, 0xD1).unwrap();
    assert_eq!(cloned.reinterpret::<u32>().read(0).unwrap(), 0xEFBEADD1);
}

#[cfg(target_endian = "little")]
#[test]
fn struct_layout_bytes() {
    let mut record = StructView::<BasicRecord>::allocated().unwrap();
    assert_eq!(record.byte_size(), 8);
    {
        let fields = record.get_mut().unwrap();
        fields.small = 0x69;
        fields.medium = 0xBEEF;
        fields.large = 0xABAD1DEA;
    }

    // One padding byte follows the `u8` field.
    let bytes = record.as_region().reinterpret::<u8>();
    assert_eq!(bytes.byte_size(), 8);
    assert_eq!(
        bytes.as_slice().unwrap(),
        &[0x69, 0x00, 0xEF, 0xBE, 0xEA, 0x1D, 0xAD, 0xAB],
    );

    // Cloning the same bytes back in from unaligned raw memory yields the
    // same field values.
    let raw: [u8; 9] = [0xFF, 0x69, 0x00, 0xEF, 0xBE, 0xEA, 0x1D, 0xAD, 0xAB];
    let mut copy = StructView::<BasicRecord>::new();
    unsafe { copy.clone_raw(raw[1..].as_ptr().cast::<BasicRecord>()) }
        .unwrap();
    assert_eq!(copy.read().unwrap(), record.read().unwrap());
    assert_eq!(copy.get().unwrap().medium, 0xBEEF);
    assert_ne!(copy.as_ptr(), record.as_ptr());
}

#[test]
fn struct_view_operations() {
    let mut value = BasicRecord::default();
    {
        let mut view: StructView<BasicRecord> = StructView::from_mut(&mut value);
        assert_eq!(view.state(), State::Borrowed);
        assert!(!view.is_const());

        view.get_mut().unwrap().medium = 7;
        let updated = BasicRecord {
            large: 9,
            ..view.read().unwrap()
        };
        view.write(updated).unwrap();
    }
    assert_eq!(value.medium, 7);
    assert_eq!(value.large, 9);

    let mut shared: StructView<BasicRecord> = StructView::from_ref(&value);
    assert!(shared.is_const());
    assert_eq!(
        shared.copy_value(&BasicRecord::default()).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        shared.get_mut().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );

    let mut owned = StructView::<BasicRecord>::allocated().unwrap();
    owned.copy_view(&shared).unwrap();
    assert_eq!(owned.read().unwrap(), value);

    let mut cloned = StructView::<BasicRecord>::new();
    cloned.clone_view(&shared).unwrap();
    assert!(cloned.is_owned());
    assert_eq!(*cloned.get().unwrap(), value);

    let empty = StructView::<BasicRecord>::new();
    assert_eq!(
        cloned.clone_view(&empty).unwrap_err().kind(),
        ErrorKind::NullDereference,
    );
    assert_eq!(empty.get().unwrap_err().kind(), ErrorKind::OutOfBounds);
}

#[cfg(target_endian = "little")]
#[test]
fn flexible_layout() {
    // The placeholder element is replaced by the actual trailing elements.
    let mut flexible =
        FlexibleView::<FlexibleRecord, u64>::with_elements(4).unwrap();
    assert_eq!(
        flexible.byte_size(),
        size_of::<FlexibleRecord>() + 3 * size_of::<u64>(),
    );
    assert_eq!(flexible.byte_size(), 40);
    assert_eq!(flexible.adjusted_type_size(), 8);
    assert_eq!(flexible.elements(), 4);

    {
        let header = flexible.header_mut().unwrap();
        header.small = 0x69;
        header.medium = 0xBEEF;
        header.large = 0xABAD1DEA;
    }

    flexible[0] = 0xC01DC0FFEE;
    flexible[1] = 0xFACEBABEABAD1DEA;
    flexible[2] = 0xDEFACED1B00B7355;
    flexible[3] = 0x8675309;

    let expected: [u8; 40] = [
        0x69, 0x00, 0xEF, 0xBE, 0xEA, 0x1D, 0xAD, 0xAB, //
        0xEE, 0xFF, 0xC0, 0x1D, 0xC0, 0x00, 0x00, 0x00, //
        0xEA, 0x1D, 0xAD, 0xAB, 0xBE, 0xBA, 0xCE, 0xFA, //
        0x55, 0x73, 0x0B, 0xB0, 0xD1, 0xCE, 0xFA, 0xDE, //
        0x09, 0x53, 0x67, 0x08, 0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(flexible.as_bytes(), &expected[..]);

    let words = flexible.as_region().reinterpret::<u64>();
    assert_eq!(words.element_count(), 5);
    assert_eq!(words.read(1).unwrap(), 0xC01DC0FFEE);

    // The placeholder field overlaps the first trailing element.
    assert_eq!(flexible.header().unwrap().trailing[0], 0xC01DC0FFEE);
}

#[test]
fn flexible_array_aliasing() {
    let mut flexible =
        FlexibleView::<FlexibleRecord, u64>::with_elements(4).unwrap();

    flexible.flexible_array_mut().unwrap()[2] = 7;
    assert_eq!(flexible[2], 7);

    flexible[3] = 9;
    assert_eq!(flexible.flexible_array().unwrap()[3], 9);
    assert_eq!(flexible.read(3).unwrap(), 9);

    flexible.write(1, 5).unwrap();
    assert_eq!(*flexible.at(1).unwrap(), 5);
    assert_eq!(flexible.at(4).unwrap_err().kind(), ErrorKind::OutOfBounds);

    let array = flexible.flexible_array().unwrap();
    assert_eq!(array.len(), 4);
    assert!(array.is_const());
    assert_eq!(
        array.as_ptr() as usize,
        flexible.as_ptr() as usize + flexible.adjusted_type_size(),
    );
}

#[test]
fn flexible_sizing() {
    // Two placeholder elements, so the header is the leading `u64` alone.
    let mut pairs = FlexibleView::<PairRecord, u32, 2>::new();
    assert_eq!(pairs.adjusted_type_size(), 8);
    assert_eq!(pairs.allocate(1).unwrap_err().kind(), ErrorKind::InvalidSize);
    assert!(pairs.is_null());

    pairs.allocate(2).unwrap();
    assert_eq!(pairs.byte_size(), size_of::<PairRecord>());
    assert_eq!(pairs.elements(), 2);

    pairs.header_mut().unwrap().id = 3;
    pairs.reallocate(5).unwrap();
    assert_eq!(pairs.byte_size(), 28);
    assert_eq!(pairs.elements(), 5);
    assert_eq!(pairs.header().unwrap().id, 3);
    pairs[4] = 44;

    pairs.reallocate(3).unwrap();
    assert_eq!(pairs.at(3).unwrap_err().kind(), ErrorKind::OutOfBounds);
    pairs.reallocate(5).unwrap();
    assert_eq!(pairs[4], 0);

    assert_eq!(
        pairs.reallocate(0).unwrap_err().kind(),
        ErrorKind::InvalidSize,
    );
    assert_eq!(pairs.elements(), 5);

    // Copies cover the header and the requested trailing elements.
    let mut other = FlexibleView::<PairRecord, u32, 2>::with_elements(5).unwrap();
    other.copy_view(&pairs).unwrap();
    assert_eq!(other.header().unwrap().id, 3);
    assert_eq!(other.as_bytes(), pairs.as_bytes());

    let mut clone = FlexibleView::<PairRecord, u32, 2>::new();
    clone.clone_view(&pairs).unwrap();
    assert_eq!(clone.elements(), 5);
    assert_ne!(clone.as_ptr(), pairs.as_ptr());

    let mut short = FlexibleView::<PairRecord, u32, 2>::with_elements(2).unwrap();
    assert_eq!(
        short.copy_view(&pairs).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );
}

#[test]
fn flexible_minimum_elements() {
    let mut storage = [9u64, 0, 0, 0];
    let base = storage.as_mut_ptr().cast::<PairRecord>();

    // Every sizing path rejects fewer trailing elements than the header
    // declares, leaving the view untouched.
    let mut pairs = FlexibleView::<PairRecord, u32, 2>::new();
    unsafe {
        assert_eq!(
            pairs.set(base, 1).unwrap_err().kind(),
            ErrorKind::InvalidSize,
        );
        assert_eq!(
            pairs.set_const(base, 1).unwrap_err().kind(),
            ErrorKind::InvalidSize,
        );
        assert_eq!(
            pairs.clone_raw(base, 1).unwrap_err().kind(),
            ErrorKind::InvalidSize,
        );
        assert_eq!(
            FlexibleView::<PairRecord, u32, 2>::from_raw_parts(base, 0)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidSize,
        );
    }
    assert!(pairs.is_null());

    unsafe { pairs.set(base, 2).unwrap() };
    assert_eq!(pairs.state(), State::Borrowed);
    assert_eq!(pairs.byte_size(), 16);
    assert_eq!(pairs.header().unwrap().id, 9);
    assert_eq!(
        unsafe { pairs.resize(1) }.unwrap_err().kind(),
        ErrorKind::InvalidSize,
    );
    assert_eq!(pairs.elements(), 2);

    // Borrowed views can be widened over the rest of the buffer.
    unsafe { pairs.resize(6).unwrap() };
    assert_eq!(pairs.elements(), 6);
    assert_eq!(pairs.byte_size(), 32);
    pairs[5] = 77;

    let source = PairRecord {
        id: 5,
        items: [1, 2],
    };
    assert_eq!(
        unsafe { pairs.copy_raw(&source, 1) }.unwrap_err().kind(),
        ErrorKind::InvalidSize,
    );
    unsafe { pairs.copy_raw(&source, 2).unwrap() };
    assert_eq!(pairs.header().unwrap().id, 5);
    assert_eq!((pairs[0], pairs[1], pairs[5]), (1, 2, 77));
    drop(pairs);

    assert_eq!(storage[0], 5);
    let last = unsafe { storage.as_ptr().cast::<u32>().add(7).read() };
    assert_eq!(last, 77);

    // Const views reject writes to the header and the trailing elements.
    let mut frozen = FlexibleView::<PairRecord, u32, 2>::new();
    unsafe { frozen.set_const(storage.as_ptr().cast::<PairRecord>(), 6).unwrap() };
    assert!(frozen.is_const());
    assert_eq!(frozen.read(5).unwrap(), 77);
    assert_eq!(
        frozen.header_mut().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        frozen.write(0, 3).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
}

#[test]
fn borrowed_struct_and_array_views() {
    let record = BasicRecord {
        small: 1,
        _padding: 0,
        medium: 2,
        large: 3,
    };
    let mut view = StructView::<BasicRecord>::new();
    unsafe { view.set_const(&record) };
    assert!(view.is_const());
    assert_eq!(view.state(), State::Borrowed);
    assert_eq!(view.byte_size(), 8);
    assert_eq!(view.read().unwrap(), record);
    assert_eq!(view.get_mut().unwrap_err().kind(), ErrorKind::ConstViolation);
    assert_eq!(
        view.write(BasicRecord::default()).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );

    let mut target = BasicRecord::default();
    unsafe { view.set(&mut target) };
    assert!(!view.is_const());
    view.get_mut().unwrap().large = 40;
    drop(view);
    assert_eq!(target.large, 40);

    let words = [1u16, 2, 3, 4];
    let mut array = ArrayView::<u16>::new();
    unsafe { array.set_const(words.as_ptr(), 3).unwrap() };
    assert!(array.is_const());
    assert_eq!(array.len(), 3);
    assert_eq!(array.as_slice().unwrap(), &[1, 2, 3]);
    assert_eq!(
        array.write(0, 9).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );

    // Cloning replaces the borrowed span with an owned, mutable copy.
    array.clone_slice(&words).unwrap();
    assert!(array.is_owned());
    assert!(!array.is_const());
    assert_eq!(array.len(), 4);
    assert_ne!(array.as_ptr(), words.as_ptr());
    array.write(0, 9).unwrap();
    assert_eq!(words[0], 1);

    unsafe { array.clone_raw(words[2..].as_ptr(), 2).unwrap() };
    assert_eq!(array.as_slice().unwrap(), &[3, 4]);
    assert_eq!(
        array.clone_slice(&[]).unwrap_err().kind(),
        ErrorKind::InvalidSize,
    );
    assert_eq!(array.as_slice().unwrap(), &[3, 4]);
}

#[test]
#[should_panic]
fn flexible_index_out_of_bounds_panics() {
    let flexible =
        FlexibleView::<FlexibleRecord, u64>::with_elements(1).unwrap();
    let _element: u64 = flexible[1];
}

#[test]
fn array_view_operations() {
    let mut array = ArrayView::<u32>::with_len(4).unwrap();
    assert_eq!(array.len(), 4);
    assert_eq!(array.byte_size(), 16);

    array.copy_slice(&[1, 2], 2).unwrap();
    assert_eq!(array.as_slice().unwrap(), &[0, 0, 1, 2]);
    assert_eq!(
        array.copy_slice(&[1, 2, 3], 2).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );

    array.reallocate(6).unwrap();
    assert_eq!(array.as_slice().unwrap(), &[0, 0, 1, 2, 0, 0]);
    array[5] = 8;
    assert_eq!(*array.last().unwrap(), 8);

    let mut copy = ArrayView::<u32>::new();
    copy.clone_view(&array).unwrap();
    assert_ne!(copy.as_ptr(), array.as_ptr());
    assert_eq!(copy.as_slice().unwrap(), array.as_slice().unwrap());

    // Regions only compare by identity.
    assert_ne!(copy, array);

    let data = [5u32, 6, 7];
    let borrowed = ArrayView::<u32>::from_slice(&data);
    assert!(borrowed.is_const());
    assert_eq!(borrowed.len(), 3);
    array.copy_view(&borrowed, 3).unwrap();
    assert_eq!(array.as_slice().unwrap(), &[0, 0, 1, 5, 6, 7]);

    let empty = ArrayView::<u32>::with_len(0).unwrap();
    assert!(empty.is_null());
    assert!(empty.is_empty());
    assert_eq!(array.allocate(0).unwrap_err().kind(), ErrorKind::InvalidSize);
    assert_eq!(array.len(), 6);
}

#[test]
fn array_view_stride() {
    // Elements of `[u16; 3]` are 6 bytes apart.
    let array = ArrayView::<[u16; 3]>::with_len(3).unwrap();
    assert_eq!(array.byte_size(), 18);
    assert_eq!(array.offset_of(2).unwrap(), 12);
    assert_eq!(array.index_of(13).unwrap(), 2);
    assert_eq!(array.offset_of(3).unwrap_err().kind(), ErrorKind::OutOfBounds);
    assert_eq!(
        array.at(2).unwrap() as *const [u16; 3] as usize,
        array.as_ptr() as usize + 12,
    );
}

#[test]
fn array_view_raw_parts() {
    let mut storage = [1u16, 2, 3, 4];
    {
        let mut array: ArrayView<u16> =
            unsafe { ArrayView::from_raw_parts(storage.as_mut_ptr(), 2) }
                .unwrap();
        assert_eq!(array.len(), 2);
        unsafe { array.resize(4) }.unwrap();
        assert_eq!(array.len(), 4);

        for element in array.iter_mut().unwrap() {
            *element *= 10;
        }
    }
    assert_eq!(storage, [10, 20, 30, 40]);
}

#[test]
#[should_panic]
fn array_index_out_of_bounds_panics() {
    let array = ArrayView::<u8>::with_len(2).unwrap();
    let _element: u8 = array[2];
}

#[test]
fn const_violations() {
    let data = [1u32, 2, 3];
    let mut region: MemoryRegion<u32> = MemoryRegion::from_slice(&data);
    assert!(region.is_const());

    assert_eq!(
        region.as_mut_ptr().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(region.at_mut(0).unwrap_err().kind(), ErrorKind::ConstViolation);
    assert_eq!(
        region.write(0, 5).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        region.as_bytes_mut().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        region.as_mut_slice().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        region.iter_mut().unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );
    assert_eq!(
        region.cursor_mut(Direction::Forward).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );

    // Reading is still allowed.
    assert_eq!(region.as_slice().unwrap(), &[1, 2, 3]);

    // Mutable aliases inherit the const tag.
    {
        let mut alias = region.alias_mut();
        assert!(alias.is_const());
        assert_eq!(
            alias.write(1, 0).unwrap_err().kind(),
            ErrorKind::ConstViolation,
        );
    }

    // Shared views of a mutable region are const, while mutable views keep
    // the region tag.
    let mut owned: MemoryRegion<u32> = MemoryRegion::with_byte_size(8).unwrap();
    {
        let mut view = owned.view_at::<u32>(4, true).unwrap();
        assert!(view.is_const());
        assert_eq!(
            view.write(0, 1).unwrap_err().kind(),
            ErrorKind::ConstViolation,
        );
    }
    {
        let mut view = owned.view_at_mut::<u32>(4, true).unwrap();
        assert!(!view.is_const());
        view.write(0, 42).unwrap();
    }
    assert_eq!(owned.read(1).unwrap(), 42);

    // Owned copies of const regions are mutable.
    let mut copy = region.try_clone().unwrap();
    assert!(!copy.is_const());
    copy.write(0, 11).unwrap();
    assert_eq!(data[0], 1);
}

#[test]
fn copy_check_order() {
    // The const tag is checked before alignment and bounds.
    let bytes = [0u8; 8];
    let mut region: MemoryRegion<u16> = MemoryRegion::from_bytes(&bytes);
    assert_eq!(
        region.copy_bytes(&[1, 2], 7, true).unwrap_err().kind(),
        ErrorKind::ConstViolation,
    );

    let mut empty: MemoryRegion<u16> = MemoryRegion::new();
    assert_eq!(
        empty.copy_bytes(&[1, 2], 1, true).unwrap_err().kind(),
        ErrorKind::NullDereference,
    );

    // Alignment is checked before bounds.
    let mut owned: MemoryRegion<u16> = MemoryRegion::with_byte_size(4).unwrap();
    assert_eq!(
        owned.copy_bytes(&[1, 2, 3, 4], 3, true).unwrap_err().kind(),
        ErrorKind::Misaligned,
    );
    assert_eq!(
        owned.copy_bytes(&[1, 2, 3, 4], 2, true).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );
    assert_eq!(
        owned.copy_bytes(&[1, 2], 3, false).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );
    assert_eq!(
        unsafe { owned.copy_raw(ptr::null(), 2, 0, true) }
            .unwrap_err()
            .kind(),
        ErrorKind::NullDereference,
    );
    assert_eq!(
        owned.copy_bytes(&[1, 2], usize::MAX, false).unwrap_err().kind(),
        ErrorKind::Overflow,
    );

    // Failed copies leave the contents untouched.
    assert_eq!(owned.as_bytes(), &[0, 0, 0, 0]);

    owned.copy_bytes(&[0xAA, 0xBB], 1, false).unwrap();
    assert_eq!(owned.as_bytes(), &[0x00, 0xAA, 0xBB, 0x00]);

    let source: MemoryRegion<u16> = MemoryRegion::from_bytes(&bytes[..2]);
    owned.copy_region(&source, 2, true).unwrap();
    assert_eq!(owned.as_bytes(), &[0x00, 0xAA, 0x00, 0x00]);
}

#[test]
fn reallocate_preserves_prefix() {
    // Unowned regions are simply allocated.
    let mut region: MemoryRegion<u8> = MemoryRegion::new();
    region.reallocate(4).unwrap();
    assert_eq!(region.as_bytes(), &[0, 0, 0, 0]);

    region.copy_bytes(&[1, 2, 3, 4], 0, true).unwrap();
    region.reallocate(8).unwrap();
    assert_eq!(region.as_bytes(), &[1, 2, 3, 4, 0, 0, 0, 0]);

    // Shrinking then growing back does not bring back the truncated bytes.
    region.reallocate(2).unwrap();
    assert_eq!(region.as_bytes(), &[1, 2]);
    region.reallocate(4).unwrap();
    assert_eq!(region.as_bytes(), &[1, 2, 0, 0]);

    let address = region.as_ptr();
    region.reallocate(4).unwrap();
    assert_eq!(region.as_ptr(), address);

    assert_eq!(region.reallocate(0).unwrap_err().kind(), ErrorKind::InvalidSize);
    assert_eq!(region.as_bytes(), &[1, 2, 0, 0]);

    // Sizes smaller than a single element are rejected.
    let mut words: MemoryRegion<u32> = MemoryRegion::new();
    assert_eq!(words.allocate(3).unwrap_err().kind(), ErrorKind::InvalidSize);
    assert_eq!(words.reallocate(2).unwrap_err().kind(), ErrorKind::InvalidSize);
    assert_eq!(words.state(), State::Empty);
}

#[test]
fn borrowed_resize() {
    let mut storage = [0u32; 4];
    {
        let mut region: MemoryRegion<u32> =
            unsafe { MemoryRegion::from_raw_parts(storage.as_mut_ptr(), 8) };
        assert_eq!(region.element_count(), 2);

        unsafe { region.resize(16) }.unwrap();
        assert_eq!(region.element_count(), 4);
        assert_eq!(region.state(), State::Borrowed);
        region.write(3, 7).unwrap();

        assert_eq!(
            unsafe { region.resize(2) }.unwrap_err().kind(),
            ErrorKind::InvalidSize,
        );
        assert_eq!(region.deallocate().unwrap_err().kind(), ErrorKind::NotOwned);
    }
    assert_eq!(storage[3], 7);
}

#[test]
fn misaligned_access() {
    let owned: MemoryRegion<u8> = MemoryRegion::with_byte_size(12).unwrap();

    // Offsets are checked against the alignment of the parent element type,
    // so any byte offset passes for a `u8` region.
    let view = owned.view_at::<u32>(1, true).unwrap();
    assert_eq!(view.at(0).unwrap_err().kind(), ErrorKind::Misaligned);
    assert_eq!(view.read(0).unwrap(), 0);
    assert!(owned.view_at::<u32>(2, true).is_ok());

    let words: MemoryRegion<u64> = MemoryRegion::with_byte_size(16).unwrap();
    assert_eq!(
        words.view_at::<u32>(4, true).unwrap_err().kind(),
        ErrorKind::Misaligned,
    );
    assert_eq!(words.view_at::<u32>(4, false).unwrap().read(0).unwrap(), 0);
    assert!(words.view_at::<u32>(8, true).is_ok());

    let shifted: MemoryRegion<u32> =
        MemoryRegion::from_bytes(&owned.as_bytes()[1..9]);
    assert_eq!(shifted.element_count(), 2);
    assert_eq!(shifted.read(1).unwrap(), 0);
    assert_eq!(shifted.at(1).unwrap_err().kind(), ErrorKind::Misaligned);
    assert_eq!(shifted.as_slice().unwrap_err().kind(), ErrorKind::Misaligned);
    assert_eq!(shifted.iter().unwrap_err().kind(), ErrorKind::Misaligned);
    assert_eq!(
        shifted.cursor(Direction::Forward).unwrap_err().kind(),
        ErrorKind::Misaligned,
    );

    // Ranges past the end are rejected.
    assert_eq!(
        owned.view_at::<u32>(12, false).unwrap_err().kind(),
        ErrorKind::OutOfBounds,
    );
    let empty: MemoryRegion<u8> = MemoryRegion::new();
    assert_eq!(
        empty.view_at::<u8>(0, false).unwrap_err().kind(),
        ErrorKind::NullDereference,
    );
}

#[test]
fn iteration_and_cursors() {
    let mut region: MemoryRegion<u16> = MemoryRegion::with_byte_size(8).unwrap();
    for (index, element) in region.iter_mut().unwrap().enumerate() {
        *element = index as u16 * 10;
    }

    let forward: ArrayVec<u16, 4> = region.iter().unwrap().copied().collect();
    assert_eq!(&forward[..], &[0, 10, 20, 30]);
    let reverse: ArrayVec<u16, 4> =
        region.iter().unwrap().rev().copied().collect();
    assert_eq!(&reverse[..], &[30, 20, 10, 0]);

    // Walk the region backward with a cursor until it hits the sentinel.
    let mut cursor = region.cursor(Direction::Reverse).unwrap();
    let mut visited = ArrayVec::<u16, 4>::new();
    while !cursor.is_end() {
        visited.push(*cursor.get().unwrap());
        cursor.advance().unwrap();
    }
    assert_eq!(&visited[..], &[30, 20, 10, 0]);
    assert_eq!(cursor.index(), None);
    assert_eq!(cursor.get().unwrap_err().kind(), ErrorKind::NullDereference);
    assert_eq!(
        cursor.advance().unwrap_err().kind(),
        ErrorKind::NullDereference,
    );

    {
        let mut cursor = region.cursor_mut(Direction::Forward).unwrap();
        assert_eq!(cursor.direction(), Direction::Forward);
        cursor.advance().unwrap();
        assert_eq!(cursor.index(), Some(1));
        *cursor.get_mut().unwrap() = 11;
    }
    assert_eq!(region.read(1).unwrap(), 11);

    // Trailing bytes that do not make up a whole element are skipped.
    let odd: MemoryRegion<u16> = MemoryRegion::with_byte_size(7).unwrap();
    assert_eq!(odd.iter().unwrap().len(), 3);

    // Null regions have nothing to visit.
    let empty: MemoryRegion<u16> = MemoryRegion::new();
    assert_eq!(empty.iter().unwrap().len(), 0);
    assert!(empty.cursor(Direction::Reverse).unwrap().is_end());
}

#[test]
fn identity_ordering() {
    let data = [0u32; 4];
    let whole: MemoryRegion<u32> = MemoryRegion::from_slice(&data);
    let head: MemoryRegion<u32> = MemoryRegion::from_slice(&data[..2]);
    let tail: MemoryRegion<u32> = MemoryRegion::from_slice(&data[2..]);
    let same: MemoryRegion<u32> = MemoryRegion::from_slice(&data);

    assert_eq!(whole, same);
    assert_ne!(whole, head);
    assert!(head < whole);
    assert!(whole < tail);

    // Equal contents at different addresses are still different regions.
    let other = [0u32; 4];
    let twin: MemoryRegion<u32> = MemoryRegion::from_slice(&other);
    assert_ne!(whole, twin);

    // Borrowed regions order before owned regions of the same span.
    let owned: MemoryRegion<u32> = MemoryRegion::with_byte_size(16).unwrap();
    let alias = owned.alias();
    assert!(alias < owned);

    let mut sorted: ArrayVec<&MemoryRegion<u32>, 3> = ArrayVec::new();
    sorted.push(&tail);
    sorted.push(&whole);
    sorted.push(&head);
    sorted.sort();
    assert_eq!(sorted[0], &head);
    assert_eq!(sorted[1], &whole);
    assert_eq!(sorted[2], &tail);
}

#[test]
fn ownership_transfer() {
    let mut original: MemoryRegion<u8> = MemoryRegion::new();
    original.clone_bytes(&[1, 2, 3]).unwrap();

    let copy = original.try_clone().unwrap();
    assert!(copy.is_owned());
    assert_ne!(copy.as_ptr(), original.as_ptr());
    assert_eq!(copy.as_bytes(), original.as_bytes());

    // Moving leaves an empty region behind.
    let address = original.as_ptr();
    let moved = original.take();
    assert_eq!(original.state(), State::Empty);
    assert_eq!(moved.as_ptr(), address);

    // Owned memory is handed over without copying.
    let owned = moved.into_owned().unwrap();
    assert_eq!(owned.as_ptr(), address);

    // Borrowed memory is copied.
    let data = [9u8, 8, 7];
    let borrowed: MemoryRegion<u8> = MemoryRegion::from_slice(&data);
    let detached = borrowed.into_owned().unwrap();
    assert!(detached.is_owned());
    assert!(!detached.is_const());
    assert_ne!(detached.as_ptr(), data.as_ptr());
    assert_eq!(detached.as_bytes(), &data[..]);

    let empty: MemoryRegion<u8> = MemoryRegion::new();
    assert_eq!(empty.try_clone().unwrap().state(), State::Empty);
}

#[test]
fn owned_memory_released_once() {
    let (allocated, released) = allocation_counts();
    {
        let mut region: MemoryRegion<u32, Counting> = MemoryRegion::new();
        region.allocate(16).unwrap();
        region.reallocate(32).unwrap();
        region.allocate(8).unwrap();

        let alias = region.alias();
        assert!(!alias.is_owned());
        drop(alias);

        let copy = region.try_clone().unwrap();
        let moved = region.take();
        drop(copy);
        drop(moved);
        drop(region);
    }
    assert_eq!(allocation_counts(), (allocated + 4, released + 4));

    // Explicit release followed by drop does not release twice.
    let (allocated, released) = allocation_counts();
    {
        let mut region: MemoryRegion<u8, Counting> = MemoryRegion::new();
        region.allocate(4).unwrap();
        region.deallocate().unwrap();
        assert_eq!(region.state(), State::Empty);
        assert_eq!(region.deallocate().unwrap_err().kind(), ErrorKind::NotOwned);
    }
    assert_eq!(allocation_counts(), (allocated + 1, released + 1));

    // Borrowing releases any owned buffer first.
    let (allocated, released) = allocation_counts();
    let mut storage = [0u32; 2];
    {
        let mut region: MemoryRegion<u32, Counting> = MemoryRegion::new();
        region.allocate(8).unwrap();
        unsafe { region.set(storage.as_mut_ptr(), 8) };
        assert_eq!(allocation_counts(), (allocated + 1, released + 1));
        assert_eq!(region.state(), State::Borrowed);
    }
    assert_eq!(allocation_counts(), (allocated + 1, released + 1));
}

#[test]
fn allocation_failure_keeps_state() {
    // Default `Limited` instances cannot allocate anything.
    let mut region: MemoryRegion<u8, Limited> = MemoryRegion::new();
    assert_eq!(
        region.allocate(4).unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );
    assert_eq!(region.state(), State::Empty);

    region.allocate_in(4, Limited::new(1)).unwrap();
    region.copy_bytes(&[1, 2, 3, 4], 0, true).unwrap();
    assert_eq!(
        region.reallocate(8).unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );
    assert_eq!(region.state(), State::Owned);
    assert_eq!(region.as_bytes(), &[1, 2, 3, 4]);

    assert_eq!(
        region.clone_bytes(&[5, 6]).unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );
    assert_eq!(region.as_bytes(), &[1, 2, 3, 4]);
    assert_eq!(
        region.try_clone().unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );

    let data = [7u8, 8];
    let mut borrowed: MemoryRegion<u8, Limited> = MemoryRegion::from_slice(&data);
    assert_eq!(
        borrowed.clone_bytes(&[1, 2]).unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );
    assert_eq!(borrowed.state(), State::Borrowed);
    assert_eq!(borrowed.as_ptr(), data.as_ptr());

    // Clones allocate from a default allocator, while `try_clone` keeps the
    // allocator of the region.
    let budget = Limited::new(2);
    let mut pooled: MemoryRegion<u8, Limited> = MemoryRegion::new();
    pooled.allocate_in(2, budget.clone()).unwrap();
    assert_eq!(
        pooled.clone_bytes(&[5, 6]).unwrap_err().kind(),
        ErrorKind::AllocationFailed,
    );
    let copy = pooled.try_clone().unwrap();
    assert_eq!(copy.as_bytes(), &[0, 0]);
    assert_eq!(budget.remaining.get(), 0);
}

#[test]
fn size_overflow() {
    let mut array = ArrayView::<u64>::new();
    assert_eq!(
        array.allocate(usize::MAX).unwrap_err().kind(),
        ErrorKind::Overflow,
    );

    let mut flexible = FlexibleView::<FlexibleRecord, u64>::new();
    assert_eq!(
        flexible.allocate(usize::MAX).unwrap_err().kind(),
        ErrorKind::Overflow,
    );

    let region: MemoryRegion<u64> = MemoryRegion::with_byte_size(8).unwrap();
    assert_eq!(
        region.offset_of(usize::MAX).unwrap_err().kind(),
        ErrorKind::Overflow,
    );
}

#[test]
fn error_formatting() {
    let error = Error::new(ErrorKind::Overflow, "too many elements");
    assert_eq!(error.kind(), ErrorKind::Overflow);
    assert_eq!(error.message(), "too many elements");
    assert_eq!(error.to_string(), "integer overflow: too many elements");

    let mut region: MemoryRegion<u8> = MemoryRegion::from_slice(&[1, 2]);
    let error = region.deallocate().unwrap_err();
    assert_eq!(
        error.to_string(),
        "region does not own its memory: memory was not allocated by this region",
    );

    let boxed: Box<dyn std::error::Error> = Box::new(error);
    assert!(boxed.to_string().starts_with("region does not own"));

    let region: MemoryRegion<u8> = MemoryRegion::new();
    let text = format!("{:?}", region);
    assert!(text.starts_with("MemoryRegion {"));
    assert!(text.contains("state: Empty"));
}

#[test]
fn utility_functions() {
    assert_eq!(align_up(0, 8), 0);
    assert_eq!(align_up(9, 8), 16);
    assert_eq!(align_up(10, 3), 12);
    assert!(is_aligned(24, 8));
    assert!(!is_aligned(4, 0));
    assert_eq!(aligned_size_of::<BasicRecord>(), 8);
    assert_eq!(aligned_size_of::<CacheAligned>(), CACHE_ALIGNMENT);

    let region: MemoryRegion<CacheAligned> =
        MemoryRegion::with_byte_size(CACHE_ALIGNMENT).unwrap();
    assert!(is_aligned(region.as_ptr() as usize, CACHE_ALIGNMENT));
}

proptest! {
    #[test]
    fn allocation_is_zeroed(count in 1usize..64) {
        let mut region: MemoryRegion<u32> = MemoryRegion::new();
        region.allocate(count * 4).unwrap();
        prop_assert_eq!(region.byte_size(), count * 4);
        prop_assert_eq!(region.element_count(), count);
        prop_assert!(region.as_bytes().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn clone_copies_bytes(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut region: MemoryRegion<u8> = MemoryRegion::new();
        region.clone_bytes(&bytes).unwrap();
        prop_assert_eq!(region.as_bytes(), &bytes[..]);
        prop_assert_ne!(region.as_ptr(), bytes.as_ptr());
    }

    #[test]
    fn reallocate_zero_fills_growth(
        bytes in prop::collection::vec(any::<u8>(), 1..64),
        shrunk in 1usize..64,
    ) {
        let shrunk = shrunk.min(bytes.len());
        let mut region: MemoryRegion<u8> = MemoryRegion::new();
        region.clone_bytes(&bytes).unwrap();

        region.reallocate(shrunk).unwrap();
        prop_assert_eq!(region.as_bytes(), &bytes[..shrunk]);

        region.reallocate(bytes.len()).unwrap();
        prop_assert_eq!(&region.as_bytes()[..shrunk], &bytes[..shrunk]);
        prop_assert!(region.as_bytes()[shrunk..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn element_access_follows_stride(byte_size in 6usize..96, index in 0usize..32) {
        let region: MemoryRegion<[u16; 3]> =
            MemoryRegion::with_byte_size(byte_size).unwrap();
        let count = byte_size / 6;
        prop_assert_eq!(region.element_count(), count);

        match region.at(index) {
            Ok(element) => {
                prop_assert!(index < count);
                prop_assert_eq!(
                    element as *const [u16; 3] as usize,
                    region.as_ptr() as usize + index * 6
                );
            }
            Err(error) => {
                prop_assert!(index >= count);
                prop_assert_eq!(error.kind(), ErrorKind::OutOfBounds);
            }
        }
    }

    #[test]
    fn iteration_visits_every_element(count in 0usize..16) {
        let region: MemoryRegion<u64> =
            MemoryRegion::with_byte_size(count * 8).unwrap();
        let forward: ArrayVec<usize, 16> = region
            .iter()
            .unwrap()
            .map(|element| element as *const u64 as usize)
            .collect();
        let mut reverse: ArrayVec<usize, 16> = region
            .iter()
            .unwrap()
            .rev()
            .map(|element| element as *const u64 as usize)
            .collect();

        prop_assert_eq!(forward.len(), region.element_count());
        prop_assert!(forward.windows(2).all(|pair| pair[1] - pair[0] == 8));
        reverse.reverse();
        prop_assert_eq!(forward, reverse);
    }

    #[test]
    fn flexible_elements_alias_array(elements in 0usize..32) {
        let mut flexible = FlexibleView::<FlexibleRecord, u64>::new();
        let result = flexible.allocate(elements);

        if elements == 0 {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSize);
            prop_assert!(flexible.is_null());
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(flexible.elements(), elements);
            prop_assert_eq!(flexible.byte_size(), 8 + elements * 8);

            let last = elements - 1;
            flexible[last] = 0xFEED;
            prop_assert_eq!(flexible.flexible_array().unwrap()[last], 0xFEED);
            flexible.flexible_array_mut().unwrap()[0] = 0xBEEF;
            prop_assert_eq!(flexible[0], 0xBEEF);
        }
    }
}
