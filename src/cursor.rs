//! Bounds-checked cursor over a fixed-length mutable region.
//!
//! [`BinaryCursor`] pairs a mutable slice with a signed offset. Every committed
//! read or write stays inside the slice; running out of room while *reading*
//! reports [`ErrorKind::EndOfData`](crate::ErrorKind::EndOfData), while running
//! out of room while *writing* reports [`ErrorKind::IoFault`](crate::ErrorKind::IoFault).
//!
//! ```
//! use binmill::cursor::BinaryCursor;
//!
//! let mut buf = [0u8; 8];
//! let mut cur = BinaryCursor::new(&mut buf);
//! cur.write_u32_le(0xDEAD_BEEF).unwrap();
//! cur.seek(0);
//! assert_eq!(cur.read_u32_le().unwrap(), 0xDEAD_BEEF);
//! assert_eq!(cur.remaining().len(), 4);
//! ```

use crate::error::{Error, Result};
use std::ops::{Index, IndexMut};

/// Read/write cursor over a contiguous region of `T`.
///
/// The offset is signed: [`advance`](Self::advance) may commit an invalid
/// position on request, and callers are expected to check its return value.
#[derive(Debug)]
pub struct BinaryCursor<'a, T = u8> {
    data: &'a mut [T],
    offset: isize,
}

impl<'a, T: Copy> BinaryCursor<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn with_offset(data: &'a mut [T], offset: isize) -> Self {
        Self { data, offset }
    }

    #[must_use]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move to an absolute offset without validation.
    pub fn seek(&mut self, offset: isize) {
        self.offset = offset;
    }

    /// Whether `count` more elements fit between the offset and the end.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` if the committed offset is negative.
    pub fn is_available(&self, count: usize) -> Result<bool> {
        let start = self.start()?;
        Ok(start
            .checked_add(count)
            .is_some_and(|end| end <= self.data.len()))
    }

    /// `pos == len` is valid only when `end_is_ok`; otherwise `0 <= pos < len`.
    #[must_use]
    pub fn is_valid(&self, pos: isize, end_is_ok: bool) -> bool {
        if pos < 0 {
            return false;
        }
        let pos = pos.unsigned_abs();
        pos < self.data.len() || (end_is_ok && pos == self.data.len())
    }

    /// Move the offset by `delta` and report whether the new offset is valid.
    ///
    /// With `dont_commit_invalid`, an invalid candidate leaves the cursor where
    /// it was. Otherwise the candidate is committed even when invalid, so the
    /// returned flag must be checked either way.
    pub fn advance(&mut self, delta: isize, end_is_ok: bool, dont_commit_invalid: bool) -> bool {
        let Some(candidate) = self.offset.checked_add(delta) else {
            return false;
        };
        let valid = self.is_valid(candidate, end_is_ok);
        if valid || !dont_commit_invalid {
            self.offset = candidate;
        }
        valid
    }

    /// Read the next element and step past it.
    ///
    /// # Errors
    ///
    /// `EndOfData` if no element is left, `InvalidState` for a negative offset.
    pub fn read_advance(&mut self) -> Result<T> {
        let start = self.take_read(1)?;
        Ok(self.data[start])
    }

    /// Borrow the next `count` elements and step past them.
    ///
    /// # Errors
    ///
    /// `EndOfData` if fewer than `count` elements are left.
    pub fn read_advance_slice(&mut self, count: usize) -> Result<&[T]> {
        let start = self.take_read(count)?;
        Ok(&self.data[start..start + count])
    }

    /// Write one element and step past it.
    ///
    /// # Errors
    ///
    /// `IoFault` if there is no room left.
    pub fn write_advance(&mut self, value: T) -> Result<()> {
        let start = self.take_write(1)?;
        self.data[start] = value;
        Ok(())
    }

    /// Copy `values` in and step past them.
    ///
    /// # Errors
    ///
    /// `IoFault` if the slice does not fit; nothing is written in that case.
    pub fn write_advance_slice(&mut self, values: &[T]) -> Result<()> {
        let start = self.take_write(values.len())?;
        self.data[start..start + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Write `value` `count` times and step past the run.
    ///
    /// # Errors
    ///
    /// `IoFault` if the run does not fit; nothing is written in that case.
    pub fn write_advance_fill(&mut self, value: T, count: usize) -> Result<()> {
        let start = self.take_write(count)?;
        self.data[start..start + count].fill(value);
        Ok(())
    }

    /// Element at `index` relative to the offset, without advancing.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        let start = usize::try_from(self.offset).ok()?;
        self.data.get(start.checked_add(index)?)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let start = usize::try_from(self.offset).ok()?;
        self.data.get_mut(start.checked_add(index)?)
    }

    /// The unconsumed part of the region. Empty when the offset is out of range.
    #[must_use]
    pub fn remaining(&self) -> &[T] {
        match usize::try_from(self.offset) {
            Ok(start) if start <= self.data.len() => &self.data[start..],
            _ => &[],
        }
    }

    pub fn remaining_mut(&mut self) -> &mut [T] {
        match usize::try_from(self.offset) {
            Ok(start) if start <= self.data.len() => &mut self.data[start..],
            _ => &mut [],
        }
    }

    fn start(&self) -> Result<usize> {
        usize::try_from(self.offset)
            .map_err(|_| Error::invalid_state(format!("negative cursor offset {}", self.offset)))
    }

    fn available(&self, start: usize) -> usize {
        self.data.len().saturating_sub(start)
    }

    fn take_read(&mut self, count: usize) -> Result<usize> {
        let start = self.start()?;
        if !self.is_available(count)? {
            return Err(Error::end_of_data(count, self.available(start)).at(start));
        }
        self.offset += count as isize;
        Ok(start)
    }

    fn take_write(&mut self, count: usize) -> Result<usize> {
        let start = self.start()?;
        if !self.is_available(count)? {
            return Err(Error::io_fault(format!(
                "cannot write {count} element(s) at offset {start}, {} left",
                self.available(start)
            ))
            .at(start));
        }
        self.offset += count as isize;
        Ok(start)
    }
}

macro_rules! byte_accessors {
    ($($read:ident, $write:ident, $ty:ty, $from:ident, $to:ident;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` and advance past it.")]
            pub fn $read(&mut self) -> Result<$ty> {
                let bytes = self.read_advance_slice(size_of::<$ty>())?;
                let mut raw = [0u8; size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                Ok(<$ty>::$from(raw))
            }

            #[doc = concat!("Write a `", stringify!($ty), "` and advance past it.")]
            pub fn $write(&mut self, value: $ty) -> Result<()> {
                self.write_advance_slice(&value.$to())
            }
        )*
    };
}

impl BinaryCursor<'_, u8> {
    byte_accessors! {
        read_u16_le, write_u16_le, u16, from_le_bytes, to_le_bytes;
        read_u16_be, write_u16_be, u16, from_be_bytes, to_be_bytes;
        read_u32_le, write_u32_le, u32, from_le_bytes, to_le_bytes;
        read_u32_be, write_u32_be, u32, from_be_bytes, to_be_bytes;
        read_u64_le, write_u64_le, u64, from_le_bytes, to_le_bytes;
        read_u64_be, write_u64_be, u64, from_be_bytes, to_be_bytes;
    }
}

impl<T: Copy> Index<usize> for BinaryCursor<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index).expect("cursor index out of range")
    }
}

impl<T: Copy> IndexMut<usize> for BinaryCursor<'_, T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.get_mut(index).expect("cursor index out of range")
    }
}

impl<T: Copy> AsRef<[T]> for BinaryCursor<'_, T> {
    fn as_ref(&self) -> &[T] {
        self.remaining()
    }
}
