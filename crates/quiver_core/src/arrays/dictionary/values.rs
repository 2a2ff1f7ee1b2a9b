use std::fmt::Debug;

use quiver_error::{QuiverError, Result};

use crate::arrays::array::array_buffer::{ArrayBuffer, ScalarBuffer, StringBuffer};
use crate::arrays::array::physical_type::{
    PhysicalF32,
    PhysicalF64,
    PhysicalI8,
    PhysicalI16,
    PhysicalI32,
    PhysicalI64,
    PhysicalU8,
    PhysicalU16,
    PhysicalU32,
    PhysicalU64,
    PhysicalUtf8,
    ScalarStorage,
};
use crate::buffer::buffer_manager::{AsBufferManager, BufferManagerRef};
use crate::buffer::typed::TypedBuffer;

/// Growable storage accumulating dictionary values during building.
///
/// Values are appended in first-appearance order and never removed;
/// `try_finish` copies them into a right-sized immutable buffer.
pub trait ValueBuffer<T: ?Sized>: Debug {
    /// Number of values accumulated.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a previously pushed value.
    fn get(&self, idx: usize) -> Option<&T>;

    /// Append a value.
    fn try_push(&mut self, value: &T) -> Result<()>;

    /// Growth hint for `additional` more values.
    fn try_reserve(&mut self, additional: usize) -> Result<()>;

    /// Copy the accumulated values into a right-sized immutable buffer
    /// allocated from `manager`.
    fn try_finish<M: AsBufferManager>(&self, manager: &M) -> Result<ArrayBuffer>;
}

/// Storage markers usable as dictionary value types.
pub trait DictionaryValue: ScalarStorage {
    type Values: ValueBuffer<Self::StorageType>;

    /// New empty accumulator backed by `manager`.
    fn new_values(manager: &BufferManagerRef) -> Self::Values;
}

/// Accumulator for fixed-width values.
#[derive(Debug)]
pub struct PrimitiveValueBuffer<S: ScalarStorage>
where
    S::StorageType: Copy,
{
    len: usize,
    values: TypedBuffer<S::StorageType>,
}

impl<S> PrimitiveValueBuffer<S>
where
    S: ScalarStorage,
    S::StorageType: Copy,
{
    pub fn empty(manager: &impl AsBufferManager) -> Self {
        PrimitiveValueBuffer {
            len: 0,
            values: TypedBuffer::empty(manager),
        }
    }
}

impl<S> ValueBuffer<S::StorageType> for PrimitiveValueBuffer<S>
where
    S: ScalarStorage,
    S::StorageType: Copy,
{
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, idx: usize) -> Option<&S::StorageType> {
        if idx >= self.len {
            return None;
        }
        Some(&self.values.as_slice()[idx])
    }

    fn try_push(&mut self, value: &S::StorageType) -> Result<()> {
        self.values.reserve_for_size(self.len + 1)?;
        self.values.as_slice_mut()[self.len] = *value;
        self.len += 1;
        Ok(())
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.values.reserve_for_size(self.len + additional)
    }

    fn try_finish<M: AsBufferManager>(&self, manager: &M) -> Result<ArrayBuffer> {
        let values = &self.values.as_slice()[..self.len];
        let buffer = ScalarBuffer::try_from_slice::<S>(manager, values)?;
        Ok(ArrayBuffer::Scalar(buffer))
    }
}

/// Accumulator for UTF-8 values: i32 offsets into a contiguous byte buffer.
#[derive(Debug)]
pub struct StringValueBuffer {
    len: usize,
    bytes_len: usize,
    offsets: TypedBuffer<i32>,
    data: TypedBuffer<u8>,
}

impl StringValueBuffer {
    pub fn empty(manager: &impl AsBufferManager) -> Self {
        StringValueBuffer {
            len: 0,
            bytes_len: 0,
            offsets: TypedBuffer::empty(manager),
            data: TypedBuffer::empty(manager),
        }
    }
}

impl ValueBuffer<str> for StringValueBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, idx: usize) -> Option<&str> {
        if idx >= self.len {
            return None;
        }

        let offsets = self.offsets.as_slice();
        let start = offsets[idx] as usize;
        let end = offsets[idx + 1] as usize;
        let bytes = &self.data.as_slice()[start..end];

        // Only complete UTF-8 strings are pushed.
        Some(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    fn try_push(&mut self, value: &str) -> Result<()> {
        let end = self
            .bytes_len
            .checked_add(value.len())
            .ok_or_else(|| QuiverError::capacity("string buffer byte size overflows usize"))?;
        if end > i32::MAX as usize {
            return Err(QuiverError::capacity(
                "string buffer exceeds i32 offset range",
            ));
        }

        self.offsets.reserve_for_size(self.len + 2)?;
        self.data.reserve_for_size(end)?;

        if self.len == 0 {
            self.offsets.as_slice_mut()[0] = 0;
        }
        self.data.as_slice_mut()[self.bytes_len..end].copy_from_slice(value.as_bytes());
        self.offsets.as_slice_mut()[self.len + 1] = end as i32;

        self.len += 1;
        self.bytes_len = end;

        Ok(())
    }

    fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.offsets.reserve_for_size(self.len + 1 + additional)
    }

    fn try_finish<M: AsBufferManager>(&self, manager: &M) -> Result<ArrayBuffer> {
        let empty_offsets = [0_i32];
        let offsets: &[i32] = if self.len == 0 {
            &empty_offsets
        } else {
            &self.offsets.as_slice()[..self.len + 1]
        };
        let data = &self.data.as_slice()[..self.bytes_len];

        let buffer = StringBuffer::try_from_parts(manager, offsets, data)?;
        Ok(ArrayBuffer::String(buffer))
    }
}

macro_rules! impl_primitive_dictionary_value {
    ($name:ident) => {
        impl DictionaryValue for $name {
            type Values = PrimitiveValueBuffer<$name>;

            fn new_values(manager: &BufferManagerRef) -> Self::Values {
                PrimitiveValueBuffer::empty(manager)
            }
        }
    };
}

impl_primitive_dictionary_value!(PhysicalI8);
impl_primitive_dictionary_value!(PhysicalI16);
impl_primitive_dictionary_value!(PhysicalI32);
impl_primitive_dictionary_value!(PhysicalI64);
impl_primitive_dictionary_value!(PhysicalU8);
impl_primitive_dictionary_value!(PhysicalU16);
impl_primitive_dictionary_value!(PhysicalU32);
impl_primitive_dictionary_value!(PhysicalU64);
impl_primitive_dictionary_value!(PhysicalF32);
impl_primitive_dictionary_value!(PhysicalF64);

impl DictionaryValue for PhysicalUtf8 {
    type Values = StringValueBuffer;

    fn new_values(manager: &BufferManagerRef) -> Self::Values {
        StringValueBuffer::empty(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::buffer_manager::default_buffer_manager;

    #[test]
    fn primitive_push_and_get() {
        let manager = default_buffer_manager();
        let mut values = PrimitiveValueBuffer::<PhysicalI64>::empty(&manager);

        values.try_push(&3).unwrap();
        values.try_push(&-4).unwrap();

        assert_eq!(2, values.len());
        assert_eq!(Some(&3), values.get(0));
        assert_eq!(Some(&-4), values.get(1));
        assert_eq!(None, values.get(2));
    }

    #[test]
    fn primitive_finish_right_sizes() {
        let manager = default_buffer_manager();
        let mut values = PrimitiveValueBuffer::<PhysicalI32>::empty(&manager);
        values.try_reserve(16).unwrap();
        values.try_push(&1).unwrap();
        values.try_push(&2).unwrap();

        let buffer = values.try_finish(&manager).unwrap();
        let scalar = buffer.get_scalar_buffer().unwrap();
        assert_eq!(2, scalar.len());
        assert_eq!(&[1, 2], scalar.try_as_slice::<PhysicalI32>().unwrap());
    }

    #[test]
    fn string_push_and_get() {
        let manager = default_buffer_manager();
        let mut values = StringValueBuffer::empty(&manager);

        values.try_push("alpha").unwrap();
        values.try_push("").unwrap();
        values.try_push("βeta").unwrap();

        assert_eq!(3, values.len());
        assert_eq!(Some("alpha"), values.get(0));
        assert_eq!(Some(""), values.get(1));
        assert_eq!(Some("βeta"), values.get(2));
        assert_eq!(None, values.get(3));
    }

    #[test]
    fn string_finish_empty() {
        let manager = default_buffer_manager();
        let values = StringValueBuffer::empty(&manager);

        let buffer = values.try_finish(&manager).unwrap();
        let strings = buffer.get_string_buffer().unwrap();
        assert!(strings.is_empty());
    }

    #[test]
    fn string_finish_roundtrips() {
        let manager = default_buffer_manager();
        let mut values = StringValueBuffer::empty(&manager);
        values.try_push("x").unwrap();
        values.try_push("yz").unwrap();

        let buffer = values.try_finish(&manager).unwrap();
        let strings = buffer.get_string_buffer().unwrap();
        assert_eq!(2, strings.len());
        assert_eq!(Some("x"), strings.get(0));
        assert_eq!(Some("yz"), strings.get(1));
    }
}
