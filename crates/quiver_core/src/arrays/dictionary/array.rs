use std::marker::PhantomData;

use quiver_error::{QuiverError, Result};

use super::DictionaryIndex;
use crate::arrays::array::ArrayData;
use crate::arrays::array::array_buffer::BitmapBuffer;
use crate::arrays::array::physical_type::{
    Addressable,
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
use crate::arrays::datatype::{DataType, DataTypeId};

/// Buffer order within a dictionary array's descriptor.
const VALIDITY_BUFFER_IDX: usize = 0;
const INDICES_BUFFER_IDX: usize = 1;
const VALUES_BUFFER_IDX: usize = 2;

/// Typed, immutable read view over a dictionary-encoded array.
///
/// Wraps a descriptor whose type tag is known to be a dictionary over the
/// element type `S` reads. Views hold no mutable state and are safe to
/// share across readers without synchronization.
#[derive(Debug)]
pub struct DictionaryArray<S: ScalarStorage> {
    data: ArrayData,
    unique_values: usize,
    _type: PhantomData<S>,
}

impl<S> DictionaryArray<S>
where
    S: ScalarStorage,
{
    /// Construct a typed view over `data`, validating the descriptor layout.
    ///
    /// `unique_values` is the number of entries in the values buffer. It is
    /// carried alongside the descriptor since it's not derivable from buffer
    /// lengths once offsets are involved.
    pub fn try_new(data: ArrayData, unique_values: usize) -> Result<Self> {
        let meta = match data.datatype() {
            DataType::Dictionary(meta) => meta,
            other => {
                return Err(QuiverError::type_mismatch(
                    "a dictionary type",
                    other.datatype_id(),
                ));
            }
        };

        match meta.value.physical_type() {
            Some(physical) if physical == S::PHYSICAL_TYPE => (),
            _ => {
                return Err(QuiverError::type_mismatch(
                    S::PHYSICAL_TYPE,
                    meta.value.datatype_id(),
                ));
            }
        }

        {
            let buffers = data.buffers();
            if buffers.len() != 3 {
                return Err(QuiverError::corrupt_data(format!(
                    "dictionary array requires exactly 3 buffers, got {}",
                    buffers.len()
                )));
            }

            let physical_len = data.offset() + data.len();

            let validity = buffers[VALIDITY_BUFFER_IDX].get_bitmap_buffer()?;
            if validity.bit_len() < physical_len {
                return Err(QuiverError::corrupt_data(format!(
                    "validity bitmap holds {} bits, need {physical_len}",
                    validity.bit_len()
                )));
            }

            let indices = buffers[INDICES_BUFFER_IDX]
                .get_scalar_buffer()?
                .try_as_slice::<PhysicalI32>()?;
            if indices.len() < physical_len {
                return Err(QuiverError::corrupt_data(format!(
                    "indices buffer holds {} entries, need {physical_len}",
                    indices.len()
                )));
            }

            let values = S::get_addressable(&buffers[VALUES_BUFFER_IDX])?;
            if values.len() != unique_values {
                return Err(QuiverError::corrupt_data(format!(
                    "values buffer holds {} entries, expected {unique_values} unique values",
                    values.len()
                )));
            }
        }

        Ok(DictionaryArray {
            data,
            unique_values,
            _type: PhantomData,
        })
    }

    /// Logical number of rows.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of distinct values in the dictionary.
    pub const fn unique_values_len(&self) -> usize {
        self.unique_values
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn offset(&self) -> usize {
        self.data.offset()
    }

    pub fn datatype(&self) -> &DataType {
        self.data.datatype()
    }

    /// The underlying descriptor.
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Consume the view, returning the descriptor.
    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Addressable view over the unique values, in first-appearance order.
    pub fn values(&self) -> S::Addressable<'_> {
        S::get_addressable(&self.data.buffers()[VALUES_BUFFER_IDX])
            .expect("values buffer validated at construction")
    }

    /// Whether the row at `idx` is null.
    pub fn is_null(&self, idx: usize) -> Result<bool> {
        let len = self.data.len();
        if idx >= len {
            return Err(QuiverError::OutOfBounds { idx, len });
        }
        Ok(!self.validity().value(self.data.offset() + idx))
    }

    /// Stored index for the row at `idx`, without consulting validity.
    ///
    /// At null rows this returns the placeholder index.
    pub fn index(&self, idx: usize) -> Result<DictionaryIndex> {
        let len = self.data.len();
        if idx >= len {
            return Err(QuiverError::OutOfBounds { idx, len });
        }
        Ok(self.index_slice()[self.data.offset() + idx])
    }

    /// Get the value at `idx`.
    ///
    /// Returns `None` for null rows. A stored index outside the dictionary
    /// means the data was corrupted after it was built; the read fails
    /// rather than guessing.
    pub fn get(&self, idx: usize) -> Result<Option<&S::StorageType>> {
        let len = self.data.len();
        if idx >= len {
            return Err(QuiverError::OutOfBounds { idx, len });
        }

        let pos = self.data.offset() + idx;
        if !self.validity().value(pos) {
            return Ok(None);
        }

        let key = self.index_slice()[pos];
        if key < 0 || key as usize >= self.unique_values {
            return Err(QuiverError::corrupt_data(format!(
                "stored index {key} out of range for dictionary of {} values",
                self.unique_values
            )));
        }

        let value = self
            .values()
            .get(key as usize)
            .expect("index within values buffer");
        Ok(Some(value))
    }

    fn validity(&self) -> &BitmapBuffer {
        self.data.buffers()[VALIDITY_BUFFER_IDX]
            .get_bitmap_buffer()
            .expect("validity buffer validated at construction")
    }

    fn index_slice(&self) -> &[DictionaryIndex] {
        self.data.buffers()[INDICES_BUFFER_IDX]
            .get_scalar_buffer()
            .and_then(|buf| buf.try_as_slice::<PhysicalI32>())
            .expect("indices buffer validated at construction")
    }
}

pub type Int8DictionaryArray = DictionaryArray<PhysicalI8>;
pub type Int16DictionaryArray = DictionaryArray<PhysicalI16>;
pub type Int32DictionaryArray = DictionaryArray<PhysicalI32>;
pub type Int64DictionaryArray = DictionaryArray<PhysicalI64>;
pub type UInt8DictionaryArray = DictionaryArray<PhysicalU8>;
pub type UInt16DictionaryArray = DictionaryArray<PhysicalU16>;
pub type UInt32DictionaryArray = DictionaryArray<PhysicalU32>;
pub type UInt64DictionaryArray = DictionaryArray<PhysicalU64>;
pub type Float32DictionaryArray = DictionaryArray<PhysicalF32>;
pub type Float64DictionaryArray = DictionaryArray<PhysicalF64>;
pub type StringDictionaryArray = DictionaryArray<PhysicalUtf8>;

/// A dictionary array over any supported value type.
///
/// Closed enumeration: constructing one is the type-dispatch step that
/// recovers a typed view from an untyped descriptor, and the match in
/// `try_from_data` is the complete allow-list. New value types are added
/// there deliberately, never by fallback.
#[derive(Debug)]
pub enum AnyDictionaryArray {
    UInt8(UInt8DictionaryArray),
    Int8(Int8DictionaryArray),
    UInt16(UInt16DictionaryArray),
    Int16(Int16DictionaryArray),
    UInt32(UInt32DictionaryArray),
    Int32(Int32DictionaryArray),
    UInt64(UInt64DictionaryArray),
    Int64(Int64DictionaryArray),
    Float32(Float32DictionaryArray),
    Float64(Float64DictionaryArray),
    Utf8(StringDictionaryArray),
}

impl AnyDictionaryArray {
    /// Recover a typed dictionary view from an untyped descriptor.
    ///
    /// Dispatches on the dictionary's contained value-type tag. Construction
    /// borrows the descriptor's buffers in place, no buffer contents are
    /// copied.
    pub fn try_from_data(data: ArrayData, unique_values: usize) -> Result<Self> {
        let value_id = match data.datatype() {
            DataType::Dictionary(meta) => meta.value.datatype_id(),
            other => {
                return Err(QuiverError::type_mismatch(
                    "a dictionary type",
                    other.datatype_id(),
                ));
            }
        };

        match value_id {
            DataTypeId::UInt8 => Ok(Self::UInt8(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::Int8 => Ok(Self::Int8(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::UInt16 => Ok(Self::UInt16(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::Int16 => Ok(Self::Int16(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::UInt32 => Ok(Self::UInt32(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::Int32 => Ok(Self::Int32(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::UInt64 => Ok(Self::UInt64(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::Int64 => Ok(Self::Int64(DictionaryArray::try_new(data, unique_values)?)),
            DataTypeId::Float32 => {
                Ok(Self::Float32(DictionaryArray::try_new(data, unique_values)?))
            }
            DataTypeId::Float64 => {
                Ok(Self::Float64(DictionaryArray::try_new(data, unique_values)?))
            }
            DataTypeId::Utf8 => Ok(Self::Utf8(DictionaryArray::try_new(data, unique_values)?)),
            other => {
                tracing::debug!(%other, "rejecting dictionary value type");
                Err(QuiverError::unsupported_type(other))
            }
        }
    }

    /// Logical number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::UInt8(arr) => arr.len(),
            Self::Int8(arr) => arr.len(),
            Self::UInt16(arr) => arr.len(),
            Self::Int16(arr) => arr.len(),
            Self::UInt32(arr) => arr.len(),
            Self::Int32(arr) => arr.len(),
            Self::UInt64(arr) => arr.len(),
            Self::Int64(arr) => arr.len(),
            Self::Float32(arr) => arr.len(),
            Self::Float64(arr) => arr.len(),
            Self::Utf8(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct values in the dictionary.
    pub fn unique_values_len(&self) -> usize {
        match self {
            Self::UInt8(arr) => arr.unique_values_len(),
            Self::Int8(arr) => arr.unique_values_len(),
            Self::UInt16(arr) => arr.unique_values_len(),
            Self::Int16(arr) => arr.unique_values_len(),
            Self::UInt32(arr) => arr.unique_values_len(),
            Self::Int32(arr) => arr.unique_values_len(),
            Self::UInt64(arr) => arr.unique_values_len(),
            Self::Int64(arr) => arr.unique_values_len(),
            Self::Float32(arr) => arr.unique_values_len(),
            Self::Float64(arr) => arr.unique_values_len(),
            Self::Utf8(arr) => arr.unique_values_len(),
        }
    }

    pub fn datatype(&self) -> &DataType {
        match self {
            Self::UInt8(arr) => arr.datatype(),
            Self::Int8(arr) => arr.datatype(),
            Self::UInt16(arr) => arr.datatype(),
            Self::Int16(arr) => arr.datatype(),
            Self::UInt32(arr) => arr.datatype(),
            Self::Int32(arr) => arr.datatype(),
            Self::UInt64(arr) => arr.datatype(),
            Self::Int64(arr) => arr.datatype(),
            Self::Float32(arr) => arr.datatype(),
            Self::Float64(arr) => arr.datatype(),
            Self::Utf8(arr) => arr.datatype(),
        }
    }
}
