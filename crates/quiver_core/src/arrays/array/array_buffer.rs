use std::fmt;

use quiver_error::{QuiverError, Result};

use super::physical_type::{PhysicalType, ScalarStorage};
use crate::arrays::bitmap::Bitmap;
use crate::buffer::buffer_manager::AsBufferManager;
use crate::buffer::raw::RawBuffer;
use crate::buffer::typed::TypedBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayBufferKind {
    Bitmap,
    Scalar,
    String,
}

impl ArrayBufferKind {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Bitmap => "Bitmap",
            Self::Scalar => "Scalar",
            Self::String => "String",
        }
    }
}

impl fmt::Display for ArrayBufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable storage slot owned by an `ArrayData`.
///
/// Buffers are right-sized at build time and never mutated afterwards,
/// making descriptors safe to read from multiple threads without
/// synchronization.
#[derive(Debug)]
pub enum ArrayBuffer {
    Bitmap(BitmapBuffer),
    Scalar(ScalarBuffer),
    String(StringBuffer),
}

impl ArrayBuffer {
    pub const fn kind(&self) -> ArrayBufferKind {
        match self {
            Self::Bitmap(_) => ArrayBufferKind::Bitmap,
            Self::Scalar(_) => ArrayBufferKind::Scalar,
            Self::String(_) => ArrayBufferKind::String,
        }
    }

    /// Logical number of elements (bits, values, or strings) in the buffer.
    pub fn logical_len(&self) -> usize {
        match self {
            Self::Bitmap(buf) => buf.bit_len(),
            Self::Scalar(buf) => buf.len(),
            Self::String(buf) => buf.len(),
        }
    }

    pub fn get_bitmap_buffer(&self) -> Result<&BitmapBuffer> {
        match self {
            Self::Bitmap(buf) => Ok(buf),
            other => Err(QuiverError::corrupt_data(format!(
                "expected bitmap buffer, got {}",
                other.kind()
            ))),
        }
    }

    pub fn get_scalar_buffer(&self) -> Result<&ScalarBuffer> {
        match self {
            Self::Scalar(buf) => Ok(buf),
            other => Err(QuiverError::corrupt_data(format!(
                "expected scalar buffer, got {}",
                other.kind()
            ))),
        }
    }

    pub fn get_string_buffer(&self) -> Result<&StringBuffer> {
        match self {
            Self::String(buf) => Ok(buf),
            other => Err(QuiverError::corrupt_data(format!(
                "expected string buffer, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<BitmapBuffer> for ArrayBuffer {
    fn from(value: BitmapBuffer) -> Self {
        Self::Bitmap(value)
    }
}

impl From<ScalarBuffer> for ArrayBuffer {
    fn from(value: ScalarBuffer) -> Self {
        Self::Scalar(value)
    }
}

impl From<StringBuffer> for ArrayBuffer {
    fn from(value: StringBuffer) -> Self {
        Self::String(value)
    }
}

/// Bit-packed validity stored in a manager-backed buffer.
#[derive(Debug)]
pub struct BitmapBuffer {
    bit_len: usize,
    data: TypedBuffer<u8>,
}

impl BitmapBuffer {
    /// Copy `bitmap` into a right-sized buffer allocated from `manager`.
    pub fn try_from_bitmap(manager: &impl AsBufferManager, bitmap: &Bitmap) -> Result<Self> {
        let bytes = bitmap.data();
        let mut data = TypedBuffer::try_with_capacity(manager, bytes.len())?;
        data.as_slice_mut()[..bytes.len()].copy_from_slice(bytes);

        Ok(BitmapBuffer {
            bit_len: bitmap.len(),
            data,
        })
    }

    /// Number of bits tracked by this buffer.
    pub const fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Value of the bit at `idx`.
    ///
    /// Panics if out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.bit_len);
        let byte = self.data.as_slice()[idx >> 3];
        (byte >> (idx & 7)) & 1 != 0
    }
}

/// Fixed-width values stored contiguously.
///
/// Type-erased; access goes through `try_as_slice` which checks the
/// requested physical type against what the buffer holds.
#[derive(Debug)]
pub struct ScalarBuffer {
    physical_type: PhysicalType,
    len: usize,
    raw: RawBuffer,
}

impl ScalarBuffer {
    /// Copy `values` into a right-sized buffer allocated from `manager`.
    pub fn try_from_slice<S>(
        manager: &impl AsBufferManager,
        values: &[S::StorageType],
    ) -> Result<Self>
    where
        S: ScalarStorage,
        S::StorageType: Sized + Copy,
    {
        let mut raw = RawBuffer::try_with_capacity::<S::StorageType>(manager, values.len())?;
        let dst = unsafe { raw.as_slice_mut::<S::StorageType>() };
        dst[..values.len()].copy_from_slice(values);

        Ok(ScalarBuffer {
            physical_type: S::PHYSICAL_TYPE,
            len: values.len(),
            raw,
        })
    }

    pub const fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the buffer as a typed slice.
    pub fn try_as_slice<S>(&self) -> Result<&[S::StorageType]>
    where
        S: ScalarStorage,
        S::StorageType: Sized,
    {
        if self.physical_type != S::PHYSICAL_TYPE {
            return Err(QuiverError::type_mismatch(
                S::PHYSICAL_TYPE,
                self.physical_type,
            ));
        }

        let buf = unsafe { self.raw.as_slice::<S::StorageType>() };
        Ok(&buf[..self.len])
    }
}

/// Variable-length UTF-8 values stored as i32 offsets into a contiguous
/// byte buffer.
///
/// Offsets hold `len + 1` entries starting at 0. Offsets and data are
/// validated once at construction so reads can slice without re-checking.
#[derive(Debug)]
pub struct StringBuffer {
    len: usize,
    offsets: TypedBuffer<i32>,
    data: TypedBuffer<u8>,
}

impl StringBuffer {
    /// Copy `offsets` and `data` into right-sized buffers allocated from
    /// `manager`, validating the layout.
    pub fn try_from_parts(
        manager: &impl AsBufferManager,
        offsets: &[i32],
        data: &[u8],
    ) -> Result<Self> {
        if offsets.is_empty() || offsets[0] != 0 {
            return Err(QuiverError::corrupt_data(
                "string buffer offsets must start at 0",
            ));
        }
        for win in offsets.windows(2) {
            if win[1] < win[0] {
                return Err(QuiverError::corrupt_data(
                    "string buffer offsets must be non-decreasing",
                ));
            }
        }
        let last = offsets[offsets.len() - 1];
        if last as usize != data.len() {
            return Err(QuiverError::corrupt_data(format!(
                "string buffer last offset {last} does not match data length {}",
                data.len()
            )));
        }

        let text = std::str::from_utf8(data)
            .map_err(|_| QuiverError::corrupt_data("string buffer contains invalid UTF-8"))?;
        for &offset in offsets {
            if !text.is_char_boundary(offset as usize) {
                return Err(QuiverError::corrupt_data(format!(
                    "string buffer offset {offset} splits a UTF-8 sequence"
                )));
            }
        }

        let mut offsets_buf = TypedBuffer::try_with_capacity(manager, offsets.len())?;
        offsets_buf.as_slice_mut()[..offsets.len()].copy_from_slice(offsets);

        let mut data_buf = TypedBuffer::try_with_capacity(manager, data.len())?;
        data_buf.as_slice_mut()[..data.len()].copy_from_slice(data);

        Ok(StringBuffer {
            len: offsets.len() - 1,
            offsets: offsets_buf,
            data: data_buf,
        })
    }

    /// Number of strings in the buffer.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the string at `idx`.
    pub fn get(&self, idx: usize) -> Option<&str> {
        if idx >= self.len {
            return None;
        }

        let offsets = self.offsets.as_slice();
        let start = offsets[idx] as usize;
        let end = offsets[idx + 1] as usize;
        let bytes = &self.data.as_slice()[start..end];

        // Offsets and UTF-8 validated at construction.
        Some(unsafe { std::str::from_utf8_unchecked(bytes) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::physical_type::{PhysicalF64, PhysicalI32};
    use crate::buffer::buffer_manager::default_buffer_manager;

    #[test]
    fn scalar_buffer_roundtrip() {
        let buf =
            ScalarBuffer::try_from_slice::<PhysicalI32>(&default_buffer_manager(), &[1, 2, 3])
                .unwrap();

        assert_eq!(3, buf.len());
        assert_eq!(PhysicalType::Int32, buf.physical_type());
        assert_eq!(&[1, 2, 3], buf.try_as_slice::<PhysicalI32>().unwrap());
    }

    #[test]
    fn scalar_buffer_checks_physical_type() {
        let buf =
            ScalarBuffer::try_from_slice::<PhysicalI32>(&default_buffer_manager(), &[1, 2, 3])
                .unwrap();

        let err = buf.try_as_slice::<PhysicalF64>().unwrap_err();
        assert_eq!(
            "type mismatch: expected Float64, got Int32",
            err.to_string()
        );
    }

    #[test]
    fn string_buffer_roundtrip() {
        // 'ド' is 3 bytes, the offset at 3 splits it.
        StringBuffer::try_from_parts(&default_buffer_manager(), &[0, 1, 3, 4], "aド".as_bytes())
            .unwrap_err();

        let buf = StringBuffer::try_from_parts(
            &default_buffer_manager(),
            &[0, 1, 4, 4, 6],
            "aドï".as_bytes(),
        )
        .unwrap();

        assert_eq!(4, buf.len());
        assert_eq!(Some("a"), buf.get(0));
        assert_eq!(Some("ド"), buf.get(1));
        assert_eq!(Some(""), buf.get(2));
        assert_eq!(Some("ï"), buf.get(3));
        assert_eq!(None, buf.get(4));
    }

    #[test]
    fn string_buffer_rejects_bad_offsets() {
        let manager = default_buffer_manager();

        StringBuffer::try_from_parts(&manager, &[], b"").unwrap_err();
        StringBuffer::try_from_parts(&manager, &[1, 2], b"ab").unwrap_err();
        StringBuffer::try_from_parts(&manager, &[0, 2, 1], b"ab").unwrap_err();
        StringBuffer::try_from_parts(&manager, &[0, 1], b"ab").unwrap_err();
    }

    #[test]
    fn string_buffer_rejects_invalid_utf8() {
        StringBuffer::try_from_parts(&default_buffer_manager(), &[0, 2], &[0xff, 0xfe])
            .unwrap_err();
    }

    #[test]
    fn bitmap_buffer_reads_bits() {
        let mut bitmap = Bitmap::default();
        for val in [true, false, true, true] {
            bitmap.push(val);
        }

        let buf = BitmapBuffer::try_from_bitmap(&default_buffer_manager(), &bitmap).unwrap();
        assert_eq!(4, buf.bit_len());
        assert!(buf.value(0));
        assert!(!buf.value(1));
        assert!(buf.value(3));
    }

    #[test]
    fn buffer_kind_accessors() {
        let mut bitmap = Bitmap::default();
        bitmap.push(true);
        let buf: ArrayBuffer =
            BitmapBuffer::try_from_bitmap(&default_buffer_manager(), &bitmap)
                .unwrap()
                .into();

        assert_eq!(ArrayBufferKind::Bitmap, buf.kind());
        assert_eq!(1, buf.logical_len());
        buf.get_bitmap_buffer().unwrap();
        buf.get_scalar_buffer().unwrap_err();
        buf.get_string_buffer().unwrap_err();
    }
}
