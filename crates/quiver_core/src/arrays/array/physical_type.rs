use std::fmt::{self, Debug};

use quiver_error::Result;

use super::array_buffer::{ArrayBuffer, StringBuffer};
use crate::arrays::datatype::DataType;

/// Physical storage types this crate can hold in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
}

impl PhysicalType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::UInt8 => "UInt8",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Utf8 => "Utf8",
        }
    }

    /// Logical type whose arrays store values with this physical layout.
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::Int8 => DataType::Int8,
            Self::Int16 => DataType::Int16,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::UInt8 => DataType::UInt8,
            Self::UInt16 => DataType::UInt16,
            Self::UInt32 => DataType::UInt32,
            Self::UInt64 => DataType::UInt64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents an in-memory buffer that can be indexed into to retrieve
/// values.
pub trait Addressable<'a>: Debug {
    /// The type that gets returned.
    type T: Send + Debug + ?Sized;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a value at the given index.
    fn get(&self, idx: usize) -> Option<&'a Self::T>;
}

impl<'a, T> Addressable<'a> for &'a [T]
where
    T: Debug + Send,
{
    type T = T;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, idx: usize) -> Option<&'a Self::T> {
        (**self).get(idx)
    }
}

/// Addressable view over a string buffer.
#[derive(Debug)]
pub struct StringAddressable<'a> {
    pub(crate) buffer: &'a StringBuffer,
}

impl<'a> Addressable<'a> for StringAddressable<'a> {
    type T = str;

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn get(&self, idx: usize) -> Option<&'a str> {
        self.buffer.get(idx)
    }
}

/// Helper trait for getting at the underlying data of an array buffer.
///
/// Implemented by zero-sized marker types, one per physical type, so that
/// generic arrays and builders can be instantiated per element type instead
/// of hand-duplicating near-identical definitions.
pub trait ScalarStorage: Debug + Default + Sync + Send + Clone + Copy + 'static {
    const PHYSICAL_TYPE: PhysicalType;

    /// The value type read out of the buffer.
    type StorageType: Sync + Send + Debug + ?Sized;

    /// The type of the addressable storage.
    type Addressable<'a>: Addressable<'a, T = Self::StorageType>;

    /// Get addressable storage for reading values out of `buffer`.
    fn get_addressable(buffer: &ArrayBuffer) -> Result<Self::Addressable<'_>>;
}

macro_rules! generate_primitive {
    ($prim:ty, $name:ident, $variant:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl ScalarStorage for $name {
            const PHYSICAL_TYPE: PhysicalType = PhysicalType::$variant;

            type StorageType = $prim;
            type Addressable<'a> = &'a [Self::StorageType];

            fn get_addressable(buffer: &ArrayBuffer) -> Result<Self::Addressable<'_>> {
                buffer.get_scalar_buffer()?.try_as_slice::<Self>()
            }
        }
    };
}

generate_primitive!(i8, PhysicalI8, Int8);
generate_primitive!(i16, PhysicalI16, Int16);
generate_primitive!(i32, PhysicalI32, Int32);
generate_primitive!(i64, PhysicalI64, Int64);

generate_primitive!(u8, PhysicalU8, UInt8);
generate_primitive!(u16, PhysicalU16, UInt16);
generate_primitive!(u32, PhysicalU32, UInt32);
generate_primitive!(u64, PhysicalU64, UInt64);

generate_primitive!(f32, PhysicalF32, Float32);
generate_primitive!(f64, PhysicalF64, Float64);

#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalUtf8;

impl ScalarStorage for PhysicalUtf8 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Utf8;

    type StorageType = str;
    type Addressable<'a> = StringAddressable<'a>;

    fn get_addressable(buffer: &ArrayBuffer) -> Result<Self::Addressable<'_>> {
        Ok(StringAddressable {
            buffer: buffer.get_string_buffer()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::array_buffer::ScalarBuffer;
    use crate::buffer::buffer_manager::default_buffer_manager;

    #[test]
    fn physical_datatype_mapping_is_inverse() {
        for physical in [
            PhysicalType::Int8,
            PhysicalType::Int16,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::UInt8,
            PhysicalType::UInt16,
            PhysicalType::UInt32,
            PhysicalType::UInt64,
            PhysicalType::Float32,
            PhysicalType::Float64,
            PhysicalType::Utf8,
        ] {
            assert_eq!(Some(physical), physical.datatype().physical_type());
        }
    }

    #[test]
    fn addressable_over_scalar_buffer() {
        let buf: ArrayBuffer =
            ScalarBuffer::try_from_slice::<PhysicalU16>(&default_buffer_manager(), &[7, 8])
                .unwrap()
                .into();

        let addressable = PhysicalU16::get_addressable(&buf).unwrap();
        assert_eq!(2, addressable.len());
        assert_eq!(Some(&8), addressable.get(1));
        assert_eq!(None, addressable.get(2));

        PhysicalI64::get_addressable(&buf).unwrap_err();
        PhysicalUtf8::get_addressable(&buf).unwrap_err();
    }
}
