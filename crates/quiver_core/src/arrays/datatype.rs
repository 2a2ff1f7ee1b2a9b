use std::fmt;

use crate::arrays::array::physical_type::PhysicalType;

/// Identifies a logical type without its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeId {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal128,
    Timestamp,
    Date32,
    Date64,
    Time32,
    Time64,
    Interval,
    Utf8,
    Binary,
    FixedSizeBinary,
    List,
    Struct,
    Union,
    Map,
    Dictionary,
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float16 => write!(f, "Float16"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Decimal128 => write!(f, "Decimal128"),
            Self::Timestamp => write!(f, "Timestamp"),
            Self::Date32 => write!(f, "Date32"),
            Self::Date64 => write!(f, "Date64"),
            Self::Time32 => write!(f, "Time32"),
            Self::Time64 => write!(f, "Time64"),
            Self::Interval => write!(f, "Interval"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Binary => write!(f, "Binary"),
            Self::FixedSizeBinary => write!(f, "FixedSizeBinary"),
            Self::List => write!(f, "List"),
            Self::Struct => write!(f, "Struct"),
            Self::Union => write!(f, "Union"),
            Self::Map => write!(f, "Map"),
            Self::Dictionary => write!(f, "Dictionary"),
        }
    }
}

/// Time resolution for temporal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => write!(f, "s"),
            Self::Millisecond => write!(f, "ms"),
            Self::Microsecond => write!(f, "μs"),
            Self::Nanosecond => write!(f, "ns"),
        }
    }
}

/// Metadata associated with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalTypeMeta {
    pub precision: u8,
    pub scale: i8,
}

impl DecimalTypeMeta {
    pub const fn new(precision: u8, scale: i8) -> Self {
        DecimalTypeMeta { precision, scale }
    }
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructTypeMeta {
    pub fields: Vec<(String, DataType)>,
}

/// Metadata associated with unions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionTypeMeta {
    pub fields: Vec<DataType>,
}

/// Metadata associated with maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapTypeMeta {
    pub key: Box<DataType>,
    pub value: Box<DataType>,
}

/// Metadata associated with dictionaries: the logical type of the values
/// held in the dictionary's values buffer.
///
/// Indices are always a separate 32-bit integer type, independent of the
/// value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DictionaryTypeMeta {
    pub value: Box<DataType>,
}

impl DictionaryTypeMeta {
    pub fn new(value: DataType) -> Self {
        DictionaryTypeMeta {
            value: Box::new(value),
        }
    }
}

/// Supported logical types.
///
/// This generally follows Arrow's type system. Only a subset has a physical
/// representation in this crate; the rest exist so dictionary dispatch can
/// name what it rejects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal128(DecimalTypeMeta),
    Timestamp(TimeUnit),
    /// Days since epoch.
    Date32,
    /// Milliseconds since epoch.
    Date64,
    Time32(TimeUnit),
    Time64(TimeUnit),
    Interval,
    Utf8,
    Binary,
    /// Fixed-width binary with the element byte width.
    FixedSizeBinary(i32),
    List(ListTypeMeta),
    Struct(StructTypeMeta),
    Union(UnionTypeMeta),
    Map(MapTypeMeta),
    Dictionary(DictionaryTypeMeta),
}

impl DataType {
    /// Convenience constructor for a dictionary type over `value`.
    pub fn dictionary(value: DataType) -> Self {
        DataType::Dictionary(DictionaryTypeMeta::new(value))
    }

    /// Get the data type id from the data type.
    pub const fn datatype_id(&self) -> DataTypeId {
        match self {
            DataType::Null => DataTypeId::Null,
            DataType::Boolean => DataTypeId::Boolean,
            DataType::Int8 => DataTypeId::Int8,
            DataType::Int16 => DataTypeId::Int16,
            DataType::Int32 => DataTypeId::Int32,
            DataType::Int64 => DataTypeId::Int64,
            DataType::UInt8 => DataTypeId::UInt8,
            DataType::UInt16 => DataTypeId::UInt16,
            DataType::UInt32 => DataTypeId::UInt32,
            DataType::UInt64 => DataTypeId::UInt64,
            DataType::Float16 => DataTypeId::Float16,
            DataType::Float32 => DataTypeId::Float32,
            DataType::Float64 => DataTypeId::Float64,
            DataType::Decimal128(_) => DataTypeId::Decimal128,
            DataType::Timestamp(_) => DataTypeId::Timestamp,
            DataType::Date32 => DataTypeId::Date32,
            DataType::Date64 => DataTypeId::Date64,
            DataType::Time32(_) => DataTypeId::Time32,
            DataType::Time64(_) => DataTypeId::Time64,
            DataType::Interval => DataTypeId::Interval,
            DataType::Utf8 => DataTypeId::Utf8,
            DataType::Binary => DataTypeId::Binary,
            DataType::FixedSizeBinary(_) => DataTypeId::FixedSizeBinary,
            DataType::List(_) => DataTypeId::List,
            DataType::Struct(_) => DataTypeId::Struct,
            DataType::Union(_) => DataTypeId::Union,
            DataType::Map(_) => DataTypeId::Map,
            DataType::Dictionary(_) => DataTypeId::Dictionary,
        }
    }

    pub const fn is_dictionary(&self) -> bool {
        matches!(self, DataType::Dictionary(_))
    }

    /// Physical storage type for values of this logical type, if this crate
    /// can store them.
    pub const fn physical_type(&self) -> Option<PhysicalType> {
        Some(match self {
            DataType::Int8 => PhysicalType::Int8,
            DataType::Int16 => PhysicalType::Int16,
            DataType::Int32 => PhysicalType::Int32,
            DataType::Int64 => PhysicalType::Int64,
            DataType::UInt8 => PhysicalType::UInt8,
            DataType::UInt16 => PhysicalType::UInt16,
            DataType::UInt32 => PhysicalType::UInt32,
            DataType::UInt64 => PhysicalType::UInt64,
            DataType::Float32 => PhysicalType::Float32,
            DataType::Float64 => PhysicalType::Float64,
            DataType::Utf8 => PhysicalType::Utf8,
            _ => return None,
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal128(meta) => write!(f, "Decimal128({},{})", meta.precision, meta.scale),
            Self::Timestamp(unit) => write!(f, "Timestamp({unit})"),
            Self::Time32(unit) => write!(f, "Time32({unit})"),
            Self::Time64(unit) => write!(f, "Time64({unit})"),
            Self::FixedSizeBinary(width) => write!(f, "FixedSizeBinary({width})"),
            Self::List(meta) => write!(f, "List[{}]", meta.datatype),
            Self::Struct(meta) => {
                write!(
                    f,
                    "Struct {{{}}}",
                    meta.fields
                        .iter()
                        .map(|(name, typ)| format!("{name}: {typ}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::Union(meta) => {
                write!(
                    f,
                    "Union[{}]",
                    meta.fields
                        .iter()
                        .map(|typ| typ.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Self::Map(meta) => write!(f, "Map[{}: {}]", meta.key, meta.value),
            Self::Dictionary(meta) => write!(f, "Dictionary[{}]", meta.value),
            other => write!(f, "{}", other.datatype_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_composite_types() {
        let dict = DataType::dictionary(DataType::Utf8);
        assert_eq!("Dictionary[Utf8]", dict.to_string());

        let nested = DataType::dictionary(DataType::dictionary(DataType::Int32));
        assert_eq!("Dictionary[Dictionary[Int32]]", nested.to_string());

        assert_eq!("Timestamp(μs)", DataType::Timestamp(TimeUnit::Microsecond).to_string());
    }

    #[test]
    fn physical_types_cover_exactly_the_storable_set() {
        assert_eq!(Some(PhysicalType::Int32), DataType::Int32.physical_type());
        assert_eq!(Some(PhysicalType::Utf8), DataType::Utf8.physical_type());
        assert_eq!(None, DataType::Boolean.physical_type());
        assert_eq!(None, DataType::Float16.physical_type());
        assert_eq!(None, DataType::dictionary(DataType::Int32).physical_type());
    }
}
