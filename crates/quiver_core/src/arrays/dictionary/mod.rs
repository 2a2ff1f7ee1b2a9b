pub mod array;
pub mod builder;
pub mod strategy;
pub mod values;

pub use array::{
    AnyDictionaryArray,
    DictionaryArray,
    Float32DictionaryArray,
    Float64DictionaryArray,
    Int8DictionaryArray,
    Int16DictionaryArray,
    Int32DictionaryArray,
    Int64DictionaryArray,
    StringDictionaryArray,
    UInt8DictionaryArray,
    UInt16DictionaryArray,
    UInt32DictionaryArray,
    UInt64DictionaryArray,
};
pub use builder::{
    DictionaryBuilder,
    Float32DictionaryBuilder,
    Float64DictionaryBuilder,
    Int8DictionaryBuilder,
    Int16DictionaryBuilder,
    Int32DictionaryBuilder,
    Int64DictionaryBuilder,
    StringDictionaryBuilder,
    UInt8DictionaryBuilder,
    UInt16DictionaryBuilder,
    UInt32DictionaryBuilder,
    UInt64DictionaryBuilder,
};
pub use strategy::{DefaultStrategy, DictionaryStrategy};

/// Index type used for dictionary references.
///
/// A distinct, fixed-width integer type independent of the dictionary's
/// value type.
pub type DictionaryIndex = i32;
