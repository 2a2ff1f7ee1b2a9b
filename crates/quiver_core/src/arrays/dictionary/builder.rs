use hashbrown::HashMap;
use hashbrown::hash_map::RawEntryMut;
use quiver_error::{QuiverError, Result};

use super::DictionaryIndex;
use super::array::DictionaryArray;
use super::strategy::{DefaultStrategy, DictionaryStrategy};
use super::values::{DictionaryValue, ValueBuffer};
use crate::arrays::array::ArrayData;
use crate::arrays::array::array_buffer::{ArrayBuffer, BitmapBuffer, ScalarBuffer};
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
};
use crate::arrays::bitmap::Bitmap;
use crate::arrays::datatype::{DataType, DictionaryTypeMeta};
use crate::buffer::buffer_manager::{AsBufferManager, BufferManagerRef, default_buffer_manager};
use crate::buffer::typed::TypedBuffer;

/// Deduplicating builder for dictionary arrays.
///
/// Values are interned on first appearance; later appends of an equal value
/// reuse the assigned index, so the values buffer holds each distinct value
/// exactly once, in the order values first appeared.
///
/// Builders are single-writer: nothing synchronizes the dedup map or the
/// growable buffers. Parallel ingestion means partitioning the input and
/// building independent dictionaries.
#[derive(Debug)]
pub struct DictionaryBuilder<S, C = DefaultStrategy>
where
    S: DictionaryValue,
    C: DictionaryStrategy<S::StorageType>,
{
    strategy: C,
    manager: BufferManagerRef,
    /// Maps interned values to their dictionary index.
    ///
    /// Keys are indices into `values`; hashing and equality go through the
    /// strategy against the stored value, so no value copies live here.
    dedup: HashMap<DictionaryIndex, (), ()>,
    values: S::Values,
    indices: TypedBuffer<DictionaryIndex>,
    validity: Bitmap,
    len: usize,
    null_count: usize,
    finished: bool,
}

impl<S> DictionaryBuilder<S>
where
    S: DictionaryValue,
    DefaultStrategy: DictionaryStrategy<S::StorageType>,
{
    /// New builder with the default strategy and the shared default buffer
    /// manager.
    pub fn new() -> Self {
        Self::with_strategy(DefaultStrategy)
    }
}

impl<S> Default for DictionaryBuilder<S>
where
    S: DictionaryValue,
    DefaultStrategy: DictionaryStrategy<S::StorageType>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> DictionaryBuilder<S, C>
where
    S: DictionaryValue,
    C: DictionaryStrategy<S::StorageType>,
{
    /// New builder with a custom hash/equality strategy.
    ///
    /// The strategy must hash equal values to equal hashes, otherwise
    /// deduplication silently duplicates entries.
    pub fn with_strategy(strategy: C) -> Self {
        Self::with_strategy_and_manager(strategy, default_buffer_manager())
    }

    /// New builder accumulating its growable state in buffers from
    /// `manager`.
    pub fn with_strategy_and_manager(strategy: C, manager: BufferManagerRef) -> Self {
        DictionaryBuilder {
            strategy,
            dedup: HashMap::with_hasher(()),
            values: S::new_values(&manager),
            indices: TypedBuffer::empty(&manager),
            validity: Bitmap::default(),
            len: 0,
            null_count: 0,
            finished: false,
            manager,
        }
    }

    /// Logical number of rows appended so far.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct values interned so far.
    pub fn unique_values_len(&self) -> usize {
        self.values.len()
    }

    pub const fn null_count(&self) -> usize {
        self.null_count
    }

    /// Hint that `additional` more rows will be appended.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.indices.reserve_for_size(self.len + additional)
    }

    /// Append a possibly-null value.
    pub fn append_option(&mut self, value: Option<&S::StorageType>) -> Result<()> {
        match value {
            Some(value) => self.append_value(value),
            None => self.append_null(),
        }
    }

    /// Append a null row.
    ///
    /// Stores a placeholder index that readers never dereference; the row's
    /// validity bit is clear.
    pub fn append_null(&mut self) -> Result<()> {
        self.ensure_not_finished()?;

        self.push_index(0)?;
        self.validity.push(false);
        self.null_count += 1;
        self.len += 1;

        Ok(())
    }

    /// Append a value, interning it on first appearance.
    pub fn append_value(&mut self, value: &S::StorageType) -> Result<()> {
        self.ensure_not_finished()?;

        let idx = self.intern(value)?;
        self.push_index(idx)?;
        self.validity.push(true);
        self.len += 1;

        Ok(())
    }

    /// Finalize into an immutable array using the builder's manager.
    pub fn try_build(&mut self) -> Result<DictionaryArray<S>> {
        let manager = self.manager.clone();
        self.try_build_with(&manager)
    }

    /// Finalize into an immutable array, allocating the final right-sized
    /// buffers from `manager`.
    ///
    /// The builder is consumed: any later append or build fails with an
    /// invalid-state error.
    pub fn try_build_with(&mut self, manager: &impl AsBufferManager) -> Result<DictionaryArray<S>> {
        self.ensure_not_finished()?;
        self.finished = true;

        let unique_values = self.values.len();
        tracing::trace!(len = self.len, unique_values, "building dictionary array");

        let validity = BitmapBuffer::try_from_bitmap(manager, &self.validity)?;
        let indices = ScalarBuffer::try_from_slice::<PhysicalI32>(
            manager,
            &self.indices.as_slice()[..self.len],
        )?;
        let values = self.values.try_finish(manager)?;

        let datatype = DataType::Dictionary(DictionaryTypeMeta::new(S::PHYSICAL_TYPE.datatype()));
        let data = ArrayData::try_new(
            datatype,
            self.len,
            self.null_count,
            0,
            vec![
                ArrayBuffer::Bitmap(validity),
                ArrayBuffer::Scalar(indices),
                values,
            ],
        )?;

        DictionaryArray::try_new(data, unique_values)
    }

    /// Resolve the dictionary index for `value`, inserting it if new.
    fn intern(&mut self, value: &S::StorageType) -> Result<DictionaryIndex> {
        let strategy = &self.strategy;
        let values = &mut self.values;

        let hash = strategy.hash_value(value);
        let entry = self.dedup.raw_entry_mut().from_hash(hash, |&idx| {
            let stored = values.get(idx as usize).expect("interned index to be valid");
            strategy.eq_values(value, stored)
        });

        match entry {
            RawEntryMut::Occupied(entry) => Ok(*entry.into_key()),
            RawEntryMut::Vacant(entry) => {
                let idx = DictionaryIndex::try_from(values.len())
                    .map_err(|_| QuiverError::capacity("dictionary exceeds i32 index range"))?;
                values.try_push(value)?;
                entry.insert_with_hasher(hash, idx, (), |&idx| {
                    let stored = values.get(idx as usize).expect("interned index to be valid");
                    strategy.hash_value(stored)
                });
                Ok(idx)
            }
        }
    }

    fn push_index(&mut self, idx: DictionaryIndex) -> Result<()> {
        self.indices.reserve_for_size(self.len + 1)?;
        self.indices.as_slice_mut()[self.len] = idx;
        Ok(())
    }

    fn ensure_not_finished(&self) -> Result<()> {
        if self.finished {
            return Err(QuiverError::invalid_state(
                "dictionary builder already finalized",
            ));
        }
        Ok(())
    }
}

pub type Int8DictionaryBuilder = DictionaryBuilder<PhysicalI8>;
pub type Int16DictionaryBuilder = DictionaryBuilder<PhysicalI16>;
pub type Int32DictionaryBuilder = DictionaryBuilder<PhysicalI32>;
pub type Int64DictionaryBuilder = DictionaryBuilder<PhysicalI64>;
pub type UInt8DictionaryBuilder = DictionaryBuilder<PhysicalU8>;
pub type UInt16DictionaryBuilder = DictionaryBuilder<PhysicalU16>;
pub type UInt32DictionaryBuilder = DictionaryBuilder<PhysicalU32>;
pub type UInt64DictionaryBuilder = DictionaryBuilder<PhysicalU64>;
pub type Float32DictionaryBuilder = DictionaryBuilder<PhysicalF32>;
pub type Float64DictionaryBuilder = DictionaryBuilder<PhysicalF64>;
pub type StringDictionaryBuilder = DictionaryBuilder<PhysicalUtf8>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::dictionary::strategy::HASH_RANDOM_STATE;

    #[test]
    fn append_dedups_repeated_values() {
        let mut builder = Int32DictionaryBuilder::new();
        builder.append_value(&10).unwrap();
        builder.append_value(&20).unwrap();
        builder.append_value(&10).unwrap();
        builder.append_null().unwrap();
        builder.append_value(&20).unwrap();

        assert_eq!(5, builder.len());
        assert_eq!(2, builder.unique_values_len());
        assert_eq!(1, builder.null_count());

        let arr = builder.try_build().unwrap();
        assert_eq!(5, arr.len());
        assert_eq!(2, arr.unique_values_len());
        assert_eq!(1, arr.null_count());

        // Values buffer holds first appearances in order.
        let values = arr.values();
        assert_eq!(Some(&10), values.get(0));
        assert_eq!(Some(&20), values.get(1));

        // Indices reuse dictionary slots; the null row stores the
        // placeholder index 0.
        assert_eq!(0, arr.index(0).unwrap());
        assert_eq!(1, arr.index(1).unwrap());
        assert_eq!(0, arr.index(2).unwrap());
        assert_eq!(0, arr.index(3).unwrap());
        assert_eq!(1, arr.index(4).unwrap());

        assert_eq!(Some(&10), arr.get(0).unwrap());
        assert_eq!(Some(&20), arr.get(1).unwrap());
        assert_eq!(Some(&10), arr.get(2).unwrap());
        assert_eq!(None, arr.get(3).unwrap());
        assert_eq!(Some(&20), arr.get(4).unwrap());
    }

    #[test]
    fn repeated_append_is_idempotent_on_uniques() {
        let mut builder = Int64DictionaryBuilder::new();
        builder.append_value(&7).unwrap();
        let uniques = builder.unique_values_len();
        builder.append_value(&7).unwrap();
        assert_eq!(uniques, builder.unique_values_len());

        let arr = builder.try_build().unwrap();
        assert_eq!(arr.index(0).unwrap(), arr.index(1).unwrap());
    }

    #[test]
    fn append_after_build_fails() {
        let mut builder = Int32DictionaryBuilder::new();
        builder.append_value(&1).unwrap();
        builder.try_build().unwrap();

        let err = builder.append_value(&2).unwrap_err();
        assert!(matches!(err, QuiverError::InvalidState(_)));

        let err = builder.append_null().unwrap_err();
        assert!(matches!(err, QuiverError::InvalidState(_)));

        let err = builder.try_build().unwrap_err();
        assert!(matches!(err, QuiverError::InvalidState(_)));
    }

    #[test]
    fn build_empty() {
        let mut builder = Float64DictionaryBuilder::new();
        let arr = builder.try_build().unwrap();

        assert!(arr.is_empty());
        assert_eq!(0, arr.unique_values_len());
        assert!(matches!(
            arr.get(0).unwrap_err(),
            QuiverError::OutOfBounds { idx: 0, len: 0 }
        ));
    }

    #[test]
    fn reserve_is_only_a_hint() {
        let mut builder = Int32DictionaryBuilder::new();
        builder.reserve(128).unwrap();
        builder.append_value(&1).unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(1, arr.len());
        assert_eq!(1, arr.unique_values_len());
    }

    #[test]
    fn string_dictionary_dedups() {
        let mut builder = StringDictionaryBuilder::new();
        builder.append_value("tag_a").unwrap();
        builder.append_value("tag_b").unwrap();
        builder.append_option(None).unwrap();
        builder.append_value("tag_a").unwrap();
        builder.append_option(Some("tag_b")).unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(5, arr.len());
        assert_eq!(2, arr.unique_values_len());

        assert_eq!(Some("tag_a"), arr.get(0).unwrap());
        assert_eq!(Some("tag_b"), arr.get(1).unwrap());
        assert_eq!(None, arr.get(2).unwrap());
        assert_eq!(Some("tag_a"), arr.get(3).unwrap());
        assert_eq!(Some("tag_b"), arr.get(4).unwrap());
    }

    #[test]
    fn empty_string_is_a_value() {
        let mut builder = StringDictionaryBuilder::new();
        builder.append_value("").unwrap();
        builder.append_null().unwrap();
        builder.append_value("").unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(1, arr.unique_values_len());
        assert_eq!(Some(""), arr.get(0).unwrap());
        assert_eq!(None, arr.get(1).unwrap());
        assert_eq!(Some(""), arr.get(2).unwrap());
    }

    #[test]
    fn nulls_do_not_grow_the_dictionary() {
        let mut builder = UInt8DictionaryBuilder::new();
        builder.append_null().unwrap();
        builder.append_null().unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(2, arr.len());
        assert_eq!(2, arr.null_count());
        assert_eq!(0, arr.unique_values_len());
        assert_eq!(None, arr.get(0).unwrap());
        assert_eq!(None, arr.get(1).unwrap());
    }

    #[test]
    fn default_float_strategy_separates_nans() {
        let mut builder = Float64DictionaryBuilder::new();
        builder.append_value(&f64::NAN).unwrap();
        builder.append_value(&f64::NAN).unwrap();

        // NaN != NaN under natural equality, each append interns a new slot.
        let arr = builder.try_build().unwrap();
        assert_eq!(2, arr.unique_values_len());
        assert_eq!(0, arr.index(0).unwrap());
        assert_eq!(1, arr.index(1).unwrap());
    }

    #[test]
    fn negative_zero_dedups_against_zero() {
        let mut builder = Float32DictionaryBuilder::new();
        builder.append_value(&0.0).unwrap();
        builder.append_value(&-0.0).unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(1, arr.unique_values_len());
    }

    /// Strategy treating NaN as equal to itself for dedup purposes.
    #[derive(Debug, Clone, Copy)]
    struct NanEqualStrategy;

    impl DictionaryStrategy<f64> for NanEqualStrategy {
        fn hash_value(&self, value: &f64) -> u64 {
            let bits = if value.is_nan() {
                f64::NAN.to_bits()
            } else if *value == 0.0 {
                0.0_f64.to_bits()
            } else {
                value.to_bits()
            };
            HASH_RANDOM_STATE.hash_one(bits)
        }

        fn eq_values(&self, a: &f64, b: &f64) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }
    }

    #[test]
    fn custom_strategy_dedups_nans() {
        let mut builder =
            DictionaryBuilder::<PhysicalF64, _>::with_strategy(NanEqualStrategy);
        builder.append_value(&f64::NAN).unwrap();
        builder.append_value(&1.5).unwrap();
        builder.append_value(&f64::NAN).unwrap();

        let arr = builder.try_build().unwrap();
        assert_eq!(2, arr.unique_values_len());
        assert_eq!(arr.index(0).unwrap(), arr.index(2).unwrap());
    }

    macro_rules! primitive_roundtrip {
        ($test:ident, $builder:ident, $v0:expr, $v1:expr) => {
            #[test]
            fn $test() {
                let mut builder = $builder::new();
                builder.append_value(&$v0).unwrap();
                builder.append_value(&$v1).unwrap();
                builder.append_null().unwrap();
                builder.append_value(&$v0).unwrap();

                let arr = builder.try_build().unwrap();
                assert_eq!(4, arr.len());
                assert_eq!(2, arr.unique_values_len());
                assert_eq!(Some(&$v0), arr.get(0).unwrap());
                assert_eq!(Some(&$v1), arr.get(1).unwrap());
                assert_eq!(None, arr.get(2).unwrap());
                assert_eq!(Some(&$v0), arr.get(3).unwrap());
            }
        };
    }

    primitive_roundtrip!(roundtrip_i8, Int8DictionaryBuilder, -3_i8, 100_i8);
    primitive_roundtrip!(roundtrip_i16, Int16DictionaryBuilder, -300_i16, 2_i16);
    primitive_roundtrip!(roundtrip_i32, Int32DictionaryBuilder, i32::MIN, 8);
    primitive_roundtrip!(roundtrip_i64, Int64DictionaryBuilder, i64::MAX, -1);
    primitive_roundtrip!(roundtrip_u8, UInt8DictionaryBuilder, 0_u8, 255_u8);
    primitive_roundtrip!(roundtrip_u16, UInt16DictionaryBuilder, 9_u16, u16::MAX);
    primitive_roundtrip!(roundtrip_u32, UInt32DictionaryBuilder, 7_u32, u32::MAX);
    primitive_roundtrip!(roundtrip_u64, UInt64DictionaryBuilder, u64::MAX, 1_u64);
    primitive_roundtrip!(roundtrip_f32, Float32DictionaryBuilder, 1.5_f32, -2.25_f32);
    primitive_roundtrip!(roundtrip_f64, Float64DictionaryBuilder, 0.1_f64, 1e300_f64);

    #[test]
    fn many_values_grow_geometrically() {
        let mut builder = Int32DictionaryBuilder::new();
        for i in 0..1000 {
            builder.append_value(&(i % 10)).unwrap();
        }

        let arr = builder.try_build().unwrap();
        assert_eq!(1000, arr.len());
        assert_eq!(10, arr.unique_values_len());
        for i in 0..1000_usize {
            assert_eq!(Some(&((i % 10) as i32)), arr.get(i).unwrap());
        }
    }
}
