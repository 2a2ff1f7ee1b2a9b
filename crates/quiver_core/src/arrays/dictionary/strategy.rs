use std::fmt::Debug;

use ahash::RandomState;

/// Random state used for all default dictionary hashing.
///
/// Fixed seeds keep hashes stable across builders so independently built
/// dictionaries agree on deterministic content.
pub const HASH_RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// Hash and equality strategy used to deduplicate dictionary values.
///
/// Implementations must keep the pair consistent: values that compare equal
/// must hash equal.
pub trait DictionaryStrategy<T: ?Sized>: Debug {
    fn hash_value(&self, value: &T) -> u64;

    fn eq_values(&self, a: &T, b: &T) -> bool;
}

/// Default strategy: natural equality with a seeded hash.
///
/// Under natural equality `NaN != NaN`, so every appended NaN occupies its
/// own dictionary slot. Callers wanting NaN to dedup against itself supply
/// their own strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl<T> DictionaryStrategy<T> for DefaultStrategy
where
    T: HashValue + PartialEq + ?Sized,
{
    fn hash_value(&self, value: &T) -> u64 {
        value.hash_one()
    }

    fn eq_values(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Helper trait for hashing values.
///
/// Mostly exists for floats: they don't implement `Hash`, and `-0.0 == 0.0`
/// under natural equality so both must hash the same.
pub trait HashValue {
    fn hash_one(&self) -> u64;
}

macro_rules! impl_hash_value {
    ($typ:ty) => {
        impl HashValue for $typ {
            fn hash_one(&self) -> u64 {
                HASH_RANDOM_STATE.hash_one(self)
            }
        }
    };
}

impl_hash_value!(i8);
impl_hash_value!(i16);
impl_hash_value!(i32);
impl_hash_value!(i64);
impl_hash_value!(u8);
impl_hash_value!(u16);
impl_hash_value!(u32);
impl_hash_value!(u64);
impl_hash_value!(str);

impl HashValue for f32 {
    fn hash_one(&self) -> u64 {
        let v = if *self == 0.0 { 0.0f32 } else { *self };
        HASH_RANDOM_STATE.hash_one(v.to_ne_bytes())
    }
}

impl HashValue for f64 {
    fn hash_one(&self) -> u64 {
        let v = if *self == 0.0 { 0.0f64 } else { *self };
        HASH_RANDOM_STATE.hash_one(v.to_ne_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_hash_equal() {
        let strategy = DefaultStrategy;

        assert_eq!(strategy.hash_value(&4_i64), strategy.hash_value(&4_i64));
        assert_eq!(strategy.hash_value("abc"), strategy.hash_value("abc"));
        assert_ne!(strategy.hash_value("abc"), strategy.hash_value("abd"));
    }

    #[test]
    fn negative_zero_hashes_like_zero() {
        let strategy = DefaultStrategy;

        assert!(strategy.eq_values(&-0.0_f64, &0.0_f64));
        assert_eq!(strategy.hash_value(&-0.0_f64), strategy.hash_value(&0.0_f64));

        assert!(strategy.eq_values(&-0.0_f32, &0.0_f32));
        assert_eq!(strategy.hash_value(&-0.0_f32), strategy.hash_value(&0.0_f32));
    }

    #[test]
    fn nan_is_not_self_equal() {
        let strategy = DefaultStrategy;
        assert!(!strategy.eq_values(&f64::NAN, &f64::NAN));
    }
}
