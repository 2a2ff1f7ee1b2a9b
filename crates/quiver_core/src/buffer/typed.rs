use std::marker::PhantomData;

use quiver_error::Result;

use super::buffer_manager::AsBufferManager;
use super::raw::RawBuffer;

/// Wrapper around a raw buffer that knows its element type.
///
/// Only plain-old-data element types are supported; elements are never
/// dropped individually.
#[derive(Debug)]
pub struct TypedBuffer<T: Copy> {
    raw: RawBuffer,
    _type: PhantomData<T>,
}

impl<T: Copy> TypedBuffer<T> {
    /// Create an empty buffer.
    ///
    /// Zero-sized reservations never touch the allocator, so this cannot
    /// fail.
    pub fn empty(manager: &impl AsBufferManager) -> Self {
        let raw = RawBuffer::try_with_capacity::<T>(manager, 0)
            .expect("zero-sized allocation to not fail");
        TypedBuffer {
            raw,
            _type: PhantomData,
        }
    }

    /// Create a new buffer that can hold `cap` elements.
    pub fn try_with_capacity(manager: &impl AsBufferManager, cap: usize) -> Result<Self> {
        let raw = RawBuffer::try_with_capacity::<T>(manager, cap)?;
        Ok(TypedBuffer {
            raw,
            _type: PhantomData,
        })
    }

    /// Grow the buffer if its capacity is less than `size` elements.
    ///
    /// Does nothing when the current capacity is sufficient. Reallocations
    /// are amortized by at least doubling the current capacity.
    pub fn reserve_for_size(&mut self, size: usize) -> Result<()> {
        if self.capacity() < size {
            let new_cap = usize::max(size, self.capacity() * 2);
            let additional = new_cap - self.capacity();
            unsafe { self.raw.reserve_additional::<T>(additional)? }
        }

        Ok(())
    }

    pub const fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { self.raw.as_slice::<T>() }
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        unsafe { self.raw.as_slice_mut::<T>() }
    }
}

impl<T: Copy> AsRef<[T]> for TypedBuffer<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy> AsMut<[T]> for TypedBuffer<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_slice_mut()
    }
}
