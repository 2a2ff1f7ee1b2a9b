use quiver_error::{QuiverError, Result};

use super::buffer_manager::{AsBufferManager, BufferManagerRef, Reservation};

/// Raw, untyped memory backing an array buffer.
///
/// Memory is left uninitialized after allocating; values must be written to
/// an index before it's read. The reservation is released through the owning
/// manager on drop.
#[derive(Debug)]
pub struct RawBuffer {
    manager: BufferManagerRef,
    reservation: Reservation,
    /// Element capacity the reservation was sized for.
    capacity: usize,
}

impl RawBuffer {
    /// Create a new buffer able to hold `cap` elements of type `T`.
    pub fn try_with_capacity<T>(manager: &impl AsBufferManager, cap: usize) -> Result<Self> {
        assert!(std::mem::size_of::<T>() > 0);

        let manager = manager.as_buffer_manager();
        let size = std::mem::size_of::<T>()
            .checked_mul(cap)
            .ok_or_else(|| QuiverError::capacity("buffer byte size overflows usize"))?;
        let reservation = manager.reserve(size, std::mem::align_of::<T>())?;
        let capacity = reservation.size() / std::mem::size_of::<T>();

        Ok(RawBuffer {
            manager,
            reservation,
            capacity,
        })
    }

    /// Element capacity for the type this buffer was allocated with.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// View the buffer as a slice of `T`.
    ///
    /// # Safety
    ///
    /// - `T` must be the type the buffer was allocated with.
    /// - An element must have been written before it's read.
    pub unsafe fn as_slice<T>(&self) -> &[T] {
        debug_assert_eq!(0, self.reservation.size() % std::mem::size_of::<T>());

        if self.capacity == 0 {
            return &[];
        }
        let ptr = self.reservation.ptr().as_ptr().cast::<T>().cast_const();
        unsafe { std::slice::from_raw_parts(ptr, self.capacity) }
    }

    /// View the buffer as a mutable slice of `T`.
    ///
    /// # Safety
    ///
    /// Same requirements as `as_slice`.
    pub unsafe fn as_slice_mut<T>(&mut self) -> &mut [T] {
        debug_assert_eq!(0, self.reservation.size() % std::mem::size_of::<T>());

        if self.capacity == 0 {
            return &mut [];
        }
        let ptr = self.reservation.ptr().as_ptr().cast::<T>();
        unsafe { std::slice::from_raw_parts_mut(ptr, self.capacity) }
    }

    /// Grow the buffer to hold `additional` more elements, preserving
    /// existing contents.
    ///
    /// # Safety
    ///
    /// `T` must be the type the buffer was allocated with.
    pub unsafe fn reserve_additional<T>(&mut self, additional: usize) -> Result<()> {
        let new_cap = self
            .capacity
            .checked_add(additional)
            .ok_or_else(|| QuiverError::capacity("buffer capacity overflows usize"))?;
        let new_size = std::mem::size_of::<T>()
            .checked_mul(new_cap)
            .ok_or_else(|| QuiverError::capacity("buffer byte size overflows usize"))?;

        unsafe { self.manager.resize(&mut self.reservation, new_size)? };
        self.capacity = self.reservation.size() / std::mem::size_of::<T>();

        Ok(())
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        unsafe { self.manager.free(&mut self.reservation) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::buffer_manager::default_buffer_manager;

    #[test]
    fn new_drop() {
        let b = RawBuffer::try_with_capacity::<i64>(&default_buffer_manager(), 4).unwrap();
        assert_eq!(4, b.capacity());
        std::mem::drop(b);
    }

    #[test]
    fn write_then_read() {
        let mut b = RawBuffer::try_with_capacity::<i64>(&default_buffer_manager(), 4).unwrap();

        let s = unsafe { b.as_slice_mut::<i64>() };
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as i64;
        }

        let s = unsafe { b.as_slice::<i64>() };
        assert_eq!(&[0, 1, 2, 3], s);
    }

    #[test]
    fn reserve_preserves_contents() {
        let mut b = RawBuffer::try_with_capacity::<i64>(&default_buffer_manager(), 4).unwrap();

        let s = unsafe { b.as_slice_mut::<i64>() };
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as i64;
        }

        unsafe { b.reserve_additional::<i64>(4).unwrap() };
        assert_eq!(8, b.capacity());

        let s = unsafe { b.as_slice::<i64>() };
        assert_eq!(&[0, 1, 2, 3], &s[0..4]);
    }

    #[test]
    fn zero_capacity_is_empty_slice() {
        let b = RawBuffer::try_with_capacity::<i32>(&default_buffer_manager(), 0).unwrap();
        let s = unsafe { b.as_slice::<i32>() };
        assert!(s.is_empty());
    }
}
