use std::alloc::{self, Layout};
use std::fmt::Debug;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use quiver_error::{QuiverError, Result};

/// A raw memory region handed out by a buffer manager.
///
/// Stores the allocation's pointer alongside the size and alignment it was
/// reserved with. A zero-sized reservation holds a dangling pointer and owns
/// no memory.
#[derive(Debug)]
pub struct Reservation {
    ptr: NonNull<u8>,
    size: usize,
    align: usize,
}

impl Reservation {
    pub const fn new(ptr: NonNull<u8>, size: usize, align: usize) -> Self {
        Reservation { ptr, size, align }
    }

    pub const fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Size of the reservation in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn align(&self) -> usize {
        self.align
    }
}

// SAFETY: A reservation is just a description of an allocation. Aliasing is
// controlled by the buffer that owns it.
unsafe impl Send for Reservation {}
unsafe impl Sync for Reservation {}

/// Acquires and releases raw memory regions for array buffers.
///
/// Managers must tolerate concurrent calls from independent builders. A
/// reservation must only be resized or freed by the manager that produced
/// it.
pub trait BufferManager: Debug + Sync + Send {
    /// Reserve `size` bytes aligned to `align`.
    ///
    /// Managers may hand out more than `size` bytes; callers read the actual
    /// size off the reservation.
    fn reserve(&self, size: usize, align: usize) -> Result<Reservation>;

    /// Resize `reservation` to `new_size` bytes, preserving contents up to
    /// the smaller of the two sizes.
    ///
    /// # Safety
    ///
    /// `reservation` must have been produced by this manager and must not be
    /// aliased during the call.
    unsafe fn resize(&self, reservation: &mut Reservation, new_size: usize) -> Result<()>;

    /// Release `reservation`. The reservation is left empty and must not be
    /// read through afterwards.
    ///
    /// # Safety
    ///
    /// Same requirements as `resize`.
    unsafe fn free(&self, reservation: &mut Reservation);
}

/// Cheaply cloneable handle to a buffer manager.
#[derive(Debug, Clone)]
pub struct BufferManagerRef {
    inner: Arc<dyn BufferManager>,
}

impl BufferManagerRef {
    pub fn new(manager: impl BufferManager + 'static) -> Self {
        BufferManagerRef {
            inner: Arc::new(manager),
        }
    }

    pub fn reserve(&self, size: usize, align: usize) -> Result<Reservation> {
        self.inner.reserve(size, align)
    }

    /// # Safety
    ///
    /// See [`BufferManager::resize`].
    pub unsafe fn resize(&self, reservation: &mut Reservation, new_size: usize) -> Result<()> {
        unsafe { self.inner.resize(reservation, new_size) }
    }

    /// # Safety
    ///
    /// See [`BufferManager::free`].
    pub unsafe fn free(&self, reservation: &mut Reservation) {
        unsafe { self.inner.free(reservation) }
    }
}

/// Conversion into a manager handle, letting buffer constructors accept both
/// concrete managers and existing handles.
pub trait AsBufferManager {
    fn as_buffer_manager(&self) -> BufferManagerRef;
}

impl AsBufferManager for BufferManagerRef {
    fn as_buffer_manager(&self) -> BufferManagerRef {
        self.clone()
    }
}

impl<M> AsBufferManager for Arc<M>
where
    M: BufferManager + 'static,
{
    fn as_buffer_manager(&self) -> BufferManagerRef {
        BufferManagerRef {
            inner: self.clone(),
        }
    }
}

/// Default manager backed by the system allocator.
///
/// Tracks outstanding reserved bytes, mostly for tests and debugging.
#[derive(Debug, Default)]
pub struct SystemBufferManager {
    reserved: AtomicUsize,
}

impl SystemBufferManager {
    pub const fn new() -> Self {
        SystemBufferManager {
            reserved: AtomicUsize::new(0),
        }
    }

    /// Total bytes currently reserved through this manager.
    pub fn reserved_bytes(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    fn layout(size: usize, align: usize) -> Result<Layout> {
        Layout::from_size_align(size, align).map_err(|_| {
            QuiverError::capacity(format!("invalid layout: size {size}, align {align}"))
        })
    }
}

impl BufferManager for SystemBufferManager {
    fn reserve(&self, size: usize, align: usize) -> Result<Reservation> {
        if size == 0 {
            return Ok(Reservation::new(NonNull::dangling(), 0, align));
        }

        let layout = Self::layout(size, align)?;
        let ptr = unsafe { alloc::alloc(layout) };
        let ptr = match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };

        self.reserved.fetch_add(size, Ordering::Relaxed);

        Ok(Reservation::new(ptr, size, align))
    }

    unsafe fn resize(&self, reservation: &mut Reservation, new_size: usize) -> Result<()> {
        if new_size == reservation.size() {
            return Ok(());
        }
        if reservation.size() == 0 {
            *reservation = self.reserve(new_size, reservation.align())?;
            return Ok(());
        }
        if new_size == 0 {
            unsafe { self.free(reservation) };
            return Ok(());
        }

        let old_layout = Self::layout(reservation.size(), reservation.align())?;
        // Validate the new layout before reallocating.
        let new_layout = Self::layout(new_size, reservation.align())?;

        let new_ptr = unsafe { alloc::realloc(reservation.ptr().as_ptr(), old_layout, new_size) };
        let new_ptr = match NonNull::new(new_ptr) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(new_layout),
        };

        self.reserved.fetch_add(new_size, Ordering::Relaxed);
        self.reserved.fetch_sub(reservation.size(), Ordering::Relaxed);

        *reservation = Reservation::new(new_ptr, new_size, reservation.align());

        Ok(())
    }

    unsafe fn free(&self, reservation: &mut Reservation) {
        if reservation.size() == 0 {
            return;
        }

        let layout = Layout::from_size_align(reservation.size(), reservation.align())
            .expect("reservation layout to be valid");
        unsafe { alloc::dealloc(reservation.ptr().as_ptr(), layout) };

        self.reserved.fetch_sub(reservation.size(), Ordering::Relaxed);

        *reservation = Reservation::new(NonNull::dangling(), 0, reservation.align());
    }
}

static DEFAULT_BUFFER_MANAGER: LazyLock<BufferManagerRef> =
    LazyLock::new(|| BufferManagerRef::new(SystemBufferManager::new()));

/// Shared default manager used when callers don't supply their own.
pub fn default_buffer_manager() -> BufferManagerRef {
    DEFAULT_BUFFER_MANAGER.clone()
}
