use rawpointer::PointerExt;
use std::alloc::{self as sys, Layout};
use std::mem::{self, size_of};
use std::ptr::{self, NonNull};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocatorError {
    #[error("capacity overflow")]
    CapacityOverflow,
    #[error("memory allocation of {} bytes aligned to {} failed", .0.size(), .0.align())]
    OutOfMemory(Layout),
}

impl AllocatorError {
    #[cold]
    pub(crate) fn handle(self) -> ! {
        match self {
            AllocatorError::CapacityOverflow => capacity_overflow(),
            AllocatorError::OutOfMemory(layout) => sys::handle_alloc_error(layout),
        }
    }
}

#[cold]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

/// Byte-level allocation capability used by heap-backed storage.
///
/// # Safety
///
/// A successful `allocate` must return a block of at least `layout.size()`
/// bytes aligned to at least `layout.align()`. `reallocate` must keep the
/// first `min(old.size(), new_size)` bytes and the alignment of `old`, and
/// must leave `ptr` untouched when it fails.
pub unsafe trait RawAllocator {
    /// `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocatorError>;

    /// # Safety
    ///
    /// `ptr` must be currently allocated by `self` with exactly `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Resizes the block at `ptr` to `new_size` bytes.
    ///
    /// The default allocates a new block, copies the overlap and frees the
    /// old block.
    ///
    /// # Safety
    ///
    /// `ptr` must be currently allocated by `self` with exactly `old`, and
    /// `new_size` must be non-zero. On success `ptr` is no longer valid.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocatorError> {
        let new = Layout::from_size_align(new_size, old.align())
            .map_err(|_| AllocatorError::CapacityOverflow)?;
        let fresh = self.allocate(new)?;
        // SAFETY: both blocks are live and hold at least the copied byte count.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old.size().min(new_size));
            self.deallocate(ptr, old);
        }
        Ok(fresh)
    }
}

/// Rust's global allocator. Growth goes through `realloc`, which may extend
/// the block in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

// SAFETY: thin wrapper over the global allocator, which returns blocks of the
// exact size and alignment of `layout`.
unsafe impl RawAllocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocatorError> {
        if layout.size() == 0 {
            return Err(AllocatorError::OutOfMemory(layout));
        }
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { sys::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocatorError::OutOfMemory(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees `ptr` came from `allocate(layout)`.
        unsafe { sys::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocatorError> {
        let new = Layout::from_size_align(new_size, old.align())
            .map_err(|_| AllocatorError::CapacityOverflow)?;
        if new_size == 0 {
            return Err(AllocatorError::OutOfMemory(new));
        }
        // SAFETY: the caller guarantees `ptr` came from `allocate(old)`, and
        // `new` proved `new_size` does not overflow once rounded to the alignment.
        let ptr = unsafe { sys::realloc(ptr.as_ptr(), old, new_size) };
        NonNull::new(ptr).ok_or(AllocatorError::OutOfMemory(new))
    }
}

pub(crate) fn array_layout<T>(n: usize, align: usize) -> Result<Layout, AllocatorError> {
    size_of::<T>()
        .checked_mul(n)
        .and_then(|bytes| Layout::from_size_align(bytes, align).ok())
        .ok_or(AllocatorError::CapacityOverflow)
}

fn allocate_array<T, A: RawAllocator>(alloc: &A, layout: Layout) -> Result<NonNull<T>, AllocatorError> {
    if layout.size() == 0 {
        return Ok(NonNull::dangling());
    }
    match alloc.allocate(layout) {
        Ok(ptr) => {
            trace!(bytes = layout.size(), align = layout.align(), "allocate dense buffer");
            Ok(ptr.cast())
        }
        Err(e) => {
            debug!(bytes = layout.size(), align = layout.align(), "dense buffer allocation failed");
            Err(e)
        }
    }
}

/// # Safety
///
/// `ptr` must be a block from `allocate_array` with the same `layout`.
unsafe fn free_array<T, A: RawAllocator>(alloc: &A, ptr: NonNull<T>, layout: Layout) {
    if layout.size() != 0 {
        trace!(bytes = layout.size(), align = layout.align(), "free dense buffer");
        // SAFETY: forwarded from the caller.
        unsafe { alloc.deallocate(ptr.cast(), layout) }
    }
}

/// Tracks how far a buffer has been initialized while elements are written
/// one by one. If a constructor panics, the elements written so far are
/// dropped and the block is freed; elements below `start` belong to someone
/// else and are left alone.
struct InitGuard<'a, T, A: RawAllocator> {
    alloc: &'a A,
    base: NonNull<T>,
    layout: Layout,
    start: usize,
    local_len: usize,
}

impl<'a, T, A: RawAllocator> InitGuard<'a, T, A> {
    fn new(alloc: &'a A, base: NonNull<T>, layout: Layout, start: usize) -> Self {
        Self {
            alloc,
            base,
            layout,
            start,
            local_len: start,
        }
    }

    /// # Safety
    ///
    /// `base` must hold room for `end` elements.
    unsafe fn fill_with<F>(mut self, end: usize, mut f: F) -> NonNull<T>
    where
        F: FnMut(usize) -> T,
    {
        // SAFETY: `local_len <= end` and the block holds `end` elements.
        unsafe {
            let mut ptr = self.base.as_ptr().add(self.local_len);
            while self.local_len < end {
                ptr::write(ptr.post_inc(), f(self.local_len));
                // Increment the length in every step in case `f` panics
                self.local_len += 1;
            }
        }
        let base = self.base;
        mem::forget(self);
        base
    }
}

impl<T, A: RawAllocator> Drop for InitGuard<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: `[start, local_len)` was written by `fill_with` and the
        // block came from `allocate_array` with `layout`.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.base.as_ptr().add(self.start),
                self.local_len - self.start,
            ));
            free_array(self.alloc, self.base, self.layout);
        }
    }
}

/// Allocates `n` default-constructed elements. `n == 0` yields `None`.
pub(crate) fn new_default<T: Default, A: RawAllocator>(
    alloc: &A,
    align: usize,
    n: usize,
) -> Result<Option<NonNull<T>>, AllocatorError> {
    if n == 0 {
        return Ok(None);
    }
    let layout = array_layout::<T>(n, align)?;
    let base = allocate_array::<T, A>(alloc, layout)?;
    // SAFETY: `base` holds `n` elements.
    Ok(Some(unsafe {
        InitGuard::new(alloc, base, layout, 0).fill_with(n, |_| T::default())
    }))
}

/// Allocates a copy of `src`, sized to `src.len()`.
pub(crate) fn new_cloned<T: Clone, A: RawAllocator>(
    alloc: &A,
    align: usize,
    src: &[T],
) -> Result<Option<NonNull<T>>, AllocatorError> {
    if src.is_empty() {
        return Ok(None);
    }
    let layout = array_layout::<T>(src.len(), align)?;
    let base = allocate_array::<T, A>(alloc, layout)?;
    // SAFETY: `base` holds `src.len()` elements.
    Ok(Some(unsafe {
        InitGuard::new(alloc, base, layout, 0).fill_with(src.len(), |i| src[i].clone())
    }))
}

/// Drops `n` elements and frees their buffer. A `None` buffer is a no-op.
///
/// # Safety
///
/// `ptr` must hold `n` live elements allocated by `alloc` with `align`.
pub(crate) unsafe fn delete<T, A: RawAllocator>(
    alloc: &A,
    align: usize,
    ptr: Option<NonNull<T>>,
    n: usize,
) {
    let Some(ptr) = ptr else {
        return;
    };
    // SAFETY: forwarded from the caller; the layout was valid when allocated.
    unsafe {
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), n));
        if let Ok(layout) = array_layout::<T>(n, align) {
            free_array(alloc, ptr, layout);
        }
    }
}

/// Resizes the buffer in `slot` from `old` to `new` elements, keeping the
/// first `min(old, new)` and default-constructing the rest.
///
/// On `Err` the slot and its buffer are unchanged. Element types without drop
/// glue go through `RawAllocator::reallocate`; the slot is cleared while the
/// old block is in flight, so a panicking constructor leaves it `None`.
///
/// # Safety
///
/// `slot` must hold `old` live elements allocated by `alloc` with `align`,
/// or be `None`.
pub(crate) unsafe fn realloc_default<T: Default, A: RawAllocator>(
    alloc: &A,
    align: usize,
    slot: &mut Option<NonNull<T>>,
    new: usize,
    old: usize,
) -> Result<(), AllocatorError> {
    let Some(old_ptr) = *slot else {
        *slot = new_default(alloc, align, new)?;
        return Ok(());
    };
    if new == old {
        return Ok(());
    }
    if new == 0 {
        *slot = None;
        // SAFETY: forwarded from the caller.
        unsafe { delete(alloc, align, Some(old_ptr), old) };
        return Ok(());
    }
    let old_layout = array_layout::<T>(old, align)?;
    let new_layout = array_layout::<T>(new, align)?;
    let keep = old.min(new);
    trace!(from = old, to = new, "reallocate dense buffer");

    if !mem::needs_drop::<T>() {
        let base = if new_layout.size() == 0 {
            NonNull::dangling()
        } else {
            *slot = None;
            // SAFETY: `old_ptr` was allocated with `old_layout`.
            match unsafe { alloc.reallocate(old_ptr.cast(), old_layout, new_layout.size()) } {
                Ok(ptr) => ptr.cast(),
                Err(e) => {
                    debug!(bytes = new_layout.size(), "dense buffer reallocation failed");
                    *slot = Some(old_ptr);
                    return Err(e);
                }
            }
        };
        // SAFETY: the block holds `new` elements, the first `keep` are live.
        *slot = Some(unsafe {
            InitGuard::new(alloc, base, new_layout, keep).fill_with(new, |_| T::default())
        });
        return Ok(());
    }

    let base = allocate_array::<T, A>(alloc, new_layout)?;
    // SAFETY: the prefix is moved bitwise into the fresh block; the old block
    // keeps ownership until the tail is built, then gives up the prefix
    // without dropping it.
    unsafe {
        ptr::copy_nonoverlapping(old_ptr.as_ptr(), base.as_ptr(), keep);
        let base = InitGuard::new(alloc, base, new_layout, keep).fill_with(new, |_| T::default());
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
            old_ptr.as_ptr().add(keep),
            old - keep,
        ));
        free_array(alloc, old_ptr, old_layout);
        *slot = Some(base);
    }
    Ok(())
}
