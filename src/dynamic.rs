use crate::alloc::{self, AllocatorError, Global, RawAllocator};
use crate::config::heap_alignment;
use crate::dimension::Dim;
use crate::error::SResult;
use crate::options::{AutoAlign, Options};
use crate::shape::Extent;
use crate::storage::DenseStorage;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

/// Heap storage whose element count is known only at run time.
///
/// A present buffer holds exactly `rows() * cols()` elements, with no spare
/// capacity; `None` represents the empty buffer. Allocation lengths are
/// always derived from the extents, never from a caller-supplied count, and
/// the element count passed to the allocator on release is recomputed from
/// them.
pub struct DynamicStorage<T, R: Dim, C: Dim, O: Options = AutoAlign, A: RawAllocator = Global> {
    ptr: Option<NonNull<T>>,
    extent: Extent<R, C>,
    alloc: A,
    _marker: PhantomData<(T, O)>,
}

// SAFETY: the buffer is uniquely owned, like a `Box<[T]>`.
unsafe impl<T: Send, R: Dim, C: Dim, O: Options, A: RawAllocator + Send> Send
    for DynamicStorage<T, R, C, O, A>
{
}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync, R: Dim, C: Dim, O: Options, A: RawAllocator + Sync> Sync
    for DynamicStorage<T, R, C, O, A>
{
}

impl<T, R: Dim, C: Dim, O: Options> DynamicStorage<T, R, C, O, Global> {
    #[inline]
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, R: Dim, C: Dim, O: Options, A: RawAllocator> DynamicStorage<T, R, C, O, A> {
    const ALIGN: usize = heap_alignment::<T>(O::ALIGN);

    /// Empty storage: no buffer, dynamic extents 0, fixed extents at their constant.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: None,
            extent: Extent::empty(),
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn try_with_size_in(size: usize, rows: usize, cols: usize, alloc: A) -> SResult<Self>
    where
        T: Default,
    {
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        let (extent, len) = Self::checked_extent(rows, cols)?;
        let ptr = alloc::new_default::<T, A>(&alloc, Self::ALIGN, len)?;
        Ok(Self {
            ptr,
            extent,
            alloc,
            _marker: PhantomData,
        })
    }

    pub fn with_size_in(size: usize, rows: usize, cols: usize, alloc: A) -> Self
    where
        T: Default,
    {
        Self::try_with_size_in(size, rows, cols, alloc).unwrap_or_else(|e| e.handle())
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub fn extent(&self) -> &Extent<R, C> {
        &self.extent
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Moves the buffer out, leaving `self` empty.
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        let empty = Self::new_in(self.alloc.clone());
        mem::replace(self, empty)
    }

    /// Elements in the buffer actually held. An empty storage with only
    /// fixed dimensions reports `rows * cols` extents but holds nothing.
    #[inline]
    fn held(&self) -> usize {
        if self.ptr.is_some() {
            self.extent.size()
        } else {
            0
        }
    }

    fn checked_extent(rows: usize, cols: usize) -> SResult<(Extent<R, C>, usize)> {
        let extent = Extent::new(rows, cols);
        let len = extent.checked_size().ok_or(AllocatorError::CapacityOverflow)?;
        Ok((extent, len))
    }

    fn resize_in_place(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        let (extent, len) = Self::checked_extent(rows, cols)?;
        let old = self.held();
        if len != old {
            // allocate first so a failure leaves the current buffer in place
            let fresh = alloc::new_default::<T, A>(&self.alloc, Self::ALIGN, len)?;
            let stale = mem::replace(&mut self.ptr, fresh);
            // SAFETY: `stale` held `old` live elements from this allocator.
            unsafe { alloc::delete(&self.alloc, Self::ALIGN, stale, old) };
        }
        self.extent = extent;
        Ok(())
    }

    fn realloc_in_place(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        let (extent, len) = Self::checked_extent(rows, cols)?;
        let old = self.held();
        // SAFETY: `ptr` holds `old` live elements from this allocator.
        unsafe { alloc::realloc_default(&self.alloc, Self::ALIGN, &mut self.ptr, len, old)? };
        self.extent = extent;
        Ok(())
    }
}

impl<T, R: Dim, C: Dim, O: Options, A: RawAllocator + Clone> DenseStorage<T>
    for DynamicStorage<T, R, C, O, A>
where
    A: Default,
{
    type Rows = R;
    type Cols = C;

    const SIZE_AT_COMPILE_TIME: Option<usize> = None;

    fn try_with_size(size: usize, rows: usize, cols: usize) -> SResult<Self>
    where
        T: Default,
    {
        Self::try_with_size_in(size, rows, cols, A::default())
    }

    #[inline(always)]
    fn rows(&self) -> usize {
        self.extent.rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.extent.cols()
    }

    #[inline]
    fn data(&self) -> *const T {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T)
    }

    #[inline]
    fn data_mut(&mut self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        match self.ptr {
            // SAFETY: a present buffer holds `rows * cols` live elements.
            Some(p) => unsafe { std::slice::from_raw_parts(p.as_ptr(), self.extent.size()) },
            None => &[],
        }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        match self.ptr {
            // SAFETY: as above, and `&mut self` makes the access unique.
            Some(p) => unsafe { std::slice::from_raw_parts_mut(p.as_ptr(), self.extent.size()) },
            None => &mut [],
        }
    }

    fn try_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        self.resize_in_place(size, rows, cols)
    }

    fn try_conservative_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        self.realloc_in_place(size, rows, cols)
    }

    fn try_clone(&self) -> SResult<Self>
    where
        T: Clone + Default,
    {
        let ptr = alloc::new_cloned::<T, A>(&self.alloc, Self::ALIGN, self.as_slice())?;
        Ok(Self {
            ptr,
            extent: self.extent,
            alloc: self.alloc.clone(),
            _marker: PhantomData,
        })
    }

    #[inline]
    fn swap(&mut self, other: &mut Self)
    where
        T: Default,
    {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.alloc, &mut other.alloc);
        self.extent.swap(&mut other.extent);
    }
}

impl<T, R: Dim, C: Dim, O: Options, A: RawAllocator> Drop for DynamicStorage<T, R, C, O, A> {
    fn drop(&mut self) {
        let held = self.held();
        // SAFETY: `ptr` holds `held` live elements from this allocator.
        unsafe { alloc::delete(&self.alloc, Self::ALIGN, self.ptr.take(), held) }
    }
}

impl<T, R: Dim, C: Dim, O: Options, A: RawAllocator + Default> Default
    for DynamicStorage<T, R, C, O, A>
{
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

/// Deep copy sized to the source's element count.
impl<T: Clone + Default, R: Dim, C: Dim, O: Options, A: RawAllocator + Clone + Default> Clone
    for DynamicStorage<T, R, C, O, A>
{
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| e.handle())
    }
}

impl<T: fmt::Debug, R: Dim, C: Dim, O: Options, A: RawAllocator + Clone + Default> fmt::Debug
    for DynamicStorage<T, R, C, O, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicStorage")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::testing::CountingAllocator;
    use crate::config::MAX_STATIC_ALIGN_BYTES;
    use crate::dimension::{Const, Dyn};
    use crate::error::StorageError;
    use crate::options::DontAlign;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    type DMat = DynamicStorage<f64, Dyn, Dyn>;
    type Counted = DynamicStorage<i32, Dyn, Dyn, AutoAlign, CountingAllocator>;

    fn iota(s: &mut impl DenseStorage<f64>) {
        for (i, v) in s.as_mut_slice().iter_mut().enumerate() {
            *v = i as f64;
        }
    }

    #[test]
    fn test_dynamic_construct() {
        let s = DMat::with_size(12, 3, 4);
        assert_eq!((s.rows(), s.cols()), (3, 4));
        assert_eq!(s.as_slice(), &[0.0; 12]);
        assert!(!s.data().is_null());

        let e = DMat::default();
        assert_eq!((e.rows(), e.cols()), (0, 0));
        assert!(e.data().is_null());
        assert!(e.is_empty());

        let z = DMat::with_size(0, 0, 7);
        assert!(z.data().is_null());
        assert_eq!(z.cols(), 7);

        let mixed = DynamicStorage::<f32, Const<3>, Dyn>::new();
        assert_eq!((mixed.rows(), mixed.cols()), (3, 0));
        assert!(mixed.data().is_null());
    }

    #[test]
    fn test_dynamic_heap_alignment() {
        for n in 1..32 {
            let s = DynamicStorage::<f32, Dyn, Const<1>>::with_size(n, n, 1);
            assert_eq!(s.data() as usize % MAX_STATIC_ALIGN_BYTES.max(4), 0);
            let u = DynamicStorage::<f32, Dyn, Const<1>, DontAlign>::with_size(n, n, 1);
            assert_eq!(u.data() as usize % 4, 0);
        }
    }

    #[test]
    fn test_dynamic_clone_does_not_alias() {
        let mut a = DMat::with_size(6, 2, 3);
        iota(&mut a);
        let mut b = a.clone();
        assert_eq!((b.rows(), b.cols()), (2, 3));
        assert_eq!(b.as_slice(), a.as_slice());
        assert_ne!(b.data(), a.data());
        b.as_mut_slice()[0] = -1.0;
        assert_eq!(a.as_slice()[0], 0.0);
    }

    #[test]
    fn test_dynamic_clone_sized_to_source() {
        let alloc = CountingAllocator::new();
        let a = Counted::with_size_in(4, 2, 2, alloc.clone());
        let b = a.try_clone().unwrap();
        assert_eq!(alloc.allocations(), 2);
        assert_eq!(alloc.live_bytes(), 2 * 4 * std::mem::size_of::<i32>());
        drop(a);
        drop(b);
        assert_eq!(alloc.live_bytes(), 0);
    }

    #[test]
    fn test_dynamic_take_leaves_empty() {
        let mut a = DMat::with_size(6, 3, 2);
        iota(&mut a);
        let data = a.data();
        let b = a.take();
        assert_eq!((a.rows(), a.cols()), (0, 0));
        assert!(a.data().is_null());
        assert_eq!(b.data(), data);
        assert_eq!(b.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut m = DynamicStorage::<f64, Const<2>, Dyn>::with_size(4, 2, 2);
        let moved = std::mem::take(&mut m);
        assert_eq!((m.rows(), m.cols()), (2, 0));
        assert!(m.data().is_null());
        assert_eq!(moved.size(), 4);
    }

    #[test]
    fn test_dynamic_swap_twice_restores() {
        let mut a = DMat::with_size(6, 2, 3);
        let mut b = DMat::with_size(2, 1, 2);
        iota(&mut a);
        let (pa, pb) = (a.data(), b.data());

        a.swap(&mut b);
        assert_eq!((a.rows(), a.cols(), a.data()), (1, 2, pb));
        assert_eq!((b.rows(), b.cols(), b.data()), (2, 3, pa));

        a.swap(&mut b);
        assert_eq!((a.rows(), a.cols(), a.data()), (2, 3, pa));
        assert_eq!(a.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!((b.rows(), b.cols(), b.data()), (1, 2, pb));
    }

    #[test]
    fn test_dynamic_resize_state_machine() {
        let alloc = CountingAllocator::new();
        let mut s = Counted::new_in(alloc.clone());
        assert!(s.is_empty());

        s.resize(6, 2, 3);
        assert!(!s.is_empty());
        assert_eq!((s.rows(), s.cols()), (2, 3));
        assert_eq!(alloc.allocations(), 1);

        // same element count: no reallocation, new extents visible
        let p = s.data();
        s.resize(6, 3, 2);
        assert_eq!((s.rows(), s.cols()), (3, 2));
        assert_eq!(s.data(), p);
        assert_eq!(alloc.allocations(), 1);

        s.resize(0, 0, 2);
        assert!(s.is_empty());
        assert!(s.data().is_null());
        assert_eq!(alloc.deallocations(), 1);
        assert_eq!(alloc.live_bytes(), 0);

        s.conservative_resize(4, 2, 2);
        assert!(!s.is_empty());
        drop(s);
        assert_eq!(alloc.allocations(), alloc.deallocations());
    }

    #[test]
    fn test_dynamic_destructive_resize_discards_values() {
        let mut s = DMat::with_size(4, 2, 2);
        iota(&mut s);
        s.resize(6, 2, 3);
        assert_eq!(s.as_slice(), &[0.0; 6]);
    }

    #[test]
    fn test_conservative_resize_keeps_prefix() {
        let mut s = DMat::with_size(6, 2, 3);
        iota(&mut s);
        s.conservative_resize(3, 1, 3);
        assert_eq!(s.as_slice(), &[0.0, 1.0, 2.0]);
        s.conservative_resize(6, 2, 3);
        assert_eq!(&s.as_slice()[..3], &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_conservative_resize_with_drop_types() {
        let mut s = DynamicStorage::<String, Dyn, Dyn>::with_size(4, 4, 1);
        for (i, v) in s.as_mut_slice().iter_mut().enumerate() {
            *v = i.to_string();
        }
        s.conservative_resize(2, 2, 1);
        assert_eq!(s.as_slice(), &["0", "1"]);
        s.conservative_resize(5, 5, 1);
        assert_eq!(s.as_slice(), &["0", "1", "", "", ""]);
        s.conservative_resize(0, 0, 1);
        assert!(s.data().is_null());
    }

    #[test]
    fn test_drop_releases_rows_times_cols() {
        let alloc = CountingAllocator::new();
        let s = Counted::with_size_in(15, 3, 5, alloc.clone());
        assert_eq!(alloc.live_bytes(), 15 * 4);
        drop(s);
        assert_eq!(alloc.allocations(), 1);
        assert_eq!(alloc.deallocations(), 1);
        assert_eq!(alloc.freed_bytes(), 15 * 4);

        let empty = Counted::new_in(alloc.clone());
        drop(empty);
        assert_eq!(alloc.deallocations(), 1);
    }

    #[derive(Debug)]
    struct Tracked(Rc<Cell<usize>>);

    thread_local! {
        static LIVE: Rc<Cell<usize>> = Rc::new(Cell::new(0));
    }

    impl Default for Tracked {
        fn default() -> Self {
            let live = LIVE.with(|l| l.clone());
            live.set(live.get() + 1);
            Tracked(live)
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            Tracked::default()
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    fn live() -> usize {
        LIVE.with(|l| l.get())
    }

    #[test]
    fn test_elements_dropped_exactly_once() {
        let base = live();
        {
            let mut s = DynamicStorage::<Tracked, Dyn, Dyn>::with_size(6, 2, 3);
            assert_eq!(live(), base + 6);
            let c = s.clone();
            assert_eq!(live(), base + 12);
            s.resize(2, 1, 2);
            assert_eq!(live(), base + 8);
            s.conservative_resize(4, 2, 2);
            assert_eq!(live(), base + 10);
            s.conservative_resize(1, 1, 1);
            assert_eq!(live(), base + 7);
            drop(c);
            assert_eq!(live(), base + 1);
        }
        assert_eq!(live(), base);
    }

    #[test]
    fn test_failed_allocation_leaves_storage_unchanged() {
        let alloc = CountingAllocator::new();
        let mut s = Counted::with_size_in(4, 2, 2, alloc.clone());
        s.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        let p = s.data();

        alloc.fail_next();
        let err = s.try_resize(9, 3, 3).unwrap_err();
        assert!(matches!(err, StorageError::Alloc(AllocatorError::OutOfMemory(_))));
        assert_eq!((s.rows(), s.cols(), s.data()), (2, 2, p));
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);

        alloc.fail_next();
        assert!(s.try_conservative_resize(9, 3, 3).is_err());
        assert_eq!((s.rows(), s.cols(), s.data()), (2, 2, p));
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);

        alloc.fail_next();
        assert!(s.try_clone().is_err());

        alloc.fail_next();
        assert!(Counted::try_with_size_in(4, 2, 2, alloc.clone()).is_err());

        drop(s);
        assert_eq!(alloc.live_bytes(), 0);
        assert_eq!(alloc.allocations(), alloc.deallocations());
    }

    #[test]
    fn test_capacity_overflow_is_reported() {
        let mut s = DMat::new();
        let rows = usize::MAX / 8;
        let err = s.try_resize(rows * 2, rows, 2).unwrap_err();
        assert_eq!(err, StorageError::Alloc(AllocatorError::CapacityOverflow));
        assert!(s.is_empty());
    }

    type Mat3 = DynamicStorage<f64, Const<3>, Const<3>>;

    #[test]
    fn test_fully_fixed_default_allocates_on_resize() {
        let mut s = Mat3::default();
        assert!(s.data().is_null());
        assert_eq!((s.rows(), s.cols()), (3, 3));
        assert!(s.as_slice().is_empty());

        s.resize(9, 3, 3);
        assert!(!s.data().is_null());
        assert_eq!(s.as_slice(), &[0.0; 9]);
        iota(&mut s);
        assert_eq!(s.as_slice()[8], 8.0);

        let mut c = Mat3::default();
        c.conservative_resize(9, 3, 3);
        assert!(!c.data().is_null());
        assert_eq!(c.as_slice().len(), 9);
    }

    #[test]
    fn test_fully_fixed_release_counts() {
        let alloc = CountingAllocator::new();
        let empty = DynamicStorage::<i32, Const<3>, Const<3>, AutoAlign, CountingAllocator>::new_in(
            alloc.clone(),
        );
        drop(empty);
        assert_eq!(alloc.deallocations(), 0);

        let mut s =
            DynamicStorage::<i32, Const<3>, Dyn, AutoAlign, CountingAllocator>::with_size_in(
                9,
                3,
                3,
                alloc.clone(),
            );
        assert_eq!(alloc.live_bytes(), 9 * 4);
        s.resize(6, 3, 2);
        assert_eq!(alloc.live_bytes(), 6 * 4);
        drop(s);
        assert_eq!(alloc.freed_bytes(), 9 * 4 + 6 * 4);
        assert_eq!(alloc.live_bytes(), 0);
    }

    #[test]
    #[cfg(any(debug_assertions, feature = "checked-contracts"))]
    #[should_panic(expected = "disagree with the fixed dimensions")]
    fn test_rows_must_match_fixed_dimension() {
        let _ = DynamicStorage::<i32, Const<3>, Dyn>::with_size(6, 2, 3);
    }

    #[test]
    #[cfg(not(any(debug_assertions, feature = "checked-contracts")))]
    fn test_allocation_follows_extents_not_size() {
        let alloc = CountingAllocator::new();
        let mut s =
            DynamicStorage::<i32, Const<3>, Dyn, AutoAlign, CountingAllocator>::with_size_in(
                6,
                2,
                3,
                alloc.clone(),
            );
        assert_eq!((s.rows(), s.cols()), (3, 3));
        assert_eq!(s.as_slice().len(), 9);
        assert_eq!(alloc.live_bytes(), 9 * 4);

        s.resize(1, 3, 4);
        assert_eq!(s.as_slice().len(), 12);
        assert_eq!(alloc.live_bytes(), 12 * 4);
        s.as_mut_slice()[11] = 7;

        s.conservative_resize(100, 3, 5);
        assert_eq!(s.as_slice()[11], 7);
        assert_eq!(alloc.live_bytes(), 15 * 4);
        drop(s);
        assert_eq!(alloc.live_bytes(), 0);
    }

    proptest! {
        #[test]
        fn prop_dynamic_extents_roundtrip(rows in 0usize..40, cols in 0usize..40) {
            let s = DMat::with_size(rows * cols, rows, cols);
            prop_assert_eq!(s.rows(), rows);
            prop_assert_eq!(s.cols(), cols);
            prop_assert_eq!(s.data().is_null(), rows * cols == 0);
        }

        #[test]
        fn prop_conservative_resize_preserves_overlap(
            old in 0usize..64,
            mid in 0usize..64,
            new in 0usize..64,
        ) {
            let mut s = DynamicStorage::<u32, Dyn, Const<1>>::with_size(old, old, 1);
            for (i, v) in s.as_mut_slice().iter_mut().enumerate() {
                *v = i as u32 + 1;
            }
            s.conservative_resize(mid, mid, 1);
            s.conservative_resize(new, new, 1);
            let keep = old.min(mid).min(new);
            let expected: Vec<u32> = (1..=keep as u32).collect();
            prop_assert_eq!(&s.as_slice()[..keep], &expected[..]);
            prop_assert_eq!(s.as_slice().len(), new);
        }
    }
}
