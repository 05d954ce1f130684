use crate::dimension::Dim;
use crate::error::SResult;
use crate::shape::Extent;
use crate::storage::DenseStorage;
use std::fmt;
use std::marker::PhantomData;

/// Storage of a matrix whose total size is zero at compile time.
///
/// Only the extents are kept; `data()` is always null.
pub struct NullStorage<T, R: Dim, C: Dim> {
    extent: Extent<R, C>,
    _marker: PhantomData<T>,
}

impl<T, R: Dim, C: Dim> NullStorage<T, R, C> {
    const SHAPE_CHECK: () = assert!(
        match (R::AT_COMPILE_TIME, C::AT_COMPILE_TIME) {
            (Some(r), Some(c)) => r * c == 0,
            _ => true,
        },
        "null storage requires a zero-sized fixed shape"
    );

    #[inline]
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SHAPE_CHECK;
        Self {
            extent: Extent::empty(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn set_extent(&mut self, size: usize, rows: usize, cols: usize) {
        contract_assert!(size == 0, "null storage cannot hold {} elements", size);
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        self.extent.set(rows, cols);
    }
}

impl<T, R: Dim, C: Dim> DenseStorage<T> for NullStorage<T, R, C> {
    type Rows = R;
    type Cols = C;

    const SIZE_AT_COMPILE_TIME: Option<usize> = Some(0);

    fn try_with_size(size: usize, rows: usize, cols: usize) -> SResult<Self>
    where
        T: Default,
    {
        let mut s = Self::new();
        s.set_extent(size, rows, cols);
        Ok(s)
    }

    #[inline(always)]
    fn rows(&self) -> usize {
        self.extent.rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.extent.cols()
    }

    #[inline(always)]
    fn size(&self) -> usize {
        0
    }

    #[inline(always)]
    fn data(&self) -> *const T {
        std::ptr::null()
    }

    #[inline(always)]
    fn data_mut(&mut self) -> *mut T {
        std::ptr::null_mut()
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        &[]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut []
    }

    fn try_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        self.set_extent(size, rows, cols);
        Ok(())
    }

    fn try_conservative_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        self.set_extent(size, rows, cols);
        Ok(())
    }

    fn try_clone(&self) -> SResult<Self>
    where
        T: Clone + Default,
    {
        Ok(self.clone())
    }

    fn swap(&mut self, other: &mut Self)
    where
        T: Default,
    {
        self.extent.swap(&mut other.extent);
    }
}

impl<T, R: Dim, C: Dim> Default for NullStorage<T, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R: Dim, C: Dim> Clone for NullStorage<T, R, C> {
    fn clone(&self) -> Self {
        Self {
            extent: self.extent,
            _marker: PhantomData,
        }
    }
}

impl<T, R: Dim, C: Dim> fmt::Debug for NullStorage<T, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullStorage")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .finish()
    }
}
