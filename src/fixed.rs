use crate::array::InlineBuffer;
use crate::dimension::Dim;
use crate::error::SResult;
use crate::options::{AutoAlign, Options};
use crate::shape::Extent;
use crate::storage::DenseStorage;
use std::fmt;

/// Storage with a compile-time capacity of `SIZE` elements held inline.
///
/// The extents may still be dynamic (a matrix with a fixed maximum size);
/// resizing only rewrites them and never allocates.
pub struct FixedStorage<T, const SIZE: usize, R: Dim, C: Dim, O: Options = AutoAlign> {
    extent: Extent<R, C>,
    data: InlineBuffer<T, SIZE, O>,
}

impl<T, const SIZE: usize, R: Dim, C: Dim, O: Options> FixedStorage<T, SIZE, R, C, O> {
    const SHAPE_CHECK: () = assert!(
        match (R::AT_COMPILE_TIME, C::AT_COMPILE_TIME) {
            (Some(r), Some(c)) => r * c <= SIZE,
            _ => true,
        },
        "fixed extents exceed the inline capacity"
    );

    #[inline]
    pub fn new() -> Self
    where
        T: Default,
    {
        #[allow(clippy::let_unit_value)]
        let () = Self::SHAPE_CHECK;
        Self {
            extent: Extent::empty(),
            data: InlineBuffer::new(),
        }
    }

    #[inline]
    pub fn extent(&self) -> &Extent<R, C> {
        &self.extent
    }

    #[inline]
    fn set_extent(&mut self, size: usize, rows: usize, cols: usize) {
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        contract_assert!(size <= SIZE, "size {} exceeds fixed capacity {}", size, SIZE);
        self.extent.set(rows, cols);
    }
}

impl<T, const SIZE: usize, R: Dim, C: Dim, O: Options> DenseStorage<T>
    for FixedStorage<T, SIZE, R, C, O>
{
    type Rows = R;
    type Cols = C;

    const SIZE_AT_COMPILE_TIME: Option<usize> = Some(SIZE);

    fn try_with_size(size: usize, rows: usize, cols: usize) -> SResult<Self>
    where
        T: Default,
    {
        contract_assert_size!(Extent<R, C>, size, rows, cols);
        contract_assert!(size <= SIZE, "size {} exceeds fixed capacity {}", size, SIZE);
        #[allow(clippy::let_unit_value)]
        let () = Self::SHAPE_CHECK;
        Ok(Self {
            extent: Extent::new(rows, cols),
            data: InlineBuffer::new(),
        })
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
        if SIZE == 0 {
            std::ptr::null()
        } else {
            self.data.as_ptr()
        }
    }

    #[inline]
    fn data_mut(&mut self) -> *mut T {
        if SIZE == 0 {
            std::ptr::null_mut()
        } else {
            self.data.as_mut_ptr()
        }
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self.data.as_slice(self.extent.size())
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        let size = self.extent.size();
        self.data.as_mut_slice(size)
    }

    #[inline]
    fn try_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default,
    {
        self.set_extent(size, rows, cols);
        Ok(())
    }

    #[inline]
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
        let (a_size, b_size) = (self.extent.size(), other.extent.size());
        InlineBuffer::swap(&mut self.data, a_size, &mut other.data, b_size);
        self.extent.swap(&mut other.extent);
    }
}

impl<T: Default, const SIZE: usize, R: Dim, C: Dim, O: Options> Default
    for FixedStorage<T, SIZE, R, C, O>
{
    fn default() -> Self {
        Self::new()
    }
}

/// Copies only the live prefix; the rest of the new buffer is default.
impl<T: Clone + Default, const SIZE: usize, R: Dim, C: Dim, O: Options> Clone
    for FixedStorage<T, SIZE, R, C, O>
{
    fn clone(&self) -> Self {
        let mut data = InlineBuffer::new();
        InlineBuffer::copy(&self.data, self.extent.size(), &mut data);
        Self {
            extent: self.extent,
            data,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        InlineBuffer::copy(&source.data, source.extent.size(), &mut self.data);
        self.extent = source.extent;
    }
}

impl<T: fmt::Debug, const SIZE: usize, R: Dim, C: Dim, O: Options> fmt::Debug
    for FixedStorage<T, SIZE, R, C, O>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedStorage")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("data", &self.as_slice())
            .finish()
    }
}
