use crate::dimension::Dim;
use crate::dynamic::DynamicStorage;
use crate::error::SResult;
use crate::fixed::FixedStorage;
use crate::null::NullStorage;
use crate::options::{AutoAlign, Options};

/// Owner of a dense matrix's element buffer and `(rows, cols)` extents.
///
/// Every constructor and resize takes the redundant triple
/// `(size, rows, cols)` with `size == rows * cols`. The triple is checked only
/// by `contract_assert!`. Values for fixed dimensions are ignored.
///
/// The `try_*` operations report allocation failure and leave the storage
/// unchanged on `Err`; their plain counterparts abort through
/// `handle_alloc_error` instead.
pub trait DenseStorage<T>: Sized {
    type Rows: Dim;
    type Cols: Dim;

    /// `Some(n)` when the capacity is fixed at compile time, `None` for heap storage.
    const SIZE_AT_COMPILE_TIME: Option<usize>;

    fn try_with_size(size: usize, rows: usize, cols: usize) -> SResult<Self>
    where
        T: Default;

    fn with_size(size: usize, rows: usize, cols: usize) -> Self
    where
        T: Default,
    {
        Self::try_with_size(size, rows, cols).unwrap_or_else(|e| e.handle())
    }

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    #[inline]
    fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Start of the buffer; null when nothing is stored.
    fn data(&self) -> *const T;

    fn data_mut(&mut self) -> *mut T;

    /// The `rows() * cols()` live elements.
    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];

    /// Destructive resize: element values are not preserved.
    fn try_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default;

    fn resize(&mut self, size: usize, rows: usize, cols: usize)
    where
        T: Default,
    {
        if let Err(e) = self.try_resize(size, rows, cols) {
            e.handle()
        }
    }

    /// Resize keeping the first `min(old, new)` elements in place.
    fn try_conservative_resize(&mut self, size: usize, rows: usize, cols: usize) -> SResult<()>
    where
        T: Default;

    fn conservative_resize(&mut self, size: usize, rows: usize, cols: usize)
    where
        T: Default,
    {
        if let Err(e) = self.try_conservative_resize(size, rows, cols) {
            e.handle()
        }
    }

    /// Deep copy sized to the current element count.
    fn try_clone(&self) -> SResult<Self>
    where
        T: Clone + Default;

    fn swap(&mut self, other: &mut Self)
    where
        T: Default;
}

/// Compile-time total size of a storage, selecting its representation.
pub trait SizeAtCompileTime {
    const VALUE: Option<usize>;

    type Storage<T, R: Dim, C: Dim, O: Options>: DenseStorage<T, Rows = R, Cols = C>;
}

/// Inline buffer of capacity `N`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fixed<const N: usize>;

/// Nothing is ever stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

/// Heap buffer sized at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dynamic;

impl<const N: usize> SizeAtCompileTime for Fixed<N> {
    const VALUE: Option<usize> = Some(N);
    type Storage<T, R: Dim, C: Dim, O: Options> = FixedStorage<T, N, R, C, O>;
}

impl SizeAtCompileTime for Null {
    const VALUE: Option<usize> = Some(0);
    type Storage<T, R: Dim, C: Dim, O: Options> = NullStorage<T, R, C>;
}

impl SizeAtCompileTime for Dynamic {
    const VALUE: Option<usize> = None;
    type Storage<T, R: Dim, C: Dim, O: Options> = DynamicStorage<T, R, C, O>;
}

/// The storage representation chosen for total size `S`.
pub type Storage<T, S, R, C, O = AutoAlign> = <S as SizeAtCompileTime>::Storage<T, R, C, O>;
