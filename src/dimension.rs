use std::fmt::Debug;

/// One extent of a matrix, known either at compile time or at run time.
///
/// A compile-time dimension is a zero-sized type; `set` on it is ignored and
/// `value` folds to a constant. A run-time dimension stores one `usize`.
pub trait Dim: Copy + Debug + PartialEq + Eq + Send + Sync + 'static {
    /// `Some(n)` for a fixed dimension, `None` for a dynamic one.
    const AT_COMPILE_TIME: Option<usize>;

    fn new(n: usize) -> Self;

    /// The dimension of an empty storage: the constant for a fixed dimension, 0 otherwise.
    fn empty() -> Self;

    fn value(&self) -> usize;

    fn set(&mut self, n: usize);

    #[inline]
    fn is_dynamic() -> bool {
        Self::AT_COMPILE_TIME.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Const<const N: usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dyn(pub(crate) usize);

impl<const N: usize> Dim for Const<N> {
    const AT_COMPILE_TIME: Option<usize> = Some(N);

    #[inline(always)]
    fn new(_n: usize) -> Self {
        Const
    }

    #[inline(always)]
    fn empty() -> Self {
        Const
    }

    #[inline(always)]
    fn value(&self) -> usize {
        N
    }

    #[inline(always)]
    fn set(&mut self, _n: usize) {}
}

impl Dim for Dyn {
    const AT_COMPILE_TIME: Option<usize> = None;

    #[inline(always)]
    fn new(n: usize) -> Self {
        Dyn(n)
    }

    #[inline(always)]
    fn empty() -> Self {
        Dyn(0)
    }

    #[inline(always)]
    fn value(&self) -> usize {
        self.0
    }

    #[inline(always)]
    fn set(&mut self, n: usize) {
        self.0 = n
    }
}
