use crate::dimension::{Const, Dim, Dyn};

/// The `(rows, cols)` pair of a storage.
///
/// Fixed dimensions occupy no space, so `Extent<Const<R>, Const<C>>` is zero
/// sized and `Extent<Dyn, Dyn>` is two words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent<R: Dim, C: Dim> {
    rows: R,
    cols: C,
}

pub type FixedExtent<const R: usize, const C: usize> = Extent<Const<R>, Const<C>>;

pub type DynExtent = Extent<Dyn, Dyn>;

impl<R: Dim, C: Dim> Extent<R, C> {
    #[inline]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: R::new(rows),
            cols: C::new(cols),
        }
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            rows: R::empty(),
            cols: C::empty(),
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows.value()
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols.value()
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    #[inline]
    pub fn checked_size(&self) -> Option<usize> {
        self.rows().checked_mul(self.cols())
    }

    /// Whether `(rows, cols)` agrees with every fixed dimension.
    #[inline]
    pub fn accepts(rows: usize, cols: usize) -> bool {
        R::AT_COMPILE_TIME.map_or(true, |n| n == rows)
            && C::AT_COMPILE_TIME.map_or(true, |n| n == cols)
    }

    /// Overwrites the dynamic dimensions. Values for fixed dimensions are
    /// ignored without validation.
    #[inline]
    pub fn set(&mut self, rows: usize, cols: usize) {
        self.rows.set(rows);
        self.cols.set(cols);
    }

    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }
}

impl<R: Dim, C: Dim> Default for Extent<R, C> {
    fn default() -> Self {
        Self::empty()
    }
}
