use crate::config::{compute_default_alignment, STACK_ALLOCATION_LIMIT, UNALIGNED_ARRAY_ASSERT};
use crate::options::Options;
use std::mem::{self, size_of};

/// Fixed-capacity element array embedded in the storage object.
///
/// With `O = AutoAlign` the array starts on a `MAX_STATIC_ALIGN_BYTES`
/// boundary through the zero-length marker field; `ALIGNMENT` is the boundary
/// SIMD code may rely on and is what `as_ptr` asserts.
#[repr(C)]
pub struct InlineBuffer<T, const N: usize, O: Options> {
    _align: [O::Marker; 0],
    array: [T; N],
}

impl<T, const N: usize, O: Options> InlineBuffer<T, N, O> {
    pub const ALIGNMENT: usize = if O::ALIGN {
        compute_default_alignment(N * size_of::<T>())
    } else {
        0
    };

    const STACK_CHECK: () = assert!(
        N * size_of::<T>() <= STACK_ALLOCATION_LIMIT,
        "object allocated on stack is too big"
    );

    #[inline]
    pub fn new() -> Self
    where
        T: Default,
    {
        #[allow(clippy::let_unit_value)]
        let () = Self::STACK_CHECK;
        Self {
            _align: [],
            array: std::array::from_fn(|_| T::default()),
        }
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    fn assert_aligned(&self) {
        if UNALIGNED_ARRAY_ASSERT && Self::ALIGNMENT > 0 {
            contract_assert!(
                (self.array.as_ptr() as usize) & (Self::ALIGNMENT - 1) == 0,
                "inline array is not aligned to {} bytes",
                Self::ALIGNMENT
            );
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.assert_aligned();
        self.array.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.assert_aligned();
        self.array.as_mut_ptr()
    }

    #[inline]
    pub fn as_slice(&self, len: usize) -> &[T] {
        &self.array[..len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self, len: usize) -> &mut [T] {
        &mut self.array[..len]
    }

    /// Copies the first `size` elements of `src` into `dst`.
    pub fn copy(src: &Self, size: usize, dst: &mut Self)
    where
        T: Clone,
    {
        contract_assert!(size <= N, "copy of {} elements into capacity {}", size, N);
        dst.array[..size].clone_from_slice(&src.array[..size]);
    }

    /// Exchanges the logical contents of two buffers.
    ///
    /// The common prefix is swapped; the tail of the longer buffer is moved
    /// into the shorter one, since the shorter buffer has nothing live there
    /// to give back.
    pub fn swap(a: &mut Self, a_size: usize, b: &mut Self, b_size: usize)
    where
        T: Default,
    {
        contract_assert!(a_size <= N && b_size <= N);
        if a_size < b_size {
            a.array[..a_size].swap_with_slice(&mut b.array[..a_size]);
            move_range(&mut b.array[a_size..b_size], &mut a.array[a_size..b_size]);
        } else if a_size > b_size {
            a.array[..b_size].swap_with_slice(&mut b.array[..b_size]);
            move_range(&mut a.array[b_size..a_size], &mut b.array[b_size..a_size]);
        } else {
            a.array[..a_size].swap_with_slice(&mut b.array[..a_size]);
        }
    }
}

fn move_range<T: Default>(src: &mut [T], dst: &mut [T]) {
    for (s, d) in src.iter_mut().zip(dst.iter_mut()) {
        *d = mem::take(s);
    }
}

impl<T: Default, const N: usize, O: Options> Default for InlineBuffer<T, N, O> {
    fn default() -> Self {
        Self::new()
    }
}
