//! Backing storage of dense matrices and arrays.
//!
//! A storage owns the element buffer and the `(rows, cols)` extents. Which
//! representation is used is decided by types: each extent is a [`Const`]
//! (no runtime storage) or a [`Dyn`], and the total size is [`Fixed`]
//! (inline buffer), [`Null`] (nothing stored) or [`Dynamic`] (heap buffer).
//!
//! ```
//! use dense_storage::{Const, DenseStorage, Dyn, Dynamic, Fixed, Storage};
//!
//! let mut m = Storage::<f32, Fixed<4>, Const<2>, Const<2>>::with_size(4, 2, 2);
//! m.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
//!
//! let mut v = Storage::<f32, Dynamic, Dyn, Const<1>>::with_size(3, 3, 1);
//! v.conservative_resize(5, 5, 1);
//! assert_eq!(v.as_slice().len(), 5);
//! ```
#[macro_use]
mod macros;

pub mod alloc;
mod array;
pub mod config;
mod dimension;
mod dynamic;
mod error;
mod fixed;
mod null;
mod options;
mod shape;
mod storage;

pub use crate::alloc::{AllocatorError, Global, RawAllocator};
pub use crate::array::InlineBuffer;
pub use crate::dimension::{Const, Dim, Dyn};
pub use crate::dynamic::DynamicStorage;
pub use crate::error::{SResult, StorageError};
pub use crate::fixed::FixedStorage;
pub use crate::null::NullStorage;
pub use crate::options::{Align16, Align32, Align64, AutoAlign, DontAlign, Options, Unaligned};
pub use crate::shape::{DynExtent, Extent, FixedExtent};
pub use crate::storage::{DenseStorage, Dynamic, Fixed, Null, SizeAtCompileTime, Storage};
