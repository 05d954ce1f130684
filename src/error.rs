use crate::alloc::AllocatorError;
use thiserror::Error;

pub type SResult<T> = Result<T, StorageError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("allocation error: {0}")]
    Alloc(#[from] AllocatorError),
}

impl StorageError {
    /// Diverges the way an infallible allocating call does: capacity overflow
    /// panics, out-of-memory goes through `handle_alloc_error`.
    #[cold]
    pub(crate) fn handle(self) -> ! {
        match self {
            StorageError::Alloc(e) => e.handle(),
        }
    }
}
