use crate::config::MaxAlign;
use std::fmt::Debug;

#[repr(align(16))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Align16;

#[repr(align(32))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Align32;

#[repr(align(64))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Align64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unaligned;

/// Storage options of a dense matrix: whether its buffer gets the automatic
/// SIMD alignment.
pub trait Options: Copy + Debug + Default + Send + Sync + 'static {
    const ALIGN: bool;

    /// Zero-sized type whose alignment the inline buffer inherits.
    type Marker: Copy + Debug + Default + Send + Sync + 'static;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoAlign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DontAlign;

impl Options for AutoAlign {
    const ALIGN: bool = true;
    type Marker = MaxAlign;
}

impl Options for DontAlign {
    const ALIGN: bool = false;
    type Marker = Unaligned;
}
