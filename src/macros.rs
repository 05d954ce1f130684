/// Precondition check for the storage contract.
///
/// Expands to `assert!` when debug assertions or the `checked-contracts`
/// feature are enabled and to nothing otherwise. With both off, violating a
/// precondition (for example `size != rows * cols`) is undefined behavior of
/// the owning container; no check is performed.
macro_rules! contract_assert {
    ($($arg:tt)*) => {
        if cfg!(any(debug_assertions, feature = "checked-contracts")) {
            assert!($($arg)*);
        }
    };
}

/// Checks the `(size, rows, cols)` triple handed to a constructor or resize
/// against the extent type, including the values of its fixed dimensions.
macro_rules! contract_assert_size {
    ($extent:ty, $size:expr, $rows:expr, $cols:expr) => {
        contract_assert!(
            <$extent>::accepts($rows, $cols),
            "extents {}x{} disagree with the fixed dimensions",
            $rows,
            $cols
        );
        contract_assert!(
            $rows.checked_mul($cols) == Some($size),
            "size {} does not match extents {}x{}",
            $size,
            $rows,
            $cols
        );
    };
}
