pub use enclose::*;

/// Builds a derived cell, cloning the listed captures into the rule.
///
/// ```
/// use reactor::{cell, Cell};
///
/// let a = Cell::new(2);
/// let b = cell!((a) => a.read() + 1);
/// assert_eq!(b.read(), 3);
/// ```
#[macro_export]
macro_rules! cell {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Cell::derived($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::Cell::derived(move || { $($b)* })
    };
}

/// Replaces the rule of `$cell` with a derivation, cloning the listed
/// captures into it. Evaluates to the `Result` of the write.
#[macro_export]
macro_rules! define {
    ($cell:expr, ( $($d_tt:tt)* ) => $($b:tt)*) => {
        $cell.derive($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    ($cell:expr, => $($b:tt)*) => {
        $cell.derive(move || { $($b)* })
    };
}
