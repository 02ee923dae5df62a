//! Macros for building option structs from `Default` plus a few overrides,
//! so call sites keep compiling when fields are added.

/// Construct [`crate::Options`] from `Default` and a list of field assignments.
///
/// ```rust
/// let options = safe_saphyr::options! {
///     budget: None,
/// };
/// assert!(options.budget.is_none());
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::Options::default();
        $( opt.$field = $value; )*
        opt
    }};
}

/// Construct `Some(`[`crate::Budget`]`)` from `Default` and field assignments,
/// ready to drop into [`options!`].
///
/// ```rust
/// let budget = safe_saphyr::budget! { max_aliases: 5 };
/// assert_eq!(budget.map(|b| b.max_aliases), Some(5));
/// ```
#[macro_export]
macro_rules! budget {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut budget = $crate::Budget::default();
        $( budget.$field = $value; )*
        ::core::option::Option::Some(budget)
    }};
}

/// Construct [`crate::ResolveLimits`] from `Default` and field assignments.
#[macro_export]
macro_rules! limits {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut limits = $crate::ResolveLimits::default();
        $( limits.$field = $value; )*
        limits
    }};
}
