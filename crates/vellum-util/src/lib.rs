//! Common utilities that aren't specific to one other subcrate and are
//! unlikely to change frequently. Pulling this logic out of `vellum-core`
//! keeps that crate's recompilation cost down during iteration.
//!
//! **This crate is not semver compliant.** The version is locked to the root
//! `vellum` crate version.

#[cfg(any(test, feature = "test"))]
mod test_util;

#[cfg(any(test, feature = "test"))]
pub use test_util::*;

/// Link to the issue tracker, used in panic messages for conditions that
/// should be unreachable
pub const NEW_ISSUE_LINK: &str =
    "https://github.com/vellum-expr/vellum/issues/new";

/// Extension trait for [Result]
pub trait ResultTraced<T, E>: Sized {
    /// If this is an error, trace it at `error` level. Return the same
    /// result unmodified
    #[must_use]
    fn traced(self) -> Self;
}

impl<T, E> ResultTraced<T, E> for Result<T, E>
where
    E: std::error::Error,
{
    fn traced(self) -> Self {
        self.inspect_err(|error| tracing::error!(%error, "operation failed"))
    }
}

/// A static mapping between values (of type `T`) and labels (strings). Used
/// to both stringify from and parse to `T`. Mirrors the structure of the
/// builtin function catalog, where each entry has one canonical name.
pub struct Mapping<'a, T: Copy>(&'a [(T, &'a str)]);

impl<'a, T: Copy> Mapping<'a, T> {
    pub const fn new(mapping: &'a [(T, &'a str)]) -> Self {
        Self(mapping)
    }

    /// Get a value by its label
    pub fn get(&self, label: &str) -> Option<T> {
        self.0
            .iter()
            .find(|(_, known)| *known == label)
            .map(|(value, _)| *value)
    }

    /// Get the label mapped to a value. Panics if the value isn't mapped
    pub fn get_label(&self, value: T) -> &'a str
    where
        T: std::fmt::Debug + PartialEq,
    {
        self.0
            .iter()
            .find(|(v, _)| v == &value)
            .unwrap_or_else(|| panic!("Unknown value {value:?}"))
            .1
    }

    pub fn labels(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.0.iter().map(|(_, label)| *label)
    }
}

/// Deduplicate a list of owned strings, keeping only the first occurrence of
/// each. Used for the "dedup only on retrieval" rule that applies to
/// `vars_used`/`reserved_used` accumulation.
pub fn dedup_preserve_order<T: Clone + Eq + std::hash::Hash>(
    items: impl IntoIterator<Item = T>,
) -> Vec<T> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
