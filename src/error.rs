//! Error taxonomy for loading and resolving documents.
//!
//! Every variant aborts the resolution pass it was raised in; no partially
//! resolved document is ever handed back. Variants carry the offending tag,
//! class name or anchor id so that rejected input can be audited.

use saphyr_parser::ScanError;
use thiserror::Error;

use crate::budget::BudgetBreach;
use crate::location::{suffix, Location};

/// Longest slice of offending scalar text echoed back in an error.
const MAX_ECHOED_SCALAR: usize = 64;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Tag is neither a built-in type marker nor registered on the allowlist.
    #[error("tag `{tag}` is not allowed{}", suffix(.location))]
    DisallowedTag { tag: String, location: Location },

    /// Class-construction tag naming a class that is not allowlisted.
    #[error("deserialization of class `{name}` is not allowed{}", suffix(.location))]
    DisallowedType { name: String, location: Location },

    /// Alias to an anchor that was never recorded in this pass.
    #[error("alias references unknown anchor `{anchor}`{}", suffix(.location))]
    UnknownAnchor { anchor: String, location: Location },

    /// Alias to an anchor whose node is still being resolved.
    #[error("alias `{anchor}` refers to a node that contains it{}", suffix(.location))]
    RecursiveAlias { anchor: String, location: Location },

    /// Tagged scalar whose text does not fit its declared type.
    #[error("invalid {tag} scalar `{value}`: {reason}{}", suffix(.location))]
    MalformedScalar {
        tag: String,
        value: String,
        reason: String,
        location: Location,
    },

    /// An allowlisted class rejected the payload it was given.
    #[error("cannot construct `{class}` from a {shape}: {reason}{}", suffix(.location))]
    ConstructionFailed {
        class: String,
        shape: &'static str,
        reason: String,
        location: Location,
    },

    /// Configuration-time registration that can never be matched safely.
    #[error("invalid allowlist registration: {reason}")]
    InvalidRegistration { reason: String },

    /// Merge key (`<<`) whose value is not a mapping, a sequence of mappings, or null.
    #[error("merge value must be a mapping, a sequence of mappings, or null{}", suffix(.location))]
    InvalidMerge { location: Location },

    /// A traversal limit from [`crate::ResolveLimits`] was exceeded.
    #[error("resolution limit `{limit}` exceeded ({value}){}", suffix(.location))]
    LimitExceeded {
        limit: &'static str,
        value: usize,
        location: Location,
    },

    /// A streaming [`crate::Budget`] was breached while reading the input.
    #[error("YAML budget breached: {breach:?}{}", suffix(.location))]
    Budget {
        breach: BudgetBreach,
        location: Location,
    },

    /// The underlying scanner rejected the input text.
    #[error("{msg}{}", suffix(.location))]
    Parse { msg: String, location: Location },

    /// Single-document entry point received a multi-document stream.
    #[error("expected a single YAML document, found several{}", suffix(.location))]
    MultipleDocuments { location: Location },
}

impl Error {
    pub(crate) fn disallowed_tag(tag: &str) -> Self {
        Error::DisallowedTag {
            tag: tag.to_owned(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn disallowed_type(name: &str) -> Self {
        Error::DisallowedType {
            name: name.to_owned(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unknown_anchor(anchor: &str) -> Self {
        Error::UnknownAnchor {
            anchor: anchor.to_owned(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn recursive_alias(anchor: &str) -> Self {
        Error::RecursiveAlias {
            anchor: anchor.to_owned(),
            location: Location::UNKNOWN,
        }
    }

    /// Build a `MalformedScalar`, echoing at most a short prefix of the text.
    pub(crate) fn malformed<R: Into<String>>(tag: &str, value: &str, reason: R) -> Self {
        let value = match value.char_indices().nth(MAX_ECHOED_SCALAR) {
            Some((cut, _)) => format!("{}...", &value[..cut]),
            None => value.to_owned(),
        };
        Error::MalformedScalar {
            tag: tag.to_owned(),
            value,
            reason: reason.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn construction_failed<R: Into<String>>(
        class: &str,
        shape: &'static str,
        reason: R,
    ) -> Self {
        Error::ConstructionFailed {
            class: class.to_owned(),
            shape,
            reason: reason.into(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn invalid_registration<R: Into<String>>(reason: R) -> Self {
        Error::InvalidRegistration {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_merge() -> Self {
        Error::InvalidMerge {
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn limit_exceeded(limit: &'static str, value: usize) -> Self {
        Error::LimitExceeded {
            limit,
            value,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn budget(breach: BudgetBreach) -> Self {
        Error::Budget {
            breach,
            location: Location::UNKNOWN,
        }
    }

    /// Map a scanner failure into our error type, keeping its position.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        Error::Parse {
            msg: err.info().to_owned(),
            location: Location::new(mark.line(), mark.col() + 1),
        }
    }

    /// Attach `set_location` unless the error already points somewhere.
    ///
    /// Errors bubble up through every enclosing node; the innermost
    /// (most precise) location is the one that sticks.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::DisallowedTag { location, .. }
            | Error::DisallowedType { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::RecursiveAlias { location, .. }
            | Error::MalformedScalar { location, .. }
            | Error::ConstructionFailed { location, .. }
            | Error::InvalidMerge { location }
            | Error::LimitExceeded { location, .. }
            | Error::Budget { location, .. }
            | Error::Parse { location, .. }
            | Error::MultipleDocuments { location } => {
                if !location.is_known() {
                    *location = set_location;
                }
            }
            Error::InvalidRegistration { .. } => {}
        }
        self
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::DisallowedTag { location, .. }
            | Error::DisallowedType { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::RecursiveAlias { location, .. }
            | Error::MalformedScalar { location, .. }
            | Error::ConstructionFailed { location, .. }
            | Error::InvalidMerge { location }
            | Error::LimitExceeded { location, .. }
            | Error::Budget { location, .. }
            | Error::Parse { location, .. }
            | Error::MultipleDocuments { location } => {
                location.is_known().then_some(*location)
            }
            Error::InvalidRegistration { .. } => None,
        }
    }
}
