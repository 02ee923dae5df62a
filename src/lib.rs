//! Allowlist-driven safe YAML loading.
//!
//! Documents are read with `saphyr-parser`, composed into [`Node`] trees and
//! resolved into [`Value`]s. Resolution is default-deny: built-in core tags
//! are always accepted, and every other tag or class must have been
//! registered on an [`Allowlist`] at configuration time.
//!
//! ```rust
//! use safe_saphyr::{Allowlist, ClassDescriptor, Error, Value};
//!
//! let mut allowlist = Allowlist::new();
//! allowlist.register_classes([ClassDescriptor::record("Point")])?;
//!
//! let point = safe_saphyr::load("!ruby/object:Point {x: 1, y: 2}", &allowlist)?;
//! let Value::Object(point) = point else { unreachable!() };
//! assert_eq!(point.field("y"), Some(&Value::Int(2)));
//!
//! let err = safe_saphyr::load("!ruby/object:Kernel {}", &allowlist).unwrap_err();
//! assert!(matches!(err, Error::DisallowedType { .. }));
//! # Ok::<(), Error>(())
//! ```
#![forbid(unsafe_code)]

pub mod allowlist;
mod anchors;
pub mod budget;
pub mod compose;
pub mod error;
pub mod location;
mod macros;
pub mod node;
pub mod options;
pub mod resolver;
pub mod revive;
pub mod scalar;
pub mod tags;
pub mod value;

pub use allowlist::{Allowlist, AllowlistConfig, ClassDescriptor, ClassEntry, ClassKind};
pub use budget::{Budget, BudgetBreach, BudgetReport};
pub use error::Error;
pub use location::Location;
pub use node::{Node, NodeKind, ScalarStyle};
pub use options::{Options, ResolveLimits};
pub use resolver::{DefaultHooks, ResolveHooks, Resolver};
pub use value::{Mapping, Object, Singleton, TaggedValue, Value, ValueSet};

use compose::Composer;

/// Load a single-document YAML string with default [`Options`].
///
/// An empty stream loads as [`Value::Null`]; more than one document is
/// [`Error::MultipleDocuments`].
pub fn load(input: &str, allowlist: &Allowlist) -> Result<Value, Error> {
    load_with_options(input, allowlist, Options::default())
}

pub fn load_with_options(
    input: &str,
    allowlist: &Allowlist,
    options: Options,
) -> Result<Value, Error> {
    let mut composer = Composer::new(input, options.budget).with_budget_report(options.budget_report);
    let Some(document) = composer.next_document()? else {
        return Ok(Value::Null);
    };
    if let Some(extra) = composer.next_document()? {
        return Err(Error::MultipleDocuments {
            location: extra.location,
        });
    }
    Resolver::new(allowlist)
        .limits(options.limits)
        .resolve_document(&document)
}

/// Load every document of a YAML stream with default [`Options`].
pub fn load_all(input: &str, allowlist: &Allowlist) -> Result<Vec<Value>, Error> {
    load_all_with_options(input, allowlist, Options::default())
}

/// Load every document of a YAML stream. Each document gets its own
/// resolution pass, so an anchor in one document is unknown in the next.
pub fn load_all_with_options(
    input: &str,
    allowlist: &Allowlist,
    options: Options,
) -> Result<Vec<Value>, Error> {
    let documents = Composer::new(input, options.budget)
        .with_budget_report(options.budget_report)
        .compose_all()?;
    documents
        .iter()
        .map(|document| {
            Resolver::new(allowlist)
                .limits(options.limits)
                .resolve_document(document)
        })
        .collect()
}

/// Resolve a hand-built or previously composed node tree with default limits.
pub fn resolve_document(root: &Node, allowlist: &Allowlist) -> Result<Value, Error> {
    Resolver::new(allowlist).resolve_document(root)
}
