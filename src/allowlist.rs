//! Tag and class allowlist.
//!
//! The allowlist is the only source of permission in the crate: nothing read
//! from a document can add to it. It is filled at configuration time and then
//! shared immutably (`&Allowlist`) by every resolution pass, so it is
//! `Send + Sync` and can sit in a `static` or an `Arc`.
//!
//! Registration is additive and idempotent. Registering a class name a second
//! time keeps the first descriptor; a singleton's shared instance is created
//! once and never replaced.

use std::fmt;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::value::{Singleton, Value};

/// Constructor for [`ClassKind::Custom`]: receives the class name and the
/// resolved payload.
pub type Factory = Arc<dyn Fn(&str, Value) -> Result<Value, String> + Send + Sync>;

/// How instances of an allowlisted class are revived.
#[derive(Clone)]
pub enum ClassKind {
    /// One shared instance, whatever the payload.
    Singleton,
    /// Set-like: membership is the only observable state.
    Set,
    /// Mapping payload kept as named fields.
    Record,
    /// Scalar payload kept as a single value.
    Scalar,
    Custom(Factory),
}

impl fmt::Debug for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Singleton => f.write_str("Singleton"),
            ClassKind::Set => f.write_str("Set"),
            ClassKind::Record => f.write_str("Record"),
            ClassKind::Scalar => f.write_str("Scalar"),
            ClassKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A class offered for registration.
///
/// The name is optional so that descriptors generated from foreign metadata
/// can be passed through unchanged; anonymous descriptors are rejected by
/// [`Allowlist::register_classes`].
#[derive(Clone, Debug)]
pub struct ClassDescriptor {
    pub name: Option<String>,
    pub kind: ClassKind,
}

impl ClassDescriptor {
    pub fn new<S: Into<String>>(name: S, kind: ClassKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
        }
    }

    pub fn record<S: Into<String>>(name: S) -> Self {
        Self::new(name, ClassKind::Record)
    }

    pub fn scalar<S: Into<String>>(name: S) -> Self {
        Self::new(name, ClassKind::Scalar)
    }

    pub fn set<S: Into<String>>(name: S) -> Self {
        Self::new(name, ClassKind::Set)
    }

    pub fn singleton<S: Into<String>>(name: S) -> Self {
        Self::new(name, ClassKind::Singleton)
    }

    pub fn custom<S, F>(name: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn(&str, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(name, ClassKind::Custom(Arc::new(factory)))
    }

    /// A descriptor without a name. Registering it always fails.
    pub fn anonymous(kind: ClassKind) -> Self {
        Self { name: None, kind }
    }
}

/// A registered class.
#[derive(Clone, Debug)]
pub struct ClassEntry {
    name: String,
    kind: ClassKind,
    singleton: Option<Singleton>,
}

impl ClassEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    /// The shared instance, for [`ClassKind::Singleton`] classes.
    pub fn singleton(&self) -> Option<&Singleton> {
        self.singleton.as_ref()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Allowlist {
    tags: AHashSet<String>,
    classes: AHashMap<String, ClassEntry>,
}

impl Allowlist {
    /// An empty allowlist: only built-in tags are accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags understood by Ruby-flavoured YAML: symbol tags, the local
    /// shorthand of the binary, float, string and timestamp tags, and the
    /// `#` variants of float and timestamp. No classes.
    pub fn ruby_compat() -> Self {
        let mut allowlist = Self::new();
        allowlist.register_tags([
            "!ruby/sym",
            "!ruby/symbol",
            "!binary",
            "!float",
            "!float#exp",
            "!float#inf",
            "!str",
            "!timestamp",
            "!timestamp#iso8601",
            "!timestamp#spaced",
        ]);
        allowlist
    }

    /// Build an allowlist from a deserialized [`AllowlistConfig`].
    pub fn from_config(config: AllowlistConfig) -> Result<Self, Error> {
        let mut allowlist = Self::new();
        allowlist.register_tags(config.tags);
        allowlist.register_classes(config.classes.into_iter().map(ClassConfig::into_descriptor))?;
        Ok(allowlist)
    }

    /// Permit the given tags. Already permitted tags are left as they are.
    pub fn register_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            debug!(tag = %tag, "allowlisting tag");
            self.tags.insert(tag);
        }
        self
    }

    /// Permit the given classes.
    ///
    /// The whole batch is checked before anything is inserted: one anonymous
    /// or blank name fails the call with [`Error::InvalidRegistration`] and
    /// leaves the allowlist untouched.
    pub fn register_classes<I>(&mut self, classes: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = ClassDescriptor>,
    {
        let mut batch = Vec::new();
        for descriptor in classes {
            match descriptor.name {
                Some(name) if !name.trim().is_empty() => batch.push((name, descriptor.kind)),
                Some(_) => return Err(Error::invalid_registration("class name is blank")),
                None => {
                    return Err(Error::invalid_registration(
                        "anonymous class cannot be allowlisted",
                    ));
                }
            }
        }

        for (name, kind) in batch {
            if self.classes.contains_key(&name) {
                continue;
            }
            debug!(class = %name, kind = ?kind, "allowlisting class");
            let singleton = matches!(kind, ClassKind::Singleton).then(|| Singleton::new(&name));
            self.classes.insert(
                name.clone(),
                ClassEntry {
                    name,
                    kind,
                    singleton,
                },
            );
        }
        Ok(self)
    }

    pub fn is_tag_permitted(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_class_permitted(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }
}

/// Serializable allowlist, for loading from a configuration file.
///
/// Custom factories cannot be expressed here; register those in code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllowlistConfig {
    pub tags: Vec<String>,
    pub classes: Vec<ClassConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ClassConfigKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassConfigKind {
    #[default]
    Record,
    Scalar,
    Set,
    Singleton,
}

impl ClassConfig {
    fn into_descriptor(self) -> ClassDescriptor {
        let kind = match self.kind {
            ClassConfigKind::Record => ClassKind::Record,
            ClassConfigKind::Scalar => ClassKind::Scalar,
            ClassConfigKind::Set => ClassKind::Set,
            ClassConfigKind::Singleton => ClassKind::Singleton,
        };
        ClassDescriptor::new(self.name, kind)
    }
}
