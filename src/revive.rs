//! Construction of allowlisted classes from resolved payloads.
//!
//! Only reached after the resolver has confirmed that the class is on the
//! allowlist; there is no path from a document to an arbitrary constructor.

use indexmap::IndexSet;

use crate::allowlist::{ClassEntry, ClassKind};
use crate::error::Error;
use crate::value::{Mapping, Object, Value, ValueSet};

/// Revive `payload` as an instance of the class described by `entry`.
pub fn revive(entry: &ClassEntry, payload: Value) -> Result<Value, Error> {
    let class = entry.name();
    match entry.kind() {
        ClassKind::Singleton => entry
            .singleton()
            .cloned()
            .map(Value::Singleton)
            .ok_or_else(|| {
                Error::construction_failed(class, payload.shape(), "singleton was never created")
            }),
        ClassKind::Set => set_members(class, payload).map(|members| {
            Value::Set(ValueSet::new(Some(class), members))
        }),
        ClassKind::Record => match payload {
            Value::Null => Ok(Value::Object(Object::new(class, Value::Mapping(Mapping::new())))),
            Value::Mapping(_) => Ok(Value::Object(Object::new(class, payload))),
            other => Err(Error::construction_failed(
                class,
                other.shape(),
                "expected a mapping of fields",
            )),
        },
        ClassKind::Scalar => match payload {
            Value::Sequence(_) | Value::Mapping(_) | Value::Set(_) => Err(
                Error::construction_failed(class, payload.shape(), "expected a scalar"),
            ),
            scalar => Ok(Value::Object(Object::new(class, scalar))),
        },
        ClassKind::Custom(factory) => {
            let shape = payload.shape();
            factory(class, payload).map_err(|reason| Error::construction_failed(class, shape, reason))
        }
    }
}

/// Members of a set-like payload.
///
/// A sequence contributes every item. A mapping contributes each key whose
/// flag is truthy (anything but null and `false`); the `{hash: {..}}` form
/// of a serialized set is unwrapped first. Null is the empty set.
pub(crate) fn set_members(class: &str, payload: Value) -> Result<IndexSet<Value>, Error> {
    match payload {
        Value::Null => Ok(IndexSet::new()),
        Value::Sequence(items) => Ok(items.into_iter().collect()),
        Value::Mapping(mapping) => {
            let mapping = unwrap_hash(mapping);
            Ok(mapping
                .into_iter()
                .filter(|(_, flag)| is_truthy(flag))
                .map(|(member, _)| member)
                .collect())
        }
        other => Err(Error::construction_failed(
            class,
            other.shape(),
            "expected a sequence or a mapping of members",
        )),
    }
}

fn unwrap_hash(mapping: Mapping) -> Mapping {
    if mapping.len() == 1 {
        if let Some(Value::Mapping(inner)) = mapping.get_str("hash") {
            return inner.clone();
        }
    }
    mapping
}

fn is_truthy(flag: &Value) -> bool {
    !matches!(flag, Value::Null | Value::Bool(false))
}
