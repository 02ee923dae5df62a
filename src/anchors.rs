//! Anchor bookkeeping for one resolution pass, and merge-key assembly.
//!
//! The table borrows nodes from the document being resolved and is dropped
//! with the pass, so anchors never leak between documents or between
//! concurrent passes.

use ahash::AHashMap;

use crate::error::Error;
use crate::node::Node;
use crate::value::{Mapping, Value};

#[derive(Debug, Default)]
pub(crate) struct AnchorTable<'n> {
    anchors: AHashMap<&'n str, &'n Node>,
    /// Anchored nodes whose resolution has started but not finished.
    open: Vec<&'n Node>,
}

impl<'n> AnchorTable<'n> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `node` under `anchor`. A later definition of the same anchor
    /// replaces the earlier one for every alias that follows.
    pub(crate) fn record_anchor(&mut self, anchor: &'n str, node: &'n Node) {
        self.anchors.insert(anchor, node);
    }

    pub(crate) fn resolve_alias(&self, anchor: &str) -> Result<&'n Node, Error> {
        let node = self
            .anchors
            .get(anchor)
            .copied()
            .ok_or_else(|| Error::unknown_anchor(anchor))?;
        if self.open.iter().any(|open| std::ptr::eq(*open, node)) {
            return Err(Error::recursive_alias(anchor));
        }
        Ok(node)
    }

    pub(crate) fn enter(&mut self, node: &'n Node) {
        self.open.push(node);
    }

    pub(crate) fn leave(&mut self) {
        self.open.pop();
    }

    pub(crate) fn len(&self) -> usize {
        self.anchors.len()
    }
}

/// Turn the resolved value of a `<<` key into the mappings it merges.
///
/// Null merges nothing. A mapping merges itself, and so does a revived
/// record whose payload is a mapping. A sequence merges each of its
/// elements, which must all be one of those two.
pub(crate) fn merge_sources(value: Value) -> Result<Vec<Mapping>, Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items.into_iter().map(single_source).collect(),
        other => single_source(other).map(|mapping| vec![mapping]),
    }
}

fn single_source(value: Value) -> Result<Mapping, Error> {
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Object(object) => match object.into_payload() {
            Value::Mapping(mapping) => Ok(mapping),
            _ => Err(Error::invalid_merge()),
        },
        _ => Err(Error::invalid_merge()),
    }
}

/// Build the final mapping: merged entries first (an earlier source wins
/// over a later one), then the explicit entries, which override anything
/// merged.
pub(crate) fn apply_merges(sources: Vec<Mapping>, explicit: Mapping) -> Mapping {
    if sources.is_empty() {
        return explicit;
    }
    let mut merged = Mapping::new();
    for source in sources {
        for (key, value) in source {
            if !merged.contains_key(&key) {
                merged.insert(key, value);
            }
        }
    }
    for (key, value) in explicit {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    fn mapping(pairs: &[(&str, i64)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (Value::from(*k), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn redefined_anchor_replaces_earlier() {
        let first = Node::plain("1");
        let second = Node::plain("2");
        let mut table = AnchorTable::new();
        table.record_anchor("a", &first);
        table.record_anchor("a", &second);
        assert!(std::ptr::eq(table.resolve_alias("a").unwrap(), &second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_and_open_anchors_are_errors() {
        let node = Node::sequence(vec![]);
        let mut table = AnchorTable::new();
        assert!(matches!(
            table.resolve_alias("nope"),
            Err(Error::UnknownAnchor { .. })
        ));

        table.record_anchor("loop", &node);
        table.enter(&node);
        assert!(matches!(
            table.resolve_alias("loop"),
            Err(Error::RecursiveAlias { .. })
        ));
        table.leave();
        assert!(table.resolve_alias("loop").is_ok());
    }

    #[test]
    fn merge_precedence() {
        let sources = vec![mapping(&[("a", 1), ("b", 1)]), mapping(&[("b", 2), ("c", 2)])];
        let explicit = mapping(&[("c", 3), ("d", 3)]);
        let merged = apply_merges(sources, explicit);
        assert_eq!(merged, mapping(&[("a", 1), ("b", 1), ("c", 3), ("d", 3)]));
    }

    #[test]
    fn merge_source_shapes() {
        assert!(merge_sources(Value::Null).unwrap().is_empty());
        assert_eq!(merge_sources(Value::Mapping(mapping(&[("a", 1)]))).unwrap().len(), 1);
        assert!(matches!(
            merge_sources(Value::from("scalar")),
            Err(Error::InvalidMerge { .. })
        ));
        assert!(matches!(
            merge_sources(Value::Sequence(vec![Value::Int(1)])),
            Err(Error::InvalidMerge { .. })
        ));
    }

    #[test]
    fn record_with_mapping_payload_merges_its_fields() {
        let record = Value::Object(Object::new("Options", Value::Mapping(mapping(&[("a", 1)]))));
        assert_eq!(merge_sources(record.clone()).unwrap(), vec![mapping(&[("a", 1)])]);
        assert_eq!(merge_sources(Value::Sequence(vec![record])).unwrap().len(), 1);

        let scalar_record = Value::Object(Object::new("Money", Value::from("1.00")));
        assert!(matches!(
            merge_sources(scalar_record),
            Err(Error::InvalidMerge { .. })
        ));
    }
}
