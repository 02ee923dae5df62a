//! Node resolver: turns a [`Node`] tree into a [`Value`].
//!
//! Every tag is checked against the allowlist before anything is built from
//! the node carrying it. Built-in type markers in their core spellings
//! (`!!int`, `tag:yaml.org,2002:int`) are always accepted. Class tags need
//! the class to be allowlisted. Symbol tags, the local shorthand and `#`
//! variants of the built-ins (`!int`, `!float#exp`) and any other tag need
//! the exact tag string to be registered.
//!
//! The pluggable parts of resolution live behind [`ResolveHooks`]. Hooks run
//! only after the allowlist has accepted a node, so an override can change
//! *how* a value is built but never *whether* a tag is allowed.

use tracing::{debug, warn};

use crate::allowlist::{Allowlist, ClassEntry};
use crate::anchors::{self, AnchorTable};
use crate::error::Error;
use crate::node::{Node, NodeKind, ScalarStyle};
use crate::options::ResolveLimits;
use crate::revive;
use crate::scalar;
use crate::tags::{self, BuiltinTag, TagClass};
use crate::value::{Mapping, TaggedValue, Value, ValueSet};

/// Overridable steps of resolution.
///
/// All methods have defaults; implement only what needs to change.
///
/// ```rust
/// use safe_saphyr::{Allowlist, Error, Node, ResolveHooks, Resolver, ScalarStyle, Value};
/// use safe_saphyr::tags::BuiltinTag;
///
/// /// Keeps every plain scalar as a string.
/// struct NoGuessing;
///
/// impl ResolveHooks for NoGuessing {
///     fn coerce_scalar(
///         &self,
///         text: &str,
///         tag: Option<BuiltinTag>,
///         style: ScalarStyle,
///     ) -> Result<Value, Error> {
///         match tag {
///             None => Ok(Value::String(text.to_owned())),
///             Some(_) => safe_saphyr::scalar::coerce_tagged(text, tag, style.is_quoted()),
///         }
///     }
/// }
///
/// let allowlist = Allowlist::new();
/// let root = Node::plain("42");
/// let value = Resolver::with_hooks(&allowlist, NoGuessing).resolve_document(&root).unwrap();
/// assert_eq!(value, Value::from("42"));
/// ```
pub trait ResolveHooks {
    /// Coerce a scalar that is untagged (`tag` is `None`) or carries a
    /// built-in scalar tag.
    fn coerce_scalar(
        &self,
        text: &str,
        tag: Option<BuiltinTag>,
        style: ScalarStyle,
    ) -> Result<Value, Error> {
        scalar::coerce_tagged(text, tag, style.is_quoted())
    }

    /// Build an instance of an allowlisted class from its resolved payload.
    fn revive(&self, class: &ClassEntry, payload: Value) -> Result<Value, Error> {
        revive::revive(class, payload)
    }

    /// Observe or replace the value an alias expanded to.
    fn on_alias(&self, _anchor: &str, value: Value) -> Result<Value, Error> {
        Ok(value)
    }

    /// Wrap the value of a node carrying a registered custom tag.
    fn on_tagged(&self, tag: &str, value: Value) -> Result<Value, Error> {
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: tag.to_owned(),
            value,
        })))
    }
}

/// The stock behaviour of every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl ResolveHooks for DefaultHooks {}

impl<T: ResolveHooks + ?Sized> ResolveHooks for &T {
    fn coerce_scalar(
        &self,
        text: &str,
        tag: Option<BuiltinTag>,
        style: ScalarStyle,
    ) -> Result<Value, Error> {
        (**self).coerce_scalar(text, tag, style)
    }

    fn revive(&self, class: &ClassEntry, payload: Value) -> Result<Value, Error> {
        (**self).revive(class, payload)
    }

    fn on_alias(&self, anchor: &str, value: Value) -> Result<Value, Error> {
        (**self).on_alias(anchor, value)
    }

    fn on_tagged(&self, tag: &str, value: Value) -> Result<Value, Error> {
        (**self).on_tagged(tag, value)
    }
}

/// One resolution pass over one document.
///
/// The pass owns its anchor table and counters; it is consumed by
/// [`Resolver::resolve_document`], so nothing carries over to the next
/// document.
pub struct Resolver<'a, 'n, H = DefaultHooks> {
    allowlist: &'a Allowlist,
    limits: ResolveLimits,
    hooks: H,
    anchors: AnchorTable<'n>,
    depth: usize,
    resolved_nodes: usize,
    alias_expansions: usize,
    scalar_bytes: usize,
    /// Non-zero while the target of an alias is being resolved.
    replaying: usize,
}

impl<'a, 'n> Resolver<'a, 'n, DefaultHooks> {
    pub fn new(allowlist: &'a Allowlist) -> Self {
        Self::with_hooks(allowlist, DefaultHooks)
    }
}

impl<'a, 'n, H: ResolveHooks> Resolver<'a, 'n, H> {
    pub fn with_hooks(allowlist: &'a Allowlist, hooks: H) -> Self {
        Self {
            allowlist,
            limits: ResolveLimits::default(),
            hooks,
            anchors: AnchorTable::new(),
            depth: 0,
            resolved_nodes: 0,
            alias_expansions: 0,
            scalar_bytes: 0,
            replaying: 0,
        }
    }

    pub fn limits(mut self, limits: ResolveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolve `root` and everything below it.
    pub fn resolve_document(mut self, root: &'n Node) -> Result<Value, Error> {
        let result = self.resolve(root);
        match &result {
            Ok(_) => debug!(
                nodes = self.resolved_nodes,
                aliases = self.alias_expansions,
                scalar_bytes = self.scalar_bytes,
                anchors = self.anchors.len(),
                "document resolved"
            ),
            Err(err) => warn!(error = %err, "document rejected"),
        }
        result
    }

    fn resolve(&mut self, node: &'n Node) -> Result<Value, Error> {
        self.resolved_nodes += 1;
        if self.resolved_nodes > self.limits.max_resolved_nodes {
            return Err(Error::limit_exceeded("max_resolved_nodes", self.resolved_nodes)
                .with_location(node.location));
        }
        if let NodeKind::Scalar { text, .. } = &node.kind {
            self.scalar_bytes = self.scalar_bytes.saturating_add(text.len());
            if self.scalar_bytes > self.limits.max_resolved_scalar_bytes {
                return Err(
                    Error::limit_exceeded("max_resolved_scalar_bytes", self.scalar_bytes)
                        .with_location(node.location),
                );
            }
        }

        if let NodeKind::Alias(anchor) = &node.kind {
            return self
                .resolve_alias(anchor)
                .map_err(|err| err.with_location(node.location));
        }

        // Anchors inside an expanded alias were recorded on the first pass
        // over them; recording again could resurrect a redefined anchor.
        if let Some(anchor) = node.anchor.as_deref() {
            if self.replaying == 0 {
                self.anchors.record_anchor(anchor, node);
            }
            self.anchors.enter(node);
        }
        let result = self.resolve_tagged(node);
        if node.anchor.is_some() {
            self.anchors.leave();
        }
        result.map_err(|err| err.with_location(node.location))
    }

    fn resolve_alias(&mut self, anchor: &str) -> Result<Value, Error> {
        self.alias_expansions += 1;
        if self.alias_expansions > self.limits.max_alias_expansions {
            return Err(Error::limit_exceeded(
                "max_alias_expansions",
                self.alias_expansions,
            ));
        }
        let target = self.anchors.resolve_alias(anchor).inspect_err(|err| {
            warn!(anchor, error = %err, "alias rejected");
        })?;

        self.replaying += 1;
        let value = self.resolve(target);
        self.replaying -= 1;
        self.hooks.on_alias(anchor, value?)
    }

    fn resolve_tagged(&mut self, node: &'n Node) -> Result<Value, Error> {
        let Some(tag) = node.tag.as_deref() else {
            return self.resolve_untagged(node);
        };

        match tags::classify(tag) {
            TagClass::Builtin(builtin) => self.resolve_builtin(node, tag, builtin),
            TagClass::BuiltinVariant(builtin) => {
                self.require_tag(tag)?;
                self.resolve_builtin(node, tag, builtin)
            }
            TagClass::Symbol => {
                self.require_tag(tag)?;
                match &node.kind {
                    NodeKind::Scalar { text, .. } => Ok(Value::Symbol(text.clone())),
                    _ => Err(Error::disallowed_tag(tag)),
                }
            }
            TagClass::ClassRef => match &node.kind {
                NodeKind::Scalar { text, .. } => {
                    self.require_class(text)?;
                    Ok(Value::Class(text.clone()))
                }
                _ => Err(Error::disallowed_tag(tag)),
            },
            TagClass::Construct(name) => {
                let class = self.require_class(name)?;
                let payload = self.resolve_untagged(node)?;
                self.hooks.revive(class, payload)
            }
            TagClass::Custom => {
                self.require_tag(tag)?;
                let value = self.resolve_untagged(node)?;
                self.hooks.on_tagged(tag, value)
            }
        }
    }

    fn require_tag(&self, tag: &str) -> Result<(), Error> {
        if self.allowlist.is_tag_permitted(tag) {
            Ok(())
        } else {
            warn!(tag, "tag not on the allowlist");
            Err(Error::disallowed_tag(tag))
        }
    }

    fn require_class(&self, name: &str) -> Result<&'a ClassEntry, Error> {
        self.allowlist.class(name).ok_or_else(|| {
            warn!(class = name, "class not on the allowlist");
            Error::disallowed_type(name)
        })
    }

    fn resolve_builtin(
        &mut self,
        node: &'n Node,
        tag: &str,
        builtin: BuiltinTag,
    ) -> Result<Value, Error> {
        match (&node.kind, builtin) {
            (NodeKind::Scalar { text, style }, _) if builtin.is_scalar() => {
                self.hooks.coerce_scalar(text, Some(builtin), *style)
            }
            (NodeKind::Sequence(_), BuiltinTag::Seq) | (NodeKind::Mapping(_), BuiltinTag::Map) => {
                self.resolve_untagged(node)
            }
            (NodeKind::Mapping(_), BuiltinTag::Set) => match self.resolve_untagged(node)? {
                Value::Mapping(mapping) => Ok(Value::Set(ValueSet::new(
                    None,
                    mapping.into_iter().map(|(member, _)| member).collect(),
                ))),
                other => Ok(other),
            },
            (NodeKind::Sequence(_), BuiltinTag::Omap) => match self.resolve_untagged(node)? {
                Value::Sequence(items) => ordered_map(items),
                other => Ok(other),
            },
            _ => {
                warn!(tag, shape = node.shape(), "built-in tag on the wrong kind of node");
                Err(Error::disallowed_tag(tag))
            }
        }
    }

    fn resolve_untagged(&mut self, node: &'n Node) -> Result<Value, Error> {
        match &node.kind {
            NodeKind::Scalar { text, style } => self.hooks.coerce_scalar(text, None, *style),
            NodeKind::Sequence(items) => {
                self.descend()?;
                let items = items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<Vec<_>, _>>();
                self.depth -= 1;
                items.map(Value::Sequence)
            }
            NodeKind::Mapping(entries) => {
                self.descend()?;
                let mapping = self.resolve_mapping(entries);
                self.depth -= 1;
                mapping.map(Value::Mapping)
            }
            NodeKind::Alias(anchor) => self.resolve_alias(anchor),
        }
    }

    fn descend(&mut self) -> Result<(), Error> {
        if self.depth >= self.limits.max_depth {
            return Err(Error::limit_exceeded("max_depth", self.depth + 1));
        }
        self.depth += 1;
        Ok(())
    }

    fn resolve_mapping(&mut self, entries: &'n [(Node, Node)]) -> Result<Mapping, Error> {
        let mut sources = Vec::new();
        let mut explicit = Mapping::new();
        for (key, value) in entries {
            if key.is_merge_key() {
                let merged = self.resolve(value)?;
                let merged = anchors::merge_sources(merged).map_err(|err| {
                    warn!(shape = value.shape(), "merge value is not a mapping");
                    err.with_location(value.location)
                })?;
                sources.extend(merged);
                continue;
            }
            let key = self.resolve(key)?;
            let value = self.resolve(value)?;
            explicit.insert(key, value);
        }
        Ok(anchors::apply_merges(sources, explicit))
    }
}

/// `!!omap`: a sequence of single-pair mappings, folded into one mapping.
fn ordered_map(items: Vec<Value>) -> Result<Value, Error> {
    let mut ordered = Mapping::new();
    for item in items {
        match item {
            Value::Mapping(pair) if pair.len() == 1 => {
                for (key, value) in pair {
                    ordered.insert(key, value);
                }
            }
            other => {
                return Err(Error::construction_failed(
                    "!!omap",
                    other.shape(),
                    "expected single-pair mappings",
                ));
            }
        }
    }
    Ok(Value::Mapping(ordered))
}
