//! Document node tree consumed by the resolver.
//!
//! Nodes come either from [`crate::compose`] (YAML text) or are built by hand
//! with the constructors below. The resolver only reads them.

use crate::location::Location;

/// Presentation style of a scalar.
///
/// Anything other than [`ScalarStyle::Plain`] counts as quoted: the author
/// asked for the text to be taken literally, so no type guessing happens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_quoted(self) -> bool {
        self != ScalarStyle::Plain
    }
}

impl From<saphyr_parser::ScalarStyle> for ScalarStyle {
    fn from(style: saphyr_parser::ScalarStyle) -> Self {
        match style {
            saphyr_parser::ScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            saphyr_parser::ScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            saphyr_parser::ScalarStyle::Literal => ScalarStyle::Literal,
            saphyr_parser::ScalarStyle::Folded => ScalarStyle::Folded,
            #[allow(unreachable_patterns)]
            _ => ScalarStyle::Plain,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Scalar { text: String, style: ScalarStyle },
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
    /// Reference to the anchor id of an earlier node.
    Alias(String),
}

/// One node of a parsed document.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub tag: Option<String>,
    pub anchor: Option<String>,
    pub location: Location,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: None,
            anchor: None,
            location: Location::UNKNOWN,
        }
    }

    pub fn scalar<S: Into<String>>(text: S, style: ScalarStyle) -> Self {
        Self::new(NodeKind::Scalar {
            text: text.into(),
            style,
        })
    }

    /// Unquoted scalar, subject to type guessing.
    pub fn plain<S: Into<String>>(text: S) -> Self {
        Self::scalar(text, ScalarStyle::Plain)
    }

    /// Double-quoted scalar, always a string.
    pub fn quoted<S: Into<String>>(text: S) -> Self {
        Self::scalar(text, ScalarStyle::DoubleQuoted)
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Self::new(NodeKind::Sequence(items))
    }

    pub fn mapping(entries: Vec<(Node, Node)>) -> Self {
        Self::new(NodeKind::Mapping(entries))
    }

    pub fn alias<S: Into<String>>(anchor: S) -> Self {
        Self::new(NodeKind::Alias(anchor.into()))
    }

    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_anchor<S: Into<String>>(mut self, anchor: S) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// True if this node is the merge key `<<`: a plain, untagged scalar.
    pub fn is_merge_key(&self) -> bool {
        self.tag.is_none()
            && matches!(
                &self.kind,
                NodeKind::Scalar { text, style: ScalarStyle::Plain } if text == "<<"
            )
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Alias(_) => "alias",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plain_untagged_double_angle_is_a_merge_key() {
        assert!(Node::plain("<<").is_merge_key());
        assert!(!Node::quoted("<<").is_merge_key());
        assert!(!Node::plain("<<").with_tag("!!str").is_merge_key());
        assert!(!Node::plain("<").is_merge_key());
    }

    #[test]
    fn every_non_plain_style_is_quoted() {
        assert!(!ScalarStyle::Plain.is_quoted());
        for style in [
            ScalarStyle::SingleQuoted,
            ScalarStyle::DoubleQuoted,
            ScalarStyle::Literal,
            ScalarStyle::Folded,
        ] {
            assert!(style.is_quoted(), "{style:?}");
        }
    }
}
