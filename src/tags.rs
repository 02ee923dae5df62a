//! Tag classification.
//!
//! Built-in type markers are accepted without registration in the core
//! spellings the parser may hand us: `!!int`, `tag:yaml.org,2002:int` and
//! `tag:yaml.org,2002:!int`. The local shorthand `!int` and the `#` variants
//! such as `!float#exp` name the same types but must be registered. Class
//! tags, symbol tags and opaque custom tags are subject to the allowlist too.
//! The non-specific tag `!` forces a string.

const CORE_PREFIXES: &[&str] = &["tag:yaml.org,2002:!", "tag:yaml.org,2002:", "!!"];

const NON_SPECIFIC: &str = "!";

/// Tags whose scalar payload names a class (a class reference, not an instance).
const CLASS_REF_TAGS: &[&str] = &["!ruby/class", "!class"];

/// Tag prefixes followed by the class name to construct.
const CONSTRUCT_PREFIXES: &[&str] = &[
    "!ruby/object:",
    "!ruby/hash:",
    "!ruby/struct:",
    "!object:",
    "!map:",
];

const SYMBOL_TAGS: &[&str] = &["!ruby/sym", "!ruby/symbol", "!symbol"];

/// The core schema types the resolver knows how to build without help.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinTag {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Binary,
    Timestamp,
    Seq,
    Map,
    Set,
    Omap,
}

impl BuiltinTag {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "str" => BuiltinTag::Str,
            "int" => BuiltinTag::Int,
            "float" => BuiltinTag::Float,
            "bool" => BuiltinTag::Bool,
            "null" => BuiltinTag::Null,
            "binary" => BuiltinTag::Binary,
            "timestamp" => BuiltinTag::Timestamp,
            "seq" => BuiltinTag::Seq,
            "map" => BuiltinTag::Map,
            "set" => BuiltinTag::Set,
            "omap" => BuiltinTag::Omap,
            _ => return None,
        })
    }

    /// Recognise `tag` if it is a built-in marker in a core spelling.
    pub fn parse(tag: &str) -> Option<Self> {
        CORE_PREFIXES
            .iter()
            .find_map(|prefix| tag.strip_prefix(prefix))
            .and_then(Self::from_name)
    }

    /// Recognise the local shorthand `!int`, `!binary`, ...
    fn parse_local(tag: &str) -> Option<Self> {
        tag.strip_prefix('!')
            .filter(|name| !name.starts_with('!'))
            .and_then(Self::from_name)
    }

    /// Shorthand spelling, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinTag::Str => "!!str",
            BuiltinTag::Int => "!!int",
            BuiltinTag::Float => "!!float",
            BuiltinTag::Bool => "!!bool",
            BuiltinTag::Null => "!!null",
            BuiltinTag::Binary => "!!binary",
            BuiltinTag::Timestamp => "!!timestamp",
            BuiltinTag::Seq => "!!seq",
            BuiltinTag::Map => "!!map",
            BuiltinTag::Set => "!!set",
            BuiltinTag::Omap => "!!omap",
        }
    }

    /// True for tags that apply to scalar nodes.
    pub fn is_scalar(self) -> bool {
        !matches!(
            self,
            BuiltinTag::Seq | BuiltinTag::Map | BuiltinTag::Set | BuiltinTag::Omap
        )
    }
}

/// What a tag asks the resolver to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TagClass<'t> {
    /// Core schema marker; always permitted.
    Builtin(BuiltinTag),
    /// `!float`, `!float#exp` and similar spellings of a built-in; permitted
    /// only if registered.
    BuiltinVariant(BuiltinTag),
    /// Symbol marker; permitted only if registered.
    Symbol,
    /// Scalar naming an allowlisted class.
    ClassRef,
    /// Construct an instance of the named class.
    Construct(&'t str),
    /// Anything else; permitted only if registered.
    Custom,
}

pub(crate) fn classify(tag: &str) -> TagClass<'_> {
    if tag == NON_SPECIFIC {
        return TagClass::Builtin(BuiltinTag::Str);
    }
    if let Some(builtin) = BuiltinTag::parse(tag) {
        return TagClass::Builtin(builtin);
    }
    let base = tag.split_once('#').map_or(tag, |(base, _variant)| base);
    if let Some(builtin) = BuiltinTag::parse(base).or_else(|| BuiltinTag::parse_local(base)) {
        return TagClass::BuiltinVariant(builtin);
    }
    if SYMBOL_TAGS.contains(&tag) {
        return TagClass::Symbol;
    }
    if CLASS_REF_TAGS.contains(&tag) {
        return TagClass::ClassRef;
    }
    if let Some(name) = CONSTRUCT_PREFIXES
        .iter()
        .find_map(|prefix| tag.strip_prefix(prefix))
    {
        return TagClass::Construct(name);
    }
    TagClass::Custom
}
