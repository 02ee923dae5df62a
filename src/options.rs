use crate::budget::{Budget, BudgetReport};
use serde::{Deserialize, Serialize};

/// Limits applied while walking a node tree.
///
/// These bound the work of a single resolution pass. Alias expansion is
/// the interesting case: a small document with nested aliases
/// ("billion laughs") expands to an exponential number of nodes, and every
/// node produced through an alias is counted here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveLimits {
    /// Deepest nesting of collections, counting through aliases.
    pub max_depth: usize,
    /// Nodes produced by one pass, including those produced through aliases.
    pub max_resolved_nodes: usize,
    /// Alias nodes followed in one pass.
    pub max_alias_expansions: usize,
    /// Sum of the text lengths of all scalars produced by one pass, in bytes.
    /// A scalar reached through an alias is counted again on every use.
    pub max_resolved_scalar_bytes: usize,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_resolved_nodes: 1_000_000,
            max_alias_expansions: 100_000,
            max_resolved_scalar_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Loader configuration.
///
/// ```rust
/// let options = safe_saphyr::options! {
///     budget: safe_saphyr::budget! { max_documents: 2 },
///     limits: safe_saphyr::limits! { max_depth: 16 },
/// };
/// let allowlist = safe_saphyr::Allowlist::new();
/// let value = safe_saphyr::load_with_options("[1, [2, [3]]]", &allowlist, options).unwrap();
/// assert_eq!(value.as_sequence().map(|s| s.len()), Some(2));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Streaming budget applied while reading text. `None` disables it.
    pub budget: Option<Budget>,
    /// Invoked with the budget report once reading finishes, also when the
    /// budget was breached.
    #[serde(skip)]
    pub budget_report: Option<fn(&BudgetReport)>,
    /// Limits applied while resolving each document.
    pub limits: ResolveLimits,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            budget: Some(Budget::default()),
            budget_report: None,
            limits: ResolveLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert_eq!(opts.budget, Some(Budget::default()));
        assert!(opts.budget_report.is_none());
        assert_eq!(opts.limits.max_depth, 256);
        assert_eq!(opts.limits.max_alias_expansions, 100_000);
    }

    #[test]
    fn options_from_partial_json() {
        let opts: Options =
            serde_json::from_str(r#"{"budget": null, "limits": {"max_resolved_nodes": 10}}"#)
                .unwrap();
        assert!(opts.budget.is_none());
        assert_eq!(opts.limits.max_resolved_nodes, 10);
        assert_eq!(opts.limits.max_depth, ResolveLimits::default().max_depth);
    }
}
