//! Streaming budget over the parser's event stream.
//!
//! The budget is enforced before any node tree exists, so resource
//! amplification in the raw text (anchor storms, deep nesting, huge scalars,
//! endless document separators) is stopped while reading, not after.
//! Alias *expansion* is bounded separately, during resolution, by
//! [`crate::ResolveLimits`].

use ahash::AHashSet;
use saphyr_parser::{Event, Parser, ScalarStyle, ScanError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Limits applied while scanning YAML text.
///
/// Defaults are permissive for configuration files while stopping the
/// obvious amplification tricks. Every field may be overridden from a
/// serialized config; missing fields keep their defaults.
///
/// ```rust
/// let mut options = safe_saphyr::Options::default();
/// options.budget = Some(safe_saphyr::Budget {
///     max_aliases: 10,
///     ..safe_saphyr::Budget::default()
/// });
/// let allowlist = safe_saphyr::Allowlist::new();
/// let value = safe_saphyr::load_with_options("a: &x 1\nb: *x\n", &allowlist, options).unwrap();
/// assert_eq!(value.get("b").and_then(|v| v.as_i64()), Some(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Budget {
    /// Total parser events. Default: 1,000,000
    pub max_events: usize,
    /// Alias (`*ref`) events. Default: 50,000
    pub max_aliases: usize,
    /// Distinct anchor definitions. Default: 50,000
    pub max_anchors: usize,
    /// Nesting of sequences and mappings. Default: 2,000
    pub max_depth: usize,
    /// Documents in one stream. Default: 1,024
    pub max_documents: usize,
    /// Scalars, sequences and mappings. Default: 250,000
    pub max_nodes: usize,
    /// Sum of scalar text lengths in bytes. Default: 64 MiB
    pub max_total_scalar_bytes: usize,
    /// Merge keys (`<<`). Default: 10,000
    pub max_merge_keys: usize,
    /// Reject inputs with far more aliases than anchors once the scan ends.
    pub enforce_alias_anchor_ratio: bool,
    /// Aliases needed before the ratio check applies. Default: 100
    pub alias_anchor_min_aliases: usize,
    /// Breach when `aliases > multiplier * anchors`. Default: 10
    pub alias_anchor_ratio_multiplier: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_events: 1_000_000,
            max_aliases: 50_000,
            max_anchors: 50_000,
            max_depth: 2_000,
            max_documents: 1_024,
            max_nodes: 250_000,
            max_total_scalar_bytes: 64 * 1024 * 1024,
            max_merge_keys: 10_000,
            enforce_alias_anchor_ratio: true,
            alias_anchor_min_aliases: 100,
            alias_anchor_ratio_multiplier: 10,
        }
    }
}

/// The limit that tripped, with the count observed at that moment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BudgetBreach {
    Events { events: usize },
    Aliases { aliases: usize },
    Anchors { anchors: usize },
    Depth { depth: usize },
    Documents { documents: usize },
    Nodes { nodes: usize },
    ScalarBytes { total_scalar_bytes: usize },
    MergeKeys { merge_keys: usize },
    AliasAnchorRatio { aliases: usize, anchors: usize },
    /// A closing event without its opening one.
    Unbalanced,
}

/// Counters gathered during a scan, whether or not a limit tripped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetReport {
    pub breached: Option<BudgetBreach>,
    pub events: usize,
    pub aliases: usize,
    pub anchors: usize,
    pub documents: usize,
    pub nodes: usize,
    pub max_depth: usize,
    pub total_scalar_bytes: usize,
    pub merge_keys: usize,
}

/// One open collection. For mappings, `at_key` tells whether the next child
/// is a key.
#[derive(Clone, Copy, Debug)]
struct Open {
    mapping: bool,
    at_key: bool,
}

/// Applies a [`Budget`] one event at a time.
#[derive(Debug)]
pub struct BudgetEnforcer {
    budget: Budget,
    report: BudgetReport,
    anchors: AHashSet<usize>,
    open: SmallVec<[Open; 32]>,
}

/// Fail with `breach` if `count` is above `limit`.
fn check(count: usize, limit: usize, breach: impl FnOnce(usize) -> BudgetBreach) -> Result<(), BudgetBreach> {
    if count > limit {
        Err(breach(count))
    } else {
        Ok(())
    }
}

impl BudgetEnforcer {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            report: BudgetReport::default(),
            anchors: AHashSet::with_capacity(64),
            open: SmallVec::new(),
        }
    }

    /// Account for one event. Returns the breach as soon as a limit is crossed.
    pub fn observe(&mut self, event: &Event) -> Result<(), BudgetBreach> {
        self.report.events += 1;
        check(self.report.events, self.budget.max_events, |events| {
            BudgetBreach::Events { events }
        })?;

        match event {
            Event::DocumentStart(_) => {
                self.report.documents += 1;
                check(self.report.documents, self.budget.max_documents, |documents| {
                    BudgetBreach::Documents { documents }
                })?;
            }
            Event::Alias(_) => {
                self.report.aliases += 1;
                check(self.report.aliases, self.budget.max_aliases, |aliases| {
                    BudgetBreach::Aliases { aliases }
                })?;
                self.child_done();
            }
            Event::Scalar(text, style, anchor, tag) => {
                self.node(*anchor)?;
                self.report.total_scalar_bytes =
                    self.report.total_scalar_bytes.saturating_add(text.len());
                check(
                    self.report.total_scalar_bytes,
                    self.budget.max_total_scalar_bytes,
                    |total_scalar_bytes| BudgetBreach::ScalarBytes { total_scalar_bytes },
                )?;
                let is_merge =
                    tag.is_none() && matches!(style, ScalarStyle::Plain) && text.as_ref() == "<<";
                if is_merge && self.at_key() {
                    self.report.merge_keys += 1;
                    check(self.report.merge_keys, self.budget.max_merge_keys, |merge_keys| {
                        BudgetBreach::MergeKeys { merge_keys }
                    })?;
                }
                self.child_done();
            }
            Event::SequenceStart(anchor, _) => self.open(*anchor, false)?,
            Event::MappingStart(anchor, _) => self.open(*anchor, true)?,
            Event::SequenceEnd | Event::MappingEnd => {
                self.open.pop().ok_or(BudgetBreach::Unbalanced)?;
                self.child_done();
            }
            _ => {}
        }
        Ok(())
    }

    fn at_key(&self) -> bool {
        matches!(self.open.last(), Some(Open { mapping: true, at_key: true }))
    }

    /// A key or value of the innermost mapping has been completed.
    fn child_done(&mut self) {
        if let Some(top) = self.open.last_mut() {
            if top.mapping {
                top.at_key = !top.at_key;
            }
        }
    }

    fn node(&mut self, anchor: usize) -> Result<(), BudgetBreach> {
        self.report.nodes += 1;
        check(self.report.nodes, self.budget.max_nodes, |nodes| {
            BudgetBreach::Nodes { nodes }
        })?;
        // The parser numbers anchors from 1; 0 means "no anchor".
        if anchor != 0 && self.anchors.insert(anchor) {
            self.report.anchors = self.anchors.len();
            check(self.report.anchors, self.budget.max_anchors, |anchors| {
                BudgetBreach::Anchors { anchors }
            })?;
        }
        Ok(())
    }

    fn open(&mut self, anchor: usize, mapping: bool) -> Result<(), BudgetBreach> {
        self.node(anchor)?;
        self.open.push(Open {
            mapping,
            at_key: true,
        });
        self.report.max_depth = self.report.max_depth.max(self.open.len());
        check(self.open.len(), self.budget.max_depth, |depth| {
            BudgetBreach::Depth { depth }
        })
    }

    /// Counters so far, with `breach` recorded. Used after [`Self::observe`] fails.
    pub fn into_report(mut self, breach: BudgetBreach) -> BudgetReport {
        self.report.breached = Some(breach);
        self.report
    }

    /// End of stream: apply the alias-to-anchor ratio check and return the report.
    pub fn finalize(mut self) -> BudgetReport {
        let BudgetReport {
            aliases, anchors, ..
        } = self.report;
        if self.budget.enforce_alias_anchor_ratio
            && aliases >= self.budget.alias_anchor_min_aliases
            && aliases > self.budget.alias_anchor_ratio_multiplier.saturating_mul(anchors)
        {
            self.report.breached = Some(BudgetBreach::AliasAnchorRatio { aliases, anchors });
        }
        self.report
    }
}

/// Scan `input` against `budget` without building any nodes.
///
/// `Ok(report)` with `report.breached.is_some()` means the input must be
/// rejected. `Err` is a scanner failure.
pub fn check_yaml_budget(input: &str, budget: &Budget) -> Result<BudgetReport, ScanError> {
    let mut enforcer = BudgetEnforcer::new(budget.clone());
    for item in Parser::new_from_str(input) {
        let (event, _span) = item?;
        if let Err(breach) = enforcer.observe(&event) {
            return Ok(enforcer.into_report(breach));
        }
    }
    Ok(enforcer.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_document_passes() {
        let report = check_yaml_budget("a: [1, 2, 3]\n", &Budget::default()).unwrap();
        assert_eq!(report.breached, None);
        assert_eq!(report.documents, 1);
        assert_eq!(report.nodes, 6);
        assert_eq!(report.max_depth, 2);
    }

    #[test]
    fn alias_count_is_capped() {
        let yaml = "root: &A [1, 2]\na: *A\nb: *A\nc: *A\nd: *A\n";
        let budget = Budget {
            max_aliases: 3,
            ..Budget::default()
        };
        let report = check_yaml_budget(yaml, &budget).unwrap();
        assert_eq!(report.breached, Some(BudgetBreach::Aliases { aliases: 4 }));
    }

    #[test]
    fn nesting_is_capped() {
        let yaml = format!("{}{}", "[".repeat(100), "]".repeat(100));
        let budget = Budget {
            max_depth: 50,
            ..Budget::default()
        };
        let report = check_yaml_budget(&yaml, &budget).unwrap();
        assert_eq!(report.breached, Some(BudgetBreach::Depth { depth: 51 }));
    }

    #[test]
    fn merge_keys_are_counted_only_in_key_position() {
        let yaml = "base: &B {k: 1}\nx:\n  <<: *B\n  v: <<\ny:\n  <<: *B\n";
        let report = check_yaml_budget(yaml, &Budget::default()).unwrap();
        assert_eq!(report.merge_keys, 2);

        let budget = Budget {
            max_merge_keys: 1,
            ..Budget::default()
        };
        let report = check_yaml_budget(yaml, &budget).unwrap();
        assert_eq!(report.breached, Some(BudgetBreach::MergeKeys { merge_keys: 2 }));
    }

    #[test]
    fn ratio_check_waits_for_the_minimum() {
        let yaml = "root: &A [1]\na: *A\nb: *A\nc: *A\n";
        let mut budget = Budget {
            alias_anchor_min_aliases: 1,
            alias_anchor_ratio_multiplier: 2,
            ..Budget::default()
        };
        let report = check_yaml_budget(yaml, &budget).unwrap();
        assert_eq!(
            report.breached,
            Some(BudgetBreach::AliasAnchorRatio {
                aliases: 3,
                anchors: 1
            })
        );

        budget.alias_anchor_min_aliases = 5;
        let report = check_yaml_budget(yaml, &budget).unwrap();
        assert_eq!(report.breached, None);
    }

    #[test]
    fn budget_fields_default_when_deserialized() {
        let budget: Budget = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(budget.max_depth, 8);
        assert_eq!(budget.max_aliases, Budget::default().max_aliases);
        assert!(serde_json::from_str::<Budget>(r#"{"max_dpth": 8}"#).is_err());
    }
}
