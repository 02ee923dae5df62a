//! Composer: YAML text to one [`Node`] tree per document.
//!
//! Nodes are built from the `saphyr_parser` event stream with an explicit
//! stack, so nesting depth costs heap rather than call stack. When a
//! [`Budget`] is given, every raw event passes through a [`BudgetEnforcer`]
//! before it is turned into a node, and the alias-to-anchor ratio is checked
//! once the stream ends.
//!
//! The parser numbers anchors itself (a redefined name gets a fresh number
//! and later aliases point at the newest one), so anchors and aliases are
//! carried into the tree as those numbers.

use saphyr_parser::{Event, Parser, ScanError, Span, StrInput};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::budget::{Budget, BudgetEnforcer, BudgetReport};
use crate::error::Error;
use crate::location::{location_from_span, Location};
use crate::node::{Node, NodeKind, ScalarStyle};

/// Tag, anchor and position of a collection whose end has not been seen yet.
struct Header {
    tag: Option<String>,
    anchor: Option<String>,
    location: Location,
}

enum Body {
    Sequence(Vec<Node>),
    Mapping {
        entries: Vec<(Node, Node)>,
        key: Option<Node>,
    },
}

struct Open {
    header: Header,
    body: Body,
}

fn anchor_name(id: usize) -> Option<String> {
    (id != 0).then(|| id.to_string())
}

/// Builds nodes from parser events.
pub struct Composer<'i> {
    input: &'i str,
    parser: Parser<'i, StrInput<'i>>,
    budget: Option<BudgetEnforcer>,
    report: Option<fn(&BudgetReport)>,
    open: SmallVec<[Open; 16]>,
    root: Option<Node>,
    last_location: Location,
}

impl<'i> Composer<'i> {
    pub fn new(input: &'i str, budget: Option<Budget>) -> Self {
        Self {
            input,
            parser: Parser::new_from_str(input),
            budget: budget.map(BudgetEnforcer::new),
            report: None,
            open: SmallVec::new(),
            root: None,
            last_location: Location::UNKNOWN,
        }
    }

    /// Call `report` with the budget report when reading stops, whether it
    /// finished or the budget was breached.
    pub fn with_budget_report(mut self, report: Option<fn(&BudgetReport)>) -> Self {
        self.report = report;
        self
    }

    /// The next document of the stream, or `None` once it is exhausted.
    pub fn next_document(&mut self) -> Result<Option<Node>, Error> {
        while let Some(item) = self.parser.next() {
            let (event, span) = item.map_err(|err| scan_error(self.input, err))?;
            let location = location_from_span(&span);
            self.last_location = location;
            self.observe(&event, location)?;

            match event {
                Event::DocumentStart(_) => {
                    self.root = None;
                    self.open.clear();
                }
                Event::DocumentEnd => {
                    let root = self
                        .root
                        .take()
                        .unwrap_or_else(|| Node::plain("").at(location));
                    return Ok(Some(root));
                }
                Event::StreamEnd => self.finish()?,
                Event::Scalar(text, style, anchor, tag) => {
                    let node = Node {
                        kind: NodeKind::Scalar {
                            text: text.into_owned(),
                            style: ScalarStyle::from(style),
                        },
                        tag: tag.map(|t| t.to_string()),
                        anchor: anchor_name(anchor),
                        location,
                    };
                    self.push(node, &span)?;
                }
                Event::SequenceStart(anchor, tag) => self.open.push(Open {
                    header: Header {
                        tag: tag.map(|t| t.to_string()),
                        anchor: anchor_name(anchor),
                        location,
                    },
                    body: Body::Sequence(Vec::new()),
                }),
                Event::MappingStart(anchor, tag) => self.open.push(Open {
                    header: Header {
                        tag: tag.map(|t| t.to_string()),
                        anchor: anchor_name(anchor),
                        location,
                    },
                    body: Body::Mapping {
                        entries: Vec::new(),
                        key: None,
                    },
                }),
                Event::SequenceEnd | Event::MappingEnd => {
                    let node = self.close(&span)?;
                    self.push(node, &span)?;
                }
                Event::Alias(id) => {
                    let node = Node::alias(id.to_string()).at(location);
                    self.push(node, &span)?;
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Read every remaining document.
    pub fn compose_all(mut self) -> Result<Vec<Node>, Error> {
        let mut documents = Vec::new();
        while let Some(document) = self.next_document()? {
            documents.push(document);
        }
        debug!(documents = documents.len(), "stream composed");
        Ok(documents)
    }

    fn observe(&mut self, event: &Event, location: Location) -> Result<(), Error> {
        let Some(enforcer) = self.budget.as_mut() else {
            return Ok(());
        };
        if let Err(breach) = enforcer.observe(event) {
            warn!(?breach, %location, "YAML budget breached");
            if let Some(enforcer) = self.budget.take() {
                let report = enforcer.into_report(breach.clone());
                if let Some(callback) = self.report {
                    callback(&report);
                }
            }
            return Err(Error::budget(breach).with_location(location));
        }
        Ok(())
    }

    /// End of stream: run the checks that need the whole stream.
    fn finish(&mut self) -> Result<(), Error> {
        let Some(enforcer) = self.budget.take() else {
            return Ok(());
        };
        let report = enforcer.finalize();
        if let Some(callback) = self.report {
            callback(&report);
        }
        match report.breached {
            Some(breach) => {
                warn!(?breach, "YAML budget breached");
                Err(Error::budget(breach).with_location(self.last_location))
            }
            None => Ok(()),
        }
    }

    /// Attach a finished node to the innermost open collection, or make it
    /// the document root.
    fn push(&mut self, node: Node, span: &Span) -> Result<(), Error> {
        let Some(top) = self.open.last_mut() else {
            if self.root.is_some() {
                return Err(structure_error("second root node in one document", span));
            }
            self.root = Some(node);
            return Ok(());
        };
        match &mut top.body {
            Body::Sequence(items) => items.push(node),
            Body::Mapping { entries, key } => match key.take() {
                Some(key) => entries.push((key, node)),
                None => *key = Some(node),
            },
        }
        Ok(())
    }

    fn close(&mut self, span: &Span) -> Result<Node, Error> {
        let open = self
            .open
            .pop()
            .ok_or_else(|| structure_error("collection end without a start", span))?;
        let kind = match open.body {
            Body::Sequence(items) => NodeKind::Sequence(items),
            Body::Mapping { key: Some(_), .. } => {
                return Err(structure_error("mapping ended after a key", span));
            }
            Body::Mapping { entries, key: None } => NodeKind::Mapping(entries),
        };
        Ok(Node {
            kind,
            tag: open.header.tag,
            anchor: open.header.anchor,
            location: open.header.location,
        })
    }
}

fn structure_error(msg: &str, span: &Span) -> Error {
    Error::Parse {
        msg: msg.to_owned(),
        location: location_from_span(span),
    }
}

/// The parser refuses an alias to an undefined anchor itself, as a scan
/// error. Recover the alias name from the text so it surfaces as
/// [`Error::UnknownAnchor`] like any other unresolvable alias.
fn scan_error(input: &str, err: ScanError) -> Error {
    if !err.info().contains("unknown anchor") {
        return Error::from_scan_error(err);
    }
    let mark = err.marker();
    let location = Location::new(mark.line(), mark.col() + 1);
    let end = input
        .char_indices()
        .nth(mark.index())
        .map_or(input.len(), |(byte, c)| byte + c.len_utf8());
    let name = input[..end]
        .rfind('*')
        .map(|star| {
            input[star + 1..]
                .split(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '{' | '}'))
                .next()
                .unwrap_or_default()
        })
        .unwrap_or_default();
    if name.is_empty() {
        return Error::from_scan_error(err);
    }
    Error::UnknownAnchor {
        anchor: name.to_owned(),
        location,
    }
}

/// Compose every document of `input`, enforcing `budget` if given.
pub fn compose_all(input: &str, budget: Option<Budget>) -> Result<Vec<Node>, Error> {
    Composer::new(input, budget).compose_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetBreach;

    #[test]
    fn documents_become_trees() {
        let docs = compose_all("a: [1, 'x']\n---\n- !!str 2\n", None).unwrap();
        assert_eq!(docs.len(), 2);

        let NodeKind::Mapping(entries) = &docs[0].kind else {
            panic!("expected a mapping");
        };
        let (key, value) = &entries[0];
        assert_eq!(key.kind, NodeKind::Scalar { text: "a".into(), style: ScalarStyle::Plain });
        let NodeKind::Sequence(items) = &value.kind else {
            panic!("expected a sequence");
        };
        assert_eq!(
            items[1].kind,
            NodeKind::Scalar { text: "x".into(), style: ScalarStyle::SingleQuoted }
        );

        let NodeKind::Sequence(items) = &docs[1].kind else {
            panic!("expected a sequence");
        };
        assert_eq!(items[0].tag.as_deref(), Some("tag:yaml.org,2002:str"));
    }

    #[test]
    fn locations_are_one_based() {
        let docs = compose_all("a:\n  b: c\n", None).unwrap();
        let NodeKind::Mapping(entries) = &docs[0].kind else {
            panic!("expected a mapping");
        };
        let NodeKind::Mapping(inner) = &entries[0].1.kind else {
            panic!("expected a mapping");
        };
        assert_eq!(inner[0].0.location, Location::new(2, 3));
    }

    #[test]
    fn anchors_and_aliases_share_an_id() {
        let docs = compose_all("a: &x 1\nb: *x\n", None).unwrap();
        let NodeKind::Mapping(entries) = &docs[0].kind else {
            panic!("expected a mapping");
        };
        let anchor = entries[0].1.anchor.clone().unwrap();
        assert_eq!(entries[1].1.kind, NodeKind::Alias(anchor));
    }

    #[test]
    fn empty_stream_has_no_documents() {
        assert!(compose_all("", None).unwrap().is_empty());
        assert!(compose_all("# only a comment\n", None).unwrap().is_empty());
    }

    #[test]
    fn budget_breach_stops_composition() {
        let budget = Budget {
            max_documents: 1,
            ..Budget::default()
        };
        let err = compose_all("--- 1\n--- 2\n", Some(budget)).unwrap_err();
        assert!(matches!(
            err,
            Error::Budget {
                breach: BudgetBreach::Documents { documents: 2 },
                ..
            }
        ));
    }

    #[test]
    fn undefined_alias_names_the_anchor() {
        let err = compose_all("list:\n  - 1\n  - *nowhere\n", None).unwrap_err();
        match err {
            Error::UnknownAnchor { anchor, location } => {
                assert_eq!(anchor, "nowhere");
                assert_eq!(location.line(), 3);
            }
            other => panic!("expected UnknownAnchor, got {other:?}"),
        }
    }

    #[test]
    fn scanner_errors_carry_a_location() {
        let err = compose_all("a: [1, 2\n", None).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.location().is_some());
    }
}
