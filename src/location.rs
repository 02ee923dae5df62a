//! Source locations attached to nodes and errors.

use std::fmt;

use saphyr_parser::Span;
use serde::{Deserialize, Serialize};

/// Row/column location within the source YAML document (1-indexed).
///
/// Trees built by hand (rather than composed from text) carry
/// [`Location::UNKNOWN`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub(crate) line: u32,
    pub(crate) column: u32,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    pub const UNKNOWN: Self = Self { line: 0, column: 0 };

    /// Create a location from 1-indexed coordinates.
    pub const fn new(line: usize, column: usize) -> Self {
        // Error reporting only; documents past 4G lines are not a concern.
        Self {
            line: line as u32,
            column: column as u32,
        }
    }

    /// 1-indexed line, `0` when unknown.
    pub fn line(&self) -> u64 {
        self.line as u64
    }

    /// 1-indexed column, `0` when unknown.
    pub fn column(&self) -> u64 {
        self.column as u64
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Convert a parser span to the 1-indexed location of its start.
pub(crate) fn location_from_span(span: &Span) -> Location {
    let start = &span.start;
    Location::new(start.line(), start.col() + 1)
}

/// Render `" at line X, column Y"` for known locations and nothing otherwise.
pub(crate) fn suffix(location: &Location) -> String {
    if location.is_known() {
        format!(" at {location}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_location_renders_no_suffix() {
        assert_eq!(suffix(&Location::UNKNOWN), "");
        assert!(!Location::default().is_known());
    }

    #[test]
    fn known_location_renders_line_and_column() {
        let location = Location::new(3, 7);
        assert_eq!(suffix(&location), " at line 3, column 7");
        assert_eq!(location.line(), 3);
        assert_eq!(location.column(), 7);
    }
}
