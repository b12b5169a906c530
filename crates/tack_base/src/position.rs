//! Source positions reported by the parsing front ends.
//!
//! Positions flow through the builder protocol via `add_position` and end up
//! attached to diagnostics. The text driver updates them as it lexes; the
//! XML driver leaves them at their defaults and relies on XPath context
//! instead.

use serde::{Deserialize, Serialize};

/// A point in some input, as fine-grained as the active front end can say.
///
/// `position` is an absolute character index, `offset` the index within the
/// current line, `line` the 1-based line number. `path` names the input
/// (a file name, or an XPath fragment for XML-embedded text).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub position: u32,
    pub offset: u32,
    pub line: u32,
    pub path: String,
}

impl Position {
    pub fn new(position: u32, offset: u32, line: u32, path: impl Into<String>) -> Self {
        Self {
            position,
            offset,
            line,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_position_is_zeroed() {
        let pos = Position::default();
        assert_eq!(pos.position, 0);
        assert_eq!(pos.line, 0);
        assert!(pos.path.is_empty());
    }

    #[test]
    fn new_stores_all_fields() {
        let pos = Position::new(42, 7, 3, "model.xta");
        assert_eq!(pos.position, 42);
        assert_eq!(pos.offset, 7);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.path, "model.xta");
    }
}
