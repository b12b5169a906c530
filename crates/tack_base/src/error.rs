//! Error values raised by the construction pipeline.
//!
//! Deep layers (type registry, symbol table, assemblers) fail with a
//! [`ParseError`] carrying a classified [`ErrorKind`] and a formatted
//! message. The drivers catch these at statement/declaration boundaries,
//! forward the message to the active [`ErrorHandler`](crate::ErrorHandler),
//! and resynchronise — an error never unwinds past a top-level construct.
//!
//! # Example
//!
//! ```
//! use tack_base::{ErrorKind, ParseError, Result};
//!
//! fn check_arity(expected: usize, got: usize) -> Result<()> {
//!     if expected != got {
//!         return Err(ParseError::new(
//!             ErrorKind::ArityMismatch,
//!             format!("expected {} arguments but got {}", expected, got),
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_arity(2, 3).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::ArityMismatch);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of everything that can go wrong while building a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The lexer met a byte sequence that is no token.
    LexError,
    /// The token stream does not match the grammar.
    SyntaxError,
    /// An XML tag outside the document vocabulary.
    UnknownTag,
    /// A known tag in a position its parent does not allow.
    UnexpectedTag,
    /// A known tag out of order or repeated among its siblings.
    SiblingOrder,
    /// An end tag that does not match the open element.
    UnclosedTag,
    /// A name declared twice in the same frame.
    DuplicateSymbol,
    /// A reference to a name no enclosing frame declares.
    UnknownSymbol,
    /// Malformed composite type construction.
    BadType,
    /// A symbol or frame id outside the table.
    BadId,
    /// A call or instantiation with the wrong number of arguments.
    ArityMismatch,
    /// A function calling itself.
    RecursiveFunction,
    /// An edge endpoint that is not a declared location.
    StateNotDeclared,
    /// An `init` reference to an undeclared location.
    InitNotDeclared,
    /// A location marked both committed and urgent.
    ConflictingStateFlags,
    /// Any builder call after `done`.
    AfterDone,
}

/// A structured parse failure.
///
/// Replaces the static message buffer of older parsers with a value that can
/// cross layers safely; the message is already formatted for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Alias for `std::result::Result<T, ParseError>`.
pub type Result<T> = std::result::Result<T, ParseError>;
