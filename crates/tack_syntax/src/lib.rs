//! Parser for timed automata networks.
//!
//! `tack-syntax` turns textual (XTA) and XML descriptions of timed automata
//! networks into a typed in-memory [`System`]. The pipeline is push-driven:
//! a front end walks its input and narrates it to a [`Builder`], and the
//! builder assembles whatever it wants from the event stream.
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`token`] | Keyword table with syntax-variant masks, XML tag table |
//! | [`lexer`] | Byte lexer for the textual grammar |
//! | [`types`] | Interned composite types with flag bits |
//! | [`symbols`] | Symbol table with nested, reactivatable frames |
//! | [`builder`] | The push protocol both front ends drive |
//! | [`system`] | [`SystemBuilder`]: events → typed AST |
//! | [`pretty`] | [`PrettyPrinter`]: events → canonical text |
//! | [`parser`] | [`parse_xta`]: the text driver with selectable start symbol |
//! | [`xml`] | [`parse_xml_buffer`]: SAX-style XML driver |
//!
//! ## Example
//!
//! ```
//! use tack_base::ErrorLog;
//! use tack_syntax::{parse_xta, StartSymbol, SystemBuilder};
//!
//! let source = r#"
//! chan c;
//! process Blink() {
//!     state on, off;
//!     init off;
//!     trans
//!         off -> on { sync c?; },
//!         on -> off { };
//! }
//! B = Blink();
//! system B;
//! "#;
//!
//! let mut builder = SystemBuilder::new();
//! let mut log = ErrorLog::new();
//! let status = parse_xta(source, &mut builder, &mut log, true, StartSymbol::XtaFile);
//! assert_eq!(status, 0);
//!
//! let system = builder.into_system();
//! assert_eq!(system.template("Blink").unwrap().edges.len(), 2);
//! ```
//!
//! Both drivers report recoverable problems through
//! [`tack_base::ErrorHandler`] and keep going; the XML driver prefixes each
//! diagnostic with an XPath into the document.

pub mod ast;
pub mod builder;
pub mod expression;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod symbols;
pub mod system;
pub mod token;
pub mod types;
pub mod xml;

pub use ast::{
    AssignOp, BinaryOp, ChanPriorityEntry, Declarations, Edge, Expr, Function, Instantiation,
    Location, Payload, Prefix, ProcessRef, ProgressMeasure, Statement, Sync, Synchronisation,
    System, Template, TernaryOp, UnaryOp, Variable,
};
pub use builder::Builder;
pub use parser::{parse_xta, StartSymbol};
pub use pretty::PrettyPrinter;
pub use symbols::{FrameId, SymbolId, SymbolTable};
pub use system::SystemBuilder;
pub use token::{keyword, tag, Keyword, Syntax, Tag, Tok};
pub use types::{TypeId, TypeRegistry};
pub use xml::{parse_xml_buffer, parse_xml_file, PageBuffer};
