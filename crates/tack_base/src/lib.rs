//! Structural atoms shared by the tack parsing crates.
//!
//! This crate holds the small value types that every layer of the pipeline
//! agrees on but none owns: source positions, error values, and the
//! diagnostics surface the drivers report through. It deliberately knows
//! nothing about timed automata; see `tack-syntax` for the actual pipeline.

pub mod error;
pub mod position;
pub mod report;

pub use error::{ErrorKind, ParseError, Result};
pub use position::Position;
pub use report::{Diagnostic, ErrorHandler, ErrorLog, Severity};
