//! Kiln Prototxt
//!
//! Reader and writer for the protobuf text format used by training-engine
//! configuration files (solver and network definitions):
//! - Parsing text into an ordered, editable [`Message`] tree
//! - Field lookup and in-place edits that leave other fields untouched
//! - Canonical re-serialization through [`std::fmt::Display`]
//!
//! Scalar tokens are stored verbatim, so fields that are not edited are
//! written back exactly as they were read. Comments attached to fields are
//! carried through a round trip.

pub mod document;
pub mod error;
mod lexer;
mod parser;

pub use document::{Field, Message, Scalar, ScalarKind, Value};
pub use error::{ParseError, ParseResult};

/// Parse a text-format document.
pub fn parse(input: &str) -> ParseResult<Message> {
    parser::Parser::new(lexer::tokenize(input)?).parse_document()
}
