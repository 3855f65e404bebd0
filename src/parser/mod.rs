//! Line-driven parser.
//!
//! The **block dispatcher** pulls lines from a [`LineCursor`] and classifies
//! them by prefix. Runs of text go to the **inline scanner**, which scans a
//! line character by character and may hand the cursor back to the block
//! parsers when a line starts a list, a description list or an admonition.
//! Nested constructs (delimited blocks, list items, table cells, includes,
//! conditional regions) are parsed by buffering their lines into a fresh
//! cursor and recursing.

mod block;
mod header;
mod inline;

use std::borrow::Cow;

pub(crate) use block::parse_block_sequence;
pub(crate) use header::parse_header;

use crate::asg::{Attributes, Element, Macro};
use crate::config::ParserOptions;
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::include::{self, ContentResolver};
use crate::options::substitute_attributes;
use crate::preprocess::parse_directive;
use crate::reader::LineCursor;

/// State shared by every nested parse of one document.
#[derive(Clone, Copy)]
pub(crate) struct Session<'a> {
    pub(crate) options: &'a ParserOptions,
    pub(crate) resolver: Option<&'a dyn ContentResolver>,
    pub(crate) include_depth: usize,
}

impl<'a> Session<'a> {
    pub(crate) fn new(options: &'a ParserOptions, resolver: Option<&'a dyn ContentResolver>) -> Self {
        Self {
            options,
            resolver,
            include_depth: 0,
        }
    }

    /// Document attributes first, then global ones.
    pub(crate) fn lookup(&self, attributes: &Attributes, name: &str) -> Option<String> {
        attributes
            .get(name)
            .or_else(|| self.options.attributes.get(name))
            .cloned()
    }

    /// Replace the `{name}` references whose value is already known.
    pub(crate) fn substitute<'l>(&self, line: &'l str, attributes: &Attributes) -> Cow<'l, str> {
        substitute_attributes(line, |name| self.lookup(attributes, name))
    }

    /// Resolve an include and return its transformed lines.
    pub(crate) fn include_lines(&self, include: &Macro) -> ParseResult<Vec<String>> {
        let limit = self.options.max_include_depth;
        if self.include_depth >= limit {
            return Err(ParseError::new(ErrorKind::IncludeDepthExceeded {
                target: include.label.clone(),
                depth: limit,
            }));
        }
        include::expand(
            include,
            self.resolver,
            self.options.default_encoding.as_deref(),
        )
    }

    /// Resolve an include in block position and parse it, sharing `attributes`.
    pub(crate) fn include_blocks(
        &self,
        include: &Macro,
        attributes: &mut Attributes,
    ) -> ParseResult<Vec<Element>> {
        let lines = self.include_lines(include)?;
        let nested = Self {
            include_depth: self.include_depth + 1,
            ..*self
        };
        parse_block_sequence(
            nested,
            &mut LineCursor::new(lines),
            &|_| true,
            attributes,
            true,
        )
    }
}

/// Parse the value of an `{name}` reference once a renderer knows it.
///
/// Runs without document attributes and without a resolver.
pub(crate) fn reparse_attribute_value(value: &str) -> ParseResult<Vec<Element>> {
    let options = ParserOptions::default();
    let session = Session::new(&options, None);
    let mut attributes = Attributes::new();
    parse_block_sequence(
        session,
        &mut LineCursor::from_text(value),
        &|_| true,
        &mut attributes,
        false,
    )
}

/// Consume lines up to the `endif` closing the region that was just opened.
///
/// Nested conditional regions are kept in the returned lines with their own `endif`.
pub(crate) fn read_if_block(cursor: &mut LineCursor) -> Vec<String> {
    let start = cursor.line_number();
    let mut buffer = Vec::new();
    let mut depth = 1usize;
    while let Some(line) = cursor.next_line() {
        match parse_directive(&line) {
            Some(directive) if directive.opens_block() => depth += 1,
            Some(crate::preprocess::Directive::Endif { .. }) => {
                depth -= 1;
                if depth == 0 {
                    tracing::debug!(start, lines = buffer.len(), "captured conditional block");
                    return buffer;
                }
            }
            _ => {}
        }
        buffer.push(line);
    }
    tracing::warn!(start, "conditional block without endif, reading to end of input");
    buffer
}
