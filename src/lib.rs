#![doc = include_str!("../README.md")]
#![deny(missing_docs, unsafe_code)]

pub mod asg;
pub mod config;
pub mod error;
pub mod include;
pub mod options;
mod parser;
pub mod preprocess;
pub mod reader;
pub mod visitor;

use asg::{Body, Element, Header};

pub use asg::Document;
pub use config::ParserOptions;
pub use error::{ErrorKind, ParseError, ParseResult};
pub use include::{ContentResolver, FsResolver, MapResolver};
pub use reader::LineCursor;
pub use visitor::Visitor;

use parser::Session;

/// A configured parser.
///
/// The options are shared by every document parsed with it; each parse gets
/// its own cursor and attribute map.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    /// Create a parser with `options`.
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Options this parser was built with.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse a complete document.
    ///
    /// `resolver` supplies the content of `include::` targets; without one any
    /// include that is not `optional` fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`], carrying the line at which it was detected.
    pub fn parse(
        &self,
        text: &str,
        resolver: Option<&dyn ContentResolver>,
    ) -> ParseResult<Document> {
        let session = Session::new(&self.options, resolver);
        let mut cursor = LineCursor::from_text(text);
        let header = parser::parse_header(session, &mut cursor)
            .map_err(|error| error.at_line(last_line(&cursor)))?;
        let mut attributes = header.attributes.clone();
        let children = self.body(session, &mut cursor, &mut attributes)?;
        tracing::debug!(
            title = %header.title,
            elements = children.len(),
            "parsed document"
        );
        Ok(Document {
            header,
            body: Body { children },
        })
    }

    /// Parse only the header of `text`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed attribute block or an invalid header conditional.
    pub fn parse_header(&self, text: &str) -> ParseResult<Header> {
        let mut cursor = LineCursor::from_text(text);
        parser::parse_header(Session::new(&self.options, None), &mut cursor)
            .map_err(|error| error.at_line(last_line(&cursor)))
    }

    /// Parse `text` as a body, without looking for a header.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] met in the body.
    pub fn parse_body(
        &self,
        text: &str,
        resolver: Option<&dyn ContentResolver>,
    ) -> ParseResult<Body> {
        let session = Session::new(&self.options, resolver);
        let mut cursor = LineCursor::from_text(text);
        let children = self.body(session, &mut cursor, &mut asg::Attributes::new())?;
        Ok(Body { children })
    }

    fn body(
        &self,
        session: Session<'_>,
        cursor: &mut LineCursor,
        attributes: &mut asg::Attributes,
    ) -> ParseResult<Vec<Element>> {
        parser::parse_block_sequence(session, cursor, &|_| true, attributes, true)
            .map_err(|error| error.at_line(last_line(cursor)))
    }
}

/// Line most recently consumed by `cursor`, where a failing construct was being read.
fn last_line(cursor: &LineCursor) -> usize {
    cursor.line_number().saturating_sub(1).max(1)
}

/// Parse a document with default options and no include resolver.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse(text: &str) -> ParseResult<Document> {
    Parser::default().parse(text, None)
}

/// Parse a document with `options`, resolving includes through `resolver`.
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse_with(
    text: &str,
    options: &ParserOptions,
    resolver: Option<&dyn ContentResolver>,
) -> ParseResult<Document> {
    Parser::new(options.clone()).parse(text, resolver)
}

/// Parse only the header of `text` with default options.
///
/// # Errors
///
/// See [`Parser::parse_header`].
pub fn parse_header(text: &str) -> ParseResult<Header> {
    Parser::default().parse_header(text)
}

/// Parse `text` as a body with default options.
///
/// # Errors
///
/// See [`Parser::parse_body`].
pub fn parse_body(text: &str) -> ParseResult<Body> {
    Parser::default().parse_body(text, None)
}

/// Parse a short piece of markup without list, admonition or line break detection.
///
/// This is what an [`asg::Attribute`] node uses to turn a value into elements.
///
/// # Errors
///
/// Fails when the fragment contains an include or a malformed `ifeval`.
pub fn parse_fragment(text: &str) -> ParseResult<Vec<Element>> {
    parser::reparse_attribute_value(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::{Paragraph, Section, Style, Text};

    #[test]
    fn header_attributes_reach_the_body() {
        let document = parse("= Doc\n:product: adoctree\n\nUsing {product}.").unwrap();
        assert_eq!(document.header.title, "Doc");
        assert_eq!(document.body.children, vec![Element::text("Using adoctree.")]);
    }

    #[test]
    fn global_attributes_are_consulted_last() {
        let options = ParserOptions::default()
            .with_attribute("product", "global")
            .with_attribute("vendor", "acme");
        let document =
            parse_with("= Doc\n:product: local\n\n{product} by {vendor}", &options, None).unwrap();
        assert_eq!(document.body.children, vec![Element::text("local by acme")]);
    }

    #[test]
    fn body_without_header() {
        let body = parse_body("== Only\n\ntext").unwrap();
        assert!(matches!(&body.children[..], [Element::Section(Section { level: 2, .. })]));
    }

    #[test]
    fn fragment_has_no_complex_structures() {
        assert_eq!(
            parse_fragment("* _not_ a list").unwrap(),
            vec![Element::Paragraph(Paragraph::new(
                vec![
                    Element::text("* "),
                    Element::Text(Text::new(
                        [Style::Italic].into_iter().collect(),
                        "not",
                        asg::Options::new()
                    )),
                    Element::text(" a list"),
                ],
                asg::Options::new()
            ))]
        );
    }

    #[test]
    fn errors_carry_the_line() {
        let error = parse("intro\n\ninclude::missing.adoc[]").unwrap_err();
        assert!(matches!(error.kind, ErrorKind::MissingInclude { .. }));
        assert_eq!(error.line, 3);
    }
}
