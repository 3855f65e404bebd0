//! Delimited blocks: code, literal, passthrough, open and quote blocks.
//!
//! Every parser here is entered right after the opening fence and consumes
//! the closing one. A missing closing fence runs the block to the end of the
//! input.

use crate::asg::{
    Attributes, CallOut, Code, Element, Listing, OpenBlock, Options, PassthroughBlock, Quote,
};
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::include::include_macro;
use crate::options::parse_options;
use crate::reader::LineCursor;

use super::{parse_block_sequence, single_or_paragraph};
use crate::parser::Session;

/// Lines up to the closing `fence`, which is consumed.
fn read_until_fence(cursor: &mut LineCursor, fence: &str) -> Vec<String> {
    let start = cursor.line_number();
    let mut lines = Vec::new();
    while let Some(line) = cursor.next_line() {
        if line.trim_end() == fence {
            return lines;
        }
        lines.push(line);
    }
    tracing::warn!(start, fence, "unterminated delimited block, reading to end of input");
    lines
}

/// `....` literal block.
pub(super) fn parse_listing(cursor: &mut LineCursor, options: Options) -> Element {
    Element::Listing(Listing {
        value: read_until_fence(cursor, "....").join("\n"),
        options,
    })
}

/// `++++` raw block.
pub(super) fn parse_passthrough(cursor: &mut LineCursor, options: Options) -> Element {
    Element::PassthroughBlock(PassthroughBlock {
        value: read_until_fence(cursor, "++++").join("\n"),
        options,
    })
}

/// `--` open block, parsed as nested blocks.
pub(super) fn parse_open_block(
    session: Session<'_>,
    cursor: &mut LineCursor,
    options: Options,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let lines = read_until_fence(cursor, "--");
    let children = parse_block_sequence(session, &mut LineCursor::new(lines), &|_| true, attributes, true)?;
    Ok(Element::OpenBlock(OpenBlock { children, options }))
}

/// `____` quote block.
pub(super) fn parse_quote_block(
    session: Session<'_>,
    cursor: &mut LineCursor,
    options: Options,
    attributes: &mut Attributes,
    allow_complex: bool,
) -> ParseResult<Element> {
    let lines = read_until_fence(cursor, "____");
    let children = parse_block_sequence(
        session,
        &mut LineCursor::new(lines),
        &|_| true,
        attributes,
        allow_complex,
    )?;
    Ok(Element::Quote(Quote { children, options }))
}

/// Consecutive `>` lines, Markdown style. Quotes nest (`> > text`).
pub(super) fn parse_quoted_lines(
    session: Session<'_>,
    cursor: &mut LineCursor,
    options: Options,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let mut lines = Vec::new();
    while let Some(line) = cursor.next_line() {
        let Some(content) = line.trim_start().strip_prefix('>') else {
            cursor.rewind();
            break;
        };
        lines.push(content.trim_start().to_string());
    }
    let children = parse_block_sequence(session, &mut LineCursor::new(lines), &|_| true, attributes, true)?;
    Ok(Element::Quote(Quote { children, options }))
}

/// `----` or Markdown style code block, with its callout descriptions.
///
/// `fence` is the trimmed opening line; a Markdown fence may name the language
/// (```` ```rust ````). `include::` lines are replaced by the included text.
pub(super) fn parse_code(
    session: Session<'_>,
    cursor: &mut LineCursor,
    fence: &str,
    mut options: Options,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let closing = match fence.strip_prefix("```") {
        Some(language) => {
            let language = language.trim();
            if !language.is_empty() {
                options
                    .entry("language".to_string())
                    .or_insert_with(|| language.to_string());
            }
            "```"
        }
        None => fence,
    };

    let raw = read_until_fence(cursor, closing);
    let lines = expand_includes(session, raw, attributes)?;
    let (value, references) = extract_callouts(&lines);
    let callouts = if references.is_empty() {
        Vec::new()
    } else {
        read_callouts(session, cursor, attributes, &references)?
    };
    Ok(Element::Code(Code {
        value,
        callouts,
        options,
        inline: false,
    }))
}

/// Replace each `include::target[options]` line by the lines it resolves to.
fn expand_includes(
    session: Session<'_>,
    lines: Vec<String>,
    attributes: &Attributes,
) -> ParseResult<Vec<String>> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        match include_directive(&line) {
            Some((target, raw_options)) => {
                let target = session.substitute(target, attributes);
                let include = include_macro(target.as_ref(), parse_options(raw_options));
                out.extend(session.include_lines(&include)?);
            }
            None => out.push(line),
        }
    }
    Ok(out)
}

/// Target and bracket content of an `include::target[...]` line.
pub(crate) fn include_directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix("include::")?;
    let rest = rest.strip_suffix(']')?;
    let open = rest.find('[')?;
    Some((&rest[..open], &rest[open + 1..]))
}

/// Rewrite `<N>` markers to `(N)`; returns the code and the referenced numbers
/// in order of first appearance.
fn extract_callouts(lines: &[String]) -> (String, Vec<u32>) {
    let mut references = Vec::new();
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let mut rewritten = String::with_capacity(line.len());
        let mut rest = line.as_str();
        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let number = (digits > 0 && after.as_bytes().get(digits) == Some(&b'>'))
                .then(|| after[..digits].parse::<u32>().ok())
                .flatten();
            match number {
                Some(number) => {
                    rewritten.push_str(&rest[..open]);
                    rewritten.push_str(&format!("({number})"));
                    if !references.contains(&number) {
                        references.push(number);
                    }
                    rest = &after[digits + 1..];
                }
                None => {
                    rewritten.push_str(&rest[..=open]);
                    rest = after;
                }
            }
        }
        rewritten.push_str(rest);
        out.push(rewritten);
    }
    (out.join("\n").trim_end().to_string(), references)
}

/// Number and text of a `<N> text` (or `<.> text`) description line.
fn callout_description(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('<')?;
    let close = rest.find('>')?;
    let number = &rest[..close];
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let text = rest[close + 1..].strip_prefix(' ')?;
    (!text.trim().is_empty()).then_some((number, text))
}

/// Descriptions following a code block; they must match `references` one to one.
fn read_callouts(
    session: Session<'_>,
    cursor: &mut LineCursor,
    attributes: &mut Attributes,
    references: &[u32],
) -> ParseResult<Vec<CallOut>> {
    let mut callouts = Vec::with_capacity(references.len());
    while let Some(line) = cursor.skip_comments_and_blank_lines() {
        let Some((number, text)) = callout_description(&line) else {
            cursor.rewind();
            break;
        };
        let number = if number == "." {
            u32::try_from(callouts.len() + 1).unwrap_or(u32::MAX)
        } else {
            number.parse::<u32>().map_err(|_| {
                ParseError::new(ErrorKind::InvalidCallout {
                    reason: format!("invalid callout number in '{line}'"),
                })
            })?
        };

        let mut lines = vec![text.to_string()];
        while let Some(next) = cursor.next_line() {
            if next.trim().is_empty() {
                break;
            }
            if next.starts_with('<') {
                cursor.rewind();
                break;
            }
            lines.push(next);
        }
        let elements = parse_block_sequence(session, &mut LineCursor::new(lines), &|_| true, attributes, true)?;
        callouts.push(CallOut {
            number,
            text: single_or_paragraph(elements),
        });
    }

    let described: Vec<u32> = callouts.iter().map(|c| c.number).collect();
    if described != references {
        return Err(ParseError::new(ErrorKind::InvalidCallout {
            reason: format!("code references {references:?} but descriptions cover {described:?}"),
        }));
    }
    Ok(callouts)
}
