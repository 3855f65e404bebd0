//! Section parsing.

use crate::asg::{Attributes, Element, Options, Paragraph, Section};
use crate::error::ParseResult;
use crate::reader::LineCursor;

use super::parse_block_sequence;
use crate::parser::Session;
use crate::parser::inline::parse_inline;

/// Number of leading `=` when the line is a section header (`== Title`).
pub(crate) fn section_level(line: &str) -> Option<usize> {
    let level = line.bytes().take_while(|b| *b == b'=').count();
    if level == 0 {
        return None;
    }
    match line.as_bytes().get(level) {
        Some(b' ' | b'\t') => Some(level),
        _ => None,
    }
}

/// Parse the section opened by `header` and its body.
///
/// The body runs until a section header of the same or a lower level. The
/// `leveloffset` attribute shifts the level and `sectnumlevels` records it.
pub(super) fn parse_section(
    session: Session<'_>,
    cursor: &mut LineCursor,
    header: &str,
    options: Options,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let raw_level = section_level(header).unwrap_or(0);
    let offset = attributes
        .get("leveloffset")
        .and_then(|offset| offset.trim().trim_start_matches('+').parse::<isize>().ok())
        .unwrap_or(0);
    let level = raw_level.saturating_add_signed(offset);
    attributes.insert("sectnumlevels".to_string(), level.to_string());

    let title_text = header[raw_level..].trim();
    let mut title = parse_inline(session, None, title_text, attributes, false)?;
    let title = if title.len() == 1 {
        title.remove(0)
    } else {
        Element::Paragraph(Paragraph::nowrap(title))
    };

    let children = parse_block_sequence(
        session,
        cursor,
        &|line| section_level(line).is_none_or(|nested| nested > raw_level),
        attributes,
        true,
    )?;
    tracing::debug!(level, title = title_text, children = children.len(), "parsed section");
    Ok(Element::Section(Section {
        level,
        title: Box::new(title),
        children,
        options,
    }))
}
