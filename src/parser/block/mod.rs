//! Block dispatcher.
//!
//! [`parse_block_sequence`] classifies each significant line by its prefix and
//! hands it to the matching block parser. Option lines (`[...]`) and title
//! lines (`.Title`) accumulate into a pending [`Options`] map that decorates
//! the next block. Lines that start nothing structural are paragraphs, which
//! the inline scanner turns into text runs.

mod delimited;
mod lists;
mod sections;
mod table;

pub(super) use lists::{
    ListKind, is_inline_description_list, list_item, parse_description_list, parse_list,
};
pub(super) use sections::section_level;

use crate::asg::{AdmonitionLevel, Admonition, Attributes, Element, Options, PageBreak, Paragraph};
use crate::error::ParseResult;
use crate::options::{apply_attribute_definition, merge_missing, parse_options, read_attribute_definition};
use crate::reader::{LineCursor, is_comment};

use super::Session;
use super::inline::{flatten_texts, parse_inline};

/// Parse blocks until the input ends or `accept` rejects a line.
///
/// A rejected line is given back to the cursor, together with the option and
/// title lines read just before it, so that they decorate whatever the caller
/// parses next. Empty paragraphs are dropped from the result.
pub(crate) fn parse_block_sequence(
    session: Session<'_>,
    cursor: &mut LineCursor,
    accept: &dyn Fn(&str) -> bool,
    attributes: &mut Attributes,
    allow_complex: bool,
) -> ParseResult<Vec<Element>> {
    let mut elements = Vec::new();
    let mut options = Options::new();
    let mut pending_since: Option<usize> = None;

    while let Some(line) = cursor.skip_comments_and_blank_lines() {
        if !accept(&line) {
            let restart = pending_since.unwrap_or_else(|| cursor.line_number() - 1);
            while cursor.line_number() > restart {
                cursor.rewind();
            }
            break;
        }

        let substituted = session.substitute(&line, attributes).into_owned();
        if substituted != line {
            cursor.set_previous_line(substituted.as_str());
        }
        let line = substituted;
        let stripped = line.trim();

        if is_option_line(stripped) {
            tracing::trace!(line = cursor.line_number() - 1, "option line");
            pending_since.get_or_insert(cursor.line_number() - 1);
            let parsed = option_line(stripped);
            merge_missing(&mut options, &parsed);
            continue;
        }
        if is_title_line(&line) {
            tracing::trace!(line = cursor.line_number() - 1, "block title");
            pending_since.get_or_insert(cursor.line_number() - 1);
            options.insert("title".to_string(), line[1..].trim().to_string());
            continue;
        }

        // Pending options skip over attribute definitions.
        if let Some(definition) = read_attribute_definition(cursor, &line) {
            tracing::trace!(?definition, "attribute definition");
            apply_attribute_definition(attributes, definition);
            continue;
        }

        let decorations = std::mem::take(&mut options);
        pending_since = None;

        let element = if stripped == "...." {
            tracing::trace!("literal block");
            delimited::parse_listing(cursor, decorations)
        } else if let Some(level) = section_level(&line) {
            tracing::trace!(level, "section");
            sections::parse_section(session, cursor, &line, decorations, attributes)?
        } else if stripped == "----" || stripped.starts_with("```") {
            tracing::trace!("code block");
            delimited::parse_code(session, cursor, stripped, decorations, attributes)?
        } else if stripped == "--" {
            tracing::trace!("open block");
            delimited::parse_open_block(session, cursor, decorations, attributes)?
        } else if stripped.starts_with("|===") {
            tracing::trace!("table");
            table::parse_table(session, cursor, stripped, decorations, attributes)?
        } else if stripped == "++++" {
            tracing::trace!("passthrough block");
            delimited::parse_passthrough(cursor, decorations)
        } else if stripped == "<<<" {
            Element::PageBreak(PageBreak {
                options: decorations,
            })
        } else if stripped.starts_with("> ") {
            tracing::trace!("quoted lines");
            cursor.rewind();
            delimited::parse_quoted_lines(session, cursor, decorations, attributes)?
        } else if stripped.starts_with("____") {
            tracing::trace!("quote block");
            delimited::parse_quote_block(
                session,
                cursor,
                decorations,
                attributes,
                allow_complex,
            )?
        } else {
            cursor.rewind();
            let paragraph = parse_paragraph(session, cursor, decorations, attributes, allow_complex)?;
            paragraph.into_element()
        };

        if !element.is_empty_paragraph() {
            elements.push(element);
        }
    }
    Ok(elements)
}

/// Lines of text up to a blank line, through the inline scanner.
///
/// The first line is always consumed. Later lines stop the paragraph, and are
/// given back, when they start a section, an option line or a delimited block.
pub(crate) fn parse_paragraph(
    session: Session<'_>,
    cursor: &mut LineCursor,
    options: Options,
    attributes: &mut Attributes,
    allow_complex: bool,
) -> ParseResult<Paragraph> {
    let mut elements = Vec::new();
    let mut first = true;
    while let Some(line) = cursor.next_line() {
        if line.trim().is_empty() {
            break;
        }
        if !first && interrupts_paragraph(&line) {
            cursor.rewind();
            break;
        }
        first = false;
        if is_comment(&line) {
            continue;
        }
        let line = session.substitute(&line, attributes).into_owned();
        elements.extend(parse_inline(
            session,
            Some(&mut *cursor),
            &line,
            attributes,
            allow_complex,
        )?);
    }

    if options.is_empty() && elements.len() == 1 {
        if let Some(Element::Paragraph(inner)) = elements.first() {
            return Ok(inner.clone());
        }
    }
    Ok(Paragraph::new(flatten_texts(elements), options))
}

/// `LEVEL: text` plus the lines following it up to a blank line.
pub(crate) fn parse_admonition(
    session: Session<'_>,
    cursor: &mut LineCursor,
    level: AdmonitionLevel,
    first: &str,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let mut lines = vec![first.trim_start().to_string()];
    while let Some(line) = cursor.next_line() {
        if line.trim().is_empty() {
            cursor.rewind();
            break;
        }
        lines.push(line);
    }
    let content = parse_paragraph(
        session,
        &mut LineCursor::new(lines),
        Options::new(),
        attributes,
        true,
    )?;
    Ok(Element::Admonition(Admonition {
        level,
        content: Box::new(content.into_element()),
    }))
}

/// A lone element as is, several as an undecorated paragraph.
pub(crate) fn single_or_paragraph(mut elements: Vec<Element>) -> Element {
    if elements.len() == 1 {
        if let Some(element) = elements.pop() {
            return element;
        }
    }
    Element::Paragraph(Paragraph::new(elements, Options::new()))
}

/// `[...]` on its own line.
fn is_option_line(stripped: &str) -> bool {
    stripped.len() >= 2 && stripped.starts_with('[') && stripped.ends_with(']')
}

fn option_line(stripped: &str) -> Options {
    let mut options = Options::new();
    if stripped == "[abstract]" {
        options.insert("role".to_string(), "abstract".to_string());
        return options;
    }
    if let Some(id) = stripped
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
    {
        let (id, label) = id.split_once(',').unwrap_or((id, ""));
        options.insert("id".to_string(), id.trim().to_string());
        if !label.trim().is_empty() {
            options.insert("reftext".to_string(), label.trim().to_string());
        }
        return options;
    }
    parse_options(&stripped[1..stripped.len() - 1])
}

/// `.Title`, but neither `..` nor an ordered list item.
fn is_title_line(line: &str) -> bool {
    line.len() > 1 && line.starts_with('.') && !line.starts_with("..") && !line.starts_with(". ")
}

/// Lines that end a running paragraph.
fn interrupts_paragraph(line: &str) -> bool {
    let stripped = line.trim();
    section_level(line).is_some()
        || is_option_line(stripped)
        || matches!(stripped, "----" | "...." | "--" | "++++" | "____")
        || stripped.starts_with("```")
        || stripped.starts_with("|===")
}
