//! Inline scanner.
//!
//! A line is scanned byte by byte; every trigger is ASCII so slicing at a
//! trigger position always falls on a character boundary. Text between
//! triggers accumulates from `start` and is flushed as a [`Text`] node when a
//! construct is recognised. Markup that does not close degrades to text.
//!
//! With a cursor and `allow_complex`, a line opening a list, a description
//! list or an admonition is handed back to the block parsers, which read the
//! following lines themselves.

mod macros;
mod span;

use crate::asg::{AdmonitionLevel, Anchor, Attribute, Attributes, Element, Options, Style, Styles, Text};
use crate::error::ParseResult;
use crate::options::is_attribute_name;
use crate::reader::LineCursor;

use super::block::{
    ListKind, is_inline_description_list, list_item, parse_admonition, parse_description_list,
    parse_list,
};
use super::{Session, reparse_attribute_value};

/// Parse one logical line into inline elements.
///
/// `cursor` must be positioned right after `line` when it is given.
pub(crate) fn parse_inline(
    session: Session<'_>,
    mut cursor: Option<&mut LineCursor>,
    line: &str,
    attributes: &mut Attributes,
    allow_complex: bool,
) -> ParseResult<Vec<Element>> {
    if allow_complex {
        if let Some(cursor) = cursor.as_deref_mut() {
            if let Some(element) = complex_line(session, cursor, line, attributes)? {
                return Ok(vec![element]);
            }
        }
    }
    let mut scanner = Scanner {
        session,
        cursor,
        line,
        attributes,
        elements: Vec::new(),
        start: 0,
        allow_complex,
    };
    scanner.run()?;
    Ok(flatten_texts(scanner.elements))
}

/// Line-initial constructs that span several lines.
fn complex_line(
    session: Session<'_>,
    cursor: &mut LineCursor,
    line: &str,
    attributes: &mut Attributes,
) -> ParseResult<Option<Element>> {
    if let Some((level, rest)) = AdmonitionLevel::strip_prefix(line) {
        tracing::trace!(%level, "admonition");
        return parse_admonition(session, cursor, level, rest, attributes).map(Some);
    }
    for kind in [ListKind::Ordered, ListKind::Unordered] {
        if list_item(line, kind).is_some_and(|(depth, _)| depth == 1) {
            cursor.rewind();
            return parse_list(session, cursor, kind, 1, attributes).map(Some);
        }
    }
    if is_inline_description_list(line) {
        cursor.rewind();
        return parse_description_list(session, cursor, 1, attributes)
            .map(|list| Some(Element::DescriptionList(list)));
    }
    Ok(None)
}

struct Scanner<'s, 'l, 'a> {
    session: Session<'s>,
    cursor: Option<&'a mut LineCursor>,
    line: &'l str,
    attributes: &'a mut Attributes,
    elements: Vec<Element>,
    /// Start of the text not yet flushed.
    start: usize,
    allow_complex: bool,
}

impl Scanner<'_, '_, '_> {
    fn run(&mut self) -> ParseResult<()> {
        let bytes = self.line.as_bytes();
        let mut in_macro = false;
        let mut i = 0;
        while i < bytes.len() {
            if self.allow_complex && i + 2 == bytes.len() && self.line.ends_with(" +") {
                self.flush(i);
                self.elements.push(Element::LineBreak);
                self.start = bytes.len();
                return Ok(());
            }

            let c = bytes[i];
            // Macro targets and URLs are opaque up to their bracket.
            if in_macro && c != b'[' {
                in_macro = !c.is_ascii_whitespace();
                i += 1;
                continue;
            }
            i = match c {
                b':' => {
                    in_macro = i > 0
                        && bytes[i - 1] != b' '
                        && bytes.get(i + 1).is_some_and(|next| !next.is_ascii_whitespace());
                    i + 1
                }
                b'\\' => {
                    self.flush(i);
                    self.start = i + 1;
                    i + 2
                }
                b'{' => self.attribute(i)?,
                b'*' => self.span(i, b'*', Style::Bold)?,
                b'_' => self.span(i, b'_', Style::Italic)?,
                b'~' => self.span(i, b'~', Style::Sub)?,
                b'^' => self.span(i, b'^', Style::Sup)?,
                b'[' => {
                    in_macro = false;
                    self.bracket(i)?
                }
                b'#' => self.mark(i)?,
                b'`' => self.code(i)?,
                b'<' => self.anchor(i),
                _ => i + 1,
            };
        }
        self.flush(bytes.len());
        Ok(())
    }

    /// Emit the pending text up to `to`.
    fn flush(&mut self, to: usize) {
        if self.start < to {
            let value = &self.line[self.start..to];
            self.elements.push(new_text(Styles::new(), value, Options::new()));
        }
        self.start = self.start.max(to);
    }

    /// `{name}`: the value when known, a deferred reference otherwise.
    fn attribute(&mut self, i: usize) -> ParseResult<usize> {
        let line = self.line;
        let Some(len) = line[i + 1..].find('}') else {
            return Ok(i + 1);
        };
        let end = i + 1 + len;
        let name = &line[i + 1..end];
        if !is_attribute_name(name) {
            return Ok(i + 1);
        }
        self.flush(i);
        match self.session.lookup(self.attributes, name) {
            Some(value) => {
                let parsed = parse_inline(self.session, None, &value, self.attributes, false)?;
                self.elements.extend(parsed);
            }
            None => self
                .elements
                .push(Element::Attribute(Attribute::new(name, reparse_attribute_value))),
        }
        self.start = end + 1;
        Ok(end + 1)
    }

    /// `<<id>>` or `<<id,label>>`.
    fn anchor(&mut self, i: usize) -> usize {
        let line = self.line;
        if line.as_bytes().get(i + 1) != Some(&b'<') || line.len() <= i + 4 {
            return i + 1;
        }
        let Some(len) = line[i + 2..].find(">>") else {
            return i + 1;
        };
        let end = i + 2 + len;
        let reference = &line[i + 2..end];
        if reference.trim().is_empty() {
            return i + 1;
        }
        self.flush(i);
        let (id, label) = reference.split_once(',').unwrap_or((reference, ""));
        self.elements.push(Element::Anchor(Anchor {
            id: id.trim().to_string(),
            label: label.trim().to_string(),
        }));
        self.start = end + 2;
        end + 2
    }
}

/// Text node, lifting a legacy `[[id]]` anchor at either end of `value` into the options.
pub(crate) fn new_text(styles: Styles, value: &str, mut options: Options) -> Element {
    let mut text = value;
    let mut id = None;
    if let Some(rest) = value.strip_prefix("[[") {
        if let Some(end) = rest.find("]]") {
            id = Some(&rest[..end]);
            text = rest[end + 2..].trim();
        }
    } else if let Some(head) = value.strip_suffix("]]") {
        if let Some(open) = head.rfind("[[").filter(|open| *open > 0) {
            id = Some(&head[open + 2..]);
            text = head[..open].trim();
        }
    }
    if let Some(anchor) = id.filter(|id| !id.trim().is_empty()) {
        let (id, reftext) = anchor.split_once(',').unwrap_or((anchor, ""));
        if !options.contains_key("id") {
            options.insert("id".to_string(), id.trim().to_string());
            if !reftext.trim().is_empty() {
                options.insert("reftext".to_string(), reftext.trim().to_string());
            }
        }
        return Element::Text(Text::new(styles, text, options));
    }
    Element::Text(Text::new(styles, value, options))
}

/// Merge each run of adjacent plain text nodes into one.
///
/// Whitespace is trimmed at the joints and the pieces are joined by a single space.
pub(crate) fn flatten_texts(elements: Vec<Element>) -> Vec<Element> {
    if elements.len() <= 1 {
        return elements;
    }
    let mut out = Vec::with_capacity(elements.len());
    let mut run: Vec<String> = Vec::new();
    for element in elements {
        match element {
            Element::Text(text) if text.styles.is_empty() && text.options.is_empty() => {
                run.push(text.value);
            }
            other => {
                if !run.is_empty() {
                    out.push(merge_run(std::mem::take(&mut run)));
                }
                out.push(other);
            }
        }
    }
    if !run.is_empty() {
        out.push(merge_run(run));
    }
    out
}

fn merge_run(mut run: Vec<String>) -> Element {
    if run.len() == 1 {
        return Element::text(run.remove(0));
    }
    let last = run.len() - 1;
    let parts: Vec<&str> = run
        .iter()
        .enumerate()
        .map(|(index, value)| match index {
            0 => value.trim_end(),
            i if i == last => value.trim_start(),
            _ => value.trim(),
        })
        .collect();
    new_text(Styles::new(), &parts.join(" "), Options::new())
}
