//! List parsing (unordered, ordered and description lists with nesting support).
//!
//! The marker length gives the nesting depth: `*`, `**`, `***` for unordered
//! items, `.`, `..` for ordered ones and `::`, `:::` for description entries.
//! A deeper marker opens a nested list that is folded into the last item.

use crate::asg::{Attributes, DescriptionList, Element, List, Options, Paragraph};
use crate::error::ParseResult;
use crate::reader::LineCursor;

use super::{parse_block_sequence, parse_paragraph, single_or_paragraph};
use crate::parser::Session;

/// Kind of marker a list is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    /// `* item`
    Unordered,
    /// `. item` or `1. item`
    Ordered,
}

impl ListKind {
    fn marker(self) -> u8 {
        match self {
            Self::Unordered => b'*',
            Self::Ordered => b'.',
        }
    }

    fn wrap(self, list: List) -> Element {
        match self {
            Self::Unordered => Element::UnorderedList(list),
            Self::Ordered => Element::OrderedList(list),
        }
    }
}

/// Marker depth and content of a list item line.
///
/// Ordered markers may be prefixed with digits (`1. item`).
pub(crate) fn list_item(line: &str, kind: ListKind) -> Option<(usize, &str)> {
    let line = line.trim_start();
    let body = match kind {
        ListKind::Ordered => line.trim_start_matches(|c: char| c.is_ascii_digit()),
        ListKind::Unordered => line,
    };
    let depth = body.bytes().take_while(|b| *b == kind.marker()).count();
    if depth == 0 {
        return None;
    }
    let content = body[depth..].strip_prefix(' ')?;
    if content.trim().is_empty() {
        return None;
    }
    Some((depth, content))
}

/// Parse a list at `depth`, starting on the cursor's current line.
///
/// Blank lines between two items of the same kind are skipped. Any other
/// line that is not an item ends the list and is given back.
pub(crate) fn parse_list(
    session: Session<'_>,
    cursor: &mut LineCursor,
    kind: ListKind,
    depth: usize,
    attributes: &mut Attributes,
) -> ParseResult<Element> {
    let mut items: Vec<Element> = Vec::new();
    while let Some(line) = cursor.next_line() {
        if line.trim().is_empty() {
            cursor.rewind();
            if skip_blank_lines_before(cursor, |next| list_item(next, kind).is_some()) {
                continue;
            }
            break;
        }
        let Some((level, content)) = list_item(&line, kind) else {
            cursor.rewind();
            break;
        };
        if level < depth {
            cursor.rewind();
            break;
        }
        if level > depth {
            cursor.rewind();
            let nested = parse_list(session, cursor, kind, depth + 1, attributes)?;
            if !matches!(&nested, Element::UnorderedList(l) | Element::OrderedList(l) if l.items.is_empty()) {
                collapse_into_last(&mut items, nested);
            }
            continue;
        }

        let mut buffer = vec![content.to_string()];
        while let Some(next) = cursor.next_line() {
            if next.trim().is_empty() || list_item(&next, kind).is_some() {
                cursor.rewind();
                break;
            }
            if next.trim() == "+" {
                buffer.push(String::new());
            } else {
                buffer.push(next);
            }
        }
        let elements = parse_block_sequence(
            session,
            &mut LineCursor::new(buffer),
            &|_| true,
            attributes,
            true,
        )?;
        items.push(single_or_paragraph(elements));
    }
    tracing::trace!(?kind, depth, items = items.len(), "parsed list");
    Ok(kind.wrap(List {
        items,
        options: Options::new(),
    }))
}

/// Term, colon count and remainder of a description list line (`term:: text`).
pub(crate) fn description_marker(line: &str) -> Option<(&str, usize, &str)> {
    let colon = line.find(':')?;
    if colon == 0 {
        return None;
    }
    let level = line[colon..].bytes().take_while(|b| *b == b':').count();
    if level < 2 {
        return None;
    }
    Some((&line[..colon], level, &line[colon + level..]))
}

/// A description entry line: the marker ends the line or is followed by a space,
/// which tells it apart from a block macro (`image::logo.png[]`).
fn description_entry(line: &str) -> Option<(&str, usize, &str)> {
    description_marker(line).filter(|(_, _, rest)| rest.is_empty() || rest.starts_with([' ', '\t']))
}

/// Whether a paragraph line opens a top-level description list.
pub(crate) fn is_inline_description_list(line: &str) -> bool {
    description_entry(line).is_some_and(|(_, level, _)| level == 2)
}

/// Parse description entries at `depth` (`depth + 1` colons), starting on the current line.
pub(crate) fn parse_description_list(
    session: Session<'_>,
    cursor: &mut LineCursor,
    depth: usize,
    attributes: &mut Attributes,
) -> ParseResult<DescriptionList> {
    let mut entries: Vec<(Element, Element)> = Vec::new();
    while let Some(line) = cursor.next_line() {
        if line.trim().is_empty() {
            cursor.rewind();
            if skip_blank_lines_before(cursor, |next| description_entry(next).is_some()) {
                continue;
            }
            break;
        }
        let Some((term, level, rest)) = description_entry(&line) else {
            cursor.rewind();
            break;
        };
        let level = level - 1;
        if level < depth {
            cursor.rewind();
            break;
        }
        if level > depth {
            cursor.rewind();
            let nested = parse_description_list(session, cursor, depth + 1, attributes)?;
            if nested.entries.is_empty() {
                continue;
            }
            match entries.last_mut() {
                Some((_, value)) => {
                    let current = std::mem::replace(value, Element::Paragraph(Paragraph::default()));
                    *value = fold(current, Element::DescriptionList(nested));
                }
                None => entries.extend(nested.entries),
            }
            continue;
        }

        let mut buffer = Vec::new();
        if !rest.trim().is_empty() {
            buffer.push(rest.trim().to_string());
        }
        while let Some(next) = cursor.next_line() {
            if next.trim().is_empty() || description_entry(&next).is_some() {
                cursor.rewind();
                break;
            }
            buffer.push(next);
        }

        let key = parse_block_sequence(
            session,
            &mut LineCursor::new(vec![term.trim().to_string()]),
            &|_| true,
            attributes,
            false,
        )?;
        let key = match key.len() {
            1 => single_or_paragraph(key),
            _ => Element::Paragraph(Paragraph::nowrap(key)),
        };
        let value = parse_paragraph(
            session,
            &mut LineCursor::new(buffer),
            Options::new(),
            attributes,
            true,
        )?
        .into_element();
        entries.push((key, value));
    }
    Ok(DescriptionList {
        entries,
        options: Options::new(),
    })
}

/// Consume blank lines when the line after them satisfies `continues`.
///
/// Otherwise the cursor is left where it was.
fn skip_blank_lines_before(cursor: &mut LineCursor, continues: impl Fn(&str) -> bool) -> bool {
    let mut skipped = 0;
    while cursor.peek().is_some_and(|line| line.trim().is_empty()) {
        cursor.next_line();
        skipped += 1;
    }
    if cursor.peek().is_some_and(continues) {
        return true;
    }
    for _ in 0..skipped {
        cursor.rewind();
    }
    false
}

/// Append a nested list to the last collected item.
fn collapse_into_last(items: &mut Vec<Element>, nested: Element) {
    match items.pop() {
        Some(last) => items.push(fold(last, nested)),
        None => items.push(nested),
    }
}

/// Turn `item` into a grouping of itself and `nested`.
///
/// A paragraph gains one more child; a text item becomes a paragraph of the
/// text and the nested list, sharing the text's options.
fn fold(item: Element, nested: Element) -> Element {
    match item {
        Element::Paragraph(mut paragraph) => {
            paragraph.children.push(nested);
            Element::Paragraph(paragraph)
        }
        Element::Text(text) => {
            let options = text.options.clone();
            Element::Paragraph(Paragraph::new(vec![Element::Text(text), nested], options))
        }
        other => Element::Paragraph(Paragraph::new(vec![other, nested], Options::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::{Style, Text};
    use crate::config::ParserOptions;
    use smallvec::smallvec;

    fn list_of(text: &str, kind: ListKind) -> Element {
        let options = ParserOptions::default();
        let mut attributes = Attributes::new();
        parse_list(
            Session::new(&options, None),
            &mut LineCursor::from_text(text),
            kind,
            1,
            &mut attributes,
        )
        .unwrap()
    }

    fn unordered(items: Vec<Element>) -> Element {
        Element::UnorderedList(List {
            items,
            options: Options::new(),
        })
    }

    fn ordered(items: Vec<Element>) -> Element {
        Element::OrderedList(List {
            items,
            options: Options::new(),
        })
    }

    #[test]
    fn item_markers() {
        assert_eq!(list_item("* a", ListKind::Unordered), Some((1, "a")));
        assert_eq!(list_item("*** deep", ListKind::Unordered), Some((3, "deep")));
        assert_eq!(list_item(". a", ListKind::Ordered), Some((1, "a")));
        assert_eq!(list_item("12.. b", ListKind::Ordered), Some((2, "b")));
        assert_eq!(list_item("*bold*", ListKind::Unordered), None);
        assert_eq!(list_item("* ", ListKind::Unordered), None);
    }

    #[test]
    fn flat_list() {
        assert_eq!(
            list_of("* item 1\n* item 2", ListKind::Unordered),
            unordered(vec![Element::text("item 1"), Element::text("item 2")])
        );
    }

    #[test]
    fn nested_items_fold_into_paragraphs() {
        assert_eq!(
            list_of("* item 1\n** item 1.1\n** item 1.2\n* item 2", ListKind::Unordered),
            unordered(vec![
                Element::Paragraph(Paragraph::new(
                    vec![
                        Element::text("item 1"),
                        unordered(vec![Element::text("item 1.1"), Element::text("item 1.2")]),
                    ],
                    Options::new()
                )),
                Element::text("item 2"),
            ])
        );
    }

    #[test]
    fn three_levels() {
        let parsed = list_of("* a\n** b\n*** c", ListKind::Unordered);
        assert_eq!(
            parsed,
            unordered(vec![Element::Paragraph(Paragraph::new(
                vec![
                    Element::text("a"),
                    unordered(vec![Element::Paragraph(Paragraph::new(
                        vec![Element::text("b"), unordered(vec![Element::text("c")])],
                        Options::new()
                    ))]),
                ],
                Options::new()
            ))])
        );
    }

    #[test]
    fn continuation_and_trailing_lines() {
        let parsed = list_of("* first\nsame item\n* second\n+\nattached", ListKind::Unordered);
        assert_eq!(
            parsed,
            unordered(vec![
                Element::text("first same item"),
                Element::Paragraph(Paragraph::new(
                    vec![Element::text("second"), Element::text("attached")],
                    Options::new()
                )),
            ])
        );
    }

    #[test]
    fn blank_lines_between_items() {
        assert_eq!(
            list_of(". one\n\n. two\n\nafter", ListKind::Ordered),
            ordered(vec![Element::text("one"), Element::text("two")])
        );
    }

    #[test]
    fn list_stops_before_other_content() {
        let options = ParserOptions::default();
        let mut attributes = Attributes::new();
        let mut cursor = LineCursor::from_text("* a\n\nParagraph");
        parse_list(
            Session::new(&options, None),
            &mut cursor,
            ListKind::Unordered,
            1,
            &mut attributes,
        )
        .unwrap();
        assert_eq!(cursor.next_line().as_deref(), Some(""));
        assert_eq!(cursor.next_line().as_deref(), Some("Paragraph"));
    }

    #[test]
    fn styled_item() {
        assert_eq!(
            list_of("* *strong* item", ListKind::Unordered),
            unordered(vec![Element::Paragraph(Paragraph::new(
                vec![
                    Element::Text(Text::new(smallvec![Style::Bold], "strong", Options::new())),
                    Element::text(" item"),
                ],
                Options::new()
            ))])
        );
    }

    #[test]
    fn description_markers() {
        assert_eq!(description_marker("CPU:: brain"), Some(("CPU", 2, " brain")));
        assert_eq!(description_marker("Sub:::"), Some(("Sub", 3, "")));
        assert_eq!(description_marker("https://x"), None);
        assert!(is_inline_description_list("CPU:: brain"));
        assert!(is_inline_description_list("CPU::"));
        assert!(!is_inline_description_list("image::logo.png[]"));
    }

    #[test]
    fn description_list_entries() {
        let options = ParserOptions::default();
        let mut attributes = Attributes::new();
        let list = parse_description_list(
            Session::new(&options, None),
            &mut LineCursor::from_text("CPU:: The brain\nof the computer.\nRAM::\nTemporary memory."),
            1,
            &mut attributes,
        )
        .unwrap();
        assert_eq!(
            list.entries,
            vec![
                (Element::text("CPU"), Element::text("The brain of the computer.")),
                (Element::text("RAM"), Element::text("Temporary memory.")),
            ]
        );
    }

    #[test]
    fn nested_description_list() {
        let options = ParserOptions::default();
        let mut attributes = Attributes::new();
        let list = parse_description_list(
            Session::new(&options, None),
            &mut LineCursor::from_text("Dairy:: milk\nCheese::: aged"),
            1,
            &mut attributes,
        )
        .unwrap();
        assert_eq!(list.entries.len(), 1);
        let Element::Paragraph(value) = &list.entries[0].1 else {
            panic!("expected folded value, got {:?}", list.entries[0].1);
        };
        assert_eq!(value.children[0], Element::text("milk"));
        assert!(matches!(&value.children[1], Element::DescriptionList(d) if d.entries.len() == 1));
    }

    #[test]
    fn list_inside_description() {
        let options = ParserOptions::default();
        let mut attributes = Attributes::new();
        let list = parse_description_list(
            Session::new(&options, None),
            &mut LineCursor::from_text("Dairy::\n* Milk\n* Eggs"),
            1,
            &mut attributes,
        )
        .unwrap();
        assert_eq!(
            list.entries,
            vec![(
                Element::text("Dairy"),
                unordered(vec![Element::text("Milk"), Element::text("Eggs")])
            )]
        );
    }
}
