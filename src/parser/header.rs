//! Document header: title, author, revision and the attribute block.

use crate::asg::{Attributes, Author, Header, Revision};
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::options::{apply_attribute_definition, parse_attribute_definition, read_attribute_definition};
use crate::preprocess::{Layered, parse_directive};
use crate::reader::{LineCursor, is_comment};

use super::{Session, read_if_block};

/// Parse the header, leaving the cursor on the first body line.
///
/// Without a `= Title` (or `# Title`) line the header is empty and the cursor
/// is reset to the start of the input.
pub(crate) fn parse_header(session: Session<'_>, cursor: &mut LineCursor) -> ParseResult<Header> {
    let Some(first) = cursor.skip_comments_and_blank_lines() else {
        cursor.reset();
        return Ok(Header::default());
    };
    let Some(title) = first
        .strip_prefix("= ")
        .or_else(|| first.strip_prefix("# "))
    else {
        cursor.reset();
        return Ok(Header::default());
    };

    let mut header = Header {
        title: title.trim().to_string(),
        ..Header::default()
    };
    if let Some(line) = next_header_line(cursor) {
        header.author = parse_author(&line);
        if let Some(line) = next_header_line(cursor) {
            header.revision = parse_revision(&line);
        }
    }
    header.attributes = read_attributes(session, cursor)?;
    Ok(header)
}

/// The next line when it can be an author or revision line.
///
/// A blank line is consumed; anything else that does not qualify is given back.
fn next_header_line(cursor: &mut LineCursor) -> Option<String> {
    let line = cursor.next_line()?;
    if line.trim().is_empty() {
        return None;
    }
    if is_comment(&line) || !can_be_header_line(&line) || parse_attribute_definition(&line).is_some() {
        cursor.rewind();
        return None;
    }
    Some(line)
}

/// Lines starting like a body construct are never author or revision lines.
fn can_be_header_line(line: &str) -> bool {
    const BODY_PREFIXES: [&str; 12] = [
        "* ", "=", "[", ".", "<<", "--", "``", "..", "++", "|==", "> ", "__",
    ];
    !BODY_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// `Full Name <mail>`; the mail part is optional.
fn parse_author(line: &str) -> Author {
    if let Some(open) = line.rfind('<').filter(|open| *open > 0) {
        if let Some(close) = line[open..].find('>') {
            return Author {
                name: line[..open].trim().to_string(),
                mail: line[open + 1..open + close].trim().to_string(),
            };
        }
    }
    Author {
        name: line.trim().to_string(),
        mail: String::new(),
    }
}

/// `number, date: remark`; every part after the number is optional.
fn parse_revision(line: &str) -> Revision {
    let (head, remark) = match line.split_once(':') {
        Some((head, remark)) => (head, remark.trim()),
        None => (line, ""),
    };
    let (number, date) = head.split_once(',').unwrap_or((head, ""));
    Revision {
        number: number.trim().to_string(),
        date: date.trim().to_string(),
        remark: remark.to_string(),
    }
}

/// Attribute lines up to the first blank line.
///
/// Once an attribute was read, conditional regions are evaluated immediately
/// against the header attributes then the global ones, and their lines are
/// spliced back into the cursor when the condition holds.
fn read_attributes(session: Session<'_>, cursor: &mut LineCursor) -> ParseResult<Attributes> {
    let mut attributes = Attributes::new();
    while let Some(line) = cursor.next_line() {
        if line.trim().is_empty() {
            break;
        }
        if let Some(definition) = read_attribute_definition(cursor, &line) {
            apply_attribute_definition(&mut attributes, definition);
            continue;
        }
        if attributes.is_empty() {
            cursor.rewind();
            break;
        }
        if is_comment(&line) {
            continue;
        }

        let directive = parse_directive(&line)
            .filter(|d| d.opens_block() || d.inline_content().is_some());
        let Some(directive) = directive else {
            return Err(ParseError::new(ErrorKind::MalformedAttributeLine { line }));
        };
        let block = match directive.inline_content() {
            Some(content) => vec![content.to_string()],
            None => read_if_block(cursor),
        };
        let Some(predicate) = directive.predicate(&attributes)? else {
            continue;
        };
        let holds = predicate.test(&Layered::new(&attributes, &session.options.attributes));
        if holds {
            tracing::debug!(condition = %line.trim(), lines = block.len(), "header conditional holds");
            cursor.insert(block);
        } else {
            tracing::warn!(condition = %line.trim(), "skipping header conditional");
        }
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserOptions;

    fn header_of(lines: &[&str]) -> (Header, LineCursor) {
        let options = ParserOptions::default();
        let mut cursor = LineCursor::new(lines.iter().map(ToString::to_string).collect());
        let header = parse_header(Session::new(&options, None), &mut cursor).unwrap();
        (header, cursor)
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn title_and_attributes() {
        let (header, mut cursor) = header_of(&[
            "= Title",
            ":attr-1: v1",
            ":attr-2: v2",
            "",
            "content",
        ]);
        assert_eq!(header.title, "Title");
        assert_eq!(header.attributes, attrs(&[("attr-1", "v1"), ("attr-2", "v2")]));
        assert_eq!(cursor.next_line().as_deref(), Some("content"));
    }

    #[test]
    fn author_and_revision() {
        let (header, _) = header_of(&[
            "= Title",
            "firstname lastname <mail@domain.com>",
            "1.0, 2020-01-01: First version",
            ":attr: v",
        ]);
        assert_eq!(
            header.author,
            Author {
                name: "firstname lastname".into(),
                mail: "mail@domain.com".into()
            }
        );
        assert_eq!(
            header.revision,
            Revision {
                number: "1.0".into(),
                date: "2020-01-01".into(),
                remark: "First version".into()
            }
        );
        assert_eq!(header.attributes, attrs(&[("attr", "v")]));
    }

    #[test]
    fn partial_revision_lines() {
        assert_eq!(
            parse_revision("2.1"),
            Revision {
                number: "2.1".into(),
                ..Revision::default()
            }
        );
        assert_eq!(
            parse_revision("2.1, 2024-05-01"),
            Revision {
                number: "2.1".into(),
                date: "2024-05-01".into(),
                remark: String::new()
            }
        );
        assert_eq!(parse_author("Jane").mail, "");
    }

    #[test]
    fn multiline_attribute() {
        let (header, _) = header_of(&["= Title", ":desc: first \\", "  second", ""]);
        assert_eq!(header.attributes, attrs(&[("desc", "first second")]));
    }

    #[test]
    fn conditional_attributes() {
        let (header, _) = header_of(&[
            "= Title",
            ":idprefix:",
            "ifndef::env-github[]",
            ":toc: left",
            ":icons: font",
            "endif::[]",
            "ifdef::env-github[]",
            ":toc: macro",
            "endif::[]",
            "",
        ]);
        assert_eq!(
            header.attributes,
            attrs(&[("idprefix", ""), ("toc", "left"), ("icons", "font")])
        );
    }

    #[test]
    fn conditionals_see_global_attributes() {
        let options = ParserOptions::default().with_attribute("env-github", "");
        let mut cursor = LineCursor::new(
            ["= T", ":a: 1", "ifdef::env-github[]", ":b: 2", "endif::[]"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        let header = parse_header(Session::new(&options, None), &mut cursor).unwrap();
        assert_eq!(header.attributes, attrs(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn unknown_line_after_attributes_fails() {
        let options = ParserOptions::default();
        let mut cursor = LineCursor::new(
            ["= T", ":a: 1", "oops"].iter().map(ToString::to_string).collect(),
        );
        let err = parse_header(Session::new(&options, None), &mut cursor).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedAttributeLine { ref line } if line == "oops"));
    }

    #[test]
    fn no_header_resets_cursor() {
        let (header, mut cursor) = header_of(&["// comment", "text"]);
        assert!(header.is_empty());
        assert_eq!(cursor.next_line().as_deref(), Some("// comment"));
    }

    #[test]
    fn body_line_after_title_is_not_an_author() {
        let (header, mut cursor) = header_of(&["= Title", "* item"]);
        assert_eq!(header.author, Author::default());
        assert_eq!(cursor.next_line().as_deref(), Some("* item"));
    }
}
