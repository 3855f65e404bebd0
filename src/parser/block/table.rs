//! `|===` tables.
//!
//! A row is either one line of `|`-separated cells or a run of lines each
//! opening a cell with a leading `|`, ended by a blank line. The `cols`
//! option selects how each column's cells are read.

use smallvec::smallvec;

use crate::asg::{Attributes, Code, Element, Options, Style, Table, Text};
use crate::error::ParseResult;
use crate::include::include_macro;
use crate::options::parse_options;
use crate::reader::LineCursor;

use super::delimited::include_directive;
use super::{parse_block_sequence, single_or_paragraph};
use crate::parser::Session;

/// How the cells of a column are read, from the letter in its `cols` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellFormat {
    /// `a`: nested document.
    Asciidoc,
    /// `e`
    Emphasis,
    /// `s`
    Strong,
    /// `l` or `m`: verbatim, includes expanded.
    Literal,
    /// `h`
    Header,
    Plain,
}

impl CellFormat {
    fn from_spec(spec: &str) -> Self {
        if spec.contains('a') {
            Self::Asciidoc
        } else if spec.contains('e') {
            Self::Emphasis
        } else if spec.contains('s') {
            Self::Strong
        } else if spec.contains('l') || spec.contains('m') {
            Self::Literal
        } else if spec.contains('h') {
            Self::Header
        } else {
            Self::Plain
        }
    }
}

/// Columns past this many read as plain cells.
const MAX_COLUMNS: usize = 1024;

/// Formats of the columns declared by `cols`; `3*a` repeats an entry.
fn column_formats(cols: Option<&String>) -> Vec<CellFormat> {
    let Some(cols) = cols else {
        return Vec::new();
    };
    let mut formats = Vec::new();
    for spec in cols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (count, spec) = match spec.split_once('*') {
            Some((count, rest)) => (count.trim().parse::<usize>().unwrap_or(1), rest),
            None => (1, spec),
        };
        let count = count.min(MAX_COLUMNS - formats.len());
        formats.extend(std::iter::repeat_n(CellFormat::from_spec(spec), count));
    }
    formats
}

/// Parse rows up to the closing `fence`.
pub(super) fn parse_table(
    session: Session<'_>,
    cursor: &mut LineCursor,
    fence: &str,
    options: Options,
    attributes: &Attributes,
) -> ParseResult<Element> {
    let formats = column_formats(options.get("cols"));
    let cell = |index: usize, content: Vec<String>| -> ParseResult<Element> {
        let format = formats.get(index).copied().unwrap_or(CellFormat::Plain);
        format_cell(session, format, content, attributes)
    };

    let mut rows = Vec::new();
    while let Some(line) = cursor.skip_comments_and_blank_lines() {
        let stripped = line.trim();
        if stripped == fence {
            break;
        }

        let mut cells = Vec::new();
        if stripped.get(2..).is_some_and(|rest| rest.contains('|')) {
            let body = stripped.strip_prefix('|').unwrap_or(stripped);
            let body = body.strip_suffix('|').unwrap_or(body);
            for (index, content) in body.split('|').enumerate() {
                cells.push(cell(index, vec![content.to_string()])?);
            }
        } else {
            let mut current = stripped.to_string();
            loop {
                let mut content = vec![current.strip_prefix('|').unwrap_or(&current).to_string()];
                while let Some(next) = cursor.next_line() {
                    if next.starts_with('|') || next.trim().is_empty() {
                        cursor.rewind();
                        break;
                    }
                    content.push(next.trim().to_string());
                }
                cells.push(cell(cells.len(), content)?);

                match cursor.next_line() {
                    Some(next) if !next.trim().is_empty() && !next.trim().starts_with("|===") => {
                        current = next.trim().to_string();
                    }
                    Some(next) => {
                        if next.trim().starts_with('|') {
                            cursor.rewind();
                        }
                        break;
                    }
                    None => break,
                }
            }
        }
        rows.push(cells);
    }
    tracing::trace!(rows = rows.len(), "parsed table");
    Ok(Element::Table(Table { rows, options }))
}

fn format_cell(
    session: Session<'_>,
    format: CellFormat,
    content: Vec<String>,
    attributes: &Attributes,
) -> ParseResult<Element> {
    let joined = |content: &[String]| content.join("\n").trim().to_string();
    Ok(match format {
        CellFormat::Asciidoc => {
            let mut scoped = attributes.clone();
            let elements = parse_block_sequence(
                session,
                &mut LineCursor::new(content),
                &|_| true,
                &mut scoped,
                true,
            )?;
            single_or_paragraph(elements)
        }
        CellFormat::Emphasis => Element::Text(Text::new(smallvec![Style::Emphasis], joined(&content), Options::new())),
        CellFormat::Strong => Element::Text(Text::new(smallvec![Style::Bold], joined(&content), Options::new())),
        CellFormat::Literal => {
            let mut lines = Vec::with_capacity(content.len());
            for line in &content {
                match include_directive(line) {
                    Some((target, raw_options)) => {
                        let target = session.substitute(target, attributes);
                        let include = include_macro(target.as_ref(), parse_options(raw_options));
                        lines.extend(session.include_lines(&include)?);
                    }
                    None => lines.push(line.clone()),
                }
            }
            Element::Code(Code {
                value: lines.join("\n"),
                callouts: Vec::new(),
                options: Options::new(),
                inline: true,
            })
        }
        CellFormat::Header => {
            let mut options = Options::new();
            options.insert("role".to_string(), "header".to_string());
            Element::Text(Text::new(Default::default(), joined(&content), options))
        }
        CellFormat::Plain => Element::text(joined(&content)),
    })
}
