//! Bracketed constructs: URLs with labels, `name:target[...]` macros and the
//! inline forms of `include::` and the conditional directives.

use crate::asg::{ConditionalBlock, Element, Link, Macro, Options};
use crate::error::ParseResult;
use crate::include::include_macro;
use crate::options::parse_options;
use crate::preprocess::{Directive, parse_directive};
use crate::reader::LineCursor;

use super::Scanner;
use crate::parser::{parse_block_sequence, read_if_block};

const URL_SCHEMES: [&str; 7] = [
    "http://", "https://", "ftp://", "ftps://", "irc://", "file://", "mailto:",
];

/// Whether `target` is a URL that becomes a [`Link`].
pub(crate) fn is_link(target: &str) -> bool {
    URL_SCHEMES.iter().any(|scheme| target.starts_with(scheme))
}

/// Index of the `]` closing the `[` at `open`, skipping nested and escaped brackets.
fn closing_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

fn is_macro_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn word_start(line: &str, from: usize, to: usize) -> usize {
    line[..to]
        .rfind(|c: char| c.is_ascii_whitespace())
        .map_or(0, |space| space + 1)
        .max(from)
}

/// Start of the link or macro token ending at the `[` at `open`.
///
/// Usually the word before the bracket. A macro target may hold spaces
/// (`icon:fas fa-cog[]`), so when that word has no colon the token extends
/// back to the `name:` word before it.
fn token_start(line: &str, from: usize, open: usize) -> usize {
    let word = word_start(line, from, open);
    if word == open || line[word..open].contains(':') {
        return word;
    }
    let Some(colon) = line[from..word].rfind(':').map(|colon| colon + from) else {
        return word;
    };
    let name = word_start(line, from, colon);
    let spans_macro = is_macro_name(&line[name..colon])
        && !is_link(&line[name..open])
        && line
            .as_bytes()
            .get(colon + 1)
            .is_some_and(|next| !next.is_ascii_whitespace())
        && !line[colon..open].contains(['[', ']']);
    if spans_macro { name } else { word }
}

impl Scanner<'_, '_, '_> {
    /// `[` at `i`: the end of a link or macro token, or a role list before a mark.
    pub(super) fn bracket(&mut self, i: usize) -> ParseResult<usize> {
        let line = self.line;
        let bytes = line.as_bytes();
        let Some(end) = closing_bracket(bytes, i) else {
            return Ok(i + 1);
        };
        if bytes.get(end + 1) == Some(&b'#') {
            return Ok(end + 1);
        }

        let token_start = token_start(line, self.start, i);
        let prefix = &line[token_start..i];
        let inner = &line[i + 1..end];

        if is_link(prefix) {
            let mut options = parse_options(inner);
            let label = options
                .shift_remove("")
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| prefix.to_string());
            self.flush(token_start);
            self.elements.push(Element::Link(Link {
                url: prefix.to_string(),
                label,
                options,
            }));
        } else {
            let Some((name, target)) = prefix.split_once(':').filter(|(name, _)| is_macro_name(name))
            else {
                return Ok(i + 1);
            };
            let (target, inline) = match target.strip_prefix(':') {
                Some(target) => (target, false),
                None => (target, true),
            };
            self.flush(token_start);
            match name {
                "include" => {
                    let include = include_macro(target, parse_options(inner));
                    let blocks = self.session.include_blocks(&include, self.attributes)?;
                    self.elements.extend(blocks);
                }
                "ifdef" | "ifndef" | "ifeval" | "endif" if self.cursor.is_some() => {
                    match parse_directive(&line[token_start..=end]) {
                        Some(directive) => self.conditional(&directive)?,
                        None => self.push_macro(name, target, inner, inline),
                    }
                }
                _ => self.push_macro(name, target, inner, inline),
            }
        }
        self.start = end + 1;
        Ok(end + 1)
    }

    fn push_macro(&mut self, name: &str, target: &str, inner: &str, inline: bool) {
        // A formula is kept whole; its commas are not option separators.
        let (label, options) = if name == "stem" {
            (inner, Options::new())
        } else {
            (target, parse_options(inner))
        };
        self.elements.push(Element::Macro(Macro {
            name: name.to_string(),
            label: label.to_string(),
            options,
            inline,
        }));
    }

    /// A conditional directive met inside a paragraph.
    ///
    /// The block form reads its body from the cursor up to the matching
    /// `endif`. A stray `endif` is dropped.
    fn conditional(&mut self, directive: &Directive<'_>) -> ParseResult<()> {
        let Some(predicate) = directive.predicate(self.attributes)? else {
            tracing::trace!("dropping endif without an open conditional");
            return Ok(());
        };
        let lines = match directive.inline_content() {
            Some(content) => vec![content.to_string()],
            None => self
                .cursor
                .as_deref_mut()
                .map(read_if_block)
                .unwrap_or_default(),
        };
        let children = parse_block_sequence(
            self.session,
            &mut LineCursor::new(lines),
            &|_| true,
            self.attributes,
            true,
        )?;
        self.elements.push(Element::ConditionalBlock(ConditionalBlock {
            predicate,
            children,
            options: Options::new(),
        }));
        Ok(())
    }
}
