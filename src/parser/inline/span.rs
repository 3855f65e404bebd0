//! Styled spans: `*bold*`, `_italic_`, `~sub~`, `^sup^`, `#mark#` and `` `code` ``.

use crate::asg::{Code, Element, Link, Options, Paragraph, Style};
use crate::error::ParseResult;
use crate::options::{merge_missing, parse_options};

use super::macros::is_link;
use super::{Scanner, parse_inline};

impl Scanner<'_, '_, '_> {
    /// A span delimited by `marker`.
    ///
    /// `*` and `_` are constrained: they do not open inside a word unless
    /// doubled (`**Bold**face`).
    pub(super) fn span(&mut self, i: usize, marker: u8, style: Style) -> ParseResult<usize> {
        let line = self.line;
        let bytes = line.as_bytes();
        let constrained = matches!(marker, b'*' | b'_');

        if constrained && bytes.get(i + 1) == Some(&marker) {
            let pair = &line[i..i + 2];
            if let Some(len) = line[i + 2..].find(pair).filter(|len| *len > 0) {
                let end = i + 2 + len;
                self.flush(i);
                self.add_styled(i + 2, end, style, None)?;
                self.start = end + 2;
                return Ok(end + 2);
            }
        }
        if constrained && i > 0 && bytes[i - 1].is_ascii_alphanumeric() {
            return Ok(i + 1);
        }

        let Some(len) = line[i + 1..].find(char::from(marker)) else {
            return Ok(i + 1);
        };
        if len == 0 {
            return Ok(i + 1);
        }
        let end = i + 1 + len;
        self.flush(i);
        self.add_styled(i + 1, end, style, None)?;
        self.start = end + 1;
        Ok(end + 1)
    }

    /// `#mark#`, `##mark##`, optionally preceded by `[options]`.
    pub(super) fn mark(&mut self, i: usize) -> ParseResult<usize> {
        let line = self.line;
        let bytes = line.as_bytes();
        let run = bytes[i..].iter().take_while(|b| **b == b'#').count();
        if i + run >= bytes.len() {
            return Ok(i + run);
        }
        let after_bracket = i > 0 && bytes[i - 1] == b']';
        if run == 1 && !after_bracket && i > 0 && bytes[i - 1].is_ascii_alphanumeric() {
            return Ok(i + 1);
        }

        let closing = &line[i..i + run];
        let Some(len) = line[i + run..].find(closing) else {
            return Ok(i + run);
        };
        let end = i + run + len;

        let mut from = i;
        let mut options = None;
        if after_bracket {
            if let Some(open) = line[..i - 1].rfind('[').filter(|open| *open >= self.start) {
                options = Some(&line[open + 1..i - 1]);
                from = open;
            }
        }
        self.flush(from);
        self.add_styled(i + run, end, Style::Mark, options)?;
        self.start = end + run;
        Ok(end + run)
    }

    /// `` `code` ``; a URL in backticks stays a link.
    pub(super) fn code(&mut self, i: usize) -> ParseResult<usize> {
        let line = self.line;
        let Some(len) = line[i + 1..].find('`') else {
            return Ok(i + 1);
        };
        if len == 0 {
            return Ok(i + 2);
        }
        let end = i + 1 + len;
        let content = &line[i + 1..end];
        self.flush(i);

        if is_link(content) {
            let parsed = parse_inline(self.session, None, content, self.attributes, false)?;
            let mut link = parsed
                .into_iter()
                .find_map(|element| match element {
                    Element::Link(link) => Some(link),
                    _ => None,
                })
                .unwrap_or_else(|| Link {
                    url: content.to_string(),
                    label: content.to_string(),
                    options: Options::new(),
                });
            link.options.insert("role".to_string(), "inline-code".to_string());
            self.elements.push(Element::Link(link));
        } else {
            self.elements.push(Element::Code(Code {
                value: content.to_string(),
                callouts: Vec::new(),
                options: Options::new(),
                inline: true,
            }));
        }
        self.start = end + 1;
        Ok(end + 1)
    }

    /// Parse `line[from..to]` and prepend `style` to every text node in it.
    fn add_styled(
        &mut self,
        from: usize,
        to: usize,
        style: Style,
        options: Option<&str>,
    ) -> ParseResult<()> {
        let options = options.map(parse_options).unwrap_or_default();
        let parsed = parse_inline(self.session, None, &self.line[from..to], self.attributes, false)?;
        let styled: Vec<Element> = parsed
            .into_iter()
            .map(|element| match element {
                Element::Text(mut text) => {
                    text.styles.insert(0, style);
                    Element::Text(text)
                }
                other => other,
            })
            .collect();

        match <[Element; 1]>::try_from(styled) {
            Ok([Element::Text(mut text)]) => {
                merge_missing(&mut text.options, &options);
                self.elements.push(Element::Text(text));
            }
            Ok([other]) if options.is_empty() => self.elements.push(other),
            Ok([other]) => self.elements.push(Paragraph::new(vec![other], options).into_element()),
            Err(styled) if options.is_empty() => self.elements.extend(styled),
            Err(styled) => self.elements.push(Element::Paragraph(Paragraph::new(styled, options))),
        }
        Ok(())
    }
}
