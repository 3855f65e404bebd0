//! Chumsky lexer for bracket option lists (`[source,java,.role,key="a, b"]`).
//!
//! Splits the content between the brackets into separators, quoted runs and
//! bare text. Every character maps to a token, so lexing never fails.

use chumsky::{extra, prelude::*};

/// A lexical unit of an option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionToken<'a> {
    /// `,` separating entries.
    Comma,
    /// `=` between a key and its value.
    Eq,
    /// Content of a `"..."` run, quotes removed. An unterminated quote runs to the end.
    Quoted(&'a str),
    /// Any other run of characters.
    Text(&'a str),
}

/// Lex the content of a bracket option list.
#[must_use]
pub(crate) fn lex(input: &str) -> Vec<OptionToken<'_>> {
    lexer().parse(input).into_output().unwrap_or_default()
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<OptionToken<'src>>, extra::Default> {
    let quoted = just('"')
        .ignore_then(none_of("\"").repeated().to_slice())
        .then_ignore(just('"').or_not())
        .map(OptionToken::Quoted);

    let text = none_of(",=\"")
        .repeated()
        .at_least(1)
        .to_slice()
        .map(OptionToken::Text);

    choice((
        just(',').to(OptionToken::Comma),
        just('=').to(OptionToken::Eq),
        quoted,
        text,
    ))
    .repeated()
    .collect()
}
