//! Recognition of conditional directive lines (`ifdef`, `ifndef`, `ifeval`, `endif`).

use crate::asg::Attributes;
use crate::error::ParseResult;

use super::{Predicate, compile};

/// How multiple attributes are combined in a conditional check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// All attributes must match (`attr1+attr2`).
    And,
    /// Any attribute must match (`attr1,attr2`).
    Or,
}

/// A parsed conditional directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `ifdef::attr[]` or `ifdef::attr[content]`
    Ifdef {
        /// Attribute names to check.
        attributes: Vec<&'a str>,
        /// How to combine multiple attributes.
        combinator: Combinator,
        /// Inline content for single-line form, if present.
        inline_content: Option<&'a str>,
    },
    /// `ifndef::attr[]` or `ifndef::attr[content]`
    Ifndef {
        /// Attribute names to check.
        attributes: Vec<&'a str>,
        /// How to combine multiple attributes.
        combinator: Combinator,
        /// Inline content for single-line form, if present.
        inline_content: Option<&'a str>,
    },
    /// `ifeval::[expression]`
    Ifeval {
        /// The expression to evaluate.
        expression: &'a str,
    },
    /// `endif::[]` or `endif::attr[]`
    Endif {
        /// Optional attribute name for clarity.
        attribute: Option<&'a str>,
    },
}

impl<'a> Directive<'a> {
    /// Whether this directive starts a region closed by `endif`.
    #[must_use]
    pub fn opens_block(&self) -> bool {
        match self {
            Self::Ifdef { inline_content, .. } | Self::Ifndef { inline_content, .. } => {
                inline_content.is_none()
            }
            Self::Ifeval { .. } => true,
            Self::Endif { .. } => false,
        }
    }

    /// Content of the single-line form (`ifdef::attr[content]`).
    #[must_use]
    pub fn inline_content(&self) -> Option<&'a str> {
        match self {
            Self::Ifdef { inline_content, .. } | Self::Ifndef { inline_content, .. } => {
                *inline_content
            }
            Self::Ifeval { .. } | Self::Endif { .. } => None,
        }
    }

    /// Compile the condition. `endif` has none.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidExpression` when an `ifeval` condition is malformed.
    pub fn predicate(&self, attributes: &Attributes) -> ParseResult<Option<Predicate>> {
        Ok(Some(match self {
            Self::Ifdef {
                attributes: names,
                combinator,
                ..
            } => Predicate::Ifdef {
                names: owned(names),
                combinator: *combinator,
            },
            Self::Ifndef {
                attributes: names,
                combinator,
                ..
            } => Predicate::Ifndef {
                names: owned(names),
                combinator: *combinator,
            },
            Self::Ifeval { expression } => Predicate::Ifeval(compile(expression, attributes)?),
            Self::Endif { .. } => return Ok(None),
        }))
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

/// Recognise `ifdef::`, `ifndef::`, `ifeval::` and `endif::` lines.
///
/// Surrounding whitespace is ignored; anything else after the closing `]`
/// means the line is not a directive.
#[must_use]
pub fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let (name, rest) = line.trim().split_once("::")?;
    let (target, body) = rest.strip_suffix(']')?.split_once('[')?;
    match name {
        "ifdef" | "ifndef" => {
            let (attributes, combinator) = attribute_names(target)?;
            let inline_content = Some(body).filter(|body| !body.is_empty());
            Some(if name == "ifdef" {
                Directive::Ifdef {
                    attributes,
                    combinator,
                    inline_content,
                }
            } else {
                Directive::Ifndef {
                    attributes,
                    combinator,
                    inline_content,
                }
            })
        }
        "ifeval" if target.is_empty() => Some(Directive::Ifeval { expression: body }),
        "endif" if body.is_empty() => Some(Directive::Endif {
            attribute: Some(target.trim()).filter(|name| !name.is_empty()),
        }),
        _ => None,
    }
}

/// `a`, `a,b` (any) or `a+b` (all).
fn attribute_names(list: &str) -> Option<(Vec<&str>, Combinator)> {
    let (separator, combinator) = if list.contains('+') {
        ('+', Combinator::And)
    } else {
        (',', Combinator::Or)
    };
    let names: Vec<&str> = list
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some((names, combinator))
}
