//! `ifeval` conditions.
//!
//! A condition is `left OP right`. Operands may be quoted and may reference
//! attributes with `{name}`. `==` and `!=` compare the substituted strings,
//! the ordering operators compare them as numbers.

use std::fmt;

use crate::asg::Attributes;
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::options::substitute_attributes;

use super::AttributeContext;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterEqual,
}

impl Operator {
    /// Two-character operators come first so `<` does not shadow `<=`.
    const ALL: [(&'static str, Self); 6] = [
        ("==", Self::Equal),
        ("!=", Self::NotEqual),
        ("<=", Self::LessEqual),
        (">=", Self::GreaterEqual),
        ("<", Self::LessThan),
        (">", Self::GreaterThan),
    ];

    fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, op)| *op)
    }

    /// Source form of the operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("", |(s, _)| *s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A compiled `ifeval` condition.
///
/// Keeps a snapshot of the attributes known when it was parsed; those take
/// precedence over the render-time context.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    left: String,
    operator: Operator,
    right: String,
    parse_attributes: Attributes,
}

/// Compile `condition` against the attributes known at parse time.
///
/// # Errors
///
/// Fails with `InvalidExpression` when an operand is missing or the operator is
/// not one of `==`, `!=`, `<`, `<=`, `>`, `>=`.
pub fn compile(condition: &str, attributes: &Attributes) -> ParseResult<Expression> {
    let condition = condition.trim();
    let (left, symbol, right) = split_on_spaces(condition)
        .or_else(|| split_on_operator(condition))
        .ok_or_else(|| invalid(condition, "expected 'left OP right'"))?;
    let operator =
        Operator::from_symbol(symbol).ok_or_else(|| invalid(condition, "unsupported operator"))?;
    if left.is_empty() || right.is_empty() {
        return Err(invalid(condition, "missing operand"));
    }
    // `1===1` or `1<>2` leave part of the operator on an operand.
    if left.ends_with(OPERATOR_CHARS) || right.starts_with(OPERATOR_CHARS) {
        return Err(invalid(condition, "unsupported operator"));
    }
    Ok(Expression {
        left: unquote(left).to_string(),
        operator,
        right: unquote(right).to_string(),
        parse_attributes: attributes.clone(),
    })
}

fn invalid(expression: &str, reason: &str) -> ParseError {
    ParseError::new(ErrorKind::InvalidExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    })
}

const OPERATOR_CHARS: [char; 4] = ['=', '<', '>', '!'];

type Parts<'a> = (&'a str, &'a str, &'a str);

/// `left OP right` split at the first and last unquoted space.
fn split_on_spaces(condition: &str) -> Option<Parts<'_>> {
    let mut spaces = positions_outside_quotes(condition, " ");
    let first = spaces.next()?;
    let last = spaces.last()?;
    Some((
        condition[..first].trim(),
        condition[first + 1..last].trim(),
        condition[last + 1..].trim(),
    ))
}

/// Fallback for conditions with at most one unquoted space.
fn split_on_operator(condition: &str) -> Option<Parts<'_>> {
    for (symbol, _) in Operator::ALL {
        if let Some(pos) = positions_outside_quotes(condition, symbol).next() {
            if symbol.len() == 1 && condition[pos + 1..].starts_with('=') {
                continue;
            }
            return Some((
                condition[..pos].trim(),
                symbol,
                condition[pos + symbol.len()..].trim(),
            ));
        }
    }
    None
}

fn positions_outside_quotes<'a>(
    haystack: &'a str,
    needle: &'a str,
) -> impl Iterator<Item = usize> + 'a {
    let mut quote: Option<char> = None;
    haystack.char_indices().filter_map(move |(index, c)| {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if haystack[index..].starts_with(needle) => return Some(index),
            None => {}
        }
        None
    })
}

fn unquote(operand: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = operand
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    operand
}

impl Expression {
    /// Operator of the condition.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Evaluate, resolving `{name}` from the parse-time snapshot first and `context` second.
    ///
    /// Ordering comparisons on non-numeric operands are false.
    #[must_use]
    pub fn evaluate(&self, context: &dyn AttributeContext) -> bool {
        let lookup = |name: &str| {
            self.parse_attributes
                .get(name)
                .cloned()
                .or_else(|| context.attribute(name))
        };
        let left = substitute_attributes(&self.left, lookup);
        let right = substitute_attributes(&self.right, lookup);
        let (left, right) = (unquote(left.trim()), unquote(right.trim()));

        match self.operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            op => match (left.parse::<f64>(), right.parse::<f64>()) {
                (Ok(l), Ok(r)) => match op {
                    Operator::LessThan => l < r,
                    Operator::LessEqual => l <= r,
                    Operator::GreaterThan => l > r,
                    _ => l >= r,
                },
                _ => {
                    tracing::trace!(left, right, operator = %op, "non-numeric ifeval operands");
                    false
                }
            },
        }
    }
}
