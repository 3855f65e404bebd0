//! Conditional directives: `ifdef`, `ifndef` and `ifeval`.
//!
//! Conditions in the body are not evaluated while parsing. They become a
//! [`Predicate`] stored in a
//! [`ConditionalBlock`](crate::asg::ConditionalBlock), tested later against
//! whatever [`AttributeContext`] the renderer supplies. Header conditionals are
//! the exception: they are evaluated immediately so the header attribute set
//! is final once parsing reaches the body.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use adoctree::preprocess::{Combinator, Predicate};
//!
//! let predicate = Predicate::Ifdef {
//!     names: vec!["env-github".to_string()],
//!     combinator: Combinator::Or,
//! };
//! let context = HashMap::from([("env-github".to_string(), String::new())]);
//! assert!(predicate.test(&context));
//! ```

mod directive;
mod expression;

use std::collections::HashMap;

use indexmap::IndexMap;

pub use directive::{Combinator, Directive, parse_directive};
pub use expression::{Expression, Operator, compile};

/// Attribute lookup used when evaluating conditions and `{name}` references.
pub trait AttributeContext {
    /// Value of `name`, `None` when the attribute is not set.
    fn attribute(&self, name: &str) -> Option<String>;
}

impl AttributeContext for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeContext for IndexMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A context where no attribute is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttributes;

impl AttributeContext for NoAttributes {
    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Two contexts consulted in order.
#[derive(Clone, Copy)]
pub struct Layered<'a> {
    first: &'a dyn AttributeContext,
    second: &'a dyn AttributeContext,
}

impl<'a> Layered<'a> {
    /// Look `first` up, then `second`.
    #[must_use]
    pub fn new(first: &'a dyn AttributeContext, second: &'a dyn AttributeContext) -> Self {
        Self { first, second }
    }
}

impl AttributeContext for Layered<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.first
            .attribute(name)
            .or_else(|| self.second.attribute(name))
    }
}

/// A compiled condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `ifdef::a,b[]` or `ifdef::a+b[]`
    Ifdef {
        /// Attribute names.
        names: Vec<String>,
        /// How the names combine.
        combinator: Combinator,
    },
    /// `ifndef::a,b[]` or `ifndef::a+b[]`
    Ifndef {
        /// Attribute names.
        names: Vec<String>,
        /// How the names combine.
        combinator: Combinator,
    },
    /// `ifeval::[left OP right]`
    Ifeval(Expression),
}

impl Predicate {
    /// Evaluate against `context`.
    ///
    /// - `Combinator::Or`: `ifdef` holds if ANY name is set, `ifndef` if ANY is unset
    /// - `Combinator::And`: `ifdef` holds if ALL names are set, `ifndef` if ALL are unset
    #[must_use]
    pub fn test(&self, context: &dyn AttributeContext) -> bool {
        match self {
            Self::Ifdef { names, combinator } => {
                combinator.apply(names, |name| context.attribute(name).is_some())
            }
            Self::Ifndef { names, combinator } => {
                combinator.apply(names, |name| context.attribute(name).is_none())
            }
            Self::Ifeval(expression) => expression.evaluate(context),
        }
    }
}

impl Combinator {
    fn apply(self, names: &[String], check: impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Or => names.iter().any(|name| check(name)),
            Self::And => names.iter().all(|name| check(name)),
        }
    }
}
