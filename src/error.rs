//! Error types for document parsing.
//!
//! Every failure carries the 1-based line of the top-level source where it
//! was detected. Failures raised inside nested parses (included files,
//! delimited blocks) report the line of the enclosing construct.

use thiserror::Error;

/// A fatal parse failure.
#[derive(Debug, Error)]
#[error("invalid state at line #{line}: {kind}")]
pub struct ParseError {
    /// 1-based line number, `0` while the failure has not reached the top-level cursor yet.
    pub line: usize,
    /// What went wrong.
    pub kind: ErrorKind,
}

/// The kinds of failure the parser reports.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// An include target could not be resolved and was not marked optional.
    #[error("missing include: '{target}'")]
    MissingInclude {
        /// Include target as written in the macro.
        target: String,
    },

    /// Callout references inside a code block disagree with the descriptions after it.
    #[error("invalid callout: {reason}")]
    InvalidCallout {
        /// Why the callouts were rejected.
        reason: String,
    },

    /// An `ifeval` condition could not be understood.
    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression {
        /// The raw condition text.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header line after the first attribute is neither an attribute nor a conditional.
    #[error("unknown header line: '{line}'")]
    MalformedAttributeLine {
        /// The offending line.
        line: String,
    },

    /// An include `lines=` entry is not a number or a `start..end` range.
    #[error("unsupported line range: '{range}'")]
    UnsupportedLineRange {
        /// The offending entry.
        range: String,
    },

    /// Includes nest deeper than [`ParserOptions::max_include_depth`](crate::ParserOptions::max_include_depth).
    #[error("include depth exceeded ({depth}) while including '{target}'")]
    IncludeDepthExceeded {
        /// The include that crossed the limit.
        target: String,
        /// The configured limit.
        depth: usize,
    },

    /// The content resolver failed for a reason other than absence.
    #[error("can't read '{target}': {source}")]
    Io {
        /// The include target being resolved.
        target: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

impl ParseError {
    /// Create an error whose line is not known yet.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { line: 0, kind }
    }

    /// Attach `line` unless an inner parse already did.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}

impl From<ErrorKind> for ParseError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
