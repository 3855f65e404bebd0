//! Document tree produced by the parser.
//!
//! A [`Document`] is a [`Header`] plus a [`Body`] of [`Element`]s. Every element
//! that can be decorated carries an [`Options`] map built from the `[...]` line
//! (and `.Title` line) preceding it.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::ParseResult;
use crate::options::merge_missing;
use crate::preprocess::Predicate;

/// Key/value decorations of an element (`role`, `id`, `title`, `language`, ...).
///
/// Iteration follows insertion order. The positional value of a bracket list is
/// stored under the empty key.
pub type Options = IndexMap<String, String>;

/// Document attributes, in definition order.
pub type Attributes = IndexMap<String, String>;

/// Inline styles applied to a [`Text`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// `*bold*`
    Bold,
    /// `_italic_`
    Italic,
    /// Emphasis, kept for renderers that distinguish it from italic.
    Emphasis,
    /// `~subscript~`
    Sub,
    /// `^superscript^`
    Sup,
    /// `#mark#`
    Mark,
}

/// Styles of a text run, outermost first.
pub type Styles = SmallVec<[Style; 2]>;

/// A parsed document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Title, author, revision and attributes.
    pub header: Header,
    /// Everything after the header.
    pub body: Body,
}

/// Document header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    /// Text after `= ` (or `# `), empty when the document has no title line.
    pub title: String,
    /// Author line.
    pub author: Author,
    /// Revision line.
    pub revision: Revision,
    /// Attributes defined in the header, conditionals already applied.
    pub attributes: Attributes,
}

impl Header {
    /// A header with no title, author, revision or attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author == Author::default()
            && self.revision == Revision::default()
            && self.attributes.is_empty()
    }
}

/// `Name <mail>` line of the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Address between angle brackets, empty when absent.
    pub mail: String,
}

/// `number, date: remark` line of the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revision {
    /// Revision number.
    pub number: String,
    /// Revision date.
    pub date: String,
    /// Free-form remark after the colon.
    pub remark: String,
}

/// Body of a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    /// Top-level elements in source order.
    pub children: Vec<Element>,
}

/// A block or inline node.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// `== Title` and everything down to the next section of the same or lower level.
    Section(Section),
    /// Grouping of elements, either a real paragraph or a wrapper around mixed content.
    Paragraph(Paragraph),
    /// A run of text with uniform styling.
    Text(Text),
    /// `* item` list.
    UnorderedList(List),
    /// `. item` list.
    OrderedList(List),
    /// `term:: description` list.
    DescriptionList(DescriptionList),
    /// `|===` table.
    Table(Table),
    /// Source block or inline code span.
    Code(Code),
    /// `....` literal block.
    Listing(Listing),
    /// `++++` raw passthrough block.
    PassthroughBlock(PassthroughBlock),
    /// `____` block or `> ` quoted lines.
    Quote(Quote),
    /// `--` open block.
    OpenBlock(OpenBlock),
    /// `NOTE: ...` style callout paragraph.
    Admonition(Admonition),
    /// Hyperlink.
    Link(Link),
    /// `<<id,label>>` cross reference.
    Anchor(Anchor),
    /// `name:target[options]` or `name::target[options]`.
    Macro(Macro),
    /// `{name}` reference resolved when rendering.
    Attribute(Attribute),
    /// `ifdef`/`ifndef`/`ifeval` content, kept for render-time evaluation.
    ConditionalBlock(ConditionalBlock),
    /// Hard line break (` +` at end of line).
    LineBreak,
    /// `<<<`
    PageBreak(PageBreak),
}

impl Element {
    /// Plain text element with no style or options.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Text::plain(value))
    }

    /// Options of this element, `None` for variants that carry none.
    #[must_use]
    pub fn options(&self) -> Option<&Options> {
        match self {
            Self::Section(e) => Some(&e.options),
            Self::Paragraph(e) => Some(&e.options),
            Self::Text(e) => Some(&e.options),
            Self::UnorderedList(e) | Self::OrderedList(e) => Some(&e.options),
            Self::DescriptionList(e) => Some(&e.options),
            Self::Table(e) => Some(&e.options),
            Self::Code(e) => Some(&e.options),
            Self::Listing(e) => Some(&e.options),
            Self::PassthroughBlock(e) => Some(&e.options),
            Self::Quote(e) => Some(&e.options),
            Self::OpenBlock(e) => Some(&e.options),
            Self::Link(e) => Some(&e.options),
            Self::Macro(e) => Some(&e.options),
            Self::ConditionalBlock(e) => Some(&e.options),
            Self::PageBreak(e) => Some(&e.options),
            Self::Admonition(_) | Self::Anchor(_) | Self::Attribute(_) | Self::LineBreak => None,
        }
    }

    /// Mutable access to the options of this element.
    pub fn options_mut(&mut self) -> Option<&mut Options> {
        match self {
            Self::Section(e) => Some(&mut e.options),
            Self::Paragraph(e) => Some(&mut e.options),
            Self::Text(e) => Some(&mut e.options),
            Self::UnorderedList(e) | Self::OrderedList(e) => Some(&mut e.options),
            Self::DescriptionList(e) => Some(&mut e.options),
            Self::Table(e) => Some(&mut e.options),
            Self::Code(e) => Some(&mut e.options),
            Self::Listing(e) => Some(&mut e.options),
            Self::PassthroughBlock(e) => Some(&mut e.options),
            Self::Quote(e) => Some(&mut e.options),
            Self::OpenBlock(e) => Some(&mut e.options),
            Self::Link(e) => Some(&mut e.options),
            Self::Macro(e) => Some(&mut e.options),
            Self::ConditionalBlock(e) => Some(&mut e.options),
            Self::PageBreak(e) => Some(&mut e.options),
            Self::Admonition(_) | Self::Anchor(_) | Self::Attribute(_) | Self::LineBreak => None,
        }
    }

    /// Text without styles or options, which may be merged with its neighbours.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Text(t) if t.styles.is_empty() && t.options.is_empty())
    }

    /// A paragraph without children, dropped from block sequences.
    #[must_use]
    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Self::Paragraph(p) if p.children.is_empty())
    }
}

/// Section heading and content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Number of `=` plus the active `leveloffset`.
    pub level: usize,
    /// Parsed title, a no-wrap [`Paragraph`] when it holds several inline nodes.
    pub title: Box<Element>,
    /// Nested blocks and subsections.
    pub children: Vec<Element>,
    /// Decorations.
    pub options: Options,
}

/// Ordered group of elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    /// Content.
    pub children: Vec<Element>,
    /// Decorations. `nowrap=true` marks inline-only groupings such as titles.
    pub options: Options,
}

impl Paragraph {
    /// Create a paragraph.
    #[must_use]
    pub fn new(children: Vec<Element>, options: Options) -> Self {
        Self { children, options }
    }

    /// A paragraph flagged `nowrap`, used where inline content must stay on one line.
    #[must_use]
    pub fn nowrap(children: Vec<Element>) -> Self {
        let mut options = Options::new();
        options.insert("nowrap".to_string(), "true".to_string());
        Self { children, options }
    }

    /// Collapse a paragraph holding a single element into that element.
    ///
    /// The paragraph's options are merged into the child's, the child's own
    /// values winning. A paragraph with options around a child that cannot
    /// carry options is kept as is.
    #[must_use]
    pub fn into_element(self) -> Element {
        if self.children.len() != 1 {
            return Element::Paragraph(self);
        }
        let Self {
            mut children,
            options,
        } = self;
        let Some(mut child) = children.pop() else {
            return Element::Paragraph(Self::new(children, options));
        };
        if options.is_empty() {
            return child;
        }
        match child.options_mut() {
            Some(child_options) => {
                merge_missing(child_options, &options);
                child
            }
            None => Element::Paragraph(Self::new(vec![child], options)),
        }
    }
}

/// A run of text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    /// Applied styles, outermost first.
    pub styles: Styles,
    /// Raw text.
    pub value: String,
    /// Decorations (`role`, `id`, ...).
    pub options: Options,
}

impl Text {
    /// Unstyled text.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            styles: Styles::new(),
            value: value.into(),
            options: Options::new(),
        }
    }

    /// Text with styles and options.
    #[must_use]
    pub fn new(styles: Styles, value: impl Into<String>, options: Options) -> Self {
        Self {
            styles,
            value: value.into(),
            options,
        }
    }
}

/// Items of an ordered or unordered list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    /// One element per item. Items with a nested list are a [`Paragraph`] of text and list.
    pub items: Vec<Element>,
    /// Decorations.
    pub options: Options,
}

/// `term:: description` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptionList {
    /// `(term, description)` in source order.
    pub entries: Vec<(Element, Element)>,
    /// Decorations.
    pub options: Options,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Rows of formatted cells.
    pub rows: Vec<Vec<Element>>,
    /// Decorations (`cols`, `opts`, ...).
    pub options: Options,
}

/// Code block or inline code span.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Code {
    /// Source text. Callout markers `<N>` are rewritten to `(N)`.
    pub value: String,
    /// Descriptions attached to the callout markers.
    pub callouts: Vec<CallOut>,
    /// Decorations (`language`, ...).
    pub options: Options,
    /// `true` for a backtick span or a literal table cell.
    pub inline: bool,
}

/// Description of a `<N>` marker in a code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOut {
    /// Marker number.
    pub number: u32,
    /// Parsed description.
    pub text: Element,
}

/// `....` literal block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Listing {
    /// Verbatim content.
    pub value: String,
    /// Decorations.
    pub options: Options,
}

/// `++++` passthrough block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PassthroughBlock {
    /// Raw content, emitted unprocessed.
    pub value: String,
    /// Decorations.
    pub options: Options,
}

/// Quoted content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Quote {
    /// Quoted blocks.
    pub children: Vec<Element>,
    /// Decorations (`attribution`, `role=quoteblock`, ...).
    pub options: Options,
}

/// `--` open block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenBlock {
    /// Content.
    pub children: Vec<Element>,
    /// Decorations.
    pub options: Options,
}

/// Admonition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmonitionLevel {
    /// `NOTE:`
    Note,
    /// `TIP:`
    Tip,
    /// `IMPORTANT:`
    Important,
    /// `CAUTION:`
    Caution,
    /// `WARNING:`
    Warning,
}

impl AdmonitionLevel {
    /// Every level, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Note,
        Self::Tip,
        Self::Important,
        Self::Caution,
        Self::Warning,
    ];

    /// Upper-case label as written in the source.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Note => "NOTE",
            Self::Tip => "TIP",
            Self::Important => "IMPORTANT",
            Self::Caution => "CAUTION",
            Self::Warning => "WARNING",
        }
    }

    /// Match a line starting with `LEVEL: `, returning the level and the rest of the line.
    #[must_use]
    pub fn strip_prefix(line: &str) -> Option<(Self, &str)> {
        Self::ALL.into_iter().find_map(|level| {
            line.strip_prefix(level.label())
                .and_then(|rest| rest.strip_prefix(": "))
                .map(|rest| (level, rest))
        })
    }
}

impl fmt::Display for AdmonitionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Admonition paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Admonition {
    /// Kind.
    pub level: AdmonitionLevel,
    /// Parsed content.
    pub content: Box<Element>,
}

/// Hyperlink.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    /// Target.
    pub url: String,
    /// Label, the URL itself when none was given.
    pub label: String,
    /// Decorations (`role`, `window`, ...).
    pub options: Options,
}

/// Cross reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Anchor {
    /// Target id.
    pub id: String,
    /// Label, empty when omitted.
    pub label: String,
}

/// Generic macro such as `image::`, `icon:`, `kbd:` or `stem:`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Macro {
    /// Macro name before the colon.
    pub name: String,
    /// Target between the colon and the bracket.
    pub label: String,
    /// Bracket content. The first positional value is stored under the empty key.
    pub options: Options,
    /// `false` for block macros (`name::target[]`).
    pub inline: bool,
}

/// Parses an attribute value into elements once it is known.
pub type ReparseFn = fn(&str) -> ParseResult<Vec<Element>>;

/// Handle used by an [`Attribute`] to parse its value at render time.
///
/// Two handles always compare equal so trees can be compared structurally.
#[derive(Clone, Copy)]
pub struct Reparse(ReparseFn);

impl Reparse {
    /// Wrap a parse function.
    #[must_use]
    pub const fn new(parse: ReparseFn) -> Self {
        Self(parse)
    }

    /// Parse `value`.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the wrapped parse function.
    pub fn call(&self, value: &str) -> ParseResult<Vec<Element>> {
        (self.0)(value)
    }
}

impl fmt::Debug for Reparse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reparse(..)")
    }
}

impl PartialEq for Reparse {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

/// Unresolved `{name}` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    reparse: Reparse,
}

impl Attribute {
    /// Create a reference whose value will be parsed with `reparse`.
    #[must_use]
    pub fn new(name: impl Into<String>, reparse: ReparseFn) -> Self {
        Self {
            name: name.into(),
            reparse: Reparse::new(reparse),
        }
    }

    /// Parse a value supplied for this attribute into elements.
    ///
    /// # Errors
    ///
    /// Fails when the value itself does not parse (for instance a missing include).
    pub fn resolve(&self, value: &str) -> ParseResult<Vec<Element>> {
        self.reparse.call(value)
    }
}

/// Content guarded by a condition evaluated at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    /// Guard.
    pub predicate: Predicate,
    /// Guarded content.
    pub children: Vec<Element>,
    /// Decorations.
    pub options: Options,
}

/// `<<<` page break.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageBreak {
    /// Decorations.
    pub options: Options,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn single_child_without_options_unwraps() {
        let p = Paragraph::new(vec![Element::text("a")], Options::new());
        assert_eq!(p.into_element(), Element::text("a"));
    }

    #[test]
    fn child_options_win_on_unwrap() {
        let child = Element::Text(Text::new(
            Styles::new(),
            "a",
            opts(&[("role", "inner")]),
        ));
        let p = Paragraph::new(vec![child], opts(&[("role", "outer"), ("id", "x")]));
        let Element::Text(text) = p.into_element() else {
            panic!("expected text");
        };
        assert_eq!(text.options, opts(&[("role", "inner"), ("id", "x")]));
    }

    #[test]
    fn optionless_child_keeps_wrapper() {
        let p = Paragraph::new(vec![Element::LineBreak], opts(&[("role", "x")]));
        assert!(matches!(p.into_element(), Element::Paragraph(_)));
    }

    #[test]
    fn several_children_stay_wrapped() {
        let p = Paragraph::new(
            vec![Element::text("a"), Element::LineBreak],
            Options::new(),
        );
        assert!(matches!(p.into_element(), Element::Paragraph(p) if p.children.len() == 2));
    }

    #[test]
    fn admonition_prefix() {
        assert_eq!(
            AdmonitionLevel::strip_prefix("WARNING: careful"),
            Some((AdmonitionLevel::Warning, "careful"))
        );
        assert_eq!(AdmonitionLevel::strip_prefix("NOTE:x"), None);
    }

    #[test]
    fn plain_text_detection() {
        assert!(Element::text("x").is_plain_text());
        let styled = Element::Text(Text::new(
            Styles::from_slice(&[Style::Bold]),
            "x",
            Options::new(),
        ));
        assert!(!styled.is_plain_text());
    }
}
