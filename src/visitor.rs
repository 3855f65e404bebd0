//! Read-only traversal of a [`Document`].
//!
//! A renderer implements [`Visitor`] and overrides the methods of the
//! elements it cares about. Container defaults walk their children; leaf
//! defaults do nothing. Overriding a container method replaces its walk, so
//! call [`Visitor::visit_children`] to keep descending.
//!
//! ```
//! use adoctree::asg::Text;
//! use adoctree::{Visitor, parse};
//!
//! #[derive(Default)]
//! struct Words(usize);
//!
//! impl Visitor for Words {
//!     fn visit_text(&mut self, text: &Text) {
//!         self.0 += text.value.split_whitespace().count();
//!     }
//! }
//!
//! let document = parse("== Intro\n\nOne *two* three.").unwrap();
//! let mut words = Words::default();
//! words.visit_document(&document);
//! assert_eq!(words.0, 4);
//! ```

use crate::asg::{
    Admonition, Anchor, Attribute, Code, ConditionalBlock, DescriptionList, Document, Element,
    Header, Link, List, Listing, Macro, OpenBlock, PageBreak, Paragraph, PassthroughBlock, Quote,
    Section, Table, Text,
};
use crate::preprocess::{AttributeContext, NoAttributes};

/// Double dispatch over [`Element`].
pub trait Visitor {
    /// Attributes used for conditional blocks and `{name}` references.
    fn context(&self) -> &dyn AttributeContext {
        &NoAttributes
    }

    /// Header first, then every body element.
    fn visit_document(&mut self, document: &Document) {
        self.visit_header(&document.header);
        self.visit_children(&document.body.children);
    }

    /// The document header.
    fn visit_header(&mut self, _header: &Header) {}

    /// Visit each element of `children` in order.
    fn visit_children(&mut self, children: &[Element]) {
        for child in children {
            self.visit_element(child);
        }
    }

    /// Dispatch to the method of the element's variant.
    fn visit_element(&mut self, element: &Element) {
        match element {
            Element::Section(section) => self.visit_section(section),
            Element::Paragraph(paragraph) => self.visit_paragraph(paragraph),
            Element::Text(text) => self.visit_text(text),
            Element::UnorderedList(list) => self.visit_unordered_list(list),
            Element::OrderedList(list) => self.visit_ordered_list(list),
            Element::DescriptionList(list) => self.visit_description_list(list),
            Element::Table(table) => self.visit_table(table),
            Element::Code(code) => self.visit_code(code),
            Element::Listing(listing) => self.visit_listing(listing),
            Element::PassthroughBlock(block) => self.visit_passthrough_block(block),
            Element::Quote(quote) => self.visit_quote(quote),
            Element::OpenBlock(block) => self.visit_open_block(block),
            Element::Admonition(admonition) => self.visit_admonition(admonition),
            Element::Link(link) => self.visit_link(link),
            Element::Anchor(anchor) => self.visit_anchor(anchor),
            Element::Macro(item) => self.visit_macro(item),
            Element::Attribute(attribute) => self.visit_attribute(attribute),
            Element::ConditionalBlock(block) => self.visit_conditional_block(block),
            Element::LineBreak => self.visit_line_break(),
            Element::PageBreak(page_break) => self.visit_page_break(page_break),
        }
    }

    /// Title, then content.
    fn visit_section(&mut self, section: &Section) {
        self.visit_element(&section.title);
        self.visit_children(&section.children);
    }

    /// Paragraph children.
    fn visit_paragraph(&mut self, paragraph: &Paragraph) {
        self.visit_children(&paragraph.children);
    }

    /// A text run.
    fn visit_text(&mut self, _text: &Text) {}

    /// Items in order.
    fn visit_unordered_list(&mut self, list: &List) {
        self.visit_children(&list.items);
    }

    /// Items in order.
    fn visit_ordered_list(&mut self, list: &List) {
        self.visit_children(&list.items);
    }

    /// Each term, then its description.
    fn visit_description_list(&mut self, list: &DescriptionList) {
        for (term, description) in &list.entries {
            self.visit_element(term);
            self.visit_element(description);
        }
    }

    /// Cells row by row.
    fn visit_table(&mut self, table: &Table) {
        for row in &table.rows {
            self.visit_children(row);
        }
    }

    /// Callout descriptions; the code itself is a leaf.
    fn visit_code(&mut self, code: &Code) {
        for callout in &code.callouts {
            self.visit_element(&callout.text);
        }
    }

    /// A literal block.
    fn visit_listing(&mut self, _listing: &Listing) {}

    /// A raw passthrough block.
    fn visit_passthrough_block(&mut self, _block: &PassthroughBlock) {}

    /// Quoted content.
    fn visit_quote(&mut self, quote: &Quote) {
        self.visit_children(&quote.children);
    }

    /// Open block content.
    fn visit_open_block(&mut self, block: &OpenBlock) {
        self.visit_children(&block.children);
    }

    /// The admonition body.
    fn visit_admonition(&mut self, admonition: &Admonition) {
        self.visit_element(&admonition.content);
    }

    /// A hyperlink.
    fn visit_link(&mut self, _link: &Link) {}

    /// A cross reference.
    fn visit_anchor(&mut self, _anchor: &Anchor) {}

    /// A macro such as `image:` or `kbd:`.
    fn visit_macro(&mut self, _item: &Macro) {}

    /// Parse the value the context holds for the attribute and visit the result.
    ///
    /// An unset attribute renders nothing. A value that fails to parse is
    /// logged and skipped.
    fn visit_attribute(&mut self, attribute: &Attribute) {
        let Some(value) = self.context().attribute(&attribute.name) else {
            return;
        };
        match attribute.resolve(&value) {
            Ok(elements) => self.visit_children(&elements),
            Err(error) => {
                tracing::warn!(name = %attribute.name, %error, "attribute value does not parse");
            }
        }
    }

    /// Children only when the predicate holds in [`context`](Self::context).
    fn visit_conditional_block(&mut self, block: &ConditionalBlock) {
        if block.predicate.test(self.context()) {
            self.visit_children(&block.children);
        }
    }

    /// A hard line break.
    fn visit_line_break(&mut self) {}

    /// A page break.
    fn visit_page_break(&mut self, _page_break: &PageBreak) {}
}
