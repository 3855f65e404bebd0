//! Whole-document checks against expected JSON trees.
//!
//! Serializable mirror types (`Json*`) convert from the document tree via
//! `From` impls, adding the `name` field each node is identified by. The
//! expected JSON only lists the fields a case cares about: the actual tree
//! must be a superset of it.

use std::collections::BTreeMap;

use adoctree::asg::{self, Element, Style};
use adoctree::preprocess::Predicate;
use adoctree::{ContentResolver, MapResolver, Parser, ParserOptions, parse};
use serde::Serialize;
use serde_json::{Value, json};

// --- JSON mirror types ---

#[derive(Serialize)]
struct JsonDocument<'a> {
    header: JsonHeader<'a>,
    blocks: Vec<JsonNode<'a>>,
}

impl<'a> From<&'a asg::Document> for JsonDocument<'a> {
    fn from(document: &'a asg::Document) -> Self {
        Self {
            header: JsonHeader::from(&document.header),
            blocks: document.body.children.iter().map(JsonNode::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct JsonHeader<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    author: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    revision: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<&'a str, &'a str>,
}

impl<'a> From<&'a asg::Header> for JsonHeader<'a> {
    fn from(header: &'a asg::Header) -> Self {
        Self {
            title: &header.title,
            author: &header.author.name,
            revision: &header.revision.number,
            attributes: convert_options(&header.attributes),
        }
    }
}

#[derive(Serialize)]
struct JsonCallout<'a> {
    number: u32,
    text: JsonNode<'a>,
}

#[derive(Serialize, Default)]
struct JsonNode<'a> {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<Box<JsonNode<'a>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    styles: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<&'static str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<JsonNode<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<[JsonNode<'a>; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Vec<JsonNode<'a>>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    callouts: Vec<JsonCallout<'a>>,
}

fn convert_options(options: &asg::Options) -> BTreeMap<&str, &str> {
    options
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

fn convert_all(elements: &[Element]) -> Option<Vec<JsonNode<'_>>> {
    Some(elements.iter().map(JsonNode::from).collect())
}

fn style_name(style: Style) -> &'static str {
    match style {
        Style::Bold => "bold",
        Style::Italic => "italic",
        Style::Emphasis => "emphasis",
        Style::Sub => "sub",
        Style::Sup => "sup",
        Style::Mark => "mark",
    }
}

fn form(inline: bool) -> Option<&'static str> {
    Some(if inline { "inline" } else { "block" })
}

impl<'a> From<&'a Element> for JsonNode<'a> {
    fn from(element: &'a Element) -> Self {
        match element {
            Element::Section(section) => Self {
                name: "section",
                level: Some(section.level),
                title: Some(Box::new(JsonNode::from(&*section.title))),
                options: convert_options(&section.options),
                blocks: convert_all(&section.children),
                ..Self::default()
            },
            Element::Paragraph(paragraph) => Self {
                name: "paragraph",
                options: convert_options(&paragraph.options),
                blocks: convert_all(&paragraph.children),
                ..Self::default()
            },
            Element::Text(text) => Self {
                name: "text",
                styles: text.styles.iter().copied().map(style_name).collect(),
                value: Some(&text.value),
                options: convert_options(&text.options),
                ..Self::default()
            },
            Element::UnorderedList(list) | Element::OrderedList(list) => Self {
                name: if matches!(element, Element::OrderedList(_)) {
                    "orderedList"
                } else {
                    "unorderedList"
                },
                options: convert_options(&list.options),
                blocks: convert_all(&list.items),
                ..Self::default()
            },
            Element::DescriptionList(list) => Self {
                name: "descriptionList",
                options: convert_options(&list.options),
                entries: Some(
                    list.entries
                        .iter()
                        .map(|(term, description)| [term.into(), description.into()])
                        .collect(),
                ),
                ..Self::default()
            },
            Element::Table(table) => Self {
                name: "table",
                options: convert_options(&table.options),
                rows: Some(
                    table
                        .rows
                        .iter()
                        .map(|row| row.iter().map(JsonNode::from).collect())
                        .collect(),
                ),
                ..Self::default()
            },
            Element::Code(code) => Self {
                name: "code",
                value: Some(&code.value),
                form: form(code.inline),
                options: convert_options(&code.options),
                callouts: code
                    .callouts
                    .iter()
                    .map(|callout| JsonCallout {
                        number: callout.number,
                        text: JsonNode::from(&callout.text),
                    })
                    .collect(),
                ..Self::default()
            },
            Element::Listing(listing) => Self {
                name: "listing",
                value: Some(&listing.value),
                options: convert_options(&listing.options),
                ..Self::default()
            },
            Element::PassthroughBlock(block) => Self {
                name: "passthroughBlock",
                value: Some(&block.value),
                options: convert_options(&block.options),
                ..Self::default()
            },
            Element::Quote(quote) => Self {
                name: "quote",
                options: convert_options(&quote.options),
                blocks: convert_all(&quote.children),
                ..Self::default()
            },
            Element::OpenBlock(block) => Self {
                name: "openBlock",
                options: convert_options(&block.options),
                blocks: convert_all(&block.children),
                ..Self::default()
            },
            Element::Admonition(admonition) => Self {
                name: "admonition",
                variant: Some(admonition.level.label()),
                blocks: Some(vec![JsonNode::from(&*admonition.content)]),
                ..Self::default()
            },
            Element::Link(link) => Self {
                name: "link",
                target: Some(&link.url),
                label: Some(&link.label),
                options: convert_options(&link.options),
                ..Self::default()
            },
            Element::Anchor(anchor) => Self {
                name: "anchor",
                target: Some(&anchor.id),
                label: Some(&anchor.label),
                ..Self::default()
            },
            Element::Macro(item) => Self {
                name: "macro",
                variant: None,
                value: Some(&item.name),
                target: Some(&item.label),
                form: form(item.inline),
                options: convert_options(&item.options),
                ..Self::default()
            },
            Element::Attribute(attribute) => Self {
                name: "attribute",
                value: Some(&attribute.name),
                ..Self::default()
            },
            Element::ConditionalBlock(block) => Self {
                name: "conditionalBlock",
                variant: Some(match block.predicate {
                    Predicate::Ifdef { .. } => "ifdef",
                    Predicate::Ifndef { .. } => "ifndef",
                    Predicate::Ifeval(_) => "ifeval",
                }),
                options: convert_options(&block.options),
                blocks: convert_all(&block.children),
                ..Self::default()
            },
            Element::LineBreak => Self {
                name: "lineBreak",
                ..Self::default()
            },
            Element::PageBreak(page_break) => Self {
                name: "pageBreak",
                options: convert_options(&page_break.options),
                ..Self::default()
            },
        }
    }
}

// --- comparison ---

/// Whether `actual` contains everything `expected` lists.
///
/// Objects may carry extra keys; arrays must match element by element.
fn is_superset(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual_obj), Value::Object(expected_obj)) => {
            expected_obj.iter().all(|(key, expected_val)| {
                actual_obj
                    .get(key)
                    .is_some_and(|actual_val| is_superset(actual_val, expected_val))
            })
        }
        (Value::Array(actual_arr), Value::Array(expected_arr)) => {
            actual_arr.len() == expected_arr.len()
                && actual_arr
                    .iter()
                    .zip(expected_arr)
                    .all(|(a, e)| is_superset(a, e))
        }
        _ => actual == expected,
    }
}

/// Drops the keys of `actual` that `expected` does not mention, for display.
fn strip_extra_fields(actual: &Value, expected: &Value) -> Value {
    match (actual, expected) {
        (Value::Object(actual_obj), Value::Object(expected_obj)) => Value::Object(
            expected_obj
                .iter()
                .map(|(key, expected_val)| {
                    let value = actual_obj
                        .get(key)
                        .map_or(Value::Null, |actual_val| strip_extra_fields(actual_val, expected_val));
                    (key.clone(), value)
                })
                .collect(),
        ),
        (Value::Array(actual_arr), Value::Array(expected_arr)) => Value::Array(
            actual_arr
                .iter()
                .enumerate()
                .map(|(i, a)| expected_arr.get(i).map_or_else(|| a.clone(), |e| strip_extra_fields(a, e)))
                .collect(),
        ),
        _ => actual.clone(),
    }
}

fn assert_tree(document: &asg::Document, expected: &Value) {
    let actual = serde_json::to_value(JsonDocument::from(document)).unwrap();
    if !is_superset(&actual, expected) {
        pretty_assertions::assert_eq!(&strip_extra_fields(&actual, expected), expected);
    }
}

// --- cases ---

#[test]
fn article_with_sections_lists_and_code() {
    let document = parse(
        "= User Guide
Jane Doe <jane@example.com>
v1.2, 2024-05-01: first cut
:product: Widget
:toc: left

== Install

Get *{product}* from the https://example.com/download[download page].

[source,shell]
----
curl -O widget.tar.gz <1>
----
<1> Fetch the archive.

== Use

. Start it
.. wait
. Stop it

NOTE: Widgets hum.
",
    )
    .unwrap();

    assert_tree(
        &document,
        &json!({
            "header": {
                "title": "User Guide",
                "author": "Jane Doe",
                "revision": "v1.2",
                "attributes": { "product": "Widget", "toc": "left" }
            },
            "blocks": [
                {
                    "name": "section",
                    "level": 2,
                    "title": { "name": "text", "value": "Install" },
                    "blocks": [
                        {
                            "name": "paragraph",
                            "blocks": [
                                { "name": "text", "value": "Get " },
                                { "name": "text", "styles": ["bold"], "value": "Widget" },
                                { "name": "text", "value": " from the " },
                                { "name": "link", "target": "https://example.com/download", "label": "download page" },
                                { "name": "text", "value": "." }
                            ]
                        },
                        {
                            "name": "code",
                            "form": "block",
                            "value": "curl -O widget.tar.gz (1)",
                            "options": { "language": "shell" },
                            "callouts": [
                                { "number": 1, "text": { "name": "text", "value": "Fetch the archive." } }
                            ]
                        }
                    ]
                },
                {
                    "name": "section",
                    "level": 2,
                    "title": { "name": "text", "value": "Use" },
                    "blocks": [
                        {
                            "name": "orderedList",
                            "blocks": [
                                {
                                    "name": "paragraph",
                                    "blocks": [
                                        { "name": "text", "value": "Start it" },
                                        { "name": "orderedList", "blocks": [{ "name": "text", "value": "wait" }] }
                                    ]
                                },
                                { "name": "text", "value": "Stop it" }
                            ]
                        },
                        {
                            "name": "admonition",
                            "variant": "NOTE",
                            "blocks": [{ "name": "text", "value": "Widgets hum." }]
                        }
                    ]
                }
            ]
        }),
    );
}

#[test]
fn tables_and_description_lists() {
    let document = parse(
        "[cols=\"1,1\",options=\"header\"]
|===
|Name |Value
|a |1
|===

Term:: Definition
",
    )
    .unwrap();

    assert_tree(
        &document,
        &json!({
            "blocks": [
                {
                    "name": "table",
                    "options": { "cols": "1,1", "options": "header" },
                    "rows": [
                        [{ "name": "text", "value": "Name" }, { "name": "text", "value": "Value" }],
                        [{ "name": "text", "value": "a" }, { "name": "text", "value": "1" }]
                    ]
                },
                {
                    "name": "descriptionList",
                    "entries": [
                        [{ "name": "text", "value": "Term" }, { "name": "text", "value": "Definition" }]
                    ]
                }
            ]
        }),
    );
}

#[test]
fn includes_and_conditionals_in_the_body() {
    let resolver = MapResolver::new()
        .with("chapter.adoc", "== Chapter\n\nIncluded text.")
        .with("snippet.rb", "puts 1\nputs 2\nputs 3");
    let parser = Parser::new(ParserOptions::default().with_attribute("backend", "html5"));
    let document = parser
        .parse(
            "include::chapter.adoc[]

[source,ruby]
----
include::snippet.rb[lines=2..3]
----

ifdef::backend[]
Conditional text.
endif::[]
",
            Some(&resolver as &dyn ContentResolver),
        )
        .unwrap();

    assert_tree(
        &document,
        &json!({
            "blocks": [
                {
                    "name": "section",
                    "level": 2,
                    "title": { "name": "text", "value": "Chapter" },
                    "blocks": [{ "name": "text", "value": "Included text." }]
                },
                { "name": "code", "value": "puts 2\nputs 3", "options": { "language": "ruby" } },
                {
                    "name": "conditionalBlock",
                    "variant": "ifdef",
                    "blocks": [{ "name": "text", "value": "Conditional text." }]
                }
            ]
        }),
    );
}

#[test]
fn inline_macros_and_breaks() {
    let document = parse("Press kbd:[Ctrl+C] to copy. +\nSee <<setup,Setup>> and image:logo.png[Logo].").unwrap();

    assert_tree(
        &document,
        &json!({
            "blocks": [
                {
                    "name": "paragraph",
                    "blocks": [
                        { "name": "text", "value": "Press " },
                        { "name": "macro", "value": "kbd", "target": "", "form": "inline", "options": { "": "Ctrl+C" } },
                        { "name": "text", "value": " to copy." },
                        { "name": "lineBreak" },
                        { "name": "text", "value": "See " },
                        { "name": "anchor", "target": "setup", "label": "Setup" },
                        { "name": "text", "value": " and " },
                        { "name": "macro", "value": "image", "target": "logo.png", "form": "inline", "options": { "": "Logo" } },
                        { "name": "text", "value": "." }
                    ]
                }
            ]
        }),
    );
}
