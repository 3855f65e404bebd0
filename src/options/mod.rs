//! Bracket option lists and `:name: value` attribute definitions.
//!
//! Both are context-free: the block dispatcher and the inline scanner call in
//! here with a single line (or the content of a bracket) and get a map back.

mod lexer;

use std::borrow::Cow;

use crate::asg::{Attributes, Options};
use crate::reader::LineCursor;
use lexer::OptionToken;

/// Leading block style tokens: `(style, role, key for the next positional value)`.
const BLOCK_STYLES: [(&str, Option<&str>, &str); 4] = [
    ("source", None, "language"),
    ("example", Some("exampleblock"), ""),
    ("verse", Some("verseblock"), ""),
    ("quote", Some("quoteblock"), "attribution"),
];

/// Key of the comma separated flag list (`opts=header,footer` or `%header`).
const OPTS_KEY: &str = "opts";

/// Parse the content of a bracket option list, without the brackets.
///
/// Positional values go under the empty key, except after a leading block
/// style (`source`, `example`, `verse`, `quote`) which selects both a role and
/// the key of the next positional value (`language` for `source`,
/// `attribution` for `quote`).
#[must_use]
pub fn parse_options(raw: &str) -> Options {
    let raw = raw.trim();
    for (style, role, default_key) in BLOCK_STYLES {
        let rest = if raw == style {
            Some("")
        } else {
            raw.strip_prefix(style).and_then(|rest| rest.strip_prefix(','))
        };
        let Some(rest) = rest else {
            continue;
        };
        let parsed = parse_option_list(rest, default_key);
        return match role {
            Some(role) => {
                let mut options = Options::new();
                options.insert("role".to_string(), role.to_string());
                for (key, value) in parsed {
                    if key == "role" {
                        append_role(&mut options, &value);
                    } else {
                        options.insert(key, value);
                    }
                }
                options
            }
            None => parsed,
        };
    }
    parse_option_list(raw, "")
}

/// Parse an option list whose positional values go to `default_key`.
#[must_use]
pub fn parse_option_list(raw: &str, default_key: &str) -> Options {
    let mut options = Options::new();
    let mut entry = Entry::default();
    for token in lexer::lex(raw) {
        match token {
            OptionToken::Comma => entry.flush(default_key, &mut options),
            OptionToken::Eq => match entry.value.as_mut() {
                Some(value) => value.push('='),
                None => entry.value = Some(String::new()),
            },
            OptionToken::Quoted(text) => {
                if entry.value.is_none() {
                    entry.quoted = true;
                }
                entry.push(text);
            }
            OptionToken::Text(text) => entry.push(text),
        }
    }
    entry.flush(default_key, &mut options);

    if let Some(nested) = options.get(OPTS_KEY).cloned() {
        let mut flags = Vec::new();
        for part in nested.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((key, value)) => {
                    options
                        .entry(key.trim().to_string())
                        .or_insert_with(|| value.trim().to_string());
                }
                None => flags.push(part),
            }
        }
        options.insert(OPTS_KEY.to_string(), flags.join(","));
    }
    options
}

/// Whether `flag` is set either as its own key or in the `opts` list.
#[must_use]
pub fn has_flag(options: &Options, flag: &str) -> bool {
    options.contains_key(flag)
        || options
            .get(OPTS_KEY)
            .is_some_and(|opts| opts.split(',').any(|f| f.trim() == flag))
}

/// Copy entries of `extra` whose keys are absent from `target`.
pub fn merge_missing(target: &mut Options, extra: &Options) {
    for (key, value) in extra {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Default)]
struct Entry {
    key: String,
    value: Option<String>,
    quoted: bool,
}

impl Entry {
    fn push(&mut self, text: &str) {
        match self.value.as_mut() {
            Some(value) => value.push_str(text),
            None => self.key.push_str(text),
        }
    }

    fn flush(&mut self, default_key: &str, options: &mut Options) {
        let Entry { key, value, quoted } = std::mem::take(self);
        let key = key.trim();
        match value {
            Some(value) => {
                if !key.is_empty() {
                    options.insert(key.to_string(), value.trim().to_string());
                }
            }
            None if key.is_empty() => {}
            None if !quoted && key.starts_with(['.', '#', '%']) => apply_shorthand(key, options),
            None => {
                if !options.contains_key(default_key) {
                    options.insert(default_key.to_string(), key.to_string());
                }
            }
        }
    }
}

/// `.role`, `#id` and `%flag` shorthands, possibly chained (`#intro.lead%header`).
fn apply_shorthand(token: &str, options: &mut Options) {
    let mut rest = token;
    while let Some(sigil) = rest.chars().next() {
        let body = &rest[sigil.len_utf8()..];
        let end = body.find(['.', '#', '%']).unwrap_or(body.len());
        let name = &body[..end];
        if !name.is_empty() {
            match sigil {
                '.' => append_role(options, name),
                '#' => {
                    options.insert("id".to_string(), name.to_string());
                }
                _ => append_flag(options, name),
            }
        }
        rest = &body[end..];
    }
}

fn append_role(options: &mut Options, role: &str) {
    match options.get_mut("role") {
        Some(existing) if !existing.is_empty() => {
            existing.push(' ');
            existing.push_str(role);
        }
        _ => {
            options.insert("role".to_string(), role.to_string());
        }
    }
}

fn append_flag(options: &mut Options, flag: &str) {
    match options.get_mut(OPTS_KEY) {
        Some(existing) if !existing.is_empty() => {
            existing.push(',');
            existing.push_str(flag);
        }
        _ => {
            options.insert(OPTS_KEY.to_string(), flag.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute definitions
// ---------------------------------------------------------------------------

/// A parsed `:name: value` (or `:name!:`) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDefinition {
    /// `:name: value`
    Set {
        /// Attribute name.
        name: String,
        /// Trimmed value, empty for `:name:`.
        value: String,
    },
    /// `:name!:` or `:!name:`
    Unset {
        /// Attribute name.
        name: String,
    },
}

/// Recognize a single attribute definition line.
#[must_use]
pub fn parse_attribute_definition(line: &str) -> Option<AttributeDefinition> {
    let rest = line.trim_start().strip_prefix(':')?;
    let end = rest.find(':')?;
    let raw_name = &rest[..end];
    let tail = &rest[end + 1..];
    let value = if tail.trim().is_empty() {
        ""
    } else if tail.starts_with([' ', '\t']) {
        tail.trim()
    } else {
        return None;
    };

    let (name, unset) = match (raw_name.strip_prefix('!'), raw_name.strip_suffix('!')) {
        (Some(name), _) | (None, Some(name)) => (name, true),
        (None, None) => (raw_name, false),
    };
    if !is_attribute_name(name) {
        return None;
    }
    Some(if unset {
        AttributeDefinition::Unset {
            name: name.to_string(),
        }
    } else {
        AttributeDefinition::Set {
            name: name.to_string(),
            value: value.to_string(),
        }
    })
}

/// Like [`parse_attribute_definition`], consuming `\`-continued value lines from `cursor`.
pub fn read_attribute_definition(
    cursor: &mut LineCursor,
    line: &str,
) -> Option<AttributeDefinition> {
    let definition = parse_attribute_definition(line)?;
    let AttributeDefinition::Set { name, mut value } = definition else {
        return Some(definition);
    };
    while let Some(head) = value.strip_suffix('\\') {
        let head = head.trim_end().to_string();
        match cursor.next_line() {
            Some(next) => {
                value = if head.is_empty() {
                    next.trim().to_string()
                } else {
                    format!("{head} {}", next.trim())
                };
            }
            None => {
                value = head;
                break;
            }
        }
    }
    Some(AttributeDefinition::Set { name, value })
}

/// Apply a definition to `attributes`.
///
/// A `+N`/`-N` value on an attribute holding an integer shifts it by `N`.
pub fn apply_attribute_definition(attributes: &mut Attributes, definition: AttributeDefinition) {
    match definition {
        AttributeDefinition::Unset { name } => {
            attributes.shift_remove(&name);
        }
        AttributeDefinition::Set { name, value } => {
            let shifted = if value.starts_with(['+', '-']) {
                attributes
                    .get(&name)
                    .and_then(|current| current.trim().parse::<i64>().ok())
                    .zip(value.parse::<i64>().ok())
                    .and_then(|(current, delta)| current.checked_add(delta))
                    .map(|sum| sum.to_string())
            } else {
                None
            };
            attributes.insert(name, shifted.unwrap_or(value));
        }
    }
}

/// Attribute names are word characters and dashes, not starting with a dash.
#[must_use]
pub fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Replace every `{name}` whose value `lookup` knows. `\{name}` is left alone.
pub fn substitute_attributes<'a>(
    line: &'a str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Cow<'a, str> {
    if !line.contains('{') {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    let mut search = 0;
    let mut changed = false;
    while let Some(found) = line[search..].find('{') {
        let open = search + found;
        search = open + 1;
        if open > 0 && line.as_bytes()[open - 1] == b'\\' {
            continue;
        }
        let Some(len) = line[open + 1..].find('}') else {
            break;
        };
        let name = &line[open + 1..open + 1 + len];
        if !is_attribute_name(name) {
            continue;
        }
        if let Some(value) = lookup(name) {
            out.push_str(&line[copied..open]);
            out.push_str(&value);
            copied = open + len + 2;
            search = copied;
            changed = true;
        }
    }
    if !changed {
        return Cow::Borrowed(line);
    }
    out.push_str(&line[copied..]);
    Cow::Owned(out)
}
