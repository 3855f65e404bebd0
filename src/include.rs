//! `include::target[options]` expansion.
//!
//! The parser never touches the file system itself: include targets are
//! handed to a [`ContentResolver`]. [`FsResolver`] reads files relative to a
//! base directory, [`MapResolver`] serves in-memory documents, and any
//! `Fn(&str, Option<&str>) -> Option<Vec<String>>` closure works as well.
//!
//! Once resolved, the lines go through the option transforms in order:
//! `lines=`, `tag=`/`tags=`, `leveloffset=`, `indent=`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::asg::{Macro, Options};
use crate::error::{ErrorKind, ParseError, ParseResult};
use crate::options::has_flag;

/// Supplies the content of include targets.
pub trait ContentResolver {
    /// Lines of `reference`, `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Any failure other than absence (permissions, decoding, ...).
    fn resolve(&self, reference: &str, encoding: Option<&str>) -> io::Result<Option<Vec<String>>>;
}

impl<F> ContentResolver for F
where
    F: Fn(&str, Option<&str>) -> Option<Vec<String>>,
{
    fn resolve(&self, reference: &str, encoding: Option<&str>) -> io::Result<Option<Vec<String>>> {
        Ok(self(reference, encoding))
    }
}

/// Resolves targets as paths relative to a base directory.
///
/// Supports UTF-8 (the default) and ISO-8859-1 content.
#[derive(Debug, Clone)]
pub struct FsResolver {
    base: PathBuf,
}

impl FsResolver {
    /// Resolve relative targets against `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ContentResolver for FsResolver {
    fn resolve(&self, reference: &str, encoding: Option<&str>) -> io::Result<Option<Vec<String>>> {
        let path = Path::new(reference);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };
        if !resolved.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&resolved)?;
        let text = decode(bytes, encoding)?;
        Ok(Some(text.lines().map(str::to_string).collect()))
    }
}

fn decode(bytes: Vec<u8>, encoding: Option<&str>) -> io::Result<String> {
    let encoding = encoding.map(str::to_ascii_lowercase);
    match encoding.as_deref() {
        None | Some("utf-8" | "utf8") => {
            String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
        Some("iso-8859-1" | "latin1" | "latin-1") => {
            Ok(bytes.into_iter().map(char::from).collect())
        }
        Some(other) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unsupported encoding '{other}'"),
        )),
    }
}

/// In-memory resolver keyed by target.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    entries: HashMap<String, String>,
}

impl MapResolver {
    /// An empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `content` for `reference`.
    #[must_use]
    pub fn with(mut self, reference: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(reference, content);
        self
    }

    /// Register `content` for `reference`, replacing any previous entry.
    pub fn insert(&mut self, reference: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(reference.into(), content.into());
    }
}

impl ContentResolver for MapResolver {
    fn resolve(&self, reference: &str, _encoding: Option<&str>) -> io::Result<Option<Vec<String>>> {
        Ok(self
            .entries
            .get(reference)
            .map(|content| content.lines().map(str::to_string).collect()))
    }
}

/// Resolve an `include` macro and apply its transforms.
///
/// # Errors
///
/// `MissingInclude` when the target does not resolve (and `optional` is not
/// set) or no resolver is available, `Io` when the resolver fails,
/// `UnsupportedLineRange` for a malformed `lines=` entry.
pub fn expand(
    include: &Macro,
    resolver: Option<&dyn ContentResolver>,
    default_encoding: Option<&str>,
) -> ParseResult<Vec<String>> {
    let target = include.label.as_str();
    let options = &include.options;
    let encoding = options
        .get("encoding")
        .map(String::as_str)
        .or(default_encoding);

    let resolved = match resolver {
        Some(resolver) => resolver
            .resolve(target, encoding)
            .map_err(|source| {
                ParseError::new(ErrorKind::Io {
                    target: target.to_string(),
                    source,
                })
            })?,
        None => None,
    };
    let Some(mut lines) = resolved else {
        if has_flag(options, "optional") {
            tracing::warn!(reference = target, "optional include not found, skipping");
            return Ok(Vec::new());
        }
        return Err(ParseError::new(ErrorKind::MissingInclude {
            target: target.to_string(),
        }));
    };
    tracing::debug!(reference = target, lines = lines.len(), "resolved include");

    if let Some(ranges) = options.get("lines").filter(|v| !v.trim().is_empty()) {
        lines = select_lines(&lines, ranges)?;
    }
    if let Some(tags) = options.get("tag").or_else(|| options.get("tags")) {
        lines = select_tags(&lines, tags);
    }
    if let Some(offset) = options.get("leveloffset") {
        match offset.trim().parse::<i64>() {
            Ok(offset) => lines = shift_sections(lines, offset),
            Err(_) => tracing::warn!(reference = target, leveloffset = %offset, "ignoring invalid include leveloffset"),
        }
    }
    if let Some(indent) = options.get("indent") {
        match indent.trim().parse::<usize>() {
            Ok(indent) => lines = reindent(&lines, indent),
            Err(_) => tracing::warn!(reference = target, indent = %indent, "ignoring invalid include indent"),
        }
    }
    Ok(lines)
}

/// Keep the 1-based lines named by `ranges` (`3`, `2..5`, `4..-1`, separated by `,` or `;`).
pub(crate) fn select_lines(lines: &[String], ranges: &str) -> ParseResult<Vec<String>> {
    let unsupported = |entry: &str| {
        ParseError::new(ErrorKind::UnsupportedLineRange {
            range: entry.to_string(),
        })
    };
    let mut selected = Vec::new();
    for entry in ranges.split([',', ';']).map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once("..") {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| unsupported(entry))?;
                let end = match end.trim() {
                    "" | "-1" => lines.len(),
                    end => end.parse::<usize>().map_err(|_| unsupported(entry))?,
                };
                let from = start.saturating_sub(1);
                let to = end.min(lines.len());
                if from < to {
                    selected.extend_from_slice(&lines[from..to]);
                }
            }
            None => {
                let line: usize = entry.parse().map_err(|_| unsupported(entry))?;
                if let Some(found) = line.checked_sub(1).and_then(|index| lines.get(index)) {
                    selected.push(found.clone());
                }
            }
        }
    }
    Ok(selected)
}

/// Keep the regions between `tag::NAME[]` and `end::NAME[]` comment markers, in the requested order.
pub(crate) fn select_tags(lines: &[String], tags: &str) -> Vec<String> {
    let mut selected = Vec::new();
    for tag in tags.split([',', ';']).map(str::trim).filter(|t| !t.is_empty()) {
        let Some(from) = lines
            .iter()
            .position(|line| tag_marker(line) == Some(("tag", tag)))
        else {
            tracing::debug!(tag, "include tag not found");
            continue;
        };
        let to = lines[from + 1..]
            .iter()
            .position(|line| tag_marker(line) == Some(("end", tag)))
            .map_or(lines.len(), |offset| from + 1 + offset);
        selected.extend(
            lines[from + 1..to]
                .iter()
                .filter(|line| tag_marker(line).is_none())
                .cloned(),
        );
    }
    selected
}

/// `(kind, name)` of a `# tag::name[]` or `// end::name[]` line.
fn tag_marker(line: &str) -> Option<(&str, &str)> {
    let body = line.trim().strip_suffix("[]")?;
    ["tag", "end"].into_iter().find_map(|kind| {
        let at = body.rfind(&format!("{kind}::"))?;
        let prefix = body[..at].trim();
        let name = &body[at + kind.len() + 2..];
        let is_comment = !prefix.is_empty() && !prefix.chars().any(char::is_alphanumeric);
        (is_comment && !name.is_empty()).then_some((kind, name))
    })
}

/// Largest `leveloffset` applied to included sections.
const MAX_LEVEL_OFFSET: usize = 32;

/// Largest `indent` applied to included lines.
const MAX_INDENT: usize = 256;

/// Add `offset` `=` to every section header line, up to [`MAX_LEVEL_OFFSET`].
/// Non-positive offsets are ignored.
pub(crate) fn shift_sections(lines: Vec<String>, offset: i64) -> Vec<String> {
    let Ok(offset) = usize::try_from(offset) else {
        return lines;
    };
    let offset = offset.min(MAX_LEVEL_OFFSET);
    if offset == 0 {
        return lines;
    }
    let prefix = "=".repeat(offset);
    lines
        .into_iter()
        .map(|line| {
            if is_section_line(&line) {
                format!("{prefix}{line}")
            } else {
                line
            }
        })
        .collect()
}

fn is_section_line(line: &str) -> bool {
    let level = line.chars().take_while(|c| *c == '=').count();
    level > 0 && line[level..].starts_with(' ')
}

/// Strip the common leading indentation then indent by `indent` spaces,
/// up to [`MAX_INDENT`].
pub(crate) fn reindent(lines: &[String], indent: usize) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    let padding = " ".repeat(indent.min(MAX_INDENT));
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                return String::new();
            }
            // Indentation is counted in chars, whitespace may be multibyte.
            let start = line.char_indices().nth(common).map_or(line.len(), |(i, _)| i);
            format!("{padding}{}", line[start..].trim_end())
        })
        .collect()
}

/// An include macro as seen by the expander.
#[must_use]
pub fn include_macro(target: impl Into<String>, options: Options) -> Macro {
    Macro {
        name: "include".to_string(),
        label: target.into(),
        options,
        inline: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::parse_options;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn include(target: &str, options: &str) -> Macro {
        include_macro(target, parse_options(options))
    }

    #[test]
    fn line_ranges() {
        let src = lines(&["a", "b", "c", "d"]);
        assert_eq!(select_lines(&src, "2..3").unwrap(), ["b", "c"]);
        assert_eq!(select_lines(&src, "1;4").unwrap(), ["a", "d"]);
        assert_eq!(select_lines(&src, "3..-1").unwrap(), ["c", "d"]);
        assert_eq!(select_lines(&src, "3..10").unwrap(), ["c", "d"]);
        assert!(select_lines(&src, "9").unwrap().is_empty());
    }

    #[test]
    fn bad_line_range() {
        let err = select_lines(&lines(&["a"]), "one..two").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedLineRange { ref range } if range == "one..two"));
    }

    #[test]
    fn tagged_regions() {
        let src = lines(&[
            "header",
            "# tag::a[]",
            "first",
            "// tag::b[]",
            "second",
            "// end::b[]",
            "# end::a[]",
            "trailer",
        ]);
        assert_eq!(select_tags(&src, "a"), ["first", "second"]);
        assert_eq!(select_tags(&src, "b,a"), ["second", "first", "second"]);
        assert!(select_tags(&src, "missing").is_empty());
    }

    #[test]
    fn tag_marker_needs_comment_prefix() {
        assert_eq!(tag_marker("# tag::x[]"), Some(("tag", "x")));
        assert_eq!(tag_marker("text tag::x[]"), None);
    }

    #[test]
    fn level_offset_only_positive() {
        let src = lines(&["= Title", "text", "== Sub"]);
        assert_eq!(
            shift_sections(src.clone(), 1),
            ["== Title", "text", "=== Sub"]
        );
        assert_eq!(shift_sections(src.clone(), -1), src);
        let shifted = shift_sections(src, 1_000_000_000_000);
        assert_eq!(shifted[0].len(), "= Title".len() + MAX_LEVEL_OFFSET);
    }

    #[test]
    fn indentation() {
        let src = lines(&["    a", "      b", "", "    c  "]);
        assert_eq!(reindent(&src, 2), ["  a", "    b", "", "  c"]);
        assert_eq!(reindent(&src, 0), ["a", "  b", "", "c"]);
        assert_eq!(reindent(&lines(&["a"]), usize::MAX)[0].len(), MAX_INDENT + 1);
    }

    #[test]
    fn multibyte_indentation() {
        let src = lines(&["\u{a0}x", " y"]);
        assert_eq!(reindent(&src, 0), ["x", "y"]);
        let src = lines(&["\u{3000}\u{3000}a", "\u{3000}\u{3000} b"]);
        assert_eq!(reindent(&src, 1), [" a", "  b"]);
    }

    #[test]
    fn missing_include() {
        let resolver = MapResolver::new();
        let err = expand(&include("nope.adoc", ""), Some(&resolver), None).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingInclude { ref target } if target == "nope.adoc"));
    }

    #[test]
    fn missing_optional_include() {
        let resolver = MapResolver::new();
        assert!(expand(&include("nope.adoc", "opts=optional"), Some(&resolver), None)
            .unwrap()
            .is_empty());
        assert!(expand(&include("nope.adoc", "%optional"), None, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn no_resolver_is_missing() {
        assert!(expand(&include("a.adoc", ""), None, None).is_err());
    }

    #[test]
    fn closure_resolver_receives_encoding() {
        let resolver = |reference: &str, encoding: Option<&str>| {
            Some(vec![format!("{reference}:{}", encoding.unwrap_or("none"))])
        };
        assert_eq!(
            expand(&include("x", "encoding=latin1"), Some(&resolver), Some("UTF-8")).unwrap(),
            ["x:latin1"]
        );
        assert_eq!(
            expand(&include("x", ""), Some(&resolver), Some("UTF-8")).unwrap(),
            ["x:UTF-8"]
        );
    }

    #[test]
    fn transforms_apply_in_order() {
        let resolver = MapResolver::new().with("doc.adoc", "= A\n  text\n  more\n== B");
        assert_eq!(
            expand(
                &include("doc.adoc", "lines=1..3,leveloffset=+1,indent=0"),
                Some(&resolver),
                None
            )
            .unwrap(),
            ["== A", "  text", "  more"]
        );
    }

    #[test]
    fn fs_resolver_reads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part.adoc"), "one\ntwo\n").unwrap();
        let resolver = FsResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("part.adoc", None).unwrap(),
            Some(lines(&["one", "two"]))
        );
        assert_eq!(resolver.resolve("absent.adoc", None).unwrap(), None);
        assert!(resolver.resolve("part.adoc", Some("EBCDIC")).is_err());
    }

    #[test]
    fn latin1_decoding() {
        assert_eq!(decode(vec![0x63, 0x61, 0x66, 0xE9], Some("ISO-8859-1")).unwrap(), "café");
    }
}
