//! Tag/text partitioning of HTML fragments.
//!
//! A tag-span runs from `<` to the next `>` inclusive, or to the end of input
//! when unterminated. Everything between tag-spans is a text-span. Joining the
//! spans in order always reproduces the input exactly.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("valid regex"));

/// A slice of an HTML fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    /// Bracketed markup, copied verbatim.
    Tag(&'a str),
    /// Text between tags.
    Text(&'a str),
}

/// Split `html` into alternating tag and text spans. Empty spans are omitted.
pub fn partition(html: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for m in TAG_RE.find_iter(html) {
        if m.start() > cursor {
            spans.push(Span::Text(&html[cursor..m.start()]));
        }
        spans.push(Span::Tag(m.as_str()));
        cursor = m.end();
    }
    if cursor < html.len() {
        spans.push(Span::Text(&html[cursor..]));
    }

    spans
}

/// True when both span lists carry the same tags in the same order.
pub(crate) fn same_tags(a: &[Span<'_>], b: &[Span<'_>]) -> bool {
    let tags = |spans: &[Span<'_>]| -> Vec<String> {
        spans
            .iter()
            .filter_map(|s| match s {
                Span::Tag(t) => Some((*t).to_string()),
                Span::Text(_) => None,
            })
            .collect()
    };
    tags(a) == tags(b)
}
