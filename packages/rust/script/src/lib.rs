//! Script conversion pipeline.
//!
//! Transliterates plain text or HTML fragments from the source script into a
//! target script through a pluggable [`Transliterator`], then applies the
//! target's literal correction rules. Markup structure is never altered: only
//! non-whitespace text between tags is converted.
//!
//! Conversion never fails from the caller's point of view. Engine errors are
//! logged as warnings and the original text is kept.

mod bridge;
mod cache;
mod corrections;
mod markup;

use tracing::{trace, warn};

use tipitaka_shared::{Result, ScriptProfile};

pub use bridge::BridgeTransliterator;
pub use cache::CachedTransliterator;
pub use corrections::apply_corrections;
pub use markup::{Span, partition};

// ---------------------------------------------------------------------------
// Transliterator
// ---------------------------------------------------------------------------

/// A script-to-script conversion engine.
///
/// Treated as a pure function of its arguments; implementations may fail.
pub trait Transliterator {
    fn transliterate(&self, text: &str, source: &str, dest: &str) -> Result<String>;
}

impl<T: Transliterator + ?Sized> Transliterator for &T {
    fn transliterate(&self, text: &str, source: &str, dest: &str) -> Result<String> {
        (**self).transliterate(text, source, dest)
    }
}

impl<T: Transliterator + ?Sized> Transliterator for Box<T> {
    fn transliterate(&self, text: &str, source: &str, dest: &str) -> Result<String> {
        (**self).transliterate(text, source, dest)
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Converts text into one target script.
pub struct Converter<'a> {
    profile: ScriptProfile,
    engine: &'a dyn Transliterator,
}

impl<'a> Converter<'a> {
    pub fn new(profile: ScriptProfile, engine: &'a dyn Transliterator) -> Self {
        Self { profile, engine }
    }

    /// Script code this converter targets.
    pub fn code(&self) -> &str {
        &self.profile.code
    }

    /// Transliterate plain text and apply the profile's corrections.
    ///
    /// Blank input and the identity profile return `text` unchanged.
    pub fn convert_text(&self, text: &str) -> String {
        if text.trim().is_empty() || self.profile.is_identity() {
            return text.to_string();
        }

        match self
            .engine
            .transliterate(text, &self.profile.from, &self.profile.to)
        {
            Ok(converted) => apply_corrections(&converted, &self.profile.corrections),
            Err(e) => {
                warn!(
                    script = %self.profile.code,
                    text = %preview(text),
                    error = %e,
                    "transliteration failed, keeping original text"
                );
                text.to_string()
            }
        }
    }

    /// Convert the text between tags of an HTML fragment, leaving tags intact.
    ///
    /// Only text bordered by a tag is converted, so input without any tag is
    /// returned unchanged.
    pub fn convert_markup(&self, html: &str) -> String {
        if html.is_empty() || self.profile.is_identity() {
            return html.to_string();
        }

        let spans = partition(html);
        if !spans.iter().any(|s| matches!(s, Span::Tag(_))) {
            trace!(script = %self.profile.code, "no markup, leaving text unconverted");
            return html.to_string();
        }
        let mut out = String::with_capacity(html.len());
        for span in &spans {
            match span {
                Span::Tag(tag) => out.push_str(tag),
                Span::Text(text) if text.trim().is_empty() => out.push_str(text),
                Span::Text(text) => out.push_str(&self.convert_text(text)),
            }
        }

        if !markup::same_tags(&spans, &partition(&out)) {
            warn!(
                script = %self.profile.code,
                html = %preview(html),
                "converted text altered markup structure, keeping original"
            );
            return html.to_string();
        }

        trace!(script = %self.profile.code, spans = spans.len(), "markup converted");
        out
    }
}

/// First 30 characters of `text`, for log context.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(30).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use tipitaka_shared::{AppConfig, Correction, TipitakaError};

    /// Uppercases ASCII and counts calls; fails on text containing "FAIL".
    #[derive(Default)]
    pub(crate) struct Upper {
        pub calls: Cell<usize>,
    }

    impl Transliterator for Upper {
        fn transliterate(&self, text: &str, _source: &str, _dest: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            if text.contains("FAIL") {
                return Err(TipitakaError::Transliteration("engine refused".into()));
            }
            Ok(text.to_ascii_uppercase())
        }
    }

    /// Emits a stray `<` into its output.
    struct Injector;

    impl Transliterator for Injector {
        fn transliterate(&self, text: &str, _source: &str, _dest: &str) -> Result<String> {
            Ok(format!("<{text}"))
        }
    }

    fn target(corrections: Vec<Correction>) -> ScriptProfile {
        ScriptProfile {
            code: "romn".into(),
            from: "Burmese".into(),
            to: "IASTPali".into(),
            corrections,
        }
    }

    #[test]
    fn native_profile_is_identity_for_text_and_markup() {
        let engine = Upper::default();
        let profile = AppConfig::default().profile("mymr").unwrap();
        let converter = Converter::new(profile, &engine);

        for input in ["abc", "<p>abc</p>", "  ", "", "<b>x</b>tail", "no tags"] {
            assert_eq!(converter.convert_text(input), input);
            assert_eq!(converter.convert_markup(input), input);
        }
        assert_eq!(engine.calls.get(), 0);
    }

    #[test]
    fn blank_text_skips_engine() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(converter.convert_text("   \n"), "   \n");
        assert_eq!(converter.convert_text(""), "");
        assert_eq!(engine.calls.get(), 0);
    }

    #[test]
    fn corrections_apply_after_transliteration() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![Correction::new("..", ".")]), &engine);
        assert_eq!(converter.convert_text("end.. and.."), "END. AND.");
    }

    #[test]
    fn engine_failure_keeps_original_text() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![Correction::new("F", "x")]), &engine);
        assert_eq!(converter.convert_text("please FAIL"), "please FAIL");
        assert_eq!(engine.calls.get(), 1);
    }

    #[test]
    fn wrapped_text_converted_tag_unchanged() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(converter.convert_markup("<a>text</a>"), "<a>TEXT</a>");
        assert_eq!(
            converter.convert_markup(r#"<p class="bodytext">evam me</p>"#),
            r#"<p class="bodytext">EVAM ME</p>"#
        );
    }

    #[test]
    fn whitespace_spans_copied_verbatim() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(
            converter.convert_markup("<p>a</p>\n  <p>b</p>"),
            "<p>A</p>\n  <p>B</p>"
        );
        assert_eq!(engine.calls.get(), 2);
    }

    #[test]
    fn leading_and_trailing_runs_converted() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(converter.convert_markup("lead<br/>tail"), "LEAD<br/>TAIL");
        assert_eq!(converter.convert_markup("text<b class"), "TEXT<b class");
    }

    #[test]
    fn tagless_input_is_left_alone() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(converter.convert_markup("plain page text"), "plain page text");
        assert_eq!(converter.convert_markup("a > b"), "a > b");
        assert_eq!(engine.calls.get(), 0);
        // Plain labels still go through convert_text.
        assert_eq!(converter.convert_text("plain page text"), "PLAIN PAGE TEXT");
    }

    #[test]
    fn failing_span_keeps_its_text_only() {
        let engine = Upper::default();
        let converter = Converter::new(target(vec![]), &engine);
        assert_eq!(
            converter.convert_markup("<p>FAIL here</p><p>ok</p>"),
            "<p>FAIL here</p><p>OK</p>"
        );
    }

    #[test]
    fn structure_change_returns_original() {
        let converter = Converter::new(target(vec![]), &Injector);
        let html = "<p>abc</p>";
        assert_eq!(converter.convert_markup(html), html);
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(40);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(30)));
    }
}
