//! Memoizing transliterator decorator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::trace;

use tipitaka_shared::Result;

use crate::Transliterator;

/// Longest text (in characters) whose result is remembered.
const DEFAULT_MAX_TEXT_CHARS: usize = 256;

/// Memory budget for cached keys and values, in bytes.
const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;

type Key = (String, String, String);

#[derive(Default)]
struct Entries {
    map: HashMap<Key, String>,
    /// Insertion order, oldest first.
    order: VecDeque<Key>,
    bytes: usize,
}

/// Remembers successful results of an inner [`Transliterator`].
///
/// Only short texts are cached: TOC names and book abbreviations repeat
/// across every entry of a book, page bodies do not. The cache holds at most
/// `max_bytes` of keys and values and evicts the oldest entries first.
/// Failures are not cached.
pub struct CachedTransliterator<T> {
    inner: T,
    max_text_chars: usize,
    max_bytes: usize,
    entries: Mutex<Entries>,
}

impl<T: Transliterator> CachedTransliterator<T> {
    pub fn new(inner: T) -> Self {
        Self::with_limits(inner, DEFAULT_MAX_TEXT_CHARS, DEFAULT_MAX_BYTES)
    }

    fn with_limits(inner: T, max_text_chars: usize, max_bytes: usize) -> Self {
        Self {
            inner,
            max_text_chars,
            max_bytes,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held by cached keys and values.
    pub fn bytes(&self) -> usize {
        self.lock().bytes
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cacheable(&self, text: &str) -> bool {
        text.chars().nth(self.max_text_chars).is_none()
    }

    fn insert(&self, key: Key, value: String) {
        let size = entry_size(&key, &value);
        if size > self.max_bytes {
            return;
        }

        let mut entries = self.lock();
        if entries.map.contains_key(&key) {
            return;
        }
        while entries.bytes + size > self.max_bytes {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            if let Some(evicted) = entries.map.remove(&oldest) {
                entries.bytes -= entry_size(&oldest, &evicted);
                trace!(text = %oldest.0, "evicted cached transliteration");
            }
        }
        entries.bytes += size;
        entries.order.push_back(key.clone());
        entries.map.insert(key, value);
    }
}

fn entry_size(key: &Key, value: &str) -> usize {
    key.0.len() + key.1.len() + key.2.len() + value.len()
}

impl<T: Transliterator> Transliterator for CachedTransliterator<T> {
    fn transliterate(&self, text: &str, source: &str, dest: &str) -> Result<String> {
        if !self.cacheable(text) {
            return self.inner.transliterate(text, source, dest);
        }

        let key = (text.to_string(), source.to_string(), dest.to_string());
        if let Some(hit) = self.lock().map.get(&key) {
            return Ok(hit.clone());
        }

        let converted = self.inner.transliterate(text, source, dest)?;
        self.insert(key, converted.clone());
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::Upper;

    #[test]
    fn repeated_calls_hit_cache() {
        let cached = CachedTransliterator::new(Upper::default());
        assert_eq!(cached.transliterate("abc", "Burmese", "Thai").unwrap(), "ABC");
        assert_eq!(cached.transliterate("abc", "Burmese", "Thai").unwrap(), "ABC");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.into_inner().calls.get(), 1);
    }

    #[test]
    fn key_includes_target_script() {
        let cached = CachedTransliterator::new(Upper::default());
        cached.transliterate("abc", "Burmese", "Thai").unwrap();
        cached.transliterate("abc", "Burmese", "Khmer").unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cached = CachedTransliterator::new(Upper::default());
        assert!(cached.transliterate("FAIL", "Burmese", "Thai").is_err());
        assert!(cached.transliterate("FAIL", "Burmese", "Thai").is_err());
        assert!(cached.is_empty());
        assert_eq!(cached.into_inner().calls.get(), 2);
    }

    #[test]
    fn page_text_is_not_retained_across_books() {
        let cached = CachedTransliterator::new(Upper::default());
        for book in 0..50 {
            let page = format!("book {book} {}", "evam me sutam ".repeat(40));
            assert!(page.chars().count() > DEFAULT_MAX_TEXT_CHARS);
            let converted = cached.transliterate(&page, "Burmese", "Thai").unwrap();
            assert_eq!(converted, page.to_ascii_uppercase());
        }
        assert!(cached.is_empty());
        assert_eq!(cached.bytes(), 0);
        assert_eq!(cached.into_inner().calls.get(), 50);
    }

    #[test]
    fn byte_budget_evicts_oldest_first() {
        // Each entry: 2 + 7 + 4 + 2 = 15 bytes.
        let cached = CachedTransliterator::with_limits(Upper::default(), 16, 45);
        for label in ["a0", "a1", "a2", "a3", "a4"] {
            cached.transliterate(label, "Burmese", "Thai").unwrap();
        }
        assert_eq!(cached.len(), 3);
        assert!(cached.bytes() <= 45);

        // "a4" is still cached, "a0" was evicted.
        cached.transliterate("a4", "Burmese", "Thai").unwrap();
        cached.transliterate("a0", "Burmese", "Thai").unwrap();
        assert_eq!(cached.into_inner().calls.get(), 6);
    }
}
