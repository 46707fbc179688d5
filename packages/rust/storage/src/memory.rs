//! In-memory [`RecordProvider`] for fixtures and tests.

use tipitaka_shared::{BookRecord, CategoryRecord, PageRecord, Result, TocEntry};

use crate::RecordProvider;

/// Record collections held in memory, answering the same filtered queries as
/// [`crate::Storage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRecords {
    pub categories: Vec<CategoryRecord>,
    pub books: Vec<BookRecord>,
    /// Kept in insertion order; queries sort stably by page number.
    pub tocs: Vec<TocEntry>,
    pub pages: Vec<PageRecord>,
}

impl RecordProvider for MemoryRecords {
    async fn categories(&self) -> Result<Vec<CategoryRecord>> {
        let mut categories = self.categories.clone();
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(categories)
    }

    async fn books_in_basket(&self, basket: &str) -> Result<Vec<BookRecord>> {
        let mut books: Vec<BookRecord> = self
            .books
            .iter()
            .filter(|b| b.basket == basket)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(books)
    }

    async fn tocs_for_book(&self, book_id: &str) -> Result<Vec<TocEntry>> {
        let mut tocs: Vec<TocEntry> = self
            .tocs
            .iter()
            .filter(|t| t.book_id == book_id)
            .cloned()
            .collect();
        tocs.sort_by_key(|t| t.page_number);
        Ok(tocs)
    }

    async fn pages_in_range(
        &self,
        book_id: &str,
        start: u32,
        end_exclusive: u32,
    ) -> Result<Vec<PageRecord>> {
        let mut pages: Vec<PageRecord> = self
            .pages
            .iter()
            .filter(|p| p.book_id == book_id && p.page >= start && p.page < end_exclusive)
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.page);
        Ok(pages)
    }
}
