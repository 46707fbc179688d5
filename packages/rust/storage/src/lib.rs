//! libSQL access to the Tipitaka record store.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the `books`,
//! `pages`, `tocs`, and `category` tables. The builder only ever reads from
//! it, through the narrow [`RecordProvider`] capability.
//!
//! **Access rules:**
//! - Builds: read-only via [`Storage::open_readonly`]
//! - Fixtures and tests: read-write with schema creation via [`Storage::open`]

mod memory;
mod migrations;

use std::path::Path;

use libsql::{Connection, Database, params};
use tipitaka_shared::{BookRecord, CategoryRecord, PageRecord, Result, TipitakaError, TocEntry};

pub use memory::MemoryRecords;

/// Read-only, filtered access to the record collections.
///
/// Every list is returned in a deterministic order; callers rely on it for
/// document order.
#[allow(async_fn_in_trait)]
pub trait RecordProvider {
    /// All categories, ordered by id.
    async fn categories(&self) -> Result<Vec<CategoryRecord>>;

    /// Books of one basket, ordered by id.
    async fn books_in_basket(&self, basket: &str) -> Result<Vec<BookRecord>>;

    /// TOC entries of a book, ordered by page number then insertion order.
    async fn tocs_for_book(&self, book_id: &str) -> Result<Vec<TocEntry>>;

    /// Pages of a book with `start <= page < end_exclusive`, ascending.
    async fn pages_in_range(
        &self,
        book_id: &str,
        start: u32,
        end_exclusive: u32,
    ) -> Result<Vec<PageRecord>>;
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode, creating the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TipitakaError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TipitakaError::Storage(format!(
                "record store not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .flags(libsql::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .build()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        tracing::debug!(path = %path.display(), "opened record store read-only");

        Ok(Self { db, conn })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TipitakaError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

impl RecordProvider for Storage {
    async fn categories(&self) -> Result<Vec<CategoryRecord>> {
        let mut rows = self
            .conn
            .query("SELECT id, name, basket FROM category ORDER BY id", params![])
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?
        {
            results.push(CategoryRecord {
                id: get_text(&row, 0)?,
                name: row.get::<String>(1).unwrap_or_default(),
                basket: row.get::<String>(2).unwrap_or_default(),
            });
        }
        Ok(results)
    }

    async fn books_in_basket(&self, basket: &str) -> Result<Vec<BookRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, basket, category, name, firstpage, lastpage, pagecount, toc, abbr
                 FROM books WHERE basket = ?1 ORDER BY id",
                params![basket],
            )
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?
        {
            results.push(row_to_book(&row)?);
        }
        Ok(results)
    }

    async fn tocs_for_book(&self, book_id: &str) -> Result<Vec<TocEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT book_id, name, type, page_number FROM tocs
                 WHERE book_id = ?1 ORDER BY page_number, rowid",
                params![book_id],
            )
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?
        {
            results.push(TocEntry {
                book_id: get_text(&row, 0)?,
                name: row.get::<String>(1).unwrap_or_default(),
                kind: row.get::<String>(2).unwrap_or_default(),
                page_number: get_u32(&row, 3)?,
            });
        }
        Ok(results)
    }

    async fn pages_in_range(
        &self,
        book_id: &str,
        start: u32,
        end_exclusive: u32,
    ) -> Result<Vec<PageRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, bookid, page, content, paranum FROM pages
                 WHERE bookid = ?1 AND page >= ?2 AND page < ?3
                 ORDER BY page",
                params![book_id, start, end_exclusive],
            )
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| TipitakaError::Storage(e.to_string()))?
        {
            results.push(PageRecord {
                id: row
                    .get::<i64>(0)
                    .map_err(|e| TipitakaError::Storage(e.to_string()))?,
                book_id: get_text(&row, 1)?,
                page: get_u32(&row, 2)?,
                content: row.get::<String>(3).ok(),
                paranum: row.get::<String>(4).ok().filter(|p| !p.is_empty()),
            });
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn get_text(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| TipitakaError::Storage(format!("column {idx}: {e}")))
}

fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32> {
    let value = row
        .get::<i64>(idx)
        .map_err(|e| TipitakaError::Storage(format!("column {idx}: {e}")))?;
    u32::try_from(value)
        .map_err(|_| TipitakaError::Storage(format!("column {idx}: {value} is not a page number")))
}

/// Convert a `books` row to a [`BookRecord`].
fn row_to_book(row: &libsql::Row) -> Result<BookRecord> {
    Ok(BookRecord {
        id: get_text(row, 0)?,
        basket: row.get::<String>(1).unwrap_or_default(),
        category: row.get::<String>(2).unwrap_or_default(),
        name: row.get::<String>(3).unwrap_or_default(),
        first_page: get_u32(row, 4)?,
        last_page: get_u32(row, 5)?,
        page_count: row.get::<i64>(6).map(|v| v.max(0) as u32).unwrap_or(0),
        toc: row.get::<String>(7).ok(),
        abbr: row.get::<String>(8).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tipitaka_test_{}.db", Uuid::now_v7()))
    }

    /// Create a temp file storage seeded with one small book.
    async fn seeded_storage() -> Storage {
        let storage = Storage::open(&temp_db_path()).await.expect("open test db");
        storage
            .conn
            .execute_batch(
                r#"
INSERT INTO category (id, name, basket) VALUES ('di', 'Digha', 'mula');
INSERT INTO category (id, name, basket) VALUES ('vi', 'Vinaya', 'mula');
INSERT INTO books (id, basket, category, name, firstpage, lastpage, pagecount, toc, abbr)
    VALUES ('mula_di_01', 'mula', 'di', 'Silakkhandha', 1, 4, 4, 'chapter->One->1', 'DN1');
INSERT INTO books (id, basket, category, name, firstpage, lastpage, pagecount, toc, abbr)
    VALUES ('attha_di_01', 'attha', 'di', 'Commentary', 1, 2, 2, NULL, 'DNA1');
INSERT INTO pages (id, bookid, page, content, paranum) VALUES (1, 'mula_di_01', 1, '<p>a</p>', '1');
INSERT INTO pages (id, bookid, page, content, paranum) VALUES (2, 'mula_di_01', 2, NULL, NULL);
INSERT INTO pages (id, bookid, page, content, paranum) VALUES (3, 'mula_di_01', 3, '<p>c</p>', '');
INSERT INTO pages (id, bookid, page, content, paranum) VALUES (4, 'mula_di_01', 4, '<p>d</p>', '7');
INSERT INTO tocs (book_id, name, type, page_number) VALUES ('mula_di_01', 'Second', 'title', 3);
INSERT INTO tocs (book_id, name, type, page_number) VALUES ('mula_di_01', 'One', 'chapter', 1);
INSERT INTO tocs (book_id, name, type, page_number) VALUES ('mula_di_01', 'First', 'title', 1);
"#,
            )
            .await
            .expect("seed");
        storage
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = Storage::open(&temp_db_path()).await.expect("open");
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_db_path();
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let result = Storage::open_readonly(&temp_db_path()).await;
        let err = result.err().expect("missing store must fail");
        assert!(err.to_string().contains("record store not found"));
    }

    #[tokio::test]
    async fn readonly_reads_seeded_store() {
        let tmp = temp_db_path();
        {
            let rw = Storage::open(&tmp).await.unwrap();
            rw.conn
                .execute(
                    "INSERT INTO books
                         (id, basket, category, name, firstpage, lastpage, pagecount, toc, abbr)
                     VALUES ('b1', 'mula', 'vi', 'Book', 1, 10, 10, NULL, 'B1')",
                    params![],
                )
                .await
                .unwrap();
        }
        let ro = Storage::open_readonly(&tmp).await.expect("open readonly");
        let books = ro.books_in_basket("mula").await.expect("books");
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].toc, None);
    }

    #[tokio::test]
    async fn books_filtered_by_basket() {
        let storage = seeded_storage().await;
        let books = storage.books_in_basket("mula").await.expect("books");
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.id, "mula_di_01");
        assert_eq!(book.category, "di");
        assert_eq!((book.first_page, book.last_page), (1, 4));
        assert_eq!(book.toc.as_deref(), Some("chapter->One->1"));
        assert_eq!(book.abbr, "DN1");

        assert!(storage.books_in_basket("attha").await.unwrap()[0].toc.is_none());
        assert!(storage.books_in_basket("tika").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn categories_ordered_by_id() {
        let storage = seeded_storage().await;
        let ids: Vec<String> = storage
            .categories()
            .await
            .expect("categories")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["di", "vi"]);
    }

    #[tokio::test]
    async fn tocs_ordered_by_page_then_insertion() {
        let storage = seeded_storage().await;
        let names: Vec<String> = storage
            .tocs_for_book("mula_di_01")
            .await
            .expect("tocs")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["One", "First", "Second"]);
    }

    #[tokio::test]
    async fn pages_in_half_open_range() {
        let storage = seeded_storage().await;
        let pages = storage
            .pages_in_range("mula_di_01", 2, 4)
            .await
            .expect("pages");
        let numbers: Vec<u32> = pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert_eq!(pages[0].content, None);
        // Empty paranum strings are treated as absent.
        assert_eq!(pages[1].paranum, None);

        let all = storage.pages_in_range("mula_di_01", 1, 5).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].paranum.as_deref(), Some("7"));
    }
}
