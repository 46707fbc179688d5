//! Schema of the Tipitaka record store.
//!
//! Production databases already carry these tables; migrations only run when a
//! store is opened read-write (fixtures and tests). Every statement is
//! `IF NOT EXISTS` so applying them to an existing store is harmless.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Record tables: category, books, pages, tocs",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS category (
    id     TEXT PRIMARY KEY,
    name   TEXT,
    basket TEXT
);

CREATE TABLE IF NOT EXISTS books (
    id        TEXT PRIMARY KEY,
    basket    TEXT,
    category  TEXT,
    name      TEXT,
    firstpage INTEGER,
    lastpage  INTEGER,
    pagecount INTEGER,
    toc       TEXT,
    abbr      TEXT
);

CREATE TABLE IF NOT EXISTS pages (
    id      INTEGER PRIMARY KEY,
    bookid  TEXT,
    page    INTEGER,
    content TEXT,
    paranum TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_book_page ON pages(bookid, page);

CREATE TABLE IF NOT EXISTS tocs (
    book_id     TEXT,
    name        TEXT,
    type        TEXT,
    page_number INTEGER
);

CREATE INDEX IF NOT EXISTS idx_tocs_book ON tocs(book_id, page_number);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
