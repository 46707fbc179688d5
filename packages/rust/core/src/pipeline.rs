//! End-to-end `build` pipeline: record store → per-script document trees.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use tracing::{debug, info, instrument};

use tipitaka_script::{Converter, Transliterator};
use tipitaka_shared::{
    AppConfig, BookRecord, ChapterRange, LabelsConfig, LayoutConfig, PageRecord, Result,
    ScriptProfile, TipitakaError,
};
use tipitaka_storage::RecordProvider;

use crate::chapters::{self, ChapterBody};
use crate::hierarchy;
use crate::layout;
use crate::materializer::{self, MaterializeStats};

/// Which TOC drives the generated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// `tocs` table → nested index documents.
    #[default]
    Hierarchy,
    /// Legacy inline TOC → chapter documents plus one document per page.
    Chapters,
}

impl FromStr for BuildMode {
    type Err = TipitakaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hierarchy" => Ok(Self::Hierarchy),
            "chapters" => Ok(Self::Chapters),
            other => Err(TipitakaError::config(format!(
                "unknown build mode '{other}' (expected 'hierarchy' or 'chapters')"
            ))),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hierarchy => "hierarchy",
            Self::Chapters => "chapters",
        })
    }
}

/// Configuration for the `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the generated tree; one subdirectory per script.
    pub output_root: PathBuf,
    pub mode: BuildMode,
    /// Basket whose books are generated.
    pub basket: String,
    /// Target scripts, in build order.
    pub scripts: Vec<ScriptProfile>,
    pub layout: LayoutConfig,
    pub labels: LabelsConfig,
    /// Book ids or abbreviations to build; empty builds every book.
    pub books: Vec<String>,
    /// Remove each script root before building.
    pub clean: bool,
}

impl BuildConfig {
    /// Derive a build configuration from the app config.
    ///
    /// `scripts` restricts the build to those codes; empty selects all of them.
    pub fn from_app_config(app: &AppConfig, scripts: &[String]) -> Result<Self> {
        let codes = if scripts.is_empty() {
            app.script_codes()
        } else {
            scripts.to_vec()
        };
        let profiles = codes
            .iter()
            .map(|code| app.profile(code))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            output_root: PathBuf::from(&app.defaults.output_dir),
            mode: app.defaults.mode.parse()?,
            basket: app.defaults.basket.clone(),
            scripts: profiles,
            layout: app.layout.clone(),
            labels: app.labels.clone(),
            books: Vec::new(),
            clean: false,
        })
    }

    fn wants(&self, book: &BookRecord) -> bool {
        self.books.is_empty() || self.books.iter().any(|b| *b == book.id || *b == book.abbr)
    }
}

/// Result of the `build` pipeline.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub scripts: usize,
    /// Books that produced documents.
    pub books: usize,
    /// Books skipped for lack of TOC entries.
    pub books_skipped: usize,
    pub units_created: usize,
    pub units_already_present: usize,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a book is processed.
    fn book_started(&self, abbr: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn book_started(&self, _abbr: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Run the full `build` pipeline.
///
/// 1. Prepare (and optionally clean) each script root
/// 2. Load the basket's books
/// 3. Per book, resolve its TOC once and materialize it for every script
#[instrument(skip_all, fields(mode = %config.mode, scripts = config.scripts.len()))]
pub async fn build<P: RecordProvider>(
    config: &BuildConfig,
    provider: &P,
    engine: &dyn Transliterator,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();
    info!(output = %config.output_root.display(), basket = %config.basket, "starting build");

    // --- Phase 1: Script roots ---
    progress.phase("Preparing script roots");
    for profile in &config.scripts {
        let root = layout::script_root(&config.output_root, &profile.code);
        if config.clean {
            layout::clean_script_root(&root)?;
        }
        layout::prepare_script_root(&root, &config.layout)?;
    }

    // --- Phase 2: Books ---
    progress.phase("Loading books");
    let books: Vec<BookRecord> = provider
        .books_in_basket(&config.basket)
        .await?
        .into_iter()
        .filter(|b| config.wants(b))
        .collect();
    info!(books = books.len(), "books selected");

    let converters: Vec<Converter<'_>> = config
        .scripts
        .iter()
        .map(|p| Converter::new(p.clone(), engine))
        .collect();

    // --- Phase 3: Materialize ---
    progress.phase("Writing documents");
    let mut report = BuildReport {
        scripts: converters.len(),
        ..Default::default()
    };
    let mut totals = MaterializeStats::default();

    for (i, book) in books.iter().enumerate() {
        progress.book_started(&book.abbr, i + 1, books.len());
        let stats = match config.mode {
            BuildMode::Hierarchy => {
                build_hierarchy_book(config, provider, book, &converters).await?
            }
            BuildMode::Chapters => {
                build_chapter_book(config, provider, book, &converters).await?
            }
        };
        match stats {
            Some(stats) => {
                report.books += 1;
                totals.merge(stats);
            }
            None => report.books_skipped += 1,
        }
    }

    report.units_created = totals.created;
    report.units_already_present = totals.already_present;
    report.elapsed = start.elapsed();

    info!(
        books = report.books,
        skipped = report.books_skipped,
        created = report.units_created,
        present = report.units_already_present,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "build complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Root directory of `book` in the tree of `converter`'s script, plus the
/// converted abbreviation naming it.
fn book_root(
    config: &BuildConfig,
    book: &BookRecord,
    converter: &Converter<'_>,
) -> (PathBuf, String) {
    let abbr = converter.convert_text(&book.abbr);
    let name = converter.convert_text(&book.name);
    debug!(script = %converter.code(), %abbr, %name, "book labels converted");

    let root = layout::book_dir(
        &layout::script_root(&config.output_root, converter.code()),
        &config.layout,
        &book.basket,
        &book.category,
        &abbr,
    );
    (root, abbr)
}

async fn build_hierarchy_book<P: RecordProvider>(
    config: &BuildConfig,
    provider: &P,
    book: &BookRecord,
    converters: &[Converter<'_>],
) -> Result<Option<MaterializeStats>> {
    let tocs = provider.tocs_for_book(&book.id).await?;
    if tocs.is_empty() {
        info!(book = %book.id, "book has no TOC entries, skipping");
        return Ok(None);
    }

    let resolved = hierarchy::resolve(&tocs);
    let mut stats = MaterializeStats::default();
    for converter in converters {
        let (root, abbr) = book_root(config, book, converter);
        stats.merge(materializer::materialize_hierarchy(
            &resolved,
            &root,
            &abbr,
            converter,
            &config.labels,
        )?);
    }
    Ok(Some(stats))
}

async fn build_chapter_book<P: RecordProvider>(
    config: &BuildConfig,
    provider: &P,
    book: &BookRecord,
    converters: &[Converter<'_>],
) -> Result<Option<MaterializeStats>> {
    let marks = chapters::parse_legacy_toc(book.toc.as_deref().unwrap_or_default());
    if marks.is_empty() {
        info!(book = %book.id, "book has no chapters in its inline TOC, skipping");
        return Ok(None);
    }

    let ranges = chapters::compute_chapter_ranges(&marks, book.last_page);
    let mut chapter_pages: Vec<(ChapterRange, &str, Vec<PageRecord>)> =
        Vec::with_capacity(ranges.len());
    for (range, mark) in ranges.into_iter().zip(&marks) {
        let pages = chapters::fetch_pages(provider, &book.id, &range).await?;
        chapter_pages.push((range, mark.name.as_str(), pages));
    }

    let mut stats = MaterializeStats::default();
    for converter in converters {
        let (root, _) = book_root(config, book, converter);
        for (range, name, pages) in &chapter_pages {
            let title = converter.convert_text(name);
            let body: ChapterBody = chapters::build_chapter_body(pages, converter, &config.labels);

            let mut units = vec![chapters::chapter_unit(range, &title, body)];
            units.extend(chapters::page_units(range, &title, pages, converter, &config.labels));
            stats.merge(materializer::materialize_units(&root, &units)?);
        }
    }
    Ok(Some(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tipitaka_storage::MemoryRecords;
    use tipitaka_shared::TocEntry;

    struct Upper;

    impl Transliterator for Upper {
        fn transliterate(&self, text: &str, _source: &str, _dest: &str) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("tipitaka-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn book(id: &str, category: &str, abbr: &str, toc: Option<&str>) -> BookRecord {
        BookRecord {
            id: id.into(),
            basket: "mula".into(),
            category: category.into(),
            name: format!("{abbr} book"),
            first_page: 1,
            last_page: 4,
            page_count: 4,
            toc: toc.map(String::from),
            abbr: abbr.into(),
        }
    }

    fn toc(book_id: &str, name: &str, kind: &str, page: u32) -> TocEntry {
        TocEntry {
            book_id: book_id.into(),
            name: name.into(),
            kind: kind.into(),
            page_number: page,
        }
    }

    fn records() -> MemoryRecords {
        MemoryRecords {
            books: vec![
                book("b1", "di", "dī", Some("chapter->sīla->1\nchapter->mahā->3")),
                book("b2", "vi", "pā", None),
                book("b3", "ma", "ma", None),
            ],
            tocs: vec![
                toc("b1", "sīla", "chapter", 1),
                toc("b1", "brahma", "title", 1),
                toc("b1", "mahā", "chapter", 3),
                toc("b2", "pārā", "chapter", 1),
            ],
            pages: (1..=4)
                .map(|n| PageRecord {
                    id: n as i64,
                    book_id: "b1".into(),
                    page: n,
                    content: (n != 2).then(|| format!("<p>page {n}</p>")),
                    paranum: Some(n.to_string()),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn config(output_root: &Path, mode: BuildMode) -> BuildConfig {
        let app = AppConfig::default();
        let mut config =
            BuildConfig::from_app_config(&app, &["mymr".to_string(), "romn".to_string()]).unwrap();
        config.output_root = output_root.to_path_buf();
        config.mode = mode;
        config
    }

    #[test]
    fn build_mode_parses() {
        assert_eq!("hierarchy".parse::<BuildMode>().unwrap(), BuildMode::Hierarchy);
        assert_eq!("chapters".parse::<BuildMode>().unwrap(), BuildMode::Chapters);
        assert!("pages".parse::<BuildMode>().is_err());
    }

    #[test]
    fn from_app_config_rejects_unknown_script() {
        let err =
            BuildConfig::from_app_config(&AppConfig::default(), &["zzzz".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown script code"));
    }

    #[tokio::test]
    async fn hierarchy_build_writes_every_script() {
        let tmp = temp_dir();
        let config = config(&tmp, BuildMode::Hierarchy);

        let report = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(report.scripts, 2);
        assert_eq!(report.books, 2);
        assert_eq!(report.books_skipped, 1);
        // b1: 3 indexes, b2: 1 index, per script
        assert_eq!(report.units_created, 8);

        let native = tmp.join("mymr/mula/su/di/dī/1/1/index.md");
        let roman = tmp.join("romn/mula/su/di/DĪ/1/1/index.md");
        assert!(std::fs::read_to_string(native).unwrap().contains("title: \"brahma\""));
        let roman_doc = std::fs::read_to_string(roman).unwrap();
        assert!(roman_doc.contains("title: \"BRAHMA\""));
        assert!(roman_doc.contains("parent: \"SĪLA\""));
        assert!(tmp.join("romn/mula/vi/PĀ/1/index.md").is_file());
        assert!(tmp.join("romn/tika/su/ku").is_dir());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let tmp = temp_dir();
        let config = config(&tmp, BuildMode::Hierarchy);
        build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        let report = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(report.units_created, 0);
        assert!(report.units_already_present > 0);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn clean_removes_previous_output() {
        let tmp = temp_dir();
        let mut config = config(&tmp, BuildMode::Hierarchy);
        let stale = tmp.join("romn/stale.md");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "old").unwrap();

        config.clean = true;
        build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert!(!stale.exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn book_filter_matches_id_or_abbr() {
        let tmp = temp_dir();
        let mut config = config(&tmp, BuildMode::Hierarchy);
        config.books = vec!["pā".into()];
        let report = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(report.books, 1);
        assert!(!tmp.join("mymr/mula/su/di/dī").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn chapters_build_writes_chapter_and_page_documents() {
        let tmp = temp_dir();
        let config = config(&tmp, BuildMode::Chapters);
        let report = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(report.books, 1);
        assert_eq!(report.books_skipped, 2);

        let chapter = std::fs::read_to_string(tmp.join("romn/mula/su/di/DĪ/1/index.md")).unwrap();
        assert!(chapter.contains("title: \"SĪLA\""));
        assert!(chapter.contains("page: \"1-2\""));
        assert!(chapter.contains("paranum: [\"1\",\"2\"]"));
        assert!(chapter.contains("<p>PAGE 1</p>"));

        let second = std::fs::read_to_string(tmp.join("romn/mula/su/di/DĪ/2/index.md")).unwrap();
        assert!(second.contains("page: \"3-4\""));

        // Page 2 has no content and gets no page document.
        assert!(tmp.join("mymr/mula/su/di/dī/1/page-1.md").is_file());
        assert!(!tmp.join("mymr/mula/su/di/dī/1/page-2.md").exists());
        let page = std::fs::read_to_string(tmp.join("mymr/mula/su/di/dī/2/page-4.md")).unwrap();
        assert!(page.contains("title: \"mahā - หน้า 4\""));
        assert!(page.contains("    order: 2\n"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn chapters_rebuild_keeps_existing_documents() {
        let tmp = temp_dir();
        let config = config(&tmp, BuildMode::Chapters);
        let chapter_dir = tmp.join("romn/mula/su/di/DĪ/1");
        std::fs::create_dir_all(&chapter_dir).unwrap();
        std::fs::write(chapter_dir.join("index.md"), "edited chapter").unwrap();
        std::fs::write(chapter_dir.join("page-1.md"), "edited page").unwrap();

        let first = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(first.units_already_present, 2);
        assert_eq!(
            std::fs::read_to_string(chapter_dir.join("index.md")).unwrap(),
            "edited chapter"
        );
        assert_eq!(
            std::fs::read_to_string(chapter_dir.join("page-1.md")).unwrap(),
            "edited page"
        );
        assert!(chapter_dir.join("../2/page-3.md").is_file());

        let second = build(&config, &records(), &Upper, &SilentProgress).await.unwrap();
        assert_eq!(second.units_created, 0);
        assert_eq!(
            second.units_already_present,
            first.units_created + first.units_already_present
        );
        assert_eq!(
            std::fs::read_to_string(chapter_dir.join("page-1.md")).unwrap(),
            "edited page"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
