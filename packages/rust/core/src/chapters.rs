//! Page-range aggregation for books described by the legacy inline TOC.
//!
//! A book's `toc` column lists its chapters as `chapter->NAME->PAGE` lines.
//! Each chapter spans from its own start page up to the next chapter's start
//! page; the last chapter runs to the end of the book.

use tracing::{debug, instrument, trace};

use tipitaka_script::Converter;
use tipitaka_shared::{
    ChapterMark, ChapterRange, ContentUnit, LabelsConfig, PageRecord, Result,
};
use tipitaka_storage::RecordProvider;

/// Placeholder page range of a chapter with no pages.
pub const NO_PAGES: &str = "N/A";

const CHAPTER_PREFIX: &str = "chapter->";

/// Parse `chapter->NAME->PAGE` lines; anything else is ignored.
pub fn parse_legacy_toc(toc: &str) -> Vec<ChapterMark> {
    let mut chapters = Vec::new();
    for line in toc.lines().map(str::trim) {
        if !line.starts_with(CHAPTER_PREFIX) {
            continue;
        }
        let parts: Vec<&str> = line.split("->").collect();
        if parts.len() < 3 {
            trace!(line, "legacy TOC line has too few fields");
            continue;
        }
        let Ok(page) = parts[2].trim().parse::<u32>() else {
            trace!(line, "legacy TOC line has a non-numeric page");
            continue;
        };
        chapters.push(ChapterMark {
            name: parts[1].trim().to_string(),
            page,
        });
    }
    chapters
}

/// Page ranges for `chapters`, in order. The last range ends after `book_last_page`.
pub fn compute_chapter_ranges(chapters: &[ChapterMark], book_last_page: u32) -> Vec<ChapterRange> {
    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let end_page_exclusive = match chapters.get(i + 1) {
                Some(next) => next.page,
                None => book_last_page.saturating_add(1),
            };
            ChapterRange {
                start_page: chapter.page,
                end_page_exclusive,
                index: i + 1,
            }
        })
        .collect()
}

/// Pages of `book_id` inside `range`, ascending.
pub async fn fetch_pages<P: RecordProvider>(
    provider: &P,
    book_id: &str,
    range: &ChapterRange,
) -> Result<Vec<PageRecord>> {
    if range.end_page_exclusive <= range.start_page {
        return Ok(Vec::new());
    }
    provider
        .pages_in_range(book_id, range.start_page, range.end_page_exclusive)
        .await
}

/// `"N"` for a single page, `"N-M"` otherwise.
pub fn page_range_label(first: u32, last: u32) -> String {
    if first == last {
        first.to_string()
    } else {
        format!("{first}-{last}")
    }
}

/// Aggregated content of one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterBody {
    pub body: String,
    pub paranums: Vec<String>,
    pub page_range: String,
}

/// Concatenate the converted pages of a chapter behind page markers.
#[instrument(skip_all, fields(pages = pages.len(), script = %converter.code()))]
pub fn build_chapter_body(
    pages: &[PageRecord],
    converter: &Converter<'_>,
    labels: &LabelsConfig,
) -> ChapterBody {
    let (Some(first), Some(last)) = (pages.first(), pages.last()) else {
        return ChapterBody {
            body: labels.no_content.clone(),
            paranums: Vec::new(),
            page_range: NO_PAGES.to_string(),
        };
    };

    let mut parts = Vec::with_capacity(pages.len() * 3);
    let mut paranums = Vec::new();

    for page in pages {
        parts.push(format!("<!-- {} {} -->", labels.page, page.page));
        match page.content.as_deref() {
            Some(content) if !content.is_empty() => parts.push(converter.convert_markup(content)),
            _ => parts.push(labels.empty_page.clone()),
        }
        parts.push(String::new());

        if let Some(paranum) = page.paranum.as_deref().filter(|p| !p.is_empty()) {
            paranums.push(paranum.to_string());
        }
    }

    debug!(first = first.page, last = last.page, "chapter body assembled");
    ChapterBody {
        body: parts.join("\n"),
        paranums,
        page_range: page_range_label(first.page, last.page),
    }
}

/// The chapter's own index document.
pub fn chapter_unit(range: &ChapterRange, title: &str, body: ChapterBody) -> ContentUnit {
    ContentUnit {
        path: vec![range.index.to_string()],
        file_name: "index.md".to_string(),
        title: title.to_string(),
        order: range.index as u32,
        page_ref: body.page_range,
        parent: None,
        paranums: Some(body.paranums),
        heading: None,
        body: body.body,
    }
}

/// One document per page of a chapter. Pages without content are skipped;
/// `order` is the page's 1-based position among all of the chapter's pages.
pub fn page_units(
    range: &ChapterRange,
    chapter_title: &str,
    pages: &[PageRecord],
    converter: &Converter<'_>,
    labels: &LabelsConfig,
) -> Vec<ContentUnit> {
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, page)| {
            let content = page.content.as_deref().filter(|c| !c.is_empty())?;
            let page_label = format!("{} {}", labels.page, page.page);
            Some(ContentUnit {
                path: vec![range.index.to_string()],
                file_name: format!("page-{}.md", page.page),
                title: format!("{chapter_title} - {page_label}"),
                order: (i + 1) as u32,
                page_ref: page.page.to_string(),
                parent: None,
                paranums: Some(page.paranum.iter().filter(|p| !p.is_empty()).cloned().collect()),
                heading: Some(chapter_title.to_string()),
                body: format!("## {page_label}\n\n{}", converter.convert_markup(content)),
            })
        })
        .collect()
}
