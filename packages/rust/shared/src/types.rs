//! Core domain types for the Tipitaka corpus and its generated tree.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records (read-only inputs from the record store)
// ---------------------------------------------------------------------------

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    /// Top-level basket (`mula`, `attha`, `tika`).
    pub basket: String,
    /// Category code; sutta subdivisions are nested under `su/`.
    pub category: String,
    pub name: String,
    pub first_page: u32,
    pub last_page: u32,
    pub page_count: u32,
    /// Legacy inline TOC (`chapter->NAME->PAGE` lines).
    #[serde(default)]
    pub toc: Option<String>,
    pub abbr: String,
}

/// A row of the `category` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub basket: String,
}

/// A row of the `pages` table. `page` is unique within a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: i64,
    pub book_id: String,
    pub page: u32,
    /// Markup or plain text; absent for blank pages.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub paranum: Option<String>,
}

/// A row of the `tocs` table. Sequence order defines document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub book_id: String,
    pub name: String,
    /// Raw type string; only the five [`TocKind`] values take part in the hierarchy.
    pub kind: String,
    pub page_number: u32,
}

// ---------------------------------------------------------------------------
// TocKind
// ---------------------------------------------------------------------------

/// Recognized TOC entry kinds, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocKind {
    Chapter,
    Title,
    Subhead,
    Subsubhead,
    SubsubheadHead,
}

impl TocKind {
    /// All kinds in hierarchy order.
    pub const ALL: [TocKind; 5] = [
        Self::Chapter,
        Self::Title,
        Self::Subhead,
        Self::Subsubhead,
        Self::SubsubheadHead,
    ];

    /// Number of hierarchy levels.
    pub const DEPTH: usize = Self::ALL.len();

    /// Parse the raw type string stored in the `tocs` table.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "chapter" => Some(Self::Chapter),
            "title" => Some(Self::Title),
            "subhead" => Some(Self::Subhead),
            "subsubhead" => Some(Self::Subsubhead),
            "subsubhead-head" => Some(Self::SubsubheadHead),
            _ => None,
        }
    }

    /// Depth of this kind (0 = chapter).
    pub fn level(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Title => "title",
            Self::Subhead => "subhead",
            Self::Subsubhead => "subsubhead",
            Self::SubsubheadHead => "subsubhead-head",
        }
    }
}

impl fmt::Display for TocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// One level of a resolved hierarchy path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub kind: TocKind,
    pub name: String,
    pub page: u32,
    /// 1-based position among siblings; also the directory name.
    pub counter: u32,
    pub level: usize,
}

/// Root-to-leaf segments; segment `i` is the parent context of segment `i + 1`.
pub type HierarchyPath = Vec<PathSegment>;

// ---------------------------------------------------------------------------
// Chapters and pages
// ---------------------------------------------------------------------------

/// A chapter parsed from the legacy inline TOC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMark {
    pub name: String,
    pub page: u32,
}

/// Half-open page range `[start_page, end_page_exclusive)` of one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub start_page: u32,
    pub end_page_exclusive: u32,
    /// 1-based chapter position within the book.
    pub index: usize,
}

// ---------------------------------------------------------------------------
// ContentUnit
// ---------------------------------------------------------------------------

/// One materialized document of the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Directory names below the book root.
    pub path: Vec<String>,
    /// File name inside the last directory (`index.md`, `page-12.md`).
    pub file_name: String,
    pub title: String,
    pub order: u32,
    /// Single page (`"12"`) or range (`"12-19"`).
    pub page_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Paragraph numbers; `None` omits the header field entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paranums: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub body: String,
}
