//! Content materializer.
//!
//! Writes [`ContentUnit`]s as Markdown documents with YAML frontmatter.
//! Writes are create-only: an existing document is never rewritten, so the
//! first writer of a path wins and re-running a build is idempotent.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::{debug, error, instrument};

use tipitaka_script::Converter;
use tipitaka_shared::{ContentUnit, LabelsConfig, Result, TipitakaError};

use crate::hierarchy::ResolvedEntry;

const INDEX_FILE: &str = "index.md";

/// Outcome of writing one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    AlreadyPresent,
}

/// Per-book write counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub created: usize,
    pub already_present: usize,
}

impl MaterializeStats {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Created => self.created += 1,
            WriteOutcome::AlreadyPresent => self.already_present += 1,
        }
    }

    pub fn merge(&mut self, other: MaterializeStats) {
        self.created += other.created;
        self.already_present += other.already_present;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a unit as frontmatter plus Markdown body.
pub fn render_unit(unit: &ContentUnit) -> String {
    let mut doc = build_frontmatter(unit);
    doc.push('\n');
    doc.push_str(&format!(
        "# {}\n\n",
        unit.heading.as_deref().unwrap_or(&unit.title)
    ));
    doc.push_str(&unit.body);
    if !doc.ends_with('\n') {
        doc.push('\n');
    }
    doc
}

fn build_frontmatter(unit: &ContentUnit) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("title: \"{}\"\n", escape_yaml_string(&unit.title)));
    fm.push_str(&format!("sidebar:\n    order: {}\n", unit.order));
    if let Some(parent) = &unit.parent {
        fm.push_str(&format!("parent: \"{}\"\n", escape_yaml_string(parent)));
    }
    fm.push_str(&format!("page: \"{}\"\n", escape_yaml_string(&unit.page_ref)));
    if let Some(paranums) = &unit.paranums {
        // JSON arrays are valid YAML flow sequences.
        let list = serde_json::to_string(paranums).unwrap_or_else(|_| "[]".to_string());
        fm.push_str(&format!("paranum: {list}\n"));
    }
    fm.push_str("---\n");
    fm
}

fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `unit` below `book_root` unless its document already exists.
pub fn write_unit(book_root: &Path, unit: &ContentUnit) -> Result<WriteOutcome> {
    let dir = unit.path.iter().fold(book_root.to_path_buf(), |d, p| d.join(p));
    std::fs::create_dir_all(&dir).map_err(|e| {
        error!(dir = %dir.display(), exists = dir.exists(), error = %e, "cannot create directory");
        TipitakaError::materialize(&dir, &dir, e)
    })?;

    let file = dir.join(&unit.file_name);
    let mut handle = match OpenOptions::new().write(true).create_new(true).open(&file) {
        Ok(handle) => handle,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %file.display(), "document exists, leaving it untouched");
            return Ok(WriteOutcome::AlreadyPresent);
        }
        Err(e) => {
            error!(
                path = %file.display(),
                dir_exists = dir.exists(),
                error = %e,
                "cannot create document"
            );
            return Err(TipitakaError::materialize(&file, &dir, e));
        }
    };

    handle
        .write_all(render_unit(unit).as_bytes())
        .map_err(|e| {
            error!(
                path = %file.display(),
                dir_exists = dir.exists(),
                error = %e,
                "cannot write document"
            );
            TipitakaError::materialize(&file, &dir, e)
        })?;
    Ok(WriteOutcome::Created)
}

/// Write every unit in order.
pub fn materialize_units(book_root: &Path, units: &[ContentUnit]) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();
    for unit in units {
        stats.record(write_unit(book_root, unit)?);
    }
    Ok(stats)
}

/// Write one index document per hierarchy segment of `resolved`.
///
/// Ancestors are visited before descendants, so a directory's index is
/// written by the first entry that passes through it. `parent` holds the
/// converted ancestor names joined by `" > "`, or `book_label` at the root.
#[instrument(
    skip_all,
    fields(book = %book_label, entries = resolved.len(), script = %converter.code())
)]
pub fn materialize_hierarchy(
    resolved: &[ResolvedEntry],
    book_root: &Path,
    book_label: &str,
    converter: &Converter<'_>,
    labels: &LabelsConfig,
) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();

    for entry in resolved {
        let mut dirs = Vec::with_capacity(entry.path.len());
        let mut ancestors: Vec<String> = Vec::with_capacity(entry.path.len());

        for segment in &entry.path {
            dirs.push(segment.counter.to_string());
            let title = converter.convert_text(&segment.name);
            let parent = if ancestors.is_empty() {
                book_label.to_string()
            } else {
                ancestors.join(" > ")
            };

            let unit = ContentUnit {
                path: dirs.clone(),
                file_name: INDEX_FILE.to_string(),
                title: title.clone(),
                order: segment.counter,
                page_ref: segment.page.to_string(),
                parent: Some(parent),
                paranums: None,
                heading: None,
                body: format!("{} {}", labels.page, segment.page),
            };
            stats.record(write_unit(book_root, &unit)?);
            ancestors.push(title);
        }
    }

    debug!(created = stats.created, present = stats.already_present, "hierarchy materialized");
    Ok(stats)
}
