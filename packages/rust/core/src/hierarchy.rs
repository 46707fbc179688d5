//! TOC hierarchy resolver.
//!
//! Turns the flat, ordered `tocs` rows of a book into one root-to-leaf path
//! per entry. Each entry's depth comes from its kind (`chapter` shallowest,
//! `subsubhead-head` deepest); counters number siblings from 1 and restart
//! whenever a shallower entry appears.

use tracing::{debug, instrument, trace};

use tipitaka_shared::{HierarchyPath, PathSegment, TocEntry, TocKind};

/// A TOC entry together with its resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: TocEntry,
    pub path: HierarchyPath,
}

impl ResolvedEntry {
    /// The entry's own segment (last of the path).
    pub fn leaf(&self) -> &PathSegment {
        // resolve() never emits an empty path
        &self.path[self.path.len() - 1]
    }

    /// Directory names from the book root down to this entry.
    pub fn dir_names(&self) -> Vec<String> {
        self.path.iter().map(|s| s.counter.to_string()).collect()
    }
}

/// Resolve `entries` into hierarchy paths, in input order.
///
/// Entries whose kind is not one of the five [`TocKind`]s are dropped.
/// The same input always yields the same output.
#[instrument(skip_all, fields(entries = entries.len()))]
pub fn resolve(entries: &[TocEntry]) -> Vec<ResolvedEntry> {
    let mut counters = [0u32; TocKind::DEPTH];
    let mut running: HierarchyPath = Vec::with_capacity(TocKind::DEPTH);
    let mut resolved = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(kind) = TocKind::parse(&entry.kind) else {
            trace!(kind = %entry.kind, name = %entry.name, "skipping unrecognized TOC kind");
            continue;
        };
        let level = kind.level();

        counters[level + 1..].fill(0);
        counters[level] += 1;

        running.truncate(level);
        running.push(PathSegment {
            kind,
            name: entry.name.clone(),
            page: entry.page_number,
            counter: counters[level],
            level,
        });

        resolved.push(ResolvedEntry {
            entry: entry.clone(),
            path: running.clone(),
        });
    }

    debug!(resolved = resolved.len(), "TOC hierarchy resolved");
    resolved
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
