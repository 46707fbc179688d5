//! Output tree layout: script roots, skeleton directories, book directories.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tipitaka_shared::{LayoutConfig, Result, TipitakaError};

/// Root directory of one script's tree.
pub fn script_root(output_root: &Path, code: &str) -> PathBuf {
    output_root.join(code)
}

/// Directory of a book inside a script tree.
///
/// Sutta subdivisions live under `{basket}/su/{category}`; every other
/// category directly under `{basket}/{category}`.
pub fn book_dir(
    script_root: &Path,
    layout: &LayoutConfig,
    basket: &str,
    category: &str,
    abbr: &str,
) -> PathBuf {
    let mut dir = script_root.join(basket);
    if layout.sutta_subdivisions.iter().any(|s| s == category) {
        dir.push("su");
    }
    dir.push(category);
    dir.push(dir_name(abbr));
    dir
}

/// Make a converted label safe to use as a single path component.
pub fn dir_name(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '-',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Create the skeleton directories of a script tree.
pub fn prepare_script_root(script_root: &Path, layout: &LayoutConfig) -> Result<()> {
    let mut dirs = Vec::new();
    for section in &layout.sections {
        for subsection in &layout.subsections {
            dirs.push(script_root.join(section).join(subsection));
        }
        for division in &layout.sutta_subdivisions {
            dirs.push(script_root.join(section).join("su").join(division));
        }
    }

    for dir in &dirs {
        std::fs::create_dir_all(dir).map_err(|e| TipitakaError::io(dir, e))?;
    }
    debug!(root = %script_root.display(), dirs = dirs.len(), "script root prepared");
    Ok(())
}

/// Remove a script tree entirely. Missing roots are not an error.
pub fn clean_script_root(script_root: &Path) -> Result<()> {
    if !script_root.exists() {
        return Ok(());
    }
    info!(root = %script_root.display(), "removing script root");
    std::fs::remove_dir_all(script_root).map_err(|e| TipitakaError::io(script_root, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("tipitaka-layout-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn sutta_books_nest_under_su() {
        let layout = LayoutConfig::default();
        let root = Path::new("/out/romn");
        assert_eq!(
            book_dir(root, &layout, "mula", "di", "dī 1"),
            PathBuf::from("/out/romn/mula/su/di/dī 1")
        );
        assert_eq!(
            book_dir(root, &layout, "mula", "vi", "pārā"),
            PathBuf::from("/out/romn/mula/vi/pārā")
        );
    }

    #[test]
    fn dir_name_strips_separators() {
        assert_eq!(dir_name("a/b"), "a-b");
        assert_eq!(dir_name("  ab "), "ab");
        assert_eq!(dir_name(".."), "_");
        assert_eq!(dir_name(""), "_");
    }

    #[test]
    fn prepare_creates_skeleton() {
        let tmp = temp_dir();
        let root = script_root(&tmp, "thai");
        prepare_script_root(&root, &LayoutConfig::default()).unwrap();

        for section in ["mula", "attha", "tika"] {
            for sub in ["vi", "su", "bi"] {
                assert!(root.join(section).join(sub).is_dir());
            }
            for division in ["di", "ma", "sa", "an", "ku"] {
                assert!(root.join(section).join("su").join(division).is_dir());
            }
        }

        // Running again is harmless.
        prepare_script_root(&root, &LayoutConfig::default()).unwrap();
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn clean_removes_only_the_script_root() {
        let tmp = temp_dir();
        let thai = script_root(&tmp, "thai");
        let romn = script_root(&tmp, "romn");
        prepare_script_root(&thai, &LayoutConfig::default()).unwrap();
        prepare_script_root(&romn, &LayoutConfig::default()).unwrap();

        clean_script_root(&thai).unwrap();
        assert!(!thai.exists());
        assert!(romn.exists());

        clean_script_root(&thai).unwrap();
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
