//! Shared types, error model, and configuration for the Tipitaka builder.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`TipitakaError`], the unified error type
//! - Domain types ([`BookRecord`], [`TocEntry`], [`PathSegment`], [`ContentUnit`], ...)
//! - Configuration ([`AppConfig`], [`ScriptProfile`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BridgeConfig, Correction, DefaultsConfig, LabelsConfig, LayoutConfig,
    NATIVE_SCRIPT, ScriptProfile, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, TipitakaError};
pub use types::{
    BookRecord, CategoryRecord, ChapterMark, ChapterRange, ContentUnit, HierarchyPath,
    PageRecord, PathSegment, TocEntry, TocKind,
};
