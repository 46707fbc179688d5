//! Core pipeline orchestration and domain logic for the Tipitaka builder.
//!
//! This crate ties together the record store, the script conversion
//! pipeline, and the output layout into the end-to-end `build` workflow.

pub mod chapters;
pub mod hierarchy;
pub mod layout;
pub mod materializer;
pub mod pipeline;
