//! Brico Core - Shared catalog types library.
//!
//! This crate provides common types used across all Brico components:
//! - `storefront` - Catalog browsing and faceted search service
//! - `cli` - Command-line tools for migrations, reindexing and slug backfill
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, locales, slugs and VAT math
//! - [`catalog`] - Catalog records, listing cards and search documents

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use catalog::*;
pub use types::*;
