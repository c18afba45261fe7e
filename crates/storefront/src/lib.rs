//! Brico storefront library.
//!
//! Catalog browsing, product pages and full-text search over the relational
//! catalog, exposed as a thin JSON API. Built as a library so the CLI and
//! the integration tests share the same services as the server binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
