//! Core types for Brico.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod locale;
pub mod price;
pub mod slug;

pub use id::*;
pub use locale::{Locale, LocaleError};
pub use price::{price_inc_vat, round_money};
pub use slug::{Slug, make_unique_slug, slugify};
