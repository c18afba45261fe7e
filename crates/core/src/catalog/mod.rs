//! Catalog records and the shapes derived from them.
//!
//! - [`Product`], [`Category`], [`ProductImage`] and [`ProductText`] mirror
//!   the relational store, which owns them.
//! - [`Card`] is the one listing shape returned by both the category browse
//!   and the free-text search paths.
//! - [`SearchDocument`] is the flattened, derived record held by the search
//!   index. It is disposable and rebuilt from the relational store on demand.

pub mod card;
pub mod category;
pub mod document;
pub mod product;

pub use card::Card;
pub use category::{Category, CategoryPlacement};
pub use document::SearchDocument;
pub use product::{DEFAULT_DISPLAY_NAME, IndexableProduct, Product, ProductImage, ProductText};
