//! Category tree nodes.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Slug};

/// A node in the category tree. `parent_id == None` marks a root.
///
/// Categories are written by the batch import and read-only here. The parent
/// graph is expected to be acyclic; readers still guard against cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub parent_id: Option<CategoryId>,
}

impl Category {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A product's category and its immediate parent, as the search index sees it.
///
/// The index encodes two levels only: a product filed under a child category
/// is indexed with the parent as its category and the child as subcategory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlacement {
    pub slug: Slug,
    pub parent_slug: Option<Slug>,
}

impl CategoryPlacement {
    /// Category slug used when a product has no category.
    pub const UNCATEGORIZED: &'static str = "general";

    /// `(category, subcategory)` slugs for the search document.
    #[must_use]
    pub fn index_slugs(placement: Option<&Self>) -> (String, Option<String>) {
        match placement {
            Some(Self {
                slug,
                parent_slug: Some(parent),
            }) => (parent.to_string(), Some(slug.to_string())),
            Some(Self {
                slug,
                parent_slug: None,
            }) => (slug.to_string(), None),
            None => (Self::UNCATEGORIZED.to_owned(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_slugs_two_levels() {
        let placement = CategoryPlacement {
            slug: Slug::from_trusted("taladros"),
            parent_slug: Some(Slug::from_trusted("herramientas")),
        };
        assert_eq!(
            CategoryPlacement::index_slugs(Some(&placement)),
            ("herramientas".to_owned(), Some("taladros".to_owned()))
        );
    }

    #[test]
    fn test_index_slugs_root_and_missing() {
        let root = CategoryPlacement {
            slug: Slug::from_trusted("jardin"),
            parent_slug: None,
        };
        assert_eq!(
            CategoryPlacement::index_slugs(Some(&root)),
            ("jardin".to_owned(), None)
        );
        assert_eq!(
            CategoryPlacement::index_slugs(None),
            ("general".to_owned(), None)
        );
    }
}
