//! Category subtree expansion and navigation.

use std::collections::BTreeSet;

use tracing::{instrument, warn};

use brico_core::{Category, CategoryId};

use super::{Catalog, CatalogError, CatalogStore};

const TOP_CATEGORY_LIMIT: u32 = 8;

impl<S: CatalogStore> Catalog<'_, S> {
    /// Every category at or below `root`, always including `root` itself.
    ///
    /// Expands breadth-first, one store query per tree level, and stops at
    /// an empty frontier or after `max_category_depth` levels. Already
    /// visited ids are never expanded twice, so a cycle in the parent graph
    /// terminates. A tree deeper than the cap is truncated (with a warning);
    /// an unknown `root` yields `{root}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self), fields(max_depth = self.options.max_category_depth))]
    pub async fn descendant_ids(
        &self,
        root: CategoryId,
    ) -> Result<BTreeSet<CategoryId>, CatalogError> {
        let mut visited = BTreeSet::from([root]);
        let mut frontier = vec![root];

        for _ in 0..self.options.max_category_depth {
            if frontier.is_empty() {
                break;
            }
            let children = self.store.child_category_ids(&frontier).await?;
            frontier = children
                .into_iter()
                .filter(|id| visited.insert(*id))
                .collect();
        }

        if !frontier.is_empty() {
            let remaining = self.store.child_category_ids(&frontier).await?;
            if remaining.iter().any(|id| !visited.contains(id)) {
                warn!(
                    %root,
                    unresolved = remaining.len(),
                    "category tree deeper than depth cap; descendants truncated"
                );
            }
        }

        Ok(visited)
    }

    /// Direct children of a category, by name. Unknown slug is empty.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn child_categories(&self, slug: &str) -> Result<Vec<Category>, CatalogError> {
        match self.store.category_by_slug(slug).await? {
            Some(parent) => Ok(self.store.child_categories(parent.id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Root categories by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn top_categories(&self, limit: Option<u32>) -> Result<Vec<Category>, CatalogError> {
        let limit = limit.unwrap_or(TOP_CATEGORY_LIMIT).clamp(1, 100);
        Ok(self.store.root_categories(limit).await?)
    }
}
