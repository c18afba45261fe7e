//! Index write paths: full reindex, upsert-on-write and delete-on-write.
//!
//! A full reindex drops every document, reapplies [`IndexSettings`] and then
//! streams the catalog in id order, one batch per round trip. Each batch is
//! searchable as soon as it is acknowledged, so searches during a reindex
//! see a growing subset of the catalog. Between the drop and the first
//! acknowledged batch the index is empty.

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use brico_core::{Locale, ProductId, SearchDocument};

use super::{IndexSettings, SearchBackend, SearchError, to_search_document};
use crate::catalog::CatalogStore;

/// Products projected and sent per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Indexing tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerOptions {
    pub batch_size: u32,
    /// Language the document titles are rendered in.
    pub locale: Locale,
    pub cdn_cloud_name: Option<String>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            locale: Locale::default(),
            cdn_cloud_name: None,
        }
    }
}

/// Outcome of a full reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub batches: u64,
    pub documents: u64,
}

/// Keeps the search index in step with the catalog.
pub struct Indexer<'a, S, B> {
    store: &'a S,
    backend: &'a B,
    options: IndexerOptions,
}

impl<'a, S: CatalogStore, B: SearchBackend> Indexer<'a, S, B> {
    #[must_use]
    pub const fn new(store: &'a S, backend: &'a B, options: IndexerOptions) -> Self {
        Self {
            store,
            backend,
            options,
        }
    }

    fn project(&self, item: &brico_core::IndexableProduct) -> SearchDocument {
        to_search_document(
            item,
            self.options.locale,
            self.options.locale,
            self.options.cdn_cloud_name.as_deref(),
        )
    }

    /// Rebuild the whole index from the catalog.
    ///
    /// # Errors
    ///
    /// Stops at the first store or index failure. Batches acknowledged before
    /// the failure stay in the index.
    #[instrument(skip_all, fields(batch_size = self.options.batch_size))]
    pub async fn reindex_all(&self, settings: &IndexSettings) -> Result<ReindexReport, SearchError> {
        let batch_size = self.options.batch_size.max(1);
        let locales = [self.options.locale];

        self.backend.delete_all_documents().await?;
        self.backend.apply_settings(settings).await?;
        info!("index cleared and configured");

        let mut report = ReindexReport::default();
        let mut after: Option<ProductId> = None;

        loop {
            let batch = self
                .store
                .indexable_products(after, batch_size, &locales)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.product.id);

            let documents: Vec<SearchDocument> = batch.iter().map(|p| self.project(p)).collect();
            self.backend.replace_documents(&documents).await?;

            report.batches += 1;
            report.documents += documents.len() as u64;
            info!(batch = report.batches, sent = report.documents, "batch indexed");

            if batch.len() < batch_size as usize {
                break;
            }
        }

        info!(
            batches = report.batches,
            documents = report.documents,
            "reindex complete"
        );
        Ok(report)
    }

    /// Project one product and write it to the index.
    ///
    /// Returns `false` when the product no longer exists, in which case any
    /// stale document for it is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the index fails.
    #[instrument(skip(self))]
    pub async fn upsert_product(&self, id: ProductId) -> Result<bool, SearchError> {
        let locales = [self.options.locale];
        match self.store.indexable_product(id, &locales).await? {
            Some(item) => {
                self.backend.replace_documents(&[self.project(&item)]).await?;
                Ok(true)
            }
            None => {
                self.backend.delete_document(&id.to_string()).await?;
                Ok(false)
            }
        }
    }

    /// Remove one product's document.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Backend` if the index fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), SearchError> {
        self.backend.delete_document(&id.to_string()).await
    }
}

/// Run a full reindex on a background task.
///
/// The outcome is logged; the handle can be awaited for the report.
pub fn spawn_reindex<S, B>(
    store: S,
    backend: B,
    settings: IndexSettings,
    options: IndexerOptions,
) -> JoinHandle<Result<ReindexReport, SearchError>>
where
    S: CatalogStore + 'static,
    B: SearchBackend + 'static,
{
    info!("spawning background reindex");
    tokio::spawn(async move {
        let indexer = Indexer::new(&store, &backend, options);
        let result = indexer.reindex_all(&settings).await;
        match &result {
            Ok(report) => info!(documents = report.documents, "background reindex finished"),
            Err(e) => error!(error = %e, "background reindex failed"),
        }
        result
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryCatalog, InMemoryIndex, product};

    fn catalog_with(count: i32) -> InMemoryCatalog {
        let store = InMemoryCatalog::new();
        for id in 1..=count {
            store.add_product(product(id));
        }
        store
    }

    fn options(batch_size: u32) -> IndexerOptions {
        IndexerOptions {
            batch_size,
            ..IndexerOptions::default()
        }
    }

    #[tokio::test]
    async fn test_reindex_replaces_everything_in_batches() {
        let store = catalog_with(7);
        let index = InMemoryIndex::new();
        index.insert(crate::test_support::document(99));

        let indexer = Indexer::new(&store, &index, options(3));
        let report = indexer.reindex_all(&IndexSettings::default()).await.unwrap();

        assert_eq!(report, ReindexReport { batches: 3, documents: 7 });
        assert_eq!(index.document_ids(), (1..=7).map(|id| id.to_string()).collect::<Vec<_>>());
        assert_eq!(index.settings(), Some(IndexSettings::default()));
    }

    #[tokio::test]
    async fn test_reindex_of_empty_catalog_clears_index() {
        let store = InMemoryCatalog::new();
        let index = InMemoryIndex::new();
        index.insert(crate::test_support::document(1));

        let indexer = Indexer::new(&store, &index, options(10));
        let report = indexer.reindex_all(&IndexSettings::default()).await.unwrap();

        assert_eq!(report, ReindexReport::default());
        assert!(index.document_ids().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let store = catalog_with(2);
        let index = InMemoryIndex::new();
        let indexer = Indexer::new(&store, &index, IndexerOptions::default());

        assert!(indexer.upsert_product(ProductId::new(2)).await.unwrap());
        assert_eq!(index.document_ids(), vec!["2".to_owned()]);

        let mut changed = product(2);
        changed.name = Some("Nivel láser".to_owned());
        store.add_product(changed);
        indexer.upsert_product(ProductId::new(2)).await.unwrap();
        assert_eq!(index.document("2").unwrap()["title"], "Nivel láser");

        indexer.delete_product(ProductId::new(2)).await.unwrap();
        assert!(index.document_ids().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_of_missing_product_removes_stale_document() {
        let store = InMemoryCatalog::new();
        let index = InMemoryIndex::new();
        index.insert(crate::test_support::document(5));

        let indexer = Indexer::new(&store, &index, IndexerOptions::default());
        assert!(!indexer.upsert_product(ProductId::new(5)).await.unwrap());
        assert!(index.document_ids().is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let store = catalog_with(1);
        let index = InMemoryIndex::new();
        index.set_unavailable(true);

        let indexer = Indexer::new(&store, &index, IndexerOptions::default());
        let result = indexer.reindex_all(&IndexSettings::default()).await;
        assert!(matches!(result, Err(SearchError::Backend(_))));
    }

    #[tokio::test]
    async fn test_spawned_reindex_reports() {
        let store = catalog_with(4);
        let index = InMemoryIndex::new();

        let handle = spawn_reindex(store, index.clone(), IndexSettings::default(), options(2));
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.documents, 4);
        assert_eq!(index.document_ids().len(), 4);
    }
}
