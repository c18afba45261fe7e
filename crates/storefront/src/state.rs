//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::SecretString;

use crate::catalog::{Catalog, CatalogOptions, CatalogStore};
use crate::config::StorefrontConfig;
use crate::db::PgCatalogStore;
use crate::search::{IndexSettings, Indexer, IndexerOptions, MeiliBackend, ProductSearch, SearchBackend};

/// Service tunables resolved once at start-up.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub catalog: CatalogOptions,
    pub indexer: IndexerOptions,
    pub index_settings: IndexSettings,
    /// Bearer token for the reindex endpoint; `None` disables it.
    pub reindex_token: Option<SecretString>,
}

impl ServiceOptions {
    /// Options from configuration, loading index settings overrides from
    /// the search data directory.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            catalog: config.catalog_options(),
            indexer: config.indexer_options(),
            index_settings: IndexSettings::load(&config.reindex.search_data_dir),
            reindex_token: config.reindex.token.clone(),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The store and index handles
/// are injected at construction, so the same routes run against Postgres
/// and Meilisearch in production and in-memory fakes in tests.
pub struct AppState<S = PgCatalogStore, B = MeiliBackend> {
    inner: Arc<AppStateInner<S, B>>,
}

impl<S, B> Clone for AppState<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S, B> {
    store: S,
    backend: B,
    options: ServiceOptions,
    reindex_running: Arc<AtomicBool>,
}

/// Held while a reindex runs; releases the slot when dropped.
#[derive(Debug)]
pub struct ReindexSlot(Arc<AtomicBool>);

impl Drop for ReindexSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: CatalogStore, B: SearchBackend> AppState<S, B> {
    #[must_use]
    pub fn new(store: S, backend: B, options: ServiceOptions) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                backend,
                options,
                reindex_running: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.inner.options
    }

    /// Catalog read service for one request.
    #[must_use]
    pub fn catalog(&self) -> Catalog<'_, S> {
        Catalog::new(&self.inner.store, self.inner.options.catalog.clone())
    }

    /// Search service for one request.
    #[must_use]
    pub fn search(&self) -> ProductSearch<'_, B> {
        ProductSearch::new(&self.inner.backend)
    }

    /// Index writer for one request.
    #[must_use]
    pub fn indexer(&self) -> Indexer<'_, S, B> {
        Indexer::new(
            &self.inner.store,
            &self.inner.backend,
            self.inner.options.indexer.clone(),
        )
    }

    /// Claim the single reindex slot, or `None` if a reindex is running.
    #[must_use]
    pub fn try_start_reindex(&self) -> Option<ReindexSlot> {
        self.inner
            .reindex_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReindexSlot(Arc::clone(&self.inner.reindex_running)))
    }
}
