//! Meilisearch implementation of [`SearchBackend`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use meilisearch_sdk::client::Client;
use meilisearch_sdk::indexes::Index;
use meilisearch_sdk::search::{SearchResults, Selectors};
use meilisearch_sdk::settings::{PaginationSetting, Settings};
use meilisearch_sdk::task_info::TaskInfo;
use meilisearch_sdk::tasks::Task;
use tracing::{debug, instrument};

use brico_core::SearchDocument;

use super::{
    FacetDistribution, Highlight, HitDocument, IndexQuery, IndexResponse, IndexSettings, RawHit,
    SearchBackend, SearchError,
};

/// How long to wait for the index to apply a write.
const TASK_TIMEOUT: Duration = Duration::from_secs(60);

fn backend_error(err: &meilisearch_sdk::errors::Error) -> SearchError {
    SearchError::Backend(err.to_string())
}

/// Product index handle on a Meilisearch server.
#[derive(Clone)]
pub struct MeiliBackend {
    client: Client,
    index: Index,
}

impl std::fmt::Debug for MeiliBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeiliBackend")
            .field("index", &self.index.uid)
            .finish_non_exhaustive()
    }
}

impl MeiliBackend {
    /// Create a handle. No request is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Backend` if the host URL is rejected.
    pub fn new(host: &str, api_key: Option<&str>, index_uid: &str) -> Result<Self, SearchError> {
        let client =
            Client::new(host, api_key.map(str::to_owned)).map_err(|e| backend_error(&e))?;
        let index = client.index(index_uid);
        Ok(Self { client, index })
    }

    #[must_use]
    pub fn index_uid(&self) -> &str {
        &self.index.uid
    }

    /// Wait for an enqueued task and surface its failure as an error.
    async fn settle(&self, info: TaskInfo) -> Result<(), SearchError> {
        let task = info
            .wait_for_completion(&self.client, None, Some(TASK_TIMEOUT))
            .await
            .map_err(|e| backend_error(&e))?;

        if let Task::Failed { content } = task {
            return Err(SearchError::Backend(content.error.to_string()));
        }
        Ok(())
    }
}

fn to_settings(settings: &IndexSettings) -> Settings {
    let synonyms: HashMap<&str, Vec<&str>> = settings
        .synonyms
        .iter()
        .map(|(word, alts)| (word.as_str(), alts.iter().map(String::as_str).collect()))
        .collect();

    Settings::new()
        .with_searchable_attributes(&settings.searchable)
        .with_displayed_attributes(&settings.displayed)
        .with_filterable_attributes(&settings.filterable)
        .with_sortable_attributes(&settings.sortable)
        .with_ranking_rules(&settings.ranking_rules)
        .with_synonyms(synonyms)
        .with_stop_words(&settings.stop_words)
        .with_pagination(PaginationSetting {
            max_total_hits: settings.max_total_hits,
        })
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn to_response(results: SearchResults<HitDocument>) -> IndexResponse {
    let hits = results
        .hits
        .into_iter()
        .map(|hit| RawHit {
            document: hit.result,
            formatted: hit
                .formatted_result
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_owned())))
                .collect(),
            matches_position: hit
                .matches_position
                .unwrap_or_default()
                .into_iter()
                .map(|(k, ranges)| {
                    let ranges = ranges
                        .into_iter()
                        .map(|r| Highlight {
                            start: r.start,
                            length: r.length,
                        })
                        .collect();
                    (k, ranges)
                })
                .collect(),
        })
        .collect();

    let facet_distribution: FacetDistribution = results
        .facet_distribution
        .unwrap_or_default()
        .into_iter()
        .map(|(facet, counts)| {
            let counts: BTreeMap<String, u64> =
                counts.into_iter().map(|(v, n)| (v, to_u64(n))).collect();
            (facet, counts)
        })
        .collect();

    IndexResponse {
        hits,
        total_hits: results
            .total_hits
            .or(results.estimated_total_hits)
            .map_or(0, to_u64),
        total_pages: results.total_pages.map_or(0, to_u64),
        page: results
            .page
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(1),
        facet_distribution,
    }
}

impl SearchBackend for MeiliBackend {
    #[instrument(skip_all, fields(index = %self.index.uid))]
    async fn apply_settings(&self, settings: &IndexSettings) -> Result<(), SearchError> {
        let info = self
            .index
            .set_settings(&to_settings(settings))
            .await
            .map_err(|e| backend_error(&e))?;
        self.settle(info).await
    }

    #[instrument(skip_all, fields(index = %self.index.uid, count = documents.len()))]
    async fn replace_documents(&self, documents: &[SearchDocument]) -> Result<(), SearchError> {
        if documents.is_empty() {
            return Ok(());
        }
        let info = self
            .index
            .add_or_replace(documents, Some(SearchDocument::PRIMARY_KEY))
            .await
            .map_err(|e| backend_error(&e))?;
        self.settle(info).await
    }

    #[instrument(skip_all, fields(index = %self.index.uid))]
    async fn delete_all_documents(&self) -> Result<(), SearchError> {
        let info = self
            .index
            .delete_all_documents()
            .await
            .map_err(|e| backend_error(&e))?;
        self.settle(info).await
    }

    #[instrument(skip(self), fields(index = %self.index.uid))]
    async fn delete_document(&self, id: &str) -> Result<(), SearchError> {
        let info = self
            .index
            .delete_document(id)
            .await
            .map_err(|e| backend_error(&e))?;
        self.settle(info).await
    }

    #[instrument(skip_all, fields(index = %self.index.uid, query = %query.text, page = query.page))]
    async fn search(&self, query: &IndexQuery) -> Result<IndexResponse, SearchError> {
        let filter = query.filter.to_filter_string();
        let sort = query.sort.map(|s| [s.as_sort_expr()]);
        let crop: Vec<(&str, Option<usize>)> = query.crop.iter().map(|a| (*a, None)).collect();
        let page = usize::try_from(query.page).unwrap_or(1);
        let hits_per_page = usize::try_from(query.hits_per_page).unwrap_or(1);

        let mut search = self.index.search();
        search
            .with_query(&query.text)
            .with_page(page)
            .with_hits_per_page(hits_per_page);

        if let Some(filter) = filter.as_deref() {
            debug!(filter, "search filter");
            search.with_filter(filter);
        }
        if let Some(sort) = sort.as_ref() {
            search.with_sort(sort.as_slice());
        }
        if !query.facets.is_empty() {
            search.with_facets(Selectors::Some(query.facets.as_slice()));
        }
        if !query.highlight.is_empty() {
            search.with_attributes_to_highlight(Selectors::Some(query.highlight.as_slice()));
        }
        if !crop.is_empty() {
            search
                .with_attributes_to_crop(Selectors::Some(crop.as_slice()))
                .with_crop_length(query.crop_length);
        }
        if query.show_matches_position {
            search.with_show_matches_position(true);
        }

        let results = search
            .execute::<HitDocument>()
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(to_response(results))
    }

    async fn is_healthy(&self) -> bool {
        self.client.is_healthy().await
    }
}
