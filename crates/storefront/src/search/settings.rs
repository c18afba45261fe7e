//! Product index configuration.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

/// Synonyms file under the search data directory.
pub const SYNONYMS_FILE: &str = "synonyms.json";
/// Stop-words file under the search data directory.
pub const STOP_WORDS_FILE: &str = "stopwords.json";

/// Searchable, filterable and sortable attributes plus ranking and language
/// tuning, applied on every full reindex and by `configure-index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub searchable: Vec<String>,
    pub displayed: Vec<String>,
    pub filterable: Vec<String>,
    pub sortable: Vec<String>,
    pub ranking_rules: Vec<String>,
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub stop_words: Vec<String>,
    /// Upper bound on hits reachable through pagination.
    pub max_total_hits: usize,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

impl Default for IndexSettings {
    fn default() -> Self {
        let synonyms = [
            ("atornillador", "destornillador"),
            ("destornillador", "atornillador"),
            ("radial", "amoladora"),
            ("amoladora", "radial"),
        ]
        .into_iter()
        .map(|(word, alt)| (word.to_owned(), vec![alt.to_owned()]))
        .collect();

        Self {
            searchable: owned(&[
                "title",
                "description",
                "brand",
                "category",
                "subcategory",
                "tags",
            ]),
            displayed: owned(&[
                "id",
                "slug",
                "title",
                "description",
                "brand",
                "category",
                "subcategory",
                "price",
                "priceExVat",
                "inStock",
                "rating",
                "tags",
                "imageUrl",
                "createdAt",
                "updatedAt",
            ]),
            filterable: owned(&[
                "category",
                "subcategory",
                "brand",
                "inStock",
                "price",
                "priceExVat",
                "rating",
                "tags",
            ]),
            sortable: owned(&["price", "priceExVat", "rating", "createdAt", "updatedAt"]),
            ranking_rules: owned(&[
                "words",
                "typo",
                "proximity",
                "attribute",
                "sort",
                "exactness",
            ]),
            synonyms,
            stop_words: owned(&[
                "de", "la", "las", "los", "para", "con", "y", "o", "un", "una", "en",
            ]),
            max_total_hits: 1000,
        }
    }
}

impl IndexSettings {
    /// Replace the synonyms from a JSON object of `word -> [alternatives]`.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the current synonyms are left untouched.
    pub fn with_synonyms_json(mut self, json: &str) -> Result<Self, serde_json::Error> {
        self.synonyms = serde_json::from_str(json)?;
        Ok(self)
    }

    /// Replace the stop words from a JSON array of strings.
    ///
    /// # Errors
    ///
    /// Returns the parse error; the current stop words are left untouched.
    pub fn with_stop_words_json(mut self, json: &str) -> Result<Self, serde_json::Error> {
        self.stop_words = serde_json::from_str(json)?;
        Ok(self)
    }

    /// Defaults, overridden by `synonyms.json` and `stopwords.json` from
    /// `dir` when present. A missing file keeps the default; a malformed one
    /// is logged and ignored.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let mut settings = Self::default();

        if let Some(json) = read_optional(&dir.join(SYNONYMS_FILE)) {
            match settings.clone().with_synonyms_json(&json) {
                Ok(s) => {
                    info!(count = s.synonyms.len(), "loaded synonyms");
                    settings = s;
                }
                Err(e) => warn!(error = %e, file = SYNONYMS_FILE, "ignoring malformed synonyms"),
            }
        }

        if let Some(json) = read_optional(&dir.join(STOP_WORDS_FILE)) {
            match settings.clone().with_stop_words_json(&json) {
                Ok(s) => {
                    info!(count = s.stop_words.len(), "loaded stop words");
                    settings = s;
                }
                Err(e) => warn!(error = %e, file = STOP_WORDS_FILE, "ignoring malformed stop words"),
            }
        }

        settings
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "search data file not loaded");
            None
        }
    }
}
