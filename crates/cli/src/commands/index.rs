//! Search index maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Rebuild the product index from the catalog
//! brico-cli reindex
//!
//! # Push ranking, synonyms and stop words without touching documents
//! brico-cli configure-index --data-dir data/search
//! brico-cli configure-index --synonyms synonyms.json --stop-words stopwords.json
//!
//! # Refresh or remove one product after a catalog write
//! brico-cli index upsert 42
//! brico-cli index delete 42
//! ```

use std::path::{Path, PathBuf};

use brico_core::ProductId;
use brico_storefront::config::StorefrontConfig;
use brico_storefront::search::{IndexSettings, Indexer, SearchBackend};
use serde_json::json;

use super::{CommandError, open_index, open_store, print_report};

/// Rebuild the whole index and print the report.
///
/// # Errors
///
/// Returns an error if the catalog or the index fails mid-run.
pub async fn reindex(batch_size: Option<u32>) -> Result<(), CommandError> {
    let (config, store) = open_store().await?;
    let backend = open_index(&config)?;

    let mut options = config.indexer_options();
    if let Some(size) = batch_size {
        options.batch_size = size;
    }
    let settings = IndexSettings::load(&config.reindex.search_data_dir);

    let report = Indexer::new(&store, &backend, options)
        .reindex_all(&settings)
        .await?;
    print_report(&report)
}

fn read_file(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Resolve index settings from a data directory plus explicit files.
///
/// Unlike the server, explicit files must exist and parse.
///
/// # Errors
///
/// Returns an error if an explicit file is missing or malformed.
pub fn resolve_settings(
    data_dir: &Path,
    synonyms: Option<&Path>,
    stop_words: Option<&Path>,
) -> Result<IndexSettings, CommandError> {
    let mut settings = IndexSettings::load(data_dir);

    if let Some(path) = synonyms {
        settings = settings
            .with_synonyms_json(&read_file(path)?)
            .map_err(|source| CommandError::Json {
                path: path.display().to_string(),
                source,
            })?;
    }
    if let Some(path) = stop_words {
        settings = settings
            .with_stop_words_json(&read_file(path)?)
            .map_err(|source| CommandError::Json {
                path: path.display().to_string(),
                source,
            })?;
    }

    Ok(settings)
}

/// Apply index settings only.
///
/// # Errors
///
/// Returns an error if a settings file is unreadable or the index rejects
/// the settings.
pub async fn configure(
    data_dir: Option<PathBuf>,
    synonyms: Option<PathBuf>,
    stop_words: Option<PathBuf>,
) -> Result<(), CommandError> {
    let config = StorefrontConfig::from_env()?;
    let backend = open_index(&config)?;

    let data_dir = data_dir.unwrap_or_else(|| config.reindex.search_data_dir.clone());
    let settings = resolve_settings(&data_dir, synonyms.as_deref(), stop_words.as_deref())?;

    backend.apply_settings(&settings).await?;
    print_report(&json!({
        "synonyms": settings.synonyms.len(),
        "stopWords": settings.stop_words.len(),
    }))
}

/// Refresh one product's document.
///
/// # Errors
///
/// Returns an error if the catalog or the index fails.
pub async fn upsert(id: i32) -> Result<(), CommandError> {
    let (config, store) = open_store().await?;
    let backend = open_index(&config)?;

    let indexed = Indexer::new(&store, &backend, config.indexer_options())
        .upsert_product(ProductId::new(id))
        .await?;
    print_report(&json!({ "id": id, "indexed": indexed }))
}

/// Remove one product's document.
///
/// # Errors
///
/// Returns an error if the index fails.
pub async fn delete(id: i32) -> Result<(), CommandError> {
    let (config, store) = open_store().await?;
    let backend = open_index(&config)?;

    Indexer::new(&store, &backend, config.indexer_options())
        .delete_product(ProductId::new(id))
        .await?;
    print_report(&json!({ "id": id, "deleted": true }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("brico-cli-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_explicit_files_override_data_dir() {
        let dir = temp_dir("override");
        let synonyms = dir.join("custom-synonyms.json");
        std::fs::write(&synonyms, r#"{"llave":["clave"]}"#).unwrap();

        let settings = resolve_settings(&dir, Some(&synonyms), None).unwrap();
        assert_eq!(settings.synonyms.len(), 1);
        assert_eq!(settings.synonyms["llave"], vec!["clave".to_owned()]);
        assert_eq!(settings.stop_words, IndexSettings::default().stop_words);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_explicit_files_must_exist_and_parse() {
        let dir = temp_dir("strict");
        let broken = dir.join("broken.json");
        std::fs::write(&broken, "[not json").unwrap();

        assert!(matches!(
            resolve_settings(&dir, None, Some(&broken)),
            Err(CommandError::Json { .. })
        ));
        assert!(matches!(
            resolve_settings(&dir, Some(&dir.join("absent.json")), None),
            Err(CommandError::Io { .. })
        ));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
