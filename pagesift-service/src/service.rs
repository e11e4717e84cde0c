//! Request orchestration for prompt-driven page filtering.
//!
//! A request moves through these stages, stopping at the first fatal error:
//!
//! 1. validate that both a prompt and a document were supplied
//! 2. store the upload
//! 3. derive keywords from the prompt (never fatal)
//! 4. extract per-page text
//! 5. load the page structure
//! 6. evaluate the keep/drop policy for every page
//! 7. reassemble the kept pages into a new PDF
//!
//! The stored upload is released after step 2 regardless of outcome.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::config::{AppConfig, StorageBackend};
use crate::error::{ServiceError, ServiceResult, StorageError};
use crate::keywords::{KeywordSet, KeywordSource, LlmKeywordSource};
use crate::llm::OpenAiClient;
use crate::pdf::{self, SourceDocument};
use crate::selection::select_pages;
use crate::storage::{MemoryStore, TempFileStore, UploadHandle, UploadStore};

/// Result of a successful filtering request
#[derive(Debug)]
pub struct FilteredDocument {
    pub bytes: Vec<u8>,
    pub kept_pages: Vec<usize>,
    pub total_pages: usize,
}

/// Page filtering service
pub struct PageFilterService {
    config: AppConfig,
    keywords: Arc<dyn KeywordSource>,
    store: Arc<dyn UploadStore>,
}

impl PageFilterService {
    /// Create a service from explicit collaborators
    pub fn new(
        config: AppConfig,
        keywords: Arc<dyn KeywordSource>,
        store: Arc<dyn UploadStore>,
    ) -> Self {
        Self {
            config,
            keywords,
            store,
        }
    }

    /// Create a service with the language-model keyword source and the
    /// configured upload storage.
    pub fn from_config(config: AppConfig) -> ServiceResult<Self> {
        let client = OpenAiClient::new(&config.openai, config.require_api_key()?)?;
        let keywords = Arc::new(LlmKeywordSource::new(client));

        let store: Arc<dyn UploadStore> = match config.storage.backend {
            StorageBackend::File => {
                let dir = &config.storage.upload_dir;
                let store = TempFileStore::new(dir).map_err(|source| StorageError::Write {
                    path: dir.display().to_string(),
                    source,
                })?;
                info!(dir = %store.dir().display(), "Using file upload storage");
                Arc::new(store)
            }
            StorageBackend::Memory => {
                info!("Using in-memory upload storage");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::new(config, keywords, store))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Filter `document` down to the lead pages plus every page matching the
    /// keywords derived from `prompt`.
    ///
    /// A missing or empty prompt, or a missing document, is rejected before
    /// any work is done.
    pub async fn process(
        &self,
        prompt: Option<String>,
        document: Option<Bytes>,
    ) -> ServiceResult<FilteredDocument> {
        let (Some(prompt), Some(document)) = (prompt.filter(|p| !p.is_empty()), document) else {
            return Err(ServiceError::InvalidRequest {
                message: "prompt and PDF file are both required".to_string(),
            });
        };

        let handle = self.store.store(document).await?;
        let result = self.run(&prompt, &handle).await;
        self.store.release(handle).await;

        if let Ok(filtered) = &result {
            info!(
                total_pages = filtered.total_pages,
                kept_pages = filtered.kept_pages.len(),
                bytes = filtered.bytes.len(),
                "Filtered PDF"
            );
        }

        result
    }

    async fn run(&self, prompt: &str, handle: &UploadHandle) -> ServiceResult<FilteredDocument> {
        let keywords = self.keywords.derive(prompt).await;
        debug!(keyword_count = keywords.len(), "Keywords ready");

        let data = self.store.read_all(handle).await?;
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || filter_document(&data, &keywords, &prompt))
            .await
            .map_err(|e| ServiceError::Internal {
                message: format!("PDF worker failed: {}", e),
            })?
    }
}

/// Synchronous core: extract, load, select, reassemble.
fn filter_document(
    data: &[u8],
    keywords: &KeywordSet,
    prompt: &str,
) -> ServiceResult<FilteredDocument> {
    let page_texts = pdf::extract_page_texts(data)?;
    let source = SourceDocument::load(data)?;
    let total_pages = source.page_count();

    let kept_pages = select_pages(total_pages, &page_texts, keywords, prompt);
    debug!(?kept_pages, total_pages, "Selected pages");

    let bytes = pdf::rebuild(&source, &kept_pages)?;

    Ok(FilteredDocument {
        bytes,
        kept_pages,
        total_pages,
    })
}
