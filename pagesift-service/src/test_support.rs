//! Stubs shared by service and API tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use axum::{Json, Router, routing::post};
use bytes::Bytes;
use serde_json::Value;
use tokio::net::TcpListener;

use crate::config::{AppConfig, OpenAiConfig, StorageBackend};
use crate::error::StorageError;
use crate::keywords::{KeywordSet, KeywordSource};
use crate::service::PageFilterService;
use crate::storage::{MemoryStore, UploadHandle, UploadStore};

/// Keyword source that returns a fixed set and counts calls
#[derive(Default)]
pub struct StaticKeywords {
    keywords: KeywordSet,
    calls: AtomicUsize,
}

impl StaticKeywords {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeywordSource for StaticKeywords {
    async fn derive(&self, _instruction: &str) -> KeywordSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keywords.clone()
    }
}

/// Memory store that counts every operation
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    stores: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingStore {
    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl UploadStore for CountingStore {
    async fn store(&self, data: Bytes) -> Result<UploadHandle, StorageError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(data).await
    }

    async fn read_all(&self, handle: &UploadHandle) -> Result<Bytes, StorageError> {
        self.inner.read_all(handle).await
    }

    async fn release(&self, handle: UploadHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(handle).await
    }
}

/// Service wired to the given stubs, with memory storage configured.
pub fn stub_service(
    keywords: Arc<StaticKeywords>,
    store: Arc<CountingStore>,
) -> Arc<PageFilterService> {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    stub_service_with_config(config, keywords, store)
}

/// Service wired to the given stubs under an explicit configuration.
pub fn stub_service_with_config(
    config: AppConfig,
    keywords: Arc<StaticKeywords>,
    store: Arc<CountingStore>,
) -> Arc<PageFilterService> {
    Arc::new(PageFilterService::new(config, keywords, store))
}

/// Local chat-completion endpoint that answers every request with a fixed
/// status and body and remembers the last request it was sent.
pub struct CompletionServer {
    base_url: String,
    last_request: Arc<Mutex<Option<Value>>>,
}

impl CompletionServer {
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let last_request = Arc::new(Mutex::new(None));
        let recorded = last_request.clone();
        let body = body.to_string();

        let app = Router::new().route(
            "/chat/completions",
            post(move |Json(request): Json<Value>| {
                let recorded = recorded.clone();
                let body = body.clone();
                async move {
                    *recorded.lock().unwrap() = Some(request);
                    (status, [(header::CONTENT_TYPE, "application/json")], body)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            last_request,
        }
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            ..OpenAiConfig::default()
        }
    }

    pub fn last_request(&self) -> Option<Value> {
        self.last_request.lock().unwrap().clone()
    }
}

/// A well-formed completion response whose only choice says `content`.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}
