//! Search-term derivation from free-text instructions.
//!
//! The language model is asked for a JSON array of literal strings. Any
//! failure along the way (transport, status, unparseable answer) degrades
//! to an empty [`KeywordSet`] instead of an error, so a flaky model never
//! fails a request on its own.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::error_chain;
use crate::llm::{ChatMessage, OpenAiClient};

/// Literal strings to search for in page text
pub type KeywordSet = BTreeSet<String>;

/// Fixed instruction sent ahead of the user's prompt.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant. Read the following prompt and return a \
JSON array of the strings that must be checked for in the PDF file. Return only the JSON array, \
no explanation.";

/// Sampling temperature for keyword requests. Held at zero so the same
/// prompt keeps producing the same search terms.
pub const TEMPERATURE: f32 = 0.0;

/// Anything that can turn an instruction into a keyword set.
///
/// Implementations must not fail: an unusable answer is an empty set.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn derive(&self, instruction: &str) -> KeywordSet;
}

/// Keyword source backed by a chat-completion model
pub struct LlmKeywordSource {
    client: OpenAiClient,
}

impl LlmKeywordSource {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn messages(instruction: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(instruction),
        ]
    }
}

#[async_trait]
impl KeywordSource for LlmKeywordSource {
    async fn derive(&self, instruction: &str) -> KeywordSet {
        match self
            .client
            .chat(Self::messages(instruction), TEMPERATURE)
            .await
        {
            Ok(content) => {
                let keywords = parse_keyword_response(&content);
                debug!(
                    model = %self.client.model(),
                    keyword_count = keywords.len(),
                    ?keywords,
                    "Derived keywords"
                );
                keywords
            }
            Err(e) => {
                warn!(error = %error_chain(&e), "Keyword derivation failed, using empty set");
                KeywordSet::new()
            }
        }
    }
}

/// Pull the JSON array out of a model answer.
///
/// The array spans from the first `[` to the last `]`, newlines included.
/// Scalars are matched by their text form; nulls and nested structures are
/// ignored. No array, or one that fails to parse, gives an empty set.
pub fn parse_keyword_response(content: &str) -> KeywordSet {
    let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) else {
        return KeywordSet::new();
    };
    if end < start {
        return KeywordSet::new();
    }

    match serde_json::from_str::<Vec<Value>>(&content[start..=end]) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "Model answer did not contain a valid JSON array");
            KeywordSet::new()
        }
    }
}
