//! Language-model and retrieval clients for the assistant.
//!
//! [`LanguageModel`] covers both turns the assistant makes: workflow
//! classification via function calling, and plain answer generation over
//! retrieved context. [`ContextStore`] is the vector-search seam; the
//! embedding pipeline behind it is an external service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{OpenAiSettings, RetrievalSettings};

/// Boxed error type shared by model and retrieval calls.
pub type LlmError = Box<dyn std::error::Error + Send + Sync>;

/// A workflow the model selected, with the parameters it extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowCall {
    pub name: String,
    pub arguments: Value,
}

/// Classification and answer generation, as the assistant needs them.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Asks the model whether `input` maps onto one of the catalog's
    /// workflows. `None` means no workflow matched.
    async fn select_workflow(
        &self,
        input: &str,
        catalog: &[Value],
    ) -> Result<Option<WorkflowCall>, LlmError>;

    /// Generates an answer to `question` grounded in the retrieved `context`.
    async fn answer(&self, question: &str, context: &[String]) -> Result<String, LlmError>;
}

/// Similarity search over the external vector store.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// The `k` documents most similar to `query`.
    async fn similar(&self, query: &str, k: usize) -> Result<Vec<String>, LlmError>;
}

const SYSTEM_PROMPT: &str = "You are a network assistant running network automation workflows \
such as device onboarding, provisioning to sites, and software upgrades.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    /// The model returns arguments as a JSON-encoded string.
    arguments: String,
}

/// [`LanguageModel`] over the OpenAI chat-completions API.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    async fn chat(&self, body: &Value) -> Result<ChatResponse, LlmError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn select_workflow(
        &self,
        input: &str,
        catalog: &[Value],
    ) -> Result<Option<WorkflowCall>, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": input },
            ],
            "functions": catalog,
            "function_call": "auto",
        });
        let response = self.chat(&body).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or("chat completion returned no choices")?;
        if choice.finish_reason.as_deref() != Some("function_call") {
            debug!("[LLM] No function call identified");
            return Ok(None);
        }
        let call = choice
            .message
            .function_call
            .ok_or("finish_reason was function_call but no call present")?;
        let arguments: Value = serde_json::from_str(&call.arguments)?;
        Ok(Some(WorkflowCall {
            name: call.name,
            arguments,
        }))
    }

    async fn answer(&self, question: &str, context: &[String]) -> Result<String, LlmError> {
        let stuffed = format!(
            "Answer the question using the following context.\n\nContext:\n{}\n\nQuestion: {question}",
            context.join("\n---\n")
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": stuffed },
            ],
        });
        let response = self.chat(&body).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or("chat completion returned no choices")?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    /// One row of documents per query text.
    #[serde(default)]
    documents: Vec<Vec<String>>,
}

/// [`ContextStore`] over the vector-search server's HTTP API.
pub struct ChromaStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl ChromaStore {
    pub fn new(settings: &RetrievalSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
        })
    }
}

#[async_trait]
impl ContextStore for ChromaStore {
    async fn similar(&self, query: &str, k: usize) -> Result<Vec<String>, LlmError> {
        let body = serde_json::json!({
            "query_texts": [query],
            "n_results": k,
            "include": ["documents"],
        });
        let response = self
            .http
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.base_url, self.collection
            ))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.documents.into_iter().next().unwrap_or_default())
    }
}
