//! Feedback request: extracted text → one chat-completion call → [`Feedback`].
//!
//! The text is cut to `max_input_chars` characters, embedded in the coaching
//! prompt from [`crate::prompts`], and sent in a single request. There is no
//! retry: a failed call surfaces as a [`FeedbackError`] that the caller
//! branches on, never as text that looks like feedback.
//!
//! ## Transports
//!
//! * **Http** — `POST {api_base_url}/chat/completions` with
//!   `Authorization: Bearer <key>` and an OpenAI-style JSON body. Works with
//!   any OpenAI-compatible endpoint.
//! * **Provider** — an `edgequake-llm` [`LLMProvider`], injected through the
//!   config or created by name; the SDK reads its own credentials.

use crate::config::CoachConfig;
use crate::error::FeedbackError;
use crate::output::Feedback;
use crate::pipeline::postprocess::clean_feedback;
use crate::prompts::build_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Return the first `max_chars` characters of `text` and whether anything
/// was cut. Never splits a multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

// ── Wire types (direct HTTP transport) ───────────────────────────────────

/// JSON body of a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Build the request body for `prompt` from the config.
pub fn build_request(prompt: String, config: &CoachConfig) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![WireMessage {
            role: "user".to_string(),
            content: prompt,
        }],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Raw answer of a transport before cleanup.
#[derive(Debug)]
struct Completion {
    content: String,
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Parse a 2xx chat-completion body into its first message's content.
fn parse_completion(body: &str) -> Result<Completion, FeedbackError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| FeedbackError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| {
            FeedbackError::MalformedResponse("missing choices[0].message.content".into())
        })?;

    Ok(Completion {
        content,
        prompt_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
        completion_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
    })
}

// ── Transport resolution ─────────────────────────────────────────────────

/// How the feedback request reaches the model.
pub enum Transport {
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
    },
    Provider {
        name: String,
        provider: Arc<dyn LLMProvider>,
    },
}

impl Transport {
    /// Short name for logs and stats.
    pub fn label(&self) -> &str {
        match self {
            Transport::Http { .. } => "http",
            Transport::Provider { name, .. } => name,
        }
    }
}

/// Resolve the transport, from most-specific to least-specific:
///
/// 1. A pre-built provider in `config.provider`.
/// 2. A provider created by name (`config.provider_name`) for `config.model`.
/// 3. The direct HTTP transport with the key from the config or environment.
pub fn resolve_transport(config: &CoachConfig) -> Result<Transport, FeedbackError> {
    if let Some(ref provider) = config.provider {
        return Ok(Transport::Provider {
            name: config
                .provider_name
                .clone()
                .unwrap_or_else(|| "custom".to_string()),
            provider: Arc::clone(provider),
        });
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            FeedbackError::NotConfigured {
                hint: format!("Could not create provider '{name}': {e}"),
            }
        })?;
        return Ok(Transport::Provider {
            name: name.clone(),
            provider,
        });
    }

    let api_key = config
        .resolve_api_key()
        .ok_or_else(|| FeedbackError::NotConfigured {
            hint: "Set DEBATE_COACH_API_KEY or OPENAI_API_KEY, or choose a provider with \
                   DEBATE_COACH_PROVIDER."
                .to_string(),
        })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .build()
        .map_err(|e| FeedbackError::Transport(e.to_string()))?;

    Ok(Transport::Http {
        client,
        endpoint: format!("{}/chat/completions", config.api_base_url),
        api_key,
    })
}

// ── Request ──────────────────────────────────────────────────────────────

/// Ask the model for debate-coaching feedback on `text`.
///
/// # Errors
/// Any failure, including a non-2xx status, is a [`FeedbackError`]; the
/// `Ok` value is always genuine model output.
pub async fn request_feedback(text: &str, config: &CoachConfig) -> Result<Feedback, FeedbackError> {
    let transport = resolve_transport(config)?;
    request_feedback_with(&transport, text, config).await
}

/// [`request_feedback`] over an already resolved transport.
pub async fn request_feedback_with(
    transport: &Transport,
    text: &str,
    config: &CoachConfig,
) -> Result<Feedback, FeedbackError> {
    let start = Instant::now();
    let (excerpt, truncated) = truncate_chars(text, config.max_input_chars);
    let submitted_chars = excerpt.chars().count();
    if truncated {
        warn!(
            "Document truncated to {} of {} chars before the feedback request",
            submitted_chars,
            text.chars().count()
        );
    }

    let prompt = build_prompt(config.prompt_template.as_deref(), excerpt);
    info!(
        "Requesting feedback via {} (model {}, {} chars)",
        transport.label(),
        config.model,
        submitted_chars
    );

    let completion = match transport {
        Transport::Http {
            client,
            endpoint,
            api_key,
        } => send_http(client, endpoint, api_key, build_request(prompt, config), config).await?,
        Transport::Provider { name, provider } => {
            send_provider(name, provider, prompt, config).await?
        }
    };

    let content = clean_feedback(&completion.content);
    if content.is_empty() {
        return Err(FeedbackError::EmptyResponse);
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(
        "Feedback: {} chars, {:?} prompt tokens, {:?} completion tokens, {}ms",
        content.len(),
        completion.prompt_tokens,
        completion.completion_tokens,
        duration_ms
    );

    Ok(Feedback {
        content,
        model: config.model.clone(),
        transport: transport.label().to_string(),
        submitted_chars,
        truncated,
        prompt_tokens: completion.prompt_tokens,
        completion_tokens: completion.completion_tokens,
        duration_ms,
    })
}

async fn send_http(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    body: ChatCompletionRequest,
    config: &CoachConfig,
) -> Result<Completion, FeedbackError> {
    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            FeedbackError::Timeout {
                secs: config.api_timeout_secs,
            }
        } else {
            FeedbackError::Transport(e.to_string())
        }
    };

    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(map_send_err)?;

    let status = response.status();
    let text = response.text().await.map_err(map_send_err)?;

    if !status.is_success() {
        warn!("Feedback API returned HTTP {}", status.as_u16());
        return Err(FeedbackError::ApiStatus {
            status: status.as_u16(),
            body: text,
        });
    }

    parse_completion(&text)
}

async fn send_provider(
    name: &str,
    provider: &Arc<dyn LLMProvider>,
    prompt: String,
    config: &CoachConfig,
) -> Result<Completion, FeedbackError> {
    let messages = vec![ChatMessage::user(prompt.as_str())];
    let options = build_options(config);

    let call = provider.chat(&messages, Some(&options));
    let response = tokio::time::timeout(Duration::from_secs(config.api_timeout_secs), call)
        .await
        .map_err(|_| FeedbackError::Timeout {
            secs: config.api_timeout_secs,
        })?
        .map_err(|e| FeedbackError::Provider {
            provider: name.to_string(),
            detail: e.to_string(),
        })?;

    Ok(Completion {
        content: response.content,
        prompt_tokens: Some(response.prompt_tokens as u64),
        completion_tokens: Some(response.completion_tokens as u64),
    })
}

/// Build `CompletionOptions` from the config.
fn build_options(config: &CoachConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
