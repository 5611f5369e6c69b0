//! Configuration types for a debate-feedback review.
//!
//! Every knob lives in [`CoachConfig`], built via its [`CoachConfigBuilder`]
//! or read from the environment with [`CoachConfig::from_env`]. The API key is
//! never compiled in: it comes from the builder or from
//! `DEBATE_COACH_API_KEY` / `OPENAI_API_KEY`.

use crate::error::CoachError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default OpenAI-compatible API root; `/chat/completions` is appended.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variables consulted for the bearer key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["DEBATE_COACH_API_KEY", "OPENAI_API_KEY"];

/// Configuration for a review.
///
/// # Example
/// ```rust
/// use debate_coach::CoachConfig;
///
/// let config = CoachConfig::builder()
///     .model("gpt-4o-mini")
///     .max_input_chars(3500)
///     .max_tokens(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_input_chars, 3500);
/// ```
#[derive(Clone)]
pub struct CoachConfig {
    /// Chat model identifier. Default: `gpt-4`.
    pub model: String,

    /// Provider-SDK name (e.g. "openai", "anthropic", "ollama").
    ///
    /// When set (or when `provider` is set) the request goes through
    /// `edgequake-llm` instead of the direct HTTP transport.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// OpenAI-compatible API root for the direct HTTP transport.
    pub api_base_url: String,

    /// Bearer key for the direct HTTP transport. If None, read from the
    /// environment at request time.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 350.
    ///
    /// Together with the 250-word instruction in the prompt this keeps the
    /// report short enough to fit on one page.
    pub max_tokens: usize,

    /// Characters of extracted text sent to the model. Default: 3000.
    pub max_input_chars: usize,

    /// Timeout for the single feedback request in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom prompt template; `{text}` marks where the document goes.
    /// If None, uses [`crate::prompts::DEBATE_COACH_PROMPT`].
    pub prompt_template: Option<String>,

    /// Page geometry and font of the exported report.
    pub layout: PdfLayout,

    /// Largest accepted upload in bytes (web UI). Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            api_key: None,
            temperature: 0.4,
            max_tokens: 350,
            max_input_chars: 3000,
            api_timeout_secs: 60,
            prompt_template: None,
            layout: PdfLayout::default(),
            max_upload_bytes: 20 * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CoachConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_input_chars", &self.max_input_chars)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("layout", &self.layout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl CoachConfig {
    /// Create a new builder for `CoachConfig`.
    pub fn builder() -> CoachConfigBuilder {
        CoachConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `DEBATE_COACH_*` environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Result<Self, CoachError> {
        let mut builder = Self::builder();

        if let Some(model) = env_string("DEBATE_COACH_MODEL") {
            builder = builder.model(model);
        }
        if let Some(name) = env_string("DEBATE_COACH_PROVIDER") {
            builder = builder.provider_name(name);
        }
        if let Some(base) = env_string("DEBATE_COACH_API_BASE") {
            builder = builder.api_base_url(base);
        }
        if let Some(key) = env_string("DEBATE_COACH_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(t) = env_parse::<f32>("DEBATE_COACH_TEMPERATURE") {
            builder = builder.temperature(t);
        }
        if let Some(n) = env_parse::<usize>("DEBATE_COACH_MAX_TOKENS") {
            builder = builder.max_tokens(n);
        }
        if let Some(n) = env_parse::<usize>("DEBATE_COACH_MAX_INPUT_CHARS") {
            builder = builder.max_input_chars(n);
        }
        if let Some(secs) = env_parse::<u64>("DEBATE_COACH_API_TIMEOUT") {
            builder = builder.api_timeout_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("DEBATE_COACH_MAX_UPLOAD") {
            builder = builder.max_upload_bytes(n);
        }

        builder.build()
    }

    /// Resolve the bearer key: explicit config first, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        API_KEY_ENV_VARS.iter().find_map(|var| env_string(var))
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    env_string(var).and_then(|v| v.trim().parse().ok())
}

/// Builder for [`CoachConfig`].
#[derive(Debug)]
pub struct CoachConfigBuilder {
    config: CoachConfig,
}

impl CoachConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn layout(mut self, layout: PdfLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CoachConfig, CoachError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(CoachError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_input_chars == 0 {
            return Err(CoachError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(CoachError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(CoachError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(CoachError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains("{text}") {
                return Err(CoachError::InvalidConfig(
                    "Prompt template must contain a {text} placeholder".into(),
                ));
            }
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Geometry of the exported feedback report, in PDF points (1/72 inch).
///
/// The text block starts at `(origin_x, page_height - top_offset)` and each
/// line moves down by `leading`. There is no pagination: lines below the
/// page edge are clipped by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub origin_x: f32,
    pub top_offset: f32,
    pub font_size: f32,
    pub leading: f32,
}

impl Default for PdfLayout {
    /// US Letter, Helvetica 11 pt, text starting 40 pt from the left and
    /// 50 pt from the top.
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            origin_x: 40.0,
            top_offset: 50.0,
            font_size: 11.0,
            leading: 11.0 * 1.2,
        }
    }
}

impl PdfLayout {
    /// Baseline of the first text line.
    pub fn origin_y(&self) -> f32 {
        self.page_height - self.top_offset
    }

    fn validate(&self) -> Result<(), CoachError> {
        if self.page_width <= 0.0 || self.page_height <= 0.0 {
            return Err(CoachError::InvalidConfig(
                "Page dimensions must be positive".into(),
            ));
        }
        if self.font_size <= 0.0 || self.leading <= 0.0 {
            return Err(CoachError::InvalidConfig(
                "Font size and leading must be positive".into(),
            ));
        }
        if self.top_offset < 0.0 || self.top_offset >= self.page_height {
            return Err(CoachError::InvalidConfig(format!(
                "Top offset {} does not fit a {}pt page",
                self.top_offset, self.page_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_page_report() {
        let config = CoachConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.max_input_chars, 3000);
        assert_eq!(config.max_tokens, 350);
        assert!((config.temperature - 0.4).abs() < f32::EPSILON);
        assert!(config.api_key.is_none());

        let layout = config.layout;
        assert_eq!(layout.origin_x, 40.0);
        assert_eq!(layout.origin_y(), 742.0);
        assert_eq!(layout.font_size, 11.0);
    }

    #[test]
    fn builder_rejects_zero_input_bound() {
        let err = CoachConfig::builder().max_input_chars(0).build().unwrap_err();
        assert!(err.to_string().contains("max_input_chars"));
    }

    #[test]
    fn builder_rejects_template_without_placeholder() {
        let err = CoachConfig::builder()
            .prompt_template("Give feedback.")
            .build()
            .unwrap_err();
        assert!(matches!(err, CoachError::InvalidConfig(_)));
    }

    #[test]
    fn builder_trims_trailing_slash_and_clamps_temperature() {
        let config = CoachConfig::builder()
            .api_base_url("http://localhost:9999/v1/")
            .temperature(7.0)
            .build()
            .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9999/v1");
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_non_http_base() {
        let err = CoachConfig::builder()
            .api_base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = CoachConfig::builder()
            .api_key("sk-secret-value")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret-value"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn explicit_api_key_wins() {
        let config = CoachConfig::builder().api_key("sk-explicit").build().unwrap();
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn layout_rejects_offset_off_page() {
        let layout = PdfLayout {
            top_offset: 900.0,
            ..PdfLayout::default()
        };
        assert!(CoachConfig::builder().layout(layout).build().is_err());
    }
}
