//! Prompt template for the debate-coach feedback request.
//!
//! Kept in one place so prompt changes are a single edit and tests can
//! inspect the exact text without calling a model. Callers can override the
//! template via [`crate::config::CoachConfig::prompt_template`].

/// Placeholder replaced by the (truncated) document text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default instructional prompt.
pub const DEBATE_COACH_PROMPT: &str = r#"
You are an expert debate coach. Provide constructive, critical feedback in bullet points (max 250 words total) for the following student debate text. Focus on rebuttable claims, weak arguments, unsupported assumptions, and areas for improvement:

{text}
"#;

/// Fill `template` (or the default prompt) with the document text.
///
/// Only the first placeholder is replaced, so a document that itself
/// contains `{text}` is embedded verbatim.
pub fn build_prompt(template: Option<&str>, text: &str) -> String {
    let template = template.unwrap_or(DEBATE_COACH_PROMPT);
    template.replacen(TEXT_PLACEHOLDER, text, 1)
}
