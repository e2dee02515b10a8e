//! Animation script generation and validation.
//!
//! The code model is asked for a plain `draw(ctx, frame)` canvas routine.
//! Whatever comes back is stripped of markdown fences and must still declare
//! the entry point before anything downstream will accept it.

use crate::model::{generate_with_timeout, ModelError, TextModel};
use crate::theme::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::topic::GeneratedTopic;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Literal every accepted script must contain.
pub const ENTRY_POINT_MARKER: &str = "function draw";

const FENCE_LANGUAGES: &[&str] = &["javascript", "js"];

/// Why a generation produced no script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Code model failed: {0}")]
    Model(#[from] ModelError),

    #[error("Generated code has no `{ENTRY_POINT_MARKER}` entry point")]
    MissingEntryPoint,
}

/// A validated animation script, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    content: String,
}

impl Script {
    /// Validate already-sanitized script text.
    pub fn new(content: impl Into<String>) -> Result<Self, ScriptError> {
        let content = content.into();
        if !has_entry_point(&content) {
            return Err(ScriptError::MissingEntryPoint);
        }
        Ok(Self { content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Produces validated scripts from the code model.
#[derive(Clone)]
pub struct ScriptGenerator {
    model: Arc<dyn TextModel>,
    caption: bool,
    timeout: Duration,
}

impl ScriptGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            caption: true,
            timeout: Duration::from_secs(90),
        }
    }

    /// Toggle the on-canvas topic caption requirement.
    pub fn with_caption(mut self, caption: bool) -> Self {
        self.caption = caption;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a script for `topic`.
    ///
    /// Model failures and scripts without the entry point both come back as
    /// errors; the caller treats either as a skipped cycle.
    pub async fn generate(&self, topic: &GeneratedTopic) -> Result<Script, ScriptError> {
        let prompt = build_script_prompt(&topic.topic, topic.style.as_deref(), self.caption);
        debug!(topic = %topic.topic, model = self.model.name(), "requesting script");

        let raw = generate_with_timeout(self.model.as_ref(), &prompt, self.timeout).await?;
        let code = strip_code_fences(&raw);

        Script::new(code).inspect_err(|e| {
            warn!(topic = %topic.topic, error = %e, "rejecting generated script");
        })
    }
}

/// Build the code-generation instruction.
pub fn build_script_prompt(topic: &str, style: Option<&str>, caption: bool) -> String {
    let mut prompt = format!(
        "Write a Javascript function named `draw(ctx, frame)` that draws a {CANVAS_WIDTH}x{CANVAS_HEIGHT} \
         pixel art animation of \"{topic}\" on the provided 2D context `ctx`.\n\n"
    );

    if let Some(style) = style {
        prompt.push_str(&format!(
            "VISUAL STYLE: {style}\n\
             The animation MUST strictly adhere to the \"{style}\" visual style.\n\n"
        ));
    }

    if caption {
        prompt.push_str(&format!(
            "CRITICAL REQUIREMENT:\n\
             Draw the text \"{topic}\" in the bottom-left corner (around x=2, y={}).\n\
             Use a VERY SMALL font: \"8px monospace\" or similar pixel font.\n\
             The text color must be readable against the background (e.g., White with Black outline/shadow, or vice versa).\n\
             The text must be clearly visible but unobtrusive.\n\n",
            CANVAS_HEIGHT - 4
        ));
    }

    prompt.push_str(&format!(
        "The `frame` argument is an incrementing integer.\n\
         Do not use any external libraries. Use only standard Canvas API.\n\
         The canvas size is strictly {CANVAS_WIDTH}x{CANVAS_HEIGHT}.\n\
         Make it colorful and detailed.\n\
         Do NOT wrap in markdown code blocks. Just output the raw code.\n\
         Ensure the function is named 'draw'."
    ));
    prompt
}

/// Remove markdown code fences and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    let mut code = raw.to_string();
    for lang in FENCE_LANGUAGES {
        code = code.replace(&format!("```{lang}"), "");
    }
    code.replace("```", "").trim().to_string()
}

/// Whether `code` declares the `draw` entry point.
pub fn has_entry_point(code: &str) -> bool {
    code.contains(ENTRY_POINT_MARKER)
}
