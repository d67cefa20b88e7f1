//! System instruction loading and context composition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{Error, Result};

/// Tracing target for prompt operations.
const TRACING_TARGET: &str = "tutor_server::service::prompt";

/// Built-in system instruction used when no prompt file is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a patient teaching assistant \
for a university data-structures course. Help students reason about their \
questions step by step and never hand out assignment solutions directly.";

/// The cached system instruction.
///
/// Loaded once at startup. When dev reload is enabled the file is re-read
/// on every access so prompt edits take effect without a restart; read
/// failures fall back to the cached copy.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    inner: Arc<PromptInner>,
}

#[derive(Debug)]
struct PromptInner {
    cached: String,
    path: Option<PathBuf>,
    reload: bool,
}

impl SystemPrompt {
    /// Loads the system instruction.
    ///
    /// Reads the given file (trimmed) or falls back to
    /// [`DEFAULT_SYSTEM_PROMPT`] when no path is configured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configured file cannot be read.
    pub fn load(path: Option<&Path>, reload: bool) -> Result<Self> {
        let cached = match path {
            Some(path) => read_prompt(path)?,
            None => DEFAULT_SYSTEM_PROMPT.to_owned(),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            from_file = path.is_some(),
            reload,
            prompt_len = cached.len(),
            "System instruction loaded"
        );

        Ok(Self {
            inner: Arc::new(PromptInner {
                cached,
                path: path.map(Path::to_path_buf),
                reload,
            }),
        })
    }

    /// Creates a prompt from a fixed string; used in tests.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(PromptInner {
                cached: text.into(),
                path: None,
                reload: false,
            }),
        }
    }

    /// Returns the base system instruction.
    #[must_use]
    pub fn base(&self) -> String {
        if self.inner.reload
            && let Some(path) = &self.inner.path
        {
            match read_prompt(path) {
                Ok(fresh) => return fresh,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %error,
                        "System instruction reload failed; using cached copy"
                    );
                }
            }
        }

        self.inner.cached.clone()
    }

    /// Returns the instruction with rendered retrieval context appended.
    #[must_use]
    pub fn with_context(&self, rendered_context: &str) -> String {
        let base = self.base();
        if rendered_context.is_empty() {
            base
        } else {
            format!("{base}\n\n{rendered_context}")
        }
    }
}

fn read_prompt(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|text| text.trim().to_owned())
        .map_err(|e| {
            Error::config(format!(
                "cannot read system prompt file {}",
                path.display()
            ))
            .with_source(e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_builtin_prompt() {
        let prompt = SystemPrompt::load(None, false).unwrap();
        assert_eq!(prompt.base(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = SystemPrompt::load(Some(Path::new("/does/not/exist.txt")), false);
        assert!(result.is_err());
    }

    #[test]
    fn context_is_appended_after_blank_line() {
        let prompt = SystemPrompt::from_text("base instruction");
        let composed = prompt.with_context("#1 Handout");

        assert!(composed.starts_with("base instruction\n\n"));
        assert!(composed.ends_with("#1 Handout"));
    }

    #[test]
    fn empty_context_leaves_base_untouched() {
        let prompt = SystemPrompt::from_text("base instruction");
        assert_eq!(prompt.with_context(""), "base instruction");
    }
}
