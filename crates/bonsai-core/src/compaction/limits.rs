//! Model context window limits registry.
//!
//! A frozen lookup table of vendor limits with a three-level fallback:
//! exact id match, dotted-prefix match (a dated or point-release variant
//! falls back to its family), then a family-keyword heuristic. Unknown
//! models get a conservative default rather than an error. User overrides
//! can be loaded from a configuration file and take priority.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Context window and output ceiling for one model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelLimits {
    /// Total context window in tokens (input + output).
    pub context_limit: u32,
    /// Maximum tokens the model will produce in one response.
    pub max_output: u32,
}

impl ModelLimits {
    pub const fn new(context_limit: u32, max_output: u32) -> Self {
        Self {
            context_limit,
            max_output,
        }
    }
}

/// Conservative fallback for models absent from every table.
pub const DEFAULT_MODEL_LIMITS: ModelLimits = ModelLimits::new(16_000, 4_096);

/// Known per-model limits. Maintenance surface: extend as vendors ship new
/// models; exact ids here beat every fallback level.
const KNOWN_MODEL_LIMITS: &[(&str, ModelLimits)] = &[
    // OpenAI
    ("gpt-4o", ModelLimits::new(128_000, 16_384)),
    ("gpt-4o-mini", ModelLimits::new(128_000, 16_384)),
    ("gpt-4.1", ModelLimits::new(1_047_576, 32_768)),
    ("gpt-4.1-mini", ModelLimits::new(1_047_576, 32_768)),
    ("gpt-4.1-nano", ModelLimits::new(1_047_576, 32_768)),
    ("gpt-5", ModelLimits::new(400_000, 128_000)),
    ("gpt-5-mini", ModelLimits::new(400_000, 128_000)),
    ("o3", ModelLimits::new(200_000, 100_000)),
    ("o4-mini", ModelLimits::new(200_000, 100_000)),
    // Anthropic
    ("claude-3-5-sonnet", ModelLimits::new(200_000, 8_192)),
    ("claude-3-5-haiku", ModelLimits::new(200_000, 8_192)),
    ("claude-3-7-sonnet", ModelLimits::new(200_000, 64_000)),
    ("claude-sonnet-4", ModelLimits::new(200_000, 64_000)),
    ("claude-opus-4", ModelLimits::new(200_000, 32_000)),
    ("claude-haiku-4", ModelLimits::new(200_000, 64_000)),
    // Google
    ("gemini-2.0-flash", ModelLimits::new(1_048_576, 8_192)),
    ("gemini-2.5-flash", ModelLimits::new(1_048_576, 65_536)),
    ("gemini-2.5-pro", ModelLimits::new(1_048_576, 65_536)),
];

/// Family keywords for the last fallback level before the default. Longest
/// matching keyword wins.
const FAMILY_LIMITS: &[(&str, ModelLimits)] = &[
    ("claude", ModelLimits::new(200_000, 8_192)),
    ("gpt-5", ModelLimits::new(400_000, 128_000)),
    ("gpt-4", ModelLimits::new(128_000, 16_384)),
    ("gemini", ModelLimits::new(1_048_576, 8_192)),
    ("llama", ModelLimits::new(128_000, 4_096)),
    ("mistral", ModelLimits::new(128_000, 8_192)),
    ("deepseek", ModelLimits::new(131_072, 8_192)),
    ("qwen", ModelLimits::new(131_072, 8_192)),
];

/// User-supplied limit override, keyed by model id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimitOverride {
    pub model: String,
    pub context_limit: u32,
    pub max_output: u32,
}

/// Registry resolving model ids to limits. Pure and side-effect-free at
/// lookup time; it never calls the network.
#[derive(Debug, Clone, Default)]
pub struct ModelLimitsRegistry {
    user_limits: HashMap<String, ModelLimits>,
    config_path: Option<PathBuf>,
}

impl ModelLimitsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that loads user overrides from a specific file.
    pub fn with_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            user_limits: HashMap::new(),
            config_path: Some(path.into()),
        }
    }

    /// Register an override, taking priority over the built-in table.
    pub fn add_limit(&mut self, model: impl Into<String>, limits: ModelLimits) {
        self.user_limits.insert(model.into(), limits);
    }

    /// Load overrides from the configured path (default:
    /// `~/.bonsai/model_limits.json`, a JSON array of overrides). A missing
    /// file is not an error.
    pub async fn load_user_config(&mut self) -> std::io::Result<()> {
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(default_config_path);

        if !path.exists() {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let overrides: Vec<ModelLimitOverride> = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        for entry in overrides {
            self.user_limits.insert(
                entry.model,
                ModelLimits::new(entry.context_limit, entry.max_output),
            );
        }

        tracing::info!(
            count = self.user_limits.len(),
            path = %path.display(),
            "loaded user model limits"
        );
        Ok(())
    }

    /// Resolve limits for a model id through the fallback chain.
    pub fn resolve(&self, model: &str) -> ModelLimits {
        if let Some(limits) = self.exact(model) {
            return limits;
        }

        // Dotted-prefix fallback: a dated or point-release variant resolves
        // to its family, e.g. "family-4.5-20250101" -> "family-4".
        let mut prefix = model;
        while let Some(pos) = prefix.rfind('.') {
            prefix = &prefix[..pos];
            if let Some(limits) = self.exact(prefix) {
                return limits;
            }
        }

        // Family keyword heuristic, longest keyword first.
        let family = FAMILY_LIMITS
            .iter()
            .filter(|(keyword, _)| model.contains(keyword))
            .max_by_key(|(keyword, _)| keyword.len());
        if let Some((_, limits)) = family {
            return *limits;
        }

        tracing::debug!(model, "unknown model id, using conservative default limits");
        DEFAULT_MODEL_LIMITS
    }

    fn exact(&self, model: &str) -> Option<ModelLimits> {
        if let Some(limits) = self.user_limits.get(model) {
            return Some(*limits);
        }
        KNOWN_MODEL_LIMITS
            .iter()
            .find(|(id, _)| *id == model)
            .map(|(_, limits)| *limits)
    }
}

/// Default override file location: `~/.bonsai/model_limits.json`.
pub fn default_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".bonsai").join("model_limits.json")
}
