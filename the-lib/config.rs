//! Completion settings.
//!
//! Settings are usually embedded in a host config file under a
//! `[completion]` table:
//!
//! ```toml
//! [completion]
//! debounce-ms = 80
//! max-options = 20
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected.

use std::time::Duration;

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CompletionConfig {
  /// Quiet period after typing before sources are queried. Explicit
  /// completion requests are never delayed.
  pub debounce_ms:        u64,
  /// Options shown at most, after merging all sources.
  pub max_options:        usize,
  /// `count:` sent with dynamic suggestion queries.
  pub fetch_count:        usize,
  /// Start completing as soon as the query is edited. When off, completion
  /// only opens on request but still refreshes while open.
  pub activate_on_typing: bool,
}

impl Default for CompletionConfig {
  fn default() -> Self {
    Self {
      debounce_ms:        120,
      max_options:        50,
      fetch_count:        50,
      activate_on_typing: true,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
  completion: Option<CompletionConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse completion config: {0}")]
  BadConfig(#[from] toml::de::Error),
}

impl CompletionConfig {
  /// Parses the `[completion]` table of a TOML document. A document without
  /// one yields the defaults.
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    let raw: ConfigRaw = toml::from_str(source)?;
    Ok(raw.completion.unwrap_or_default())
  }

  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}
