//! Engine configuration.
//!
//! Loaded from `~/.gambit/config.toml` when present; every knob has a
//! default so an empty or missing file yields a working engine.
//!
//! ```toml
//! [engine]
//! color = "white"
//! strategy = "refine"
//! fallback_on_exhaustion = true
//! narrate_history = false
//!
//! [limits]
//! max_attempts = 5
//! max_iterations = 5
//! approval_threshold = 7
//! plan_refresh_plies = 3
//!
//! [phase]
//! opening_max_plies = 16
//! endgame_material_max = 24
//!
//! [oracle]
//! temperature = 0.7
//! max_tokens = 1024
//! ```

use std::path::{Path, PathBuf};

use gambit_oracle::CompletionRequest;
use gambit_types::Color;
use serde::Deserialize;
use thiserror::Error;

const fn default_color() -> Color {
    Color::White
}

const fn default_true() -> bool {
    true
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_approval_threshold() -> u8 {
    7
}

const fn default_plan_refresh_plies() -> u32 {
    3
}

const fn default_opening_max_plies() -> u32 {
    16
}

const fn default_endgame_material_max() -> u32 {
    24
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    1024
}

/// Which decision protocol selects the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Single-role loop: one oracle request per attempt, validated against
    /// the legal set and retried with feedback.
    Direct,
    /// Two-role loop: a proposer picks a candidate and a critic approves
    /// or rejects it, iterating over a shrinking pool.
    Refine,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Refine => "refine",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Direct
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Side the engine plays.
    #[serde(default = "default_color")]
    pub color: Color,
    #[serde(default)]
    pub strategy: Strategy,
    /// On retry exhaustion, return the top-scored legal move flagged as a
    /// fallback instead of an error.
    #[serde(default = "default_true")]
    pub fallback_on_exhaustion: bool,
    /// Ask the oracle to summarize recent moves before building the
    /// decision prompt. The plain notation join is used when disabled or
    /// when the summary call fails.
    #[serde(default)]
    pub narrate_history: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            color: default_color(),
            strategy: Strategy::default(),
            fallback_on_exhaustion: true,
            narrate_history: false,
        }
    }
}

/// Bounds on oracle-driven loops. Attempt and iteration counts, never
/// wall-clock time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Critic score at or above this approves when no explicit verdict is
    /// stated.
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: u8,
    /// Regenerate the strategic plan once this many plies have passed.
    #[serde(default = "default_plan_refresh_plies")]
    pub plan_refresh_plies: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_iterations: default_max_iterations(),
            approval_threshold: default_approval_threshold(),
            plan_refresh_plies: default_plan_refresh_plies(),
        }
    }
}

/// Phase-classifier thresholds. Tunable policy, applied consistently.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PhaseThresholds {
    /// Plies strictly below this count as the opening, material permitting.
    #[serde(default = "default_opening_max_plies")]
    pub opening_max_plies: u32,
    /// Total material (kings excluded) at or below this is the endgame.
    #[serde(default = "default_endgame_material_max")]
    pub endgame_material_max: u32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            opening_max_plies: default_opening_max_plies(),
            endgame_material_max: default_endgame_material_max(),
        }
    }
}

/// Request shaping for oracle calls issued by the engine.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OracleSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl OracleSettings {
    pub(crate) fn request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub phase: PhaseThresholds,
    #[serde(default)]
    pub oracle: OracleSettings,
}

impl EngineConfig {
    /// Load configuration from the default location.
    ///
    /// Returns `Ok(None)` when no config file exists. Read and parse
    /// failures are errors so a broken file is never silently ignored.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = toml::from_str(&text).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Some(config))
    }
}

/// Default config location: `~/.gambit/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gambit").join("config.toml"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.color, Color::White);
        assert_eq!(config.engine.strategy, Strategy::Direct);
        assert!(config.engine.fallback_on_exhaustion);
        assert!(!config.engine.narrate_history);
        assert_eq!(config.limits.max_attempts, 5);
        assert_eq!(config.limits.max_iterations, 5);
        assert_eq!(config.limits.approval_threshold, 7);
        assert_eq!(config.limits.plan_refresh_plies, 3);
        assert_eq!(config.phase.opening_max_plies, 16);
        assert_eq!(config.phase.endgame_material_max, 24);
        assert_eq!(config.oracle.max_tokens, 1024);
    }

    #[test]
    fn partial_sections_fill_in() {
        let config: EngineConfig = toml::from_str(
            r#"
            [engine]
            color = "black"
            strategy = "refine"

            [limits]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.color, Color::Black);
        assert_eq!(config.engine.strategy, Strategy::Refine);
        assert!(config.engine.fallback_on_exhaustion);
        assert_eq!(config.limits.max_attempts, 3);
        assert_eq!(config.limits.max_iterations, 5);
    }

    #[test]
    fn rejects_unknown_strategy() {
        let result: Result<EngineConfig, _> = toml::from_str(
            r#"
            [engine]
            strategy = "hybrid"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn strategy_names_round_trip() {
        assert_eq!(Strategy::Direct.as_str(), "direct");
        assert_eq!(Strategy::Refine.as_str(), "refine");
    }

    #[test]
    fn load_from_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(EngineConfig::load_from(&path).unwrap().is_none());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nplan_refresh_plies = 6\n").unwrap();
        let config = EngineConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.limits.plan_refresh_plies, 6);
    }

    #[test]
    fn load_from_surfaces_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "limits = \"not a table\"").unwrap();
        let err = EngineConfig::load_from(&path).unwrap_err();
        assert_eq!(err.path(), path);
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn oracle_settings_shape_requests() {
        let settings = OracleSettings {
            temperature: 0.2,
            max_tokens: 256,
        };
        let request = settings.request("pick a move");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, 256);
        assert_eq!(request.prompt, "pick a move");
    }
}
