//! Configuration management for senko.
//!
//! Loads configuration from ${SENKO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::Lookup;
use crate::sheet::DEFAULT_DISMISS_THRESHOLD;

pub mod paths {
    //! Path resolution for senko configuration and data directories.
    //!
    //! SENKO_HOME resolution order:
    //! 1. SENKO_HOME environment variable (if set)
    //! 2. ~/.config/senko (default)

    use std::path::PathBuf;

    /// Returns the senko home directory.
    ///
    /// Checks SENKO_HOME env var first, falls back to ~/.config/senko, and to `./.senko` when
    /// no home directory can be determined.
    pub fn senko_home() -> PathBuf {
        if let Ok(home) = std::env::var("SENKO_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".senko"),
            |h| h.join(".config").join("senko"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        senko_home().join("config.toml")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        senko_home().join("logs")
    }
}

const CONFIG_HEADER: &str = "\
# senko configuration
#
# Every key is optional; missing keys fall back to the defaults written below.
# The API key is never stored here: it is read from the environment variable
# named by `api_key_env`.

";

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.8,
            top_p: 0.9,
            frequency_penalty: 0.1,
            presence_penalty: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Downward drag (pixels) past which releasing the handle dismisses the sheet.
    pub dismiss_threshold: f32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            dismiss_threshold: DEFAULT_DISMISS_THRESHOLD,
        }
    }
}

/// Persona texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub system_prompt: String,
    /// First assistant turn of a fresh session.
    pub welcome: String,
    /// Assistant turn appended after the conversation is cleared.
    pub welcome_after_clear: String,
    /// Hidden user turn sent when the input is empty.
    pub continue_message: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are Senko, an 800-year-old kitsune with fox ears and a fluffy tail. \
                You are warm, curious and sincere, with ancient wisdom and a childlike wonder at \
                modern things. Speak conversationally and let small actions in asterisks, like \
                *tilts head* or *tail swishes*, show how you feel. Keep replies natural and \
                avoid long explanations."
                .to_string(),
            welcome: "*ears perk up and tail swishes excitedly* Welcome! I'm Senko, your fox \
                companion! What would you like to talk about? *tilts head with bright, curious eyes*"
                .to_string(),
            welcome_after_clear: "*ears perk up and tail swishes happily* Hello there! I'm Senko, \
                your fox companion. What would you like to talk about? *tilts head curiously*"
                .to_string(),
            continue_message: "continue".to_string(),
        }
    }
}

/// Key chords per keyboard intent, e.g. `"ctrl+e"` or `"escape"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub edit_last: Vec<String>,
    pub delete_last: Vec<String>,
    pub rewind_to_last: Vec<String>,
    pub dismiss: Vec<String>,
    pub clear: Vec<String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        fn chords(list: &[&str]) -> Vec<String> {
            list.iter().map(ToString::to_string).collect()
        }

        Self {
            edit_last: chords(&["ctrl+e", "meta+e"]),
            delete_last: chords(&["ctrl+delete", "meta+delete"]),
            rewind_to_last: chords(&["ctrl+r", "meta+r"]),
            dismiss: chords(&["escape"]),
            clear: chords(&["ctrl+k", "meta+k"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// How many recent turns (hidden ones included) are sent as context; 0 sends all of them.
    pub history_limit: usize,
    /// How mutation targets are located in the history.
    pub lookup: Lookup,
    pub request: RequestConfig,
    pub sheet: SheetConfig,
    pub persona: PersonaConfig,
    pub keys: KeysConfig,
}

impl Config {
    const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
    const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
    const DEFAULT_API_KEY_ENV: &str = "SENKO_API_KEY";
    const DEFAULT_HISTORY_LIMIT: usize = 20;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, &Self::generate()?)
    }

    /// Renders the default configuration as commented TOML.
    pub fn generate() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config to TOML")?;
        Ok(format!("{CONFIG_HEADER}{body}"))
    }

    /// API key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key_env: Self::DEFAULT_API_KEY_ENV.to_string(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            lookup: Lookup::default(),
            request: RequestConfig::default(),
            sheet: SheetConfig::default(),
            persona: PersonaConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.lookup, Lookup::Id);
        assert!((config.sheet.dismiss_threshold - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "model = \"llama-3.1-8b-instant\"\nlookup = \"content\"\n\n[request]\nmax_tokens = 512\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.lookup, Lookup::Content);
        assert_eq!(config.request.max_tokens, 512);
        assert!((config.request.temperature - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.persona.continue_message, "continue");
        assert_eq!(config.keys, KeysConfig::default());
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "model = [").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.starts_with("# senko configuration"));
        assert!(contents.contains("api_key_env = \"SENKO_API_KEY\""));
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_missing_env_is_none() {
        let config = Config {
            api_key_env: "SENKO_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);
    }
}
