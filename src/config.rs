use crate::defaults;
use crate::error::{NarratorError, Result};
use crate::narration::VoiceSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub voice: VoiceSettings,
    pub engine: EngineConfig,
}

/// Section scheduling and chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_chunk_chars: usize,
    pub grace_period_ms: u64,
    pub inter_section_pause_ms: u64,
    pub progress_interval_ms: u64,
}

/// Narration engine selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Executable used by the `command` engine.
    pub command: String,
    /// Extra arguments. A `{text}` argument is replaced by the utterance.
    pub args: Vec<String>,
}

/// Which narration engine to build
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// External text-to-speech command such as espeak-ng.
    Command,
    /// Write chunks to stdout, paced like speech.
    Print,
}

impl std::str::FromStr for EngineKind {
    type Err = NarratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(EngineKind::Command),
            "print" => Ok(EngineKind::Print),
            other => Err(NarratorError::ConfigInvalidValue {
                key: "engine.kind".to_string(),
                message: format!("unknown engine '{other}', expected 'command' or 'print'"),
            }),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: defaults::MAX_CHUNK_CHARS,
            grace_period_ms: defaults::GRACE_PERIOD_MS,
            inter_section_pause_ms: defaults::INTER_SECTION_PAUSE_MS,
            progress_interval_ms: defaults::PROGRESS_INTERVAL_MS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Command,
            command: defaults::ENGINE_COMMAND.to_string(),
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NARRATOR_ENGINE → engine.kind
    /// - NARRATOR_ENGINE_COMMAND → engine.command
    /// - NARRATOR_MAX_CHUNK_CHARS → scheduler.max_chunk_chars
    ///
    /// Empty or unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(engine) = std::env::var("NARRATOR_ENGINE")
            && let Ok(kind) = engine.parse::<EngineKind>()
        {
            self.engine.kind = kind;
        }

        if let Ok(command) = std::env::var("NARRATOR_ENGINE_COMMAND")
            && !command.is_empty()
        {
            self.engine.command = command;
        }

        if let Ok(max) = std::env::var("NARRATOR_MAX_CHUNK_CHARS")
            && let Ok(max) = max.trim().parse::<usize>()
        {
            self.scheduler.max_chunk_chars = max;
        }

        self
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(NarratorError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.scheduler.max_chunk_chars == 0 {
            return invalid("scheduler.max_chunk_chars", "must be at least 1");
        }
        if self.scheduler.progress_interval_ms == 0 {
            return invalid("scheduler.progress_interval_ms", "must be at least 1");
        }
        if self.voice.rate.is_nan() || self.voice.rate <= 0.0 {
            return invalid("voice.rate", "must be positive");
        }
        if !(0.0..=2.0).contains(&self.voice.pitch) {
            return invalid("voice.pitch", "must be between 0.0 and 2.0");
        }
        if !(0.0..=1.0).contains(&self.voice.volume) {
            return invalid("voice.volume", "must be between 0.0 and 1.0");
        }
        if self.engine.kind == EngineKind::Command && self.engine.command.trim().is_empty() {
            return invalid("engine.command", "must not be empty for the command engine");
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/narrator/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("narrator").join("config.toml"))
            .ok_or_else(|| NarratorError::Other("Could not determine config directory".to_string()))
    }

    /// Serialize as TOML for `config show` and `config init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| NarratorError::ConfigParse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_narrator_env() {
        remove_env("NARRATOR_ENGINE");
        remove_env("NARRATOR_ENGINE_COMMAND");
        remove_env("NARRATOR_MAX_CHUNK_CHARS");
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.scheduler.max_chunk_chars, 250);
        assert_eq!(config.scheduler.grace_period_ms, 2000);
        assert_eq!(config.scheduler.inter_section_pause_ms, 300);
        assert_eq!(config.scheduler.progress_interval_ms, 300);

        assert_eq!(config.voice.rate, 1.1);
        assert_eq!(config.voice.pitch, 1.0);
        assert_eq!(config.voice.volume, 1.0);

        assert_eq!(config.engine.kind, EngineKind::Command);
        assert_eq!(config.engine.command, "espeak-ng");
        assert!(config.engine.args.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_temp(
            r#"
            [scheduler]
            max_chunk_chars = 120
            grace_period_ms = 3000
            inter_section_pause_ms = 0
            progress_interval_ms = 100

            [voice]
            rate = 0.9
            pitch = 1.2
            volume = 0.5

            [engine]
            kind = "print"
            command = "say"
            args = ["-v", "Alex", "{text}"]
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.scheduler.max_chunk_chars, 120);
        assert_eq!(config.scheduler.grace_period_ms, 3000);
        assert_eq!(config.scheduler.inter_section_pause_ms, 0);
        assert_eq!(config.scheduler.progress_interval_ms, 100);
        assert_eq!(config.voice.rate, 0.9);
        assert_eq!(config.voice.volume, 0.5);
        assert_eq!(config.engine.kind, EngineKind::Print);
        assert_eq!(config.engine.command, "say");
        assert_eq!(config.engine.args, vec!["-v", "Alex", "{text}"]);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_temp(
            r#"
            [scheduler]
            grace_period_ms = 500
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.scheduler.grace_period_ms, 500);
        assert_eq!(config.scheduler.max_chunk_chars, 250);
        assert_eq!(config.voice, VoiceSettings::default());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_temp(
            r#"
            [scheduler
            grace_period_ms = "broken
        "#,
        );

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_unknown_engine_kind_is_rejected() {
        let temp_file = write_temp("[engine]\nkind = \"browser\"\n");
        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_narrator_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_reports_invalid_toml() {
        let temp_file = write_temp("[scheduler\n");
        let err = Config::load_or_default(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_env_override_engine() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrator_env();

        set_env("NARRATOR_ENGINE", "Print");
        set_env("NARRATOR_ENGINE_COMMAND", "spd-say");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.engine.kind, EngineKind::Print);
        assert_eq!(config.engine.command, "spd-say");

        clear_narrator_env();
    }

    #[test]
    fn test_env_override_chunk_size() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrator_env();

        set_env("NARRATOR_MAX_CHUNK_CHARS", "80");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.scheduler.max_chunk_chars, 80);

        clear_narrator_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrator_env();

        set_env("NARRATOR_ENGINE", "browser");
        set_env("NARRATOR_ENGINE_COMMAND", "");
        set_env("NARRATOR_MAX_CHUNK_CHARS", "lots");
        let config = Config::default().with_env_overrides();

        assert_eq!(config, Config::default());

        clear_narrator_env();
    }

    #[test]
    fn test_validate_rejects_zero_chunk_bound() {
        let mut config = Config::default();
        config.scheduler.max_chunk_chars = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            NarratorError::ConfigInvalidValue { ref key, .. } if key == "scheduler.max_chunk_chars"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_voice() {
        let mut config = Config::default();
        config.voice.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.voice.rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_allows_print_without_command() {
        let mut config = Config::default();
        config.engine.kind = EngineKind::Print;
        config.engine.command.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let Ok(path) = Config::default_path() else {
            return;
        };
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("narrator"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_toml_output_loads_back() {
        let mut config = Config::default();
        config.engine.args = vec!["{text}".to_string()];

        let temp_file = write_temp(&config.to_toml().unwrap());
        assert_eq!(Config::load(temp_file.path()).unwrap(), config);
    }
}
