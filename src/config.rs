//! plcgen configuration.
//!
//! Loaded from `~/.plcgen/config.toml`. A missing file means defaults.
//!
//! ```toml
//! knowledge-dir = "/srv/plc/knowledge"
//! top-k = 4
//!
//! [generator]
//! program = "llm"
//! args = ["-m", "gpt-4o"]
//! format = "text"
//! timeout-secs = 120
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    generate::{CommandGenerator, GenerationError, RequestFormat},
    pipeline::Settings,
};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// plcgen configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Directory of reference documents. Defaults to `~/.plcgen/knowledge`.
    pub knowledge_dir: Option<PathBuf>,

    /// Add knowledge-base context to generation prompts.
    pub use_knowledge_base: bool,

    /// Translate non-English requirements before clarification.
    pub multilingual: bool,

    /// Chunks cited per prompt.
    pub top_k: usize,

    /// Attempts per stage before it is reported as failed.
    pub max_attempts: u32,

    /// Shortest input, in characters, worth generating from.
    pub min_input_length: usize,

    /// Entries kept in a session's conversation log.
    pub history_limit: usize,

    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            knowledge_dir: None,
            use_knowledge_base: settings.use_knowledge_base,
            multilingual: settings.multilingual,
            top_k: settings.top_k,
            max_attempts: settings.max_attempts,
            min_input_length: settings.min_input_length,
            history_limit: settings.history_limit,
            generator: GeneratorConfig::default(),
        }
    }
}

/// The external program that produces text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
    pub format: RequestFormat,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            format: RequestFormat::default(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load config from `~/.plcgen/config.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top-k must be at least 1".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max-attempts must be at least 1".to_string());
        }
        if self.history_limit == 0 {
            return Err("history-limit must be at least 1".to_string());
        }
        if self.generator.timeout_secs == 0 {
            return Err("generator.timeout-secs must be at least 1".to_string());
        }
        if let Some(program) = &self.generator.program {
            if program.trim().is_empty() {
                return Err("generator.program is empty".to_string());
            }
        }
        Ok(())
    }

    /// The config file path: `~/.plcgen/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::home().map(|h| h.join("config.toml"))
    }

    /// The plcgen home directory: `~/.plcgen/`.
    pub fn home() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".plcgen"))
    }

    /// The knowledge directory, configured or default.
    pub fn knowledge_dir(&self) -> Option<PathBuf> {
        self.knowledge_dir
            .clone()
            .or_else(|| Self::home().map(|h| h.join("knowledge")))
    }

    pub fn settings(&self) -> Settings {
        Settings {
            multilingual: self.multilingual,
            use_knowledge_base: self.use_knowledge_base,
            top_k: self.top_k,
            max_attempts: self.max_attempts,
            min_input_length: self.min_input_length,
            history_limit: self.history_limit,
        }
    }

    /// The command-backed generator, if a program is configured.
    pub fn generator(&self) -> Result<CommandGenerator, GenerationError> {
        let generator = &self.generator;
        let program = generator
            .program
            .clone()
            .ok_or(GenerationError::NotConfigured)?;
        Ok(CommandGenerator::new(
            program,
            generator.args.clone(),
            generator.format,
            Duration::from_secs(generator.timeout_secs),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.settings(), Settings::default());
        assert!(matches!(
            config.generator(),
            Err(GenerationError::NotConfigured)
        ));
    }

    #[test]
    fn parses_kebab_case_keys() {
        let (_dir, path) = write_config(
            r#"
knowledge-dir = "/srv/kb"
use-knowledge-base = false
multilingual = false
top-k = 2
max-attempts = 5
min-input-length = 4
history-limit = 10

[generator]
program = "llm"
args = ["-m", "local"]
format = "json"
timeout-secs = 30
"#,
        );

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.knowledge_dir(), Some(PathBuf::from("/srv/kb")));
        assert_eq!(
            config.settings(),
            Settings {
                multilingual: false,
                use_knowledge_base: false,
                top_k: 2,
                max_attempts: 5,
                min_input_length: 4,
                history_limit: 10,
            }
        );
        assert_eq!(config.generator.format, RequestFormat::Json);
        assert!(config.generator().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let (_dir, path) = write_config("top-k = 8\n");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.top_k, 8);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.generator.timeout_secs, 120);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let (_dir, path) = write_config("top-k = 0\n");

        let err = Config::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("top-k"));
    }

    #[test]
    fn empty_program_is_rejected() {
        let (_dir, path) = write_config("[generator]\nprogram = \"  \"\n");

        let err = Config::load_from(&path).unwrap_err();

        assert!(err.to_string().contains("generator.program"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_dir, path) = write_config("temperature-unit = \"celsius\"\n");

        let err = Config::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
