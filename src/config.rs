//! Configuration management for foiacast using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;
use crate::services::GenerationSettings;
use crate::tts::TtsConfig;

/// Default audio subdirectory name.
const AUDIO_SUBDIR: &str = "audio";

/// Default work subdirectory name.
const WORK_SUBDIR: &str = "work";

/// Default SSE keep-alive interval.
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 15;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Finished programmes and their metadata sidecars.
    pub audio_dir: PathBuf,
    /// Per-run scratch directories.
    pub work_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        // Platform data dir -> Home dir -> Current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("foiacast");
        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            audio_dir: data_dir.join(AUDIO_SUBDIR),
            work_dir: data_dir.join(WORK_SUBDIR),
            data_dir,
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.data_dir, &self.audio_dir, &self.work_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                tracing::error!("Failed to create directory {}: {}", dir.display(), e);
                e
            })?;
        }
        Ok(())
    }
}

/// Dialogue pipeline tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hard ceiling on turns per run, closing included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Fraction of the target length at which the content loop stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fill_ratio: Option<f64>,
    /// Target length when a request does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target_seconds: Option<u32>,
    /// Transcript bytes fed to the title and tag prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_char_budget: Option<usize>,
    /// SSE ping interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_interval_secs: Option<u64>,
}

impl GenerationConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Audio output directory (defaults to `<data_dir>/audio`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_dir: Option<String>,
    /// Work directory (defaults to `<data_dir>/work`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    /// Chat-completion settings.
    #[serde(default, skip_serializing_if = "LlmConfig::is_default")]
    pub llm: LlmConfig,
    /// Speech synthesis settings.
    #[serde(default, skip_serializing_if = "TtsConfig::is_default")]
    pub tts: TtsConfig,
    /// Dialogue pipeline settings.
    #[serde(default, skip_serializing_if = "GenerationConfig::is_default")]
    pub generation: GenerationConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers foiacast config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("foiacast").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found, use defaults with env overrides
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the given format, then apply env overrides.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        let config: Config = match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };
        Ok(config.with_env_overrides())
    }

    /// Environment variables win over file values for credentials and endpoints.
    pub fn with_env_overrides(mut self) -> Self {
        self.llm = self.llm.with_env_overrides();
        self.tts = self.tts.with_env_overrides();
        self
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            *settings = Settings::with_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(ref audio_dir) = self.audio_dir {
            settings.audio_dir = self.resolve_path(audio_dir, base_dir);
        }
        if let Some(ref work_dir) = self.work_dir {
            settings.work_dir = self.resolve_path(work_dir, base_dir);
        }
    }

    /// Pipeline settings for the resolved directories.
    pub fn generation_settings(&self, settings: &Settings) -> GenerationSettings {
        let mut out = GenerationSettings::new(settings.audio_dir.clone(), settings.work_dir.clone());
        let gen = &self.generation;
        if let Some(max_turns) = gen.max_turns {
            out.max_turns = max_turns;
        }
        if let Some(ratio) = gen.target_fill_ratio.filter(|r| *r > 0.0) {
            out.target_fill_ratio = ratio;
        }
        if let Some(secs) = gen.default_target_seconds.filter(|s| *s > 0) {
            out.default_target_seconds = secs;
        }
        if let Some(budget) = gen.transcript_char_budget {
            out.transcript_char_budget = budget;
        }
        out
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(
            self.generation
                .ping_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_PING_INTERVAL_SECS),
        )
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions) -> anyhow::Result<Config> {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .map_err(anyhow::Error::msg);
    }

    // Priority 2: Auto-discover via prefer
    Ok(Config::load().await)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(shellexpand::tilde(&s).as_ref()))
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> anyhow::Result<(Settings, Config)> {
    let config = load_file_config(&options).await?;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // Environment variables take precedence over config
    if let Some(data_dir) = env_path("FOIACAST_DATA_DIR") {
        tracing::debug!("Using FOIACAST_DATA_DIR from environment: {}", data_dir.display());
        let audio_dir = config.audio_dir.as_ref().map(|_| settings.audio_dir.clone());
        let work_dir = config.work_dir.as_ref().map(|_| settings.work_dir.clone());
        settings = Settings::with_data_dir(data_dir);
        if let Some(dir) = audio_dir {
            settings.audio_dir = dir;
        }
        if let Some(dir) = work_dir {
            settings.work_dir = dir;
        }
    }
    if let Some(audio_dir) = env_path("FOIACAST_AUDIO_DIR") {
        tracing::debug!("Using FOIACAST_AUDIO_DIR from environment: {}", audio_dir.display());
        settings.audio_dir = audio_dir;
    }

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_layout() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/foiacast"));
        assert_eq!(settings.audio_dir, PathBuf::from("/srv/foiacast/audio"));
        assert_eq!(settings.work_dir, PathBuf::from("/srv/foiacast/work"));
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::parse(
            r#"
            data_dir = "data"

            [llm]
            model = "llama-3.1-8b-instant"

            [tts.voices]
            reporter = "custom-voice"

            [generation]
            max_turns = 12
            target_fill_ratio = 0.9
            "#,
            "toml",
        )
        .unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("data"));
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(
            config.tts.voices.get("reporter").map(String::as_str),
            Some("custom-voice")
        );
        assert_eq!(config.generation.max_turns, Some(12));
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("generation:\n  default_target_seconds: 120\n", "yaml").unwrap();
        assert_eq!(yaml.generation.default_target_seconds, Some(120));

        let json = Config::parse(r#"{"audio_dir": "/var/audio"}"#, "json").unwrap();
        assert_eq!(json.audio_dir.as_deref(), Some("/var/audio"));

        assert!(Config::parse("not = [valid", "toml").is_err());
    }

    #[tokio::test]
    async fn test_relative_paths_resolve_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foiacast.toml");
        std::fs::write(&path, "data_dir = \"store\"\nwork_dir = \"/tmp/fc-work\"\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let base = config.base_dir().unwrap();
        assert_eq!(base, dir.path());

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &base);
        assert_eq!(settings.data_dir, dir.path().join("store"));
        assert_eq!(settings.audio_dir, dir.path().join("store/audio"));
        assert_eq!(settings.work_dir, PathBuf::from("/tmp/fc-work"));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let options = LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/foiacast.toml")),
            use_cwd: false,
        };
        assert!(load_settings_with_options(options).await.is_err());
    }

    #[test]
    fn test_generation_settings_overrides() {
        let settings = Settings::with_data_dir(PathBuf::from("/d"));
        let mut config = Config::default();
        let defaults = config.generation_settings(&settings);
        assert_eq!(defaults.max_turns, 20);
        assert_eq!(defaults.output_dir, PathBuf::from("/d/audio"));
        assert_eq!(config.ping_interval(), Duration::from_secs(15));

        config.generation.max_turns = Some(8);
        config.generation.target_fill_ratio = Some(0.0);
        config.generation.ping_interval_secs = Some(5);
        let tuned = config.generation_settings(&settings);
        assert_eq!(tuned.max_turns, 8);
        // Non-positive ratios are ignored
        assert_eq!(tuned.target_fill_ratio, 0.8);
        assert_eq!(config.ping_interval(), Duration::from_secs(5));
    }
}
