use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::jobs::Workspace;

const CONFIG_DIR_NAME: &str = "ultra-studio";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;
const WORKING_DIR_ENV: &str = "ULTRA_STUDIO_WORKING_DIR";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7860;
pub const DEFAULT_OUTPUT_DIRECTORY: &str = ".";
pub const DEFAULT_DENOISE_MODEL: &str = "std.rnnn";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 2048;

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Ser(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {err}"),
            ConfigError::Ser(err) => write!(f, "TOML serialization error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Ser(value)
    }
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub server: ServerPreferences,
    #[serde(default)]
    pub paths: PathPreferences,
    #[serde(default)]
    pub tool: ToolPreferences,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            server: ServerPreferences::default(),
            paths: PathPreferences::default(),
            tool: ToolPreferences::default(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }
}

/// Where and how the control panel is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPreferences {
    #[serde(default = "ServerPreferences::default_host")]
    pub host: String,
    #[serde(default = "ServerPreferences::default_port")]
    pub port: u16,
    #[serde(default)]
    pub open_browser: bool,
    /// Upper bound for a whole multipart job request, in megabytes.
    #[serde(default = "ServerPreferences::default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for ServerPreferences {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            open_browser: false,
            max_upload_mb: Self::default_max_upload_mb(),
        }
    }
}

impl ServerPreferences {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    const fn default_port() -> u16 {
        DEFAULT_PORT
    }

    const fn default_max_upload_mb() -> u64 {
        DEFAULT_MAX_UPLOAD_MB
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPreferences {
    #[serde(default = "PathPreferences::default_output_directory")]
    pub output_directory: String,
    /// Staging area for uploads; the system temp directory when unset.
    #[serde(default)]
    pub upload_directory: Option<String>,
    /// `arnndn` model; `std.rnnn` inside the output directory when unset.
    #[serde(default)]
    pub denoise_model: Option<String>,
}

impl Default for PathPreferences {
    fn default() -> Self {
        Self {
            output_directory: Self::default_output_directory(),
            upload_directory: None,
            denoise_model: None,
        }
    }
}

impl PathPreferences {
    fn default_output_directory() -> String {
        DEFAULT_OUTPUT_DIRECTORY.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPreferences {
    #[serde(default = "ToolPreferences::default_ffmpeg")]
    pub ffmpeg: String,
}

impl Default for ToolPreferences {
    fn default() -> Self {
        Self {
            ffmpeg: Self::default_ffmpeg(),
        }
    }
}

impl ToolPreferences {
    fn default_ffmpeg() -> String {
        DEFAULT_FFMPEG.to_string()
    }
}

/// Represents overrides sourced from runtime inputs (CLI flags).
#[derive(Debug, Default, Clone)]
pub struct RuntimeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub open_browser: Option<bool>,
    pub output_directory: Option<String>,
    pub denoise_model: Option<String>,
    pub ffmpeg: Option<String>,
}

impl RuntimeOverrides {
    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.open_browser.is_none()
            && self.output_directory.is_none()
            && self.denoise_model.is_none()
            && self.ffmpeg.is_none()
    }
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration from the default location, falling back to defaults.
pub fn load_config() -> ConfigLoadResult {
    load_config_from(&config_path())
}

/// Load the configuration from an explicit file.
pub fn load_config_from(path: &Path) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        path.display(),
                        err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    path.display(),
                    err
                ));
            }
        }
    }

    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration to the default location.
pub fn save_config(config: &FileConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

/// Repair values that would keep the studio from starting.
pub fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();

    if config.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unknown config schema version {}. Resetting to {}.",
            config.schema_version, CURRENT_SCHEMA_VERSION
        ));
        return (FileConfig::default(), warnings);
    }

    if config.server.host.trim().is_empty() {
        warnings.push(format!("server.host is empty. Using {DEFAULT_HOST}."));
        config.server.host = DEFAULT_HOST.to_string();
    } else {
        config.server.host = config.server.host.trim().to_string();
    }
    if config.server.port == 0 {
        warnings.push(format!("server.port must be non-zero. Using {DEFAULT_PORT}."));
        config.server.port = DEFAULT_PORT;
    }
    if config.server.max_upload_mb == 0 {
        warnings.push(format!(
            "server.max_upload_mb must be at least 1. Using {DEFAULT_MAX_UPLOAD_MB}."
        ));
        config.server.max_upload_mb = DEFAULT_MAX_UPLOAD_MB;
    }

    if config.paths.output_directory.trim().is_empty() {
        warnings.push(format!(
            "paths.output_directory is empty. Using {DEFAULT_OUTPUT_DIRECTORY}."
        ));
        config.paths.output_directory = DEFAULT_OUTPUT_DIRECTORY.to_string();
    }
    for optional in [&mut config.paths.upload_directory, &mut config.paths.denoise_model] {
        if optional.as_deref().is_some_and(|value| value.trim().is_empty()) {
            *optional = None;
        }
    }

    if config.tool.ffmpeg.trim().is_empty() {
        warnings.push(format!("tool.ffmpeg is empty. Using {DEFAULT_FFMPEG}."));
        config.tool.ffmpeg = DEFAULT_FFMPEG.to_string();
    }

    (config, warnings)
}

/// Merge runtime overrides into a loaded configuration. Blank strings are ignored.
pub fn apply_runtime_overrides(
    config: &mut FileConfig,
    overrides: &RuntimeOverrides,
    warnings: &mut Vec<String>,
) {
    fn non_blank(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    if let Some(host) = non_blank(&overrides.host) {
        config.server.host = host;
    }
    if let Some(port) = overrides.port {
        if port == 0 {
            warnings.push("Port override must be non-zero. Ignoring override.".to_string());
        } else {
            config.server.port = port;
        }
    }
    if let Some(open) = overrides.open_browser {
        config.server.open_browser = open;
    }
    if let Some(dir) = non_blank(&overrides.output_directory) {
        config.paths.output_directory = dir;
    }
    if let Some(model) = non_blank(&overrides.denoise_model) {
        config.paths.denoise_model = Some(model);
    }
    if let Some(ffmpeg) = non_blank(&overrides.ffmpeg) {
        config.tool.ffmpeg = ffmpeg;
    }
}

/// Fully resolved settings with absolute paths, ready to hand to the studio and the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioSettings {
    pub host: String,
    pub port: u16,
    pub open_browser: bool,
    pub max_upload_bytes: usize,
    pub output_dir: PathBuf,
    pub upload_dir: Option<PathBuf>,
    pub denoise_model: PathBuf,
    pub ffmpeg: String,
}

impl StudioSettings {
    pub fn workspace(&self) -> Workspace {
        Workspace {
            output_dir: self.output_dir.clone(),
            denoise_model: self.denoise_model.clone(),
            ffmpeg: self.ffmpeg.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve a configuration into [`StudioSettings`].
///
/// When `working_dir` is `None`, relative paths are qualified against
/// `ULTRA_STUDIO_WORKING_DIR` if set, otherwise the process working directory.
pub fn resolve_settings(config: &FileConfig, working_dir: Option<&Path>) -> StudioSettings {
    let working_dir = resolve_working_dir(working_dir);
    let base = working_dir.as_deref();

    let output_dir = qualify_path(&config.paths.output_directory, base);
    let denoise_model = match config.paths.denoise_model.as_deref() {
        Some(model) => qualify_path(model, base),
        None => output_dir.join(DEFAULT_DENOISE_MODEL),
    };
    let upload_dir = config
        .paths
        .upload_directory
        .as_deref()
        .map(|dir| qualify_path(dir, base));
    let max_upload_bytes: usize = config
        .server
        .max_upload_mb
        .saturating_mul(1024 * 1024)
        .try_into()
        .unwrap_or(usize::MAX);

    StudioSettings {
        host: config.server.host.clone(),
        port: config.server.port,
        open_browser: config.server.open_browser,
        max_upload_bytes,
        output_dir,
        upload_dir,
        denoise_model,
        ffmpeg: shellexpand::tilde(&config.tool.ffmpeg).into_owned(),
    }
}

fn resolve_working_dir(provided: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = provided {
        return Some(path.to_path_buf());
    }
    if let Ok(env_dir) = std::env::var(WORKING_DIR_ENV) {
        let trimmed = env_dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    std::env::current_dir().ok()
}

fn qualify_path(raw: &str, working_dir: Option<&Path>) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw.trim()).into_owned());
    if expanded.is_absolute() {
        return expanded;
    }
    match working_dir {
        // `components()` drops the `.` segments left by joining `.` or `./renders`.
        Some(base) => base.join(expanded).components().collect(),
        None => expanded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let result = load_config_from(&temp.path().join("config.toml"));
        assert_eq!(result.source, ConfigSource::Default);
        assert!(result.warnings.is_empty());
        assert_eq!(result.config, FileConfig::default());
        assert_eq!(result.config.server.port, 7860);
        assert_eq!(result.config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[server]\nport = 9000\n\n[tool]\nffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n")
            .unwrap();

        let result = load_config_from(&path);
        assert_eq!(result.source, ConfigSource::File);
        assert_eq!(result.config.server.port, 9000);
        assert_eq!(result.config.server.host, DEFAULT_HOST);
        assert_eq!(result.config.tool.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(result.config.paths.output_directory, DEFAULT_OUTPUT_DIRECTORY);
    }

    #[test]
    fn test_unparsable_file_falls_back_with_warning() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        let result = load_config_from(&path);
        assert_eq!(result.source, ConfigSource::Default);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Failed to parse"));
    }

    #[test]
    fn test_sanitize_repairs_invalid_values() {
        let mut config = FileConfig::default();
        config.server.host = "   ".to_string();
        config.server.port = 0;
        config.server.max_upload_mb = 0;
        config.paths.output_directory = String::new();
        config.paths.denoise_model = Some(" ".to_string());
        config.tool.ffmpeg = String::new();

        let (sanitized, warnings) = sanitize_config(config);
        assert_eq!(sanitized.server.host, DEFAULT_HOST);
        assert_eq!(sanitized.server.port, DEFAULT_PORT);
        assert_eq!(sanitized.server.max_upload_mb, DEFAULT_MAX_UPLOAD_MB);
        assert_eq!(sanitized.paths.output_directory, DEFAULT_OUTPUT_DIRECTORY);
        assert_eq!(sanitized.paths.denoise_model, None);
        assert_eq!(sanitized.tool.ffmpeg, DEFAULT_FFMPEG);
        assert_eq!(warnings.len(), 5);
    }

    #[test]
    fn test_sanitize_resets_unknown_schema() {
        let config = FileConfig {
            schema_version: 42,
            ..FileConfig::default()
        };
        let (sanitized, warnings) = sanitize_config(config);
        assert_eq!(sanitized.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(warnings[0].contains("schema version 42"));
    }

    #[test]
    fn test_overrides_skip_blank_and_zero_values() {
        let mut config = FileConfig::default();
        let mut warnings = Vec::new();
        let overrides = RuntimeOverrides {
            host: Some("  ".to_string()),
            port: Some(0),
            output_directory: Some("renders".to_string()),
            ffmpeg: Some("ffmpeg6".to_string()),
            ..RuntimeOverrides::default()
        };
        assert!(!overrides.is_empty());

        apply_runtime_overrides(&mut config, &overrides, &mut warnings);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.paths.output_directory, "renders");
        assert_eq!(config.tool.ffmpeg, "ffmpeg6");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_resolve_settings_qualifies_relative_paths() {
        let temp = tempdir().unwrap();
        let config = FileConfig::default();

        let settings = resolve_settings(&config, Some(temp.path()));
        assert_eq!(settings.output_dir, temp.path());
        assert_eq!(settings.denoise_model, temp.path().join("std.rnnn"));
        assert_eq!(settings.upload_dir, None);
        assert_eq!(settings.bind_address(), "127.0.0.1:7860");
        assert_eq!(settings.max_upload_bytes, 2048 * 1024 * 1024);

        let workspace = settings.workspace();
        assert_eq!(workspace.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_resolve_settings_keeps_absolute_paths() {
        let temp = tempdir().unwrap();
        let mut config = FileConfig::default();
        let absolute = temp.path().join("models").join("voice.rnnn");
        config.paths.denoise_model = Some(absolute.to_string_lossy().into_owned());

        let settings = resolve_settings(&config, Some(Path::new("/elsewhere")));
        assert_eq!(settings.denoise_model, absolute);
        assert_eq!(settings.output_dir, Path::new("/elsewhere"));

        config.paths.output_directory = "./renders".to_string();
        let settings = resolve_settings(&config, Some(Path::new("/elsewhere")));
        assert_eq!(settings.output_dir, Path::new("/elsewhere/renders"));
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = FileConfig::default();
        config.server.open_browser = true;
        config.paths.upload_directory = Some("/var/tmp/studio".to_string());

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path);
        assert_eq!(loaded.source, ConfigSource::File);
        assert_eq!(loaded.config, config);
    }
}
