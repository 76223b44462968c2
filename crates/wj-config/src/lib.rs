//! Configuration management for the Wiki.js migration tool.
//!
//! Parses `wj.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `workspace.dir`
//! - `workspace.result_dir`
//! - `convert.pandoc`
//! - `convert.jira_server`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override workspace directory.
    pub workspace_dir: Option<PathBuf>,
    /// Override result directory.
    pub result_dir: Option<PathBuf>,
    /// Override the pandoc executable.
    pub pandoc: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wj.toml";

/// Default Jira server used when a `jira` macro has no `server` parameter.
pub const DEFAULT_JIRA_SERVER: &str = "https://jira.example.com";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace configuration (paths are relative strings from TOML).
    workspace: WorkspaceConfigRaw,
    /// Upload copy configuration (paths are relative strings from TOML).
    uploads: UploadsConfigRaw,
    /// Page composition configuration.
    pub compose: ComposeConfig,
    /// Storage-format conversion configuration.
    pub convert: ConvertConfig,

    /// Resolved workspace configuration (set after loading).
    #[serde(skip)]
    pub workspace_resolved: WorkspaceConfig,
    /// Resolved upload configuration (set after loading).
    #[serde(skip)]
    pub uploads_resolved: UploadsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw workspace configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WorkspaceConfigRaw {
    dir: Option<String>,
    result_dir: Option<String>,
}

/// Resolved workspace layout with absolute paths.
///
/// ```text
/// {dir}/
/// +-- buckets/      # lookup tables written by the extractor
/// +-- content/      # storage-format bodies, one file per body id
/// +-- converted/    # rendered Markdown, one file per body id
/// +-- images/       # attachment binaries
/// {result_dir}/
/// +-- pages/
/// +-- uploads/
/// ```
#[derive(Debug, Default, Clone)]
pub struct WorkspaceConfig {
    /// Extractor workspace directory.
    pub dir: PathBuf,
    /// Explicit result directory; defaults to `{dir}/result`.
    pub result_dir: Option<PathBuf>,
}

impl WorkspaceConfig {
    /// Directory holding the bucket files (`{dir}/buckets`).
    #[must_use]
    pub fn buckets_dir(&self) -> PathBuf {
        self.dir.join("buckets")
    }

    /// Directory holding storage-format bodies (`{dir}/content`).
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        self.dir.join("content")
    }

    /// Directory holding rendered Markdown bodies (`{dir}/converted`).
    #[must_use]
    pub fn converted_dir(&self) -> PathBuf {
        self.dir.join("converted")
    }

    /// Result directory (explicit or `{dir}/result`).
    #[must_use]
    pub fn result_dir(&self) -> PathBuf {
        self.result_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("result"))
    }

    /// Output directory for pages (`{result}/pages`).
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.result_dir().join("pages")
    }

    /// Output directory for uploads (`{result}/uploads`).
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.result_dir().join("uploads")
    }
}

/// What to do when two source assets share a filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Later files replace earlier ones.
    #[default]
    Overwrite,
    /// Keep the first file, drop later ones.
    Skip,
    /// Keep both, suffixing later ones with `-1`, `-2`, ...
    Rename,
}

/// Raw upload configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UploadsConfigRaw {
    source_dir: Option<String>,
    on_collision: Option<CollisionPolicy>,
}

/// Resolved upload copy configuration.
#[derive(Debug, Clone)]
pub struct UploadsConfig {
    /// Asset source directory.
    pub source_dir: PathBuf,
    /// Filename collision policy.
    pub on_collision: CollisionPolicy,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("images"),
            on_collision: CollisionPolicy::default(),
        }
    }
}

/// Page composition configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Tags added to every page's frontmatter.
    pub categories: Vec<String>,
}

/// Storage-format conversion configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Pandoc executable used to render HTML to Markdown.
    pub pandoc: String,
    /// Jira server for `jira` macros without a `server` parameter.
    pub jira_server: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".to_owned(),
            jira_server: DEFAULT_JIRA_SERVER.to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`workspace.dir`").
        field: String,
        /// Error message (e.g., "${`EXPORT_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `wj.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Absolute directory the asset copy pass reads from.
    #[must_use]
    pub fn uploads_source_dir(&self) -> PathBuf {
        self.workspace_resolved
            .dir
            .join(&self.uploads_resolved.source_dir)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.workspace_dir {
            self.workspace_resolved.dir.clone_from(dir);
        }
        if let Some(result_dir) = &settings.result_dir {
            self.workspace_resolved.result_dir = Some(result_dir.clone());
        }
        if let Some(pandoc) = &settings.pandoc {
            self.convert.pandoc.clone_from(pandoc);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            workspace: WorkspaceConfigRaw::default(),
            uploads: UploadsConfigRaw::default(),
            compose: ComposeConfig::default(),
            convert: ConvertConfig::default(),
            workspace_resolved: WorkspaceConfig {
                dir: base.join("workspace"),
                result_dir: None,
            },
            uploads_resolved: UploadsConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_convert()?;
        self.validate_compose()?;
        Ok(())
    }

    fn validate_convert(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.convert.pandoc, "convert.pandoc")?;
        require_non_empty(&self.convert.jira_server, "convert.jira_server")?;
        require_http_url(&self.convert.jira_server, "convert.jira_server")?;
        Ok(())
    }

    fn validate_compose(&self) -> Result<(), ConfigError> {
        if self.compose.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "compose.categories cannot contain empty entries".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.workspace.dir {
            self.workspace.dir = Some(expand::expand_env(dir, "workspace.dir")?);
        }
        if let Some(ref dir) = self.workspace.result_dir {
            self.workspace.result_dir = Some(expand::expand_env(dir, "workspace.result_dir")?);
        }
        self.convert.pandoc = expand::expand_env(&self.convert.pandoc, "convert.pandoc")?;
        self.convert.jira_server =
            expand::expand_env(&self.convert.jira_server, "convert.jira_server")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.workspace_resolved = WorkspaceConfig {
            dir: resolve(self.workspace.dir.as_deref(), "workspace"),
            result_dir: self
                .workspace
                .result_dir
                .as_deref()
                .map(|d| config_dir.join(d)),
        };

        self.uploads_resolved = UploadsConfig {
            source_dir: PathBuf::from(self.uploads.source_dir.as_deref().unwrap_or("images")),
            on_collision: self.uploads.on_collision.unwrap_or_default(),
        };
    }
}
