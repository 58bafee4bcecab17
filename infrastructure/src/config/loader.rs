//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_FILES: [&str; 2] = ["kindergarten.toml", ".kindergarten.toml"];

/// Prefix for environment overrides, `KINDERGARTEN_VOTING__WINDOW_SECS=300`
const ENV_PREFIX: &str = "KINDERGARTEN_";

/// Bare token variable honoured for compatibility with other bot tooling
const TOKEN_VAR: &str = "DISCORD_TOKEN";

/// One configuration source and whether it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `KINDERGARTEN_*` environment variables (`__` separates sections)
    /// 2. `DISCORD_TOKEN` (token only)
    /// 3. Explicit config path (if provided)
    /// 4. Project root: `./kindergarten.toml` or `./.kindergarten.toml`
    /// 5. XDG config: `$XDG_CONFIG_HOME/kindergarten/config.toml`
    /// 6. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::load_with(Self::global_config_path().as_deref(), config_path.map(|p| p.as_path()))
    }

    /// Load with an explicit global config location instead of the XDG one
    pub fn load_with(
        global_path: Option<&Path>,
        config_path: Option<&Path>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(path));
        }

        // An explicit path that does not exist is an error, not a silent skip
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment = figment
            .merge(Env::raw().only(&[TOKEN_VAR]).map(|_| "discord.token".into()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/kindergarten/config.toml if set,
    /// otherwise falls back to ~/.config/kindergarten/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kindergarten").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe every source in priority order (highest first)
    pub fn sources(config_path: Option<&PathBuf>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        sources.push(ConfigSource {
            label: "Env",
            location: format!("{}* / {}", ENV_PREFIX, TOKEN_VAR),
            found: std::env::vars().any(|(k, _)| k.starts_with(ENV_PREFIX) || k == TOKEN_VAR),
        });

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(match Self::project_config_path() {
            Some(path) => ConfigSource {
                label: "Project",
                location: path.display().to_string(),
                found: true,
            },
            None => ConfigSource {
                label: "Project",
                location: PROJECT_FILES.map(|f| format!("./{}", f)).join(" or "),
                found: false,
            },
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                label: "Global",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(ConfigSource {
            label: "Default",
            location: "built-in defaults".to_string(),
            found: true,
        });

        sources
    }
}
