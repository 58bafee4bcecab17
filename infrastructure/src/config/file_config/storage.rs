//! State storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// State document location; `$HOME/kindergarten/state.json` when unset
    pub state_file: Option<PathBuf>,
}

impl FileStorageConfig {
    /// The configured state file, or the default under the home directory.
    ///
    /// Falls back to `./kindergarten/state.json` when no home directory can
    /// be determined.
    pub fn resolve_state_file(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kindergarten")
            .join("state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_state_file_wins() {
        let config = FileStorageConfig {
            state_file: Some(PathBuf::from("/tmp/kg.json")),
        };
        assert_eq!(config.resolve_state_file(), PathBuf::from("/tmp/kg.json"));
    }

    #[test]
    fn test_default_state_file_name() {
        let path = FileStorageConfig::default().resolve_state_file();
        assert!(path.ends_with("kindergarten/state.json"));
    }
}
