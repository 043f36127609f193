use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
/// Per-user defaults for the `enhancer` command line.
pub struct AppConfig {
    pub output_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub jpg_quality: Option<u8>,
    pub png_compression: Option<u8>,
    pub preset: Option<PathBuf>,
    pub sequential: Option<bool>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("enhancer").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.toml"));
        assert!(config.output_dir.is_none());
        assert!(config.format.is_none());
    }

    #[test]
    fn reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "format = \"png\"\njpg_quality = 85\n").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.format.as_deref(), Some("png"));
        assert_eq!(config.jpg_quality, Some(85));
        assert_eq!(config.sequential, None);
    }

    #[test]
    fn reads_sequential_and_preset_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sequential = true\npreset = \"soft.toml\"\n").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.sequential, Some(true));
        assert_eq!(config.preset, Some(PathBuf::from("soft.toml")));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "jpg_quality = \"high\"").unwrap();
        let config = AppConfig::load_from(&path);
        assert!(config.jpg_quality.is_none());
    }

    #[test]
    fn config_path_is_namespaced() {
        if let Some(path) = AppConfig::config_path() {
            assert!(path.ends_with("enhancer/config.toml"));
        }
    }
}
