//! Configuration file handling for ~/.mfsmount/config.ini.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::Settings;

const STORE_SECTION: &str = "store";
const KEY_BINARY: &str = "binary";
const KEY_STATE_DIR: &str = "state_dir";
const KEY_CID_VERSION: &str = "cid_version";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// A key carried a value that does not parse.
    #[error("invalid configuration: {section}.{key} = '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Path of the config directory (~/.mfsmount).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mfsmount")
}

/// Path of the config file (~/.mfsmount/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

impl Settings {
    /// Load settings from the default path, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load settings from a specific path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        let mut settings = Settings::default();

        let Some(section) = ini.section(Some(STORE_SECTION)) else {
            return Ok(settings);
        };

        if let Some(binary) = section.get(KEY_BINARY) {
            settings.store_binary = binary.to_string();
        }
        if let Some(dir) = section.get(KEY_STATE_DIR) {
            settings.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(version) = section.get(KEY_CID_VERSION) {
            settings.cid_version =
                version.parse().map_err(|_| ConfigError::InvalidValue {
                    section: STORE_SECTION.to_string(),
                    key: KEY_CID_VERSION.to_string(),
                    value: version.to_string(),
                })?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(
            &path,
            "[store]\nbinary = /opt/kubo/ipfs\nstate_dir = /srv/ipfs\ncid_version = 0\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.store_binary, "/opt/kubo/ipfs");
        assert_eq!(settings.state_dir, Some(PathBuf::from("/srv/ipfs")));
        assert_eq!(settings.cid_version, 0);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[store]\nbinary = ipfs-dev\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.store_binary, "ipfs-dev");
        assert_eq!(settings.state_dir, None);
        assert_eq!(settings.cid_version, 1);
    }

    #[test]
    fn test_bad_cid_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[store]\ncid_version = latest\n").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
