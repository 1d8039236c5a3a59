use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::kv::DEFAULT_SNAPSHOT_KEY;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QrstegConfig {
    /// JSON file acting as the durable key-value medium
    pub storage: Option<String>,
    /// Key holding the encoded snapshot
    pub key: Option<String>,
    /// Directory where the engine stages snapshot images
    pub scratch_dir: Option<String>,
}

/// Fully resolved settings: CLI flag, then config file, then default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub storage: PathBuf,
    pub key: String,
    pub scratch_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        config: Option<&QrstegConfig>,
        storage: Option<PathBuf>,
        key: Option<String>,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        let defaults = QrstegConfig::default();
        let config = config.unwrap_or(&defaults);

        Self {
            storage: storage
                .or_else(|| config.storage.as_ref().map(PathBuf::from))
                .unwrap_or_else(default_storage_path),
            key: key
                .or_else(|| config.key.clone())
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_KEY.to_string()),
            scratch_dir: scratch_dir
                .or_else(|| config.scratch_dir.as_ref().map(PathBuf::from))
                .unwrap_or_else(default_scratch_dir),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("qrsteg.toml")
}

pub fn default_storage_path() -> PathBuf {
    PathBuf::from(".qrsteg").join("local_storage.json")
}

pub fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".qrsteg").join("scratch")
}

/// Config written by `qrsteg init`
pub fn default_config() -> QrstegConfig {
    QrstegConfig {
        storage: Some(default_storage_path().to_string_lossy().to_string()),
        key: Some(DEFAULT_SNAPSHOT_KEY.to_string()),
        scratch_dir: Some(default_scratch_dir().to_string_lossy().to_string()),
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<QrstegConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: QrstegConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &QrstegConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrsteg.toml");
        assert!(load_config(Some(path.as_path())).unwrap().is_none());
    }

    #[test]
    fn test_write_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qrsteg.toml");

        write_config(&path, &default_config(), false).unwrap();
        assert!(write_config(&path, &default_config(), false).is_err());
        write_config(&path, &default_config(), true).unwrap();

        let loaded = load_config(Some(path.as_path())).unwrap().unwrap();
        assert_eq!(loaded, default_config());
    }

    #[test]
    fn test_resolve_precedence() {
        let config = QrstegConfig {
            storage: Some("from-config.json".to_string()),
            key: Some("config-key".to_string()),
            scratch_dir: None,
        };

        let settings = Settings::resolve(Some(&config), None, Some("flag-key".to_string()), None);
        assert_eq!(settings.storage, PathBuf::from("from-config.json"));
        assert_eq!(settings.key, "flag-key");
        assert_eq!(settings.scratch_dir, default_scratch_dir());

        let defaults = Settings::resolve(None, None, None, None);
        assert_eq!(defaults.key, DEFAULT_SNAPSHOT_KEY);
        assert_eq!(defaults.storage, default_storage_path());
    }
}
