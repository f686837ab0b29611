use std::{path::Path, path::PathBuf, str::FromStr, time::Duration};

use config::{Config, Environment, File, FileFormat};
use serde::{de::Error as _, Deserialize, Deserializer};
use tracing::Level;

use crate::{
    lifecycle::{ManagerConfig, DEFAULT_DIRECTORY_PREFIX},
    result::Result,
    types::Extension,
};

/// Prefix of the environment variables overriding the settings
pub const ENV_PREFIX: &str = "MEDIATEMP";

/// Application settings, layered from defaults, an optional TOML file and
/// `MEDIATEMP_*` environment variables.
///
/// Durations are written the humantime way, e.g. `15m` or `1h 30m`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(deserialize_with = "duration")]
    pub ttl: Duration,

    #[serde(deserialize_with = "duration")]
    pub sweep_interval: Duration,

    pub directory_prefix: String,

    /// Where to create the working directory. Defaults to the system temp directory
    pub parent_dir: Option<PathBuf>,

    pub extension: Extension,

    #[serde(deserialize_with = "level")]
    pub log_level: Level,

    /// Also write the logs to this file
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("ttl", "15m")?
            .set_default("sweep_interval", "60s")?
            .set_default("directory_prefix", DEFAULT_DIRECTORY_PREFIX)?
            .set_default("extension", "mp4")?
            .set_default("log_level", "info")?;

        if let Some(file) = file {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn manager_config(&self) -> ManagerConfig {
        let default = ManagerConfig::default();
        ManagerConfig {
            ttl: self.ttl,
            sweep_interval: self.sweep_interval,
            directory_prefix: self.directory_prefix.clone(),
            parent_dir: self.parent_dir.clone().unwrap_or(default.parent_dir),
        }
    }
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(D::Error::custom)
}

fn level<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Level, D::Error> {
    let s = String::deserialize(deserializer)?;
    Level::from_str(&s).map_err(D::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings.ttl, Duration::from_secs(15 * 60));
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
        assert_eq!(settings.directory_prefix, DEFAULT_DIRECTORY_PREFIX);
        assert_eq!(settings.extension, Extension::Mp4);
        assert_eq!(settings.log_level, Level::INFO);
        assert_eq!(settings.manager_config().ttl, settings.ttl);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mediatemp.toml");
        fs::write(
            &file,
            r#"
ttl = "2m 30s"
extension = "webm"
log_level = "debug"
parent_dir = "/var/tmp"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&file)).unwrap();

        assert_eq!(settings.ttl, Duration::from_secs(150));
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
        assert_eq!(settings.extension, Extension::Webm);
        assert_eq!(settings.log_level, Level::DEBUG);
        assert_eq!(
            settings.manager_config().parent_dir,
            PathBuf::from("/var/tmp")
        );
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mediatemp.toml");
        fs::write(&file, "sweep_interval = \"soon\"\n").unwrap();

        assert!(Settings::load(Some(&file)).is_err());
    }
}
