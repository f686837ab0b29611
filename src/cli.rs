use std::{path::PathBuf, time::Duration};

use clap::Parser;
use mediatemp::{settings::Settings, Extension};
use tracing::Level;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("MEDIATEMP_", $v)
    };
}

/// Fetch videos into a private scratch directory that cleans up after itself.
///
/// Every fetched file is deleted once older than the TTL, and everything is
/// purged when the program exits.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// IDs of the videos to fetch
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// The path to a TOML configuration file.
    /// Environment variables prefixed with `MEDIATEMP_` override its values
    #[arg(long, env=arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// How long a fetched file may live, e.g. "15m"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub ttl: Option<Duration>,

    /// How often to look for files older than the TTL, e.g. "60s"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub sweep_interval: Option<Duration>,

    /// Prefix of the scratch directory name
    #[arg(long)]
    pub directory_prefix: Option<String>,

    /// Where to create the scratch directory
    #[arg(long)]
    pub parent_dir: Option<PathBuf>,

    /// The container format of the fetched files
    #[arg(long, value_enum)]
    pub ext: Option<Extension>,

    /// Watch the videos one after the other, keeping only the last one on disk.
    /// Without it, all videos are fetched concurrently
    #[arg(long)]
    pub session: bool,

    /// How long to keep the fetched files before purging and exiting, e.g. "5m"
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s", env=arg_env!("HOLD"))]
    pub hold: Duration,

    #[arg(long)]
    pub log_level: Option<Level>,

    /// Also write the logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Override the loaded settings with the flags given on the command line
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(ttl) = self.ttl {
            settings.ttl = ttl;
        }
        if let Some(sweep_interval) = self.sweep_interval {
            settings.sweep_interval = sweep_interval;
        }
        if let Some(prefix) = &self.directory_prefix {
            settings.directory_prefix = prefix.clone();
        }
        if let Some(parent_dir) = &self.parent_dir {
            settings.parent_dir = Some(parent_dir.clone());
        }
        if let Some(ext) = self.ext {
            settings.extension = ext;
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        if let Some(log_file) = &self.log_file {
            settings.log_file = Some(log_file.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_settings() {
        let args = Args::try_parse_from([
            "mediatemp",
            "--ttl",
            "2m",
            "--ext",
            "mkv",
            "--log-level",
            "debug",
            "abc",
            "def",
        ])
        .unwrap();
        let mut settings = Settings::load(None).unwrap();
        args.apply(&mut settings);

        assert_eq!(args.ids, ["abc", "def"]);
        assert_eq!(settings.ttl, Duration::from_secs(120));
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
        assert_eq!(settings.extension, Extension::Mkv);
        assert_eq!(settings.log_level, Level::DEBUG);
    }
}
