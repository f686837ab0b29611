use std::path::Path;

use clap::ValueEnum;
use serde::Deserialize;

/// Container format of a scratch media file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    #[default]
    Mp4,
    Webm,
    Mkv,
    M4a,
    Ogg,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::Mp4 => ".mp4",
            Extension::Webm => ".webm",
            Extension::Mkv => ".mkv",
            Extension::M4a => ".m4a",
            Extension::Ogg => ".ogg",
        }
    }

    /// Return the extension without the leading dot.
    /// e.g. "ext"
    pub fn with_no_dot(self) -> &'static str {
        &self.with_dot()[1..]
    }

    /// Parse the path file extension.
    /// Return None in case of no or invalid extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext {
                "mp4" => Some(Self::Mp4),
                "webm" => Some(Self::Webm),
                "mkv" => Some(Self::Mkv),
                "m4a" => Some(Self::M4a),
                "ogg" => Some(Self::Ogg),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_path() {
        assert_eq!(Extension::from_path("/tmp/abc.webm"), Some(Extension::Webm));
        assert_eq!(Extension::from_path("/tmp/abc.m4a"), Some(Extension::M4a));
        assert_eq!(Extension::from_path("/tmp/abc.ogg"), Some(Extension::Ogg));
        assert_eq!(Extension::from_path("/tmp/abc.mp4.part"), None);
        assert_eq!(Extension::from_path("/tmp/abc"), None);
    }

    #[test]
    fn test_extension_dots() {
        assert_eq!(Extension::Mkv.with_dot(), ".mkv");
        assert_eq!(Extension::Mkv.with_no_dot(), "mkv");
        assert_eq!(Extension::Ogg.with_no_dot(), "ogg");
        assert_eq!(Extension::default(), Extension::Mp4);
    }
}
