use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The private working directory could not be created.
    /// Fatal for the manager instance being built.
    #[error("Could not create a working directory in {}", parent.display())]
    #[diagnostic(
        code(mediatemp::directory_creation),
        help("Check that the parent directory exists and is writable")
    )]
    DirectoryCreation {
        parent: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not start the sweeper thread")]
    #[diagnostic(code(mediatemp::sweeper_spawn))]
    SweeperSpawn(#[source] io::Error),

    #[error("Invalid resource id {0:?}")]
    #[diagnostic(
        code(mediatemp::invalid_resource_id),
        help("A resource id must be a plain file name: non-empty, without path separators")
    )]
    InvalidResourceId(String),

    #[error("The manager has been shut down and accepts no new allocations")]
    #[diagnostic(code(mediatemp::shut_down))]
    ShutDown,

    /// Soft error: logged and folded into reports, never returned to a caller
    /// of the eviction paths.
    #[error("Could not delete {}", path.display())]
    #[diagnostic(code(mediatemp::deletion))]
    Deletion {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Soft error: the working directory is left in place.
    #[error("Working directory {} still holds {remaining} entries after purge", path.display())]
    #[diagnostic(code(mediatemp::purge_incomplete))]
    PurgeIncomplete { path: PathBuf, remaining: usize },

    #[error("Unavailable stream")]
    #[diagnostic(code(mediatemp::unavailable_stream))]
    UnavailableStream,

    #[error("{program} did run but was not successful. Here is its stderr: {stderr}")]
    #[diagnostic(code(mediatemp::command_failed))]
    CommandFailed { program: String, stderr: String },

    #[error("The producer did not write anything to {}", .0.display())]
    #[diagnostic(code(mediatemp::missing_media))]
    MissingMedia(PathBuf),

    #[error("The producer wrote an empty file to {}", .0.display())]
    #[diagnostic(code(mediatemp::empty_media))]
    EmptyMedia(PathBuf),

    #[error("Invalid configuration")]
    #[diagnostic(code(mediatemp::config))]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(code(mediatemp::io))]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
