use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::{
    io::list_files,
    result::{Error, Result},
    types::Extension,
};

/// What happened when trying to remove the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirRemoval {
    Removed,
    AlreadyGone,
    /// The directory still had this many entries and was left in place
    NotEmpty(usize),
    /// The filesystem refused the removal for another reason
    Failed,
}

/// The private directory every scratch file of a manager lives in
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
}

impl WorkingDirectory {
    /// Create a new directory inside `parent`, named after `prefix` plus a random suffix.
    ///
    /// The suffix makes the directory unique among concurrently running instances.
    pub fn create(parent: &Path, prefix: &str) -> Result<Self> {
        let creation_error = |source| Error::DirectoryCreation {
            parent: parent.to_path_buf(),
            source,
        };

        let parent = std::path::absolute(parent).map_err(creation_error)?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&parent)
            .map_err(creation_error)?;

        // Removal is handled by remove_if_empty, not by the guard
        let path = dir.keep();
        info!("Working directory created at {}", path.display());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the scratch file of a resource.
    ///
    /// The same resource id always gives the same path.
    pub fn path_for(&self, resource_id: &str, extension: Extension) -> PathBuf {
        self.path
            .join(format!("{resource_id}{}", extension.with_dot()))
    }

    /// Files currently lying in the directory, tracked or not.
    pub fn stragglers(&self) -> Vec<PathBuf> {
        list_files(&self.path).unwrap_or_else(|err| {
            error!("Could not list {}: {err}", self.path.display());
            vec![]
        })
    }

    /// Remove the directory if it is empty.
    ///
    /// A non-empty directory is left in place for the next run to deal with.
    pub fn remove_if_empty(&self) -> DirRemoval {
        match fs::remove_dir(&self.path) {
            Ok(()) => {
                info!("Working directory {} removed", self.path.display());
                DirRemoval::Removed
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Working directory {} already removed", self.path.display());
                DirRemoval::AlreadyGone
            }
            Err(err) => {
                let remaining = fs::read_dir(&self.path)
                    .map(|entries| entries.count())
                    .unwrap_or(0);

                if remaining > 0 {
                    let err = Error::PurgeIncomplete {
                        path: self.path.clone(),
                        remaining,
                    };
                    warn!("{err}. Leaving it in place");
                    DirRemoval::NotEmpty(remaining)
                } else {
                    error!(
                        "Could not remove working directory {}: {err}",
                        self.path.display()
                    );
                    DirRemoval::Failed
                }
            }
        }
    }
}
