use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::result::{Error, Result};

/// Outcome of a successful file removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// Nothing was there anymore. Someone else removed it first
    AlreadyGone,
}

/// Remove a file, treating a missing file as already removed.
///
/// Any other failure is returned as [`Error::Deletion`].
pub fn remove_file(path: &Path) -> Result<Removal> {
    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Deleted),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Removal::AlreadyGone),
        Err(source) => Err(Error::Deletion {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Return the size of the file, or None if it does not exist.
pub fn file_len(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// List the non-directory entries of a directory.
///
/// A missing directory has no entries. Entries that cannot be read are
/// skipped with a warning.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(err.into()),
    };

    let entries = entries.map(|entry| {
        entry.map(|entry| {
            let is_dir = entry.file_type().map(|kind| kind.is_dir());
            (entry.path(), is_dir)
        })
    });
    Ok(keep_files(dir, entries))
}

/// Paths of the entries known not to be directories
fn keep_files<I>(dir: &Path, entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = io::Result<(PathBuf, io::Result<bool>)>>,
{
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok((path, Ok(is_dir))) => (!is_dir).then_some(path),
            Ok((path, Err(err))) => {
                warn!("Skipping {}, could not read its type: {err}", path.display());
                None
            }
            Err(err) => {
                warn!("Skipping an entry of {}: {err}", dir.display());
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_file_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        fs::write(&path, b"data").unwrap();

        assert_eq!(remove_file(&path).unwrap(), Removal::Deleted);
        assert_eq!(remove_file(&path).unwrap(), Removal::AlreadyGone);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_file_on_directory_is_deletion_error() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        assert!(matches!(remove_file(&sub), Err(Error::Deletion { .. })));
    }

    #[test]
    fn test_file_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4");
        assert_eq!(file_len(&path).unwrap(), None);

        fs::write(&path, b"1234").unwrap();
        assert_eq!(file_len(&path).unwrap(), Some(4));
    }

    #[test]
    fn test_list_files_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        fs::write(dir.path().join("b.mp4.part"), b"b").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut files = list_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![dir.path().join("a.mp4"), dir.path().join("b.mp4.part")]
        );

        assert!(list_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_entries_do_not_hide_the_others() {
        let dir = Path::new("/scratch");
        let denied = || io::Error::from(ErrorKind::PermissionDenied);
        let entries = vec![
            Ok((dir.join("a.mp4"), Ok(false))),
            Err(denied()),
            Ok((dir.join("b.mp4"), Err(denied()))),
            Ok((dir.join("sub"), Ok(true))),
            Ok((dir.join("c.webm"), Ok(false))),
        ];

        assert_eq!(
            keep_files(dir, entries),
            vec![dir.join("a.mp4"), dir.join("c.webm")]
        );
    }
}
