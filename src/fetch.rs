use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::{
    io::file_len,
    lifecycle::LifecycleManager,
    outside::MediaProducer,
    result::{Error, Result},
    types::Extension,
};

/// Get the media of a video into the scratch directory and return its path.
///
/// If the producer fails or leaves no usable file behind, the path is
/// released before returning the error.
pub fn fetch(
    manager: &LifecycleManager,
    producer: &dyn MediaProducer,
    video_id: &str,
    extension: Extension,
) -> Result<PathBuf> {
    let path = manager.allocate_path(video_id, extension)?;

    info!("Fetching video {video_id}");
    match produce_and_verify(producer, &path, video_id) {
        Ok(len) => {
            info!("Fetched video {video_id} ({len} bytes)");
            Ok(path)
        }
        Err(err) => {
            error!("Could not fetch video {video_id}: {err}");
            manager.release(&path);
            Err(err)
        }
    }
}

fn produce_and_verify(producer: &dyn MediaProducer, path: &Path, video_id: &str) -> Result<u64> {
    producer.produce(path, video_id)?;

    match file_len(path)? {
        None => Err(Error::MissingMedia(path.to_path_buf())),
        Some(0) => Err(Error::EmptyMedia(path.to_path_buf())),
        Some(len) => Ok(len),
    }
}

/// A viewer watching one video at a time.
///
/// Playing a new video releases the file of the previous one.
/// Whatever is still playing is released when the session ends.
pub struct Session<'a> {
    manager: &'a LifecycleManager,
    producer: &'a dyn MediaProducer,
    extension: Extension,
    current: Option<PathBuf>,
}

impl<'a> Session<'a> {
    pub fn new(
        manager: &'a LifecycleManager,
        producer: &'a dyn MediaProducer,
        extension: Extension,
    ) -> Self {
        Self {
            manager,
            producer,
            extension,
            current: None,
        }
    }

    /// Fetch the video and make it the current one.
    ///
    /// Replaying the current video reuses its file and restarts its TTL.
    /// On failure, the current video stays as it was.
    pub fn play(&mut self, video_id: &str) -> Result<&Path> {
        let target = self.manager.path_for(video_id, self.extension)?;

        let path = if self.is_playing(&target) {
            debug!("Video {video_id} is already playing");
            self.manager.allocate_path(video_id, self.extension)?
        } else {
            fetch(self.manager, self.producer, video_id, self.extension)?
        };

        if let Some(previous) = self.current.take() {
            if previous != path {
                debug!("Releasing previously played {}", previous.display());
                self.manager.release(&previous);
            }
        }

        let current: &Path = self.current.insert(path);
        Ok(current)
    }

    /// The target is the current video and its file is still usable
    fn is_playing(&self, target: &Path) -> bool {
        self.current.as_deref() == Some(target)
            && self.manager.is_tracked(target)
            && matches!(file_len(target), Ok(Some(len)) if len > 0)
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Release the current video, if any.
    pub fn close(&mut self) {
        if let Some(current) = self.current.take() {
            self.manager.release(&current);
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
