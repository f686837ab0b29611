mod clock;
mod registry;
mod sweeper;
mod working_dir;

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::{debug, info, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{Entry, FileRegistry};
pub use sweeper::{SweepPass, SweepReport, Sweeper};
pub use working_dir::{DirRemoval, WorkingDirectory};

use crate::{
    io::{remove_file, Removal},
    result::{Error, Result},
    types::Extension,
    utils::MutexUtils,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DIRECTORY_PREFIX: &str = "mediatemp_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Age after which a tracked file may be evicted
    pub ttl: Duration,

    /// Wake period of the sweeper
    pub sweep_interval: Duration,

    /// Prefix of the working directory name
    pub directory_prefix: String,

    /// Directory in which the working directory is created
    pub parent_dir: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            directory_prefix: DEFAULT_DIRECTORY_PREFIX.to_owned(),
            parent_dir: std::env::temp_dir(),
        }
    }
}

/// What a purge did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Tracked files
    pub tracked: SweepReport,

    /// Files found in the working directory that were not tracked
    pub stragglers: SweepReport,

    pub directory: DirRemoval,
}

/// Owner of the scratch files of a session.
///
/// Hands out paths in a private working directory, forgets and deletes them
/// after a TTL through a background sweeper, and removes everything when
/// shut down or dropped.
///
/// The manager is meant to be shared between the request handlers (e.g. in an [`Arc`]).
#[derive(Debug)]
pub struct LifecycleManager {
    config: ManagerConfig,
    clock: Arc<dyn Clock>,
    directory: WorkingDirectory,
    registry: Arc<FileRegistry>,
    pass: SweepPass,

    /// None once stopped
    sweeper: Mutex<Option<Sweeper>>,
}

impl LifecycleManager {
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create the working directory and start the sweeper.
    pub fn with_clock(config: ManagerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let directory = WorkingDirectory::create(&config.parent_dir, &config.directory_prefix)?;
        let registry = Arc::new(FileRegistry::new());
        let pass = SweepPass::new(registry.clone(), clock.clone(), config.ttl);

        let sweeper = match Sweeper::spawn(pass.clone(), config.sweep_interval) {
            Ok(sweeper) => sweeper,
            Err(err) => {
                directory.remove_if_empty();
                return Err(err);
            }
        };

        info!(
            "Scratch files live for {}, checked every {}",
            humantime::format_duration(config.ttl),
            humantime::format_duration(config.sweep_interval)
        );

        Ok(Self {
            config,
            clock,
            directory,
            registry,
            pass,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Return the scratch path of the resource and start tracking it.
    ///
    /// Nothing is written to disk, the caller is expected to fill the file.
    /// Allocating an already tracked resource returns the same path and
    /// restarts its TTL.
    pub fn allocate_path(&self, resource_id: &str, extension: Extension) -> Result<PathBuf> {
        let path = self.path_for(resource_id, extension)?;
        let entry = self.registry.register(path, self.clock.now())?;

        info!("Allocated {}", entry.path.display());
        Ok(entry.path)
    }

    /// Scratch path the resource maps to, without tracking it.
    pub fn path_for(&self, resource_id: &str, extension: Extension) -> Result<PathBuf> {
        validate_resource_id(resource_id)?;
        Ok(self.directory.path_for(resource_id, extension))
    }

    /// Stop tracking the path and delete its file.
    ///
    /// An untracked path is left untouched.
    /// Return whether the path was tracked.
    pub fn release(&self, path: &Path) -> bool {
        if !self.registry.unregister(path) {
            debug!("Release of untracked {}. Ignoring it", path.display());
            return false;
        }

        match remove_file(path) {
            Ok(Removal::Deleted) => info!("Released {}", path.display()),
            Ok(Removal::AlreadyGone) => debug!("Released {}, file was already gone", path.display()),
            Err(err) => warn!("Released {} but the file stays: {err}", path.display()),
        }
        true
    }

    /// Run one eviction pass now instead of waiting for the sweeper.
    pub fn sweep_now(&self) -> SweepReport {
        self.pass.run()
    }

    /// Stop the sweeper, delete every file and remove the working directory.
    ///
    /// Files are deleted whatever their age, tracked or not.
    /// No allocation is accepted afterward. Calling it again does no harm.
    pub fn shutdown_and_purge(&self) -> PurgeReport {
        if !self.registry.seal() {
            info!("Shutting down, purging {}", self.directory.path().display());
        }

        if let Some(sweeper) = self.sweeper.with_lock(|mut sweeper| sweeper.take()) {
            sweeper.stop();
        }

        let tracked = sweeper::evict(&self.registry, self.registry.snapshot_all());
        let stragglers = sweeper::evict_untracked(self.directory.stragglers());
        let directory = self.directory.remove_if_empty();

        if tracked.total() + stragglers.total() > 0 {
            info!(
                "Purged {} tracked and {} stray files",
                tracked.total(),
                stragglers.total()
            );
        }

        PurgeReport {
            tracked,
            stragglers,
            directory,
        }
    }

    pub fn directory(&self) -> &Path {
        self.directory.path()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.registry.contains(path)
    }

    /// Registration time of a tracked path
    pub fn entry(&self, path: &Path) -> Option<Entry> {
        self.registry.get(path)
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry.is_sealed()
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        self.shutdown_and_purge();
    }
}

/// A resource id becomes a file name, so it must not be able to name
/// anything outside of the working directory.
fn validate_resource_id(resource_id: &str) -> Result<()> {
    let is_valid = !resource_id.is_empty()
        && resource_id != "."
        && resource_id != ".."
        && !resource_id.contains(['/', '\\', '\0']);

    if is_valid {
        Ok(())
    } else {
        Err(Error::InvalidResourceId(resource_id.to_owned()))
    }
}
