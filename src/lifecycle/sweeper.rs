use std::{
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use crate::{
    io::{remove_file, Removal},
    result::{Error, Result},
};

use super::{Clock, FileRegistry};

/// Tally of one eviction pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted from disk
    pub removed: usize,
    /// Files that were not on disk anymore
    pub already_gone: usize,
    /// Files that could not be deleted. Their entries are cleared all the same
    pub failed: usize,
}

impl SweepReport {
    /// Number of entries handled during the pass
    pub fn total(&self) -> usize {
        self.removed + self.already_gone + self.failed
    }

    fn record(&mut self, outcome: Result<Removal>) {
        match outcome {
            Ok(Removal::Deleted) => self.removed += 1,
            Ok(Removal::AlreadyGone) => self.already_gone += 1,
            Err(err) => {
                warn!("{err}: {}", source_message(&err));
                self.failed += 1;
            }
        }
    }
}

fn source_message(err: &Error) -> String {
    std::error::Error::source(err).map_or_else(String::new, ToString::to_string)
}

/// Delete the files and clear their entries, whatever the deletion outcome.
pub(crate) fn evict(registry: &FileRegistry, paths: Vec<PathBuf>) -> SweepReport {
    let mut report = SweepReport::default();
    for path in paths {
        report.record(remove_file(&path));
        registry.unregister(&path);
    }
    report
}

/// Clear the entries still older than `cutoff` and delete their files.
///
/// Paths re-allocated since the snapshot are skipped, file included.
pub(crate) fn evict_stale(
    registry: &FileRegistry,
    paths: Vec<PathBuf>,
    cutoff: Instant,
) -> SweepReport {
    let mut report = SweepReport::default();
    for path in paths {
        if !registry.unregister_if_stale(&path, cutoff) {
            debug!("{} was refreshed, keeping it", path.display());
            continue;
        }
        report.record(remove_file(&path));
    }
    report
}

/// Delete files that the registry does not know about.
pub(crate) fn evict_untracked(paths: Vec<PathBuf>) -> SweepReport {
    let mut report = SweepReport::default();
    for path in paths {
        let outcome = remove_file(&path);
        if let Ok(Removal::Deleted) = outcome {
            info!("Removed stray file {}", path.display());
        }
        report.record(outcome);
    }
    report
}

/// One eviction check over the registry
#[derive(Debug, Clone)]
pub struct SweepPass {
    registry: Arc<FileRegistry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SweepPass {
    pub fn new(registry: Arc<FileRegistry>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            registry,
            clock,
            ttl,
        }
    }

    /// Evict every entry older than the TTL.
    pub fn run(&self) -> SweepReport {
        // Nothing can be older than the clock origin
        let Some(cutoff) = self.clock.now().checked_sub(self.ttl) else {
            return SweepReport::default();
        };

        let stale = self.registry.snapshot_stale_before(cutoff);
        if stale.is_empty() {
            return SweepReport::default();
        }

        debug!("{} stale entries found", stale.len());
        let report = evict_stale(&self.registry, stale, cutoff);
        info!(
            "Evicted {} stale files ({} removed, {} already gone, {} failed)",
            report.total(),
            report.removed,
            report.already_gone,
            report.failed
        );
        report
    }
}

/// Handle on the background thread running a [`SweepPass`] every interval
#[derive(Debug)]
pub struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(pass: SweepPass, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded(0);

        let handle = thread::Builder::new()
            .name("sweeper".to_owned())
            .spawn(move || run(&pass, interval, &stopped))
            .map_err(Error::SweeperSpawn)?;

        Ok(Self { stop, handle })
    }

    /// Signal the thread to stop and wait for it to exit.
    ///
    /// A sleeping thread wakes up at once, a running pass is finished first.
    pub fn stop(self) {
        let Self { stop, handle } = self;

        // Disconnecting the channel is the stop signal
        drop(stop);

        if handle.join().is_err() {
            error!("Sweeper thread panicked");
        }
    }
}

fn run(pass: &SweepPass, interval: Duration, stopped: &Receiver<()>) {
    debug!("Sweeper started, waking every {}", humantime::format_duration(interval));

    loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                pass.run();
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Stop signal received. Stopping the sweeper.");
}
