mod cli;
mod logging;

use std::{thread, time::Duration};

use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use mediatemp::{
    fetch,
    outside::{MediaProducer, Ytdl},
    settings::Settings,
    Extension, LifecycleManager, Session,
};
use miette::{Context, IntoDiagnostic, Result};
use tracing::{error, info, warn};

use crate::{cli::Args, logging::init_logging};

fn main() -> Result<()> {
    // Initialize the environment & CLI
    let args = Args::parse();
    let mut settings =
        Settings::load(args.config.as_deref()).wrap_err("Could not load the settings")?;
    args.apply(&mut settings);

    init_logging(settings.log_level, settings.log_file.as_deref())?;

    // Ctrl-C and SIGTERM only end the hold, the purge below still runs
    let (interrupt, interrupted) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt.try_send(());
    })
    .into_diagnostic()
    .wrap_err("Could not install the interrupt handler")?;

    let ytdl = Ytdl::new().wrap_err("Could not find a video downloader")?;
    info!("Using {}", ytdl.program());

    // Dropping the manager purges the scratch directory, even on early return
    let manager = LifecycleManager::new(settings.manager_config())
        .wrap_err("Could not set up the scratch directory")?;
    info!("Scratch directory: {}", manager.directory().display());

    let session = if args.session {
        Some(watch_session(&manager, &ytdl, &args.ids, settings.extension))
    } else {
        fetch_all(&manager, &ytdl, &args.ids, settings.extension)?;
        None
    };

    if !args.hold.is_zero() {
        info!(
            "Holding {} files for {}",
            manager.tracked_count(),
            humantime::format_duration(args.hold)
        );
        if hold(args.hold, &interrupted) {
            info!("Interrupted, purging early");
        }
    }
    drop(session);

    let report = manager.shutdown_and_purge();
    info!(
        "Scratch directory purged: {} tracked files, {} stray files, directory {:?}",
        report.tracked.total(),
        report.stragglers.total(),
        report.directory
    );

    Ok(())
}

/// Wait for `duration` or until interrupted.
/// Return whether it was interrupted
fn hold(duration: Duration, interrupted: &Receiver<()>) -> bool {
    match interrupted.recv_timeout(duration) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        // No handler left to send anything
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(duration);
            false
        }
    }
}

/// Fetch every video concurrently, one thread per video
fn fetch_all(
    manager: &LifecycleManager,
    producer: &dyn MediaProducer,
    ids: &[String],
    extension: Extension,
) -> Result<()> {
    thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(ids.len());
        for (i, video_id) in ids.iter().enumerate() {
            let handle = thread::Builder::new()
                .name(format!("fetch-{i}"))
                .spawn_scoped(scope, move || {
                    fetch(manager, producer, video_id, extension)
                        .map(|path| info!("{video_id} ready at {}", path.display()))
                })
                .into_diagnostic()
                .wrap_err("Could not spawn a fetch thread")?;
            handles.push(handle);
        }

        let failed = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|res| !matches!(res, Ok(Ok(()))))
            .count();
        if failed > 0 {
            warn!("{failed} of {} videos could not be fetched", ids.len());
        }

        Ok(())
    })
}

/// Watch the videos one after the other.
/// Return the session, still holding the last video
fn watch_session<'a>(
    manager: &'a LifecycleManager,
    producer: &'a dyn MediaProducer,
    ids: &[String],
    extension: Extension,
) -> Session<'a> {
    let mut session = Session::new(manager, producer, extension);
    for video_id in ids {
        match session.play(video_id) {
            Ok(path) => info!("Now playing {video_id} from {}", path.display()),
            Err(err) => error!("Skipping {video_id}: {err}"),
        }
    }
    session
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_hold_lasts_the_whole_duration() {
        let (_interrupt, interrupted) = crossbeam_channel::bounded(1);

        let start = Instant::now();
        assert!(!hold(Duration::from_millis(50), &interrupted));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_interrupt_ends_hold_early() {
        let (interrupt, interrupted) = crossbeam_channel::bounded(1);
        let waiter = thread::spawn(move || hold(Duration::from_secs(3600), &interrupted));

        interrupt.try_send(()).unwrap();
        let start = Instant::now();
        assert!(waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_interrupt_before_hold_is_not_lost() {
        let (interrupt, interrupted) = crossbeam_channel::bounded(1);

        interrupt.try_send(()).unwrap();
        assert!(hold(Duration::from_secs(3600), &interrupted));
    }
}
