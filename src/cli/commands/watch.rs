//! `emakhua watch` command - reload when another process saves the lexicon

use console::style;
use miette::Result;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::cli::helpers::{open_lexicon, open_storage, resolve_config};
use crate::cli::GlobalOpts;
use crate::core::sync::{StorageMarker, SyncEvent, SyncMonitor};

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Polling interval in seconds (default: from config, else 5)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Exit after this many reloads
    #[arg(long)]
    pub count: Option<usize>,
}

pub fn run(args: WatchArgs, global: &GlobalOpts) -> Result<()> {
    let config = resolve_config(global);
    let interval = args
        .interval
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.sync_interval());

    let mut lexicon = open_lexicon(global)?;
    let storage = open_storage(&config)?;
    let monitor = SyncMonitor::new(Arc::new(StorageMarker::new(storage)), interval);

    let (tx, rx) = mpsc::channel::<Option<String>>();
    monitor.subscribe(move |event| {
        if let SyncEvent::ReloadRequested { marker } = event {
            let _ = tx.send(marker.clone());
        }
    });

    if !global.quiet {
        println!(
            "{} Watching {} words (every {}s, Ctrl-C to stop)",
            style("→").blue(),
            lexicon.total_entries(),
            interval.as_secs()
        );
    }

    let handle = monitor.start();
    let mut reloads = 0;
    for marker in rx.iter() {
        match lexicon.reload() {
            Ok(()) => {
                reloads += 1;
                if !global.quiet {
                    println!(
                        "{} Reloaded: {} words ({})",
                        style("✓").green(),
                        lexicon.total_entries(),
                        marker.as_deref().unwrap_or("no marker")
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "reload failed, keeping previous data"),
        }
        if args.count.is_some_and(|limit| reloads >= limit) {
            break;
        }
    }
    handle.stop();
    Ok(())
}
