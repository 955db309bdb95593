//! Cross-handle change detection
//!
//! Several store handles (browser tabs in the web app, separate processes on
//! the command line) can share one persisted snapshot. Writers publish a
//! marker through a [`ChangeNotifier`] on every persist; a [`SyncMonitor`]
//! in each reader compares the latest marker with the one it last saw and
//! emits a reload signal when it changed.
//!
//! This is advisory and eventually consistent. Nothing here prevents two
//! writers from racing on the snapshot slot: the last save wins.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::storage::{KeyValueStorage, LAST_UPDATE_KEY};

/// Default polling interval
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Publish/observe capability for the shared "last update" marker
pub trait ChangeNotifier: Send + Sync {
    /// Announce that the shared snapshot changed
    fn publish(&self, marker: &str);

    /// The most recently published marker, if any
    fn latest(&self) -> Option<String>;
}

/// Marker kept in a storage slot (`db_last_update`), polled by readers
#[derive(Debug, Clone)]
pub struct StorageMarker<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> StorageMarker<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: LAST_UPDATE_KEY.to_string(),
        }
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

impl<S: KeyValueStorage> ChangeNotifier for StorageMarker<S> {
    fn publish(&self, marker: &str) {
        if let Err(e) = self.storage.set_item(&self.key, marker) {
            tracing::warn!("Failed to publish update marker: {}", e);
        }
    }

    fn latest(&self) -> Option<String> {
        match self.storage.get_item(&self.key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to read update marker: {}", e);
                None
            }
        }
    }
}

/// In-process broadcast of the marker; publishing also pushes to subscribers
#[derive(Clone, Default)]
pub struct BroadcastNotifier {
    inner: Arc<Mutex<BroadcastState>>,
}

#[derive(Default)]
struct BroadcastState {
    latest: Option<String>,
    subscribers: Vec<Sender<String>>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every marker published from now on
    pub fn subscribe(&self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut state) = self.inner.lock() {
            state.subscribers.push(tx);
        }
        rx
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, marker: &str) {
        if let Ok(mut state) = self.inner.lock() {
            state.latest = Some(marker.to_string());
            // Disconnected receivers are dropped on send failure
            state
                .subscribers
                .retain(|tx| tx.send(marker.to_string()).is_ok());
        }
    }

    fn latest(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|s| s.latest.clone())
    }
}

/// Build a marker for a freshly persisted snapshot
///
/// Timestamp plus a digest prefix, so two saves inside one clock tick
/// still produce different markers when their content differs.
pub fn snapshot_marker(bytes: &[u8], at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = format!("{:x}", hasher.finalize());
    format!("{}#{}", at.to_rfc3339(), &digest[..12])
}

/// Signals emitted by the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Another handle changed the shared snapshot; reload it
    ReloadRequested { marker: Option<String> },
    /// Listeners were told to reload
    DataReloaded { timestamp: DateTime<Utc> },
}

type Listener = Box<dyn Fn(&SyncEvent) + Send>;

struct MonitorState {
    last_seen: Option<String>,
    enabled: bool,
}

/// Polling and focus-triggered watcher over a [`ChangeNotifier`]
#[derive(Clone)]
pub struct SyncMonitor {
    notifier: Arc<dyn ChangeNotifier>,
    interval: Duration,
    state: Arc<Mutex<MonitorState>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl SyncMonitor {
    /// Create a monitor; the marker current at creation counts as seen
    pub fn new(notifier: Arc<dyn ChangeNotifier>, interval: Duration) -> Self {
        let last_seen = notifier.latest();
        Self {
            notifier,
            interval,
            state: Arc::new(Mutex::new(MonitorState {
                last_seen,
                enabled: true,
            })),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a listener for reload signals
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SyncEvent) + Send + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Compare the shared marker with the last one seen
    ///
    /// Returns true (and emits a reload) only when the marker changed since
    /// the previous check, so repeated ticks over one change fire once.
    pub fn check_for_updates(&self) -> bool {
        let latest = self.notifier.latest();
        let changed = {
            let Ok(mut state) = self.state.lock() else {
                return false;
            };
            if !state.enabled {
                return false;
            }
            match latest {
                Some(ref marker) if state.last_seen.as_deref() != Some(marker.as_str()) => {
                    state.last_seen = Some(marker.clone());
                    true
                }
                _ => false,
            }
        };

        if changed {
            tracing::debug!("Update marker changed, requesting reload");
            self.handle_update(latest);
        }
        changed
    }

    /// The page regained focus: check immediately
    pub fn on_focus(&self) -> bool {
        self.check_for_updates()
    }

    /// A local "database updated" signal: reload without comparing markers
    pub fn notify_database_updated(&self) {
        self.handle_update(self.notifier.latest());
    }

    /// Record a marker as already seen (e.g. one this handle published)
    pub fn acknowledge(&self, marker: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.last_seen = Some(marker.to_string());
        }
    }

    pub fn enable(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.enabled = true;
        }
    }

    pub fn disable(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.enabled = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().map(|s| s.enabled).unwrap_or(false)
    }

    /// Start polling on a background thread
    pub fn start(&self) -> MonitorHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let monitor = self.clone();
        let interval = self.interval;

        let join = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    monitor.check_for_updates();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        MonitorHandle {
            stop: Some(stop_tx),
            join: Some(join),
        }
    }

    fn handle_update(&self, marker: Option<String>) {
        let events = [
            SyncEvent::ReloadRequested { marker },
            SyncEvent::DataReloaded {
                timestamp: Utc::now(),
            },
        ];
        if let Ok(listeners) = self.listeners.lock() {
            for event in &events {
                for listener in listeners.iter() {
                    listener(event);
                }
            }
        }
    }
}

/// Running poller; stops when [`MonitorHandle::stop`] is called or on drop
pub struct MonitorHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_monitor(notifier: Arc<dyn ChangeNotifier>) -> (SyncMonitor, Arc<AtomicUsize>) {
        let monitor = SyncMonitor::new(notifier, Duration::from_millis(20));
        let reloads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reloads);
        monitor.subscribe(move |event| {
            if matches!(event, SyncEvent::ReloadRequested { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (monitor, reloads)
    }

    #[test]
    fn test_one_reload_per_distinct_marker() {
        let storage = MemoryStorage::new();
        let notifier = Arc::new(StorageMarker::new(storage.clone()));
        let (monitor, reloads) = counting_monitor(notifier.clone());

        assert!(!monitor.check_for_updates());

        notifier.publish("t1");
        assert!(monitor.check_for_updates());
        assert!(!monitor.check_for_updates());
        assert!(!monitor.check_for_updates());
        assert_eq!(reloads.load(Ordering::SeqCst), 1);

        // External writer touching the raw slot
        storage.set_item(LAST_UPDATE_KEY, "t2").unwrap();
        assert!(monitor.on_focus());
        assert_eq!(reloads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_existing_marker_at_creation_is_not_a_change() {
        let cell = BroadcastNotifier::new();
        cell.publish("before");
        let (monitor, reloads) = counting_monitor(Arc::new(cell));
        assert!(!monitor.check_for_updates());
        assert_eq!(reloads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_monitor_skips_checks_until_enabled() {
        let cell = BroadcastNotifier::new();
        let (monitor, reloads) = counting_monitor(Arc::new(cell.clone()));

        monitor.disable();
        assert!(!monitor.is_enabled());
        cell.publish("m1");
        assert!(!monitor.check_for_updates());
        assert_eq!(reloads.load(Ordering::SeqCst), 0);

        monitor.enable();
        assert!(monitor.check_for_updates());
        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acknowledged_marker_does_not_reload() {
        let cell = BroadcastNotifier::new();
        let (monitor, reloads) = counting_monitor(Arc::new(cell.clone()));
        cell.publish("own-write");
        monitor.acknowledge("own-write");
        assert!(!monitor.check_for_updates());
        assert_eq!(reloads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reload_emits_data_reloaded_notification() {
        let cell = BroadcastNotifier::new();
        let monitor = SyncMonitor::new(Arc::new(cell.clone()), DEFAULT_SYNC_INTERVAL);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        monitor.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        cell.publish("m");
        monitor.check_for_updates();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SyncEvent::ReloadRequested {
                marker: Some("m".to_string())
            }
        );
        assert!(matches!(events[1], SyncEvent::DataReloaded { .. }));
    }

    #[test]
    fn test_database_updated_signal_always_reloads() {
        let (monitor, reloads) = counting_monitor(Arc::new(BroadcastNotifier::new()));
        monitor.notify_database_updated();
        monitor.notify_database_updated();
        assert_eq!(reloads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_background_polling_picks_up_change() {
        let cell = BroadcastNotifier::new();
        let (monitor, reloads) = counting_monitor(Arc::new(cell.clone()));
        let handle = monitor.start();

        cell.publish("from-other-tab");
        let mut waited = 0;
        while reloads.load(Ordering::SeqCst) == 0 && waited < 100 {
            thread::sleep(Duration::from_millis(10));
            waited += 1;
        }
        handle.stop();

        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_broadcast_notifier_pushes_to_subscribers() {
        let notifier = BroadcastNotifier::new();
        let rx = notifier.subscribe();
        notifier.publish("a");
        notifier.publish("b");
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
        assert_eq!(notifier.latest(), Some("b".to_string()));
    }

    #[test]
    fn test_snapshot_marker_changes_with_content() {
        let at = Utc::now();
        assert_ne!(snapshot_marker(b"one", at), snapshot_marker(b"two", at));
        assert!(snapshot_marker(b"one", at).starts_with(&at.to_rfc3339()));
    }
}
