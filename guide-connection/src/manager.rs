//! Sync-first connection manager

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use guide_model::DeviceRecord;
use guide_notify::ChangeHub;
use guide_transport::{ContentDirectory, ControlPoint, StartOptions};

use crate::dispatcher::spawn_event_dispatcher;
use crate::error::{ConnectionError, Result};
use crate::worker::{spawn_link_worker, Command};

/// Where the connection machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started, or a bind attempt failed.
    Stopped,
    /// A bind is in flight.
    Starting,
    /// Queries can be issued.
    Connected,
    /// The link was established and then went away. A fresh `start()` is
    /// required; there is no auto-reconnect.
    Disconnected,
}

/// Receives lifecycle notifications. Callbacks arrive on the manager's
/// dispatcher thread.
pub trait ConnectionObserver: Send + Sync {
    fn on_connected(&self);
    fn on_disconnected(&self);
    fn on_error(&self, error: &ConnectionError);
}

/// State shared between the manager and its dispatcher thread.
///
/// The dispatcher is the only writer of `state`, `transport` and `devices`;
/// each field is swapped whole under its lock, so readers always see a
/// consistent snapshot.
pub(crate) struct Shared {
    pub(crate) options: StartOptions,
    state: RwLock<ConnectionState>,
    transport: RwLock<Option<Arc<dyn ContentDirectory>>>,
    devices: RwLock<Vec<DeviceRecord>>,
    observers: RwLock<Vec<Arc<dyn ConnectionObserver>>>,
}

impl Shared {
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn ContentDirectory>> {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn set_transport(&self, transport: Option<Arc<dyn ContentDirectory>>) {
        *self.transport.write().unwrap_or_else(|e| e.into_inner()) = transport;
    }

    pub(crate) fn set_devices(&self, devices: Vec<DeviceRecord>) {
        *self.devices.write().unwrap_or_else(|e| e.into_inner()) = devices;
    }

    pub(crate) fn for_each_observer(&self, f: impl Fn(&Arc<dyn ConnectionObserver>)) {
        // Snapshot first so a callback can register further observers.
        let observers: Vec<_> = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(Arc::clone)
            .collect();
        for observer in &observers {
            f(observer);
        }
    }
}

/// Owns the service link. Explicitly constructed, explicitly dropped; there
/// is no process-wide instance.
///
/// All methods are synchronous. `start` and `stop` only enqueue work for
/// the background worker; the resulting state transitions are reported
/// through the registered [`ConnectionObserver`]s.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    command_tx: Sender<Command>,
    stop_flag: Arc<AtomicBool>,
    _worker: JoinHandle<()>,
    _dispatcher: JoinHandle<()>,
}

impl ConnectionManager {
    pub fn new(
        control_point: Box<dyn ControlPoint>,
        options: StartOptions,
        hub: Arc<ChangeHub>,
    ) -> Self {
        let shared = Arc::new(Shared {
            options: options.clone(),
            state: RwLock::new(ConnectionState::Stopped),
            transport: RwLock::new(None),
            devices: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        });

        let (command_tx, command_rx) = mpsc::channel();
        let (link_tx, link_rx) = mpsc::channel();
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker = spawn_link_worker(control_point, options, command_rx, link_tx);
        let dispatcher = spawn_event_dispatcher(
            Arc::clone(&shared),
            hub,
            link_rx,
            Arc::clone(&stop_flag),
        );

        Self {
            shared,
            command_tx,
            stop_flag,
            _worker: worker,
            _dispatcher: dispatcher,
        }
    }

    /// Start the service link, registering `observer` for lifecycle events.
    ///
    /// Idempotent: when already connected the new observer is notified
    /// immediately and no second bind is issued; while a bind is in flight
    /// the observer simply joins the fan-out. Bind failures are reported to
    /// every observer via `on_error`, never returned from here.
    pub fn start(&self, observer: Option<Arc<dyn ConnectionObserver>>) -> Result<()> {
        if let Some(observer) = &observer {
            self.shared
                .observers
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push(Arc::clone(observer));
        }

        // Decide under the lock, act after releasing it so the immediate
        // callback can call back into the manager.
        let (should_bind, already_connected) = {
            let mut state = self
                .shared
                .state
                .write()
                .unwrap_or_else(|e| e.into_inner());
            match *state {
                ConnectionState::Connected => (false, true),
                ConnectionState::Starting => (false, false),
                ConnectionState::Stopped | ConnectionState::Disconnected => {
                    *state = ConnectionState::Starting;
                    (true, false)
                }
            }
        };

        if already_connected {
            if let Some(observer) = &observer {
                observer.on_connected();
            }
        }
        if should_bind {
            self.command_tx
                .send(Command::Start)
                .map_err(|_| ConnectionError::WorkerGone)?;
        }
        Ok(())
    }

    /// Request teardown. No-op when already stopped. Does not wait: the
    /// actual transition happens when the disconnect event arrives.
    pub fn stop(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Stopped | ConnectionState::Disconnected => {
                tracing::debug!("Stop requested but service is not running");
                Ok(())
            }
            _ => self
                .command_tx
                .send(Command::Stop)
                .map_err(|_| ConnectionError::WorkerGone),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// True when queries can currently be issued.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Snapshot of the cached device table. Valid in any state; empty until
    /// the first refresh has run.
    pub fn list_devices(&self, include_non_media_servers: bool) -> Vec<DeviceRecord> {
        self.shared
            .devices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|d| include_non_media_servers || d.is_media_server())
            .cloned()
            .collect()
    }

    /// The query handle, when connected.
    pub fn transport(&self) -> Option<Arc<dyn ContentDirectory>> {
        self.shared.transport()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(Command::Shutdown);
    }
}
