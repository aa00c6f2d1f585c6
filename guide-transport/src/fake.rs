//! Scriptable in-memory test doubles for the transport seams
//!
//! Available behind the `test-support` feature so downstream crates can
//! exercise connection management, browsing and aggregation without a
//! network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TransportError};
use crate::options::StartOptions;
use crate::row::Row;
use crate::{ContentDirectory, ControlPoint, DeviceFilter, LinkEvent};

/// In-memory [`ContentDirectory`] backed by seeded rows.
///
/// Records every query so tests can assert what was asked, and can be told
/// to fail browses on demand.
#[derive(Default)]
pub struct FakeDirectory {
    containers: Mutex<HashMap<(String, String), Vec<Row>>>,
    devices: Mutex<Vec<Row>>,
    fail_browse: AtomicBool,
    queries: Mutex<Vec<(String, String)>>,
    subscriptions: Mutex<Vec<(String, String)>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the rows returned for one `(udn, container_id)` pair.
    pub fn seed_container(&self, udn: &str, container_id: &str, rows: Vec<Row>) {
        self.containers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((udn.to_string(), container_id.to_string()), rows);
    }

    /// Seed the device-list rows.
    pub fn seed_devices(&self, rows: Vec<Row>) {
        *self.devices.lock().unwrap_or_else(|e| e.into_inner()) = rows;
    }

    /// Make every subsequent browse fail with a network error.
    pub fn set_fail_browse(&self, fail: bool) {
        self.fail_browse.store(fail, Ordering::SeqCst);
    }

    /// Every `(udn, container_id)` browsed so far, in call order.
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of browse calls issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every `(udn, container_id)` subscribed so far.
    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ContentDirectory for FakeDirectory {
    fn browse(&self, udn: &str, container_id: &str, _columns: &[&str]) -> Result<Vec<Row>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((udn.to_string(), container_id.to_string()));
        if self.fail_browse.load(Ordering::SeqCst) {
            return Err(TransportError::Network("injected browse failure".into()));
        }
        Ok(self
            .containers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(udn.to_string(), container_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn list_devices(&self, _filter: &DeviceFilter) -> Result<Vec<Row>> {
        Ok(self.devices.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn subscribe(&self, udn: &str, container_id: &str) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((udn.to_string(), container_id.to_string()));
        Ok(())
    }
}

struct FakeShared {
    directory: Arc<FakeDirectory>,
    bind_count: AtomicUsize,
    fail_bind: AtomicBool,
    events: Mutex<Option<Sender<LinkEvent>>>,
}

/// Scriptable [`ControlPoint`] that hands out a [`FakeDirectory`].
pub struct FakeControlPoint {
    shared: Arc<FakeShared>,
}

/// Handle kept by the test after the control point is boxed away.
#[derive(Clone)]
pub struct FakeHandle {
    shared: Arc<FakeShared>,
}

impl FakeControlPoint {
    /// Create a control point around `directory`, returning the test handle
    /// alongside it.
    pub fn new(directory: Arc<FakeDirectory>) -> (Self, FakeHandle) {
        let shared = Arc::new(FakeShared {
            directory,
            bind_count: AtomicUsize::new(0),
            fail_bind: AtomicBool::new(false),
            events: Mutex::new(None),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            FakeHandle { shared },
        )
    }
}

impl ControlPoint for FakeControlPoint {
    fn bind(
        &mut self,
        _options: &StartOptions,
        events: Sender<LinkEvent>,
    ) -> Result<Arc<dyn ContentDirectory>> {
        self.shared.bind_count.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_bind.load(Ordering::SeqCst) {
            return Err(TransportError::ServiceUnavailable(
                "injected bind failure".into(),
            ));
        }
        *self.shared.events.lock().unwrap_or_else(|e| e.into_inner()) = Some(events);
        Ok(Arc::clone(&self.shared.directory) as Arc<dyn ContentDirectory>)
    }

    fn shutdown(&mut self) {
        let events = self
            .shared
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(events) = events {
            let _ = events.send(LinkEvent::Disconnected);
        }
    }
}

impl FakeHandle {
    /// How many times `bind` has been called.
    pub fn bind_count(&self) -> usize {
        self.shared.bind_count.load(Ordering::SeqCst)
    }

    /// Make the next bind fail.
    pub fn set_fail_bind(&self, fail: bool) {
        self.shared.fail_bind.store(fail, Ordering::SeqCst);
    }

    /// Emit a link event as if it came from the remote service.
    /// Returns false when no bind has stored a sender yet.
    pub fn emit(&self, event: LinkEvent) -> bool {
        let guard = self.shared.events.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// The shared fake directory.
    pub fn directory(&self) -> Arc<FakeDirectory> {
        Arc::clone(&self.shared.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rows_round_trip() {
        let directory = FakeDirectory::new();
        directory.seed_container(
            "server-1",
            "0/Channels",
            vec![Row::new().with("dc:title", "KWTV")],
        );

        let rows = directory.browse("server-1", "0/Channels", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(directory.queries(), vec![("server-1".into(), "0/Channels".into())]);

        let empty = directory.browse("server-1", "0/None", &[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let directory = FakeDirectory::new();
        directory.set_fail_browse(true);
        assert!(directory.browse("s", "0", &[]).is_err());
    }

    #[test]
    fn test_control_point_counts_binds_and_emits() {
        let directory = Arc::new(FakeDirectory::new());
        let (mut control_point, handle) = FakeControlPoint::new(Arc::clone(&directory));
        let (tx, rx) = std::sync::mpsc::channel();

        assert!(!handle.emit(LinkEvent::DeviceListChanged));

        control_point.bind(&StartOptions::default(), tx).unwrap();
        assert_eq!(handle.bind_count(), 1);
        assert!(handle.emit(LinkEvent::DeviceListChanged));
        assert!(matches!(rx.try_recv(), Ok(LinkEvent::DeviceListChanged)));

        control_point.shutdown();
        assert!(matches!(rx.try_recv(), Ok(LinkEvent::Disconnected)));
    }
}
