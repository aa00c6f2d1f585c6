//! Observer registry and dispatch thread

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

/// The resource a change event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    /// The set of known servers changed.
    DeviceList,
    /// One directory container on one server changed.
    Object { udn: String, object_id: String },
}

impl ResourceKey {
    pub fn object(udn: impl Into<String>, object_id: impl Into<String>) -> Self {
        ResourceKey::Object {
            udn: udn.into(),
            object_id: object_id.into(),
        }
    }
}

/// Receives change signals. The callback arrives on the hub's dispatch
/// thread and carries no data: re-query if interested.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, key: &ResourceKey);
}

struct Registration {
    key: ResourceKey,
    include_children: bool,
    observer: Arc<dyn ChangeObserver>,
}

impl Registration {
    fn matches(&self, event: &ResourceKey) -> bool {
        match (&self.key, event) {
            (ResourceKey::DeviceList, ResourceKey::DeviceList) => true,
            (
                ResourceKey::Object { udn, object_id },
                ResourceKey::Object {
                    udn: event_udn,
                    object_id: event_id,
                },
            ) => {
                udn == event_udn
                    && (object_id == event_id
                        || (self.include_children
                            && event_id.starts_with(object_id)
                            && event_id[object_id.len()..].starts_with('/')))
            }
            _ => false,
        }
    }
}

enum Dispatch {
    Event(ResourceKey),
    /// Ack once everything enqueued before this message has been delivered.
    Flush(Sender<()>),
    Shutdown,
}

/// Registry mapping resources to observers, with delivery decoupled from
/// the notifying thread.
///
/// `notify` only enqueues; a dedicated dispatcher thread drains the queue
/// and invokes every matching observer exactly once per event, in
/// registration order. Callers of `notify` (the connection manager's event
/// drain) are therefore never blocked by a slow observer.
pub struct ChangeHub {
    registrations: Arc<RwLock<Vec<Registration>>>,
    queue: Sender<Dispatch>,
    _dispatcher: JoinHandle<()>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let registrations: Arc<RwLock<Vec<Registration>>> = Arc::new(RwLock::new(Vec::new()));
        let (queue, receiver) = mpsc::channel();

        let dispatch_registrations = Arc::clone(&registrations);
        let dispatcher = thread::spawn(move || {
            while let Ok(message) = receiver.recv() {
                match message {
                    Dispatch::Event(key) => {
                        // Snapshot under the read lock, invoke outside it, so
                        // an observer may register or unsubscribe re-entrantly.
                        let matching: Vec<Arc<dyn ChangeObserver>> = dispatch_registrations
                            .read()
                            .unwrap_or_else(|e| e.into_inner())
                            .iter()
                            .filter(|r| r.matches(&key))
                            .map(|r| Arc::clone(&r.observer))
                            .collect();
                        tracing::trace!(?key, observers = matching.len(), "Dispatching change");
                        for observer in matching {
                            observer.on_change(&key);
                        }
                    }
                    Dispatch::Flush(ack) => {
                        let _ = ack.send(());
                    }
                    Dispatch::Shutdown => break,
                }
            }
        });

        Self {
            registrations,
            queue,
            _dispatcher: dispatcher,
        }
    }

    /// Register an observer for a resource. With `include_children`, an
    /// object registration also fires for any object whose id extends the
    /// registered id with a `/` path segment.
    pub fn register(
        &self,
        key: ResourceKey,
        include_children: bool,
        observer: Arc<dyn ChangeObserver>,
    ) {
        self.registrations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Registration {
                key,
                include_children,
                observer,
            });
    }

    /// Remove every registration held by `observer`, compared by pointer
    /// identity.
    pub fn unsubscribe(&self, observer: &Arc<dyn ChangeObserver>) {
        self.registrations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|r| !Arc::ptr_eq(&r.observer, observer));
    }

    /// Enqueue a change event for dispatch.
    pub fn notify(&self, key: ResourceKey) {
        if self.queue.send(Dispatch::Event(key)).is_err() {
            tracing::warn!("Change dispatcher is gone, dropping event");
        }
    }

    /// Block until every event enqueued before this call has been
    /// delivered. Mostly useful in tests and during orderly shutdown.
    pub fn flush(&self) {
        let (ack, done) = mpsc::channel();
        if self.queue.send(Dispatch::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChangeHub {
    fn drop(&mut self) {
        let _ = self.queue.send(Dispatch::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records each delivery alongside a label, so multi-observer tests can
    /// assert delivery order.
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<(&'static str, ResourceKey)>>>,
    }

    impl ChangeObserver for Recorder {
        fn on_change(&self, key: &ResourceKey) {
            self.log
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((self.label, key.clone()));
        }
    }

    fn recorder(
        label: &'static str,
        log: &Arc<Mutex<Vec<(&'static str, ResourceKey)>>>,
    ) -> Arc<dyn ChangeObserver> {
        Arc::new(Recorder {
            label,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_exact_key_matching() {
        let hub = ChangeHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(ResourceKey::object("s1", "0/Channels"), false, recorder("a", &log));

        hub.notify(ResourceKey::object("s1", "0/Channels"));
        hub.notify(ResourceKey::object("s1", "0/EPG"));
        hub.notify(ResourceKey::object("s2", "0/Channels"));
        hub.notify(ResourceKey::DeviceList);
        hub.flush();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1, ResourceKey::object("s1", "0/Channels"));
    }

    #[test]
    fn test_child_path_matching() {
        let hub = ChangeHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(ResourceKey::object("s1", "0/EPG"), true, recorder("a", &log));

        hub.notify(ResourceKey::object("s1", "0/EPG"));
        hub.notify(ResourceKey::object("s1", "0/EPG/kwtv/3-5"));
        // A sibling with the registered id as a name prefix is not a child.
        hub.notify(ResourceKey::object("s1", "0/EPGX"));
        hub.flush();

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_device_list_observers_fire_on_device_events_only() {
        let hub = ChangeHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(ResourceKey::DeviceList, false, recorder("d", &log));

        hub.notify(ResourceKey::object("s1", "0"));
        hub.notify(ResourceKey::DeviceList);
        hub.flush();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1, ResourceKey::DeviceList);
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let hub = ChangeHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(ResourceKey::DeviceList, false, recorder("first", &log));
        hub.register(ResourceKey::DeviceList, false, recorder("second", &log));
        hub.register(ResourceKey::DeviceList, false, recorder("third", &log));

        hub.notify(ResourceKey::DeviceList);
        hub.flush();

        let order: Vec<&str> = log.lock().unwrap().iter().map(|(l, _)| *l).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_every_registration() {
        let hub = ChangeHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer = recorder("a", &log);
        hub.register(ResourceKey::DeviceList, false, Arc::clone(&observer));
        hub.register(ResourceKey::object("s1", "0"), false, Arc::clone(&observer));
        assert_eq!(hub.registration_count(), 2);

        hub.unsubscribe(&observer);
        assert_eq!(hub.registration_count(), 0);

        hub.notify(ResourceKey::DeviceList);
        hub.flush();
        assert!(log.lock().unwrap().is_empty());
    }
}
