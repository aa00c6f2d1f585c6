//! One hierarchical browse, typed

use std::sync::Arc;

use guide_connection::ConnectionManager;
use guide_model::{columns_for, decode, names, ClassRegistry, DirectoryClass, DirectoryObject, Record};
use guide_notify::{ChangeHub, ChangeObserver, ResourceKey};

use crate::error::Result;

/// Object id of the directory root on every server.
pub const ROOT: &str = "0";

/// Executes browse queries and maps result rows into typed records.
///
/// The engine is stateless between calls and safe to share; concurrent
/// browses only contend on the connection manager's snapshot locks.
pub struct QueryEngine {
    manager: Arc<ConnectionManager>,
    hub: Arc<ChangeHub>,
    registry: ClassRegistry,
}

impl QueryEngine {
    pub fn new(manager: Arc<ConnectionManager>, hub: Arc<ChangeHub>, registry: ClassRegistry) -> Self {
        Self {
            manager,
            hub,
            registry,
        }
    }

    /// The connection manager this engine queries through.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Browse the children of `parent_id` on server `udn`, projecting the
    /// columns for `class`.
    ///
    /// Never fails: a missing connection, an empty container and a failed
    /// round-trip all come back as an empty list, and a row whose
    /// discriminator is unknown is skipped without affecting its siblings.
    /// Rows are decoded by their own discriminator, so a mixed container
    /// yields mixed variants.
    ///
    /// When `observer` is given it is registered with the change hub
    /// against exactly `(udn, parent_id)`, whether or not the browse
    /// succeeds.
    pub fn browse(
        &self,
        udn: &str,
        parent_id: &str,
        class: DirectoryClass,
        observer: Option<Arc<dyn ChangeObserver>>,
    ) -> Vec<DirectoryObject> {
        match self.try_browse(udn, parent_id, class, observer) {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(udn, parent_id, "Browse failed, returning empty: {e}");
                Vec::new()
            }
        }
    }

    /// Like [`browse`](Self::browse), but surfaces a failed round-trip so
    /// callers can distinguish it from a genuinely empty container. A
    /// missing connection is still an empty success.
    pub fn try_browse(
        &self,
        udn: &str,
        parent_id: &str,
        class: DirectoryClass,
        observer: Option<Arc<dyn ChangeObserver>>,
    ) -> Result<Vec<DirectoryObject>> {
        if let Some(observer) = observer {
            self.hub
                .register(ResourceKey::object(udn, parent_id), false, observer);
        }

        let Some(transport) = self.manager.transport() else {
            tracing::debug!(udn, parent_id, "Browse while not connected");
            return Ok(Vec::new());
        };

        let rows = transport.browse(udn, parent_id, columns_for(class))?;
        tracing::debug!(udn, parent_id, rows = rows.len(), "Browse returned");

        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(discriminator) = row.get(names::CLASS) else {
                tracing::warn!(udn, parent_id, "Row without a class column, skipping");
                continue;
            };
            let resolved = match self.registry.resolve(discriminator) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(udn, parent_id, "Skipping row: {e}");
                    continue;
                }
            };
            match decode(resolved, row) {
                Record::Object(object) => objects.push(object),
                // Device rows do not belong in an object listing.
                Record::Device(_) => {
                    tracing::debug!(udn, parent_id, "Skipping device row in object browse");
                }
            }
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::connected_engine;
    use guide_transport::Row;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel_row(id: &str, title: &str) -> Row {
        Row::new()
            .with(names::ID, id)
            .with(names::PARENT_ID, "0/Channels")
            .with(names::TITLE, title)
            .with(names::CLASS, "object.item.videoItem.videoBroadcast")
            .with(names::CHANNEL_ID, title.to_lowercase())
    }

    #[test]
    fn test_unknown_discriminator_skips_row_only() {
        let (engine, handle, _hub) = connected_engine();
        handle.directory().seed_container(
            "s1",
            "0/Channels",
            vec![
                channel_row("0/Channels/1", "KWTV"),
                channel_row("0/Channels/2", "KOCO"),
                Row::new()
                    .with(names::ID, "0/Channels/x")
                    .with(names::CLASS, "object.item.imageItem.photo"),
                channel_row("0/Channels/3", "KFOR"),
            ],
        );

        let objects = engine.browse("s1", "0/Channels", DirectoryClass::VideoBroadcast, None);
        assert_eq!(objects.len(), 3);
        let titles: Vec<&str> = objects.iter().map(|o| o.title()).collect();
        assert_eq!(titles, vec!["KWTV", "KOCO", "KFOR"]);
    }

    #[test]
    fn test_mixed_container_decodes_per_row() {
        let (engine, handle, _hub) = connected_engine();
        handle.directory().seed_container(
            "s1",
            "0",
            vec![
                Row::new()
                    .with(names::ID, "0/Channels")
                    .with(names::TITLE, "Channels")
                    .with(names::CLASS, "object.container"),
                Row::new()
                    .with(names::ID, "0/VOD/1")
                    .with(names::TITLE, "A movie")
                    .with(names::CLASS, "object.item.videoItem")
                    .with(names::RESOURCE, "http://server/vod/1.mpg"),
            ],
        );

        let objects = engine.browse("s1", "0", DirectoryClass::Container, None);
        assert_eq!(objects.len(), 2);
        assert!(matches!(objects[0], DirectoryObject::Folder(_)));
        assert!(matches!(objects[1], DirectoryObject::Item(_)));
    }

    #[test]
    fn test_empty_and_failed_browse_return_empty() {
        let (engine, handle, _hub) = connected_engine();

        assert!(engine
            .browse("s1", "0/Nothing", DirectoryClass::Container, None)
            .is_empty());

        handle.directory().set_fail_browse(true);
        assert!(engine
            .browse("s1", "0/Channels", DirectoryClass::VideoBroadcast, None)
            .is_empty());

        // The fallible surface distinguishes the two.
        handle.directory().set_fail_browse(false);
        assert!(engine
            .try_browse("s1", "0/Nothing", DirectoryClass::Container, None)
            .unwrap()
            .is_empty());
        handle.directory().set_fail_browse(true);
        assert!(engine
            .try_browse("s1", "0/Channels", DirectoryClass::VideoBroadcast, None)
            .is_err());
    }

    #[test]
    fn test_observer_registered_even_when_browse_fails() {
        let (engine, handle, hub) = connected_engine();
        handle.directory().set_fail_browse(true);

        struct CountObserver(AtomicUsize);
        impl ChangeObserver for CountObserver {
            fn on_change(&self, _key: &ResourceKey) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let observer = Arc::new(CountObserver(AtomicUsize::new(0)));
        engine.browse(
            "s1",
            "0/Channels",
            DirectoryClass::VideoBroadcast,
            Some(Arc::clone(&observer) as Arc<dyn ChangeObserver>),
        );
        assert_eq!(hub.registration_count(), 1);

        hub.notify(ResourceKey::object("s1", "0/Channels"));
        hub.flush();
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_requested_projection_matches_class() {
        let (engine, handle, _hub) = connected_engine();
        engine.browse("s1", "0/Channels", DirectoryClass::VideoBroadcast, None);
        assert_eq!(
            handle.directory().queries(),
            vec![("s1".to_string(), "0/Channels".to_string())]
        );
    }
}
