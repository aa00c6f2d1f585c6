//! GuideSystem - Main entry point for the SDK
//!
//! Wires the change hub, connection manager, query engine and EPG
//! aggregator together behind the surface presentation code calls.

use std::sync::Arc;

use chrono::NaiveDateTime;
use guide_browse::{
    wait_for_content, CancelToken, EpgAddressing, EpgAggregator, PollOptions, QueryEngine,
};
use guide_connection::{ConnectionManager, ConnectionObserver};
use guide_model::{Channel, ClassRegistry, DeviceRecord, DirectoryClass, DirectoryObject, Program};
use guide_notify::{ChangeHub, ChangeObserver, ResourceKey};
use guide_transport::{ControlPoint, StartOptions, UpnpControlPoint};

use crate::SdkError;

/// Main system entry point.
///
/// GuideSystem is fully synchronous - no async/await required. Browses
/// block for one round-trip; connection lifecycle is asynchronous and
/// reported through the observer passed to
/// [`start_connection`](Self::start_connection).
///
/// # Example
///
/// ```rust,ignore
/// use guide_sdk::GuideSystem;
///
/// let system = GuideSystem::new(Default::default());
/// system.start_connection(None)?;
/// // ... once connected:
/// for device in system.list_devices(false) {
///     for channel in system.browse_channels(&device.udn) {
///         println!("{} {}", channel.channel_number.unwrap_or(0), channel.call_sign);
///     }
/// }
/// ```
pub struct GuideSystem {
    hub: Arc<ChangeHub>,
    manager: Arc<ConnectionManager>,
    engine: Arc<QueryEngine>,
    aggregator: EpgAggregator,
}

impl GuideSystem {
    /// System backed by the production UPnP control point.
    pub fn new(options: StartOptions) -> Self {
        Self::with_control_point(Box::new(UpnpControlPoint::new()), options)
    }

    /// System backed by any control point. This is the seam tests and
    /// alternative transports plug into.
    pub fn with_control_point(control_point: Box<dyn ControlPoint>, options: StartOptions) -> Self {
        Self::build(control_point, options, None)
    }

    /// Like [`with_control_point`](Self::with_control_point) but with a
    /// non-reference EPG container layout.
    pub fn with_addressing(
        control_point: Box<dyn ControlPoint>,
        options: StartOptions,
        addressing: Arc<dyn EpgAddressing>,
    ) -> Self {
        Self::build(control_point, options, Some(addressing))
    }

    fn build(
        control_point: Box<dyn ControlPoint>,
        options: StartOptions,
        addressing: Option<Arc<dyn EpgAddressing>>,
    ) -> Self {
        let hub = Arc::new(ChangeHub::new());
        let manager = Arc::new(ConnectionManager::new(
            control_point,
            options,
            Arc::clone(&hub),
        ));
        let engine = Arc::new(QueryEngine::new(
            Arc::clone(&manager),
            Arc::clone(&hub),
            ClassRegistry::default(),
        ));
        let aggregator = match addressing {
            Some(addressing) => EpgAggregator::with_addressing(Arc::clone(&engine), addressing),
            None => EpgAggregator::new(Arc::clone(&engine)),
        };
        Self {
            hub,
            manager,
            engine,
            aggregator,
        }
    }

    /// Start the service connection. Idempotent; see
    /// [`ConnectionManager::start`].
    pub fn start_connection(
        &self,
        observer: Option<Arc<dyn ConnectionObserver>>,
    ) -> Result<(), SdkError> {
        self.manager.start(observer)?;
        Ok(())
    }

    /// Request connection teardown. No-op when not running.
    pub fn stop_connection(&self) -> Result<(), SdkError> {
        self.manager.stop()?;
        Ok(())
    }

    /// True when queries can currently reach a server.
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Snapshot of the known servers. With `include_all`, non-media-server
    /// devices are included too.
    pub fn list_devices(&self, include_all: bool) -> Vec<DeviceRecord> {
        self.manager.list_devices(include_all)
    }

    /// Browse one level of the directory hierarchy. See
    /// [`QueryEngine::browse`] for the degradation rules.
    pub fn browse(
        &self,
        udn: &str,
        parent_id: &str,
        class: DirectoryClass,
        observer: Option<Arc<dyn ChangeObserver>>,
    ) -> Vec<DirectoryObject> {
        self.engine.browse(udn, parent_id, class, observer)
    }

    /// The channel list of one server.
    pub fn browse_channels(&self, udn: &str) -> Vec<Channel> {
        self.aggregator.channels(udn)
    }

    /// Every program on the given channels overlapping `[start, end)`.
    pub fn browse_programs(
        &self,
        udn: &str,
        channel_ids: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Program> {
        self.aggregator.programs(udn, channel_ids, start, end)
    }

    /// Convenience overload of [`browse_programs`](Self::browse_programs)
    /// taking channel records.
    pub fn browse_programs_for(
        &self,
        udn: &str,
        channels: &[Channel],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Program> {
        self.aggregator
            .programs_for_channels(udn, channels, start, end)
    }

    /// The program airing on `channel` right now, if any.
    pub fn current_program(&self, udn: &str, channel: &Channel) -> Option<Program> {
        self.aggregator.current_program(udn, channel)
    }

    /// Register for change notifications on one container, and ask the
    /// server to push them. With `include_children`, changes to any object
    /// below `object_id` fire too.
    pub fn subscribe(
        &self,
        udn: &str,
        object_id: &str,
        include_children: bool,
        observer: Arc<dyn ChangeObserver>,
    ) {
        self.hub.register(
            ResourceKey::object(udn, object_id),
            include_children,
            observer,
        );
        if let Some(transport) = self.manager.transport() {
            if let Err(e) = transport.subscribe(udn, object_id) {
                tracing::warn!(udn, object_id, "Server-side subscribe failed: {e}");
            }
        }
    }

    /// Register for device-list change notifications.
    pub fn subscribe_device_list(&self, observer: Arc<dyn ChangeObserver>) {
        self.hub.register(ResourceKey::DeviceList, false, observer);
    }

    /// Drop every registration held by `observer`.
    pub fn unsubscribe(&self, observer: &Arc<dyn ChangeObserver>) {
        self.hub.unsubscribe(observer);
    }

    /// Poll a server's root until it has content; the startup validation
    /// step. See [`guide_browse::wait_for_content`].
    pub fn wait_for_content(
        &self,
        udn: &str,
        options: &PollOptions,
        cancel: &CancelToken,
    ) -> Result<Vec<DirectoryObject>, SdkError> {
        Ok(wait_for_content(&self.engine, udn, options, cancel)?)
    }

    /// The underlying connection manager, for advanced usage.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }
}
