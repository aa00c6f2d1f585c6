//! Wire boundary for talking to UPnP/DLNA ContentDirectory servers
//!
//! This crate isolates everything the rest of the SDK does not want to know
//! about the network: SSDP discovery of media servers, SOAP `Browse` calls,
//! UPnP event subscriptions, and the flattening of DIDL-Lite result
//! documents into plain column/value rows.
//!
//! The two seams exported here are deliberately narrow:
//!
//! - [`ContentDirectory`] — the query surface: browse a container, list the
//!   known devices, subscribe for change notifications.
//! - [`ControlPoint`] — the lifecycle surface: bind to the network (blocking
//!   for the initial discovery sweep) and shut down again. Connection state
//!   changes flow back asynchronously as [`LinkEvent`]s.
//!
//! The production implementation is [`UpnpControlPoint`]; tests use the
//! scriptable fakes behind the `test-support` feature.

mod control_point;
mod description;
mod didl;
mod error;
mod options;
mod row;
mod soap;
mod ssdp;

#[cfg(feature = "test-support")]
pub mod fake;

pub use control_point::UpnpControlPoint;
pub use error::{Result, TransportError};
pub use options::StartOptions;
pub use row::Row;
pub use soap::SoapDirectory;

use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Column keys used for device rows produced by [`ContentDirectory::list_devices`].
///
/// Directory object rows use DIDL-Lite names (`@id`, `dc:title`, ...) that
/// fall out of the XML flattening; device rows are synthesized locally, so
/// their keys are pinned here for both producers and decoders.
pub mod device_keys {
    /// Unique device name of the server.
    pub const UDN: &str = "udn";
    /// Human-readable server name.
    pub const FRIENDLY_NAME: &str = "friendlyName";
    /// Full UPnP device-type URN.
    pub const DEVICE_TYPE: &str = "deviceType";
    /// "1" when the server currently answers on the network.
    pub const ONLINE: &str = "online";
}

/// Mask applied to device-list queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFilter {
    /// Only return ContentDirectory-capable media servers.
    pub media_servers_only: bool,
    /// Include devices that were seen earlier but no longer answer.
    pub include_offline: bool,
}

/// Connection-level notifications emitted by a [`ControlPoint`].
///
/// Events are delivered on whatever thread the underlying notification
/// arrives on; consumers drain them through an mpsc channel.
pub enum LinkEvent {
    /// The bind completed and queries can be issued through the handle.
    Connected(Arc<dyn ContentDirectory>),
    /// The service went away, either on request or unsolicited.
    Disconnected,
    /// The set of known devices changed; re-query if interested.
    DeviceListChanged,
    /// A previously queried container (or one of its children) changed.
    ObjectChanged { udn: String, object_id: String },
    /// A transport-level failure outside any one query.
    Error(TransportError),
}

impl std::fmt::Debug for LinkEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkEvent::Connected(_) => write!(f, "Connected"),
            LinkEvent::Disconnected => write!(f, "Disconnected"),
            LinkEvent::DeviceListChanged => write!(f, "DeviceListChanged"),
            LinkEvent::ObjectChanged { udn, object_id } => {
                write!(f, "ObjectChanged {{ udn: {udn}, object_id: {object_id} }}")
            }
            LinkEvent::Error(e) => write!(f, "Error({e})"),
        }
    }
}

/// Query surface of a remote content-directory service.
///
/// `browse` and `list_devices` are blocking round-trips; both return flat
/// [`Row`]s whose interpretation is left entirely to the caller.
pub trait ContentDirectory: Send + Sync {
    /// Fetch the child rows of `container_id` on the server identified by
    /// `udn`, projecting the named columns.
    fn browse(&self, udn: &str, container_id: &str, columns: &[&str]) -> Result<Vec<Row>>;

    /// Current device table, masked by `filter`.
    fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<Row>>;

    /// Register interest in change notifications for one container.
    fn subscribe(&self, udn: &str, container_id: &str) -> Result<()>;
}

/// Lifecycle surface of the remote service connection.
pub trait ControlPoint: Send {
    /// Start the service link. Blocks for the initial discovery sweep and
    /// returns a query handle on success. The sender is retained for
    /// asynchronous [`LinkEvent`]s (disconnects, change notifications).
    fn bind(
        &mut self,
        options: &StartOptions,
        events: Sender<LinkEvent>,
    ) -> Result<Arc<dyn ContentDirectory>>;

    /// Request teardown. Does not block for confirmation: the
    /// [`LinkEvent::Disconnected`] event reports the actual outcome.
    fn shutdown(&mut self);
}
