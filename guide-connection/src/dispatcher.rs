//! Link-event drain: state transitions, device refresh, hub forwarding

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use guide_model::{decode, DirectoryClass, Record};
use guide_notify::{ChangeHub, ResourceKey};
use guide_transport::{ContentDirectory, DeviceFilter, LinkEvent, TransportError};

use crate::error::ConnectionError;
use crate::manager::{ConnectionState, Shared};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns the thread that turns link events into state.
///
/// This is the single writer for the connection state, the transport handle
/// and the device table; everything the manager exposes synchronously is a
/// snapshot of what this thread last wrote.
pub(crate) fn spawn_event_dispatcher(
    shared: Arc<Shared>,
    hub: Arc<ChangeHub>,
    link_rx: Receiver<LinkEvent>,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let event = match link_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            handle_event(&shared, &hub, event);
        }
        tracing::debug!("Event dispatcher shut down");
    })
}

fn handle_event(shared: &Shared, hub: &ChangeHub, event: LinkEvent) {
    match event {
        LinkEvent::Connected(transport) => {
            tracing::info!("Service connected");
            shared.set_transport(Some(Arc::clone(&transport)));
            shared.set_state(ConnectionState::Connected);
            shared.for_each_observer(|o| o.on_connected());

            // One device refresh per connect, so the cache is usable before
            // any change notification arrives.
            match refresh_devices(shared, transport.as_ref()) {
                Ok(()) => hub.notify(ResourceKey::DeviceList),
                Err(e) => {
                    tracing::error!("Device refresh after connect failed: {e}");
                    let error = ConnectionError::Transport(e);
                    shared.for_each_observer(|o| o.on_error(&error));
                }
            }
        }
        LinkEvent::Disconnected => {
            if shared.state() == ConnectionState::Stopped {
                return;
            }
            tracing::info!("Service disconnected");
            shared.set_transport(None);
            shared.set_state(ConnectionState::Disconnected);
            shared.for_each_observer(|o| o.on_disconnected());
        }
        LinkEvent::DeviceListChanged => {
            if let Some(transport) = shared.transport() {
                if let Err(e) = refresh_devices(shared, transport.as_ref()) {
                    tracing::warn!("Device refresh failed: {e}");
                }
            }
            hub.notify(ResourceKey::DeviceList);
        }
        LinkEvent::ObjectChanged { udn, object_id } => {
            hub.notify(ResourceKey::Object { udn, object_id });
        }
        LinkEvent::Error(e) => {
            tracing::error!("Link error: {e}");
            // A failed bind leaves the machine where start() found it.
            if shared.state() == ConnectionState::Starting {
                shared.set_state(ConnectionState::Stopped);
            }
            let error = ConnectionError::from_bind_failure(e);
            shared.for_each_observer(|o| o.on_error(&error));
        }
    }
}

/// Query the device list with the configured mask and replace the cache.
fn refresh_devices(
    shared: &Shared,
    transport: &dyn ContentDirectory,
) -> Result<(), TransportError> {
    let filter = DeviceFilter {
        media_servers_only: false,
        include_offline: !shared.options.mask_offline_devices,
    };
    let rows = transport.list_devices(&filter)?;
    let devices = rows
        .iter()
        .filter_map(|row| match decode(DirectoryClass::MediaServer, row) {
            Record::Device(device) => Some(device),
            Record::Object(_) => None,
        })
        .collect::<Vec<_>>();
    tracing::debug!("Device table refreshed, {} device(s)", devices.len());
    shared.set_devices(devices);
    Ok(())
}
