//! Background thread owning the control point

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use guide_transport::{ControlPoint, LinkEvent, StartOptions};

/// Commands sent from the sync [`ConnectionManager`](crate::ConnectionManager)
/// to the link worker.
#[derive(Debug)]
pub(crate) enum Command {
    /// Bind the control point. The outcome comes back as a link event.
    Start,
    /// Request teardown of the current link.
    Stop,
    /// Exit the worker.
    Shutdown,
}

/// Spawns the thread that owns the control point.
///
/// Nothing else ever touches the control point, so every bind and shutdown
/// is naturally serialized. `bind` blocks for the discovery sweep; commands
/// queued meanwhile are handled afterwards in order.
pub(crate) fn spawn_link_worker(
    mut control_point: Box<dyn ControlPoint>,
    options: StartOptions,
    command_rx: Receiver<Command>,
    link_tx: Sender<LinkEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::debug!("Link worker started");
        while let Ok(command) = command_rx.recv() {
            match command {
                Command::Start => {
                    tracing::info!("Binding to content-directory service");
                    let event = match control_point.bind(&options, link_tx.clone()) {
                        Ok(handle) => LinkEvent::Connected(handle),
                        Err(e) => {
                            tracing::error!("Bind failed: {e}");
                            LinkEvent::Error(e)
                        }
                    };
                    if link_tx.send(event).is_err() {
                        break;
                    }
                }
                Command::Stop => {
                    tracing::info!("Requesting service shutdown");
                    control_point.shutdown();
                }
                Command::Shutdown => {
                    control_point.shutdown();
                    break;
                }
            }
        }
        tracing::debug!("Link worker shut down");
    })
}
