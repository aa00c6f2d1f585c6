//! Connection lifecycle management
//!
//! [`ConnectionManager`] owns the link to the remote content-directory
//! service: it drives the `Stopped → Starting → Connected ⇄ Disconnected`
//! state machine, caches the device table, and fans lifecycle notifications
//! out to registered observers.
//!
//! All mutation is serialized behind two background threads: a worker that
//! owns the control point (the only code that ever touches it) and a
//! dispatcher that drains link events into state transitions, observer
//! callbacks and change-hub notifications. `is_connected()` and
//! `list_devices()` read consistent snapshots at any time, in any state.

mod dispatcher;
mod error;
mod manager;
mod worker;

pub use error::{ConnectionError, Result};
pub use manager::{ConnectionManager, ConnectionObserver, ConnectionState};
