//! # guide-sdk - content-directory browsing and EPG assembly
//!
//! A sync-first SDK for UPnP/DLNA ContentDirectory servers: manage the
//! service connection, browse the directory hierarchy into typed records,
//! and stitch per-day, per-channel guide containers into one
//! time-window-filtered program list.
//!
//! ```rust,ignore
//! use guide_sdk::{GuideSystem, StartOptions};
//!
//! fn main() -> Result<(), guide_sdk::SdkError> {
//!     guide_sdk::logging::init_logging_from_env()?;
//!
//!     let system = GuideSystem::new(StartOptions::default());
//!     system.start_connection(None)?;
//!
//!     // Once connected (see ConnectionObserver for the callback):
//!     for server in system.list_devices(false) {
//!         let channels = system.browse_channels(&server.udn);
//!         let now = chrono::Local::now().naive_local();
//!         let programs =
//!             system.browse_programs_for(&server.udn, &channels, now, now + chrono::Duration::hours(6));
//!         println!("{} programs in the next six hours", programs.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! guide-sdk        (GuideSystem facade)
//!     ↓
//! guide-browse     (QueryEngine, EpgAggregator, startup poll)
//!     ↓
//! guide-connection (state machine, device cache)   guide-notify (change fan-out)
//!     ↓
//! guide-model      (typed records, class registry, row decoding)
//!     ↓
//! guide-transport  (SSDP, SOAP Browse, DIDL-Lite rows)
//! ```

// Main exports
pub use error::SdkError;
pub use system::GuideSystem;

// Re-export the surface types callers hold
pub use guide_browse::{BrowseError, CancelToken, EpgAddressing, PollOptions, ReferenceAddressing};
pub use guide_connection::{ConnectionError, ConnectionObserver, ConnectionState};
pub use guide_model::{
    Channel, DeviceRecord, DirectoryClass, DirectoryObject, Folder, PlayableItem, Program,
};
pub use guide_notify::{ChangeObserver, ResourceKey};
pub use guide_transport::StartOptions;

// Internal modules
mod error;
mod system;

pub mod logging;
