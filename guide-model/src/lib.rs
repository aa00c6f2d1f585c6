//! Record model for content-directory rows
//!
//! Every row a server returns is a flat bag of named columns plus a
//! discriminator string (`upnp:class` for objects, the device-type URN for
//! device rows). This crate turns those rows into typed records:
//!
//! - [`ClassRegistry`] resolves a discriminator to a [`DirectoryClass`] by
//!   longest prefix match, and can be extended without touching any
//!   dispatch site.
//! - [`columns_for`] gives the ordered column projection to request for a
//!   class.
//! - [`decode`] populates a [`Record`] from a row; missing columns become
//!   empty or zero values, never row failures.
//!
//! Records are immutable snapshots: they carry no link back to the server
//! and are rebuilt fresh on every query.

mod columns;
mod decode;
mod error;
mod records;
mod registry;

pub use columns::{columns_for, names};
pub use decode::decode;
pub use error::{ModelError, Result};
pub use records::{
    Channel, DeviceRecord, DirectoryObject, Folder, ObjectCore, PlayableItem, Program, Record,
};
pub use registry::{ClassRegistry, DirectoryClass};
