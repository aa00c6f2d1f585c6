//! Change-notification fan-out
//!
//! The remote service reports "something changed" events for the device
//! list and for individual directory containers. [`ChangeHub`] is the
//! registry that routes those events to interested consumers: registration
//! is pure bookkeeping, dispatch happens on a dedicated thread, and the
//! callback carries no payload beyond the changed resource's key. A
//! consumer that cares re-queries.

mod hub;

pub use hub::{ChangeHub, ChangeObserver, ResourceKey};
