//! Browse queries and EPG aggregation
//!
//! [`QueryEngine`] runs one hierarchical browse: it asks the record model
//! for the column projection, issues the query through the connection
//! manager's transport handle, and decodes each returned row by its own
//! discriminator. Failures degrade to empty or partial results; callers
//! always get a list back.
//!
//! [`EpgAggregator`] sits on top and synthesizes a guide view: a
//! (channel set, time window) request is decomposed into per-day,
//! per-channel container queries whose results are overlap-filtered and
//! concatenated. [`wait_for_content`] is the startup poll that waits for a
//! server to begin answering.

mod engine;
mod epg;
mod error;
mod poll;

pub use engine::{QueryEngine, ROOT};
pub use epg::{day_tokens, EpgAddressing, EpgAggregator, ReferenceAddressing};
pub use error::{BrowseError, Result};
pub use poll::{wait_for_content, CancelToken, PollOptions};
