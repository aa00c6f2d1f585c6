//! Discriminator-to-class registry

use crate::error::{ModelError, Result};

/// The concrete record variants a row can decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryClass {
    /// A directory node with children.
    Container,
    /// A broadcast channel.
    VideoBroadcast,
    /// One scheduled EPG program.
    VideoProgram,
    /// An on-demand playable item.
    VideoItem,
    /// A content-directory server device row.
    MediaServer,
}

/// Maps discriminator strings to [`DirectoryClass`] by longest prefix match.
///
/// UPnP class strings are dotted hierarchies
/// (`object.item.videoItem.videoBroadcast` is a refinement of
/// `object.item.videoItem`), so a server that reports a vendor refinement of
/// a known class still resolves to the right variant. New mappings are added
/// with [`register`](Self::register); no dispatch site needs to change.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    entries: Vec<(String, DirectoryClass)>,
}

impl ClassRegistry {
    /// An empty registry. Useful for tests; production code wants
    /// [`ClassRegistry::default`].
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Map every discriminator starting with `prefix` to `class`.
    ///
    /// A longer prefix always wins over a shorter one, so refinements can be
    /// registered in any order.
    pub fn register(&mut self, prefix: impl Into<String>, class: DirectoryClass) {
        self.entries.push((prefix.into(), class));
    }

    /// Resolve a discriminator string to its registered class.
    pub fn resolve(&self, discriminator: &str) -> Result<DirectoryClass> {
        self.entries
            .iter()
            .filter(|(prefix, _)| discriminator.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, class)| *class)
            .ok_or_else(|| ModelError::UnknownVariant(discriminator.to_string()))
    }
}

impl Default for ClassRegistry {
    /// The standard UPnP class strings plus the device-type URN prefix used
    /// for device rows.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("object.container", DirectoryClass::Container);
        registry.register("object.item.videoItem", DirectoryClass::VideoItem);
        registry.register(
            "object.item.videoItem.videoBroadcast",
            DirectoryClass::VideoBroadcast,
        );
        registry.register(
            "object.item.epgItem.videoProgram",
            DirectoryClass::VideoProgram,
        );
        registry.register("urn:schemas-upnp-org:device:", DirectoryClass::MediaServer);
        registry
    }
}
