//! Typed records produced from content-directory rows

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fields shared by every directory object.
///
/// An object id is a `/`-delimited path scoped to one server; the pair
/// `(server UDN, id)` is globally unique. The `class` string is the
/// discriminator the row arrived with and never changes after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCore {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub class: String,
    pub icon_uri: Option<String>,
}

/// A directory node that can have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub core: ObjectCore,
}

/// A broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub core: ObjectCore,
    pub channel_number: Option<u32>,
    pub channel_id: String,
    pub call_sign: String,
}

/// One scheduled program in a channel's guide.
///
/// Well-formed rows satisfy `start < end`; the decoder does not reject
/// rows that violate it, the interval simply matches no window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub core: ObjectCore,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
    pub genre: String,
    pub rating: String,
}

/// An on-demand playable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    pub core: ObjectCore,
    pub resource: String,
    pub protocol_info: String,
}

/// A discovered content-directory server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub udn: String,
    pub friendly_name: String,
    pub device_type: String,
    pub online: bool,
}

impl DeviceRecord {
    /// True when the device advertises a MediaServer device type.
    pub fn is_media_server(&self) -> bool {
        self.device_type.contains(":MediaServer:")
    }
}

/// One queryable directory node, tagged by its concrete variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryObject {
    Folder(Folder),
    Channel(Channel),
    Program(Program),
    Item(PlayableItem),
}

impl DirectoryObject {
    /// The shared fields of whichever variant this is.
    pub fn core(&self) -> &ObjectCore {
        match self {
            DirectoryObject::Folder(f) => &f.core,
            DirectoryObject::Channel(c) => &c.core,
            DirectoryObject::Program(p) => &p.core,
            DirectoryObject::Item(i) => &i.core,
        }
    }

    pub fn id(&self) -> &str {
        &self.core().id
    }

    pub fn title(&self) -> &str {
        &self.core().title
    }
}

/// What one decoded row yields: either a device or a directory object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Device(DeviceRecord),
    Object(DirectoryObject),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_media_server() {
        let server = DeviceRecord {
            udn: "abc".into(),
            friendly_name: "Den".into(),
            device_type: "urn:schemas-upnp-org:device:MediaServer:1".into(),
            online: true,
        };
        assert!(server.is_media_server());

        let renderer = DeviceRecord {
            device_type: "urn:schemas-upnp-org:device:MediaRenderer:1".into(),
            ..server
        };
        assert!(!renderer.is_media_server());
    }

    #[test]
    fn test_core_accessor_covers_variants() {
        let core = ObjectCore {
            id: "0/x".into(),
            parent_id: "0".into(),
            title: "x".into(),
            class: "object.container".into(),
            icon_uri: None,
        };
        let object = DirectoryObject::Folder(Folder { core: core.clone() });
        assert_eq!(object.id(), "0/x");
        assert_eq!(object.title(), "x");
        assert_eq!(object.core(), &core);
    }
}
