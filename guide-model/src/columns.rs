//! Per-class column projections
//!
//! Every browse sends the server the exact columns the requested class
//! needs. The projections are fixed, ordered, and deterministic so a query
//! for a class is byte-identical run to run.

use guide_transport::device_keys;

use crate::registry::DirectoryClass;

/// Column names as they appear on flattened DIDL-Lite rows.
pub mod names {
    pub const ID: &str = "@id";
    pub const PARENT_ID: &str = "@parentID";
    pub const TITLE: &str = "dc:title";
    pub const CLASS: &str = "upnp:class";
    pub const ICON: &str = "upnp:icon";

    pub const CHANNEL_NR: &str = "upnp:channelNr";
    pub const CHANNEL_ID: &str = "upnp:channelID";
    pub const CALL_SIGN: &str = "upnp:callSign";

    pub const SCHEDULED_START: &str = "upnp:scheduledStartTime";
    pub const SCHEDULED_END: &str = "upnp:scheduledEndTime";
    pub const DESCRIPTION: &str = "dc:description";
    pub const GENRE: &str = "upnp:genre";
    pub const RATING: &str = "upnp:rating";

    pub const RESOURCE: &str = "res";
    pub const PROTOCOL_INFO: &str = "res@protocolInfo";
}

const CONTAINER: &[&str] = &[
    names::ID,
    names::PARENT_ID,
    names::TITLE,
    names::CLASS,
    names::ICON,
];

const VIDEO_BROADCAST: &[&str] = &[
    names::ID,
    names::PARENT_ID,
    names::TITLE,
    names::CLASS,
    names::ICON,
    names::CHANNEL_NR,
    names::CHANNEL_ID,
    names::CALL_SIGN,
];

const VIDEO_PROGRAM: &[&str] = &[
    names::ID,
    names::PARENT_ID,
    names::TITLE,
    names::CLASS,
    names::ICON,
    names::SCHEDULED_START,
    names::SCHEDULED_END,
    names::DESCRIPTION,
    names::GENRE,
    names::RATING,
];

const VIDEO_ITEM: &[&str] = &[
    names::ID,
    names::PARENT_ID,
    names::TITLE,
    names::CLASS,
    names::ICON,
    names::RESOURCE,
    names::PROTOCOL_INFO,
];

const MEDIA_SERVER: &[&str] = &[
    device_keys::UDN,
    device_keys::FRIENDLY_NAME,
    device_keys::DEVICE_TYPE,
    device_keys::ONLINE,
];

/// The ordered column projection to request for one class.
pub fn columns_for(class: DirectoryClass) -> &'static [&'static str] {
    match class {
        DirectoryClass::Container => CONTAINER,
        DirectoryClass::VideoBroadcast => VIDEO_BROADCAST,
        DirectoryClass::VideoProgram => VIDEO_PROGRAM,
        DirectoryClass::VideoItem => VIDEO_ITEM,
        DirectoryClass::MediaServer => MEDIA_SERVER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_object_projection_starts_with_core() {
        for class in [
            DirectoryClass::Container,
            DirectoryClass::VideoBroadcast,
            DirectoryClass::VideoProgram,
            DirectoryClass::VideoItem,
        ] {
            let columns = columns_for(class);
            assert_eq!(&columns[..4], &[names::ID, names::PARENT_ID, names::TITLE, names::CLASS]);
        }
    }

    #[test]
    fn test_program_projection_carries_schedule() {
        let columns = columns_for(DirectoryClass::VideoProgram);
        assert!(columns.contains(&names::SCHEDULED_START));
        assert!(columns.contains(&names::SCHEDULED_END));
    }

    #[test]
    fn test_device_projection_uses_device_keys() {
        assert_eq!(
            columns_for(DirectoryClass::MediaServer),
            &["udn", "friendlyName", "deviceType", "online"]
        );
    }
}
