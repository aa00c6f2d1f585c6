//! Lenient row-to-record decoding
//!
//! Servers differ in which optional columns they fill, and a malformed
//! value in one column should not void the row. Decoding therefore never
//! fails: absent or unparseable values fall back to empty strings, `None`,
//! or the epoch. Which class to decode as is the registry's decision, made
//! before this module is called.

use chrono::NaiveDateTime;
use guide_transport::{device_keys, Row};

use crate::columns::names;
use crate::records::{
    Channel, DeviceRecord, DirectoryObject, Folder, ObjectCore, PlayableItem, Program, Record,
};
use crate::registry::DirectoryClass;

/// Decode one row as the given class.
pub fn decode(class: DirectoryClass, row: &Row) -> Record {
    match class {
        DirectoryClass::Container => {
            Record::Object(DirectoryObject::Folder(Folder { core: core(row) }))
        }
        DirectoryClass::VideoBroadcast => Record::Object(DirectoryObject::Channel(Channel {
            core: core(row),
            channel_number: row.get(names::CHANNEL_NR).and_then(|v| v.parse().ok()),
            channel_id: text(row, names::CHANNEL_ID),
            call_sign: text(row, names::CALL_SIGN),
        })),
        DirectoryClass::VideoProgram => Record::Object(DirectoryObject::Program(Program {
            core: core(row),
            start: schedule_time(row, names::SCHEDULED_START),
            end: schedule_time(row, names::SCHEDULED_END),
            description: text(row, names::DESCRIPTION),
            genre: text(row, names::GENRE),
            rating: text(row, names::RATING),
        })),
        DirectoryClass::VideoItem => Record::Object(DirectoryObject::Item(PlayableItem {
            core: core(row),
            resource: text(row, names::RESOURCE),
            protocol_info: text(row, names::PROTOCOL_INFO),
        })),
        DirectoryClass::MediaServer => Record::Device(DeviceRecord {
            udn: text(row, device_keys::UDN),
            friendly_name: text(row, device_keys::FRIENDLY_NAME),
            device_type: text(row, device_keys::DEVICE_TYPE),
            online: matches!(row.get(device_keys::ONLINE), Some("1") | Some("true")),
        }),
    }
}

fn core(row: &Row) -> ObjectCore {
    ObjectCore {
        id: text(row, names::ID),
        parent_id: text(row, names::PARENT_ID),
        title: text(row, names::TITLE),
        class: text(row, names::CLASS),
        icon_uri: row
            .get(names::ICON)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    }
}

fn text(row: &Row, name: &str) -> String {
    row.get(name).unwrap_or_default().to_string()
}

/// Scheduled times arrive as ISO-8601, with or without fractional seconds
/// or a zone suffix. A zoned value is read as the server's wall clock; no
/// conversion is applied. Anything unparseable reads as the epoch, which
/// matches no realistic query window.
fn schedule_time(row: &Row, name: &str) -> NaiveDateTime {
    row.get(name)
        .and_then(parse_schedule_time)
        .unwrap_or_default()
}

fn parse_schedule_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(zoned) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(zoned.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    None
}
