//! UPnP device-description parsing
//!
//! Fetched from the LOCATION URL of an SSDP response; tells us whether the
//! device is a media server and where its ContentDirectory control and
//! event endpoints live.

use serde::Deserialize;

use crate::error::{Result, TransportError};

const CONTENT_DIRECTORY_SERVICE: &str = "urn:schemas-upnp-org:service:ContentDirectory";

/// Device description root element.
#[derive(Debug, Deserialize)]
pub(crate) struct Root {
    pub device: DeviceDescription,
}

/// The `<device>` element of a UPnP description document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    #[serde(rename = "UDN")]
    pub udn: String,
    #[serde(default)]
    pub service_list: ServiceList,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceList {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceDescription {
    pub service_type: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
    #[serde(rename = "eventSubURL", default)]
    pub event_sub_url: String,
}

impl DeviceDescription {
    /// Parse a description document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| TransportError::Parse(format!("Failed to parse device XML: {e}")))?;
        Ok(root.device)
    }

    /// True when the device advertises itself as a media server.
    pub fn is_media_server(&self) -> bool {
        self.device_type.contains(":MediaServer:")
    }

    /// The ContentDirectory service entry, if the device has one.
    pub fn content_directory(&self) -> Option<&ServiceDescription> {
        self.service_list
            .services
            .iter()
            .find(|s| s.service_type.starts_with(CONTENT_DIRECTORY_SERVICE))
    }
}

/// Resolve a possibly relative service URL against the description URL.
pub(crate) fn resolve_url(location: &str, service_url: &str) -> String {
    if service_url.starts_with("http://") || service_url.starts_with("https://") {
        return service_url.to_string();
    }
    // Keep scheme://host:port from the location, join the path.
    let base = location
        .find("://")
        .and_then(|scheme_end| {
            let host_start = scheme_end + 3;
            location[host_start..]
                .find('/')
                .map(|path_start| &location[..host_start + path_start])
        })
        .unwrap_or(location);
    if service_url.starts_with('/') {
        format!("{base}{service_url}")
    } else {
        format!("{base}/{service_url}")
    }
}
