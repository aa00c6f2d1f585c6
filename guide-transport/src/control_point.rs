//! Production control point: SSDP sweep + SOAP directory

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::description::{resolve_url, DeviceDescription};
use crate::error::Result;
use crate::options::StartOptions;
use crate::row::Row;
use crate::soap::{normalize_udn, ServerEndpoint, SoapDirectory};
use crate::{device_keys, ssdp, ContentDirectory, ControlPoint, LinkEvent};

/// Binds to the local network by sweeping for media servers, then serves
/// queries through a [`SoapDirectory`] built from the discovered endpoints.
///
/// `bind` blocks for the discovery sweep. A sweep that finds nothing is
/// still a successful bind: the device table is simply empty until a later
/// refresh sees servers.
#[derive(Default)]
pub struct UpnpControlPoint {
    directory: Option<Arc<SoapDirectory>>,
    events: Option<Sender<LinkEvent>>,
}

impl UpnpControlPoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlPoint for UpnpControlPoint {
    fn bind(
        &mut self,
        options: &StartOptions,
        events: Sender<LinkEvent>,
    ) -> Result<Arc<dyn ContentDirectory>> {
        let responses = ssdp::sweep(options.bind_address.as_deref(), options.discovery_sweep)?;
        tracing::debug!("SSDP sweep finished, {} response(s)", responses.len());

        let fetch_agent = ureq::AgentBuilder::new()
            .timeout_connect(options.connect_timeout)
            .timeout_read(options.read_timeout)
            .build();

        let mut servers = HashMap::new();
        for response in responses {
            match fetch_description(&fetch_agent, &response.location) {
                Ok(description) => {
                    let Some(endpoint) = endpoint_for(&description, &response.location) else {
                        tracing::debug!(
                            location = %response.location,
                            "Device has no ContentDirectory service, skipping"
                        );
                        continue;
                    };
                    let udn = normalize_udn(&description.udn).to_string();
                    tracing::info!(udn = %udn, name = %description.friendly_name, "Found media server");
                    servers.insert(udn, endpoint);
                }
                Err(e) => {
                    tracing::warn!(location = %response.location, "Skipping device: {e}");
                }
            }
        }
        if servers.is_empty() {
            tracing::warn!("No ContentDirectory servers found during sweep");
        }

        let directory = Arc::new(SoapDirectory::new(options));
        directory.set_servers(servers);
        self.directory = Some(Arc::clone(&directory));
        self.events = Some(events);
        Ok(directory)
    }

    fn shutdown(&mut self) {
        self.directory = None;
        if let Some(events) = self.events.take() {
            // Teardown is local; report the disconnect through the normal path.
            let _ = events.send(LinkEvent::Disconnected);
        }
    }
}

fn fetch_description(agent: &ureq::Agent, location: &str) -> Result<DeviceDescription> {
    let xml = agent
        .get(location)
        .call()
        .map_err(|e| crate::TransportError::Network(e.to_string()))?
        .into_string()
        .map_err(|e| crate::TransportError::Network(e.to_string()))?;
    DeviceDescription::from_xml(&xml)
}

fn endpoint_for(description: &DeviceDescription, location: &str) -> Option<ServerEndpoint> {
    let service = description.content_directory()?;
    let row = Row::new()
        .with(device_keys::UDN, normalize_udn(&description.udn))
        .with(device_keys::FRIENDLY_NAME, description.friendly_name.clone())
        .with(device_keys::DEVICE_TYPE, description.device_type.clone())
        .with(device_keys::ONLINE, "1");
    Some(ServerEndpoint {
        control_url: resolve_url(location, &service.control_url),
        event_url: resolve_url(location, &service.event_sub_url),
        row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_builds_device_row() {
        let xml = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>Den Server</friendlyName>
    <UDN>uuid:abc-123</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType>
        <controlURL>/ctl/ContentDir</controlURL>
        <eventSubURL>/evt/ContentDir</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#;
        let description = DeviceDescription::from_xml(xml).unwrap();
        let endpoint = endpoint_for(&description, "http://10.0.0.2:8200/rootDesc.xml").unwrap();

        assert_eq!(endpoint.control_url, "http://10.0.0.2:8200/ctl/ContentDir");
        assert_eq!(endpoint.row.get(device_keys::UDN), Some("abc-123"));
        assert_eq!(endpoint.row.get(device_keys::FRIENDLY_NAME), Some("Den Server"));
        assert_eq!(endpoint.row.get(device_keys::ONLINE), Some("1"));
    }

    #[test]
    fn test_shutdown_emits_disconnected() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut control_point = UpnpControlPoint::new();
        control_point.events = Some(tx);
        control_point.shutdown();
        assert!(matches!(rx.try_recv(), Ok(LinkEvent::Disconnected)));
    }
}
