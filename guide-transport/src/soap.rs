//! Blocking SOAP client for the ContentDirectory service
//!
//! One action shape matters here: `Browse`. Requests are paged with the
//! configured page sizes and the DIDL-Lite payload of each page is
//! flattened into rows. Subscriptions use the UPnP SUBSCRIBE verb against
//! the service's event endpoint.

use std::collections::HashMap;
use std::sync::RwLock;

use xmltree::Element;

use crate::didl::parse_didl;
use crate::error::{Result, TransportError};
use crate::options::StartOptions;
use crate::row::Row;
use crate::{device_keys, ContentDirectory, DeviceFilter};

const SERVICE_TYPE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// Where one discovered server can be reached.
#[derive(Debug, Clone)]
pub(crate) struct ServerEndpoint {
    pub control_url: String,
    pub event_url: String,
    /// Device row served back by `list_devices`.
    pub row: Row,
}

/// ContentDirectory implementation speaking SOAP over HTTP.
///
/// Holds the endpoint table produced by the discovery sweep. The table is
/// replaced wholesale on refresh so readers always observe a consistent
/// snapshot.
pub struct SoapDirectory {
    agent: ureq::Agent,
    servers: RwLock<HashMap<String, ServerEndpoint>>,
    callback_url: Option<String>,
    subscription_timeout_secs: u32,
    initial_page_size: u32,
    max_page_size: u32,
}

impl SoapDirectory {
    pub(crate) fn new(options: &StartOptions) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(options.connect_timeout)
                .timeout_read(options.read_timeout)
                .build(),
            servers: RwLock::new(HashMap::new()),
            callback_url: options.event_callback_url.clone(),
            subscription_timeout_secs: options.subscription_timeout_secs,
            initial_page_size: options.initial_page_size.max(1),
            max_page_size: options.max_page_size.max(1),
        }
    }

    pub(crate) fn set_servers(&self, servers: HashMap<String, ServerEndpoint>) {
        if let Ok(mut table) = self.servers.write() {
            *table = servers;
        }
    }

    fn endpoint(&self, udn: &str) -> Result<ServerEndpoint> {
        let key = normalize_udn(udn);
        self.servers
            .read()
            .map_err(|_| TransportError::Io("endpoint table lock poisoned".into()))?
            .get(key)
            .cloned()
            .ok_or_else(|| TransportError::ServiceUnavailable(format!("unknown server {udn}")))
    }

    /// Issue one SOAP call and return the `<{action}Response>` element.
    fn call(&self, control_url: &str, action: &str, payload: &str) -> Result<Element> {
        let body = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
                <s:Body>
                    <u:{action} xmlns:u="{SERVICE_TYPE}">
                        {payload}
                    </u:{action}>
                </s:Body>
            </s:Envelope>"#
        );
        let soap_action = format!("\"{SERVICE_TYPE}#{action}\"");

        let request = self
            .agent
            .post(control_url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action);

        // UPnP servers report faults with HTTP 500 and a fault body, so a
        // status error still carries a parseable response.
        let response = match request.send_string(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(TransportError::Network(e.to_string())),
        };
        let xml_text = response
            .into_string()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| TransportError::Parse(e.to_string()))?;
        extract_response(&xml, action)
    }

    /// Fetch one page of browse results.
    fn browse_page(
        &self,
        control_url: &str,
        container_id: &str,
        columns: &[&str],
        starting_index: u32,
        requested_count: u32,
    ) -> Result<(Vec<Row>, u32, u32)> {
        let payload = format!(
            "<ObjectID>{}</ObjectID>\
             <BrowseFlag>BrowseDirectChildren</BrowseFlag>\
             <Filter>{}</Filter>\
             <StartingIndex>{starting_index}</StartingIndex>\
             <RequestedCount>{requested_count}</RequestedCount>\
             <SortCriteria></SortCriteria>",
            xml_escape(container_id),
            xml_escape(&columns.join(",")),
        );
        let response = self.call(control_url, "Browse", &payload)?;

        let result = child_text(&response, "Result")
            .ok_or_else(|| TransportError::Parse("Missing Result element".into()))?;
        let rows = parse_didl(&result)?;
        let number_returned = child_u32(&response, "NumberReturned").unwrap_or(rows.len() as u32);
        let total_matches = child_u32(&response, "TotalMatches").unwrap_or(0);
        Ok((rows, number_returned, total_matches))
    }
}

impl ContentDirectory for SoapDirectory {
    fn browse(&self, udn: &str, container_id: &str, columns: &[&str]) -> Result<Vec<Row>> {
        let endpoint = self.endpoint(udn)?;
        let mut rows = Vec::new();
        let mut starting_index = 0u32;
        let mut requested = self.initial_page_size;
        loop {
            let (page, returned, total) = self.browse_page(
                &endpoint.control_url,
                container_id,
                columns,
                starting_index,
                requested,
            )?;
            rows.extend(page);
            if returned == 0 {
                break;
            }
            starting_index += returned;
            if total > 0 && starting_index >= total {
                break;
            }
            requested = self.max_page_size;
        }
        Ok(rows)
    }

    fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<Row>> {
        let table = self
            .servers
            .read()
            .map_err(|_| TransportError::Io("endpoint table lock poisoned".into()))?;
        let mut rows: Vec<Row> = table
            .values()
            .map(|e| e.row.clone())
            .filter(|row| {
                if filter.media_servers_only
                    && !row
                        .get(device_keys::DEVICE_TYPE)
                        .is_some_and(|t| t.contains(":MediaServer:"))
                {
                    return false;
                }
                if !filter.include_offline && row.get(device_keys::ONLINE) == Some("0") {
                    return false;
                }
                true
            })
            .collect();
        // Deterministic order regardless of map iteration.
        rows.sort_by(|a, b| a.get(device_keys::UDN).cmp(&b.get(device_keys::UDN)));
        Ok(rows)
    }

    fn subscribe(&self, udn: &str, container_id: &str) -> Result<()> {
        let endpoint = self.endpoint(udn)?;
        let Some(callback_url) = &self.callback_url else {
            tracing::debug!(udn, container_id, "No event callback configured, skipping SUBSCRIBE");
            return Ok(());
        };
        let response = self
            .agent
            .request("SUBSCRIBE", &endpoint.event_url)
            .set("CALLBACK", &format!("<{callback_url}>"))
            .set("NT", "upnp:event")
            .set("TIMEOUT", &format!("Second-{}", self.subscription_timeout_secs))
            .call()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if response.status() != 200 {
            return Err(TransportError::Network(format!(
                "SUBSCRIBE failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Extract the action response from a SOAP envelope, surfacing faults.
fn extract_response(xml: &Element, action: &str) -> Result<Element> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| TransportError::Parse("Missing SOAP Body".into()))?;

    if let Some(fault) = body.get_child("Fault") {
        let error_code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError"))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.parse::<u16>().ok())
            .unwrap_or(500);
        return Err(TransportError::Fault(error_code));
    }

    let response_name = format!("{action}Response");
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| TransportError::Parse(format!("Missing {response_name} element")))
}

fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.into_owned())
}

fn child_u32(element: &Element, name: &str) -> Option<u32> {
    child_text(element, name).and_then(|t| t.trim().parse().ok())
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub(crate) fn normalize_udn(udn: &str) -> &str {
    udn.strip_prefix("uuid:").unwrap_or(udn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_browse_response() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <u:BrowseResponse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
                        <Result>&lt;DIDL-Lite/&gt;</Result>
                        <NumberReturned>0</NumberReturned>
                        <TotalMatches>0</TotalMatches>
                    </u:BrowseResponse>
                </s:Body>
            </s:Envelope>
        "#;
        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        let response = extract_response(&xml, "Browse").unwrap();
        assert_eq!(response.name, "BrowseResponse");
        assert_eq!(child_u32(&response, "NumberReturned"), Some(0));
    }

    #[test]
    fn test_extract_response_surfaces_fault_code() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <s:Fault>
                        <faultcode>s:Client</faultcode>
                        <faultstring>UPnPError</faultstring>
                        <detail>
                            <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                                <errorCode>701</errorCode>
                                <errorDescription>No such object</errorDescription>
                            </UPnPError>
                        </detail>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;
        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "Browse") {
            Err(TransportError::Fault(code)) => assert_eq!(code, 701),
            other => panic!("Expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_response_missing_body() {
        let xml_str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"/>"#;
        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        assert!(matches!(
            extract_response(&xml, "Browse"),
            Err(TransportError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_server_is_service_unavailable() {
        let directory = SoapDirectory::new(&StartOptions::default());
        let result = directory.browse("uuid:nope", "0", &["@id"]);
        assert!(matches!(result, Err(TransportError::ServiceUnavailable(_))));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_normalize_udn() {
        assert_eq!(normalize_udn("uuid:abc-123"), "abc-123");
        assert_eq!(normalize_udn("abc-123"), "abc-123");
    }

    #[test]
    fn test_list_devices_masks() {
        let directory = SoapDirectory::new(&StartOptions::default());
        let mut servers = HashMap::new();
        servers.insert(
            "server-a".to_string(),
            ServerEndpoint {
                control_url: "http://a/ctl".into(),
                event_url: "http://a/evt".into(),
                row: Row::new()
                    .with(device_keys::UDN, "server-a")
                    .with(device_keys::DEVICE_TYPE, "urn:schemas-upnp-org:device:MediaServer:1")
                    .with(device_keys::ONLINE, "1"),
            },
        );
        servers.insert(
            "tv-b".to_string(),
            ServerEndpoint {
                control_url: "http://b/ctl".into(),
                event_url: "http://b/evt".into(),
                row: Row::new()
                    .with(device_keys::UDN, "tv-b")
                    .with(device_keys::DEVICE_TYPE, "urn:schemas-upnp-org:device:MediaRenderer:1")
                    .with(device_keys::ONLINE, "0"),
            },
        );
        directory.set_servers(servers);

        let all = directory
            .list_devices(&DeviceFilter {
                media_servers_only: false,
                include_offline: true,
            })
            .unwrap();
        assert_eq!(all.len(), 2);

        let servers_only = directory
            .list_devices(&DeviceFilter {
                media_servers_only: true,
                include_offline: true,
            })
            .unwrap();
        assert_eq!(servers_only.len(), 1);
        assert_eq!(servers_only[0].get(device_keys::UDN), Some("server-a"));

        let online_only = directory
            .list_devices(&DeviceFilter {
                media_servers_only: false,
                include_offline: false,
            })
            .unwrap();
        assert_eq!(online_only.len(), 1);
    }
}
