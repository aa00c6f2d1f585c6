//! SSDP sweep for ContentDirectory-capable media servers
//!
//! Internal discovery plumbing: sends one M-SEARCH for `MediaServer:1`
//! devices and collects unicast responses for the duration of the sweep.

use std::collections::HashSet;
use std::net::UdpSocket;
use std::time::Duration;

use crate::error::{Result, TransportError};

const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";
const MEDIA_SERVER_TARGET: &str = "urn:schemas-upnp-org:device:MediaServer:1";

/// One parsed M-SEARCH response.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SsdpResponse {
    pub location: String,
    pub search_target: String,
    pub usn: String,
}

/// Run one discovery sweep and return deduplicated responses.
///
/// Blocks for roughly `sweep` while responses trickle in. Binding errors are
/// reported as [`TransportError::Io`]; a quiet network simply yields an
/// empty list.
pub(crate) fn sweep(bind_addr: Option<&str>, sweep: Duration) -> Result<Vec<SsdpResponse>> {
    let socket = UdpSocket::bind(bind_addr.unwrap_or("0.0.0.0:0"))
        .map_err(|e| TransportError::Io(format!("Failed to bind SSDP socket: {e}")))?;
    socket
        .set_read_timeout(Some(sweep))
        .map_err(|e| TransportError::Io(format!("Failed to set read timeout: {e}")))?;

    let mx = sweep.as_secs().max(1);
    let request = format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {MEDIA_SERVER_TARGET}\r\n\
         USER-AGENT: guide-sdk/0.1 UPnP/1.0\r\n\
         \r\n"
    );
    socket
        .send_to(request.as_bytes(), SSDP_MULTICAST_ADDR)
        .map_err(|e| TransportError::Io(format!("Failed to send M-SEARCH: {e}")))?;

    let mut responses = Vec::new();
    let mut seen_locations = HashSet::new();
    let mut buffer = [0u8; 2048];
    loop {
        match socket.recv_from(&mut buffer) {
            Ok((size, _)) => {
                let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
                    continue;
                };
                if let Some(response) = parse_response(text) {
                    if seen_locations.insert(response.location.clone()) {
                        responses.push(response);
                    }
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => {
                tracing::warn!("SSDP receive error, ending sweep: {e}");
                break;
            }
        }
    }
    Ok(responses)
}

/// Parse one SSDP response from its HTTP-style header block.
fn parse_response(text: &str) -> Option<SsdpResponse> {
    let mut location = None;
    let mut search_target = None;
    let mut usn = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = header_value(line, "LOCATION:") {
            location = Some(value);
        } else if let Some(value) = header_value(line, "ST:") {
            search_target = Some(value);
        } else if let Some(value) = header_value(line, "USN:") {
            usn = Some(value);
        }
    }

    Some(SsdpResponse {
        location: location?,
        search_target: search_target?,
        usn: usn?,
    })
}

/// Extract the value from a `Header: value` line, case-insensitively.
fn header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len() && line[..header.len()].eq_ignore_ascii_case(header) {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}
