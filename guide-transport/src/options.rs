//! Startup configuration for the service link

use std::time::Duration;

/// Options applied when binding the control point.
///
/// Defaults follow the reference client configuration: eight concurrent
/// SOAP requests, browse pages of 50 and a two second discovery sweep. The
/// per-query timeouts have no counterpart in the reference client, which
/// could hang indefinitely on a dead server; here every round-trip is
/// bounded.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Local socket address to bind the discovery socket to
    /// (e.g. `192.168.0.10:0` to pin one interface). `None` lets the OS pick.
    pub bind_address: Option<String>,

    /// Hide devices that were seen earlier but no longer answer.
    /// Default: true
    pub mask_offline_devices: bool,

    /// Maximum concurrent outstanding queries against one server.
    /// Default: 8
    pub max_concurrent_queries: usize,

    /// Row count requested on the first browse page.
    /// Default: 50
    pub initial_page_size: u32,

    /// Row count requested on follow-up pages.
    /// Default: 50
    pub max_page_size: u32,

    /// Duration of the initial SSDP discovery sweep.
    /// Default: 2 seconds
    pub discovery_sweep: Duration,

    /// TCP connect timeout per query.
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Read timeout per query.
    /// Default: 10 seconds
    pub read_timeout: Duration,

    /// Callback URL handed to the server on `SUBSCRIBE`, where NOTIFY
    /// requests should be delivered. `None` disables subscriptions.
    pub event_callback_url: Option<String>,

    /// Requested subscription lifetime in seconds.
    /// Default: 1800
    pub subscription_timeout_secs: u32,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            bind_address: None,
            mask_offline_devices: true,
            max_concurrent_queries: 8,
            initial_page_size: 50,
            max_page_size: 50,
            discovery_sweep: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            event_callback_url: None,
            subscription_timeout_secs: 1800,
        }
    }
}
