//! Channel Dump Example
//!
//! Connects to the first media server found on the network, waits for its
//! directory to come up, and prints the channel list with whatever is
//! airing right now.
//!
//! Run with: `cargo run -p guide-sdk --example channel_dump`

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use guide_sdk::{
    CancelToken, ConnectionError, ConnectionObserver, GuideSystem, PollOptions, StartOptions,
};

struct ConnectSignal(mpsc::Sender<Result<(), String>>);

impl ConnectionObserver for ConnectSignal {
    fn on_connected(&self) {
        let _ = self.0.send(Ok(()));
    }
    fn on_disconnected(&self) {
        println!("Service disconnected.");
    }
    fn on_error(&self, error: &ConnectionError) {
        let _ = self.0.send(Err(error.to_string()));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    guide_sdk::logging::init_logging_from_env()?;

    println!("Starting service connection...");
    let system = GuideSystem::new(StartOptions::default());

    let (tx, rx) = mpsc::channel();
    system.start_connection(Some(Arc::new(ConnectSignal(tx))))?;
    rx.recv_timeout(Duration::from_secs(30))?
        .map_err(|e| format!("connection failed: {e}"))?;

    let servers = system.list_devices(false);
    if servers.is_empty() {
        println!("No media servers found.");
        return Ok(());
    }
    for server in &servers {
        println!("Found server: {} ({})", server.friendly_name, server.udn);
    }
    let udn = &servers[0].udn;

    // Cancel the startup poll on Ctrl-C instead of hanging forever.
    let cancel = CancelToken::new();
    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || ctrlc_cancel.cancel())?;

    println!("Waiting for {udn} to serve content...");
    system.wait_for_content(udn, &PollOptions::default(), &cancel)?;

    let channels = system.browse_channels(udn);
    println!("{} channel(s):", channels.len());
    for channel in &channels {
        let airing = system
            .current_program(udn, channel)
            .map(|p| p.core.title)
            .unwrap_or_else(|| "(nothing scheduled)".to_string());
        println!(
            "  {:>4}  {:<12}  {}",
            channel.channel_number.map_or(String::new(), |n| n.to_string()),
            channel.call_sign,
            airing
        );
    }

    system.stop_connection()?;
    Ok(())
}
