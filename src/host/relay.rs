//! Forward values between streams by name.
//!
//! A relay route drains whatever a source stream has delivered and queues it
//! for the named target. Lets a pure network host pipe one component's
//! output into another without a computation in between.

use std::time::Duration;

use tokio::sync::broadcast;

use super::table::HostHandle;
use crate::config::RelayRoute;

/// Move buffered values along every route once. Returns values moved.
pub fn relay_once(host: &HostHandle, routes: &[RelayRoute]) -> usize {
    let mut moved = 0;
    for route in routes {
        let values = host.take_data(&route.from);
        if values.is_empty() {
            continue;
        }
        let destination = host.add_data(&route.to, &values);
        tracing::trace!(
            from = %route.from,
            to = %route.to,
            values = values.len(),
            destination = ?destination,
            "Relayed"
        );
        moved += values.len();
    }
    moved
}

/// Run `relay_once` every `interval` until shutdown.
pub async fn run_relay(
    host: HostHandle,
    routes: Vec<RelayRoute>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tracing::info!(routes = routes.len(), "Relay started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                relay_once(&host, &routes);
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    tracing::info!("Relay stopped");
}
