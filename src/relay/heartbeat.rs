use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info};

use super::Relay;

/// Pings every connection on a fixed interval. Only a failed write removes a
/// connection; silence alone never does.
pub fn spawn(relay: Relay, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let reaped = relay.heartbeat().await;
            if reaped > 0 {
                info!(reaped, "heartbeat reaped dead connections");
            } else {
                debug!("heartbeat");
            }
        }
    })
}
