use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use super::registry::SubscriberRegistry;
use crate::event::RoomEvent;

/// Why a frame could not be handed to a watcher
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("watcher outbound queue is closed")]
    Closed,

    #[error("watcher outbound queue stayed full for {0:?}")]
    Timeout(Duration),
}

/// Outcome of one `deliver` call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub cancelled: usize,
}

/// Fans room events out to the live watchers of that room
///
/// Failed watchers are only cancelled here. Removing them from the registry
/// is left to their own sessions.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    registry: Arc<SubscriberRegistry>,
    send_timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<SubscriberRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Push `event` to every current watcher of its room
    ///
    /// Runs with the registry locked. All sends of one call run together and
    /// each is bounded by the configured timeout, so however many watchers
    /// stall, the lock is held for about one timeout.
    #[instrument(skip(self, event), fields(room_id = %event.room_id, kind = %event.kind()))]
    pub async fn deliver(&self, event: &RoomEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let rooms = self.registry.lock().await;

        if rooms.is_empty_room(&event.room_id) {
            debug!("No watchers for room");
            return report;
        }

        let text = match event.to_wire() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to serialize room event");
                return report;
            }
        };

        let timeout = self.send_timeout;
        let sends = rooms
            .watchers(&event.room_id)
            .filter(|watcher| !watcher.is_cancelled())
            .map(|watcher| {
                let text = text.clone();
                async move { (watcher, watcher.send(text, timeout).await) }
            });

        for (watcher, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        watcher_id = %watcher.id(),
                        error = %e,
                        "Failed to deliver event, cancelling watcher"
                    );
                    watcher.cancel();
                    report.cancelled += 1;
                }
            }
        }

        debug!(
            delivered = report.delivered,
            cancelled = report.cancelled,
            "Room event delivered"
        );
        report
    }

    /// Hand `event` off to a background task; the caller never waits on it
    pub fn publish(&self, event: RoomEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.deliver(&event).await;
        });
    }
}
