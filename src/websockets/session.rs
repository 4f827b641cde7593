use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::registry::{SubscriberRegistry, Watcher};
use super::socket::{SocketError, SocketWrapper};
use crate::room::repository::RoomRepository;
use crate::shared::AppError;

/// Per-session transport limits
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Frames queued for a watcher before the dispatcher starts waiting
    pub outbound_capacity: usize,
    /// Upper bound on writing one frame to the socket
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// What moved an active session into closing
#[derive(Debug)]
pub enum CloseReason {
    /// The watcher's own token was cancelled, e.g. after a failed delivery
    Cancelled,
    /// The server is shutting down
    Shutdown,
    /// The client closed the connection
    PeerClosed,
    TransportError(SocketError),
    Panicked,
}

/// A live-watch request that has been accepted but not yet validated
pub struct WatchRequest {
    raw_room_id: String,
    registry: Arc<SubscriberRegistry>,
    config: SessionConfig,
    shutdown: CancellationToken,
}

impl WatchRequest {
    pub fn new(
        raw_room_id: String,
        registry: Arc<SubscriberRegistry>,
        config: SessionConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            raw_room_id,
            registry,
            config,
            shutdown,
        }
    }

    /// Confirm the room exists before anything touches the registry
    #[instrument(skip(self, rooms), fields(room_id = %self.raw_room_id))]
    pub async fn validate(
        self,
        rooms: &(dyn RoomRepository + Send + Sync),
    ) -> Result<ValidatedWatch, AppError> {
        let room_uuid = Uuid::parse_str(&self.raw_room_id).map_err(|_| {
            debug!("Malformed room id");
            AppError::BadRequest("invalid room id".to_string())
        })?;

        if !rooms.room_exists(room_uuid).await? {
            warn!("Room not found, rejecting live-watch request");
            return Err(AppError::NotFound("room not found".to_string()));
        }

        Ok(ValidatedWatch {
            room_id: room_uuid.to_string(),
            registry: self.registry,
            config: self.config,
            shutdown: self.shutdown,
        })
    }
}

/// A live-watch request for a room known to exist, ready to go active
#[derive(Debug)]
pub struct ValidatedWatch {
    room_id: String,
    registry: Arc<SubscriberRegistry>,
    config: SessionConfig,
    shutdown: CancellationToken,
}

impl ValidatedWatch {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Register a watcher and pump frames to `socket` until the session ends
    ///
    /// The watcher is unregistered and the socket closed exactly once, on
    /// every exit path. If this future is dropped mid-flight the registration
    /// guard unregisters from a spawned task instead.
    pub async fn run(self, mut socket: Box<dyn SocketWrapper>) -> CloseReason {
        let (outbound_sender, mut outbound_receiver) =
            mpsc::channel::<String>(self.config.outbound_capacity);
        let cancel = self.shutdown.child_token();
        let watcher = Watcher::new(outbound_sender, cancel.clone());
        let watcher_id = watcher.id();

        self.registry.register(&self.room_id, watcher).await;
        let mut guard = RegistrationGuard {
            registry: Arc::clone(&self.registry),
            room_id: self.room_id.clone(),
            watcher_id,
            armed: true,
        };

        info!(
            room_id = %self.room_id,
            watcher_id = %watcher_id,
            "Watch session active"
        );

        let pumped = AssertUnwindSafe(pump(
            &mut *socket,
            &mut outbound_receiver,
            &cancel,
            self.config.write_timeout,
        ))
        .catch_unwind()
        .await;

        let reason = match pumped {
            Ok(CloseReason::Cancelled) if self.shutdown.is_cancelled() => CloseReason::Shutdown,
            Ok(reason) => reason,
            Err(_) => {
                warn!(
                    room_id = %self.room_id,
                    watcher_id = %watcher_id,
                    "Watch session panicked"
                );
                CloseReason::Panicked
            }
        };

        debug!(
            room_id = %self.room_id,
            watcher_id = %watcher_id,
            reason = ?reason,
            "Watch session closing"
        );

        // Closing the queue first fails any send still waiting on it
        drop(outbound_receiver);
        guard.release().await;
        if !matches!(reason, CloseReason::PeerClosed) {
            let _ = tokio::time::timeout(self.config.write_timeout, socket.close()).await;
        }

        info!(
            room_id = %self.room_id,
            watcher_id = %watcher_id,
            reason = ?reason,
            "Watch session terminated"
        );
        reason
    }
}

/// Forward queued frames to the socket until a termination signal fires
async fn pump(
    socket: &mut dyn SocketWrapper,
    outbound: &mut mpsc::Receiver<String>,
    cancel: &CancellationToken,
    write_timeout: Duration,
) -> CloseReason {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return CloseReason::Cancelled,

            msg = outbound.recv() => match msg {
                Some(text) => {
                    match tokio::time::timeout(write_timeout, socket.send_message(text)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return CloseReason::TransportError(e),
                        Err(_) => return CloseReason::TransportError(SocketError::Timeout),
                    }
                }
                // Only reachable once nothing holds the watcher any more
                None => return CloseReason::Cancelled,
            },

            inbound = socket.receive_message() => match inbound {
                Ok(Some(text)) => {
                    debug!(bytes = text.len(), "Ignoring inbound frame from watcher");
                }
                Ok(None) => return CloseReason::PeerClosed,
                Err(e) => return CloseReason::TransportError(e),
            },
        }
    }
}

/// Unregisters the watcher exactly once, either explicitly or on drop
struct RegistrationGuard {
    registry: Arc<SubscriberRegistry>,
    room_id: String,
    watcher_id: Uuid,
    armed: bool,
}

impl RegistrationGuard {
    async fn release(&mut self) {
        if self.armed {
            self.registry
                .unregister(&self.room_id, self.watcher_id)
                .await;
            self.armed = false;
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = Arc::clone(&self.registry);
        let room_id = std::mem::take(&mut self.room_id);
        let watcher_id = self.watcher_id;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    registry.unregister(&room_id, watcher_id).await;
                });
            }
            Err(_) => {
                warn!(
                    room_id = %room_id,
                    watcher_id = %watcher_id,
                    "No runtime to unregister dropped watch session"
                );
            }
        }
    }
}
