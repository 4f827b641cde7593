use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dispatcher::DeliveryError;

/// One live connection subscribed to a room
///
/// Holds the sending half of the session's outbound queue and the token that
/// forces the owning session out of its active state. Cloning shares both.
#[derive(Debug, Clone)]
pub struct Watcher {
    id: Uuid,
    outbound: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl Watcher {
    pub fn new(outbound: mpsc::Sender<String>, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Signal the owning session to terminate
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue a frame for the session, waiting at most `timeout` for room
    pub(super) async fn send(&self, text: String, timeout: Duration) -> Result<(), DeliveryError> {
        self.outbound
            .send_timeout(text, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout(timeout),
            })
    }
}

/// Watchers of every room plus the reverse index that keeps each watcher
/// under a single room
#[derive(Debug, Default)]
pub(super) struct Rooms {
    by_room: HashMap<String, HashMap<Uuid, Watcher>>,
    membership: HashMap<Uuid, String>,
}

impl Rooms {
    pub(super) fn watchers(&self, room_id: &str) -> impl Iterator<Item = &Watcher> {
        self.by_room
            .get(room_id)
            .into_iter()
            .flat_map(|watchers| watchers.values())
    }

    pub(super) fn is_empty_room(&self, room_id: &str) -> bool {
        self.by_room
            .get(room_id)
            .map_or(true, |watchers| watchers.is_empty())
    }
}

/// Process-wide directory of live watchers keyed by room
///
/// Every read and write goes through one async mutex, including the
/// iterate-and-send loop of the dispatcher. Room keys are opaque.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    rooms: Mutex<Rooms>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `watcher` to the set for `room_id`, creating the set if absent
    ///
    /// A watcher already registered under another room is moved, so it is
    /// never a member of two rooms at once.
    pub async fn register(&self, room_id: &str, watcher: Watcher) {
        let mut rooms = self.rooms.lock().await;
        let watcher_id = watcher.id;

        if let Some(previous) = rooms.membership.get(&watcher_id).cloned() {
            if previous != room_id {
                warn!(
                    watcher_id = %watcher_id,
                    previous_room = %previous,
                    room_id = %room_id,
                    "Watcher registered under a second room, moving it"
                );
                remove_watcher(&mut rooms, &previous, watcher_id);
            }
        }

        rooms
            .by_room
            .entry(room_id.to_string())
            .or_default()
            .insert(watcher_id, watcher);
        rooms.membership.insert(watcher_id, room_id.to_string());

        debug!(
            room_id = %room_id,
            watcher_id = %watcher_id,
            watchers = rooms.by_room.get(room_id).map_or(0, HashMap::len),
            "Watcher registered"
        );
    }

    /// Remove the watcher from `room_id`; a no-op if it is not there
    ///
    /// Returns whether a watcher was actually removed.
    pub async fn unregister(&self, room_id: &str, watcher_id: Uuid) -> bool {
        let mut rooms = self.rooms.lock().await;
        let removed = remove_watcher(&mut rooms, room_id, watcher_id);

        if removed {
            debug!(room_id = %room_id, watcher_id = %watcher_id, "Watcher unregistered");
        }
        removed
    }

    pub async fn watcher_count(&self, room_id: &str) -> usize {
        self.rooms
            .lock()
            .await
            .by_room
            .get(room_id)
            .map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one watcher
    pub async fn room_count(&self) -> usize {
        self.rooms
            .lock()
            .await
            .by_room
            .values()
            .filter(|watchers| !watchers.is_empty())
            .count()
    }

    pub async fn is_registered(&self, room_id: &str, watcher_id: Uuid) -> bool {
        self.rooms
            .lock()
            .await
            .membership
            .get(&watcher_id)
            .is_some_and(|room| room == room_id)
    }

    /// Exclusive access for the dispatcher's iterate-and-send loop
    pub(super) async fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.rooms.lock().await
    }
}

fn remove_watcher(rooms: &mut Rooms, room_id: &str, watcher_id: Uuid) -> bool {
    let Some(watchers) = rooms.by_room.get_mut(room_id) else {
        return false;
    };
    let removed = watchers.remove(&watcher_id).is_some();

    if watchers.is_empty() {
        rooms.by_room.remove(room_id);
    }
    if removed {
        rooms.membership.remove(&watcher_id);
    }
    removed
}
