// Registry of live rooms. The map is the only structure shared across
// connection tasks; each room's state lives inside its own task.

use crate::domain::tuning::GameTuning;
use crate::use_cases::game::room_task;
use crate::use_cases::room::GameRoom;
use crate::use_cases::types::GameCommand;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

/// Shared configuration for spawning rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity of each room's inbound command channel.
    pub command_channel_capacity: usize,
    /// Fixed tick interval for the simulation loop.
    pub tick_interval: Duration,
    /// How long a finished room lingers before deletion.
    pub finished_grace: Duration,
    /// Gameplay numbers handed to every new room.
    pub tuning: GameTuning,
}

/// Per-room command channel handed to sessions.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_id: Arc<str>,
    /// Sender for commands into the room task.
    pub command_tx: mpsc::Sender<GameCommand>,
}

/// Thread-safe registry of active rooms.
pub struct RoomRegistry {
    settings: RoomSettings,
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the room's handle, creating the room (in `waiting` status) and
    /// spawning its task when the id is new. Atomic under the write lock: two
    /// racing callers can never create two rooms for one id. The boolean is
    /// true when this call created the room.
    pub async fn get_or_create(self: &Arc<Self>, room_id: &str) -> (RoomHandle, bool) {
        if let Some(handle) = self.get(room_id).await {
            return (handle, false);
        }

        let mut rooms = self.rooms.write().await;
        // Re-check: another caller may have won the race between locks.
        if let Some(handle) = rooms.get(room_id) {
            return (handle.clone(), false);
        }

        let (command_tx, command_rx) =
            mpsc::channel::<GameCommand>(self.settings.command_channel_capacity);
        let handle = RoomHandle {
            room_id: Arc::from(room_id),
            command_tx,
        };
        rooms.insert(room_id.to_string(), handle.clone());

        // Spawn the authoritative simulation loop for this room.
        let room = GameRoom::new(room_id, self.settings.tuning);
        tokio::spawn(room_task(
            Arc::clone(self),
            room,
            command_rx,
            self.settings.tick_interval,
            self.settings.finished_grace,
        ));

        tracing::info!(room_id, "room created");
        (handle, true)
    }

    /// Returns a handle for the provided id, if the room exists.
    pub async fn get(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    /// Deletes an entry; idempotent. Returns whether anything was removed.
    pub async fn remove(&self, room_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let removed = rooms.remove(room_id).is_some();
        if removed {
            tracing::info!(room_id, "room removed");
        }
        removed
    }
}
