use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, MutexGuard};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{protocol::RoomSummary, room::Room};

const LOG_TAG: &str = "[Lockstep Registry]";

/// Authoritative map of room id to room state behind one lock.
///
/// The map itself is never handed out. Callers take the lock through
/// [`Registry::lock`] and work with the returned [`Rooms`] guard, which is
/// not `Send` and therefore cannot live across an `.await`.
#[derive(Clone, Default)]
pub struct Registry {
    rooms: Arc<Mutex<HashMap<String, Room>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> Rooms<'_> {
        Rooms {
            guard: self.rooms.lock(),
        }
    }

    pub fn list_occupied(&self) -> Vec<RoomSummary> {
        self.lock().list_occupied()
    }
}

/// Locked view of the registry
pub struct Rooms<'a> {
    guard: MutexGuard<'a, HashMap<String, Room>>,
}

impl Rooms<'_> {
    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.guard.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.guard.get_mut(room_id)
    }

    pub fn get_or_create(&mut self, room_id: &str, now: Instant) -> &mut Room {
        self.guard.entry(room_id.to_string()).or_insert_with(|| {
            tracing::info!("{LOG_TAG} Room {} created", room_id);
            Room::new(now)
        })
    }

    pub fn delete(&mut self, room_id: &str) -> Option<Room> {
        let removed = self.guard.remove(room_id);
        if let Some(mut room) = removed {
            room.cancel_pending_deletion();
            tracing::info!("{LOG_TAG} Room {} deleted", room_id);
            return Some(room);
        }
        None
    }

    /// Deletes the room only if it is still empty and `token` is the deletion
    /// currently scheduled on it.
    pub fn delete_if_abandoned(&mut self, room_id: &str, token: Uuid) -> bool {
        let abandoned = self
            .guard
            .get(room_id)
            .is_some_and(|room| room.is_empty() && room.pending_deletion_token() == Some(token));
        if abandoned {
            // Aborting the reaper's own handle only lands at its next await,
            // and it has none left after this call.
            tracing::info!("{LOG_TAG} Grace period of room {} expired", room_id);
            self.delete(room_id);
        }
        abandoned
    }

    pub fn list_occupied(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .guard
            .iter()
            .filter(|(_, room)| !room.is_empty())
            .map(|(name, room)| RoomSummary {
                name: name.clone(),
                count: room.member_count(),
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }
}
