use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    broadcast::{broadcast, broadcast_roster},
    connection::Connection,
    error::JoinError,
    protocol::Message,
    registry::Registry,
    room::{Member, PendingDeletion, Room},
};

const LOG_TAG: &str = "[Lockstep Session]";

/// How the client asked to enter the room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinAction {
    #[default]
    Join,
    Create,
}

impl JoinAction {
    /// Anything other than `create` is a plain join.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "create" => JoinAction::Create,
            _ => JoinAction::Join,
        }
    }
}

/// What a successful join hands back to the connection task
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub member_id: Uuid,
    pub is_host: bool,
    pub position: f64,
    pub playing: bool,
    pub video_id: i64,
}

/// Join, reconnect, host election and disconnect on top of the registry.
#[derive(Clone)]
pub struct SessionManager {
    registry: Registry,
    grace_period: Duration,
}

impl SessionManager {
    pub fn new(registry: Registry, grace_period: Duration) -> Self {
        Self {
            registry,
            grace_period,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn join(
        &self,
        room_id: &str,
        username: &str,
        connection: Connection,
        proposed_id: Uuid,
        action: JoinAction,
    ) -> Result<JoinOutcome, JoinError> {
        let now = Instant::now();
        let mut rooms = self.registry.lock();

        match (action, rooms.get(room_id)) {
            (JoinAction::Join, None) => {
                return Err(JoinError::RoomNotFound(room_id.to_string()));
            }
            (JoinAction::Create, Some(room)) if !room.has_username(username) && !room.is_empty() => {
                return Err(JoinError::RoomAlreadyExists(room_id.to_string()));
            }
            _ => {}
        }

        let room = rooms.get_or_create(room_id, now);
        if room.cancel_pending_deletion() {
            tracing::info!("{LOG_TAG} Pending deletion of room {} cancelled", room_id);
        }

        let departed = room.take_departed(username);
        let previous = room.take_member_by_username(username);
        let (member_id, inherited_host, evicted) = match (previous, departed) {
            (Some(previous), _) => (previous.id, previous.is_host, Some(previous.connection)),
            (None, Some(departed)) => {
                tracing::info!(
                    "{LOG_TAG} '{}' returned to room {}, resuming {}",
                    username,
                    room_id,
                    departed.id
                );
                (departed.id, departed.is_host, None)
            }
            (None, None) => (proposed_id, false, None),
        };
        let is_host = inherited_host || room.is_empty();

        room.insert_member(Member {
            id: member_id,
            connection,
            username: username.to_string(),
            is_host,
        });

        let outcome = JoinOutcome {
            member_id,
            is_host,
            position: room.clock.position_at(now),
            playing: room.clock.is_playing(),
            video_id: room.video_id,
        };
        drop(rooms);

        if let Some(stale) = evicted {
            tracing::info!(
                "{LOG_TAG} '{}' reconnected to room {} as {}, closing previous connection",
                username,
                room_id,
                member_id
            );
            stale.close();
        } else {
            tracing::info!(
                "{LOG_TAG} '{}' joined room {} as {} (host: {})",
                username,
                room_id,
                member_id,
                is_host
            );
        }
        tracing::debug!(
            "{LOG_TAG} Sync for {}: position {:.2}s, playing {}, video {}",
            member_id,
            outcome.position,
            outcome.playing,
            outcome.video_id
        );

        Ok(outcome)
    }

    /// Removes `member_id` if `connection` is still the one registered for it.
    pub fn disconnect(&self, room_id: &str, member_id: Uuid, connection: &Connection) {
        let now = Instant::now();
        let new_host = {
            let mut rooms = self.registry.lock();
            let Some(room) = rooms.get_mut(room_id) else {
                return;
            };
            match room.member(&member_id) {
                Some(member) if member.connection.same_channel(connection) => {}
                Some(_) => {
                    tracing::debug!(
                        "{LOG_TAG} Ignoring stale disconnect of {} in room {}",
                        member_id,
                        room_id
                    );
                    return;
                }
                None => return,
            }

            room.clock.freeze(now);
            let Some(leaving) = room.depart_member(&member_id) else {
                return;
            };
            tracing::info!(
                "{LOG_TAG} '{}' left room {} ({} remaining)",
                leaving.username,
                room_id,
                room.member_count()
            );

            if room.is_empty() {
                self.schedule_deletion(room_id, room);
                return;
            }

            if leaving.is_host && !room.has_host() {
                room.elect_host()
                    .map(|m| (m.id, m.username.clone(), m.connection.clone()))
            } else {
                None
            }
        };

        if let Some((host_id, username, host_connection)) = new_host {
            tracing::info!("{LOG_TAG} Host left room {}. New host: {}", room_id, username);
            host_connection.send(Message::identity(host_id, true));
            broadcast(
                &self.registry,
                room_id,
                &Message::system(format!("{username} is now the Host.")),
            );
        }

        broadcast_roster(&self.registry, room_id);
    }

    fn schedule_deletion(&self, room_id: &str, room: &mut Room) {
        let token = Uuid::new_v4();
        let registry = self.registry.clone();
        let grace_period = self.grace_period;
        let target = room_id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            let deleted = registry.lock().delete_if_abandoned(&target, token);
            if !deleted {
                tracing::debug!("{LOG_TAG} Room {} was rejoined, keeping it", target);
            }
        });

        room.set_pending_deletion(PendingDeletion::new(token, handle));
        tracing::info!(
            "{LOG_TAG} Room {} is empty, deleting in {:?}",
            room_id,
            grace_period
        );
    }
}
