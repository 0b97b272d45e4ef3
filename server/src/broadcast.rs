use crate::{protocol::Message, registry::Registry};

const LOG_TAG: &str = "[Lockstep Broadcast]";

/// Sends `msg` to every member of `room_id`.
///
/// Connections are copied out under the registry lock and the lock is released
/// before anything is sent.
pub fn broadcast(registry: &Registry, room_id: &str, msg: &Message) {
    let Some(connections) = registry.lock().get(room_id).map(|room| room.connections()) else {
        return;
    };

    tracing::debug!(
        "{LOG_TAG} Broadcasting {:?} from '{}' to {} members in room {}",
        msg.kind,
        msg.user_id,
        connections.len(),
        room_id
    );

    for connection in connections {
        if !connection.send(msg.clone()) {
            tracing::warn!(
                "{LOG_TAG} Dropped {:?} for closed connection {} in room {}",
                msg.kind,
                connection.id(),
                room_id
            );
        }
    }
}

/// Sends the current roster of `room_id` to all of its members.
pub fn broadcast_roster(registry: &Registry, room_id: &str) {
    let snapshot = registry
        .lock()
        .get(room_id)
        .map(|room| (room.roster(), room.connections()));
    let Some((roster, connections)) = snapshot else {
        return;
    };

    let msg = Message::user_list(roster);
    for connection in connections {
        if !connection.send(msg.clone()) {
            tracing::warn!(
                "{LOG_TAG} Dropped roster for closed connection {} in room {}",
                connection.id(),
                room_id
            );
        }
    }
}
