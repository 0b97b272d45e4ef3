//! Host-only room mutations.
//!
//! Every handler checks that the sender is a host of the room before touching
//! anything. Commands from anyone else are dropped without a reply.

use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    protocol::{Message, MessageKind},
    registry::Registry,
};

const LOG_TAG: &str = "[Lockstep Commands]";

/// Applies `play`, `pause` or `seek`. Returns whether to relay the command.
pub fn apply_playback(registry: &Registry, room_id: &str, sender: Uuid, msg: &Message) -> bool {
    let mut rooms = registry.lock();
    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    if !room.is_host(&sender) {
        tracing::debug!("{LOG_TAG} Dropping {:?} from non-host {}", msg.kind, sender);
        return false;
    }

    let now = Instant::now();
    match msg.kind {
        MessageKind::Play => room.clock.set(msg.timestamp, true, now),
        MessageKind::Pause => room.clock.set(msg.timestamp, false, now),
        MessageKind::Seek => room.clock.seek(msg.timestamp, now),
        _ => return false,
    }
    tracing::debug!(
        "{LOG_TAG} Room {} {:?} at {:.2}s",
        room_id,
        msg.kind,
        msg.timestamp
    );
    true
}

/// Loads a new video, always paused at the beginning.
pub fn change_video(registry: &Registry, room_id: &str, sender: Uuid, msg: &Message) -> bool {
    let mut rooms = registry.lock();
    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    if !room.is_host(&sender) {
        tracing::debug!("{LOG_TAG} Dropping change_video from non-host {}", sender);
        return false;
    }

    room.video_id = msg.video_id;
    room.clock.reset(Instant::now());
    tracing::info!("{LOG_TAG} Room {} switched to video {}", room_id, msg.video_id);
    true
}

/// Grants or revokes host status of the member named in `msg.content`.
///
/// The sender keeps its own host flag, so granting creates a co-host. The
/// target is told directly about its new status. Returns whether anything
/// changed.
pub fn set_control(registry: &Registry, room_id: &str, sender: Uuid, msg: &Message) -> bool {
    let grant = match msg.kind {
        MessageKind::GrantControl => true,
        MessageKind::RevokeControl => false,
        _ => return false,
    };
    let Ok(target_id) = msg.content.parse::<Uuid>() else {
        tracing::debug!("{LOG_TAG} Ignoring {:?} with bad target '{}'", msg.kind, msg.content);
        return false;
    };

    let target_connection = {
        let mut rooms = registry.lock();
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };
        if !room.is_host(&sender) {
            tracing::debug!("{LOG_TAG} Dropping {:?} from non-host {}", msg.kind, sender);
            return false;
        }
        let Some(target) = room.member_mut(&target_id) else {
            return false;
        };
        target.is_host = grant;
        tracing::info!(
            "{LOG_TAG} '{}' {} host in room {}",
            target.username,
            if grant { "granted" } else { "revoked" },
            room_id
        );
        target.connection.clone()
    };

    target_connection.send(Message::identity(target_id, grant));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{Connection, Outbound},
        room::Member,
    };
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        registry: Registry,
        host: Uuid,
        guest: Uuid,
        guest_rx: UnboundedReceiver<Outbound>,
    }

    fn fixture() -> Fixture {
        let registry = Registry::new();
        let (host_conn, _host_rx) = Connection::new();
        let (guest_conn, guest_rx) = Connection::new();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        {
            let mut rooms = registry.lock();
            let room = rooms.get_or_create("r1", Instant::now());
            room.insert_member(Member {
                id: host,
                connection: host_conn,
                username: "alice".into(),
                is_host: true,
            });
            room.insert_member(Member {
                id: guest,
                connection: guest_conn,
                username: "bob".into(),
                is_host: false,
            });
        }
        Fixture {
            registry,
            host,
            guest,
            guest_rx,
        }
    }

    fn command(kind: MessageKind, timestamp: f64) -> Message {
        Message {
            kind,
            timestamp,
            ..Message::default()
        }
    }

    fn snapshot(registry: &Registry) -> (f64, bool, i64) {
        let rooms = registry.lock();
        let room = rooms.get("r1").unwrap();
        (
            room.clock.position_at(Instant::now()),
            room.clock.is_playing(),
            room.video_id,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn host_play_and_pause_update_the_clock() {
        let f = fixture();

        assert!(apply_playback(&f.registry, "r1", f.host, &command(MessageKind::Play, 10.0)));
        tokio::time::advance(Duration::from_secs(2)).await;
        let (position, playing, _) = snapshot(&f.registry);
        assert!(playing);
        assert!((position - 12.0).abs() < 0.01);

        assert!(apply_playback(&f.registry, "r1", f.host, &command(MessageKind::Pause, 12.5)));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(snapshot(&f.registry), (12.5, false, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn seek_leaves_transport_state_alone() {
        let f = fixture();
        apply_playback(&f.registry, "r1", f.host, &command(MessageKind::Play, 0.0));

        assert!(apply_playback(&f.registry, "r1", f.host, &command(MessageKind::Seek, 90.0)));
        let (position, playing, _) = snapshot(&f.registry);
        assert!(playing);
        assert_eq!(position, 90.0);
    }

    #[test]
    fn non_host_commands_are_dropped() {
        let f = fixture();

        assert!(!apply_playback(&f.registry, "r1", f.guest, &command(MessageKind::Play, 50.0)));
        assert!(!change_video(
            &f.registry,
            "r1",
            f.guest,
            &Message {
                kind: MessageKind::ChangeVideo,
                video_id: 3,
                ..Message::default()
            }
        ));
        assert_eq!(snapshot(&f.registry), (0.0, false, 0));
    }

    #[test]
    fn commands_for_unknown_sender_or_room_are_dropped() {
        let f = fixture();
        let play = command(MessageKind::Play, 1.0);

        assert!(!apply_playback(&f.registry, "r1", Uuid::new_v4(), &play));
        assert!(!apply_playback(&f.registry, "r2", f.host, &play));
    }

    #[test]
    fn change_video_resets_playback() {
        let f = fixture();
        apply_playback(&f.registry, "r1", f.host, &command(MessageKind::Play, 300.0));

        let msg = Message {
            kind: MessageKind::ChangeVideo,
            video_id: 42,
            ..Message::default()
        };
        assert!(change_video(&f.registry, "r1", f.host, &msg));
        assert_eq!(snapshot(&f.registry), (0.0, false, 42));
    }

    #[test]
    fn grant_creates_a_cohost_and_notifies_the_target() {
        let mut f = fixture();
        let msg = Message {
            kind: MessageKind::GrantControl,
            content: f.guest.to_string(),
            ..Message::default()
        };

        assert!(set_control(&f.registry, "r1", f.host, &msg));

        {
            let rooms = f.registry.lock();
            let room = rooms.get("r1").unwrap();
            assert!(room.is_host(&f.guest));
            assert!(room.is_host(&f.host));
        }
        match f.guest_rx.try_recv() {
            Ok(Outbound::Message(identity)) => {
                assert_eq!(identity.kind, MessageKind::Identity);
                assert!(identity.is_host);
                assert_eq!(identity.user_id, f.guest.to_string());
            }
            other => panic!("expected identity, got {other:?}"),
        }
    }

    #[test]
    fn revoke_clears_target_host_flag() {
        let mut f = fixture();
        let grant = Message {
            kind: MessageKind::GrantControl,
            content: f.guest.to_string(),
            ..Message::default()
        };
        set_control(&f.registry, "r1", f.host, &grant);
        let revoke = Message {
            kind: MessageKind::RevokeControl,
            ..grant
        };

        assert!(set_control(&f.registry, "r1", f.host, &revoke));
        assert!(!f.registry.lock().get("r1").unwrap().is_host(&f.guest));

        let _granted = f.guest_rx.try_recv();
        match f.guest_rx.try_recv() {
            Ok(Outbound::Message(identity)) => assert!(!identity.is_host),
            other => panic!("expected identity, got {other:?}"),
        }
    }

    #[test]
    fn admin_commands_need_host_and_known_target() {
        let f = fixture();
        let by_guest = Message {
            kind: MessageKind::GrantControl,
            content: f.guest.to_string(),
            ..Message::default()
        };
        assert!(!set_control(&f.registry, "r1", f.guest, &by_guest));

        let unknown_target = Message {
            content: Uuid::new_v4().to_string(),
            ..by_guest.clone()
        };
        assert!(!set_control(&f.registry, "r1", f.host, &unknown_target));

        let garbage = Message {
            content: "not-an-id".into(),
            ..by_guest
        };
        assert!(!set_control(&f.registry, "r1", f.host, &garbage));
        assert!(!f.registry.lock().get("r1").unwrap().is_host(&f.guest));
    }
}
