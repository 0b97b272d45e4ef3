use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message kinds understood on the wire, in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    // Server -> Client
    Identity,
    SyncState,
    UserList,
    System,
    Error,

    // Host-only commands
    Play,
    Pause,
    Seek,
    ChangeVideo,
    GrantControl,
    RevokeControl,

    // Relayed as-is
    Chat,
    NewVideo,
    RequestControl,
    Typing,
    Reaction,

    #[default]
    #[serde(other)]
    Unknown,
}

/// Envelope exchanged between client and server.
///
/// Every payload field is optional on input; the server stamps `room` and
/// `user_id` on inbound messages before relaying them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub username: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: f64,
    pub video_id: i64,
    pub room: String,
    pub is_host: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_list: Option<Vec<MemberSummary>>,
}

impl Message {
    pub fn identity(user_id: Uuid, is_host: bool) -> Self {
        Self {
            kind: MessageKind::Identity,
            user_id: user_id.to_string(),
            is_host,
            ..Self::default()
        }
    }

    pub fn sync_state(timestamp: f64, playing: bool, video_id: i64) -> Self {
        let status = if playing { "playing" } else { "paused" };
        Self {
            kind: MessageKind::SyncState,
            timestamp,
            content: status.to_string(),
            video_id,
            ..Self::default()
        }
    }

    pub fn user_list(members: Vec<MemberSummary>) -> Self {
        Self {
            kind: MessageKind::UserList,
            user_list: Some(members),
            ..Self::default()
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::System,
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn error(code: &str) -> Self {
        Self {
            kind: MessageKind::Error,
            content: code.to_string(),
            ..Self::default()
        }
    }
}

/// Roster entry sent in `user_list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub username: String,
    pub is_host: bool,
}

/// Entry returned by the room listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub count: usize,
}
