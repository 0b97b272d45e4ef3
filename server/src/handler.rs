use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as AxumWsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    broadcast::{broadcast, broadcast_roster},
    commands,
    connection::{Connection, Outbound},
    protocol::{Message, MessageKind, RoomSummary},
    session::{JoinAction, SessionManager},
};

const LOG_TAG: &str = "[Lockstep Server]";
const DEFAULT_ROOM: &str = "general";
const DEFAULT_USERNAME: &str = "Anon";
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub error_close_delay: Duration,
}

/// Query parameters of the WebSocket upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    room: Option<String>,
    username: Option<String>,
    action: Option<String>,
}

impl JoinParams {
    fn room(&self) -> String {
        non_empty(&self.room).unwrap_or(DEFAULT_ROOM).to_string()
    }

    fn username(&self) -> String {
        non_empty(&self.username)
            .unwrap_or(DEFAULT_USERNAME)
            .to_string()
    }

    fn action(&self) -> JoinAction {
        non_empty(&self.action)
            .map(JoinAction::parse)
            .unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub async fn ws_endpoint(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, params))
}

pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.sessions.registry().list_occupied())
}

pub async fn health_check() -> &'static str {
    "ok"
}

async fn handle_connection(socket: WebSocket, state: AppState, params: JoinParams) {
    let sessions = state.sessions;
    let room_id = params.room();
    let username = params.username();

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (connection, mut outbound) = Connection::new();

    // Writer task: the only place that touches the socket sink
    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Message(msg) => {
                    let json = match serde_json::to_string(&msg) {
                        Ok(j) => j,
                        Err(e) => {
                            tracing::error!("{LOG_TAG} Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = ws_sender.send(AxumWsMessage::Text(json)).await {
                        tracing::debug!("{LOG_TAG} Failed to send message: {}", e);
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = ws_sender.send(AxumWsMessage::Close(None)).await;
                    break;
                }
            }
        }
    });

    let joined = match sessions.join(
        &room_id,
        &username,
        connection.clone(),
        Uuid::new_v4(),
        params.action(),
    ) {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!("{LOG_TAG} '{}' rejected: {}", username, e);
            connection.send(Message::error(e.code()));
            tokio::time::sleep(state.error_close_delay).await;
            close_writer(&connection, send_task).await;
            return;
        }
    };
    let member_id = joined.member_id;

    connection.send(Message::identity(member_id, joined.is_host));
    connection.send(Message::sync_state(
        joined.position,
        joined.playing,
        joined.video_id,
    ));
    broadcast_roster(sessions.registry(), &room_id);

    loop {
        let frame = tokio::select! {
            _ = connection.closed() => {
                tracing::debug!("{LOG_TAG} Connection of {} replaced", member_id);
                break;
            }
            frame = ws_receiver.next() => frame,
        };

        let decoded = match frame {
            Some(Ok(AxumWsMessage::Text(text))) => serde_json::from_str::<Message>(&text),
            Some(Ok(AxumWsMessage::Binary(bytes))) => serde_json::from_slice::<Message>(&bytes),
            Some(Ok(AxumWsMessage::Close(_))) | None => {
                tracing::debug!("{LOG_TAG} Client {} closing connection", member_id);
                break;
            }
            Some(Err(e)) => {
                tracing::debug!("{LOG_TAG} WebSocket error from {}: {}", member_id, e);
                break;
            }
            // ping/pong are answered by axum
            Some(Ok(_)) => continue,
        };

        match decoded {
            Ok(msg) => route_message(&sessions, &room_id, member_id, msg),
            Err(e) => {
                tracing::debug!("{LOG_TAG} Malformed message from {}: {}", member_id, e);
                break;
            }
        }
    }

    sessions.disconnect(&room_id, member_id, &connection);
    close_writer(&connection, send_task).await;
}

/// Lets the writer flush a close frame, aborting it if the peer stalls.
async fn close_writer(connection: &Connection, mut send_task: JoinHandle<()>) {
    connection.close();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }
}

fn route_message(sessions: &SessionManager, room_id: &str, member_id: Uuid, mut msg: Message) {
    let registry = sessions.registry();
    msg.room = room_id.to_string();
    msg.user_id = member_id.to_string();

    match msg.kind {
        MessageKind::Play | MessageKind::Pause | MessageKind::Seek => {
            if commands::apply_playback(registry, room_id, member_id, &msg) {
                broadcast(registry, room_id, &msg);
            }
        }
        MessageKind::ChangeVideo => {
            if commands::change_video(registry, room_id, member_id, &msg) {
                broadcast(registry, room_id, &msg);
            }
        }
        MessageKind::GrantControl | MessageKind::RevokeControl => {
            if commands::set_control(registry, room_id, member_id, &msg) {
                broadcast_roster(registry, room_id);
            }
        }
        MessageKind::Chat
        | MessageKind::NewVideo
        | MessageKind::RequestControl
        | MessageKind::Typing
        | MessageKind::Reaction => broadcast(registry, room_id, &msg),
        _ => {
            tracing::debug!("{LOG_TAG} Ignoring {:?} from {}", msg.kind, member_id);
        }
    }
}
