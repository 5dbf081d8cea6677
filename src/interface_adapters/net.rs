use crate::frameworks::config;
use crate::domain::PlayerId;
use crate::interface_adapters::clients::auth::VerifyTokenError;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_conn_id;
use crate::use_cases::{GameCommand, RoomEvent, RoomHandle};

use axum::{
    Error,
    extract::{
        Json, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
// `close` on the websocket comes from the Sink impl.
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_ROOM_ID_LEN: usize = 64;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomInitRequest {
    // Identifier the room-discovery service persisted for this match.
    #[serde(default)]
    room_id: String,
}

#[derive(Debug, serde::Serialize)]
struct RoomInitResponse {
    room_id: String,
}

// Consistent JSON error payload for the provisioning route.
#[derive(Debug, serde::Serialize)]
struct ApiError {
    error: String,
}

// Provisioning hook for the external room-discovery API: it registers the
// same identifier here that it stored, keeping both id spaces consistent.
// Idempotent like the registry call underneath: 201 on create, 200 after.
pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoomInitRequest>,
) -> impl IntoResponse {
    let room_id = payload.room_id.trim();
    if room_id.is_empty() || room_id.len() > MAX_ROOM_ID_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "invalid room id".to_string(),
            }),
        )
            .into_response();
    }

    let (_handle, created) = state.registry.get_or_create(room_id).await;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(RoomInitResponse {
            room_id: room_id.to_string(),
        }),
    )
        .into_response()
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

struct Session {
    state: Arc<AppState>,
    // Set once the auth service accepts a credential token.
    player_id: Option<PlayerId>,
    // Confirmed room binding; commands other than join require it.
    room: Option<RoomHandle>,
    // Join dispatched, `joined` confirmation still outstanding.
    pending_room: Option<RoomHandle>,
    outbound_tx: mpsc::Sender<RoomEvent>,

    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,

    last_invalid_log: Instant,
    close_frame: Option<CloseFrame>,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before/after an identity exists.
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    run_connection(socket, state).instrument(span).await;
}

async fn run_connection(mut socket: WebSocket, state: Arc<AppState>) {
    info!("client connected");

    let (outbound_tx, outbound_rx) = mpsc::channel::<RoomEvent>(config::OUTBOUND_CHANNEL_CAPACITY);
    let mut session = Session {
        state,
        player_id: None,
        room: None,
        pending_room: None,
        outbound_tx,
        msgs_in: 0,
        msgs_out: 0,
        invalid_json: 0,
        last_invalid_log: Instant::now() - LOG_THROTTLE,
        close_frame: None,
    };

    if let Err(e) = run_session(&mut socket, outbound_rx, &mut session).await {
        warn!(error = ?e, "session loop exited with error");
    }

    // Despawn from whichever room may hold an entity for this connection.
    if let Some(player_id) = session.player_id {
        for handle in session.room.take().into_iter().chain(session.pending_room.take()) {
            let _ = handle
                .command_tx
                .send(GameCommand::Disconnect { player_id })
                .await;
        }
    }

    debug!(
        msgs_in = session.msgs_in,
        msgs_out = session.msgs_out,
        invalid_json = session.invalid_json,
        "connection stats"
    );
    info!("client disconnected");
}

async fn run_session(
    socket: &mut WebSocket,
    mut outbound_rx: mpsc::Receiver<RoomEvent>,
    session: &mut Session,
) -> Result<(), NetError> {
    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming(socket, incoming, session).await? {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            event = outbound_rx.recv() => {
                match event {
                    Some(event) => {
                        forward_room_event(socket, event, session).await?;
                        false
                    }
                    // The session itself holds a sender, so this cannot close
                    // while we are still running.
                    None => true,
                }
            }
        };

        if disconnect {
            if let Some(frame) = session.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            let _ = socket.close().await;
            return Ok(());
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

async fn forward_room_event(
    socket: &mut WebSocket,
    event: RoomEvent,
    session: &mut Session,
) -> Result<(), NetError> {
    match &event {
        // The room confirmed the join that is still pending on this side.
        RoomEvent::Joined { .. } => {
            if let Some(handle) = session.pending_room.take() {
                session.room = Some(handle);
            }
        }
        // Leaving dissolves the binding; a rejected pending join never
        // becomes one.
        RoomEvent::LeaveOk => {
            session.room = None;
        }
        RoomEvent::Rejected { .. } => {
            if session.room.is_none() {
                session.pending_room = None;
            }
        }
        _ => {}
    }

    let msg = ServerMessage::from(event);
    send_message(socket, &msg).await?;
    session.msgs_out += 1;
    Ok(())
}

async fn handle_incoming(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    session: &mut Session,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            session.msgs_in += 1;

            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(socket, msg, session).await,
                Err(parse_err) => {
                    session.invalid_json += 1;
                    if should_log(&mut session.last_invalid_log) {
                        warn!(
                            bytes = text.len(),
                            error = %parse_err,
                            "failed to parse client message"
                        );
                    }

                    if session.invalid_json > MAX_INVALID_JSON {
                        session.close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too many invalid messages".into(),
                        });
                        return Ok(LoopControl::Disconnect);
                    }

                    send_message(socket, &ServerMessage::error("badPayload", "malformed message"))
                        .await?;
                    Ok(LoopControl::Continue)
                }
            }
        }
        Some(Ok(Message::Binary(_))) => {
            session.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            Ok(LoopControl::Disconnect)
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Ok(LoopControl::Continue),
        Some(Ok(Message::Close(_))) => Ok(LoopControl::Disconnect),
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn handle_client_message(
    socket: &mut WebSocket,
    msg: ClientMessage,
    session: &mut Session,
) -> Result<LoopControl, NetError> {
    if let ClientMessage::Authenticate { token } = &msg {
        return authenticate(socket, token, session).await;
    }

    // Nothing but authenticate passes before the auth service has spoken.
    let Some(player_id) = session.player_id else {
        send_message(
            socket,
            &ServerMessage::error("unauthenticated", "authenticate before any other command"),
        )
        .await?;
        return Ok(LoopControl::Continue);
    };

    match msg {
        ClientMessage::Authenticate { .. } => unreachable!("handled above"),

        ClientMessage::Join { room_id } => join_room(socket, &room_id, player_id, session).await,

        ClientMessage::Leave { room_id } => {
            room_scoped(socket, &room_id, session, GameCommand::Leave { player_id }).await
        }
        ClientMessage::Start { room_id } => {
            room_scoped(socket, &room_id, session, GameCommand::Start { player_id }).await
        }

        ClientMessage::Move { x, y } => {
            positional(socket, x, y, session, GameCommand::Move { player_id, x, y }).await
        }
        ClientMessage::CastAttack { x, y } => {
            positional(socket, x, y, session, GameCommand::CastAttack { player_id, x, y }).await
        }
        ClientMessage::Dash { x, y } => {
            positional(socket, x, y, session, GameCommand::Dash { player_id, x, y }).await
        }

        ClientMessage::SpeedBuff => dispatch(socket, session, GameCommand::SpeedBuff { player_id }).await,
    }
}

async fn authenticate(
    socket: &mut WebSocket,
    token: &str,
    session: &mut Session,
) -> Result<LoopControl, NetError> {
    let auth_client = Arc::clone(&session.state.auth_client);
    match auth_client.verify_token(token).await {
        Ok(identity) => {
            session.player_id = Some(identity.user_id);
            tracing::Span::current().record("player_id", identity.user_id);
            info!("authenticated");
            send_message(
                socket,
                &ServerMessage::AuthenticateResult {
                    ok: true,
                    player_id: Some(identity.user_id),
                },
            )
            .await?;
        }
        Err(VerifyTokenError::Rejected) => {
            send_message(
                socket,
                &ServerMessage::AuthenticateResult {
                    ok: false,
                    player_id: None,
                },
            )
            .await?;
        }
        Err(VerifyTokenError::UpstreamUnavailable) => {
            warn!("auth service unavailable");
            send_message(
                socket,
                &ServerMessage::error("authUnavailable", "authentication temporarily unavailable"),
            )
            .await?;
        }
    }
    Ok(LoopControl::Continue)
}

async fn join_room(
    socket: &mut WebSocket,
    room_id: &str,
    player_id: PlayerId,
    session: &mut Session,
) -> Result<LoopControl, NetError> {
    let room_id = room_id.trim();
    if room_id.is_empty() || room_id.len() > MAX_ROOM_ID_LEN {
        send_message(socket, &ServerMessage::error("badPayload", "invalid room id")).await?;
        return Ok(LoopControl::Continue);
    }

    // A binding whose room task is gone no longer counts; the id stopped
    // resolving when the room was deleted.
    if session.room.as_ref().is_some_and(|h| h.command_tx.is_closed()) {
        session.room = None;
    }
    if session
        .pending_room
        .as_ref()
        .is_some_and(|h| h.command_tx.is_closed())
    {
        session.pending_room = None;
    }

    // One binding per session. Rejoining the bound room is the reconnect
    // path; anything else needs an explicit leave first.
    if let Some(bound) = &session.room {
        if &*bound.room_id != room_id {
            send_message(
                socket,
                &ServerMessage::error("alreadyInRoom", "leave the current room before joining another"),
            )
            .await?;
            return Ok(LoopControl::Continue);
        }
    } else if session.pending_room.is_some() {
        send_message(socket, &ServerMessage::error("joinPending", "join already in progress"))
            .await?;
        return Ok(LoopControl::Continue);
    }

    // Joining is what creates the room on first contact.
    let (handle, _created) = session.state.registry.get_or_create(room_id).await;
    let cmd = GameCommand::Join {
        player_id,
        session: session.outbound_tx.clone(),
    };
    if handle.command_tx.send(cmd).await.is_err() {
        send_message(socket, &ServerMessage::error("roomNotFound", "room no longer exists"))
            .await?;
        return Ok(LoopControl::Continue);
    }

    if session.room.is_none() {
        session.pending_room = Some(handle);
    }
    Ok(LoopControl::Continue)
}

// Commands that name a room explicitly must match the session's binding.
async fn room_scoped(
    socket: &mut WebSocket,
    room_id: &str,
    session: &mut Session,
    cmd: GameCommand,
) -> Result<LoopControl, NetError> {
    let bound = session
        .room
        .as_ref()
        .is_some_and(|handle| &*handle.room_id == room_id.trim());
    if !bound {
        send_message(
            socket,
            &ServerMessage::error("notInRoom", "you are not a member of this room"),
        )
        .await?;
        return Ok(LoopControl::Continue);
    }
    dispatch(socket, session, cmd).await
}

// Coordinate-carrying commands reject non-finite values before they can
// reach the simulation.
async fn positional(
    socket: &mut WebSocket,
    x: f32,
    y: f32,
    session: &mut Session,
    cmd: GameCommand,
) -> Result<LoopControl, NetError> {
    if !x.is_finite() || !y.is_finite() {
        if should_log(&mut session.last_invalid_log) {
            warn!("non-finite coordinates; rejecting");
        }
        send_message(socket, &ServerMessage::error("badPayload", "non-finite coordinates"))
            .await?;
        return Ok(LoopControl::Continue);
    }
    dispatch(socket, session, cmd).await
}

async fn dispatch(
    socket: &mut WebSocket,
    session: &mut Session,
    cmd: GameCommand,
) -> Result<LoopControl, NetError> {
    let Some(room) = session.room.as_ref() else {
        send_message(
            socket,
            &ServerMessage::error("notInRoom", "you are not a member of this room"),
        )
        .await?;
        return Ok(LoopControl::Continue);
    };

    if room.command_tx.send(cmd).await.is_err() {
        // The room task is gone: it finished its grace period or emptied out.
        session.room = None;
        send_message(socket, &ServerMessage::error("roomNotFound", "room no longer exists"))
            .await?;
    }
    Ok(LoopControl::Continue)
}
