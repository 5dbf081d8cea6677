// Per-room task: the single logical thread of execution for one room.
// Commands and tick passes interleave through one `select!`, so their
// effects apply in arrival order and no lock is needed around the room.

use crate::use_cases::registry::RoomRegistry;
use crate::use_cases::room::GameRoom;
use crate::use_cases::types::{CommandError, Directed, GameCommand, RoomEvent, SessionSender};
use crate::domain::{PlayerId, RoomStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub async fn room_task(
    registry: Arc<RoomRegistry>,
    mut room: GameRoom,
    mut command_rx: mpsc::Receiver<GameCommand>,
    tick_interval: Duration,
    finished_grace: Duration,
) {
    // The room's own clock; the simulation never reads wall time.
    let started = Instant::now();
    let grace_ms = finished_grace.as_millis() as u64;
    let mut interval = tokio::time::interval(tick_interval);
    let mut sessions: HashMap<PlayerId, SessionSender> = HashMap::new();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                // The registry holds a sender, so `None` means the room was
                // already removed elsewhere.
                let Some(cmd) = cmd else { break; };

                let now_ms = started.elapsed().as_millis() as u64;
                apply_command(&mut room, &mut sessions, cmd, now_ms);

                if room.is_empty() {
                    info!(room_id = room.room_id(), "last player gone; deleting room");
                    registry.remove(room.room_id()).await;
                    break;
                }
            }

            _ = interval.tick() => {
                let now_ms = started.elapsed().as_millis() as u64;

                if room.status() == RoomStatus::Playing {
                    let events = room.tick(now_ms);
                    route(&sessions, events);
                }

                if room.expired(now_ms, grace_ms) {
                    info!(room_id = room.room_id(), "grace period over; deleting room");
                    registry.remove(room.room_id()).await;
                    break;
                }
            }
        }
    }
}

fn apply_command(
    room: &mut GameRoom,
    sessions: &mut HashMap<PlayerId, SessionSender>,
    cmd: GameCommand,
    now_ms: u64,
) {
    match cmd {
        GameCommand::Join { player_id, session } => match room.join(player_id, now_ms) {
            Ok(events) => {
                // Rebind before routing so the joiner receives its snapshot
                // on the new connection.
                sessions.insert(player_id, session);
                route(sessions, events);
            }
            Err(error) => {
                let _ = session.try_send(RoomEvent::Rejected { error });
            }
        },
        GameCommand::Leave { player_id } => match room.leave(player_id) {
            Ok(events) => {
                route(sessions, events);
                sessions.remove(&player_id);
            }
            Err(error) => reject(sessions, player_id, error),
        },
        GameCommand::Start { player_id } => {
            let all_live = room
                .player_ids()
                .iter()
                .all(|id| sessions.get(id).is_some_and(|s| !s.is_closed()));
            match room.start(player_id, now_ms, all_live) {
                Ok(events) => route(sessions, events),
                Err(error) => reject(sessions, player_id, error),
            }
        }
        GameCommand::Move { player_id, x, y } => match room.move_to(player_id, x, y) {
            Ok(events) => route(sessions, events),
            Err(error) => reject(sessions, player_id, error),
        },
        GameCommand::CastAttack { player_id, x, y } => {
            match room.cast_attack(player_id, x, y, now_ms) {
                Ok(events) => route(sessions, events),
                Err(error) => reject(sessions, player_id, error),
            }
        }
        GameCommand::Dash { player_id, x, y } => match room.dash(player_id, x, y, now_ms) {
            Ok(events) => route(sessions, events),
            Err(error) => reject(sessions, player_id, error),
        },
        GameCommand::SpeedBuff { player_id } => match room.speed_buff(player_id, now_ms) {
            Ok(events) => route(sessions, events),
            Err(error) => reject(sessions, player_id, error),
        },
        GameCommand::Disconnect { player_id } => {
            sessions.remove(&player_id);
            let events = room.disconnect(player_id, now_ms);
            route(sessions, events);
        }
    }
}

// Outbound sends never block the simulation: a stalled client just drops
// events once its channel fills.
fn send_event(sessions: &HashMap<PlayerId, SessionSender>, id: PlayerId, event: RoomEvent) {
    let Some(session) = sessions.get(&id) else {
        return;
    };
    match session.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(player_id = id, "outbound channel full; dropping event");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(player_id = id, "outbound channel closed");
        }
    }
}

fn route(sessions: &HashMap<PlayerId, SessionSender>, events: Vec<Directed>) {
    for directed in events {
        match directed {
            Directed::To(id, event) => send_event(sessions, id, event),
            Directed::AllExcept(excluded, event) => {
                for id in sessions.keys() {
                    if *id != excluded {
                        send_event(sessions, *id, event.clone());
                    }
                }
            }
            Directed::All(event) => {
                for id in sessions.keys() {
                    send_event(sessions, *id, event.clone());
                }
            }
        }
    }
}

fn reject(sessions: &HashMap<PlayerId, SessionSender>, id: PlayerId, error: CommandError) {
    debug!(player_id = id, code = error.code(), "command rejected");
    send_event(sessions, id, RoomEvent::Rejected { error });
}
