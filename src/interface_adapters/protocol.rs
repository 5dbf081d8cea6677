// Wire protocol for the duel websocket. Both directions are closed tagged
// unions decoded/encoded exactly once at this boundary; room internals never
// see raw JSON.

use crate::domain::{FinishReason, PlayerId, PositionEntry, RosterEntry};
use crate::use_cases::RoomEvent;
use serde::{Deserialize, Serialize};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Authenticate {
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Join {
        room_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Leave {
        room_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Start {
        room_id: String,
    },
    Move {
        x: f32,
        y: f32,
    },
    CastAttack {
        x: f32,
        y: f32,
    },
    Dash {
        x: f32,
        y: f32,
    },
    SpeedBuff,
}

/// Messages the server sends to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthenticateResult {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },
    Joined {
        roster: Vec<RosterEntryDto>,
        reconnected: bool,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player: RosterEntryDto,
        player_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
    },
    LeaveOk,
    Started {
        roster: Vec<RosterEntryDto>,
    },
    #[serde(rename_all = "camelCase")]
    MoveTarget {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    #[serde(rename_all = "camelCase")]
    AttackCast {
        player_id: PlayerId,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
    },
    #[serde(rename_all = "camelCase")]
    Dashed {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    #[serde(rename_all = "camelCase")]
    SpeedBuffActivated {
        player_id: PlayerId,
        speed: f32,
    },
    #[serde(rename_all = "camelCase")]
    Hit {
        player_id: PlayerId,
        hp: f32,
        x: f32,
        y: f32,
    },
    #[serde(rename_all = "camelCase")]
    Finish {
        winner_id: Option<PlayerId>,
        reason: FinishReasonDto,
    },
    /// Remaining cooldowns in milliseconds for the receiving player only.
    Cooldowns {
        attack: u64,
        dash: u64,
        buff: u64,
    },
    PositionUpdate {
        players: Vec<PositionDto>,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, message: &str) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// One roster row as transmitted on join/start.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntryDto {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
}

impl From<&RosterEntry> for RosterEntryDto {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            player_id: entry.player_id,
            x: entry.x,
            y: entry.y,
            hp: entry.hp,
        }
    }
}

/// One row of the batched per-tick position broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
}

impl From<&PositionEntry> for PositionDto {
    fn from(entry: &PositionEntry) -> Self {
        Self {
            player_id: entry.player_id,
            x: entry.x,
            y: entry.y,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReasonDto {
    Knockout,
    Disconnect,
    SelfElimination,
}

impl From<FinishReason> for FinishReasonDto {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Knockout => FinishReasonDto::Knockout,
            FinishReason::Disconnect => FinishReasonDto::Disconnect,
            FinishReason::SelfElimination => FinishReasonDto::SelfElimination,
        }
    }
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::Joined {
                roster,
                reconnected,
            } => ServerMessage::Joined {
                roster: roster.iter().map(RosterEntryDto::from).collect(),
                reconnected,
            },
            RoomEvent::PlayerJoined {
                player,
                player_count,
            } => ServerMessage::PlayerJoined {
                player: RosterEntryDto::from(&player),
                player_count,
            },
            RoomEvent::PlayerLeft {
                player_id,
                player_count,
            } => ServerMessage::PlayerLeft {
                player_id,
                player_count,
            },
            RoomEvent::LeaveOk => ServerMessage::LeaveOk,
            RoomEvent::Started { roster } => ServerMessage::Started {
                roster: roster.iter().map(RosterEntryDto::from).collect(),
            },
            RoomEvent::MoveTarget { player_id, x, y } => {
                ServerMessage::MoveTarget { player_id, x, y }
            }
            RoomEvent::AttackCast {
                player_id,
                from_x,
                from_y,
                to_x,
                to_y,
            } => ServerMessage::AttackCast {
                player_id,
                from_x,
                from_y,
                to_x,
                to_y,
            },
            RoomEvent::Dashed { player_id, x, y } => ServerMessage::Dashed { player_id, x, y },
            RoomEvent::SpeedBuffActivated { player_id, speed } => {
                ServerMessage::SpeedBuffActivated { player_id, speed }
            }
            RoomEvent::Hit { player_id, hp, x, y } => ServerMessage::Hit { player_id, hp, x, y },
            RoomEvent::Finish { winner_id, reason } => ServerMessage::Finish {
                winner_id,
                reason: reason.into(),
            },
            RoomEvent::Cooldowns {
                attack_ms,
                dash_ms,
                buff_ms,
            } => ServerMessage::Cooldowns {
                attack: attack_ms,
                dash: dash_ms,
                buff: buff_ms,
            },
            RoomEvent::PositionUpdate { players } => ServerMessage::PositionUpdate {
                players: players.iter().map(PositionDto::from).collect(),
            },
            RoomEvent::Rejected { error } => ServerMessage::error(error.code(), error.message()),
        }
    }
}
