// Use-case level commands, events and rejection reasons for a room.

use crate::domain::{FinishReason, PlayerId, PositionEntry, RosterEntry};
use tokio::sync::mpsc;

/// Outbound channel of one connected session; the room task routes events
/// into it and the session layer turns them into wire messages.
pub type SessionSender = mpsc::Sender<RoomEvent>;

/// Commands flowing from sessions into a room task.
#[derive(Debug)]
pub enum GameCommand {
    Join {
        player_id: PlayerId,
        session: SessionSender,
    },
    Leave {
        player_id: PlayerId,
    },
    Start {
        player_id: PlayerId,
    },
    Move {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    CastAttack {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    Dash {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    SpeedBuff {
        player_id: PlayerId,
    },
    Disconnect {
        player_id: PlayerId,
    },
}

/// Events a room emits toward sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Joined {
        roster: Vec<RosterEntry>,
        reconnected: bool,
    },
    PlayerJoined {
        player: RosterEntry,
        player_count: usize,
    },
    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
    },
    LeaveOk,
    Started {
        roster: Vec<RosterEntry>,
    },
    MoveTarget {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    AttackCast {
        player_id: PlayerId,
        from_x: f32,
        from_y: f32,
        to_x: f32,
        to_y: f32,
    },
    Dashed {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    SpeedBuffActivated {
        player_id: PlayerId,
        speed: f32,
    },
    Hit {
        player_id: PlayerId,
        hp: f32,
        x: f32,
        y: f32,
    },
    Finish {
        winner_id: Option<PlayerId>,
        reason: FinishReason,
    },
    /// Remaining cooldowns in milliseconds; sent only to their owner.
    Cooldowns {
        attack_ms: u64,
        dash_ms: u64,
        buff_ms: u64,
    },
    PositionUpdate {
        players: Vec<PositionEntry>,
    },
    Rejected {
        error: CommandError,
    },
}

/// Routing envelope: who should receive an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Directed {
    To(PlayerId, RoomEvent),
    AllExcept(PlayerId, RoomEvent),
    All(RoomEvent),
}

/// Why a command was rejected. Every variant maps onto a stable wire code so
/// clients can present feedback without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    RoomFull,
    GameInProgress,
    NotHost,
    InvalidState,
    OnCooldown,
    Dead,
    DashOutOfRange,
    NotInRoom,
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::RoomFull => "roomFull",
            CommandError::GameInProgress => "gameInProgress",
            CommandError::NotHost => "notHost",
            CommandError::InvalidState => "invalidState",
            CommandError::OnCooldown => "onCooldown",
            CommandError::Dead => "dead",
            CommandError::DashOutOfRange => "dashOutOfRange",
            CommandError::NotInRoom => "notInRoom",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CommandError::RoomFull => "the room already has two players",
            CommandError::GameInProgress => "not allowed while the match is running",
            CommandError::NotHost => "only the host can start the match",
            CommandError::InvalidState => "command not legal in the room's current state",
            CommandError::OnCooldown => "ability is still on cooldown",
            CommandError::Dead => "dead players cannot act",
            CommandError::DashOutOfRange => "dash distance outside the allowed window",
            CommandError::NotInRoom => "you are not a member of this room",
        }
    }
}
