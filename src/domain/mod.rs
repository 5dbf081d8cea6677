// Domain layer: entity state, pure simulation systems, gameplay tuning.

pub mod state;
pub mod systems;
pub mod tuning;

pub use state::{
    Cooldowns, FinishReason, PlayerId, PlayerState, PositionEntry, Projectile, RoomStatus,
    RosterEntry,
};
