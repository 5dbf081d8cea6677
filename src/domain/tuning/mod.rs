// Gameplay tuning, kept separate from runtime/server configuration.
// Values follow the live balance sheet; treat them as config, not law.

pub mod abilities;
pub mod arena;
pub mod player;

pub use abilities::{AttackTuning, DashTuning, SpeedBuffTuning};
pub use arena::ArenaTuning;
pub use player::PlayerTuning;

/// Aggregate tuning injected into each room at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameTuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub attack: AttackTuning,
    pub dash: DashTuning,
    pub buff: SpeedBuffTuning,
}
