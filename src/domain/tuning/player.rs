/// Gameplay tuning for player champions.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// World-space collision radius in pixels (server-side hit checks).
    pub radius: f32,

    /// Maximum and starting health.
    pub max_hp: f32,

    /// Passive health regeneration per second, capped at `max_hp`.
    pub hp_regen_per_sec: f32,

    /// Base movement speed in pixels per second, before buffs and slows.
    pub move_speed: f32,

    /// Distance under which movement snaps onto the target point.
    pub snap_epsilon: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: 25.0,
            max_hp: 1000.0,
            hp_regen_per_sec: 2.0,
            move_speed: 355.0,
            snap_epsilon: 5.0,
        }
    }
}
