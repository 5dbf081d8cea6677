// Per-ability numbers. Durations and cooldowns are milliseconds.

/// The ranged basic attack: costs the caster health, slows on hit and heals
/// the caster back when it connects.
#[derive(Debug, Clone, Copy)]
pub struct AttackTuning {
    /// Damage floor when the caster is low on health.
    pub min_damage: f32,

    /// Fraction of the caster's current health dealt as damage.
    pub hp_percent_damage: f32,

    /// Movement slow applied to the victim.
    pub slow_percent: f32,
    pub slow_duration_ms: u64,

    /// Health paid on cast. Paying it can kill the caster.
    pub hp_cost: f32,

    /// Health restored to the caster on a connected hit, capped at max.
    pub heal_on_hit: f32,

    pub cooldown_ms: u64,

    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub max_range: f32,
}

impl Default for AttackTuning {
    fn default() -> Self {
        Self {
            min_damage: 80.0,
            hp_percent_damage: 0.20,
            slow_percent: 0.40,
            slow_duration_ms: 2_000,
            hp_cost: 50.0,
            heal_on_hit: 50.0,
            cooldown_ms: 3_700,
            projectile_speed: 1200.0,
            projectile_radius: 30.0,
            max_range: 2000.0,
        }
    }
}

/// Instant repositioning bounded by a distance window.
#[derive(Debug, Clone, Copy)]
pub struct DashTuning {
    pub min_range: f32,
    pub max_range: f32,
    pub cooldown_ms: u64,
}

impl Default for DashTuning {
    fn default() -> Self {
        Self {
            min_range: 100.0,
            max_range: 400.0,
            cooldown_ms: 5_000,
        }
    }
}

/// Temporary movement-speed bonus. The cooldown outlasts the buff.
#[derive(Debug, Clone, Copy)]
pub struct SpeedBuffTuning {
    pub speed_bonus: f32,
    pub duration_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for SpeedBuffTuning {
    fn default() -> Self {
        Self {
            speed_bonus: 0.24,
            duration_ms: 10_000,
            cooldown_ms: 15_000,
        }
    }
}
