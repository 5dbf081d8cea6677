use crate::domain::state::PlayerState;
use crate::domain::tuning::ArenaTuning;

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    /// Effective speed for this pass, in px/s (buffs and slows already applied).
    pub speed: f32,

    /// Distance under which the position snaps onto the target.
    pub snap_epsilon: f32,
}

/// Moves the entity at most `speed * dt` toward its target point.
/// Returns true when the position changed.
pub fn tick_movement(p: &mut PlayerState, dt: f32, cfg: MovementConfig) -> bool {
    if !p.alive {
        return false;
    }

    let dx = p.target_x - p.x;
    let dy = p.target_y - p.y;
    let dist = (dx * dx + dy * dy).sqrt();

    if dist < cfg.snap_epsilon {
        if p.x != p.target_x || p.y != p.target_y {
            p.x = p.target_x;
            p.y = p.target_y;
            return true;
        }
        return false;
    }

    let step = cfg.speed * dt;
    if step >= dist {
        p.x = p.target_x;
        p.y = p.target_y;
    } else {
        let ratio = step / dist;
        p.x += dx * ratio;
        p.y += dy * ratio;
    }

    true
}

/// Clamps a point into the arena, inset by the entity radius so clamped
/// points line up with the spawn edges.
pub fn clamp_to_arena(x: f32, y: f32, arena: &ArenaTuning, radius: f32) -> (f32, f32) {
    (
        x.clamp(radius, arena.width - radius),
        y.clamp(radius, arena.height - radius),
    )
}
