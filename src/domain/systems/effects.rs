use crate::domain::state::PlayerState;
use crate::domain::tuning::{PlayerTuning, SpeedBuffTuning};

/// Passive regen scaled by the time since this player's last pass, plus
/// expiry of the speed buff and the slow debuff.
pub fn tick_effects(p: &mut PlayerState, now_ms: u64, regen_per_sec: f32) {
    if !p.alive {
        return;
    }

    let dt = now_ms.saturating_sub(p.last_update_ms) as f32 / 1000.0;
    p.last_update_ms = now_ms;

    p.hp = (p.hp + regen_per_sec * dt).min(p.max_hp);

    if p.buff_until > 0 && now_ms >= p.buff_until {
        p.buff_until = 0;
    }
    if p.slow_until > 0 && now_ms >= p.slow_until {
        p.slow_until = 0;
        p.slow_percent = 0.0;
    }
}

/// Effective speed = base * (1 + buff) * (1 - slow). Checks expiry stamps
/// itself so it is also correct between effect passes.
pub fn effective_speed(
    p: &PlayerState,
    player: &PlayerTuning,
    buff: &SpeedBuffTuning,
    now_ms: u64,
) -> f32 {
    let mut speed = player.move_speed;
    if p.buff_until > now_ms {
        speed *= 1.0 + buff.speed_bonus;
    }
    if p.slow_percent > 0.0 && p.slow_until > now_ms {
        speed *= 1.0 - p.slow_percent;
    }
    speed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(hp: f32, now_ms: u64) -> PlayerState {
        let mut p = PlayerState::spawn(1, 100.0, 100.0, 1000.0, now_ms);
        p.hp = hp;
        p
    }

    #[test]
    fn regen_scales_with_elapsed_time_and_caps_at_max() {
        let mut p = player_at(990.0, 0);
        tick_effects(&mut p, 2_000, 2.0);
        assert!((p.hp - 994.0).abs() < 1e-3);

        tick_effects(&mut p, 60_000, 2.0);
        assert_eq!(p.hp, 1000.0);
    }

    #[test]
    fn buff_and_slow_expire_on_their_stamps() {
        let mut p = player_at(1000.0, 0);
        p.buff_until = 1_000;
        p.slow_until = 500;
        p.slow_percent = 0.4;

        tick_effects(&mut p, 499, 2.0);
        assert_eq!(p.slow_percent, 0.4);

        tick_effects(&mut p, 500, 2.0);
        assert_eq!(p.slow_percent, 0.0);
        assert_eq!(p.slow_until, 0);
        assert_eq!(p.buff_until, 1_000);

        tick_effects(&mut p, 1_000, 2.0);
        assert_eq!(p.buff_until, 0);
    }

    #[test]
    fn speed_stacks_buff_and_slow_multiplicatively() {
        let player = PlayerTuning::default();
        let buff = SpeedBuffTuning::default();

        let mut p = player_at(1000.0, 0);
        assert_eq!(effective_speed(&p, &player, &buff, 0), 355.0);

        p.buff_until = 10_000;
        let buffed = effective_speed(&p, &player, &buff, 0);
        assert!((buffed - 355.0 * 1.24).abs() < 1e-3);

        p.slow_until = 10_000;
        p.slow_percent = 0.4;
        let both = effective_speed(&p, &player, &buff, 0);
        assert!((both - 355.0 * 1.24 * 0.6).abs() < 1e-3);

        // Past expiry the stamps are ignored even before the next effect pass.
        assert_eq!(effective_speed(&p, &player, &buff, 10_000), 355.0);
    }
}
