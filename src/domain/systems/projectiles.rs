use crate::domain::state::{PlayerId, PlayerState, Projectile};
use crate::domain::tuning::AttackTuning;
use tracing::info;

/// One connected hit from the collision pass.
#[derive(Debug, Clone)]
pub struct HitReport {
    pub target_id: PlayerId,
    pub attacker_id: PlayerId,
    pub hp_after: f32,
    pub x: f32,
    pub y: f32,
    pub lethal: bool,
}

/// Advances all projectiles to `now_ms`, drops the ones past max range and
/// resolves collisions against living non-owner players. A projectile lands
/// at most one hit; the first qualifying target in iteration order wins.
pub fn tick_projectiles(
    players: &mut [PlayerState],
    projectiles: &mut Vec<Projectile>,
    now_ms: u64,
    attack: &AttackTuning,
    player_radius: f32,
) -> Vec<HitReport> {
    let mut hits = Vec::new();
    let hit_radius = attack.projectile_radius + player_radius;
    let hit_radius_sq = hit_radius * hit_radius;

    let mut kept = Vec::with_capacity(projectiles.len());
    for proj in projectiles.drain(..) {
        if proj.travelled(now_ms) > attack.max_range {
            continue;
        }

        let (px, py) = proj.position_at(now_ms);
        let target_index = players.iter().position(|target| {
            if target.id == proj.owner_id || !target.alive {
                return false;
            }
            let dx = target.x - px;
            let dy = target.y - py;
            dx * dx + dy * dy <= hit_radius_sq
        });

        let Some(ti) = target_index else {
            kept.push(proj);
            continue;
        };

        // Damage scales with the attacker's health at the moment of impact.
        let Some(attacker_hp) = players
            .iter()
            .find(|p| p.id == proj.owner_id)
            .map(|a| a.hp)
        else {
            // Owner no longer in the room; the projectile is spent anyway.
            continue;
        };
        let damage = attack.min_damage.max(attacker_hp * attack.hp_percent_damage);

        let target = &mut players[ti];
        target.hp -= damage;
        target.slow_percent = attack.slow_percent;
        target.slow_until = now_ms + attack.slow_duration_ms;

        let lethal = target.hp <= 0.0;
        if lethal {
            target.hp = 0.0;
            target.alive = false;
        }

        let report = HitReport {
            target_id: target.id,
            attacker_id: proj.owner_id,
            hp_after: target.hp,
            x: target.x,
            y: target.y,
            lethal,
        };

        if let Some(attacker) = players.iter_mut().find(|p| p.id == proj.owner_id) {
            attacker.hp = (attacker.hp + attack.heal_on_hit).min(attacker.max_hp);
        }

        info!(
            victim_id = report.target_id,
            shooter_id = report.attacker_id,
            projectile_id = proj.id,
            victim_hp = report.hp_after,
            "player hit"
        );
        hits.push(report);
    }

    *projectiles = kept;
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duelists() -> Vec<PlayerState> {
        vec![
            PlayerState::spawn(1, 25.0, 300.0, 1000.0, 0),
            PlayerState::spawn(2, 775.0, 300.0, 1000.0, 0),
        ]
    }

    fn shot_from_left(fired_at_ms: u64) -> Projectile {
        Projectile {
            id: 1,
            owner_id: 1,
            start_x: 25.0,
            start_y: 300.0,
            vx: 1200.0,
            vy: 0.0,
            fired_at_ms,
        }
    }

    #[test]
    fn projectile_expires_past_max_range() {
        let attack = AttackTuning::default();
        let mut players = duelists();
        // Fired straight up, nothing to hit.
        let mut projectiles = vec![Projectile {
            id: 1,
            owner_id: 1,
            start_x: 25.0,
            start_y: 300.0,
            vx: 0.0,
            vy: -1200.0,
            fired_at_ms: 0,
        }];

        // 2000 px at 1200 px/s: alive just before ~1667 ms, gone after.
        let hits = tick_projectiles(&mut players, &mut projectiles, 1_650, &attack, 25.0);
        assert!(hits.is_empty());
        assert_eq!(projectiles.len(), 1);

        let hits = tick_projectiles(&mut players, &mut projectiles, 1_700, &attack, 25.0);
        assert!(hits.is_empty());
        assert!(projectiles.is_empty());
    }

    #[test]
    fn hit_applies_damage_slow_and_heals_attacker() {
        let attack = AttackTuning::default();
        let mut players = duelists();
        players[0].hp = 950.0;
        let mut projectiles = vec![shot_from_left(0)];

        // 750 px apart, 55 px hit window: connects at ~580 ms.
        let hits = tick_projectiles(&mut players, &mut projectiles, 600, &attack, 25.0);
        assert_eq!(hits.len(), 1);
        assert!(projectiles.is_empty());

        let hit = &hits[0];
        assert_eq!(hit.target_id, 2);
        assert_eq!(hit.attacker_id, 1);
        assert!(!hit.lethal);

        // damage = max(80, 950 * 0.2) = 190
        assert!((players[1].hp - 810.0).abs() < 1e-3);
        assert_eq!(players[1].slow_percent, 0.40);
        assert_eq!(players[1].slow_until, 600 + 2_000);

        // Attacker heals by the fixed amount, capped at max.
        assert!((players[0].hp - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn damage_floor_applies_when_attacker_is_low() {
        let attack = AttackTuning::default();
        let mut players = duelists();
        players[0].hp = 100.0;
        let mut projectiles = vec![shot_from_left(0)];

        tick_projectiles(&mut players, &mut projectiles, 600, &attack, 25.0);

        // 100 * 0.2 = 20 < 80 floor.
        assert!((players[1].hp - 920.0).abs() < 1e-3);
    }

    #[test]
    fn lethal_hit_marks_target_dead_and_clamps_hp() {
        let attack = AttackTuning::default();
        let mut players = duelists();
        players[1].hp = 50.0;
        let mut projectiles = vec![shot_from_left(0)];

        let hits = tick_projectiles(&mut players, &mut projectiles, 600, &attack, 25.0);
        assert!(hits[0].lethal);
        assert_eq!(players[1].hp, 0.0);
        assert!(!players[1].alive);
    }

    #[test]
    fn projectiles_ignore_their_owner_and_the_dead() {
        let attack = AttackTuning::default();
        let mut players = duelists();
        players[1].alive = false;
        let mut projectiles = vec![shot_from_left(0)];

        let hits = tick_projectiles(&mut players, &mut projectiles, 600, &attack, 25.0);
        assert!(hits.is_empty());
        // Still in flight; nothing qualified.
        assert_eq!(projectiles.len(), 1);
    }
}
