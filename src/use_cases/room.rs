// The authoritative state machine for one room. Synchronous and channel-free:
// commands and ticks mutate the room and return routed events, so the whole
// match can be driven with a synthetic clock in tests. The room task owns the
// clock and the session channels.

use crate::domain::systems::{effects, movement, projectiles};
use crate::domain::tuning::GameTuning;
use crate::domain::{
    FinishReason, PlayerId, PlayerState, PositionEntry, Projectile, RoomStatus, RosterEntry,
};
use crate::use_cases::types::{CommandError, Directed, RoomEvent};

/// Occupancy limit; a duel room never holds more than two entities.
pub const ROOM_CAPACITY: usize = 2;

pub struct GameRoom {
    room_id: String,
    status: RoomStatus,
    host_id: Option<PlayerId>,
    players: Vec<PlayerState>,
    projectiles: Vec<Projectile>,
    next_projectile_id: u64,
    last_tick_ms: u64,
    finished_at_ms: Option<u64>,
    tuning: GameTuning,
}

impl GameRoom {
    pub fn new(room_id: impl Into<String>, tuning: GameTuning) -> Self {
        Self {
            room_id: room_id.into(),
            status: RoomStatus::Waiting,
            host_id: None,
            players: Vec::with_capacity(ROOM_CAPACITY),
            projectiles: Vec::new(),
            next_projectile_id: 1,
            last_tick_ms: 0,
            finished_at_ms: None,
            tuning,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// True once the post-match grace window has elapsed and the room should
    /// be deleted from the registry.
    pub fn expired(&self, now_ms: u64, grace_ms: u64) -> bool {
        self.status == RoomStatus::Finished
            && self
                .finished_at_ms
                .is_some_and(|at| now_ms >= at.saturating_add(grace_ms))
    }

    fn roster(&self) -> Vec<RosterEntry> {
        self.players.iter().map(RosterEntry::from).collect()
    }

    fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    // Spawn slots depend only on join order: first joiner on the left edge,
    // second on the right, both on the vertical midline.
    fn spawn_point(&self, slot: usize) -> (f32, f32) {
        let radius = self.tuning.player.radius;
        let x = if slot == 0 {
            radius
        } else {
            self.tuning.arena.width - radius
        };
        (x, self.tuning.arena.height / 2.0)
    }

    fn cooldown_event(&self, id: PlayerId, now_ms: u64) -> Option<RoomEvent> {
        self.player(id).map(|p| RoomEvent::Cooldowns {
            attack_ms: p.cooldowns.attack.saturating_sub(now_ms),
            dash_ms: p.cooldowns.dash.saturating_sub(now_ms),
            buff_ms: p.cooldowns.buff.saturating_sub(now_ms),
        })
    }

    // Common gate for combat abilities: member of this room, match running,
    // caller alive.
    fn ability_gate(&self, id: PlayerId) -> Result<(), CommandError> {
        let player = self.player(id).ok_or(CommandError::NotInRoom)?;
        if self.status != RoomStatus::Playing {
            return Err(CommandError::InvalidState);
        }
        if !player.alive {
            return Err(CommandError::Dead);
        }
        Ok(())
    }

    fn finish(&mut self, winner_id: Option<PlayerId>, reason: FinishReason, now_ms: u64) -> RoomEvent {
        self.status = RoomStatus::Finished;
        self.finished_at_ms = Some(now_ms);
        RoomEvent::Finish { winner_id, reason }
    }

    /// Adds the player, or rebinds an existing one (the reconnect path keeps
    /// all simulation state untouched).
    pub fn join(&mut self, player_id: PlayerId, now_ms: u64) -> Result<Vec<Directed>, CommandError> {
        if self.player(player_id).is_some() {
            return Ok(vec![Directed::To(
                player_id,
                RoomEvent::Joined {
                    roster: self.roster(),
                    reconnected: true,
                },
            )]);
        }

        // Fresh joins are only legal before the match starts.
        if self.status != RoomStatus::Waiting {
            return Err(CommandError::InvalidState);
        }
        if self.players.len() >= ROOM_CAPACITY {
            return Err(CommandError::RoomFull);
        }

        let (x, y) = self.spawn_point(self.players.len());
        let player = PlayerState::spawn(player_id, x, y, self.tuning.player.max_hp, now_ms);
        let entry = RosterEntry::from(&player);
        self.players.push(player);

        // First occupant owns the room.
        if self.host_id.is_none() {
            self.host_id = Some(player_id);
        }

        Ok(vec![
            Directed::To(
                player_id,
                RoomEvent::Joined {
                    roster: self.roster(),
                    reconnected: false,
                },
            ),
            Directed::AllExcept(
                player_id,
                RoomEvent::PlayerJoined {
                    player: entry,
                    player_count: self.players.len(),
                },
            ),
        ])
    }

    /// Removes the player. Idempotent: leaving a room one is not in is a
    /// silent no-op, so a duplicated leave never double-broadcasts.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<Vec<Directed>, CommandError> {
        if self.player(player_id).is_none() {
            return Ok(Vec::new());
        }
        if self.status == RoomStatus::Playing {
            return Err(CommandError::GameInProgress);
        }

        self.remove_player(player_id);

        Ok(vec![
            Directed::To(player_id, RoomEvent::LeaveOk),
            Directed::AllExcept(
                player_id,
                RoomEvent::PlayerLeft {
                    player_id,
                    player_count: self.players.len(),
                },
            ),
        ])
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.players.retain(|p| p.id != player_id);
        if self.host_id == Some(player_id) {
            // Host role passes to the remaining occupant.
            self.host_id = self.players.first().map(|p| p.id);
        }
    }

    /// Host-only transition from `Waiting` to `Playing`. `all_sessions_live`
    /// is supplied by the room task, which owns the session channels.
    pub fn start(
        &mut self,
        player_id: PlayerId,
        now_ms: u64,
        all_sessions_live: bool,
    ) -> Result<Vec<Directed>, CommandError> {
        if self.player(player_id).is_none() {
            return Err(CommandError::NotInRoom);
        }
        if self.host_id != Some(player_id) {
            return Err(CommandError::NotHost);
        }
        if self.status != RoomStatus::Waiting
            || self.players.len() != ROOM_CAPACITY
            || !all_sessions_live
        {
            return Err(CommandError::InvalidState);
        }

        self.status = RoomStatus::Playing;
        self.last_tick_ms = now_ms;
        for p in &mut self.players {
            p.hp = p.max_hp;
            p.alive = true;
            p.buff_until = 0;
            p.slow_until = 0;
            p.slow_percent = 0.0;
            p.cooldowns = Default::default();
            p.target_x = p.x;
            p.target_y = p.y;
            p.last_update_ms = now_ms;
        }

        Ok(vec![Directed::All(RoomEvent::Started {
            roster: self.roster(),
        })])
    }

    /// Sets the movement target; the tick pass performs the displacement.
    /// Deliberately a no-op outside `Playing` or for dead entities.
    pub fn move_to(&mut self, player_id: PlayerId, x: f32, y: f32) -> Result<Vec<Directed>, CommandError> {
        if self.player(player_id).is_none() {
            return Err(CommandError::NotInRoom);
        }
        if self.status != RoomStatus::Playing {
            return Ok(Vec::new());
        }

        let arena = self.tuning.arena;
        let radius = self.tuning.player.radius;
        let Some(player) = self.player_mut(player_id) else {
            return Err(CommandError::NotInRoom);
        };
        if !player.alive {
            return Ok(Vec::new());
        }

        let (tx, ty) = movement::clamp_to_arena(x, y, &arena, radius);
        player.target_x = tx;
        player.target_y = ty;

        Ok(vec![Directed::AllExcept(
            player_id,
            RoomEvent::MoveTarget {
                player_id,
                x: tx,
                y: ty,
            },
        )])
    }

    /// Fires the ranged attack toward a point. The health cost is paid first;
    /// dying to it ends the match with no winner and spawns nothing.
    pub fn cast_attack(
        &mut self,
        player_id: PlayerId,
        x: f32,
        y: f32,
        now_ms: u64,
    ) -> Result<Vec<Directed>, CommandError> {
        self.ability_gate(player_id)?;

        let attack = self.tuning.attack;
        let Some(player) = self.player_mut(player_id) else {
            return Err(CommandError::NotInRoom);
        };
        if player.cooldowns.attack > now_ms {
            return Err(CommandError::OnCooldown);
        }

        player.hp -= attack.hp_cost;
        if player.hp <= 0.0 {
            player.hp = 0.0;
            player.alive = false;
            let finish = self.finish(None, FinishReason::SelfElimination, now_ms);
            return Ok(vec![Directed::All(finish)]);
        }

        player.cooldowns.attack = now_ms + attack.cooldown_ms;
        let (from_x, from_y) = (player.x, player.y);

        let angle = (y - from_y).atan2(x - from_x);
        self.projectiles.push(Projectile {
            id: self.next_projectile_id,
            owner_id: player_id,
            start_x: from_x,
            start_y: from_y,
            vx: angle.cos() * attack.projectile_speed,
            vy: angle.sin() * attack.projectile_speed,
            fired_at_ms: now_ms,
        });
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);

        let mut events = vec![Directed::All(RoomEvent::AttackCast {
            player_id,
            from_x,
            from_y,
            to_x: x,
            to_y: y,
        })];
        if let Some(cooldowns) = self.cooldown_event(player_id, now_ms) {
            events.push(Directed::To(player_id, cooldowns));
        }
        Ok(events)
    }

    /// Instant repositioning within the configured distance window. Rejection
    /// leaves every field untouched, including the cooldown.
    pub fn dash(
        &mut self,
        player_id: PlayerId,
        x: f32,
        y: f32,
        now_ms: u64,
    ) -> Result<Vec<Directed>, CommandError> {
        self.ability_gate(player_id)?;

        let arena = self.tuning.arena;
        let radius = self.tuning.player.radius;
        let dash = self.tuning.dash;
        let Some(player) = self.player_mut(player_id) else {
            return Err(CommandError::NotInRoom);
        };
        if player.cooldowns.dash > now_ms {
            return Err(CommandError::OnCooldown);
        }

        let (dx_, dy_) = movement::clamp_to_arena(x, y, &arena, radius);
        let dist = {
            let dx = dx_ - player.x;
            let dy = dy_ - player.y;
            (dx * dx + dy * dy).sqrt()
        };
        if dist < dash.min_range || dist > dash.max_range {
            return Err(CommandError::DashOutOfRange);
        }

        // Current and target position move together so the entity does not
        // walk back toward a pre-dash target.
        player.x = dx_;
        player.y = dy_;
        player.target_x = dx_;
        player.target_y = dy_;
        player.cooldowns.dash = now_ms + dash.cooldown_ms;

        let mut events = vec![Directed::All(RoomEvent::Dashed {
            player_id,
            x: dx_,
            y: dy_,
        })];
        if let Some(cooldowns) = self.cooldown_event(player_id, now_ms) {
            events.push(Directed::To(player_id, cooldowns));
        }
        Ok(events)
    }

    /// Activates the temporary speed buff.
    pub fn speed_buff(&mut self, player_id: PlayerId, now_ms: u64) -> Result<Vec<Directed>, CommandError> {
        self.ability_gate(player_id)?;

        let player_tuning = self.tuning.player;
        let buff = self.tuning.buff;
        let Some(player) = self.player_mut(player_id) else {
            return Err(CommandError::NotInRoom);
        };
        if player.cooldowns.buff > now_ms {
            return Err(CommandError::OnCooldown);
        }

        player.buff_until = now_ms + buff.duration_ms;
        player.cooldowns.buff = now_ms + buff.cooldown_ms;
        let speed = effects::effective_speed(player, &player_tuning, &buff, now_ms);

        let mut events = vec![Directed::All(RoomEvent::SpeedBuffActivated {
            player_id,
            speed,
        })];
        if let Some(cooldowns) = self.cooldown_event(player_id, now_ms) {
            events.push(Directed::To(player_id, cooldowns));
        }
        Ok(events)
    }

    /// A dropped connection. Mid-match this is an automatic loss; while
    /// waiting (or during the finished grace window) the entity is simply
    /// removed. Infallible: there is no caller left to reject.
    pub fn disconnect(&mut self, player_id: PlayerId, now_ms: u64) -> Vec<Directed> {
        if self.player(player_id).is_none() {
            return Vec::new();
        }

        let was_playing = self.status == RoomStatus::Playing;
        self.remove_player(player_id);

        let mut events = vec![Directed::All(RoomEvent::PlayerLeft {
            player_id,
            player_count: self.players.len(),
        })];

        if was_playing {
            let winner_id = self.players.first().map(|p| p.id);
            let finish = self.finish(winner_id, FinishReason::Disconnect, now_ms);
            events.push(Directed::All(finish));
        }

        events
    }

    /// One simulation step: regen and effect expiry, target-chasing movement,
    /// projectile flight and collisions, win detection. The only entry point
    /// that advances the clock.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Directed> {
        if self.status != RoomStatus::Playing {
            return Vec::new();
        }

        let dt = now_ms.saturating_sub(self.last_tick_ms) as f32 / 1000.0;
        self.last_tick_ms = now_ms;

        let tuning = self.tuning;
        let mut moved: Vec<PositionEntry> = Vec::new();

        for p in &mut self.players {
            effects::tick_effects(p, now_ms, tuning.player.hp_regen_per_sec);

            let cfg = movement::MovementConfig {
                speed: effects::effective_speed(p, &tuning.player, &tuning.buff, now_ms),
                snap_epsilon: tuning.player.snap_epsilon,
            };
            if movement::tick_movement(p, dt, cfg) {
                moved.push(PositionEntry::from(&*p));
            }
        }

        let hits = projectiles::tick_projectiles(
            &mut self.players,
            &mut self.projectiles,
            now_ms,
            &tuning.attack,
            tuning.player.radius,
        );

        let mut events = Vec::new();
        if !moved.is_empty() {
            events.push(Directed::All(RoomEvent::PositionUpdate { players: moved }));
        }

        for hit in hits {
            events.push(Directed::All(RoomEvent::Hit {
                player_id: hit.target_id,
                hp: hit.hp_after,
                x: hit.x,
                y: hit.y,
            }));
            if hit.lethal && self.status == RoomStatus::Playing {
                let finish =
                    self.finish(Some(hit.attacker_id), FinishReason::Knockout, now_ms);
                events.push(Directed::All(finish));
            }
        }

        // Each player only ever learns their own countdowns.
        if self.status == RoomStatus::Playing {
            for id in self.player_ids() {
                if let Some(cooldowns) = self.cooldown_event(id, now_ms) {
                    events.push(Directed::To(id, cooldowns));
                }
            }
        }

        events
    }
}
