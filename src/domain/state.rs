// Entity state for one arena room. All timestamps are milliseconds on the
// room's own clock; the room task supplies them so the simulation itself
// never reads wall time.

pub type PlayerId = u64;

/// Room lifecycle. Transitions are monotonic: `Waiting -> Playing -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Knockout,
    Disconnect,
    SelfElimination,
}

/// Ability cooldowns as expiry stamps; 0 means ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cooldowns {
    pub attack: u64,
    pub dash: u64,
    pub buff: u64,
}

pub struct PlayerState {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,

    // Movement chases this point; commands only ever set the target.
    pub target_x: f32,
    pub target_y: f32,

    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,

    // Timed effects as expiry stamps; 0 means inactive.
    pub buff_until: u64,
    pub slow_until: u64,
    pub slow_percent: f32,

    pub cooldowns: Cooldowns,

    // Stamp of the last regen/effect pass for this player.
    pub last_update_ms: u64,
}

impl PlayerState {
    pub fn spawn(id: PlayerId, x: f32, y: f32, max_hp: f32, now_ms: u64) -> Self {
        Self {
            id,
            x,
            y,
            target_x: x,
            target_y: y,
            hp: max_hp,
            max_hp,
            alive: true,
            buff_until: 0,
            slow_until: 0,
            slow_percent: 0.0,
            cooldowns: Cooldowns::default(),
            last_update_ms: now_ms,
        }
    }
}

pub struct Projectile {
    pub id: u64,
    pub owner_id: PlayerId,
    pub start_x: f32,
    pub start_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fired_at_ms: u64,
}

impl Projectile {
    /// Position derived from the spawn point, never integrated tick by tick.
    pub fn position_at(&self, now_ms: u64) -> (f32, f32) {
        let elapsed = now_ms.saturating_sub(self.fired_at_ms) as f32 / 1000.0;
        (
            self.start_x + self.vx * elapsed,
            self.start_y + self.vy * elapsed,
        )
    }

    pub fn travelled(&self, now_ms: u64) -> f32 {
        let (x, y) = self.position_at(now_ms);
        let dx = x - self.start_x;
        let dy = y - self.start_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Roster snapshot sent on join/start.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
}

impl From<&PlayerState> for RosterEntry {
    fn from(p: &PlayerState) -> Self {
        Self {
            player_id: p.id,
            x: p.x,
            y: p.y,
            hp: p.hp,
        }
    }
}

/// Entry in the per-tick batched position broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEntry {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
}

impl From<&PlayerState> for PositionEntry {
    fn from(p: &PlayerState) -> Self {
        Self {
            player_id: p.id,
            x: p.x,
            y: p.y,
        }
    }
}
