// Use cases layer: room state machine, per-room task and the registry.

pub mod game;
pub mod registry;
pub mod room;
pub mod types;

pub use registry::{RoomHandle, RoomRegistry, RoomSettings};
pub use room::GameRoom;
pub use types::{CommandError, Directed, GameCommand, RoomEvent, SessionSender};
