//! The house: rooms, discovery endpoint and the supervisor running them.

mod controller;
mod discovery;
mod room;

pub use controller::Controller;
pub use discovery::{Discovery, HouseSummary, RoomSummary, room_serial};
pub use room::Room;
