//! Line-oriented TCP servers: sessions, broadcast registry and the accept loop.

mod listener;
mod registry;
mod session;

pub use listener::{Listener, SessionHandler, serve_session};
pub use registry::SessionRegistry;
pub use session::{Session, SessionId, SessionReader};
