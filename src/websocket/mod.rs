pub mod bridge;
pub mod frame;
pub mod handler;
pub mod routes;
pub mod session;

pub use session::{PushChannelStats, SessionId, SessionRegistry};
