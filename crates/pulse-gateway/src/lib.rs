pub mod hub;
pub mod registry;
pub mod session;

pub use hub::{Hub, Subscription};
pub use session::{Session, SessionConfig, SessionEnd};
