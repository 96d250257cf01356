// Library root: configuration, the remote session API, and the
// conversational flow controller that drives an assessment session.

pub mod api;
pub mod config;
pub mod session;
