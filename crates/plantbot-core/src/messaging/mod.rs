//! Bot API abstractions: the incoming update model and the port the
//! dispatcher talks to.

pub mod port;
pub mod types;
