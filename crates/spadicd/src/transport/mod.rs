//! TCP plumbing for the command servers.
//!
//! Each service owns one listener bound with `SO_REUSEADDR` and a backlog of
//! one. Accepting polls the non-blocking socket so the calling thread can
//! notice a shutdown request within the configured accept timeout.

mod errors;
mod listener;
#[cfg(test)]
mod listener_tests;
mod peer;

pub use self::errors::ListenerError;
pub(crate) use self::listener::ServiceListener;
pub(crate) use self::peer::resolve_peer_name;

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
