//! Session event bus.
//!
//! - [`SessionBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionEvent`]: an auth-state transition reported by the auth
//!   provider (sign-up, sign-in, OAuth callback, sign-out).

pub mod bus;

pub use bus::{SessionBus, SessionEvent};
