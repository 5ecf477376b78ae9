//! Application layer - live session orchestration.
//!
//! Wires the pure host session to the repository and transport ports:
//! - `HostActor` / `HostHandle` - one task per chart, the only writer of its chart
//! - `SessionRegistry` - authenticates joins and finds or starts host actors

mod host_actor;
mod session_registry;

pub use host_actor::{HostActor, HostError, HostHandle, HostSettings};
pub use session_registry::SessionRegistry;
