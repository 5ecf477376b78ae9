//! Collaboration module - live synchronisation of one chart between a host
//! and joined participants.
//!
//! # Roles
//!
//! - [`HostSession`] - authoritative chart; validates, relays and persists
//! - [`ParticipantSession`] - a joined client's replica
//!
//! Both sides speak [`WireMessage`]s and share the structure-apply path, so
//! repairing preferences after a structural edit behaves the same everywhere.
//! Duplicate deliveries are harmless: users are upserted by username and
//! structures are only applied when they differ from the current one.

mod apply;
mod connection;
mod errors;
mod host;
mod messages;
mod participant;
mod role;

pub use apply::{apply_structure, revalidate_users, validate_user, StructureUpdate};
pub use connection::ConnectionStatus;
pub use errors::SessionError;
pub use host::{Delivery, HostOutcome, HostSession, PersistRequest, Recipient};
pub use messages::{MessageType, SessionMessage, WireMessage};
pub use participant::{EditError, IgnoreReason, ParticipantSession, SessionEvent};
pub use role::UserRole;
