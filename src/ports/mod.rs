//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ChartRepository` - chart and user persistence
//! - `ChartValidator` - structural and preference validation
//! - `MessageTransport` - ordered delivery to participant connections

mod chart_repository;
mod chart_validator;
mod message_transport;

pub use chart_repository::{ChartRepository, RepositoryError};
pub use chart_validator::ChartValidator;
pub use message_transport::{CloseReason, MessageTransport, TransportError};
