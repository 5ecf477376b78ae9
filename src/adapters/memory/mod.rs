//! In-memory adapters for development and tests.

mod channel_transport;
mod in_memory_chart_repository;

pub use channel_transport::{ChannelTransport, Outbound};
pub use in_memory_chart_repository::InMemoryChartRepository;
