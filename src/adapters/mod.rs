//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - in-memory chart repository and channel-backed transport
//! - `validation` - standard chart and preference validation
//! - `websocket` - axum websocket endpoint for live sessions

pub mod memory;
pub mod validation;
pub mod websocket;

pub use memory::{ChannelTransport, InMemoryChartRepository, Outbound};
pub use validation::StandardChartValidator;
pub use websocket::{websocket_router, WebSocketState};
