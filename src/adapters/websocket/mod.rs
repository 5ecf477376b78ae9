//! WebSocket adapter for live chart sessions.
//!
//! ```text
//!  browser ──ws──▶ handle_socket ──HostHandle──▶ HostActor (one per chart)
//!     ▲                                              │
//!     └──────── ChannelTransport (per connection) ◀──┘
//! ```
//!
//! Each socket gets a connection id and an outbound channel. Frames from the
//! socket go to the chart's host actor; whatever the actor sends to the
//! connection is written back in order.

pub mod handler;

pub use handler::{websocket_router, ws_handler, JoinParams, WebSocketState};
