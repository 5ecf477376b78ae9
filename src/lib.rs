//! ValueChart - collaborative multi-criteria decision analysis.
//!
//! Users weigh a hierarchy of objectives and score each alternative's
//! attributes; the weighted sum ranks the alternatives. Charts can be shared
//! in live sessions where a host relays every participant's preferences.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
