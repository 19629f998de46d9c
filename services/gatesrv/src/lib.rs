//! Unified gateway agent
//!
//! Polls industrial register devices, listens for mesh frames, routes every
//! reading through pluggable handlers, and keeps a bounded telemetry history
//! with analytics and alerting on top. Transports are narrow capability
//! traits so the core stays independent of concrete buses and brokers.

pub mod backup;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod listener;
pub mod poller;
pub mod registry;
pub mod transport;

pub use config::AgentConfig;
pub use lifecycle::{Agent, AgentContext};
