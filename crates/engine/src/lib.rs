//! Ties the keyspace store, durability, write serialization, and
//! command dispatch together into a single embeddable [`Engine`].
//!
//! This crate owns the one piece of glue ([`bridge`]) allowed to know
//! about both `ember-storage` and `ember-durability`, plus the command
//! registry and every command handler. Everything here runs in-process;
//! a wire protocol front end is a separate, out-of-scope concern.

mod acl;
mod background;
mod bridge;
mod commands;
mod config;
mod connection;
mod dispatch;
mod engine;
mod pubsub;
mod registry;
mod reply;

pub use acl::{AclEnforcer, NoopAcl};
pub use config::{EngineConfig, CONFIG_FILE_NAME};
pub use connection::Connection;
pub use engine::Engine;
pub use pubsub::{NoopPubSub, PubSubSink};
pub use registry::{CommandSpec, SyncFlag};
pub use reply::{DispatchResult, Reply};
