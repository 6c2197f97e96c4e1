//! HTTP/1 server for the ferrest REST routing layer.
//!
//! Wraps a [`ferrest_core::Router`] in a hyper connection layer: one tokio
//! task per connection, environment-driven configuration, and a demo route
//! table for the `ferrest-server` binary.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod demo;
pub mod error;
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::RestServer;
