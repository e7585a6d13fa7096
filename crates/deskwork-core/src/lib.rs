//! deskwork-core library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at the store and lifecycle seams;
//!   `anyhow::Result` for setup, reports, and other glue.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod api;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod customer;
pub mod db;
pub mod error;
pub mod identity;
pub mod integrations;
pub mod lifecycle;
pub mod location;
pub mod model;
pub mod report;
pub mod store;
