#![forbid(unsafe_code)]
//! laneboard-core library.
//!
//! The post lifecycle and identity engine behind a laneboard: identifier
//! allocation, the save-time validation gate, lane ordering, and evergreen
//! resurfacing. Every time-relative computation takes "now" as an argument;
//! nothing in here reads the wall clock except [`clock::SystemClock`].
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` types at library seams, `anyhow::Result` for glue.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod evergreen;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod ordering;
pub mod session;
pub mod store;
