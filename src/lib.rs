//! annosync - annotation synchronization engine
//!
//! Keeps point markers and line annotations on a base image consistent across
//! an in-memory feature store, a canvas renderer, a table view and a remote
//! annotation server.
//!
//! The entry point is [`SyncEngine`], generic over a [`PersistenceGateway`]:
//! [`HttpGateway`] talks to a running server, [`MemoryGateway`] keeps
//! everything in process.

pub mod canvas;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod image_frame;
pub mod model;
pub mod placement;
pub mod selection;
pub mod store;
pub mod table;

#[cfg(test)]
mod tests;

pub use engine::{CommitPolicy, EngineSettings, SyncEngine};
pub use error::{SyncError, Warning, WarningKind};
pub use gateway::{GatewayError, HttpGateway, MemoryGateway, PersistenceGateway};
pub use image_frame::ImageFrame;
