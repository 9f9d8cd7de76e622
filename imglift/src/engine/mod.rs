//! Management-plane REST client.
//!
//! The engine owns disk and transfer lifecycles; this module only creates,
//! fetches, and commands those resources. It never deletes them — once a disk
//! exists, its fate belongs to the engine.

mod client;
mod options;
pub mod types;

pub use client::{ApiError, EngineClient};
pub use options::EngineOptions;
