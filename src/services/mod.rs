//! Domain services used by HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the placement pipeline, the cache-first read paths,
//! and the snapshot checkpoint task, so route handlers stay focused on
//! protocol translation and identity plumbing.

pub mod persistence;
pub mod placement;
pub mod query;
