//! Application library behind the `torii` binary: local cache, remote
//! client, session engines, and the sync orchestrator.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod normalize;
pub mod session;
pub mod sync;
