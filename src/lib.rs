//! Scratch storage for downloaded videos.
//!
//! A [`LifecycleManager`] hands out per-video paths inside a private working
//! directory, evicts them once they are older than a TTL, and purges the whole
//! directory when it is shut down or dropped.

pub mod fetch;
pub mod io;
pub mod lifecycle;
pub mod outside;
pub mod result;
pub mod settings;
pub mod types;
mod utils;

pub use fetch::{fetch, Session};
pub use lifecycle::{LifecycleManager, ManagerConfig, PurgeReport};
pub use result::{Error, Result};
pub use types::Extension;
