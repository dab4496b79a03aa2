//! Application wiring
//!
//! Configuration, provider resolution and the demo mailbox the console runs
//! against.

pub mod config;
pub mod demo;
pub mod loader;
pub mod providers;

pub use config::AppConfig;
pub use demo::DemoMailbox;
pub use loader::load_config;
pub use providers::{build_router, resolve_selection};
