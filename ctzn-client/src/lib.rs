// Library interface for the ctzn client (used by the binary and integration tests)
#[macro_use]
pub mod logging;

pub mod api;
pub mod composer;
pub mod config;
pub mod items;
pub mod notifications;
pub mod permissions;
pub mod render;
pub mod thread;
pub mod time;
pub mod urls;
pub mod view;
