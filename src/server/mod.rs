pub mod config;
mod http_layers;
mod listener;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub(self) use listener::ListenerId;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
