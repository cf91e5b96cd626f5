pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::router;
pub use client::BpClient;
pub use config::{ClientConfig, Config};
pub use state::AppState;
pub use storage::{load_data, persist_data};
