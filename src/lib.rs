pub mod atomic_file;
pub mod close_utils;
pub mod commands;
pub mod config;
pub mod context;
pub mod format;
pub mod http_client;
pub mod instruments;
pub mod models;
pub mod render;
pub mod retry;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod yahoo;
