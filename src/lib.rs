pub mod app;
pub mod cli;
pub mod core;
pub mod infra;
pub mod network;
pub mod user_config;
