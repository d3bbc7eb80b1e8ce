pub mod ai;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod server;
pub mod services;
