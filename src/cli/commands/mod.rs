pub mod auth;
pub mod init;
pub mod objective;
pub mod server;
