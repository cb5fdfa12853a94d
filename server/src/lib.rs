pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod http;
pub mod obs;
pub mod serial;
