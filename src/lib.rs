// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod api;
pub mod app;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod predictions;
pub mod protocol;
pub mod tui;
